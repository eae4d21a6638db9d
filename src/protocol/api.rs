//! List envelopes and resources.
//!
//! # Wire Format
//!
//! ```json
//! {
//!     "nextPageToken": "CAoQAA",
//!     "pageInfo": { "totalResults": 30, "resultsPerPage": 10 },
//!     "items": [
//!         {
//!             "kind": "catalog#playlistItem",
//!             "id": "UExfY2F0cy4wMQ",
//!             "snippet": {
//!                 "title": "Cat video",
//!                 "position": 0,
//!                 "resourceId": { "kind": "catalog#video", "videoId": "dQw4w9WgXcQ" }
//!             }
//!         },
//!         {
//!             "kind": "catalog#searchResult",
//!             "id": { "kind": "catalog#channel", "channelId": "UCcats" },
//!             "snippet": { "title": "Cats" }
//!         }
//!     ]
//! }
//! ```
//!
//! Errors replace the data:
//!
//! ```json
//! { "error": { "code": 404, "message": "Playlist <b>not</b> found" } }
//! ```

use std::fmt;

use serde::Deserialize;

use crate::{
    catalog::ItemKind,
    error::{Error, RemoteApiError, Result},
};

/// Error payload as sent by the remote API.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
}

impl From<ErrorPayload> for RemoteApiError {
    fn from(payload: ErrorPayload) -> Self {
        Self {
            code: payload.code,
            message: payload.message,
        }
    }
}

/// Turns an error payload, if any, into a [`RemoteApiError`].
///
/// # Errors
///
/// Returns the remote error when `error` is `Some`.
pub fn check(error: Option<ErrorPayload>) -> Result<()> {
    match error {
        Some(payload) => Err(Error::remote(payload.into())),
        None => Ok(()),
    }
}

/// Envelope of every list call.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    #[serde(default)]
    pub items: Vec<Resource>,
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub page_info: PageInfo,
    #[serde(default)]
    pub error: Option<ErrorPayload>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub total_results: u64,
    #[serde(default)]
    pub results_per_page: u64,
}

/// One entry of a list response.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(default)]
    pub kind: String,
    pub id: ResourceId,
    #[serde(default)]
    pub snippet: Snippet,
    /// Only present on activities.
    #[serde(default)]
    pub content_details: Option<ActivityDetails>,
}

/// Resources are identified either by a plain string or, for search
/// results, by a typed reference.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ResourceId {
    Plain(String),
    Typed(TypedId),
}

impl Default for ResourceId {
    fn default() -> Self {
        Self::Plain(String::new())
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedId {
    #[serde(default)]
    pub kind: String,
    pub video_id: Option<String>,
    pub playlist_id: Option<String>,
    pub channel_id: Option<String>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    #[serde(default)]
    pub title: String,
    pub position: Option<u64>,
    /// What a playlist item or subscription points at.
    pub resource_id: Option<TypedId>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDetails {
    pub upload: Option<Upload>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upload {
    pub video_id: String,
}

impl TypedId {
    fn target(&self) -> Option<(ItemKind, &str)> {
        if let Some(id) = &self.video_id {
            return Some((ItemKind::Video, id));
        }
        if let Some(id) = &self.playlist_id {
            return Some((ItemKind::Playlist, id));
        }
        self.channel_id
            .as_deref()
            .map(|id| (ItemKind::Channel, id))
    }
}

/// Maps `catalog#video` and friends onto an item kind.
fn kind_of(kind: &str) -> Option<ItemKind> {
    match kind.rsplit('#').next() {
        Some("video") => Some(ItemKind::Video),
        Some("playlist") => Some(ItemKind::Playlist),
        Some("channel") => Some(ItemKind::Channel),
        _ => None,
    }
}

impl Resource {
    /// The kind and identifier of the entity this resource points at.
    ///
    /// Playlist items and subscriptions point at their `resourceId`, upload
    /// activities at the uploaded video and search results carry a typed
    /// `id`. Everything else is identified by its own plain `id`.
    #[must_use]
    pub fn target(&self) -> Option<(ItemKind, &str)> {
        if let Some(target) = self.snippet.resource_id.as_ref().and_then(TypedId::target) {
            return Some(target);
        }

        if let Some(upload) = self
            .content_details
            .as_ref()
            .and_then(|details| details.upload.as_ref())
        {
            return Some((ItemKind::Video, upload.video_id.as_str()));
        }

        match &self.id {
            ResourceId::Typed(typed) => typed.target(),
            ResourceId::Plain(id) if !id.is_empty() => {
                kind_of(&self.kind).map(|kind| (kind, id.as_str()))
            }
            ResourceId::Plain(_) => None,
        }
    }

    /// A playlist entry pointing at a video.
    #[must_use]
    pub fn playlist_item(video_id: &str, title: &str, position: u64) -> Self {
        Self {
            kind: "catalog#playlistItem".to_owned(),
            id: ResourceId::Plain(format!("item-{video_id}")),
            snippet: Snippet {
                title: title.to_owned(),
                position: Some(position),
                resource_id: Some(TypedId {
                    kind: "catalog#video".to_owned(),
                    video_id: Some(video_id.to_owned()),
                    ..TypedId::default()
                }),
            },
            content_details: None,
        }
    }

    /// A playlist as listed for a channel.
    #[must_use]
    pub fn playlist(playlist_id: &str, title: &str) -> Self {
        Self {
            kind: "catalog#playlist".to_owned(),
            id: ResourceId::Plain(playlist_id.to_owned()),
            snippet: Snippet {
                title: title.to_owned(),
                ..Snippet::default()
            },
            content_details: None,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target() {
            Some((kind, id)) => write!(f, "{kind} {id}"),
            None => write!(f, "{} (unresolvable)", self.kind),
        }
    }
}

/// Response of the channel lookup used to find related playlists.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelsResponse {
    #[serde(default)]
    pub items: Vec<Channel>,
    #[serde(default)]
    pub error: Option<ErrorPayload>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub content_details: ContentDetails,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDetails {
    #[serde(default)]
    pub related_playlists: RelatedPlaylists,
}

/// The system playlists belonging to a channel.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedPlaylists {
    pub uploads: Option<String>,
    pub watch_later: Option<String>,
    pub likes: Option<String>,
    pub watch_history: Option<String>,
}

/// Acknowledgement of a mutating call. Carries nothing but a possible error.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub error: Option<ErrorPayload>,
}
