//! Contract of the remote video-catalog API.
//!
//! [`RemoteApi`] is implemented over HTTP by
//! [`Gateway`](crate::gateway::Gateway) and by in-memory fakes in tests.
//! Every call except [`RemoteApi::authenticate`] takes the current access
//! token, if any; anonymous calls pass `None`.
//!
//! Implementations return the raw wire types of [`crate::protocol`]. Error
//! payloads are left in the response for the caller to check.

use std::{fmt, str::FromStr};

use async_trait::async_trait;

use crate::{
    error::{Error, Result},
    protocol::{
        api::{Ack, ChannelsResponse, ListResponse},
        streams::StreamsResponse,
    },
    tokens::AccessToken,
};

/// Channel identifier that stands for the logged-in user's own channel.
pub const MINE: &str = "mine";

/// What a search should return.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum SearchType {
    #[default]
    Video,
    Channel,
    Playlist,
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Channel => write!(f, "channel"),
            Self::Playlist => write!(f, "playlist"),
        }
    }
}

impl FromStr for SearchType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "video" => Ok(Self::Video),
            "channel" => Ok(Self::Channel),
            "playlist" => Ok(Self::Playlist),
            _ => Err(Error::invalid_argument(format!("unknown search type: {s}"))),
        }
    }
}

#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Exchanges credentials for an access token.
    ///
    /// # Errors
    ///
    /// Returns a [`LoginError`](crate::error::LoginError) when the remote
    /// rejects the credentials.
    async fn authenticate(&self, username: &str, password: &str) -> Result<AccessToken>;

    /// One page of the items of a playlist.
    async fn list_playlist_items(
        &self,
        auth: Option<&AccessToken>,
        playlist_id: &str,
        page_token: &str,
    ) -> Result<ListResponse>;

    /// One page of the playlists of a channel, or of the own channel when
    /// `channel_id` is [`MINE`].
    async fn list_playlists(
        &self,
        auth: Option<&AccessToken>,
        channel_id: &str,
        page_token: &str,
    ) -> Result<ListResponse>;

    async fn search(
        &self,
        auth: Option<&AccessToken>,
        query: &str,
        search_type: SearchType,
        page_token: &str,
    ) -> Result<ListResponse>;

    /// One page of the channels the logged-in user is subscribed to.
    async fn list_subscriptions(
        &self,
        auth: Option<&AccessToken>,
        page_token: &str,
    ) -> Result<ListResponse>;

    /// Recent uploads of the subscribed channels. Not paginated.
    async fn subscription_uploads(&self, auth: Option<&AccessToken>) -> Result<ListResponse>;

    async fn video_streams(
        &self,
        auth: Option<&AccessToken>,
        video_id: &str,
    ) -> Result<StreamsResponse>;

    /// Uploads, watch-later, likes and history playlists of a channel.
    async fn related_playlists(
        &self,
        auth: Option<&AccessToken>,
        channel_id: &str,
    ) -> Result<ChannelsResponse>;

    async fn subscribe(&self, auth: Option<&AccessToken>, channel_id: &str) -> Result<Ack>;

    async fn unsubscribe(&self, auth: Option<&AccessToken>, subscription_id: &str) -> Result<Ack>;

    /// Removes every entry of `video_id` from a playlist.
    async fn remove_from_playlist(
        &self,
        auth: Option<&AccessToken>,
        playlist_id: &str,
        video_id: &str,
    ) -> Result<Ack>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_type_round_trips() {
        for search_type in [SearchType::Video, SearchType::Channel, SearchType::Playlist] {
            assert_eq!(
                search_type.to_string().parse::<SearchType>().unwrap(),
                search_type
            );
        }
        assert!("music".parse::<SearchType>().is_err());
    }
}
