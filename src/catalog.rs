//! Catalog items and pages.
//!
//! A [`Page`] is one normalized response of a remote list call; a catalog is
//! the ordered sequence of [`CatalogItem`]s resolved from one or more pages.
//! Items are immutable once produced and are rebuilt on every request.

use std::fmt;

use serde::Serialize;

/// The kind of entity a catalog item refers to.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    #[default]
    Video,
    Playlist,
    Channel,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Playlist => write!(f, "playlist"),
            Self::Channel => write!(f, "channel"),
        }
    }
}

/// One entry of a catalog.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub struct CatalogItem {
    id: String,
    kind: ItemKind,
    title: String,
    reference: String,
    position: usize,
}

impl CatalogItem {
    #[must_use]
    pub fn new(kind: ItemKind, id: impl Into<String>, title: impl Into<String>, position: usize) -> Self {
        let id = id.into();
        let reference = Self::reference_for(kind, &id);
        Self {
            id,
            kind,
            title: title.into(),
            reference,
            position,
        }
    }

    /// The host route that plays or opens an item. Playable references end
    /// with the identifier, which is what resuming a catalog matches on.
    #[must_use]
    pub fn reference_for(kind: ItemKind, id: &str) -> String {
        match kind {
            ItemKind::Video => format!("/play/?video_id={id}"),
            ItemKind::Playlist => format!("/play/?playlist_id={id}"),
            ItemKind::Channel => format!("/channel/{id}/"),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn kind(&self) -> ItemKind {
        self.kind
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Position of this item within the page it was fetched on.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }
}

impl fmt::Display for CatalogItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.kind, self.id, self.title)
    }
}

/// One page of a remote list call.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize)]
pub struct Page {
    pub items: Vec<CatalogItem>,

    /// Continuation token; empty when there are no further pages.
    pub next_page_token: String,

    /// Total number of items the remote claims to have. May be stale.
    pub total_results: u64,
}

impl Page {
    #[must_use]
    pub fn has_next(&self) -> bool {
        !self.next_page_token.is_empty()
    }
}
