//! Single remote list calls, normalized into [`Page`]s.

use std::{fmt, sync::Arc};

use async_trait::async_trait;

use crate::{
    cache::CacheKey,
    catalog::{CatalogItem, Page},
    error::Result,
    protocol::api::{self, ListResponse},
    remote::{RemoteApi, SearchType},
    resolver::PageSource,
    tokens::AccessToken,
};

/// A remote list operation together with its arguments.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum ListRequest {
    PlaylistItems { playlist_id: String },
    Playlists { channel_id: String },
    Search { query: String, search_type: SearchType },
    Subscriptions,
    SubscriptionUploads,
}

impl ListRequest {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::PlaylistItems { .. } => "list_playlist_items",
            Self::Playlists { .. } => "list_playlists",
            Self::Search { .. } => "search",
            Self::Subscriptions => "list_subscriptions",
            Self::SubscriptionUploads => "subscription_uploads",
        }
    }

    /// Arguments in call order, excluding the page token.
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        match self {
            Self::PlaylistItems { playlist_id } => vec![playlist_id.clone()],
            Self::Playlists { channel_id } => vec![channel_id.clone()],
            Self::Search { query, search_type } => vec![query.clone(), search_type.to_string()],
            Self::Subscriptions | Self::SubscriptionUploads => Vec::new(),
        }
    }

    /// The call signature of fetching the page at `page_token`.
    #[must_use]
    pub fn cache_key(&self, page_token: &str) -> CacheKey {
        let mut args = self.args();
        args.push(page_token.to_owned());
        CacheKey::new(self.name(), args)
    }
}

impl fmt::Display for ListRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.args().join(", "))
    }
}

/// Fetches one page of a [`ListRequest`] with a fixed access token.
#[derive(Clone)]
pub struct PageFetcher {
    remote: Arc<dyn RemoteApi>,
    token: Option<AccessToken>,
}

impl PageFetcher {
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteApi>, token: Option<AccessToken>) -> Self {
        Self { remote, token }
    }

    /// Performs the remote call and normalizes its response.
    ///
    /// # Errors
    ///
    /// Returns a [`RemoteApiError`](crate::error::RemoteApiError) when the
    /// remote answered with an error payload, or the transport error when
    /// it did not answer at all. Nothing is retried.
    pub async fn fetch_page(&self, request: &ListRequest, page_token: &str) -> Result<Page> {
        let auth = self.token.as_ref();
        let response = match request {
            ListRequest::PlaylistItems { playlist_id } => {
                self.remote
                    .list_playlist_items(auth, playlist_id, page_token)
                    .await?
            }
            ListRequest::Playlists { channel_id } => {
                self.remote
                    .list_playlists(auth, channel_id, page_token)
                    .await?
            }
            ListRequest::Search { query, search_type } => {
                self.remote
                    .search(auth, query, *search_type, page_token)
                    .await?
            }
            ListRequest::Subscriptions => self.remote.list_subscriptions(auth, page_token).await?,
            ListRequest::SubscriptionUploads => self.remote.subscription_uploads(auth).await?,
        };

        let page = normalize(response)?;
        debug!(
            "{request} at \"{page_token}\": {} items, next \"{}\"",
            page.items.len(),
            page.next_page_token
        );
        Ok(page)
    }
}

#[async_trait]
impl PageSource for PageFetcher {
    async fn fetch_page(&self, request: &ListRequest, page_token: &str) -> Result<Page> {
        PageFetcher::fetch_page(self, request, page_token).await
    }
}

/// Converts a raw list response into a page, skipping resources that do not
/// point at anything playable or browsable.
fn normalize(response: ListResponse) -> Result<Page> {
    api::check(response.error)?;

    let items = response
        .items
        .iter()
        .enumerate()
        .filter_map(|(index, resource)| {
            let Some((kind, id)) = resource.target() else {
                trace!("skipping {resource}");
                return None;
            };
            let position = resource
                .snippet
                .position
                .and_then(|position| usize::try_from(position).ok())
                .unwrap_or(index);
            Some(CatalogItem::new(
                kind,
                id,
                resource.snippet.title.as_str(),
                position,
            ))
        })
        .collect();

    Ok(Page {
        items,
        next_page_token: response.next_page_token.unwrap_or_default(),
        total_results: response.page_info.total_results,
    })
}
