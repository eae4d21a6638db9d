//! Resolution of a complete catalog across pages.
//!
//! [`CatalogResolver::resolve`] follows continuation tokens until the remote
//! reports no further page. When a start item is given, everything before
//! it is dropped:
//!
//! * the page holding the start item is kept from that item on, and every
//!   later page is kept in full
//! * a page not holding it is discarded, unless it is the last page
//! * if the start item never appears, the last page is kept in full
//!
//! Items are matched by the suffix of their reference, which for videos is
//! the video identifier. Resolved catalogs are never cached.

use std::{collections::HashSet, mem};

use async_trait::async_trait;

use crate::{
    catalog::{CatalogItem, Page},
    error::Result,
    fetcher::ListRequest,
};

/// Anything that can fetch one page of a list request.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, request: &ListRequest, page_token: &str) -> Result<Page>;
}

pub struct CatalogResolver<S> {
    source: S,
}

impl<S> CatalogResolver<S>
where
    S: PageSource,
{
    #[must_use]
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Fetches every page of `request` and concatenates their items,
    /// starting at `start_item_id` if given.
    ///
    /// `on_progress` is called after every page with the number of items
    /// accumulated so far and the total the remote declared.
    ///
    /// # Errors
    ///
    /// The first failing page aborts the resolution; items accumulated so
    /// far are discarded.
    pub async fn resolve<F>(
        &self,
        request: &ListRequest,
        start_item_id: Option<&str>,
        mut on_progress: F,
    ) -> Result<Vec<CatalogItem>>
    where
        F: FnMut(usize, u64) + Send,
    {
        let mut items: Vec<CatalogItem> = Vec::new();
        let mut seen = HashSet::new();
        let mut page_token = String::new();
        let mut resolved = start_item_id.is_none();

        loop {
            let mut page = self.source.fetch_page(request, &page_token).await?;

            if !resolved {
                if let Some(target) = start_item_id {
                    match page
                        .items
                        .iter()
                        .position(|item| item.reference().ends_with(target))
                    {
                        Some(index) => {
                            debug!("{request}: starting at {target} on page \"{page_token}\"");
                            page.items.drain(..index);
                            resolved = true;
                        }
                        None if page.has_next() => page.items.clear(),
                        None => debug!("{request}: {target} not found, keeping last page"),
                    }
                }
            }

            // The remote may shift items between pages while paging.
            for item in mem::take(&mut page.items) {
                if seen.insert(item.reference().to_owned()) {
                    items.push(item);
                }
            }

            on_progress(items.len(), page.total_results);

            if !page.has_next() {
                break;
            }
            if page.next_page_token == page_token {
                warn!("{request}: remote repeated page token \"{page_token}\", stopping");
                break;
            }
            page_token = page.next_page_token;
        }

        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{
        catalog::ItemKind,
        error::{Error, ErrorKind},
    };

    /// Pages of videos `v1`, `v2`, ... addressed by tokens `""`, `"p1"`, ...
    struct Pages {
        sizes: Vec<usize>,
        fail_at: Option<usize>,
        requested: Mutex<Vec<String>>,
    }

    impl Pages {
        fn new(sizes: &[usize]) -> Self {
            Self {
                sizes: sizes.to_vec(),
                fail_at: None,
                requested: Mutex::new(Vec::new()),
            }
        }

        fn token(index: usize) -> String {
            if index == 0 {
                String::new()
            } else {
                format!("p{index}")
            }
        }
    }

    #[async_trait]
    impl PageSource for Pages {
        async fn fetch_page(&self, _request: &ListRequest, page_token: &str) -> Result<Page> {
            self.requested.lock().unwrap().push(page_token.to_owned());

            let index = (0..self.sizes.len())
                .find(|&index| Self::token(index) == page_token)
                .ok_or_else(|| Error::invalid_argument("unknown page token"))?;
            if self.fail_at == Some(index) {
                return Err(Error::unavailable("backend down"));
            }

            let offset: usize = self.sizes[..index].iter().sum();
            let items = (0..self.sizes[index])
                .map(|n| CatalogItem::new(ItemKind::Video, format!("v{}", offset + n + 1), "", n))
                .collect();
            let next_page_token = if index + 1 < self.sizes.len() {
                Self::token(index + 1)
            } else {
                String::new()
            };

            Ok(Page {
                items,
                next_page_token,
                total_results: self.sizes.iter().sum::<usize>() as u64,
            })
        }
    }

    fn request() -> ListRequest {
        ListRequest::PlaylistItems {
            playlist_id: "PL123".to_owned(),
        }
    }

    fn ids(items: &[CatalogItem]) -> Vec<&str> {
        items.iter().map(CatalogItem::id).collect()
    }

    #[tokio::test]
    async fn concatenates_all_pages_in_order() {
        let resolver = CatalogResolver::new(Pages::new(&[25, 5]));
        let mut progress = Vec::new();

        let items = resolver
            .resolve(&request(), None, |count, total| progress.push((count, total)))
            .await
            .unwrap();

        assert_eq!(items.len(), 30);
        assert_eq!(items[0].id(), "v1");
        assert_eq!(items[29].id(), "v30");
        assert_eq!(progress, vec![(25, 30), (30, 30)]);
    }

    #[tokio::test]
    async fn follows_next_page_token_after_taking_items() {
        let resolver = CatalogResolver::new(Pages::new(&[3, 3, 2]));

        let items = resolver
            .resolve(&request(), None, |_, _| {})
            .await
            .unwrap();

        assert_eq!(
            ids(&items),
            vec!["v1", "v2", "v3", "v4", "v5", "v6", "v7", "v8"]
        );
        assert_eq!(
            *resolver.source.requested.lock().unwrap(),
            vec!["", "p1", "p2"]
        );
    }

    #[tokio::test]
    async fn resumes_from_start_item() {
        let resolver = CatalogResolver::new(Pages::new(&[10, 10, 10]));

        let items = resolver
            .resolve(&request(), Some("v15"), |_, _| {})
            .await
            .unwrap();

        assert_eq!(items.len(), 16);
        assert_eq!(items[0].id(), "v15");
        assert_eq!(items.last().map(CatalogItem::id), Some("v30"));
    }

    #[tokio::test]
    async fn start_item_on_first_page() {
        let resolver = CatalogResolver::new(Pages::new(&[10, 10, 10]));

        let items = resolver
            .resolve(&request(), Some("v1"), |_, _| {})
            .await
            .unwrap();

        assert_eq!(items.len(), 30);
    }

    #[tokio::test]
    async fn missing_start_item_keeps_last_page() {
        let resolver = CatalogResolver::new(Pages::new(&[10, 10, 10]));
        let mut progress = Vec::new();

        let items = resolver
            .resolve(&request(), Some("nope"), |count, _| progress.push(count))
            .await
            .unwrap();

        assert_eq!(ids(&items), (21..=30).map(|n| format!("v{n}")).collect::<Vec<_>>());
        assert_eq!(progress, vec![0, 0, 10]);
    }

    #[tokio::test]
    async fn missing_start_item_on_single_page_keeps_everything() {
        let resolver = CatalogResolver::new(Pages::new(&[7]));

        let items = resolver
            .resolve(&request(), Some("nope"), |_, _| {})
            .await
            .unwrap();

        assert_eq!(items.len(), 7);
    }

    #[tokio::test]
    async fn start_item_is_matched_by_suffix() {
        let resolver = CatalogResolver::new(Pages::new(&[20]));

        // "v12" and "v20" end with "2" as well, but "v2" comes first.
        let items = resolver
            .resolve(&request(), Some("2"), |_, _| {})
            .await
            .unwrap();

        assert_eq!(items[0].id(), "v2");
        assert_eq!(items.len(), 19);
    }

    #[tokio::test]
    async fn first_error_aborts() {
        let mut pages = Pages::new(&[10, 10, 10]);
        pages.fail_at = Some(1);
        let resolver = CatalogResolver::new(pages);

        let err = resolver
            .resolve(&request(), None, |_, _| {})
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Unavailable);
        assert_eq!(*resolver.source.requested.lock().unwrap(), vec!["", "p1"]);
    }

    #[tokio::test]
    async fn empty_catalog() {
        let resolver = CatalogResolver::new(Pages::new(&[0]));
        let mut calls = 0;

        let items = resolver
            .resolve(&request(), None, |_, _| calls += 1)
            .await
            .unwrap();

        assert!(items.is_empty());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn repeated_token_stops() {
        struct Stuck;

        #[async_trait]
        impl PageSource for Stuck {
            async fn fetch_page(&self, _request: &ListRequest, _page_token: &str) -> Result<Page> {
                Ok(Page {
                    items: vec![CatalogItem::new(ItemKind::Video, "same", "", 0)],
                    next_page_token: "again".to_owned(),
                    total_results: 1,
                })
            }
        }

        let items = CatalogResolver::new(Stuck)
            .resolve(&request(), None, |_, _| {})
            .await
            .unwrap();

        assert_eq!(ids(&items), vec!["same"]);
    }
}
