//! Authenticated access to the remote API.
//!
//! A [`Session`] owns the access token and the result cache, and offers the
//! named remote operations. Before every operation it checks whether the
//! authentication state changes:
//!
//! * the credentials were changed
//! * credentials are present but there is no token
//! * the token has expired
//!
//! Any of these drops the token and clears the cache *before* anything is
//! read from it, then logs in again if credentials are present. Cached
//! results of one account are therefore never served to another.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::{
    cache::ResultCache,
    catalog::{CatalogItem, Page},
    credentials::Credentials,
    error::{Error, Result},
    fetcher::{ListRequest, PageFetcher},
    protocol::api::{self, RelatedPlaylists},
    remote::{RemoteApi, MINE},
    resolver::CatalogResolver,
    stream::StreamVariant,
    tokens::AccessToken,
};

pub struct Session {
    remote: Arc<dyn RemoteApi>,
    credentials: Option<Credentials>,
    credentials_changed: bool,
    access_token: Option<AccessToken>,
    cache: ResultCache<Page>,
}

impl Session {
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteApi>, credentials: Option<Credentials>) -> Self {
        Self {
            remote,
            credentials,
            credentials_changed: false,
            access_token: None,
            cache: ResultCache::new(),
        }
    }

    /// Replaces the credentials. The next operation logs in again when they
    /// differ from the current ones.
    pub fn set_credentials(&mut self, credentials: Option<Credentials>) {
        if self.credentials != credentials {
            debug!("credentials changed");
            self.credentials = credentials;
            self.credentials_changed = true;
        }
    }

    /// Drops the access token, forcing a new login before the next
    /// operation.
    pub fn flush_token(&mut self) {
        if self.access_token.take().is_some() {
            debug!("access token flushed");
        }
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.access_token
            .as_ref()
            .is_some_and(|token| !token.is_expired())
    }

    #[must_use]
    pub fn access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref()
    }

    /// Brings the authentication state up to date.
    ///
    /// # Errors
    ///
    /// Returns a [`LoginError`](crate::error::LoginError) when logging in
    /// fails. The token stays empty in that case.
    pub async fn ensure_session(&mut self) -> Result<()> {
        let expired = self
            .access_token
            .as_ref()
            .is_some_and(AccessToken::is_expired);
        let missing = self.credentials.is_some() && self.access_token.is_none();

        if !(self.credentials_changed || missing || expired) {
            return Ok(());
        }

        debug!(
            "session transition (credentials changed: {}, token missing: {missing}, token expired: {expired})",
            self.credentials_changed
        );
        self.access_token = None;
        self.credentials_changed = false;
        self.cache.clear();

        let Some(credentials) = &self.credentials else {
            return Ok(());
        };

        match self
            .remote
            .authenticate(credentials.username(), credentials.password())
            .await
        {
            Ok(token) => {
                info!("logged in as {}", credentials.username());
                trace!("access token expires in {:?}", token.time_to_live());
                self.access_token = Some(token);
                Ok(())
            }
            Err(e) if e.is_login_error() => Err(e),
            Err(e) => Err(Error::login(e.to_string())),
        }
    }

    fn fetcher(&self) -> PageFetcher {
        PageFetcher::new(Arc::clone(&self.remote), self.access_token.clone())
    }

    /// One page of `request`, served from the cache while younger than
    /// `ttl`.
    ///
    /// # Errors
    ///
    /// Returns an error if logging in or the remote call fails.
    pub async fn cached_page(
        &mut self,
        request: &ListRequest,
        page_token: &str,
        ttl: std::time::Duration,
    ) -> Result<Page> {
        self.ensure_session().await?;

        let fetcher = self.fetcher();
        self.cache
            .get_or_compute(request.cache_key(page_token), ttl, || {
                fetcher.fetch_page(request, page_token)
            })
            .await
    }

    /// One page of `request`, always fetched from the remote.
    ///
    /// # Errors
    ///
    /// Returns an error if logging in or the remote call fails.
    pub async fn page(&mut self, request: &ListRequest, page_token: &str) -> Result<Page> {
        self.ensure_session().await?;
        self.fetcher().fetch_page(request, page_token).await
    }

    /// The complete catalog of `request`. Never cached.
    ///
    /// # Errors
    ///
    /// Returns an error if logging in or any page fails.
    pub async fn resolve_catalog<F>(
        &mut self,
        request: &ListRequest,
        start_item_id: Option<&str>,
        on_progress: F,
    ) -> Result<Vec<CatalogItem>>
    where
        F: FnMut(usize, u64) + Send,
    {
        self.ensure_session().await?;
        CatalogResolver::new(self.fetcher())
            .resolve(request, start_item_id, on_progress)
            .await
    }

    /// Stream variants of a video, in the order the remote listed them.
    ///
    /// # Errors
    ///
    /// Returns an error if logging in or the remote call fails.
    pub async fn video_streams(&mut self, video_id: &str) -> Result<Vec<StreamVariant>> {
        self.ensure_session().await?;
        let mut response = self
            .remote
            .video_streams(self.access_token.as_ref(), video_id)
            .await?;
        api::check(response.error.take())?;
        Ok(response.into_variants())
    }

    /// The system playlists of a channel, or of the own channel when
    /// `channel_id` is [`MINE`].
    ///
    /// # Errors
    ///
    /// Returns an error if logging in or the remote call fails, or if the
    /// channel does not exist.
    pub async fn related_playlists(&mut self, channel_id: &str) -> Result<RelatedPlaylists> {
        self.ensure_session().await?;
        related_playlists(&*self.remote, self.access_token.as_ref(), channel_id).await
    }

    /// # Errors
    ///
    /// Returns an error if logging in or the remote call fails.
    pub async fn subscribe(&mut self, channel_id: &str) -> Result<()> {
        self.ensure_session().await?;
        let ack = self
            .remote
            .subscribe(self.access_token.as_ref(), channel_id)
            .await?;
        api::check(ack.error)
    }

    /// # Errors
    ///
    /// Returns an error if logging in or the remote call fails.
    pub async fn unsubscribe(&mut self, subscription_id: &str) -> Result<()> {
        self.ensure_session().await?;
        let ack = self
            .remote
            .unsubscribe(self.access_token.as_ref(), subscription_id)
            .await?;
        api::check(ack.error)
    }

    /// Removes a video from the own watch-later playlist.
    ///
    /// # Errors
    ///
    /// Returns an error if logging in or a remote call fails, or if the
    /// account has no watch-later playlist.
    pub async fn remove_from_watch_later(&mut self, video_id: &str) -> Result<()> {
        self.ensure_session().await?;
        remove_from_watch_later(&*self.remote, self.access_token.as_ref(), video_id).await
    }

    /// Removes a video from the own watch-later playlist in the background.
    ///
    /// Returns `None` without spawning anything when not logged in. The
    /// outcome of the task is only logged.
    #[must_use]
    pub fn spawn_watch_later_removal(&self, video_id: &str) -> Option<JoinHandle<()>> {
        if !self.is_logged_in() {
            return None;
        }

        let remote = Arc::clone(&self.remote);
        let token = self.access_token.clone();
        let video_id = video_id.to_owned();

        Some(tokio::spawn(async move {
            match remove_from_watch_later(&*remote, token.as_ref(), &video_id).await {
                Ok(()) => debug!("removed {video_id} from watch later"),
                Err(e) => warn!("failed to remove {video_id} from watch later: {e}"),
            }
        }))
    }
}

async fn related_playlists(
    remote: &dyn RemoteApi,
    auth: Option<&AccessToken>,
    channel_id: &str,
) -> Result<RelatedPlaylists> {
    let response = remote.related_playlists(auth, channel_id).await?;
    api::check(response.error)?;
    response
        .items
        .into_iter()
        .next()
        .map(|channel| channel.content_details.related_playlists)
        .ok_or_else(|| Error::not_found(format!("channel {channel_id} not found")))
}

async fn remove_from_watch_later(
    remote: &dyn RemoteApi,
    auth: Option<&AccessToken>,
    video_id: &str,
) -> Result<()> {
    let playlists = related_playlists(remote, auth, MINE).await?;
    let watch_later = playlists
        .watch_later
        .ok_or_else(|| Error::not_found("no watch later playlist"))?;

    let ack = remote
        .remove_from_playlist(auth, &watch_later, video_id)
        .await?;
    api::check(ack.error)
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::{Duration, SystemTime},
    };

    use async_trait::async_trait;

    use super::*;
    use crate::{
        cache::ttl,
        error::ErrorKind,
        protocol::{
            api::{Ack, ChannelsResponse, ListResponse, Resource},
            streams::StreamsResponse,
        },
        remote::SearchType,
    };

    /// Answers every list call with one item named after the account and the
    /// number of list calls so far.
    #[derive(Default)]
    struct Counting {
        logins: AtomicUsize,
        lists: AtomicUsize,
        token_lifetime: Option<Duration>,
    }

    impl Counting {
        fn list(&self, auth: Option<&AccessToken>) -> ListResponse {
            let call = self.lists.fetch_add(1, Ordering::SeqCst);
            let account = auth.map_or("anonymous", AccessToken::as_str);
            ListResponse {
                items: vec![Resource::playlist_item(
                    &format!("{account}-{call}"),
                    "",
                    0,
                )],
                ..ListResponse::default()
            }
        }
    }

    #[async_trait]
    impl RemoteApi for Counting {
        async fn authenticate(&self, username: &str, password: &str) -> Result<AccessToken> {
            self.logins.fetch_add(1, Ordering::SeqCst);
            if password != "secret" {
                return Err(Error::login("wrong password"));
            }
            let lifetime = self.token_lifetime.unwrap_or(Duration::from_secs(3600));
            Ok(AccessToken::new(username, SystemTime::now() + lifetime))
        }

        async fn list_playlist_items(
            &self,
            auth: Option<&AccessToken>,
            _playlist_id: &str,
            _page_token: &str,
        ) -> Result<ListResponse> {
            Ok(self.list(auth))
        }

        async fn list_playlists(
            &self,
            auth: Option<&AccessToken>,
            _channel_id: &str,
            _page_token: &str,
        ) -> Result<ListResponse> {
            Ok(self.list(auth))
        }

        async fn search(
            &self,
            auth: Option<&AccessToken>,
            _query: &str,
            _search_type: SearchType,
            _page_token: &str,
        ) -> Result<ListResponse> {
            Ok(self.list(auth))
        }

        async fn list_subscriptions(
            &self,
            auth: Option<&AccessToken>,
            _page_token: &str,
        ) -> Result<ListResponse> {
            Ok(self.list(auth))
        }

        async fn subscription_uploads(&self, auth: Option<&AccessToken>) -> Result<ListResponse> {
            Ok(self.list(auth))
        }

        async fn video_streams(
            &self,
            _auth: Option<&AccessToken>,
            _video_id: &str,
        ) -> Result<StreamsResponse> {
            Ok(StreamsResponse::default())
        }

        async fn related_playlists(
            &self,
            _auth: Option<&AccessToken>,
            _channel_id: &str,
        ) -> Result<ChannelsResponse> {
            Ok(ChannelsResponse::default())
        }

        async fn subscribe(&self, _auth: Option<&AccessToken>, _channel_id: &str) -> Result<Ack> {
            Ok(Ack::default())
        }

        async fn unsubscribe(
            &self,
            _auth: Option<&AccessToken>,
            _subscription_id: &str,
        ) -> Result<Ack> {
            Ok(Ack::default())
        }

        async fn remove_from_playlist(
            &self,
            _auth: Option<&AccessToken>,
            _playlist_id: &str,
            _video_id: &str,
        ) -> Result<Ack> {
            Ok(Ack::default())
        }
    }

    fn request() -> ListRequest {
        ListRequest::PlaylistItems {
            playlist_id: "PL123".to_owned(),
        }
    }

    fn first_id(page: &Page) -> &str {
        page.items[0].id()
    }

    #[tokio::test]
    async fn caches_pages_per_call_signature() {
        let remote = Arc::new(Counting::default());
        let mut session = Session::new(remote.clone(), None);

        let first = session.cached_page(&request(), "", ttl::ONE_DAY).await.unwrap();
        let second = session.cached_page(&request(), "", ttl::ONE_DAY).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first_id(&first), "anonymous-0");

        let uncached = session.page(&request(), "").await.unwrap();
        assert_eq!(first_id(&uncached), "anonymous-1");
        assert_eq!(remote.logins.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn credential_change_clears_cache() {
        let remote = Arc::new(Counting::default());
        let mut session = Session::new(remote.clone(), None);

        let anonymous = session.cached_page(&request(), "", ttl::ONE_DAY).await.unwrap();
        assert_eq!(first_id(&anonymous), "anonymous-0");

        session.set_credentials(Some(Credentials::new("alice", "secret").unwrap()));
        let alice = session.cached_page(&request(), "", ttl::ONE_DAY).await.unwrap();
        assert_eq!(first_id(&alice), "alice-1");
        assert!(session.is_logged_in());
        assert_eq!(remote.logins.load(Ordering::SeqCst), 1);

        // Same credentials again is no transition.
        session.set_credentials(Some(Credentials::new("alice", "secret").unwrap()));
        let again = session.cached_page(&request(), "", ttl::ONE_DAY).await.unwrap();
        assert_eq!(first_id(&again), "alice-1");
        assert_eq!(remote.logins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_token_clears_cache() {
        let remote = Arc::new(Counting {
            token_lifetime: Some(Duration::ZERO),
            ..Counting::default()
        });
        let credentials = Credentials::new("bob", "secret").unwrap();
        let mut session = Session::new(remote.clone(), Some(credentials));

        let first = session.cached_page(&request(), "", ttl::ONE_DAY).await.unwrap();
        let second = session.cached_page(&request(), "", ttl::ONE_DAY).await.unwrap();

        assert_eq!(first_id(&first), "bob-0");
        assert_eq!(first_id(&second), "bob-1");
        assert_eq!(remote.logins.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_login_skips_remote_call() {
        let remote = Arc::new(Counting::default());
        let credentials = Credentials::new("mallory", "guess").unwrap();
        let mut session = Session::new(remote.clone(), Some(credentials));

        let err = session.page(&request(), "").await.unwrap_err();

        assert!(err.is_login_error());
        assert_eq!(err.kind, ErrorKind::Unauthenticated);
        assert!(!session.is_logged_in());
        assert!(session.access_token().is_none());
        assert_eq!(remote.lists.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn flushed_token_logs_in_again() {
        let remote = Arc::new(Counting::default());
        let credentials = Credentials::new("carol", "secret").unwrap();
        let mut session = Session::new(remote.clone(), Some(credentials));

        session.ensure_session().await.unwrap();
        session.flush_token();
        assert!(!session.is_logged_in());

        session.ensure_session().await.unwrap();
        assert!(session.is_logged_in());
        assert_eq!(remote.logins.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_stream_list_has_no_variants() {
        let mut session = Session::new(Arc::new(Counting::default()), None);
        let variants = session.video_streams("vid").await.unwrap();
        assert!(variants.is_empty());
    }

    #[tokio::test]
    async fn unknown_channel_is_not_found() {
        let mut session = Session::new(Arc::new(Counting::default()), None);
        let err = session.related_playlists("UCnobody").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn anonymous_sessions_spawn_no_removal() {
        let session = Session::new(Arc::new(Counting::default()), None);
        assert!(session.spawn_watch_later_removal("vid").is_none());
    }
}
