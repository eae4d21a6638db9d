//! Request handling for the presentation host.
//!
//! A [`Provider`] owns the [`Session`] and dispatches every [`Request`] to
//! its route. It is the error boundary of the crate: [`Provider::handle`]
//! never fails but turns errors into a [`Response::Notification`], or into
//! [`Response::LoginRequired`] when the credentials were rejected.
//!
//! # Example
//!
//! ```ignore
//! let mut provider = Provider::new(session, settings)?;
//! match provider.handle(&Request::parse("/play/?video_id=dQw4w9WgXcQ")).await {
//!     Response::Play(playback) => println!("{}", playback.stream.url),
//!     other => println!("{other:?}"),
//! }
//! ```

use std::time::Duration;

use regex_lite::Regex;
use tokio::task::JoinHandle;

use crate::{
    cache::ttl,
    catalog::CatalogItem,
    config::Settings,
    error::{Error, ErrorKind, LoginError, RemoteApiError, Result},
    fetcher::ListRequest,
    order::{self, Order},
    remote::{SearchType, MINE},
    router::{Request, Route, Router, SubscriptionMethod},
    session::Session,
    stream::{self, StreamVariant},
};

/// What the host should do with a handled request.
#[derive(Debug)]
pub enum Response {
    /// Entry points to browse from.
    Menu(Vec<MenuEntry>),

    /// One page of items to list.
    Listing {
        items: Vec<CatalogItem>,
        /// Empty when this is the last page.
        next_page_token: String,
    },

    /// Play a single video.
    Play(Playback),

    /// Replace the play queue and start playing at `start`.
    Queue {
        items: Vec<CatalogItem>,
        start: usize,
    },

    /// Nothing to show.
    Done,

    /// Reload the current listing.
    Refresh,

    /// Show a message for `duration`.
    Notification { message: String, duration: Duration },

    /// The credentials were rejected; ask for new ones.
    LoginRequired { message: String },
}

/// A labelled link to another route.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MenuEntry {
    pub label: String,
    pub path: String,
}

impl MenuEntry {
    #[must_use]
    pub fn new(label: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }
}

#[derive(Debug)]
pub struct Playback {
    pub video_id: String,
    pub stream: StreamVariant,

    /// Background removal from the watch-later list, if one was started.
    pub auto_remove: Option<JoinHandle<()>>,
}

pub struct Provider {
    session: Session,
    settings: Settings,
    router: Router,
    markup: Regex,
}

impl Provider {
    /// How long error notifications stay on screen.
    pub const NOTIFICATION_DURATION: Duration = Duration::from_secs(30);

    /// # Errors
    ///
    /// Returns an error if the route table does not compile.
    pub fn new(session: Session, settings: Settings) -> Result<Self> {
        Ok(Self {
            session,
            settings,
            router: Router::new()?,
            markup: Regex::new(r"<[^>]*>").map_err(Error::internal)?,
        })
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub async fn handle(&mut self, request: &Request) -> Response {
        self.handle_with_progress(request, |_, _| {}).await
    }

    /// Like [`Provider::handle`], reporting the progress of resolving a
    /// catalog to `on_progress` as (items so far, declared total).
    pub async fn handle_with_progress<F>(&mut self, request: &Request, on_progress: F) -> Response
    where
        F: FnMut(usize, u64) + Send,
    {
        debug!("handling {request}");
        match self.dispatch(request, on_progress).await {
            Ok(response) => response,
            Err(e) => self.on_error(&e),
        }
    }

    async fn dispatch<F>(&mut self, request: &Request, on_progress: F) -> Result<Response>
    where
        F: FnMut(usize, u64) + Send,
    {
        match self.router.route(request.path())? {
            Route::Root => self.root().await,
            Route::ChannelPlaylist { playlist_id, .. } => {
                let list = ListRequest::PlaylistItems { playlist_id };
                self.listing(&list, request, Some(ttl::ONE_DAY)).await
            }
            Route::ChannelPlaylists { channel_id } => {
                let list = ListRequest::Playlists { channel_id };
                self.listing(&list, request, Some(ttl::ONE_HOUR)).await
            }
            Route::Channel { channel_id } => {
                let related = self.session.related_playlists(&channel_id).await?;
                match related.uploads {
                    Some(playlist_id) => {
                        let list = ListRequest::PlaylistItems { playlist_id };
                        self.listing(&list, request, Some(ttl::FIVE_MINUTES)).await
                    }
                    None => Ok(Response::Listing {
                        items: Vec::new(),
                        next_page_token: String::new(),
                    }),
                }
            }
            Route::Play => self.play(request, on_progress).await,
            Route::Subscription {
                method,
                subscription_id,
            } => match method {
                SubscriptionMethod::Add => {
                    self.session.subscribe(&subscription_id).await?;
                    Ok(Response::Done)
                }
                SubscriptionMethod::Remove => {
                    self.session.unsubscribe(&subscription_id).await?;
                    Ok(Response::Refresh)
                }
            },
            Route::Subscriptions => self.listing(&ListRequest::Subscriptions, request, None).await,
            Route::MySubscriptions => {
                self.listing(&ListRequest::SubscriptionUploads, request, None)
                    .await
            }
            Route::Search => {
                let query = required(request, "q")?;
                let search_type = request
                    .param("search_type")
                    .map(str::parse::<SearchType>)
                    .transpose()?
                    .unwrap_or_default();
                let list = ListRequest::Search {
                    query: query.to_owned(),
                    search_type,
                };
                self.listing(&list, request, Some(ttl::TEN_MINUTES)).await
            }
            Route::AutoRemoveWatchLater => {
                let video_id = required(request, "video_id")?;
                self.session.remove_from_watch_later(video_id).await?;
                Ok(Response::Done)
            }
        }
    }

    /// The entry menu. Search is always offered; the account's own listings
    /// and system playlists only with a live session. The host asks for the
    /// `q` parameter before following the search entry.
    async fn root(&mut self) -> Result<Response> {
        self.session.ensure_session().await?;
        let logged_in = self.session.is_logged_in();

        let mut entries = Vec::new();
        if logged_in {
            entries.push(MenuEntry::new("My subscriptions", "/my_subscriptions/"));
        }
        entries.push(MenuEntry::new("Search", "/search/"));

        if logged_in {
            let playlists = self.session.related_playlists(MINE).await?;
            entries.push(MenuEntry::new("My channel", format!("/channel/{MINE}/")));

            let system = [
                ("Watch later", playlists.watch_later),
                ("Liked videos", playlists.likes),
                ("History", playlists.watch_history),
            ];
            for (label, playlist_id) in system {
                if let Some(playlist_id) = playlist_id {
                    entries.push(MenuEntry::new(
                        label,
                        format!("/channel/{MINE}/playlist/{playlist_id}/"),
                    ));
                }
            }

            entries.push(MenuEntry::new("Playlists", format!("/channel/{MINE}/playlists/")));
            entries.push(MenuEntry::new("Subscriptions", "/subscriptions/"));
        }

        Ok(Response::Menu(entries))
    }

    /// One page of `list` at the request's `page_token`, cached for `ttl`
    /// if given.
    async fn listing(
        &mut self,
        list: &ListRequest,
        request: &Request,
        ttl: Option<Duration>,
    ) -> Result<Response> {
        let page_token = request.param("page_token").unwrap_or_default();
        let page = match ttl {
            Some(ttl) => self.session.cached_page(list, page_token, ttl).await?,
            None => self.session.page(list, page_token).await?,
        };

        Ok(Response::Listing {
            items: page.items,
            next_page_token: page.next_page_token,
        })
    }

    async fn play<F>(&mut self, request: &Request, on_progress: F) -> Result<Response>
    where
        F: FnMut(usize, u64) + Send,
    {
        if let Some(playlist_id) = request.param("playlist_id") {
            let order = request
                .param("order")
                .map(str::parse::<Order>)
                .transpose()?
                .unwrap_or(self.settings.order);
            let list = ListRequest::PlaylistItems {
                playlist_id: playlist_id.to_owned(),
            };

            let items = self
                .session
                .resolve_catalog(&list, request.param("video_id"), on_progress)
                .await?;
            debug!("queueing {} items of {playlist_id} in {order} order", items.len());

            return Ok(Response::Queue {
                items: order::apply(items, order),
                start: 0,
            });
        }

        let video_id = required(request, "video_id")?;
        let variants = self.session.video_streams(video_id).await?;
        let stream = stream::select(&variants, self.settings.video_quality.height())?.clone();
        debug!("playing {video_id} at {}p", stream.height);

        let auto_remove = if self.settings.auto_remove_watch_later {
            self.session.spawn_watch_later_removal(video_id)
        } else {
            None
        };

        Ok(Response::Play(Playback {
            video_id: video_id.to_owned(),
            stream,
            auto_remove,
        }))
    }

    fn on_error(&mut self, e: &Error) -> Response {
        if e.kind == ErrorKind::Unauthenticated {
            self.session.flush_token();
        }

        let message = if let Some(remote) = e.downcast::<RemoteApiError>() {
            remote.message.clone()
        } else if let Some(login) = e.downcast::<LoginError>() {
            login.to_string()
        } else {
            e.to_string()
        };
        let message = self.strip_markup(&message);

        if e.is_login_error() {
            warn!("{message}");
            return Response::LoginRequired { message };
        }

        error!("{e}");
        Response::Notification {
            message,
            duration: Self::NOTIFICATION_DURATION,
        }
    }

    /// Removes HTML tags from remote error messages.
    fn strip_markup(&self, message: &str) -> String {
        self.markup.replace_all(message, "").trim().to_owned()
    }
}

fn required<'a>(request: &'a Request, key: &str) -> Result<&'a str> {
    request
        .param(key)
        .ok_or_else(|| Error::invalid_argument(format!("{} requires {key}", request.path())))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::{
        protocol::{
            api::{Ack, ChannelsResponse, ErrorPayload, ListResponse},
            streams::StreamsResponse,
        },
        remote::RemoteApi,
        tokens::AccessToken,
    };

    /// Fails every call with the same remote error.
    struct Failing(ErrorPayload);

    impl Failing {
        fn list(&self) -> ListResponse {
            ListResponse {
                error: Some(self.0.clone()),
                ..ListResponse::default()
            }
        }
    }

    #[async_trait]
    impl RemoteApi for Failing {
        async fn authenticate(&self, _username: &str, _password: &str) -> Result<AccessToken> {
            Err(Error::login("Invalid <b>password</b>"))
        }

        async fn list_playlist_items(
            &self,
            _auth: Option<&AccessToken>,
            _playlist_id: &str,
            _page_token: &str,
        ) -> Result<ListResponse> {
            Ok(self.list())
        }

        async fn list_playlists(
            &self,
            _auth: Option<&AccessToken>,
            _channel_id: &str,
            _page_token: &str,
        ) -> Result<ListResponse> {
            Ok(self.list())
        }

        async fn search(
            &self,
            _auth: Option<&AccessToken>,
            _query: &str,
            _search_type: SearchType,
            _page_token: &str,
        ) -> Result<ListResponse> {
            Ok(self.list())
        }

        async fn list_subscriptions(
            &self,
            _auth: Option<&AccessToken>,
            _page_token: &str,
        ) -> Result<ListResponse> {
            Ok(self.list())
        }

        async fn subscription_uploads(&self, _auth: Option<&AccessToken>) -> Result<ListResponse> {
            Ok(self.list())
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
            Ok(ChannelsResponse {
                error: Some(self.0.clone()),
                ..ChannelsResponse::default()
            })
        }

        async fn subscribe(&self, _auth: Option<&AccessToken>, _channel_id: &str) -> Result<Ack> {
            Ok(Ack {
                error: Some(self.0.clone()),
            })
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

    fn provider() -> Provider {
        let remote = Arc::new(Failing(ErrorPayload {
            code: 404,
            message: "Playlist <i>PL123</i> not found".to_owned(),
        }));
        Provider::new(Session::new(remote, None), Settings::default()).unwrap()
    }

    fn notification(response: Response) -> String {
        match response {
            Response::Notification { message, duration } => {
                assert_eq!(duration, Provider::NOTIFICATION_DURATION);
                message
            }
            other => panic!("expected a notification, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn remote_errors_become_notifications_without_markup() {
        let mut provider = provider();

        let response = provider
            .handle(&Request::parse("/channel/UCcats/playlist/PL123/"))
            .await;

        assert_eq!(notification(response), "Playlist PL123 not found");
    }

    #[tokio::test]
    async fn unknown_routes_become_notifications() {
        let mut provider = provider();
        let message = notification(provider.handle(&Request::parse("/nowhere/")).await);
        assert!(message.contains("/nowhere/"));
    }

    #[tokio::test]
    async fn missing_parameters_become_notifications() {
        let mut provider = provider();

        let message = notification(provider.handle(&Request::parse("/search/?q=")).await);
        assert!(message.contains("requires q"));

        let message = notification(provider.handle(&Request::parse("/play/")).await);
        assert!(message.contains("requires video_id"));
    }

    #[tokio::test]
    async fn no_variants_become_notifications() {
        let mut provider = provider();
        let message = notification(provider.handle(&Request::parse("/play/?video_id=v1")).await);
        assert!(message.contains("no playable stream variants"));
    }

    #[tokio::test]
    async fn rejected_credentials_require_login() {
        let mut provider = provider();
        provider
            .session_mut()
            .set_credentials(Some(crate::credentials::Credentials::new("eve", "guess").unwrap()));

        match provider.handle(&Request::parse("/subscriptions/")).await {
            Response::LoginRequired { message } => {
                assert_eq!(message, "login failed: Invalid password");
            }
            other => panic!("expected login prompt, got {other:?}"),
        }
        assert!(provider.session().access_token().is_none());
    }

    #[tokio::test]
    async fn anonymous_root_offers_search() {
        let mut provider = provider();

        match provider.handle(&Request::parse("/")).await {
            Response::Menu(entries) => {
                assert_eq!(entries, vec![MenuEntry::new("Search", "/search/")]);
            }
            other => panic!("expected a menu, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unsubscribing_refreshes() {
        let mut provider = provider();
        let response = provider
            .handle(&Request::parse("/subscription/remove/sub42/"))
            .await;
        assert!(matches!(response, Response::Refresh));
    }
}
