//! Route table mapping host paths onto handlers.
//!
//! | path                                          | route                         |
//! |-----------------------------------------------|-------------------------------|
//! | `/`                                           | [`Route::Root`]               |
//! | `/channel/{channel_id}/playlist/{playlist_id}/` | [`Route::ChannelPlaylist`]  |
//! | `/channel/{channel_id}/playlists/`            | [`Route::ChannelPlaylists`]   |
//! | `/channel/{channel_id}/`                      | [`Route::Channel`]            |
//! | `/play/`                                      | [`Route::Play`]               |
//! | `/subscription/{add,remove}/{id}/`            | [`Route::Subscription`]       |
//! | `/subscriptions/`                             | [`Route::Subscriptions`]      |
//! | `/my_subscriptions/`                          | [`Route::MySubscriptions`]    |
//! | `/search/`                                    | [`Route::Search`]             |
//! | `/internal/auto_remove_watch_later/`          | [`Route::AutoRemoveWatchLater`] |
//!
//! Patterns are tried in table order and compiled once by [`Router::new`].

use std::{collections::HashMap, fmt};

use regex_lite::{Captures, Regex};

use crate::error::{Error, Result};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum SubscriptionMethod {
    Add,
    Remove,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum Route {
    Root,
    ChannelPlaylist {
        channel_id: String,
        playlist_id: String,
    },
    ChannelPlaylists {
        channel_id: String,
    },
    Channel {
        channel_id: String,
    },
    Play,
    Subscription {
        method: SubscriptionMethod,
        subscription_id: String,
    },
    Subscriptions,
    MySubscriptions,
    Search,
    AutoRemoveWatchLater,
}

/// Which route a pattern of the table produces.
#[derive(Copy, Clone, Debug)]
enum Target {
    Root,
    ChannelPlaylist,
    ChannelPlaylists,
    Channel,
    Play,
    Subscription,
    Subscriptions,
    MySubscriptions,
    Search,
    AutoRemoveWatchLater,
}

pub struct Router {
    routes: Vec<(Regex, Target)>,
}

fn capture(captures: &Captures<'_>, name: &str) -> String {
    captures
        .name(name)
        .map(|m| m.as_str().to_owned())
        .unwrap_or_default()
}

impl Target {
    fn build(self, captures: &Captures<'_>) -> Route {
        match self {
            Self::Root => Route::Root,
            Self::ChannelPlaylist => Route::ChannelPlaylist {
                channel_id: capture(captures, "channel_id"),
                playlist_id: capture(captures, "playlist_id"),
            },
            Self::ChannelPlaylists => Route::ChannelPlaylists {
                channel_id: capture(captures, "channel_id"),
            },
            Self::Channel => Route::Channel {
                channel_id: capture(captures, "channel_id"),
            },
            Self::Play => Route::Play,
            Self::Subscription => Route::Subscription {
                method: if capture(captures, "method") == "add" {
                    SubscriptionMethod::Add
                } else {
                    SubscriptionMethod::Remove
                },
                subscription_id: capture(captures, "subscription_id"),
            },
            Self::Subscriptions => Route::Subscriptions,
            Self::MySubscriptions => Route::MySubscriptions,
            Self::Search => Route::Search,
            Self::AutoRemoveWatchLater => Route::AutoRemoveWatchLater,
        }
    }
}

impl Router {
    const ROUTES: [(&'static str, Target); 10] = [
        (r"^/?$", Target::Root),
        (
            r"^/channel/(?P<channel_id>[^/]+)/playlist/(?P<playlist_id>[^/]+)/$",
            Target::ChannelPlaylist,
        ),
        (
            r"^/channel/(?P<channel_id>[^/]+)/playlists/$",
            Target::ChannelPlaylists,
        ),
        (r"^/channel/(?P<channel_id>[^/]+)/$", Target::Channel),
        (r"^/play/$", Target::Play),
        (
            r"^/subscription/(?P<method>add|remove)/(?P<subscription_id>[^/]+)/$",
            Target::Subscription,
        ),
        (r"^/subscriptions/$", Target::Subscriptions),
        (r"^/my_subscriptions/$", Target::MySubscriptions),
        (r"^/search/$", Target::Search),
        (
            r"^/internal/auto_remove_watch_later/$",
            Target::AutoRemoveWatchLater,
        ),
    ];

    /// Compiles the route table.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern does not compile.
    pub fn new() -> Result<Self> {
        let routes = Self::ROUTES
            .iter()
            .map(|&(pattern, target)| {
                Regex::new(pattern)
                    .map(|regex| (regex, target))
                    .map_err(Error::internal)
            })
            .collect::<Result<_>>()?;

        Ok(Self { routes })
    }

    /// The first route whose pattern matches `path`.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when no pattern matches.
    pub fn route(&self, path: &str) -> Result<Route> {
        self.routes
            .iter()
            .find_map(|(regex, target)| {
                regex
                    .captures(path)
                    .map(|captures| target.build(&captures))
            })
            .ok_or_else(|| Error::not_found(format!("no route for {path}")))
    }
}

/// A host request: a path plus query parameters.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Request {
    path: String,
    params: HashMap<String, String>,
}

impl Request {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: HashMap::new(),
        }
    }

    /// Splits `uri` into path and percent-decoded query parameters.
    #[must_use]
    pub fn parse(uri: &str) -> Self {
        let (path, query) = uri.split_once('?').unwrap_or((uri, ""));
        Self {
            path: path.to_owned(),
            params: url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        }
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// A query parameter. Empty values count as absent.
    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.params.is_empty() {
            return write!(f, "{}", self.path);
        }

        let mut params: Vec<_> = self.params.iter().collect();
        params.sort_unstable();
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(params)
            .finish();
        write!(f, "{}?{query}", self.path)
    }
}
