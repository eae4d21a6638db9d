//! HTTP implementation of the remote video-catalog API.
//!
//! The [`Gateway`] speaks a v3-style REST API: list endpoints return the
//! envelope described in [`protocol::api`](crate::protocol::api), mutating
//! endpoints return an empty body on success, and failures return an
//! `{ "error": { "code", "message" } }` payload with a non-success status.
//!
//! All requests share one rate-limited [`HttpClient`]. Anonymous requests
//! identify the application with the configured API key; authenticated ones
//! add a bearer token as well.

use std::{fmt::Debug, time::SystemTime};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use crate::{
    config::Config,
    error::{Error, RemoteApiError, Result},
    http::Client as HttpClient,
    protocol::{
        self,
        api::{self, Ack, ChannelsResponse, ListResponse, ResourceId},
        auth::Login,
        streams::StreamsResponse,
    },
    remote::{RemoteApi, SearchType, MINE},
    tokens::AccessToken,
};

pub struct Gateway {
    http_client: HttpClient,
    api_url: Url,
    auth_url: Url,
    api_key: Option<String>,
    items_per_page: String,
}

impl Gateway {
    /// Resource namespace of the kinds the API expects in request bodies.
    const KIND_NAMESPACE: &'static str = "youtube";

    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        let settings = &config.settings;
        Ok(Self {
            http_client: HttpClient::new(config)?,
            api_url: settings.api_url.clone(),
            auth_url: settings.auth_url.clone(),
            api_key: settings.api_key.clone(),
            items_per_page: settings.items_per_page.to_string(),
        })
    }

    /// Builds the URL of `endpoint` with `params`, the page token if any and
    /// the API key.
    fn url(&self, endpoint: &str, params: &[(&str, &str)], page_token: &str) -> Result<Url> {
        let mut url = self.api_url.join(endpoint)?;
        {
            let mut query = url.query_pairs_mut();
            query.extend_pairs(params);
            if !page_token.is_empty() {
                query.append_pair("pageToken", page_token);
            }
            if let Some(key) = &self.api_key {
                query.append_pair("key", key);
            }
        }
        Ok(url)
    }

    /// Sends `request` and parses the response body.
    ///
    /// An empty body on success parses as `T::default()`. A non-success
    /// status is returned as a [`RemoteApiError`], from the error payload if
    /// the body holds one.
    async fn send<T>(
        &self,
        mut request: reqwest::Request,
        auth: Option<&AccessToken>,
        origin: &str,
    ) -> Result<T>
    where
        T: Default + Debug + for<'de> Deserialize<'de>,
    {
        HttpClient::authorize(&mut request, auth)?;
        let response = self.http_client.execute(request).await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let payload = serde_json::from_str::<Ack>(&body)
                .ok()
                .and_then(|ack| ack.error);
            return Err(match payload {
                Some(payload) => Error::remote(payload.into()),
                None => Error::remote(status_error(status)),
            });
        }

        if body.trim().is_empty() {
            trace!("{origin}: (empty)");
            return Ok(T::default());
        }

        protocol::json(&body, origin)
    }

    async fn list(
        &self,
        auth: Option<&AccessToken>,
        endpoint: &str,
        params: &[(&str, &str)],
        page_token: &str,
    ) -> Result<ListResponse> {
        let mut params = params.to_vec();
        params.push(("maxResults", self.items_per_page.as_str()));

        let url = self.url(endpoint, &params, page_token)?;
        self.send(self.http_client.get(url), auth, endpoint).await
    }

    /// The `id` or `mine` parameter selecting a channel.
    fn channel_param(channel_id: &str) -> (&'static str, &str) {
        if channel_id == MINE {
            ("mine", "true")
        } else {
            ("channelId", channel_id)
        }
    }
}

fn status_error(status: StatusCode) -> RemoteApiError {
    RemoteApiError {
        code: status.as_u16(),
        message: status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_owned(),
    }
}

#[async_trait]
impl RemoteApi for Gateway {
    async fn authenticate(&self, username: &str, password: &str) -> Result<AccessToken> {
        let request = self.http_client.post_form(
            self.auth_url.clone(),
            &[
                ("grant_type", "password"),
                ("username", username),
                ("password", password),
            ],
        );

        let response = self.http_client.execute(request).await?;
        let status = response.status();
        let body = response.text().await?;

        // Never log the body: it holds the token.
        let login: Login = serde_json::from_str(&body)
            .map_err(|e| Error::login(format!("{status}: unreadable response ({e})")))?;
        trace!("authenticate: {login:?}");

        login.into_token(SystemTime::now())
    }

    async fn list_playlist_items(
        &self,
        auth: Option<&AccessToken>,
        playlist_id: &str,
        page_token: &str,
    ) -> Result<ListResponse> {
        self.list(
            auth,
            "playlistItems",
            &[("part", "snippet"), ("playlistId", playlist_id)],
            page_token,
        )
        .await
    }

    async fn list_playlists(
        &self,
        auth: Option<&AccessToken>,
        channel_id: &str,
        page_token: &str,
    ) -> Result<ListResponse> {
        self.list(
            auth,
            "playlists",
            &[("part", "snippet"), Self::channel_param(channel_id)],
            page_token,
        )
        .await
    }

    async fn search(
        &self,
        auth: Option<&AccessToken>,
        query: &str,
        search_type: SearchType,
        page_token: &str,
    ) -> Result<ListResponse> {
        let search_type = search_type.to_string();
        self.list(
            auth,
            "search",
            &[("part", "snippet"), ("q", query), ("type", search_type.as_str())],
            page_token,
        )
        .await
    }

    async fn list_subscriptions(
        &self,
        auth: Option<&AccessToken>,
        page_token: &str,
    ) -> Result<ListResponse> {
        self.list(
            auth,
            "subscriptions",
            &[("part", "snippet"), ("mine", "true")],
            page_token,
        )
        .await
    }

    async fn subscription_uploads(&self, auth: Option<&AccessToken>) -> Result<ListResponse> {
        self.list(
            auth,
            "activities",
            &[("part", "snippet,contentDetails"), ("home", "true")],
            "",
        )
        .await
    }

    async fn video_streams(
        &self,
        auth: Option<&AccessToken>,
        video_id: &str,
    ) -> Result<StreamsResponse> {
        let url = self.url("videos/streams", &[("id", video_id)], "")?;
        self.send(self.http_client.get(url), auth, "videos/streams")
            .await
    }

    async fn related_playlists(
        &self,
        auth: Option<&AccessToken>,
        channel_id: &str,
    ) -> Result<ChannelsResponse> {
        let selector = if channel_id == MINE {
            ("mine", "true")
        } else {
            ("id", channel_id)
        };
        let url = self.url("channels", &[("part", "contentDetails"), selector], "")?;
        self.send(self.http_client.get(url), auth, "channels").await
    }

    async fn subscribe(&self, auth: Option<&AccessToken>, channel_id: &str) -> Result<Ack> {
        let url = self.url("subscriptions", &[("part", "snippet")], "")?;
        let body = json!({
            "snippet": {
                "resourceId": {
                    "kind": format!("{}#channel", Self::KIND_NAMESPACE),
                    "channelId": channel_id,
                }
            }
        });

        let request = self.http_client.post_json(url, &body)?;
        self.send(request, auth, "subscriptions.insert").await
    }

    async fn unsubscribe(&self, auth: Option<&AccessToken>, subscription_id: &str) -> Result<Ack> {
        let url = self.url("subscriptions", &[("id", subscription_id)], "")?;
        self.send(self.http_client.delete(url), auth, "subscriptions.delete")
            .await
    }

    async fn remove_from_playlist(
        &self,
        auth: Option<&AccessToken>,
        playlist_id: &str,
        video_id: &str,
    ) -> Result<Ack> {
        // Deletion is by playlist item, so look up the entries of the video
        // first.
        let entries = self
            .list(
                auth,
                "playlistItems",
                &[
                    ("part", "id"),
                    ("playlistId", playlist_id),
                    ("videoId", video_id),
                ],
                "",
            )
            .await?;
        api::check(entries.error)?;

        for entry in entries.items {
            let ResourceId::Plain(item_id) = entry.id else {
                continue;
            };

            let url = self.url("playlistItems", &[("id", item_id.as_str())], "")?;
            let ack: Ack = self
                .send(self.http_client.delete(url), auth, "playlistItems.delete")
                .await?;
            api::check(ack.error)?;
            debug!("removed {video_id} ({item_id}) from {playlist_id}");
        }

        Ok(Ack::default())
    }
}
