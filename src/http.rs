//! HTTP client with rate limiting for the remote catalog API.
//!
//! This module wraps `reqwest::Client` and adds:
//! * Request rate limiting to respect API quotas
//! * Bearer authentication
//! * Consistent timeouts and headers
//!
//! # Rate Limiting
//!
//! * 50 calls per 5-second interval
//! * Allows bursts up to the maximum calls per interval
//! * Requests that would exceed the limit are delayed, never rejected
//!
//! # Example
//!
//! ```ignore
//! use vidcat::http::Client;
//!
//! let client = Client::new(&config)?;
//! let mut request = client.get(url);
//! Client::authorize(&mut request, Some(&token))?;
//! let response = client.execute(request).await?;
//! ```

use std::{future::Future, num::NonZeroU32, time::Duration};

use futures_util::{FutureExt, TryFutureExt};
use governor::{DefaultDirectRateLimiter, Quota};
use reqwest::{
    self,
    header::{HeaderValue, ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE},
    Body, Method, Url,
};

use crate::{config::Config, error::Result, tokens::AccessToken};

/// HTTP client with built-in rate limiting.
pub struct Client {
    /// Only reached through [`Client::execute`].
    unlimited: reqwest::Client,

    rate_limiter: DefaultDirectRateLimiter,
}

impl Client {
    /// The API enforces a rolling window during which a maximum number of
    /// calls can be made.
    const RATE_LIMIT_INTERVAL: Duration = Duration::from_secs(5);

    /// Maximum allowed API calls per interval.
    const RATE_LIMIT_CALLS_PER_INTERVAL: u8 = 50;

    /// Duration to keep idle connections alive.
    const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Duration to wait for individual network reads.
    const READ_TIMEOUT: Duration = Duration::from_secs(10);

    const JSON_CONTENT: HeaderValue = HeaderValue::from_static("application/json");

    const FORM_CONTENT: HeaderValue =
        HeaderValue::from_static("application/x-www-form-urlencoded");

    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    ///
    /// # Panics
    ///
    /// Panics if rate limit parameters are zero.
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(ACCEPT, Self::JSON_CONTENT);

        // Not having `Accept-Language` set is non-fatal.
        if let Ok(lang) = HeaderValue::from_str(&config.app_lang) {
            headers.insert(ACCEPT_LANGUAGE, lang);
        }

        let http_client = reqwest::Client::builder()
            .tcp_keepalive(Self::KEEPALIVE_TIMEOUT)
            .read_timeout(Self::READ_TIMEOUT)
            .default_headers(headers)
            .user_agent(&config.user_agent);

        // Rate limit own requests as to not DoS the remote infrastructure.
        let replenish_interval =
            Self::RATE_LIMIT_INTERVAL / u32::from(Self::RATE_LIMIT_CALLS_PER_INTERVAL);
        let quota = Quota::with_period(replenish_interval)
            .expect("quota time interval is zero")
            .allow_burst(
                NonZeroU32::new(Self::RATE_LIMIT_CALLS_PER_INTERVAL.into())
                    .expect("calls per interval is zero"),
            );

        Ok(Self {
            unlimited: http_client.build()?,
            rate_limiter: governor::RateLimiter::direct(quota),
        })
    }

    /// Builds a request with specified method and URL, without a body.
    #[must_use]
    pub fn request(&self, method: Method, url: Url) -> reqwest::Request {
        reqwest::Request::new(method, url)
    }

    #[must_use]
    pub fn get(&self, url: Url) -> reqwest::Request {
        self.request(Method::GET, url)
    }

    #[must_use]
    pub fn delete(&self, url: Url) -> reqwest::Request {
        self.request(Method::DELETE, url)
    }

    /// Builds a POST request with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns error if `body` cannot be serialized.
    pub fn post_json<T>(&self, url: Url, body: &T) -> Result<reqwest::Request>
    where
        T: serde::Serialize + ?Sized,
    {
        let body = serde_json::to_string(body)?;
        Ok(self.with_body(Method::POST, url, body, Self::JSON_CONTENT))
    }

    /// Builds a POST request with a URL-encoded form body.
    #[must_use]
    pub fn post_form(&self, url: Url, form: &[(&str, &str)]) -> reqwest::Request {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form)
            .finish();
        self.with_body(Method::POST, url, body, Self::FORM_CONTENT)
    }

    fn with_body<T>(
        &self,
        method: Method,
        url: Url,
        body: T,
        content_type: HeaderValue,
    ) -> reqwest::Request
    where
        T: Into<Body>,
    {
        let mut request = self.request(method, url);
        *request.body_mut() = Some(body.into());
        request.headers_mut().insert(CONTENT_TYPE, content_type);
        request
    }

    /// Adds a bearer `Authorization` header when a token is given.
    ///
    /// # Errors
    ///
    /// Returns error if the token is not a valid header value.
    pub fn authorize(request: &mut reqwest::Request, token: Option<&AccessToken>) -> Result<()> {
        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))?;
            value.set_sensitive(true);
            request.headers_mut().try_insert(AUTHORIZATION, value)?;
        }
        Ok(())
    }

    /// Executes a request with rate limiting.
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be sent or no response arrives.
    /// HTTP error statuses are not errors at this level.
    pub fn execute(
        &self,
        request: reqwest::Request,
    ) -> impl Future<Output = Result<reqwest::Response>> + '_ {
        // No need to await with jitter because the level of concurrency is low.
        let throttle = self.rate_limiter.until_ready();
        throttle.then(|()| self.unlimited.execute(request).map_err(Into::into))
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::config::Settings;

    fn client() -> Client {
        Client::new(&Config::new(Settings::default()).unwrap()).unwrap()
    }

    fn url() -> Url {
        "https://catalog.example/v3/subscriptions".parse().unwrap()
    }

    #[test]
    fn form_bodies_are_url_encoded() {
        let request = client().post_form(url(), &[("username", "a b"), ("grant_type", "password")]);

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.headers()[CONTENT_TYPE], Client::FORM_CONTENT);
        assert_eq!(
            request.body().and_then(Body::as_bytes),
            Some(b"username=a+b&grant_type=password".as_slice())
        );
    }

    #[test]
    fn json_bodies_are_typed() {
        let request = client()
            .post_json(url(), &serde_json::json!({ "id": "UCcats" }))
            .unwrap();

        assert_eq!(request.headers()[CONTENT_TYPE], Client::JSON_CONTENT);
        assert_eq!(
            request.body().and_then(Body::as_bytes),
            Some(br#"{"id":"UCcats"}"#.as_slice())
        );
    }

    #[test]
    fn bearer_header_is_sensitive() {
        let client = client();
        let token = AccessToken::new("t0k3n", SystemTime::now());

        let mut anonymous = client.get(url());
        Client::authorize(&mut anonymous, None).unwrap();
        assert!(anonymous.headers().get(AUTHORIZATION).is_none());

        let mut request = client.delete(url());
        Client::authorize(&mut request, Some(&token)).unwrap();
        let value = &request.headers()[AUTHORIZATION];
        assert_eq!(value, "Bearer t0k3n");
        assert!(value.is_sensitive());
    }
}
