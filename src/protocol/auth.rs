//! Login response types.
//!
//! # Example Response
//!
//! ```json
//! {
//!     "access_token": "secret_token",
//!     "expires_in": 3600,
//!     "token_type": "Bearer"
//! }
//! ```
//!
//! Failed logins answer with an `error` payload, or with the bare
//! `error`/`error_description` pair some login servers use:
//!
//! ```json
//! { "error": "invalid_grant", "error_description": "Bad <i>credentials</i>" }
//! ```

use std::time::{Duration, SystemTime};

use serde::Deserialize;
use serde_with::{formats::Flexible, serde_as, DurationSeconds};
use veil::Redact;

use super::api::ErrorPayload;
use crate::{
    error::{Error, Result},
    tokens::AccessToken,
};

/// Access token granted by a successful login.
#[serde_as]
#[derive(Clone, Eq, PartialEq, Deserialize, Redact)]
pub struct Login {
    /// Bearer token for API calls
    #[redact]
    #[serde(default)]
    pub access_token: String,

    /// How long the token remains valid
    #[serde_as(as = "Option<DurationSeconds<u64, Flexible>>")]
    #[serde(default)]
    pub expires_in: Option<Duration>,

    #[serde(default)]
    pub error: Option<LoginFailure>,

    #[serde(default)]
    pub error_description: Option<String>,
}

/// Login servers differ in how they report failures.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LoginFailure {
    Payload(ErrorPayload),
    Code(String),
}

impl Login {
    /// Lifetime assumed when the server does not say.
    pub const DEFAULT_TIME_TO_LIVE: Duration = Duration::from_secs(60 * 60);

    /// Converts the response into an [`AccessToken`] that expires relative
    /// to `now`.
    ///
    /// # Errors
    ///
    /// Returns a [`LoginError`](crate::error::LoginError) when the server
    /// reported a failure or granted no token.
    pub fn into_token(self, now: SystemTime) -> Result<AccessToken> {
        let reason = match (self.error, self.error_description) {
            (Some(LoginFailure::Payload(payload)), _) => Some(payload.message),
            (Some(LoginFailure::Code(_)), Some(description)) => Some(description),
            (Some(LoginFailure::Code(code)), None) => Some(code),
            (None, _) => None,
        };
        if let Some(reason) = reason {
            return Err(Error::login(reason));
        }

        if self.access_token.is_empty() {
            return Err(Error::login("no access token granted"));
        }

        let time_to_live = self.expires_in.unwrap_or(Self::DEFAULT_TIME_TO_LIVE);
        let expires_at = now.checked_add(time_to_live).unwrap_or(now);
        Ok(AccessToken::new(self.access_token, expires_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grants_token_with_expiry() {
        let login: Login =
            serde_json::from_str(r#"{ "access_token": "ya29.token", "expires_in": "3599" }"#).unwrap();

        let now = SystemTime::UNIX_EPOCH;
        let token = login.into_token(now).unwrap();
        assert_eq!(token.as_str(), "ya29.token");
        assert_eq!(token.expires_at(), now + Duration::from_secs(3599));
    }

    #[test]
    fn reports_failure_description() {
        let login: Login = serde_json::from_str(
            r#"{ "error": "invalid_grant", "error_description": "Bad credentials" }"#,
        )
        .unwrap();

        let err = login.into_token(SystemTime::now()).unwrap_err();
        assert!(err.is_login_error());
        assert!(err.to_string().contains("Bad credentials"));
    }

    #[test]
    fn reports_failure_payload() {
        let login: Login =
            serde_json::from_str(r#"{ "error": { "code": 401, "message": "Login required" } }"#).unwrap();

        let err = login.into_token(SystemTime::now()).unwrap_err();
        assert!(err.is_login_error());
    }

    #[test]
    fn debug_output_is_redacted() {
        let login: Login = serde_json::from_str(r#"{ "access_token": "ya29.token" }"#).unwrap();
        assert!(!format!("{login:?}").contains("ya29.token"));
    }
}
