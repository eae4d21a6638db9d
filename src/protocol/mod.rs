//! Wire types of the remote video-catalog API.
//!
//! # Submodules
//!
//! * [`api`] - list envelopes, resources and error payloads
//! * [`auth`] - login responses
//! * [`streams`] - playable stream formats of a video
//!
//! Every response may carry an error payload instead of (or next to) its
//! data. Callers turn that payload into a
//! [`RemoteApiError`](crate::error::RemoteApiError) with
//! [`api::check`].

pub mod api;
pub mod auth;
pub mod streams;

use crate::error::Result;
use serde::Deserialize;
use std::fmt::Debug;

/// Parses and logs JSON responses from the remote API.
///
/// # Errors
///
/// Returns error if the body is not valid JSON or does not match `T`.
///
/// # Logging
///
/// * Success: logs parsed structure at TRACE level
/// * Parse error: logs raw JSON at TRACE level if valid JSON
/// * Invalid JSON: logs error and raw text at ERROR level
pub fn json<T>(body: &str, origin: &str) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Debug,
{
    match serde_json::from_str(body) {
        Ok(result) => {
            trace!("{}: {result:#?}", origin);
            Ok(result)
        }
        Err(e) => {
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
                trace!("{}: {json:#?}", origin);
            } else {
                error!("{}: failed parsing response ({e:?})", origin);
                trace!("{body}");
            }
            Err(e.into())
        }
    }
}
