//! Error handling for vidcat.
//!
//! All fallible operations return [`Result`], whose [`struct@Error`] pairs a
//! coarse [`ErrorKind`] (modelled after gRPC status codes) with the boxed
//! underlying error. Domain failures are typed structs carried inside that
//! box and recovered with [`Error::downcast`]:
//!
//! * [`RemoteApiError`] - the remote API answered with an error payload
//! * [`LoginError`] - authentication failed or credentials are invalid
//! * [`NoVariantsError`] - an item has no playable stream variants
//!
//! # Example
//!
//! ```rust
//! use vidcat::error::Error;
//!
//! fn check(error: &Error) {
//!     if error.is_login_error() {
//!         // prompt for credentials
//!     }
//! }
//! ```

#![allow(clippy::enum_glob_use)]

use std::fmt;
use thiserror::Error;

/// Main error type combining error kind and details.
#[derive(Debug)]
pub struct Error {
    /// Classification of the error
    pub kind: ErrorKind,

    /// Details of the underlying error
    pub error: Box<dyn std::error::Error + Send + Sync>,
}

/// Standard result type for vidcat operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories based on gRPC status codes.
///
/// Only the categories this crate can actually produce are listed. Each
/// maps onto an HTTP status code, which is how remote error payloads are
/// classified (see [`ErrorKind::from_status`]).
#[allow(clippy::module_name_repetitions)]
#[derive(Clone, Copy, Debug, Eq, Error, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u32)]
pub enum ErrorKind {
    /// HTTP Mapping: 499 Client Closed Request
    #[error("operation was cancelled")]
    Cancelled = 1,

    /// HTTP Mapping: 500 Internal Server Error
    #[error("unknown error")]
    Unknown = 2,

    /// HTTP Mapping: 400 Bad Request
    #[error("invalid argument specified")]
    InvalidArgument = 3,

    /// HTTP Mapping: 504 Gateway Timeout
    #[error("operation timed out")]
    DeadlineExceeded = 4,

    /// HTTP Mapping: 404 Not Found
    #[error("not found")]
    NotFound = 5,

    /// HTTP Mapping: 403 Forbidden
    #[error("permission denied")]
    PermissionDenied = 7,

    /// HTTP Mapping: 429 Too Many Requests
    #[error("resource has been exhausted")]
    ResourceExhausted = 8,

    /// HTTP Mapping: 400 Bad Request
    #[error("invalid state")]
    FailedPrecondition = 9,

    /// HTTP Mapping: 409 Conflict
    #[error("operation aborted")]
    Aborted = 10,

    /// HTTP Mapping: 500 Internal Server Error
    #[error("internal error")]
    Internal = 13,

    /// HTTP Mapping: 503 Service Unavailable
    #[error("service unavailable")]
    Unavailable = 14,

    /// HTTP Mapping: 500 Internal Server Error
    #[error("unrecoverable data loss or corruption")]
    DataLoss = 15,

    /// HTTP Mapping: 401 Unauthorized
    #[error("no valid authentication credentials")]
    Unauthenticated = 16,
}

impl ErrorKind {
    /// Classifies an HTTP-style status code as returned in remote error
    /// payloads.
    #[must_use]
    pub fn from_status(code: u16) -> Self {
        match code {
            400 => Self::InvalidArgument,
            401 => Self::Unauthenticated,
            403 => Self::PermissionDenied,
            404 => Self::NotFound,
            408 | 504 => Self::DeadlineExceeded,
            409 => Self::Aborted,
            429 => Self::ResourceExhausted,
            499 => Self::Cancelled,
            500..=599 => Self::Unavailable,
            _ => Self::FailedPrecondition,
        }
    }
}

/// An error payload returned by the remote API.
///
/// Never retried by this crate; retry policy belongs to the caller.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Error)]
#[error("remote API error {code}: {message}")]
pub struct RemoteApiError {
    /// Machine-readable status code
    pub code: u16,
    /// Human-readable message, possibly containing markup
    pub message: String,
}

/// Authentication failed or the stored credentials are invalid.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Error)]
#[error("login failed: {0}")]
pub struct LoginError(pub String);

/// The remote API returned no playable stream variants for an item.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Error)]
#[error("no playable stream variants")]
pub struct NoVariantsError;

impl Error {
    /// Creates a new error with specified kind and details.
    pub fn new<E>(kind: ErrorKind, error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind,
            error: error.into(),
        }
    }

    /// Attempts to downcast the underlying error to a concrete type.
    ///
    /// # Example
    /// ```ignore
    /// if let Some(remote) = error.downcast::<RemoteApiError>() {
    ///     println!("remote said {}: {}", remote.code, remote.message);
    /// }
    /// ```
    #[must_use]
    pub fn downcast<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.error.downcast_ref::<E>()
    }

    /// Whether this error means the stored credentials must be re-entered.
    #[must_use]
    pub fn is_login_error(&self) -> bool {
        self.downcast::<LoginError>().is_some()
    }

    /// Creates a login error. Maps to HTTP 401 Unauthorized.
    pub fn login(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthenticated, LoginError(reason.into()))
    }

    /// Wraps a remote error payload, classified by its status code.
    #[must_use]
    pub fn remote(error: RemoteApiError) -> Self {
        Self::new(ErrorKind::from_status(error.code), error)
    }

    /// Creates the error for an empty stream variant list. Maps to HTTP 404.
    #[must_use]
    pub fn no_variants() -> Self {
        Self::new(ErrorKind::NotFound, NoVariantsError)
    }

    /// Maps to HTTP 409 Conflict.
    pub fn aborted<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Aborted, error)
    }

    /// Maps to HTTP 499 Client Closed Request.
    pub fn cancelled<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Cancelled, error)
    }

    /// Maps to HTTP 500 Internal Server Error. Use when a response body was
    /// truncated or corrupted in transit.
    pub fn data_loss<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::DataLoss, error)
    }

    /// Maps to HTTP 504 Gateway Timeout.
    pub fn deadline_exceeded<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::DeadlineExceeded, error)
    }

    /// Maps to HTTP 400 Bad Request. Use when an operation cannot proceed
    /// in the current session state.
    pub fn failed_precondition<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::FailedPrecondition, error)
    }

    /// Maps to HTTP 500 Internal Server Error.
    pub fn internal<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Internal, error)
    }

    /// Maps to HTTP 400 Bad Request. Use for malformed request parameters,
    /// settings or responses.
    pub fn invalid_argument<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::InvalidArgument, error)
    }

    /// Maps to HTTP 404 Not Found.
    pub fn not_found<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::NotFound, error)
    }

    /// Maps to HTTP 403 Forbidden.
    pub fn permission_denied<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::PermissionDenied, error)
    }

    /// Maps to HTTP 429 Too Many Requests.
    pub fn resource_exhausted<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::ResourceExhausted, error)
    }

    /// Maps to HTTP 503 Service Unavailable.
    pub fn unavailable<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Unavailable, error)
    }

    /// Maps to HTTP 500 Internal Server Error. Use when the error doesn't
    /// fit any other category.
    pub fn unknown<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Unknown, error)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.error.source()
    }
}

/// Format: "{kind}: {details}"
impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}: {}", self.kind, self.error)
    }
}

impl From<RemoteApiError> for Error {
    fn from(err: RemoteApiError) -> Self {
        Self::remote(err)
    }
}

impl From<LoginError> for Error {
    fn from(err: LoginError) -> Self {
        Self::new(ErrorKind::Unauthenticated, err)
    }
}

impl From<NoVariantsError> for Error {
    fn from(err: NoVariantsError) -> Self {
        Self::new(ErrorKind::NotFound, err)
    }
}

/// Converts IO errors into appropriate error kinds.
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind::*;
        match err.kind() {
            NotFound => Self::not_found(err),
            PermissionDenied => Self::permission_denied(err),
            AddrNotAvailable | ConnectionRefused | NotConnected => Self::unavailable(err),
            BrokenPipe | ConnectionReset | ConnectionAborted => Self::aborted(err),
            Interrupted | WouldBlock => Self::cancelled(err),
            UnexpectedEof => Self::data_loss(err),
            TimedOut => Self::deadline_exceeded(err),
            InvalidInput | InvalidData => Self::invalid_argument(err),
            _ => Self::unknown(err),
        }
    }
}

/// Converts HTTP client errors into appropriate error kinds.
///
/// A status error carries the HTTP status, which is classified the same
/// way as remote error payloads.
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_body() {
            return Self::data_loss(err);
        }

        if err.is_decode() {
            return Self::invalid_argument(err);
        }

        if err.is_builder() {
            return Self::internal(err);
        }

        if err.is_connect() {
            return Self::unavailable(err);
        }

        if err.is_redirect() {
            return Self::resource_exhausted(err);
        }

        if err.is_timeout() {
            return Self::deadline_exceeded(err);
        }

        if let Some(status) = err.status() {
            return Self::new(ErrorKind::from_status(status.as_u16()), err);
        }

        Self::unknown(err)
    }
}

/// JSON errors are first converted to IO errors, then mapped using the IO
/// error conversion rules.
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        std::io::Error::from(err).into()
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Self::invalid_argument(e.to_string())
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(e: http::header::InvalidHeaderValue) -> Self {
        Self::internal(e.to_string())
    }
}

impl From<http::header::MaxSizeReached> for Error {
    fn from(e: http::header::MaxSizeReached) -> Self {
        Self::resource_exhausted(e.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Self::internal(e.to_string())
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(e: std::num::ParseIntError) -> Self {
        Self::invalid_argument(e.to_string())
    }
}
