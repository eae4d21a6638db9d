//! Login credentials.
//!
//! Credentials are read from a small TOML secrets file:
//!
//! ```toml
//! username = "someone@example.com"
//! password = "hunter2"
//! ```
//!
//! Keep that file private: it grants full access to the account.

use std::{fs, path::Path};

use serde::Deserialize;
use veil::Redact;

use crate::error::{Error, Result};

#[derive(Clone, PartialEq, Eq, Hash, Deserialize, Redact)]
pub struct Credentials {
    username: String,
    #[redact]
    password: String,
}

impl Credentials {
    /// Secrets files are tiny; anything larger is not a secrets file.
    const MAX_FILE_SIZE: u64 = 1024;

    /// # Errors
    ///
    /// Returns an error if either field is empty.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let credentials = Self {
            username: username.into(),
            password: password.into(),
        };
        credentials.validate()?;
        Ok(credentials)
    }

    /// Loads credentials from a TOML secrets file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is too large, is not
    /// valid TOML or lacks a username or password.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Prevent out-of-memory condition: the file should be small.
        let file_size = fs::metadata(path)?.len();
        if file_size > Self::MAX_FILE_SIZE {
            return Err(Error::invalid_argument(format!(
                "{} is too large",
                path.display()
            )));
        }

        let contents = fs::read_to_string(path)?;
        let credentials: Self = toml::from_str(&contents).map_err(|e| {
            Error::invalid_argument(format!("{} format is invalid: {e}", path.display()))
        })?;
        credentials.validate()?;

        Ok(credentials)
    }

    fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            return Err(Error::invalid_argument("username is empty"));
        }
        if self.password.is_empty() {
            return Err(Error::invalid_argument("password is empty"));
        }
        Ok(())
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}
