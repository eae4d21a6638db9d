//! Application identity and user settings.
//!
//! [`Settings`] are read from an optional TOML file; every field has a
//! default so an empty or missing file is valid:
//!
//! ```toml
//! video_quality = "720p"
//! items_per_page = 50
//! order = "default"
//! auto_remove_watch_later = true
//! api_url = "https://catalog.example/v3/"
//! auth_url = "https://catalog.example/oauth2/token"
//! api_key = "..."
//! ```

use std::{fs, path::Path};

use serde::Deserialize;
use url::Url;

use crate::{
    error::{Error, Result},
    order::Order,
    stream::VideoQuality,
};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Target height for stream selection.
    pub video_quality: VideoQuality,

    /// Page size requested from the remote API.
    pub items_per_page: u32,

    /// Order used when a playback request does not name one.
    pub order: Order,

    /// Remove a video from the watch-later list once it starts playing.
    pub auto_remove_watch_later: bool,

    pub api_url: Url,
    pub auth_url: Url,
    pub api_key: Option<String>,
}

impl Settings {
    const DEFAULT_API_URL: &'static str = "https://www.googleapis.com/youtube/v3/";
    const DEFAULT_AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/token";

    /// Upper bound the remote API accepts for page sizes.
    pub const MAX_ITEMS_PER_PAGE: u32 = 50;

    /// Loads settings from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or holds invalid values.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let settings: Self = toml::from_str(&contents)?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.items_per_page == 0 || self.items_per_page > Self::MAX_ITEMS_PER_PAGE {
            return Err(Error::invalid_argument(format!(
                "items per page must be between 1 and {}",
                Self::MAX_ITEMS_PER_PAGE
            )));
        }
        if self.api_url.cannot_be_a_base() {
            return Err(Error::invalid_argument(format!(
                "api url {} cannot be a base",
                self.api_url
            )));
        }
        Ok(())
    }
}

impl Default for Settings {
    /// # Panics
    ///
    /// Panics if the built-in URLs are invalid.
    fn default() -> Self {
        Self {
            video_quality: VideoQuality::default(),
            items_per_page: Self::MAX_ITEMS_PER_PAGE,
            order: Order::default(),
            auto_remove_watch_later: true,
            api_url: Url::parse(Self::DEFAULT_API_URL).expect("invalid default api url"),
            auth_url: Url::parse(Self::DEFAULT_AUTH_URL).expect("invalid default auth url"),
            api_key: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub app_name: String,
    pub app_version: String,
    pub app_lang: String,

    pub user_agent: String,

    pub settings: Settings,
}

impl Config {
    /// Builds the configuration, deriving the `User-Agent` from the
    /// application and operating system.
    ///
    /// # Errors
    ///
    /// Returns an error if the application or OS identity contains
    /// characters that are illegal in a `User-Agent`.
    pub fn new(settings: Settings) -> Result<Self> {
        let app_name = env!("CARGO_PKG_NAME").to_owned();
        let app_version = env!("CARGO_PKG_VERSION").to_owned();
        let app_lang = "en".to_owned();

        // Additional `User-Agent` string checks on top of `reqwest::HeaderValue`.
        let illegal_chars = |chr| chr == '/' || chr == ';';
        if app_name.is_empty()
            || app_name.contains(illegal_chars)
            || app_version.is_empty()
            || app_version.contains(illegal_chars)
            || app_lang.chars().count() != 2
            || app_lang.contains(illegal_chars)
        {
            return Err(Error::invalid_argument(format!(
                "application name, version and/or language invalid (\"{app_name}\"; \"{app_version}\"; \"{app_lang}\")"
            )));
        }

        let os_name = match std::env::consts::OS {
            "macos" => "osx",
            other => other,
        };
        let os_version = sysinfo::System::os_version().unwrap_or_else(|| String::from("0"));
        if os_name.is_empty()
            || os_name.contains(illegal_chars)
            || os_version.is_empty()
            || os_version.contains(illegal_chars)
        {
            return Err(Error::invalid_argument(format!(
                "os name and/or version invalid (\"{os_name}\"; \"{os_version}\")"
            )));
        }

        let user_agent =
            format!("{app_name}/{app_version} (Rust; {os_name}/{os_version}; Desktop; {app_lang})");
        trace!("user agent: {user_agent}");

        Ok(Self {
            app_name,
            app_version,
            app_lang,
            user_agent,
            settings,
        })
    }
}
