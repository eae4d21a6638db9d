//! Playable stream formats of a video.
//!
//! # Wire Format
//!
//! ```json
//! {
//!     "streams": [
//!         { "url": "https://cdn.example/v/360.mp4", "format": { "height": 360 } },
//!         { "url": "https://cdn.example/v/720.mp4", "format": { "height": "720" } }
//!     ]
//! }
//! ```

use serde::Deserialize;
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use url::Url;

use super::api::ErrorPayload;
use crate::stream::StreamVariant;

#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
pub struct StreamsResponse {
    #[serde(default)]
    pub streams: Vec<StreamFormat>,
    #[serde(default)]
    pub error: Option<ErrorPayload>,
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
pub struct StreamFormat {
    pub url: Url,
    pub format: Format,
}

/// Some servers send the height as a string.
#[serde_as]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Deserialize)]
pub struct Format {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub height: u32,
}

impl From<StreamFormat> for StreamVariant {
    fn from(format: StreamFormat) -> Self {
        Self::new(format.url, format.format.height)
    }
}

impl StreamsResponse {
    /// Stream variants in the order the server listed them.
    #[must_use]
    pub fn into_variants(self) -> Vec<StreamVariant> {
        self.streams.into_iter().map(Into::into).collect()
    }
}
