//! Stream variant selection.
//!
//! An item is usually playable in several mutually exclusive encodings. The
//! variant closest to the preferred [`VideoQuality`] is chosen:
//!
//! * the smallest distance between target and variant height wins
//! * at equal distance, a variant at or above the target beats one below it
//! * remaining ties go to the variant listed first
//!
//! # Example
//!
//! ```rust
//! use vidcat::stream::{select, StreamVariant};
//!
//! let variants = vec![
//!     StreamVariant::new("https://cdn.example/360.mp4".parse()?, 360),
//!     StreamVariant::new("https://cdn.example/720.mp4".parse()?, 720),
//! ];
//! let best = select(&variants, 700)?;
//! assert_eq!(best.height, 720);
//! # Ok::<(), vidcat::error::Error>(())
//! ```

use std::{cmp::Ordering, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// A playable URL and its vertical resolution.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize)]
pub struct StreamVariant {
    pub url: Url,
    pub height: u32,
}

impl StreamVariant {
    #[must_use]
    pub fn new(url: Url, height: u32) -> Self {
        Self { url, height }
    }
}

/// Preferred video quality as a target height in pixels.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum VideoQuality {
    Low,
    Standard,
    Medium,
    #[default]
    High,
    Full,
}

impl VideoQuality {
    /// Target height in pixels.
    #[must_use]
    pub fn height(self) -> u32 {
        match self {
            Self::Low => 240,
            Self::Standard => 360,
            Self::Medium => 480,
            Self::High => 720,
            Self::Full => 1080,
        }
    }
}

impl fmt::Display for VideoQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}p", self.height())
    }
}

impl FromStr for VideoQuality {
    type Err = Error;

    /// Accepts either the height (`720`) or the height with suffix (`720p`).
    fn from_str(s: &str) -> Result<Self> {
        let height: u32 = s.trim().trim_end_matches(['p', 'P']).parse()?;
        match height {
            240 => Ok(Self::Low),
            360 => Ok(Self::Standard),
            480 => Ok(Self::Medium),
            720 => Ok(Self::High),
            1080 => Ok(Self::Full),
            _ => Err(Error::invalid_argument(format!(
                "unsupported video quality: {s}"
            ))),
        }
    }
}

impl TryFrom<String> for VideoQuality {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<VideoQuality> for String {
    fn from(quality: VideoQuality) -> Self {
        quality.to_string()
    }
}

/// Orders two variants by how well they fit `target_height`.
///
/// `Ordering::Less` means `a` is the better fit. Variants that fit equally
/// well compare `Equal`, so stable consumers keep input order.
#[must_use]
pub fn compare_fit(a: &StreamVariant, b: &StreamVariant, target_height: u32) -> Ordering {
    fit_score(a.height, target_height).cmp(&fit_score(b.height, target_height))
}

/// Distance from the target, then whether the variant falls short of it.
fn fit_score(height: u32, target_height: u32) -> (u32, bool) {
    (height.abs_diff(target_height), height < target_height)
}

/// Picks the variant that best fits `target_height`.
///
/// # Errors
///
/// Returns a [`NoVariantsError`](crate::error::NoVariantsError) when
/// `variants` is empty.
pub fn select(variants: &[StreamVariant], target_height: u32) -> Result<&StreamVariant> {
    // `min_by` returns the first of several equal minima.
    variants
        .iter()
        .min_by(|a, b| compare_fit(a, b, target_height))
        .ok_or_else(Error::no_variants)
}
