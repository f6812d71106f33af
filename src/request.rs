//! Wire types for inbound screenshot requests.
//!
//! Requests arrive from the host wrapped in a `{ "request": { ... } }`
//! envelope. Everything besides `encoding` and `quality` is a caller-supplied
//! string; `validate` is the only shape check performed before a request is
//! handed to the capture stage.

use serde::Deserialize;

use crate::error::{Error, Result};

/// Default encode quality applied when the caller leaves `quality` unset.
pub const DEFAULT_QUALITY: f32 = 0.92;

/// Compressed image format requested by the caller.
///
/// Unrecognized values fall back to `Png`, matching the behavior callers
/// already rely on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageEncoding {
    Jpg,
    #[default]
    Png,
    Webp,
}

impl<'de> Deserialize<'de> for ImageEncoding {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "jpg" | "jpeg" => ImageEncoding::Jpg,
            "webp" => ImageEncoding::Webp,
            _ => ImageEncoding::Png,
        })
    }
}

impl ImageEncoding {
    /// MIME type tag used in the data URI and the multipart part.
    pub fn mime(&self) -> &'static str {
        match self {
            ImageEncoding::Jpg => "image/jpeg",
            ImageEncoding::Png => "image/png",
            ImageEncoding::Webp => "image/webp",
        }
    }

    /// File extension used for the multipart upload filename.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageEncoding::Jpg => "jpg",
            ImageEncoding::Png => "png",
            ImageEncoding::Webp => "webp",
        }
    }
}

/// A single screenshot request received from the host.
///
/// Held in the pending slot until the next rendered frame consumes it; a
/// newer request arriving first silently replaces it (last-write-wins).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScreenshotRequest {
    /// Requested compressed format
    #[serde(default)]
    pub encoding: ImageEncoding,
    /// Fractional encode quality in (0, 1]; zero/unset means "default"
    #[serde(default)]
    pub quality: f32,
    /// Opaque identifier echoed back to the result endpoint
    #[serde(default)]
    pub correlation: String,
    /// Optional secondary upload target for the primary response body
    #[serde(default, rename = "resultURL")]
    pub result_url: String,
    /// Primary upload target
    #[serde(default, rename = "targetURL")]
    pub target_url: String,
    /// Multipart form field name; non-empty switches delivery to multipart
    #[serde(default, rename = "targetField")]
    pub target_field: String,
}

impl ScreenshotRequest {
    /// Effective encode quality.
    ///
    /// A zero (or non-finite) quality is indistinguishable from "unset" and
    /// yields [`DEFAULT_QUALITY`]; this is a documented quirk kept for
    /// compatibility. Anything else is clamped into (0, 1].
    pub fn effective_quality(&self) -> f32 {
        if !self.quality.is_finite() || self.quality == 0.0 {
            DEFAULT_QUALITY
        } else {
            self.quality.clamp(f32::MIN_POSITIVE, 1.0)
        }
    }

    /// Check the request carries the fields the pipeline cannot run without.
    pub fn validate(&self) -> Result<()> {
        if self.target_url.is_empty() {
            return Err(Error::InvalidRequest("targetURL is empty".into()));
        }
        Ok(())
    }
}

/// The host's generic message envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct HostMessage {
    pub request: ScreenshotRequest,
}
