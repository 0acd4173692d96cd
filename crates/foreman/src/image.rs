//! Encoded image normalizer.
//!
//! Browser canvases hand us `data:image/...;base64,` prefixes and proxies
//! wrap long base64 lines, so the payload is scrubbed before anything
//! touches it. Pure function; the decode is validation only - the engine
//! never looks at the pixels.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use foreman_common::ForemanError;

/// Declared image format, defaulting to JPEG when the payload carries no
/// data-URI prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }
}

/// A validated base64 image payload with its declared format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    /// Clean base64 payload, no prefix, no whitespace.
    pub payload: String,
    pub format: ImageFormat,
}

impl NormalizedImage {
    /// Render the inline reference sent to the vision endpoint.
    pub fn data_url(&self) -> String {
        format!("data:image/{};base64,{}", self.format.as_str(), self.payload)
    }
}

/// Strip transport wrapping from a base64 image payload and validate that it
/// decodes to a non-empty body.
pub fn normalize(raw: &str) -> Result<NormalizedImage, ForemanError> {
    let mut format = ImageFormat::Jpeg;
    let payload = if raw.starts_with("data:image") {
        match raw.split_once(',') {
            Some((prefix, rest)) => {
                let prefix = prefix.to_ascii_lowercase();
                if prefix.contains("png") {
                    format = ImageFormat::Png;
                } else if prefix.contains("jpeg") || prefix.contains("jpg") {
                    format = ImageFormat::Jpeg;
                }
                rest
            }
            None => {
                return Err(ForemanError::InvalidImageData(
                    "data URI prefix without a payload".to_string(),
                ))
            }
        }
    } else {
        raw
    };

    let cleaned: String = payload
        .chars()
        .filter(|c| !matches!(c, ' ' | '\n' | '\r' | '\t'))
        .collect();

    if cleaned.is_empty() {
        return Err(ForemanError::InvalidImageData(
            "empty image payload".to_string(),
        ));
    }

    let decoded = BASE64
        .decode(cleaned.as_bytes())
        .map_err(|e| ForemanError::InvalidImageData(e.to_string()))?;

    if decoded.is_empty() {
        return Err(ForemanError::InvalidImageData(
            "image decoded to zero bytes".to_string(),
        ));
    }

    Ok(NormalizedImage {
        payload: cleaned,
        format,
    })
}
