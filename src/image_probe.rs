//! Image loading used to learn the true frame aspect ratio of a sprite sheet.

use crate::error::ImageLoadError;
use crate::geometry::{SheetSize, sheet_size_from_preview};
use crate::providers::SpriteCandidate;
use async_trait::async_trait;
use std::io::Cursor;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

#[async_trait]
pub trait ImageProbe: Send + Sync {
    /// Load `url` and report its natural size.
    async fn load(&self, url: &str) -> Result<ImageDimensions, ImageLoadError>;
}

/// Downloads the image and decodes only as much as needed for its size.
pub struct HttpImageProbe {
    client: reqwest::Client,
}

impl HttpImageProbe {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ImageProbe for HttpImageProbe {
    async fn load(&self, url: &str) -> Result<ImageDimensions, ImageLoadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ImageLoadError::Network(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ImageLoadError::Status(status.as_u16()));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ImageLoadError::Network(e.to_string()))?;
        decode_dimensions(&bytes)
    }
}

pub fn decode_dimensions(bytes: &[u8]) -> Result<ImageDimensions, ImageLoadError> {
    let (width, height) = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ImageLoadError::Decode(e.to_string()))?
        .into_dimensions()
        .map_err(|e| ImageLoadError::Decode(e.to_string()))?;
    Ok(ImageDimensions { width, height })
}

/// Full-sheet size of `candidate`, measured from its preview image when the
/// provider publishes one and from the sprite itself otherwise.
///
/// Load failures are logged and reported as `None`; the caller then renders
/// without aspect correction.
pub async fn probe_sheet_size(
    probe: &dyn ImageProbe,
    candidate: &SpriteCandidate,
) -> Option<SheetSize> {
    let url = candidate
        .preview
        .as_ref()
        .map_or(candidate.sprite_url.as_str(), |p| p.url.as_str());
    match probe.load(url).await {
        Ok(dims) => {
            debug!(%url, width = dims.width, height = dims.height, "Measured sprite sheet");
            if candidate.preview.is_some() {
                sheet_size_from_preview(candidate, dims.width, dims.height)
            } else {
                Some(SheetSize {
                    width: f64::from(dims.width),
                    height: f64::from(dims.height),
                })
            }
        }
        Err(err) => {
            warn!(%url, provider = %candidate.provider, "Sprite image unavailable: {err}");
            None
        }
    }
}
