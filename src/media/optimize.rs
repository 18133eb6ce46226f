use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, SocialLeafError};

/// Longest edge of an optimised post image
pub const MAX_EDGE: u32 = 1080;
const JPEG_QUALITY: u8 = 85;

#[derive(Debug, Clone, Serialize)]
pub struct OptimizedImage {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
}

/// Decode, shrink to fit `MAX_EDGE` and re-encode as JPEG
pub fn to_jpeg(raw: &[u8]) -> Result<(Vec<u8>, u32, u32)> {
    let img = image::load_from_memory(raw).map_err(|e| SocialLeafError::InvalidParams {
        message: format!("Unsupported or corrupt image: {e}"),
    })?;
    let img = if img.width() > MAX_EDGE || img.height() > MAX_EDGE {
        img.resize(MAX_EDGE, MAX_EDGE, FilterType::Lanczos3)
    } else {
        img
    };
    let rgb = img.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| SocialLeafError::Internal {
            message: format!("JPEG encode failed: {e}"),
        })?;
    Ok((out, rgb.width(), rgb.height()))
}

/// Optimise an uploaded image and store it under `media_dir`
pub async fn optimize_image(raw: Vec<u8>, media_dir: &Path) -> Result<OptimizedImage> {
    let (jpeg, width, height) = tokio::task::spawn_blocking(move || to_jpeg(&raw))
        .await
        .map_err(|e| SocialLeafError::Internal {
            message: format!("image task failed: {e}"),
        })??;

    tokio::fs::create_dir_all(media_dir).await?;
    let path = media_dir.join(format!("post_{}.jpg", Uuid::new_v4().simple()));
    tokio::fs::write(&path, &jpeg).await?;
    debug!(path = %path.display(), width, height, "stored optimised image");

    Ok(OptimizedImage {
        path,
        width,
        height,
        bytes: jpeg.len(),
    })
}
