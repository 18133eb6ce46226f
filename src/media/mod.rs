//! Uploaded media handling: video frame extraction and image optimisation

pub mod frames;
pub mod optimize;

use std::path::Path;

use crate::config::HookConfig;
use crate::error::{Result, SocialLeafError};

pub use frames::FrameExtractor;
pub use optimize::{OptimizedImage, optimize_image};

const MB: usize = 1024 * 1024;

/// Lower-cased extension including the dot, e.g. `.mp4`
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_ascii_lowercase()))
}

/// Validate a video upload against the allowed extensions and size cap.
/// Returns the normalised extension.
pub fn check_video_upload(filename: &str, size: usize, config: &HookConfig) -> Result<String> {
    let ext = extension_of(filename)
        .filter(|ext| config.allowed_extensions.iter().any(|a| a.eq_ignore_ascii_case(ext)))
        .ok_or_else(|| SocialLeafError::InvalidParams {
            message: format!(
                "Invalid file type. Allowed: {}",
                config.allowed_extensions.join(", ")
            ),
        })?;
    if size > config.max_file_mb * MB {
        return Err(SocialLeafError::InvalidParams {
            message: format!("File too large. Maximum size: {}MB", config.max_file_mb),
        });
    }
    if size == 0 {
        return Err(SocialLeafError::InvalidParams {
            message: "Uploaded video is empty".to_string(),
        });
    }
    Ok(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_case_insensitive() {
        let config = HookConfig::default();
        assert_eq!(check_video_upload("Clip.MOV", 10, &config).unwrap(), ".mov");
        assert!(check_video_upload("clip.gif", 10, &config).is_err());
        assert!(check_video_upload("noext", 10, &config).is_err());
    }

    #[test]
    fn size_cap_and_empty_upload() {
        let config = HookConfig::default();
        let too_big = config.max_file_mb * MB + 1;
        let err = check_video_upload("a.mp4", too_big, &config).unwrap_err();
        assert!(err.to_string().contains("File too large"));
        assert!(check_video_upload("a.mp4", 0, &config).is_err());
    }
}
