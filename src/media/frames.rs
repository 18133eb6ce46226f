//! Frame sampling through the `ffmpeg` binary.
//!
//! The uploaded video and the extracted JPEGs live in `tempfile` objects and
//! are removed when they go out of scope, whichever way the request ends.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::capabilities::Frame;
use crate::error::{Result, SocialLeafError};

/// Upper bound on frames handed to the providers
pub const PROVIDER_FRAME_CAP: usize = 3;

fn internal(message: impl Into<String>) -> SocialLeafError {
    SocialLeafError::Internal {
        message: message.into(),
    }
}

/// Write upload bytes to a temp file carrying the original extension
pub async fn save_temp_video(bytes: Vec<u8>, ext: &str) -> Result<NamedTempFile> {
    let suffix = ext.to_string();
    tokio::task::spawn_blocking(move || -> Result<NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .prefix("social_leaf_upload_")
            .suffix(&suffix)
            .tempfile()?;
        std::io::Write::write_all(&mut file, &bytes)?;
        Ok(file)
    })
    .await
    .map_err(|e| internal(format!("temp write task failed: {e}")))?
}

pub struct FrameExtractor {
    ffmpeg_bin: String,
}

impl FrameExtractor {
    pub fn new(ffmpeg_bin: impl Into<String>) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.into(),
        }
    }

    /// Sample one frame every `interval_sec` seconds, at most `max_frames`.
    /// Timestamps are `index * interval_sec`.
    pub async fn extract(&self, video: &Path, interval_sec: f64, max_frames: usize) -> Result<Vec<Frame>> {
        if !(interval_sec.is_finite() && interval_sec > 0.0) {
            return Err(SocialLeafError::InvalidParams {
                message: "interval must be a positive number of seconds".to_string(),
            });
        }
        let max_frames = max_frames.clamp(1, PROVIDER_FRAME_CAP);
        let out_dir = tempfile::Builder::new()
            .prefix("social_leaf_frames_")
            .tempdir()?;
        let pattern = out_dir.path().join("frame_%03d.jpg");
        let fps = format!("fps=1/{interval_sec}");
        let frame_limit = max_frames.to_string();

        let output = Command::new(&self.ffmpeg_bin)
            .arg("-hide_banner")
            .args(["-loglevel", "error"])
            .arg("-i")
            .arg(video)
            .args(["-vf", fps.as_str()])
            .args(["-frames:v", frame_limit.as_str()])
            .args(["-q:v", "3"])
            .arg(&pattern)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| internal(format!("failed to run {}: {e}", self.ffmpeg_bin)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = ?output.status, "ffmpeg failed");
            return Err(internal(format!(
                "frame extraction failed: {}",
                crate::clients::truncate(stderr.trim(), 300)
            )));
        }

        let frames = read_frames(out_dir.path(), interval_sec).await?;
        if frames.is_empty() {
            return Err(SocialLeafError::InvalidParams {
                message: "Could not extract frames from video".to_string(),
            });
        }
        debug!(count = frames.len(), "extracted frames");
        Ok(frames)
    }
}

async fn read_frames(dir: &Path, interval_sec: f64) -> Result<Vec<Frame>> {
    let mut paths: Vec<PathBuf> = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|e| e == "jpg") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut frames = Vec::with_capacity(paths.len());
    for (i, path) in paths.iter().take(PROVIDER_FRAME_CAP).enumerate() {
        frames.push(Frame {
            timestamp_sec: i as f64 * interval_sec,
            jpeg: tokio::fs::read(path).await?,
        });
    }
    Ok(frames)
}
