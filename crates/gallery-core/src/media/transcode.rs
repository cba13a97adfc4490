//! Remuxing HLS playlists into single mp4 files with an external tool.

use crate::error::{CrawlError, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Converts a downloaded playlist into one media file.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, playlist: &Path, output: &Path) -> Result<()>;
}

/// [`Transcoder`] that runs `ffmpeg -y -i <playlist> -c copy <output>`.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    program: PathBuf,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
        }
    }
}

impl FfmpegTranscoder {
    /// Use `ffmpeg` from `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific executable.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

/// Arguments for a stream-copy remux that overwrites the output.
pub fn ffmpeg_args(input: &Path, output: &Path) -> Vec<OsString> {
    vec![
        "-y".into(),
        "-i".into(),
        input.as_os_str().to_owned(),
        "-c".into(),
        "copy".into(),
        output.as_os_str().to_owned(),
    ]
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, playlist: &Path, output: &Path) -> Result<()> {
        info!("Transcoding {} -> {}", playlist.display(), output.display());

        let result = Command::new(&self.program)
            .args(ffmpeg_args(playlist, output))
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| CrawlError::TranscodeFailed {
                input: playlist.to_path_buf(),
                message: format!("failed to run {}: {e}", self.program.display()),
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            return Err(CrawlError::TranscodeFailed {
                input: playlist.to_path_buf(),
                message: format!(
                    "{} exited with {}: {}",
                    self.program.display(),
                    result.status,
                    tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
                ),
            });
        }

        debug!("Transcode finished: {}", output.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ffmpeg_args() {
        let args = ffmpeg_args(Path::new("/w/abc.m3u8"), Path::new("/w/abc.mp4"));
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args, ["-y", "-i", "/w/abc.m3u8", "-c", "copy", "/w/abc.mp4"]);
    }

    #[tokio::test]
    async fn test_missing_program_is_error() {
        let transcoder = FfmpegTranscoder::with_program("/definitely/not/a/real/ffmpeg");
        let err = transcoder
            .transcode(Path::new("in.m3u8"), Path::new("out.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::TranscodeFailed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_status_is_checked() {
        let ok = FfmpegTranscoder::with_program("true");
        assert!(ok
            .transcode(Path::new("in.m3u8"), Path::new("out.mp4"))
            .await
            .is_ok());

        let failing = FfmpegTranscoder::with_program("false");
        assert!(failing
            .transcode(Path::new("in.m3u8"), Path::new("out.mp4"))
            .await
            .is_err());
    }
}
