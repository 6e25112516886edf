use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, PreviewError, Result};

pub const FRAME_TIMESTAMP: &str = "00:00:01.000";

#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Writes one JPEG frame of `input` to `output`, no edge longer than `max_edge`.
    async fn extract_frame(
        &self,
        input: &Path,
        output: &Path,
        max_edge: u32,
        cancel: &CancellationToken,
    ) -> Result<()>;
}

#[derive(Clone, Debug)]
pub struct FfmpegFrameExtractor {
    program: PathBuf,
}

impl FfmpegFrameExtractor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn arguments(input: &Path, output: &Path, max_edge: u32) -> Vec<String> {
        vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-nostdin".to_string(),
            "-y".to_string(),
            "-ss".to_string(),
            FRAME_TIMESTAMP.to_string(),
            "-i".to_string(),
            input.display().to_string(),
            "-vf".to_string(),
            format!("scale={max_edge}:{max_edge}:force_original_aspect_ratio=decrease"),
            "-frames:v".to_string(),
            "1".to_string(),
            "-q:v".to_string(),
            "2".to_string(),
            output.display().to_string(),
        ]
    }
}

#[async_trait]
impl FrameExtractor for FfmpegFrameExtractor {
    #[tracing::instrument(skip(self, cancel), fields(program = %self.program.display()))]
    async fn extract_frame(
        &self,
        input: &Path,
        output: &Path,
        max_edge: u32,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(Self::arguments(input, output, max_edge))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                PreviewError::Subprocess(format!(
                    "failed to start {}: {err}",
                    self.program.display()
                ))
            })?;
        let mut stderr = child.stderr.take();

        let (status, diagnostics) = tokio::select! {
            _ = cancel.cancelled() => {
                if let Err(err) = child.kill().await {
                    tracing::warn!(error = %err, "failed to stop transcoder");
                }
                return Err(Error::Cancelled);
            }
            finished = async {
                let mut diagnostics = Vec::new();
                if let Some(stderr) = stderr.as_mut() {
                    if let Err(err) = stderr.read_to_end(&mut diagnostics).await {
                        tracing::debug!(error = %err, "lost transcoder diagnostics");
                    }
                }
                (child.wait().await, diagnostics)
            } => finished,
        };

        let status = status
            .map_err(|err| PreviewError::Subprocess(format!("failed to wait for transcoder: {err}")))?;
        if !status.success() {
            return Err(PreviewError::Subprocess(format!(
                "transcoder exited with {status}: {}",
                String::from_utf8_lossy(&diagnostics).trim()
            ))
            .into());
        }

        let produced = tokio::fs::try_exists(output).await.unwrap_or(false);
        if !produced {
            return Err(PreviewError::Subprocess(format!(
                "transcoder produced no frame at {}",
                output.display()
            ))
            .into());
        }
        tracing::debug!("extracted preview frame");
        Ok(())
    }
}
