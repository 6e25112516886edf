pub mod frame;
pub mod orientation;
pub mod thumbnail;

pub use frame::{FfmpegFrameExtractor, FrameExtractor};
pub use orientation::Normalized;
pub use thumbnail::Thumbnail;

use crate::error::PreviewError;

pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T, PreviewError>
where
    F: FnOnce() -> Result<T, PreviewError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| PreviewError::Encode(format!("image worker failed: {err}")))?
}

pub(crate) fn prepare_image(
    bytes: Vec<u8>,
    max_edge: u32,
) -> Result<(Normalized, Thumbnail), PreviewError> {
    let normalized = orientation::normalize(&bytes)?;
    let thumbnail = thumbnail::render(&normalized.image, max_edge)?;
    Ok((normalized, thumbnail))
}
