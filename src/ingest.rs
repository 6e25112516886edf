// A save walks Persisting -> Classifying -> GeneratingPreview -> Done. Failure or
// cancellation while generating the preview rolls back both artifacts and returns the
// originating error.

use std::sync::Arc;

use serde::Serialize;
use tokio::fs::File;
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::preview::{self, FfmpegFrameExtractor, FrameExtractor, thumbnail};
use crate::storage::{BlobStore, Category, WriteFence, classifier, naming};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SaveResult {
    #[serde(rename = "size")]
    pub size_bytes: u64,
    #[serde(rename = "fileName")]
    pub stored_name: String,
    #[serde(rename = "previewFileName")]
    pub preview_name: Option<String>,
}

#[derive(Debug)]
pub struct StoredFile {
    pub name: String,
    pub content_type: &'static str,
    pub size_bytes: u64,
    pub file: File,
}

#[derive(Clone, Copy, Debug)]
enum PreviewKind {
    Thumbnail,
    VideoFrame,
}

#[derive(Clone)]
pub struct ContentService {
    store: BlobStore,
    previews_enabled: bool,
    preview_max_edge: u32,
    extractor: Arc<dyn FrameExtractor>,
}

impl ContentService {
    pub fn new(config: &ServiceConfig) -> Self {
        let extractor = Arc::new(FfmpegFrameExtractor::new(config.transcoder.clone()));
        Self::with_frame_extractor(config, extractor)
    }

    pub fn with_frame_extractor(config: &ServiceConfig, extractor: Arc<dyn FrameExtractor>) -> Self {
        Self {
            store: BlobStore::new(config.content_dir.clone()),
            previews_enabled: config.previews_enabled,
            preview_max_edge: config.preview_max_edge,
            extractor,
        }
    }

    #[tracing::instrument(
        skip(self, reader, cancel),
        fields(stored_name = tracing::field::Empty)
    )]
    pub async fn save<R>(
        &self,
        original_file_name: &str,
        reader: &mut R,
        cancel: &CancellationToken,
    ) -> Result<SaveResult>
    where
        R: AsyncRead + Unpin + Send + ?Sized,
    {
        let stored_name = naming::new_name(original_file_name);
        tracing::Span::current().record("stored_name", stored_name.as_str());
        let mut pending = PendingArtifacts::new(&self.store, stored_name.clone());
        let saved = pending.store().save(&stored_name, reader, cancel).await;
        let size_bytes = match saved {
            Ok(size_bytes) => size_bytes,
            Err(err) => {
                // The store cleans up its own partial file and must not touch a conflicting one.
                pending.commit();
                return Err(err);
            }
        };

        let category = classifier::classify(naming::extension_of(original_file_name));
        let Some(kind) = self.preview_kind(category) else {
            pending.commit();
            tracing::info!(size_bytes, %category, "saved file without preview");
            return Ok(SaveResult {
                size_bytes,
                stored_name,
                preview_name: None,
            });
        };

        let generated = tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            generated = self.generate_preview(kind, &stored_name, size_bytes, &mut pending, cancel) => generated,
        };

        match generated {
            Ok((size_bytes, preview_name)) => {
                pending.commit();
                tracing::info!(size_bytes, %category, %preview_name, "saved file with preview");
                Ok(SaveResult {
                    size_bytes,
                    stored_name,
                    preview_name: Some(preview_name),
                })
            }
            Err(err) => {
                tracing::error!(error = %err, %category, "preview generation failed, rolling back");
                pending.rollback().await;
                Err(err)
            }
        }
    }

    fn preview_kind(&self, category: Category) -> Option<PreviewKind> {
        if !self.previews_enabled {
            return None;
        }
        match category {
            Category::Image => Some(PreviewKind::Thumbnail),
            Category::Video => Some(PreviewKind::VideoFrame),
            Category::Other => None,
        }
    }

    // Returns the final size of the original and the preview's name.
    async fn generate_preview(
        &self,
        kind: PreviewKind,
        stored_name: &str,
        size_bytes: u64,
        pending: &mut PendingArtifacts,
        cancel: &CancellationToken,
    ) -> Result<(u64, String)> {
        let preview_name = naming::name_with_extension(thumbnail::PREVIEW_EXTENSION);
        pending.track(preview_name.clone());
        let max_edge = self.preview_max_edge;

        match kind {
            PreviewKind::Thumbnail => {
                let bytes = self.store.read_all(stored_name).await?;
                let (normalized, thumbnail) =
                    preview::run_blocking(move || preview::prepare_image(bytes, max_edge)).await?;

                let size_bytes = match normalized.encoded {
                    Some(upright) => {
                        tracing::debug!(orientation = ?normalized.orientation, "rewriting upright original");
                        pending.store().replace(stored_name, upright).await?
                    }
                    None => size_bytes,
                };
                tracing::debug!(width = thumbnail.width, height = thumbnail.height, "storing thumbnail");
                pending.store().save_bytes(&preview_name, thumbnail.jpeg).await?;
                Ok((size_bytes, preview_name))
            }
            PreviewKind::VideoFrame => {
                let input = self.store.path_of(stored_name)?;
                let output = self.store.path_of(&preview_name)?;
                self.extractor
                    .extract_frame(&input, &output, max_edge, cancel)
                    .await?;
                Ok((size_bytes, preview_name))
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn read(&self, stored_name: &str) -> Result<StoredFile> {
        let (file, size_bytes) = self.store.open(stored_name).await?;
        Ok(StoredFile {
            name: stored_name.to_string(),
            content_type: classifier::content_type_for(stored_name),
            size_bytes,
            file,
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, stored_name: &str) -> Result<()> {
        self.store.delete(stored_name).await?;
        tracing::info!("deleted file");
        Ok(())
    }
}

// Artifacts of an unfinished save. Dropping an uncommitted set abandons the fence, so
// writes still queued on the blocking pool never land, then removes the files.
struct PendingArtifacts {
    store: BlobStore,
    fence: WriteFence,
    names: Vec<String>,
    armed: bool,
}

impl PendingArtifacts {
    fn new(store: &BlobStore, original: String) -> Self {
        let fence = WriteFence::new();
        Self {
            store: store.fenced(&fence),
            fence,
            names: vec![original],
            armed: true,
        }
    }

    fn store(&self) -> &BlobStore {
        &self.store
    }

    fn track(&mut self, name: String) {
        self.names.push(name);
    }

    fn commit(mut self) {
        self.armed = false;
    }

    // Best effort; failures are logged and never replace the root cause.
    async fn rollback(mut self) {
        self.fence.abandon();
        for name in &self.names {
            match self.store.delete(name).await {
                Ok(()) => tracing::debug!(%name, "rolled back artifact"),
                Err(err) if err.is_not_found() => {}
                Err(err) => tracing::warn!(%name, error = %err, "rollback could not remove artifact"),
            }
        }
        self.armed = false;
    }
}

impl Drop for PendingArtifacts {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.fence.abandon();
        for name in &self.names {
            let Ok(path) = self.store.path_of(name) else {
                continue;
            };
            match std::fs::remove_file(&path) {
                Ok(()) => tracing::debug!(%name, "removed abandoned artifact"),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => tracing::warn!(%name, error = %err, "could not remove abandoned artifact"),
            }
        }
    }
}
