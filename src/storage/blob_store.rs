use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::fs::{self, File};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{Error, Result, StorageError};

const COPY_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Clone, Debug)]
pub struct BlobStore {
    root: PathBuf,
    fence: Option<WriteFence>,
}

// Shared by a pending save and every blocking write it starts. Once abandoned, writes
// still queued on the blocking pool are refused and `abandon` waits out the one in flight.
#[derive(Clone, Debug, Default)]
pub struct WriteFence {
    abandoned: Arc<Mutex<bool>>,
}

impl WriteFence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abandon(&self) {
        *self.lock() = true;
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.abandoned.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn admit(&self) -> Option<MutexGuard<'_, bool>> {
        let guard = self.lock();
        (!*guard).then_some(guard)
    }
}

impl BlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            fence: None,
        }
    }

    pub fn fenced(&self, fence: &WriteFence) -> Self {
        Self {
            root: self.root.clone(),
            fence: Some(fence.clone()),
        }
    }

    pub fn path_of(&self, name: &str) -> std::result::Result<PathBuf, StorageError> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\', '\0']);
        if !valid {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    async fn ensure_root(&self) -> std::result::Result<(), StorageError> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|err| StorageError::io(self.root.display().to_string(), err))
    }

    // Runs a filesystem step on the blocking pool, all or nothing, behind the fence.
    async fn write_blocking<T, F>(&self, name: &str, work: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let fence = self.fence.clone();
        tokio::task::spawn_blocking(move || {
            let _admitted = match &fence {
                Some(fence) => Some(fence.admit().ok_or(Error::Cancelled)?),
                None => None,
            };
            work()
        })
        .await
        .map_err(|err| StorageError::io(name, io::Error::other(err)))?
    }

    /// Streams `reader` into a newly created file and returns the byte count.
    #[tracing::instrument(skip(self, reader, cancel))]
    pub async fn save<R>(&self, name: &str, reader: &mut R, cancel: &CancellationToken) -> Result<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let path = self.path_of(name)?;
        self.ensure_root().await?;
        let target = path.clone();
        let owned = name.to_string();
        let file = self
            .write_blocking(name, move || {
                open_new(&target).map_err(|err| StorageError::from_io(&owned, err).into())
            })
            .await?;
        let partial = PartialFile::new(path);

        let size = copy_into(name, File::from_std(file), reader, cancel).await?;
        partial.complete();
        tracing::debug!(size, "stored file");
        Ok(size)
    }

    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    pub async fn save_bytes(&self, name: &str, data: Vec<u8>) -> Result<u64> {
        let path = self.path_of(name)?;
        self.ensure_root().await?;
        let owned = name.to_string();
        self.write_blocking(name, move || {
            write_new(&path, &data).map_err(|err| StorageError::from_io(&owned, err))?;
            Ok(data.len() as u64)
        })
        .await
    }

    #[tracing::instrument(skip(self, data), fields(size = data.len()))]
    pub async fn replace(&self, name: &str, data: Vec<u8>) -> Result<u64> {
        let path = self.path_of(name)?;
        let temp_path = self.root.join(format!(".{}.tmp", Uuid::new_v4()));
        let owned = name.to_string();
        self.write_blocking(name, move || {
            let present = path
                .try_exists()
                .map_err(|err| StorageError::io(owned.as_str(), err))?;
            if !present {
                return Err(StorageError::NotFound(owned).into());
            }
            write_new(&temp_path, &data)
                .and_then(|()| fs_rename(&temp_path, &path))
                .map_err(|err| StorageError::io(owned.as_str(), err))?;
            Ok(data.len() as u64)
        })
        .await
    }

    pub async fn open(&self, name: &str) -> Result<(File, u64)> {
        let path = self.path_of(name)?;
        let file = File::open(&path)
            .await
            .map_err(|err| StorageError::from_io(name, err))?;
        let size = file
            .metadata()
            .await
            .map_err(|err| StorageError::io(name, err))?
            .len();
        Ok((file, size))
    }

    pub async fn read_all(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.path_of(name)?;
        fs::read(&path)
            .await
            .map_err(|err| StorageError::from_io(name, err).into())
    }

    pub async fn exists(&self, name: &str) -> Result<bool> {
        let path = self.path_of(name)?;
        match fs::metadata(path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(StorageError::io(name, err).into()),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_of(name)?;
        fs::remove_file(&path)
            .await
            .map_err(|err| StorageError::from_io(name, err))?;
        tracing::debug!("deleted file");
        Ok(())
    }
}

fn open_new(path: &Path) -> io::Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
}

// Removes its own file on failure, never one that already existed.
fn write_new(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = open_new(path)?;
    file.write_all(data)
        .and_then(|()| file.sync_all())
        .inspect_err(|_| discard(path))
}

fn fs_rename(from: &Path, to: &Path) -> io::Result<()> {
    std::fs::rename(from, to).inspect_err(|_| discard(from))
}

fn discard(path: &Path) {
    if let Err(err) = std::fs::remove_file(path) {
        if err.kind() != io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %err, "failed to remove partial file");
        }
    }
}

async fn copy_into<R>(
    name: &str,
    mut file: File,
    reader: &mut R,
    cancel: &CancellationToken,
) -> Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut size = 0u64;
    loop {
        let read = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            read = reader.read(&mut buffer) => read.map_err(|err| StorageError::io(name, err))?,
        };
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read])
            .await
            .map_err(|err| StorageError::io(name, err))?;
        size += read as u64;
    }
    file.flush().await.map_err(|err| StorageError::io(name, err))?;
    file.sync_all()
        .await
        .map_err(|err| StorageError::io(name, err))?;
    Ok(size)
}

struct PartialFile {
    path: PathBuf,
    complete: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            complete: false,
        }
    }

    fn complete(mut self) {
        self.complete = true;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.complete {
            discard(&self.path);
        }
    }
}
