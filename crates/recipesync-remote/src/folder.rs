//! Cloud-folder adapter
//!
//! The cloud backend is a folder mirrored by a cloud-drive client into the
//! local filesystem; the descriptor's `path` field points at its root. All
//! remote operations are plain `tokio::fs` calls, but they still go through
//! the chunked read/write contract so the engine behaves identically on
//! both backends.

use std::io::SeekFrom;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::RwLock;
use tracing::debug;

use recipesync_core::domain::manifest::CHUNK_SIZE;
use recipesync_core::domain::RemoteDescriptor;
use recipesync_core::ports::{ChunkSource, ProgressFn, RemoteFileClient, RemoteStat};

#[derive(Debug, Default)]
struct FolderState {
    /// Root named by the descriptor; set by `connect`
    root: Option<PathBuf>,
    /// Opened share subfolder, resolved against `root`
    share_root: Option<PathBuf>,
}

/// `RemoteFileClient` over a locally mounted cloud folder
#[derive(Debug, Default)]
pub struct FolderClient {
    state: RwLock<FolderState>,
}

impl FolderClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a protocol-relative path against the open share (or the
    /// connect root when no share is open)
    async fn resolve(&self, path: &str) -> Result<PathBuf> {
        let state = self.state.read().await;
        let base = state
            .share_root
            .as_ref()
            .or(state.root.as_ref())
            .context("Folder client is not connected")?;
        if path.is_empty() {
            return Ok(base.clone());
        }
        Ok(base.join(path))
    }
}

#[async_trait]
impl RemoteFileClient for FolderClient {
    async fn connect(&self, descriptor: &RemoteDescriptor) -> Result<()> {
        let root = PathBuf::from(&descriptor.path);
        let meta = fs::metadata(&root)
            .await
            .with_context(|| format!("Cloud folder not reachable: {}", root.display()))?;
        if !meta.is_dir() {
            bail!("Cloud folder path is not a directory: {}", root.display());
        }
        debug!(root = %root.display(), "Cloud folder connected");
        let mut state = self.state.write().await;
        state.root = Some(root);
        state.share_root = None;
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let mut state = self.state.write().await;
        state.root = None;
        state.share_root = None;
        Ok(())
    }

    async fn list_shares(&self) -> Result<Vec<String>> {
        let root = {
            let state = self.state.read().await;
            state.root.clone().context("Folder client is not connected")?
        };
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.metadata().await?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn open_share(&self, name: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let root = state.root.as_ref().context("Folder client is not connected")?;
        let share_root = root.join(name);
        if !fs::metadata(&share_root).await.map(|m| m.is_dir()).unwrap_or(false) {
            bail!("No such folder: {}", share_root.display());
        }
        state.share_root = Some(share_root);
        Ok(())
    }

    async fn close_share(&self) -> Result<()> {
        self.state.write().await.share_root = None;
        Ok(())
    }

    async fn stat(&self, path: &str) -> Result<RemoteStat> {
        let target = self.resolve(path).await?;
        match fs::metadata(&target).await {
            Ok(meta) => Ok(RemoteStat {
                exists: true,
                is_directory: meta.is_dir(),
                size: meta.len(),
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(RemoteStat::not_found()),
            Err(err) => Err(err).context("stat failed"),
        }
    }

    async fn read_file(&self, path: &str, progress: Option<ProgressFn>) -> Result<Vec<u8>> {
        let target = self.resolve(path).await?;
        let mut file = fs::File::open(&target)
            .await
            .with_context(|| format!("Failed to open {}", target.display()))?;
        let total = file.metadata().await?.len();

        // Chunked accumulation, same contract as the share backend.
        let mut data = Vec::with_capacity(total as usize);
        let mut chunk = vec![0u8; CHUNK_SIZE];
        loop {
            let n = file.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            data.extend_from_slice(&chunk[..n]);
            if let Some(ref progress) = progress {
                progress(data.len() as u64, Some(total));
            }
        }
        Ok(data)
    }

    async fn write_file(&self, path: &str, mut source: Box<dyn ChunkSource + Send>) -> Result<()> {
        let target = self.resolve(path).await?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = fs::File::create(&target)
            .await
            .with_context(|| format!("Failed to create {}", target.display()))?;

        let mut offset = 0u64;
        while let Some(chunk) = source.next_chunk(offset).await? {
            file.seek(SeekFrom::Start(offset)).await?;
            file.write_all(&chunk).await?;
            offset += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(())
    }

    async fn delete_file(&self, path: &str) -> Result<()> {
        let target = self.resolve(path).await?;
        match fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            // Absence on delete is success.
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).context("delete failed"),
        }
    }

    async fn create_directory(&self, path: &str) -> Result<()> {
        let target = self.resolve(path).await?;
        fs::create_dir_all(&target).await?;
        Ok(())
    }

    async fn list_directory(&self, path: &str) -> Result<Vec<String>> {
        let target = self.resolve(path).await?;
        let mut names = Vec::new();
        let mut entries = fs::read_dir(&target).await?;
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}
