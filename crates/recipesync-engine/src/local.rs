//! Local replica access
//!
//! The local side of a sync is a directory holding the database bundle
//! (the fixed manifest) and a `pictures` subdirectory of image files -
//! the same layout the remote root uses. The relational store itself is an
//! external collaborator; the engine only ever moves its files as opaque
//! bytes.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;

use recipesync_core::domain::{LastUpdatedRecord, MARKER_FILE, PICTURES_DIR};

/// Handle on the local database+images directory
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Reads a manifest file; missing sidecar files (the SQLite -shm/-wal
    /// companions may not exist between sessions) read as empty
    pub async fn read_file_or_empty(&self, name: &str) -> Result<Vec<u8>> {
        match fs::read(self.path_of(name)).await {
            Ok(data) => Ok(data),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err).context("Failed to read local file"),
        }
    }

    pub async fn write_file(&self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.path_of(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Deletes a local file; absence is success
    pub async fn delete_file(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.path_of(name)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).context("Failed to delete local file"),
        }
    }

    /// Parses the local marker; `None` when missing or unparseable
    pub async fn read_marker(&self) -> Option<LastUpdatedRecord> {
        let bytes = fs::read(self.path_of(MARKER_FILE)).await.ok()?;
        LastUpdatedRecord::parse(&String::from_utf8_lossy(&bytes))
    }

    pub async fn write_marker(&self, record: &LastUpdatedRecord) -> Result<()> {
        self.write_file(MARKER_FILE, record.to_wire().as_bytes())
            .await
    }

    /// Names of images accumulated locally, sorted
    pub async fn image_names(&self) -> Result<Vec<String>> {
        let dir = self.root.join(PICTURES_DIR);
        let mut names = Vec::new();
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(err) => return Err(err).context("Failed to list local pictures"),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.metadata().await?.is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    pub async fn read_image(&self, name: &str) -> Result<Vec<u8>> {
        fs::read(self.root.join(PICTURES_DIR).join(name))
            .await
            .with_context(|| format!("Failed to read local image {name}"))
    }

    pub async fn write_image(&self, name: &str, data: &[u8]) -> Result<()> {
        let dir = self.root.join(PICTURES_DIR);
        fs::create_dir_all(&dir).await?;
        fs::write(dir.join(name), data)
            .await
            .with_context(|| format!("Failed to write local image {name}"))
    }

    pub async fn delete_image(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.root.join(PICTURES_DIR).join(name)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).context("Failed to delete local image"),
        }
    }
}
