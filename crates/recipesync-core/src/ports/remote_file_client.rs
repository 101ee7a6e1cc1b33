//! Remote file client port (driven/secondary port)
//!
//! The thin abstraction underlying both backends: a cloud-drive-backed
//! folder and a network share reached over a remote-file protocol. The
//! engine crates only ever talk to this trait; which backend sits behind it
//! is decided at facade construction time.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are
//!   adapter-specific; the engine maps them onto its own taxonomy.
//! - Writes are pull-based: the adapter repeatedly asks a [`ChunkSource`]
//!   for "the next chunk at offset X" until it answers `None`. Reads are
//!   accumulated chunk by chunk with an optional progress callback.
//! - Exactly one operation may be in flight per client instance. The
//!   facade's FIFO queue guarantees this; adapters are free to assume it.

use async_trait::async_trait;

use crate::domain::descriptor::RemoteDescriptor;
use crate::domain::manifest::CHUNK_SIZE;

/// Progress callback for chunked reads: `(bytes_so_far, total_if_known)`
pub type ProgressFn = Box<dyn Fn(u64, Option<u64>) + Send>;

/// Result of a `stat` call
#[derive(Debug, Clone, Default)]
pub struct RemoteStat {
    pub exists: bool,
    pub is_directory: bool,
    pub size: u64,
}

impl RemoteStat {
    /// Stat of a path that does not exist
    pub fn not_found() -> Self {
        Self::default()
    }

    /// True when the path exists and is a regular file
    pub fn is_regular_file(&self) -> bool {
        self.exists && !self.is_directory
    }
}

/// Pull-based supplier of file content for chunked writes
///
/// `next_chunk(offset)` returns the bytes to write at that offset, or
/// `None` when the content is exhausted, which signals completion.
#[async_trait]
pub trait ChunkSource: Send {
    async fn next_chunk(&mut self, offset: u64) -> anyhow::Result<Option<Vec<u8>>>;
}

/// In-memory chunk source slicing a byte buffer at the fixed chunk size
pub struct BytesChunkSource {
    data: Vec<u8>,
}

impl BytesChunkSource {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl ChunkSource for BytesChunkSource {
    async fn next_chunk(&mut self, offset: u64) -> anyhow::Result<Option<Vec<u8>>> {
        let offset = offset as usize;
        if offset >= self.data.len() {
            return Ok(None);
        }
        let end = (offset + CHUNK_SIZE).min(self.data.len());
        Ok(Some(self.data[offset..end].to_vec()))
    }
}

/// Time-boxed device discovery for the share backend
///
/// `discover` runs a fixed scan window and returns device names sorted
/// alphabetically. `stop` is the only way to end a scan early; there is no
/// general cancellation mechanism.
#[async_trait]
pub trait DeviceDiscovery: Send + Sync {
    async fn discover(&self) -> anyhow::Result<Vec<String>>;
    fn stop(&self);
}

/// Port trait implemented by both remote backends
///
/// Paths are relative to the opened share/folder root, using `/` as the
/// separator (e.g. `pictures/tart.jpg`).
#[async_trait]
pub trait RemoteFileClient: Send + Sync {
    /// Resolves and authenticates against the remote target
    async fn connect(&self, descriptor: &RemoteDescriptor) -> anyhow::Result<()>;

    /// Tears down the connection; safe to call when not connected
    async fn disconnect(&self) -> anyhow::Result<()>;

    /// Enumerates shares/folders offered by the connected target
    async fn list_shares(&self) -> anyhow::Result<Vec<String>>;

    /// Opens the named share; subsequent paths are resolved against it
    async fn open_share(&self, name: &str) -> anyhow::Result<()>;

    /// Closes the open share, if any
    async fn close_share(&self) -> anyhow::Result<()>;

    /// Existence and directory flag for a path
    async fn stat(&self, path: &str) -> anyhow::Result<RemoteStat>;

    /// Reads a file in full, accumulating fixed-size chunks; `progress`
    /// observes the running byte count
    async fn read_file(&self, path: &str, progress: Option<ProgressFn>)
        -> anyhow::Result<Vec<u8>>;

    /// Writes a file by draining `source` chunk by chunk
    async fn write_file(
        &self,
        path: &str,
        source: Box<dyn ChunkSource + Send>,
    ) -> anyhow::Result<()>;

    /// Deletes a file; a missing file is success, not an error
    async fn delete_file(&self, path: &str) -> anyhow::Result<()>;

    /// Creates a directory (and missing parents)
    async fn create_directory(&self, path: &str) -> anyhow::Result<()>;

    /// Lists the entry names directly under `path`
    async fn list_directory(&self, path: &str) -> anyhow::Result<Vec<String>>;
}
