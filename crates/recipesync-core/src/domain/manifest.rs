//! Remote layout constants: the database manifest, artifact names, and the
//! repository extension allow-list
//!
//! The database travels as a fixed ordered bundle. The marker file is always
//! the first to be deleted and the last to be (re)written, in both transfer
//! directions, so a reader can never observe a fresh marker paired with a
//! partially written database.

/// Name of the last-updated marker artifact
pub const MARKER_FILE: &str = "last_updated.txt";

/// Name of the lock artifact
pub const LOCK_FILE: &str = "lock.txt";

/// Subdirectory of the remote root holding the image set
pub const PICTURES_DIR: &str = "pictures";

/// Fixed ordered database manifest. The marker is listed first; transfer
/// code deletes in this order and writes in the reverse, which is what puts
/// the marker last on every write path.
pub const DB_MANIFEST: [&str; 4] = [
    MARKER_FILE,
    "recipes.sqlite",
    "recipes.sqlite-shm",
    "recipes.sqlite-wal",
];

/// Chunk size for remote reads and writes, in bytes
pub const CHUNK_SIZE: usize = 64_000;

/// Extensions accepted when scanning the read-only recipe repository
const ACCEPTED_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "htm", "html", "pdf", "png", "rtf", "txt"];

/// True when a repository entry name carries an accepted extension
/// (case-insensitive)
pub fn is_accepted_repository_name(name: &str) -> bool {
    name.rsplit_once('.')
        .map(|(_, ext)| {
            let ext = ext.to_ascii_lowercase();
            ACCEPTED_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
