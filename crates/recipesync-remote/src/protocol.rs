//! Share wire protocol
//!
//! Messages are newline-delimited JSON over TCP, tagged enums on both
//! directions. File bytes travel base64-encoded inside `ReadChunk` /
//! `WriteChunk` payloads, capped at the engine-wide chunk size. The client
//! sends one request and waits for exactly one response; there is no
//! pipelining, which keeps protocol framing trivially safe under the
//! engine's one-operation-per-backend rule.

use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Client request messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ShareRequest {
    /// Must be sent first; authenticates the session
    Hello {
        user_name: String,
        password: String,
        group: String,
    },
    /// Enumerate shares offered by this device
    ListShares,
    /// Open the named share
    OpenShare { name: String },
    /// Close the open share
    CloseShare,
    /// Existence / directory flag / size for a path
    Stat { path: String },
    /// Read up to `len` bytes at `offset`
    ReadChunk { path: String, offset: u64, len: u32 },
    /// Write `data` (base64) at `offset`; `truncate` resets the file first
    WriteChunk {
        path: String,
        offset: u64,
        data: String,
        truncate: bool,
    },
    /// Delete a file (missing file is not an error)
    Delete { path: String },
    /// Create a directory and missing parents
    Mkdir { path: String },
    /// List entry names directly under `path`
    ListDir { path: String },
    /// Orderly teardown
    Bye,
}

/// Server response messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ShareResponse {
    Ok,
    Error { message: String },
    Shares { names: Vec<String> },
    Stat {
        exists: bool,
        is_directory: bool,
        size: u64,
    },
    /// `eof` is set on the chunk that ends the file (possibly empty)
    Chunk { data: String, eof: bool },
    Entries { names: Vec<String> },
}

impl ShareResponse {
    /// Maps `Error` responses into failures, passing everything else through
    pub fn into_result(self) -> Result<Self> {
        match self {
            Self::Error { message } => bail!("Share server error: {message}"),
            other => Ok(other),
        }
    }
}

/// Encodes chunk bytes for the wire
pub fn encode_chunk(data: &[u8]) -> String {
    BASE64.encode(data)
}

/// Decodes chunk bytes from the wire
pub fn decode_chunk(data: &str) -> Result<Vec<u8>> {
    BASE64.decode(data).context("Invalid base64 chunk payload")
}

/// Writes one frame (JSON + newline)
pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_vec(message).context("Failed to encode frame")?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame; `Err` on closed connection or undecodable JSON
pub async fn read_frame<R, T>(reader: &mut BufReader<R>) -> Result<T>
where
    R: AsyncRead + Unpin,
    T: for<'de> Deserialize<'de>,
{
    let mut line = String::new();
    let n = reader.read_line(&mut line).await?;
    if n == 0 {
        bail!("Connection closed by peer");
    }
    serde_json::from_str(line.trim_end()).context("Failed to decode frame")
}
