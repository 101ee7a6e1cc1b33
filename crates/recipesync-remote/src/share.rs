//! Network share adapter
//!
//! Speaks the framed JSON remote-file protocol from [`crate::protocol`]
//! against a share server. The client holds exactly one TCP connection and
//! allows exactly one in-flight request; interleaved requests on a single
//! connection would corrupt the newline framing, so the request path is
//! behind a mutex even though the facade queue already serializes callers.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::io::BufReader;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use recipesync_core::domain::manifest::CHUNK_SIZE;
use recipesync_core::domain::RemoteDescriptor;
use recipesync_core::ports::{ChunkSource, ProgressFn, RemoteFileClient, RemoteStat};

use crate::protocol::{
    decode_chunk, encode_chunk, read_frame, write_frame, ShareRequest, ShareResponse,
};

/// Default TCP port of the share service
pub const SHARE_PORT: u16 = 9045;

struct Connection {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

/// `RemoteFileClient` over the share wire protocol
#[derive(Default)]
pub struct ShareClient {
    connection: Mutex<Option<Connection>>,
}

impl ShareClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sends one request and awaits its single response
    async fn request(&self, request: ShareRequest) -> Result<ShareResponse> {
        let mut guard = self.connection.lock().await;
        let conn = guard.as_mut().context("Share client is not connected")?;
        write_frame(&mut conn.writer, &request).await?;
        let response: ShareResponse = read_frame(&mut conn.reader).await?;
        response.into_result()
    }

    async fn expect_ok(&self, request: ShareRequest) -> Result<()> {
        match self.request(request).await? {
            ShareResponse::Ok => Ok(()),
            other => bail!("Unexpected response: {other:?}"),
        }
    }
}

#[async_trait]
impl RemoteFileClient for ShareClient {
    async fn connect(&self, descriptor: &RemoteDescriptor) -> Result<()> {
        // `host` may carry an explicit port; otherwise the default applies.
        let address = if descriptor.host.contains(':') {
            descriptor.host.clone()
        } else {
            format!("{}:{}", descriptor.host, SHARE_PORT)
        };

        debug!(%address, netbios = %descriptor.netbios_name, "Connecting to share server");
        let stream = TcpStream::connect(&address)
            .await
            .with_context(|| format!("Failed to reach share server at {address}"))?;
        let (read_half, write_half) = stream.into_split();

        let mut conn = Connection {
            reader: BufReader::new(read_half),
            writer: write_half,
        };

        write_frame(
            &mut conn.writer,
            &ShareRequest::Hello {
                user_name: descriptor.user_name.clone(),
                password: descriptor.password.clone(),
                group: descriptor.group.clone(),
            },
        )
        .await?;
        let response: ShareResponse = read_frame(&mut conn.reader).await?;
        match response.into_result()? {
            ShareResponse::Ok => {}
            other => bail!("Unexpected handshake response: {other:?}"),
        }

        *self.connection.lock().await = Some(conn);
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        let mut guard = self.connection.lock().await;
        if let Some(mut conn) = guard.take() {
            // Best-effort goodbye; the connection is going away either way.
            if let Err(err) = write_frame(&mut conn.writer, &ShareRequest::Bye).await {
                warn!(%err, "Failed to send Bye");
            }
        }
        Ok(())
    }

    async fn list_shares(&self) -> Result<Vec<String>> {
        match self.request(ShareRequest::ListShares).await? {
            ShareResponse::Shares { names } => Ok(names),
            other => bail!("Unexpected response: {other:?}"),
        }
    }

    async fn open_share(&self, name: &str) -> Result<()> {
        self.expect_ok(ShareRequest::OpenShare {
            name: name.to_string(),
        })
        .await
    }

    async fn close_share(&self) -> Result<()> {
        self.expect_ok(ShareRequest::CloseShare).await
    }

    async fn stat(&self, path: &str) -> Result<RemoteStat> {
        match self
            .request(ShareRequest::Stat {
                path: path.to_string(),
            })
            .await?
        {
            ShareResponse::Stat {
                exists,
                is_directory,
                size,
            } => Ok(RemoteStat {
                exists,
                is_directory,
                size,
            }),
            other => bail!("Unexpected response: {other:?}"),
        }
    }

    async fn read_file(&self, path: &str, progress: Option<ProgressFn>) -> Result<Vec<u8>> {
        let total = {
            let stat = self.stat(path).await?;
            if !stat.exists {
                bail!("Remote file not found: {path}");
            }
            stat.size
        };

        let mut data = Vec::with_capacity(total as usize);
        loop {
            let response = self
                .request(ShareRequest::ReadChunk {
                    path: path.to_string(),
                    offset: data.len() as u64,
                    len: CHUNK_SIZE as u32,
                })
                .await?;
            match response {
                ShareResponse::Chunk { data: chunk, eof } => {
                    data.extend_from_slice(&decode_chunk(&chunk)?);
                    if let Some(ref progress) = progress {
                        progress(data.len() as u64, Some(total));
                    }
                    if eof {
                        break;
                    }
                }
                other => bail!("Unexpected response: {other:?}"),
            }
        }
        Ok(data)
    }

    async fn write_file(&self, path: &str, mut source: Box<dyn ChunkSource + Send>) -> Result<()> {
        let mut offset = 0u64;
        let mut first = true;
        loop {
            let Some(chunk) = source.next_chunk(offset).await? else {
                break;
            };
            self.expect_ok(ShareRequest::WriteChunk {
                path: path.to_string(),
                offset,
                data: encode_chunk(&chunk),
                truncate: first,
            })
            .await?;
            offset += chunk.len() as u64;
            first = false;
        }
        if first {
            // Empty source: still truncate/create the file.
            self.expect_ok(ShareRequest::WriteChunk {
                path: path.to_string(),
                offset: 0,
                data: String::new(),
                truncate: true,
            })
            .await?;
        }
        Ok(())
    }

    async fn delete_file(&self, path: &str) -> Result<()> {
        self.expect_ok(ShareRequest::Delete {
            path: path.to_string(),
        })
        .await
    }

    async fn create_directory(&self, path: &str) -> Result<()> {
        self.expect_ok(ShareRequest::Mkdir {
            path: path.to_string(),
        })
        .await
    }

    async fn list_directory(&self, path: &str) -> Result<Vec<String>> {
        match self
            .request(ShareRequest::ListDir {
                path: path.to_string(),
            })
            .await?
        {
            ShareResponse::Entries { names } => Ok(names),
            other => bail!("Unexpected response: {other:?}"),
        }
    }
}
