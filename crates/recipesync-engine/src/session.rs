//! Session lifecycle for one remote target
//!
//! A session is a connected client with its share/folder opened. The facade
//! consults [`SessionManager::is_active`] before dispatching any
//! session-requiring command; re-establishing a dropped session is the
//! facade's job (and the only automatic retry anywhere in the engine).

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use recipesync_core::domain::{EngineError, RemoteDescriptor};
use recipesync_core::ports::RemoteFileClient;

/// Guard timer applied to share connect attempts
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

/// Owns connect/disconnect for one backend
pub struct SessionManager {
    client: Arc<dyn RemoteFileClient>,
    descriptor: RemoteDescriptor,
    /// `Some` for the share backend; cloud folder connects are local and
    /// need no guard
    connect_timeout: Option<Duration>,
    active: bool,
}

impl SessionManager {
    pub fn new(
        client: Arc<dyn RemoteFileClient>,
        descriptor: RemoteDescriptor,
        connect_timeout: Option<Duration>,
    ) -> Self {
        Self {
            client,
            descriptor,
            connect_timeout,
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Marks the session dropped without touching the connection; the next
    /// session-requiring command will trigger re-establishment
    pub fn invalidate(&mut self) {
        if self.active {
            warn!("Session invalidated");
            self.active = false;
        }
    }

    /// Connects, authenticates and opens the target share/folder
    ///
    /// Idempotent: an already-active session is left alone.
    pub async fn start_session(&mut self) -> Result<(), EngineError> {
        if self.active {
            debug!("Session already active");
            return Ok(());
        }

        let connect = self.client.connect(&self.descriptor);
        match self.connect_timeout {
            Some(limit) => match tokio::time::timeout(limit, connect).await {
                Ok(result) => result.map_err(|err| EngineError::Connection(format!("{err:#}")))?,
                Err(_) => {
                    return Err(EngineError::Timeout(limit.as_secs()));
                }
            },
            None => connect
                .await
                .map_err(|err| EngineError::Connection(format!("{err:#}")))?,
        }

        if !self.descriptor.share.is_empty() {
            if let Err(err) = self.client.open_share(&self.descriptor.share).await {
                // Leave no half-open connection behind.
                let _ = self.client.disconnect().await;
                return Err(EngineError::Connection(format!("{err:#}")));
            }
        }

        self.active = true;
        info!(share = %self.descriptor.share, "Session started");
        Ok(())
    }

    /// Closes the share and disconnects; always clears the active flag
    pub async fn end_session(&mut self) -> Result<(), EngineError> {
        if self.active {
            if let Err(err) = self.client.close_share().await {
                warn!(%err, "Failed to close share");
            }
            if let Err(err) = self.client.disconnect().await {
                warn!(%err, "Failed to disconnect");
            }
            info!("Session ended");
        }
        self.active = false;
        Ok(())
    }
}
