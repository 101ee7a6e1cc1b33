//! Queue-backed operation surface, one per backend
//!
//! A [`Facade`] owns one strict FIFO of [`Command`]s and one worker task.
//! `enqueue` may be called from any context; the worker dispatches at most
//! one command at a time, so no two remote operations are ever in flight
//! against one backend - interleaving two chunked sequences on a single
//! open connection would corrupt protocol framing.
//!
//! Per facade the flow is `Idle -> Dispatching -> AwaitingRemote -> Idle`,
//! with one interrupt edge: when a session-requiring command finds the
//! session inactive the worker re-establishes the session exactly once for
//! that stall and then re-dispatches the same un-popped head. A failed
//! re-establishment fails the stalled command like any other error; the
//! queue itself never halts.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Notify};
use tracing::{debug, info, warn};

use recipesync_core::domain::{
    is_accepted_repository_name, AccessStatus, DeviceIdentity, EngineError, RemoteDescriptor,
};
use recipesync_core::ports::{DeviceDiscovery, EngineEvent, RemoteFileClient};

use crate::command::{Command, Direction, Reply};
use crate::conflict::{CompareOutcome, ConflictResolver};
use crate::local::LocalStore;
use crate::lock::LockCoordinator;
use crate::session::{SessionManager, CONNECT_TIMEOUT};
use crate::transfer::TransferEngine;

/// Everything a facade needs at construction time
pub struct FacadeConfig {
    /// Backend tag used in log lines and events (`"cloud"` / `"share"`)
    pub backend: &'static str,
    pub client: Arc<dyn RemoteFileClient>,
    pub descriptor: RemoteDescriptor,
    pub identity: DeviceIdentity,
    pub local: LocalStore,
    /// Shared access-status record; UI collaborators hold the same Arc
    pub status: Arc<RwLock<AccessStatus>>,
    /// Best-effort notification stream; `None` disables events
    pub events: Option<mpsc::UnboundedSender<EngineEvent>>,
    /// Discovery implementation; share backend only
    pub discovery: Option<Arc<dyn DeviceDiscovery>>,
    /// `Some` applies the 60-second connect guard (share backend)
    pub connect_timeout: Option<Duration>,
}

impl FacadeConfig {
    /// The connect guard used by the share backend
    pub fn share_timeout() -> Option<Duration> {
        Some(CONNECT_TIMEOUT)
    }
}

struct Shared {
    backend: &'static str,
    queue: Mutex<VecDeque<Command>>,
    wake: Notify,
    closed: AtomicBool,
    status: Arc<RwLock<AccessStatus>>,
    discovery: Option<Arc<dyn DeviceDiscovery>>,
}

/// Handler state owned exclusively by the worker task
struct Handlers {
    session: SessionManager,
    lock: LockCoordinator,
    resolver: ConflictResolver,
    transfer: TransferEngine,
    client: Arc<dyn RemoteFileClient>,
    status: Arc<RwLock<AccessStatus>>,
    events: Option<mpsc::UnboundedSender<EngineEvent>>,
    discovery: Option<Arc<dyn DeviceDiscovery>>,
    backend: &'static str,
}

impl Handlers {
    fn emit(&self, event: EngineEvent) {
        if let Some(ref events) = self.events {
            let _ = events.send(event);
        }
    }

    fn status_snapshot(&self) -> AccessStatus {
        self.status.read().expect("access status poisoned").clone()
    }

    /// Connection-shaped failures invalidate the session so the NEXT
    /// session-requiring command triggers the transparent re-establishment,
    /// and reset the shared status record
    fn note_failure(&mut self, err: &EngineError) {
        if matches!(
            err,
            EngineError::Connection(_)
                | EngineError::Timeout(_)
                | EngineError::Protocol(_)
                | EngineError::Io(_)
        ) {
            self.session.invalidate();
            self.status.write().expect("access status poisoned").reset();
            self.emit(EngineEvent::AccessChanged(self.status_snapshot()));
        }
    }
}

/// Public operation surface for one backend
pub struct Facade {
    shared: Arc<Shared>,
}

impl Facade {
    /// Builds the facade and spawns its worker task
    pub fn new(config: FacadeConfig) -> Self {
        let FacadeConfig {
            backend,
            client,
            descriptor,
            identity,
            local,
            status,
            events,
            discovery,
            connect_timeout,
        } = config;

        let shared = Arc::new(Shared {
            backend,
            queue: Mutex::new(VecDeque::new()),
            wake: Notify::new(),
            closed: AtomicBool::new(false),
            status: status.clone(),
            discovery: discovery.clone(),
        });

        let handlers = Handlers {
            session: SessionManager::new(client.clone(), descriptor, connect_timeout),
            lock: LockCoordinator::new(client.clone(), identity.clone(), status.clone()),
            resolver: ConflictResolver::new(client.clone(), local.clone()),
            transfer: TransferEngine::new(
                client.clone(),
                local,
                identity,
                status.clone(),
                events.clone(),
            ),
            client,
            status,
            events,
            discovery,
            backend,
        };

        tokio::spawn(run_queue(shared.clone(), handlers));

        Self { shared }
    }

    /// Appends a command to the tail and wakes the worker
    pub fn enqueue(&self, command: Command) {
        debug!(backend = self.shared.backend, tag = command.tag(), "Enqueue");
        self.shared
            .queue
            .lock()
            .expect("command queue poisoned")
            .push_back(command);
        self.shared.wake.notify_one();
    }

    /// Discards every pending (not-yet-dispatched) command; each resolves
    /// with [`EngineError::Cancelled`]. The command in flight, if any,
    /// cannot be aborted.
    pub fn empty_queue(&self) {
        let drained: Vec<Command> = self
            .shared
            .queue
            .lock()
            .expect("command queue poisoned")
            .drain(..)
            .collect();
        if !drained.is_empty() {
            info!(
                backend = self.shared.backend,
                count = drained.len(),
                "Discarding pending commands"
            );
        }
        for command in drained {
            command.fail(EngineError::Cancelled);
        }
    }

    /// Ends an in-flight discovery scan early; the only operation with an
    /// external stop
    pub fn stop_discovery(&self) {
        if let Some(ref discovery) = self.shared.discovery {
            discovery.stop();
        }
    }

    /// Current shared access status
    pub fn access_status(&self) -> AccessStatus {
        self.shared
            .status
            .read()
            .expect("access status poisoned")
            .clone()
    }

    async fn roundtrip<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.enqueue(make(tx));
        match rx.await {
            Ok(result) => result,
            // Worker went away before resolving; treat as a discard.
            Err(_) => Err(EngineError::Cancelled),
        }
    }

    // ------------------------------------------------------------------
    // Async operation surface (one typed completion per call)
    // ------------------------------------------------------------------

    pub async fn start_session(&self) -> Result<(), EngineError> {
        self.roundtrip(|reply| Command::StartSession { reply }).await
    }

    pub async fn end_session(&self) -> Result<(), EngineError> {
        self.roundtrip(|reply| Command::EndSession { reply }).await
    }

    pub async fn lock(&self) -> Result<AccessStatus, EngineError> {
        self.roundtrip(|reply| Command::AcquireLock { reply }).await
    }

    pub async fn unlock(&self) -> Result<AccessStatus, EngineError> {
        self.roundtrip(|reply| Command::ReleaseLock { reply }).await
    }

    pub async fn compare_last_updated(&self) -> Result<CompareOutcome, EngineError> {
        self.roundtrip(|reply| Command::CompareLastUpdated { reply })
            .await
    }

    pub async fn check_database_files(&self) -> Result<(), EngineError> {
        self.roundtrip(|reply| Command::CheckDatabaseFiles { reply })
            .await
    }

    pub async fn copy_database(&self, direction: Direction) -> Result<(), EngineError> {
        self.roundtrip(|reply| Command::CopyDatabase { direction, reply })
            .await
    }

    pub async fn copy_all_images(&self, direction: Direction) -> Result<u32, EngineError> {
        self.roundtrip(|reply| Command::CopyAllImages { direction, reply })
            .await
    }

    pub async fn sync_images(&self, direction: Direction) -> Result<u32, EngineError> {
        self.roundtrip(|reply| Command::SyncImages { direction, reply })
            .await
    }

    pub async fn fetch_image(&self, name: impl Into<String>) -> Result<Vec<u8>, EngineError> {
        let name = name.into();
        self.roundtrip(|reply| Command::FetchImage { name, reply })
            .await
    }

    pub async fn save_image_data(
        &self,
        name: impl Into<String>,
        data: Vec<u8>,
    ) -> Result<(), EngineError> {
        let name = name.into();
        self.roundtrip(|reply| Command::SaveImage { name, data, reply })
            .await
    }

    pub async fn delete_image(&self, name: impl Into<String>) -> Result<(), EngineError> {
        let name = name.into();
        self.roundtrip(|reply| Command::DeleteImage { name, reply })
            .await
    }

    pub async fn fetch_image_names(&self) -> Result<Vec<String>, EngineError> {
        self.roundtrip(|reply| Command::FetchImageNames { reply })
            .await
    }

    pub async fn discover_devices(&self) -> Result<Vec<String>, EngineError> {
        self.roundtrip(|reply| Command::DiscoverDevices { reply })
            .await
    }

    pub async fn list_shares(&self) -> Result<Vec<String>, EngineError> {
        self.roundtrip(|reply| Command::ListShares { reply }).await
    }

    pub async fn list_directory(&self, path: impl Into<String>) -> Result<Vec<String>, EngineError> {
        let path = path.into();
        self.roundtrip(|reply| Command::ListDirectory { path, reply })
            .await
    }

    pub async fn list_repository_entries(&self) -> Result<Vec<String>, EngineError> {
        self.roundtrip(|reply| Command::ListRepositoryEntries { reply })
            .await
    }

    pub async fn fetch_repository_file(
        &self,
        name: impl Into<String>,
    ) -> Result<Vec<u8>, EngineError> {
        let name = name.into();
        self.roundtrip(|reply| Command::FetchRepositoryFile { name, reply })
            .await
    }
}

impl Drop for Facade {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::Release);
        self.shared.wake.notify_one();
    }
}

// ---------------------------------------------------------------------------
// Worker loop
// ---------------------------------------------------------------------------

async fn run_queue(shared: Arc<Shared>, mut handlers: Handlers) {
    // One transparent session re-establishment per stalled head command.
    let mut re_establish = false;

    loop {
        // Idle until a head exists or the facade is dropped.
        loop {
            if shared.closed.load(Ordering::Acquire) {
                drain_on_close(&shared);
                return;
            }
            if !shared
                .queue
                .lock()
                .expect("command queue poisoned")
                .is_empty()
            {
                break;
            }
            shared.wake.notified().await;
        }

        // Inspect the head WITHOUT popping: a stalled session-requiring
        // command is retried automatically once the session comes back.
        // `empty_queue` may drain between the emptiness check and here, so
        // an absent head just means back to idle.
        let stalled = {
            let queue = shared.queue.lock().expect("command queue poisoned");
            match queue.front() {
                Some(head) => {
                    head.requires_session()
                        && !head.is_start_session()
                        && !handlers.session.is_active()
                }
                None => continue,
            }
        };

        if stalled {
            if !re_establish {
                re_establish = true;
                debug!(backend = shared.backend, "Re-establishing session for stalled command");
                match handlers.session.start_session().await {
                    Ok(()) => {
                        handlers.emit(EngineEvent::SessionStarted {
                            backend: shared.backend,
                        });
                        // Head re-dispatches on the next iteration.
                        continue;
                    }
                    Err(err) => {
                        re_establish = false;
                        warn!(backend = shared.backend, %err, "Session re-establishment failed");
                        if let Some(head) = shared
                            .queue
                            .lock()
                            .expect("command queue poisoned")
                            .pop_front()
                        {
                            head.fail(err);
                        }
                        continue;
                    }
                }
            } else {
                // Second stall for the same head: no further retries.
                re_establish = false;
                if let Some(head) = shared
                    .queue
                    .lock()
                    .expect("command queue poisoned")
                    .pop_front()
                {
                    head.fail(EngineError::SessionNotActive);
                }
                continue;
            }
        }
        re_establish = false;

        let Some(command) = shared
            .queue
            .lock()
            .expect("command queue poisoned")
            .pop_front()
        else {
            continue;
        };
        let tag = command.tag();
        debug!(backend = shared.backend, tag, "Dispatching");
        dispatch(command, &mut handlers).await;
        debug!(backend = shared.backend, tag, "Completed");
    }
}

fn drain_on_close(shared: &Shared) {
    let drained: Vec<Command> = shared
        .queue
        .lock()
        .expect("command queue poisoned")
        .drain(..)
        .collect();
    for command in drained {
        command.fail(EngineError::Cancelled);
    }
}

/// Runs one command to completion and resolves its reply. This is the only
/// place the queue advances from; every arm resolves the completion exactly
/// once, success or failure.
async fn dispatch(command: Command, handlers: &mut Handlers) {
    match command {
        Command::StartSession { reply } => {
            let result = handlers.session.start_session().await;
            match &result {
                Ok(()) => handlers.emit(EngineEvent::SessionStarted {
                    backend: handlers.backend,
                }),
                Err(err) => handlers.note_failure(err),
            }
            let _ = reply.send(result);
        }
        Command::EndSession { reply } => {
            let result = handlers.session.end_session().await;
            // Status always resets on disconnect, even a noisy one.
            handlers
                .status
                .write()
                .expect("access status poisoned")
                .reset();
            handlers.emit(EngineEvent::AccessChanged(handlers.status_snapshot()));
            handlers.emit(EngineEvent::SessionEnded {
                backend: handlers.backend,
            });
            let _ = reply.send(result);
        }
        Command::AcquireLock { reply } => {
            let result = handlers.lock.acquire().await;
            match &result {
                Ok(status) => handlers.emit(EngineEvent::AccessChanged(status.clone())),
                Err(err) => handlers.note_failure(err),
            }
            let _ = reply.send(result);
        }
        Command::ReleaseLock { reply } => {
            let result = handlers.lock.release().await;
            match &result {
                Ok(status) => handlers.emit(EngineEvent::AccessChanged(status.clone())),
                Err(err) => handlers.note_failure(err),
            }
            let _ = reply.send(result);
        }
        Command::CompareLastUpdated { reply } => {
            let result = handlers.resolver.compare().await;
            match &result {
                Ok(outcome) => handlers.emit(EngineEvent::Compared {
                    outcome: outcome.comparison,
                    last_updated_by: outcome.last_updated_by.clone(),
                }),
                Err(err) => handlers.note_failure(err),
            }
            let _ = reply.send(result);
        }
        Command::CheckDatabaseFiles { reply } => {
            let result = handlers.transfer.preflight_database().await;
            if let Err(ref err) = result {
                handlers.note_failure(err);
            }
            let _ = reply.send(result);
        }
        Command::CopyDatabase { direction, reply } => {
            let result = match direction {
                Direction::Push => handlers.transfer.push_database().await.map(|_| ()),
                Direction::Pull => handlers.transfer.pull_database().await,
            };
            if let Err(ref err) = result {
                handlers.note_failure(err);
            }
            let _ = reply.send(result);
        }
        Command::CopyAllImages { direction, reply } => {
            let result = handlers.transfer.copy_all_images(direction).await;
            if let Err(ref err) = result {
                handlers.note_failure(err);
            }
            let _ = reply.send(result);
        }
        Command::SyncImages { direction, reply } => {
            let result = handlers.transfer.sync_images(direction).await;
            if let Err(ref err) = result {
                handlers.note_failure(err);
            }
            let _ = reply.send(result);
        }
        Command::FetchImage { name, reply } => {
            let result = handlers.transfer.fetch_image(&name).await;
            if let Err(ref err) = result {
                handlers.note_failure(err);
            }
            let _ = reply.send(result);
        }
        Command::SaveImage { name, data, reply } => {
            let result = handlers.transfer.save_image_data(&name, data).await;
            if let Err(ref err) = result {
                handlers.note_failure(err);
            }
            let _ = reply.send(result);
        }
        Command::DeleteImage { name, reply } => {
            let result = handlers.transfer.delete_image(&name).await;
            if let Err(ref err) = result {
                handlers.note_failure(err);
            }
            let _ = reply.send(result);
        }
        Command::FetchImageNames { reply } => {
            let result = handlers.transfer.fetch_image_names().await;
            if let Err(ref err) = result {
                handlers.note_failure(err);
            }
            let _ = reply.send(result);
        }
        Command::DiscoverDevices { reply } => {
            let result = match &handlers.discovery {
                Some(discovery) => discovery
                    .discover()
                    .await
                    .map_err(EngineError::Other),
                None => Err(EngineError::Protocol(
                    "discovery is not available for this backend".into(),
                )),
            };
            if let Ok(ref devices) = result {
                handlers.emit(EngineEvent::DiscoveryFinished {
                    devices: devices.clone(),
                });
            }
            let _ = reply.send(result);
        }
        Command::ListShares { reply } => {
            let result = handlers.client.list_shares().await.map_err(EngineError::Other);
            if let Err(ref err) = result {
                handlers.note_failure(err);
            }
            let _ = reply.send(result);
        }
        Command::ListDirectory { path, reply } => {
            let result = handlers
                .client
                .list_directory(&path)
                .await
                .map_err(EngineError::Other);
            if let Err(ref err) = result {
                handlers.note_failure(err);
            }
            let _ = reply.send(result);
        }
        Command::ListRepositoryEntries { reply } => {
            let result = handlers
                .client
                .list_directory("")
                .await
                .map_err(EngineError::Other)
                .map(|mut names| {
                    names.retain(|name| is_accepted_repository_name(name));
                    names.sort();
                    names
                });
            if let Err(ref err) = result {
                handlers.note_failure(err);
            }
            let _ = reply.send(result);
        }
        Command::FetchRepositoryFile { name, reply } => {
            let result = handlers
                .client
                .read_file(&name, None)
                .await
                .map_err(EngineError::Other);
            if let Err(ref err) = result {
                handlers.note_failure(err);
            }
            let _ = reply.send(result);
        }
    }
}
