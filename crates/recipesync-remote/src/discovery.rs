//! Device discovery for the share backend
//!
//! Broadcasts a probe datagram and collects replies for a fixed 3-second
//! window. Each reply carries the responding device's network name; names
//! are deduplicated into a set and returned alphabetically sorted. The scan
//! ends only when the window timer expires or the caller's
//! [`DiscoveryHandle`] stops it - there is no general cancellation hook.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::UdpSocket;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::share::SHARE_PORT;

/// Fixed scan window
pub const DISCOVERY_WINDOW: Duration = Duration::from_secs(3);

/// Probe payload recognized by share servers
const PROBE: &[u8] = b"RECIPESYNC_DISCOVER";

/// External stop control for an in-flight scan
///
/// Each scan registers its own wakeup at start, so a stop issued while
/// nothing is scanning is a no-op rather than a stored permit that would
/// abort the next scan at its first poll.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryHandle {
    active: Arc<Mutex<Option<Arc<Notify>>>>,
}

impl DiscoveryHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ends the in-flight scan early, if any; the partial result is still
    /// returned
    pub fn stop(&self) {
        if let Some(stop) = self
            .active
            .lock()
            .expect("discovery handle poisoned")
            .as_ref()
        {
            stop.notify_one();
        }
    }

    fn register(&self) -> Arc<Notify> {
        let stop = Arc::new(Notify::new());
        *self.active.lock().expect("discovery handle poisoned") = Some(stop.clone());
        stop
    }

    fn clear(&self) {
        *self.active.lock().expect("discovery handle poisoned") = None;
    }
}

/// Runs one discovery scan and returns the sorted device-name list
///
/// Listens on an ephemeral port, broadcasts the probe once, then gathers
/// replies until the window closes or `handle.stop()` fires.
pub async fn discover_devices(handle: &DiscoveryHandle) -> Result<Vec<String>> {
    let stop = handle.register();
    let result = run_scan(&stop).await;
    handle.clear();
    result
}

async fn run_scan(stop: &Notify) -> Result<Vec<String>> {
    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .context("Failed to bind discovery socket")?;
    socket
        .set_broadcast(true)
        .context("Failed to enable broadcast")?;
    socket
        .send_to(PROBE, ("255.255.255.255", SHARE_PORT))
        .await
        .context("Failed to send discovery probe")?;

    let deadline = Instant::now() + DISCOVERY_WINDOW;
    let mut devices: BTreeSet<String> = BTreeSet::new();
    let mut buf = [0u8; 512];

    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {
                debug!("Discovery window expired");
                break;
            }
            _ = stop.notified() => {
                debug!("Discovery stopped by caller");
                break;
            }
            received = socket.recv_from(&mut buf) => {
                let (n, peer) = received.context("Discovery receive failed")?;
                let name = String::from_utf8_lossy(&buf[..n]).trim().to_string();
                if !name.is_empty() {
                    debug!(%peer, %name, "Discovery reply");
                    devices.insert(name);
                }
            }
        }
    }

    // BTreeSet iteration is already alphabetical.
    let devices: Vec<String> = devices.into_iter().collect();
    info!(count = devices.len(), "Discovery finished");
    Ok(devices)
}

/// [`DeviceDiscovery`] port implementation over the broadcast scan
///
/// [`DeviceDiscovery`]: recipesync_core::ports::DeviceDiscovery
#[derive(Debug, Clone, Default)]
pub struct BroadcastDiscovery {
    handle: DiscoveryHandle,
}

impl BroadcastDiscovery {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl recipesync_core::ports::DeviceDiscovery for BroadcastDiscovery {
    async fn discover(&self) -> Result<Vec<String>> {
        discover_devices(&self.handle).await
    }

    fn stop(&self) {
        self.handle.stop();
    }
}
