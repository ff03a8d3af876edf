//! Mutual exclusion for the host's shared diagnostic resources.
//!
//! The wireless radio cannot run two scans at once, and overlapping probe
//! traffic skews each other's measurements. One lock per resource class
//! arbitrates access; API-path callers use the non-blocking acquire and get
//! an immediate `Busy` rather than queueing behind a long-running scan.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// The statically-known exclusive resources on this host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    /// The wireless radio: one `iw` scan at a time.
    Radio,
    /// Probe traffic: ping / TCP check / speed test share the wire.
    ProbeSocket,
}

/// Holding the guard is holding the lock; dropping it releases on every
/// exit path, including cancellation.
pub type LockHandle = OwnedMutexGuard<()>;

#[derive(Clone)]
pub struct LockManager {
    radio: Arc<Mutex<()>>,
    probe_socket: Arc<Mutex<()>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self {
            radio: Arc::new(Mutex::new(())),
            probe_socket: Arc::new(Mutex::new(())),
        }
    }

    fn slot(&self, class: ResourceClass) -> Arc<Mutex<()>> {
        match class {
            ResourceClass::Radio => Arc::clone(&self.radio),
            ResourceClass::ProbeSocket => Arc::clone(&self.probe_socket),
        }
    }

    /// Non-blocking acquire. `None` means another holder is in flight.
    pub fn try_acquire(&self, class: ResourceClass) -> Option<LockHandle> {
        self.slot(class).try_lock_owned().ok()
    }

    /// Blocking acquire, for internal operations that must run eventually.
    pub async fn acquire(&self, class: ResourceClass) -> LockHandle {
        self.slot(class).lock_owned().await
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}
