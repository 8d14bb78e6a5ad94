// Subscription registry: at most one live streaming session per identity.
// Registering a new session evicts the previous one (last writer wins);
// eviction is signalled to the old connection task, which closes its socket.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::oneshot;

/// Resolves an opaque session token to an identity, or None when
/// unauthenticated. Only used to key the registry; the verification
/// mechanism itself lives behind this seam.
pub trait IdentityResolver: Send + Sync + 'static {
    fn resolve(&self, token: &str) -> Option<String>;
}

/// Default resolver: any non-empty token is its own identity. The real
/// deployment sits behind an auth proxy that already validated the token.
pub struct TokenIdentity;

impl IdentityResolver for TokenIdentity {
    fn resolve(&self, token: &str) -> Option<String> {
        let token = token.trim();
        if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        }
    }
}

struct SessionSlot {
    id: u64,
    evict_tx: oneshot::Sender<()>,
}

/// Handed to a connection task on registration. Dropping the receiver does
/// not deregister; the task must call `deregister` with its slot id.
pub struct SessionTicket {
    pub id: u64,
    pub evicted_rx: oneshot::Receiver<()>,
}

#[derive(Default)]
pub struct SessionRegistry {
    slots: Mutex<HashMap<String, SessionSlot>>,
    next_id: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session for `identity`, evicting any prior one.
    pub fn register(&self, identity: &str) -> SessionTicket {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (evict_tx, evicted_rx) = oneshot::channel();
        let prior = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots.insert(identity.to_string(), SessionSlot { id, evict_tx })
        };
        if let Some(old) = prior {
            tracing::info!(identity, old_session = old.id, new_session = id, "Session evicted");
            // Receiver may already be gone if the old task exited on its own.
            let _ = old.evict_tx.send(());
        }
        SessionTicket { id, evicted_rx }
    }

    /// Remove the session only if `id` still owns the slot, so an evicted
    /// task cannot tear down its successor.
    pub fn deregister(&self, identity: &str, id: u64) -> bool {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        match slots.get(identity) {
            Some(slot) if slot.id == id => {
                slots.remove(identity);
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Clamp a client-requested cadence to the configured minimum.
pub fn clamp_cadence(timer: Option<u64>, min_secs: u64) -> u64 {
    timer.unwrap_or(min_secs).max(min_secs)
}
