//! Connection registry for operator visibility.
//!
//! Every accepted connection gets one entry recording who connected,
//! when, what the session is doing and how it ended. The registry is
//! shared across session threads and the operator console, so all
//! access goes through a mutex; callers hold ids, never references.

use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::SystemTime;

/// Lifecycle status of one client session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Accepted, command not yet received
    Pending,
    /// Exchange finished normally
    Completed,
    /// Session ended before any data exchange (busy or unavailable)
    Incompleted,
    /// A distribution file failed mid-stream
    Corrupted,
    /// Session aborted with an error
    Error(String),
}

/// One registry row.
#[derive(Debug, Clone)]
pub struct ConnectionEntry {
    /// Registry-assigned id, unique for the server lifetime
    pub id: u64,
    /// Client address and port
    pub peer: SocketAddr,
    /// Accept time
    pub accepted_at: SystemTime,
    pub status: ConnectionStatus,
    /// What kind of exchange is running ("Sending radio map files", ...)
    pub kind: String,
    /// Which artifact is currently moving ("Radio map mean file", ...)
    pub data_exchange: String,
}

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: u64,
    entries: Vec<ConnectionEntry>,
}

/// Mutex-guarded connection table, injected into the server and shared
/// with every session thread.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    inner: Mutex<RegistryInner>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly accepted connection and return its id.
    pub fn register(&self, peer: SocketAddr) -> u64 {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.entries.push(ConnectionEntry {
            id,
            peer,
            accepted_at: SystemTime::now(),
            status: ConnectionStatus::Pending,
            kind: String::new(),
            data_exchange: String::new(),
        });
        id
    }

    pub fn set_status(&self, id: u64, status: ConnectionStatus) {
        self.update(id, |entry| entry.status = status);
    }

    pub fn set_kind(&self, id: u64, kind: &str) {
        self.update(id, |entry| entry.kind = kind.to_string());
    }

    pub fn set_data_exchange(&self, id: u64, label: &str) {
        self.update(id, |entry| entry.data_exchange = label.to_string());
    }

    /// Copy of the whole table for operator display.
    pub fn snapshot(&self) -> Vec<ConnectionEntry> {
        self.lock().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    fn update(&self, id: u64, apply: impl FnOnce(&mut ConnectionEntry)) {
        let mut inner = self.lock();
        if let Some(entry) = inner.entries.iter_mut().find(|e| e.id == id) {
            apply(entry);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryInner> {
        // A poisoned registry only means a session thread panicked; the
        // table itself is still usable for the operator.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
