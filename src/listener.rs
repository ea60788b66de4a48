//! Per-address listener registry for group value notifications.
//!
//! A session dispatches every received group write/response through this
//! registry so callers can react to bus activity without polling the
//! value cache.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use log::error;

use crate::addressing::GroupAddress;

/// A group-value listener callback
///
/// Invoked with the group address the message was sent to and the raw
/// APDU payload.
pub type ListenerFn = Box<dyn Fn(GroupAddress, &[u8]) + Send + Sync>;

/// Opaque handle returned by [`ListenerRegistry::register`], used to remove
/// the listener later via [`ListenerRegistry::unregister`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Registry of per-address listener callbacks
///
/// Each `TunnelSession` owns its own registry; listeners registered on one
/// session are never visible to another.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: DashMap<GroupAddress, Vec<(ListenerId, ListenerFn)>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("addresses", &self.listeners.len())
            .finish()
    }
}

impl ListenerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self { listeners: DashMap::new(), next_id: AtomicU64::new(0) }
    }

    /// Register `func` to be called whenever a message for `address` is
    /// received
    ///
    /// Multiple listeners may be registered for the same address. Returns a
    /// handle that can be passed to [`Self::unregister`].
    pub fn register(&self, address: GroupAddress, func: ListenerFn) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.entry(address).or_default().push((id, func));
        id
    }

    /// Remove a previously registered listener
    ///
    /// Returns `true` if a listener with this handle was found and removed,
    /// `false` if the address has no listeners or the handle is unknown --
    /// never panics on an address that was never registered.
    pub fn unregister(&self, address: GroupAddress, id: ListenerId) -> bool {
        let Some(mut listeners) = self.listeners.get_mut(&address) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Dispatch a received message to every listener registered for
    /// `address`
    ///
    /// Each listener is called in isolation: a panic inside one listener is
    /// caught and logged, and does not prevent the remaining listeners from
    /// running.
    pub fn dispatch(&self, address: GroupAddress, data: &[u8]) {
        let Some(listeners) = self.listeners.get(&address) else {
            return;
        };
        for (_, func) in listeners.iter() {
            let result = catch_unwind(AssertUnwindSafe(|| func(address, data)));
            if let Err(panic) = result {
                let msg = panic
                    .downcast_ref::<&str>()
                    .copied()
                    .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
                    .unwrap_or("unknown panic");
                error!("listener for {address} panicked: {msg}");
            }
        }
    }
}
