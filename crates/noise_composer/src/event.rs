//! # Change Notification
//!
//! Observer-style invalidation for the noise DAG.
//!
//! ## Flow
//!
//! ```text
//!   leaf.set_seed()          (mutation)
//!        │ emit
//!        ▼
//!   ┌──────────┐  emit   ┌──────────┐  emit   ┌──────────┐
//!   │  child   │ ──────> │  parent  │ ──────> │   root   │ ──> host listener
//!   └──────────┘         └──────────┘         └──────────┘
//! ```
//!
//! Parents never hold a strong reference back to themselves through a
//! listener: forwarding closures capture a `Weak` to the parent's event so
//! dropping a parent releases it even while children are still alive.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::node::{node_id, NodeId, NoiseRef};

/// A change callback. Takes no arguments, like the host-facing contract.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Handle identifying one registered listener on one [`ChangeEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A set of change listeners owned by a node.
#[derive(Default)]
pub struct ChangeEvent {
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_id: AtomicU64,
}

impl ChangeEvent {
    /// Creates an event with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener and returns the handle needed to remove it.
    pub fn connect<F>(&self, listener: F) -> ListenerId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.connect_shared(Arc::new(listener))
    }

    /// Registers an already shared listener.
    pub fn connect_shared(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, listener));
        id
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn disconnect(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Invokes every listener registered at the time of the call.
    ///
    /// The listener list is snapshotted first, so callbacks may connect or
    /// disconnect listeners (on this event or others) without deadlocking.
    pub fn emit(&self) {
        let snapshot: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in snapshot {
            listener();
        }
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl fmt::Debug for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeEvent")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Builds a listener that re-emits on `event` for as long as it is alive.
pub(crate) fn forward_to(event: &Arc<ChangeEvent>) -> Listener {
    let weak: Weak<ChangeEvent> = Arc::downgrade(event);
    Arc::new(move || {
        if let Some(event) = weak.upgrade() {
            event.emit();
        }
    })
}

/// A child reference together with the listener registered on it.
///
/// Dropping the link disconnects the listener, so replacing or clearing a
/// slot can never leave a stale subscription behind.
pub struct Link {
    node: NoiseRef,
    listener: ListenerId,
}

impl Link {
    /// Subscribes `listener` to `node`'s change event.
    pub fn attach(node: NoiseRef, listener: Listener) -> Self {
        let listener = node.changed().connect_shared(listener);
        Self { node, listener }
    }

    /// The linked child.
    #[must_use]
    pub fn node(&self) -> &NoiseRef {
        &self.node
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.node.changed().disconnect(self.listener);
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("node", &node_id(&self.node))
            .field("listener", &self.listener)
            .finish()
    }
}

/// One subscription per distinct child, however many slots hold it.
///
/// A child referenced from two slots of the same parent still notifies that
/// parent exactly once per mutation.
#[derive(Debug, Default)]
pub(crate) struct LinkSet {
    links: Vec<Link>,
}

impl LinkSet {
    /// Re-synchronizes subscriptions with the current slot occupants.
    ///
    /// Returns the links that are no longer wanted. The caller drops them
    /// once its own locks are released.
    #[must_use = "released links must be dropped outside the caller's locks"]
    pub(crate) fn sync<'a, I>(&mut self, occupants: I, listener: &Listener) -> Vec<Link>
    where
        I: IntoIterator<Item = &'a NoiseRef>,
    {
        let mut wanted: Vec<(NodeId, &NoiseRef)> = Vec::new();
        for node in occupants {
            let id = node_id(node);
            if !wanted.iter().any(|(existing, _)| *existing == id) {
                wanted.push((id, node));
            }
        }

        let (kept, released): (Vec<Link>, Vec<Link>) = std::mem::take(&mut self.links)
            .into_iter()
            .partition(|link| wanted.iter().any(|(id, _)| *id == node_id(link.node())));
        self.links = kept;

        for (id, node) in wanted {
            if !self.links.iter().any(|link| node_id(link.node()) == id) {
                self.links
                    .push(Link::attach(Arc::clone(node), Arc::clone(listener)));
            }
        }
        released
    }

    /// Number of live subscriptions.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.links.len()
    }
}
