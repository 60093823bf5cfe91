//! # Evaluable Node Contract
//!
//! Every node in a noise graph (operators, proxies, transforms, rescalers and
//! leaf generators) implements [`Noise`]. Nodes are shared through
//! [`NoiseRef`] handles: the graph is a DAG, and a node lives for as long as
//! any parent (or the host) still references it.
//!
//! All mutation goes through `&self` setters backed by interior mutability,
//! because a shared node cannot be borrowed mutably. Nodes are `Send + Sync`
//! so a rescaler's worker thread can sample the subgraph it wraps.

use std::sync::Arc;

use crate::event::{ChangeEvent, Listener, ListenerId};
use crate::math::{Vec2, Vec3};
use crate::seeder::WorldSeed;

/// Shared handle to a node.
pub type NoiseRef = Arc<dyn Noise>;

/// Identity of a node, stable for as long as the node is alive.
pub type NodeId = usize;

/// Returns the identity of the node behind `node`.
#[must_use]
pub fn node_id(node: &NoiseRef) -> NodeId {
    Arc::as_ptr(node).cast::<()>() as usize
}

/// A scalar field that can be sampled in one, two or three dimensions and
/// reports when its output may have changed.
///
/// The vector and scalar forms of the 2D/3D calls are equivalent.
pub trait Noise: Send + Sync {
    /// Samples the field on a line.
    fn noise_1d(&self, x: f64) -> f64;

    /// Samples the field on a plane.
    fn noise_2d(&self, x: f64, y: f64) -> f64;

    /// Samples the field on a plane.
    fn noise_2dv(&self, v: Vec2) -> f64 {
        self.noise_2d(v.x, v.y)
    }

    /// Samples the field in space.
    fn noise_3d(&self, x: f64, y: f64, z: f64) -> f64;

    /// Samples the field in space.
    fn noise_3dv(&self, v: Vec3) -> f64 {
        self.noise_3d(v.x, v.y, v.z)
    }

    /// The event emitted whenever this node's output may have changed.
    fn changed(&self) -> &ChangeEvent;

    /// Child slots of a composite node, in slot order.
    ///
    /// `None` marks a terminal node whose internals are private. Empty slots
    /// are reported as `Some(None)` entries.
    fn children(&self) -> Option<Vec<Option<NoiseRef>>> {
        None
    }

    /// The seed-acceptance capability of a leaf generator, if any.
    fn as_seedable(&self) -> Option<&dyn Seedable> {
        None
    }

    /// Registers a change listener.
    fn on_change(&self, listener: Listener) -> ListenerId {
        self.changed().connect_shared(listener)
    }

    /// Removes a change listener. Returns false if it was not registered.
    fn remove_listener(&self, id: ListenerId) -> bool {
        self.changed().disconnect(id)
    }
}

/// A leaf generator whose output is derived from an integer seed.
pub trait Seedable: Send + Sync {
    /// Replaces the seed. Implementations emit their change event.
    fn set_seed(&self, seed: WorldSeed);

    /// The current seed.
    fn seed(&self) -> WorldSeed;
}
