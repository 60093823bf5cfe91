//! # Fixed-Arity Operator
//!
//! A node holding `N` child slots and a pure combining function.
//!
//! ```text
//!   slot 0 ──┐
//!   slot 1 ──┼──> [f64; N] ──> combine() ──> value
//!   slot 2 ──┘    (0.0 for empty slots)
//! ```
//!
//! The arity is a const generic, so it is fixed for the lifetime of the node
//! and the per-sample input buffer lives on the stack.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::error::{NoiseError, NoiseResult};
use crate::event::{forward_to, ChangeEvent, Listener, LinkSet};
use crate::node::{Noise, NoiseRef};

/// A pure N-ary scalar function.
///
/// Implemented for plain closures, and for the parameterized kinds in
/// [`crate::operators`] which read their parameters on every call.
pub trait Combine<const N: usize>: Send + Sync {
    /// Combines the children's values, in slot order.
    fn combine(&self, inputs: &[f64; N]) -> f64;
}

impl<const N: usize, F> Combine<N> for F
where
    F: Fn(&[f64; N]) -> f64 + Send + Sync,
{
    fn combine(&self, inputs: &[f64; N]) -> f64 {
        self(inputs)
    }
}

/// Generic node with `N` operand slots.
pub struct Operator<const N: usize, K> {
    operands: RwLock<[Option<NoiseRef>; N]>,
    links: Mutex<LinkSet>,
    function: K,
    changed: Arc<ChangeEvent>,
    forward: Listener,
}

impl<const N: usize, K: Combine<N>> Operator<N, K> {
    /// Creates an operator with every slot empty.
    pub fn new(function: K) -> Self {
        let changed = Arc::new(ChangeEvent::new());
        let forward = forward_to(&changed);
        Self {
            operands: RwLock::new(std::array::from_fn(|_| None)),
            links: Mutex::new(LinkSet::default()),
            function,
            changed,
            forward,
        }
    }

    /// Number of operand slots.
    #[must_use]
    pub const fn operand_count(&self) -> usize {
        N
    }

    /// The combining function.
    pub fn function(&self) -> &K {
        &self.function
    }

    /// Stores `node` in slot `index` and rewires the change subscription.
    ///
    /// # Errors
    ///
    /// Returns [`NoiseError::InvalidIndex`] if `index >= N`. Existing slots
    /// are left untouched in that case.
    pub fn set_operand(&self, index: usize, node: Option<NoiseRef>) -> NoiseResult<()> {
        if index >= N {
            tracing::warn!(index, arity = N, "rejected operand index");
            return Err(NoiseError::InvalidIndex { index, arity: N });
        }
        self.replace(index, node);
        Ok(())
    }

    /// The node in slot `index`, if the index is valid and the slot is set.
    #[must_use]
    pub fn operand(&self, index: usize) -> Option<NoiseRef> {
        self.operands.read().get(index).cloned().flatten()
    }

    /// Re-emits this node's change event.
    pub fn emit_changed(&self) {
        self.changed.emit();
    }

    /// Listener that forwards into this node's change event.
    pub(crate) fn forwarder(&self) -> &Listener {
        &self.forward
    }

    pub(crate) fn replace(&self, index: usize, node: Option<NoiseRef>) {
        let (previous, released) = {
            let mut operands = self.operands.write();
            let previous = std::mem::replace(&mut operands[index], node);
            let released = self
                .links
                .lock()
                .sync(operands.iter().flatten(), &self.forward);
            (previous, released)
        };
        // Released children are dropped with no lock held: a rescaler joins
        // its worker on drop, and that worker may read this node.
        drop(released);
        drop(previous);
        self.changed.emit();
    }

    fn gather(&self, sample: impl Fn(&dyn Noise) -> f64) -> f64 {
        let mut inputs = [0.0; N];
        {
            let operands = self.operands.read();
            for (input, operand) in inputs.iter_mut().zip(operands.iter()) {
                if let Some(node) = operand {
                    *input = sample(node.as_ref());
                }
            }
        }
        self.function.combine(&inputs)
    }
}

impl<const N: usize, K: Combine<N> + Default> Default for Operator<N, K> {
    fn default() -> Self {
        Self::new(K::default())
    }
}

impl<const N: usize, K: Combine<N>> Noise for Operator<N, K> {
    fn noise_1d(&self, x: f64) -> f64 {
        self.gather(|node| node.noise_1d(x))
    }

    fn noise_2d(&self, x: f64, y: f64) -> f64 {
        self.gather(|node| node.noise_2d(x, y))
    }

    fn noise_3d(&self, x: f64, y: f64, z: f64) -> f64 {
        self.gather(|node| node.noise_3d(x, y, z))
    }

    fn changed(&self) -> &ChangeEvent {
        &self.changed
    }

    fn children(&self) -> Option<Vec<Option<NoiseRef>>> {
        Some(self.operands.read().to_vec())
    }
}

impl<const N: usize, K> fmt::Debug for Operator<N, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let occupied = self.operands.read().iter().filter(|slot| slot.is_some()).count();
        f.debug_struct("Operator")
            .field("arity", &N)
            .field("occupied", &occupied)
            .field("changed", &self.changed)
            .finish_non_exhaustive()
    }
}

// ── Named slots ─────────────────────────────────────────────────────

impl<K: Combine<1>> Operator<1, K> {
    /// Sets the single source operand.
    pub fn set_source(&self, node: Option<NoiseRef>) {
        self.replace(0, node);
    }

    /// The single source operand.
    #[must_use]
    pub fn source(&self) -> Option<NoiseRef> {
        self.operand(0)
    }
}

impl<K: Combine<2>> Operator<2, K> {
    /// Sets the first operand.
    pub fn set_first_noise(&self, node: Option<NoiseRef>) {
        self.replace(0, node);
    }

    /// The first operand.
    #[must_use]
    pub fn first_noise(&self) -> Option<NoiseRef> {
        self.operand(0)
    }

    /// Sets the second operand.
    pub fn set_second_noise(&self, node: Option<NoiseRef>) {
        self.replace(1, node);
    }

    /// The second operand.
    #[must_use]
    pub fn second_noise(&self) -> Option<NoiseRef> {
        self.operand(1)
    }
}

impl<K: Combine<3>> Operator<3, K> {
    /// Sets the operand picked when the selector is low.
    pub fn set_first_noise(&self, node: Option<NoiseRef>) {
        self.replace(0, node);
    }

    /// The operand picked when the selector is low.
    #[must_use]
    pub fn first_noise(&self) -> Option<NoiseRef> {
        self.operand(0)
    }

    /// Sets the operand picked when the selector is high.
    pub fn set_second_noise(&self, node: Option<NoiseRef>) {
        self.replace(1, node);
    }

    /// The operand picked when the selector is high.
    #[must_use]
    pub fn second_noise(&self) -> Option<NoiseRef> {
        self.operand(1)
    }

    /// Sets the selector operand.
    pub fn set_selector_noise(&self, node: Option<NoiseRef>) {
        self.replace(2, node);
    }

    /// The selector operand.
    #[must_use]
    pub fn selector_noise(&self) -> Option<NoiseRef> {
        self.operand(2)
    }
}
