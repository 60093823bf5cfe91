//! # Seed Propagation
//!
//! Pushes one root seed down to every seedable leaf reachable from a root.
//!
//! ```text
//!   set_seed(s)
//!       │
//!       ▼
//!   BFS from root ──> leaves in discovery order ──> ChaCha8(s) draws
//!                                                        │
//!                                                        ▼
//!                                     DeferredQueue ──drain()──> leaf.set_seed()
//! ```
//!
//! ## Determinism Guarantee
//!
//! The same graph shape and the same root seed always assign the same
//! sub-seeds in the same order. A leaf reachable through several parents is
//! seeded once per propagation.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::node::{node_id, NodeId, NoiseRef};

/// Seed for deterministic generation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorldSeed(u64);

impl WorldSeed {
    /// Creates a new seed.
    #[inline]
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Returns the raw seed value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Initial seed of a seeder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeederConfig {
    /// Root seed.
    ///
    /// Written as the signed 64-bit integer with the same bits, since TOML
    /// integers are signed. Every `u64` survives a round trip, and a
    /// negative value in a file names the seed `2^64 + value`.
    #[serde(with = "signed_bits")]
    pub seed: u64,
}

mod signed_bits {
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref, clippy::cast_possible_wrap)]
    pub(super) fn serialize<S: Serializer>(seed: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(*seed as i64)
    }

    #[allow(clippy::cast_sign_loss)]
    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        i64::deserialize(deserializer).map(|bits| bits as u64)
    }
}

struct SeedCall {
    node: NoiseRef,
    seed: WorldSeed,
}

/// Seed calls waiting to be applied on the owning context.
///
/// Clones share one queue, so several seeders can feed a single drain point.
#[derive(Clone)]
pub struct DeferredQueue {
    sender: Sender<SeedCall>,
    receiver: Receiver<SeedCall>,
}

impl DeferredQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        Self { sender, receiver }
    }

    fn push(&self, node: NoiseRef, seed: WorldSeed) {
        // The queue owns a receiver, so the channel cannot be disconnected.
        let _ = self.sender.send(SeedCall { node, seed });
    }

    /// Applies the calls queued before this call and returns how many ran.
    ///
    /// Calls queued by listeners while draining wait for the next drain.
    pub fn drain(&self) -> usize {
        let queued = self.receiver.len();
        let mut applied = 0;
        for call in self.receiver.try_iter().take(queued) {
            if let Some(leaf) = call.node.as_seedable() {
                tracing::trace!(seed = call.seed.value(), "applying deferred seed");
                leaf.set_seed(call.seed);
                applied += 1;
            }
        }
        applied
    }

    /// Number of calls waiting.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

impl Default for DeferredQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DeferredQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredQueue")
            .field("pending", &self.pending())
            .finish()
    }
}

/// Breadth-first search for seedable leaves.
///
/// Structural nodes are expanded; leaves are collected but not expanded.
/// Each reachable node is visited at most once.
fn collect_leaves(root: &NoiseRef) -> (Vec<NoiseRef>, usize) {
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut frontier: VecDeque<NoiseRef> = VecDeque::new();
    let mut leaves = Vec::new();

    visited.insert(node_id(root));
    frontier.push_back(Arc::clone(root));

    while let Some(node) = frontier.pop_front() {
        if let Some(children) = node.children() {
            for child in children.into_iter().flatten() {
                if visited.insert(node_id(&child)) {
                    frontier.push_back(child);
                }
            }
        } else if node.as_seedable().is_some() {
            leaves.push(node);
        }
    }

    (leaves, visited.len())
}

/// Assigns deterministic sub-seeds to every leaf under a root.
pub struct NoiseSeeder {
    noise: Option<NoiseRef>,
    seed: WorldSeed,
    queue: DeferredQueue,
}

impl NoiseSeeder {
    /// Creates a seeder with seed 0, no root and a private queue.
    #[must_use]
    pub fn new() -> Self {
        Self::with_queue(DeferredQueue::new())
    }

    /// Creates a seeder feeding `queue`.
    #[must_use]
    pub fn with_queue(queue: DeferredQueue) -> Self {
        Self {
            noise: None,
            seed: WorldSeed::default(),
            queue,
        }
    }

    /// Creates a seeder with a configured initial seed.
    #[must_use]
    pub fn with_config(config: &SeederConfig) -> Self {
        let mut seeder = Self::new();
        seeder.seed = WorldSeed::new(config.seed);
        seeder
    }

    /// Stores the seed and reseeds the graph if a root is set.
    pub fn set_seed(&mut self, seed: WorldSeed) {
        self.seed = seed;
        self.propagate();
    }

    /// The root seed.
    #[must_use]
    pub fn seed(&self) -> WorldSeed {
        self.seed
    }

    /// Stores the root and reseeds it with the current seed.
    pub fn set_noise(&mut self, noise: Option<NoiseRef>) {
        self.noise = noise;
        self.propagate();
    }

    /// The root node.
    #[must_use]
    pub fn noise(&self) -> Option<&NoiseRef> {
        self.noise.as_ref()
    }

    /// The queue seed calls are posted to.
    #[must_use]
    pub fn queue(&self) -> &DeferredQueue {
        &self.queue
    }

    /// Queues one sub-seed per leaf. Returns the number of leaves found.
    fn propagate(&self) -> usize {
        let Some(root) = &self.noise else {
            return 0;
        };

        let (leaves, visited) = collect_leaves(root);
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed.value());
        for leaf in &leaves {
            self.queue.push(Arc::clone(leaf), WorldSeed::new(rng.gen()));
        }

        tracing::debug!(
            seed = self.seed.value(),
            visited,
            leaves = leaves.len(),
            "seed propagation queued"
        );
        leaves.len()
    }
}

impl fmt::Debug for NoiseSeeder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoiseSeeder")
            .field("noise", &self.noise.as_ref().map(node_id))
            .field("seed", &self.seed)
            .field("queue", &self.queue)
            .finish()
    }
}

impl Default for NoiseSeeder {
    fn default() -> Self {
        Self::new()
    }
}
