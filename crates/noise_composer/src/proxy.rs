//! # Caching Proxy
//!
//! Wraps one source and remembers the last coordinate/value pair per
//! dimensionality. When a shared subgraph is reached from several parents at
//! the same coordinate during one traversal, only the first visit evaluates
//! it.
//!
//! This is not a general cache: a different coordinate always recomputes.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::event::{ChangeEvent, Link};
use crate::math::{is_equal_approx, Vec2, Vec3};
use crate::node::{Noise, NoiseRef};

#[derive(Clone, Copy, Debug, Default)]
struct Entry<C> {
    coord: C,
    value: f64,
    valid: bool,
}

#[derive(Debug, Default)]
struct Cache {
    one: Entry<f64>,
    two: Entry<Vec2>,
    three: Entry<Vec3>,
}

impl Cache {
    fn invalidate(&mut self) {
        self.one.valid = false;
        self.two.valid = false;
        self.three.valid = false;
    }
}

struct Shared {
    source: RwLock<Option<Link>>,
    cache: Mutex<Cache>,
    changed: ChangeEvent,
}

impl Shared {
    fn source(&self) -> Option<NoiseRef> {
        self.source.read().as_ref().map(|link| Arc::clone(link.node()))
    }

    fn on_source_changed(&self) {
        self.cache.lock().invalidate();
        self.changed.emit();
    }
}

/// Memoizing wrapper around a single source node.
pub struct ProxyNoise {
    shared: Arc<Shared>,
}

impl ProxyNoise {
    /// Creates a proxy with no source.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                source: RwLock::new(None),
                cache: Mutex::new(Cache::default()),
                changed: ChangeEvent::new(),
            }),
        }
    }

    /// Replaces the source, drops every cached entry and emits.
    pub fn set_source(&self, node: Option<NoiseRef>) {
        let link = node.map(|node| {
            let weak: Weak<Shared> = Arc::downgrade(&self.shared);
            Link::attach(
                node,
                Arc::new(move || {
                    if let Some(shared) = weak.upgrade() {
                        shared.on_source_changed();
                    }
                }),
            )
        });
        let previous = std::mem::replace(&mut *self.shared.source.write(), link);
        drop(previous);
        self.shared.on_source_changed();
    }

    /// The current source.
    #[must_use]
    pub fn source(&self) -> Option<NoiseRef> {
        self.shared.source()
    }
}

impl Default for ProxyNoise {
    fn default() -> Self {
        Self::new()
    }
}

impl Noise for ProxyNoise {
    fn noise_1d(&self, x: f64) -> f64 {
        let Some(source) = self.shared.source() else {
            return 0.0;
        };
        {
            let cache = self.shared.cache.lock();
            if cache.one.valid && is_equal_approx(x, cache.one.coord) {
                return cache.one.value;
            }
        }
        let value = source.noise_1d(x);
        self.shared.cache.lock().one = Entry { coord: x, value, valid: true };
        value
    }

    fn noise_2d(&self, x: f64, y: f64) -> f64 {
        let Some(source) = self.shared.source() else {
            return 0.0;
        };
        let coord = Vec2::new(x, y);
        {
            let cache = self.shared.cache.lock();
            if cache.two.valid && cache.two.coord.is_equal_approx(coord) {
                return cache.two.value;
            }
        }
        let value = source.noise_2d(x, y);
        self.shared.cache.lock().two = Entry { coord, value, valid: true };
        value
    }

    fn noise_3d(&self, x: f64, y: f64, z: f64) -> f64 {
        let Some(source) = self.shared.source() else {
            return 0.0;
        };
        let coord = Vec3::new(x, y, z);
        {
            let cache = self.shared.cache.lock();
            if cache.three.valid && cache.three.coord.is_equal_approx(coord) {
                return cache.three.value;
            }
        }
        let value = source.noise_3d(x, y, z);
        self.shared.cache.lock().three = Entry { coord, value, valid: true };
        value
    }

    fn changed(&self) -> &ChangeEvent {
        &self.shared.changed
    }

    fn children(&self) -> Option<Vec<Option<NoiseRef>>> {
        Some(vec![self.source()])
    }
}

impl fmt::Debug for ProxyNoise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyNoise")
            .field("source", &*self.shared.source.read())
            .field("cache", &*self.shared.cache.lock())
            .finish()
    }
}
