//! Coordinate transforms: rewrite the sample position, then delegate to an
//! inner node.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::event::{forward_to, ChangeEvent, Link, Listener};
use crate::math::{Transform2D, Transform3D, Vec2, Vec3};
use crate::node::{Noise, NoiseRef};

/// Maps a sample coordinate to the coordinate handed to the inner node.
pub trait CoordinateTransform: Send + Sync {
    /// Rewrites a 1D coordinate.
    fn transform_1d(&self, x: f64) -> f64;

    /// Rewrites a 2D coordinate.
    fn transform_2d(&self, v: Vec2) -> Vec2;

    /// Rewrites a 3D coordinate.
    fn transform_3d(&self, v: Vec3) -> Vec3;
}

/// A node evaluating its inner node at transformed coordinates.
///
/// Evaluates to 0 when no inner node is set.
pub struct TransformNoise<T> {
    inner: RwLock<Option<Link>>,
    transform: T,
    changed: Arc<ChangeEvent>,
    forward: Listener,
}

impl<T: CoordinateTransform> TransformNoise<T> {
    /// Creates a transform node with no inner node.
    pub fn new(transform: T) -> Self {
        let changed = Arc::new(ChangeEvent::new());
        let forward = forward_to(&changed);
        Self {
            inner: RwLock::new(None),
            transform,
            changed,
            forward,
        }
    }

    /// The coordinate transform.
    pub fn transform(&self) -> &T {
        &self.transform
    }

    /// Replaces the inner node and rewires its change subscription.
    pub fn set_inner_noise(&self, node: Option<NoiseRef>) {
        let link = node.map(|node| Link::attach(node, Arc::clone(&self.forward)));
        let previous = std::mem::replace(&mut *self.inner.write(), link);
        drop(previous);
        self.changed.emit();
    }

    /// The inner node.
    #[must_use]
    pub fn inner_noise(&self) -> Option<NoiseRef> {
        self.inner.read().as_ref().map(|link| Arc::clone(link.node()))
    }

    /// Re-emits this node's change event.
    pub fn emit_changed(&self) {
        self.changed.emit();
    }
}

impl<T: CoordinateTransform + Default> Default for TransformNoise<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: CoordinateTransform> Noise for TransformNoise<T> {
    fn noise_1d(&self, x: f64) -> f64 {
        self.inner_noise()
            .map_or(0.0, |inner| inner.noise_1d(self.transform.transform_1d(x)))
    }

    fn noise_2d(&self, x: f64, y: f64) -> f64 {
        self.inner_noise().map_or(0.0, |inner| {
            inner.noise_2dv(self.transform.transform_2d(Vec2::new(x, y)))
        })
    }

    fn noise_3d(&self, x: f64, y: f64, z: f64) -> f64 {
        self.inner_noise().map_or(0.0, |inner| {
            inner.noise_3dv(self.transform.transform_3d(Vec3::new(x, y, z)))
        })
    }

    fn changed(&self) -> &ChangeEvent {
        &self.changed
    }

    fn children(&self) -> Option<Vec<Option<NoiseRef>>> {
        Some(vec![self.inner_noise()])
    }
}

impl<T> fmt::Debug for TransformNoise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformNoise")
            .field("inner", &*self.inner.read())
            .field("changed", &self.changed)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug)]
struct LinearParams {
    scale: f64,
    bias: f64,
    transform_2d: Transform2D,
    transform_3d: Transform3D,
}

/// `scale * x + bias` in 1D, affine matrices in 2D and 3D.
#[derive(Debug)]
pub struct Linear {
    params: RwLock<LinearParams>,
}

impl Default for Linear {
    fn default() -> Self {
        Self {
            params: RwLock::new(LinearParams {
                scale: 1.0,
                bias: 0.0,
                transform_2d: Transform2D::IDENTITY,
                transform_3d: Transform3D::IDENTITY,
            }),
        }
    }
}

impl CoordinateTransform for Linear {
    fn transform_1d(&self, x: f64) -> f64 {
        let p = self.params.read();
        p.scale * x + p.bias
    }

    fn transform_2d(&self, v: Vec2) -> Vec2 {
        self.params.read().transform_2d.xform(v)
    }

    fn transform_3d(&self, v: Vec3) -> Vec3 {
        self.params.read().transform_3d.xform(v)
    }
}

/// Inner node sampled through a [`Linear`] transform.
pub type LinearTransformNoise = TransformNoise<Linear>;

impl TransformNoise<Linear> {
    /// Sets the 1D multiplier.
    pub fn set_scale(&self, scale: f64) {
        self.transform.params.write().scale = scale;
        self.emit_changed();
    }

    /// The 1D multiplier.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.transform.params.read().scale
    }

    /// Sets the 1D offset.
    pub fn set_bias(&self, bias: f64) {
        self.transform.params.write().bias = bias;
        self.emit_changed();
    }

    /// The 1D offset.
    #[must_use]
    pub fn bias(&self) -> f64 {
        self.transform.params.read().bias
    }

    /// Sets the 2D affine transform.
    pub fn set_transform_2d(&self, transform: Transform2D) {
        self.transform.params.write().transform_2d = transform;
        self.emit_changed();
    }

    /// The 2D affine transform.
    #[must_use]
    pub fn transform_2d(&self) -> Transform2D {
        self.transform.params.read().transform_2d
    }

    /// Sets the 3D affine transform.
    pub fn set_transform_3d(&self, transform: Transform3D) {
        self.transform.params.write().transform_3d = transform;
        self.emit_changed();
    }

    /// The 3D affine transform.
    #[must_use]
    pub fn transform_3d(&self) -> Transform3D {
        self.transform.params.read().transform_3d
    }
}
