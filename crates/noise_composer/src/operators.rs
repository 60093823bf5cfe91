//! # Operator Catalog
//!
//! Concrete combining functions for [`Operator`].
//!
//! | Node       | Arity | Function                                          |
//! |------------|-------|---------------------------------------------------|
//! | Constant   | 0     | stored value                                      |
//! | Add        | 2     | `a0 + a1`                                         |
//! | Multiply   | 2     | `a0 * a1`                                         |
//! | Max / Min  | 2     | `max(a0, a1)` / `min(a0, a1)`                     |
//! | Power      | 2     | `a0 ^ a1` (empty slots give `0 ^ 0 = 1`)          |
//! | Absolute   | 1     | `|a0|`                                            |
//! | Invert     | 1     | `-a0`                                             |
//! | Clamp      | 1     | `clamp(a0, lower, upper)`, optionally to `[0, 1]` |
//! | Curve      | 1     | `curve((a0 + 1) / 2)`                             |
//! | Affine     | 1     | `scale * a0 + bias`                               |
//! | Mix        | 3     | `r * a1 + (1 - r) * a0`, `r = (a2 + 1) / 2`       |
//! | Select     | 3     | `a0` if `a2 < threshold` else `a1`                |
//!
//! Parameter setters take `&self` and emit the node's change event.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::event::{ChangeEvent, ListenerId};
use crate::math::ScaleBias;
use crate::operator::{Combine, Operator};

// ── Constant ────────────────────────────────────────────────────────

/// Arity-0 kind returning a stored value.
#[derive(Debug, Default)]
pub struct Constant {
    value: RwLock<f64>,
}

impl Combine<0> for Constant {
    fn combine(&self, _inputs: &[f64; 0]) -> f64 {
        *self.value.read()
    }
}

/// Node evaluating to the same value everywhere.
pub type ConstantNoise = Operator<0, Constant>;

impl Operator<0, Constant> {
    /// Creates a constant node.
    #[must_use]
    pub fn with_value(value: f64) -> Self {
        Self::new(Constant { value: RwLock::new(value) })
    }

    /// Replaces the value.
    pub fn set_value(&self, value: f64) {
        *self.function().value.write() = value;
        self.emit_changed();
    }

    /// The stored value.
    #[must_use]
    pub fn value(&self) -> f64 {
        *self.function().value.read()
    }
}

// ── Combiners ───────────────────────────────────────────────────────

/// `a0 + a1`
#[derive(Clone, Copy, Debug, Default)]
pub struct Add;

impl Combine<2> for Add {
    fn combine(&self, a: &[f64; 2]) -> f64 {
        a[0] + a[1]
    }
}

/// `a0 * a1`
#[derive(Clone, Copy, Debug, Default)]
pub struct Multiply;

impl Combine<2> for Multiply {
    fn combine(&self, a: &[f64; 2]) -> f64 {
        a[0] * a[1]
    }
}

/// `max(a0, a1)`; on ties or NaN the first operand wins.
#[derive(Clone, Copy, Debug, Default)]
pub struct Max;

impl Combine<2> for Max {
    fn combine(&self, a: &[f64; 2]) -> f64 {
        if a[0] < a[1] {
            a[1]
        } else {
            a[0]
        }
    }
}

/// `min(a0, a1)`; on ties or NaN the first operand wins.
#[derive(Clone, Copy, Debug, Default)]
pub struct Min;

impl Combine<2> for Min {
    fn combine(&self, a: &[f64; 2]) -> f64 {
        if a[1] < a[0] {
            a[1]
        } else {
            a[0]
        }
    }
}

/// `a0 ^ a1`
#[derive(Clone, Copy, Debug, Default)]
pub struct Power;

impl Combine<2> for Power {
    fn combine(&self, a: &[f64; 2]) -> f64 {
        a[0].powf(a[1])
    }
}

/// Sum of two fields.
pub type AddNoise = Operator<2, Add>;
/// Product of two fields.
pub type MultiplyNoise = Operator<2, Multiply>;
/// Pointwise maximum of two fields.
pub type MaxNoise = Operator<2, Max>;
/// Pointwise minimum of two fields.
pub type MinNoise = Operator<2, Min>;
/// First field raised to the power of the second.
pub type PowerNoise = Operator<2, Power>;

// ── Modifiers ───────────────────────────────────────────────────────

/// `|a0|`
#[derive(Clone, Copy, Debug, Default)]
pub struct Absolute;

impl Combine<1> for Absolute {
    fn combine(&self, a: &[f64; 1]) -> f64 {
        a[0].abs()
    }
}

/// `-a0`
#[derive(Clone, Copy, Debug, Default)]
pub struct Invert;

impl Combine<1> for Invert {
    fn combine(&self, a: &[f64; 1]) -> f64 {
        -a[0]
    }
}

/// Absolute value of a field.
pub type AbsoluteNoise = Operator<1, Absolute>;
/// Negated field.
pub type InvertNoise = Operator<1, Invert>;

#[derive(Clone, Copy, Debug)]
struct ClampParams {
    lower: f64,
    upper: f64,
    interval: f64,
    normalize: bool,
}

/// Clamps to `[lower, upper]`, optionally rescaling the result to `[0, 1]`.
///
/// `lower <= upper` always holds: each bound setter clamps against the other.
#[derive(Debug)]
pub struct Clamp {
    params: RwLock<ClampParams>,
}

impl Default for Clamp {
    fn default() -> Self {
        Self {
            params: RwLock::new(ClampParams {
                lower: -1.0,
                upper: 1.0,
                interval: 2.0,
                normalize: false,
            }),
        }
    }
}

impl Combine<1> for Clamp {
    fn combine(&self, a: &[f64; 1]) -> f64 {
        let p = *self.params.read();
        let clamped = if a[0] < p.lower {
            p.lower
        } else if p.upper < a[0] {
            p.upper
        } else {
            a[0]
        };
        if p.normalize && p.interval != 0.0 {
            (clamped - p.lower) / p.interval
        } else {
            clamped
        }
    }
}

/// Field clamped to a range.
pub type ClampNoise = Operator<1, Clamp>;

impl Operator<1, Clamp> {
    /// Sets the lower bound, capped at the current upper bound.
    pub fn set_lower_bound(&self, value: f64) {
        {
            let mut p = self.function().params.write();
            p.lower = if p.upper < value { p.upper } else { value };
            p.interval = p.upper - p.lower;
        }
        self.emit_changed();
    }

    /// The lower bound.
    #[must_use]
    pub fn lower_bound(&self) -> f64 {
        self.function().params.read().lower
    }

    /// Sets the upper bound, floored at the current lower bound.
    pub fn set_upper_bound(&self, value: f64) {
        {
            let mut p = self.function().params.write();
            p.upper = if value < p.lower { p.lower } else { value };
            p.interval = p.upper - p.lower;
        }
        self.emit_changed();
    }

    /// The upper bound.
    #[must_use]
    pub fn upper_bound(&self) -> f64 {
        self.function().params.read().upper
    }

    /// Enables rescaling of the clamped value to `[0, 1]`.
    pub fn set_normalized(&self, normalize: bool) {
        self.function().params.write().normalize = normalize;
        self.emit_changed();
    }

    /// Whether output is rescaled to `[0, 1]`.
    #[must_use]
    pub fn is_normalized(&self) -> bool {
        self.function().params.read().normalize
    }
}

/// A response curve sampled at a normalized position in `[0, 1]`.
///
/// Implemented by the host's curve resource.
pub trait Curve: Send + Sync {
    /// Samples the baked curve at `offset`.
    fn sample_baked(&self, offset: f64) -> f64;

    /// Emitted when the curve is re-baked.
    fn changed(&self) -> &ChangeEvent;
}

struct CurveLink {
    curve: Arc<dyn Curve>,
    listener: ListenerId,
}

impl Drop for CurveLink {
    fn drop(&mut self) {
        self.curve.changed().disconnect(self.listener);
    }
}

/// Maps the source through a response curve; evaluates to 0 with no curve.
#[derive(Default)]
pub struct CurveMap {
    curve: RwLock<Option<CurveLink>>,
}

impl Combine<1> for CurveMap {
    fn combine(&self, a: &[f64; 1]) -> f64 {
        match &*self.curve.read() {
            Some(link) => link.curve.sample_baked((a[0] + 1.0) / 2.0),
            None => 0.0,
        }
    }
}

impl fmt::Debug for CurveMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurveMap")
            .field("has_curve", &self.curve.read().is_some())
            .finish()
    }
}

/// Field remapped through a response curve.
pub type CurveNoise = Operator<1, CurveMap>;

impl Operator<1, CurveMap> {
    /// Replaces the curve. Re-bakes of the new curve propagate as changes.
    pub fn set_curve(&self, curve: Option<Arc<dyn Curve>>) {
        let link = curve.map(|curve| {
            let listener = curve.changed().connect_shared(Arc::clone(self.forwarder()));
            CurveLink { curve, listener }
        });
        let previous = std::mem::replace(&mut *self.function().curve.write(), link);
        drop(previous);
        self.emit_changed();
    }

    /// The current curve.
    #[must_use]
    pub fn curve(&self) -> Option<Arc<dyn Curve>> {
        self.function()
            .curve
            .read()
            .as_ref()
            .map(|link| Arc::clone(&link.curve))
    }
}

/// `scale * a0 + bias`
#[derive(Debug)]
pub struct Affine {
    map: RwLock<ScaleBias>,
}

impl Default for Affine {
    fn default() -> Self {
        Self { map: RwLock::new(ScaleBias::IDENTITY) }
    }
}

impl Combine<1> for Affine {
    fn combine(&self, a: &[f64; 1]) -> f64 {
        self.map.read().apply(a[0])
    }
}

/// Linearly remapped field.
pub type AffineNoise = Operator<1, Affine>;

impl Operator<1, Affine> {
    /// Sets the multiplier.
    pub fn set_scale(&self, scale: f64) {
        self.function().map.write().scale = scale;
        self.emit_changed();
    }

    /// The multiplier.
    #[must_use]
    pub fn scale(&self) -> f64 {
        self.function().map.read().scale
    }

    /// Sets the offset.
    pub fn set_bias(&self, bias: f64) {
        self.function().map.write().bias = bias;
        self.emit_changed();
    }

    /// The offset.
    #[must_use]
    pub fn bias(&self) -> f64 {
        self.function().map.read().bias
    }
}

// ── Selectors ───────────────────────────────────────────────────────

/// Blends the first two operands by the selector mapped from `[-1, 1]` to
/// `[0, 1]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Mix;

impl Combine<3> for Mix {
    fn combine(&self, a: &[f64; 3]) -> f64 {
        let ratio = (a[2] + 1.0) / 2.0;
        (ratio * a[1]) + ((1.0 - ratio) * a[0])
    }
}

/// Blend of two fields driven by a third.
pub type MixNoise = Operator<3, Mix>;

/// Picks the first operand below the threshold, the second otherwise.
#[derive(Debug, Default)]
pub struct Select {
    threshold: RwLock<f64>,
}

impl Combine<3> for Select {
    fn combine(&self, a: &[f64; 3]) -> f64 {
        if a[2] < *self.threshold.read() {
            a[0]
        } else {
            a[1]
        }
    }
}

/// Hard switch between two fields driven by a third.
pub type SelectNoise = Operator<3, Select>;

impl Operator<3, Select> {
    /// Sets the selector threshold.
    pub fn set_threshold(&self, threshold: f64) {
        *self.function().threshold.write() = threshold;
        self.emit_changed();
    }

    /// The selector threshold.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        *self.function().threshold.read()
    }
}
