//! Vector and affine transform types used for noise coordinates.
//!
//! Only what coordinate rewriting needs: component access, approximate
//! comparison and affine application.

use serde::{Deserialize, Serialize};

/// Tolerance for approximate float comparison.
pub const CMP_EPSILON: f64 = 0.00001;

/// Approximate equality with a tolerance relative to `a`, floored at
/// [`CMP_EPSILON`].
#[must_use]
pub fn is_equal_approx(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    let tolerance = (CMP_EPSILON * a.abs()).max(CMP_EPSILON);
    (a - b).abs() < tolerance
}

/// Returns true if `value` is within [`CMP_EPSILON`] of zero.
#[must_use]
pub fn is_zero_approx(value: f64) -> bool {
    value.abs() < CMP_EPSILON
}

/// 2D vector - noise sample coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
}

impl Vec2 {
    /// Creates a new Vec2
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Component-wise approximate equality.
    #[must_use]
    pub fn is_equal_approx(self, other: Self) -> bool {
        is_equal_approx(self.x, other.x) && is_equal_approx(self.y, other.y)
    }
}

impl std::ops::Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Mul<f64> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// 3D vector - noise sample coordinates
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
    /// Z component
    pub z: f64,
}

impl Vec3 {
    /// Creates a new Vec3
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Dot product
    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Component-wise approximate equality.
    #[must_use]
    pub fn is_equal_approx(self, other: Self) -> bool {
        is_equal_approx(self.x, other.x)
            && is_equal_approx(self.y, other.y)
            && is_equal_approx(self.z, other.z)
    }
}

impl std::ops::Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Mul<f64> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// A scalar affine map `v * scale + bias`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScaleBias {
    /// Multiplier
    pub scale: f64,
    /// Offset added after scaling
    pub bias: f64,
}

impl ScaleBias {
    /// Creates a new scale/bias pair.
    #[must_use]
    pub const fn new(scale: f64, bias: f64) -> Self {
        Self { scale, bias }
    }

    /// Maps every value to itself.
    pub const IDENTITY: Self = Self::new(1.0, 0.0);

    /// Maps every value to zero.
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Applies the map.
    #[must_use]
    pub fn apply(self, value: f64) -> f64 {
        value * self.scale + self.bias
    }
}

/// 2D affine transform: two basis columns plus a translation.
///
/// `xform(v) = x * v.x + y * v.y + origin`
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform2D {
    /// First basis column
    pub x: Vec2,
    /// Second basis column
    pub y: Vec2,
    /// Translation
    pub origin: Vec2,
}

impl Transform2D {
    /// Creates a transform from its columns.
    #[must_use]
    pub const fn new(x: Vec2, y: Vec2, origin: Vec2) -> Self {
        Self { x, y, origin }
    }

    /// Identity transform
    pub const IDENTITY: Self = Self::new(Vec2::new(1.0, 0.0), Vec2::new(0.0, 1.0), Vec2::ZERO);

    /// Non-uniform scale followed by a translation.
    #[must_use]
    pub const fn scale_translate(scale: Vec2, origin: Vec2) -> Self {
        Self::new(Vec2::new(scale.x, 0.0), Vec2::new(0.0, scale.y), origin)
    }

    /// Counter-clockwise rotation by `angle` radians.
    #[must_use]
    pub fn rotation(angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self::new(Vec2::new(cos, sin), Vec2::new(-sin, cos), Vec2::ZERO)
    }

    /// Applies the transform to a point.
    #[must_use]
    pub fn xform(&self, v: Vec2) -> Vec2 {
        self.x * v.x + self.y * v.y + self.origin
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// 3D affine transform: a row-major 3x3 basis plus a translation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform3D {
    /// Basis rows
    pub basis: [Vec3; 3],
    /// Translation
    pub origin: Vec3,
}

impl Transform3D {
    /// Creates a transform from basis rows and a translation.
    #[must_use]
    pub const fn new(basis: [Vec3; 3], origin: Vec3) -> Self {
        Self { basis, origin }
    }

    /// Identity transform
    pub const IDENTITY: Self = Self::new(
        [
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ],
        Vec3::ZERO,
    );

    /// Non-uniform scale followed by a translation.
    #[must_use]
    pub const fn scale_translate(scale: Vec3, origin: Vec3) -> Self {
        Self::new(
            [
                Vec3::new(scale.x, 0.0, 0.0),
                Vec3::new(0.0, scale.y, 0.0),
                Vec3::new(0.0, 0.0, scale.z),
            ],
            origin,
        )
    }

    /// Applies the transform to a point.
    #[must_use]
    pub fn xform(&self, v: Vec3) -> Vec3 {
        Vec3::new(
            self.basis[0].dot(v),
            self.basis[1].dot(v),
            self.basis[2].dot(v),
        ) + self.origin
    }
}

impl Default for Transform3D {
    fn default() -> Self {
        Self::IDENTITY
    }
}
