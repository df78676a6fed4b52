use std::ops::{Add, AddAssign, Mul, Neg};

use vek::Vec2;

/// Extra 2D operations the solver formulas need on top of [`vek::Vec2`].
pub trait VecExt {
    /// Scalar 2D cross product, `a.x * b.y - a.y * b.x`.
    fn cross(self, other: Self) -> f64;

    /// Normalized clockwise perpendicular, `(y, -x) / |v|`.
    fn normal(self) -> Self;
}

impl VecExt for Vec2<f64> {
    fn cross(self, other: Self) -> f64 {
        self.x * other.y - self.y * other.x
    }

    fn normal(self) -> Self {
        Vec2::new(self.y, -self.x) / self.magnitude()
    }
}

/// Cross product of a scalar with a vector, `(-s * v.y, s * v.x)`.
///
/// This is the planar version of `ω × r`, the velocity of a point at offset
/// `r` on a body spinning with angular velocity `ω`.
pub fn cross_scalar_vec(s: f64, v: Vec2<f64>) -> Vec2<f64> {
    Vec2::new(-s * v.y, s * v.x)
}

/// Row-major 2x2 matrix, `[[a, b], [c, d]]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat2 {
    /// Top left.
    pub a: f64,
    /// Top right.
    pub b: f64,
    /// Bottom left.
    pub c: f64,
    /// Bottom right.
    pub d: f64,
}

impl Mat2 {
    /// Construct from the four elements.
    pub fn new(a: f64, b: f64, c: f64, d: f64) -> Self {
        Self { a, b, c, d }
    }

    /// Construct from two row vectors.
    pub fn from_rows(top: Vec2<f64>, bottom: Vec2<f64>) -> Self {
        Self::new(top.x, top.y, bottom.x, bottom.y)
    }

    /// Counter-clockwise rotation over an angle in radians.
    pub fn from_angle(angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();

        Self::new(cos, -sin, sin, cos)
    }

    /// Identity matrix.
    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0)
    }

    /// Flip over the diagonal.
    pub fn transpose(self) -> Self {
        Self::new(self.a, self.c, self.b, self.d)
    }

    /// Determinant.
    pub fn determinant(self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// Matrix inverse with the standard 2x2 formula.
    pub fn inverse(self) -> Self {
        let det = self.determinant();

        Self::new(self.d, -self.b, -self.c, self.a) * det.recip()
    }
}

impl Default for Mat2 {
    fn default() -> Self {
        Self::identity()
    }
}

impl Mul<Vec2<f64>> for Mat2 {
    type Output = Vec2<f64>;

    fn mul(self, v: Vec2<f64>) -> Self::Output {
        Vec2::new(self.a * v.x + self.b * v.y, self.c * v.x + self.d * v.y)
    }
}

impl Mul<Self> for Mat2 {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Self::new(
            self.a * rhs.a + self.b * rhs.c,
            self.a * rhs.b + self.b * rhs.d,
            self.c * rhs.a + self.d * rhs.c,
            self.c * rhs.b + self.d * rhs.d,
        )
    }
}

impl Mul<f64> for Mat2 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        Self::new(self.a * rhs, self.b * rhs, self.c * rhs, self.d * rhs)
    }
}

impl Add<Self> for Mat2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::new(
            self.a + rhs.a,
            self.b + rhs.b,
            self.c + rhs.c,
            self.d + rhs.d,
        )
    }
}

impl AddAssign<Self> for Mat2 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Neg for Mat2 {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self * -1.0
    }
}
