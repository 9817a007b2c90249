//! Two-dimensional vector values carried through the exchange buffers.
//!
//! All coupled quantities (coordinates, forces, displacements) are `ND = 2`
//! vectors. `Vec2` is `Pod` so a `&[Vec2]` can be viewed as the flat `&[f64]`
//! layout expected by block vector transfers.

use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub};

use static_assertions::{assert_eq_size, const_assert_eq};

/// Number of spatial dimensions handled by the adapter.
pub const ND: usize = 2;

const_assert_eq!(ND, 2);

/// A 2D vector stored as `[x, y]`.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    bytemuck::Pod,
    bytemuck::Zeroable,
    serde::Serialize,
    serde::Deserialize,
)]
#[repr(transparent)]
pub struct Vec2(pub [f64; ND]);

assert_eq_size!(Vec2, [f64; ND]);

impl Vec2 {
    /// The zero vector.
    pub const ZERO: Vec2 = Vec2([0.0; ND]);

    /// Builds a vector from its components.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Vec2([x, y])
    }

    /// First component.
    #[inline]
    pub fn x(&self) -> f64 {
        self.0[0]
    }

    /// Second component.
    #[inline]
    pub fn y(&self) -> f64 {
        self.0[1]
    }

    /// Signed component with the largest magnitude.
    ///
    /// Ties keep the first component.
    pub fn dominant_component(&self) -> f64 {
        self.0.iter().copied().fold(0.0, max_by_magnitude)
    }

    /// Euclidean length.
    #[inline]
    pub fn norm(&self) -> f64 {
        self.0.iter().map(|c| c * c).sum::<f64>().sqrt()
    }
}

/// Keeps whichever signed value has the larger magnitude.
#[inline]
pub(crate) fn max_by_magnitude(current: f64, candidate: f64) -> f64 {
    if candidate.abs() > current.abs() {
        candidate
    } else {
        current
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    #[inline]
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2([self.0[0] + rhs.0[0], self.0[1] + rhs.0[1]])
    }
}

impl AddAssign for Vec2 {
    #[inline]
    fn add_assign(&mut self, rhs: Vec2) {
        self.0[0] += rhs.0[0];
        self.0[1] += rhs.0[1];
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    #[inline]
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2([self.0[0] - rhs.0[0], self.0[1] - rhs.0[1]])
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    #[inline]
    fn neg(self) -> Vec2 {
        Vec2([-self.0[0], -self.0[1]])
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2([self.0[0] * rhs, self.0[1] * rhs])
    }
}

impl Div<f64> for Vec2 {
    type Output = Vec2;
    #[inline]
    fn div(self, rhs: f64) -> Vec2 {
        Vec2([self.0[0] / rhs, self.0[1] / rhs])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_view_is_interleaved() {
        let v = [Vec2::new(1.0, 2.0), Vec2::new(3.0, 4.0)];
        let flat: &[f64] = bytemuck::cast_slice(&v);
        assert_eq!(flat, &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn dominant_component_keeps_sign() {
        assert_eq!(Vec2::new(0.5, -2.0).dominant_component(), -2.0);
        assert_eq!(Vec2::new(3.0, -3.0).dominant_component(), 3.0);
        assert_eq!(Vec2::ZERO.dominant_component(), 0.0);
    }

    #[test]
    fn arithmetic() {
        let a = Vec2::new(1.0, 2.0);
        let b = Vec2::new(0.5, -1.0);
        assert_eq!(a + b, Vec2::new(1.5, 1.0));
        assert_eq!(a - b, Vec2::new(0.5, 3.0));
        assert_eq!(-a, Vec2::new(-1.0, -2.0));
        assert_eq!(a * 2.0, Vec2::new(2.0, 4.0));
        assert_eq!(a / 2.0, Vec2::new(0.5, 1.0));
        assert_eq!(Vec2::new(3.0, 4.0).norm(), 5.0);
    }
}
