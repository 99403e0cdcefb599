//! Physics type re-exports from glam
//!
//! This module provides the 2D math types used throughout the physics
//! system, re-exported from the glam library, plus the handful of planar
//! helpers (scalar cross products, rotations) glam does not name directly.
//!
//! Screen convention: +x right, +y down. Positive angles rotate +x toward +y.

pub use glam::{Mat2, Vec2};

/// Threshold below which lengths and determinants are treated as zero.
pub const EPSILON: f32 = 1e-6;

/// 2D scalar cross product `a × b`.
#[inline]
pub fn cross(a: Vec2, b: Vec2) -> f32 {
    a.perp_dot(b)
}

/// Cross product of a scalar angular velocity with a vector (`w × r`).
#[inline]
pub fn cross_scalar(w: f32, r: Vec2) -> Vec2 {
    r.perp() * w
}

/// Unit rotation vector for an angle in radians.
#[inline]
pub fn rotation(angle: f32) -> Vec2 {
    Vec2::from_angle(angle)
}

/// Rotate `v` by the unit rotation vector `rot`.
#[inline]
pub fn rotate(rot: Vec2, v: Vec2) -> Vec2 {
    rot.rotate(v)
}

/// Rotate `v` by the inverse of the unit rotation vector `rot`.
#[inline]
pub fn unrotate(rot: Vec2, v: Vec2) -> Vec2 {
    Vec2::new(rot.x, -rot.y).rotate(v)
}

/// Projection of `v` onto `onto`. Returns zero for a zero-length `onto`.
#[inline]
pub fn project(v: Vec2, onto: Vec2) -> Vec2 {
    let len_sq = onto.length_squared();
    if len_sq < EPSILON {
        Vec2::ZERO
    } else {
        onto * (v.dot(onto) / len_sq)
    }
}

/// Closest point to `p` on the segment `a..b`.
pub fn closest_point_on_segment(a: Vec2, b: Vec2, p: Vec2) -> Vec2 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// True when every component of the vector is finite.
#[inline]
pub fn is_finite(v: Vec2) -> bool {
    v.x.is_finite() && v.y.is_finite()
}
