//! Stress tracking and breakage.
//!
//! After every sub-step the world scans its joints. A joint whose impulse
//! exceeded its breaking threshold is collected; the world removes the
//! collected joints only once the scan is over. The attached bodies stay.

use super::handle::{Arena, JointHandle};
use super::joint::Joint;
use super::shape::Rgba;

/// `min(1, impulse / threshold)`.
pub fn stress_ratio(impulse: f32, threshold: f32) -> f32 {
    if threshold.is_infinite() || threshold <= 0.0 {
        return 0.0;
    }
    (impulse / threshold).clamp(0.0, 1.0)
}

/// Joints that exceeded their threshold, in insertion order.
pub fn find_broken(joints: &Arena<Joint>) -> Vec<JointHandle> {
    joints
        .iter()
        .filter(|(_, joint)| joint.exceeds_threshold())
        .map(|(index, _)| JointHandle::from_raw(index as u32))
        .collect()
}

/// Blend a base color toward red as stress rises. Alpha is forced opaque.
pub fn stress_color(base: Rgba, ratio: f32) -> Rgba {
    let s = ratio.clamp(0.0, 1.0);
    let [r, g, b, _] = base.map(f32::from);
    [
        (r + (255.0 - r) * s) as u8,
        (g * (1.0 - s)) as u8,
        (b * (1.0 - s)) as u8,
        255,
    ]
}
