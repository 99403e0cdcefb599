//! Rigid bodies and their integration.
//!
//! A body carries mass properties and kinematic state. Geometry lives in
//! [`Shape`](super::Shape)s attached to the body through the world.
//!
//! Integration is semi-implicit Euler split into two halves so the solver
//! can run between them:
//! - [`Body::integrate_forces`]: `v = v * damping + (gravity + F / m) * dt`
//! - [`Body::integrate_positions`]: `x += v * dt`, `angle += w * dt`

use serde::{Deserialize, Serialize};

use super::error::{PhysicsError, Result};
use super::types::{self, Vec2};

/// Smallest mass (and moment) a dynamic body may have. Smaller values are
/// clamped up to this.
pub const MIN_MASS: f32 = 0.001;

/// Whether a body responds to forces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BodyKind {
    /// Moves under gravity, forces and constraint impulses.
    #[default]
    Dynamic,
    /// Never moves; infinite mass in all impulse math.
    Static,
}

/// Description of a body to create with [`World::add_body`](super::World::add_body).
///
/// # Example
///
/// ```ignore
/// let def = BodyDef::dynamic(3.0, moment_for_circle(3.0, 0.0, 18.0, Vec2::ZERO))
///     .with_position(Vec2::new(0.0, 100.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDef {
    pub kind: BodyKind,
    pub position: Vec2,
    pub angle: f32,
    pub linear_velocity: Vec2,
    pub angular_velocity: f32,
    pub mass: f32,
    pub moment: f32,
}

impl BodyDef {
    /// A dynamic body with the given mass and moment of inertia.
    pub fn dynamic(mass: f32, moment: f32) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            position: Vec2::ZERO,
            angle: 0.0,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            mass,
            moment,
        }
    }

    /// A static (immovable) body.
    pub fn fixed() -> Self {
        Self {
            kind: BodyKind::Static,
            mass: f32::INFINITY,
            moment: f32::INFINITY,
            ..Self::dynamic(1.0, 1.0)
        }
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_velocity(mut self, linear: Vec2, angular: f32) -> Self {
        self.linear_velocity = linear;
        self.angular_velocity = angular;
        self
    }
}

/// A rigid body owned by a world.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    kind: BodyKind,
    /// World position of the center of mass.
    pub position: Vec2,
    /// Orientation (radians).
    pub angle: f32,
    pub linear_velocity: Vec2,
    pub angular_velocity: f32,
    mass: f32,
    inverse_mass: f32,
    moment: f32,
    inverse_moment: f32,
    force: Vec2,
    torque: f32,
    prev_position: Vec2,
    prev_angle: f32,
}

impl Body {
    /// Build a body from its definition.
    ///
    /// Dynamic mass and moment below [`MIN_MASS`] are clamped up to it.
    /// Non-finite values are rejected.
    pub fn from_def(def: &BodyDef) -> Result<Self> {
        if !types::is_finite(def.position)
            || !def.angle.is_finite()
            || !types::is_finite(def.linear_velocity)
            || !def.angular_velocity.is_finite()
        {
            return Err(PhysicsError::invalid_body("non-finite initial state"));
        }

        let (mass, inverse_mass, moment, inverse_moment) = match def.kind {
            BodyKind::Static => (f32::INFINITY, 0.0, f32::INFINITY, 0.0),
            BodyKind::Dynamic => {
                if !def.mass.is_finite() || !def.moment.is_finite() {
                    return Err(PhysicsError::invalid_body(format!(
                        "dynamic body needs finite mass and moment (mass={}, moment={})",
                        def.mass, def.moment
                    )));
                }
                let mass = def.mass.max(MIN_MASS);
                let moment = def.moment.max(MIN_MASS);
                if mass != def.mass || moment != def.moment {
                    tracing::debug!(
                        mass = def.mass,
                        moment = def.moment,
                        "clamped body mass properties to minimum"
                    );
                }
                (mass, 1.0 / mass, moment, 1.0 / moment)
            }
        };

        let (linear_velocity, angular_velocity) = match def.kind {
            BodyKind::Static => (Vec2::ZERO, 0.0),
            BodyKind::Dynamic => (def.linear_velocity, def.angular_velocity),
        };

        Ok(Self {
            kind: def.kind,
            position: def.position,
            angle: def.angle,
            linear_velocity,
            angular_velocity,
            mass,
            inverse_mass,
            moment,
            inverse_moment,
            force: Vec2::ZERO,
            torque: 0.0,
            prev_position: def.position,
            prev_angle: def.angle,
        })
    }

    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    pub fn is_static(&self) -> bool {
        self.kind == BodyKind::Static
    }

    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Zero for static bodies.
    pub fn inverse_mass(&self) -> f32 {
        self.inverse_mass
    }

    pub fn moment_of_inertia(&self) -> f32 {
        self.moment
    }

    /// Zero for static bodies.
    pub fn inverse_moment(&self) -> f32 {
        self.inverse_moment
    }

    /// Unit rotation vector for the current angle.
    pub fn rotation(&self) -> Vec2 {
        types::rotation(self.angle)
    }

    /// Transform a point from body-local to world coordinates.
    pub fn local_to_world(&self, local: Vec2) -> Vec2 {
        self.position + types::rotate(self.rotation(), local)
    }

    /// Transform a world point into body-local coordinates.
    pub fn world_to_local(&self, world: Vec2) -> Vec2 {
        types::unrotate(self.rotation(), world - self.position)
    }

    /// World velocity of a world-space point rigidly attached to the body.
    pub fn velocity_at(&self, world: Vec2) -> Vec2 {
        self.linear_velocity + types::cross_scalar(self.angular_velocity, world - self.position)
    }

    /// Accumulate a force at the center of mass for the next sub-step.
    pub fn apply_force(&mut self, force: Vec2) {
        self.force += force;
    }

    /// Accumulate a torque for the next sub-step.
    pub fn apply_torque(&mut self, torque: f32) {
        self.torque += torque;
    }

    /// Apply an impulse at a world point, changing velocity immediately.
    pub fn apply_impulse_at(&mut self, impulse: Vec2, world_point: Vec2) {
        self.linear_velocity += impulse * self.inverse_mass;
        self.angular_velocity +=
            self.inverse_moment * types::cross(world_point - self.position, impulse);
    }

    /// Velocity half of the step. `damping` is the per-step velocity
    /// multiplier. Static bodies are untouched.
    pub fn integrate_forces(&mut self, gravity: Vec2, damping: f32, dt: f32) {
        if self.is_static() {
            return;
        }
        let acceleration = gravity + self.force * self.inverse_mass;
        self.linear_velocity = self.linear_velocity * damping + acceleration * dt;
        self.angular_velocity =
            self.angular_velocity * damping + self.torque * self.inverse_moment * dt;
        self.force = Vec2::ZERO;
        self.torque = 0.0;
    }

    /// Position half of the step. Static bodies are untouched.
    pub fn integrate_positions(&mut self, dt: f32) {
        if self.is_static() {
            return;
        }
        self.position += self.linear_velocity * dt;
        self.angle += self.angular_velocity * dt;
    }

    /// Remember the current pose so a diverged step can be rolled back.
    pub(crate) fn save_prev_state(&mut self) {
        self.prev_position = self.position;
        self.prev_angle = self.angle;
    }

    /// True when position, angle and velocities are all finite.
    pub fn is_finite(&self) -> bool {
        types::is_finite(self.position)
            && self.angle.is_finite()
            && types::is_finite(self.linear_velocity)
            && self.angular_velocity.is_finite()
    }

    /// Restore the pose saved at the start of the sub-step and stop the body.
    pub(crate) fn rollback(&mut self) {
        self.position = self.prev_position;
        self.angle = self.prev_angle;
        self.linear_velocity = Vec2::ZERO;
        self.angular_velocity = 0.0;
        self.force = Vec2::ZERO;
        self.torque = 0.0;
    }
}

/// Moment of inertia of a (hollow) circle: `m * (r_inner² + r_outer²) / 2 + m * |offset|²`.
///
/// A solid disc uses `r_inner = 0`, giving `0.5 * m * r²`.
pub fn moment_for_circle(mass: f32, r_inner: f32, r_outer: f32, offset: Vec2) -> f32 {
    mass * (0.5 * (r_inner * r_inner + r_outer * r_outer) + offset.length_squared())
}

/// Moment of inertia of a solid convex polygon about its centroid.
///
/// Signed-area decomposition into triangles fanned from the centroid.
pub fn moment_for_polygon(mass: f32, vertices: &[Vec2]) -> f32 {
    if vertices.len() < 3 {
        return 0.0;
    }
    let centroid = polygon_centroid(vertices);
    let n = vertices.len();
    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for i in 0..n {
        let a = vertices[i] - centroid;
        let b = vertices[(i + 1) % n] - centroid;
        let area = types::cross(a, b);
        numerator += area * (a.dot(a) + a.dot(b) + b.dot(b));
        denominator += area;
    }
    if denominator.abs() < types::EPSILON {
        return 0.0;
    }
    mass * numerator / (6.0 * denominator)
}

/// Moment of inertia of a solid `width` x `height` box about its center.
pub fn moment_for_box(mass: f32, width: f32, height: f32) -> f32 {
    mass * (width * width + height * height) / 12.0
}

/// Signed area of a polygon (positive for +x→+y winding).
pub fn polygon_area(vertices: &[Vec2]) -> f32 {
    let n = vertices.len();
    (0..n)
        .map(|i| types::cross(vertices[i], vertices[(i + 1) % n]))
        .sum::<f32>()
        * 0.5
}

/// Area-weighted centroid of a polygon. Falls back to the vertex average
/// for degenerate input.
pub fn polygon_centroid(vertices: &[Vec2]) -> Vec2 {
    let n = vertices.len();
    if n == 0 {
        return Vec2::ZERO;
    }
    let mut sum = Vec2::ZERO;
    let mut area_sum = 0.0;
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        let area = types::cross(a, b);
        sum += (a + b) * area;
        area_sum += area;
    }
    if area_sum.abs() < types::EPSILON {
        return vertices.iter().copied().sum::<Vec2>() / n as f32;
    }
    sum / (3.0 * area_sum)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn box_vertices(w: f32, h: f32) -> Vec<Vec2> {
        vec![
            Vec2::new(-w / 2.0, -h / 2.0),
            Vec2::new(w / 2.0, -h / 2.0),
            Vec2::new(w / 2.0, h / 2.0),
            Vec2::new(-w / 2.0, h / 2.0),
        ]
    }

    #[test]
    fn test_circle_moment() {
        // 0.5 * 3 * 18²
        assert_eq!(moment_for_circle(3.0, 0.0, 18.0, Vec2::ZERO), 486.0);
    }

    #[test]
    fn test_polygon_moment_matches_box() {
        let poly = moment_for_polygon(10.0, &box_vertices(80.0, 10.0));
        let boxed = moment_for_box(10.0, 80.0, 10.0);
        assert!((poly - boxed).abs() / boxed < 1e-4, "{poly} vs {boxed}");
    }

    #[test]
    fn test_polygon_moment_is_about_centroid() {
        let shifted: Vec<Vec2> = box_vertices(20.0, 20.0)
            .into_iter()
            .map(|v| v + Vec2::new(100.0, 50.0))
            .collect();
        let centered = moment_for_polygon(2.0, &box_vertices(20.0, 20.0));
        let moved = moment_for_polygon(2.0, &shifted);
        assert!((centered - moved).abs() < 1e-2);
    }

    #[test]
    fn test_polygon_area_and_centroid() {
        let verts = box_vertices(4.0, 2.0);
        assert_eq!(polygon_area(&verts), 8.0);
        assert!(polygon_centroid(&verts).length() < 1e-6);
    }

    #[test]
    fn test_mass_is_clamped() {
        let body = Body::from_def(&BodyDef::dynamic(0.0, -5.0)).unwrap();
        assert_eq!(body.mass(), MIN_MASS);
        assert_eq!(body.moment_of_inertia(), MIN_MASS);
        assert!(body.inverse_mass().is_finite());
    }

    #[test]
    fn test_non_finite_mass_rejected() {
        let err = Body::from_def(&BodyDef::dynamic(f32::NAN, 1.0)).unwrap_err();
        assert!(matches!(err, PhysicsError::InvalidBody { .. }));
    }

    #[test]
    fn test_static_body_has_zero_inverse_mass() {
        let body = Body::from_def(&BodyDef::fixed().with_velocity(Vec2::X, 1.0)).unwrap();
        assert!(body.is_static());
        assert_eq!(body.inverse_mass(), 0.0);
        assert_eq!(body.inverse_moment(), 0.0);
        assert_eq!(body.linear_velocity, Vec2::ZERO);
    }

    #[test]
    fn test_integrate_forces_applies_gravity() {
        let mut body = Body::from_def(&BodyDef::dynamic(3.0, 486.0)).unwrap();
        body.integrate_forces(Vec2::new(0.0, 900.0), 1.0, 1.0 / 150.0);
        assert!((body.linear_velocity.y - 6.0).abs() < 1e-5);
    }

    #[test]
    fn test_static_body_ignores_forces() {
        let mut body =
            Body::from_def(&BodyDef::fixed().with_position(Vec2::new(5.0, 5.0))).unwrap();
        body.apply_force(Vec2::new(1000.0, 0.0));
        body.integrate_forces(Vec2::new(0.0, 900.0), 0.99, 0.01);
        body.integrate_positions(0.01);
        assert_eq!(body.position, Vec2::new(5.0, 5.0));
        assert_eq!(body.linear_velocity, Vec2::ZERO);
    }

    #[test]
    fn test_off_center_impulse_spins_body() {
        let mut body = Body::from_def(&BodyDef::dynamic(2.0, 4.0)).unwrap();
        body.apply_impulse_at(Vec2::new(0.0, 10.0), Vec2::new(1.0, 0.0));
        assert!((body.linear_velocity - Vec2::new(0.0, 5.0)).length() < 1e-6);
        assert!((body.angular_velocity - 2.5).abs() < 1e-6);

        let rim = body.velocity_at(Vec2::new(1.0, 0.0));
        assert!((rim - Vec2::new(0.0, 7.5)).length() < 1e-5);
        assert_eq!(body.velocity_at(body.position), body.linear_velocity);

        body.apply_torque(8.0);
        body.integrate_forces(Vec2::ZERO, 1.0, 0.5);
        assert!((body.angular_velocity - 3.5).abs() < 1e-5);
    }

    #[test]
    fn test_local_world_round_trip() {
        let body = Body::from_def(
            &BodyDef::dynamic(1.0, 1.0)
                .with_position(Vec2::new(10.0, -3.0))
                .with_angle(0.7),
        )
        .unwrap();
        let local = Vec2::new(4.0, 2.0);
        let back = body.world_to_local(body.local_to_world(local));
        assert!((back - local).length() < 1e-4);
    }

    #[test]
    fn test_rollback_restores_pose() {
        let mut body = Body::from_def(&BodyDef::dynamic(1.0, 1.0)).unwrap();
        body.save_prev_state();
        body.position = Vec2::new(f32::NAN, 0.0);
        assert!(!body.is_finite());
        body.rollback();
        assert!(body.is_finite());
        assert_eq!(body.position, Vec2::ZERO);
    }
}
