//! The simulation world.
//!
//! [`World`] owns every body, shape and joint and advances them in time.
//! Editing happens while the world is [`SimulationMode::Paused`]; stepping
//! only has an effect while it is [`SimulationMode::Running`].
//!
//! # Step pipeline
//!
//! `step(dt)` splits `dt` into `substeps` equal sub-steps. Each sub-step:
//!
//! 1. integrates gravity, forces and damping into velocities
//! 2. detects contacts between shapes
//! 3. runs `iterations` sequential-impulse passes over contacts and joints
//! 4. integrates velocities into positions
//! 5. removes joints whose impulse exceeded their breaking threshold
//!
//! A body that leaves the finite range is put back where it started the
//! sub-step and stopped, so one bad constraint cannot poison the world.
//!
//! # Example
//!
//! ```ignore
//! use bridge_sandbox_engine::physics::*;
//!
//! let mut world = World::new(WorldConfig::default());
//! let ball = world.add_body(
//!     BodyDef::dynamic(3.0, moment_for_circle(3.0, 0.0, 18.0, Vec2::ZERO))
//!         .with_position(Vec2::new(0.0, 100.0)),
//! )?;
//! world.add_shape(ball, ShapeDef::new(Geometry::circle(18.0)))?;
//!
//! world.set_mode(SimulationMode::Running);
//! let report = world.step(1.0 / 30.0);
//! ```

use serde::{Deserialize, Serialize};

use super::body::{Body, BodyDef};
use super::collision::{self, Contact, PointQuery};
use super::error::{PhysicsError, Result};
use super::handle::{Arena, BodyHandle, JointHandle, ShapeHandle};
use super::joint::{Joint, JointDef};
use super::shape::{Shape, ShapeDef};
use super::solver::{Solver, SolverSettings};
use super::stress;
use super::types::Vec2;

/// World tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Acceleration applied to every dynamic body (y grows downward).
    pub gravity: Vec2,
    /// Fraction of velocity kept after one second of free motion.
    pub damping: f32,
    /// Solver passes per sub-step.
    pub iterations: u32,
    /// Sub-steps per `step` call.
    pub substeps: u32,
    /// Default joint error bias when a joint does not set its own.
    pub error_bias: f32,
    /// Fraction of contact penetration corrected per sub-step.
    pub contact_bias: f32,
    /// Penetration depth tolerated without correction.
    pub allowed_penetration: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, 900.0),
            damping: 0.99,
            iterations: 30,
            substeps: 5,
            error_bias: 0.1,
            contact_bias: 0.2,
            allowed_penetration: 0.5,
        }
    }
}

impl WorldConfig {
    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_substeps(mut self, substeps: u32) -> Self {
        self.substeps = substeps;
        self
    }

    pub fn with_error_bias(mut self, error_bias: f32) -> Self {
        self.error_bias = error_bias;
        self
    }

    pub fn with_contact_bias(mut self, contact_bias: f32) -> Self {
        self.contact_bias = contact_bias;
        self
    }

    pub fn with_allowed_penetration(mut self, allowed_penetration: f32) -> Self {
        self.allowed_penetration = allowed_penetration;
        self
    }
}

/// Whether `step` advances time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SimulationMode {
    /// Editing; `step` is a no-op.
    #[default]
    Paused,
    /// Simulating.
    Running,
}

/// What happened during one `step` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// Sub-steps actually run (zero while paused).
    pub substeps: u32,
    /// Contacts found in the last sub-step.
    pub contacts: usize,
    /// Joints removed by the stress tracker, in removal order.
    pub broken_joints: Vec<JointHandle>,
    /// Bodies rolled back after leaving the finite range.
    pub diverged_bodies: usize,
}

/// Owner of all simulation state.
#[derive(Debug, Clone, Default)]
pub struct World {
    config: WorldConfig,
    mode: SimulationMode,
    bodies: Arena<Body>,
    shapes: Arena<Shape>,
    joints: Arena<Joint>,
    contacts: Vec<Contact>,
}

impl World {
    pub fn new(config: WorldConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn gravity(&self) -> Vec2 {
        self.config.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.config.gravity = gravity;
    }

    pub fn set_iterations(&mut self, iterations: u32) {
        self.config.iterations = iterations;
    }

    pub fn mode(&self) -> SimulationMode {
        self.mode
    }

    pub fn is_running(&self) -> bool {
        self.mode == SimulationMode::Running
    }

    /// Switch mode. Body state is left exactly as it is.
    pub fn set_mode(&mut self, mode: SimulationMode) {
        if self.mode != mode {
            tracing::info!(from = ?self.mode, to = ?mode, "world mode changed");
            self.mode = mode;
        }
    }

    // ============================================================
    // Construction and removal
    // ============================================================

    pub fn add_body(&mut self, def: BodyDef) -> Result<BodyHandle> {
        let body = Body::from_def(&def).inspect_err(|err| {
            tracing::warn!(%err, "rejected body");
        })?;
        let handle = BodyHandle::from_raw(self.bodies.insert(body));
        tracing::trace!(%handle, kind = ?def.kind, "added body");
        Ok(handle)
    }

    pub fn add_shape(&mut self, body: BodyHandle, def: ShapeDef) -> Result<ShapeHandle> {
        if !self.bodies.contains(body.index()) {
            return Err(PhysicsError::UnknownBody(body));
        }
        let shape = Shape::from_def(body, def).inspect_err(|err| {
            tracing::warn!(%err, %body, "rejected shape");
        })?;
        Ok(ShapeHandle::from_raw(self.shapes.insert(shape)))
    }

    pub fn add_joint(&mut self, def: JointDef) -> Result<JointHandle> {
        for body in [def.body_a, def.body_b] {
            if !self.bodies.contains(body.index()) {
                return Err(PhysicsError::UnknownBody(body));
            }
        }
        let joint = Joint::from_def(&def, self.config.error_bias).inspect_err(|err| {
            tracing::warn!(%err, "rejected joint");
        })?;
        let handle = JointHandle::from_raw(self.joints.insert(joint));
        tracing::trace!(%handle, kind = def.kind.name(), "added joint");
        Ok(handle)
    }

    /// Remove a body together with its shapes and every joint touching it.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<Body> {
        let body = self
            .bodies
            .remove(handle.index())
            .ok_or(PhysicsError::UnknownBody(handle))?;
        for shape in self.shapes_of(handle) {
            self.shapes.remove(shape.index());
        }
        for joint in self.joints_of(handle) {
            self.joints.remove(joint.index());
        }
        self.contacts.retain(|c| c.body_a != handle && c.body_b != handle);
        Ok(body)
    }

    pub fn remove_shape(&mut self, handle: ShapeHandle) -> Result<Shape> {
        let shape = self
            .shapes
            .remove(handle.index())
            .ok_or(PhysicsError::UnknownShape(handle))?;
        self.contacts.retain(|c| c.shape_a != handle && c.shape_b != handle);
        Ok(shape)
    }

    /// Sever a joint. The bodies it connected stay in the world.
    pub fn remove_joint(&mut self, handle: JointHandle) -> Result<Joint> {
        self.joints
            .remove(handle.index())
            .ok_or(PhysicsError::UnknownJoint(handle))
    }

    // ============================================================
    // Access
    // ============================================================

    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle.index())
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies.get_mut(handle.index())
    }

    pub fn shape(&self, handle: ShapeHandle) -> Option<&Shape> {
        self.shapes.get(handle.index())
    }

    pub fn shape_mut(&mut self, handle: ShapeHandle) -> Option<&mut Shape> {
        self.shapes.get_mut(handle.index())
    }

    pub fn joint(&self, handle: JointHandle) -> Option<&Joint> {
        self.joints.get(handle.index())
    }

    pub fn joint_mut(&mut self, handle: JointHandle) -> Option<&mut Joint> {
        self.joints.get_mut(handle.index())
    }

    pub fn contains_body(&self, handle: BodyHandle) -> bool {
        self.bodies.contains(handle.index())
    }

    pub fn contains_joint(&self, handle: JointHandle) -> bool {
        self.joints.contains(handle.index())
    }

    /// Bodies in insertion order.
    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &Body)> {
        self.bodies
            .iter()
            .map(|(i, b)| (BodyHandle::from_raw(i as u32), b))
    }

    /// Shapes in insertion order.
    pub fn shapes(&self) -> impl Iterator<Item = (ShapeHandle, &Shape)> {
        self.shapes
            .iter()
            .map(|(i, s)| (ShapeHandle::from_raw(i as u32), s))
    }

    /// Joints in insertion order.
    pub fn joints(&self) -> impl Iterator<Item = (JointHandle, &Joint)> {
        self.joints
            .iter()
            .map(|(i, j)| (JointHandle::from_raw(i as u32), j))
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn body_arena(&self) -> &Arena<Body> {
        &self.bodies
    }

    pub fn shape_arena(&self) -> &Arena<Shape> {
        &self.shapes
    }

    /// Joints attached to `body`, in insertion order.
    pub fn joints_of(&self, body: BodyHandle) -> Vec<JointHandle> {
        self.joints()
            .filter(|(_, j)| j.connects(body))
            .map(|(h, _)| h)
            .collect()
    }

    /// Shapes attached to `body`, in insertion order.
    pub fn shapes_of(&self, body: BodyHandle) -> Vec<ShapeHandle> {
        self.shapes()
            .filter(|(_, s)| s.body() == body)
            .map(|(h, _)| h)
            .collect()
    }

    /// Contacts found in the most recent sub-step.
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Stress ratio of a joint, `None` for unknown handles.
    pub fn stress_ratio(&self, handle: JointHandle) -> Option<f32> {
        self.joint(handle).map(Joint::stress_ratio)
    }

    /// Retarget a motor joint.
    pub fn set_motor_rate(&mut self, handle: JointHandle, rate: f32) -> Result<()> {
        if !rate.is_finite() {
            return Err(PhysicsError::invalid_joint("motor rate must be finite"));
        }
        let joint = self
            .joints
            .get_mut(handle.index())
            .ok_or(PhysicsError::UnknownJoint(handle))?;
        if joint.set_rate(rate) {
            Ok(())
        } else {
            Err(PhysicsError::invalid_joint(format!(
                "{handle} is a {} joint, not a motor",
                joint.kind().name()
            )))
        }
    }

    /// Nearest shape within `max_distance` of `point`, ignoring filters.
    pub fn query_nearest_shape(&self, point: Vec2, max_distance: f32) -> Option<PointQuery> {
        collision::nearest_shape(&self.bodies, &self.shapes, point, max_distance)
    }

    /// Fail on the first body with a non-finite state.
    pub fn check_finite(&self) -> Result<()> {
        match self.bodies().find(|(_, b)| !b.is_finite()) {
            Some((body, _)) => Err(PhysicsError::NumericalInstability { body }),
            None => Ok(()),
        }
    }

    // ============================================================
    // Stepping
    // ============================================================

    /// Advance by `dt` seconds. Does nothing while paused.
    pub fn step(&mut self, dt: f32) -> StepReport {
        let mut report = StepReport::default();
        if self.mode != SimulationMode::Running {
            return report;
        }
        if !dt.is_finite() || dt <= 0.0 {
            tracing::warn!(dt, "ignoring step with invalid time delta");
            return report;
        }

        let substeps = self.config.substeps.max(1);
        let h = dt / substeps as f32;
        for _ in 0..substeps {
            self.substep(h, &mut report);
            report.substeps += 1;
        }
        report.contacts = self.contacts.len();
        report
    }

    fn substep(&mut self, h: f32, report: &mut StepReport) {
        let gravity = self.config.gravity;
        let damping = self.config.damping.clamp(0.0, 1.0).powf(h);

        for (_, body) in self.bodies.iter_mut() {
            body.save_prev_state();
            body.integrate_forces(gravity, damping, h);
        }

        self.contacts = collision::detect_contacts(&self.bodies, &self.shapes);

        let settings = SolverSettings {
            contact_bias: self.config.contact_bias,
            allowed_penetration: self.config.allowed_penetration,
        };
        let mut solver = Solver::new(&self.bodies);
        solver.prepare_contacts(&self.contacts, &settings, h);
        for (_, joint) in self.joints.iter_mut() {
            solver.prepare_joint(joint, h);
        }
        for _ in 0..self.config.iterations {
            solver.solve_contacts();
            for (_, joint) in self.joints.iter_mut() {
                solver.solve_joint(joint);
            }
        }
        for (_, joint) in self.joints.iter_mut() {
            joint.publish_impulse();
        }
        solver.write_back(&mut self.bodies);

        for (index, body) in self.bodies.iter_mut() {
            body.integrate_positions(h);
            if !body.is_finite() {
                tracing::warn!(
                    body = %BodyHandle::from_raw(index as u32),
                    "body diverged, rolling back"
                );
                body.rollback();
                report.diverged_bodies += 1;
            }
        }

        for handle in stress::find_broken(&self.joints) {
            if let Some(joint) = self.joints.remove(handle.index()) {
                tracing::info!(
                    %handle,
                    impulse = joint.accumulated_impulse().unwrap_or_default(),
                    threshold = joint.breaking_threshold().unwrap_or(f32::INFINITY),
                    "joint broke"
                );
                report.broken_joints.push(handle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body::moment_for_circle;
    use crate::physics::shape::Geometry;

    fn ball(world: &mut World, position: Vec2) -> BodyHandle {
        let body = world
            .add_body(
                BodyDef::dynamic(3.0, moment_for_circle(3.0, 0.0, 18.0, Vec2::ZERO))
                    .with_position(position),
            )
            .unwrap();
        world
            .add_shape(body, ShapeDef::new(Geometry::circle(18.0)))
            .unwrap();
        body
    }

    #[test]
    fn test_paused_step_is_noop() {
        let mut world = World::default();
        let b = ball(&mut world, Vec2::new(0.0, 100.0));
        let report = world.step(1.0 / 30.0);
        assert_eq!(report.substeps, 0);
        assert_eq!(world.body(b).unwrap().position, Vec2::new(0.0, 100.0));
    }

    #[test]
    fn test_running_step_uses_substeps() {
        let mut world = World::default();
        ball(&mut world, Vec2::new(0.0, 100.0));
        world.set_mode(SimulationMode::Running);
        let report = world.step(1.0 / 30.0);
        assert_eq!(report.substeps, 5);
        assert!(report.broken_joints.is_empty());
    }

    #[test]
    fn test_remove_body_cascades() {
        let mut world = World::default();
        let a = ball(&mut world, Vec2::ZERO);
        let b = ball(&mut world, Vec2::new(50.0, 0.0));
        world
            .add_joint(JointDef::pivot(a, b, Vec2::ZERO, Vec2::new(-50.0, 0.0)))
            .unwrap();

        world.remove_body(a).unwrap();
        assert_eq!(world.body_count(), 1);
        assert_eq!(world.shape_count(), 1);
        assert_eq!(world.joint_count(), 0);
        assert_eq!(world.remove_body(a), Err(PhysicsError::UnknownBody(a)));
    }

    #[test]
    fn test_joint_to_unknown_body_rejected() {
        let mut world = World::default();
        let a = ball(&mut world, Vec2::ZERO);
        let ghost = BodyHandle::from_raw(42);
        let err = world
            .add_joint(JointDef::pivot(a, ghost, Vec2::ZERO, Vec2::ZERO))
            .unwrap_err();
        assert_eq!(err, PhysicsError::UnknownBody(ghost));
        assert_eq!(world.joint_count(), 0);
    }

    #[test]
    fn test_set_motor_rate_rejects_non_motor() {
        let mut world = World::default();
        let a = ball(&mut world, Vec2::ZERO);
        let b = ball(&mut world, Vec2::new(50.0, 0.0));
        let pivot = world
            .add_joint(JointDef::pivot(a, b, Vec2::ZERO, Vec2::ZERO))
            .unwrap();
        let motor = world.add_joint(JointDef::motor(a, b, 0.0, 10.0)).unwrap();

        assert!(world.set_motor_rate(pivot, 1.0).is_err());
        assert!(world.set_motor_rate(motor, 1.0).is_ok());
    }

    #[test]
    fn test_invalid_dt_ignored() {
        let mut world = World::default();
        ball(&mut world, Vec2::ZERO);
        world.set_mode(SimulationMode::Running);
        assert_eq!(world.step(f32::NAN).substeps, 0);
        assert_eq!(world.step(-1.0).substeps, 0);
    }
}
