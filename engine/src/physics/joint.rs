//! Constraint joints between two bodies.
//!
//! A [`Joint`] couples body A and body B through one of four laws:
//!
//! - **Pivot**: two local anchors are pulled together, leaving rotation free.
//! - **Groove**: B's anchor slides along a segment fixed in A's frame.
//! - **DampedSpring**: a Hookean spring with viscous damping between anchors.
//! - **Motor**: drives the relative angular velocity `w_b - w_a` toward `rate`.
//!
//! Pivot, groove and motor joints are velocity constraints solved by the
//! sequential-impulse [`Solver`](super::solver::Solver). They accumulate the
//! impulse they apply during a sub-step, which the stress tracker compares
//! against the optional breaking threshold. The spring is applied once per
//! sub-step as a force and never breaks.
//!
//! # Example
//!
//! ```ignore
//! let def = JointDef::pivot(node, beam, Vec2::ZERO, Vec2::new(-40.0, 0.0))
//!     .with_error_bias(0.5)
//!     .with_breaking_threshold(3500.0);
//! let joint = world.add_joint(def)?;
//! ```

use serde::{Deserialize, Serialize};

use super::error::{PhysicsError, Result};
use super::handle::BodyHandle;
use super::solver::{self, SolverBody};
use super::stress;
use super::types::{self, Mat2, Vec2};

/// Springs stiffer than this are capped; explicit spring integration
/// blows up past it at the sub-step sizes the world uses.
pub const MAX_SPRING_STIFFNESS: f32 = 20_000.0;

/// Per-variant joint parameters. Anchors are in the owning body's local
/// frame, relative to its center of mass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum JointKind {
    Pivot {
        anchor_a: Vec2,
        anchor_b: Vec2,
    },
    Groove {
        groove_a: Vec2,
        groove_b: Vec2,
        anchor_b: Vec2,
    },
    DampedSpring {
        anchor_a: Vec2,
        anchor_b: Vec2,
        rest_length: f32,
        stiffness: f32,
        damping: f32,
    },
    Motor {
        rate: f32,
        max_force: f32,
    },
}

impl JointKind {
    pub fn name(&self) -> &'static str {
        match self {
            JointKind::Pivot { .. } => "pivot",
            JointKind::Groove { .. } => "groove",
            JointKind::DampedSpring { .. } => "damped spring",
            JointKind::Motor { .. } => "motor",
        }
    }

    /// Whether the solver iterates this joint and tracks its impulse.
    pub fn is_constraint(&self) -> bool {
        !matches!(self, JointKind::DampedSpring { .. })
    }
}

/// Description of a joint to add to a world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointDef {
    pub kind: JointKind,
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    /// Fraction of positional error corrected per sub-step. `None` uses the
    /// world default.
    pub error_bias: Option<f32>,
    /// Upper bound on the correction velocity.
    pub max_bias: f32,
    /// Impulse above which the joint is removed. `None` never breaks.
    pub breaking_threshold: Option<f32>,
}

impl JointDef {
    pub fn new(kind: JointKind, body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            kind,
            body_a,
            body_b,
            error_bias: None,
            max_bias: f32::INFINITY,
            breaking_threshold: None,
        }
    }

    pub fn pivot(body_a: BodyHandle, body_b: BodyHandle, anchor_a: Vec2, anchor_b: Vec2) -> Self {
        Self::new(JointKind::Pivot { anchor_a, anchor_b }, body_a, body_b)
    }

    pub fn groove(
        body_a: BodyHandle,
        body_b: BodyHandle,
        groove_a: Vec2,
        groove_b: Vec2,
        anchor_b: Vec2,
    ) -> Self {
        Self::new(
            JointKind::Groove {
                groove_a,
                groove_b,
                anchor_b,
            },
            body_a,
            body_b,
        )
    }

    pub fn damped_spring(
        body_a: BodyHandle,
        body_b: BodyHandle,
        anchor_a: Vec2,
        anchor_b: Vec2,
        rest_length: f32,
        stiffness: f32,
        damping: f32,
    ) -> Self {
        Self::new(
            JointKind::DampedSpring {
                anchor_a,
                anchor_b,
                rest_length,
                stiffness,
                damping,
            },
            body_a,
            body_b,
        )
    }

    pub fn motor(body_a: BodyHandle, body_b: BodyHandle, rate: f32, max_force: f32) -> Self {
        Self::new(JointKind::Motor { rate, max_force }, body_a, body_b)
    }

    pub fn with_error_bias(mut self, error_bias: f32) -> Self {
        self.error_bias = Some(error_bias);
        self
    }

    pub fn with_max_bias(mut self, max_bias: f32) -> Self {
        self.max_bias = max_bias;
        self
    }

    pub fn with_breaking_threshold(mut self, threshold: f32) -> Self {
        self.breaking_threshold = Some(threshold);
        self
    }
}

/// Per-sub-step solver cache.
#[derive(Debug, Clone, Copy, Default)]
struct Prepared {
    a: usize,
    b: usize,
    r1: Vec2,
    r2: Vec2,
    /// Inverted effective mass for two-axis constraints.
    k: Mat2,
    /// Constraint axis: groove normal or spring direction.
    n: Vec2,
    bias: Vec2,
    /// Groove clamp side: 1 at the start, -1 at the end, 0 in between.
    clamp: f32,
    /// Inverted effective mass for single-axis constraints.
    scalar_mass: f32,
    max_impulse: f32,
    impulse: Vec2,
    angular_impulse: f32,
}

/// A joint owned by a world.
#[derive(Debug, Clone)]
pub struct Joint {
    kind: JointKind,
    body_a: BodyHandle,
    body_b: BodyHandle,
    pub error_bias: f32,
    pub max_bias: f32,
    breaking_threshold: Option<f32>,
    /// Impulse applied during the last solved sub-step.
    accumulated_impulse: Option<f32>,
    prepared: Prepared,
}

impl Joint {
    /// Validate a definition. Body handles are checked by the world.
    pub(crate) fn from_def(def: &JointDef, default_error_bias: f32) -> Result<Self> {
        if def.body_a == def.body_b {
            return Err(PhysicsError::invalid_joint(format!(
                "{} joint connects {} to itself",
                def.kind.name(),
                def.body_a
            )));
        }

        let mut kind = def.kind;
        match &mut kind {
            JointKind::Pivot { anchor_a, anchor_b } => {
                check_points(&[*anchor_a, *anchor_b])?;
            }
            JointKind::Groove {
                groove_a,
                groove_b,
                anchor_b,
            } => {
                check_points(&[*groove_a, *groove_b, *anchor_b])?;
                if groove_a.distance_squared(*groove_b) < types::EPSILON {
                    return Err(PhysicsError::invalid_joint("groove has zero length"));
                }
            }
            JointKind::DampedSpring {
                anchor_a,
                anchor_b,
                rest_length,
                stiffness,
                damping,
            } => {
                check_points(&[*anchor_a, *anchor_b])?;
                check_non_negative("rest length", *rest_length)?;
                check_non_negative("stiffness", *stiffness)?;
                check_non_negative("damping", *damping)?;
                if *stiffness > MAX_SPRING_STIFFNESS {
                    tracing::warn!(
                        stiffness = *stiffness,
                        cap = MAX_SPRING_STIFFNESS,
                        "spring stiffness capped"
                    );
                    *stiffness = MAX_SPRING_STIFFNESS;
                }
            }
            JointKind::Motor { rate, max_force } => {
                if !rate.is_finite() {
                    return Err(PhysicsError::invalid_joint("motor rate must be finite"));
                }
                check_non_negative("max force", *max_force)?;
            }
        }

        let error_bias = def.error_bias.unwrap_or(default_error_bias);
        if !(0.0..=1.0).contains(&error_bias) {
            return Err(PhysicsError::invalid_joint(format!(
                "error bias {error_bias} outside [0, 1]"
            )));
        }
        if def.max_bias.is_nan() || def.max_bias < 0.0 {
            return Err(PhysicsError::invalid_joint("max bias must be non-negative"));
        }
        if let Some(threshold) = def.breaking_threshold {
            if threshold.is_nan() || threshold <= 0.0 {
                return Err(PhysicsError::invalid_joint(format!(
                    "breaking threshold {threshold} must be positive"
                )));
            }
        }

        Ok(Self {
            kind,
            body_a: def.body_a,
            body_b: def.body_b,
            error_bias,
            max_bias: def.max_bias,
            breaking_threshold: def.breaking_threshold,
            accumulated_impulse: None,
            prepared: Prepared::default(),
        })
    }

    pub fn kind(&self) -> &JointKind {
        &self.kind
    }

    pub fn body_a(&self) -> BodyHandle {
        self.body_a
    }

    pub fn body_b(&self) -> BodyHandle {
        self.body_b
    }

    pub fn connects(&self, body: BodyHandle) -> bool {
        self.body_a == body || self.body_b == body
    }

    /// The body on the other end, if `body` is attached.
    pub fn other_body(&self, body: BodyHandle) -> Option<BodyHandle> {
        if self.body_a == body {
            Some(self.body_b)
        } else if self.body_b == body {
            Some(self.body_a)
        } else {
            None
        }
    }

    pub fn breaking_threshold(&self) -> Option<f32> {
        self.breaking_threshold
    }

    pub fn set_breaking_threshold(&mut self, threshold: Option<f32>) {
        self.breaking_threshold = threshold;
    }

    /// Magnitude of the impulse applied during the last solved sub-step.
    /// `None` until the joint has been through a solver pass.
    pub fn accumulated_impulse(&self) -> Option<f32> {
        self.accumulated_impulse
    }

    /// `min(1, impulse / threshold)`; zero for unbreakable or unsolved joints.
    pub fn stress_ratio(&self) -> f32 {
        match (self.accumulated_impulse, self.breaking_threshold) {
            (Some(impulse), Some(threshold)) => stress::stress_ratio(impulse, threshold),
            _ => 0.0,
        }
    }

    pub(crate) fn exceeds_threshold(&self) -> bool {
        match (self.accumulated_impulse, self.breaking_threshold) {
            (Some(impulse), Some(threshold)) => impulse > threshold,
            _ => false,
        }
    }

    /// Retarget a motor. Returns false for other joint kinds.
    pub(crate) fn set_rate(&mut self, new_rate: f32) -> bool {
        match &mut self.kind {
            JointKind::Motor { rate, .. } => {
                *rate = new_rate;
                true
            }
            _ => false,
        }
    }

    /// Compute arms, effective masses and bias, and reset the accumulator.
    /// Springs apply their whole force here.
    pub(crate) fn prepare(&mut self, bodies: &mut [SolverBody], dt: f32) {
        let a = self.body_a.index();
        let b = self.body_b.index();
        let inv_dt = if dt > 0.0 { 1.0 / dt } else { 0.0 };
        let bias_coef = self.error_bias * inv_dt;
        let mut p = Prepared {
            a,
            b,
            ..Prepared::default()
        };

        match self.kind {
            JointKind::Pivot { anchor_a, anchor_b } => {
                let (body_a, body_b) = (&bodies[a], &bodies[b]);
                p.r1 = body_a.rotate(anchor_a);
                p.r2 = body_b.rotate(anchor_b);
                p.k = solver::k_tensor(body_a, body_b, p.r1, p.r2);
                let delta = (body_b.position + p.r2) - (body_a.position + p.r1);
                p.bias = (-delta * bias_coef).clamp_length_max(self.max_bias);
            }
            JointKind::Groove {
                groove_a,
                groove_b,
                anchor_b,
            } => {
                let (body_a, body_b) = (&bodies[a], &bodies[b]);
                let ta = body_a.position + body_a.rotate(groove_a);
                let tb = body_a.position + body_a.rotate(groove_b);
                let n = body_a.rotate((groove_b - groove_a).normalize().perp());
                let d = ta.dot(n);

                p.n = n;
                p.r2 = body_b.rotate(anchor_b);

                // Project B's anchor onto the groove, clamping at its ends.
                let td = types::cross(body_b.position + p.r2, n);
                if td <= types::cross(ta, n) {
                    p.clamp = 1.0;
                    p.r1 = ta - body_a.position;
                } else if td >= types::cross(tb, n) {
                    p.clamp = -1.0;
                    p.r1 = tb - body_a.position;
                } else {
                    p.clamp = 0.0;
                    p.r1 = n.perp() * -td + n * d - body_a.position;
                }

                p.k = solver::k_tensor(body_a, body_b, p.r1, p.r2);
                let delta = (body_b.position + p.r2) - (body_a.position + p.r1);
                p.bias = (-delta * bias_coef).clamp_length_max(self.max_bias);
            }
            JointKind::DampedSpring {
                anchor_a,
                anchor_b,
                rest_length,
                stiffness,
                damping,
            } => {
                let (body_a, body_b) = (&bodies[a], &bodies[b]);
                p.r1 = body_a.rotate(anchor_a);
                p.r2 = body_b.rotate(anchor_b);
                let delta = (body_b.position + p.r2) - (body_a.position + p.r1);
                let length = delta.length();
                p.n = if length > types::EPSILON {
                    delta / length
                } else {
                    Vec2::ZERO
                };
                p.scalar_mass = solver::normal_mass(body_a, body_b, p.r1, p.r2, p.n);

                let vrn = solver::relative_velocity(body_a, body_b, p.r1, p.r2).dot(p.n);
                let spring = -stiffness * (length - rest_length) * dt;
                // Damping can stop the approach but never reverse it.
                let damp_limit = p.scalar_mass * vrn.abs();
                let damp = (-damping * vrn * dt).clamp(-damp_limit, damp_limit);
                solver::apply_impulses(bodies, a, b, p.r1, p.r2, p.n * (spring + damp));
            }
            JointKind::Motor { max_force, .. } => {
                let inv_sum = bodies[a].inverse_moment + bodies[b].inverse_moment;
                p.scalar_mass = if inv_sum > 0.0 { 1.0 / inv_sum } else { 0.0 };
                p.max_impulse = max_force;
            }
        }

        self.prepared = p;
    }

    /// One sequential-impulse correction.
    pub(crate) fn apply_impulse(&mut self, bodies: &mut [SolverBody]) {
        let p = &mut self.prepared;
        let (a, b) = (p.a, p.b);

        match self.kind {
            JointKind::Pivot { .. } => {
                let vr = solver::relative_velocity(&bodies[a], &bodies[b], p.r1, p.r2);
                let j = p.k * (p.bias - vr);
                p.impulse += j;
                solver::apply_impulses(bodies, a, b, p.r1, p.r2, j);
            }
            JointKind::Groove { .. } => {
                let vr = solver::relative_velocity(&bodies[a], &bodies[b], p.r1, p.r2);
                let j = p.k * (p.bias - vr);
                let old = p.impulse;
                let total = old + j;
                // Inside the groove only the normal component is held. At a
                // clamped end the anchor may still be pushed back in.
                p.impulse = if p.clamp * types::cross(total, p.n) > 0.0 {
                    total
                } else {
                    types::project(total, p.n)
                };
                let j = p.impulse - old;
                solver::apply_impulses(bodies, a, b, p.r1, p.r2, j);
            }
            JointKind::DampedSpring { .. } => {}
            JointKind::Motor { rate, .. } => {
                let wr = bodies[b].angular_velocity - bodies[a].angular_velocity;
                let j = (rate - wr) * p.scalar_mass;
                let old = p.angular_impulse;
                p.angular_impulse = (old + j).clamp(-p.max_impulse, p.max_impulse);
                let j = p.angular_impulse - old;
                bodies[a].angular_velocity -= j * bodies[a].inverse_moment;
                bodies[b].angular_velocity += j * bodies[b].inverse_moment;
            }
        }
    }

    /// Expose the impulse gathered over the finished solver passes.
    pub(crate) fn publish_impulse(&mut self) {
        let magnitude = match self.kind {
            JointKind::Pivot { .. } | JointKind::Groove { .. } => self.prepared.impulse.length(),
            JointKind::Motor { .. } => self.prepared.angular_impulse.abs(),
            JointKind::DampedSpring { .. } => 0.0,
        };
        self.accumulated_impulse = Some(magnitude);
    }
}

fn check_points(points: &[Vec2]) -> Result<()> {
    if points.iter().all(|p| types::is_finite(*p)) {
        Ok(())
    } else {
        Err(PhysicsError::invalid_joint("anchor is not finite"))
    }
}

fn check_non_negative(what: &str, value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(PhysicsError::invalid_joint(format!(
            "{what} must be finite and non-negative, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handles() -> (BodyHandle, BodyHandle) {
        (BodyHandle::from_raw(0), BodyHandle::from_raw(1))
    }

    fn body(position: Vec2, inverse_mass: f32, inverse_moment: f32) -> SolverBody {
        SolverBody {
            position,
            rotation: Vec2::X,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            inverse_mass,
            inverse_moment,
        }
    }

    #[test]
    fn test_self_joint_rejected() {
        let (a, _) = handles();
        let def = JointDef::pivot(a, a, Vec2::ZERO, Vec2::ZERO);
        assert!(matches!(
            Joint::from_def(&def, 0.1),
            Err(PhysicsError::InvalidJoint { .. })
        ));
    }

    #[test]
    fn test_spring_stiffness_capped() {
        let (a, b) = handles();
        let def = JointDef::damped_spring(a, b, Vec2::ZERO, Vec2::ZERO, 0.0, 1.0e6, 10.0);
        let joint = Joint::from_def(&def, 0.1).unwrap();
        match joint.kind() {
            JointKind::DampedSpring { stiffness, .. } => {
                assert_eq!(*stiffness, MAX_SPRING_STIFFNESS)
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let (a, b) = handles();
        let zero_groove = JointDef::groove(a, b, Vec2::ONE, Vec2::ONE, Vec2::ZERO);
        assert!(Joint::from_def(&zero_groove, 0.1).is_err());

        let bad_threshold =
            JointDef::pivot(a, b, Vec2::ZERO, Vec2::ZERO).with_breaking_threshold(0.0);
        assert!(Joint::from_def(&bad_threshold, 0.1).is_err());

        let bad_bias = JointDef::pivot(a, b, Vec2::ZERO, Vec2::ZERO).with_error_bias(1.5);
        assert!(Joint::from_def(&bad_bias, 0.1).is_err());

        let negative_force = JointDef::motor(a, b, 1.0, -1.0);
        assert!(Joint::from_def(&negative_force, 0.1).is_err());
    }

    #[test]
    fn test_impulse_unavailable_before_solve() {
        let (a, b) = handles();
        let joint = Joint::from_def(
            &JointDef::pivot(a, b, Vec2::ZERO, Vec2::ZERO).with_breaking_threshold(10.0),
            0.1,
        )
        .unwrap();
        assert_eq!(joint.accumulated_impulse(), None);
        assert_eq!(joint.stress_ratio(), 0.0);
        assert!(!joint.exceeds_threshold());
    }

    #[test]
    fn test_pivot_cancels_relative_velocity() {
        let (a, b) = handles();
        let mut joint =
            Joint::from_def(&JointDef::pivot(a, b, Vec2::ZERO, Vec2::ZERO), 0.0).unwrap();
        let mut bodies = vec![body(Vec2::ZERO, 0.0, 0.0), body(Vec2::ZERO, 1.0, 1.0)];
        bodies[1].linear_velocity = Vec2::new(0.0, 6.0);

        joint.prepare(&mut bodies, 1.0 / 150.0);
        joint.apply_impulse(&mut bodies);
        joint.publish_impulse();

        assert!(bodies[1].linear_velocity.length() < 1e-5);
        let impulse = joint.accumulated_impulse().unwrap();
        assert!((impulse - 6.0).abs() < 1e-4);
    }

    #[test]
    fn test_motor_respects_max_force() {
        let (a, b) = handles();
        let mut joint = Joint::from_def(&JointDef::motor(a, b, 10.0, 2.0), 0.1).unwrap();
        let mut bodies = vec![body(Vec2::ZERO, 0.0, 0.0), body(Vec2::ZERO, 1.0, 1.0)];

        joint.prepare(&mut bodies, 1.0 / 150.0);
        for _ in 0..10 {
            joint.apply_impulse(&mut bodies);
        }
        joint.publish_impulse();

        // Unit moment: the clamped impulse equals the angular velocity gained.
        assert!((bodies[1].angular_velocity - 2.0).abs() < 1e-5);
        assert!((joint.accumulated_impulse().unwrap() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_motor_reaches_rate() {
        let (a, b) = handles();
        let mut joint = Joint::from_def(&JointDef::motor(a, b, 3.0, 1.0e6), 0.1).unwrap();
        let mut bodies = vec![body(Vec2::ZERO, 0.0, 0.0), body(Vec2::ZERO, 1.0, 0.5)];

        joint.prepare(&mut bodies, 1.0 / 150.0);
        joint.apply_impulse(&mut bodies);
        assert!((bodies[1].angular_velocity - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_groove_allows_sliding_along_axis() {
        let (a, b) = handles();
        // Vertical groove on a static body, anchor in the middle of it.
        let def = JointDef::groove(a, b, Vec2::new(0.0, -10.0), Vec2::new(0.0, 10.0), Vec2::ZERO);
        let mut joint = Joint::from_def(&def, 0.0).unwrap();
        let mut bodies = vec![body(Vec2::ZERO, 0.0, 0.0), body(Vec2::ZERO, 1.0, 1.0)];
        bodies[1].linear_velocity = Vec2::new(4.0, 5.0);

        joint.prepare(&mut bodies, 1.0 / 150.0);
        for _ in 0..5 {
            joint.apply_impulse(&mut bodies);
        }

        let v = bodies[1].linear_velocity;
        assert!(v.x.abs() < 1e-4, "sideways motion should be removed: {v:?}");
        assert!((v.y - 5.0).abs() < 1e-4, "sliding should be kept: {v:?}");
    }

    #[test]
    fn test_spring_pulls_toward_rest_length() {
        let (a, b) = handles();
        let def = JointDef::damped_spring(a, b, Vec2::ZERO, Vec2::ZERO, 10.0, 100.0, 0.0);
        let mut joint = Joint::from_def(&def, 0.1).unwrap();
        let mut bodies = vec![
            body(Vec2::ZERO, 0.0, 0.0),
            body(Vec2::new(20.0, 0.0), 1.0, 1.0),
        ];

        joint.prepare(&mut bodies, 0.01);
        // Stretched by 10: impulse = -100 * 10 * 0.01 along +x.
        assert!((bodies[1].linear_velocity.x + 10.0).abs() < 1e-4);
        joint.publish_impulse();
        assert_eq!(joint.accumulated_impulse(), Some(0.0));
    }
}
