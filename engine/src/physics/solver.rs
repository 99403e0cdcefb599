//! Sequential-impulse constraint solver.
//!
//! Each sub-step the world copies body velocities into a dense
//! [`SolverBody`] buffer, prepares every contact and joint (anchor arms,
//! effective masses, bias velocities), then runs `iterations` passes in
//! which each constraint applies one velocity correction. Finally the
//! corrected velocities are written back to the bodies.
//!
//! For position drift the solver uses Baumgarte stabilization: a bias
//! velocity `-error * bias_factor / dt` is folded into the velocity target.

use super::body::Body;
use super::collision::Contact;
use super::handle::Arena;
use super::joint::Joint;
use super::types::{self, Mat2, Vec2};

/// Velocity state and inverse mass properties used inside the solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverBody {
    pub position: Vec2,
    pub rotation: Vec2,
    pub linear_velocity: Vec2,
    pub angular_velocity: f32,
    pub inverse_mass: f32,
    pub inverse_moment: f32,
}

impl SolverBody {
    /// Immovable placeholder for empty arena slots.
    const FIXED: Self = Self {
        position: Vec2::ZERO,
        rotation: Vec2::X,
        linear_velocity: Vec2::ZERO,
        angular_velocity: 0.0,
        inverse_mass: 0.0,
        inverse_moment: 0.0,
    };

    fn from_body(body: &Body) -> Self {
        Self {
            position: body.position,
            rotation: body.rotation(),
            linear_velocity: body.linear_velocity,
            angular_velocity: body.angular_velocity,
            inverse_mass: body.inverse_mass(),
            inverse_moment: body.inverse_moment(),
        }
    }

    /// Rotate a body-local vector into world orientation.
    pub fn rotate(&self, local: Vec2) -> Vec2 {
        types::rotate(self.rotation, local)
    }
}

/// Velocity of B's arm `r2` relative to A's arm `r1`.
#[inline]
pub(crate) fn relative_velocity(a: &SolverBody, b: &SolverBody, r1: Vec2, r2: Vec2) -> Vec2 {
    let va = a.linear_velocity + types::cross_scalar(a.angular_velocity, r1);
    let vb = b.linear_velocity + types::cross_scalar(b.angular_velocity, r2);
    vb - va
}

/// Apply `j` to B at arm `r2` and `-j` to A at arm `r1`.
#[inline]
pub(crate) fn apply_impulses(
    bodies: &mut [SolverBody],
    a: usize,
    b: usize,
    r1: Vec2,
    r2: Vec2,
    j: Vec2,
) {
    let body_a = &mut bodies[a];
    body_a.linear_velocity -= j * body_a.inverse_mass;
    body_a.angular_velocity -= body_a.inverse_moment * types::cross(r1, j);
    let body_b = &mut bodies[b];
    body_b.linear_velocity += j * body_b.inverse_mass;
    body_b.angular_velocity += body_b.inverse_moment * types::cross(r2, j);
}

/// Effective mass along a single direction `n`, inverted. Zero only when
/// both bodies are immovable along `n`; heavy bodies give a tiny but
/// nonzero `k`.
pub(crate) fn normal_mass(a: &SolverBody, b: &SolverBody, r1: Vec2, r2: Vec2, n: Vec2) -> f32 {
    let rn1 = types::cross(r1, n);
    let rn2 = types::cross(r2, n);
    let k = a.inverse_mass
        + b.inverse_mass
        + a.inverse_moment * rn1 * rn1
        + b.inverse_moment * rn2 * rn2;
    if k > 0.0 { 1.0 / k } else { 0.0 }
}

/// Inverted 2x2 effective mass matrix for a point-to-point constraint.
///
/// Singularity is judged relative to the diagonal, so the cutoff does not
/// depend on how heavy the bodies are.
pub(crate) fn k_tensor(a: &SolverBody, b: &SolverBody, r1: Vec2, r2: Vec2) -> Mat2 {
    let m_sum = a.inverse_mass + b.inverse_mass;
    let k11 = m_sum + a.inverse_moment * r1.y * r1.y + b.inverse_moment * r2.y * r2.y;
    let k12 = -a.inverse_moment * r1.x * r1.y - b.inverse_moment * r2.x * r2.y;
    let k22 = m_sum + a.inverse_moment * r1.x * r1.x + b.inverse_moment * r2.x * r2.x;
    let k = Mat2::from_cols(Vec2::new(k11, k12), Vec2::new(k12, k22));
    let det = k.determinant();
    if det.abs() <= f32::EPSILON * (k11 * k22).abs() {
        Mat2::ZERO
    } else {
        k.inverse()
    }
}

/// Solver tuning shared by contacts and joints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverSettings {
    /// Fraction of contact penetration corrected per sub-step.
    pub contact_bias: f32,
    /// Penetration tolerated before the contact bias kicks in.
    pub allowed_penetration: f32,
}

#[derive(Debug, Clone, Copy)]
struct ContactConstraint {
    a: usize,
    b: usize,
    r1: Vec2,
    r2: Vec2,
    normal: Vec2,
    tangent: Vec2,
    normal_mass: f32,
    tangent_mass: f32,
    bias: f32,
    friction: f32,
    normal_impulse: f32,
    tangent_impulse: f32,
}

/// Working state for one sub-step.
#[derive(Debug, Default)]
pub struct Solver {
    bodies: Vec<SolverBody>,
    contacts: Vec<ContactConstraint>,
}

impl Solver {
    /// Snapshot the velocity state of every body. The buffer is indexed by
    /// body slot so joints and contacts can use handle indices directly;
    /// dead slots get an immovable placeholder.
    pub fn new(bodies: &Arena<Body>) -> Self {
        let mut buffer = vec![SolverBody::FIXED; bodies.slot_count()];
        for (index, body) in bodies.iter() {
            buffer[index] = SolverBody::from_body(body);
        }
        Self {
            bodies: buffer,
            contacts: Vec::new(),
        }
    }

    pub fn bodies(&self) -> &[SolverBody] {
        &self.bodies
    }

    /// Compute arms, effective masses and bias for each contact.
    pub fn prepare_contacts(&mut self, contacts: &[Contact], settings: &SolverSettings, dt: f32) {
        let inv_dt = if dt > 0.0 { 1.0 / dt } else { 0.0 };
        self.contacts = contacts
            .iter()
            .map(|c| {
                let a = c.body_a.index();
                let b = c.body_b.index();
                let body_a = &self.bodies[a];
                let body_b = &self.bodies[b];
                let r1 = c.point - body_a.position;
                let r2 = c.point - body_b.position;
                let tangent = c.normal.perp();
                let excess = (c.penetration_depth - settings.allowed_penetration).max(0.0);
                ContactConstraint {
                    a,
                    b,
                    r1,
                    r2,
                    normal: c.normal,
                    tangent,
                    normal_mass: normal_mass(body_a, body_b, r1, r2, c.normal),
                    tangent_mass: normal_mass(body_a, body_b, r1, r2, tangent),
                    bias: settings.contact_bias * inv_dt * excess,
                    friction: c.friction,
                    normal_impulse: 0.0,
                    tangent_impulse: 0.0,
                }
            })
            .collect();
    }

    /// Prepare a joint against the current velocity buffer.
    pub fn prepare_joint(&mut self, joint: &mut Joint, dt: f32) {
        joint.prepare(&mut self.bodies, dt);
    }

    /// One pass over every contact: non-penetration then Coulomb friction.
    pub fn solve_contacts(&mut self) {
        for c in &mut self.contacts {
            let vr = relative_velocity(&self.bodies[c.a], &self.bodies[c.b], c.r1, c.r2);

            let vn = vr.dot(c.normal);
            let jn = c.normal_mass * (-vn + c.bias);
            let old = c.normal_impulse;
            c.normal_impulse = (old + jn).max(0.0);
            let jn = c.normal_impulse - old;
            // Normal points A→B, so B is pushed along it.
            apply_impulses(&mut self.bodies, c.a, c.b, c.r1, c.r2, c.normal * jn);

            let vr = relative_velocity(&self.bodies[c.a], &self.bodies[c.b], c.r1, c.r2);
            let vt = vr.dot(c.tangent);
            let jt = -c.tangent_mass * vt;
            let max_friction = c.friction * c.normal_impulse;
            let old = c.tangent_impulse;
            c.tangent_impulse = (old + jt).clamp(-max_friction, max_friction);
            let jt = c.tangent_impulse - old;
            apply_impulses(&mut self.bodies, c.a, c.b, c.r1, c.r2, c.tangent * jt);
        }
    }

    /// One pass for a single joint.
    pub fn solve_joint(&mut self, joint: &mut Joint) {
        joint.apply_impulse(&mut self.bodies);
    }

    /// Copy corrected velocities back onto the bodies.
    pub fn write_back(&self, bodies: &mut Arena<Body>) {
        for (index, body) in bodies.iter_mut() {
            if body.is_static() {
                continue;
            }
            let solved = &self.bodies[index];
            body.linear_velocity = solved.linear_velocity;
            body.angular_velocity = solved.angular_velocity;
        }
    }
}
