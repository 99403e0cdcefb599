//! 2D rigid-body physics for the bridge sandbox.
//!
//! Built from scratch without an external physics library: circles and
//! convex polygons, pivot/groove/spring/motor joints, a sequential-impulse
//! solver with sub-stepping, and per-joint stress tracking so structures can
//! break under load.
//!
//! # Unit System
//!
//! Screen units throughout: **1 unit = 1 pixel**, y grows downward, angles
//! in radians with positive rotation turning +x toward +y.
//!
//! - Gravity defaults to 900 units/s² downward
//! - Masses are arbitrary but consistent (a wood beam weighs 5)
//! - Breaking thresholds are impulses per sub-step
//!
//! # Submodules
//!
//! - [`types`] - `Vec2`/`Mat2` re-exported from glam plus 2D helpers
//! - [`handle`] - Arena storage and typed handles
//! - [`body`] - Rigid bodies, mass properties, integration
//! - [`shape`] - Circle and polygon geometry with collision filters
//! - [`collision`] - Narrow-phase contacts and point queries
//! - [`joint`] - Pivot, groove, damped spring and motor joints
//! - [`solver`] - Sequential-impulse contact and joint solver
//! - [`stress`] - Breaking thresholds and stress coloring
//! - [`world`] - The world that owns and steps everything

pub mod body;
pub mod collision;
pub mod error;
pub mod handle;
pub mod joint;
pub mod shape;
pub mod solver;
pub mod stress;
pub mod types;
pub mod world;

// Re-export commonly used types at the physics module level
pub use body::{
    Body, BodyDef, BodyKind, MIN_MASS, moment_for_box, moment_for_circle, moment_for_polygon,
};
pub use collision::{Contact, PointQuery};
pub use error::{PhysicsError, Result};
pub use handle::{BodyHandle, JointHandle, ShapeHandle};
pub use joint::{Joint, JointDef, JointKind, MAX_SPRING_STIFFNESS};
pub use shape::{CollisionFilter, Geometry, Rgba, Shape, ShapeDef};
pub use stress::{stress_color, stress_ratio};
pub use types::{Mat2, Vec2};
pub use world::{SimulationMode, StepReport, World, WorldConfig};
