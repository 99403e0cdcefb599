//! Bridge Sandbox Engine Library
//!
//! A headless 2D bridge-building sandbox: place nodes and beams, run the
//! simulation, drive a car across and watch which beams give way.
//!
//! # Modules
//!
//! - [`physics`] - Rigid bodies, shapes, joints, solver and stress tracking
//! - [`game`] - The bridge editor model, materials, test car and snapshots
//!
//! # Example
//!
//! ```ignore
//! use bridge_sandbox_engine::game::{BeamMaterial, BridgeBuilder, SandboxConfig};
//! use bridge_sandbox_engine::physics::Vec2;
//!
//! let mut bridge = BridgeBuilder::new(SandboxConfig::default())?;
//! let mid = bridge.create_node(Vec2::new(600.0, 405.0), false)?;
//! let left = bridge.nearest_node(Vec2::new(200.0, 405.0)).unwrap();
//! bridge.create_beam(left, mid, BeamMaterial::Road)?;
//!
//! bridge.to_sim_mode();
//! for _ in 0..120 {
//!     bridge.tick();
//! }
//! ```

pub mod physics;

// Game-specific modules (located in src/game/ directory)
#[path = "../../src/game/mod.rs"]
pub mod game;
