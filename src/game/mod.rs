//! Game Module
//!
//! The bridge builder on top of the physics engine: level layout, beam
//! materials, the editor model, the test car and saved bridges.

pub mod bridge;
pub mod car;
pub mod config;
pub mod materials;
pub mod snapshot;

pub use bridge::{Beam, BridgeBuilder, EditorMode, Node};
pub use car::{Car, Wheel};
pub use config::{BankConfig, SandboxConfig, category};
pub use materials::BeamMaterial;
pub use snapshot::{BeamRecord, BridgeSnapshot, NodeRecord, SnapshotError};
