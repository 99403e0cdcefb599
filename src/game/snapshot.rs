//! Bridge snapshots.
//!
//! A snapshot records just enough to rebuild a bridge: every node's
//! position and whether it is anchored, and every intact beam as a pair of
//! node indices plus its material. Snapshots are taken when the editor
//! enters simulation and restored when it returns to building, and can be
//! written to disk as JSON.
//!
//! # Example
//!
//! ```ignore
//! let snapshot = bridge.snapshot();
//! snapshot.save("my_bridge.json")?;
//!
//! let loaded = BridgeSnapshot::load("my_bridge.json")?;
//! bridge.restore(&loaded)?;
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::materials::BeamMaterial;

/// A node as saved: position and anchoring.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub x: f32,
    pub y: f32,
    pub is_static: bool,
}

/// A beam as saved: indices into the snapshot's node list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeamRecord {
    pub node_a: usize,
    pub node_b: usize,
    pub material: BeamMaterial,
}

/// Everything needed to rebuild a bridge on a fresh level.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeSnapshot {
    pub nodes: Vec<NodeRecord>,
    pub beams: Vec<BeamRecord>,
}

/// Errors that can occur when reading or writing a snapshot file.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BridgeSnapshot {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Beams whose node indices are in range. Restore skips the others.
    pub fn valid_beams(&self) -> impl Iterator<Item = &BeamRecord> {
        self.beams
            .iter()
            .filter(|b| b.node_a < self.nodes.len() && b.node_b < self.nodes.len())
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write the snapshot as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)?;
        tracing::info!(
            path = %path.display(),
            nodes = self.nodes.len(),
            beams = self.beams.len(),
            "saved bridge snapshot"
        );
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let snapshot = Self::from_json(&std::fs::read_to_string(path)?)?;
        tracing::info!(
            path = %path.display(),
            nodes = snapshot.nodes.len(),
            beams = snapshot.beams.len(),
            "loaded bridge snapshot"
        );
        Ok(snapshot)
    }
}
