//! Beam materials.
//!
//! Each material fixes a beam's cross-section width, mass, joint strength
//! and what it collides with. Road carries the car; wood and steel are
//! supports that only rest on terrain.

use serde::{Deserialize, Serialize};

use super::config::category;
use crate::physics::Rgba;

/// Material of a bridge beam.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BeamMaterial {
    #[default]
    Road,
    Wood,
    Steel,
}

impl BeamMaterial {
    pub const ALL: [BeamMaterial; 3] =
        [BeamMaterial::Road, BeamMaterial::Wood, BeamMaterial::Steel];

    /// Beam thickness.
    pub fn width(self) -> f32 {
        match self {
            BeamMaterial::Road => 10.0,
            BeamMaterial::Wood => 6.0,
            BeamMaterial::Steel => 4.0,
        }
    }

    pub fn mass(self) -> f32 {
        match self {
            BeamMaterial::Road => 10.0,
            BeamMaterial::Wood => 5.0,
            BeamMaterial::Steel => 8.0,
        }
    }

    /// Breaking threshold of the pivots holding the beam.
    pub fn strength(self) -> f32 {
        match self {
            BeamMaterial::Road => 12000.0,
            BeamMaterial::Wood => 3500.0,
            BeamMaterial::Steel => 8000.0,
        }
    }

    pub fn category(self) -> u32 {
        match self {
            BeamMaterial::Road => category::ROAD,
            BeamMaterial::Wood | BeamMaterial::Steel => category::SUPPORT,
        }
    }

    pub fn mask(self) -> u32 {
        match self {
            BeamMaterial::Road => category::CAR | category::GROUND,
            BeamMaterial::Wood | BeamMaterial::Steel => category::GROUND,
        }
    }

    /// Unstressed color.
    pub fn color(self) -> Rgba {
        match self {
            BeamMaterial::Road => [60, 60, 60, 255],
            BeamMaterial::Wood => [139, 69, 19, 255],
            BeamMaterial::Steel => [160, 160, 180, 255],
        }
    }

    /// Shape tag identifying beams of this material.
    pub fn tag(self) -> u32 {
        match self {
            BeamMaterial::Road => 1,
            BeamMaterial::Wood => 2,
            BeamMaterial::Steel => 3,
        }
    }

    pub fn from_tag(tag: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.tag() == tag)
    }

    pub fn name(self) -> &'static str {
        match self {
            BeamMaterial::Road => "road",
            BeamMaterial::Wood => "wood",
            BeamMaterial::Steel => "steel",
        }
    }
}

impl std::fmt::Display for BeamMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
