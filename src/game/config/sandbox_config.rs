//! Sandbox Configuration
//!
//! Level layout, editor limits and vehicle parameters in one place.
//! `Default` returns the classic two-bank level.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::physics::WorldConfig;

/// Collision categories. A shape collides with another only when each
/// one's mask contains the other's category.
pub mod category {
    pub const GROUND: u32 = 1;
    pub const ROAD: u32 = 1 << 1;
    pub const CAR: u32 = 1 << 2;
    pub const SUPPORT: u32 = 1 << 3;
    pub const NODE: u32 = 1 << 4;
}

/// One solid bank the bridge spans between.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BankConfig {
    /// Top-left corner (screen coordinates, y down)
    pub origin: Vec2,
    /// Width and height
    pub size: Vec2,
    /// X of the wall facing the gap; anchors snap to it
    pub wall_x: f32,
}

impl BankConfig {
    pub fn center(&self) -> Vec2 {
        self.origin + self.size * 0.5
    }
}

/// Central configuration for the sandbox level and editor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Physics world tuning used while simulating
    pub world: WorldConfig,
    /// Playfield width
    pub width: f32,
    /// Playfield height; the ground surface sits here
    pub height: f32,
    /// Thickness of the ground slab below the playfield
    pub ground_thickness: f32,
    /// Frames per second the editor ticks at
    pub fps: u32,
    pub left_bank: BankConfig,
    pub right_bank: BankConfig,
    /// Height of the default anchors and the build floor above the banks
    pub anchor_y: f32,
    /// Static anchors created by `reset_level`
    pub default_anchors: Vec<Vec2>,
    /// Terrain friction
    pub terrain_friction: f32,
    pub node_radius: f32,
    pub node_mass: f32,
    /// Distance within which a click picks a node
    pub pick_radius: f32,
    /// Distance from a bank wall within which new nodes snap onto it
    pub snap_tolerance: f32,
    /// Longest beam a single drag can build
    pub max_build_distance: f32,
    /// Shorter beams are silently refused
    pub min_beam_length: f32,
    /// Distance within which a delete click picks a beam
    pub beam_pick_radius: f32,
    /// Pivot error bias for beam joints
    pub beam_error_bias: f32,
    pub car_spawn: Vec2,
    pub car_mass: f32,
    pub drive_speed: f32,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            world: WorldConfig::default(),
            width: 1200.0,
            height: 600.0,
            ground_thickness: 10.0,
            fps: 30,
            left_bank: BankConfig {
                origin: Vec2::new(0.0, 400.0),
                size: Vec2::new(200.0, 200.0),
                wall_x: 200.0,
            },
            right_bank: BankConfig {
                origin: Vec2::new(1000.0, 400.0),
                size: Vec2::new(200.0, 200.0),
                wall_x: 1000.0,
            },
            anchor_y: 405.0,
            default_anchors: vec![
                Vec2::new(200.0, 405.0),
                Vec2::new(1000.0, 405.0),
                Vec2::new(100.0, 405.0),
                Vec2::new(1100.0, 405.0),
            ],
            terrain_friction: 1.0,
            node_radius: 5.0,
            node_mass: 1.0,
            pick_radius: 20.0,
            snap_tolerance: 15.0,
            max_build_distance: 150.0,
            min_beam_length: 10.0,
            beam_pick_radius: 5.0,
            beam_error_bias: 0.5,
            car_spawn: Vec2::new(80.0, 275.0),
            car_mass: 15.0,
            drive_speed: 25.0,
        }
    }
}

impl SandboxConfig {
    /// Duration of one editor tick.
    pub fn frame_dt(&self) -> f32 {
        1.0 / self.fps.max(1) as f32
    }

    pub fn banks(&self) -> [&BankConfig; 2] {
        [&self.left_bank, &self.right_bank]
    }
}
