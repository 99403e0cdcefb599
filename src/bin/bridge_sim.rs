//! Bridge Sim - Headless Bridge Runner
//!
//! Builds a level, optionally loads a saved bridge, drives the car across
//! and reports which beams broke. Without `--level` a plain road deck is
//! laid between the two bank anchors.
//!
//! Run with: `cargo run --bin bridge_sim -- --frames 300 --car-mass 40`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use bridge_sandbox_engine::game::{BeamMaterial, BridgeBuilder, BridgeSnapshot, SandboxConfig};
use bridge_sandbox_engine::physics::Vec2;

/// Drive a car over a bridge and see what breaks
#[derive(Parser)]
#[command(name = "bridge_sim")]
#[command(about = "Headless bridge builder simulation", long_about = None)]
#[command(version)]
struct Cli {
    /// Bridge snapshot (JSON) to load instead of the default deck
    #[arg(long)]
    level: Option<PathBuf>,

    /// Frames to simulate
    #[arg(long, default_value_t = 300)]
    frames: u32,

    /// Car mass
    #[arg(long)]
    car_mass: Option<f32>,

    /// Wheel speed (rad/s); negative drives backwards
    #[arg(long)]
    speed: Option<f32>,

    /// Write the bridge snapshot here before simulating
    #[arg(long)]
    save: Option<PathBuf>,
}

// ============================================================================
// LEVEL
// ============================================================================

/// Road segments from the left base anchor to the right one.
fn build_default_deck(bridge: &mut BridgeBuilder) -> Result<()> {
    const SEGMENT: f32 = 80.0;

    let config = bridge.config().clone();
    let y = config.anchor_y;
    let start = Vec2::new(config.left_bank.wall_x, y);
    let end = Vec2::new(config.right_bank.wall_x, y);

    let mut current = bridge
        .nearest_node(start)
        .context("left base anchor missing")?;
    let segments = ((end.x - start.x) / SEGMENT).ceil() as usize;
    for i in 1..=segments {
        let x = (start.x + SEGMENT * i as f32).min(end.x);
        let next = match bridge.nearest_node(Vec2::new(x, y)) {
            Some(node) => node,
            None => bridge.create_node(Vec2::new(x, y), false)?,
        };
        bridge.create_beam(current, next, BeamMaterial::Road)?;
        current = next;
    }
    Ok(())
}

// ============================================================================
// MAIN
// ============================================================================

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();
    let config = SandboxConfig::default();
    let speed = cli.speed.unwrap_or(config.drive_speed);
    let mut bridge = BridgeBuilder::new(config)?;

    match &cli.level {
        Some(path) => {
            let snapshot = BridgeSnapshot::load(path)
                .with_context(|| format!("loading {}", path.display()))?;
            bridge.restore(&snapshot)?;
        }
        None => build_default_deck(&mut bridge)?,
    }

    if let Some(path) = &cli.save {
        bridge
            .snapshot()
            .save(path)
            .with_context(|| format!("saving {}", path.display()))?;
    }

    if let Some(mass) = cli.car_mass {
        if !bridge.set_car_mass(mass) {
            anyhow::bail!("car mass must be positive, got {mass}");
        }
    }

    println!(
        "Bridge: {} nodes, {} beams",
        bridge.nodes().len(),
        bridge.beams().len()
    );

    bridge.spawn_car()?;
    bridge.drive(speed)?;

    let mut broken_joints = 0;
    let mut diverged = 0;
    for _ in 0..cli.frames {
        let report = bridge.tick();
        broken_joints += report.broken_joints.len();
        diverged += report.diverged_bodies;
    }
    bridge.world().check_finite()?;

    let broken = bridge.broken_beams();
    let car_position = bridge
        .car()
        .and_then(|car| car.position(bridge.world()))
        .unwrap_or_default();

    println!("Simulated {} frames", cli.frames);
    println!(
        "Car at ({:.1}, {:.1})",
        car_position.x, car_position.y
    );
    println!(
        "Broken: {} joints, {} of {} beams",
        broken_joints,
        broken.len(),
        bridge.beams().len()
    );
    for beam in broken {
        if let Some(record) = bridge.beam(beam) {
            println!("  {} beam {}", record.material, beam);
        }
    }
    if diverged > 0 {
        println!("Warning: {diverged} body rollbacks after numerical blow-ups");
    }

    Ok(())
}
