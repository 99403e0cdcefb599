//! Joint Tests - Pivot, Groove, Spring, Motor and Breakage
//!
//! Tests for joint behavior inside a stepping world, including the stress
//! tracker removing overloaded joints.

use approx::assert_relative_eq;
use bridge_sandbox_engine::physics::{
    BodyDef, BodyHandle, JointDef, JointHandle, JointKind, MAX_SPRING_STIFFNESS, SimulationMode,
    Vec2, World, WorldConfig, moment_for_box, moment_for_circle,
};

fn running(config: WorldConfig) -> World {
    let mut world = World::new(config);
    world.set_mode(SimulationMode::Running);
    world
}

fn anchor(world: &mut World, position: Vec2) -> BodyHandle {
    world
        .add_body(BodyDef::fixed().with_position(position))
        .unwrap()
}

fn point_mass(world: &mut World, mass: f32, position: Vec2) -> BodyHandle {
    world
        .add_body(
            BodyDef::dynamic(mass, moment_for_circle(mass, 0.0, 5.0, Vec2::ZERO))
                .with_position(position),
        )
        .unwrap()
}

/// Distance between the two world-space anchor points of a pivot.
fn pivot_error(world: &World, joint: JointHandle) -> f32 {
    let joint = world.joint(joint).unwrap();
    let JointKind::Pivot { anchor_a, anchor_b } = *joint.kind() else {
        panic!("not a pivot");
    };
    let a = world.body(joint.body_a()).unwrap().local_to_world(anchor_a);
    let b = world.body(joint.body_b()).unwrap().local_to_world(anchor_b);
    a.distance(b)
}

// ============================================================================
// Pivot
// ============================================================================

#[test]
fn test_pivot_holds_pendulum() {
    let mut world = running(WorldConfig::default());
    let pin = anchor(&mut world, Vec2::ZERO);
    let bob = point_mass(&mut world, 1.0, Vec2::new(50.0, 0.0));
    let joint = world
        .add_joint(JointDef::pivot(pin, bob, Vec2::ZERO, Vec2::new(-50.0, 0.0)))
        .unwrap();

    let mut lowest = 0.0_f32;
    for _ in 0..60 {
        world.step(1.0 / 30.0);
        assert!(pivot_error(&world, joint) < 1.0);
        lowest = lowest.max(world.body(bob).unwrap().position.y);
    }

    // The bob swung down through the bottom of its arc.
    assert!(lowest > 40.0, "lowest point {lowest}");
}

#[test]
fn test_pivot_holds_heavy_body() {
    for mass in [500.0, 1001.0, 2000.0, 1.0e5] {
        let mut world = running(WorldConfig::default());
        let pin = anchor(&mut world, Vec2::ZERO);
        let heavy = point_mass(&mut world, mass, Vec2::ZERO);
        let joint = world
            .add_joint(JointDef::pivot(pin, heavy, Vec2::ZERO, Vec2::ZERO))
            .unwrap();

        for _ in 0..30 {
            world.step(1.0 / 30.0);
        }

        let position = world.body(heavy).unwrap().position;
        assert!(
            position.length() < 1.0,
            "mass {mass} fell off its pin: {position:?}"
        );
        assert!(pivot_error(&world, joint) < 1.0);
    }
}

/// Maximum pivot error of a three-link chain hanging from a fixed pin.
fn hanging_chain_error(iterations: u32) -> f32 {
    let mut world = running(WorldConfig::default());
    world.set_iterations(iterations);
    let pin = anchor(&mut world, Vec2::ZERO);
    let mut joints = Vec::new();
    let mut previous = (pin, Vec2::ZERO);
    for i in 0..3 {
        let link = world
            .add_body(
                BodyDef::dynamic(1.0, moment_for_box(1.0, 4.0, 50.0))
                    .with_position(Vec2::new(0.0, 25.0 + 50.0 * i as f32)),
            )
            .unwrap();
        joints.push(
            world
                .add_joint(JointDef::pivot(
                    previous.0,
                    link,
                    previous.1,
                    Vec2::new(0.0, -25.0),
                ))
                .unwrap(),
        );
        previous = (link, Vec2::new(0.0, 25.0));
    }

    for _ in 0..30 {
        world.step(1.0 / 30.0);
    }
    joints
        .iter()
        .map(|j| pivot_error(&world, *j))
        .fold(0.0, f32::max)
}

#[test]
fn test_more_iterations_do_not_increase_pivot_error() {
    let coarse = hanging_chain_error(1);
    let fine = hanging_chain_error(30);
    assert!(
        fine <= coarse + 1e-3,
        "30 iterations ({fine}) should not be worse than 1 ({coarse})"
    );
    assert!(fine < 0.5, "converged chain error too large: {fine}");
}

// ============================================================================
// Groove
// ============================================================================

#[test]
fn test_groove_keeps_body_on_track() {
    let mut world = running(WorldConfig::default());
    let rail = anchor(&mut world, Vec2::ZERO);
    let slider = world
        .add_body(
            BodyDef::dynamic(1.0, moment_for_circle(1.0, 0.0, 5.0, Vec2::ZERO))
                .with_position(Vec2::new(0.0, 50.0))
                .with_velocity(Vec2::new(30.0, 0.0), 0.0),
        )
        .unwrap();
    world
        .add_joint(JointDef::groove(
            rail,
            slider,
            Vec2::ZERO,
            Vec2::new(0.0, 100.0),
            Vec2::ZERO,
        ))
        .unwrap();

    for _ in 0..30 {
        world.step(1.0 / 30.0);
    }

    let position = world.body(slider).unwrap().position;
    assert!(position.x.abs() < 1.0, "slider left the groove: {position:?}");
    assert!(
        (95.0..=102.0).contains(&position.y),
        "slider should rest at the groove end: {position:?}"
    );
}

// ============================================================================
// Damped spring
// ============================================================================

#[test]
fn test_spring_settles_at_rest_length() {
    let mut world = running(WorldConfig::default().with_gravity(Vec2::ZERO));
    let pin = anchor(&mut world, Vec2::ZERO);
    let weight = point_mass(&mut world, 1.0, Vec2::new(0.0, 150.0));
    world
        .add_joint(JointDef::damped_spring(
            pin,
            weight,
            Vec2::ZERO,
            Vec2::ZERO,
            100.0,
            200.0,
            20.0,
        ))
        .unwrap();

    world.step(1.0 / 30.0);
    let early = world.body(weight).unwrap().position.y;
    assert!(early < 150.0, "spring should pull inward");

    for _ in 0..150 {
        world.step(1.0 / 30.0);
    }
    let length = world.body(weight).unwrap().position.length();
    assert!((length - 100.0).abs() < 2.0, "spring length {length}");
}

#[test]
fn test_spring_stiffness_capped_on_add() {
    let mut world = World::default();
    let pin = anchor(&mut world, Vec2::ZERO);
    let weight = point_mass(&mut world, 1.0, Vec2::new(0.0, 10.0));
    let spring = world
        .add_joint(JointDef::damped_spring(
            pin,
            weight,
            Vec2::ZERO,
            Vec2::ZERO,
            0.0,
            1.0e9,
            0.0,
        ))
        .unwrap();

    match world.joint(spring).unwrap().kind() {
        JointKind::DampedSpring { stiffness, .. } => assert_eq!(*stiffness, MAX_SPRING_STIFFNESS),
        other => panic!("unexpected joint {other:?}"),
    }
}

// ============================================================================
// Motor
// ============================================================================

#[test]
fn test_motor_drives_relative_spin() {
    let mut world = running(WorldConfig::default().with_gravity(Vec2::ZERO));
    let hub = anchor(&mut world, Vec2::ZERO);
    let wheel = point_mass(&mut world, 3.0, Vec2::ZERO);
    world
        .add_joint(JointDef::pivot(hub, wheel, Vec2::ZERO, Vec2::ZERO))
        .unwrap();
    let motor = world
        .add_joint(JointDef::motor(hub, wheel, 5.0, 1.0e6))
        .unwrap();

    world.step(1.0 / 30.0);
    assert_relative_eq!(
        world.body(wheel).unwrap().angular_velocity,
        5.0,
        epsilon = 1e-3
    );

    world.set_motor_rate(motor, -2.0).unwrap();
    world.step(1.0 / 30.0);
    assert_relative_eq!(
        world.body(wheel).unwrap().angular_velocity,
        -2.0,
        epsilon = 1e-3
    );
}

// ============================================================================
// Stress and breakage
// ============================================================================

#[test]
fn test_stress_is_observable_after_solve() {
    let mut world = running(WorldConfig::default());
    let pin = anchor(&mut world, Vec2::ZERO);
    let bob = point_mass(&mut world, 1.0, Vec2::new(0.0, 50.0));
    let joint = world
        .add_joint(
            JointDef::pivot(pin, bob, Vec2::ZERO, Vec2::new(0.0, -50.0))
                .with_breaking_threshold(100.0),
        )
        .unwrap();

    assert_eq!(world.joint(joint).unwrap().accumulated_impulse(), None);
    assert_eq!(world.stress_ratio(joint), Some(0.0));

    world.step(1.0 / 30.0);

    let impulse = world.joint(joint).unwrap().accumulated_impulse().unwrap();
    let ratio = world.stress_ratio(joint).unwrap();
    assert!(impulse > 0.0);
    assert!(ratio > 0.0 && ratio < 1.0, "ratio {ratio}");
    assert_relative_eq!(ratio, impulse / 100.0, epsilon = 1e-6);
}

#[test]
fn test_overloaded_beam_loses_both_pivots() {
    let mut world = running(WorldConfig::default());
    let left = anchor(&mut world, Vec2::new(200.0, 300.0));
    let right = anchor(&mut world, Vec2::new(280.0, 300.0));
    let beam = world
        .add_body(
            BodyDef::dynamic(5.0, moment_for_box(5.0, 80.0, 6.0))
                .with_position(Vec2::new(240.0, 300.0)),
        )
        .unwrap();
    let pivot_left = world
        .add_joint(
            JointDef::pivot(left, beam, Vec2::ZERO, Vec2::new(-40.0, 0.0))
                .with_error_bias(0.5)
                .with_breaking_threshold(3500.0),
        )
        .unwrap();
    let pivot_right = world
        .add_joint(
            JointDef::pivot(right, beam, Vec2::ZERO, Vec2::new(40.0, 0.0))
                .with_error_bias(0.5)
                .with_breaking_threshold(3500.0),
        )
        .unwrap();
    let load = point_mass(&mut world, 2000.0, Vec2::new(240.0, 300.0));
    let hook = world
        .add_joint(JointDef::pivot(beam, load, Vec2::ZERO, Vec2::ZERO))
        .unwrap();
    assert_eq!(world.joint_count(), 3);

    let mut broken = Vec::new();
    for _ in 0..60 {
        broken.extend(world.step(1.0 / 30.0).broken_joints);
    }

    assert_eq!(world.joint_count(), 1, "exactly the two beam pivots break");
    assert_eq!(broken.len(), 2);
    assert!(broken.contains(&pivot_left));
    assert!(broken.contains(&pivot_right));
    assert!(world.contains_joint(hook));
    assert!(world.contains_body(beam), "the beam itself stays in the world");
    assert!(world.joint(pivot_left).is_none());
    assert!(world.check_finite().is_ok());
}

#[test]
fn test_clearing_threshold_makes_joint_unbreakable() {
    let mut world = running(WorldConfig::default());
    let pin = anchor(&mut world, Vec2::ZERO);
    let bob = point_mass(&mut world, 1.0, Vec2::new(0.0, 50.0));
    let joint = world
        .add_joint(
            JointDef::pivot(pin, bob, Vec2::ZERO, Vec2::new(0.0, -50.0))
                .with_breaking_threshold(1.0e-3),
        )
        .unwrap();

    world
        .joint_mut(joint)
        .unwrap()
        .set_breaking_threshold(None);
    for _ in 0..10 {
        assert!(world.step(1.0 / 30.0).broken_joints.is_empty());
    }
    assert_eq!(world.stress_ratio(joint), Some(0.0));

    world
        .joint_mut(joint)
        .unwrap()
        .set_breaking_threshold(Some(1.0e-3));
    let report = world.step(1.0 / 30.0);
    assert_eq!(report.broken_joints, vec![joint]);
    assert!(!world.contains_joint(joint));
}

#[test]
fn test_unbreakable_joint_survives_any_load() {
    let mut world = running(WorldConfig::default());
    let pin = anchor(&mut world, Vec2::ZERO);
    let heavy = point_mass(&mut world, 10_000.0, Vec2::new(0.0, 50.0));
    world
        .add_joint(JointDef::pivot(pin, heavy, Vec2::ZERO, Vec2::new(0.0, -50.0)))
        .unwrap();

    for _ in 0..30 {
        assert!(world.step(1.0 / 30.0).broken_joints.is_empty());
    }
    assert_eq!(world.joint_count(), 1);
}
