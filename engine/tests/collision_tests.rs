//! Collision Tests - Filters, Contacts and Point Queries
//!
//! Tests for contact generation through the World: category/mask
//! filtering, pair skipping rules, resting contact and nearest-shape
//! queries used for editor picking.

use bridge_sandbox_engine::game::category;
use bridge_sandbox_engine::physics::{
    BodyDef, BodyHandle, Geometry, ShapeDef, ShapeHandle, SimulationMode, Vec2, World,
    WorldConfig, moment_for_box, moment_for_circle,
};

fn zero_gravity() -> World {
    let mut world = World::new(WorldConfig::default().with_gravity(Vec2::ZERO));
    world.set_mode(SimulationMode::Running);
    world
}

fn dynamic_box(world: &mut World, position: Vec2, filter: (u32, u32)) -> (BodyHandle, ShapeHandle) {
    let body = world
        .add_body(
            BodyDef::dynamic(1.0, moment_for_box(1.0, 20.0, 20.0)).with_position(position),
        )
        .unwrap();
    let shape = world
        .add_shape(
            body,
            ShapeDef::new(Geometry::boxed(20.0, 20.0)).with_filter(filter.0, filter.1),
        )
        .unwrap();
    (body, shape)
}

// ============================================================================
// Filtering
// ============================================================================

#[test]
fn test_road_beams_do_not_collide_with_each_other() {
    let mut world = zero_gravity();
    let road = (category::ROAD, category::CAR | category::GROUND);
    dynamic_box(&mut world, Vec2::new(0.0, 0.0), road);
    dynamic_box(&mut world, Vec2::new(10.0, 0.0), road);

    world.step(1.0 / 30.0);

    assert!(world.contacts().is_empty());
}

#[test]
fn test_road_collides_with_car() {
    let mut world = zero_gravity();
    dynamic_box(
        &mut world,
        Vec2::new(0.0, 0.0),
        (category::ROAD, category::CAR | category::GROUND),
    );
    dynamic_box(
        &mut world,
        Vec2::new(10.0, 0.0),
        (category::CAR, category::GROUND | category::ROAD),
    );

    world.step(1.0 / 30.0);

    assert!(!world.contacts().is_empty());
}

#[test]
fn test_filter_must_accept_both_ways() {
    let mut world = zero_gravity();
    // Support wants the car, but the car does not list supports.
    dynamic_box(&mut world, Vec2::new(0.0, 0.0), (category::SUPPORT, category::CAR));
    dynamic_box(
        &mut world,
        Vec2::new(10.0, 0.0),
        (category::CAR, category::GROUND | category::ROAD),
    );

    world.step(1.0 / 30.0);

    assert!(world.contacts().is_empty());
}

#[test]
fn test_zero_mask_collides_with_nothing() {
    let mut world = zero_gravity();
    dynamic_box(&mut world, Vec2::new(0.0, 0.0), (category::NODE, 0));
    dynamic_box(&mut world, Vec2::new(5.0, 0.0), (u32::MAX, u32::MAX));

    world.step(1.0 / 30.0);

    assert!(world.contacts().is_empty());
}

// ============================================================================
// Pair rules
// ============================================================================

#[test]
fn test_shapes_on_same_body_ignored() {
    let mut world = zero_gravity();
    let body = world.add_body(BodyDef::dynamic(1.0, 1.0)).unwrap();
    world
        .add_shape(body, ShapeDef::new(Geometry::circle(10.0)))
        .unwrap();
    world
        .add_shape(body, ShapeDef::new(Geometry::boxed(10.0, 10.0)))
        .unwrap();

    world.step(1.0 / 30.0);

    assert!(world.contacts().is_empty());
}

#[test]
fn test_static_pairs_ignored() {
    let mut world = zero_gravity();
    for x in [0.0, 10.0] {
        let body = world
            .add_body(BodyDef::fixed().with_position(Vec2::new(x, 0.0)))
            .unwrap();
        world
            .add_shape(body, ShapeDef::new(Geometry::boxed(20.0, 20.0)))
            .unwrap();
    }

    world.step(1.0 / 30.0);

    assert!(world.contacts().is_empty());
}

#[test]
fn test_overlapping_circles_pushed_apart() {
    let mut world = zero_gravity();
    let mut bodies = Vec::new();
    for x in [0.0, 15.0] {
        let body = world
            .add_body(
                BodyDef::dynamic(1.0, moment_for_circle(1.0, 0.0, 10.0, Vec2::ZERO))
                    .with_position(Vec2::new(x, 0.0)),
            )
            .unwrap();
        world
            .add_shape(body, ShapeDef::new(Geometry::circle(10.0)))
            .unwrap();
        bodies.push(body);
    }

    for _ in 0..30 {
        world.step(1.0 / 30.0);
    }

    let a = world.body(bodies[0]).unwrap().position;
    let b = world.body(bodies[1]).unwrap().position;
    assert!(a.distance(b) > 19.0, "circles still overlap: {a:?} {b:?}");
    assert!(a.x < 0.0 && b.x > 15.0);
}

// ============================================================================
// Resting contact
// ============================================================================

#[test]
fn test_wheel_rests_on_ground() {
    let mut world = World::new(WorldConfig::default());
    world.set_mode(SimulationMode::Running);
    let ground = world
        .add_body(BodyDef::fixed().with_position(Vec2::new(600.0, 605.0)))
        .unwrap();
    world
        .add_shape(
            ground,
            ShapeDef::new(Geometry::boxed(1200.0, 10.0)).with_friction(1.0),
        )
        .unwrap();
    let wheel = world
        .add_body(
            BodyDef::dynamic(3.0, moment_for_circle(3.0, 0.0, 18.0, Vec2::ZERO))
                .with_position(Vec2::new(600.0, 500.0)),
        )
        .unwrap();
    world
        .add_shape(
            wheel,
            ShapeDef::new(Geometry::circle(18.0)).with_friction(6.0),
        )
        .unwrap();

    for _ in 0..60 {
        world.step(1.0 / 30.0);
    }

    let body = world.body(wheel).unwrap();
    assert!(
        (body.position.y - 582.0).abs() < 1.5,
        "wheel should sit on the ground, y = {}",
        body.position.y
    );
    assert!((body.position.x - 600.0).abs() < 0.5);
    let contact = world.contacts().first().expect("resting contact");
    assert!(contact.penetration_depth < 2.0);
    assert!((contact.friction - 6.0).abs() < 1e-6);
}

// ============================================================================
// Point queries
// ============================================================================

#[test]
fn test_nearest_shape_query() {
    let mut world = World::default();
    let (_, near) = dynamic_box(&mut world, Vec2::new(0.0, 0.0), (category::ROAD, 0));
    let (_, far) = dynamic_box(&mut world, Vec2::new(100.0, 0.0), (category::ROAD, 0));

    let hit = world
        .query_nearest_shape(Vec2::new(13.0, 0.0), 5.0)
        .expect("box edge is 3 units away");
    assert_eq!(hit.shape, near);
    assert!((hit.distance - 3.0).abs() < 1e-4);
    assert!((hit.point - Vec2::new(10.0, 0.0)).length() < 1e-4);

    let inside = world.query_nearest_shape(Vec2::new(100.0, 0.0), 5.0).unwrap();
    assert_eq!(inside.shape, far);
    assert!(inside.distance < 0.0);

    assert!(world.query_nearest_shape(Vec2::new(50.0, 0.0), 5.0).is_none());
}
