//! Test Vehicle
//!
//! A two-wheeled car used to load the bridge. The chassis is a flat
//! hexagon; each wheel hangs from it on a vertical groove with a damped
//! spring for suspension and a motor for drive. Everything the car creates
//! is tracked so it can be removed as a unit.

use glam::Vec2;

use super::config::category;
use crate::physics::{
    BodyDef, BodyHandle, Geometry, JointDef, JointHandle, MAX_SPRING_STIFFNESS, Result,
    ShapeDef, ShapeHandle, World, moment_for_circle, moment_for_polygon,
};

/// Chassis outline in local coordinates (y down).
pub const CHASSIS_VERTICES: [Vec2; 6] = [
    Vec2::new(-35.0, -10.0),
    Vec2::new(35.0, -10.0),
    Vec2::new(50.0, 5.0),
    Vec2::new(25.0, 12.0),
    Vec2::new(-25.0, 12.0),
    Vec2::new(-45.0, 5.0),
];

pub const WHEEL_MASS: f32 = 3.0;
pub const WHEEL_RADIUS: f32 = 18.0;
pub const WHEEL_FRICTION: f32 = 6.0;
/// Wheel offset from the chassis center at spawn.
pub const WHEEL_OFFSET: Vec2 = Vec2::new(42.0, 22.0);
/// Suspension travel along the groove, in chassis coordinates.
pub const GROOVE_TOP: f32 = 8.0;
pub const GROOVE_BOTTOM: f32 = 40.0;
pub const SPRING_STIFFNESS_PER_MASS: f32 = 120.0;
pub const SPRING_DAMPING: f32 = 10.0;
pub const GROOVE_ERROR_BIAS: f32 = 0.1;
pub const FRONT_MOTOR_MAX_FORCE: f32 = 2.0e6;
/// Half the front motor so the nose does not lift.
pub const REAR_MOTOR_MAX_FORCE: f32 = 1.0e6;

const CHASSIS_COLOR: [u8; 4] = [100, 200, 100, 255];
const WHEEL_COLOR: [u8; 4] = [40, 40, 40, 255];

/// One wheel with its suspension and drive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Wheel {
    pub body: BodyHandle,
    pub shape: ShapeHandle,
    pub motor: JointHandle,
    pub spring: JointHandle,
    pub groove: JointHandle,
}

/// A spawned car.
#[derive(Clone, Debug, PartialEq)]
pub struct Car {
    pub chassis: BodyHandle,
    pub chassis_shape: ShapeHandle,
    pub front: Wheel,
    pub rear: Wheel,
}

impl Car {
    /// Build a car with its chassis centered at `position`.
    ///
    /// Chassis mass is raised to at least 1. Suspension stiffness scales
    /// with mass up to the spring cap.
    pub fn spawn(world: &mut World, position: Vec2, mass: f32) -> Result<Self> {
        let mass = mass.max(1.0);
        let chassis = world.add_body(
            BodyDef::dynamic(mass, moment_for_polygon(mass, &CHASSIS_VERTICES))
                .with_position(position),
        )?;
        let chassis_shape = world.add_shape(
            chassis,
            ShapeDef::new(Geometry::polygon(CHASSIS_VERTICES))
                .with_filter(category::CAR, category::GROUND | category::ROAD)
                .with_friction(0.0)
                .with_color(CHASSIS_COLOR),
        )?;

        let stiffness = (mass * SPRING_STIFFNESS_PER_MASS).min(MAX_SPRING_STIFFNESS);
        let front =
            Self::attach_wheel(world, chassis, position, 1.0, stiffness, FRONT_MOTOR_MAX_FORCE)?;
        let rear =
            Self::attach_wheel(world, chassis, position, -1.0, stiffness, REAR_MOTOR_MAX_FORCE)?;

        tracing::info!(mass, x = position.x, y = position.y, "car spawned");
        Ok(Self {
            chassis,
            chassis_shape,
            front,
            rear,
        })
    }

    fn attach_wheel(
        world: &mut World,
        chassis: BodyHandle,
        position: Vec2,
        side: f32,
        stiffness: f32,
        max_force: f32,
    ) -> Result<Wheel> {
        let body = world.add_body(
            BodyDef::dynamic(
                WHEEL_MASS,
                moment_for_circle(WHEEL_MASS, 0.0, WHEEL_RADIUS, Vec2::ZERO),
            )
            .with_position(position + Vec2::new(WHEEL_OFFSET.x * side, WHEEL_OFFSET.y)),
        )?;
        let shape = world.add_shape(
            body,
            ShapeDef::new(Geometry::circle(WHEEL_RADIUS))
                .with_filter(category::CAR, category::GROUND | category::ROAD)
                .with_friction(WHEEL_FRICTION)
                .with_color(WHEEL_COLOR),
        )?;
        let motor = world.add_joint(JointDef::motor(chassis, body, 0.0, max_force))?;

        let x = WHEEL_OFFSET.x * side;
        let spring = world.add_joint(JointDef::damped_spring(
            chassis,
            body,
            Vec2::new(x, GROOVE_TOP),
            Vec2::ZERO,
            0.0,
            stiffness,
            SPRING_DAMPING,
        ))?;
        let groove = world.add_joint(
            JointDef::groove(
                chassis,
                body,
                Vec2::new(x, GROOVE_TOP),
                Vec2::new(x, GROOVE_BOTTOM),
                Vec2::ZERO,
            )
            .with_error_bias(GROOVE_ERROR_BIAS),
        )?;

        Ok(Wheel {
            body,
            shape,
            motor,
            spring,
            groove,
        })
    }

    /// Spin both wheels forward (toward +x) at `speed` rad/s relative to the
    /// chassis. Negative speeds reverse.
    pub fn drive(&self, world: &mut World, speed: f32) -> Result<()> {
        world.set_motor_rate(self.front.motor, speed)?;
        world.set_motor_rate(self.rear.motor, speed)?;
        Ok(())
    }

    pub fn bodies(&self) -> [BodyHandle; 3] {
        [self.chassis, self.front.body, self.rear.body]
    }

    pub fn position(&self, world: &World) -> Option<Vec2> {
        world.body(self.chassis).map(|b| b.position)
    }

    /// Remove every body, shape and joint the car created. Parts already
    /// gone are skipped.
    pub fn destroy(self, world: &mut World) {
        for body in self.bodies() {
            if world.remove_body(body).is_err() {
                tracing::debug!(%body, "car body already removed");
            }
        }
        tracing::info!("car destroyed");
    }
}
