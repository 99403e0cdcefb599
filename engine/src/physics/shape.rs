//! Collision shapes and filtering.
//!
//! A [`Shape`] is geometry attached to exactly one body. Geometry is stored
//! in the body's local frame and transformed to world space on demand with
//! [`Shape::world_geometry`].

use serde::{Deserialize, Serialize};

use super::body::{Body, polygon_area};
use super::error::{PhysicsError, Result};
use super::handle::BodyHandle;
use super::types::{self, Vec2};

/// Category/mask bit filter.
///
/// Two shapes collide only if each one's mask contains the other's
/// category: `(a.mask & b.category) != 0 && (b.mask & a.category) != 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionFilter {
    pub category: u32,
    pub mask: u32,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self::ALL
    }
}

impl CollisionFilter {
    /// Belongs to every category, collides with everything.
    pub const ALL: Self = Self {
        category: u32::MAX,
        mask: u32::MAX,
    };

    pub const fn new(category: u32, mask: u32) -> Self {
        Self { category, mask }
    }

    /// Symmetric test: both masks must accept the other category.
    pub fn allows(&self, other: &CollisionFilter) -> bool {
        (self.mask & other.category) != 0 && (other.mask & self.category) != 0
    }
}

/// Local-space shape geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    /// Solid circle centered at `offset` from the body origin.
    Circle { radius: f32, offset: Vec2 },
    /// Convex polygon, vertices wound +x→+y (positive signed area).
    Polygon { vertices: Vec<Vec2> },
}

impl Geometry {
    pub fn circle(radius: f32) -> Self {
        Geometry::Circle {
            radius,
            offset: Vec2::ZERO,
        }
    }

    /// Axis-aligned `width` x `height` box centered on the body origin.
    pub fn boxed(width: f32, height: f32) -> Self {
        let (hw, hh) = (width * 0.5, height * 0.5);
        Geometry::Polygon {
            vertices: vec![
                Vec2::new(-hw, -hh),
                Vec2::new(hw, -hh),
                Vec2::new(hw, hh),
                Vec2::new(-hw, hh),
            ],
        }
    }

    pub fn polygon(vertices: impl Into<Vec<Vec2>>) -> Self {
        Geometry::Polygon {
            vertices: vertices.into(),
        }
    }

    /// Check the geometry and put polygons into canonical winding.
    fn validated(self) -> Result<Self> {
        match self {
            Geometry::Circle { radius, offset } => {
                if !radius.is_finite() || radius <= 0.0 || !types::is_finite(offset) {
                    return Err(PhysicsError::invalid_body(format!(
                        "circle radius must be positive and finite, got {radius}"
                    )));
                }
                Ok(Geometry::Circle { radius, offset })
            }
            Geometry::Polygon { mut vertices } => {
                if vertices.len() < 3 {
                    return Err(PhysicsError::invalid_body(format!(
                        "polygon needs at least 3 vertices, got {}",
                        vertices.len()
                    )));
                }
                if vertices.iter().any(|v| !types::is_finite(*v)) {
                    return Err(PhysicsError::invalid_body("polygon has non-finite vertex"));
                }
                let area = polygon_area(&vertices);
                if area.abs() < types::EPSILON {
                    return Err(PhysicsError::invalid_body("polygon has zero area"));
                }
                if area < 0.0 {
                    vertices.reverse();
                }
                let n = vertices.len();
                let convex = (0..n).all(|i| {
                    let a = vertices[i];
                    let b = vertices[(i + 1) % n];
                    let c = vertices[(i + 2) % n];
                    types::cross(b - a, c - b) >= -types::EPSILON
                });
                if !convex {
                    return Err(PhysicsError::invalid_body("polygon is not convex"));
                }
                Ok(Geometry::Polygon { vertices })
            }
        }
    }
}

/// RGBA color, 0-255 per channel.
pub type Rgba = [u8; 4];

/// Description of a shape to attach with [`World::add_shape`](super::World::add_shape).
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeDef {
    pub geometry: Geometry,
    pub filter: CollisionFilter,
    pub friction: f32,
    /// Opaque value for the caller (material kind, role, ...).
    pub tag: u32,
    /// Base color, used by renderers for stress feedback.
    pub color: Rgba,
}

impl ShapeDef {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            filter: CollisionFilter::ALL,
            friction: 0.0,
            tag: 0,
            color: [0, 0, 0, 255],
        }
    }

    pub fn with_filter(mut self, category: u32, mask: u32) -> Self {
        self.filter = CollisionFilter::new(category, mask);
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_tag(mut self, tag: u32) -> Self {
        self.tag = tag;
        self
    }

    pub fn with_color(mut self, color: Rgba) -> Self {
        self.color = color;
        self
    }
}

/// Shape geometry transformed into world space.
#[derive(Debug, Clone, PartialEq)]
pub enum WorldGeometry {
    Circle {
        center: Vec2,
        radius: f32,
    },
    Polygon {
        vertices: Vec<Vec2>,
        /// Outward unit normal of edge `i` (from vertex `i` to `i + 1`).
        normals: Vec<Vec2>,
    },
}

impl WorldGeometry {
    /// Axis-aligned bounds `(min, max)`.
    pub fn bounds(&self) -> (Vec2, Vec2) {
        match self {
            WorldGeometry::Circle { center, radius } => {
                (*center - Vec2::splat(*radius), *center + Vec2::splat(*radius))
            }
            WorldGeometry::Polygon { vertices, .. } => vertices.iter().fold(
                (Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY)),
                |(min, max), v| (min.min(*v), max.max(*v)),
            ),
        }
    }

    /// Signed distance from `point` to the surface (negative inside) and
    /// the closest surface point.
    pub fn distance_to(&self, point: Vec2) -> (f32, Vec2) {
        match self {
            WorldGeometry::Circle { center, radius } => {
                let delta = point - *center;
                let dist = delta.length();
                let dir = if dist > types::EPSILON { delta / dist } else { Vec2::Y };
                (dist - radius, *center + dir * *radius)
            }
            WorldGeometry::Polygon { vertices, normals } => {
                let n = vertices.len();
                let mut max_separation = f32::NEG_INFINITY;
                let mut closest = vertices[0];
                let mut closest_dist = f32::INFINITY;
                for i in 0..n {
                    let a = vertices[i];
                    let b = vertices[(i + 1) % n];
                    max_separation = max_separation.max(normals[i].dot(point - a));
                    let candidate = types::closest_point_on_segment(a, b, point);
                    let d = candidate.distance(point);
                    if d < closest_dist {
                        closest_dist = d;
                        closest = candidate;
                    }
                }
                if max_separation <= 0.0 {
                    (-closest_dist, closest)
                } else {
                    (closest_dist, closest)
                }
            }
        }
    }
}

/// A collision shape owned by a world and attached to one body.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    body: BodyHandle,
    geometry: Geometry,
    pub filter: CollisionFilter,
    pub friction: f32,
    pub tag: u32,
    pub color: Rgba,
}

impl Shape {
    pub(crate) fn from_def(body: BodyHandle, def: ShapeDef) -> Result<Self> {
        if !def.friction.is_finite() || def.friction < 0.0 {
            return Err(PhysicsError::invalid_body(format!(
                "friction must be non-negative, got {}",
                def.friction
            )));
        }
        Ok(Self {
            body,
            geometry: def.geometry.validated()?,
            filter: def.filter,
            friction: def.friction,
            tag: def.tag,
            color: def.color,
        })
    }

    /// Owning body.
    pub fn body(&self) -> BodyHandle {
        self.body
    }

    /// Local-space geometry.
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Geometry in world space for the given owning body.
    pub fn world_geometry(&self, body: &Body) -> WorldGeometry {
        match &self.geometry {
            Geometry::Circle { radius, offset } => WorldGeometry::Circle {
                center: body.local_to_world(*offset),
                radius: *radius,
            },
            Geometry::Polygon { vertices } => {
                let world: Vec<Vec2> = vertices.iter().map(|v| body.local_to_world(*v)).collect();
                let n = world.len();
                let normals = (0..n)
                    .map(|i| {
                        let edge = world[(i + 1) % n] - world[i];
                        Vec2::new(edge.y, -edge.x).normalize_or_zero()
                    })
                    .collect();
                WorldGeometry::Polygon {
                    vertices: world,
                    normals,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::body::BodyDef;

    const ROAD: u32 = 2;
    const CAR: u32 = 4;
    const GROUND: u32 = 1;

    #[test]
    fn test_filter_is_symmetric_and() {
        let road = CollisionFilter::new(ROAD, CAR | GROUND);
        let car = CollisionFilter::new(CAR, GROUND | ROAD);
        let ground = CollisionFilter::new(GROUND, CAR | ROAD);
        assert!(road.allows(&car));
        assert!(car.allows(&road));
        assert!(road.allows(&ground));
        // Road never sees road.
        assert!(!road.allows(&road));
        // One-sided acceptance is not enough.
        let picky = CollisionFilter::new(CAR, 0);
        assert!(!road.allows(&picky));
        assert!(!picky.allows(&road));
    }

    #[test]
    fn test_clockwise_polygon_is_rewound() {
        let def = ShapeDef::new(Geometry::polygon(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
        ]));
        let shape = Shape::from_def(BodyHandle::from_raw(0), def).unwrap();
        let Geometry::Polygon { vertices } = shape.geometry() else {
            panic!("expected polygon");
        };
        assert!(polygon_area(vertices) > 0.0);
    }

    #[test]
    fn test_concave_polygon_rejected() {
        let def = ShapeDef::new(Geometry::polygon(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(4.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(0.0, 4.0),
        ]));
        assert!(Shape::from_def(BodyHandle::from_raw(0), def).is_err());
    }

    #[test]
    fn test_bad_circle_rejected() {
        let def = ShapeDef::new(Geometry::circle(0.0));
        assert!(matches!(
            Shape::from_def(BodyHandle::from_raw(0), def),
            Err(PhysicsError::InvalidBody { .. })
        ));
    }

    #[test]
    fn test_box_normals_point_outward() {
        let body = Body::from_def(&BodyDef::fixed()).unwrap();
        let def = ShapeDef::new(Geometry::boxed(2.0, 2.0));
        let shape = Shape::from_def(BodyHandle::from_raw(0), def).unwrap();
        let WorldGeometry::Polygon { vertices, normals } = shape.world_geometry(&body) else {
            panic!("expected polygon");
        };
        for (v, n) in vertices.iter().zip(&normals) {
            // Outward normals point away from the origin-centered box.
            assert!(n.dot(*v) > 0.0);
        }
    }

    #[test]
    fn test_distance_to_polygon() {
        let body = Body::from_def(&BodyDef::fixed()).unwrap();
        let def = ShapeDef::new(Geometry::boxed(10.0, 10.0));
        let shape = Shape::from_def(BodyHandle::from_raw(0), def).unwrap();
        let world = shape.world_geometry(&body);
        let (outside, _) = world.distance_to(Vec2::new(8.0, 0.0));
        assert!((outside - 3.0).abs() < 1e-5);
        let (inside, _) = world.distance_to(Vec2::new(4.0, 0.0));
        assert!((inside + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_distance_to_circle() {
        let world = WorldGeometry::Circle {
            center: Vec2::ZERO,
            radius: 5.0,
        };
        let (d, p) = world.distance_to(Vec2::new(0.0, 9.0));
        assert!((d - 4.0).abs() < 1e-6);
        assert!((p - Vec2::new(0.0, 5.0)).length() < 1e-6);
    }
}
