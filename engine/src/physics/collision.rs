//! Collision detection module
//!
//! Narrow-phase contact generation for circles and convex polygons, plus a
//! filter-agnostic nearest-shape point query for editor picking.
//!
//! # Pair handling
//!
//! Every shape pair is visited once (O(n²); the sandbox holds tens to low
//! hundreds of shapes). A pair is skipped when both shapes belong to the
//! same body, when both bodies are static, when the category/mask filters
//! do not accept each other, or when their bounds do not overlap.
//!
//! # Polygon vs polygon
//!
//! Separating-axis test over the edge normals of both polygons. The
//! polygon owning the axis of least penetration becomes the reference; the
//! most anti-parallel edge of the other polygon is clipped against the
//! reference edge's side planes, giving at most two contact points.
//!
//! # Example
//!
//! ```ignore
//! use bridge_sandbox_engine::physics::collision::detect_contacts;
//!
//! let contacts = detect_contacts(world.body_arena(), world.shape_arena());
//! for c in &contacts {
//!     println!("{} touches {} at {:?}", c.shape_a, c.shape_b, c.point);
//! }
//! ```

use super::body::Body;
use super::handle::{Arena, BodyHandle, ShapeHandle};
use super::shape::{Shape, WorldGeometry};
use super::types::{self, Vec2};

/// A single contact point between two shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub shape_a: ShapeHandle,
    pub shape_b: ShapeHandle,
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    /// World-space contact point.
    pub point: Vec2,
    /// Unit normal pointing from shape A toward shape B.
    pub normal: Vec2,
    /// Overlap depth along the normal (positive when penetrating).
    pub penetration_depth: f32,
    /// Combined friction coefficient (product of both shapes' friction).
    pub friction: f32,
}

/// Result of a nearest-shape point query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointQuery {
    pub shape: ShapeHandle,
    /// Closest point on the shape surface.
    pub point: Vec2,
    /// Signed distance from the query point (negative when inside).
    pub distance: f32,
}

/// Contact points shared by one shape pair, with a common normal (A→B).
#[derive(Debug, Clone, PartialEq)]
struct Manifold {
    normal: Vec2,
    points: Vec<(Vec2, f32)>,
}

impl Manifold {
    fn single(normal: Vec2, point: Vec2, depth: f32) -> Self {
        Self {
            normal,
            points: vec![(point, depth)],
        }
    }

    fn flipped(mut self) -> Self {
        self.normal = -self.normal;
        self
    }
}

struct Prepared<'a> {
    handle: ShapeHandle,
    shape: &'a Shape,
    body: &'a Body,
    geometry: WorldGeometry,
    min: Vec2,
    max: Vec2,
}

fn prepare<'a>(bodies: &'a Arena<Body>, shapes: &'a Arena<Shape>) -> Vec<Prepared<'a>> {
    shapes
        .iter()
        .filter_map(|(index, shape)| {
            let body = bodies.get(shape.body().index())?;
            let geometry = shape.world_geometry(body);
            let (min, max) = geometry.bounds();
            Some(Prepared {
                handle: ShapeHandle::from_raw(index as u32),
                shape,
                body,
                geometry,
                min,
                max,
            })
        })
        .collect()
}

/// Generate contacts for every colliding shape pair.
///
/// Output order is deterministic: pairs in shape insertion order, points in
/// clip order.
pub fn detect_contacts(bodies: &Arena<Body>, shapes: &Arena<Shape>) -> Vec<Contact> {
    let prepared = prepare(bodies, shapes);
    let mut contacts = Vec::new();

    for (i, a) in prepared.iter().enumerate() {
        for b in &prepared[i + 1..] {
            if a.shape.body() == b.shape.body() {
                continue;
            }
            if a.body.is_static() && b.body.is_static() {
                continue;
            }
            if !a.shape.filter.allows(&b.shape.filter) {
                continue;
            }
            if a.max.x < b.min.x || b.max.x < a.min.x || a.max.y < b.min.y || b.max.y < a.min.y {
                continue;
            }
            let Some(manifold) = collide(&a.geometry, &b.geometry) else {
                continue;
            };
            let friction = a.shape.friction * b.shape.friction;
            contacts.extend(manifold.points.iter().map(|&(point, depth)| Contact {
                shape_a: a.handle,
                shape_b: b.handle,
                body_a: a.shape.body(),
                body_b: b.shape.body(),
                point,
                normal: manifold.normal,
                penetration_depth: depth,
                friction,
            }));
        }
    }

    contacts
}

/// Closest shape to `point` whose signed distance is below `max_distance`.
///
/// Ignores collision filters. Ties keep the earlier-inserted shape.
pub fn nearest_shape(
    bodies: &Arena<Body>,
    shapes: &Arena<Shape>,
    point: Vec2,
    max_distance: f32,
) -> Option<PointQuery> {
    let mut best: Option<PointQuery> = None;
    for (index, shape) in shapes.iter() {
        let Some(body) = bodies.get(shape.body().index()) else {
            continue;
        };
        let (distance, closest) = shape.world_geometry(body).distance_to(point);
        if distance >= max_distance {
            continue;
        }
        if best.is_none_or(|b| distance < b.distance) {
            best = Some(PointQuery {
                shape: ShapeHandle::from_raw(index as u32),
                point: closest,
                distance,
            });
        }
    }
    best
}

fn collide(a: &WorldGeometry, b: &WorldGeometry) -> Option<Manifold> {
    match (a, b) {
        (
            WorldGeometry::Circle {
                center: ca,
                radius: ra,
            },
            WorldGeometry::Circle {
                center: cb,
                radius: rb,
            },
        ) => circle_vs_circle(*ca, *ra, *cb, *rb),
        (
            WorldGeometry::Polygon { vertices, normals },
            WorldGeometry::Circle { center, radius },
        ) => polygon_vs_circle(vertices, normals, *center, *radius),
        (
            WorldGeometry::Circle { center, radius },
            WorldGeometry::Polygon { vertices, normals },
        ) => polygon_vs_circle(vertices, normals, *center, *radius).map(Manifold::flipped),
        (
            WorldGeometry::Polygon {
                vertices: va,
                normals: na,
            },
            WorldGeometry::Polygon {
                vertices: vb,
                normals: nb,
            },
        ) => polygon_vs_polygon(va, na, vb, nb),
    }
}

/// Circle vs circle: distance between centers against the radius sum.
fn circle_vs_circle(ca: Vec2, ra: f32, cb: Vec2, rb: f32) -> Option<Manifold> {
    let delta = cb - ca;
    let sum = ra + rb;
    let dist_sq = delta.length_squared();
    if dist_sq >= sum * sum {
        return None;
    }
    let dist = dist_sq.sqrt();
    // Coincident centers: pick a fixed axis so the result is deterministic.
    let normal = if dist > types::EPSILON { delta / dist } else { Vec2::Y };
    let depth = sum - dist;
    let point = ca + normal * (ra - depth * 0.5);
    Some(Manifold::single(normal, point, depth))
}

/// Convex polygon vs circle. Normal points from the polygon to the circle.
fn polygon_vs_circle(
    vertices: &[Vec2],
    normals: &[Vec2],
    center: Vec2,
    radius: f32,
) -> Option<Manifold> {
    let n = vertices.len();

    // Edge with the greatest separation from the circle center.
    let mut best_separation = f32::NEG_INFINITY;
    let mut best = 0;
    for i in 0..n {
        let s = normals[i].dot(center - vertices[i]);
        if s > radius {
            return None;
        }
        if s > best_separation {
            best_separation = s;
            best = i;
        }
    }

    let a = vertices[best];
    let b = vertices[(best + 1) % n];

    // Center inside the polygon: push out along the nearest edge.
    if best_separation < types::EPSILON {
        let normal = normals[best];
        let depth = radius - best_separation;
        return Some(Manifold::single(normal, center - normal * best_separation, depth));
    }

    // Voronoi regions of the closest edge.
    let edge = b - a;
    let t = (center - a).dot(edge) / edge.length_squared().max(types::EPSILON);
    let corner = if t < 0.0 {
        Some(a)
    } else if t > 1.0 {
        Some(b)
    } else {
        None
    };

    match corner {
        Some(v) => {
            let delta = center - v;
            let dist = delta.length();
            if dist >= radius || dist < types::EPSILON {
                return None;
            }
            Some(Manifold::single(delta / dist, v, radius - dist))
        }
        None => {
            let normal = normals[best];
            let point = center - normal * best_separation;
            Some(Manifold::single(normal, point, radius - best_separation))
        }
    }
}

/// Edge of `a` with the largest separation from `b`: `(edge index, separation)`.
fn max_separation(a: &[Vec2], normals: &[Vec2], b: &[Vec2]) -> (usize, f32) {
    let mut best = (0, f32::NEG_INFINITY);
    for (i, (v, n)) in a.iter().zip(normals).enumerate() {
        let s = b
            .iter()
            .map(|p| n.dot(*p - *v))
            .fold(f32::INFINITY, f32::min);
        if s > best.1 {
            best = (i, s);
        }
    }
    best
}

/// Keep the part of segment `points` on the negative side of the line
/// `normal · p = offset`.
fn clip_segment(points: [Vec2; 2], normal: Vec2, offset: f32) -> Option<[Vec2; 2]> {
    let d0 = normal.dot(points[0]) - offset;
    let d1 = normal.dot(points[1]) - offset;
    match (d0 <= 0.0, d1 <= 0.0) {
        (true, true) => Some(points),
        (false, false) => None,
        _ => {
            let t = d0 / (d0 - d1);
            let cut = points[0] + (points[1] - points[0]) * t;
            if d0 <= 0.0 {
                Some([points[0], cut])
            } else {
                Some([cut, points[1]])
            }
        }
    }
}

fn polygon_vs_polygon(
    va: &[Vec2],
    na: &[Vec2],
    vb: &[Vec2],
    nb: &[Vec2],
) -> Option<Manifold> {
    let (edge_a, sep_a) = max_separation(va, na, vb);
    if sep_a > 0.0 {
        return None;
    }
    let (edge_b, sep_b) = max_separation(vb, nb, va);
    if sep_b > 0.0 {
        return None;
    }

    // Prefer A as reference unless B is clearly better, to avoid flip-flopping.
    let flip = sep_b > sep_a + 1e-3;
    let (ref_v, ref_n, inc_v, inc_n, ref_edge) = if flip {
        (vb, nb, va, na, edge_b)
    } else {
        (va, na, vb, nb, edge_a)
    };

    let normal = ref_n[ref_edge];
    let v1 = ref_v[ref_edge];
    let v2 = ref_v[(ref_edge + 1) % ref_v.len()];

    let incident = (0..inc_v.len())
        .min_by(|&i, &j| normal.dot(inc_n[i]).total_cmp(&normal.dot(inc_n[j])))
        .unwrap_or(0);
    let w1 = inc_v[incident];
    let w2 = inc_v[(incident + 1) % inc_v.len()];

    let tangent = (v2 - v1).normalize_or_zero();
    let clipped = clip_segment([w1, w2], -tangent, -tangent.dot(v1))
        .and_then(|seg| clip_segment(seg, tangent, tangent.dot(v2)))?;

    let points: Vec<(Vec2, f32)> = clipped
        .iter()
        .filter_map(|p| {
            let separation = normal.dot(*p - v1);
            (separation <= 0.0).then(|| (*p - normal * (separation * 0.5), -separation))
        })
        .collect();
    if points.is_empty() {
        return None;
    }

    let manifold = Manifold { normal, points };
    Some(if flip { manifold.flipped() } else { manifold })
}
