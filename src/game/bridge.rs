//! Bridge Editor
//!
//! The level model behind the bridge builder: terrain, nodes, beams and the
//! test car, together with the BUILD/SIMULATE mode switch.
//!
//! # Modes
//!
//! - **Build**: the world is paused with zero gravity. Nodes and beams can
//!   be placed and deleted.
//! - **Simulate**: gravity is on and every `tick` steps the world by one
//!   frame. Entering simulation snapshots the bridge; going back to build
//!   mode rebuilds the level from that snapshot, undoing all damage.
//!
//! # Beams
//!
//! A beam is a thin box body spanning two nodes, held to each node by a
//! pivot joint. The pivots break when their impulse exceeds the beam
//! material's strength, which is how a bridge fails.
//!
//! # Example
//!
//! ```ignore
//! let mut bridge = BridgeBuilder::new(SandboxConfig::default())?;
//! let start = bridge.nearest_node(Vec2::new(200.0, 405.0)).unwrap();
//! bridge.place_beam_to(start, Vec2::new(280.0, 405.0), BeamMaterial::Road)?;
//!
//! bridge.spawn_car()?;
//! bridge.drive(25.0)?;
//! for _ in 0..300 {
//!     bridge.tick();
//! }
//! ```

use glam::Vec2;

use super::car::Car;
use super::config::{SandboxConfig, category};
use super::materials::BeamMaterial;
use super::snapshot::{BeamRecord, BridgeSnapshot, NodeRecord};
use crate::physics::{
    BodyDef, BodyHandle, Geometry, JointDef, JointHandle, PhysicsError, Result, Rgba, ShapeDef,
    ShapeHandle, SimulationMode, StepReport, World, moment_for_box, moment_for_circle,
    stress_color,
};

const TERRAIN_COLOR: Rgba = [50, 50, 50, 255];
/// Nodes are drawn by the editor itself, not as shapes.
const NODE_COLOR: Rgba = [0, 0, 0, 0];
/// Tolerance for recognizing the two protected bank anchors.
const BASE_ANCHOR_TOLERANCE: Vec2 = Vec2::new(5.0, 1.0);

/// Editor mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum EditorMode {
    #[default]
    Build,
    Simulate,
}

/// A joint point of the bridge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Node {
    pub body: BodyHandle,
    pub shape: ShapeHandle,
    pub is_static: bool,
}

/// A beam spanning two nodes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Beam {
    pub body: BodyHandle,
    pub shape: ShapeHandle,
    pub material: BeamMaterial,
    pub node_a: BodyHandle,
    pub node_b: BodyHandle,
    /// Pivots to `node_a` and `node_b`. Either may have broken.
    pub joints: [JointHandle; 2],
}

/// The bridge-building level.
#[derive(Debug)]
pub struct BridgeBuilder {
    config: SandboxConfig,
    world: World,
    mode: EditorMode,
    terrain: Vec<BodyHandle>,
    nodes: Vec<Node>,
    beams: Vec<Beam>,
    car: Option<Car>,
    car_mass: f32,
    saved: Option<BridgeSnapshot>,
    drag_start: Option<BodyHandle>,
}

impl BridgeBuilder {
    /// Create the default level: terrain plus the four bank anchors.
    pub fn new(config: SandboxConfig) -> Result<Self> {
        let mut bridge = Self {
            world: World::new(config.world),
            car_mass: config.car_mass,
            config,
            mode: EditorMode::Build,
            terrain: Vec::new(),
            nodes: Vec::new(),
            beams: Vec::new(),
            car: None,
            saved: None,
            drag_start: None,
        };
        bridge.reset_level()?;
        Ok(bridge)
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn beams(&self) -> &[Beam] {
        &self.beams
    }

    pub fn terrain(&self) -> &[BodyHandle] {
        &self.terrain
    }

    pub fn node(&self, body: BodyHandle) -> Option<&Node> {
        self.nodes.iter().find(|n| n.body == body)
    }

    pub fn beam(&self, body: BodyHandle) -> Option<&Beam> {
        self.beams.iter().find(|b| b.body == body)
    }

    pub fn car(&self) -> Option<&Car> {
        self.car.as_ref()
    }

    pub fn car_mass(&self) -> f32 {
        self.car_mass
    }

    /// Set the mass used for the next car. Non-positive values are ignored.
    pub fn set_car_mass(&mut self, mass: f32) -> bool {
        if mass.is_finite() && mass > 0.0 {
            self.car_mass = mass;
            true
        } else {
            false
        }
    }

    /// Snapshot taken on the last switch to simulation.
    pub fn saved_state(&self) -> Option<&BridgeSnapshot> {
        self.saved.as_ref()
    }

    pub fn drag_start(&self) -> Option<BodyHandle> {
        self.drag_start
    }

    // ========================================================================
    // LEVEL
    // ========================================================================

    /// Throw everything away and rebuild the default level in build mode.
    pub fn reset_level(&mut self) -> Result<()> {
        self.saved = None;
        self.clear_level()?;
        for anchor in self.config.default_anchors.clone() {
            self.create_node(anchor, true)?;
        }
        tracing::info!("level reset");
        Ok(())
    }

    /// Fresh paused world with terrain only.
    fn clear_level(&mut self) -> Result<()> {
        let mut world = World::new(self.config.world);
        world.set_gravity(Vec2::ZERO);
        self.world = world;
        self.mode = EditorMode::Build;
        self.nodes.clear();
        self.beams.clear();
        self.car = None;
        self.drag_start = None;
        self.create_terrain()
    }

    fn create_terrain(&mut self) -> Result<()> {
        let ground_thickness = self.config.ground_thickness;
        let ground = (
            Vec2::new(self.config.width * 0.5, self.config.height + ground_thickness * 0.5),
            Vec2::new(self.config.width, ground_thickness),
        );
        let banks = self.config.banks().map(|bank| (bank.center(), bank.size));

        self.terrain.clear();
        for (center, size) in std::iter::once(ground).chain(banks) {
            let body = self.world.add_body(BodyDef::fixed().with_position(center))?;
            self.world.add_shape(
                body,
                ShapeDef::new(Geometry::boxed(size.x, size.y))
                    .with_filter(
                        category::GROUND,
                        category::CAR | category::ROAD | category::SUPPORT,
                    )
                    .with_friction(self.config.terrain_friction)
                    .with_color(TERRAIN_COLOR),
            )?;
            self.terrain.push(body);
        }
        Ok(())
    }

    /// True inside the solid banks, where nothing may be built.
    pub fn is_in_terrain(&self, point: Vec2) -> bool {
        let below_floor = point.y > self.config.anchor_y;
        below_floor
            && (point.x <= self.config.left_bank.wall_x || point.x >= self.config.right_bank.wall_x)
    }

    /// A point near a bank wall and below the build floor, moved onto the wall.
    pub fn snap_to_bank(&self, point: Vec2) -> Option<Vec2> {
        if point.y <= self.config.anchor_y {
            return None;
        }
        self.config
            .banks()
            .into_iter()
            .find(|bank| (point.x - bank.wall_x).abs() < self.config.snap_tolerance)
            .map(|bank| Vec2::new(bank.wall_x, point.y))
    }

    /// The two anchors at the top of the bank walls, which cannot be deleted.
    pub fn is_base_anchor(&self, position: Vec2) -> bool {
        (position.y - self.config.anchor_y).abs() < BASE_ANCHOR_TOLERANCE.y
            && self
                .config
                .banks()
                .iter()
                .any(|bank| (position.x - bank.wall_x).abs() < BASE_ANCHOR_TOLERANCE.x)
    }

    // ========================================================================
    // NODES AND BEAMS
    // ========================================================================

    pub fn create_node(&mut self, position: Vec2, is_static: bool) -> Result<BodyHandle> {
        let mass = self.config.node_mass;
        let radius = self.config.node_radius;
        let def = if is_static {
            BodyDef::fixed()
        } else {
            BodyDef::dynamic(mass, moment_for_circle(mass, 0.0, radius, Vec2::ZERO))
        };
        let body = self.world.add_body(def.with_position(position))?;
        let shape = self.world.add_shape(
            body,
            ShapeDef::new(Geometry::circle(radius))
                .with_filter(category::NODE, 0)
                .with_color(NODE_COLOR),
        )?;
        self.nodes.push(Node {
            body,
            shape,
            is_static,
        });
        tracing::debug!(%body, x = position.x, y = position.y, is_static, "node created");
        Ok(body)
    }

    /// Connect two nodes with a beam. Returns `None` when the nodes are
    /// closer than the minimum beam length.
    pub fn create_beam(
        &mut self,
        node_a: BodyHandle,
        node_b: BodyHandle,
        material: BeamMaterial,
    ) -> Result<Option<BodyHandle>> {
        let p1 = self.node_position(node_a)?;
        let p2 = self.node_position(node_b)?;
        let span = p2 - p1;
        let length = span.length();
        if length < self.config.min_beam_length {
            tracing::debug!(length, "beam too short, skipped");
            return Ok(None);
        }

        let mass = material.mass();
        let width = material.width();
        let body = self.world.add_body(
            BodyDef::dynamic(mass, moment_for_box(mass, length, width))
                .with_position((p1 + p2) * 0.5)
                .with_angle(span.y.atan2(span.x)),
        )?;
        let shape = self.world.add_shape(
            body,
            ShapeDef::new(Geometry::boxed(length, width))
                .with_filter(material.category(), material.mask())
                .with_friction(1.0)
                .with_tag(material.tag())
                .with_color(material.color()),
        )?;

        let half = length * 0.5;
        let error_bias = self.config.beam_error_bias;
        let pivot = |node: BodyHandle, end: f32| {
            JointDef::pivot(node, body, Vec2::ZERO, Vec2::new(end, 0.0))
                .with_error_bias(error_bias)
                .with_breaking_threshold(material.strength())
        };
        let joints = [
            self.world.add_joint(pivot(node_a, -half))?,
            self.world.add_joint(pivot(node_b, half))?,
        ];

        self.beams.push(Beam {
            body,
            shape,
            material,
            node_a,
            node_b,
            joints,
        });
        tracing::debug!(%body, %material, length, "beam created");
        Ok(Some(body))
    }

    fn node_position(&self, node: BodyHandle) -> Result<Vec2> {
        self.node(node)
            .and_then(|n| self.world.body(n.body))
            .map(|b| b.position)
            .ok_or(PhysicsError::UnknownBody(node))
    }

    /// Closest node within the pick radius.
    pub fn nearest_node(&self, point: Vec2) -> Option<BodyHandle> {
        self.nodes
            .iter()
            .filter_map(|n| {
                let body = self.world.body(n.body)?;
                Some((n.body, body.position.distance(point)))
            })
            .filter(|(_, d)| *d < self.config.pick_radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(handle, _)| handle)
    }

    /// Build a beam from `start` toward `point`, the way a drag ends.
    ///
    /// If a different node is under `point` and within build distance, the
    /// beam joins it. If nothing is there, a new node is created at `point`
    /// pulled back to the build distance, snapped onto a bank wall when
    /// close to one. Targets inside terrain are refused.
    pub fn place_beam_to(
        &mut self,
        start: BodyHandle,
        point: Vec2,
        material: BeamMaterial,
    ) -> Result<Option<BodyHandle>> {
        let start_pos = self.node_position(start)?;
        let reach = point - start_pos;
        let max = self.config.max_build_distance;

        match self.nearest_node(point) {
            Some(end) if end == start => Ok(None),
            Some(end) => {
                if reach.length() <= max {
                    self.create_beam(start, end, material)
                } else {
                    Ok(None)
                }
            }
            None => {
                let target = if reach.length() > max {
                    start_pos + reach.normalize_or_zero() * max
                } else {
                    point
                };
                if self.is_in_terrain(target) {
                    tracing::debug!(x = target.x, y = target.y, "target inside terrain");
                    return Ok(None);
                }
                let node = match self.snap_to_bank(target) {
                    Some(anchor) => self.create_node(anchor, true)?,
                    None => self.create_node(target, false)?,
                };
                self.create_beam(start, node, material)
            }
        }
    }

    /// Press at `point` in build mode: pick the node to drag from. Near a
    /// bank wall with no node, an anchor is created there instead.
    pub fn start_beam_at(&mut self, point: Vec2) -> Result<Option<BodyHandle>> {
        self.drag_start = None;
        if self.mode != EditorMode::Build {
            return Ok(None);
        }
        if let Some(node) = self.nearest_node(point) {
            self.drag_start = Some(node);
        } else if !self.is_in_terrain(point) {
            if let Some(anchor) = self.snap_to_bank(point) {
                self.create_node(anchor, true)?;
            }
        }
        Ok(self.drag_start)
    }

    /// Release at `point`: finish the beam started by [`start_beam_at`](Self::start_beam_at).
    pub fn finish_beam_at(
        &mut self,
        point: Vec2,
        material: BeamMaterial,
    ) -> Result<Option<BodyHandle>> {
        let Some(start) = self.drag_start.take() else {
            return Ok(None);
        };
        if self.mode != EditorMode::Build {
            return Ok(None);
        }
        self.place_beam_to(start, point, material)
    }

    /// Delete whatever is at `point`: a node (with every beam attached to
    /// it) or else a beam. Base anchors are kept.
    pub fn delete_at(&mut self, point: Vec2) -> Result<bool> {
        if let Some(node) = self.nearest_node(point) {
            let position = self.node_position(node)?;
            if self.is_base_anchor(position) {
                return Ok(false);
            }
            self.remove_node_and_connected(node)?;
            return Ok(true);
        }

        let hit = self
            .world
            .query_nearest_shape(point, self.config.beam_pick_radius)
            .and_then(|q| self.beams.iter().find(|b| b.shape == q.shape))
            .map(|b| b.body);
        match hit {
            Some(beam) => {
                self.remove_beam(beam)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove a node, its joints and every beam those joints held.
    pub fn remove_node_and_connected(&mut self, node: BodyHandle) -> Result<()> {
        if self.node(node).is_none() {
            return Err(PhysicsError::UnknownBody(node));
        }
        let mut attached = Vec::new();
        for joint in self.world.joints_of(node) {
            if let Some(other) = self.world.joint(joint).and_then(|j| j.other_body(node)) {
                attached.push(other);
            }
            self.world.remove_joint(joint)?;
        }
        let doomed: Vec<BodyHandle> = self
            .beams
            .iter()
            .filter(|b| attached.contains(&b.body))
            .map(|b| b.body)
            .collect();
        for beam in doomed {
            self.remove_beam(beam)?;
        }

        self.nodes.retain(|n| n.body != node);
        self.world.remove_body(node)?;
        tracing::debug!(%node, "node removed");
        Ok(())
    }

    /// Remove a beam and its joints. The nodes stay.
    pub fn remove_beam(&mut self, beam: BodyHandle) -> Result<()> {
        let index = self
            .beams
            .iter()
            .position(|b| b.body == beam)
            .ok_or(PhysicsError::UnknownBody(beam))?;
        self.beams.remove(index);
        self.world.remove_body(beam)?;
        tracing::debug!(%beam, "beam removed");
        Ok(())
    }

    // ========================================================================
    // STRESS
    // ========================================================================

    /// Highest stress ratio among the beam's remaining joints.
    pub fn beam_stress(&self, beam: BodyHandle) -> Option<f32> {
        let beam = self.beam(beam)?;
        Some(
            beam.joints
                .iter()
                .filter_map(|j| self.world.stress_ratio(*j))
                .fold(0.0, f32::max),
        )
    }

    /// Material color shifted toward red by the beam's stress.
    pub fn beam_color(&self, beam: BodyHandle) -> Option<Rgba> {
        let stress = self.beam_stress(beam)?;
        Some(stress_color(self.beam(beam)?.material.color(), stress))
    }

    /// Beams that lost at least one of their pivots.
    pub fn broken_beams(&self) -> Vec<BodyHandle> {
        self.beams
            .iter()
            .filter(|b| !b.joints.iter().all(|j| self.world.contains_joint(*j)))
            .map(|b| b.body)
            .collect()
    }

    // ========================================================================
    // MODES AND SNAPSHOTS
    // ========================================================================

    /// Save the bridge, turn gravity on and start simulating.
    pub fn to_sim_mode(&mut self) {
        if self.mode != EditorMode::Build {
            return;
        }
        self.saved = Some(self.snapshot());
        self.mode = EditorMode::Simulate;
        self.drag_start = None;
        self.world.set_gravity(self.config.world.gravity);
        self.world.set_mode(SimulationMode::Running);
    }

    /// Stop simulating and rebuild the bridge saved on entering simulation.
    pub fn to_build_mode(&mut self) -> Result<()> {
        if self.mode == EditorMode::Build {
            return Ok(());
        }
        match self.saved.clone() {
            Some(saved) => self.restore(&saved)?,
            None => {
                self.mode = EditorMode::Build;
                self.world.set_gravity(Vec2::ZERO);
                self.world.set_mode(SimulationMode::Paused);
            }
        }
        Ok(())
    }

    /// Record nodes and intact beams.
    pub fn snapshot(&self) -> BridgeSnapshot {
        let nodes = self
            .nodes
            .iter()
            .filter_map(|n| {
                let body = self.world.body(n.body)?;
                Some(NodeRecord {
                    x: body.position.x,
                    y: body.position.y,
                    is_static: n.is_static,
                })
            })
            .collect();

        let index_of = |body: BodyHandle| self.nodes.iter().position(|n| n.body == body);
        let beams = self
            .beams
            .iter()
            .filter(|b| b.joints.iter().all(|j| self.world.contains_joint(*j)))
            .filter_map(|b| {
                Some(BeamRecord {
                    node_a: index_of(b.node_a)?,
                    node_b: index_of(b.node_b)?,
                    material: b.material,
                })
            })
            .collect();

        BridgeSnapshot { nodes, beams }
    }

    /// Rebuild the level from a snapshot in build mode. The car is removed.
    pub fn restore(&mut self, snapshot: &BridgeSnapshot) -> Result<()> {
        self.clear_level()?;
        let mut created = Vec::with_capacity(snapshot.nodes.len());
        for node in &snapshot.nodes {
            created.push(self.create_node(Vec2::new(node.x, node.y), node.is_static)?);
        }
        for beam in snapshot.valid_beams() {
            self.create_beam(created[beam.node_a], created[beam.node_b], beam.material)?;
        }
        tracing::info!(
            nodes = self.nodes.len(),
            beams = self.beams.len(),
            "bridge restored"
        );
        Ok(())
    }

    // ========================================================================
    // SIMULATION
    // ========================================================================

    /// Advance one frame. Does nothing in build mode.
    pub fn tick(&mut self) -> StepReport {
        if self.mode != EditorMode::Simulate {
            return StepReport::default();
        }
        let report = self.world.step(self.config.frame_dt());
        if !report.broken_joints.is_empty() {
            tracing::debug!(count = report.broken_joints.len(), "joints broke this frame");
        }
        report
    }

    /// Replace the car with a new one at the spawn point.
    pub fn spawn_car(&mut self) -> Result<()> {
        if let Some(car) = self.car.take() {
            car.destroy(&mut self.world);
        }
        self.car = Some(Car::spawn(
            &mut self.world,
            self.config.car_spawn,
            self.car_mass,
        )?);
        Ok(())
    }

    /// Drive the car, switching to simulation first if needed.
    pub fn drive(&mut self, speed: f32) -> Result<()> {
        if self.mode == EditorMode::Build {
            self.to_sim_mode();
        }
        match &self.car {
            Some(car) => car.drive(&mut self.world, speed),
            None => Ok(()),
        }
    }
}
