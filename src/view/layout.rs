//! Node positions: force-directed stabilization and the timeline layout.

use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use force_graph::{EdgeData, ForceGraph, NodeData, SimulationParameters};
use log::{debug, info};

use super::config::{StabilizationConfig, ViewConfig};
use super::scale::{BandScale, LinearScale};
use super::state::Viewport;
use crate::chronology::{EdgeKind, Entity, Graph, NodeId, NodeKind};

/// Radius of the ring new nodes are seeded on.
const SEED_RADIUS: f64 = 100.0;
/// Domain used when there are no events to place on the timeline.
const DEFAULT_YEARS: (f64, f64) = (-4004.0, 2025.0);

/// Timeline lane holding pattern nodes.
pub const PATTERN_LANE: &str = "Patterns";
/// Timeline lane holding prophecy nodes.
pub const PROPHECY_LANE: &str = "Prophecies";
const UNKNOWN_ERA: &str = "Unknown era";

/// Position in world coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
	/// World x.
	pub x: f64,
	/// World y.
	pub y: f64,
}

impl Point {
	/// Creates a point.
	pub fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}
}

/// Progress of the active stabilization pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Progress {
	/// No pass is active.
	Idle,
	/// Fraction of the iteration budget done.
	Running(f64),
	/// The pass completed during the last frame.
	Finished,
}

/// One force-directed settling pass, advanced a batch of steps per frame.
struct Stabilization {
	generation: u64,
	sim: ForceGraph<NodeId, ()>,
	done: u32,
	total: u32,
	per_frame: u32,
	step: f32,
	reported: u32,
}

/// Node positions for both view modes plus the single active
/// stabilization pass.
#[derive(Default)]
pub struct Layout {
	positions: HashMap<NodeId, Point>,
	pinned: HashSet<NodeId>,
	stabilization: Option<Stabilization>,
	generation: u64,
	timeline: Option<TimelineLayout>,
}

impl Layout {
	/// Network-mode position of a node.
	pub fn network_position(&self, id: NodeId) -> Option<Point> {
		self.positions.get(&id).copied()
	}

	/// Timeline layout, once built.
	pub fn timeline(&self) -> Option<&TimelineLayout> {
		self.timeline.as_ref()
	}

	/// Whether a drag pinned the node.
	pub fn is_pinned(&self, id: NodeId) -> bool {
		self.pinned.contains(&id)
	}

	/// Whether a pass is active.
	pub fn is_stabilizing(&self) -> bool {
		self.stabilization.is_some()
	}

	/// Generation of the latest stabilization pass.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	/// Forgets positions of nodes no longer in `graph`.
	pub fn retain(&mut self, graph: &Graph) {
		self.positions.retain(|id, _| graph.contains(*id));
		self.pinned.retain(|id| graph.contains(*id));
	}

	/// Replaces any running pass with a fresh one over `visible` nodes.
	/// Existing positions are kept; only nodes new to the layout are seeded.
	pub fn restart(&mut self, graph: &Graph, visible: &[NodeId], config: &StabilizationConfig) {
		let unplaced: Vec<NodeId> = visible
			.iter()
			.copied()
			.filter(|id| !self.positions.contains_key(id))
			.collect();
		let count = unplaced.len().max(1) as f64;
		for (i, id) in unplaced.into_iter().enumerate() {
			let angle = i as f64 * 2.0 * PI / count;
			self.positions
				.insert(id, Point::new(SEED_RADIUS * angle.cos(), SEED_RADIUS * angle.sin()));
		}

		let mut sim = ForceGraph::new(SimulationParameters {
			force_charge: config.force_charge,
			force_spring: config.force_spring,
			force_max: config.force_max,
			node_speed: config.node_speed,
			damping_factor: config.damping_factor,
		});
		let mut id_to_idx = HashMap::new();
		for &id in visible {
			let p = self.positions[&id];
			let idx = sim.add_node(NodeData {
				x: p.x as f32,
				y: p.y as f32,
				mass: 10.0,
				is_anchor: self.pinned.contains(&id),
				user_data: id,
			});
			id_to_idx.insert(id, idx);
		}
		for edge in graph.edges() {
			if let (Some(&src), Some(&tgt)) = (id_to_idx.get(&edge.source), id_to_idx.get(&edge.target)) {
				sim.add_edge(src, tgt, EdgeData::default());
			}
		}

		self.generation += 1;
		if self.stabilization.is_some() {
			debug!("stabilization superseded by pass #{}", self.generation);
		}
		self.stabilization = Some(Stabilization {
			generation: self.generation,
			sim,
			done: 0,
			total: config.iterations,
			per_frame: config.update_interval.max(1),
			step: config.step,
			reported: 0,
		});
	}

	/// Stops the running pass, keeping positions reached so far.
	pub fn cancel(&mut self) {
		if let Some(s) = self.stabilization.take() {
			debug!("stabilization #{} cancelled after {} steps", s.generation, s.done);
		}
	}

	/// Runs one frame's worth of simulation steps.
	pub fn advance(&mut self) -> Progress {
		let Some(s) = self.stabilization.as_mut() else {
			return Progress::Idle;
		};
		let steps = s.per_frame.min(s.total - s.done);
		for _ in 0..steps {
			s.sim.update(s.step);
		}
		s.done += steps;

		let positions = &mut self.positions;
		s.sim.visit_nodes(|node| {
			positions.insert(
				node.data.user_data,
				Point::new(node.x() as f64, node.y() as f64),
			);
		});

		if s.done >= s.total {
			info!("Network stabilized");
			self.stabilization = None;
			return Progress::Finished;
		}
		let percent = (u64::from(s.done) * 100 / u64::from(s.total)) as u32;
		if percent / 10 > s.reported / 10 {
			debug!("Stabilizing network: {percent}%");
			s.reported = percent;
		}
		Progress::Running(s.done as f64 / s.total as f64)
	}

	/// Moves a node (user drag) and pins it where it was dropped.
	pub fn move_node(&mut self, id: NodeId, to: Point) {
		self.positions.insert(id, to);
		self.pinned.insert(id);
		if let Some(s) = self.stabilization.as_mut() {
			s.sim.visit_nodes_mut(|node| {
				if node.data.user_data == id {
					node.data.x = to.x as f32;
					node.data.y = to.y as f32;
					node.data.is_anchor = true;
				}
			});
		}
	}

	/// Recomputes the timeline layout for a new graph or viewport.
	pub fn rebuild_timeline(&mut self, graph: &Graph, viewport: Viewport, config: &ViewConfig) {
		self.timeline = Some(TimelineLayout::build(graph, viewport, config));
	}

	/// Releases every dragged node.
	pub fn clear_pins(&mut self) {
		self.pinned.clear();
	}
}

/// Horizontal bar for an event with a duration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Span {
	/// Start of the span.
	pub x1: f64,
	/// End of the span.
	pub x2: f64,
	/// Lane centre.
	pub y: f64,
}

/// Time-scaled positions: events by year and era, patterns and prophecies
/// on their own lanes under the event they link to.
#[derive(Clone, Debug)]
pub struct TimelineLayout {
	/// Year to x mapping.
	pub years: LinearScale,
	/// Lane to y mapping.
	pub bands: BandScale,
	positions: HashMap<NodeId, Point>,
	spans: HashMap<NodeId, Span>,
}

impl TimelineLayout {
	/// Lays out visible nodes of `graph` on the time axis.
	pub fn build(graph: &Graph, viewport: Viewport, config: &ViewConfig) -> Self {
		let m = &config.timeline;
		let events: Vec<_> = graph
			.nodes()
			.iter()
			.filter_map(|n| n.entity.as_event().map(|e| (n.id, e)))
			.collect();

		let domain = if events.is_empty() {
			DEFAULT_YEARS
		} else {
			let lo = events.iter().map(|(_, e)| e.year_start).min().unwrap_or(0) as f64;
			let hi = events
				.iter()
				.map(|(_, e)| e.year_end.unwrap_or(e.year_start).max(e.year_start))
				.max()
				.unwrap_or(0) as f64;
			if hi > lo { (lo, hi) } else { (lo - 50.0, hi + 50.0) }
		};
		let x0 = m.margin_left;
		let x1 = (viewport.width - m.margin_right).max(x0 + 1.0);
		let years = LinearScale::new(domain, (x0, x1));

		let mut chronological = events.clone();
		chronological.sort_by_key(|(_, e)| e.year_start);
		let mut lanes: Vec<String> = Vec::new();
		for (_, e) in &chronological {
			let era = era_name(&e.era);
			if !lanes.iter().any(|l| l == era) {
				lanes.push(era.to_string());
			}
		}
		let [_, (_, patterns), (_, prophecies)] = graph.kind_counts();
		if patterns > 0 {
			lanes.push(PATTERN_LANE.into());
		}
		if prophecies > 0 {
			lanes.push(PROPHECY_LANE.into());
		}
		let y0 = m.margin_top;
		let y1 = (viewport.height - m.margin_bottom).max(y0 + 1.0);
		let bands = BandScale::new(lanes, (y0, y1), m.band_padding);

		let mut positions = HashMap::with_capacity(graph.len());
		let mut spans = HashMap::new();
		for (id, e) in &events {
			let y = bands.center(era_name(&e.era)).unwrap_or(y0);
			let x = years.scale(e.year_start as f64);
			positions.insert(*id, Point::new(x, y));
			if let Some(end) = e.year_end.filter(|&end| end != e.year_start) {
				spans.insert(
					*id,
					Span {
						x1: x,
						x2: years.scale(end as f64),
						y,
					},
				);
			}
		}

		let linked = |id: NodeId| -> Option<NodeId> {
			graph.edges().iter().find_map(|edge| match edge.kind {
				EdgeKind::MatchesPattern if edge.target == id => Some(edge.source),
				EdgeKind::FulfilledBy if edge.source == id => Some(edge.target),
				_ => None,
			})
		};
		for node in graph.nodes() {
			let lane = match node.kind {
				NodeKind::Event => continue,
				NodeKind::Pattern => PATTERN_LANE,
				NodeKind::Prophecy => PROPHECY_LANE,
			};
			let x = linked(node.id)
				.and_then(|event| positions.get(&event).map(|p| p.x))
				.unwrap_or(x0);
			let y = bands.center(lane).unwrap_or(y1);
			positions.insert(node.id, Point::new(x, y));
		}

		Self {
			years,
			bands,
			positions,
			spans,
		}
	}

	/// Position of a node on the timeline.
	pub fn position(&self, id: NodeId) -> Option<Point> {
		self.positions.get(&id).copied()
	}

	/// Year span of an event, if it has an end year.
	pub fn span(&self, id: NodeId) -> Option<Span> {
		self.spans.get(&id).copied()
	}

	/// Whether the node is a pivotal event (drawn larger).
	pub fn is_pivotal(graph: &Graph, id: NodeId) -> bool {
		matches!(graph.node(id).map(|n| &n.entity), Some(Entity::Event(e)) if e.is_pivotal)
	}
}

fn era_name(era: &str) -> &str {
	if era.trim().is_empty() { UNKNOWN_ERA } else { era }
}
