//! The interactive view controller: filters, zoom/pan, selection, hover and
//! layout for one rendered graph view.

use std::collections::HashSet;
use std::mem;
use std::rc::Rc;

use log::{debug, info};

use super::config::ViewConfig;
use super::layout::{Layout, Point, Progress, TimelineLayout};
use super::state::{
	Gesture, GestureKind, HoverState, KeyAction, Phase, SubscriptionId, Tooltip, Transform, ViewEvent,
	ViewMode, ViewState, ViewStats, Viewport, VisibleStatus,
};
use crate::chronology::{Edge, Graph, Node, NodeId, NodeKind};

/// Zoom factor applied per wheel notch.
const WHEEL_IN: f64 = 1.1;
const WHEEL_OUT: f64 = 0.9;
/// Speed of the highlight fade, per second.
const HIGHLIGHT_IN: f64 = 1.8;
const HIGHLIGHT_OUT: f64 = 1.26;

type Listener = Box<dyn FnMut(&ViewEvent)>;

/// Nodes and edges passing the active filters. Replaced as a whole, never
/// patched in place.
#[derive(Clone, Debug, Default)]
struct VisibleSet {
	/// Visible node ids in graph order.
	order: Vec<NodeId>,
	nodes: HashSet<NodeId>,
	/// Indices into `Graph::edges`.
	edges: Vec<usize>,
}

/// Owns the [`ViewState`] of one view and derives what is visible from the
/// graph snapshot it was given.
pub struct ViewController {
	graph: Rc<Graph>,
	config: ViewConfig,
	state: ViewState,
	viewport: Viewport,
	phase: Phase,
	gesture: Option<Gesture>,
	hover: HoverState,
	visible: VisibleSet,
	layout: Layout,
	listeners: Vec<(SubscriptionId, Listener)>,
	next_subscription: u64,
}

impl ViewController {
	/// Creates a controller over `graph` for a `width` x `height` viewport.
	pub fn new(graph: Rc<Graph>, config: ViewConfig, width: f64, height: f64) -> Self {
		let mut controller = Self {
			graph,
			config: config.sanitized(),
			state: ViewState::default(),
			viewport: Viewport { width, height },
			phase: Phase::Idle,
			gesture: None,
			hover: HoverState::default(),
			visible: VisibleSet::default(),
			layout: Layout::default(),
			listeners: Vec::new(),
			next_subscription: 0,
		};
		controller.recompute_visible();
		controller.relayout();
		controller
	}

	// ---- accessors ----

	/// Current graph snapshot.
	pub fn graph(&self) -> &Rc<Graph> {
		&self.graph
	}

	/// Full view state.
	pub fn state(&self) -> &ViewState {
		&self.state
	}

	/// Effective, sanitized configuration.
	pub fn config(&self) -> &ViewConfig {
		&self.config
	}

	/// Canvas size.
	pub fn viewport(&self) -> Viewport {
		self.viewport
	}

	/// Current state-machine phase.
	pub fn phase(&self) -> Phase {
		self.phase
	}

	/// Current pan and scale.
	pub fn transform(&self) -> Transform {
		self.state.transform
	}

	/// Current layout mode.
	pub fn mode(&self) -> ViewMode {
		self.state.mode
	}

	/// Selected node id, if any.
	pub fn selected(&self) -> Option<NodeId> {
		self.state.selected
	}

	/// Selected node, if any.
	pub fn selected_node(&self) -> Option<&Node> {
		self.state.selected.and_then(|id| self.graph.node(id))
	}

	/// Node under the pointer, if any.
	pub fn hovered(&self) -> Option<NodeId> {
		self.hover.node
	}

	/// Whether `id` passes the active filters.
	pub fn is_visible(&self, id: NodeId) -> bool {
		self.visible.nodes.contains(&id)
	}

	/// Visible nodes, in graph order.
	pub fn visible_nodes(&self) -> impl Iterator<Item = &Node> + '_ {
		self.visible.order.iter().filter_map(|&id| self.graph.node(id))
	}

	/// Visible edges; both endpoints of each are visible.
	pub fn visible_edges(&self) -> impl Iterator<Item = &Edge> + '_ {
		self.visible.edges.iter().map(|&i| &self.graph.edges()[i])
	}

	/// What the canvas should show.
	pub fn status(&self) -> VisibleStatus {
		if self.graph.is_empty() {
			VisibleStatus::NoData
		} else if self.visible.order.is_empty() {
			VisibleStatus::NoMatches
		} else {
			VisibleStatus::Showing {
				nodes: self.visible.order.len(),
				edges: self.visible.edges.len(),
			}
		}
	}

	/// Counts for the stats line.
	pub fn stats(&self) -> ViewStats {
		let kinds: HashSet<NodeKind> = self.visible_nodes().map(|n| n.kind).collect();
		ViewStats {
			nodes: self.visible.order.len(),
			edges: self.visible.edges.len(),
			clusters: kinds.len(),
		}
	}

	/// Timeline layout, in timeline mode only.
	pub fn timeline(&self) -> Option<&TimelineLayout> {
		match self.state.mode {
			ViewMode::Timeline => self.layout.timeline(),
			ViewMode::Network => None,
		}
	}

	/// Year range currently on screen in timeline mode.
	pub fn visible_domain(&self) -> Option<(f64, f64)> {
		let t = self.state.transform;
		self.timeline().map(|tl| tl.years.rescale(t.k, t.x).domain)
	}

	/// Whether a stabilization pass is running.
	pub fn is_stabilizing(&self) -> bool {
		self.layout.is_stabilizing()
	}

	/// World position of a node in the current mode.
	pub fn position(&self, id: NodeId) -> Option<Point> {
		match self.state.mode {
			ViewMode::Network => self.layout.network_position(id),
			ViewMode::Timeline => self.layout.timeline().and_then(|tl| tl.position(id)),
		}
	}

	/// Position of a node in canvas pixels.
	pub fn screen_position(&self, id: NodeId) -> Option<Point> {
		self.position(id).map(|p| {
			let (x, y) = self.state.to_screen(self.viewport, p.x, p.y);
			Point::new(x, y)
		})
	}

	/// Hovered node or one of its neighbours.
	pub fn is_highlighted(&self, id: NodeId) -> bool {
		self.hover.node == Some(id) || self.hover.neighbors.contains(&id)
	}

	/// Hover highlight fade, from 0 to 1.
	pub fn highlight_t(&self) -> f64 {
		self.hover.highlight_t
	}

	/// Tooltip for the hovered node, once the hover delay has elapsed.
	pub fn tooltip(&self) -> Option<Tooltip> {
		if !self.hover.tooltip_visible {
			return None;
		}
		let id = self.hover.node?;
		let node = self.graph.node(id)?;
		let p = self.screen_position(id)?;
		Some(Tooltip {
			node: id,
			text: node.tooltip.clone(),
			x: p.x,
			y: p.y,
		})
	}

	/// Pick radius in screen pixels: network nodes grow with zoom, timeline
	/// markers do not.
	fn pick_radius(&self) -> f64 {
		match self.state.mode {
			ViewMode::Network => self.config.hit_radius * self.state.transform.k,
			ViewMode::Timeline => self.config.hit_radius,
		}
	}

	/// Closest visible node within pick distance of a screen point.
	pub fn hit_test(&self, sx: f64, sy: f64) -> Option<NodeId> {
		let radius = self.pick_radius();
		self.visible
			.order
			.iter()
			.filter_map(|&id| {
				let p = self.screen_position(id)?;
				let d = ((p.x - sx).powi(2) + (p.y - sy).powi(2)).sqrt();
				(d < radius).then_some((id, d))
			})
			.min_by(|a, b| a.1.total_cmp(&b.1))
			.map(|(id, _)| id)
	}

	// ---- subscriptions ----

	/// Registers a listener for [`ViewEvent`]s.
	pub fn subscribe(&mut self, listener: impl FnMut(&ViewEvent) + 'static) -> SubscriptionId {
		let id = SubscriptionId(self.next_subscription);
		self.next_subscription += 1;
		self.listeners.push((id, Box::new(listener)));
		id
	}

	/// Removes a listener; returns whether it was registered.
	pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
		let before = self.listeners.len();
		self.listeners.retain(|(sub, _)| *sub != id);
		self.listeners.len() != before
	}

	fn emit(&mut self, events: Vec<ViewEvent>) {
		for event in &events {
			for (_, listener) in self.listeners.iter_mut() {
				listener(event);
			}
		}
	}

	// ---- filters ----

	/// Shows only nodes whose label or tooltip contains `query`,
	/// case-insensitively. An empty query shows everything.
	pub fn set_search(&mut self, query: impl Into<String>) {
		let query = query.into();
		if query == self.state.search {
			return;
		}
		self.state.search = query;
		self.apply_filters();
	}

	/// Restricts visible nodes to one kind, or lifts the restriction.
	pub fn set_type_filter(&mut self, kind: Option<NodeKind>) {
		if kind == self.state.type_filter {
			return;
		}
		self.state.type_filter = kind;
		self.apply_filters();
	}

	fn apply_filters(&mut self) {
		let before = self.status();
		self.recompute_visible();
		let mut events = Vec::new();
		if let Some(id) = self.state.selected.filter(|id| !self.is_visible(*id)) {
			debug!("selection {id} hidden by filter");
			self.state.selected = None;
			events.push(ViewEvent::SelectionChanged(None));
		}
		if self.hover.node.is_some_and(|id| !self.is_visible(id)) {
			self.set_hover(None);
		}
		self.restart_stabilization();
		let after = self.status();
		if after != before || matches!(after, VisibleStatus::Showing { .. }) {
			events.push(ViewEvent::VisibleChanged(after));
		}
		self.emit(events);
	}

	/// Rebuilds the visible set from the graph and filters in one step.
	fn recompute_visible(&mut self) {
		let resume = mem::replace(&mut self.phase, Phase::Filtering);
		let needle = self.state.search.trim().to_lowercase();
		let filter = self.state.type_filter;
		let order: Vec<NodeId> = self
			.graph
			.nodes()
			.iter()
			.filter(|n| filter.is_none_or(|k| n.kind == k) && n.matches(&needle))
			.map(|n| n.id)
			.collect();
		let nodes: HashSet<NodeId> = order.iter().copied().collect();
		let edges = self
			.graph
			.edges()
			.iter()
			.enumerate()
			.filter(|(_, e)| nodes.contains(&e.source) && nodes.contains(&e.target))
			.map(|(i, _)| i)
			.collect();
		self.visible = VisibleSet {
			order,
			nodes,
			edges,
		};
		self.phase = resume;
	}

	// ---- viewport ----

	/// Zooms in by `zoom_step` about the viewport centre.
	pub fn zoom_in(&mut self) {
		self.zoom_by(self.config.zoom_step);
	}

	/// Zooms out by `zoom_out_step` about the viewport centre.
	pub fn zoom_out(&mut self) {
		self.zoom_by(self.config.zoom_out_step);
	}

	/// Multiplies the scale by `factor` around the viewport centre, clamped
	/// to the configured range. Non-positive or non-finite factors are
	/// ignored.
	pub fn zoom_by(&mut self, factor: f64) {
		let (cx, cy) = self.viewport.center();
		self.zoom_at(cx, cy, factor);
	}

	/// Arrow keys pan by `keyboard.pan_step` pixels, zoom keys scale about
	/// the viewport centre by `1 ± keyboard.zoom_speed`. Vertical panning is
	/// ignored in timeline mode.
	pub fn key(&mut self, action: KeyAction) {
		let step = self.config.keyboard.pan_step;
		let (dx, dy) = match action {
			KeyAction::PanLeft => (step, 0.0),
			KeyAction::PanRight => (-step, 0.0),
			KeyAction::PanUp => (0.0, step),
			KeyAction::PanDown => (0.0, -step),
			KeyAction::ZoomIn => return self.zoom_by(1.0 + self.config.keyboard.zoom_speed),
			KeyAction::ZoomOut => return self.zoom_by(1.0 - self.config.keyboard.zoom_speed),
		};
		let dy = match self.state.mode {
			ViewMode::Network => dy,
			ViewMode::Timeline => 0.0,
		};
		let t = self.state.transform;
		self.set_transform(Transform {
			x: t.x + dx,
			y: t.y + dy,
			k: t.k,
		});
	}

	/// Wheel zoom about the pointer.
	pub fn wheel(&mut self, sx: f64, sy: f64, delta_y: f64) {
		if delta_y == 0.0 || !delta_y.is_finite() {
			return;
		}
		let factor = if delta_y > 0.0 { WHEEL_OUT } else { WHEEL_IN };
		self.zoom_at(sx, sy, factor);
	}

	fn zoom_at(&mut self, sx: f64, sy: f64, factor: f64) {
		if !(factor.is_finite() && factor > 0.0) {
			return;
		}
		let k = self.config.clamp_scale(self.state.transform.k * factor);
		if k == self.state.transform.k {
			return;
		}
		let transform = self.state.zoomed_about(self.viewport, sx, sy, k);
		self.set_transform(transform);
	}

	/// Sets pan and scale directly; the scale is clamped.
	pub fn pan_to(&mut self, transform: Transform) {
		if !transform.is_finite() {
			return;
		}
		let mut transform = Transform {
			k: self.config.clamp_scale(transform.k),
			..transform
		};
		if self.state.mode == ViewMode::Timeline {
			transform.y = 0.0;
		}
		self.set_transform(transform);
	}

	/// Fits the bounding box of the visible nodes into the viewport, centred
	/// with `fit_margin` on each side. Depends only on positions and viewport
	/// size, so repeating it changes nothing.
	pub fn fit_to_content(&mut self) {
		let points: Vec<Point> = self
			.visible
			.order
			.iter()
			.filter_map(|&id| self.position(id))
			.collect();
		if points.is_empty() {
			self.set_transform(Transform::IDENTITY);
			return;
		}
		let pad = self.config.hit_radius;
		let min_x = points.iter().map(|p| p.x).fold(f64::INFINITY, f64::min) - pad;
		let max_x = points.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max) + pad;
		let min_y = points.iter().map(|p| p.y).fold(f64::INFINITY, f64::min) - pad;
		let max_y = points.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max) + pad;

		let margin = self.config.fit_margin;
		let avail_w = self.viewport.width - 2.0 * margin;
		let avail_h = self.viewport.height - 2.0 * margin;
		let (cx, cy) = ((min_x + max_x) / 2.0, (min_y + max_y) / 2.0);

		let transform = match self.state.mode {
			ViewMode::Network => {
				let k = if avail_w > 0.0 && avail_h > 0.0 {
					(avail_w / (max_x - min_x)).min(avail_h / (max_y - min_y))
				} else {
					1.0
				};
				let k = self.config.clamp_scale(k);
				Transform {
					x: -cx * k,
					y: -cy * k,
					k,
				}
			}
			ViewMode::Timeline => {
				let k = if avail_w > 0.0 { avail_w / (max_x - min_x) } else { 1.0 };
				let k = self.config.clamp_scale(k);
				Transform {
					x: self.viewport.width / 2.0 - cx * k,
					y: 0.0,
					k,
				}
			}
		};
		self.set_transform(transform);
	}

	fn set_transform(&mut self, transform: Transform) {
		if transform == self.state.transform {
			return;
		}
		self.state.transform = transform;
		self.rebase_gesture();
		self.emit(vec![ViewEvent::ViewportChanged(transform)]);
	}

	/// Re-anchors a live gesture on the current transform so programmatic
	/// zoom/pan composes with it instead of being overwritten on the next
	/// pointer move.
	fn rebase_gesture(&mut self) {
		let Some(mut gesture) = self.gesture else {
			return;
		};
		gesture.anchor = gesture.last;
		gesture.kind = match gesture.kind {
			GestureKind::Pan { .. } => GestureKind::Pan {
				transform_start: self.state.transform,
			},
			GestureKind::DragNode { id, node_start } => GestureKind::DragNode {
				id,
				node_start: self
					.layout
					.network_position(id)
					.map_or(node_start, |p| (p.x, p.y)),
			},
		};
		self.gesture = Some(gesture);
	}

	/// Resizes the viewport.
	pub fn set_viewport(&mut self, width: f64, height: f64) {
		let viewport = Viewport { width, height };
		if viewport == self.viewport {
			return;
		}
		self.viewport = viewport;
		if self.state.mode == ViewMode::Timeline {
			self.layout
				.rebuild_timeline(&self.graph, self.viewport, &self.config);
		}
	}

	/// Switches between network and timeline layout and resets the transform.
	pub fn set_mode(&mut self, mode: ViewMode) {
		if mode == self.state.mode {
			return;
		}
		info!("switching view to {mode:?}");
		self.gesture = None;
		self.phase = Phase::Idle;
		self.state.mode = mode;
		self.state.transform = Transform::IDENTITY;
		self.relayout();
		self.emit(vec![ViewEvent::ViewportChanged(self.state.transform)]);
	}

	// ---- selection ----

	/// Selects a visible node or clears the selection. Ids that are not
	/// visible leave the selection untouched.
	pub fn select_node(&mut self, id: Option<NodeId>) {
		if let Some(id) = id {
			if !self.is_visible(id) {
				debug!("ignoring selection of unknown or hidden node {id}");
				return;
			}
		}
		if id == self.state.selected {
			return;
		}
		self.state.selected = id;
		self.emit(vec![ViewEvent::SelectionChanged(id)]);
	}

	/// Back to defaults: scale 1, identity pan, no filters, no selection.
	/// The view mode is kept.
	pub fn reset(&mut self) {
		let before = self.status();
		let had_selection = self.state.selected.is_some();
		let moved = self.state.transform != Transform::IDENTITY;
		self.gesture = None;
		self.phase = Phase::Idle;
		self.set_hover(None);
		self.state = ViewState {
			mode: self.state.mode,
			..ViewState::default()
		};
		self.layout.clear_pins();
		self.recompute_visible();
		self.restart_stabilization();

		let mut events = Vec::new();
		if had_selection {
			events.push(ViewEvent::SelectionChanged(None));
		}
		if moved {
			events.push(ViewEvent::ViewportChanged(Transform::IDENTITY));
		}
		if self.status() != before {
			events.push(ViewEvent::VisibleChanged(self.status()));
		}
		self.emit(events);
	}

	// ---- graph & layout ----

	/// Swaps in a freshly assembled graph. Filters stay; a selection whose
	/// node no longer exists is cleared.
	pub fn set_graph(&mut self, graph: Rc<Graph>) {
		self.graph = graph;
		self.layout.retain(&self.graph);
		self.recompute_visible();
		let mut events = Vec::new();
		if self.state.selected.is_some_and(|id| !self.is_visible(id)) {
			self.state.selected = None;
			events.push(ViewEvent::SelectionChanged(None));
		}
		if self.hover.node.is_some_and(|id| !self.is_visible(id)) {
			self.set_hover(None);
		}
		self.gesture = self
			.gesture
			.filter(|g| !matches!(g.kind, GestureKind::DragNode { id, .. } if !self.is_visible(id)));
		self.relayout();
		events.push(ViewEvent::VisibleChanged(self.status()));
		self.emit(events);
	}

	/// Restarts force settling from the current positions.
	pub fn stabilize(&mut self) {
		self.restart_stabilization();
	}

	fn relayout(&mut self) {
		match self.state.mode {
			ViewMode::Network => self.restart_stabilization(),
			ViewMode::Timeline => {
				self.layout.cancel();
				self.layout
					.rebuild_timeline(&self.graph, self.viewport, &self.config);
			}
		}
	}

	fn restart_stabilization(&mut self) {
		if self.state.mode != ViewMode::Network {
			return;
		}
		self.layout
			.restart(&self.graph, &self.visible.order, &self.config.stabilization);
	}

	/// Advances one animation frame: a batch of stabilization steps and the
	/// hover/tooltip timers.
	pub fn tick(&mut self, dt: f64) -> Progress {
		let progress = if self.state.mode == ViewMode::Network {
			self.layout.advance()
		} else {
			Progress::Idle
		};

		if self.hover.node.is_some() {
			self.hover.elapsed += dt;
			if self.hover.elapsed >= self.config.tooltip_delay {
				self.hover.tooltip_visible = true;
				self.hover.highlight_t += (1.0 - self.hover.highlight_t) * HIGHLIGHT_IN * dt;
			}
		} else {
			self.hover.highlight_t -= self.hover.highlight_t * HIGHLIGHT_OUT * dt;
			if self.hover.highlight_t < 0.01 {
				self.hover.highlight_t = 0.0;
			}
		}
		self.hover.highlight_t = self.hover.highlight_t.clamp(0.0, 1.0);
		progress
	}

	// ---- pointer ----

	fn set_hover(&mut self, node: Option<NodeId>) {
		if self.hover.node == node {
			return;
		}
		self.hover.node = node;
		self.hover.elapsed = 0.0;
		self.hover.tooltip_visible = false;
		self.hover.neighbors = node
			.map(|id| {
				self.graph
					.neighbors(id)
					.into_iter()
					.filter(|n| self.visible.nodes.contains(n))
					.collect()
			})
			.unwrap_or_default();
	}

	/// Starts a gesture: dragging the node under the pointer (network mode)
	/// or panning the canvas.
	pub fn pointer_down(&mut self, sx: f64, sy: f64) {
		let hit = self.hit_test(sx, sy);
		let kind = match (hit, self.state.mode) {
			(Some(id), ViewMode::Network) => {
				let p = self.layout.network_position(id).unwrap_or_default();
				GestureKind::DragNode {
					id,
					node_start: (p.x, p.y),
				}
			}
			_ => GestureKind::Pan {
				transform_start: self.state.transform,
			},
		};
		self.gesture = Some(Gesture::new(kind, sx, sy));
		self.phase = Phase::Interacting;
	}

	/// Hover tracking, or the live pan/drag when a gesture is in progress.
	pub fn pointer_move(&mut self, sx: f64, sy: f64) {
		self.hover.pointer = (sx, sy);
		let Some(mut gesture) = self.gesture else {
			let hit = self.hit_test(sx, sy);
			self.set_hover(hit);
			return;
		};
		let (dx, dy) = gesture.track(sx, sy);
		self.gesture = Some(gesture);
		match gesture.kind {
			GestureKind::Pan { transform_start } => {
				let y = match self.state.mode {
					ViewMode::Network => transform_start.y + dy,
					ViewMode::Timeline => transform_start.y,
				};
				let transform = Transform {
					x: transform_start.x + dx,
					y,
					k: transform_start.k,
				};
				if transform != self.state.transform {
					self.state.transform = transform;
					self.emit(vec![ViewEvent::ViewportChanged(transform)]);
				}
			}
			GestureKind::DragNode { id, node_start } => {
				let k = self.state.transform.k;
				let to = Point::new(node_start.0 + dx / k, node_start.1 + dy / k);
				self.layout.move_node(id, to);
			}
		}
	}

	/// Ends the gesture. A release close to where the press started is a
	/// click: it selects the node under the pointer, or clears the selection
	/// on empty canvas.
	pub fn pointer_up(&mut self, sx: f64, sy: f64) {
		let Some(mut gesture) = self.gesture.take() else {
			return;
		};
		gesture.track(sx, sy);
		self.phase = Phase::Idle;
		if gesture.travelled <= self.config.click_tolerance {
			let hit = self.hit_test(sx, sy);
			self.select_node(hit);
		}
	}

	/// Cancels any gesture and clears hover.
	pub fn pointer_leave(&mut self) {
		self.gesture = None;
		self.phase = Phase::Idle;
		self.set_hover(None);
	}
}

#[cfg(test)]
mod tests {
	use std::cell::RefCell;

	use super::*;
	use crate::chronology::graph::tests::{event, pattern, prophecy};
	use crate::chronology::{BASE_PATTERN, BASE_PROPHECY, assemble};

	fn sample() -> Rc<Graph> {
		let mut flood = event(2, "The Flood", -2348);
		flood.description = Some("Waters cover the earth".into());
		let events = vec![
			event(1, "Creation", -4004),
			flood,
			event(3, "Call of Abraham", -1996),
			event(4, "Exodus", -1491),
		];
		let patterns = vec![pattern(1, "Flood of judgment"), pattern(2, "Covenant renewal")];
		let prophecies = vec![prophecy(3, "Genesis 12:3"), prophecy(6, "Isaiah 54:9 flood oath")];
		Rc::new(assemble(&events, &patterns, &prophecies))
	}

	fn controller() -> ViewController {
		ViewController::new(sample(), ViewConfig::default(), 800.0, 600.0)
	}

	fn visible_ids(c: &ViewController) -> HashSet<NodeId> {
		c.visible_nodes().map(|n| n.id).collect()
	}

	fn assert_edges_closed(c: &ViewController) {
		let nodes = visible_ids(c);
		for edge in c.visible_edges() {
			assert!(nodes.contains(&edge.source) && nodes.contains(&edge.target));
		}
	}

	fn record(c: &mut ViewController) -> Rc<RefCell<Vec<ViewEvent>>> {
		let log = Rc::new(RefCell::new(Vec::new()));
		let sink = log.clone();
		c.subscribe(move |e| sink.borrow_mut().push(e.clone()));
		log
	}

	#[test]
	fn test_defaults_show_everything() {
		let c = controller();
		assert_eq!(c.state().transform, Transform::IDENTITY);
		assert_eq!(c.phase(), Phase::Idle);
		assert_eq!(
			c.status(),
			VisibleStatus::Showing {
				nodes: 8,
				edges: 7
			}
		);
		assert_eq!(c.stats().clusters, 3);
		assert!(c.is_stabilizing());
	}

	#[test]
	fn test_search_is_case_insensitive_over_label_and_tooltip() {
		let mut c = controller();
		c.set_search("FLOOD");
		let ids = visible_ids(&c);
		assert!(ids.contains(&NodeId(2)));
		assert!(ids.contains(&NodeId(BASE_PATTERN + 1)));
		assert!(ids.contains(&NodeId(BASE_PROPHECY + 6)));
		assert!(!ids.contains(&NodeId(1)));
		assert_edges_closed(&c);

		c.set_search("waters cover");
		assert_eq!(visible_ids(&c), HashSet::from([NodeId(2)]));
	}

	#[test]
	fn test_filters_commute() {
		let mut a = controller();
		a.set_type_filter(Some(NodeKind::Event));
		a.set_search("flood");
		let mut b = controller();
		b.set_search("flood");
		b.set_type_filter(Some(NodeKind::Event));
		assert_eq!(visible_ids(&a), visible_ids(&b));
		assert_eq!(visible_ids(&a), HashSet::from([NodeId(2)]));
	}

	#[test]
	fn test_type_filter_drops_cross_kind_edges() {
		let mut c = controller();
		c.set_type_filter(Some(NodeKind::Pattern));
		assert_eq!(
			c.status(),
			VisibleStatus::Showing {
				nodes: 2,
				edges: 0
			}
		);
		c.set_type_filter(Some(NodeKind::Event));
		assert_eq!(c.visible_edges().count(), 3);
		assert_edges_closed(&c);
		c.set_type_filter(None);
		assert_eq!(c.visible_nodes().count(), 8);
	}

	#[test]
	fn test_empty_states_are_distinguished() {
		let mut c = controller();
		c.set_search("no such thing");
		assert_eq!(c.status(), VisibleStatus::NoMatches);
		assert_eq!(c.visible_edges().count(), 0);

		let empty = ViewController::new(Rc::new(Graph::default()), ViewConfig::default(), 800.0, 600.0);
		assert_eq!(empty.status(), VisibleStatus::NoData);
	}

	#[test]
	fn test_zoom_is_clamped() {
		let mut c = controller();
		for _ in 0..20 {
			c.zoom_by(2.0);
		}
		assert_eq!(c.transform().k, 20.0);
		for _ in 0..20 {
			c.zoom_by(0.1);
		}
		assert_eq!(c.transform().k, 0.5);
		c.zoom_by(0.0);
		c.zoom_by(-3.0);
		c.zoom_by(f64::NAN);
		assert_eq!(c.transform().k, 0.5);
	}

	#[test]
	fn test_zoom_in_out_steps() {
		let mut c = controller();
		c.zoom_in();
		assert!((c.transform().k - 1.2).abs() < 1e-12);
		c.zoom_out();
		assert!((c.transform().k - 0.96).abs() < 1e-12);
	}

	#[test]
	fn test_keyboard_pans_and_zooms() {
		let mut c = controller();
		let log = record(&mut c);
		c.key(KeyAction::PanLeft);
		c.key(KeyAction::PanDown);
		assert_eq!(c.transform(), Transform { x: 10.0, y: -10.0, k: 1.0 });
		c.key(KeyAction::ZoomIn);
		assert!((c.transform().k - 1.02).abs() < 1e-12);
		assert_eq!(log.borrow().len(), 3);

		for _ in 0..2000 {
			c.key(KeyAction::ZoomOut);
		}
		assert_eq!(c.transform().k, c.config().min_scale);

		c.set_mode(ViewMode::Timeline);
		c.key(KeyAction::PanUp);
		c.key(KeyAction::PanRight);
		assert_eq!(c.transform(), Transform { x: -10.0, y: 0.0, k: 1.0 });

		assert_eq!(KeyAction::from_key("ArrowLeft"), Some(KeyAction::PanLeft));
		assert_eq!(KeyAction::from_key("="), Some(KeyAction::ZoomIn));
		assert_eq!(KeyAction::from_key("Enter"), None);
	}

	#[test]
	fn test_fit_to_content_is_idempotent() {
		let mut c = controller();
		c.zoom_by(7.0);
		c.fit_to_content();
		let first = c.transform();
		c.fit_to_content();
		assert_eq!(c.transform(), first);
		assert!(first.k >= 0.5 && first.k <= 20.0);

		// every visible node lands inside the viewport
		for node in c.visible_nodes() {
			let p = c.screen_position(node.id).unwrap();
			assert!(p.x >= 0.0 && p.x <= 800.0);
			assert!(p.y >= 0.0 && p.y <= 600.0);
		}
	}

	#[test]
	fn test_fit_with_nothing_visible_resets_transform() {
		let mut c = controller();
		c.zoom_by(3.0);
		c.set_search("zzz");
		c.fit_to_content();
		assert_eq!(c.transform(), Transform::IDENTITY);
	}

	#[test]
	fn test_selecting_unknown_node_is_a_noop() {
		let mut c = controller();
		c.select_node(Some(NodeId(3)));
		let log = record(&mut c);
		c.select_node(Some(NodeId(9_999_999)));
		assert_eq!(c.selected(), Some(NodeId(3)));
		assert!(log.borrow().is_empty());

		c.set_type_filter(Some(NodeKind::Event));
		c.select_node(Some(NodeId(BASE_PATTERN + 1)));
		assert_eq!(c.selected(), Some(NodeId(3)));
	}

	#[test]
	fn test_filter_hiding_selection_clears_it() {
		let mut c = controller();
		c.select_node(Some(NodeId(1)));
		let log = record(&mut c);
		c.set_search("exodus");
		assert_eq!(c.selected(), None);
		assert!(log.borrow().contains(&ViewEvent::SelectionChanged(None)));
	}

	#[test]
	fn test_reset_restores_defaults() {
		let mut c = controller();
		c.set_search("flood");
		c.set_type_filter(Some(NodeKind::Event));
		c.select_node(Some(NodeId(2)));
		c.zoom_by(4.0);
		c.pan_to(Transform {
			x: 40.0,
			y: 10.0,
			k: 4.0,
		});
		c.reset();
		assert_eq!(c.state(), &ViewState::default());
		assert_eq!(c.visible_nodes().count(), 8);
	}

	#[test]
	fn test_pan_to_clamps_scale() {
		let mut c = controller();
		c.pan_to(Transform {
			x: 5.0,
			y: 6.0,
			k: 100.0,
		});
		assert_eq!(
			c.transform(),
			Transform {
				x: 5.0,
				y: 6.0,
				k: 20.0
			}
		);
		c.pan_to(Transform {
			x: f64::INFINITY,
			y: 0.0,
			k: 1.0,
		});
		assert_eq!(c.transform().x, 5.0);
	}

	#[test]
	fn test_notifications_and_unsubscribe() {
		let mut c = controller();
		let log = record(&mut c);
		c.select_node(Some(NodeId(1)));
		c.zoom_by(2.0);
		assert_eq!(log.borrow()[0], ViewEvent::SelectionChanged(Some(NodeId(1))));
		assert!(matches!(log.borrow()[1], ViewEvent::ViewportChanged(t) if t.k == 2.0));

		let other = c.subscribe(|_| {});
		assert!(c.unsubscribe(other));
		assert!(!c.unsubscribe(other));
	}

	/// Screen position of a node, for driving pointer events.
	fn at(c: &ViewController, id: NodeId) -> (f64, f64) {
		let p = c.screen_position(id).unwrap();
		(p.x, p.y)
	}

	#[test]
	fn test_click_selects_and_empty_click_clears() {
		let mut c = controller();
		let (x, y) = at(&c, NodeId(1));
		c.pointer_down(x, y);
		assert_eq!(c.phase(), Phase::Interacting);
		c.pointer_up(x + 1.0, y);
		assert_eq!(c.phase(), Phase::Idle);
		assert_eq!(c.selected(), Some(NodeId(1)));

		c.pointer_down(-500.0, -500.0);
		c.pointer_up(-500.0, -500.0);
		assert_eq!(c.selected(), None);
	}

	#[test]
	fn test_drag_moves_and_pins_node() {
		let mut c = controller();
		let (x, y) = at(&c, NodeId(1));
		let before = c.position(NodeId(1)).unwrap();
		c.pointer_down(x, y);
		c.pointer_move(x + 50.0, y + 20.0);
		c.pointer_up(x + 50.0, y + 20.0);
		let after = c.position(NodeId(1)).unwrap();
		assert!((after.x - before.x - 50.0).abs() < 1e-6);
		assert!((after.y - before.y - 20.0).abs() < 1e-6);
		assert_eq!(c.selected(), None);
	}

	#[test]
	fn test_pan_gesture_composes_with_zoom() {
		let mut c = controller();
		c.pointer_down(-300.0, -300.0);
		c.pointer_move(-280.0, -300.0);
		assert_eq!(c.transform().x, 20.0);
		c.zoom_by(2.0);
		let zoomed = c.transform();
		assert_eq!(zoomed.k, 2.0);
		// further movement pans relative to the zoomed transform
		c.pointer_move(-270.0, -300.0);
		assert_eq!(c.transform().x, zoomed.x + 10.0);
		assert_eq!(c.transform().k, 2.0);
		c.pointer_up(-270.0, -300.0);
		assert_eq!(c.phase(), Phase::Idle);
	}

	#[test]
	fn test_wheel_zooms_about_pointer() {
		let mut c = controller();
		let world_before = c.state().to_world(c.viewport(), 100.0, 100.0);
		c.wheel(100.0, 100.0, -1.0);
		assert!((c.transform().k - 1.1).abs() < 1e-12);
		let world_after = c.state().to_world(c.viewport(), 100.0, 100.0);
		assert!((world_before.0 - world_after.0).abs() < 1e-9);
		assert!((world_before.1 - world_after.1).abs() < 1e-9);
	}

	#[test]
	fn test_tooltip_appears_after_delay() {
		let mut c = controller();
		c.layout.cancel();
		let (x, y) = at(&c, NodeId(2));
		c.pointer_move(x, y);
		assert_eq!(c.hovered(), Some(NodeId(2)));
		assert!(c.is_highlighted(NodeId(1)));
		assert!(c.tooltip().is_none());
		c.tick(0.05);
		assert!(c.tooltip().is_none());
		c.tick(0.06);
		let tip = c.tooltip().unwrap();
		assert_eq!(tip.node, NodeId(2));
		assert!(tip.text.contains("Waters cover the earth"));

		c.pointer_leave();
		assert!(c.tooltip().is_none());
		assert_eq!(c.hovered(), None);
	}

	#[test]
	fn test_filter_change_restarts_stabilization() {
		let mut c = controller();
		let generation = c.layout.generation();
		c.set_search("flood");
		assert_eq!(c.layout.generation(), generation + 1);
		c.set_search("flood");
		assert_eq!(c.layout.generation(), generation + 1);
	}

	#[test]
	fn test_timeline_mode_uses_time_scale() {
		let mut c = controller();
		c.set_mode(ViewMode::Timeline);
		assert!(!c.is_stabilizing());
		let domain = c.visible_domain().unwrap();
		assert_eq!(domain, (-4004.0, -1491.0));
		c.zoom_by(2.0);
		let (lo, hi) = c.visible_domain().unwrap();
		assert!(hi - lo < -1491.0 + 4004.0);

		c.fit_to_content();
		let fitted = c.transform();
		c.fit_to_content();
		assert_eq!(c.transform(), fitted);
		assert_eq!(fitted.y, 0.0);
	}

	#[test]
	fn test_new_graph_keeps_filters_and_drops_stale_selection() {
		let mut c = controller();
		c.set_type_filter(Some(NodeKind::Event));
		c.select_node(Some(NodeId(4)));
		let smaller = assemble(&[event(1, "Creation", -4004), event(2, "Flood", -2348)], &[], &[]);
		c.set_graph(Rc::new(smaller));
		assert_eq!(c.selected(), None);
		assert_eq!(c.state().type_filter, Some(NodeKind::Event));
		assert_eq!(c.visible_nodes().count(), 2);
	}

	mod properties {
		use proptest::prelude::*;

		use super::*;

		#[derive(Clone, Debug)]
		enum Op {
			Search(String),
			Filter(Option<NodeKind>),
			Zoom(f64),
			Select(i64),
			Reset,
			Mode(ViewMode),
			Fit,
		}

		fn arb_kind() -> impl Strategy<Value = Option<NodeKind>> {
			prop::option::of(prop::sample::select(NodeKind::ALL.to_vec()))
		}

		fn arb_search() -> impl Strategy<Value = String> {
			prop_oneof![
				Just(String::new()),
				Just("flood".to_string()),
				Just("GENESIS".to_string()),
				Just("covenant".to_string()),
				"[a-z ]{0,4}",
			]
		}

		fn arb_op() -> impl Strategy<Value = Op> {
			prop_oneof![
				arb_search().prop_map(Op::Search),
				arb_kind().prop_map(Op::Filter),
				(0.01f64..10.0).prop_map(Op::Zoom),
				prop_oneof![0i64..8, Just(BASE_PATTERN + 1), Just(9_999_999)].prop_map(Op::Select),
				Just(Op::Reset),
				prop::sample::select(vec![ViewMode::Network, ViewMode::Timeline]).prop_map(Op::Mode),
				Just(Op::Fit),
			]
		}

		fn apply(c: &mut ViewController, op: Op) {
			match op {
				Op::Search(q) => c.set_search(q),
				Op::Filter(k) => c.set_type_filter(k),
				Op::Zoom(f) => c.zoom_by(f),
				Op::Select(id) => c.select_node(Some(NodeId(id))),
				Op::Reset => c.reset(),
				Op::Mode(m) => c.set_mode(m),
				Op::Fit => c.fit_to_content(),
			}
		}

		proptest! {
			#[test]
			fn prop_filters_commute(query in arb_search(), kind in arb_kind()) {
				let mut a = controller();
				a.set_type_filter(kind);
				a.set_search(query.clone());
				let mut b = controller();
				b.set_search(query);
				b.set_type_filter(kind);
				prop_assert_eq!(visible_ids(&a), visible_ids(&b));
			}

			#[test]
			fn prop_visible_edges_stay_closed(ops in prop::collection::vec(arb_op(), 0..24)) {
				let mut c = controller();
				for op in ops {
					apply(&mut c, op);
					let nodes = visible_ids(&c);
					for edge in c.visible_edges() {
						prop_assert!(nodes.contains(&edge.source) && nodes.contains(&edge.target));
					}
					if let Some(id) = c.selected() {
						prop_assert!(nodes.contains(&id));
					}
					prop_assert_eq!(c.phase(), Phase::Idle);
				}
			}

			#[test]
			fn prop_zoom_stays_in_range(factors in prop::collection::vec(0.01f64..10.0, 1..40)) {
				let mut c = controller();
				let (min, max) = (c.config().min_scale, c.config().max_scale);
				for f in factors {
					c.zoom_by(f);
					let k = c.transform().k;
					prop_assert!((min..=max).contains(&k), "scale {} escaped [{}, {}]", k, min, max);
				}
			}
		}
	}
}
