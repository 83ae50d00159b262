//! Interaction state owned by one view instance.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::chronology::{NodeId, NodeKind};

/// Zoom and pan. `x`/`y` are screen-space offsets, `k` the scale.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
	/// Horizontal pan in pixels.
	pub x: f64,
	/// Vertical pan in pixels.
	pub y: f64,
	/// Scale factor.
	pub k: f64,
}

impl Default for Transform {
	fn default() -> Self {
		Self::IDENTITY
	}
}

impl Transform {
	/// No pan, scale 1.
	pub const IDENTITY: Transform = Transform {
		x: 0.0,
		y: 0.0,
		k: 1.0,
	};

	/// Whether all components are finite.
	pub fn is_finite(&self) -> bool {
		self.x.is_finite() && self.y.is_finite() && self.k.is_finite()
	}
}

/// How node positions are derived.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
	/// Force-directed network.
	#[default]
	Network,
	/// Events on a horizontal time axis, grouped by era.
	Timeline,
}

/// Screen size of the drawing surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
	/// Width in pixels.
	pub width: f64,
	/// Height in pixels.
	pub height: f64,
}

impl Viewport {
	/// Centre point in pixels.
	pub fn center(&self) -> (f64, f64) {
		(self.width / 2.0, self.height / 2.0)
	}
}

/// User-facing view state: what is shown and how.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewState {
	/// Pan and scale.
	pub transform: Transform,
	/// Network or timeline layout.
	pub mode: ViewMode,
	/// Active search query.
	pub search: String,
	/// Kind restriction, if any.
	pub type_filter: Option<NodeKind>,
	/// Selected node, if any.
	pub selected: Option<NodeId>,
}

impl ViewState {
	/// Screen-space origin of world coordinates. The network layout is
	/// centred on the viewport; the timeline layout is already in pixels.
	fn origin(&self, viewport: Viewport) -> (f64, f64) {
		match self.mode {
			ViewMode::Network => viewport.center(),
			ViewMode::Timeline => (0.0, 0.0),
		}
	}

	/// World to canvas pixels.
	pub fn to_screen(&self, viewport: Viewport, wx: f64, wy: f64) -> (f64, f64) {
		let (ox, oy) = self.origin(viewport);
		let t = self.transform;
		match self.mode {
			ViewMode::Network => (ox + wx * t.k + t.x, oy + wy * t.k + t.y),
			ViewMode::Timeline => (ox + wx * t.k + t.x, wy),
		}
	}

	/// Canvas pixels to world.
	pub fn to_world(&self, viewport: Viewport, sx: f64, sy: f64) -> (f64, f64) {
		let (ox, oy) = self.origin(viewport);
		let t = self.transform;
		match self.mode {
			ViewMode::Network => ((sx - ox - t.x) / t.k, (sy - oy - t.y) / t.k),
			ViewMode::Timeline => ((sx - ox - t.x) / t.k, sy),
		}
	}

	/// Transform after scaling to `k` while keeping the world point under
	/// screen position `(sx, sy)` fixed.
	pub fn zoomed_about(&self, viewport: Viewport, sx: f64, sy: f64, k: f64) -> Transform {
		let (ox, oy) = self.origin(viewport);
		let t = self.transform;
		let ratio = k / t.k;
		let x = (sx - ox) - (sx - ox - t.x) * ratio;
		let y = match self.mode {
			ViewMode::Network => (sy - oy) - (sy - oy - t.y) * ratio,
			ViewMode::Timeline => t.y,
		};
		Transform { x, y, k }
	}
}

/// Keyboard navigation command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
	/// Left arrow.
	PanLeft,
	/// Right arrow.
	PanRight,
	/// Up arrow.
	PanUp,
	/// Down arrow.
	PanDown,
	/// `+`, `=` or PageUp.
	ZoomIn,
	/// `-`, `_` or PageDown.
	ZoomOut,
}

impl KeyAction {
	/// Maps a DOM `KeyboardEvent.key` value.
	pub fn from_key(key: &str) -> Option<Self> {
		match key {
			"ArrowLeft" => Some(Self::PanLeft),
			"ArrowRight" => Some(Self::PanRight),
			"ArrowUp" => Some(Self::PanUp),
			"ArrowDown" => Some(Self::PanDown),
			"+" | "=" | "PageUp" => Some(Self::ZoomIn),
			"-" | "_" | "PageDown" => Some(Self::ZoomOut),
			_ => None,
		}
	}
}

/// Coarse state of the controller's state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
	/// No interaction in flight.
	#[default]
	Idle,
	/// Visible set recompute in progress.
	Filtering,
	/// A pointer gesture is live.
	Interacting,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum GestureKind {
	Pan { transform_start: Transform },
	DragNode { id: NodeId, node_start: (f64, f64) },
}

/// Pointer-driven gesture between pointer-down and pointer-up.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Gesture {
	pub kind: GestureKind,
	pub down_at: (f64, f64),
	/// Reference point the gesture deltas are measured from.
	pub anchor: (f64, f64),
	pub last: (f64, f64),
	pub travelled: f64,
}

impl Gesture {
	pub fn new(kind: GestureKind, x: f64, y: f64) -> Self {
		Self {
			kind,
			down_at: (x, y),
			anchor: (x, y),
			last: (x, y),
			travelled: 0.0,
		}
	}

	pub fn track(&mut self, x: f64, y: f64) -> (f64, f64) {
		self.last = (x, y);
		let (dx, dy) = (x - self.down_at.0, y - self.down_at.1);
		self.travelled = self.travelled.max((dx * dx + dy * dy).sqrt());
		(x - self.anchor.0, y - self.anchor.1)
	}
}

#[derive(Clone, Debug, Default)]
pub(crate) struct HoverState {
	pub node: Option<NodeId>,
	pub neighbors: HashSet<NodeId>,
	pub pointer: (f64, f64),
	/// Seconds the current node has been hovered.
	pub elapsed: f64,
	pub tooltip_visible: bool,
	/// 0..1 fade of the neighbourhood highlight.
	pub highlight_t: f64,
}

/// Tooltip to draw next to the hovered node.
#[derive(Clone, Debug, PartialEq)]
pub struct Tooltip {
	/// Hovered node.
	pub node: NodeId,
	/// Multi-line text to show.
	pub text: String,
	/// Anchor x in canvas pixels.
	pub x: f64,
	/// Anchor y in canvas pixels.
	pub y: f64,
}

/// What the canvas should show.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VisibleStatus {
	/// The graph itself is empty.
	NoData,
	/// The graph has nodes but the active filters hide all of them.
	NoMatches,
	/// At least one node is visible.
	Showing { nodes: usize, edges: usize },
}

/// Summary of the visible set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ViewStats {
	/// Visible node count.
	pub nodes: usize,
	/// Visible edge count.
	pub edges: usize,
	/// Distinct node kinds among visible nodes.
	pub clusters: usize,
}

/// Notification delivered to subscribers.
#[derive(Clone, Debug, PartialEq)]
pub enum ViewEvent {
	/// Selection was set or cleared.
	SelectionChanged(Option<NodeId>),
	/// Pan or scale changed.
	ViewportChanged(Transform),
	/// The visible set was recomputed.
	VisibleChanged(VisibleStatus),
}

/// Handle returned by `ViewController::subscribe`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);
