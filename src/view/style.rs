//! Colours, shapes and sizes shared by the canvas renderer and SVG export.

use super::state::ViewMode;
use crate::chronology::{EdgeKind, Entity, Node, NodeKind};

/// Canvas background.
pub const BACKGROUND: &str = "#f8fafc";
/// Label text.
pub const LABEL: &str = "#1e293b";
/// Secondary text.
pub const MUTED: &str = "#64748b";
/// Axis and lane lines.
pub const GRID: &str = "#cbd5e1";
/// Ring around the selected node.
pub const SELECTED_RING: &str = "#f59e0b";

/// Node outline shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
	/// Circle, used for events.
	Dot,
	/// Used for patterns.
	Diamond,
	/// Star, used for prophecies.
	Star,
}

/// Colours and geometry of one node kind.
pub struct KindStyle {
	/// Base fill.
	pub fill: &'static str,
	/// Outline colour.
	pub border: &'static str,
	/// Fill while highlighted by hover.
	pub highlight: &'static str,
	/// Outline shape.
	pub shape: Shape,
	/// Network-mode radius in world units.
	pub radius: f64,
}

/// Style of a node kind.
pub fn node_style(kind: NodeKind) -> KindStyle {
	match kind {
		NodeKind::Event => KindStyle {
			fill: "#3b82f6",
			border: "#1e40af",
			highlight: "#60a5fa",
			shape: Shape::Dot,
			radius: 7.5,
		},
		NodeKind::Pattern => KindStyle {
			fill: "#10b981",
			border: "#047857",
			highlight: "#34d399",
			shape: Shape::Diamond,
			radius: 12.5,
		},
		NodeKind::Prophecy => KindStyle {
			fill: "#8b5cf6",
			border: "#6d28d9",
			highlight: "#a78bfa",
			shape: Shape::Star,
			radius: 12.5,
		},
	}
}

/// Stroke colour of an edge kind.
pub fn edge_color(kind: EdgeKind) -> &'static str {
	match kind {
		EdgeKind::MatchesPattern => "#10b981",
		EdgeKind::FulfilledBy => "#8b5cf6",
		EdgeKind::PrecededBy => "#94a3b8",
	}
}

const EVENT_TYPES: &[(&str, &str)] = &[
	("CREATION", "#3b82f6"),
	("JUDGMENT", "#ef4444"),
	("COVENANT", "#8b5cf6"),
	("DELIVERANCE", "#10b981"),
	("CONQUEST", "#f59e0b"),
	("APOSTASY", "#dc2626"),
	("PROPHECY", "#6366f1"),
	("FULFILLMENT", "#ec4899"),
	("RESTORATION", "#14b8a6"),
	("INSTITUTION", "#06b6d4"),
];

/// Timeline marker colour by event type; unknown types get the event blue.
pub fn event_type_color(event_type: &str) -> &'static str {
	EVENT_TYPES
		.iter()
		.find(|(t, _)| t.eq_ignore_ascii_case(event_type))
		.map_or(node_style(NodeKind::Event).fill, |&(_, c)| c)
}

/// Timeline marker radius in pixels.
pub fn timeline_radius(pivotal: bool) -> f64 {
	if pivotal { 8.0 } else { 5.0 }
}

/// On-screen radius of a node under the current mode and scale.
pub fn screen_radius(node: &Node, mode: ViewMode, k: f64) -> f64 {
	match (mode, &node.entity) {
		(ViewMode::Network, _) => node_style(node.kind).radius * k,
		(ViewMode::Timeline, Entity::Event(e)) => timeline_radius(e.is_pivotal),
		(ViewMode::Timeline, _) => 7.0,
	}
}

/// Outline of a shape centred on `(x, y)` as a closed polygon. Dots return
/// an empty list; callers draw them as circles.
pub fn outline(shape: Shape, x: f64, y: f64, r: f64) -> Vec<(f64, f64)> {
	match shape {
		Shape::Dot => Vec::new(),
		Shape::Diamond => vec![(x, y - r), (x + r, y), (x, y + r), (x - r, y)],
		Shape::Star => (0..10)
			.map(|i| {
				let angle = std::f64::consts::PI * (i as f64) / 5.0 - std::f64::consts::FRAC_PI_2;
				let radius = if i % 2 == 0 { r } else { r * 0.45 };
				(x + radius * angle.cos(), y + radius * angle.sin())
			})
			.collect(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_event_type_colors() {
		assert_eq!(event_type_color("JUDGMENT"), "#ef4444");
		assert_eq!(event_type_color("judgment"), "#ef4444");
		assert_eq!(event_type_color("MIGRATION"), "#3b82f6");
	}

	#[test]
	fn test_star_outline_alternates_radius() {
		let points = outline(Shape::Star, 0.0, 0.0, 10.0);
		assert_eq!(points.len(), 10);
		let (x, y) = points[0];
		assert!(x.abs() < 1e-9 && (y + 10.0).abs() < 1e-9);
		assert!(outline(Shape::Dot, 0.0, 0.0, 10.0).is_empty());
	}
}
