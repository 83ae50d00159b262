//! Static SVG snapshot of what the view currently shows.

use std::fmt::Write;

use super::controller::ViewController;
use super::state::{ViewMode, VisibleStatus};
use super::style::{self, Shape};
use crate::chronology::{Entity, format_year};

/// Download name for SVG exports.
pub const SVG_FILE_NAME: &str = "network-graph.svg";
/// Download name for PNG exports.
pub const PNG_FILE_NAME: &str = "network-graph.png";

/// Serializes the visible nodes and edges under the current transform.
/// Reads the controller only; the view state is left as it was.
pub fn export_svg(view: &ViewController) -> String {
	let vp = view.viewport();
	let mut out = String::new();
	let _ = writeln!(
		out,
		r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="Inter, sans-serif">"#,
		w = vp.width,
		h = vp.height
	);
	let _ = writeln!(
		out,
		r#"<rect width="100%" height="100%" fill="{}"/>"#,
		style::BACKGROUND
	);

	if let Some(message) = empty_message(view.status()) {
		let _ = writeln!(
			out,
			r#"<text x="{}" y="{}" text-anchor="middle" fill="{}" font-size="14">{}</text>"#,
			vp.width / 2.0,
			vp.height / 2.0,
			style::MUTED,
			message
		);
		out.push_str("</svg>\n");
		return out;
	}

	if view.mode() == ViewMode::Timeline {
		write_axis(view, &mut out);
	}
	write_edges(view, &mut out);
	write_nodes(view, &mut out);
	out.push_str("</svg>\n");
	out
}

/// Text shown instead of the graph when nothing is visible.
pub fn empty_message(status: VisibleStatus) -> Option<&'static str> {
	match status {
		VisibleStatus::NoData => Some("No data loaded"),
		VisibleStatus::NoMatches => Some("No nodes match the current filters"),
		VisibleStatus::Showing { .. } => None,
	}
}

fn write_axis(view: &ViewController, out: &mut String) {
	let Some(timeline) = view.timeline() else {
		return;
	};
	let t = view.transform();
	let vp = view.viewport();
	let m = &view.config().timeline;
	let axis_y = vp.height - m.margin_bottom;

	for lane in timeline.bands.domain() {
		if let Some(y) = timeline.bands.band(lane) {
			let _ = writeln!(
				out,
				r#"<rect x="{x}" y="{y:.1}" width="{w}" height="{h:.1}" fill="none" stroke="{c}" stroke-dasharray="4,4"/>"#,
				x = m.margin_left,
				w = (vp.width - m.margin_left - m.margin_right).max(0.0),
				h = timeline.bands.bandwidth(),
				c = style::GRID
			);
			let _ = writeln!(
				out,
				r#"<text x="{:.1}" y="{:.1}" text-anchor="end" fill="{}" font-size="11">{}</text>"#,
				m.margin_left - 8.0,
				y + timeline.bands.bandwidth() / 2.0 + 4.0,
				style::MUTED,
				escape(lane)
			);
		}
	}

	let _ = writeln!(
		out,
		r#"<line x1="{}" y1="{axis_y}" x2="{}" y2="{axis_y}" stroke="{}"/>"#,
		m.margin_left,
		vp.width - m.margin_right,
		style::GRID
	);
	let years = timeline.years.rescale(t.k, t.x);
	for year in years.ticks(10) {
		let x = years.scale(year);
		let _ = writeln!(
			out,
			r#"<text x="{x:.1}" y="{:.1}" text-anchor="middle" fill="{}" font-size="12">{}</text>"#,
			axis_y + 18.0,
			style::MUTED,
			format_year(year as i64)
		);
	}

	for node in view.visible_nodes() {
		let (Some(span), Entity::Event(e)) = (timeline.span(node.id), &node.entity) else {
			continue;
		};
		let (x1, _) = view.state().to_screen(vp, span.x1, span.y);
		let (x2, _) = view.state().to_screen(vp, span.x2, span.y);
		let _ = writeln!(
			out,
			r#"<line x1="{x1:.1}" y1="{y:.1}" x2="{x2:.1}" y2="{y:.1}" stroke="{}" stroke-width="3" opacity="0.4"/>"#,
			style::event_type_color(&e.event_type),
			y = span.y
		);
	}
}

fn write_edges(view: &ViewController, out: &mut String) {
	for edge in view.visible_edges() {
		let (Some(a), Some(b)) = (
			view.screen_position(edge.source),
			view.screen_position(edge.target),
		) else {
			continue;
		};
		let _ = writeln!(
			out,
			r#"<line x1="{:.1}" y1="{:.1}" x2="{:.1}" y2="{:.1}" stroke="{}" stroke-width="2"/>"#,
			a.x,
			a.y,
			b.x,
			b.y,
			style::edge_color(edge.kind)
		);
	}
}

fn write_nodes(view: &ViewController, out: &mut String) {
	let mode = view.mode();
	let k = view.transform().k;
	for node in view.visible_nodes() {
		let Some(p) = view.screen_position(node.id) else {
			continue;
		};
		let kind = style::node_style(node.kind);
		let r = style::screen_radius(node, mode, k);
		let fill = match (&node.entity, mode) {
			(Entity::Event(e), ViewMode::Timeline) => style::event_type_color(&e.event_type),
			_ => kind.fill,
		};
		let stroke = if view.selected() == Some(node.id) {
			style::SELECTED_RING
		} else {
			kind.border
		};
		match kind.shape {
			Shape::Dot => {
				let _ = writeln!(
					out,
					r#"<circle cx="{:.1}" cy="{:.1}" r="{r:.1}" fill="{fill}" stroke="{stroke}" stroke-width="2"/>"#,
					p.x, p.y
				);
			}
			shape => {
				let points: Vec<String> = style::outline(shape, p.x, p.y, r)
					.into_iter()
					.map(|(x, y)| format!("{x:.1},{y:.1}"))
					.collect();
				let _ = writeln!(
					out,
					r#"<polygon points="{}" fill="{fill}" stroke="{stroke}" stroke-width="2"/>"#,
					points.join(" ")
				);
			}
		}
		let _ = writeln!(
			out,
			r#"<text x="{:.1}" y="{:.1}" fill="{}" font-size="12"><title>{}</title>{}</text>"#,
			p.x + r + 3.0,
			p.y + 4.0,
			style::LABEL,
			escape(&node.tooltip),
			escape(&node.label)
		);
	}
}

fn escape(text: &str) -> String {
	let mut out = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&apos;"),
			c => out.push(c),
		}
	}
	out
}

#[cfg(test)]
mod tests {
	use std::rc::Rc;

	use super::*;
	use crate::chronology::graph::tests::{event, pattern, prophecy};
	use crate::chronology::{Graph, assemble};
	use crate::view::ViewConfig;

	fn view() -> ViewController {
		let graph = assemble(
			&[event(1, "Creation", -4004), event(2, "Flood & Ark", -2348)],
			&[pattern(1, "Judgment")],
			&[prophecy(2, "Genesis <3:15>")],
		);
		ViewController::new(Rc::new(graph), ViewConfig::default(), 640.0, 480.0)
	}

	#[test]
	fn test_svg_contains_visible_nodes_only() {
		let mut v = view();
		let svg = export_svg(&v);
		assert!(svg.starts_with("<svg"));
		assert!(svg.trim_end().ends_with("</svg>"));
		assert!(svg.contains("Flood &amp; Ark"));
		assert!(svg.contains("Genesis &lt;3:15&gt;"));
		assert_eq!(svg.matches("<circle").count(), 2);
		assert_eq!(svg.matches("<polygon").count(), 2);

		v.set_search("creation");
		let svg = export_svg(&v);
		assert_eq!(svg.matches("<circle").count(), 1);
		assert_eq!(svg.matches("<polygon").count(), 0);
	}

	#[test]
	fn test_export_does_not_touch_state() {
		let mut v = view();
		v.zoom_by(2.5);
		v.select_node(Some(crate::chronology::NodeId(1)));
		let before = v.state().clone();
		let svg = export_svg(&v);
		assert_eq!(v.state(), &before);
		assert!(svg.contains(style::SELECTED_RING));
	}

	#[test]
	fn test_empty_states_render_a_message() {
		let mut v = view();
		v.set_search("nothing here");
		assert!(export_svg(&v).contains("No nodes match the current filters"));

		let empty = ViewController::new(Rc::new(Graph::default()), ViewConfig::default(), 100.0, 100.0);
		assert!(export_svg(&empty).contains("No data loaded"));
	}

	#[test]
	fn test_timeline_export_has_axis() {
		let mut v = view();
		v.set_mode(ViewMode::Timeline);
		let svg = export_svg(&v);
		assert!(svg.contains(" BC</text>"));
		assert!(svg.contains("Patriarchal"));
	}
}
