use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use crate::chronology::{Entity, format_year};
use crate::view::style::{self, Shape};
use crate::view::{ViewController, ViewMode, empty_message};

const TOOLTIP_WIDTH: f64 = 220.0;
const TOOLTIP_LINE: f64 = 15.0;

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

/// Draws one frame of the view into the canvas context.
pub fn render(view: &ViewController, ctx: &CanvasRenderingContext2d) {
	let vp = view.viewport();
	ctx.set_fill_style_str(style::BACKGROUND);
	ctx.fill_rect(0.0, 0.0, vp.width, vp.height);

	if let Some(message) = empty_message(view.status()) {
		ctx.set_fill_style_str(style::MUTED);
		ctx.set_font("14px Inter, sans-serif");
		ctx.set_text_align("center");
		let _ = ctx.fill_text(message, vp.width / 2.0, vp.height / 2.0);
		ctx.set_text_align("start");
		return;
	}

	if view.mode() == ViewMode::Timeline {
		draw_axis(view, ctx);
	}
	draw_edges(view, ctx);
	draw_nodes(view, ctx);
	draw_tooltip(view, ctx);
}

fn draw_axis(view: &ViewController, ctx: &CanvasRenderingContext2d) {
	let Some(timeline) = view.timeline() else {
		return;
	};
	let (vp, t) = (view.viewport(), view.transform());
	let m = &view.config().timeline;
	let (left, right) = (m.margin_left, vp.width - m.margin_right);
	let axis_y = vp.height - m.margin_bottom;

	ctx.set_stroke_style_str(style::GRID);
	ctx.set_line_width(1.0);
	let _ = ctx.set_line_dash(&js_sys::Array::of2(
		&JsValue::from_f64(4.0),
		&JsValue::from_f64(4.0),
	));
	ctx.set_font("11px Inter, sans-serif");
	ctx.set_text_align("end");
	for lane in timeline.bands.domain() {
		let Some(y) = timeline.bands.band(lane) else {
			continue;
		};
		ctx.stroke_rect(left, y, right - left, timeline.bands.bandwidth());
		ctx.set_fill_style_str(style::MUTED);
		let _ = ctx.fill_text(lane, left - 8.0, y + timeline.bands.bandwidth() / 2.0 + 4.0);
	}
	let _ = ctx.set_line_dash(&js_sys::Array::new());

	ctx.begin_path();
	ctx.move_to(left, axis_y);
	ctx.line_to(right, axis_y);
	ctx.stroke();

	ctx.set_text_align("center");
	ctx.set_font("12px Inter, sans-serif");
	let years = timeline.years.rescale(t.k, t.x);
	for year in years.ticks(10) {
		let x = years.scale(year);
		if x < left || x > right {
			continue;
		}
		ctx.begin_path();
		ctx.move_to(x, axis_y);
		ctx.line_to(x, axis_y + 6.0);
		ctx.stroke();
		let _ = ctx.fill_text(&format_year(year as i64), x, axis_y + 20.0);
	}
	ctx.set_text_align("start");

	// duration bars
	ctx.set_line_width(3.0);
	ctx.set_global_alpha(0.4);
	for node in view.visible_nodes() {
		let (Some(span), Entity::Event(e)) = (timeline.span(node.id), &node.entity) else {
			continue;
		};
		let (x1, _) = view.state().to_screen(vp, span.x1, span.y);
		let (x2, _) = view.state().to_screen(vp, span.x2, span.y);
		ctx.set_stroke_style_str(style::event_type_color(&e.event_type));
		ctx.begin_path();
		ctx.move_to(x1, span.y);
		ctx.line_to(x2, span.y);
		ctx.stroke();
	}
	ctx.set_global_alpha(1.0);
}

fn draw_edges(view: &ViewController, ctx: &CanvasRenderingContext2d) {
	let t = ease_out_cubic(view.highlight_t());
	let has_highlight = view.hovered().is_some() && t > 0.0;
	let (mode, k) = (view.mode(), view.transform().k);
	let arrow_size = 8.0;

	for edge in view.visible_edges() {
		let (Some(a), Some(b)) = (
			view.screen_position(edge.source),
			view.screen_position(edge.target),
		) else {
			continue;
		};
		let (dx, dy) = (b.x - a.x, b.y - a.y);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < 0.001 {
			continue;
		}

		let is_highlighted = view.is_highlighted(edge.source) && view.is_highlighted(edge.target);
		// t=0: every edge at base alpha; t=1: highlighted edges brighten, others dim
		let alpha = match (has_highlight, is_highlighted) {
			(false, _) => 0.6,
			(true, true) => 0.6 + 0.3 * t,
			(true, false) => 0.6 - 0.45 * t,
		};
		let (r_src, r_tgt) = match (view.graph().node(edge.source), view.graph().node(edge.target)) {
			(Some(s), Some(g)) => (
				style::screen_radius(s, mode, k),
				style::screen_radius(g, mode, k),
			),
			_ => (0.0, 0.0),
		};

		ctx.set_global_alpha(alpha);
		ctx.set_stroke_style_str(style::edge_color(edge.kind));
		ctx.set_fill_style_str(style::edge_color(edge.kind));
		ctx.set_line_width(if is_highlighted && has_highlight { 2.5 } else { 1.5 });

		let (ux, uy) = (dx / dist, dy / dist);
		ctx.begin_path();
		ctx.move_to(a.x + ux * r_src, a.y + uy * r_src);
		ctx.line_to(b.x - ux * (r_tgt + arrow_size), b.y - uy * (r_tgt + arrow_size));
		ctx.stroke();

		let (tip_x, tip_y) = (b.x - ux * r_tgt, b.y - uy * r_tgt);
		let (back_x, back_y) = (tip_x - ux * arrow_size, tip_y - uy * arrow_size);
		let (px, py) = (-uy * arrow_size * 0.5, ux * arrow_size * 0.5);
		ctx.begin_path();
		ctx.move_to(tip_x, tip_y);
		ctx.line_to(back_x + px, back_y + py);
		ctx.line_to(back_x - px, back_y - py);
		ctx.close_path();
		ctx.fill();
	}
	ctx.set_global_alpha(1.0);
}

fn trace_shape(ctx: &CanvasRenderingContext2d, shape: Shape, x: f64, y: f64, r: f64) {
	ctx.begin_path();
	match shape {
		Shape::Dot => {
			let _ = ctx.arc(x, y, r, 0.0, 2.0 * PI);
		}
		shape => {
			let points = style::outline(shape, x, y, r);
			if let Some(&(x0, y0)) = points.first() {
				ctx.move_to(x0, y0);
				for &(px, py) in &points[1..] {
					ctx.line_to(px, py);
				}
				ctx.close_path();
			}
		}
	}
}

fn draw_nodes(view: &ViewController, ctx: &CanvasRenderingContext2d) {
	let t = ease_out_cubic(view.highlight_t());
	let has_highlight = view.hovered().is_some() && t > 0.0;
	let (mode, k) = (view.mode(), view.transform().k);

	for node in view.visible_nodes() {
		let Some(p) = view.screen_position(node.id) else {
			continue;
		};
		let kind = style::node_style(node.kind);
		let highlighted = view.is_highlighted(node.id);
		let hovered = view.hovered() == Some(node.id);
		let base = style::screen_radius(node, mode, k);
		let (alpha, radius) = match (has_highlight, highlighted) {
			(true, false) => (1.0 - 0.7 * t, base * (1.0 - 0.15 * t)),
			(true, true) if hovered => (1.0, base * (1.0 + 0.35 * t)),
			(true, true) => (1.0, base * (1.0 + 0.2 * t)),
			(false, _) => (1.0, base),
		};

		if hovered && t > 0.01 {
			let glow = radius * 2.2;
			if let Ok(gradient) = ctx.create_radial_gradient(p.x, p.y, radius * 0.3, p.x, p.y, glow) {
				let _ = gradient.add_color_stop(0.0, &format!("rgba(59, 130, 246, {})", 0.35 * t));
				let _ = gradient.add_color_stop(1.0, "rgba(59, 130, 246, 0)");
				ctx.begin_path();
				let _ = ctx.arc(p.x, p.y, glow, 0.0, 2.0 * PI);
				#[allow(deprecated)]
				ctx.set_fill_style(&gradient);
				ctx.fill();
			}
		}

		let fill = match (&node.entity, mode) {
			(Entity::Event(e), ViewMode::Timeline) => style::event_type_color(&e.event_type),
			_ if highlighted && has_highlight => kind.highlight,
			_ => kind.fill,
		};
		ctx.set_global_alpha(alpha);
		trace_shape(ctx, kind.shape, p.x, p.y, radius);
		ctx.set_fill_style_str(fill);
		ctx.fill();
		ctx.set_stroke_style_str(kind.border);
		ctx.set_line_width(2.0);
		ctx.stroke();

		if view.selected() == Some(node.id) {
			trace_shape(ctx, kind.shape, p.x, p.y, radius + 4.0);
			ctx.set_stroke_style_str(style::SELECTED_RING);
			ctx.set_line_width(3.0);
			ctx.stroke();
		}

		if mode == ViewMode::Network || hovered || view.selected() == Some(node.id) {
			ctx.set_fill_style_str(style::LABEL);
			ctx.set_font(&format!("{}px Inter, sans-serif", (12.0 * k.sqrt()).clamp(9.0, 18.0)));
			let _ = ctx.fill_text(&node.label, p.x + radius + 3.0, p.y + 4.0);
		}
		ctx.set_global_alpha(1.0);
	}
}

fn draw_tooltip(view: &ViewController, ctx: &CanvasRenderingContext2d) {
	let Some(tip) = view.tooltip() else {
		return;
	};
	let vp = view.viewport();
	let lines: Vec<&str> = tip.text.lines().collect();
	let height = lines.len() as f64 * TOOLTIP_LINE + 12.0;
	let x = (tip.x - TOOLTIP_WIDTH / 2.0).clamp(4.0, (vp.width - TOOLTIP_WIDTH - 4.0).max(4.0));
	let y = if tip.y - height - 16.0 > 0.0 {
		tip.y - height - 16.0
	} else {
		tip.y + 16.0
	};

	ctx.set_fill_style_str("white");
	ctx.set_stroke_style_str(style::GRID);
	ctx.set_line_width(1.0);
	ctx.fill_rect(x, y, TOOLTIP_WIDTH, height);
	ctx.stroke_rect(x, y, TOOLTIP_WIDTH, height);

	for (i, line) in lines.iter().enumerate() {
		let (font, color) = if i == 0 {
			("600 12px Inter, sans-serif", style::LABEL)
		} else {
			("10px Inter, sans-serif", style::MUTED)
		};
		ctx.set_font(font);
		ctx.set_fill_style_str(color);
		let _ = ctx.fill_text_with_max_width(
			line,
			x + 8.0,
			y + 6.0 + (i as f64 + 1.0) * TOOLTIP_LINE - 3.0,
			TOOLTIP_WIDTH - 16.0,
		);
	}
}
