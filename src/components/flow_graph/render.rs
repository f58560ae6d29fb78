//! Canvas rendering for the flow graph.
//!
//! Draws in passes for correct z-ordering: background, edges (with
//! arrowheads and edge labels), then nodes (shape, border, label,
//! expand/collapse glyph), then the hover tooltip in screen space. Nodes the
//! layout engine has not positioned yet are skipped; they appear once the
//! next layout response lands.

use std::f64::consts::PI;

use web_sys::CanvasRenderingContext2d;

use super::color::{DEFAULT_EDGE_COLOR, DEFAULT_NODE_COLOR, css_color};
use super::theme::Theme;
use super::types::NodeShape;
use super::visible::{Affordance, VisibleNode, VisibleSet};

/// Pan/zoom transform applied to the whole graph.
#[derive(Clone, Debug)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	/// Zoom factor, clamped to 0.1..10.0 by the component.
	pub k: f64,
}

impl Default for ViewTransform {
	fn default() -> Self {
		Self {
			x: 0.0,
			y: 0.0,
			k: 1.0,
		}
	}
}

impl ViewTransform {
	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		((sx - self.x) / self.k, (sy - self.y) / self.k)
	}
}

/// Renders the complete visible set to the canvas.
#[allow(clippy::too_many_arguments)]
pub fn render(
	set: &VisibleSet,
	ctx: &CanvasRenderingContext2d,
	view: &ViewTransform,
	theme: &Theme,
	node_width: f64,
	node_height: f64,
	canvas_width: f64,
	canvas_height: f64,
	hover: Option<&str>,
) {
	ctx.set_fill_style_str(&theme.background.to_css());
	ctx.fill_rect(0.0, 0.0, canvas_width, canvas_height);

	ctx.save();
	let _ = ctx.translate(view.x, view.y);
	let _ = ctx.scale(view.k, view.k);

	draw_edges(set, ctx, theme, node_width, node_height);
	for node in &set.nodes {
		draw_node(node, ctx, theme, node_width, node_height);
	}

	ctx.restore();

	if let Some(id) = hover {
		if let Some(node) = set.node(id) {
			draw_tooltip(node, ctx, view, theme, node_width, node_height);
		}
	}
}

/// Center of a node's box. Layout positions are top-left corners.
fn node_center(node: &VisibleNode, w: f64, h: f64) -> Option<(f64, f64)> {
	match (node.x, node.y) {
		(Some(x), Some(y)) => Some((x + w / 2.0, y + h / 2.0)),
		_ => None,
	}
}

/// Distance from a box center to its border along direction `(ux, uy)`.
fn rect_offset(ux: f64, uy: f64, w: f64, h: f64) -> f64 {
	let tx = if ux.abs() > 0.001 {
		(w / 2.0) / ux.abs()
	} else {
		f64::INFINITY
	};
	let ty = if uy.abs() > 0.001 {
		(h / 2.0) / uy.abs()
	} else {
		f64::INFINITY
	};
	tx.min(ty)
}

fn draw_edges(
	set: &VisibleSet,
	ctx: &CanvasRenderingContext2d,
	theme: &Theme,
	node_width: f64,
	node_height: f64,
) {
	for edge in &set.edges {
		let (Some(source), Some(target)) = (set.node(&edge.source), set.node(&edge.target))
		else {
			continue;
		};
		let (Some((x1, y1)), Some((x2, y2))) = (
			node_center(source, node_width, node_height),
			node_center(target, node_width, node_height),
		) else {
			continue;
		};

		let (dx, dy) = (x2 - x1, y2 - y1);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < 0.001 {
			continue;
		}
		let (ux, uy) = (dx / dist, dy / dist);
		let offset = rect_offset(ux, uy, node_width, node_height);
		let arrow = 8.0;

		let (sx, sy) = (x1 + ux * offset, y1 + uy * offset);
		let (ex, ey) = (x2 - ux * (offset + arrow), y2 - uy * (offset + arrow));

		let color = css_color(&edge.color, DEFAULT_EDGE_COLOR);
		ctx.set_stroke_style_str(&color);
		ctx.set_line_width(1.5);
		ctx.begin_path();
		ctx.move_to(sx, sy);
		ctx.line_to(ex, ey);
		ctx.stroke();

		// Arrowhead at the target border.
		let (tip_x, tip_y) = (x2 - ux * offset, y2 - uy * offset);
		let (back_x, back_y) = (tip_x - ux * arrow, tip_y - uy * arrow);
		let (px, py) = (-uy * arrow * 0.5, ux * arrow * 0.5);
		ctx.set_fill_style_str(&color);
		ctx.begin_path();
		ctx.move_to(tip_x, tip_y);
		ctx.line_to(back_x + px, back_y + py);
		ctx.line_to(back_x - px, back_y - py);
		ctx.close_path();
		ctx.fill();

		if !edge.value.is_empty() {
			let (mx, my) = ((x1 + x2) / 2.0, (y1 + y2) / 2.0);
			ctx.set_fill_style_str(&theme.edge_label_color.to_css());
			ctx.set_font(&format!("{}px sans-serif", theme.edge_label_size));
			ctx.set_text_align("center");
			let _ = ctx.fill_text(&edge.value, mx, my - 4.0);
		}
	}
}

fn draw_node(
	node: &VisibleNode,
	ctx: &CanvasRenderingContext2d,
	theme: &Theme,
	w: f64,
	h: f64,
) {
	let Some((cx, cy)) = node_center(node, w, h) else {
		return;
	};

	ctx.set_fill_style_str(&css_color(&node.color, DEFAULT_NODE_COLOR));
	trace_shape(ctx, node.shape, cx, cy, w, h);
	ctx.fill();

	if theme.node_border_width > 0.0 {
		ctx.set_stroke_style_str(&theme.node_border.to_css());
		ctx.set_line_width(theme.node_border_width);
		trace_shape(ctx, node.shape, cx, cy, w, h);
		ctx.stroke();
	}

	ctx.set_fill_style_str(&theme.label_color.to_css());
	ctx.set_font(&format!("{}px sans-serif", theme.label_size));
	ctx.set_text_align("center");
	let _ = ctx.fill_text(&node.name, cx, cy + theme.label_size / 3.0);

	match node.affordance {
		Affordance::Collapsed => draw_glyph(ctx, theme, cx, cy, w, true),
		Affordance::Expanded => draw_glyph(ctx, theme, cx, cy, w, false),
		Affordance::Leaf => {}
	}
}

/// Traces the node outline path for the given symbol. `Other` (custom image
/// types) falls back to a plain rect.
fn trace_shape(ctx: &CanvasRenderingContext2d, shape: NodeShape, cx: f64, cy: f64, w: f64, h: f64) {
	let (left, top) = (cx - w / 2.0, cy - h / 2.0);
	let (right, bottom) = (cx + w / 2.0, cy + h / 2.0);

	ctx.begin_path();
	match shape {
		NodeShape::Rect | NodeShape::Other => {
			ctx.rect(left, top, w, h);
		}
		NodeShape::RoundRect => {
			let r = (w.min(h) * 0.2).min(10.0);
			ctx.move_to(left + r, top);
			ctx.line_to(right - r, top);
			let _ = ctx.quadratic_curve_to(right, top, right, top + r);
			ctx.line_to(right, bottom - r);
			let _ = ctx.quadratic_curve_to(right, bottom, right - r, bottom);
			ctx.line_to(left + r, bottom);
			let _ = ctx.quadratic_curve_to(left, bottom, left, bottom - r);
			ctx.line_to(left, top + r);
			let _ = ctx.quadratic_curve_to(left, top, left + r, top);
			ctx.close_path();
		}
		NodeShape::Circle => {
			let _ = ctx.ellipse(cx, cy, w / 2.0, h / 2.0, 0.0, 0.0, PI * 2.0);
		}
		NodeShape::Triangle => {
			ctx.move_to(cx, top);
			ctx.line_to(right, bottom);
			ctx.line_to(left, bottom);
			ctx.close_path();
		}
		NodeShape::Diamond => {
			ctx.move_to(cx, top);
			ctx.line_to(right, cy);
			ctx.line_to(cx, bottom);
			ctx.line_to(left, cy);
			ctx.close_path();
		}
		NodeShape::Pin => {
			let r = w.min(h) * 0.35;
			let _ = ctx.arc(cx, top + r, r, PI * 0.8, PI * 0.2);
			ctx.line_to(cx, bottom);
			ctx.close_path();
		}
		NodeShape::Arrow => {
			ctx.move_to(cx, top);
			ctx.line_to(right, bottom);
			ctx.line_to(cx, bottom - h * 0.3);
			ctx.line_to(left, bottom);
			ctx.close_path();
		}
	}
}

/// Plus (collapsed) or minus (expanded) glyph at the node's right edge.
fn draw_glyph(
	ctx: &CanvasRenderingContext2d,
	theme: &Theme,
	cx: f64,
	cy: f64,
	w: f64,
	plus: bool,
) {
	let r = 7.0;
	let gx = cx + w / 2.0 - r - 3.0;
	let gy = cy;

	ctx.set_fill_style_str(&theme.background.to_css());
	ctx.begin_path();
	let _ = ctx.arc(gx, gy, r, 0.0, PI * 2.0);
	ctx.fill();

	ctx.set_stroke_style_str(&theme.affordance_color.to_css());
	ctx.set_line_width(1.5);
	ctx.begin_path();
	let _ = ctx.arc(gx, gy, r, 0.0, PI * 2.0);
	ctx.stroke();

	let arm = r * 0.55;
	ctx.begin_path();
	ctx.move_to(gx - arm, gy);
	ctx.line_to(gx + arm, gy);
	if plus {
		ctx.move_to(gx, gy - arm);
		ctx.line_to(gx, gy + arm);
	}
	ctx.stroke();
}

fn draw_tooltip(
	node: &VisibleNode,
	ctx: &CanvasRenderingContext2d,
	view: &ViewTransform,
	theme: &Theme,
	node_width: f64,
	node_height: f64,
) {
	let Some(text) = node.tooltip.as_deref() else {
		return;
	};
	let Some((cx, cy)) = node_center(node, node_width, node_height) else {
		return;
	};

	// Anchor in screen space just below the node.
	let sx = cx * view.k + view.x;
	let sy = (cy + node_height / 2.0) * view.k + view.y + 8.0;

	ctx.set_font("12px sans-serif");
	let width = ctx
		.measure_text(text)
		.map(|m| m.width())
		.unwrap_or(text.len() as f64 * 7.0);
	let pad = 8.0;

	ctx.set_fill_style_str(&theme.tooltip_background.to_css());
	ctx.fill_rect(sx - width / 2.0 - pad, sy, width + pad * 2.0, 24.0);

	ctx.set_fill_style_str(&theme.tooltip_text.to_css());
	ctx.set_text_align("center");
	let _ = ctx.fill_text(text, sx, sy + 16.0);
}

/// Hit test in screen coordinates against every positioned node box.
pub fn node_at_position(
	set: &VisibleSet,
	view: &ViewTransform,
	sx: f64,
	sy: f64,
	node_width: f64,
	node_height: f64,
) -> Option<String> {
	let (gx, gy) = view.screen_to_graph(sx, sy);
	// Last match wins: later nodes draw on top.
	let mut found = None;
	for node in &set.nodes {
		let Some((cx, cy)) = node_center(node, node_width, node_height) else {
			continue;
		};
		if (gx - cx).abs() <= node_width / 2.0 && (gy - cy).abs() <= node_height / 2.0 {
			found = Some(node.id.clone());
		}
	}
	found
}
