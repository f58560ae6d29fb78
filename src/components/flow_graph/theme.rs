//! Visual styling for the flow graph surface.
//!
//! Node and edge colors come from the per-type configuration; the theme only
//! covers the ambient surface: background, labels, the expand/collapse glyph,
//! and the hover tooltip.

use super::color::Rgba;

/// Canvas-level styling.
#[derive(Clone, Debug)]
pub struct Theme {
	pub background: Rgba,
	/// Node border stroke; width 0 disables it.
	pub node_border: Rgba,
	pub node_border_width: f64,
	/// Node label text.
	pub label_color: Rgba,
	pub label_size: f64,
	/// Edge label text.
	pub edge_label_color: Rgba,
	pub edge_label_size: f64,
	/// Expand/collapse glyph stroke.
	pub affordance_color: Rgba,
	pub tooltip_background: Rgba,
	pub tooltip_text: Rgba,
}

impl Default for Theme {
	fn default() -> Self {
		Self {
			background: Rgba::rgb(250, 250, 250),
			node_border: Rgba::rgba(0, 0, 0, 0.35),
			node_border_width: 1.0,
			label_color: Rgba::rgb(30, 30, 30),
			label_size: 12.0,
			edge_label_color: Rgba::rgb(90, 90, 90),
			edge_label_size: 10.0,
			affordance_color: Rgba::rgb(60, 60, 60),
			tooltip_background: Rgba::rgb(33, 72, 135),
			tooltip_text: Rgba::rgb(255, 255, 255),
		}
	}
}

impl Theme {
	/// Dark variant for dashboards with dark panels.
	pub fn dark() -> Self {
		Self {
			background: Rgba::rgb(24, 26, 31),
			node_border: Rgba::rgba(255, 255, 255, 0.3),
			label_color: Rgba::rgb(230, 230, 230),
			edge_label_color: Rgba::rgb(170, 170, 170),
			affordance_color: Rgba::rgb(220, 220, 220),
			..Self::default()
		}
	}
}
