//! Input rows and styling configuration for the flow graph component.

use std::collections::HashMap;

use serde::Deserialize;

/// One flat record from the upstream query: a node id, its parent id, and
/// optional display fields. Rows arrive in query order; a child's row may
/// precede its parent's.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct FlowRow {
	/// Node id. Rows with an empty id are skipped.
	pub id: String,
	/// Parent node id. Empty or missing means this row is a root candidate.
	pub parent_id: Option<String>,
	/// Display label; falls back to the id.
	pub label: Option<String>,
	/// Type key used for color/shape/layer lookup (case-insensitive).
	pub node_type: Option<String>,
	/// Edge type key used for edge color lookup, independent of `node_type`.
	pub edge_type: Option<String>,
	/// Label drawn on edges leaving this node.
	pub edge_label: Option<String>,
	/// Hover tooltip text.
	pub tooltip: Option<String>,
	/// Row count/value from the query. Unused by layout, kept for tooling.
	pub count: Option<f64>,
}

/// Node symbol drawn for a type. `Other` defers to the type's custom image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeShape {
	Circle,
	#[default]
	Rect,
	RoundRect,
	Triangle,
	Diamond,
	Pin,
	Arrow,
	Other,
}

/// Per-type styling: fill color, symbol, layout partition, optional image.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TypeStyle {
	/// Fill color as `#rrggbb`/`#rrggbbaa`.
	pub color: Option<String>,
	pub shape: NodeShape,
	/// Layout partition hint: -1 unclassified, 0 elided, >0 ordered layer.
	pub layer_id: i32,
	pub custom_image: Option<String>,
}

impl Default for TypeStyle {
	fn default() -> Self {
		Self {
			color: None,
			shape: NodeShape::Rect,
			layer_id: -1,
			custom_image: None,
		}
	}
}

/// Component configuration, supplied by the host page alongside the rows.
///
/// `type_styles` and `edge_colors` are keyed by lower-cased type string; the
/// wildcard key `"*"` catches types without their own entry.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
	pub type_styles: HashMap<String, TypeStyle>,
	pub edge_colors: HashMap<String, String>,
	/// Auto-collapse threshold: a node with more children than this starts
	/// collapsed.
	pub collapse_children: usize,
	/// Labels longer than this many characters are truncated with `...`.
	pub overflow_text: usize,
	/// Turn `http...` words in tooltips into links (HTML hosts only; the
	/// canvas tooltip draws plain text either way).
	pub auto_link: bool,
	/// Node box size passed to the layout engine and used for hit testing.
	pub node_width: f64,
	pub node_height: f64,
	/// Spacing between nodes in the same layer.
	pub node_spacing: f64,
	/// Spacing between layers.
	pub layer_spacing: f64,
	/// Spacing between disconnected components.
	pub component_spacing: f64,
	/// Re-run layout on every expand/collapse, not just when the graph grows.
	pub auto_layout: bool,
}

impl Default for FlowConfig {
	fn default() -> Self {
		Self {
			type_styles: HashMap::new(),
			edge_colors: HashMap::new(),
			collapse_children: 5,
			overflow_text: 30,
			auto_link: false,
			node_width: 100.0,
			node_height: 40.0,
			node_spacing: 80.0,
			layer_spacing: 80.0,
			component_spacing: 80.0,
			auto_layout: false,
		}
	}
}

/// Complete input payload: rows plus configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct FlowData {
	pub rows: Vec<FlowRow>,
}
