//! Forest construction from flat parent/child records.
//!
//! [`Forest`] is an arena of [`TreeNode`] records addressed by id; adjacency
//! and expansion provenance are stored as id lists, so a node is never
//! duplicated no matter how many parent edges point at it. The structure is a
//! DAG in general ("tree" by convention): a node may carry several parents.
//!
//! The forest is built once per data refresh and then mutated in place by the
//! expand/collapse logic in [`super::visible`]; derived visible state is
//! always computed against this one arena.

use std::collections::{BTreeSet, HashMap};

use log::debug;

use super::color::{DEFAULT_EDGE_COLOR, DEFAULT_NODE_COLOR};
use super::types::{FlowConfig, FlowRow, NodeShape};

/// One typed node in the forest.
#[derive(Clone, Debug)]
pub struct TreeNode {
	pub id: String,
	/// Display label, already truncated to the configured overflow length.
	pub label: String,
	/// Fill color as `#rrggbbaa`.
	pub color: String,
	/// Stroke color for edges leaving this node.
	pub edge_color: String,
	/// Raw type key from the row, used as the legend category.
	pub type_value: Option<String>,
	pub tooltip_text: Option<String>,
	/// Label drawn on edges leaving this node.
	pub edge_label: String,
	pub auto_link: bool,
	/// -1 unclassified, 0 elide, >0 layout partition.
	pub layer_id: i32,
	pub node_shape: NodeShape,
	pub custom_image: Option<String>,
	/// Auto-collapse threshold this node was built with.
	pub collapse_children: usize,
	/// Ids of nodes whose expansion currently justifies this node being
	/// visible. Reference-counted provenance, not ownership: under multiple
	/// parents each expander justifies the node independently.
	pub expanded_by: BTreeSet<String>,
	pub parents: Vec<String>,
	pub children: Vec<String>,
}

impl TreeNode {
	fn from_row(row: &FlowRow, config: &FlowConfig) -> Self {
		let label = truncate_label(
			row.label.as_deref().unwrap_or(&row.id),
			config.overflow_text,
		);

		// Type resolution: exact (lower-cased) key, then wildcard, then defaults.
		let mut color = DEFAULT_NODE_COLOR.to_hexa();
		let mut layer_id = -1;
		let mut node_shape = NodeShape::Rect;
		let mut custom_image = None;
		if let Some(type_key) = &row.node_type {
			if let Some(style) = lookup(&config.type_styles, type_key) {
				color = style.color.clone().unwrap_or(color);
				layer_id = style.layer_id;
				node_shape = style.shape;
				custom_image = style.custom_image.clone();
			}
		}

		// Edge colors resolve through the same chain, keyed on the edge type.
		let mut edge_color = DEFAULT_EDGE_COLOR.to_hexa();
		if let Some(edge_key) = &row.edge_type {
			if let Some(c) = lookup(&config.edge_colors, edge_key) {
				edge_color = c.clone();
			}
		}

		Self {
			id: row.id.clone(),
			label,
			color,
			edge_color,
			type_value: row.node_type.clone(),
			tooltip_text: row.tooltip.clone(),
			edge_label: row.edge_label.clone().unwrap_or_default(),
			auto_link: config.auto_link,
			layer_id,
			node_shape,
			custom_image,
			collapse_children: config.collapse_children,
			expanded_by: BTreeSet::new(),
			parents: Vec::new(),
			children: Vec::new(),
		}
	}
}

fn lookup<'a, T>(map: &'a HashMap<String, T>, key: &str) -> Option<&'a T> {
	map.get(&key.to_lowercase()).or_else(|| map.get("*"))
}

fn truncate_label(label: &str, overflow: usize) -> String {
	if label.chars().count() > overflow {
		let cut: String = label.chars().take(overflow).collect();
		format!("{cut}...")
	} else {
		label.to_owned()
	}
}

/// Arena of tree nodes addressed by id, with stable insertion order.
#[derive(Clone, Debug, Default)]
pub struct Forest {
	nodes: HashMap<String, TreeNode>,
	order: Vec<String>,
}

impl Forest {
	/// Builds the forest from ordered rows.
	///
	/// Forward references are resolved through a pending map: a child whose
	/// parent has not been seen yet waits under that parent id and is attached
	/// the moment the parent's own row arrives. A repeated id merges onto the
	/// existing node (extra parent edge) instead of creating a duplicate.
	pub fn build(rows: &[FlowRow], config: &FlowConfig) -> Self {
		let mut forest = Forest::default();
		// parent id -> children waiting for that parent to appear
		let mut pending: HashMap<String, Vec<String>> = HashMap::new();

		for row in rows {
			if row.id.is_empty() {
				debug!("flow-graph: skipping row with empty id");
				continue;
			}
			let id = &row.id;
			let parent_id = row.parent_id.as_deref().filter(|p| !p.is_empty());

			if !forest.nodes.contains_key(id) {
				forest.order.push(id.clone());
				forest
					.nodes
					.insert(id.clone(), TreeNode::from_row(row, config));

				// Attach children that arrived before this node.
				if let Some(waiting) = pending.remove(id) {
					for child in waiting {
						forest.link(id, &child);
					}
				}
			}

			if let Some(pid) = parent_id {
				if forest.nodes.contains_key(pid) {
					forest.link(pid, id);
				} else {
					pending.entry(pid.to_owned()).or_default().push(id.clone());
				}
			}
		}

		// Parents that never appeared in the row set: their children simply
		// stay parentless and act as extra roots.
		if !pending.is_empty() {
			debug!(
				"flow-graph: {} parent id(s) never present in rows",
				pending.len()
			);
		}

		forest
	}

	/// Adds a parent/child edge in both directions, skipping duplicates.
	fn link(&mut self, parent_id: &str, child_id: &str) {
		if let Some(parent) = self.nodes.get_mut(parent_id) {
			if !parent.children.iter().any(|c| c == child_id) {
				parent.children.push(child_id.to_owned());
			}
		}
		if let Some(child) = self.nodes.get_mut(child_id) {
			if !child.parents.iter().any(|p| p == parent_id) {
				child.parents.push(parent_id.to_owned());
			}
		}
	}

	pub fn get(&self, id: &str) -> Option<&TreeNode> {
		self.nodes.get(id)
	}

	pub fn get_mut(&mut self, id: &str) -> Option<&mut TreeNode> {
		self.nodes.get_mut(id)
	}

	pub fn contains(&self, id: &str) -> bool {
		self.nodes.contains_key(id)
	}

	pub fn len(&self) -> usize {
		self.order.len()
	}

	pub fn is_empty(&self) -> bool {
		self.order.is_empty()
	}

	/// Nodes in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = &TreeNode> {
		self.order.iter().filter_map(|id| self.nodes.get(id))
	}

	/// Ids of parentless nodes, in insertion order.
	pub fn roots(&self) -> Vec<String> {
		self.iter()
			.filter(|n| n.parents.is_empty())
			.map(|n| n.id.clone())
			.collect()
	}

	/// Returns a copy of the forest with every layer-0 node spliced out:
	/// parents are connected directly to the elided node's children.
	///
	/// When the elided node's child count is within its own collapse threshold
	/// its `expanded_by` provenance is carried over to the children, so a chain
	/// of elided nodes does not break expansion justification. The receiver is
	/// left untouched for re-filtering under different type mappings; the
	/// operation is idempotent.
	pub fn filter_zeros(&self) -> Self {
		let mut filtered = self.clone();
		let zero_ids: Vec<String> = filtered
			.iter()
			.filter(|n| n.layer_id == 0)
			.map(|n| n.id.clone())
			.collect();

		// Splice sequentially against the live adjacency: a chain of layer-0
		// nodes resolves because each splice rewires its neighbors before the
		// next one reads them.
		for id in &zero_ids {
			let Some(node) = filtered.nodes.get(id).cloned() else {
				continue;
			};
			let propagate = node.children.len() <= node.collapse_children;

			for pid in &node.parents {
				if pid == id {
					continue;
				}
				if let Some(parent) = filtered.nodes.get_mut(pid) {
					parent.children.retain(|c| c != id);
					for cid in &node.children {
						if cid != id && !parent.children.contains(cid) {
							parent.children.push(cid.clone());
						}
					}
				}
			}

			for cid in &node.children {
				if cid == id {
					continue;
				}
				if let Some(child) = filtered.nodes.get_mut(cid) {
					child.parents.retain(|p| p != id);
					for pid in &node.parents {
						if pid != id && !child.parents.contains(pid) {
							child.parents.push(pid.clone());
						}
					}
					if propagate {
						child.expanded_by.remove(id);
						child.expanded_by.extend(node.expanded_by.iter().cloned());
					}
				}
			}
		}

		// Single removal pass, then scrub any id that no longer resolves.
		for id in &zero_ids {
			filtered.nodes.remove(id);
		}
		let removed: BTreeSet<&String> = zero_ids.iter().collect();
		filtered.order.retain(|id| !removed.contains(id));
		for node in filtered.nodes.values_mut() {
			node.parents.retain(|p| !removed.contains(p));
			node.children.retain(|c| !removed.contains(c));
			for id in &zero_ids {
				node.expanded_by.remove(id);
			}
		}

		filtered
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use crate::components::flow_graph::types::TypeStyle;

	pub(crate) fn row(id: &str, parent: Option<&str>) -> FlowRow {
		FlowRow {
			id: id.to_owned(),
			parent_id: parent.map(str::to_owned),
			..FlowRow::default()
		}
	}

	fn typed_row(id: &str, parent: Option<&str>, node_type: &str) -> FlowRow {
		FlowRow {
			node_type: Some(node_type.to_owned()),
			..row(id, parent)
		}
	}

	fn config() -> FlowConfig {
		FlowConfig::default()
	}

	#[test]
	fn repeated_id_merges_parents() {
		let rows = vec![
			row("a", None),
			row("b", None),
			row("c", Some("a")),
			row("c", Some("b")),
		];
		let forest = Forest::build(&rows, &config());

		assert_eq!(forest.len(), 3);
		let c = forest.get("c").unwrap();
		assert_eq!(c.parents, vec!["a", "b"]);
		assert_eq!(forest.get("a").unwrap().children, vec!["c"]);
		assert_eq!(forest.get("b").unwrap().children, vec!["c"]);
	}

	#[test]
	fn forward_references_resolve_to_same_adjacency() {
		let child_first = vec![row("b", Some("a")), row("c", Some("a")), row("a", None)];
		let parent_first = vec![row("a", None), row("b", Some("a")), row("c", Some("a"))];

		let f1 = Forest::build(&child_first, &config());
		let f2 = Forest::build(&parent_first, &config());

		for forest in [&f1, &f2] {
			let a = forest.get("a").unwrap();
			let mut children = a.children.clone();
			children.sort();
			assert_eq!(children, vec!["b", "c"]);
			assert_eq!(forest.get("b").unwrap().parents, vec!["a"]);
			assert_eq!(forest.get("c").unwrap().parents, vec!["a"]);
		}
		assert_eq!(f1.roots(), vec!["a"]);
	}

	#[test]
	fn empty_id_rows_are_skipped() {
		let rows = vec![row("", None), row("a", None), row("b", Some("a"))];
		let forest = Forest::build(&rows, &config());
		assert_eq!(forest.len(), 2);
	}

	#[test]
	fn missing_parent_leaves_orphan_as_root() {
		let rows = vec![row("a", Some("ghost")), row("b", Some("a"))];
		let forest = Forest::build(&rows, &config());
		assert_eq!(forest.roots(), vec!["a"]);
		assert!(forest.get("a").unwrap().parents.is_empty());
	}

	#[test]
	fn type_lookup_falls_back_through_wildcard() {
		let mut cfg = config();
		cfg.type_styles.insert(
			"service".into(),
			TypeStyle {
				color: Some("#112233ff".into()),
				layer_id: 2,
				..TypeStyle::default()
			},
		);
		cfg.type_styles.insert(
			"*".into(),
			TypeStyle {
				color: Some("#445566ff".into()),
				..TypeStyle::default()
			},
		);

		let rows = vec![
			typed_row("a", None, "SERVICE"),
			typed_row("b", None, "unknown"),
			row("c", None),
		];
		let forest = Forest::build(&rows, &cfg);

		// Case-insensitive exact hit.
		assert_eq!(forest.get("a").unwrap().color, "#112233ff");
		assert_eq!(forest.get("a").unwrap().layer_id, 2);
		// Wildcard hit.
		assert_eq!(forest.get("b").unwrap().color, "#445566ff");
		// No type at all: hard default.
		assert_eq!(forest.get("c").unwrap().color, DEFAULT_NODE_COLOR.to_hexa());
		assert_eq!(forest.get("c").unwrap().layer_id, -1);
	}

	#[test]
	fn edge_color_resolution_is_independent_of_node_type() {
		let mut cfg = config();
		cfg.edge_colors.insert("flow".into(), "#ff0000ff".into());
		let rows = vec![FlowRow {
			edge_type: Some("Flow".into()),
			node_type: Some("service".into()),
			..row("a", None)
		}];
		let forest = Forest::build(&rows, &cfg);
		assert_eq!(forest.get("a").unwrap().edge_color, "#ff0000ff");
	}

	#[test]
	fn long_labels_are_truncated() {
		let mut cfg = config();
		cfg.overflow_text = 5;
		let rows = vec![FlowRow {
			label: Some("abcdefghij".into()),
			..row("a", None)
		}];
		let forest = Forest::build(&rows, &cfg);
		assert_eq!(forest.get("a").unwrap().label, "abcde...");
	}

	#[test]
	fn truncation_counts_characters_not_bytes() {
		let mut cfg = config();
		cfg.overflow_text = 5;
		let rows = vec![FlowRow {
			label: Some("αβγδεζη".into()),
			..row("a", None)
		}];
		let forest = Forest::build(&rows, &cfg);
		assert_eq!(forest.get("a").unwrap().label, "αβγδε...");
	}

	fn zero_layer_config() -> FlowConfig {
		let mut cfg = config();
		cfg.type_styles.insert(
			"hidden".into(),
			TypeStyle {
				layer_id: 0,
				..TypeStyle::default()
			},
		);
		cfg
	}

	#[test]
	fn filter_zeros_splices_parent_to_children() {
		let cfg = zero_layer_config();
		let rows = vec![
			row("a", None),
			typed_row("z", Some("a"), "hidden"),
			row("b", Some("z")),
			row("c", Some("z")),
		];
		let filtered = Forest::build(&rows, &cfg).filter_zeros();

		assert!(!filtered.contains("z"));
		let mut children = filtered.get("a").unwrap().children.clone();
		children.sort();
		assert_eq!(children, vec!["b", "c"]);
		assert_eq!(filtered.get("b").unwrap().parents, vec!["a"]);
		assert_eq!(filtered.get("c").unwrap().parents, vec!["a"]);
	}

	#[test]
	fn filter_zeros_handles_chains() {
		let cfg = zero_layer_config();
		let rows = vec![
			row("a", None),
			typed_row("z1", Some("a"), "hidden"),
			typed_row("z2", Some("z1"), "hidden"),
			row("b", Some("z2")),
		];
		let filtered = Forest::build(&rows, &cfg).filter_zeros();

		assert_eq!(filtered.len(), 2);
		assert_eq!(filtered.get("a").unwrap().children, vec!["b"]);
		assert_eq!(filtered.get("b").unwrap().parents, vec!["a"]);
	}

	#[test]
	fn filter_zeros_carries_expanders_to_children() {
		// z was expanded by a before the re-filter; b must inherit that
		// justification and drop the elided id.
		let cfg = zero_layer_config();
		let rows = vec![
			row("a", None),
			typed_row("z", Some("a"), "hidden"),
			row("b", Some("z")),
		];
		let mut forest = Forest::build(&rows, &cfg);
		forest
			.get_mut("z")
			.unwrap()
			.expanded_by
			.insert("a".to_owned());

		let filtered = forest.filter_zeros();
		let b = filtered.get("b").unwrap();
		assert!(b.expanded_by.contains("a"));
		assert!(!b.expanded_by.contains("z"));
	}

	#[test]
	fn filter_zeros_is_idempotent() {
		let cfg = zero_layer_config();
		let rows = vec![
			row("a", None),
			typed_row("z", Some("a"), "hidden"),
			row("b", Some("z")),
			row("c", Some("a")),
		];
		let once = Forest::build(&rows, &cfg).filter_zeros();
		let twice = once.filter_zeros();

		assert_eq!(once.len(), twice.len());
		for node in once.iter() {
			let again = twice.get(&node.id).unwrap();
			assert_eq!(node.children, again.children);
			assert_eq!(node.parents, again.parents);
		}
	}

	#[test]
	fn filter_zeros_does_not_mutate_input() {
		let cfg = zero_layer_config();
		let rows = vec![
			row("a", None),
			typed_row("z", Some("a"), "hidden"),
			row("b", Some("z")),
		];
		let forest = Forest::build(&rows, &cfg);
		let _ = forest.filter_zeros();
		assert!(forest.contains("z"));
		assert_eq!(forest.get("a").unwrap().children, vec!["z"]);
	}
}
