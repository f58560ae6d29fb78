//! Derivation of the rendered node/edge set from the forest, and the
//! click-driven expand/collapse transformation.
//!
//! The visible set is rebuilt wholesale on a data refresh and patched
//! incrementally on every click. Collapse is reference-counted through each
//! node's `expanded_by` provenance: a child stays visible as long as any
//! still-active expansion path justifies it, which is what keeps shared
//! children correct when the structure is a DAG rather than a strict tree.

use std::collections::BTreeSet;

use super::tree::{Forest, TreeNode};
use super::types::NodeShape;

/// Expand/collapse affordance shown on a rendered node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Affordance {
	/// Children hidden; shows a plus glyph.
	Collapsed,
	/// Children shown; shows a minus glyph.
	Expanded,
	/// No children; no glyph at all.
	Leaf,
}

/// A rendered node. Position is `None` until the layout engine answers.
#[derive(Clone, Debug)]
pub struct VisibleNode {
	pub id: String,
	pub name: String,
	/// Fill color as `#rrggbbaa`.
	pub color: String,
	pub shape: NodeShape,
	/// Legend category (the raw type value).
	pub category: Option<String>,
	pub tooltip: Option<String>,
	pub auto_link: bool,
	/// Layout partition hint forwarded to the layout engine.
	pub layer_id: i32,
	pub affordance: Affordance,
	pub x: Option<f64>,
	pub y: Option<f64>,
}

/// A rendered edge. The id `"{source}-{target}"` is the sole dedup key.
#[derive(Clone, Debug)]
pub struct VisibleEdge {
	pub id: String,
	pub source: String,
	pub target: String,
	/// Edge label (from the source node's row).
	pub value: String,
	/// Stroke color as `#rrggbbaa`.
	pub color: String,
}

/// The currently rendered nodes and edges.
#[derive(Clone, Debug, Default)]
pub struct VisibleSet {
	pub nodes: Vec<VisibleNode>,
	pub edges: Vec<VisibleEdge>,
}

impl VisibleSet {
	pub fn node(&self, id: &str) -> Option<&VisibleNode> {
		self.nodes.iter().find(|n| n.id == id)
	}

	fn node_ids(&self) -> BTreeSet<String> {
		self.nodes.iter().map(|n| n.id.clone()).collect()
	}

	fn edge_ids(&self) -> BTreeSet<String> {
		self.edges.iter().map(|e| e.id.clone()).collect()
	}

	fn set_affordance(&mut self, id: &str, affordance: Affordance) {
		if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
			node.affordance = affordance;
		}
	}
}

/// Outcome of a node click.
///
/// `NoOp` is the single explicit sentinel for "nothing to toggle": the
/// clicked id is not in the forest, or the node has no children. `Changed`
/// always differs from the input by at least one edge.
#[derive(Clone, Debug)]
pub enum ClickOutcome {
	NoOp,
	Changed(VisibleSet),
}

fn visible_node(node: &TreeNode) -> VisibleNode {
	let affordance = if node.children.is_empty() {
		Affordance::Leaf
	} else if node.children.len() > node.collapse_children {
		Affordance::Collapsed
	} else {
		Affordance::Expanded
	};
	VisibleNode {
		id: node.id.clone(),
		name: node.label.clone(),
		color: node.color.clone(),
		shape: node.node_shape,
		category: node.type_value.clone(),
		tooltip: node.tooltip_text.clone(),
		auto_link: node.auto_link,
		layer_id: node.layer_id,
		affordance,
		x: None,
		y: None,
	}
}

fn edge_id(source: &str, target: &str) -> String {
	format!("{source}-{target}")
}

/// Recursively emits `node` and, when its child count is within the collapse
/// threshold, its subtree. Records expansion provenance on each child as it
/// goes. `seen_nodes`/`seen_edges` dedup across calls; `walked` guards the
/// recursion itself (a node's subtree is walked at most once per pass).
fn add_child_nodes(
	forest: &mut Forest,
	id: &str,
	seen_nodes: &mut BTreeSet<String>,
	seen_edges: &mut BTreeSet<String>,
	walked: &mut BTreeSet<String>,
	out: &mut VisibleSet,
) {
	if !walked.insert(id.to_owned()) {
		return;
	}
	let Some(node) = forest.get(id) else {
		return;
	};

	if seen_nodes.insert(id.to_owned()) {
		out.nodes.push(visible_node(node));
	}

	// Over the threshold: the subtree starts fully collapsed, no child
	// nodes or edges at all.
	if node.children.len() > node.collapse_children {
		return;
	}

	let children = node.children.clone();
	let edge_label = node.edge_label.clone();
	let edge_color = node.edge_color.clone();
	for child_id in children {
		let Some(child) = forest.get_mut(&child_id) else {
			continue;
		};
		child.expanded_by.insert(id.to_owned());

		let eid = edge_id(id, &child_id);
		if seen_edges.insert(eid.clone()) {
			out.edges.push(VisibleEdge {
				id: eid,
				source: id.to_owned(),
				target: child_id.clone(),
				value: edge_label.clone(),
				color: edge_color.clone(),
			});
		}

		add_child_nodes(forest, &child_id, seen_nodes, seen_edges, walked, out);
	}
}

/// Builds the initial visible set from the forest roots, auto-collapsing any
/// node whose child count exceeds its threshold.
///
/// Id sets are threaded across root traversals, so a node or edge reachable
/// from several roots is emitted exactly once.
pub fn build_collapse_nodes(forest: &mut Forest) -> VisibleSet {
	let mut out = VisibleSet::default();
	let mut seen_nodes = BTreeSet::new();
	let mut seen_edges = BTreeSet::new();
	let mut walked = BTreeSet::new();

	for root in forest.roots() {
		add_child_nodes(
			forest,
			&root,
			&mut seen_nodes,
			&mut seen_edges,
			&mut walked,
			&mut out,
		);
	}
	out
}

/// Retracts `id`'s expansion: every child loses `id` from its `expanded_by`
/// and the connecting edge disappears. A child left with no remaining
/// expander is removed outright and the retraction recurses into it; a child
/// still justified by another expander is left alone along with its subtree.
fn remove_child_nodes(
	forest: &mut Forest,
	id: &str,
	set: &mut VisibleSet,
	removed: &mut BTreeSet<String>,
) {
	let Some(node) = forest.get(id) else {
		return;
	};
	let children = node.children.clone();

	for child_id in children {
		let eid = edge_id(id, &child_id);
		set.edges.retain(|e| e.id != eid);

		let orphaned = match forest.get_mut(&child_id) {
			Some(child) => {
				child.expanded_by.remove(id);
				child.expanded_by.is_empty()
			}
			None => false,
		};

		if orphaned {
			set.nodes.retain(|n| n.id != child_id);
			if removed.insert(child_id.clone()) {
				remove_child_nodes(forest, &child_id, set, removed);
			}
		}
	}
}

/// Expand/collapse transformation for a clicked node.
///
/// Mode is decided from current visible-edge membership: when every child
/// edge of the clicked node is already present the click collapses, otherwise
/// it (re-)expands, completing any partial expansion. The forest's
/// `expanded_by` provenance is mutated in place, which is why the same forest
/// instance must persist across clicks.
pub fn node_click(forest: &mut Forest, visible: &VisibleSet, clicked: &str) -> ClickOutcome {
	let Some(node) = forest.get(clicked) else {
		return ClickOutcome::NoOp;
	};
	if node.children.is_empty() {
		return ClickOutcome::NoOp;
	}

	let child_count = node.children.len();
	let children = node.children.clone();
	let edge_label = node.edge_label.clone();
	let edge_color = node.edge_color.clone();

	let mut next = visible.clone();
	let visible_from = visible.edges.iter().filter(|e| e.source == clicked).count();

	if visible_from == child_count {
		// Collapse
		let mut removed = BTreeSet::new();
		removed.insert(clicked.to_owned());
		remove_child_nodes(forest, clicked, &mut next, &mut removed);
		next.set_affordance(clicked, Affordance::Collapsed);
	} else {
		// Expand
		let mut seen_nodes = next.node_ids();
		let mut seen_edges = next.edge_ids();
		let mut walked = BTreeSet::new();
		walked.insert(clicked.to_owned());

		for child_id in &children {
			let Some(child) = forest.get_mut(child_id) else {
				continue;
			};
			child.expanded_by.insert(clicked.to_owned());

			let eid = edge_id(clicked, child_id);
			if seen_edges.insert(eid.clone()) {
				next.edges.push(VisibleEdge {
					id: eid,
					source: clicked.to_owned(),
					target: child_id.clone(),
					value: edge_label.clone(),
					color: edge_color.clone(),
				});
			}

			add_child_nodes(
				forest,
				child_id,
				&mut seen_nodes,
				&mut seen_edges,
				&mut walked,
				&mut next,
			);
		}
		next.set_affordance(clicked, Affordance::Expanded);
	}

	ClickOutcome::Changed(next)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::flow_graph::tree::tests::row;
	use crate::components::flow_graph::types::{FlowConfig, FlowRow};

	fn build(rows: &[FlowRow], collapse_children: usize) -> Forest {
		let cfg = FlowConfig {
			collapse_children,
			..FlowConfig::default()
		};
		Forest::build(rows, &cfg)
	}

	fn ids(set: &VisibleSet) -> (BTreeSet<String>, BTreeSet<String>) {
		(
			set.nodes.iter().map(|n| n.id.clone()).collect(),
			set.edges.iter().map(|e| e.id.clone()).collect(),
		)
	}

	fn fan_out(n: usize) -> Vec<FlowRow> {
		let mut rows = vec![row("a", None)];
		for name in ["b", "c", "d", "e", "f"].iter().take(n) {
			rows.push(row(name, Some("a")));
		}
		rows
	}

	#[test]
	fn at_threshold_is_fully_expanded() {
		let mut forest = build(&fan_out(3), 3);
		let set = build_collapse_nodes(&mut forest);

		assert_eq!(set.nodes.len(), 4);
		assert_eq!(set.edges.len(), 3);
		assert_eq!(set.node("a").unwrap().affordance, Affordance::Expanded);
	}

	#[test]
	fn over_threshold_starts_collapsed() {
		let mut forest = build(&fan_out(4), 3);
		let set = build_collapse_nodes(&mut forest);

		assert_eq!(set.nodes.len(), 1);
		assert!(set.edges.is_empty());
		assert_eq!(set.node("a").unwrap().affordance, Affordance::Collapsed);
	}

	#[test]
	fn leaf_has_no_affordance() {
		let mut forest = build(&fan_out(1), 3);
		let set = build_collapse_nodes(&mut forest);
		assert_eq!(set.node("b").unwrap().affordance, Affordance::Leaf);
	}

	#[test]
	fn click_expands_then_collapses_over_threshold_root() {
		// Rows a..e with threshold 3: root starts collapsed.
		let mut forest = build(&fan_out(4), 3);
		let initial = build_collapse_nodes(&mut forest);
		assert_eq!(initial.nodes.len(), 1);
		assert!(initial.edges.is_empty());

		let ClickOutcome::Changed(expanded) = node_click(&mut forest, &initial, "a") else {
			panic!("expected expansion");
		};
		let (node_ids, edge_ids) = ids(&expanded);
		assert_eq!(node_ids.len(), 5);
		assert_eq!(
			edge_ids,
			["a-b", "a-c", "a-d", "a-e"]
				.into_iter()
				.map(String::from)
				.collect::<BTreeSet<String>>()
		);
		assert_eq!(expanded.node("a").unwrap().affordance, Affordance::Expanded);

		let ClickOutcome::Changed(collapsed) = node_click(&mut forest, &expanded, "a") else {
			panic!("expected collapse");
		};
		assert_eq!(collapsed.nodes.len(), 1);
		assert!(collapsed.edges.is_empty());
		assert_eq!(
			collapsed.node("a").unwrap().affordance,
			Affordance::Collapsed
		);
	}

	#[test]
	fn collapse_then_expand_round_trips() {
		// Within-threshold tree, fully materialized up front.
		let rows = vec![
			row("a", None),
			row("b", Some("a")),
			row("c", Some("a")),
			row("d", Some("b")),
		];
		let mut forest = build(&rows, 3);
		let initial = build_collapse_nodes(&mut forest);
		let before = ids(&initial);

		let ClickOutcome::Changed(collapsed) = node_click(&mut forest, &initial, "a") else {
			panic!("expected collapse");
		};
		assert_eq!(collapsed.nodes.len(), 1);
		assert!(collapsed.edges.is_empty());

		let ClickOutcome::Changed(expanded) = node_click(&mut forest, &collapsed, "a") else {
			panic!("expected expansion");
		};
		assert_eq!(ids(&expanded), before);
	}

	#[test]
	fn shared_child_survives_single_parent_collapse() {
		// c has two parents, both roots, both expanded.
		let rows = vec![
			row("a", None),
			row("b", None),
			row("c", Some("a")),
			row("c", Some("b")),
			row("d", Some("c")),
		];
		let mut forest = build(&rows, 3);
		let initial = build_collapse_nodes(&mut forest);
		assert!(initial.node("c").is_some());
		assert_eq!(
			forest.get("c").unwrap().expanded_by,
			["a", "b"]
				.into_iter()
				.map(String::from)
				.collect::<BTreeSet<String>>()
		);

		let ClickOutcome::Changed(after) = node_click(&mut forest, &initial, "a") else {
			panic!("expected collapse");
		};

		// a's justification is retracted but b's still holds: c and its
		// subtree stay, only the a-c edge goes away.
		assert!(after.node("c").is_some());
		assert!(after.node("d").is_some());
		let (_, edge_ids) = ids(&after);
		assert!(!edge_ids.contains("a-c"));
		assert!(edge_ids.contains("b-c"));
		assert!(edge_ids.contains("c-d"));
		assert_eq!(
			forest.get("c").unwrap().expanded_by,
			["b"]
				.into_iter()
				.map(String::from)
				.collect::<BTreeSet<String>>()
		);

		// Collapsing b as well removes the whole chain.
		let ClickOutcome::Changed(empty) = node_click(&mut forest, &after, "b") else {
			panic!("expected collapse");
		};
		assert!(empty.node("c").is_none());
		assert!(empty.node("d").is_none());
		assert!(empty.edges.is_empty());
	}

	#[test]
	fn expansion_respects_nested_thresholds() {
		// b has 4 children (over threshold 3), so expanding a reveals b
		// collapsed.
		let mut rows = vec![row("a", None), row("b", Some("a"))];
		for name in ["c", "d", "e", "f"] {
			rows.push(row(name, Some("b")));
		}
		// Push a over its own threshold so it starts collapsed.
		for name in ["g", "h", "i"] {
			rows.push(row(name, Some("a")));
		}
		let mut forest = build(&rows, 3);
		let initial = build_collapse_nodes(&mut forest);
		assert_eq!(initial.nodes.len(), 1);

		let ClickOutcome::Changed(after) = node_click(&mut forest, &initial, "a") else {
			panic!("expected expansion");
		};
		assert_eq!(after.node("b").unwrap().affordance, Affordance::Collapsed);
		assert!(after.node("c").is_none());
		let (_, edge_ids) = ids(&after);
		assert!(edge_ids.contains("a-b"));
		assert!(!edge_ids.contains("b-c"));
	}

	#[test]
	fn unknown_or_leaf_click_is_noop() {
		let mut forest = build(&fan_out(2), 3);
		let set = build_collapse_nodes(&mut forest);

		assert!(matches!(
			node_click(&mut forest, &set, "missing"),
			ClickOutcome::NoOp
		));
		assert!(matches!(
			node_click(&mut forest, &set, "b"),
			ClickOutcome::NoOp
		));
	}

	#[test]
	fn multi_root_shared_reachability_emits_once() {
		// d reachable from both roots; emitted once, both edges present.
		let rows = vec![
			row("a", None),
			row("b", None),
			row("d", Some("a")),
			row("d", Some("b")),
		];
		let mut forest = build(&rows, 3);
		let set = build_collapse_nodes(&mut forest);

		assert_eq!(set.nodes.iter().filter(|n| n.id == "d").count(), 1);
		let (_, edge_ids) = ids(&set);
		assert!(edge_ids.contains("a-d"));
		assert!(edge_ids.contains("b-d"));
	}
}
