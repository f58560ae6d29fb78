//! Adapter for the external layered layout engine.
//!
//! The engine itself is a black box supplied by the host page as a global
//! `elkLayout(payloadJson, callback)` function. This module builds the
//! declarative payload (nodes with sizing hints, edges, spacing options),
//! merges the asynchronous position results back onto the visible set, and
//! guards against stale responses with a monotonically increasing rebuild
//! generation: clicks are not blocked on layout, so several requests can be
//! in flight and only the one matching the current generation may land.

use std::cell::Cell;

use log::{debug, warn};
use serde_json::{Value, json};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use super::types::FlowConfig;
use super::visible::VisibleSet;

/// Spacing and algorithm options forwarded to the layout engine.
#[derive(Clone, Debug)]
pub struct LayoutOptions {
	pub algorithm: String,
	pub node_spacing: f64,
	pub layer_spacing: f64,
	pub component_spacing: f64,
	/// Uniform node box passed as the engine's sizing hint.
	pub node_width: f64,
	pub node_height: f64,
}

impl LayoutOptions {
	pub fn from_config(config: &FlowConfig) -> Self {
		Self {
			algorithm: "layered".to_owned(),
			node_spacing: config.node_spacing,
			layer_spacing: config.layer_spacing,
			component_spacing: config.component_spacing,
			node_width: config.node_width,
			node_height: config.node_height,
		}
	}
}

/// Builds the engine's input: a root pseudo-node with layout options, sized
/// children, and source/target edge records.
pub fn layout_payload(set: &VisibleSet, options: &LayoutOptions) -> Value {
	json!({
		"id": "root",
		"layoutOptions": {
			"elk.algorithm": options.algorithm,
			"elk.layered.spacing.nodeNodeBetweenLayers": options.layer_spacing,
			"elk.spacing.nodeNode": options.node_spacing,
			"elk.spacing.componentComponent": options.component_spacing,
		},
		"children": set.nodes.iter().map(|n| json!({
			"id": n.id,
			"width": options.node_width,
			"height": options.node_height,
			"layoutOptions": { "elk.partitioning.partition": n.layer_id },
		})).collect::<Vec<_>>(),
		"edges": set.edges.iter().map(|e| json!({
			"id": e.id,
			"sources": [e.source],
			"targets": [e.target],
		})).collect::<Vec<_>>(),
	})
}

/// Merges positioned children back onto the visible nodes by id. Children
/// the engine dropped (or ids it invented) are ignored, and a child without
/// coordinates leaves the node's prior position in place.
pub fn apply_positions(set: &mut VisibleSet, result: &Value) {
	let Some(children) = result.get("children").and_then(Value::as_array) else {
		warn!("flow-graph: layout result has no children array");
		return;
	};
	for child in children {
		let Some(id) = child.get("id").and_then(Value::as_str) else {
			continue;
		};
		if let Some(node) = set.nodes.iter_mut().find(|n| n.id == id) {
			if let Some(x) = child.get("x").and_then(Value::as_f64) {
				node.x = Some(x);
			}
			if let Some(y) = child.get("y").and_then(Value::as_f64) {
				node.y = Some(y);
			}
		}
	}
}

/// Monotonic rebuild generation. A layout response tagged with an older
/// generation than the current one is dropped.
#[derive(Debug, Default)]
pub struct LayoutGeneration {
	current: Cell<u64>,
}

impl LayoutGeneration {
	/// Starts a new generation, invalidating every in-flight request.
	pub fn begin(&self) -> u64 {
		let next = self.current.get() + 1;
		self.current.set(next);
		next
	}

	pub fn is_current(&self, generation: u64) -> bool {
		self.current.get() == generation
	}
}

#[wasm_bindgen]
unsafe extern "C" {
	/// Host-page layout entry point. Receives the payload JSON and calls
	/// `done` with the positioned graph JSON once the engine finishes.
	#[wasm_bindgen(js_name = elkLayout)]
	fn elk_layout(payload: &str, done: &js_sys::Function);
}

/// Fires a layout request and hands the parsed result to `on_done`.
///
/// One-shot: the callback closure is released to the JS side and reclaimed
/// after the engine invokes it. Responses that fail to parse are logged and
/// dropped; the caller keeps its previous positions.
pub fn request_layout(payload: &Value, on_done: impl FnOnce(Value) + 'static) {
	let callback = Closure::once_into_js(move |result: JsValue| {
		let Some(text) = result.as_string() else {
			warn!("flow-graph: layout engine returned a non-string result");
			return;
		};
		match serde_json::from_str::<Value>(&text) {
			Ok(value) => on_done(value),
			Err(e) => warn!("flow-graph: failed to parse layout result: {e}"),
		}
	});
	debug!("flow-graph: layout requested");
	elk_layout(&payload.to_string(), callback.unchecked_ref());
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::components::flow_graph::tree::Forest;
	use crate::components::flow_graph::tree::tests::row;
	use crate::components::flow_graph::visible::build_collapse_nodes;

	fn sample_set() -> VisibleSet {
		let rows = vec![row("a", None), row("b", Some("a"))];
		let mut forest = Forest::build(&rows, &FlowConfig::default());
		build_collapse_nodes(&mut forest)
	}

	#[test]
	fn payload_shape_matches_engine_contract() {
		let set = sample_set();
		let payload = layout_payload(&set, &LayoutOptions::from_config(&FlowConfig::default()));

		assert_eq!(payload["id"], "root");
		assert_eq!(payload["layoutOptions"]["elk.algorithm"], "layered");
		assert_eq!(payload["children"].as_array().unwrap().len(), 2);
		assert_eq!(payload["children"][0]["width"], 100.0);
		let edge = &payload["edges"][0];
		assert_eq!(edge["id"], "a-b");
		assert_eq!(edge["sources"][0], "a");
		assert_eq!(edge["targets"][0], "b");
	}

	#[test]
	fn positions_merge_back_by_id() {
		let mut set = sample_set();
		let result = json!({
			"children": [
				{ "id": "b", "x": 10.0, "y": 20.0 },
				{ "id": "ghost", "x": 1.0, "y": 2.0 },
			],
		});
		apply_positions(&mut set, &result);

		let b = set.node("b").unwrap();
		assert_eq!((b.x, b.y), (Some(10.0), Some(20.0)));
		// a never came back: still unpositioned.
		let a = set.node("a").unwrap();
		assert_eq!((a.x, a.y), (None, None));
	}

	#[test]
	fn coordinateless_children_keep_prior_positions() {
		let mut set = sample_set();
		apply_positions(
			&mut set,
			&json!({ "children": [{ "id": "a", "x": 5.0, "y": 6.0 }] }),
		);

		// Second response lists a without coordinates: position survives.
		apply_positions(&mut set, &json!({ "children": [{ "id": "a" }] }));
		let a = set.node("a").unwrap();
		assert_eq!((a.x, a.y), (Some(5.0), Some(6.0)));
	}

	#[test]
	fn stale_generations_are_rejected() {
		let generation = LayoutGeneration::default();
		let first = generation.begin();
		assert!(generation.is_current(first));

		let second = generation.begin();
		assert!(!generation.is_current(first));
		assert!(generation.is_current(second));
	}
}
