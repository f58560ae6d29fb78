//! flow-graph: Interactive collapsible flow-graph visualization.
//!
//! This crate provides a WASM-based chart component that turns flat
//! parent/child rows into a node-link diagram with automatic layered layout,
//! per-type styling, and click-driven expand/collapse.

use leptos::prelude::*;
use leptos_meta::*;
use log::{Level, info, warn};
use wasm_bindgen::JsCast;
use web_sys::{HtmlScriptElement, Window};

pub mod components;

pub use components::flow_graph::{
	Affordance, ClickOutcome, FlowConfig, FlowData, FlowGraphCanvas, FlowRow, Forest, NodeShape,
	Rgba, Theme, TreeNode, TypeStyle, VisibleEdge, VisibleNode, VisibleSet, build_collapse_nodes,
	node_click,
};

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("flow-graph: logging initialized");
}

/// Reads and parses a JSON `<script>` element by id.
fn load_json_script<T: serde::de::DeserializeOwned>(id: &str) -> Option<T> {
	let window: Window = web_sys::window()?;
	let document = window.document()?;
	let element = document.get_element_by_id(id)?;
	let script: HtmlScriptElement = element.dyn_into().ok()?;
	let json_text = script.text().ok()?;

	match serde_json::from_str::<T>(&json_text) {
		Ok(data) => Some(data),
		Err(e) => {
			warn!("flow-graph: failed to parse #{id}: {e}");
			None
		}
	}
}

/// Load rows from a script element with id="flow-data".
/// Expected format: JSON with { rows: [{ id, parent_id, ... }] }
fn load_flow_data() -> Option<FlowData> {
	let data: FlowData = load_json_script("flow-data")?;
	info!("flow-graph: loaded {} rows", data.rows.len());
	Some(data)
}

/// Load configuration from a script element with id="flow-config".
/// Missing element or fields fall back to defaults.
fn load_flow_config() -> FlowConfig {
	load_json_script("flow-config").unwrap_or_default()
}

/// Main application component.
/// Loads rows and configuration from the DOM and renders the flow graph.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	let data = load_flow_data().unwrap_or_default();
	let config = load_flow_config();
	let rows_signal = Signal::derive(move || data.rows.clone());

	view! {
		<Html attr:lang="en" attr:dir="ltr" />
		<Title text="Flow Graph" />
		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<div class="fullscreen-graph">
			<FlowGraphCanvas rows=rows_signal config=config fullscreen=true />
			<div class="graph-overlay">
				<p class="subtitle">
					"Click a node to expand or collapse it. Scroll to zoom. Drag to pan."
				</p>
			</div>
		</div>
	}
}
