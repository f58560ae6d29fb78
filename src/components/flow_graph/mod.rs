//! Collapsible flow graph visualization component.
//!
//! Turns flat parent/child rows into a forest of typed nodes and renders it
//! as an interactive node-link diagram:
//! - Forward-reference-tolerant tree construction with per-type styling
//! - Elision of layer-0 ("invisible") node types
//! - Auto-collapse of subtrees past a configurable child-count threshold
//! - Click-driven expand/collapse with reference-counted visibility
//! - Automatic layered layout through an external engine
//!
//! # Example
//!
//! ```ignore
//! use flow_graph::{FlowGraphCanvas, FlowRow, FlowConfig};
//!
//! let rows = vec![
//!     FlowRow { id: "a".into(), ..FlowRow::default() },
//!     FlowRow { id: "b".into(), parent_id: Some("a".into()), ..FlowRow::default() },
//! ];
//!
//! view! { <FlowGraphCanvas rows=rows.into() fullscreen=true /> }
//! ```

mod color;
mod component;
mod layout;
mod render;
pub mod theme;
mod tree;
mod types;
mod visible;

pub use color::Rgba;
pub use component::FlowGraphCanvas;
pub use theme::Theme;
pub use tree::{Forest, TreeNode};
pub use types::{FlowConfig, FlowData, FlowRow, NodeShape, TypeStyle};
pub use visible::{
	Affordance, ClickOutcome, VisibleEdge, VisibleNode, VisibleSet, build_collapse_nodes,
	node_click,
};
