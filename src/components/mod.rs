//! UI components.

pub mod flow_graph;
