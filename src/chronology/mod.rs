//! Chronology records and the unified graph built from them.

pub mod entity;
pub mod graph;

pub use entity::{
	DecodeError, Entity, Event, Pattern, Prophecy, decode_events, decode_patterns,
	decode_prophecies, format_year,
};
pub use graph::{
	BASE_PATTERN, BASE_PROPHECY, Edge, EdgeKind, Graph, NATIVE_IDS, Node, NodeId, NodeKind,
	assemble, is_native_id,
};
