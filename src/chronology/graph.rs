//! Graph assembly: merges events, patterns and prophecies into a single
//! node/edge snapshot.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::Range;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::entity::{Entity, Event, Pattern, Prophecy};

/// Offset added to a pattern's native id to form its node id.
///
/// Native ids of every kind must lie in [`NATIVE_IDS`]. Records outside it
/// are rejected when decoded and skipped by [`assemble`], so the three bands
/// never overlap.
pub const BASE_PATTERN: i64 = 10_000;

/// Offset added to a prophecy's native id to form its node id.
pub const BASE_PROPHECY: i64 = 20_000;

/// Native ids that fit in a band without spilling into the next one.
pub const NATIVE_IDS: Range<i64> = 0..BASE_PATTERN;

/// Whether a backend id can be placed in its kind's band.
pub fn is_native_id(id: i64) -> bool {
	NATIVE_IDS.contains(&id)
}

/// Globally unique node identifier within one graph snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub i64);

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Which source collection a node came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
	/// Built from an [`Event`].
	Event,
	/// Built from a [`Pattern`].
	Pattern,
	/// Built from a [`Prophecy`].
	Prophecy,
}

impl NodeKind {
	/// Every kind, in legend order.
	pub const ALL: [NodeKind; 3] = [NodeKind::Event, NodeKind::Pattern, NodeKind::Prophecy];

	/// Lower-case name used by the type filter.
	pub fn as_str(self) -> &'static str {
		match self {
			NodeKind::Event => "event",
			NodeKind::Pattern => "pattern",
			NodeKind::Prophecy => "prophecy",
		}
	}

	/// Inverse of [`NodeKind::as_str`]; anything else means "no restriction".
	pub fn parse(s: &str) -> Option<Self> {
		NodeKind::ALL.into_iter().find(|k| k.as_str() == s)
	}
}

/// Relationship kinds synthesized by [`assemble`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
	/// Consecutive events in input order.
	PrecededBy,
	/// Event to a pattern it exemplifies.
	MatchesPattern,
	/// Prophecy to the event fulfilling it.
	FulfilledBy,
}

/// Unified visualization unit.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
	/// Unique within the snapshot.
	pub id: NodeId,
	/// Text drawn next to the node.
	pub label: String,
	/// Source collection.
	pub kind: NodeKind,
	/// Multi-line hover text.
	pub tooltip: String,
	/// Record the node was built from.
	pub entity: Entity,
}

impl Node {
	/// Node for an event; its id is the native id.
	pub fn from_event(event: &Event) -> Self {
		Self {
			id: NodeId(event.id),
			label: event.label(),
			kind: NodeKind::Event,
			tooltip: event.tooltip(),
			entity: Entity::Event(event.clone()),
		}
	}

	/// Node for a pattern, shifted into the pattern band.
	pub fn from_pattern(pattern: &Pattern) -> Self {
		Self {
			id: NodeId(BASE_PATTERN.saturating_add(pattern.id)),
			label: pattern.label(),
			kind: NodeKind::Pattern,
			tooltip: pattern.tooltip(),
			entity: Entity::Pattern(pattern.clone()),
		}
	}

	/// Node for a prophecy, shifted into the prophecy band.
	pub fn from_prophecy(prophecy: &Prophecy) -> Self {
		Self {
			id: NodeId(BASE_PROPHECY.saturating_add(prophecy.id)),
			label: prophecy.label(),
			kind: NodeKind::Prophecy,
			tooltip: prophecy.tooltip(),
			entity: Entity::Prophecy(prophecy.clone()),
		}
	}

	/// Case-insensitive substring match against label and tooltip.
	/// `needle` must already be lower-cased.
	pub fn matches(&self, needle: &str) -> bool {
		needle.is_empty()
			|| self.label.to_lowercase().contains(needle)
			|| self.tooltip.to_lowercase().contains(needle)
	}
}

/// Directed relationship between two nodes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
	/// Origin node.
	pub source: NodeId,
	/// Destination node.
	pub target: NodeId,
	/// Relationship kind.
	pub kind: EdgeKind,
	/// Short relationship text.
	pub label: Option<String>,
}

impl Edge {
	fn new(source: NodeId, target: NodeId, kind: EdgeKind, label: &str) -> Self {
		Self {
			source,
			target,
			kind,
			label: Some(label.into()),
		}
	}
}

/// Immutable snapshot produced by one assembly pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Graph {
	nodes: Vec<Node>,
	edges: Vec<Edge>,
	index: HashMap<NodeId, usize>,
}

impl Graph {
	/// Builds a snapshot, enforcing the snapshot invariants: node ids are
	/// unique (first occurrence wins) and every edge references nodes of
	/// this snapshot (others are dropped).
	pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
		let mut index = HashMap::with_capacity(nodes.len());
		let mut kept = Vec::with_capacity(nodes.len());
		for node in nodes {
			if index.contains_key(&node.id) {
				warn!(
					"duplicate node id {} ({} {:?}) dropped",
					node.id,
					node.kind.as_str(),
					node.label
				);
				continue;
			}
			index.insert(node.id, kept.len());
			kept.push(node);
		}

		let total = edges.len();
		let edges: Vec<Edge> = edges
			.into_iter()
			.filter(|e| index.contains_key(&e.source) && index.contains_key(&e.target))
			.collect();
		if edges.len() < total {
			debug!("dropped {} dangling edges", total - edges.len());
		}

		Self {
			nodes: kept,
			edges,
			index,
		}
	}

	/// Nodes in assembly order.
	pub fn nodes(&self) -> &[Node] {
		&self.nodes
	}

	/// Edges, all with both endpoints in the snapshot.
	pub fn edges(&self) -> &[Edge] {
		&self.edges
	}

	/// Looks a node up by id.
	pub fn node(&self, id: NodeId) -> Option<&Node> {
		self.index.get(&id).map(|&i| &self.nodes[i])
	}

	/// Whether a node with `id` exists.
	pub fn contains(&self, id: NodeId) -> bool {
		self.index.contains_key(&id)
	}

	/// Node count.
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	/// Whether the snapshot has no nodes.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Nodes adjacent to `id` in either direction.
	pub fn neighbors(&self, id: NodeId) -> HashSet<NodeId> {
		self.edges
			.iter()
			.filter_map(|e| {
				if e.source == id {
					Some(e.target)
				} else if e.target == id {
					Some(e.source)
				} else {
					None
				}
			})
			.collect()
	}

	/// Number of nodes per kind, in [`NodeKind::ALL`] order.
	pub fn kind_counts(&self) -> [(NodeKind, usize); 3] {
		NodeKind::ALL.map(|k| (k, self.nodes.iter().filter(|n| n.kind == k).count()))
	}
}

/// Merges the three source collections into one graph.
///
/// Events keep their native id; patterns and prophecies are shifted into
/// their own bands. Records whose id is outside [`NATIVE_IDS`] are skipped
/// with a warning. Relationships synthesized:
/// - `PRECEDED_BY` between consecutive events in input order;
/// - `MATCHES_PATTERN` from `events[pattern.id mod len]` to each pattern;
/// - `FULFILLED_BY` from each prophecy to `events[prophecy.id mod len]`.
///
/// The pattern and prophecy links are placeholders (the backend exposes no
/// real linkage yet) and are kept modulo-based on purpose.
pub fn assemble(events: &[Event], patterns: &[Pattern], prophecies: &[Prophecy]) -> Graph {
	let events = in_band(events, "event", |e| e.id);
	let patterns = in_band(patterns, "pattern", |p| p.id);
	let prophecies = in_band(prophecies, "prophecy", |p| p.id);

	let mut nodes = Vec::with_capacity(events.len() + patterns.len() + prophecies.len());
	nodes.extend(events.iter().map(|e| Node::from_event(e)));
	nodes.extend(patterns.iter().map(|p| Node::from_pattern(p)));
	nodes.extend(prophecies.iter().map(|p| Node::from_prophecy(p)));

	let mut edges = Vec::new();
	for pair in events.windows(2) {
		edges.push(Edge::new(
			NodeId(pair[0].id),
			NodeId(pair[1].id),
			EdgeKind::PrecededBy,
			"precedes",
		));
	}

	let linked_event = |native_id: i64| -> Option<NodeId> {
		if events.is_empty() {
			return None;
		}
		let i = native_id.rem_euclid(events.len() as i64) as usize;
		Some(NodeId(events[i].id))
	};

	for pattern in &patterns {
		if let Some(event) = linked_event(pattern.id) {
			edges.push(Edge::new(
				event,
				NodeId(BASE_PATTERN + pattern.id),
				EdgeKind::MatchesPattern,
				"matches",
			));
		}
	}
	for prophecy in &prophecies {
		if let Some(event) = linked_event(prophecy.id) {
			edges.push(Edge::new(
				NodeId(BASE_PROPHECY + prophecy.id),
				event,
				EdgeKind::FulfilledBy,
				"fulfilled by",
			));
		}
	}

	let graph = Graph::from_parts(nodes, edges);
	debug!(
		"assembled graph: {} nodes, {} edges",
		graph.nodes.len(),
		graph.edges.len()
	);
	graph
}

fn in_band<'a, T>(records: &'a [T], kind: &str, id: impl Fn(&T) -> i64) -> Vec<&'a T> {
	records
		.iter()
		.filter(|&r| {
			let ok = is_native_id(id(r));
			if !ok {
				warn!("skipping {kind} {}: id outside {NATIVE_IDS:?}", id(r));
			}
			ok
		})
		.collect()
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;

	pub(crate) fn event(id: i64, name: &str, year_start: i64) -> Event {
		Event {
			id,
			name: Some(name.into()),
			year_start,
			year_end: None,
			era: "Patriarchal".into(),
			event_type: "COVENANT".into(),
			is_pivotal: false,
			description: None,
		}
	}

	pub(crate) fn pattern(id: i64, name: &str) -> Pattern {
		Pattern {
			id,
			name: Some(name.into()),
			description: None,
			pattern_type: "CYCLE".into(),
		}
	}

	pub(crate) fn prophecy(id: i64, reference: &str) -> Prophecy {
		Prophecy {
			id,
			reference: Some(reference.into()),
			text: None,
			category: None,
		}
	}

	fn edges_of(graph: &Graph, kind: EdgeKind) -> Vec<(i64, i64)> {
		graph
			.edges()
			.iter()
			.filter(|e| e.kind == kind)
			.map(|e| (e.source.0, e.target.0))
			.collect()
	}

	#[test]
	fn test_precedence_chain_follows_input_order() {
		let events = vec![
			event(1, "Creation", -4004),
			event(2, "Flood", -2348),
			event(3, "Call of Abraham", -1996),
		];
		let graph = assemble(&events, &[], &[]);
		assert_eq!(graph.len(), 3);
		assert_eq!(edges_of(&graph, EdgeKind::PrecededBy), vec![(1, 2), (2, 3)]);
		assert!(
			graph
				.edges()
				.iter()
				.all(|e| e.label.as_deref() == Some("precedes"))
		);
	}

	#[test]
	fn test_single_or_no_event_has_no_precedence() {
		assert!(assemble(&[event(1, "Only", 0)], &[], &[]).edges().is_empty());
		assert!(assemble(&[], &[], &[]).is_empty());
	}

	#[test]
	fn test_pattern_links_by_modulo() {
		let events = vec![event(1, "Creation", -4004), event(2, "Flood", -2348)];
		let graph = assemble(&events, &[pattern(5, "Judgment after warning")], &[]);
		assert_eq!(
			edges_of(&graph, EdgeKind::MatchesPattern),
			vec![(2, BASE_PATTERN + 5)]
		);
		assert_eq!(graph.node(NodeId(BASE_PATTERN + 5)).unwrap().kind, NodeKind::Pattern);
	}

	#[test]
	fn test_prophecy_links_point_at_events() {
		let events = vec![
			event(1, "Creation", -4004),
			event(2, "Flood", -2348),
			event(3, "Call of Abraham", -1996),
		];
		let graph = assemble(&events, &[], &[prophecy(4, "Genesis 12:3"), prophecy(9, "Genesis 3:15")]);
		assert_eq!(
			edges_of(&graph, EdgeKind::FulfilledBy),
			vec![(BASE_PROPHECY + 4, 2), (BASE_PROPHECY + 9, 1)]
		);
	}

	#[test]
	fn test_no_links_without_events() {
		let graph = assemble(
			&[],
			&[pattern(1, "Exile"), pattern(2, "Return")],
			&[prophecy(1, "Daniel 2")],
		);
		assert_eq!(graph.len(), 3);
		assert!(graph.edges().is_empty());
	}

	#[test]
	fn test_id_bands_do_not_overlap() {
		let events: Vec<_> = (0..50).map(|i| event(i, "e", i)).collect();
		let patterns: Vec<_> = (0..50).map(|i| pattern(i, "p")).collect();
		let prophecies: Vec<_> = (0..50).map(|i| prophecy(i, "q")).collect();
		let graph = assemble(&events, &patterns, &prophecies);
		assert_eq!(graph.len(), 150);
		let ids: HashSet<_> = graph.nodes().iter().map(|n| n.id).collect();
		assert_eq!(ids.len(), 150);
		for node in graph.nodes() {
			let band = match node.kind {
				NodeKind::Event => 0..BASE_PATTERN,
				NodeKind::Pattern => BASE_PATTERN..BASE_PROPHECY,
				NodeKind::Prophecy => BASE_PROPHECY..BASE_PROPHECY + BASE_PATTERN,
			};
			assert!(band.contains(&node.id.0));
		}
	}

	#[test]
	fn test_out_of_band_records_are_skipped() {
		let events = vec![event(1, "Creation", -4004), event(2, "Flood", -2348)];
		let graph = assemble(
			&events,
			&[pattern(-5, "Negative"), pattern(3, "Exile")],
			&[prophecy(i64::MAX, "Overflow"), prophecy(1, "Genesis 3:15")],
		);
		assert_eq!(graph.len(), 4);
		assert!(graph.contains(NodeId(BASE_PATTERN + 3)));
		assert!(graph.contains(NodeId(BASE_PROPHECY + 1)));
		assert!(!graph.contains(NodeId(BASE_PATTERN - 5)));
		assert_eq!(graph.edges().len(), 3);
		assert!(graph.nodes().iter().all(|n| n.kind != NodeKind::Event || n.id.0 < BASE_PATTERN));

		// direct construction saturates instead of overflowing
		let node = Node::from_prophecy(&prophecy(i64::MAX, "Overflow"));
		assert_eq!(node.id, NodeId(i64::MAX));
	}

	#[test]
	fn test_assemble_is_deterministic() {
		let events = vec![event(1, "a", 1), event(2, "b", 2), event(3, "c", 3)];
		let patterns = vec![pattern(4, "p")];
		let prophecies = vec![prophecy(8, "q")];
		let a = assemble(&events, &patterns, &prophecies);
		let b = assemble(&events, &patterns, &prophecies);
		let set = |g: &Graph| g.edges().iter().cloned().collect::<HashSet<_>>();
		assert_eq!(set(&a), set(&b));
		assert_eq!(a.nodes(), b.nodes());
	}

	#[test]
	fn test_dangling_edges_and_duplicates_are_dropped() {
		let a = Node::from_event(&event(1, "a", 1));
		let dup = Node::from_event(&event(1, "duplicate", 5));
		let b = Node::from_event(&event(2, "b", 2));
		let graph = Graph::from_parts(
			vec![a, dup, b],
			vec![
				Edge::new(NodeId(1), NodeId(2), EdgeKind::PrecededBy, "precedes"),
				Edge::new(NodeId(2), NodeId(99), EdgeKind::PrecededBy, "precedes"),
			],
		);
		assert_eq!(graph.len(), 2);
		assert_eq!(graph.node(NodeId(1)).unwrap().label, "a");
		assert_eq!(graph.edges().len(), 1);
		assert_eq!(graph.neighbors(NodeId(1)), HashSet::from([NodeId(2)]));
	}

	#[test]
	fn test_fallback_labels_do_not_fail_assembly() {
		let mut nameless = event(1, "", 0);
		nameless.name = None;
		let graph = assemble(&[nameless], &[], &[]);
		assert_eq!(graph.node(NodeId(1)).unwrap().label, "Untitled event");
	}

	#[test]
	fn test_search_matches_label_or_tooltip() {
		let mut flood = event(2, "The Flood", -2348);
		flood.description = Some("Global deluge".into());
		let node = Node::from_event(&flood);
		assert!(node.matches("flood"));
		assert!(node.matches("deluge"));
		assert!(!node.matches("exodus"));
		assert_eq!(NodeKind::parse("prophecy"), Some(NodeKind::Prophecy));
		assert_eq!(NodeKind::parse(""), None);
	}

	mod properties {
		use proptest::prelude::*;

		use super::*;

		fn arb_ids(max: usize) -> impl Strategy<Value = Vec<i64>> {
			prop::collection::hash_set(NATIVE_IDS, 0..max).prop_map(|ids| ids.into_iter().collect())
		}

		fn arb_sources() -> impl Strategy<Value = (Vec<Event>, Vec<Pattern>, Vec<Prophecy>)> {
			(arb_ids(24), arb_ids(12), arb_ids(12)).prop_map(|(e, p, q)| {
				(
					e.into_iter().map(|id| event(id, "e", id)).collect(),
					p.into_iter().map(|id| pattern(id, "p")).collect(),
					q.into_iter().map(|id| prophecy(id, "q")).collect(),
				)
			})
		}

		proptest! {
			#[test]
			fn prop_node_ids_are_unique_and_banded((events, patterns, prophecies) in arb_sources()) {
				let graph = assemble(&events, &patterns, &prophecies);
				prop_assert_eq!(graph.len(), events.len() + patterns.len() + prophecies.len());
				let ids: HashSet<_> = graph.nodes().iter().map(|n| n.id).collect();
				prop_assert_eq!(ids.len(), graph.len());
				for node in graph.nodes() {
					let band = match node.kind {
						NodeKind::Event => 0,
						NodeKind::Pattern => BASE_PATTERN,
						NodeKind::Prophecy => BASE_PROPHECY,
					};
					prop_assert!((band..band + NATIVE_IDS.end).contains(&node.id.0));
				}
			}

			#[test]
			fn prop_precedence_links_consecutive_events((events, patterns, prophecies) in arb_sources()) {
				let graph = assemble(&events, &patterns, &prophecies);
				let expected: Vec<_> = events.windows(2).map(|w| (w[0].id, w[1].id)).collect();
				prop_assert_eq!(edges_of(&graph, EdgeKind::PrecededBy), expected);
			}

			#[test]
			fn prop_one_link_per_pattern_and_prophecy((events, patterns, prophecies) in arb_sources()) {
				let graph = assemble(&events, &patterns, &prophecies);
				let (want_p, want_q) = if events.is_empty() {
					(0, 0)
				} else {
					(patterns.len(), prophecies.len())
				};
				prop_assert_eq!(edges_of(&graph, EdgeKind::MatchesPattern).len(), want_p);
				prop_assert_eq!(edges_of(&graph, EdgeKind::FulfilledBy).len(), want_q);
			}

			#[test]
			fn prop_assemble_is_deterministic((events, patterns, prophecies) in arb_sources()) {
				let a = assemble(&events, &patterns, &prophecies);
				let b = assemble(&events, &patterns, &prophecies);
				prop_assert_eq!(a, b);
			}
		}
	}
}
