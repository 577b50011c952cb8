//! Linking two object hierarchies node by node.
//!
//! [`GraphLinker`] walks a "source" hierarchy and, for every visited node,
//! resolves the structurally corresponding node of a "target" hierarchy,
//! invoking a callback per pair. A missing counterpart is reported as
//! `None`, never as an error. Matching is pluggable through two strategy
//! traits; the defaults pair children by member name and reference targets
//! by collection index, which is the correspondence used when propagating
//! edits from a prototype hierarchy to one derived from it.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::error::GraphError;
use crate::graph::NodeGraph;
use crate::id::NodeId;
use crate::index::CellIndex;
use crate::path::NodePath;
use crate::visit::{GraphVisitor, VisitHooks};

/// Identity-keyed correspondence from source nodes to target nodes.
///
/// Distinguishes "never seeded" (`get` returns `None`) from "seeded with no
/// counterpart" (`get` returns `Some(None)`).
#[derive(Debug, Default)]
pub struct Correspondence {
    map: HashMap<NodeId, Option<NodeId>>,
}

impl Correspondence {
    /// The raw entry for `source`: unseeded, seeded empty, or paired.
    pub fn get(&self, source: NodeId) -> Option<Option<NodeId>> {
        self.map.get(&source).copied()
    }

    /// The resolved counterpart; `None` when unseeded or seeded empty.
    pub fn target_of(&self, source: NodeId) -> Option<NodeId> {
        self.get(source).flatten()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Option<NodeId>)> + '_ {
        self.map.iter().map(|(source, target)| (*source, *target))
    }

    /// First seed wins: a node reachable from two parents keeps the pairing
    /// of the first reachable path.
    fn seed(&mut self, source: NodeId, target: Option<NodeId>) {
        self.map.entry(source).or_insert(target);
    }

    /// Overwrites whatever was seeded; the resolved pairing is final.
    fn record(&mut self, source: NodeId, target: Option<NodeId>) {
        self.map.insert(source, target);
    }

    fn clear(&mut self) {
        self.map.clear();
    }
}

/// Resolves the target counterpart of a visited source node.
pub trait MatchStrategy {
    fn find_target(
        &mut self,
        graph: &NodeGraph,
        links: &Correspondence,
        source: NodeId,
    ) -> Option<NodeId>;
}

/// The default match: return what the parent steps seeded, if anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SeededMatch;

impl MatchStrategy for SeededMatch {
    fn find_target(
        &mut self,
        _graph: &NodeGraph,
        links: &Correspondence,
        source: NodeId,
    ) -> Option<NodeId> {
        links.target_of(source)
    }
}

/// Resolves which target-side node a source reference edge corresponds to.
pub trait ReferenceMatchStrategy {
    /// `index` is `None` for a single reference and the entry index for an
    /// enumerable reference.
    fn find_target_reference(
        &mut self,
        graph: &NodeGraph,
        source: NodeId,
        target: NodeId,
        index: Option<&CellIndex>,
    ) -> Option<NodeId>;
}

/// The default reference match: same kind, same collection index.
#[derive(Debug, Default, Clone, Copy)]
pub struct IndexedReferenceMatch;

impl ReferenceMatchStrategy for IndexedReferenceMatch {
    fn find_target_reference(
        &mut self,
        graph: &NodeGraph,
        _source: NodeId,
        target: NodeId,
        index: Option<&CellIndex>,
    ) -> Option<NodeId> {
        let node = graph.get(target)?;
        match index {
            None => node.reference().single_target(),
            Some(i) => node.reference().entry_at(i).and_then(|e| e.target),
        }
    }
}

/// Pairs every reachable node of a source hierarchy with a node of a target
/// hierarchy, or with nothing.
pub struct GraphLinker<M = SeededMatch, R = IndexedReferenceMatch> {
    matcher: M,
    reference_matcher: R,
    links: Correspondence,
}

impl GraphLinker {
    /// A linker with the default name/index matching strategies.
    pub fn new() -> Self {
        GraphLinker {
            matcher: SeededMatch,
            reference_matcher: IndexedReferenceMatch,
            links: Correspondence::default(),
        }
    }
}

impl Default for GraphLinker {
    fn default() -> Self {
        GraphLinker::new()
    }
}

impl<M: MatchStrategy, R: ReferenceMatchStrategy> GraphLinker<M, R> {
    /// Replaces the node match strategy.
    pub fn with_match_strategy<M2: MatchStrategy>(self, matcher: M2) -> GraphLinker<M2, R> {
        GraphLinker {
            matcher,
            reference_matcher: self.reference_matcher,
            links: self.links,
        }
    }

    /// Replaces the reference match strategy.
    pub fn with_reference_strategy<R2: ReferenceMatchStrategy>(
        self,
        reference_matcher: R2,
    ) -> GraphLinker<M, R2> {
        GraphLinker {
            matcher: self.matcher,
            reference_matcher,
            links: self.links,
        }
    }

    /// Pairings established by the last [`link_graph`](Self::link_graph)
    /// run, for callers applying mirrored edits afterwards.
    pub fn links(&self) -> &Correspondence {
        &self.links
    }

    /// Visits the hierarchy under `source_root` and invokes `on_link` once
    /// per source node with its counterpart. A `None` counterpart means "no
    /// match found" and is a valid outcome, not an error.
    ///
    /// `target_root` may be `None` to link against nothing: every pairing
    /// comes out `None`.
    pub fn link_graph<F>(
        &mut self,
        graph: &NodeGraph,
        source_root: NodeId,
        target_root: Option<NodeId>,
        mut on_link: F,
    ) -> Result<(), GraphError>
    where
        F: FnMut(NodeId, Option<NodeId>),
    {
        graph.node(source_root)?;
        if let Some(target) = target_root {
            graph.node(target)?;
        }
        self.links.clear();
        self.links.seed(source_root, target_root);
        debug!(source = %source_root, target = ?target_root, "linking hierarchies");

        let mut hooks = LinkerHooks {
            matcher: &mut self.matcher,
            reference_matcher: &mut self.reference_matcher,
            links: &mut self.links,
            on_link: &mut on_link,
        };
        GraphVisitor::new().visit(graph, source_root, &mut hooks)
    }
}

struct LinkerHooks<'a, M, R, F> {
    matcher: &'a mut M,
    reference_matcher: &'a mut R,
    links: &'a mut Correspondence,
    on_link: &'a mut F,
}

impl<M, R, F> VisitHooks for LinkerHooks<'_, M, R, F>
where
    M: MatchStrategy,
    R: ReferenceMatchStrategy,
    F: FnMut(NodeId, Option<NodeId>),
{
    fn on_node(&mut self, graph: &NodeGraph, node: NodeId, _path: &NodePath) -> Result<(), GraphError> {
        let target = self.matcher.find_target(graph, self.links, node);
        self.links.record(node, target);
        trace!(source = %node, target = ?target, "link");
        (self.on_link)(node, target);
        Ok(())
    }

    fn before_children(&mut self, graph: &NodeGraph, node: NodeId) -> Result<bool, GraphError> {
        let counterpart = self.links.target_of(node);
        for (name, child) in graph.node(node)?.children() {
            let seeded = counterpart.and_then(|c| graph.get_child(c, name));
            self.links.seed(child, seeded);
        }
        Ok(true)
    }

    fn before_single_target(
        &mut self,
        graph: &NodeGraph,
        node: NodeId,
        target: NodeId,
    ) -> Result<bool, GraphError> {
        let counterpart = self.links.target_of(node);
        let seeded = counterpart
            .and_then(|c| self.reference_matcher.find_target_reference(graph, node, c, None));
        self.links.seed(target, seeded);
        Ok(true)
    }

    fn before_index_target(
        &mut self,
        graph: &NodeGraph,
        node: NodeId,
        index: &CellIndex,
        target: NodeId,
    ) -> Result<bool, GraphError> {
        let counterpart = self.links.target_of(node);
        let seeded = counterpart.and_then(|c| {
            self.reference_matcher
                .find_target_reference(graph, node, c, Some(index))
        });
        self.links.seed(target, seeded);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use proptest::prelude::*;

    /// Builds `root { transform { position }, items }` and returns the ids.
    fn build_entity(graph: &mut NodeGraph, tag: &str) -> (NodeId, NodeId, NodeId, NodeId) {
        let root = graph.add_node(format!("root-{tag}"), Value::Null);
        let transform = graph.add_child_node(root, "transform", Value::Null).unwrap();
        let position = graph
            .add_child_node(transform, "position", Value::Float(1.0))
            .unwrap();
        let items = graph
            .add_child_node(root, "items", Value::Seq(vec![]))
            .unwrap();
        (root, transform, position, items)
    }

    fn link_pairs<M: MatchStrategy, R: ReferenceMatchStrategy>(
        linker: &mut GraphLinker<M, R>,
        graph: &NodeGraph,
        source: NodeId,
        target: Option<NodeId>,
    ) -> Vec<(NodeId, Option<NodeId>)> {
        let mut pairs = Vec::new();
        linker
            .link_graph(graph, source, target, |s, t| pairs.push((s, t)))
            .unwrap();
        pairs
    }

    #[test]
    fn identical_shape_pairs_every_node() {
        let mut graph = NodeGraph::new();
        let (s_root, s_transform, s_position, s_items) = build_entity(&mut graph, "src");
        let (t_root, t_transform, t_position, t_items) = build_entity(&mut graph, "dst");

        let mut linker = GraphLinker::new();
        let pairs = link_pairs(&mut linker, &graph, s_root, Some(t_root));

        assert_eq!(
            pairs,
            vec![
                (s_root, Some(t_root)),
                (s_transform, Some(t_transform)),
                (s_position, Some(t_position)),
                (s_items, Some(t_items)),
            ]
        );
    }

    #[test]
    fn missing_subtree_pairs_with_none() {
        let mut graph = NodeGraph::new();
        let (s_root, _, s_position, _) = build_entity(&mut graph, "src");
        // Target lacks the whole "transform" subtree.
        let t_root = graph.add_node("root-dst", Value::Null);
        graph
            .add_child_node(t_root, "items", Value::Seq(vec![]))
            .unwrap();

        let mut linker = GraphLinker::new();
        let pairs = link_pairs(&mut linker, &graph, s_root, Some(t_root));

        let position_pair = pairs.iter().find(|(s, _)| *s == s_position).unwrap();
        assert_eq!(position_pair.1, None);
        assert!(pairs.iter().any(|(_, t)| t.is_some()));
    }

    #[test]
    fn linking_against_nothing_pairs_all_none() {
        let mut graph = NodeGraph::new();
        let (s_root, ..) = build_entity(&mut graph, "src");

        let mut linker = GraphLinker::new();
        let pairs = link_pairs(&mut linker, &graph, s_root, None);

        assert_eq!(pairs.len(), 4);
        assert!(pairs.iter().all(|(_, t)| t.is_none()));
    }

    #[test]
    fn single_reference_targets_are_paired_through_the_counterpart() {
        let mut graph = NodeGraph::new();
        // source: root -> child "holder" --single--> detached "payload" { leaf }
        let s_root = graph.add_node("s", Value::Null);
        let s_holder = graph.add_child_node(s_root, "holder", Value::Null).unwrap();
        let s_payload = graph.add_node("payload", Value::Null);
        let s_leaf = graph.add_child_node(s_payload, "leaf", Value::Int(1)).unwrap();
        graph.set_single_target(s_holder, Some(s_payload)).unwrap();
        // target mirror
        let t_root = graph.add_node("t", Value::Null);
        let t_holder = graph.add_child_node(t_root, "holder", Value::Null).unwrap();
        let t_payload = graph.add_node("payload", Value::Null);
        let t_leaf = graph.add_child_node(t_payload, "leaf", Value::Int(2)).unwrap();
        graph.set_single_target(t_holder, Some(t_payload)).unwrap();

        let mut linker = GraphLinker::new();
        let pairs = link_pairs(&mut linker, &graph, s_root, Some(t_root));

        assert!(pairs.contains(&(s_payload, Some(t_payload))));
        assert!(pairs.contains(&(s_leaf, Some(t_leaf))));
        assert_eq!(linker.links().target_of(s_payload), Some(t_payload));
    }

    #[test]
    fn enumerable_entries_are_paired_by_index() {
        let mut graph = NodeGraph::new();
        let s_root = graph.add_node("s", Value::Null);
        let s_e0 = graph.add_node("s-e0", Value::Null);
        let s_e1 = graph.add_node("s-e1", Value::Null);
        graph.set_indexed_target(s_root, CellIndex::Pos(0), Some(s_e0)).unwrap();
        graph.set_indexed_target(s_root, CellIndex::Pos(1), Some(s_e1)).unwrap();

        let t_root = graph.add_node("t", Value::Null);
        let t_e0 = graph.add_node("t-e0", Value::Null);
        // The target collection only has the entry at index 0.
        graph.set_indexed_target(t_root, CellIndex::Pos(0), Some(t_e0)).unwrap();

        let mut linker = GraphLinker::new();
        let pairs = link_pairs(&mut linker, &graph, s_root, Some(t_root));

        assert!(pairs.contains(&(s_e0, Some(t_e0))));
        assert!(pairs.contains(&(s_e1, None)));
    }

    #[test]
    fn source_nodes_are_linked_at_most_once() {
        let mut graph = NodeGraph::new();
        let s_root = graph.add_node("s", Value::Null);
        let s_a = graph.add_child_node(s_root, "a", Value::Null).unwrap();
        let s_b = graph.add_child_node(s_root, "b", Value::Null).unwrap();
        // Both children reference the root: a cycle back into linked nodes.
        graph.set_single_target(s_a, Some(s_root)).unwrap();
        graph.set_single_target(s_b, Some(s_root)).unwrap();

        let mut linker = GraphLinker::new();
        let pairs = link_pairs(&mut linker, &graph, s_root, None);
        assert_eq!(pairs.len(), 3);
    }

    #[test]
    fn custom_match_strategy_overrides_pairing() {
        /// Pairs every source node with the fixed target, ignoring seeds.
        struct Pin(NodeId);
        impl MatchStrategy for Pin {
            fn find_target(
                &mut self,
                _graph: &NodeGraph,
                _links: &Correspondence,
                _source: NodeId,
            ) -> Option<NodeId> {
                Some(self.0)
            }
        }

        let mut graph = NodeGraph::new();
        let s_root = graph.add_node("s", Value::Null);
        graph.add_child_node(s_root, "a", Value::Null).unwrap();
        let pin = graph.add_node("pin", Value::Null);

        let mut linker = GraphLinker::new().with_match_strategy(Pin(pin));
        let pairs = link_pairs(&mut linker, &graph, s_root, None);
        assert!(pairs.iter().all(|(_, t)| *t == Some(pin)));
    }

    #[test]
    fn dangling_source_root_fails() {
        let graph = NodeGraph::new();
        let mut linker = GraphLinker::new();
        let err = linker
            .link_graph(&graph, NodeId(7), None, |_, _| {})
            .unwrap_err();
        assert!(matches!(err, GraphError::NodeNotFound { .. }));
    }

    proptest! {
        #[test]
        fn mirrored_trees_pair_every_node(
            parents in proptest::collection::vec(0usize..1000, 0..16),
        ) {
            let mut graph = NodeGraph::new();
            let build = |graph: &mut NodeGraph, tag: &str| {
                let root = graph.add_node(format!("root-{tag}"), Value::Null);
                let mut ids = vec![root];
                for (i, p) in parents.iter().enumerate() {
                    let parent = ids[p % ids.len()];
                    let child = graph
                        .add_child_node(parent, format!("n{i}"), Value::Null)
                        .unwrap();
                    ids.push(child);
                }
                ids
            };
            let source_ids = build(&mut graph, "s");
            let target_ids = build(&mut graph, "t");

            let mut linker = GraphLinker::new();
            let mut pairs = Vec::new();
            linker
                .link_graph(&graph, source_ids[0], Some(target_ids[0]), |s, t| {
                    pairs.push((s, t))
                })
                .unwrap();

            prop_assert_eq!(pairs.len(), source_ids.len());
            for (source, target) in &pairs {
                let position = source_ids.iter().position(|id| id == source).unwrap();
                prop_assert_eq!(*target, Some(target_ids[position]));
            }
        }
    }
}
