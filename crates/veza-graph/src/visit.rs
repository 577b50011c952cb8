//! Cycle-safe graph traversal.
//!
//! [`GraphVisitor`] walks a node hierarchy plus its reference edges,
//! visiting each reachable node at most once and handing every visit its
//! canonical [`NodePath`]. [`VisitHooks`] customizes what happens per node
//! and which edge categories are followed; the visited-once guard lives in
//! the engine and cannot be bypassed from a hook.
//!
//! Traversal order is deterministic and is part of the contract: children
//! in declaration order, then the single-reference target, then enumerable
//! entries in collection order. Traversal never mutates the graph.

use std::collections::HashSet;

use tracing::trace;

use crate::error::GraphError;
use crate::graph::NodeGraph;
use crate::id::NodeId;
use crate::index::CellIndex;
use crate::path::NodePath;

/// Per-step traversal hooks.
///
/// Gate methods return `false` to skip one category of outgoing edges for
/// one node. Errors abort the traversal immediately.
pub trait VisitHooks {
    /// Called once per visited node, before any descent.
    fn on_node(&mut self, graph: &NodeGraph, node: NodeId, path: &NodePath) -> Result<(), GraphError> {
        let _ = (graph, node, path);
        Ok(())
    }

    /// Gate for descending into the node's children.
    fn before_children(&mut self, graph: &NodeGraph, node: NodeId) -> Result<bool, GraphError> {
        let _ = (graph, node);
        Ok(true)
    }

    /// Gate for following the single-reference edge to `target`.
    fn before_single_target(
        &mut self,
        graph: &NodeGraph,
        node: NodeId,
        target: NodeId,
    ) -> Result<bool, GraphError> {
        let _ = (graph, node, target);
        Ok(true)
    }

    /// Gate for following one enumerable-reference entry to `target`.
    fn before_index_target(
        &mut self,
        graph: &NodeGraph,
        node: NodeId,
        index: &CellIndex,
        target: NodeId,
    ) -> Result<bool, GraphError> {
        let _ = (graph, node, index, target);
        Ok(true)
    }
}

/// The traversal engine.
#[derive(Debug, Default)]
pub struct GraphVisitor {
    visited: HashSet<NodeId>,
}

impl GraphVisitor {
    pub fn new() -> Self {
        GraphVisitor::default()
    }

    /// Walks the subgraph reachable from `root`, visiting every node at
    /// most once even across cycles and shared subgraphs. Fails with
    /// [`GraphError::NodeNotFound`] for a dangling root.
    pub fn visit<H: VisitHooks>(
        &mut self,
        graph: &NodeGraph,
        root: NodeId,
        hooks: &mut H,
    ) -> Result<(), GraphError> {
        graph.node(root)?;
        self.visited.clear();
        trace!(root = %root, "starting traversal");
        self.visit_node(graph, root, &NodePath::new(root), hooks)
    }

    /// Number of nodes visited by the last traversal.
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    fn visit_node<H: VisitHooks>(
        &mut self,
        graph: &NodeGraph,
        node: NodeId,
        path: &NodePath,
        hooks: &mut H,
    ) -> Result<(), GraphError> {
        if !self.visited.insert(node) {
            return Ok(());
        }
        trace!(node = %node, path = %path, "visit");
        hooks.on_node(graph, node, path)?;
        self.visit_children(graph, node, path, hooks)?;
        self.visit_single_target(graph, node, path, hooks)?;
        self.visit_enumerable_targets(graph, node, path, hooks)
    }

    fn visit_children<H: VisitHooks>(
        &mut self,
        graph: &NodeGraph,
        node: NodeId,
        path: &NodePath,
        hooks: &mut H,
    ) -> Result<(), GraphError> {
        if !hooks.before_children(graph, node)? {
            return Ok(());
        }
        for (name, child) in graph.node(node)?.children() {
            let child_path = path.push_member(name);
            self.visit_node(graph, child, &child_path, hooks)?;
        }
        Ok(())
    }

    fn visit_single_target<H: VisitHooks>(
        &mut self,
        graph: &NodeGraph,
        node: NodeId,
        path: &NodePath,
        hooks: &mut H,
    ) -> Result<(), GraphError> {
        let Some(target) = graph.node(node)?.reference().single_target() else {
            return Ok(());
        };
        if !hooks.before_single_target(graph, node, target)? {
            return Ok(());
        }
        let target_path = path.push_target();
        self.visit_node(graph, target, &target_path, hooks)
    }

    fn visit_enumerable_targets<H: VisitHooks>(
        &mut self,
        graph: &NodeGraph,
        node: NodeId,
        path: &NodePath,
        hooks: &mut H,
    ) -> Result<(), GraphError> {
        for entry in graph.node(node)?.reference().entries() {
            let Some(target) = entry.target else { continue };
            if !hooks.before_index_target(graph, node, &entry.index, target)? {
                continue;
            }
            let target_path = path.push_index(entry.index.clone());
            self.visit_node(graph, target, &target_path, hooks)?;
        }
        Ok(())
    }
}

/// Stock hooks recording every visited node with its canonical path, in
/// visit order.
#[derive(Debug, Default)]
pub struct PathCollector {
    visits: Vec<(NodeId, NodePath)>,
}

impl PathCollector {
    pub fn new() -> Self {
        PathCollector::default()
    }

    pub fn visits(&self) -> &[(NodeId, NodePath)] {
        &self.visits
    }

    pub fn into_visits(self) -> Vec<(NodeId, NodePath)> {
        self.visits
    }
}

impl VisitHooks for PathCollector {
    fn on_node(&mut self, _graph: &NodeGraph, node: NodeId, path: &NodePath) -> Result<(), GraphError> {
        self.visits.push((node, path.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use proptest::prelude::*;

    fn visit_ids(graph: &NodeGraph, root: NodeId) -> Vec<NodeId> {
        let mut visitor = GraphVisitor::new();
        let mut collector = PathCollector::new();
        visitor.visit(graph, root, &mut collector).unwrap();
        collector.into_visits().into_iter().map(|(id, _)| id).collect()
    }

    #[test]
    fn deterministic_order_children_then_single_then_enumerable() {
        let mut graph = NodeGraph::new();
        let root = graph.add_node("root", Value::Null);
        let x = graph.add_child_node(root, "x", Value::Null).unwrap();
        let y = graph.add_child_node(root, "y", Value::Null).unwrap();
        let single = graph.add_node("single", Value::Null);
        let e0 = graph.add_node("e0", Value::Null);
        let e1 = graph.add_node("e1", Value::Null);
        graph.set_single_target(root, Some(single)).unwrap();
        graph.set_indexed_target(single, CellIndex::Pos(0), Some(e0)).unwrap();
        graph.set_indexed_target(single, CellIndex::Pos(1), Some(e1)).unwrap();

        let order = visit_ids(&graph, root);
        assert_eq!(order, vec![root, x, y, single, e0, e1]);
    }

    #[test]
    fn enumerable_targets_visited_in_collection_order() {
        let mut graph = NodeGraph::new();
        let root = graph.add_node("root", Value::Null);
        let e1 = graph.add_node("e1", Value::Null);
        let e0 = graph.add_node("e0", Value::Null);
        graph.set_indexed_target(root, CellIndex::Pos(1), Some(e1)).unwrap();
        graph.set_indexed_target(root, CellIndex::Pos(0), Some(e0)).unwrap();

        // Declaration order of the entries, not numeric index order.
        let order = visit_ids(&graph, root);
        assert_eq!(order, vec![root, e1, e0]);
    }

    #[test]
    fn cycles_and_shared_nodes_are_visited_once() {
        let mut graph = NodeGraph::new();
        let root = graph.add_node("root", Value::Null);
        let a = graph.add_child_node(root, "a", Value::Null).unwrap();
        let b = graph.add_child_node(root, "b", Value::Null).unwrap();
        let shared = graph.add_node("shared", Value::Null);
        graph.set_single_target(a, Some(shared)).unwrap();
        graph.set_single_target(b, Some(shared)).unwrap();
        // Back-reference closing a cycle.
        graph.set_single_target(shared, Some(root)).unwrap();

        let order = visit_ids(&graph, root);
        assert_eq!(order, vec![root, a, shared, b]);
    }

    #[test]
    fn first_reachable_path_wins_for_shared_nodes() {
        let mut graph = NodeGraph::new();
        let root = graph.add_node("root", Value::Null);
        let a = graph.add_child_node(root, "a", Value::Null).unwrap();
        let b = graph.add_child_node(root, "b", Value::Null).unwrap();
        let shared = graph.add_node("shared", Value::Null);
        graph.set_single_target(a, Some(shared)).unwrap();
        graph.set_single_target(b, Some(shared)).unwrap();

        let mut visitor = GraphVisitor::new();
        let mut collector = PathCollector::new();
        visitor.visit(&graph, root, &mut collector).unwrap();
        let shared_path = collector
            .visits()
            .iter()
            .find(|(id, _)| *id == shared)
            .map(|(_, path)| format!("{path}"))
            .unwrap();
        assert_eq!(shared_path, "#0.a.*");
    }

    #[test]
    fn gates_skip_edge_categories() {
        struct NoChildren(Vec<NodeId>);
        impl VisitHooks for NoChildren {
            fn on_node(&mut self, _: &NodeGraph, node: NodeId, _: &NodePath) -> Result<(), GraphError> {
                self.0.push(node);
                Ok(())
            }
            fn before_children(&mut self, _: &NodeGraph, _: NodeId) -> Result<bool, GraphError> {
                Ok(false)
            }
        }

        let mut graph = NodeGraph::new();
        let root = graph.add_node("root", Value::Null);
        graph.add_child_node(root, "child", Value::Null).unwrap();
        let target = graph.add_node("target", Value::Null);
        graph.set_single_target(root, Some(target)).unwrap();

        let mut hooks = NoChildren(Vec::new());
        GraphVisitor::new().visit(&graph, root, &mut hooks).unwrap();
        assert_eq!(hooks.0, vec![root, target]);
    }

    #[test]
    fn dangling_root_fails() {
        let graph = NodeGraph::new();
        let err = GraphVisitor::new()
            .visit(&graph, NodeId(4), &mut PathCollector::new())
            .unwrap_err();
        assert!(matches!(err, GraphError::NodeNotFound { .. }));
    }

    proptest! {
        #[test]
        fn visits_every_reachable_node_exactly_once(
            parents in proptest::collection::vec(0usize..1000, 0..24),
            refs in proptest::collection::vec((0usize..1000, 0usize..1000), 0..24),
        ) {
            let mut graph = NodeGraph::new();
            let root = graph.add_node("root", Value::Null);
            let mut ids = vec![root];
            for (i, p) in parents.iter().enumerate() {
                let parent = ids[p % ids.len()];
                let child = graph
                    .add_child_node(parent, format!("n{i}"), Value::Int(i as i64))
                    .unwrap();
                ids.push(child);
            }
            for (a, b) in &refs {
                let from = ids[a % ids.len()];
                let to = ids[b % ids.len()];
                if graph.node(from).unwrap().reference().is_none() {
                    graph.set_single_target(from, Some(to)).unwrap();
                }
            }

            let visited = visit_ids(&graph, root);
            let unique: HashSet<NodeId> = visited.iter().copied().collect();
            prop_assert_eq!(unique.len(), visited.len());
            // The child tree alone reaches every node.
            prop_assert_eq!(unique.len(), ids.len());
        }
    }
}
