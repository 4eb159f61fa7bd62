//! Node/edge export of adjacency snapshots
//!
//! Force-directed graph viewers want a list of nodes and a list of
//! links. Each undirected tree edge shows up twice (A→B and B→A);
//! consumers wanting one link per edge collapse them with
//! [`NodesAndEdges::dedup_links`].

use std::hash::Hash;

use serde::Serialize;

use crate::AdjacencyList;

/// A node entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportNode<K> {
    pub id: K,
}

/// A directed link entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportLink<K> {
    pub source: K,
    pub target: K,
}

/// Nodes and links view of a snapshot, sorted by key
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NodesAndEdges<K> {
    pub nodes: Vec<ExportNode<K>>,
    pub links: Vec<ExportLink<K>>,
}

impl<K> NodesAndEdges<K>
where
    K: Clone + Eq + Hash + Ord,
{
    pub fn from_adjacency<V>(list: &AdjacencyList<K, V>) -> Self {
        let mut nodes = Vec::with_capacity(list.len());
        let mut links = Vec::with_capacity(list.link_count());

        for (key, node) in list {
            nodes.push(ExportNode { id: key.clone() });
            for target in node.neighbors.iter() {
                links.push(ExportLink {
                    source: key.clone(),
                    target: target.clone(),
                });
            }
        }

        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        links.sort_by(|a, b| (&a.source, &a.target).cmp(&(&b.source, &b.target)));
        NodesAndEdges { nodes, links }
    }

    /// Keep one link per undirected edge, with `source < target`
    pub fn dedup_links(mut self) -> Self {
        self.links.retain(|l| l.source < l.target);
        self
    }
}

impl<K, V> From<&AdjacencyList<K, V>> for NodesAndEdges<K>
where
    K: Clone + Eq + Hash + Ord,
{
    fn from(list: &AdjacencyList<K, V>) -> Self {
        NodesAndEdges::from_adjacency(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tree;

    #[test]
    fn test_export_lists_both_directions() {
        let mut tree = Tree::new();
        tree.upsert("a", ());
        tree.upsert("b", ());
        tree.upsert("c", ());

        let export = NodesAndEdges::from(&tree.adjacency_list());
        assert_eq!(export.nodes.len(), 3);
        assert_eq!(export.links.len(), 4);
        assert_eq!(
            export.links[0],
            ExportLink {
                source: "a",
                target: "b"
            }
        );

        let deduped = export.dedup_links();
        assert_eq!(deduped.links.len(), 2);
    }

    #[test]
    fn test_export_serializes() {
        let mut tree = Tree::new();
        tree.upsert(1u32, "x");
        tree.upsert(2u32, "y");

        let export = NodesAndEdges::from(&tree.adjacency_list());
        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "nodes": [{"id": 1}, {"id": 2}],
                "links": [
                    {"source": 1, "target": 2},
                    {"source": 2, "target": 1}
                ]
            })
        );
    }
}
