//! One-hop query construction.

use aragorn_shared::{
    JsonMap, KnowledgeGraph, Message, MessageBody, QueryEdge, QueryGraph, QueryNode,
};

/// Build a two-node, one-edge query: `a` (bound to `curie_a`) → `b` (any `type_b`).
///
/// When `edge_type` is given it is set on the edge, and `reverse` flips the
/// edge to `b → a`. Without an edge type the edge stays `a → b`.
pub fn one_hop_message(
    curie_a: &str,
    type_a: &str,
    type_b: &str,
    edge_type: Option<&str>,
    reverse: bool,
) -> Message {
    let mut edge = QueryEdge {
        id: "ab".into(),
        source_id: "a".into(),
        target_id: "b".into(),
        edge_type: None,
        extra: JsonMap::new(),
    };

    if let Some(edge_type) = edge_type {
        edge.edge_type = Some(edge_type.to_string());

        if reverse {
            std::mem::swap(&mut edge.source_id, &mut edge.target_id);
        }
    }

    Message {
        message: MessageBody {
            query_graph: QueryGraph {
                nodes: vec![
                    QueryNode {
                        id: "a".into(),
                        node_type: type_a.to_string(),
                        curie: Some(curie_a.to_string()),
                        extra: JsonMap::new(),
                    },
                    QueryNode {
                        id: "b".into(),
                        node_type: type_b.to_string(),
                        curie: None,
                        extra: JsonMap::new(),
                    },
                ],
                edges: vec![edge],
            },
            knowledge_graph: KnowledgeGraph::default(),
            results: Vec::new(),
            extra: JsonMap::new(),
        },
        extra: JsonMap::new(),
    }
}
