//! Core domain types for Aragorn queries and answers.

use serde::{Deserialize, Serialize};

use crate::error::AragornError;

/// An opaque JSON object, the shape every service exchanges.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// The request envelope: `{"message": {query_graph, knowledge_graph, results}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message: MessageBody,
    /// Top-level keys this crate does not model (e.g. `max_results`).
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Body of a [`Message`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageBody {
    /// The pattern being asked about.
    pub query_graph: QueryGraph,
    /// Evidence subgraph (empty on requests).
    #[serde(default)]
    pub knowledge_graph: KnowledgeGraph,
    /// Answers binding query graph elements to knowledge graph elements.
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

// ---------------------------------------------------------------------------
// Query graph
// ---------------------------------------------------------------------------

/// Declarative node/edge pattern describing a query.
///
/// Only the list form (`"nodes": [{"id": ...}]`) is accepted. A query graph
/// keyed by node id is rejected at deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryGraph {
    pub nodes: Vec<QueryNode>,
    pub edges: Vec<QueryEdge>,
}

/// A query graph node, optionally bound to a concrete concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryNode {
    pub id: String,
    /// Semantic type, e.g. `disease`.
    #[serde(rename = "type")]
    pub node_type: String,
    /// Bound concept identifier, e.g. `MONDO:0005148`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curie: Option<String>,
    /// Unmodelled node properties such as `set`.
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// A directed query graph edge between two node ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryEdge {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<String>,
    #[serde(flatten)]
    pub extra: JsonMap,
}

/// Concrete entities and relationships returned as evidence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    #[serde(default)]
    pub nodes: Vec<serde_json::Value>,
    #[serde(default)]
    pub edges: Vec<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// MergeStrategy
// ---------------------------------------------------------------------------

/// Answer-coalesce strategy applied between expansion and annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Skip the merge stage entirely.
    #[default]
    None,
    /// Coalesce using the named method (`all`, `graph`, `property`, `ontology`, ...).
    Coalesce(String),
}

impl std::fmt::Display for MergeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Coalesce(kind) => write!(f, "{kind}"),
        }
    }
}

impl std::str::FromStr for MergeStrategy {
    type Err = AragornError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "" => Err(AragornError::validation("merge strategy must not be empty")),
            "none" => Ok(Self::None),
            kind => {
                check_path_segment(kind)?;
                Ok(Self::Coalesce(kind.to_string()))
            }
        }
    }
}

/// Reject a coalesce method that would not stay a single URL path segment.
pub fn check_path_segment(kind: &str) -> std::result::Result<(), AragornError> {
    let reserved = matches!(kind, "" | "." | "..")
        || kind.contains(['/', '\\', '?', '#']);
    if reserved {
        return Err(AragornError::validation(format!(
            "merge strategy '{kind}' must be a single path segment"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message() -> Message {
        Message {
            message: MessageBody {
                query_graph: QueryGraph {
                    nodes: vec![
                        QueryNode {
                            id: "a".into(),
                            node_type: "disease".into(),
                            curie: Some("MONDO:0005148".into()),
                            extra: JsonMap::new(),
                        },
                        QueryNode {
                            id: "b".into(),
                            node_type: "gene".into(),
                            curie: None,
                            extra: JsonMap::new(),
                        },
                    ],
                    edges: vec![QueryEdge {
                        id: "ab".into(),
                        source_id: "a".into(),
                        target_id: "b".into(),
                        edge_type: None,
                        extra: JsonMap::new(),
                    }],
                },
                knowledge_graph: KnowledgeGraph::default(),
                results: vec![],
                extra: JsonMap::new(),
            },
            extra: JsonMap::new(),
        }
    }

    #[test]
    fn message_serializes_to_wire_shape() {
        let value = serde_json::to_value(sample_message()).expect("serialize");
        let body = &value["message"];

        assert_eq!(body["query_graph"]["nodes"][0]["type"], "disease");
        assert_eq!(body["query_graph"]["nodes"][0]["curie"], "MONDO:0005148");
        // Unbound node and untyped edge omit the optional keys
        assert!(body["query_graph"]["nodes"][1].get("curie").is_none());
        assert!(body["query_graph"]["edges"][0].get("type").is_none());
        assert_eq!(body["knowledge_graph"], serde_json::json!({"nodes": [], "edges": []}));
        assert_eq!(body["results"], serde_json::json!([]));
    }

    #[test]
    fn message_fixture_validates() {
        let fixture = std::fs::read_to_string("../../../fixtures/json/one_hop_message.fixture.json")
            .expect("read fixture");
        let parsed: Message = serde_json::from_str(&fixture).expect("deserialize fixture message");
        assert_eq!(parsed.message.query_graph.nodes.len(), 2);
        assert_eq!(parsed.message.query_graph.edges.len(), 1);
        assert_eq!(
            parsed.message.query_graph.edges[0].edge_type.as_deref(),
            Some("treats")
        );
    }

    #[test]
    fn merge_strategy_parsing() {
        assert_eq!("none".parse::<MergeStrategy>().unwrap(), MergeStrategy::None);
        assert_eq!(
            "all".parse::<MergeStrategy>().unwrap(),
            MergeStrategy::Coalesce("all".into())
        );
        assert!("".parse::<MergeStrategy>().is_err());
        assert!("a/b".parse::<MergeStrategy>().is_err());
        assert_eq!(MergeStrategy::default().to_string(), "none");
    }

    #[test]
    fn merge_strategy_rejects_url_syntax() {
        for bad in [".", "..", "all?x=1", "all#frag", "a\\b", " .. "] {
            let err = bad.parse::<MergeStrategy>().unwrap_err();
            assert!(
                matches!(err, AragornError::Validation { .. }),
                "{bad:?} gave {err}"
            );
        }
        // Dots inside a name are fine
        assert_eq!(
            "v1.2".parse::<MergeStrategy>().unwrap(),
            MergeStrategy::Coalesce("v1.2".into())
        );
    }

    #[test]
    fn unknown_fields_survive_roundtrip() {
        let input = serde_json::json!({
            "max_results": 10,
            "message": {
                "query_graph": {
                    "nodes": [
                        {"id": "a", "type": "disease", "curie": "MONDO:0005148", "set": false},
                        {"id": "b", "type": "gene", "set": true}
                    ],
                    "edges": [
                        {"id": "ab", "source_id": "a", "target_id": "b", "negated": false}
                    ]
                },
                "knowledge_graph": {"nodes": [], "edges": []},
                "results": [],
                "logs": ["kept"]
            }
        });

        let parsed: Message = serde_json::from_value(input.clone()).expect("deserialize");
        assert_eq!(parsed.extra.get("max_results"), Some(&serde_json::json!(10)));
        assert_eq!(
            parsed.message.query_graph.nodes[1].extra.get("set"),
            Some(&serde_json::json!(true))
        );
        assert!(!parsed.message.query_graph.nodes[0].extra.contains_key("curie"));

        let back = serde_json::to_value(&parsed).expect("serialize");
        assert_eq!(back, input);
    }

    #[test]
    fn keyed_query_graph_is_rejected() {
        let input = serde_json::json!({
            "message": {
                "query_graph": {
                    "nodes": {"n0": {"categories": ["biolink:Disease"]}},
                    "edges": {}
                }
            }
        });
        assert!(serde_json::from_value::<Message>(input).is_err());
    }
}
