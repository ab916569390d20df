use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A scalar identifier as it arrives from the extractor. Some models emit
/// numeric ids, which are kept as text from here on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarId {
    Text(String),
    Number(serde_json::Number),
}

impl ScalarId {
    /// The id as text, or `None` when it is blank.
    pub fn as_key(&self) -> Option<String> {
        match self {
            ScalarId::Text(text) if text.trim().is_empty() => None,
            ScalarId::Text(text) => Some(text.clone()),
            ScalarId::Number(number) => Some(number.to_string()),
        }
    }
}

/// Node-shaped object used as an edge endpoint (force-graph clients send
/// back the whole node, including layout fields, which are ignored).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointObject {
    #[serde(default)]
    pub id: Option<ScalarId>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Edge endpoint: either a bare id or an object carrying one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged, from = "Value")]
pub enum Endpoint {
    Id(ScalarId),
    Object(EndpointObject),
    Unsupported(serde_json::Value),
}

impl Endpoint {
    /// Collapse the endpoint into the node key it refers to.
    pub fn resolve(&self) -> Option<String> {
        match self {
            Endpoint::Id(id) => id.as_key(),
            Endpoint::Object(object) => object
                .id
                .as_ref()
                .and_then(ScalarId::as_key)
                .or_else(|| non_blank(object.name.as_deref())),
            Endpoint::Unsupported(_) => None,
        }
    }
}

impl From<Value> for Endpoint {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Endpoint::Id(ScalarId::Text(text)),
            Value::Number(number) => Endpoint::Id(ScalarId::Number(number)),
            Value::Object(map) => Endpoint::Object(EndpointObject {
                id: scalar_field(&map, "id"),
                name: text_field(&map, "name"),
            }),
            other => Endpoint::Unsupported(other),
        }
    }
}

impl From<&str> for Endpoint {
    fn from(id: &str) -> Self {
        Endpoint::Id(ScalarId::Text(id.to_string()))
    }
}

/// Any JSON object is a record. Fields of the wrong type are ignored so
/// that a usable identity is never lost to a bad sibling field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct NodeRecord {
    pub id: Option<ScalarId>,
    pub name: Option<String>,
    /// Also read from `source_work`; `work` wins when both are set.
    pub work: Option<String>,
    pub description: Option<String>,
}

impl TryFrom<Value> for NodeRecord {
    type Error = String;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self {
                id: scalar_field(&map, "id"),
                name: text_field(&map, "name"),
                work: work_field(&map),
                description: text_field(&map, "description"),
            }),
            other => Err(format!("expected a node object, got {other}")),
        }
    }
}

/// A node as emitted by the extractor: a bare name, a record, or something
/// unusable that is reported and skipped during the build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNode {
    Name(String),
    Record(NodeRecord),
    Unsupported(serde_json::Value),
}

impl RawNode {
    pub fn with_id(id: &str) -> Self {
        RawNode::Record(NodeRecord {
            id: Some(ScalarId::Text(id.to_string())),
            ..NodeRecord::default()
        })
    }

    /// Identity key: `id`, falling back to `name`.
    pub fn key(&self) -> Option<String> {
        match self {
            RawNode::Name(name) => non_blank(Some(name.as_str())),
            RawNode::Record(record) => record
                .id
                .as_ref()
                .and_then(ScalarId::as_key)
                .or_else(|| non_blank(record.name.as_deref())),
            RawNode::Unsupported(_) => None,
        }
    }

    pub fn name(&self) -> Option<String> {
        match self {
            RawNode::Name(name) => non_blank(Some(name.as_str())),
            RawNode::Record(record) => non_blank(record.name.as_deref()),
            RawNode::Unsupported(_) => None,
        }
    }

    pub fn work(&self) -> Option<String> {
        match self {
            RawNode::Record(record) => non_blank(record.work.as_deref()),
            _ => None,
        }
    }

    pub fn description(&self) -> Option<String> {
        match self {
            RawNode::Record(record) => non_blank(record.description.as_deref()),
            _ => None,
        }
    }
}

/// An edge as emitted by the extractor. Decoding never fails: anything that
/// is not an object, or lacks usable endpoints, is skipped by the builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct RawEdge {
    pub source: Option<Endpoint>,
    pub target: Option<Endpoint>,
    /// Also read from `relation`.
    pub label: Option<String>,
    /// Also read from `source_work`.
    pub work: Option<String>,
}

impl From<Value> for RawEdge {
    fn from(value: Value) -> Self {
        let Value::Object(map) = value else {
            return Self {
                source: None,
                target: None,
                label: None,
                work: None,
            };
        };
        let endpoint = |key: &str| {
            map.get(key)
                .filter(|v| !v.is_null())
                .cloned()
                .map(Endpoint::from)
        };
        Self {
            source: endpoint("source"),
            target: endpoint("target"),
            label: text_field(&map, "label")
                .filter(|l| !l.trim().is_empty())
                .or_else(|| text_field(&map, "relation")),
            work: work_field(&map),
        }
    }
}

impl RawEdge {
    pub fn between(source: &str, target: &str) -> Self {
        Self {
            source: Some(source.into()),
            target: Some(target.into()),
            label: None,
            work: None,
        }
    }

    pub fn labelled(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }
}

/// Raw output of one extraction call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(default)]
    pub nodes: Vec<RawNode>,
    #[serde(default, alias = "links")]
    pub edges: Vec<RawEdge>,
}

impl ExtractionResult {
    /// Fill in a work label on every node and edge that has none.
    pub fn stamp_work(&mut self, work: &str) {
        for node in &mut self.nodes {
            match node {
                RawNode::Name(name) => {
                    *node = RawNode::Record(NodeRecord {
                        id: Some(ScalarId::Text(name.clone())),
                        name: Some(name.clone()),
                        work: Some(work.to_string()),
                        description: None,
                    });
                }
                RawNode::Record(record) if non_blank(record.work.as_deref()).is_none() => {
                    record.work = Some(work.to_string());
                }
                _ => {}
            }
        }
        for edge in &mut self.edges {
            if non_blank(edge.work.as_deref()).is_none() {
                edge.work = Some(work.to_string());
            }
        }
    }
}

fn text_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

fn scalar_field(map: &Map<String, Value>, key: &str) -> Option<ScalarId> {
    match map.get(key)? {
        Value::String(text) => Some(ScalarId::Text(text.clone())),
        Value::Number(number) => Some(ScalarId::Number(number.clone())),
        _ => None,
    }
}

fn work_field(map: &Map<String, Value>) -> Option<String> {
    text_field(map, "work")
        .filter(|w| !w.trim().is_empty())
        .or_else(|| text_field(map, "source_work"))
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_endpoint_resolves_to_id() {
        let edge: RawEdge = serde_json::from_value(json!({
            "source": {"id": "A", "name": "Alice", "x": 1.5},
            "target": "B"
        }))
        .unwrap();

        assert_eq!(edge.source.unwrap().resolve().as_deref(), Some("A"));
        assert_eq!(edge.target.unwrap().resolve().as_deref(), Some("B"));
    }

    #[test]
    fn test_numeric_ids_become_text() {
        let edge: RawEdge = serde_json::from_value(json!({"source": 7, "target": {"id": 8}})).unwrap();
        assert_eq!(edge.source.unwrap().resolve().as_deref(), Some("7"));
        assert_eq!(edge.target.unwrap().resolve().as_deref(), Some("8"));
    }

    #[test]
    fn test_unsupported_shapes_do_not_fail_the_batch() {
        let result: ExtractionResult = serde_json::from_value(json!({
            "nodes": ["Frodo", {"id": "Sam", "source_work": "LotR"}, 42, {"description": "nobody"}],
            "links": [{"source": true, "target": "Sam", "relation": "friend"}]
        }))
        .unwrap();

        assert_eq!(result.nodes.len(), 4);
        assert_eq!(result.nodes[0].key().as_deref(), Some("Frodo"));
        assert_eq!(result.nodes[1].work().as_deref(), Some("LotR"));
        assert_eq!(result.nodes[2].key(), None);
        assert_eq!(result.nodes[3].key(), None);
        assert_eq!(result.edges[0].source.as_ref().unwrap().resolve(), None);
        assert_eq!(result.edges[0].label.as_deref(), Some("friend"));
    }

    #[test]
    fn test_stamp_work_keeps_existing_labels() {
        let mut result: ExtractionResult = serde_json::from_value(json!({
            "nodes": ["Frodo", {"id": "Gandalf", "work": "The Hobbit"}],
            "edges": [{"source": "Frodo", "target": "Gandalf"}]
        }))
        .unwrap();

        result.stamp_work("Lord of the Rings");

        assert_eq!(result.nodes[0].work().as_deref(), Some("Lord of the Rings"));
        assert_eq!(result.nodes[1].work().as_deref(), Some("The Hobbit"));
        assert_eq!(result.edges[0].work.as_deref(), Some("Lord of the Rings"));
    }

    #[test]
    fn test_bad_edge_does_not_fail_the_batch() {
        let result: ExtractionResult = serde_json::from_value(json!({
            "nodes": ["A", "B", "C"],
            "edges": [
                {"source": "A", "target": "B", "label": "ALLY"},
                {"source": "B", "target": "C", "label": 7},
                "A->B",
                {"source": "C", "target": "A", "label": "", "relation": "RIVAL"}
            ]
        }))
        .unwrap();

        assert_eq!(result.edges.len(), 4);
        assert_eq!(result.edges[0].label.as_deref(), Some("ALLY"));
        // wrongly typed label is ignored, endpoints survive
        assert_eq!(result.edges[1].label, None);
        assert_eq!(result.edges[1].target.as_ref().unwrap().resolve().as_deref(), Some("C"));
        assert_eq!(result.edges[2].source, None);
        assert_eq!(result.edges[2].target, None);
        assert_eq!(result.edges[3].label.as_deref(), Some("RIVAL"));
    }

    #[test]
    fn test_node_identity_survives_bad_sibling_fields() {
        let result: ExtractionResult = serde_json::from_value(json!({
            "nodes": [
                {"id": "A", "work": "W", "source_work": "Other"},
                {"id": "B", "name": 12, "description": ["not", "text"]},
                {"name": "Cirdan", "work": "", "source_work": "Silmarillion"}
            ]
        }))
        .unwrap();

        assert_eq!(result.nodes[0].key().as_deref(), Some("A"));
        assert_eq!(result.nodes[0].work().as_deref(), Some("W"));
        assert_eq!(result.nodes[1].key().as_deref(), Some("B"));
        assert_eq!(result.nodes[1].name(), None);
        assert_eq!(result.nodes[1].description(), None);
        assert_eq!(result.nodes[2].key().as_deref(), Some("Cirdan"));
        assert_eq!(result.nodes[2].work().as_deref(), Some("Silmarillion"));
    }

    #[test]
    fn test_null_endpoint_is_missing() {
        let edge: RawEdge = serde_json::from_value(json!({"source": null, "target": "B"})).unwrap();
        assert_eq!(edge.source, None);
        assert!(edge.target.is_some());
    }
}
