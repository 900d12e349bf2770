use anyhow::Result;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// A graph node as seen by the seeder.
///
/// Attribute fields hold `{"value": .., ..metadata}` objects and relationship
/// fields hold `{"id": ..}` objects (or lists of them). A node without an id is
/// staged: it exists only locally until it is saved.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub(crate) id: Option<String>,
    pub(crate) kind: String,
    pub(crate) branch: String,
    pub(crate) data: Map<String, Value>,
    pub(crate) changed: BTreeSet<String>,
}

impl Node {
    /// Stage a new node. Non-object `data` yields an empty field map.
    pub fn new(kind: &str, branch: &str, data: Value) -> Self {
        let data = match data {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            id: None,
            kind: kind.to_string(),
            branch: branch.to_string(),
            data,
            changed: BTreeSet::new(),
        }
    }

    /// A node that already exists in the store
    pub fn existing(id: &str, kind: &str, branch: &str, data: Map<String, Value>) -> Self {
        Self {
            id: Some(id.to_string()),
            kind: kind.to_string(),
            branch: branch.to_string(),
            data,
            changed: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The id of a saved node; staged nodes cannot be referenced yet
    pub fn require_id(&self) -> Result<&str> {
        self.id
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("{} {} has not been saved", self.kind, self.label()))
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    pub fn is_staged(&self) -> bool {
        self.id.is_none()
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Fields modified since the node was last saved or fetched
    pub fn changed_fields(&self) -> impl Iterator<Item = &str> {
        self.changed.iter().map(|s| s.as_str())
    }

    /// Attribute value, unwrapping the `{"value": ..}` envelope when present
    pub fn attr(&self, name: &str) -> Option<&Value> {
        match self.data.get(name)? {
            Value::Object(obj) => obj.get("value"),
            Value::Null => None,
            other => Some(other),
        }
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attr(name).and_then(|v| v.as_str())
    }

    /// Id of a cardinality-one relationship
    pub fn relationship_id(&self, name: &str) -> Option<&str> {
        match self.data.get(name)? {
            Value::Object(obj) => obj.get("id").and_then(|v| v.as_str()),
            Value::String(id) => Some(id),
            _ => None,
        }
    }

    /// Ids of a cardinality-many relationship
    pub fn relationship_ids(&self, name: &str) -> Vec<&str> {
        match self.data.get(name) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::Object(obj) => obj.get("id").and_then(|v| v.as_str()),
                    Value::String(id) => Some(id.as_str()),
                    _ => None,
                })
                .collect(),
            _ => self.relationship_id(name).into_iter().collect(),
        }
    }

    /// Human-readable label for logs: the name attribute, else the id
    pub fn label(&self) -> String {
        self.attr_str("name")
            .or_else(|| self.attr_str("address"))
            .or(self.id.as_deref())
            .unwrap_or("<staged>")
            .to_string()
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.data.insert(name.to_string(), value);
        self.changed.insert(name.to_string());
    }

    /// Replace an attribute value, keeping any metadata already on it
    pub fn set_attr(&mut self, name: &str, value: Value) {
        let updated = match self.data.remove(name) {
            Some(Value::Object(mut obj)) => {
                obj.insert("value".to_string(), value);
                Value::Object(obj)
            }
            _ => serde_json::json!({ "value": value }),
        };
        self.set(name, updated);
    }

    pub fn set_relationship(&mut self, name: &str, id: &str) {
        self.set(name, serde_json::json!({ "id": id }));
    }

    /// Fields sent when the node is updated: the id plus whatever changed
    pub fn update_payload(&self) -> Result<Value> {
        let mut payload = Map::new();
        payload.insert("id".to_string(), Value::String(self.require_id()?.to_string()));
        for field in &self.changed {
            if let Some(value) = self.data.get(field) {
                payload.insert(field.clone(), value.clone());
            }
        }
        Ok(Value::Object(payload))
    }

    pub(crate) fn mark_saved(&mut self, id: String) {
        self.id = Some(id);
        self.changed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attr_unwraps_value_envelope() {
        let node = Node::new(
            "InfraDevice",
            "main",
            json!({
                "name": {"value": "atl-spine1", "is_protected": true},
                "speed": 1000,
                "site": {"id": "site-1"},
                "tags": [{"id": "t1"}, {"id": "t2"}],
            }),
        );
        assert_eq!(node.attr_str("name"), Some("atl-spine1"));
        assert_eq!(node.attr("speed"), Some(&json!(1000)));
        assert_eq!(node.relationship_id("site"), Some("site-1"));
        assert_eq!(node.relationship_ids("tags"), vec!["t1", "t2"]);
        assert_eq!(node.relationship_ids("site"), vec!["site-1"]);
        assert!(node.attr("missing").is_none());
    }

    #[test]
    fn test_staged_node_has_no_id() {
        let node = Node::new("BuiltinTag", "main", json!({"name": {"value": "red"}}));
        assert!(node.is_staged());
        assert!(node.require_id().is_err());
        assert!(node.update_payload().is_err());
        assert_eq!(node.label(), "red");
    }

    #[test]
    fn test_set_attr_keeps_metadata_and_tracks_changes() {
        let mut node = Node::new(
            "InfraInterfaceL3",
            "main",
            json!({"description": {"value": "", "source": "acc-1"}, "name": {"value": "Ethernet1"}}),
        );
        node.mark_saved("intf-1".to_string());
        assert_eq!(node.changed_fields().count(), 0);

        node.set_attr("description", json!("Connected to Telia via DUFF-1"));
        node.set_relationship("status", "status-1");

        let payload = node.update_payload().unwrap();
        assert_eq!(
            payload,
            json!({
                "id": "intf-1",
                "description": {"value": "Connected to Telia via DUFF-1", "source": "acc-1"},
                "status": {"id": "status-1"},
            })
        );
    }
}
