use anyhow::Result;
use std::collections::HashMap;

use crate::infrahub::{Node, NotFoundError};

/// Run-scoped table of nodes by symbolic key.
///
/// Entries are scoped by kind; `get_any` ignores the kind and returns the node
/// most recently recorded under the key.
#[derive(Debug, Default)]
pub struct NodeStore {
    by_kind: HashMap<String, HashMap<String, Node>>,
    latest: HashMap<String, Node>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, node: Node) {
        self.latest.insert(key.to_string(), node.clone());
        self.by_kind
            .entry(node.kind().to_string())
            .or_default()
            .insert(key.to_string(), node);
    }

    pub fn get(&self, kind: &str, key: &str) -> Result<&Node> {
        self.by_kind
            .get(kind)
            .and_then(|nodes| nodes.get(key))
            .ok_or_else(|| NotFoundError::new(kind, key).into())
    }

    pub fn get_any(&self, key: &str) -> Result<&Node> {
        self.latest
            .get(key)
            .ok_or_else(|| NotFoundError::new("node", key).into())
    }

    /// Id of a saved node, for use in relationship fields
    pub fn id(&self, kind: &str, key: &str) -> Result<String> {
        Ok(self.get(kind, key)?.require_id()?.to_string())
    }

    pub fn count(&self, kind: &str) -> usize {
        self.by_kind.get(kind).map(|nodes| nodes.len()).unwrap_or(0)
    }

    /// Keys recorded for `kind`, sorted
    pub fn keys(&self, kind: &str) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .by_kind
            .get(kind)
            .map(|nodes| nodes.keys().map(|k| k.as_str()).collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Record fetched nodes under the value of their `attribute`; nodes without
    /// it are skipped. Returns the number recorded.
    pub fn populate(&mut self, nodes: Vec<Node>, attribute: &str) -> usize {
        let mut recorded = 0;
        for node in nodes {
            let key = match node.attr_str(attribute) {
                Some(key) => key.to_string(),
                None => continue,
            };
            self.set(&key, node);
            recorded += 1;
        }
        recorded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn saved(kind: &str, id: &str, name: &str) -> Node {
        let data = json!({"name": {"value": name}});
        Node::existing(id, kind, "main", data.as_object().cloned().unwrap_or_default())
    }

    #[test]
    fn test_get_by_kind_and_key() {
        let mut store = NodeStore::new();
        store.set("active", saved("BuiltinStatus", "s1", "active"));

        assert_eq!(store.get("BuiltinStatus", "active").unwrap().id(), Some("s1"));
        assert_eq!(store.id("BuiltinStatus", "active").unwrap(), "s1");
        let err = store.get("BuiltinRole", "active").unwrap_err();
        assert!(err.downcast_ref::<NotFoundError>().is_some());
    }

    #[test]
    fn test_get_any_is_last_write_wins() {
        let mut store = NodeStore::new();
        store.set("Duff", saved("CoreOrganization", "org-1", "Duff"));
        store.set("Duff", saved("InfraAutonomousSystem", "as-1", "AS64496"));

        assert_eq!(store.get_any("Duff").unwrap().kind(), "InfraAutonomousSystem");
        assert_eq!(store.id("CoreOrganization", "Duff").unwrap(), "org-1");
        assert_eq!(store.count("CoreOrganization"), 1);
        assert_eq!(store.count("InfraAutonomousSystem"), 1);
        assert!(store.get_any("Telia").is_err());
    }

    #[test]
    fn test_staged_node_has_no_id() {
        let mut store = NodeStore::new();
        store.set("red", Node::new("BuiltinTag", "main", json!({"name": {"value": "red"}})));
        assert!(store.get("BuiltinTag", "red").is_ok());
        assert!(store.id("BuiltinTag", "red").is_err());
    }

    #[test]
    fn test_populate_by_attribute() {
        let mut store = NodeStore::new();
        let nodes = vec![
            saved("BuiltinStatus", "s1", "active"),
            saved("BuiltinStatus", "s2", "drained"),
            Node::existing("s3", "BuiltinStatus", "main", Default::default()),
        ];
        assert_eq!(store.populate(nodes, "name"), 2);
        assert_eq!(store.keys("BuiltinStatus"), vec!["active", "drained"]);
    }
}
