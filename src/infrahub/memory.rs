//! In-process graph store used for dry runs and tests.
//!
//! Branches are independent copies of node data; a new branch forks from the
//! default branch at creation time. Only the GraphQL documents in
//! [`super::queries`] are understood by `execute_graphql`.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::queries;
use super::types::Branch;
use super::{GraphStore, GraphqlError, Node, NotFoundError};

/// Kinds whose `name` attribute must be unique within a branch
const UNIQUE_NAME_KINDS: &[&str] = &[
    "BuiltinLocation",
    "BuiltinRole",
    "BuiltinStatus",
    "BuiltinTag",
    "CoreAccount",
    "CoreOrganization",
    "CoreStandardGroup",
    "InfraAutonomousSystem",
    "InfraBGPPeerGroup",
    "InfraDevice",
    "InfraPlatform",
    "InfraVLAN",
];

#[derive(Debug, Clone)]
struct StoredNode {
    id: String,
    kind: String,
    data: Map<String, Value>,
}

#[derive(Debug, Clone, Default)]
struct BranchData {
    info: Option<Branch>,
    nodes: Vec<StoredNode>,
}

impl BranchData {
    fn find(&self, id: &str) -> Option<&StoredNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut StoredNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    fn find_by_name(&self, kind: &str, name: &Value) -> Option<&StoredNode> {
        self.nodes
            .iter()
            .find(|n| n.kind == kind && attr_value(&n.data, "name") == Some(name))
    }
}

/// In-memory `GraphStore`
pub struct MemoryStore {
    default_branch: String,
    branches: Mutex<HashMap<String, BranchData>>,
}

impl MemoryStore {
    pub fn new(default_branch: &str) -> Self {
        let mut branches = HashMap::new();
        branches.insert(default_branch.to_string(), BranchData::default());
        Self {
            default_branch: default_branch.to_string(),
            branches: Mutex::new(branches),
        }
    }

    /// Number of `kind` nodes on `branch`
    pub async fn count(&self, branch: &str, kind: &str) -> usize {
        self.branches
            .lock()
            .await
            .get(branch)
            .map(|b| b.nodes.iter().filter(|n| n.kind == kind).count())
            .unwrap_or(0)
    }

    /// Every `kind` node on `branch`, in creation order
    pub async fn all(&self, branch: &str, kind: &str) -> Vec<Node> {
        self.branches
            .lock()
            .await
            .get(branch)
            .map(|b| {
                b.nodes
                    .iter()
                    .filter(|n| n.kind == kind)
                    .map(|n| Node::existing(&n.id, &n.kind, branch, n.data.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub async fn branch_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.branches.lock().await.keys().cloned().collect();
        names.sort();
        names
    }

    fn insert(branch: &mut BranchData, node: &mut Node) -> Result<()> {
        if UNIQUE_NAME_KINDS.contains(&node.kind()) {
            if let Some(name) = attr_value(node.data(), "name") {
                if branch.find_by_name(node.kind(), name).is_some() {
                    return Err(GraphqlError::new(format!(
                        "An object already exists with name {} for {}",
                        name,
                        node.kind()
                    ))
                    .into());
                }
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        branch.nodes.push(StoredNode {
            id: id.clone(),
            kind: node.kind().to_string(),
            data: node.data().clone(),
        });
        node.mark_saved(id);
        Ok(())
    }

    fn update(branch: &mut BranchData, node: &mut Node) -> Result<()> {
        let id = node.require_id()?.to_string();
        let stored = branch
            .find_mut(&id)
            .ok_or_else(|| NotFoundError::new(node.kind(), &id))?;
        for field in node.changed_fields() {
            if let Some(value) = node.data().get(field) {
                stored.data.insert(field.to_string(), value.clone());
            }
        }
        node.mark_saved(id);
        Ok(())
    }

    fn relationship_add(branch: &mut BranchData, variables: &Value) -> Result<Value> {
        let id = variables
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| GraphqlError::new("RelationshipAdd requires id"))?;
        let name = variables
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| GraphqlError::new("RelationshipAdd requires name"))?;
        let peers = variables
            .get("nodes")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        for peer in &peers {
            let peer_id = peer.get("id").and_then(|v| v.as_str()).unwrap_or_default();
            if branch.find(peer_id).is_none() {
                return Err(GraphqlError::new(format!("Unable to find the node {}", peer_id)).into());
            }
        }

        let stored = branch
            .find_mut(id)
            .ok_or_else(|| GraphqlError::new(format!("Unable to find the node {}", id)))?;
        let entry = stored
            .data
            .entry(name.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !entry.is_array() {
            *entry = Value::Array(Vec::new());
        }
        if let Value::Array(items) = entry {
            for peer in peers {
                if !items.contains(&peer) {
                    items.push(peer);
                }
            }
        }

        Ok(serde_json::json!({ "RelationshipAdd": { "ok": true } }))
    }

    fn circuit_endpoints_by_site(branch: &BranchData, variables: &Value) -> Result<Value> {
        let site_name = variables
            .get("site_name")
            .cloned()
            .ok_or_else(|| GraphqlError::new("Variable site_name is required"))?;

        let mut edges = Vec::new();
        for endpoint in branch.nodes.iter().filter(|n| n.kind == "InfraCircuitEndpoint") {
            let site = relationship_ids(&endpoint.data, "site")
                .into_iter()
                .filter_map(|id| branch.find(id))
                .next();
            if site.and_then(|s| attr_value(&s.data, "name")) != Some(&site_name) {
                continue;
            }

            let circuit = relationship_ids(&endpoint.data, "circuit")
                .into_iter()
                .filter_map(|id| branch.find(id))
                .next()
                .map(|circuit| {
                    let provider = relationship_ids(&circuit.data, "provider")
                        .into_iter()
                        .filter_map(|id| branch.find(id))
                        .next()
                        .map(|p| serde_json::json!({ "name": { "value": attr_value(&p.data, "name") } }));
                    serde_json::json!({
                        "id": circuit.id,
                        "circuit_id": { "value": attr_value(&circuit.data, "circuit_id") },
                        "provider": { "node": provider },
                    })
                });

            edges.push(serde_json::json!({
                "node": { "id": endpoint.id, "circuit": { "node": circuit } }
            }));
        }

        Ok(serde_json::json!({ "InfraCircuitEndpoint": { "edges": edges } }))
    }
}

#[async_trait]
impl GraphStore for MemoryStore {
    async fn save(&self, node: &mut Node) -> Result<()> {
        let mut branches = self.branches.lock().await;
        let branch = branches
            .get_mut(node.branch())
            .ok_or_else(|| NotFoundError::new("Branch", node.branch()))?;
        if node.is_staged() {
            Self::insert(branch, node)
        } else {
            Self::update(branch, node)
        }
    }

    async fn upsert(&self, node: &mut Node, allow_update: bool) -> Result<()> {
        if !allow_update || !node.is_staged() {
            return self.save(node).await;
        }

        let mut branches = self.branches.lock().await;
        let branch = branches
            .get_mut(node.branch())
            .ok_or_else(|| NotFoundError::new("Branch", node.branch()))?;

        let existing = attr_value(node.data(), "name")
            .and_then(|name| branch.find_by_name(node.kind(), name))
            .map(|n| n.id.clone());
        match existing {
            Some(id) => {
                let stored = branch
                    .find_mut(&id)
                    .ok_or_else(|| NotFoundError::new(node.kind(), &id))?;
                for (field, value) in node.data() {
                    stored.data.insert(field.clone(), value.clone());
                }
                node.mark_saved(id);
                Ok(())
            }
            None => Self::insert(branch, node),
        }
    }

    async fn delete(&self, node: &Node) -> Result<()> {
        let id = node.require_id()?;
        let mut branches = self.branches.lock().await;
        let branch = branches
            .get_mut(node.branch())
            .ok_or_else(|| NotFoundError::new("Branch", node.branch()))?;
        let before = branch.nodes.len();
        branch.nodes.retain(|n| n.id != id);
        if branch.nodes.len() == before {
            return Err(NotFoundError::new(node.kind(), id).into());
        }
        Ok(())
    }

    async fn filters(&self, branch: &str, kind: &str, filter: &Value) -> Result<Vec<Node>> {
        let branches = self.branches.lock().await;
        let data = branches
            .get(branch)
            .ok_or_else(|| NotFoundError::new("Branch", branch))?;
        let empty = Map::new();
        let filter = filter.as_object().unwrap_or(&empty);

        let mut nodes = Vec::new();
        for stored in data.nodes.iter().filter(|n| n.kind == kind) {
            if matches_filter(data, stored, filter)? {
                nodes.push(Node::existing(&stored.id, kind, branch, stored.data.clone()));
            }
        }
        Ok(nodes)
    }

    async fn execute_graphql(&self, query: &str, variables: Value, branch: &str) -> Result<Value> {
        let mut branches = self.branches.lock().await;
        let data = branches
            .get_mut(branch)
            .ok_or_else(|| NotFoundError::new("Branch", branch))?;

        if query == queries::RELATIONSHIP_ADD {
            Self::relationship_add(data, &variables)
        } else if query == queries::CIRCUIT_ENDPOINTS_BY_SITE {
            Self::circuit_endpoints_by_site(data, &variables)
        } else {
            Err(GraphqlError::new("Query is not supported by the in-memory store").into())
        }
    }

    async fn create_branch(&self, name: &str, data_only: bool, description: &str) -> Result<Branch> {
        let mut branches = self.branches.lock().await;
        if branches.contains_key(name) {
            return Err(GraphqlError::new(format!("The branch {} already exists", name)).into());
        }
        let mut fork = branches
            .get(&self.default_branch)
            .cloned()
            .unwrap_or_default();

        let info = Branch {
            id: Some(uuid::Uuid::new_v4().to_string()),
            name: name.to_string(),
            description: Some(description.to_string()),
            sync_with_git: !data_only,
        };
        fork.info = Some(info.clone());
        branches.insert(name.to_string(), fork);
        Ok(info)
    }
}

fn attr_value<'a>(data: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    match data.get(name)? {
        Value::Object(obj) => obj.get("value"),
        Value::Null => None,
        other => Some(other),
    }
}

fn relationship_ids<'a>(data: &'a Map<String, Value>, name: &str) -> Vec<&'a str> {
    match data.get(name) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.get("id").and_then(|v| v.as_str()))
            .collect(),
        Some(Value::Object(obj)) => obj.get("id").and_then(|v| v.as_str()).into_iter().collect(),
        Some(Value::String(id)) => vec![id.as_str()],
        _ => vec![],
    }
}

fn matches_filter(branch: &BranchData, node: &StoredNode, filter: &Map<String, Value>) -> Result<bool> {
    for (key, expected) in filter {
        let matched = if key == "ids" {
            expected
                .as_array()
                .map(|ids| ids.iter().any(|id| id.as_str() == Some(node.id.as_str())))
                .unwrap_or(false)
        } else if let Some(rel) = key.strip_suffix("__name__value") {
            relationship_ids(&node.data, rel)
                .into_iter()
                .filter_map(|id| branch.find(id))
                .any(|peer| attr_value(&peer.data, "name") == Some(expected))
        } else if let Some(rel) = key.strip_suffix("__ids") {
            let wanted: Vec<&str> = expected
                .as_array()
                .map(|ids| ids.iter().filter_map(|v| v.as_str()).collect())
                .unwrap_or_default();
            relationship_ids(&node.data, rel)
                .into_iter()
                .any(|id| wanted.contains(&id))
        } else if let Some(rel) = key.strip_suffix("__id") {
            relationship_ids(&node.data, rel)
                .into_iter()
                .any(|id| Some(id) == expected.as_str())
        } else if let Some(attr) = key.strip_suffix("__value") {
            attr_value(&node.data, attr) == Some(expected)
        } else {
            return Err(GraphqlError::new(format!("Unknown filter argument {}", key)).into());
        };

        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}
