pub mod batch;
pub mod client;
pub mod memory;
pub mod node;
pub mod queries;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

pub use batch::{save_with_policy, Batch, SavePolicy};
pub use client::InfrahubClient;
pub use memory::MemoryStore;
pub use node::Node;
pub use types::Branch;

/// Typed error for "resource not found", so callers can downcast it
#[derive(Debug)]
pub struct NotFoundError {
    pub resource: String,
    pub id: String,
}

impl NotFoundError {
    pub fn new(resource: &str, id: &str) -> Self {
        Self {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }
}

impl std::fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} not found: {}", self.resource, self.id)
    }
}

impl std::error::Error for NotFoundError {}

/// The store rejected a query or mutation (duplicate name, bad input, ...)
#[derive(Debug)]
pub struct GraphqlError {
    pub messages: Vec<String>,
}

impl GraphqlError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            messages: vec![message.into()],
        }
    }
}

impl std::fmt::Display for GraphqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GraphQL error: {}", self.messages.join("; "))
    }
}

impl std::error::Error for GraphqlError {}

/// Client contract of the graph store.
///
/// `filter` arguments are JSON objects of Infrahub filter names to values,
/// e.g. `{"name__value": "atl-leaf1"}` or `{"device__ids": [..]}`.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Stage a node locally; nothing is sent until it is saved
    fn create(&self, branch: &str, kind: &str, data: Value) -> Node {
        Node::new(kind, branch, data)
    }

    /// Create a staged node, or push the changed fields of an existing one
    async fn save(&self, node: &mut Node) -> Result<()>;

    /// Create a node, updating the existing one with the same identity
    /// instead of failing when `allow_update` is set
    async fn upsert(&self, node: &mut Node, allow_update: bool) -> Result<()>;

    async fn delete(&self, node: &Node) -> Result<()>;

    async fn filters(&self, branch: &str, kind: &str, filter: &Value) -> Result<Vec<Node>>;

    /// Exactly one node matching `filter`
    async fn get(&self, branch: &str, kind: &str, filter: &Value) -> Result<Node> {
        let mut nodes = self.filters(branch, kind, filter).await?;
        match nodes.len() {
            0 => Err(NotFoundError::new(kind, &filter.to_string()).into()),
            1 => Ok(nodes.remove(0)),
            n => Err(anyhow::anyhow!("{} matches for {} {}", n, kind, filter)),
        }
    }

    /// Raw query escape hatch; returns the `data` member of the response
    async fn execute_graphql(&self, query: &str, variables: Value, branch: &str) -> Result<Value>;

    async fn create_branch(&self, name: &str, data_only: bool, description: &str) -> Result<Branch>;
}

/// Add `peers` to the `relation` relationship of `node`
pub async fn add_relationships(
    store: &dyn GraphStore,
    node: &Node,
    relation: &str,
    peers: &[&Node],
) -> Result<()> {
    let nodes = peers
        .iter()
        .map(|peer| Ok(serde_json::json!({ "id": peer.require_id()? })))
        .collect::<Result<Vec<_>>>()?;

    let variables = serde_json::json!({
        "id": node.require_id()?,
        "name": relation,
        "nodes": nodes,
    });

    let data = store
        .execute_graphql(queries::RELATIONSHIP_ADD, variables, node.branch())
        .await?;
    let ok = data
        .pointer("/RelationshipAdd/ok")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if !ok {
        return Err(GraphqlError::new(format!(
            "RelationshipAdd {} on {} was not acknowledged",
            relation,
            node.label()
        ))
        .into());
    }
    Ok(())
}

/// Add `members` to a standard group
pub async fn group_add_member(store: &dyn GraphStore, group: &Node, members: &[&Node]) -> Result<()> {
    add_relationships(store, group, "members", members).await
}
