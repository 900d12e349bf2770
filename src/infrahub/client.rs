use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

use super::types::*;
use super::{GraphStore, GraphqlError, Node, NotFoundError};

/// Infrahub API client
pub struct InfrahubClient {
    base_url: String,
    token: String,
    client: Client,
    schema: RwLock<HashMap<String, HashMap<String, NodeSchema>>>,
}

impl InfrahubClient {
    pub fn new(url: String, token: String, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;

        Ok(Self {
            base_url: url.trim_end_matches('/').to_string(),
            token,
            client,
            schema: RwLock::new(HashMap::new()),
        })
    }

    fn graphql_url(&self, branch: &str) -> String {
        format!("{}/graphql/{}", self.base_url, branch)
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.token.is_empty() {
            req
        } else {
            req.header("X-INFRAHUB-KEY", &self.token)
        }
    }

    /// Test connectivity to Infrahub
    pub async fn test_connection(&self) -> bool {
        match self
            .authorized(self.client.get(self.api_url("/config")))
            .header("Accept", "application/json")
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    /// Helper to POST a GraphQL document and unwrap its `data` member
    async fn post_graphql(&self, branch: &str, query: &str, variables: &Value) -> Result<Value> {
        let resp = self
            .authorized(self.client.post(self.graphql_url(branch)))
            .json(&GraphqlRequest { query, variables })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() && status != reqwest::StatusCode::UNPROCESSABLE_ENTITY {
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Infrahub API error {}: {}", status, body));
        }

        let body: GraphqlResponse = resp.json().await?;
        if !body.errors.is_empty() {
            return Err(GraphqlError {
                messages: body.errors.into_iter().map(|e| e.message).collect(),
            }
            .into());
        }

        body.data
            .ok_or_else(|| anyhow::anyhow!("Infrahub returned neither data nor errors"))
    }

    /// Schema of `kind` on `branch`, fetched once per branch
    async fn node_schema(&self, branch: &str, kind: &str) -> Result<NodeSchema> {
        if let Some(schema) = self.schema.read().await.get(branch).and_then(|s| s.get(kind)) {
            return Ok(schema.clone());
        }

        let resp = self
            .authorized(self.client.get(self.api_url(&format!("/schema?branch={}", branch))))
            .header("Accept", "application/json")
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Infrahub schema error {}: {}", status, body));
        }

        let schema: SchemaResponse = resp.json().await.context("Failed to decode schema")?;
        let by_kind: HashMap<String, NodeSchema> =
            schema.nodes.into_iter().map(|n| (n.kind(), n)).collect();
        tracing::debug!("Loaded {} node schemas for branch {}", by_kind.len(), branch);

        let found = by_kind.get(kind).cloned();
        self.schema.write().await.insert(branch.to_string(), by_kind);
        found.ok_or_else(|| NotFoundError::new("Schema", kind).into())
    }

    /// Run a `<Kind><Action>` mutation and return the id of the affected object
    async fn mutate(&self, branch: &str, kind: &str, action: &str, data: Value) -> Result<Option<String>> {
        let (operation, query) = mutation_document(kind, action);
        let data = self
            .post_graphql(branch, &query, &serde_json::json!({ "data": data }))
            .await?;

        let result = data
            .get(&operation)
            .ok_or_else(|| anyhow::anyhow!("Missing {} in mutation response", operation))?;
        if !result.get("ok").and_then(|v| v.as_bool()).unwrap_or(false) {
            return Err(GraphqlError::new(format!("{} was not acknowledged", operation)).into());
        }
        Ok(result
            .pointer("/object/id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()))
    }

    async fn create_node(&self, node: &mut Node, action: &str) -> Result<()> {
        let data = encode_input(node.data());
        let id = self
            .mutate(node.branch(), node.kind(), action, data)
            .await?
            .ok_or_else(|| anyhow::anyhow!("{}{} returned no id", node.kind(), action))?;
        node.mark_saved(id);
        Ok(())
    }
}

/// Relationship metadata that Infrahub expects as `_relation__<name>`
const RELATION_METADATA: &[&str] = &["source", "owner", "is_protected", "is_visible"];

/// Operation name and GraphQL document for `<Kind><Action>`.
/// Deletes share the generic `DeleteInput` and only return `ok`.
fn mutation_document(kind: &str, action: &str) -> (String, String) {
    let operation = format!("{}{}", kind, action);
    let query = if action == "Delete" {
        format!(
            "mutation($data: DeleteInput!) {{ {op}(data: $data) {{ ok }} }}",
            op = operation
        )
    } else {
        format!(
            "mutation($data: {op}Input!) {{ {op}(data: $data) {{ ok object {{ id }} }} }}",
            op = operation
        )
    };
    (operation, query)
}

/// Mutation input for a node's fields. Attributes go out as they are;
/// related nodes get their metadata keys renamed.
fn encode_input(data: &Map<String, Value>) -> Value {
    Value::Object(
        data.iter()
            .map(|(field, value)| {
                let encoded = match value {
                    Value::Array(peers) => Value::Array(peers.iter().map(encode_related).collect()),
                    Value::Object(_) => encode_related(value),
                    other => other.clone(),
                };
                (field.clone(), encoded)
            })
            .collect(),
    )
}

fn encode_related(value: &Value) -> Value {
    let obj = match value {
        Value::Object(obj) if obj.contains_key("id") && !obj.contains_key("value") => obj,
        other => return other.clone(),
    };
    Value::Object(
        obj.iter()
            .map(|(key, v)| {
                let key = if RELATION_METADATA.contains(&key.as_str()) {
                    format!("_relation__{}", key)
                } else {
                    key.clone()
                };
                (key, v.clone())
            })
            .collect(),
    )
}

#[async_trait]
impl GraphStore for InfrahubClient {
    async fn save(&self, node: &mut Node) -> Result<()> {
        match node.id().map(|s| s.to_string()) {
            None => self.create_node(node, "Create").await,
            Some(id) => {
                let payload = node.update_payload()?;
                let payload = match payload.as_object() {
                    Some(fields) => encode_input(fields),
                    None => payload,
                };
                self.mutate(node.branch(), node.kind(), "Update", payload).await?;
                node.mark_saved(id);
                Ok(())
            }
        }
    }

    async fn upsert(&self, node: &mut Node, allow_update: bool) -> Result<()> {
        if !allow_update || !node.is_staged() {
            return self.save(node).await;
        }
        self.create_node(node, "Upsert").await
    }

    async fn delete(&self, node: &Node) -> Result<()> {
        let id = node.require_id()?;
        self.mutate(node.branch(), node.kind(), "Delete", serde_json::json!({ "id": id }))
            .await?;
        Ok(())
    }

    async fn filters(&self, branch: &str, kind: &str, filter: &Value) -> Result<Vec<Node>> {
        let schema = self.node_schema(branch, kind).await?;
        let query = build_list_query(&schema, filter);
        let data = self.post_graphql(branch, &query, &Value::Null).await?;

        let edges = data
            .pointer(&format!("/{}/edges", kind))
            .and_then(|e| e.as_array())
            .cloned()
            .unwrap_or_default();

        let mut nodes = Vec::with_capacity(edges.len());
        for edge in &edges {
            let raw = edge
                .get("node")
                .and_then(|n| n.as_object())
                .ok_or_else(|| anyhow::anyhow!("Malformed {} edge", kind))?;
            let (id, data) = normalize_node(raw);
            let id = id.ok_or_else(|| anyhow::anyhow!("{} node without id", kind))?;
            nodes.push(Node::existing(&id, kind, branch, data));
        }
        Ok(nodes)
    }

    async fn execute_graphql(&self, query: &str, variables: Value, branch: &str) -> Result<Value> {
        self.post_graphql(branch, query, &variables).await
    }

    async fn create_branch(&self, name: &str, data_only: bool, description: &str) -> Result<Branch> {
        let query = r#"
            mutation($name: String!, $description: String, $sync_with_git: Boolean) {
                BranchCreate(
                    background_execution: false,
                    data: { name: $name, description: $description, sync_with_git: $sync_with_git }
                ) {
                    ok
                    object { id name description sync_with_git }
                }
            }
        "#;
        let variables = serde_json::json!({
            "name": name,
            "description": description,
            "sync_with_git": !data_only,
        });

        let data = self.post_graphql("main", query, &variables).await?;
        let object = data
            .pointer("/BranchCreate/object")
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("BranchCreate returned no branch"))?;
        Ok(serde_json::from_value(object)?)
    }
}
