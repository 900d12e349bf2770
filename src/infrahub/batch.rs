use anyhow::Result;
use futures::stream::{self, StreamExt};
use std::sync::Arc;

use super::{GraphStore, GraphqlError, Node};

/// How nodes are persisted during bootstrap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SavePolicy {
    /// Create through the upsert mutation instead of a plain create
    pub upsert: bool,
    /// Let an upsert update an existing node with the same name
    pub allow_update: bool,
    /// On a rejected create, fetch the existing node by name and use it instead
    pub fetch_on_failure: bool,
}

/// Persist one node according to `policy`.
///
/// The fetch-on-failure lookup matches on the node's `name` attribute, falling
/// back to `key` for nodes without one.
pub async fn save_with_policy(
    client: &dyn GraphStore,
    key: &str,
    mut node: Node,
    policy: SavePolicy,
) -> Result<Node> {
    let result = if policy.upsert {
        client.upsert(&mut node, policy.allow_update).await
    } else {
        client.save(&mut node).await
    };

    match result {
        Ok(()) => Ok(node),
        Err(e) if policy.fetch_on_failure && e.downcast_ref::<GraphqlError>().is_some() => {
            tracing::warn!("Creation failed for {} {}: {}; fetching existing node", node.kind(), key, e);
            let name = node.attr_str("name").unwrap_or(key);
            let existing = client
                .get(node.branch(), node.kind(), &serde_json::json!({ "name__value": name }))
                .await?;
            tracing::info!("Retrieved {} {}", existing.kind(), key);
            Ok(existing)
        }
        Err(e) => Err(e),
    }
}

/// A group of independent saves dispatched together and awaited as a whole
pub struct Batch {
    client: Arc<dyn GraphStore>,
    policy: SavePolicy,
    max_concurrent: usize,
    tasks: Vec<(String, Node)>,
}

impl Batch {
    pub fn new(client: Arc<dyn GraphStore>, policy: SavePolicy, max_concurrent: usize) -> Self {
        Self {
            client,
            policy,
            max_concurrent: max_concurrent.max(1),
            tasks: Vec::new(),
        }
    }

    pub fn add(&mut self, key: impl Into<String>, node: Node) {
        self.tasks.push((key.into(), node));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Save every node, at most `max_concurrent` at a time.
    ///
    /// All tasks run to completion before the first failure (if any) is
    /// returned. Results come back in completion order.
    pub async fn execute(self) -> Result<Vec<(String, Node)>> {
        let Batch {
            client,
            policy,
            max_concurrent,
            tasks,
        } = self;
        let total = tasks.len();

        let results: Vec<Result<(String, Node)>> = stream::iter(tasks)
            .map(|(key, node)| {
                let client = client.clone();
                async move {
                    let node = save_with_policy(client.as_ref(), &key, node, policy).await?;
                    Ok((key, node))
                }
            })
            .buffer_unordered(max_concurrent)
            .collect()
            .await;

        let saved = results.into_iter().collect::<Result<Vec<_>>>()?;
        tracing::debug!("Batch completed: {} of {} nodes saved", saved.len(), total);
        Ok(saved)
    }
}
