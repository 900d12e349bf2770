pub mod bootstrap;
pub mod mesh;
pub mod node_store;
pub mod scenarios;
pub mod site;
pub mod tables;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::infrahub::{save_with_policy, Batch, GraphStore, Node, SavePolicy};
use crate::ipam::AddressPools;

pub use node_store::NodeStore;
pub use scenarios::Scenario;

/// Knobs that change how nodes are written
#[derive(Debug, Clone, Copy)]
pub struct SeedOptions {
    pub policy: SavePolicy,
    /// Max in-flight requests per batch
    pub batch_size: usize,
}

impl Default for SeedOptions {
    fn default() -> Self {
        Self {
            policy: SavePolicy::default(),
            batch_size: 5,
        }
    }
}

/// Per-kind write counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct SeedCounts {
    pub created: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub updated: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub deleted: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub branches: Vec<String>,
}

impl SeedCounts {
    fn bump(map: &mut BTreeMap<String, usize>, kind: &str) {
        *map.entry(kind.to_string()).or_insert(0) += 1;
    }

    pub fn total_created(&self) -> usize {
        self.created.values().sum()
    }

    pub fn total_updated(&self) -> usize {
        self.updated.values().sum()
    }

    pub fn total_deleted(&self) -> usize {
        self.deleted.values().sum()
    }
}

#[cfg(test)]
impl SeedCounts {
    pub fn created(&self, kind: &str) -> usize {
        self.created.get(kind).copied().unwrap_or(0)
    }

    pub fn deleted(&self, kind: &str) -> usize {
        self.deleted.get(kind).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SeedSummary {
    pub message: String,
    pub branch: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub result: SeedCounts,
    /// Addresses or blocks left in each pool at the end of the run
    pub pools_remaining: BTreeMap<String, u64>,
}

/// State of one seeding run: the store handle, the symbolic key table and the
/// address pools. Created at run start, dropped at run end.
pub struct SeedContext {
    pub client: Arc<dyn GraphStore>,
    pub branch: String,
    pub nodes: NodeStore,
    pub pools: AddressPools,
    pub options: SeedOptions,
    pub counts: SeedCounts,
    started_at: DateTime<Utc>,
}

impl SeedContext {
    pub fn new(client: Arc<dyn GraphStore>, branch: &str, pools: AddressPools, options: SeedOptions) -> Self {
        Self {
            client,
            branch: branch.to_string(),
            nodes: NodeStore::new(),
            pools,
            options,
            counts: SeedCounts::default(),
            started_at: Utc::now(),
        }
    }

    /// An empty batch using the run's save policy
    pub fn batch(&self) -> Batch {
        Batch::new(self.client.clone(), self.options.policy, self.options.batch_size)
    }

    /// Stage `data` as a `kind` node in the base branch without saving it
    pub fn stage(&self, kind: &str, data: Value) -> Node {
        self.client.create(&self.branch, kind, data)
    }

    /// Create and save a node in the base branch
    pub async fn create(&mut self, kind: &str, data: Value) -> Result<Node> {
        let branch = self.branch.clone();
        self.create_in(&branch, kind, data).await
    }

    /// Create a node in `branch` and save it with the run's save policy
    pub async fn create_in(&mut self, branch: &str, kind: &str, data: Value) -> Result<Node> {
        let node = self.client.create(branch, kind, data);
        let key = node.label();
        let node = save_with_policy(self.client.as_ref(), &key, node, self.options.policy).await?;
        SeedCounts::bump(&mut self.counts.created, kind);
        Ok(node)
    }

    /// Push the changed fields of an existing node
    pub async fn save(&mut self, node: &mut Node) -> Result<()> {
        self.client.save(node).await?;
        SeedCounts::bump(&mut self.counts.updated, node.kind());
        Ok(())
    }

    pub async fn delete(&mut self, node: &Node) -> Result<()> {
        self.client.delete(node).await?;
        SeedCounts::bump(&mut self.counts.deleted, node.kind());
        Ok(())
    }

    /// Run a batch and record every saved node under its key
    pub async fn execute(&mut self, batch: Batch) -> Result<Vec<String>> {
        let saved = batch.execute().await?;
        let mut labels = Vec::with_capacity(saved.len());
        for (key, node) in saved {
            SeedCounts::bump(&mut self.counts.created, node.kind());
            labels.push(format!("{} {}", node.kind(), node.label()));
            self.nodes.set(&key, node);
        }
        labels.sort();
        Ok(labels)
    }

    pub(crate) fn record_branch(&mut self, name: &str) {
        self.counts.branches.push(name.to_string());
    }

    pub fn summary(&self, message: impl Into<String>) -> SeedSummary {
        SeedSummary {
            message: message.into(),
            branch: self.branch.clone(),
            started_at: self.started_at,
            finished_at: Utc::now(),
            result: self.counts.clone(),
            pools_remaining: self.pools.remaining(),
        }
    }
}

/// Full run: reference data, every site, the cross-site mesh, then the
/// requested branch scenarios
pub async fn run(
    ctx: &mut SeedContext,
    sites: &[String],
    scenarios: &[Scenario],
    scenario_site: Option<&str>,
) -> Result<SeedSummary> {
    bootstrap::load_reference_data(ctx).await?;

    tracing::info!("Creating Site & Device");
    for site_name in sites {
        site::generate_site(ctx, site_name).await?;
        tracing::debug!("Site {} Creation Completed", site_name);
    }

    mesh::create_backbone_mesh(ctx, sites).await?;

    if !scenarios.is_empty() {
        if ctx.branch == "main" {
            for scenario in scenarios {
                scenarios::run_scenario(ctx, *scenario, scenario_site).await?;
            }
        } else {
            tracing::warn!(
                "Skipping {} branch scenario(s): base branch is {}, not main",
                scenarios.len(),
                ctx.branch
            );
        }
    }

    Ok(ctx.summary(format!(
        "Seeded {} site(s): {} object(s) created, {} updated, {} deleted",
        sites.len(),
        ctx.counts.total_created(),
        ctx.counts.total_updated(),
        ctx.counts.total_deleted()
    )))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::infrahub::MemoryStore;

    pub fn context(store: &Arc<MemoryStore>) -> SeedContext {
        context_with(store, SeedOptions::default())
    }

    pub fn context_with(store: &Arc<MemoryStore>, options: SeedOptions) -> SeedContext {
        let pools = AddressPools::defaults().unwrap();
        SeedContext::new(store.clone(), "main", pools, options)
    }

    /// Pools with a management range large enough for several sites
    pub fn multi_site_context(store: &Arc<MemoryStore>) -> SeedContext {
        let pools = AddressPools::from_cidrs("10.0.0.0/8", "203.0.113.0/24", "172.20.20.0/24").unwrap();
        SeedContext::new(store.clone(), "main", pools, SeedOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::infrahub::{GraphqlError, MemoryStore};
    use crate::ipam::PoolExhausted;
    use tables::kind;

    #[tokio::test]
    async fn test_run_single_site() {
        let store = Arc::new(MemoryStore::new("main"));
        let mut ctx = context(&store);

        let summary = run(&mut ctx, &["atl".to_string()], &[], None).await.unwrap();
        assert_eq!(summary.branch, "main");
        assert_eq!(summary.result.created(kind::DEVICE), 8);
        assert_eq!(store.count("main", kind::DEVICE).await, 8);
        assert_eq!(store.count("main", kind::LOCATION).await, 1);
        assert!(summary.finished_at >= summary.started_at);
    }

    #[tokio::test]
    async fn test_second_site_exhausts_default_management_pool() {
        let store = Arc::new(MemoryStore::new("main"));
        let mut ctx = context(&store);

        let sites = vec!["atl".to_string(), "ord".to_string()];
        let err = run(&mut ctx, &sites, &[], None).await.unwrap_err();
        let exhausted = err.downcast_ref::<PoolExhausted>().unwrap();
        assert_eq!(exhausted.pool, "management");
    }

    #[tokio::test]
    async fn test_rerun_needs_upsert() {
        let store = Arc::new(MemoryStore::new("main"));
        let sites = vec!["atl".to_string()];
        run(&mut context(&store), &sites, &[], None).await.unwrap();

        let err = run(&mut context(&store), &sites, &[], None).await.unwrap_err();
        assert!(err.downcast_ref::<GraphqlError>().is_some());

        let options = SeedOptions {
            policy: SavePolicy {
                upsert: true,
                allow_update: true,
                fetch_on_failure: false,
            },
            ..SeedOptions::default()
        };
        let summary = run(&mut context_with(&store, options), &sites, &[], None).await.unwrap();
        assert_eq!(summary.result.created(kind::DEVICE), 8);
        assert_eq!(store.count("main", kind::DEVICE).await, 8);
        assert_eq!(store.count("main", kind::LOCATION).await, 1);
        assert_eq!(store.count("main", kind::VLAN).await, tables::VLANS.len());
    }

    #[tokio::test]
    async fn test_scenarios_skipped_outside_main() {
        let store = Arc::new(MemoryStore::new("lab"));
        let pools = AddressPools::defaults().unwrap();
        let mut ctx = SeedContext::new(store.clone(), "lab", pools, SeedOptions::default());

        let summary = run(&mut ctx, &["atl".to_string()], &[Scenario::ConflictPlatform], Some("atl"))
            .await
            .unwrap();
        assert!(summary.result.branches.is_empty());
        assert_eq!(store.branch_names().await, vec!["lab"]);
    }

    #[tokio::test]
    async fn test_summary_serializes_counts() {
        let store = Arc::new(MemoryStore::new("main"));
        let mut ctx = context(&store);
        ctx.create(kind::TAG, serde_json::json!({"name": {"value": "red"}}))
            .await
            .unwrap();

        let summary = serde_json::to_value(ctx.summary("done")).unwrap();
        assert_eq!(summary["message"], "done");
        assert_eq!(summary["result"]["created"]["BuiltinTag"], 1);
        assert!(summary["result"].get("deleted").is_none());
        assert_eq!(summary["pools_remaining"]["management"], 14);
    }
}
