use anyhow::Result;
use serde_json::json;

use crate::infrahub::{Batch, SavePolicy};

use super::site::{device_name, loopback_key};
use super::tables::{self, intf_role, kind, status};
use super::SeedContext;

/// iBGP between every leaf of every site and every leaf of every other site.
///
/// Sessions are independent of each other and go out as a single batch.
pub async fn create_backbone_mesh(ctx: &mut SeedContext, sites: &[String]) -> Result<()> {
    let internal_as = ctx.nodes.id(kind::AUTONOMOUS_SYSTEM, tables::INTERNAL_ORGANIZATION)?;
    let active_status = ctx.nodes.id(kind::STATUS, status::ACTIVE)?;
    let backbone = ctx.nodes.id(kind::ROLE, intf_role::BACKBONE)?;
    let peer_group = ctx.nodes.id(kind::BGP_PEER_GROUP, tables::PEER_GROUP_POP_GLOBAL)?;
    let leaves = tables::device_count("leaf");

    let mut batch = Batch::new(ctx.client.clone(), SavePolicy::default(), ctx.options.batch_size);
    for site1 in sites {
        for site2 in sites {
            if site1 == site2 {
                continue;
            }

            for idx1 in 1..=leaves {
                for idx2 in 1..=leaves {
                    let device1 = device_name(site1, "leaf", idx1);
                    let device2 = device_name(site2, "leaf", idx2);
                    let loopback1 = ctx.nodes.get(kind::IP_ADDRESS, &loopback_key(&device1))?;
                    let loopback2 = ctx.nodes.get(kind::IP_ADDRESS, &loopback_key(&device2))?;

                    let session = ctx.stage(
                        kind::BGP_SESSION,
                        json!({
                            "type": {"value": "INTERNAL"},
                            "local_as": {"id": internal_as},
                            "local_ip": {"id": loopback1.require_id()?},
                            "remote_as": {"id": internal_as},
                            "remote_ip": {"id": loopback2.require_id()?},
                            "peer_group": {"id": peer_group},
                            "device": {"id": ctx.nodes.id(kind::DEVICE, &device1)?},
                            "status": {"id": active_status},
                            "role": {"id": backbone},
                        }),
                    );
                    tracing::info!(
                        "Creating BGP Session '{}' >> '{}': '{}' '{}' >> '{}'",
                        device1,
                        device2,
                        tables::PEER_GROUP_POP_GLOBAL,
                        loopback1.attr_str("address").unwrap_or_default(),
                        loopback2.attr_str("address").unwrap_or_default()
                    );
                    batch.add(format!("{}>>{}", device1, device2), session);
                }
            }
        }
    }

    if batch.is_empty() {
        return Ok(());
    }

    ctx.execute(batch).await?;
    tracing::debug!("BGP Session Creation Completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrahub::{GraphStore, MemoryStore};
    use crate::seed::bootstrap::load_reference_data;
    use crate::seed::site::generate_site;
    use crate::seed::testing::{context, multi_site_context};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_mesh_between_two_sites() {
        let store = Arc::new(MemoryStore::new("main"));
        let mut ctx = multi_site_context(&store);
        load_reference_data(&mut ctx).await.unwrap();

        let sites = vec!["atl".to_string(), "ord".to_string()];
        for site in &sites {
            generate_site(&mut ctx, site).await.unwrap();
        }
        create_backbone_mesh(&mut ctx, &sites).await.unwrap();

        let pop_global = ctx.nodes.id(kind::BGP_PEER_GROUP, "POP_GLOBAL").unwrap();
        let sessions = store
            .filters("main", kind::BGP_SESSION, &json!({"peer_group__ids": [pop_global]}))
            .await
            .unwrap();
        // 2 ordered site pairs x 4 leaves x 4 leaves
        assert_eq!(sessions.len(), 32);

        let atl_leaf1 = ctx.nodes.id(kind::DEVICE, "atl-leaf1").unwrap();
        let atl_loopback = ctx.nodes.id(kind::IP_ADDRESS, "atl-leaf1-loopback").unwrap();
        let from_atl_leaf1: Vec<_> = sessions
            .iter()
            .filter(|s| s.relationship_id("device") == Some(atl_leaf1.as_str()))
            .collect();
        assert_eq!(from_atl_leaf1.len(), 4);
        assert!(from_atl_leaf1
            .iter()
            .all(|s| s.relationship_id("local_ip") == Some(atl_loopback.as_str())));
    }

    #[tokio::test]
    async fn test_single_site_has_no_mesh() {
        let store = Arc::new(MemoryStore::new("main"));
        let mut ctx = context(&store);
        load_reference_data(&mut ctx).await.unwrap();
        generate_site(&mut ctx, "atl").await.unwrap();

        let before = store.count("main", kind::BGP_SESSION).await;
        create_backbone_mesh(&mut ctx, &["atl".to_string()]).await.unwrap();
        assert_eq!(store.count("main", kind::BGP_SESSION).await, before);
    }
}
