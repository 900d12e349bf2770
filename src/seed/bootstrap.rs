use anyhow::Result;
use serde_json::json;

use super::tables::{self, kind};
use super::SeedContext;

/// Create the shared reference objects every site depends on.
///
/// Runs four batches; each is awaited before the next one starts, so later
/// batches can resolve ids recorded by earlier ones.
pub async fn load_reference_data(ctx: &mut SeedContext) -> Result<()> {
    // --- Groups, accounts, organizations & platforms ---
    let mut batch = ctx.batch();

    for group in tables::GROUPS {
        let node = ctx.stage(
            kind::STANDARD_GROUP,
            json!({"name": {"value": group.name}, "label": {"value": group.label}}),
        );
        batch.add(group.name, node);
    }

    for account in tables::ACCOUNTS {
        let node = ctx.stage(
            kind::ACCOUNT,
            json!({
                "name": {"value": account.name},
                "password": {"value": account.password},
                "type": {"value": account.account_type},
                "role": {"value": account.role},
            }),
        );
        batch.add(account.name, node);
    }

    for org in tables::ORGANIZATIONS {
        let node = ctx.stage(
            kind::ORGANIZATION,
            json!({"name": {"value": org.name, "is_protected": true}}),
        );
        batch.add(org.name, node);
    }

    for platform in tables::PLATFORMS {
        let node = ctx.stage(
            kind::PLATFORM,
            json!({
                "name": {"value": platform.name},
                "nornir_platform": {"value": platform.nornir_platform},
                "napalm_driver": {"value": platform.napalm_driver},
                "netmiko_device_type": {"value": platform.netmiko_device_type},
                "ansible_network_os": {"value": platform.ansible_network_os},
            }),
        );
        batch.add(platform.name, node);
    }

    for label in ctx.execute(batch).await? {
        tracing::info!("Created {}", label);
    }

    let account_pop = ctx.nodes.id(kind::ACCOUNT, tables::ACCOUNT_BUILDER)?;
    let account_owner = ctx.nodes.id(kind::ACCOUNT, tables::ACCOUNT_AS_OWNER)?;

    // --- Autonomous systems ---
    let mut batch = ctx.batch();
    for org in tables::ORGANIZATIONS {
        let org_id = ctx.nodes.id(kind::ORGANIZATION, org.name)?;
        let node = ctx.stage(
            kind::AUTONOMOUS_SYSTEM,
            json!({
                "name": {"value": format!("AS{}", org.asn), "source": account_pop, "owner": account_owner},
                "asn": {"value": org.asn, "source": account_pop, "owner": account_owner},
                "organization": {"id": org_id, "source": account_pop},
            }),
        );
        // keyed by organisation so peer groups and sessions resolve ASes by provider
        batch.add(org.name, node);
    }

    for label in ctx.execute(batch).await? {
        tracing::info!("Created {}", label);
    }

    // --- BGP peer groups ---
    let mut batch = ctx.batch();
    for group in tables::BGP_PEER_GROUPS {
        let local_as = ctx.nodes.id(kind::AUTONOMOUS_SYSTEM, group.local_org)?;
        let remote_as = group
            .remote_org
            .map(|org| ctx.nodes.id(kind::AUTONOMOUS_SYSTEM, org))
            .transpose()?;

        let mut data = json!({
            "name": {"value": group.name, "source": account_pop},
            "import_policies": {"value": group.import_policies, "source": account_pop},
            "export_policies": {"value": group.export_policies, "source": account_pop},
            "local_as": {"id": local_as},
        });
        if let Some(remote_as) = remote_as {
            data["remote_as"] = json!({"id": remote_as});
        }
        batch.add(group.name, ctx.stage(kind::BGP_PEER_GROUP, data));
    }

    for label in ctx.execute(batch).await? {
        tracing::info!("Peer Group Created {}", label);
    }

    // --- Roles, statuses & tags ---
    tracing::info!("Creating Roles, Status & Tag");
    let mut batch = ctx.batch();

    for role in tables::all_roles() {
        batch.add(role, ctx.stage(kind::ROLE, json!({"name": {"value": role, "source": account_pop}})));
    }
    for status in tables::STATUSES {
        batch.add(*status, ctx.stage(kind::STATUS, json!({"name": {"value": status, "source": account_pop}})));
    }
    for tag in tables::TAGS {
        batch.add(*tag, ctx.stage(kind::TAG, json!({"name": {"value": tag, "source": account_pop}})));
    }

    for label in ctx.execute(batch).await? {
        tracing::info!("Created {}", label);
    }

    Ok(())
}
