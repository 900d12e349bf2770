//! Branch scenarios: each creates its own branch off the base branch and edits
//! already generated data there, sometimes editing the base branch as well to
//! produce merge conflicts.

use anyhow::Result;
use serde_json::json;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::infrahub::queries::{self, CircuitEndpointsBySite};
use crate::infrahub::{Node, NotFoundError};
use crate::utils::{derive_circuit_id, format_cidr, vendor_reference};

use super::tables::{self, intf_role, kind, status};
use super::SeedContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    AddTransit,
    ReplaceIpAddresses,
    RemoveProviderCircuits,
    ConflictDevice,
    ConflictPlatform,
}

impl Scenario {
    pub const ALL: &'static [Scenario] = &[
        Scenario::AddTransit,
        Scenario::ReplaceIpAddresses,
        Scenario::RemoveProviderCircuits,
        Scenario::ConflictDevice,
        Scenario::ConflictPlatform,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::AddTransit => "add-transit",
            Scenario::ReplaceIpAddresses => "replace-ip-addresses",
            Scenario::RemoveProviderCircuits => "remove-provider-circuits",
            Scenario::ConflictDevice => "conflict-device",
            Scenario::ConflictPlatform => "conflict-platform",
        }
    }

    /// Whether the scenario acts on one site's devices
    pub fn is_site_scoped(&self) -> bool {
        !matches!(self, Scenario::ConflictPlatform)
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "add-transit" => Ok(Scenario::AddTransit),
            "replace-ip-addresses" => Ok(Scenario::ReplaceIpAddresses),
            "remove-provider-circuits" | "remove-colt" => Ok(Scenario::RemoveProviderCircuits),
            "conflict-device" => Ok(Scenario::ConflictDevice),
            "conflict-platform" => Ok(Scenario::ConflictPlatform),
            other => Err(anyhow::anyhow!(
                "Unknown scenario {:?}, expected one of: {}",
                other,
                Scenario::ALL.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
            )),
        }
    }
}

/// Provider whose circuits the remove-provider-circuits scenario deletes
pub const REMOVED_PROVIDER: &str = "Colt";

pub async fn run_scenario(ctx: &mut SeedContext, scenario: Scenario, site_name: Option<&str>) -> Result<()> {
    tracing::info!("Running branch scenario {}", scenario);
    let site = if scenario.is_site_scoped() {
        site_name.ok_or_else(|| anyhow::anyhow!("Scenario {} needs a site", scenario))?
    } else {
        ""
    };

    match scenario {
        Scenario::AddTransit => add_transit(ctx, site).await,
        Scenario::ReplaceIpAddresses => replace_ip_addresses(ctx, site).await,
        Scenario::RemoveProviderCircuits => remove_colt(ctx, site).await.map(|_| ()),
        Scenario::ConflictDevice => conflict_device(ctx, site).await,
        Scenario::ConflictPlatform => conflict_platform(ctx).await,
    }
}

async fn create_branch(ctx: &mut SeedContext, name: &str, description: &str) -> Result<()> {
    ctx.client.create_branch(name, true, description).await?;
    ctx.record_branch(name);
    tracing::info!("Created branch: {:?}", name);
    Ok(())
}

async fn get_by_name(ctx: &SeedContext, branch: &str, kind: &str, name: &str) -> Result<Node> {
    ctx.client.get(branch, kind, &json!({ "name__value": name })).await
}

/// Add a GTT transit link on the first spare interface of leaf1
pub async fn add_transit(ctx: &mut SeedContext, site_name: &str) -> Result<()> {
    let device_name = format!("{}-leaf1", site_name);
    let branch = format!("{}-add-transit", site_name);
    create_branch(ctx, &branch, &format!("Add a new Transit link in {}", site_name)).await?;

    let site = get_by_name(ctx, &branch, kind::LOCATION, site_name).await?;
    let device = get_by_name(ctx, &branch, kind::DEVICE, &device_name).await?;
    let active_status = get_by_name(ctx, &branch, kind::STATUS, status::ACTIVE).await?;
    let role_transit = get_by_name(ctx, &branch, kind::ROLE, intf_role::TRANSIT).await?;
    let role_spare = get_by_name(ctx, &branch, kind::ROLE, intf_role::SPARE).await?;
    let provider = get_by_name(ctx, &branch, kind::ORGANIZATION, tables::SCENARIO_TRANSIT_PROVIDER).await?;
    let internal_org = get_by_name(ctx, &branch, kind::ORGANIZATION, tables::INTERNAL_ORGANIZATION).await?;
    let peer_group = get_by_name(ctx, &branch, kind::BGP_PEER_GROUP, tables::PEER_GROUP_TRANSIT_DEFAULT).await?;

    let as_of = |org: &Node| json!({ "organization__ids": [org.id()] });
    let remote_as = ctx.client.get(&branch, kind::AUTONOMOUS_SYSTEM, &as_of(&provider)).await?;
    let local_as = ctx.client.get(&branch, kind::AUTONOMOUS_SYSTEM, &as_of(&internal_org)).await?;

    let mut intf = ctx
        .client
        .filters(
            &branch,
            kind::INTERFACE_L3,
            &json!({ "device__ids": [device.require_id()?], "role__ids": [role_spare.require_id()?] }),
        )
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| NotFoundError::new(kind::INTERFACE_L3, &format!("spare interface on {}", device_name)))?;
    let intf_name = intf.attr_str("name").unwrap_or_default().to_string();
    tracing::info!(" Adding new Transit on '{}::{}'", device_name, intf_name);

    let mut hosts = ctx.pools.external.allocate()?.hosts();
    let address = format_cidr(hosts.allocate()?, 29);
    let peer_address = format_cidr(hosts.allocate()?, 29);

    let peer_ip = ctx
        .create_in(&branch, kind::IP_ADDRESS, json!({ "address": {"value": peer_address} }))
        .await?;
    let ip = ctx
        .create_in(
            &branch,
            kind::IP_ADDRESS,
            json!({
                "interface": {"id": intf.require_id()?},
                "address": {"value": address},
            }),
        )
        .await?;

    let provider_name = provider.attr_str("name").unwrap_or(tables::SCENARIO_TRANSIT_PROVIDER);
    let circuit_id = derive_circuit_id(&format!("{}-{}-{}", device_name, intf_role::TRANSIT, address));
    let circuit = ctx
        .create_in(
            &branch,
            kind::CIRCUIT,
            json!({
                "circuit_id": {"value": circuit_id},
                "vendor_id": {"value": vendor_reference(provider_name)},
                "provider": {"id": provider.require_id()?},
                "status": {"id": active_status.require_id()?},
                "role": {"id": role_transit.require_id()?},
            }),
        )
        .await?;

    ctx.create_in(
        &branch,
        kind::CIRCUIT_ENDPOINT,
        json!({
            "site": {"id": site.require_id()?},
            "circuit": {"id": circuit.require_id()?},
            "connected_interface": {"id": intf.require_id()?},
        }),
    )
    .await?;

    intf.set_relationship("role", role_transit.require_id()?);
    intf.set_attr("description", json!(format!("Connected to {} via {}", provider_name, circuit_id)));
    ctx.save(&mut intf).await?;

    ctx.create_in(
        &branch,
        kind::BGP_SESSION,
        json!({
            "type": {"value": "EXTERNAL"},
            "local_as": {"id": local_as.require_id()?},
            "local_ip": {"id": ip.require_id()?},
            "remote_as": {"id": remote_as.require_id()?},
            "remote_ip": {"id": peer_ip.require_id()?},
            "peer_group": {"id": peer_group.require_id()?},
            "device": {"id": device.require_id()?},
            "status": {"id": active_status.require_id()?},
            "role": {"id": role_transit.require_id()?},
        }),
    )
    .await?;

    tracing::info!(
        " Created BGP Session '{}' >> '{}': '{}' '{}' >> '{}'",
        device_name,
        provider_name,
        tables::PEER_GROUP_TRANSIT_DEFAULT,
        address,
        peer_address
    );

    ctx.nodes.set(status::ACTIVE, active_status);
    ctx.nodes.set(intf_role::TRANSIT, role_transit);
    ctx.nodes.set(tables::SCENARIO_TRANSIT_PROVIDER, provider);
    Ok(())
}

/// Re-address the first peer link between leaf1 and leaf2 from a fresh /31
pub async fn replace_ip_addresses(ctx: &mut SeedContext, site_name: &str) -> Result<()> {
    let device1_name = format!("{}-leaf1", site_name);
    let device2_name = format!("{}-leaf2", site_name);
    let branch = format!("{}-update-edge-ips", site_name);
    create_branch(
        ctx,
        &branch,
        &format!("Change the IP addresses between leaf1 and leaf2 in {}", site_name),
    )
    .await?;

    let mut hosts = ctx.pools.p2p.allocate()?.hosts();

    let device1 = get_by_name(ctx, &branch, kind::DEVICE, &device1_name).await?;
    let device2 = get_by_name(ctx, &branch, kind::DEVICE, &device2_name).await?;
    let role_peer = get_by_name(ctx, &branch, kind::ROLE, intf_role::PEER).await?;

    let mut targets = Vec::with_capacity(2);
    for device in [&device1, &device2] {
        let mut intfs = ctx
            .client
            .filters(
                &branch,
                kind::INTERFACE_L3,
                &json!({ "device__ids": [device.require_id()?], "role__ids": [role_peer.require_id()?] }),
            )
            .await?;
        intfs.sort_by(|a, b| a.attr_str("name").cmp(&b.attr_str("name")));
        let intf = intfs
            .into_iter()
            .next()
            .ok_or_else(|| NotFoundError::new(kind::INTERFACE_L3, &format!("peer interface on {}", device.label())))?;
        targets.push(intf);
    }

    for intf in &targets {
        let address = format_cidr(hosts.allocate()?, 31);
        ctx.create_in(
            &branch,
            kind::IP_ADDRESS,
            json!({
                "interface": {"id": intf.require_id()?},
                "address": {"value": address},
            }),
        )
        .await?;
        tracing::info!(" Assigned {} to '{}'", address, intf.label());
    }

    Ok(())
}

/// Delete every circuit of `provider` at the site, all endpoints first.
/// Returns the number of circuits deleted.
pub async fn remove_provider_circuits(ctx: &mut SeedContext, site_name: &str, provider: &str) -> Result<usize> {
    let branch = format!("{}-delete-transit", site_name);
    create_branch(
        ctx,
        &branch,
        &format!("Delete transit circuit with {} in {}", provider.to_lowercase(), site_name),
    )
    .await?;

    let data = ctx
        .client
        .execute_graphql(
            queries::CIRCUIT_ENDPOINTS_BY_SITE,
            json!({ "site_name": site_name }),
            &branch,
        )
        .await?;
    let endpoints: CircuitEndpointsBySite = serde_json::from_value(data)?;

    let matching: Vec<_> = endpoints
        .into_circuits()
        .into_iter()
        .filter(|c| c.provider.as_deref() == Some(provider))
        .collect();

    // All endpoints first, then each distinct circuit once
    for circuit in &matching {
        let endpoint = ctx
            .client
            .get(&branch, kind::CIRCUIT_ENDPOINT, &json!({ "ids": [circuit.endpoint_id] }))
            .await?;
        ctx.delete(&endpoint).await?;
    }

    let mut deleted = HashSet::new();
    for circuit in &matching {
        if !deleted.insert(circuit.circuit_id.clone()) {
            continue;
        }
        let node = ctx
            .client
            .get(&branch, kind::CIRCUIT, &json!({ "ids": [circuit.circuit_id] }))
            .await?;
        ctx.delete(&node).await?;
        tracing::info!(" Deleted circuit {} with {}", circuit.circuit_label, provider);
    }

    Ok(deleted.len())
}

pub async fn remove_colt(ctx: &mut SeedContext, site_name: &str) -> Result<usize> {
    remove_provider_circuits(ctx, site_name, REMOVED_PROVIDER).await
}

/// Put leaf1 in maintenance in a branch while provisioning it in the base branch
pub async fn conflict_device(ctx: &mut SeedContext, site_name: &str) -> Result<()> {
    let device_name = format!("{}-leaf1", site_name);
    let branch = format!("{}-maintenance-conflict", site_name);
    let base = ctx.branch.clone();
    create_branch(ctx, &branch, &format!("Put {} in maintenance mode", device_name)).await?;

    let statuses = ctx.client.filters(&branch, kind::STATUS, &json!({})).await?;
    ctx.nodes.populate(statuses, "name");
    let maintenance = ctx.nodes.id(kind::STATUS, status::MAINTENANCE)?;
    let provisionning = ctx.nodes.id(kind::STATUS, status::PROVISIONNING)?;
    let drained = ctx.nodes.id(kind::STATUS, status::DRAINED)?;

    // Device status in both the branch and the base branch
    let mut device_branch = get_by_name(ctx, &branch, kind::DEVICE, &device_name).await?;
    device_branch.set_relationship("status", &maintenance);
    ctx.save(&mut device_branch).await?;

    let ethernet1 = json!({ "device__ids": [device_branch.require_id()?], "name__value": "Ethernet1" });
    let mut intf_branch = ctx.client.get(&branch, kind::INTERFACE_L3, &ethernet1).await?;
    intf_branch.set_attr("enabled", json!(false));
    intf_branch.set_relationship("status", &drained);
    ctx.save(&mut intf_branch).await?;

    let mut device_base = get_by_name(ctx, &base, kind::DEVICE, &device_name).await?;
    device_base.set_relationship("status", &provisionning);
    ctx.save(&mut device_base).await?;

    let mut intf_base = ctx.client.get(&base, kind::INTERFACE_L3, &ethernet1).await?;
    intf_base.set_attr("enabled", json!(false));
    ctx.save(&mut intf_base).await?;

    Ok(())
}

/// Platform create and delete conflicts between a branch and the base branch
pub async fn conflict_platform(ctx: &mut SeedContext) -> Result<()> {
    let branch = "platform-conflict";
    let base = ctx.branch.clone();
    create_branch(ctx, branch, "Add new platform").await?;

    // Same new platform on both sides
    let new_platform = json!({
        "name": {"value": "Cisco IOS XR"},
        "netmiko_device_type": {"value": "cisco_xr"},
    });
    ctx.create_in(branch, kind::PLATFORM, new_platform.clone()).await?;
    ctx.create_in(&base, kind::PLATFORM, new_platform).await?;

    // Deleted on both sides
    let nxos_branch = get_by_name(ctx, branch, kind::PLATFORM, "Cisco NXOS SSH").await?;
    ctx.delete(&nxos_branch).await?;
    let nxos_base = get_by_name(ctx, &base, kind::PLATFORM, "Cisco NXOS SSH").await?;
    ctx.delete(&nxos_base).await?;

    // Deleted in the branch, updated in the base branch
    let junos_branch = get_by_name(ctx, branch, kind::PLATFORM, "Juniper JunOS").await?;
    ctx.delete(&junos_branch).await?;
    let mut junos_base = get_by_name(ctx, &base, kind::PLATFORM, "Juniper JunOS").await?;
    junos_base.set_attr("nornir_platform", json!("juniper_junos"));
    ctx.save(&mut junos_base).await?;

    Ok(())
}
