//! Per-site topology: site, VLANs, devices with their interfaces and
//! addresses, external circuits and sessions, spine/leaf wiring and the
//! in-site iBGP sessions.

use anyhow::Result;
use serde_json::json;

use crate::infrahub::{group_add_member, Node};
use crate::utils::{derive_circuit_id, format_cidr, vendor_reference};

use super::node_store::NodeStore;
use super::tables::{self, intf_role, kind, status, DeviceTemplate};
use super::SeedContext;

/// Ids every object of a site refers to
struct SiteRefs {
    site_id: String,
    account_pop: String,
    engineering: String,
    operations: String,
    active_status: String,
    internal_as: String,
}

impl SiteRefs {
    fn load(nodes: &NodeStore, site_id: String) -> Result<Self> {
        Ok(Self {
            site_id,
            account_pop: nodes.id(kind::ACCOUNT, tables::ACCOUNT_BUILDER)?,
            engineering: nodes.id(kind::ACCOUNT, tables::ACCOUNT_ENGINEERING)?,
            operations: nodes.id(kind::ACCOUNT, tables::ACCOUNT_OPERATIONS)?,
            active_status: nodes.id(kind::STATUS, status::ACTIVE)?,
            internal_as: nodes.id(kind::AUTONOMOUS_SYSTEM, tables::INTERNAL_ORGANIZATION)?,
        })
    }
}

/// An L3 interface that terminates on an external provider
struct ExternalLink<'a> {
    device_name: &'a str,
    device_id: &'a str,
    role: &'a str,
    intf_idx: usize,
}

pub fn device_name(site_name: &str, stem: &str, index: usize) -> String {
    format!("{}-{}{}", site_name, stem, index)
}

pub fn loopback_key(device_name: &str) -> String {
    format!("{}-loopback", device_name)
}

pub fn l3_key(device_name: &str, intf_idx: usize) -> String {
    format!("{}-l3-{}", device_name, intf_idx)
}

pub fn vlan_key(site_name: &str, role: &str) -> String {
    format!("{}_{}", site_name, role)
}

/// Generate one complete site
pub async fn generate_site(ctx: &mut SeedContext, site_name: &str) -> Result<()> {
    let account_crm = ctx.nodes.id(kind::ACCOUNT, tables::ACCOUNT_CRM)?;

    // --- Site ---
    let site = ctx
        .create(
            kind::LOCATION,
            json!({
                "name": {"value": site_name, "is_protected": true, "source": account_crm},
                "type": {"value": "SITE", "is_protected": true, "source": account_crm},
            }),
        )
        .await?;
    tracing::info!("Created Site: {}", site_name);

    let refs = SiteRefs::load(&ctx.nodes, site.require_id()?.to_string())?;
    ctx.nodes.set(site_name, site);

    // --- Site VLANs ---
    for vlan in tables::VLANS {
        let role_id = ctx.nodes.id(kind::ROLE, vlan.role)?;
        let vlan_name = vlan_key(site_name, vlan.role);
        let node = ctx
            .create(
                kind::VLAN,
                json!({
                    "name": {"value": vlan_name, "is_protected": true, "source": refs.account_pop},
                    "vlan_id": {
                        "value": vlan.vlan_id,
                        "is_protected": true,
                        "owner": refs.engineering,
                        "source": refs.account_pop,
                    },
                    "status": {"id": refs.active_status, "owner": refs.operations},
                    "role": {
                        "id": role_id,
                        "source": refs.account_pop,
                        "is_protected": true,
                        "owner": refs.engineering,
                    },
                }),
            )
            .await?;
        ctx.nodes.set(&vlan_name, node);
    }

    // --- Devices ---
    for template in tables::DEVICES {
        for index in 1..=template.count {
            create_device(ctx, &refs, site_name, template, index).await?;
        }
    }

    connect_spines_to_leaves(ctx, site_name).await?;
    create_site_sessions(ctx, &refs, site_name).await?;

    Ok(())
}

async fn create_device(
    ctx: &mut SeedContext,
    refs: &SiteRefs,
    site_name: &str,
    template: &DeviceTemplate,
    index: usize,
) -> Result<()> {
    let name = device_name(site_name, template.stem, index);
    let tags = template
        .tags
        .iter()
        .map(|tag| Ok(json!({"id": ctx.nodes.id(kind::TAG, tag)?})))
        .collect::<Result<Vec<_>>>()?;

    let mut device = ctx
        .create(
            kind::DEVICE,
            json!({
                "site": {"id": refs.site_id, "source": refs.account_pop, "is_protected": true},
                "name": {"value": name, "source": refs.account_pop, "is_protected": true},
                "status": {"id": ctx.nodes.id(kind::STATUS, template.status)?, "owner": refs.operations},
                "type": {"value": template.device_type, "source": refs.account_pop},
                "role": {
                    "id": ctx.nodes.id(kind::ROLE, template.role)?,
                    "source": refs.account_pop,
                    "is_protected": true,
                    "owner": refs.engineering,
                },
                "asn": {
                    "id": refs.internal_as,
                    "source": refs.account_pop,
                    "is_protected": true,
                    "owner": refs.engineering,
                },
                "tags": tags,
                "platform": {
                    "id": ctx.nodes.id(kind::PLATFORM, template.platform)?,
                    "source": refs.account_pop,
                    "is_protected": true,
                },
            }),
        )
        .await?;
    let device_id = device.require_id()?.to_string();
    tracing::info!("- Created Device: {}", name);

    // Group membership
    let edge_router = ctx.nodes.get(kind::STANDARD_GROUP, tables::GROUP_EDGE_ROUTER)?.clone();
    group_add_member(ctx.client.as_ref(), &edge_router, &[&device]).await?;

    let vendor_group = if template.platform.contains("Arista") {
        Some(tables::GROUP_ARISTA_DEVICES)
    } else if template.platform.contains("Cisco") {
        Some(tables::GROUP_CISCO_DEVICES)
    } else {
        None
    };
    if let Some(group) = vendor_group {
        let group = ctx.nodes.get(kind::STANDARD_GROUP, group)?.clone();
        group_add_member(ctx.client.as_ref(), &group, &[&device]).await?;
    }

    // Loopback interface
    let loopback = ctx
        .create(
            kind::INTERFACE_L3,
            json!({
                "device": {"id": device_id, "is_protected": true},
                "name": {"value": "Loopback0", "source": refs.account_pop, "is_protected": true},
                "enabled": {"value": true},
                "status": {"id": refs.active_status, "owner": refs.operations},
                "role": {
                    "id": ctx.nodes.id(kind::ROLE, intf_role::LOOPBACK)?,
                    "source": refs.account_pop,
                    "is_protected": true,
                },
                "speed": {"value": 1000},
            }),
        )
        .await?;
    tracing::info!("- Created loopback iface for: {}", name);

    let address = ctx.pools.loopback.allocate()?;
    let ip = ctx
        .create(
            kind::IP_ADDRESS,
            json!({
                "interface": {"id": loopback.require_id()?, "source": refs.account_pop},
                "address": {"value": format_cidr(address, 32), "source": refs.account_pop},
            }),
        )
        .await?;
    ctx.nodes.set(&loopback_key(&name), ip);
    tracing::info!("- Created IP for loopback iface on: {}", name);

    // Management interface
    let mgmt_name = tables::management_interface(template.device_type)
        .ok_or_else(|| anyhow::anyhow!("No management interface for device type {}", template.device_type))?;
    let mgmt = ctx
        .create(
            kind::INTERFACE_L3,
            json!({
                "device": {"id": device_id, "is_protected": true},
                "name": {"value": mgmt_name, "source": refs.account_pop},
                "enabled": {"value": true, "owner": refs.engineering},
                "status": {"id": refs.active_status, "owner": refs.engineering},
                "role": {
                    "id": ctx.nodes.id(kind::ROLE, intf_role::MANAGEMENT)?,
                    "source": refs.account_pop,
                    "is_protected": true,
                },
                "speed": {"value": 1000},
            }),
        )
        .await?;
    tracing::info!("- Created mgmt iface for: {}", name);

    let address = ctx.pools.management.allocate()?;
    let ip = ctx
        .create(
            kind::IP_ADDRESS,
            json!({
                "interface": {"id": mgmt.require_id()?},
                "address": {"value": format_cidr(address, 24)},
            }),
        )
        .await?;

    device.set_relationship("primary_address", ip.require_id()?);
    ctx.save(&mut device).await?;
    ctx.nodes.set(&name, device);
    tracing::info!("- Created IP for mgmt iface on: {}", name);

    // L3 interfaces
    if let Some(roles) = tables::interface_roles(template.role) {
        for (intf_idx, intf_name) in tables::l3_interfaces(template.device_type).iter().enumerate() {
            let role = roles
                .get(intf_idx)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("No interface role for {} position {}", template.role, intf_idx))?;

            let mut intf = ctx
                .create(
                    kind::INTERFACE_L3,
                    json!({
                        "device": {"id": device_id, "is_protected": true},
                        "name": {"value": intf_name},
                        "speed": {"value": 10000},
                        "enabled": {"value": true},
                        "status": {"id": refs.active_status, "owner": refs.operations},
                        "role": {"id": ctx.nodes.id(kind::ROLE, role)?, "source": refs.account_pop},
                    }),
                )
                .await?;

            if intf_role::is_external(role) {
                let link = ExternalLink {
                    device_name: &name,
                    device_id: &device_id,
                    role,
                    intf_idx,
                };
                create_external_link(ctx, refs, &link, &mut intf).await?;
                tracing::info!("- Created iface: {} on: {}", l3_key(&name, intf_idx), name);
            }

            ctx.nodes.set(&l3_key(&name, intf_idx), intf);
        }
    }

    // L2 interfaces
    let server_role = ctx.nodes.id(kind::ROLE, tables::ACCESS_VLAN_ROLE)?;
    let server_vlan = ctx.nodes.id(kind::VLAN, &vlan_key(site_name, tables::ACCESS_VLAN_ROLE))?;
    for intf_name in tables::l2_interfaces(template.device_type) {
        ctx.create(
            kind::INTERFACE_L2,
            json!({
                "device": {"id": device_id, "is_protected": true},
                "name": {"value": intf_name},
                "speed": {"value": 10000},
                "enabled": {"value": true},
                "status": {"id": refs.active_status, "owner": refs.operations},
                "role": {"id": server_role, "source": refs.account_pop},
                "l2_mode": {"value": "Access"},
                "untagged_vlan": {"id": server_vlan},
            }),
        )
        .await?;
    }

    Ok(())
}

/// Address a transit or peering interface, order its circuit and, for transit,
/// set up the external BGP session
async fn create_external_link(
    ctx: &mut SeedContext,
    refs: &SiteRefs,
    link: &ExternalLink<'_>,
    intf: &mut Node,
) -> Result<()> {
    let mut hosts = ctx.pools.external.allocate()?.hosts();
    let address = format_cidr(hosts.allocate()?, 29);
    let peer_address = format_cidr(hosts.allocate()?, 29);

    let ip = ctx
        .create(
            kind::IP_ADDRESS,
            json!({
                "interface": {"id": intf.require_id()?, "source": refs.account_pop},
                "address": {"value": address, "source": refs.account_pop},
            }),
        )
        .await?;

    let provider = tables::provider_for(link.role, link.intf_idx)
        .ok_or_else(|| anyhow::anyhow!("No provider for interface role {}", link.role))?;
    let role_id = ctx.nodes.id(kind::ROLE, link.role)?;
    let circuit_id = derive_circuit_id(&format!("{}-{}-{}", link.device_name, link.role, address));

    let circuit = ctx
        .create(
            kind::CIRCUIT,
            json!({
                "circuit_id": {"value": circuit_id},
                "vendor_id": {"value": vendor_reference(provider)},
                "provider": {"id": ctx.nodes.id(kind::ORGANIZATION, provider)?},
                "status": {"id": refs.active_status, "owner": refs.operations},
                "role": {"id": role_id, "source": refs.account_pop, "owner": refs.engineering},
            }),
        )
        .await?;

    ctx.create(
        kind::CIRCUIT_ENDPOINT,
        json!({
            "site": {"id": refs.site_id},
            "circuit": {"id": circuit.require_id()?},
            "connected_interface": {"id": intf.require_id()?},
        }),
    )
    .await?;

    intf.set_attr("description", json!(format!("Connected to {} via {}", provider, circuit_id)));
    ctx.save(intf).await?;

    if link.role == intf_role::TRANSIT {
        let peer_group = tables::transit_peer_group(provider);
        let peer_ip = ctx
            .create(kind::IP_ADDRESS, json!({"address": {"value": peer_address}}))
            .await?;

        ctx.create(
            kind::BGP_SESSION,
            json!({
                "type": {"value": "EXTERNAL"},
                "local_as": {"id": refs.internal_as},
                "local_ip": {"id": ip.require_id()?},
                "remote_as": {"id": ctx.nodes.id(kind::AUTONOMOUS_SYSTEM, provider)?},
                "remote_ip": {"id": peer_ip.require_id()?},
                "peer_group": {"id": ctx.nodes.id(kind::BGP_PEER_GROUP, peer_group)?},
                "device": {"id": link.device_id},
                "status": {"id": refs.active_status},
                "role": {"id": role_id},
            }),
        )
        .await?;

        tracing::info!(
            " Created BGP Session '{}' >> '{}': '{}' '{}' >> '{}'",
            link.device_name,
            provider,
            peer_group,
            address,
            peer_address
        );
    }

    Ok(())
}

/// Describe each spine/leaf link on both ends
async fn connect_spines_to_leaves(ctx: &mut SeedContext, site_name: &str) -> Result<()> {
    for spine_idx in 1..=tables::device_count("spine") {
        for leaf_idx in 1..=tables::device_count("leaf") {
            let spine = device_name(site_name, "spine", spine_idx);
            let leaf = device_name(site_name, "leaf", leaf_idx);
            let spine_key = l3_key(&spine, leaf_idx + 1);
            let leaf_key = l3_key(&leaf, spine_idx + 1);

            let mut intf_spine = ctx.nodes.get(kind::INTERFACE_L3, &spine_key)?.clone();
            let mut intf_leaf = ctx.nodes.get(kind::INTERFACE_L3, &leaf_key)?.clone();
            let spine_intf_name = intf_spine.attr_str("name").unwrap_or_default().to_string();
            let leaf_intf_name = intf_leaf.attr_str("name").unwrap_or_default().to_string();

            intf_leaf.set_attr("description", json!(format!("Connected to {} {}", spine, spine_intf_name)));
            ctx.save(&mut intf_leaf).await?;
            intf_spine.set_attr("description", json!(format!("Connected to {} {}", leaf, leaf_intf_name)));
            ctx.save(&mut intf_spine).await?;

            ctx.nodes.set(&leaf_key, intf_leaf);
            ctx.nodes.set(&spine_key, intf_spine);
            tracing::info!(
                "Connected  '{}::{}' <> '{}::{}'",
                leaf,
                leaf_intf_name,
                spine,
                spine_intf_name
            );
        }
    }
    Ok(())
}

/// iBGP between every spine and every leaf of the site, on loopbacks
async fn create_site_sessions(ctx: &mut SeedContext, refs: &SiteRefs, site_name: &str) -> Result<()> {
    let peer_group = ctx.nodes.id(kind::BGP_PEER_GROUP, tables::PEER_GROUP_POP_INTERNAL)?;
    let backbone = ctx.nodes.id(kind::ROLE, intf_role::BACKBONE)?;

    for spine_idx in 1..=tables::device_count("spine") {
        for leaf_idx in 1..=tables::device_count("leaf") {
            let device1 = device_name(site_name, "spine", spine_idx);
            let device2 = device_name(site_name, "leaf", leaf_idx);
            let loopback1 = ctx.nodes.get(kind::IP_ADDRESS, &loopback_key(&device1))?.clone();
            let loopback2 = ctx.nodes.get(kind::IP_ADDRESS, &loopback_key(&device2))?.clone();

            ctx.create(
                kind::BGP_SESSION,
                json!({
                    "type": {"value": "INTERNAL"},
                    "local_as": {"id": refs.internal_as},
                    "local_ip": {"id": loopback1.require_id()?},
                    "remote_as": {"id": refs.internal_as},
                    "remote_ip": {"id": loopback2.require_id()?},
                    "peer_group": {"id": peer_group},
                    "device": {"id": ctx.nodes.id(kind::DEVICE, &device1)?},
                    "status": {"id": refs.active_status},
                    "role": {"id": backbone},
                }),
            )
            .await?;

            tracing::info!(
                " Created BGP Session '{}' >> '{}': '{}' '{}' >> '{}'",
                device1,
                device2,
                tables::PEER_GROUP_POP_INTERNAL,
                loopback1.attr_str("address").unwrap_or_default(),
                loopback2.attr_str("address").unwrap_or_default()
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrahub::{GraphStore, MemoryStore};
    use crate::seed::bootstrap::load_reference_data;
    use crate::seed::testing::context;
    use std::collections::HashSet;
    use std::sync::Arc;

    async fn seeded_atl() -> (Arc<MemoryStore>, SeedContext) {
        let store = Arc::new(MemoryStore::new("main"));
        let mut ctx = context(&store);
        load_reference_data(&mut ctx).await.unwrap();
        generate_site(&mut ctx, "atl").await.unwrap();
        (store, ctx)
    }

    async fn interfaces(store: &MemoryStore, device_id: &str) -> Vec<Node> {
        store
            .filters("main", kind::INTERFACE_L3, &json!({"device__ids": [device_id]}))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_atl_device_inventory() {
        let (store, ctx) = seeded_atl().await;

        for (role, expected) in [("spine", 2), ("leaf", 4), ("client", 2)] {
            let role_id = ctx.nodes.id(kind::ROLE, role).unwrap();
            let devices = store
                .filters("main", kind::DEVICE, &json!({"role__ids": [role_id]}))
                .await
                .unwrap();
            assert_eq!(devices.len(), expected, "{}", role);
        }
        assert_eq!(store.count("main", kind::VLAN).await, 2);
        assert!(ctx.nodes.get(kind::VLAN, "atl_server").is_ok());
        assert_eq!(store.count("main", kind::INTERFACE_L2).await, 16);
    }

    #[tokio::test]
    async fn test_loopbacks_are_consecutive() {
        let (_, ctx) = seeded_atl().await;

        let names = [
            "atl-spine1",
            "atl-spine2",
            "atl-leaf1",
            "atl-leaf2",
            "atl-leaf3",
            "atl-leaf4",
            "atl-client1",
            "atl-client2",
        ];
        for (idx, name) in names.iter().enumerate() {
            let ip = ctx.nodes.get(kind::IP_ADDRESS, &loopback_key(name)).unwrap();
            assert_eq!(ip.attr_str("address"), Some(format!("10.0.0.{}/32", idx + 1).as_str()));
        }
    }

    #[tokio::test]
    async fn test_loopback_and_management_per_device() {
        let (store, ctx) = seeded_atl().await;
        let loopback_role = ctx.nodes.id(kind::ROLE, intf_role::LOOPBACK).unwrap();
        let mgmt_role = ctx.nodes.id(kind::ROLE, intf_role::MANAGEMENT).unwrap();

        for device in store.all("main", kind::DEVICE).await {
            let device_id = device.id().unwrap();
            let intfs = interfaces(&store, device_id).await;
            let loopbacks: Vec<&Node> = intfs
                .iter()
                .filter(|i| i.relationship_id("role") == Some(loopback_role.as_str()))
                .collect();
            let mgmts: Vec<&Node> = intfs
                .iter()
                .filter(|i| i.relationship_id("role") == Some(mgmt_role.as_str()))
                .collect();
            assert_eq!(loopbacks.len(), 1, "{}", device.label());
            assert_eq!(mgmts.len(), 1, "{}", device.label());

            let mgmt_ip = store
                .get("main", kind::IP_ADDRESS, &json!({"interface__ids": [mgmts[0].id().unwrap()]}))
                .await
                .unwrap();
            assert_eq!(device.relationship_id("primary_address"), mgmt_ip.id());
            assert!(mgmt_ip.attr_str("address").unwrap().ends_with("/24"));
        }
    }

    #[tokio::test]
    async fn test_transit_circuits_follow_provider_rotation() {
        let (store, ctx) = seeded_atl().await;

        let circuits = store.all("main", kind::CIRCUIT).await;
        let endpoints = store.all("main", kind::CIRCUIT_ENDPOINT).await;
        assert_eq!(circuits.len(), 4);
        assert_eq!(endpoints.len(), 4);

        let telia = ctx.nodes.id(kind::ORGANIZATION, "Telia").unwrap();
        let colt = ctx.nodes.id(kind::ORGANIZATION, "Colt").unwrap();
        for spine in ["atl-spine1", "atl-spine2"] {
            for (idx, provider_id, provider) in [(0, &telia, "Telia"), (1, &colt, "Colt")] {
                let intf = ctx.nodes.get(kind::INTERFACE_L3, &l3_key(spine, idx)).unwrap();
                let endpoint = endpoints
                    .iter()
                    .find(|e| e.relationship_id("connected_interface") == intf.id())
                    .unwrap();
                let circuit = circuits
                    .iter()
                    .find(|c| c.id() == endpoint.relationship_id("circuit"))
                    .unwrap();
                assert_eq!(circuit.relationship_id("provider"), Some(provider_id.as_str()));

                let circuit_id = circuit.attr_str("circuit_id").unwrap();
                assert!(circuit_id.starts_with("DUFF-"));
                assert!(circuit.attr_str("vendor_id").unwrap().starts_with(&provider.to_uppercase()));

                let stored = store
                    .get("main", kind::INTERFACE_L3, &json!({"ids": [intf.id().unwrap()]}))
                    .await
                    .unwrap();
                assert_eq!(
                    stored.attr_str("description"),
                    Some(format!("Connected to {} via {}", provider, circuit_id).as_str())
                );
            }
        }
    }

    #[tokio::test]
    async fn test_external_sessions_use_provider_peer_group() {
        let (store, ctx) = seeded_atl().await;
        let telia_group = ctx.nodes.id(kind::BGP_PEER_GROUP, "TRANSIT_TELIA").unwrap();
        let default_group = ctx.nodes.id(kind::BGP_PEER_GROUP, "TRANSIT_DEFAULT").unwrap();

        let external: Vec<Node> = store
            .filters("main", kind::BGP_SESSION, &json!({"type__value": "EXTERNAL"}))
            .await
            .unwrap();
        assert_eq!(external.len(), 4);
        let telia = external
            .iter()
            .filter(|s| s.relationship_id("peer_group") == Some(telia_group.as_str()))
            .count();
        let default = external
            .iter()
            .filter(|s| s.relationship_id("peer_group") == Some(default_group.as_str()))
            .count();
        assert_eq!((telia, default), (2, 2));
    }

    #[tokio::test]
    async fn test_internal_sessions_spine_to_leaf() {
        let (store, ctx) = seeded_atl().await;
        let pop_internal = ctx.nodes.id(kind::BGP_PEER_GROUP, "POP_INTERNAL").unwrap();

        let internal = store
            .filters("main", kind::BGP_SESSION, &json!({"type__value": "INTERNAL"}))
            .await
            .unwrap();
        assert_eq!(internal.len(), 8);
        assert!(internal
            .iter()
            .all(|s| s.relationship_id("peer_group") == Some(pop_internal.as_str())));

        let spine1 = ctx.nodes.id(kind::DEVICE, "atl-spine1").unwrap();
        let from_spine1 = internal
            .iter()
            .filter(|s| s.relationship_id("device") == Some(spine1.as_str()))
            .count();
        assert_eq!(from_spine1, 4);
    }

    #[tokio::test]
    async fn test_no_address_handed_out_twice() {
        let (store, _) = seeded_atl().await;

        let mut seen = HashSet::new();
        for ip in store.all("main", kind::IP_ADDRESS).await {
            let address = ip.attr_str("address").unwrap();
            let host = address.split('/').next().unwrap();
            assert!(seen.insert(host.to_string()), "{}", address);
        }
        // 8 loopbacks, 8 management, 4 local + 4 peer transit addresses
        assert_eq!(seen.len(), 24);
    }

    #[tokio::test]
    async fn test_spine_leaf_descriptions() {
        let (store, ctx) = seeded_atl().await;

        let leaf3 = ctx.nodes.get(kind::INTERFACE_L3, &l3_key("atl-leaf3", 3)).unwrap();
        let spine2 = ctx.nodes.get(kind::INTERFACE_L3, &l3_key("atl-spine2", 4)).unwrap();
        assert_eq!(leaf3.attr_str("description"), Some("Connected to atl-spine2 Ethernet5"));
        assert_eq!(spine2.attr_str("description"), Some("Connected to atl-leaf3 Ethernet4"));

        let stored = store
            .get("main", kind::INTERFACE_L3, &json!({"ids": [leaf3.id().unwrap()]}))
            .await
            .unwrap();
        assert_eq!(stored.attr_str("description"), leaf3.attr_str("description"));
    }

    #[tokio::test]
    async fn test_devices_join_groups() {
        let (store, _) = seeded_atl().await;

        let members = |name: &'static str| {
            let store = store.clone();
            async move {
                store
                    .get("main", kind::STANDARD_GROUP, &json!({"name__value": name}))
                    .await
                    .unwrap()
                    .relationship_ids("members")
                    .len()
            }
        };
        assert_eq!(members("edge_router").await, 8);
        assert_eq!(members("arista_devices").await, 6);
        assert_eq!(members("cisco_devices").await, 0);
    }
}
