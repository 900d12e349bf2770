//! Static reference data the generated network is built from.

/// Schema kinds written by the seeder
pub mod kind {
    pub const STANDARD_GROUP: &str = "CoreStandardGroup";
    pub const ACCOUNT: &str = "CoreAccount";
    pub const ORGANIZATION: &str = "CoreOrganization";
    pub const PLATFORM: &str = "InfraPlatform";
    pub const AUTONOMOUS_SYSTEM: &str = "InfraAutonomousSystem";
    pub const BGP_PEER_GROUP: &str = "InfraBGPPeerGroup";
    pub const ROLE: &str = "BuiltinRole";
    pub const STATUS: &str = "BuiltinStatus";
    pub const TAG: &str = "BuiltinTag";
    pub const LOCATION: &str = "BuiltinLocation";
    pub const VLAN: &str = "InfraVLAN";
    pub const DEVICE: &str = "InfraDevice";
    pub const INTERFACE_L3: &str = "InfraInterfaceL3";
    pub const INTERFACE_L2: &str = "InfraInterfaceL2";
    pub const IP_ADDRESS: &str = "InfraIPAddress";
    pub const CIRCUIT: &str = "InfraCircuit";
    pub const CIRCUIT_ENDPOINT: &str = "InfraCircuitEndpoint";
    pub const BGP_SESSION: &str = "InfraBGPSession";
}

/// Interface role names used by the generator
pub mod intf_role {
    pub const BACKBONE: &str = "backbone";
    pub const TRANSIT: &str = "transit";
    pub const PEERING: &str = "peering";
    pub const PEER: &str = "peer";
    pub const LOOPBACK: &str = "loopback";
    pub const MANAGEMENT: &str = "management";
    pub const SPARE: &str = "spare";

    /// Roles that terminate on an external circuit
    pub fn is_external(role: &str) -> bool {
        role == TRANSIT || role == PEERING
    }
}

/// Status names
pub mod status {
    pub const ACTIVE: &str = "active";
    pub const PROVISIONNING: &str = "provisionning";
    pub const MAINTENANCE: &str = "maintenance";
    pub const DRAINED: &str = "drained";
}

pub const DEVICE_ROLES: &[&str] = &["spine", "leaf", "client"];

pub const INTF_ROLES: &[&str] = &[
    intf_role::BACKBONE,
    intf_role::TRANSIT,
    intf_role::PEERING,
    intf_role::PEER,
    intf_role::LOOPBACK,
    intf_role::MANAGEMENT,
    intf_role::SPARE,
];

pub const VLAN_ROLES: &[&str] = &["server"];

pub const STATUSES: &[&str] = &[
    status::ACTIVE,
    status::PROVISIONNING,
    status::MAINTENANCE,
    status::DRAINED,
];

pub const TAGS: &[&str] = &["blue", "green", "red"];

/// All role names, in creation order
pub fn all_roles() -> impl Iterator<Item = &'static str> {
    DEVICE_ROLES
        .iter()
        .chain(INTF_ROLES)
        .chain(VLAN_ROLES)
        .copied()
}

#[derive(Debug, Clone, Copy)]
pub struct Organization {
    pub name: &'static str,
    pub asn: u32,
}

pub const ORGANIZATIONS: &[Organization] = &[
    Organization { name: "Telia", asn: 1299 },
    Organization { name: "Colt", asn: 8220 },
    Organization { name: "Verizon", asn: 701 },
    Organization { name: "GTT", asn: 3257 },
    Organization { name: "Hurricane Electric", asn: 6939 },
    Organization { name: "Lumen", asn: 3356 },
    Organization { name: "Zayo", asn: 6461 },
    Organization { name: "Duff", asn: 64496 },
    Organization { name: "Equinix", asn: 24115 },
];

#[derive(Debug, Clone, Copy)]
pub struct Account {
    pub name: &'static str,
    pub account_type: &'static str,
    pub password: &'static str,
    pub role: &'static str,
}

pub const ACCOUNTS: &[Account] = &[
    Account { name: "pop-builder", account_type: "Script", password: "Password123", role: "read-write" },
    Account { name: "CRM Synchronization", account_type: "Script", password: "Password123", role: "read-write" },
    Account { name: "Jack Bauer", account_type: "User", password: "Password123", role: "read-only" },
    Account { name: "Chloe O'Brian", account_type: "User", password: "Password123", role: "read-write" },
    Account { name: "David Palmer", account_type: "User", password: "Password123", role: "read-write" },
    Account { name: "Operation Team", account_type: "User", password: "Password123", role: "read-only" },
    Account { name: "Engineering Team", account_type: "User", password: "Password123", role: "read-write" },
    Account { name: "Architecture Team", account_type: "User", password: "Password123", role: "read-only" },
];

/// Account recorded as the source of generated data
pub const ACCOUNT_BUILDER: &str = "pop-builder";
/// Account recorded as the source of site records
pub const ACCOUNT_CRM: &str = "CRM Synchronization";
/// Owner of the autonomous systems
pub const ACCOUNT_AS_OWNER: &str = "Chloe O'Brian";
pub const ACCOUNT_ENGINEERING: &str = "Engineering Team";
pub const ACCOUNT_OPERATIONS: &str = "Operation Team";

#[derive(Debug, Clone, Copy)]
pub struct StandardGroup {
    pub name: &'static str,
    pub label: &'static str,
}

pub const GROUPS: &[StandardGroup] = &[
    StandardGroup { name: "edge_router", label: "Edge Router" },
    StandardGroup { name: "cisco_devices", label: "Cisco Devices" },
    StandardGroup { name: "arista_devices", label: "Arista Devices" },
    StandardGroup { name: "transit_interfaces", label: "Transit Interface" },
];

pub const GROUP_EDGE_ROUTER: &str = "edge_router";
pub const GROUP_CISCO_DEVICES: &str = "cisco_devices";
pub const GROUP_ARISTA_DEVICES: &str = "arista_devices";

#[derive(Debug, Clone, Copy)]
pub struct Platform {
    pub name: &'static str,
    pub nornir_platform: &'static str,
    pub napalm_driver: &'static str,
    pub netmiko_device_type: &'static str,
    pub ansible_network_os: &'static str,
}

pub const PLATFORMS: &[Platform] = &[
    Platform {
        name: "Cisco IOS",
        nornir_platform: "ios",
        napalm_driver: "ios",
        netmiko_device_type: "cisco_ios",
        ansible_network_os: "ios",
    },
    Platform {
        name: "Cisco NXOS SSH",
        nornir_platform: "nxos_ssh",
        napalm_driver: "nxos_ssh",
        netmiko_device_type: "cisco_nxos",
        ansible_network_os: "nxos",
    },
    Platform {
        name: "Juniper JunOS",
        nornir_platform: "junos",
        napalm_driver: "junos",
        netmiko_device_type: "juniper_junos",
        ansible_network_os: "junos",
    },
    Platform {
        name: "Arista EOS",
        nornir_platform: "eos",
        napalm_driver: "eos",
        netmiko_device_type: "arista_eos",
        ansible_network_os: "eos",
    },
    Platform {
        name: "Linux",
        nornir_platform: "linux",
        napalm_driver: "linux",
        netmiko_device_type: "linux",
        ansible_network_os: "linux",
    },
];

#[derive(Debug, Clone, Copy)]
pub struct BgpPeerGroup {
    pub name: &'static str,
    pub import_policies: &'static str,
    pub export_policies: &'static str,
    /// Organisation whose AS is the local AS
    pub local_org: &'static str,
    /// Organisation whose AS is the remote AS, if fixed
    pub remote_org: Option<&'static str>,
}

pub const BGP_PEER_GROUPS: &[BgpPeerGroup] = &[
    BgpPeerGroup {
        name: "POP_INTERNAL",
        import_policies: "IMPORT_INTRA_POP",
        export_policies: "EXPORT_INTRA_POP",
        local_org: "Duff",
        remote_org: Some("Duff"),
    },
    BgpPeerGroup {
        name: "POP_GLOBAL",
        import_policies: "IMPORT_POP_GLOBAL",
        export_policies: "EXPORT_POP_GLOBLA",
        local_org: "Duff",
        remote_org: None,
    },
    BgpPeerGroup {
        name: "TRANSIT_DEFAULT",
        import_policies: "IMPORT_TRANSIT",
        export_policies: "EXPORT_PUBLIC_PREFIX",
        local_org: "Duff",
        remote_org: None,
    },
    BgpPeerGroup {
        name: "TRANSIT_TELIA",
        import_policies: "IMPORT_TRANSIT",
        export_policies: "EXPORT_PUBLIC_PREFIX",
        local_org: "Duff",
        remote_org: Some("Telia"),
    },
    BgpPeerGroup {
        name: "IX_DEFAULT",
        import_policies: "IMPORT_IX",
        export_policies: "EXPORT_PUBLIC_PREFIX",
        local_org: "Duff",
        remote_org: None,
    },
];

pub const PEER_GROUP_POP_INTERNAL: &str = "POP_INTERNAL";
pub const PEER_GROUP_POP_GLOBAL: &str = "POP_GLOBAL";
pub const PEER_GROUP_TRANSIT_DEFAULT: &str = "TRANSIT_DEFAULT";
pub const PEER_GROUP_TRANSIT_TELIA: &str = "TRANSIT_TELIA";

#[derive(Debug, Clone, Copy)]
pub struct Vlan {
    pub vlan_id: u16,
    pub role: &'static str,
}

/// Site-scoped VLANs, named `<site>_<role>`
pub const VLANS: &[Vlan] = &[
    Vlan { vlan_id: 200, role: "server" },
    Vlan { vlan_id: 400, role: "management" },
];

/// VLAN the L2 access interfaces are bound to
pub const ACCESS_VLAN_ROLE: &str = "server";

#[derive(Debug, Clone, Copy)]
pub struct DeviceTemplate {
    /// Name stem, devices are `<site>-<stem><n>`
    pub stem: &'static str,
    pub status: &'static str,
    pub device_type: &'static str,
    pub role: &'static str,
    pub tags: &'static [&'static str],
    pub platform: &'static str,
    pub count: usize,
}

pub const DEVICES: &[DeviceTemplate] = &[
    DeviceTemplate {
        stem: "spine",
        status: status::ACTIVE,
        device_type: "7280R3",
        role: "spine",
        tags: &["red", "green"],
        platform: "Arista EOS",
        count: 2,
    },
    DeviceTemplate {
        stem: "leaf",
        status: status::ACTIVE,
        device_type: "7280R3",
        role: "leaf",
        tags: &["red", "green"],
        platform: "Arista EOS",
        count: 4,
    },
    DeviceTemplate {
        stem: "client",
        status: status::ACTIVE,
        device_type: "linux",
        role: "client",
        tags: &["red", "green"],
        platform: "Linux",
        count: 2,
    },
];

/// Number of devices with `role` in one site
pub fn device_count(role: &str) -> usize {
    DEVICES
        .iter()
        .filter(|d| d.role == role)
        .map(|d| d.count)
        .sum()
}

pub fn management_interface(device_type: &str) -> Option<&'static str> {
    match device_type {
        "7280R3" | "ASR1002-HX" => Some("Management0"),
        "linux" => Some("Eth0"),
        _ => None,
    }
}

pub fn l3_interfaces(device_type: &str) -> &'static [&'static str] {
    match device_type {
        "7280R3" | "ASR1002-HX" => &[
            "Ethernet1",
            "Ethernet2",
            "Ethernet3",
            "Ethernet4",
            "Ethernet5",
            "Ethernet6",
            "Ethernet7",
            "Ethernet8",
            "Ethernet9",
            "Ethernet10",
        ],
        _ => &[],
    }
}

pub fn l2_interfaces(device_type: &str) -> &'static [&'static str] {
    match device_type {
        "7280R3" | "ASR1002-HX" => &["Ethernet11", "Ethernet12"],
        "linux" => &["Eth1", "Eth2"],
        _ => &[],
    }
}

/// Positional L3 interface roles per device role; devices without an entry get
/// no L3 interfaces
pub fn interface_roles(device_role: &str) -> Option<&'static [&'static str]> {
    use intf_role::*;
    match device_role {
        "spine" => Some(&[
            TRANSIT, TRANSIT, BACKBONE, BACKBONE, BACKBONE, BACKBONE, SPARE, SPARE, SPARE, SPARE, SPARE, SPARE,
        ]),
        "leaf" => Some(&[
            PEER, PEER, BACKBONE, BACKBONE, SPARE, SPARE, SPARE, SPARE, SPARE, SPARE, SPARE, SPARE,
        ]),
        _ => None,
    }
}

pub const TRANSIT_PROVIDERS: &[&str] = &["Telia", "Colt"];
pub const PEERING_PROVIDER: &str = "Equinix";
/// Organisation operating the generated network
pub const INTERNAL_ORGANIZATION: &str = "Duff";
/// Provider of the transit link added by the add-transit scenario
pub const SCENARIO_TRANSIT_PROVIDER: &str = "GTT";

/// Provider for an external interface at position `intf_idx`
pub fn provider_for(role: &str, intf_idx: usize) -> Option<&'static str> {
    match role {
        intf_role::TRANSIT => Some(TRANSIT_PROVIDERS[intf_idx % TRANSIT_PROVIDERS.len()]),
        intf_role::PEERING => Some(PEERING_PROVIDER),
        _ => None,
    }
}

/// Peer group for a transit session with `provider`
pub fn transit_peer_group(provider: &str) -> &'static str {
    if provider.to_lowercase().contains("telia") {
        PEER_GROUP_TRANSIT_TELIA
    } else {
        PEER_GROUP_TRANSIT_DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_tables() {
        assert_eq!(all_roles().count(), 11);
        assert_eq!(device_count("spine"), 2);
        assert_eq!(device_count("leaf"), 4);
        assert_eq!(device_count("client"), 2);
    }

    #[test]
    fn test_role_templates_cover_l3_interfaces() {
        for device in DEVICES {
            if let Some(roles) = interface_roles(device.role) {
                assert!(roles.len() >= l3_interfaces(device.device_type).len());
            }
            assert!(management_interface(device.device_type).is_some());
        }
        assert!(interface_roles("client").is_none());
    }

    #[test]
    fn test_provider_rotation() {
        assert_eq!(provider_for(intf_role::TRANSIT, 0), Some("Telia"));
        assert_eq!(provider_for(intf_role::TRANSIT, 1), Some("Colt"));
        assert_eq!(provider_for(intf_role::TRANSIT, 2), Some("Telia"));
        assert_eq!(provider_for(intf_role::PEERING, 7), Some("Equinix"));
        assert_eq!(provider_for(intf_role::BACKBONE, 0), None);
    }

    #[test]
    fn test_transit_peer_group() {
        assert_eq!(transit_peer_group("Telia"), "TRANSIT_TELIA");
        assert_eq!(transit_peer_group("TELIA Carrier"), "TRANSIT_TELIA");
        assert_eq!(transit_peer_group("Colt"), "TRANSIT_DEFAULT");
        assert_eq!(transit_peer_group("GTT"), "TRANSIT_DEFAULT");
    }

    #[test]
    fn test_peer_group_organisations_exist() {
        let orgs: Vec<&str> = ORGANIZATIONS.iter().map(|o| o.name).collect();
        for group in BGP_PEER_GROUPS {
            assert!(orgs.contains(&group.local_org));
            if let Some(remote) = group.remote_org {
                assert!(orgs.contains(&remote));
            }
        }
        assert!(orgs.contains(&INTERNAL_ORGANIZATION));
        assert!(orgs.contains(&SCENARIO_TRANSIT_PROVIDER));
    }
}
