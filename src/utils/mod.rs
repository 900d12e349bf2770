use rand::Rng;
use std::net::Ipv4Addr;

/// Convert a host-order integer into a dotted-decimal address
pub fn u32_to_ipv4(value: u32) -> Ipv4Addr {
    Ipv4Addr::from(value)
}

/// Format an address with a prefix length, e.g. "10.0.0.1/32"
pub fn format_cidr(addr: Ipv4Addr, prefix_len: u8) -> String {
    format!("{}/{}", addr, prefix_len)
}

/// Validate a hostname.
/// Allows alphanumeric, hyphens, dots, and underscores. No path separators or shell metacharacters.
pub fn is_valid_hostname(hostname: &str) -> bool {
    if hostname.is_empty() || hostname.len() > 253 {
        return false;
    }
    hostname.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_')
}

/// Derive a stable circuit identifier from the link it serves.
/// e.g., "atl-spine1-transit-203.0.113.1/29" -> "DUFF-1f0c9e2ab3d4"
pub fn derive_circuit_id(seed: &str) -> String {
    let uuid = uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, seed.as_bytes()).to_string();
    format!("DUFF-{}", &uuid[24..])
}

/// Provider-side circuit reference, e.g. "TELIA-3fa2b81c"
pub fn vendor_reference(provider: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen();
    format!("{}-{:08x}", provider.to_uppercase(), suffix)
}
