//! IPv4 address pools.
//!
//! Every pool owns a cursor and only moves forward: an address or block handed
//! out by `allocate()` is never returned again by the same pool.

use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::utils::u32_to_ipv4;

/// Typed error for an exhausted pool, so callers can downcast it.
#[derive(Debug)]
pub struct PoolExhausted {
    pub pool: String,
}

impl PoolExhausted {
    pub fn new(pool: &str) -> Self {
        Self { pool: pool.to_string() }
    }
}

impl fmt::Display for PoolExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address pool exhausted: {}", self.pool)
    }
}

impl std::error::Error for PoolExhausted {}

/// An aligned IPv4 network, e.g. 10.0.0.0/16
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Subnet {
    network: u32,
    prefix_len: u8,
}

impl Ipv4Subnet {
    pub fn new(addr: Ipv4Addr, prefix_len: u8) -> Result<Self> {
        if prefix_len > 32 {
            anyhow::bail!("Invalid prefix length /{}", prefix_len);
        }
        let network = u32::from(addr);
        if network & !mask(prefix_len) != 0 {
            anyhow::bail!("{}/{} has host bits set", addr, prefix_len);
        }
        Ok(Self { network, prefix_len })
    }

    pub fn network(&self) -> Ipv4Addr {
        u32_to_ipv4(self.network)
    }

    pub fn broadcast(&self) -> Ipv4Addr {
        u32_to_ipv4(self.network | !mask(self.prefix_len))
    }

    /// Number of addresses covered, network and broadcast included
    pub fn size(&self) -> u64 {
        1u64 << (32 - self.prefix_len as u32)
    }

    /// Usable host addresses: /31 and /32 use every address, wider
    /// networks skip the network and broadcast addresses.
    pub fn hosts(&self) -> HostPool {
        let start = self.network as u64;
        let end = start + self.size();
        let (first, last) = if self.prefix_len >= 31 {
            (start, end)
        } else {
            (start + 1, end - 1)
        };
        HostPool {
            name: self.to_string(),
            next: first,
            end: last,
        }
    }

    /// Successive subnets of `new_prefix` length carved from this network
    pub fn subnets(&self, new_prefix: u8) -> Result<SubnetPool> {
        if new_prefix < self.prefix_len || new_prefix > 32 {
            anyhow::bail!("Cannot split {} into /{} subnets", self, new_prefix);
        }
        let start = self.network as u64;
        Ok(SubnetPool {
            name: format!("{} /{}", self, new_prefix),
            new_prefix,
            next: start,
            end: start + self.size(),
        })
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        u32::from(addr) & mask(self.prefix_len) == self.network
    }
}

impl fmt::Display for Ipv4Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network(), self.prefix_len)
    }
}

impl FromStr for Ipv4Subnet {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (addr, len) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| anyhow::anyhow!("Missing prefix length in {:?}", s))?;
        let addr: Ipv4Addr = addr
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid address in {:?}: {}", s, e))?;
        let len: u8 = len
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid prefix length in {:?}: {}", s, e))?;
        Self::new(addr, len)
    }
}

fn mask(prefix_len: u8) -> u32 {
    if prefix_len == 0 {
        0
    } else {
        u32::MAX << (32 - prefix_len as u32)
    }
}

/// Cursor over the host addresses of a network
#[derive(Debug, Clone)]
pub struct HostPool {
    name: String,
    next: u64,
    end: u64,
}

impl HostPool {
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reserve the next unused host address
    pub fn allocate(&mut self) -> Result<Ipv4Addr, PoolExhausted> {
        self.next().ok_or_else(|| PoolExhausted::new(&self.name))
    }

    pub fn remaining(&self) -> u64 {
        self.end - self.next
    }
}

impl Iterator for HostPool {
    type Item = Ipv4Addr;

    fn next(&mut self) -> Option<Ipv4Addr> {
        if self.next >= self.end {
            return None;
        }
        let addr = u32_to_ipv4(self.next as u32);
        self.next += 1;
        Some(addr)
    }
}

/// Cursor over fixed-size subnets of a network
#[derive(Debug, Clone)]
pub struct SubnetPool {
    name: String,
    new_prefix: u8,
    next: u64,
    end: u64,
}

impl SubnetPool {
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reserve the next unused block
    pub fn allocate(&mut self) -> Result<Ipv4Subnet, PoolExhausted> {
        self.next().ok_or_else(|| PoolExhausted::new(&self.name))
    }

    pub fn remaining(&self) -> u64 {
        (self.end - self.next) >> (32 - self.new_prefix as u32)
    }
}

impl Iterator for SubnetPool {
    type Item = Ipv4Subnet;

    fn next(&mut self) -> Option<Ipv4Subnet> {
        if self.next >= self.end {
            return None;
        }
        let subnet = Ipv4Subnet {
            network: self.next as u32,
            prefix_len: self.new_prefix,
        };
        self.next += 1u64 << (32 - self.new_prefix as u32);
        Some(subnet)
    }
}

/// The pools one seeding run draws from
#[derive(Debug, Clone)]
pub struct AddressPools {
    /// Device loopbacks, first /16 of the internal range
    pub loopback: HostPool,
    /// Point-to-point /31 links, second /16 of the internal range
    pub p2p: SubnetPool,
    /// /29 blocks for transit and peering links
    pub external: SubnetPool,
    /// Management interface addresses
    pub management: HostPool,
}

impl AddressPools {
    pub fn new(internal: Ipv4Subnet, external: Ipv4Subnet, management: Ipv4Subnet) -> Result<Self> {
        let mut internal_blocks = internal.subnets(16)?.named("internal /16");
        let loopback_block = internal_blocks.allocate()?;
        let p2p_block = internal_blocks.allocate()?;

        Ok(Self {
            loopback: loopback_block.hosts().named("loopback"),
            p2p: p2p_block.subnets(31)?.named("p2p"),
            external: external.subnets(29)?.named("external"),
            management: management.hosts().named("management"),
        })
    }

    pub fn from_cidrs(internal: &str, external: &str, management: &str) -> Result<Self> {
        Self::new(internal.parse()?, external.parse()?, management.parse()?)
    }

    /// Unallocated capacity per pool, keyed by pool name
    pub fn remaining(&self) -> BTreeMap<String, u64> {
        let mut remaining = BTreeMap::new();
        remaining.insert(self.loopback.name().to_string(), self.loopback.remaining());
        remaining.insert(self.p2p.name().to_string(), self.p2p.remaining());
        remaining.insert(self.external.name().to_string(), self.external.remaining());
        remaining.insert(self.management.name().to_string(), self.management.remaining());
        remaining
    }
}

pub const DEFAULT_INTERNAL_POOL: &str = "10.0.0.0/8";
pub const DEFAULT_EXTERNAL_POOL: &str = "203.0.113.0/24";
pub const DEFAULT_MANAGEMENT_POOL: &str = "172.20.20.16/28";

impl AddressPools {
    pub fn defaults() -> Result<Self> {
        Self::from_cidrs(DEFAULT_INTERNAL_POOL, DEFAULT_EXTERNAL_POOL, DEFAULT_MANAGEMENT_POOL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_parse_and_display() {
        let net: Ipv4Subnet = "10.0.0.0/8".parse().unwrap();
        assert_eq!(net.to_string(), "10.0.0.0/8");
        assert_eq!(net.broadcast(), Ipv4Addr::new(10, 255, 255, 255));
        assert!(net.contains(Ipv4Addr::new(10, 1, 2, 3)));
        assert!(!net.contains(Ipv4Addr::new(11, 0, 0, 0)));
    }

    #[test]
    fn test_parse_rejects_host_bits_and_garbage() {
        assert!("10.0.0.1/8".parse::<Ipv4Subnet>().is_err());
        assert!("10.0.0.0".parse::<Ipv4Subnet>().is_err());
        assert!("10.0.0.0/33".parse::<Ipv4Subnet>().is_err());
        assert!("not-a-net/8".parse::<Ipv4Subnet>().is_err());
    }

    #[test]
    fn test_hosts_skip_network_and_broadcast() {
        let net: Ipv4Subnet = "172.20.20.16/28".parse().unwrap();
        let hosts: Vec<_> = net.hosts().collect();
        assert_eq!(hosts.len(), 14);
        assert_eq!(hosts[0], Ipv4Addr::new(172, 20, 20, 17));
        assert_eq!(hosts[13], Ipv4Addr::new(172, 20, 20, 30));
    }

    #[test]
    fn test_hosts_of_slash31_and_slash32() {
        let p2p: Ipv4Subnet = "10.1.0.0/31".parse().unwrap();
        assert_eq!(
            p2p.hosts().collect::<Vec<_>>(),
            vec![Ipv4Addr::new(10, 1, 0, 0), Ipv4Addr::new(10, 1, 0, 1)]
        );
        let single: Ipv4Subnet = "10.1.0.7/32".parse().unwrap();
        assert_eq!(single.hosts().collect::<Vec<_>>(), vec![Ipv4Addr::new(10, 1, 0, 7)]);
    }

    #[test]
    fn test_subnets_are_consecutive_and_disjoint() {
        let net: Ipv4Subnet = "203.0.113.0/24".parse().unwrap();
        let mut pool = net.subnets(29).unwrap();
        assert_eq!(pool.remaining(), 32);
        let first = pool.allocate().unwrap();
        let second = pool.allocate().unwrap();
        assert_eq!(first.to_string(), "203.0.113.0/29");
        assert_eq!(second.to_string(), "203.0.113.8/29");
        assert_eq!(pool.remaining(), 30);
        assert!(!first.contains(second.network()));
    }

    #[test]
    fn test_subnets_rejects_shorter_prefix() {
        let net: Ipv4Subnet = "203.0.113.0/24".parse().unwrap();
        assert!(net.subnets(16).is_err());
    }

    #[test]
    fn test_exhaustion_is_an_error() {
        let net: Ipv4Subnet = "192.0.2.0/30".parse().unwrap();
        let mut pool = net.hosts().named("tiny");
        assert!(pool.allocate().is_ok());
        assert!(pool.allocate().is_ok());
        let err = pool.allocate().unwrap_err();
        assert_eq!(err.pool, "tiny");
        // stays exhausted
        assert!(pool.allocate().is_err());
    }

    #[test]
    fn test_default_pools() {
        let mut pools = AddressPools::defaults().unwrap();
        assert_eq!(pools.loopback.allocate().unwrap(), Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(pools.p2p.allocate().unwrap().to_string(), "10.1.0.0/31");
        assert_eq!(pools.external.allocate().unwrap().to_string(), "203.0.113.0/29");
        assert_eq!(pools.management.allocate().unwrap(), Ipv4Addr::new(172, 20, 20, 17));
    }

    #[test]
    fn test_remaining_tracks_allocations() {
        let mut pools = AddressPools::defaults().unwrap();
        pools.management.allocate().unwrap();
        pools.external.allocate().unwrap();

        let remaining = pools.remaining();
        assert_eq!(remaining["loopback"], 65534);
        assert_eq!(remaining["p2p"], 32768);
        assert_eq!(remaining["external"], 31);
        assert_eq!(remaining["management"], 13);
    }

    #[test]
    fn test_no_address_is_handed_out_twice() {
        let mut pools = AddressPools::defaults().unwrap();
        let mut seen = HashSet::new();
        while let Ok(addr) = pools.management.allocate() {
            assert!(seen.insert(addr), "duplicate {}", addr);
        }
        let mut blocks = HashSet::new();
        while let Ok(block) = pools.external.allocate() {
            assert!(blocks.insert(block.network()), "duplicate {}", block);
        }
        assert_eq!(seen.len(), 14);
        assert_eq!(blocks.len(), 32);
    }
}
