use anyhow::{Context, Result};
use std::env;

use crate::ipam::Ipv4Subnet;
use crate::seed::Scenario;
use crate::utils::is_valid_hostname;

/// Config holds all seeding configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub infrahub_address: String,
    pub api_token: String,
    pub branch: String,
    pub timeout_secs: u64,
    pub sites: Vec<String>,
    pub scenarios: Vec<String>,
    pub scenario_site: Option<String>,
    pub dry_run: bool,
    pub upsert: bool,
    pub fetch_on_failure: bool,
    pub batch_size: usize,
    pub internal_pool: String,
    pub external_pool: String,
    pub management_pool: String,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn load() -> Self {
        Self {
            infrahub_address: get_env("INFRAHUB_ADDRESS", "http://localhost:8000"),
            api_token: get_env("INFRAHUB_API_TOKEN", ""),
            branch: get_env("INFRAHUB_BRANCH", "main"),
            timeout_secs: get_env("INFRAHUB_TIMEOUT", "30").parse().unwrap_or(30),
            sites: split_list(&get_env("SEED_SITES", "atl")),
            scenarios: split_list(&get_env("SEED_SCENARIOS", "")),
            scenario_site: env::var("SEED_SCENARIO_SITE").ok().filter(|s| !s.is_empty()),
            dry_run: parse_bool(&get_env("SEED_DRY_RUN", "false")),
            upsert: parse_bool(&get_env("SEED_UPSERT", "false")),
            fetch_on_failure: parse_bool(&get_env("SEED_FETCH_ON_FAILURE", "false")),
            batch_size: get_env("SEED_BATCH_SIZE", "5").parse().unwrap_or(5),
            internal_pool: get_env("SEED_INTERNAL_POOL", "10.0.0.0/8"),
            external_pool: get_env("SEED_EXTERNAL_POOL", "203.0.113.0/24"),
            management_pool: get_env("SEED_MANAGEMENT_POOL", "172.20.20.16/28"),
        }
    }

    /// Reject settings that would only fail halfway through a run
    pub fn validate(&self) -> Result<()> {
        if self.sites.is_empty() {
            anyhow::bail!("SEED_SITES must name at least one site");
        }
        for site in &self.sites {
            if !is_valid_hostname(site) {
                anyhow::bail!("Invalid site name: {:?}", site);
            }
        }
        if let Some(site) = &self.scenario_site {
            if !self.sites.contains(site) {
                anyhow::bail!("SEED_SCENARIO_SITE {:?} is not one of SEED_SITES", site);
            }
        }
        self.parsed_scenarios()?;
        if self.batch_size == 0 {
            anyhow::bail!("SEED_BATCH_SIZE must be at least 1");
        }
        for (name, cidr) in [
            ("SEED_INTERNAL_POOL", &self.internal_pool),
            ("SEED_EXTERNAL_POOL", &self.external_pool),
            ("SEED_MANAGEMENT_POOL", &self.management_pool),
        ] {
            cidr.parse::<Ipv4Subnet>()
                .with_context(|| format!("{} is not a valid network", name))?;
        }
        Ok(())
    }

    pub fn parsed_scenarios(&self) -> Result<Vec<Scenario>> {
        self.scenarios.iter().map(|s| s.parse()).collect()
    }

    /// Site the site-scoped branch scenarios act on
    pub fn scenario_site(&self) -> Option<&str> {
        self.scenario_site
            .as_deref()
            .or_else(|| self.sites.first().map(|s| s.as_str()))
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config {
            infrahub_address: "http://localhost:8000".to_string(),
            api_token: String::new(),
            branch: "main".to_string(),
            timeout_secs: 30,
            sites: vec!["atl".to_string(), "ord".to_string()],
            scenarios: vec![],
            scenario_site: None,
            dry_run: true,
            upsert: false,
            fetch_on_failure: false,
            batch_size: 5,
            internal_pool: "10.0.0.0/8".to_string(),
            external_pool: "203.0.113.0/24".to_string(),
            management_pool: "172.20.20.16/28".to_string(),
        }
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list("atl, ord,,jfk "), vec!["atl", "ord", "jfk"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool("1"));
        assert!(parse_bool(" YES "));
        assert!(!parse_bool("false"));
        assert!(!parse_bool(""));
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_site_and_pool() {
        let mut cfg = base();
        cfg.sites.push("bad site".to_string());
        assert!(cfg.validate().is_err());

        let mut cfg = base();
        cfg.external_pool = "203.0.113.1/24".to_string();
        assert!(cfg.validate().is_err());

        let mut cfg = base();
        cfg.scenarios = vec!["merge-everything".to_string()];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_scenario_site_defaults_to_first_site() {
        let mut cfg = base();
        assert_eq!(cfg.scenario_site(), Some("atl"));
        cfg.scenario_site = Some("ord".to_string());
        assert_eq!(cfg.scenario_site(), Some("ord"));
        cfg.scenario_site = Some("jfk".to_string());
        assert!(cfg.validate().is_err());
    }
}
