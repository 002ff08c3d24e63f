//! Parsing of the admission policy lists passed on the command line.

use crate::core::Config;
use once_cell::sync::Lazy;
use regex::Regex;
use std::{collections::BTreeMap, str::FromStr};
use thiserror::Error;

static DOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-zA-Z0-9][a-zA-Z0-9_-]*\.)*[a-zA-Z0-9]*[a-zA-Z0-9_-]*[a-zA-Z0-9]+$")
        .expect("domain pattern must compile")
});

static SUBDOMAIN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("subdomain pattern must compile")
});

static SERVICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?\.[a-z0-9]([-a-z0-9]*[a-z0-9])?$")
        .expect("service pattern must compile")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid domain: {0:?}")]
    InvalidDomain(String),

    #[error("invalid subdomain: {0:?}")]
    InvalidSubdomain(String),

    #[error("invalid service {0:?}; expected <service>.<namespace>")]
    InvalidService(String),
}

/// Domains hosts may be exposed on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Domains(pub Vec<String>);

/// Subdomains that may not be exposed on the default domain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Subdomains(pub Vec<String>);

/// Blocked service names, keyed by namespace.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServiceBlocklist(pub BTreeMap<String, Vec<String>>);

fn entries(s: &str) -> impl Iterator<Item = &str> {
    s.split(',').map(str::trim).filter(|e| !e.is_empty())
}

// === impl Domains ===

impl FromStr for Domains {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        entries(s)
            .map(|domain| {
                if DOMAIN.is_match(domain) {
                    Ok(domain.to_string())
                } else {
                    Err(ConfigError::InvalidDomain(domain.to_string()))
                }
            })
            .collect::<Result<_, _>>()
            .map(Self)
    }
}

// === impl Subdomains ===

impl Subdomains {
    /// The complete hosts blocked on `default_domain`.
    pub fn hosts(&self, default_domain: Option<&str>) -> Vec<String> {
        let domain = match default_domain {
            Some(domain) => domain,
            None => return vec![],
        };
        self.0
            .iter()
            .map(|subdomain| format!("{subdomain}.{domain}"))
            .collect()
    }
}

impl FromStr for Subdomains {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        entries(s)
            .map(|subdomain| {
                if SUBDOMAIN.is_match(subdomain) {
                    Ok(subdomain.to_string())
                } else {
                    Err(ConfigError::InvalidSubdomain(subdomain.to_string()))
                }
            })
            .collect::<Result<_, _>>()
            .map(Self)
    }
}

// === impl ServiceBlocklist ===

impl FromStr for ServiceBlocklist {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut services = BTreeMap::<String, Vec<String>>::new();
        for entry in entries(s) {
            let (name, namespace) = entry
                .split_once('.')
                .filter(|_| SERVICE.is_match(entry))
                .ok_or_else(|| ConfigError::InvalidService(entry.to_string()))?;
            services
                .entry(namespace.to_string())
                .or_default()
                .push(name.to_string());
        }
        Ok(Self(services))
    }
}

/// Builds the admission policy from parsed command line arguments.
pub fn build(
    jwt_handler: crate::core::JwtHandler,
    domain_allowlist: Domains,
    service_blocklist: ServiceBlocklist,
    subdomain_blocklist: &Subdomains,
    default_domain: Option<String>,
) -> Config {
    let default_domain = default_domain.filter(|d| !d.is_empty());
    Config {
        jwt_handler,
        service_blocklist: service_blocklist.0,
        domain_allowlist: domain_allowlist.0,
        host_blocklist: subdomain_blocklist.hosts(default_domain.as_deref()),
        default_domain,
    }
}
