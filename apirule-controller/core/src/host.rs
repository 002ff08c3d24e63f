//! Host policy: domain completion, allow and block lists, and conflicts with
//! existing virtual services.

use crate::{
    k8s::{ApiRule, ResourceExt, VirtualService},
    Config, Failure,
};

/// A host without a dot is a bare subdomain of the default domain.
pub fn includes_domain(host: &str) -> bool {
    host.contains('.')
}

pub fn with_domain(host: &str, domain: &str) -> String {
    format!("{host}.{domain}")
}

/// A host is allowed when it ends with an allowed domain that occurs in it
/// exactly once. This rejects both `svc.kyma.local.com` and
/// `svc.kyma.local.kyma.local` when `kyma.local` is allowed.
pub fn is_allowlisted(host: &str, allowlist: &[String]) -> bool {
    allowlist
        .iter()
        .any(|domain| host.matches(domain.as_str()).count() == 1 && host.ends_with(domain.as_str()))
}

/// Returns true when the virtual service carries this APIRule's owner label.
pub fn owned_by(vs: &VirtualService, api: &ApiRule) -> bool {
    let (key, value) = api.owner_label();
    vs.labels().get(&key) == Some(&value)
}

pub fn validate(
    attribute_path: &str,
    api: &ApiRule,
    config: &Config,
    virtual_services: &[VirtualService],
) -> Vec<Failure> {
    let host = match api.spec.host.as_deref() {
        Some(host) => host,
        None => return vec![Failure::new(attribute_path, "Host was nil")],
    };

    let mut failures = vec![];
    let host = if !includes_domain(host) {
        match config.default_domain.as_deref().filter(|d| !d.is_empty()) {
            Some(domain) => with_domain(host, domain),
            None => {
                failures.push(Failure::new(
                    attribute_path,
                    "Host does not contain a domain name and no default domain name is configured",
                ));
                host.to_string()
            }
        }
    } else {
        if !config.domain_allowlist.is_empty() && !is_allowlisted(host, &config.domain_allowlist) {
            failures.push(Failure::new(attribute_path, "Host is not allowlisted"));
        }
        host.to_string()
    };

    for blocked in config.host_blocklist.iter().filter(|b| **b == host) {
        let subdomain = blocked.split('.').next().unwrap_or_default();
        failures.push(Failure::new(
            attribute_path,
            format!(
                "The subdomain {subdomain} is blocklisted for {} domain",
                config.default_domain.as_deref().unwrap_or_default()
            ),
        ));
    }

    for vs in virtual_services {
        if vs.occupies_host(&host) && !owned_by(vs, api) {
            failures.push(Failure::new(
                attribute_path,
                "This host is occupied by another Virtual Service",
            ));
        }
    }

    failures
}
