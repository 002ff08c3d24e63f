//! Rules about which access strategies may be combined on one rule.

use crate::{
    k8s::{AccessStrategy, Authenticator},
    Failure,
};

const SECURE_AND_UNSECURE: &str =
    "Secure access strategies cannot be used in combination with unsecure access strategies";

/// Whether an access strategy authenticates the caller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Security {
    Secure,
    Unsecure,
}

pub fn security(strategy: AccessStrategy) -> Security {
    match strategy {
        AccessStrategy::OAuth2ClientCredentials
        | AccessStrategy::OAuth2Introspection
        | AccessStrategy::Jwt
        | AccessStrategy::CookieSession => Security::Secure,
        AccessStrategy::Noop
        | AccessStrategy::NoAuth
        | AccessStrategy::Allow
        | AccessStrategy::Unauthorized
        | AccessStrategy::Anonymous => Security::Unsecure,
    }
}

/// Fails when `exclusive` is combined with any other access strategy.
///
/// Only the first occurrence is reported. `attribute_path` addresses the rule.
pub fn check_exclusive(
    strategies: &[Authenticator],
    exclusive: AccessStrategy,
    attribute_path: &str,
) -> Vec<Failure> {
    if strategies.len() <= 1 {
        return vec![];
    }

    match strategies.iter().position(|s| s.name == exclusive.as_str()) {
        Some(idx) => vec![Failure::new(
            format!("{attribute_path}.accessStrategies[{idx}].handler"),
            format!("{exclusive} access strategy is not allowed in combination with other access strategies"),
        )],
        None => vec![],
    }
}

/// Fails once when secure and unsecure access strategies are mixed.
/// Unknown handlers are ignored.
pub fn check_secure_and_unsecure(strategies: &[Authenticator], attribute_path: &str) -> Vec<Failure> {
    let (mut secure, mut unsecure) = (false, false);
    for strategy in strategies.iter().filter_map(|s| s.access_strategy()) {
        match security(strategy) {
            Security::Secure => secure = true,
            Security::Unsecure => unsecure = true,
        }
    }

    if secure && unsecure {
        return vec![Failure::new(attribute_path, SECURE_AND_UNSECURE)];
    }
    vec![]
}
