//! Checks that span every rule of an APIRule.

use crate::{
    handler::read_json_failure,
    k8s::{
        jwt::{JwtAuthentication, JwtConfig},
        Rule,
    },
    Failure,
};
use std::collections::{hash_map::Entry, HashMap, HashSet};

/// Returns true when two rules expose the same method on the same path.
///
/// A rule without methods exposes every method, so it collides with any other
/// rule on its path.
pub fn has_path_and_method_duplicates(rules: &[Rule]) -> bool {
    if rules.len() <= 1 {
        return false;
    }

    let mut any_method = HashSet::new();
    let mut methods = HashSet::new();
    let mut paths = HashSet::new();
    for rule in rules {
        let path = rule.path.as_str();
        if any_method.contains(path) {
            return true;
        }

        if rule.methods.is_empty() {
            if paths.contains(path) {
                return true;
            }
            any_method.insert(path);
        } else {
            for method in &rule.methods {
                if !methods.insert((path, *method)) {
                    return true;
                }
            }
        }
        paths.insert(path);
    }

    false
}

/// Rejects authentications that share an issuer and key set with an earlier
/// one but differ from it.
///
/// The first authentication seen for an issuer and key set is authoritative.
/// A configuration that can't be decoded ends the check.
pub fn check_jwt_consistency(attribute_path: &str, rules: &[Rule]) -> Vec<Failure> {
    let mut failures = vec![];
    let mut seen = HashMap::<String, JwtAuthentication>::new();

    for (i, rule) in rules.iter().enumerate() {
        for (j, strategy) in rule.access_strategies.iter().enumerate() {
            let config = match strategy.config.as_ref() {
                Some(config) => config,
                None => continue,
            };

            let strategy_path = format!("{attribute_path}[{i}].accessStrategy[{j}]");
            let config = match config.decode::<Option<JwtConfig>>() {
                Ok(config) => config.unwrap_or_default(),
                Err(error) => {
                    failures.push(read_json_failure(&strategy_path, error));
                    return failures;
                }
            };

            for (k, authn) in config.authentications.into_iter().enumerate() {
                match seen.entry(format!("{}{}", authn.issuer, authn.jwks_uri)) {
                    Entry::Occupied(first) if *first.get() != authn => {
                        failures.push(Failure::new(
                            format!("{strategy_path}.config.authentications[{k}]"),
                            "multiple jwt configurations that differ for the same issuer",
                        ));
                    }
                    Entry::Occupied(_) => {}
                    Entry::Vacant(entry) => {
                        entry.insert(authn);
                    }
                }
            }
        }
    }

    failures
}
