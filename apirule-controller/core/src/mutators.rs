//! Validation of request mutators.
//!
//! Mutators run only after a request has been authenticated with a token, so
//! they are checked only on JWT-secured rules.

use crate::{
    handler::read_json_failure,
    k8s::{
        mutator::{CookieMutatorConfig, HeaderMutatorConfig, COOKIE_MUTATOR, HEADER_MUTATOR},
        Mutator, Rule,
    },
    Failure,
};
use std::collections::HashSet;

/// `attribute_path` addresses the rule.
pub fn validate(attribute_path: &str, rule: &Rule) -> Vec<Failure> {
    if !rule.is_jwt_secured() {
        return vec![];
    }

    let base_path = format!("{attribute_path}.mutators");
    let mut failures = check_uniqueness(&base_path, &rule.mutators);

    for (i, mutator) in rule.mutators.iter().enumerate() {
        let handler_path = format!("{base_path}[{i}].handler");
        match mutator.name.as_str() {
            "" => failures.push(Failure::new(handler_path, "mutator handler cannot be empty")),
            HEADER_MUTATOR => failures.extend(check_headers(&handler_path, mutator)),
            COOKIE_MUTATOR => failures.extend(check_cookies(&handler_path, mutator)),
            name => failures.push(Failure::new(
                handler_path,
                format!("unsupported mutator: {name}"),
            )),
        }
    }

    failures
}

fn check_uniqueness(base_path: &str, mutators: &[Mutator]) -> Vec<Failure> {
    let mut failures = vec![];
    let mut seen = HashSet::new();
    for (i, mutator) in mutators.iter().enumerate() {
        if !seen.insert(mutator.name.as_str()) {
            failures.push(Failure::new(
                format!("{base_path}[{i}].handler.{}", mutator.name),
                "mutator for same handler already exists",
            ));
        }
    }
    failures
}

fn check_headers(handler_path: &str, mutator: &Mutator) -> Vec<Failure> {
    let config_path = format!("{handler_path}.config");
    let config = match mutator.config.as_ref() {
        Some(config) => config,
        None => return vec![Failure::new(config_path, "headers cannot be empty")],
    };

    let config = match config.decode::<Option<HeaderMutatorConfig>>() {
        Ok(config) => config.unwrap_or_default(),
        Err(error) => return vec![read_json_failure(&config_path, error)],
    };

    if !config.has_headers() {
        return vec![Failure::new(config_path, "headers cannot be empty")];
    }
    if config.headers.contains_key("") {
        return vec![Failure::new(
            format!("{config_path}.headers.name"),
            "cannot be empty",
        )];
    }
    vec![]
}

fn check_cookies(handler_path: &str, mutator: &Mutator) -> Vec<Failure> {
    let config_path = format!("{handler_path}.config");
    let config = match mutator.config.as_ref() {
        Some(config) => config,
        None => return vec![Failure::new(config_path, "cookies cannot be empty")],
    };

    let config = match config.decode::<Option<CookieMutatorConfig>>() {
        Ok(config) => config.unwrap_or_default(),
        Err(error) => return vec![read_json_failure(&config_path, error)],
    };

    if !config.has_cookies() {
        return vec![Failure::new(config_path, "cookies cannot be empty")];
    }
    if config.cookies.contains_key("") {
        return vec![Failure::new(
            format!("{config_path}.cookies.name"),
            "cannot be empty",
        )];
    }
    vec![]
}
