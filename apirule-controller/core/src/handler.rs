//! Validation of an access strategy's handler configuration.

use crate::{k8s::Handler, Failure};

pub(crate) const EMPTY_CONFIG: &str = "supplied config cannot be empty";

/// Validates the configuration of one kind of access strategy handler.
pub trait HandlerValidator {
    /// `attribute_path` addresses the access strategy.
    fn validate(&self, attribute_path: &str, handler: &Handler) -> Vec<Failure>;
}

/// For handlers that accept no configuration at all.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoConfig;

/// For handlers whose configuration is passed through unchecked.
#[derive(Copy, Clone, Debug, Default)]
pub struct PassThrough;

impl HandlerValidator for NoConfig {
    fn validate(&self, attribute_path: &str, handler: &Handler) -> Vec<Failure> {
        if handler.config_is_empty() {
            return vec![];
        }

        vec![Failure::new(
            format!("{attribute_path}.config"),
            format!("strategy: {} does not support configuration", handler.name),
        )]
    }
}

impl HandlerValidator for PassThrough {
    fn validate(&self, _: &str, _: &Handler) -> Vec<Failure> {
        vec![]
    }
}

pub(crate) fn read_json_failure(attribute_path: &str, error: serde_json::Error) -> Failure {
    Failure::new(attribute_path, format!("Can't read json: {error}"))
}
