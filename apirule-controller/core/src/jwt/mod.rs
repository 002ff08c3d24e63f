//! Validation of `jwt` access strategy configuration.
//!
//! The schema of a `jwt` handler's configuration depends on which backend
//! enforces it. Each backend rejects the other's fields so that a
//! configuration written for one is never silently ignored by the other.

pub mod istio;
pub mod ory;

use crate::{handler::HandlerValidator, k8s::AccessStrategy};
use std::{fmt, str::FromStr};
use thiserror::Error;

const INVALID_URI: &str = "value is empty or not a valid uri";

/// The backend enforcing JWT access strategies.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum JwtHandler {
    #[default]
    Ory,
    Istio,
}

#[derive(Debug, Error)]
#[error("invalid jwt handler: {0}; expected 'ory' or 'istio'")]
pub struct InvalidJwtHandler(String);

// === impl JwtHandler ===

impl JwtHandler {
    /// Access strategies that may not be combined with any other on a rule.
    pub fn exclusive_access_strategies(&self) -> &'static [AccessStrategy] {
        match self {
            Self::Ory => &[
                AccessStrategy::Allow,
                AccessStrategy::NoAuth,
                AccessStrategy::Noop,
            ],
            Self::Istio => &[
                AccessStrategy::Allow,
                AccessStrategy::NoAuth,
                AccessStrategy::Noop,
                AccessStrategy::Jwt,
            ],
        }
    }

    pub fn validator(&self) -> &'static dyn HandlerValidator {
        match self {
            Self::Ory => &ory::JwtValidator,
            Self::Istio => &istio::JwtValidator,
        }
    }
}

impl FromStr for JwtHandler {
    type Err = InvalidJwtHandler;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ory" => Ok(Self::Ory),
            "istio" => Ok(Self::Istio),
            s => Err(InvalidJwtHandler(s.to_string())),
        }
    }
}

impl fmt::Display for JwtHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ory => f.write_str("ory"),
            Self::Istio => f.write_str("istio"),
        }
    }
}
