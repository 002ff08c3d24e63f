//! Configuration schemas for request mutators.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const HEADER_MUTATOR: &str = "header";
pub const COOKIE_MUTATOR: &str = "cookie";

/// Headers injected into the upstream request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct HeaderMutatorConfig {
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Cookies injected into the upstream request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CookieMutatorConfig {
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,
}

impl HeaderMutatorConfig {
    pub fn has_headers(&self) -> bool {
        !self.headers.is_empty()
    }
}

impl CookieMutatorConfig {
    pub fn has_cookies(&self) -> bool {
        !self.cookies.is_empty()
    }
}
