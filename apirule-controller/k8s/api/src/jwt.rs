//! Configuration schemas for the `jwt` access strategy.
//!
//! Two mutually exclusive schemas exist, one per JWT backend: [`JwtConfig`]
//! is read by the Istio handler and [`ory::JwtAccStrConfig`] by the Ory
//! handler.

use serde::{Deserialize, Serialize};

/// The Istio handler's JWT configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authentications: Vec<JwtAuthentication>,

    /// `None` when the field is absent. Entries may be `null`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorizations: Option<Vec<Option<JwtAuthorization>>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtAuthentication {
    #[serde(default)]
    pub issuer: String,

    #[serde(default)]
    pub jwks_uri: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub from_headers: Vec<JwtHeader>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub from_params: Vec<String>,
}

/// A header from which the token is extracted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct JwtHeader {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub prefix: String,
}

/// Claims required of an authenticated token. A present but empty list is
/// distinct from an absent one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtAuthorization {
    #[serde(default)]
    pub required_scopes: Option<Vec<String>>,

    #[serde(default)]
    pub audiences: Option<Vec<String>>,
}

pub mod ory {
    use serde::{Deserialize, Serialize};

    /// The Ory handler's JWT configuration.
    #[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
    pub struct JwtAccStrConfig {
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub trusted_issuers: Vec<String>,

        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub jwks_urls: Vec<String>,

        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub required_scope: Vec<String>,

        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        pub target_audience: Vec<String>,
    }
}
