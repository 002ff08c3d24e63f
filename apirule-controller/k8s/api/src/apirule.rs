use super::RawExtension;
use kube::{CustomResource, Resource, ResourceExt};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Exposes one or more backing services on a host, with per-path access
/// control rules.
#[derive(Clone, Debug, Default, PartialEq, CustomResource, Deserialize, Serialize)]
#[kube(
    group = "gateway.kyma-project.io",
    version = "v1beta1",
    kind = "APIRule",
    root = "ApiRule",
    schema = "disabled",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ApiRuleSpec {
    /// The exposed host. May omit the domain, in which case the default
    /// domain is appended.
    pub host: Option<String>,

    /// The service exposed by every rule that does not name its own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<Service>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,

    #[serde(default)]
    pub rules: Vec<Rule>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub name: Option<String>,

    /// Defaults to the APIRule's namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    pub port: Option<u32>,

    #[serde(default, rename = "external", skip_serializing_if = "Option::is_none")]
    pub is_external: Option<bool>,
}

/// A single path exposure with its own access strategies and mutators.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub path: String,

    /// Overrides the spec-level service when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<Service>,

    /// An empty list matches every method.
    #[serde(default)]
    pub methods: Vec<HttpMethod>,

    #[serde(default)]
    pub access_strategies: Vec<Authenticator>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mutators: Vec<Mutator>,
}

/// Configures a named handler. Configuration keys vary per handler.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Handler {
    #[serde(rename = "handler", default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<RawExtension>,
}

/// Authenticates the credentials of a request.
pub type Authenticator = Handler;

/// Transforms a request before it is forwarded to the backing service.
pub type Mutator = Handler;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Connect,
    Options,
    Trace,
    Patch,
}

/// The access strategy handlers known to the controller.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AccessStrategy {
    Allow,
    NoAuth,
    Noop,
    Unauthorized,
    Anonymous,
    CookieSession,
    OAuth2ClientCredentials,
    OAuth2Introspection,
    Jwt,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownAccessStrategy(pub String);

// === impl ApiRule ===

impl ApiRule {
    /// The label placed on every routing object created for this APIRule.
    pub fn owner_label(&self) -> (String, String) {
        let key = format!("apirule.{}", Self::api_version(&()));
        let value = format!(
            "{}.{}",
            self.name_any(),
            self.namespace().unwrap_or_default()
        );
        (key, value)
    }
}

// === impl Rule ===

impl Rule {
    /// A rule is JWT-secured when any of its access strategies is `jwt`.
    pub fn is_jwt_secured(&self) -> bool {
        self.access_strategies
            .iter()
            .any(|s| s.access_strategy() == Some(AccessStrategy::Jwt))
    }
}

// === impl Handler ===

impl Handler {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: None,
        }
    }

    pub fn with_config(name: impl Into<String>, config: RawExtension) -> Self {
        Self {
            name: name.into(),
            config: Some(config),
        }
    }

    pub fn access_strategy(&self) -> Option<AccessStrategy> {
        self.name.parse().ok()
    }

    pub fn config_is_empty(&self) -> bool {
        self.config.as_ref().map_or(true, RawExtension::is_empty)
    }
}

// === impl HttpMethod ===

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Connect => "CONNECT",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
            Self::Patch => "PATCH",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// === impl AccessStrategy ===

impl AccessStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::NoAuth => "no_auth",
            Self::Noop => "noop",
            Self::Unauthorized => "unauthorized",
            Self::Anonymous => "anonymous",
            Self::CookieSession => "cookie_session",
            Self::OAuth2ClientCredentials => "oauth2_client_credentials",
            Self::OAuth2Introspection => "oauth2_introspection",
            Self::Jwt => "jwt",
        }
    }
}

impl FromStr for AccessStrategy {
    type Err = UnknownAccessStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "allow" => Ok(Self::Allow),
            "no_auth" => Ok(Self::NoAuth),
            "noop" => Ok(Self::Noop),
            "unauthorized" => Ok(Self::Unauthorized),
            "anonymous" => Ok(Self::Anonymous),
            "cookie_session" => Ok(Self::CookieSession),
            "oauth2_client_credentials" => Ok(Self::OAuth2ClientCredentials),
            "oauth2_introspection" => Ok(Self::OAuth2Introspection),
            "jwt" => Ok(Self::Jwt),
            s => Err(UnknownAccessStrategy(s.to_string())),
        }
    }
}

impl fmt::Display for AccessStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for UnknownAccessStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown access strategy: {}", self.0)
    }
}

impl std::error::Error for UnknownAccessStrategy {}
