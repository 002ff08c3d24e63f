//! Discovery of the default domain from the cluster's main Istio gateway.

use anyhow::{Context, Result};
use kube::{
    api::{Api, ApiResource, DynamicObject, GroupVersionKind},
    Client,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

const GATEWAY_NAMESPACE: &str = "kyma-system";
const GATEWAY_NAME: &str = "kyma-gateway";
const GATEWAY_PROTOCOL: &str = "HTTPS";

#[derive(Debug, Default, Deserialize)]
struct GatewaySpec {
    #[serde(default)]
    servers: Vec<Server>,
}

#[derive(Debug, Default, Deserialize)]
struct Server {
    port: Option<Port>,

    #[serde(default)]
    hosts: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Port {
    #[serde(default)]
    protocol: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidGateway {
    #[error("gateway must have a single https server definition, num={0}")]
    HttpsServers(usize),

    #[error("gateway https server must have a single host definition, num={0}")]
    Hosts(usize),

    #[error("gateway https server host {0} does not start with a prefix \"*.\"")]
    Wildcard(String),
}

/// Reads the default domain from the `kyma-system/kyma-gateway` gateway.
///
/// Returns `None` when the gateway does not exist. APIRules must then carry
/// complete hosts.
pub async fn discover(client: Client) -> Result<Option<String>> {
    let gvk = GroupVersionKind::gvk("networking.istio.io", "v1beta1", "Gateway");
    let api = Api::<DynamicObject>::namespaced_with(
        client,
        GATEWAY_NAMESPACE,
        &ApiResource::from_gvk(&gvk),
    );

    let gateway = match api
        .get_opt(GATEWAY_NAME)
        .await
        .context("failed to fetch the default gateway")?
    {
        Some(gateway) => gateway,
        None => {
            warn!(
                namespace = GATEWAY_NAMESPACE,
                name = GATEWAY_NAME,
                "Default domain wasn't found. APIRules will require full host"
            );
            return Ok(None);
        }
    };

    let spec = match gateway.data.get("spec") {
        Some(spec) => GatewaySpec::deserialize(spec).context("invalid gateway spec")?,
        None => GatewaySpec::default(),
    };
    let domain = domain_from_gateway(&spec)?;
    info!(%domain, "Discovered default domain");
    Ok(Some(domain))
}

fn domain_from_gateway(spec: &GatewaySpec) -> Result<String, InvalidGateway> {
    let https = spec
        .servers
        .iter()
        .filter(|s| {
            s.port
                .as_ref()
                .is_some_and(|p| p.protocol.eq_ignore_ascii_case(GATEWAY_PROTOCOL))
        })
        .collect::<Vec<_>>();

    let server = match https.as_slice() {
        [server] => server,
        servers => return Err(InvalidGateway::HttpsServers(servers.len())),
    };

    let host = match server.hosts.as_slice() {
        [host] => host,
        hosts => return Err(InvalidGateway::Hosts(hosts.len())),
    };

    host.strip_prefix("*.")
        .map(str::to_string)
        .ok_or_else(|| InvalidGateway::Wildcard(host.clone()))
}
