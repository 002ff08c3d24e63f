use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// The subset of an Istio `VirtualService` needed to detect host conflicts.
///
/// Every other field is ignored when the resource is decoded.
#[derive(Clone, Debug, Default, PartialEq, Eq, CustomResource, Deserialize, Serialize)]
#[kube(
    group = "networking.istio.io",
    version = "v1beta1",
    kind = "VirtualService",
    schema = "disabled",
    namespaced
)]
pub struct VirtualServiceSpec {
    #[serde(default)]
    pub hosts: Vec<String>,
}

impl VirtualService {
    pub fn occupies_host(&self, host: &str) -> bool {
        self.spec.hosts.iter().any(|h| h == host)
    }
}
