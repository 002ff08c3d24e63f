use apirule_controller_k8s_api::{Labels, Pod, PodSpec, ResourceExt};

/// The name of the sidecar container injected by Istio.
pub(crate) const PROXY_CONTAINER: &str = "istio-proxy";

/// The parts of a pod that matter for sidecar injection checks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct PodInfo {
    pub labels: Labels,
    pub injected: bool,
}

impl PodInfo {
    pub fn from_pod(pod: &Pod) -> Self {
        Self {
            labels: pod.metadata.labels.clone().into(),
            injected: pod.spec.as_ref().map_or(false, has_proxy),
        }
    }
}

/// Native sidecars run the proxy as an init container.
fn has_proxy(spec: &PodSpec) -> bool {
    spec.containers
        .iter()
        .chain(spec.init_containers.iter().flatten())
        .any(|c| c.name == PROXY_CONTAINER)
}

/// Returns `namespace/name` for log and failure messages.
pub(crate) fn pod_ref(pod: &Pod) -> String {
    format!("{}/{}", pod.namespace().unwrap_or_default(), pod.name_any())
}
