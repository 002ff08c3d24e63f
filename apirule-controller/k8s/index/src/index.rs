use crate::pod::{pod_ref, PodInfo};
use ahash::AHashMap as HashMap;
use apirule_controller_core::{Failure, InjectionCheck, LookupError, SelectorLookup};
use apirule_controller_k8s_api::{
    self as k8s, api::core::v1 as corev1, Pod, ResourceExt, Selector, VirtualService,
};
use kubert::index::IndexNamespacedResource;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
pub struct Index {
    namespaces: HashMap<String, Namespace>,
}

pub type SharedIndex = Arc<RwLock<Index>>;

#[derive(Debug, Default)]
pub(crate) struct Namespace {
    virtual_services: HashMap<String, VirtualService>,

    /// `None` when the service selects no workloads.
    services: HashMap<String, Option<Selector>>,

    pods: HashMap<String, PodInfo>,
}

// === impl Index ===

impl Index {
    pub fn shared() -> SharedIndex {
        Arc::new(RwLock::new(Self::default()))
    }

    /// Returns every known virtual service, ordered by namespace and name.
    pub fn virtual_services(&self) -> Vec<VirtualService> {
        let mut vss = self
            .namespaces
            .values()
            .flat_map(|ns| ns.virtual_services.values().cloned())
            .collect::<Vec<_>>();
        vss.sort_by_key(|vs| (vs.namespace(), vs.name_any()));
        vss
    }

    pub(crate) fn namespaces(&self) -> impl Iterator<Item = (&str, &Namespace)> + '_ {
        self.namespaces.iter().map(|(name, ns)| (name.as_str(), ns))
    }

    fn ns_or_default(&mut self, namespace: String) -> &mut Namespace {
        self.namespaces.entry(namespace).or_default()
    }

    fn remove_empty(&mut self, namespace: &str) {
        if self.namespaces.get(namespace).is_some_and(Namespace::is_empty) {
            self.namespaces.remove(namespace);
        }
    }
}

impl SelectorLookup for Index {
    fn lookup_selector(
        &self,
        service: &k8s::Service,
        namespace: &str,
    ) -> Result<Option<Selector>, LookupError> {
        let name = service
            .name
            .as_deref()
            .ok_or(LookupError::MissingServiceName)?;
        let namespace = if namespace.is_empty() {
            "default"
        } else {
            namespace
        };

        self.namespaces
            .get(namespace)
            .and_then(|ns| ns.services.get(name))
            .cloned()
            .ok_or_else(|| LookupError::ServiceNotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }
}

impl InjectionCheck for Index {
    fn check_injection(
        &self,
        attribute_path: &str,
        selector: Option<&Selector>,
        namespace: &str,
    ) -> Result<Vec<Failure>, LookupError> {
        let selector = match selector {
            Some(selector) => selector,
            None => {
                return Ok(vec![Failure::new(
                    attribute_path,
                    "Target service label selectors are not defined",
                )])
            }
        };

        let pods = match self.namespaces.get(namespace) {
            Some(ns) => &ns.pods,
            None => return Ok(vec![]),
        };

        let mut missing = pods
            .iter()
            .filter(|(_, pod)| !pod.injected && selector.matches(&pod.labels))
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>();
        missing.sort_unstable();

        Ok(missing
            .into_iter()
            .map(|name| {
                Failure::new(
                    attribute_path,
                    format!("Pod {namespace}/{name} does not have an injected istio sidecar"),
                )
            })
            .collect())
    }
}

impl IndexNamespacedResource<VirtualService> for Index {
    fn apply(&mut self, vs: VirtualService) {
        let namespace = vs.namespace().unwrap_or_default();
        let name = vs.name_unchecked();
        debug!(%namespace, %name, hosts = ?vs.spec.hosts, "indexing virtual service");
        self.ns_or_default(namespace)
            .virtual_services
            .insert(name, vs);
    }

    fn delete(&mut self, namespace: String, name: String) {
        if let Some(ns) = self.namespaces.get_mut(&namespace) {
            ns.virtual_services.remove(&name);
        }
        self.remove_empty(&namespace);
    }
}

impl IndexNamespacedResource<corev1::Service> for Index {
    fn apply(&mut self, svc: corev1::Service) {
        let namespace = svc.namespace().unwrap_or_default();
        let name = svc.name_unchecked();
        let selector = svc
            .spec
            .and_then(|spec| spec.selector)
            .filter(|labels| !labels.is_empty())
            .map(Selector::from_map);
        debug!(%namespace, %name, ?selector, "indexing service");
        self.ns_or_default(namespace).services.insert(name, selector);
    }

    fn delete(&mut self, namespace: String, name: String) {
        if let Some(ns) = self.namespaces.get_mut(&namespace) {
            ns.services.remove(&name);
        }
        self.remove_empty(&namespace);
    }
}

impl IndexNamespacedResource<Pod> for Index {
    fn apply(&mut self, pod: Pod) {
        let info = PodInfo::from_pod(&pod);
        debug!(pod = %pod_ref(&pod), injected = info.injected, "indexing pod");
        let namespace = pod.namespace().unwrap_or_default();
        self.ns_or_default(namespace)
            .pods
            .insert(pod.name_unchecked(), info);
    }

    fn delete(&mut self, namespace: String, name: String) {
        if let Some(ns) = self.namespaces.get_mut(&namespace) {
            ns.pods.remove(&name);
        }
        self.remove_empty(&namespace);
    }
}

// === impl Namespace ===

impl Namespace {
    fn is_empty(&self) -> bool {
        self.virtual_services.is_empty() && self.services.is_empty() && self.pods.is_empty()
    }

    pub(crate) fn sizes(&self) -> [(&'static str, usize); 3] {
        [
            ("virtualservice", self.virtual_services.len()),
            ("service", self.services.len()),
            ("pod", self.pods.len()),
        ]
    }
}
