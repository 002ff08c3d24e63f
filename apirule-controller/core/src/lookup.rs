use crate::{
    k8s::{Selector, Service},
    Failure,
};
use thiserror::Error;

/// Resolves the workload selector of a backing service.
pub trait SelectorLookup {
    /// Returns `Ok(None)` when the service exists but selects no workloads.
    fn lookup_selector(
        &self,
        service: &Service,
        namespace: &str,
    ) -> Result<Option<Selector>, LookupError>;
}

/// Reports whether the workloads behind a selector run with an injected
/// mesh sidecar.
pub trait InjectionCheck {
    fn check_injection(
        &self,
        attribute_path: &str,
        selector: Option<&Selector>,
        namespace: &str,
    ) -> Result<Vec<Failure>, LookupError>;
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("service name is required but missing")]
    MissingServiceName,

    #[error("service {namespace}/{name} not found")]
    ServiceNotFound { namespace: String, name: String },
}

impl<T: SelectorLookup + ?Sized> SelectorLookup for &T {
    fn lookup_selector(
        &self,
        service: &Service,
        namespace: &str,
    ) -> Result<Option<Selector>, LookupError> {
        (**self).lookup_selector(service, namespace)
    }
}

impl<T: InjectionCheck + ?Sized> InjectionCheck for &T {
    fn check_injection(
        &self,
        attribute_path: &str,
        selector: Option<&Selector>,
        namespace: &str,
    ) -> Result<Vec<Failure>, LookupError> {
        (**self).check_injection(attribute_path, selector, namespace)
    }
}
