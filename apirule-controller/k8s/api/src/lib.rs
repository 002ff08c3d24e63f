#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod apirule;
pub mod jwt;
pub mod labels;
pub mod mutator;
mod raw;
pub mod virtual_service;

pub use self::{
    apirule::{
        AccessStrategy, ApiRule, ApiRuleSpec, Authenticator, Handler, HttpMethod, Mutator, Rule,
        Service,
    },
    labels::{Labels, Selector},
    raw::RawExtension,
    virtual_service::{VirtualService, VirtualServiceSpec},
};
pub use k8s_openapi::api::{
    self,
    core::v1::{Container, Pod, PodSpec},
};
pub use kube::api::{ObjectMeta, ResourceExt};
pub use kube::Resource;
