//! APIRule admission validation.
//!
//! Validation walks an [`ApiRule`](k8s::ApiRule) and reports every problem
//! it finds as a [`Failure`] addressed at the offending attribute. Nothing is
//! short-circuited across stages: service, host, rules, access strategies,
//! mutators and finally the cross-rule JWT consistency pass all contribute to
//! one ordered list. An empty list means the resource is admissible.
//!
//! Cluster state is consumed through the [`SelectorLookup`] and
//! [`InjectionCheck`] traits and the list of existing virtual services, so the
//! validator itself performs no I/O.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod access_strategy;
pub mod apirule;
mod failure;
pub mod handler;
pub mod host;
pub mod jwt;
mod lookup;
pub mod mutators;
pub mod rules;
mod uri;

pub use self::{
    apirule::{ApiRuleValidator, Config},
    failure::{describe, Failure},
    jwt::JwtHandler,
    lookup::{InjectionCheck, LookupError, SelectorLookup},
    uri::{validate_uri, InvalidUri},
};
pub use apirule_controller_k8s_api as k8s;
