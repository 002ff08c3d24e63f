#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub use apirule_controller_core as core;
pub use apirule_controller_k8s_api as k8s;
pub use apirule_controller_k8s_index as index;

mod admission;
mod args;
mod config;
mod default_domain;

pub use self::args::Args;
