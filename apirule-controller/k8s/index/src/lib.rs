//! APIRule cluster index
//!
//! Admission decisions depend on cluster state that the APIRule itself does
//! not carry. This index watches the following resources:
//!
//! - Each Istio `VirtualService` declares the hosts it routes. A new APIRule
//!   may not claim a host that is already routed by a virtual service it
//!   does not own.
//! - Each `Service` selects the workloads that back it. APIRule rules
//!   reference services by name, and the service's selector is used to find
//!   the rule's workloads.
//! - Each `Pod` is recorded with its labels and whether it runs an Istio
//!   sidecar. Rules secured by JWT require every selected workload to be part
//!   of the mesh.
//!
//! All resources are indexed by namespace. Lookups are served synchronously
//! from the latest state observed by the watches.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod index;
pub mod metrics;
mod pod;


pub use self::index::{Index, SharedIndex};
