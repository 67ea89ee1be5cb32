//! Application services for marking virtual machines for removal.
//!
//! Cloud providers are reached only through the ports in [`cloud_ports`];
//! concrete adapters live in the infrastructure crate.

#![forbid(unsafe_code)]

mod cloud_ports;
mod decommission_service;

pub use cloud_ports::{
    AuditTableStore, BearerToken, ComputeLifecycle, ResourceManager, TokenCredential,
};
pub use decommission_service::{DecommissionService, DecommissionSummary};
