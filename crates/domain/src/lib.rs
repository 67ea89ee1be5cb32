//! Domain types and invariants for the decommission pipeline.

#![forbid(unsafe_code)]

mod audit;
mod lock;
mod request;
mod resource;

pub use audit::AuditRow;
pub use lock::LockLevel;
pub use request::{DecommissionRequest, VmRef};
pub use resource::ResolvedVm;
