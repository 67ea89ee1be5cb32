mod compute;
mod credentials;
mod resources;
mod tables;

pub use compute::ComputeLifecycle;
pub use credentials::{BearerToken, TokenCredential};
pub use resources::ResourceManager;
pub use tables::AuditTableStore;
