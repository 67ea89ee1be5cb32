//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod arm_compute_lifecycle;
mod arm_resource_manager;
mod azure_client_credential;
mod azure_table_store;
mod in_memory_cloud;

pub use arm_compute_lifecycle::ArmComputeLifecycle;
pub use arm_resource_manager::ArmResourceManager;
pub use azure_client_credential::AzureClientCredential;
pub use azure_table_store::AzureTableStore;
pub use in_memory_cloud::InMemoryCloud;
