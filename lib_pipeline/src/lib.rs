// Declare the feature-gated module folders
#[cfg(feature = "configs")]
pub mod configs;
#[cfg(feature = "ledger")]
pub mod ledger;
#[cfg(feature = "provider")]
pub mod provider;
#[cfg(feature = "registry")]
pub mod registry;
#[cfg(feature = "retrieve")]
pub mod retrieve;
#[cfg(feature = "sync")]
pub mod sync;

// Re-export the types callers reach for most often
#[cfg(feature = "configs")]
pub use configs::config_pipeline::{Config, PipelineConfig};
#[cfg(feature = "registry")]
pub use registry::model::{DatasetScope, Registry, RegistryRecord, StatSnapshot};
#[cfg(feature = "registry")]
pub use registry::store::RegistryStore;
#[cfg(feature = "sync")]
pub use sync::summary::SyncRunSummary;
