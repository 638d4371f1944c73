//! Configuration loading and schema.

pub mod file_config;
pub mod loader;

pub use file_config::{
    ConfigValidationError, FileCacheConfig, FileConfig, FileInferenceConfig, FileProviderConfig,
    FileProvidersConfig, FileResilienceConfig, FileSandboxConfig,
};
pub use loader::ConfigLoader;
