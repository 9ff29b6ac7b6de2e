//! Layered release configuration
//!
//! Three layers, lowest precedence first:
//! 1. Built-in defaults
//! 2. Release config file (`release.toml`)
//! 3. CLI flags

mod defaults;
mod effective;
mod merge;
mod release;

pub use defaults::BuiltinDefaults;
pub use effective::{ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig, SCHEMA_ID, SCHEMA_VERSION};
pub use merge::{deep_merge, merge_layers};
pub use release::{
    ArchiveConfig, ChecksumConfig, MetadataConfig, ProjectConfig, ReleaseConfig, SigningConfig,
    StagingConfig, MAX_SIGNING_TIMEOUT_SECONDS,
};

/// Conventional config file name looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "release.toml";
