//! Configuration for the Pictag server.
//!
//! Values come from an optional TOML file (`pictag.toml`), a `.env` file and
//! the process environment, in increasing order of precedence. Loading never
//! fails on a missing optional source; those cases are reported as
//! [`ConfigWarnings`] for the binary to log.

pub mod loader;
pub mod models;
pub mod sources;
pub mod util;
pub mod validation;

pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader, ConfigLoaderOptions};
pub use models::{
    Config, ConfigMetadata, DatabaseConfig, LabelsConfig, ServerConfig,
    StorageConfig,
};
pub use validation::{ConfigWarning, ConfigWarnings};
