//! Service configuration loading

use crate::errors::FeedError;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Load a service config struct from a TOML file
///
/// Each service defines its own serde config type with production
/// defaults; this is the shared file-to-struct step.
pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T, FeedError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .build()
        .map_err(|e| FeedError::InvalidConfig(e.to_string()))?;
    settings
        .try_deserialize()
        .map_err(|e| FeedError::InvalidConfig(e.to_string()))
}
