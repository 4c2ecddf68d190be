use std::path::Path;

use arbor_repo::{ResourceTypeInfo, StaticTypeRegistry};
use arbor_rewrite::RewriteConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SdkError, SdkResult};

/// Top-level configuration, usually loaded from an `arbor.toml`.
///
/// ```toml
/// [rewrite]
/// rewrite_all = false
/// default_encoding = "UTF-8"
///
/// [[types]]
/// id = 100
/// name = "article"
/// kind = "xml"
/// link_parsing = true
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArborConfig {
    pub rewrite: RewriteConfig,
    /// Types registered on top of the standard ones.
    pub types: Vec<ResourceTypeInfo>,
}

impl ArborConfig {
    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| SdkError::Config(e.to_string()))?;
        config.rewrite.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "loading configuration");
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    /// The standard types plus the configured ones. A configured id that
    /// clashes with another type is an error.
    pub fn type_registry(&self) -> SdkResult<StaticTypeRegistry> {
        let mut registry = StaticTypeRegistry::standard();
        for info in &self.types {
            registry.register(info.clone())?;
        }
        Ok(registry)
    }
}
