use serde::{Deserialize, Serialize};

use crate::error::{RewriteError, RewriteResult};

/// Configuration for the [`SubtreeRewriter`](crate::SubtreeRewriter).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Also force a read/write cycle on every link-parsing resource under the
    /// target roots, not only on resources with broken links.
    pub rewrite_all: bool,
    /// Encoding used when a resource declares none or an unsupported one.
    pub default_encoding: String,
    /// Name of the (inherited) property that declares a resource's encoding.
    pub encoding_property: String,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            rewrite_all: false,
            default_encoding: "UTF-8".into(),
            encoding_property: "content-encoding".into(),
        }
    }
}

impl RewriteConfig {
    /// Rewrite broken links and sweep every other link-parsing resource.
    pub fn rewrite_all() -> Self {
        Self {
            rewrite_all: true,
            ..Default::default()
        }
    }

    /// Check that the default encoding resolves and the property name is valid.
    pub fn validate(&self) -> RewriteResult<()> {
        if encoding_rs::Encoding::for_label(self.default_encoding.trim().as_bytes()).is_none() {
            return Err(RewriteError::UnknownEncoding(self.default_encoding.clone()));
        }
        arbor_props::property::validate_name(&self.encoding_property)
            .map_err(|e| RewriteError::Config(e.to_string()))
    }
}
