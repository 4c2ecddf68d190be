//! High-level SDK for Arbor.
//!
//! Wires an [`InMemoryRepository`](arbor_repo::InMemoryRepository), a type
//! registry, and the subtree rewriter behind one [`Arbor`] handle. This is
//! the main entry point for applications embedding Arbor.

pub mod config;
pub mod error;
pub mod repository;

use tracing_subscriber::EnvFilter;

pub use config::ArborConfig;
pub use error::{SdkError, SdkResult};
pub use repository::Arbor;

// Re-export key types
pub use arbor_filter::{presets, ResourceFilter};
pub use arbor_props::{Property, PropertyScope};
pub use arbor_repo::{ResourcePort, ResourceRef, ResourceTypeInfo, TypeRegistry};
pub use arbor_rewrite::{RewriteConfig, RewritePair, RewriteReport};
pub use arbor_types::{Project, RequestContext, Resource, ResourceState};

/// Install a `fmt` subscriber filtered by `RUST_LOG`, defaulting to `info`.
///
/// Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).try_init().ok();
}
