//! Subtree link rewriting for Arbor.
//!
//! Copying a subtree duplicates its resources, but links inside the copy
//! still point at the originals. The [`SubtreeRewriter`] matches source and
//! target resources by relative path, translates structure ids inside the
//! content of link-parsing resources, and re-anchors structural relations so
//! that the copy becomes self-contained.
//!
//! # Quick Start
//!
//! ```rust
//! use arbor_rewrite::RewriteConfig;
//!
//! let config: RewriteConfig = toml::from_str(r#"
//!     rewrite_all = true
//!     default_encoding = "ISO-8859-1"
//! "#).unwrap();
//! assert!(config.validate().is_ok());
//! assert_eq!(config.encoding_property, "content-encoding");
//! ```
//!
//! # Key Types
//!
//! - [`SubtreeRewriter`] — Runs a rewrite over one or more [`RewritePair`]s
//! - [`RewriteConfig`] — Sweep and encoding settings
//! - [`RewriteReport`] — Counters and skipped resources of a run
//! - [`TranslationTable`] — Source to target resource mapping
//! - [`ContentCodec`] — Charset and XML handling of resource content

pub mod codec;
pub mod config;
pub mod error;
pub mod report;
pub mod rewriter;
pub mod substitute;
pub mod translation;

pub use codec::ContentCodec;
pub use config::RewriteConfig;
pub use error::{RewriteError, RewriteResult};
pub use report::RewriteReport;
pub use rewriter::{RewritePair, SubtreeRewriter};
pub use substitute::{substitute, translate_ids, UUID_PATTERN};
pub use translation::TranslationTable;
