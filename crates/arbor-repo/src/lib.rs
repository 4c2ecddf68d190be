//! Repository port for Arbor.
//!
//! The core never talks to storage directly. Everything it needs from a
//! repository goes through the [`ResourcePort`] trait, and everything it needs
//! to know about resource types goes through an injected [`TypeRegistry`].
//!
//! # Modules
//!
//! - [`error`] — [`RepoError`] and the [`RepoResult`] alias
//! - [`traits`] — The [`ResourcePort`] trait and [`ResourceRef`]
//! - [`registry`] — [`TypeRegistry`], [`StaticTypeRegistry`], and [`ContentKind`]
//! - [`links`] — Link markup parsing and correction
//! - [`memory`] — In-memory [`InMemoryRepository`] for tests and embedding

pub mod error;
pub mod links;
pub mod memory;
pub mod registry;
pub mod traits;

pub use error::{RepoError, RepoResult};
pub use links::{correct_links, parse_links, render_link, Link};
pub use memory::InMemoryRepository;
pub use registry::{ContentKind, ResourceTypeInfo, StaticTypeRegistry, TypeRegistry};
pub use traits::{ResourcePort, ResourceRef};
