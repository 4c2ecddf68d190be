//! Foundation types for Arbor, a hierarchical content store.
//!
//! This crate provides the identity, state, temporal, and workspace types used
//! throughout Arbor. Every other Arbor crate depends on `arbor-types`.
//!
//! # Key Types
//!
//! - [`Resource`] — One name-slot of content with dual structure/resource ids
//! - [`ResourceState`] / [`ResourceFlags`] — Lifecycle state and flag bits
//! - [`ValidityWindow`] — Release/expire interval with the "ignore" sentinel
//! - [`Project`] — Offline working scope or the published "Online" project
//! - [`Relation`] / [`RelationType`] / [`RelationFilter`] — Typed edges between resources
//! - [`Lock`] — Lock state of a path, as reported by the repository
//! - [`RequestContext`] — Principal, project, and request time of an operation

pub mod context;
pub mod error;
pub mod ids;
pub mod lock;
pub mod path;
pub mod project;
pub mod relation;
pub mod resource;
pub mod temporal;

pub use context::RequestContext;
pub use error::{Result, TypeError};
pub use ids::{GroupId, ProjectId, ResourceId, StructureId, UserId};
pub use lock::{Lock, LockKind};
pub use project::{Project, ProjectFlags, ProjectType, ONLINE_PROJECT_ID, ONLINE_PROJECT_NAME};
pub use relation::{PathMatch, Relation, RelationFilter, RelationType};
pub use resource::{LastModified, Resource, ResourceBuilder, ResourceFlags, ResourceState};
pub use temporal::ValidityWindow;
