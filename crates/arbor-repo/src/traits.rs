//! The [`ResourcePort`] trait: everything the core consumes from a repository.
//!
//! Any backend (database, in-memory, remote) implements this trait. Every
//! call is a synchronous, ordered step from the caller's point of view.

use arbor_filter::ResourceFilter;
use arbor_props::Property;
use arbor_types::{
    Lock, Relation, RelationFilter, RelationType, RequestContext, Resource, StructureId,
};

use crate::error::RepoResult;

/// Address of a resource: its structure id or its root path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceRef<'a> {
    Id(StructureId),
    Path(&'a str),
}

impl From<StructureId> for ResourceRef<'_> {
    fn from(id: StructureId) -> Self {
        ResourceRef::Id(id)
    }
}

impl<'a> From<&'a str> for ResourceRef<'a> {
    fn from(path: &'a str) -> Self {
        ResourceRef::Path(path)
    }
}

impl std::fmt::Display for ResourceRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceRef::Id(id) => write!(f, "{id}"),
            ResourceRef::Path(path) => f.write_str(path),
        }
    }
}

/// Storage and lock contract of a repository.
///
/// Implementations must be thread-safe (`Send + Sync`). Permission checks,
/// if any, happen behind this interface.
pub trait ResourcePort: Send + Sync {
    /// The principal, project, and time the port acts for.
    fn request_context(&self) -> RepoResult<RequestContext>;

    /// Read one resource. Fails with `NotFound` if it does not exist or does
    /// not pass `filter`.
    fn read_resource(&self, reference: ResourceRef<'_>, filter: &ResourceFilter)
        -> RepoResult<Resource>;

    /// The resources below the folder `path` that pass `filter`, excluding
    /// the folder itself. Without `recursive` only direct children.
    fn read_resources(
        &self,
        path: &str,
        filter: &ResourceFilter,
        recursive: bool,
    ) -> RepoResult<Vec<Resource>>;

    /// All relations matching `filter`.
    fn read_relations(&self, filter: &RelationFilter) -> RepoResult<Vec<Relation>>;

    /// Add a relation. Adding an existing relation is a no-op.
    fn add_relation(
        &self,
        source: &Resource,
        target: &Resource,
        relation_type: RelationType,
    ) -> RepoResult<()>;

    /// Delete the relations of `source` matching `filter`, returning how
    /// many were removed.
    fn delete_relations(&self, source: &Resource, filter: &RelationFilter) -> RepoResult<usize>;

    fn read_file(&self, resource: &Resource) -> RepoResult<Vec<u8>>;

    /// Replace the content of `resource` and return the updated record.
    ///
    /// The type layer may correct links in the content and refresh the
    /// content relations while writing.
    fn write_file(&self, resource: &Resource, content: &[u8]) -> RepoResult<Resource>;

    /// Read a property, optionally inherited from parent folders. The
    /// returned property is frozen.
    fn read_property(
        &self,
        resource: &Resource,
        name: &str,
        search: bool,
    ) -> RepoResult<Option<Property>>;

    /// Persist the set values of `property`. A deletion marker removes the
    /// stored value of that scope.
    fn write_property(&self, resource: &Resource, property: &Property) -> RepoResult<()>;

    /// Lock `path` for the current user. Fails with `Locked` if another user
    /// holds a lock on it, an ancestor, or a descendant.
    fn lock(&self, path: &str) -> RepoResult<Lock>;

    fn get_lock(&self, path: &str) -> RepoResult<Lock>;
}
