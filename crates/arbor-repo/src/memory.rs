//! In-memory repository for tests, demos, and embedding.
//!
//! [`InMemoryRepository`] keeps every record, content body, property,
//! relation, and lock in a single `RwLock`-guarded state. It implements the
//! full [`ResourcePort`], including the link correction the type layer
//! performs when a link-parsing type is written.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use arbor_filter::ResourceFilter;
use arbor_props::{resolve_property, Property, PropertySource, DELETE_VALUE};
use arbor_types::temporal::now_millis;
use arbor_types::{
    path, LastModified, Lock, Relation, RelationFilter, RelationType, RequestContext, Resource,
    ResourceId, ResourceState, StructureId, UserId,
};
use tracing::{debug, info};

use crate::error::{RepoError, RepoResult};
use crate::links::{correct_links, parse_links};
use crate::registry::{TypeRegistry, TYPE_FOLDER};
use crate::traits::{ResourcePort, ResourceRef};

/// An in-memory implementation of [`ResourcePort`].
///
/// The root folder `/` always exists implicitly. Data is lost when the
/// repository is dropped.
pub struct InMemoryRepository {
    registry: Arc<dyn TypeRegistry>,
    context: RwLock<RequestContext>,
    inner: RwLock<RepoState>,
}

#[derive(Default)]
struct RepoState {
    paths: BTreeMap<String, StructureId>,
    records: HashMap<StructureId, Resource>,
    contents: HashMap<ResourceId, Vec<u8>>,
    structure_props: HashMap<StructureId, BTreeMap<String, String>>,
    resource_props: HashMap<ResourceId, BTreeMap<String, String>>,
    relations: Vec<Relation>,
    locks: BTreeMap<String, UserId>,
    file_writes: usize,
}

fn poisoned<E: std::fmt::Display>(e: E) -> RepoError {
    RepoError::Poisoned(e.to_string())
}

impl RepoState {
    fn by_path(&self, root_path: &str) -> Option<&Resource> {
        self.paths.get(root_path).and_then(|id| self.records.get(id))
    }

    fn by_ref(&self, reference: ResourceRef<'_>) -> Option<&Resource> {
        match reference {
            ResourceRef::Id(id) => self.records.get(&id),
            ResourceRef::Path(p) => self.by_path(p),
        }
    }

    fn current(&self, resource: &Resource) -> RepoResult<Resource> {
        self.records
            .get(&resource.structure_id())
            .cloned()
            .ok_or_else(|| RepoError::NotFound(resource.root_path().to_string()))
    }

    fn insert(&mut self, resource: Resource) {
        self.paths
            .insert(resource.root_path().to_string(), resource.structure_id());
        self.records.insert(resource.structure_id(), resource);
    }

    /// Everything strictly below `folder`, in path order.
    fn subtree<'a>(&'a self, folder: &'a str) -> impl Iterator<Item = &'a Resource> + 'a {
        self.paths
            .range::<str, _>((Bound::Excluded(folder), Bound::Unbounded))
            .take_while(move |(p, _)| p.starts_with(folder))
            .filter_map(move |(_, id)| self.records.get(id))
    }

    fn check_new_path(&self, root_path: &str) -> RepoResult<()> {
        path::validate_root_path(root_path)?;
        if self.paths.contains_key(root_path) {
            return Err(RepoError::AlreadyExists(root_path.to_string()));
        }
        match path::parent_folder(root_path) {
            Some(parent) if parent != "/" && !self.paths.contains_key(&parent) => {
                Err(RepoError::NotFound(parent))
            }
            None => Err(RepoError::InvalidArgument("cannot create the root folder".into())),
            _ => Ok(()),
        }
    }

    fn lock_of(&self, root_path: &str) -> Lock {
        if let Some(owner) = self.locks.get(root_path) {
            return Lock::exclusive(root_path, *owner);
        }
        let mut parent = path::parent_folder(root_path);
        while let Some(folder) = parent {
            if let Some(owner) = self.locks.get(&folder) {
                return Lock::inherited(root_path, *owner);
            }
            parent = path::parent_folder(&folder);
        }
        Lock::unlocked(root_path)
    }

    fn check_writable(&self, root_path: &str, user: UserId) -> RepoResult<()> {
        match self.lock_of(root_path).owner {
            Some(owner) if owner != user => Err(RepoError::Locked {
                path: root_path.to_string(),
                owner,
            }),
            _ => Ok(()),
        }
    }

    fn push_relation(&mut self, relation: Relation) {
        if !self.relations.contains(&relation) {
            self.relations.push(relation);
        }
    }

    /// Store content, correcting links and refreshing the content relations
    /// of link-parsing types. Returns the stored length.
    fn store_content(
        &mut self,
        registry: &dyn TypeRegistry,
        resource: &Resource,
        content: &[u8],
    ) -> i64 {
        let text = registry
            .supports_link_parsing(resource.type_id())
            .then(|| std::str::from_utf8(content).ok())
            .flatten();
        let stored = match text {
            Some(text) => {
                let corrected = correct_links(text, |link| {
                    link.target_id
                        .and_then(|id| self.records.get(&id))
                        .or_else(|| self.by_path(&link.target_path))
                        .map(|r| (r.structure_id(), r.root_path().to_string()))
                });
                let parsed: Vec<Relation> = parse_links(&corrected)
                    .into_iter()
                    .filter_map(|link| {
                        let target = link.target_id.and_then(|id| self.records.get(&id))?;
                        Some(Relation::new(resource, target, link.relation_type))
                    })
                    .collect();
                let stored = corrected.into_owned().into_bytes();
                let source_id = resource.structure_id();
                self.relations.retain(|r| {
                    r.source_id != source_id || !r.relation_type.is_defined_in_content()
                });
                for relation in parsed {
                    self.push_relation(relation);
                }
                stored
            }
            None => content.to_vec(),
        };
        let length = stored.len() as i64;
        self.contents.insert(resource.resource_id(), stored);
        length
    }

    fn mark_changed(
        &mut self,
        resource: &Resource,
        context: &RequestContext,
        length: Option<i64>,
    ) -> RepoResult<Resource> {
        let now = now_millis();
        let new_state = if resource.state().is_new() {
            ResourceState::New
        } else {
            ResourceState::Changed
        };
        let mut builder = resource
            .to_builder()
            .state(new_state)
            .project_last_modified(context.project.id());
        if let Some(length) = length {
            builder = builder.length(length).date_content(now);
        }
        let updated = builder.build()?.touched(now, context.user);
        self.insert(updated.clone());
        Ok(updated)
    }
}

struct PropertyView<'a>(&'a RepoState);

impl PropertyView<'_> {
    fn build(&self, resource: &Resource, name: &str) -> arbor_props::Result<Option<Property>> {
        let structure = self
            .0
            .structure_props
            .get(&resource.structure_id())
            .and_then(|m| m.get(name));
        let shared = self
            .0
            .resource_props
            .get(&resource.resource_id())
            .and_then(|m| m.get(name));
        if structure.is_none() && shared.is_none() {
            return Ok(None);
        }
        Property::with_values(name, structure.map(String::as_str), shared.map(String::as_str))
            .map(Some)
    }
}

impl PropertySource for PropertyView<'_> {
    fn local_property(&self, path: &str, name: &str) -> arbor_props::Result<Option<Property>> {
        match self.0.by_path(path) {
            Some(resource) => self.build(resource, name),
            None => Ok(None),
        }
    }

    fn local_properties(&self, path: &str) -> arbor_props::Result<Vec<Property>> {
        let Some(resource) = self.0.by_path(path) else {
            return Ok(Vec::new());
        };
        let names: BTreeSet<&String> = self
            .0
            .structure_props
            .get(&resource.structure_id())
            .into_iter()
            .chain(self.0.resource_props.get(&resource.resource_id()))
            .flat_map(|m| m.keys())
            .collect();
        let mut properties = Vec::with_capacity(names.len());
        for name in names {
            properties.extend(self.build(resource, name)?);
        }
        Ok(properties)
    }
}

fn apply_value(values: &mut BTreeMap<String, String>, name: &str, value: Option<&str>) {
    match value {
        Some(DELETE_VALUE) => {
            values.remove(name);
        }
        Some(v) => {
            values.insert(name.to_string(), v.to_string());
        }
        None => {}
    }
}

impl InMemoryRepository {
    /// Create an empty repository acting for `context`.
    pub fn new(context: RequestContext, registry: Arc<dyn TypeRegistry>) -> Self {
        Self {
            registry,
            context: RwLock::new(context),
            inner: RwLock::new(RepoState::default()),
        }
    }

    pub fn registry(&self) -> &Arc<dyn TypeRegistry> {
        &self.registry
    }

    /// Act for a different user, project, or time from now on.
    pub fn set_context(&self, context: RequestContext) -> RepoResult<()> {
        *self.context.write().map_err(poisoned)? = context;
        Ok(())
    }

    fn read_state(&self) -> RepoResult<RwLockReadGuard<'_, RepoState>> {
        self.inner.read().map_err(poisoned)
    }

    fn write_state(&self) -> RepoResult<RwLockWriteGuard<'_, RepoState>> {
        self.inner.write().map_err(poisoned)
    }

    fn new_record(&self, root_path: &str, type_id: i32, context: &RequestContext) -> RepoResult<Resource> {
        Ok(Resource::builder(root_path, type_id)
            .user_created(context.user)
            .user_last_modified(context.user)
            .project_last_modified(context.project.id())
            .build()?)
    }

    /// Create a folder. The parent folder must exist.
    pub fn create_folder(&self, root_path: &str) -> RepoResult<Resource> {
        let context = self.request_context()?;
        let folder = path::ensure_folder(root_path);
        let mut state = self.write_state()?;
        state.check_new_path(&folder)?;
        state.check_writable(&folder, context.user)?;
        let resource = self.new_record(&folder, TYPE_FOLDER, &context)?;
        state.insert(resource.clone());
        debug!(path = %folder, "created folder");
        Ok(resource)
    }

    /// Create a file with initial content. The parent folder must exist.
    pub fn create_file(&self, root_path: &str, type_id: i32, content: &[u8]) -> RepoResult<Resource> {
        if path::is_folder_path(root_path) || self.registry.is_folder_type(type_id) {
            return Err(RepoError::InvalidArgument(format!(
                "not a file: {root_path} (type {type_id})"
            )));
        }
        let context = self.request_context()?;
        let mut state = self.write_state()?;
        state.check_new_path(root_path)?;
        state.check_writable(root_path, context.user)?;
        let resource = self.new_record(root_path, type_id, &context)?;
        let length = state.store_content(self.registry.as_ref(), &resource, content);
        let resource = resource.to_builder().length(length).build()?;
        state.insert(resource.clone());
        debug!(path = %root_path, type_id, length, "created file");
        Ok(resource)
    }

    /// Create another name for the content of `source`.
    pub fn create_sibling(&self, source: &Resource, root_path: &str) -> RepoResult<Resource> {
        let context = self.request_context()?;
        let mut state = self.write_state()?;
        let source = state.current(source)?;
        if source.is_folder() {
            return Err(RepoError::InvalidArgument(format!(
                "folders cannot have siblings: {}",
                source.root_path()
            )));
        }
        state.check_new_path(root_path)?;
        state.check_writable(root_path, context.user)?;

        let count = source.sibling_count() + 1;
        let existing: Vec<Resource> = state
            .records
            .values()
            .filter(|r| r.is_sibling_of(&source))
            .cloned()
            .collect();
        for resource in existing {
            let updated = resource.to_builder().sibling_count(count).build()?;
            state.insert(updated);
        }
        let sibling = source
            .to_builder()
            .structure_id(StructureId::new())
            .root_path(root_path)
            .state(ResourceState::New)
            .sibling_count(count)
            .user_created(context.user)
            .build()?;
        state.insert(sibling.clone());

        let content = state.contents.get(&source.resource_id()).cloned().unwrap_or_default();
        state.store_content(self.registry.as_ref(), &sibling, &content);
        debug!(source = %source.root_path(), path = %root_path, "created sibling");
        Ok(sibling)
    }

    /// Copy a resource (a folder with its whole subtree) to `target_path`.
    ///
    /// Copies get fresh structure and resource ids and duplicate content and
    /// properties. Relations are copied with their original targets, so
    /// links inside the copied subtree still point at the source subtree.
    /// Locale-variant relations are not copied.
    pub fn copy_resource(&self, source_path: &str, target_path: &str) -> RepoResult<Resource> {
        let context = self.request_context()?;
        let mut state = self.write_state()?;
        let source = state
            .by_path(source_path)
            .cloned()
            .ok_or_else(|| RepoError::NotFound(source_path.to_string()))?;
        let target_root = if source.is_folder() {
            path::ensure_folder(target_path)
        } else {
            target_path.to_string()
        };
        if source.is_folder() && path::is_sub_path(source.root_path(), &target_root) {
            return Err(RepoError::InvalidArgument(format!(
                "cannot copy {source_path} into itself ({target_root})"
            )));
        }
        state.check_new_path(&target_root)?;
        state.check_writable(&target_root, context.user)?;

        let mut originals = vec![source.clone()];
        if source.is_folder() {
            originals.extend(state.subtree(source.root_path()).cloned());
        }

        let now = now_millis();
        let mut mapping: HashMap<StructureId, Resource> = HashMap::new();
        for original in &originals {
            let relative = path::relative_path(source.root_path(), original.root_path()).unwrap_or("");
            let new_path = if relative.is_empty() {
                target_root.clone()
            } else {
                path::join(&target_root, relative)
            };
            let copy = original
                .to_builder()
                .structure_id(StructureId::new())
                .resource_id(ResourceId::new())
                .root_path(new_path)
                .state(ResourceState::New)
                .version(1)
                .sibling_count(1)
                .date_created(now)
                .last_modified(LastModified::stored(now))
                .user_created(context.user)
                .user_last_modified(context.user)
                .project_last_modified(context.project.id())
                .build()?;
            if let Some(content) = state.contents.get(&original.resource_id()).cloned() {
                state.contents.insert(copy.resource_id(), content);
            }
            if let Some(props) = state.structure_props.get(&original.structure_id()).cloned() {
                state.structure_props.insert(copy.structure_id(), props);
            }
            if let Some(props) = state.resource_props.get(&original.resource_id()).cloned() {
                state.resource_props.insert(copy.resource_id(), props);
            }
            state.insert(copy.clone());
            mapping.insert(original.structure_id(), copy);
        }

        let copied: Vec<Relation> = state
            .relations
            .iter()
            .filter(|r| !r.relation_type.is_locale_variant())
            .filter_map(|r| {
                mapping.get(&r.source_id).map(|copy| Relation {
                    source_id: copy.structure_id(),
                    source_path: copy.root_path().to_string(),
                    ..r.clone()
                })
            })
            .collect();
        for relation in copied {
            state.push_relation(relation);
        }

        info!(
            source = %source_path,
            target = %target_root,
            resources = mapping.len(),
            "copied resources"
        );
        mapping
            .remove(&source.structure_id())
            .ok_or_else(|| RepoError::NotFound(source_path.to_string()))
    }

    /// Release a lock held by the current user on `path`.
    pub fn unlock(&self, root_path: &str) -> RepoResult<()> {
        let context = self.request_context()?;
        let mut state = self.write_state()?;
        match state.locks.get(root_path) {
            Some(owner) if *owner != context.user => Err(RepoError::Locked {
                path: root_path.to_string(),
                owner: *owner,
            }),
            Some(_) => {
                state.locks.remove(root_path);
                debug!(path = %root_path, "unlocked");
                Ok(())
            }
            None => Ok(()),
        }
    }

    /// How many times file content was written through [`ResourcePort::write_file`].
    pub fn file_write_count(&self) -> RepoResult<usize> {
        Ok(self.read_state()?.file_writes)
    }
}

impl ResourcePort for InMemoryRepository {
    fn request_context(&self) -> RepoResult<RequestContext> {
        Ok(self.context.read().map_err(poisoned)?.clone())
    }

    fn read_resource(
        &self,
        reference: ResourceRef<'_>,
        filter: &ResourceFilter,
    ) -> RepoResult<Resource> {
        let context = self.request_context()?;
        let state = self.read_state()?;
        state
            .by_ref(reference)
            .filter(|r| filter.is_valid(&context, r))
            .cloned()
            .ok_or_else(|| RepoError::NotFound(reference.to_string()))
    }

    fn read_resources(
        &self,
        root_path: &str,
        filter: &ResourceFilter,
        recursive: bool,
    ) -> RepoResult<Vec<Resource>> {
        let context = self.request_context()?;
        let state = self.read_state()?;
        let folder = path::ensure_folder(root_path);
        if folder != "/" && state.by_path(&folder).is_none() {
            return Err(RepoError::NotFound(folder));
        }
        let mut found: Vec<Resource> = Vec::new();
        for resource in state.subtree(&folder) {
            if !recursive && resource.parent_folder().as_deref() != Some(folder.as_str()) {
                continue;
            }
            if filter.is_valid(&context, resource) {
                found.push(resource.clone());
            }
        }
        Ok(found)
    }

    fn read_relations(&self, filter: &RelationFilter) -> RepoResult<Vec<Relation>> {
        let state = self.read_state()?;
        Ok(state
            .relations
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    fn add_relation(
        &self,
        source: &Resource,
        target: &Resource,
        relation_type: RelationType,
    ) -> RepoResult<()> {
        let context = self.request_context()?;
        let mut state = self.write_state()?;
        let source = state.current(source)?;
        let target = state.current(target)?;
        state.check_writable(source.root_path(), context.user)?;
        state.push_relation(Relation::new(&source, &target, relation_type));
        debug!(
            source = %source.root_path(),
            target = %target.root_path(),
            relation_type = %relation_type,
            "added relation"
        );
        Ok(())
    }

    fn delete_relations(&self, source: &Resource, filter: &RelationFilter) -> RepoResult<usize> {
        let context = self.request_context()?;
        let mut state = self.write_state()?;
        let source = state.current(source)?;
        state.check_writable(source.root_path(), context.user)?;
        let before = state.relations.len();
        let source_id = source.structure_id();
        state
            .relations
            .retain(|r| r.source_id != source_id || !filter.matches(r));
        let removed = before - state.relations.len();
        debug!(source = %source.root_path(), removed, "deleted relations");
        Ok(removed)
    }

    fn read_file(&self, resource: &Resource) -> RepoResult<Vec<u8>> {
        let state = self.read_state()?;
        let current = state.current(resource)?;
        if current.is_folder() {
            return Err(RepoError::InvalidArgument(format!(
                "folders have no content: {}",
                current.root_path()
            )));
        }
        Ok(state
            .contents
            .get(&current.resource_id())
            .cloned()
            .unwrap_or_default())
    }

    fn write_file(&self, resource: &Resource, content: &[u8]) -> RepoResult<Resource> {
        let context = self.request_context()?;
        let mut state = self.write_state()?;
        let current = state.current(resource)?;
        if current.is_folder() {
            return Err(RepoError::InvalidArgument(format!(
                "folders have no content: {}",
                current.root_path()
            )));
        }
        state.check_writable(current.root_path(), context.user)?;
        let length = state.store_content(self.registry.as_ref(), &current, content);
        let updated = state.mark_changed(&current, &context, Some(length))?;
        state.file_writes += 1;
        debug!(path = %updated.root_path(), length, "wrote file");
        Ok(updated)
    }

    fn read_property(
        &self,
        resource: &Resource,
        name: &str,
        search: bool,
    ) -> RepoResult<Option<Property>> {
        let state = self.read_state()?;
        let current = state.current(resource)?;
        let view = PropertyView(&state);
        Ok(resolve_property(&view, current.root_path(), name, search)?.map(Property::frozen))
    }

    fn write_property(&self, resource: &Resource, property: &Property) -> RepoResult<()> {
        let context = self.request_context()?;
        let mut state = self.write_state()?;
        let current = state.current(resource)?;
        state.check_writable(current.root_path(), context.user)?;
        let name = property.name();
        apply_value(
            state.structure_props.entry(current.structure_id()).or_default(),
            name,
            property.structure_value(),
        );
        apply_value(
            state.resource_props.entry(current.resource_id()).or_default(),
            name,
            property.resource_value(),
        );
        state.mark_changed(&current, &context, None)?;
        debug!(path = %current.root_path(), name, "wrote property");
        Ok(())
    }

    fn lock(&self, root_path: &str) -> RepoResult<Lock> {
        let context = self.request_context()?;
        let mut state = self.write_state()?;
        if root_path != "/" && state.by_path(root_path).is_none() {
            return Err(RepoError::NotFound(root_path.to_string()));
        }
        let current = state.lock_of(root_path);
        if let Some(owner) = current.owner.filter(|o| *o != context.user) {
            return Err(RepoError::Locked {
                path: root_path.to_string(),
                owner,
            });
        }
        if current.is_inherited() {
            return Ok(current);
        }
        if path::is_folder_path(root_path) {
            let foreign = state
                .locks
                .range(root_path.to_string()..)
                .take_while(|(p, _)| p.starts_with(root_path))
                .find(|(_, owner)| **owner != context.user)
                .map(|(p, owner)| (p.clone(), *owner));
            if let Some((path, owner)) = foreign {
                return Err(RepoError::Locked { path, owner });
            }
        }
        state.locks.insert(root_path.to_string(), context.user);
        debug!(path = %root_path, user = %context.user, "locked");
        Ok(Lock::exclusive(root_path, context.user))
    }

    fn get_lock(&self, root_path: &str) -> RepoResult<Lock> {
        Ok(self.read_state()?.lock_of(root_path))
    }
}
