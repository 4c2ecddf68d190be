//! The resource record: identity, lifecycle state, and temporal metadata of
//! one name-slot of content.
//!
//! Two resources are equal iff their [`StructureId`]s are equal. Siblings
//! share a [`ResourceId`] (and therefore content and shared properties) but
//! each has its own structure id and root path.

use std::fmt;
use std::hash::{Hash, Hasher};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TypeError};
use crate::ids::{ProjectId, ResourceId, StructureId, UserId};
use crate::path;
use crate::temporal::{self, ValidityWindow, ABSENT};

/// Name prefix marking a temporary file.
pub const TEMP_FILE_PREFIX: &str = "~";

/// Lifecycle state of a resource in an offline project.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceState {
    /// Identical to the online version.
    Unchanged,
    /// Edited since the last publish.
    Changed,
    /// Created since the last publish.
    New,
    /// Deleted, awaiting publish.
    Deleted,
    /// Keep whatever state is stored. Only used as a write instruction,
    /// never persisted.
    Keep,
}

impl ResourceState {
    /// Numeric code used in persisted records and filter cache keys.
    pub fn code(self) -> i32 {
        match self {
            Self::Unchanged => 0,
            Self::Changed => 1,
            Self::New => 2,
            Self::Deleted => 3,
            Self::Keep => 99,
        }
    }

    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(Self::Unchanged),
            1 => Ok(Self::Changed),
            2 => Ok(Self::New),
            3 => Ok(Self::Deleted),
            99 => Ok(Self::Keep),
            other => Err(TypeError::UnknownState(other)),
        }
    }

    /// One-character abbreviation for listings.
    pub fn abbreviation(self) -> char {
        match self {
            Self::Unchanged => 'U',
            Self::Changed => 'C',
            Self::New => 'N',
            Self::Deleted => 'D',
            Self::Keep => 'K',
        }
    }

    /// `false` for [`ResourceState::Keep`].
    pub fn is_persistable(self) -> bool {
        !matches!(self, Self::Keep)
    }

    pub fn is_unchanged(self) -> bool {
        matches!(self, Self::Unchanged)
    }

    pub fn is_changed(self) -> bool {
        matches!(self, Self::Changed)
    }

    pub fn is_new(self) -> bool {
        matches!(self, Self::New)
    }

    pub fn is_deleted(self) -> bool {
        matches!(self, Self::Deleted)
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unchanged => write!(f, "Unchanged"),
            Self::Changed => write!(f, "Changed"),
            Self::New => write!(f, "New"),
            Self::Deleted => write!(f, "Deleted"),
            Self::Keep => write!(f, "Keep"),
        }
    }
}

bitflags! {
    /// Flag bits of a resource.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ResourceFlags: u32 {
        /// Carries at least one label.
        const LABELED = 2;
        /// Only reachable internally, never delivered directly.
        const INTERNAL = 512;
        /// Temporary working file.
        const TEMPFILE = 1024;
    }
}

/// Last-modification date plus an explicit "touched" marker.
///
/// A touched date was set deliberately (e.g. by a touch operation) and must
/// be written back as-is instead of being replaced by the persistence layer.
/// Because it is a plain value, copies carry the marker along.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LastModified {
    pub at: i64,
    pub touched: bool,
}

impl LastModified {
    /// A date as read from storage.
    pub const fn stored(at: i64) -> Self {
        Self { at, touched: false }
    }

    /// A date that was explicitly set.
    pub const fn touched(at: i64) -> Self {
        Self { at, touched: true }
    }
}

/// One name-slot of content.
///
/// Folders always report a length and content date of `-1`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Resource {
    structure_id: StructureId,
    resource_id: ResourceId,
    root_path: String,
    type_id: i32,
    is_folder: bool,
    flags: ResourceFlags,
    state: ResourceState,
    length: i64,
    date_created: i64,
    last_modified: LastModified,
    window: ValidityWindow,
    date_content: i64,
    version: u32,
    sibling_count: u32,
    project_last_modified: ProjectId,
    user_created: UserId,
    user_last_modified: UserId,
}

impl Resource {
    /// Start building a resource at `root_path` of the given type.
    pub fn builder(root_path: impl Into<String>, type_id: i32) -> ResourceBuilder {
        ResourceBuilder::new(root_path, type_id)
    }

    /// A builder pre-populated with this resource's fields.
    pub fn to_builder(&self) -> ResourceBuilder {
        ResourceBuilder {
            inner: self.clone(),
        }
    }

    pub fn structure_id(&self) -> StructureId {
        self.structure_id
    }

    pub fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    /// Absolute path including the workspace-root prefix.
    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    /// Last path component; folders keep their trailing `/`.
    pub fn name(&self) -> &str {
        path::name(&self.root_path)
    }

    pub fn parent_folder(&self) -> Option<String> {
        path::parent_folder(&self.root_path)
    }

    pub fn type_id(&self) -> i32 {
        self.type_id
    }

    pub fn is_folder(&self) -> bool {
        self.is_folder
    }

    pub fn is_file(&self) -> bool {
        !self.is_folder
    }

    pub fn flags(&self) -> ResourceFlags {
        self.flags
    }

    pub fn has_flag(&self, flag: ResourceFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn is_internal(&self) -> bool {
        self.has_flag(ResourceFlags::INTERNAL)
    }

    pub fn is_labeled(&self) -> bool {
        self.has_flag(ResourceFlags::LABELED)
    }

    /// A file that is flagged temporary or named with the temp-file prefix.
    pub fn is_temporary(&self) -> bool {
        self.is_file()
            && (self.has_flag(ResourceFlags::TEMPFILE) || self.name().starts_with(TEMP_FILE_PREFIX))
    }

    pub fn state(&self) -> ResourceState {
        self.state
    }

    /// Content length in bytes, or `-1` for folders.
    pub fn length(&self) -> i64 {
        if self.is_folder {
            ABSENT
        } else {
            self.length
        }
    }

    pub fn date_created(&self) -> i64 {
        self.date_created
    }

    pub fn date_last_modified(&self) -> i64 {
        self.last_modified.at
    }

    pub fn last_modified(&self) -> LastModified {
        self.last_modified
    }

    /// Returns `true` if the last-modified date was explicitly set.
    pub fn is_touched(&self) -> bool {
        self.last_modified.touched
    }

    pub fn date_released(&self) -> i64 {
        self.window.released
    }

    pub fn date_expired(&self) -> i64 {
        self.window.expired
    }

    pub fn validity_window(&self) -> ValidityWindow {
        self.window
    }

    /// Date of the last content change, or `-1` for folders.
    pub fn date_content(&self) -> i64 {
        if self.is_folder {
            ABSENT
        } else {
            self.date_content
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn sibling_count(&self) -> u32 {
        self.sibling_count
    }

    pub fn project_last_modified(&self) -> ProjectId {
        self.project_last_modified
    }

    pub fn user_created(&self) -> UserId {
        self.user_created
    }

    pub fn user_last_modified(&self) -> UserId {
        self.user_last_modified
    }

    pub fn is_expired(&self, time: i64) -> bool {
        self.window.is_expired(time)
    }

    pub fn is_released(&self, time: i64) -> bool {
        self.window.is_released(time)
    }

    /// Released and not expired at `time`.
    pub fn is_valid(&self, time: i64) -> bool {
        self.window.is_valid(time)
    }

    /// Returns `true` if `other` shares this resource's content.
    pub fn is_sibling_of(&self, other: &Resource) -> bool {
        self.resource_id == other.resource_id
    }

    /// A copy with a different state.
    pub fn with_state(&self, state: ResourceState) -> Resource {
        Resource {
            state,
            ..self.clone()
        }
    }

    /// A copy at a different root path. Folder-ness is kept.
    pub fn with_root_path(&self, root_path: impl Into<String>) -> Resource {
        Resource {
            root_path: root_path.into(),
            ..self.clone()
        }
    }

    /// A copy with an explicitly set (touched) last-modified date.
    pub fn touched(&self, at: i64, by: UserId) -> Resource {
        Resource {
            last_modified: LastModified::touched(at),
            user_last_modified: by,
            ..self.clone()
        }
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.structure_id == other.structure_id
    }
}

impl Eq for Resource {}

impl Hash for Resource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.structure_id.hash(state);
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.state.abbreviation(),
            self.structure_id.short_id(),
            self.root_path
        )
    }
}

/// Builder for [`Resource`].
///
/// New resources get fresh ids, state [`ResourceState::New`], the unbounded
/// validity window, and creation/modification dates of "now". Folder-ness is
/// derived from the trailing `/` unless set explicitly.
#[derive(Clone, Debug)]
pub struct ResourceBuilder {
    inner: Resource,
}

impl ResourceBuilder {
    pub fn new(root_path: impl Into<String>, type_id: i32) -> Self {
        let root_path = root_path.into();
        let now = temporal::now_millis();
        Self {
            inner: Resource {
                structure_id: StructureId::new(),
                resource_id: ResourceId::new(),
                is_folder: path::is_folder_path(&root_path),
                root_path,
                type_id,
                flags: ResourceFlags::empty(),
                state: ResourceState::New,
                length: 0,
                date_created: now,
                last_modified: LastModified::stored(now),
                window: ValidityWindow::unbounded(),
                date_content: now,
                version: 1,
                sibling_count: 1,
                project_last_modified: ProjectId::nil(),
                user_created: UserId::nil(),
                user_last_modified: UserId::nil(),
            },
        }
    }

    pub fn structure_id(mut self, id: StructureId) -> Self {
        self.inner.structure_id = id;
        self
    }

    pub fn resource_id(mut self, id: ResourceId) -> Self {
        self.inner.resource_id = id;
        self
    }

    /// Share the content (resource id and sibling count) of `other`.
    pub fn sibling_of(mut self, other: &Resource) -> Self {
        self.inner.resource_id = other.resource_id;
        self.inner.sibling_count = other.sibling_count;
        self
    }

    pub fn root_path(mut self, root_path: impl Into<String>) -> Self {
        self.inner.root_path = root_path.into();
        self
    }

    pub fn type_id(mut self, type_id: i32) -> Self {
        self.inner.type_id = type_id;
        self
    }

    pub fn folder(mut self, is_folder: bool) -> Self {
        self.inner.is_folder = is_folder;
        self
    }

    pub fn flags(mut self, flags: ResourceFlags) -> Self {
        self.inner.flags = flags;
        self
    }

    pub fn state(mut self, state: ResourceState) -> Self {
        self.inner.state = state;
        self
    }

    pub fn length(mut self, length: i64) -> Self {
        self.inner.length = length;
        self
    }

    pub fn date_created(mut self, at: i64) -> Self {
        self.inner.date_created = at;
        self
    }

    pub fn last_modified(mut self, last_modified: LastModified) -> Self {
        self.inner.last_modified = last_modified;
        self
    }

    pub fn validity_window(mut self, window: ValidityWindow) -> Self {
        self.inner.window = window;
        self
    }

    pub fn date_content(mut self, at: i64) -> Self {
        self.inner.date_content = at;
        self
    }

    pub fn version(mut self, version: u32) -> Self {
        self.inner.version = version;
        self
    }

    pub fn sibling_count(mut self, count: u32) -> Self {
        self.inner.sibling_count = count;
        self
    }

    pub fn project_last_modified(mut self, project: ProjectId) -> Self {
        self.inner.project_last_modified = project;
        self
    }

    pub fn user_created(mut self, user: UserId) -> Self {
        self.inner.user_created = user;
        self
    }

    pub fn user_last_modified(mut self, user: UserId) -> Self {
        self.inner.user_last_modified = user;
        self
    }

    /// Finish, validating the root path.
    pub fn build(self) -> Result<Resource> {
        path::validate_root_path(&self.inner.root_path)?;
        Ok(self.inner)
    }
}
