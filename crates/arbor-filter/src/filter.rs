use std::fmt::{self, Write as _};
use std::hash::{Hash, Hasher};

use arbor_types::{RequestContext, Resource, ResourceFlags, ResourceState};
use serde::{Deserialize, Serialize};

use crate::presets::ALL;

/// A required or excluded value of one filter category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Constraint<T> {
    Required(T),
    Excluded(T),
}

impl<T> Constraint<T> {
    fn token(&self, tag: char) -> (char, char, &T) {
        match self {
            Constraint::Required(v) => (tag, 'r', v),
            Constraint::Excluded(v) => (tag, 'x', v),
        }
    }
}

/// An inclusive range of dates. Unset bounds are open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub after: i64,
    pub before: i64,
}

impl TimeRange {
    pub const OPEN: TimeRange = TimeRange {
        after: i64::MIN,
        before: i64::MAX,
    };

    pub fn contains(&self, time: i64) -> bool {
        self.after <= time && time <= self.before
    }
}

/// An immutable predicate over resources with a derived cache key.
///
/// Constraints of the same category overwrite each other: the last `add_*`
/// call for a category wins. The cache key encodes the final constraints in
/// a fixed section order, so the order of calls for different categories
/// does not matter.
///
/// ```
/// use arbor_filter::ResourceFilter;
/// use arbor_types::ResourceState;
///
/// let a = ResourceFilter::unfiltered()
///     .add_require_file()
///     .add_exclude_state(ResourceState::Deleted);
/// let b = ResourceFilter::unfiltered()
///     .add_exclude_state(ResourceState::Deleted)
///     .add_require_file();
/// assert_eq!(a.cache_key(), b.cache_key());
/// assert_eq!(a.cache_key(), " Sx3 Fi");
/// ```
///
/// The cache key is not serialized; it is recomputed from the constraints
/// when a filter is deserialized.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "FilterFields")]
pub struct ResourceFilter {
    state: Option<Constraint<ResourceState>>,
    flags: Option<Constraint<ResourceFlags>>,
    type_id: Option<Constraint<i32>>,
    only_folders: Option<bool>,
    last_modified: Option<TimeRange>,
    expire: Option<TimeRange>,
    release: Option<TimeRange>,
    timerange: bool,
    visible: bool,
    #[serde(skip)]
    cache_key: String,
}

/// Serialized form of a [`ResourceFilter`].
#[derive(Default, Deserialize)]
#[serde(default)]
struct FilterFields {
    state: Option<Constraint<ResourceState>>,
    flags: Option<Constraint<ResourceFlags>>,
    type_id: Option<Constraint<i32>>,
    only_folders: Option<bool>,
    last_modified: Option<TimeRange>,
    expire: Option<TimeRange>,
    release: Option<TimeRange>,
    timerange: bool,
    visible: bool,
}

impl From<FilterFields> for ResourceFilter {
    fn from(fields: FilterFields) -> Self {
        ResourceFilter::unfiltered().with(|f| {
            f.state = fields.state;
            f.flags = fields.flags;
            f.type_id = fields.type_id;
            f.only_folders = fields.only_folders;
            f.last_modified = fields.last_modified;
            f.expire = fields.expire;
            f.release = fields.release;
            f.timerange = fields.timerange;
            f.visible = fields.visible;
        })
    }
}

impl ResourceFilter {
    /// A filter without constraints. Unlike [`ALL`] it takes the full
    /// evaluation path.
    pub const fn unfiltered() -> Self {
        Self {
            state: None,
            flags: None,
            type_id: None,
            only_folders: None,
            last_modified: None,
            expire: None,
            release: None,
            timerange: false,
            visible: false,
            cache_key: String::new(),
        }
    }

    fn with(&self, update: impl FnOnce(&mut ResourceFilter)) -> ResourceFilter {
        let mut filter = self.clone();
        update(&mut filter);
        filter.cache_key = filter.compute_cache_key();
        filter
    }

    pub fn add_require_state(&self, state: ResourceState) -> ResourceFilter {
        self.with(|f| f.state = Some(Constraint::Required(state)))
    }

    pub fn add_exclude_state(&self, state: ResourceState) -> ResourceFilter {
        self.with(|f| f.state = Some(Constraint::Excluded(state)))
    }

    /// Require all of `flags` to be set.
    pub fn add_require_flags(&self, flags: ResourceFlags) -> ResourceFilter {
        self.with(|f| f.flags = Some(Constraint::Required(flags)))
    }

    /// Require none of `flags` to be set.
    pub fn add_exclude_flags(&self, flags: ResourceFlags) -> ResourceFilter {
        self.with(|f| f.flags = Some(Constraint::Excluded(flags)))
    }

    pub fn add_require_type(&self, type_id: i32) -> ResourceFilter {
        self.with(|f| f.type_id = Some(Constraint::Required(type_id)))
    }

    pub fn add_exclude_type(&self, type_id: i32) -> ResourceFilter {
        self.with(|f| f.type_id = Some(Constraint::Excluded(type_id)))
    }

    pub fn add_require_folder(&self) -> ResourceFilter {
        self.with(|f| f.only_folders = Some(true))
    }

    pub fn add_require_file(&self) -> ResourceFilter {
        self.with(|f| f.only_folders = Some(false))
    }

    pub fn add_require_last_modified_after(&self, time: i64) -> ResourceFilter {
        self.with(|f| f.last_modified.get_or_insert(TimeRange::OPEN).after = time)
    }

    pub fn add_require_last_modified_before(&self, time: i64) -> ResourceFilter {
        self.with(|f| f.last_modified.get_or_insert(TimeRange::OPEN).before = time)
    }

    pub fn add_require_expire_after(&self, time: i64) -> ResourceFilter {
        self.with(|f| f.expire.get_or_insert(TimeRange::OPEN).after = time)
    }

    pub fn add_require_expire_before(&self, time: i64) -> ResourceFilter {
        self.with(|f| f.expire.get_or_insert(TimeRange::OPEN).before = time)
    }

    pub fn add_require_release_after(&self, time: i64) -> ResourceFilter {
        self.with(|f| f.release.get_or_insert(TimeRange::OPEN).after = time)
    }

    pub fn add_require_release_before(&self, time: i64) -> ResourceFilter {
        self.with(|f| f.release.get_or_insert(TimeRange::OPEN).before = time)
    }

    /// Require the resource to be inside its validity window at request time.
    pub fn add_require_timerange(&self) -> ResourceFilter {
        self.with(|f| f.timerange = true)
    }

    /// Drop the validity window requirement.
    pub fn add_exclude_timerange(&self) -> ResourceFilter {
        self.with(|f| f.timerange = false)
    }

    /// Require the resource to be visible to the current user. Only recorded
    /// here; evaluated by the permission layer.
    pub fn add_require_visible(&self) -> ResourceFilter {
        self.with(|f| f.visible = true)
    }

    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    /// Returns `true` if this is the [`ALL`] sentinel itself.
    pub fn is_all(&self) -> bool {
        std::ptr::eq(self, &ALL)
    }

    pub fn requires_timerange(&self) -> bool {
        self.timerange
    }

    pub fn requires_visible(&self) -> bool {
        self.visible
    }

    /// Returns `true` unless deleted resources are filtered out.
    pub fn includes_deleted(&self) -> bool {
        match self.state {
            Some(Constraint::Excluded(state)) => !state.is_deleted(),
            Some(Constraint::Required(state)) => state.is_deleted(),
            None => true,
        }
    }

    pub fn state(&self) -> Option<Constraint<ResourceState>> {
        self.state
    }

    pub fn only_folders(&self) -> Option<bool> {
        self.only_folders
    }

    /// Evaluate the filter for `resource`, short-circuiting on the first
    /// failing constraint.
    pub fn is_valid(&self, context: &RequestContext, resource: &Resource) -> bool {
        if self.is_all() {
            return true;
        }
        match self.state {
            Some(Constraint::Required(s)) if resource.state() != s => return false,
            Some(Constraint::Excluded(s)) if resource.state() == s => return false,
            _ => {}
        }
        match self.flags {
            Some(Constraint::Required(f)) if !resource.flags().contains(f) => return false,
            Some(Constraint::Excluded(f)) if resource.flags().intersects(f) => return false,
            _ => {}
        }
        match self.type_id {
            Some(Constraint::Required(t)) if resource.type_id() != t => return false,
            Some(Constraint::Excluded(t)) if resource.type_id() == t => return false,
            _ => {}
        }
        if self.only_folders.is_some_and(|folders| resource.is_folder() != folders) {
            return false;
        }
        let outside = |range: Option<TimeRange>, time: i64| range.is_some_and(|r| !r.contains(time));
        if outside(self.last_modified, resource.date_last_modified()) {
            return false;
        }
        if outside(self.expire, resource.date_expired()) {
            return false;
        }
        if outside(self.release, resource.date_released()) {
            return false;
        }
        !self.timerange || resource.is_valid(context.request_time)
    }

    fn compute_cache_key(&self) -> String {
        let mut key = String::new();
        if self.visible {
            key.push_str(" Vi");
        }
        if self.timerange {
            key.push_str(" Ti");
        }
        if let Some(c) = &self.state {
            let (tag, mode, state) = c.token('S');
            let _ = write!(key, " {tag}{mode}{}", state.code());
        }
        if let Some(c) = &self.flags {
            let (tag, mode, flags) = c.token('F');
            let _ = write!(key, " {tag}{mode}{}", flags.bits());
        }
        if let Some(c) = &self.type_id {
            let (tag, mode, type_id) = c.token('T');
            let _ = write!(key, " {tag}{mode}{type_id}");
        }
        match self.only_folders {
            Some(true) => key.push_str(" Fo"),
            Some(false) => key.push_str(" Fi"),
            None => {}
        }
        for (tag, range) in [
            ("Lt", self.last_modified),
            ("Ex", self.expire),
            ("Re", self.release),
        ] {
            if let Some(r) = range {
                let _ = write!(key, " {tag}{}-{}", r.after, r.before);
            }
        }
        key
    }
}

impl Default for ResourceFilter {
    fn default() -> Self {
        Self::unfiltered()
    }
}

impl PartialEq for ResourceFilter {
    fn eq(&self, other: &Self) -> bool {
        self.cache_key == other.cache_key
    }
}

impl Eq for ResourceFilter {}

impl Hash for ResourceFilter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cache_key.hash(state);
    }
}

impl fmt::Display for ResourceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cache_key.is_empty() {
            f.write_str("[unfiltered]")
        } else {
            write!(f, "[{}]", self.cache_key.trim_start())
        }
    }
}
