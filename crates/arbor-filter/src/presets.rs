//! Named filters.
//!
//! [`ALL`] is a plain `static` so that [`ResourceFilter::is_all`] can
//! recognise it by address. The other presets are built lazily from it.

use std::sync::LazyLock;

use arbor_types::ResourceState;

use crate::filter::ResourceFilter;

/// Accepts every resource without evaluating any constraint.
pub static ALL: ResourceFilter = ResourceFilter::unfiltered();

/// Every resource that differs from the online version.
pub static ALL_MODIFIED: LazyLock<ResourceFilter> =
    LazyLock::new(|| ResourceFilter::unfiltered().add_exclude_state(ResourceState::Unchanged));

/// Not deleted and inside the validity window.
pub static DEFAULT: LazyLock<ResourceFilter> = LazyLock::new(|| {
    ResourceFilter::unfiltered()
        .add_exclude_state(ResourceState::Deleted)
        .add_require_timerange()
});

pub static DEFAULT_FILES: LazyLock<ResourceFilter> =
    LazyLock::new(|| DEFAULT.add_require_file());

pub static DEFAULT_FOLDERS: LazyLock<ResourceFilter> =
    LazyLock::new(|| DEFAULT.add_require_folder());

/// Not deleted, regardless of the validity window.
pub static IGNORE_EXPIRATION: LazyLock<ResourceFilter> =
    LazyLock::new(|| ResourceFilter::unfiltered().add_exclude_state(ResourceState::Deleted));

pub static ONLY_VISIBLE: LazyLock<ResourceFilter> =
    LazyLock::new(|| ResourceFilter::unfiltered().add_require_visible());

pub static ONLY_VISIBLE_NO_DELETED: LazyLock<ResourceFilter> =
    LazyLock::new(|| IGNORE_EXPIRATION.add_require_visible());
