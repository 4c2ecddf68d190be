//! Property inheritance along the folder hierarchy.

use std::collections::BTreeMap;

use arbor_types::path;
use tracing::trace;

use crate::error::Result;
use crate::property::Property;

/// Read access to the properties stored directly on a resource.
///
/// Implemented by repositories. Lookups by a path with no resource behind it
/// return `Ok(None)` / an empty list, never an error.
pub trait PropertySource {
    /// The property `name` stored on the resource at `path`, without
    /// inheritance.
    fn local_property(&self, path: &str, name: &str) -> Result<Option<Property>>;

    /// All properties stored on the resource at `path`, without inheritance.
    fn local_properties(&self, path: &str) -> Result<Vec<Property>>;
}

/// `path` followed by its ancestors up to the root.
fn ancestry(start: &str) -> impl Iterator<Item = String> {
    std::iter::successors(Some(start.to_string()), |p| path::parent_folder(p))
}

/// Resolve `name` for the resource at `path`.
///
/// Without `search` only the resource itself is consulted. With `search` the
/// parent folders are walked towards the root and the first property that has
/// a value is returned whole; structure and resource values of different
/// levels are never merged. The returned property records its origin path.
pub fn resolve_property<S: PropertySource + ?Sized>(
    source: &S,
    path: &str,
    name: &str,
    search: bool,
) -> Result<Option<Property>> {
    let levels: Box<dyn Iterator<Item = String>> = if search {
        Box::new(ancestry(path))
    } else {
        Box::new(std::iter::once(path.to_string()))
    };
    for level in levels {
        if let Some(mut property) = source.local_property(&level, name)? {
            if property.has_value() {
                trace!(name, path, origin = %level, "resolved property");
                property.set_origin(level)?;
                return Ok(Some(property));
            }
        }
    }
    Ok(None)
}

/// The compound value of `name` at `path`, or `default`.
pub fn resolve_value<S: PropertySource + ?Sized>(
    source: &S,
    path: &str,
    name: &str,
    search: bool,
    default: &str,
) -> Result<String> {
    Ok(resolve_property(source, path, name, search)?
        .and_then(|p| p.value().map(str::to_string))
        .unwrap_or_else(|| default.to_string()))
}

/// All properties visible at `path`, sorted by name.
///
/// With `search`, each name resolves to its nearest level with a value.
pub fn resolve_all<S: PropertySource + ?Sized>(
    source: &S,
    path: &str,
    search: bool,
) -> Result<Vec<Property>> {
    let mut found: BTreeMap<String, Property> = BTreeMap::new();
    let levels: Box<dyn Iterator<Item = String>> = if search {
        Box::new(ancestry(path))
    } else {
        Box::new(std::iter::once(path.to_string()))
    };
    for level in levels {
        for mut property in source.local_properties(&level)? {
            if !property.has_value() || found.contains_key(property.name()) {
                continue;
            }
            property.set_origin(level.clone())?;
            found.insert(property.name().to_string(), property);
        }
    }
    Ok(found.into_values().collect())
}
