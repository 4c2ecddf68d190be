//! Root path utilities.
//!
//! Root paths are absolute and `/`-separated. Folder paths always end with a
//! trailing `/`, file paths never do. The workspace root is `/`.

use crate::error::{Result, TypeError};

/// The path separator.
pub const SEPARATOR: char = '/';

/// Characters that are forbidden anywhere in a resource name.
const FORBIDDEN_CHARS: &[char] = &['\\', ':', '*', '?', '"', '<', '>', '|'];

/// Returns `true` if `path` denotes a folder (ends with `/`).
pub fn is_folder_path(path: &str) -> bool {
    path.ends_with(SEPARATOR)
}

/// Append a trailing `/` if missing.
pub fn ensure_folder(path: &str) -> String {
    if is_folder_path(path) {
        path.to_string()
    } else {
        format!("{path}{SEPARATOR}")
    }
}

/// The last path component. Folder names keep their trailing `/`.
///
/// ```
/// use arbor_types::path::name;
///
/// assert_eq!(name("/a/b/c.txt"), "c.txt");
/// assert_eq!(name("/a/b/"), "b/");
/// assert_eq!(name("/"), "/");
/// ```
pub fn name(path: &str) -> &str {
    if path == "/" {
        return path;
    }
    let trimmed = path.trim_end_matches(SEPARATOR);
    match trimmed.rfind(SEPARATOR) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// The parent folder of `path`, or `None` for the root.
pub fn parent_folder(path: &str) -> Option<String> {
    if path.is_empty() || path == "/" {
        return None;
    }
    let trimmed = path.trim_end_matches(SEPARATOR);
    trimmed
        .rfind(SEPARATOR)
        .map(|idx| trimmed[..=idx].to_string())
}

/// The folder part of a path. For a folder path, the path itself.
pub fn folder_path(path: &str) -> &str {
    if is_folder_path(path) {
        return path;
    }
    match path.rfind(SEPARATOR) {
        Some(idx) => &path[..=idx],
        None => "",
    }
}

/// Depth of the folder containing `path`: `/` is 0, `/a/` and `/a/x` are 1.
pub fn path_level(path: &str) -> usize {
    folder_path(path).matches(SEPARATOR).count().saturating_sub(1)
}

/// The ancestor folder of `path` at the given level, if `path` is that deep.
pub fn path_part(path: &str, level: usize) -> Option<&str> {
    let folder = folder_path(path);
    let mut seen = 0;
    for (idx, ch) in folder.char_indices() {
        if ch == SEPARATOR {
            if seen == level {
                return Some(&folder[..=idx]);
            }
            seen += 1;
        }
    }
    None
}

/// Returns `true` if `child` is `parent` or lies below it.
///
/// For a file path `parent`, only equality counts.
pub fn is_sub_path(parent: &str, child: &str) -> bool {
    if is_folder_path(parent) {
        child.starts_with(parent)
    } else {
        child == parent
    }
}

/// `path` relative to `root`, or `None` if it does not lie below `root`.
pub fn relative_path<'a>(root: &str, path: &'a str) -> Option<&'a str> {
    if !is_sub_path(root, path) {
        return None;
    }
    Some(&path[root.len()..])
}

/// Join a folder path and a relative path.
pub fn join(folder: &str, relative: &str) -> String {
    let folder = ensure_folder(folder);
    format!("{folder}{}", relative.trim_start_matches(SEPARATOR))
}

/// Validate a single resource name (one path component, no separator).
pub fn validate_resource_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| TypeError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name must not be empty"));
    }
    if name == "." || name == ".." {
        return Err(invalid("name must not be '.' or '..'"));
    }
    if name.contains(SEPARATOR) {
        return Err(invalid("name must not contain '/'"));
    }
    if name.chars().any(char::is_control) {
        return Err(invalid("name must not contain control characters"));
    }
    if let Some(ch) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(TypeError::InvalidName {
            name: name.to_string(),
            reason: format!("contains forbidden character: {ch:?}"),
        });
    }
    Ok(())
}

/// Validate an absolute root path: leading `/`, every component a valid name.
pub fn validate_root_path(path: &str) -> Result<()> {
    if !path.starts_with(SEPARATOR) {
        return Err(TypeError::InvalidPath {
            path: path.to_string(),
            reason: "must start with '/'".into(),
        });
    }
    if path.contains("//") {
        return Err(TypeError::InvalidPath {
            path: path.to_string(),
            reason: "must not contain '//'".into(),
        });
    }
    path.trim_matches(SEPARATOR)
        .split(SEPARATOR)
        .filter(|c| !c.is_empty())
        .try_for_each(validate_resource_name)
        .map_err(|e| TypeError::InvalidPath {
            path: path.to_string(),
            reason: e.to_string(),
        })
}
