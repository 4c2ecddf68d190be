//! Identifier substitution in text.

use std::borrow::Cow;
use std::sync::LazyLock;

use arbor_types::StructureId;
use regex::{Captures, Regex};

use crate::translation::TranslationTable;

/// Matches a hyphenated UUID.
pub static UUID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .expect("valid uuid regex")
});

/// Replace every match of `pattern` for which `replace` returns a value.
/// Other matches are kept as they are.
pub fn substitute<'t, F>(pattern: &Regex, text: &'t str, replace: F) -> Cow<'t, str>
where
    F: Fn(&str) -> Option<String>,
{
    pattern.replace_all(text, |caps: &Captures<'_>| {
        let found = &caps[0];
        replace(found).unwrap_or_else(|| found.to_string())
    })
}

/// Replace every source structure id in `text` by the structure id of its
/// translated target.
pub fn translate_ids<'t>(text: &'t str, table: &TranslationTable) -> Cow<'t, str> {
    substitute(&UUID_PATTERN, text, |found| {
        let id = found.parse::<StructureId>().ok()?;
        table.by_id(id).map(|target| target.structure_id().to_string())
    })
}
