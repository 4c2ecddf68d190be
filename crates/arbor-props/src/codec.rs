//! Text encoding of list and map property values.
//!
//! Lists are joined with `|`. Maps are `|`-joined `key=value` entries, split on
//! the first `=`. Literal delimiters inside elements are replaced with fixed
//! placeholder tokens before joining and restored when decoding. This format
//! is persisted and must round-trip exactly.

use std::borrow::Cow;

use indexmap::IndexMap;

/// Separates list elements and map entries.
pub const LIST_DELIMITER: char = '|';

/// Separates a map key from its value.
pub const MAP_DELIMITER: char = '=';

/// Stands in for a literal `|` inside an element.
pub const LIST_DELIMITER_PLACEHOLDER: &str = "%(ld)";

/// Stands in for a literal `=` inside a map key or value.
pub const MAP_DELIMITER_PLACEHOLDER: &str = "%(kv)";

fn escape<'a>(value: &'a str, delimiter: char, placeholder: &str) -> Cow<'a, str> {
    if value.contains(delimiter) {
        Cow::Owned(value.replace(delimiter, placeholder))
    } else {
        Cow::Borrowed(value)
    }
}

fn unescape<'a>(value: Cow<'a, str>, delimiter: char, placeholder: &str) -> Cow<'a, str> {
    if value.contains(placeholder) {
        Cow::Owned(value.replace(placeholder, delimiter.encode_utf8(&mut [0; 4])))
    } else {
        value
    }
}

/// Join list elements, escaping embedded `|`.
///
/// ```
/// use arbor_props::codec::{decode_list, encode_list};
///
/// let encoded = encode_list(&["a", "b|c"]);
/// assert_eq!(encoded, "a|b%(ld)c");
/// assert_eq!(decode_list(&encoded), vec!["a", "b|c"]);
/// ```
pub fn encode_list<S: AsRef<str>>(values: &[S]) -> String {
    let mut out = String::new();
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            out.push(LIST_DELIMITER);
        }
        out.push_str(&escape(value.as_ref(), LIST_DELIMITER, LIST_DELIMITER_PLACEHOLDER));
    }
    out
}

/// Split an encoded list. The empty string decodes to an empty list.
pub fn decode_list(value: &str) -> Vec<String> {
    if value.is_empty() {
        return Vec::new();
    }
    value
        .split(LIST_DELIMITER)
        .map(|item| {
            unescape(Cow::Borrowed(item), LIST_DELIMITER, LIST_DELIMITER_PLACEHOLDER).into_owned()
        })
        .collect()
}

fn escape_map_part(part: &str) -> String {
    let part = escape(part, LIST_DELIMITER, LIST_DELIMITER_PLACEHOLDER);
    escape(&part, MAP_DELIMITER, MAP_DELIMITER_PLACEHOLDER).into_owned()
}

fn unescape_map_part(part: &str) -> String {
    let part = unescape(Cow::Borrowed(part), MAP_DELIMITER, MAP_DELIMITER_PLACEHOLDER);
    unescape(part, LIST_DELIMITER, LIST_DELIMITER_PLACEHOLDER).into_owned()
}

/// Join map entries in insertion order, escaping `|` and `=` in keys and values.
pub fn encode_map(map: &IndexMap<String, String>) -> String {
    let mut out = String::new();
    for (i, (key, value)) in map.iter().enumerate() {
        if i > 0 {
            out.push(LIST_DELIMITER);
        }
        out.push_str(&escape_map_part(key));
        out.push(MAP_DELIMITER);
        out.push_str(&escape_map_part(value));
    }
    out
}

/// Split an encoded map, preserving entry order.
///
/// Entries without a `=` carry no value and are skipped. A repeated key keeps
/// its first position and its last value.
pub fn decode_map(value: &str) -> IndexMap<String, String> {
    let mut map = IndexMap::new();
    if value.is_empty() {
        return map;
    }
    for entry in value.split(LIST_DELIMITER) {
        if let Some((key, value)) = entry.split_once(MAP_DELIMITER) {
            map.insert(unescape_map_part(key), unescape_map_part(value));
        }
    }
    map
}
