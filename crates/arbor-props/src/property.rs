//! The [`Property`] value type.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::{PropertyError, Result};

/// A value equal to this marks the value for deletion.
pub const DELETE_VALUE: &str = "";

/// Which of the two values a write targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyScope {
    /// Scoped to one sibling.
    Structure,
    /// Shared by all siblings of the content.
    Resource,
}

/// A named metadata entry with a structure value and a resource value.
///
/// The compound [`value`](Property::value) is the structure value if set,
/// else the resource value. An empty string is a deletion marker and does not
/// count as a set value.
///
/// Once frozen (e.g. when handed out by a repository), every mutator fails
/// with [`PropertyError::Frozen`] before writing anything. Use
/// [`unfrozen_copy`](Property::unfrozen_copy) to obtain an editable copy.
///
/// Properties compare and order by name only; use
/// [`is_identical`](Property::is_identical) to compare values too.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Property {
    name: String,
    structure_value: Option<String>,
    resource_value: Option<String>,
    #[serde(default)]
    frozen: bool,
    #[serde(default)]
    auto_create_definition: bool,
    #[serde(default)]
    origin: Option<String>,
}

/// Validate a property name: non-empty, ASCII alphanumerics plus `.`, `_`, `-`.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(PropertyError::InvalidName {
            name: name.to_string(),
            reason: "name must not be empty".into(),
        });
    }
    if let Some(ch) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Err(PropertyError::InvalidName {
            name: name.to_string(),
            reason: format!("contains forbidden character: {ch:?}"),
        });
    }
    Ok(())
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| v != DELETE_VALUE)
}

impl Property {
    /// An empty, mutable property.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            structure_value: None,
            resource_value: None,
            frozen: false,
            auto_create_definition: false,
            origin: None,
        })
    }

    /// A mutable property with both raw values given.
    pub fn with_values(
        name: impl Into<String>,
        structure_value: Option<&str>,
        resource_value: Option<&str>,
    ) -> Result<Self> {
        let mut property = Self::new(name)?;
        property.structure_value = structure_value.map(str::to_string);
        property.resource_value = resource_value.map(str::to_string);
        Ok(property)
    }

    /// Find a property by name in a list.
    pub fn find<'a>(name: &str, properties: &'a [Property]) -> Option<&'a Property> {
        properties.iter().find(|p| p.name == name)
    }

    /// Collect the compound values of a list into a name → value map.
    ///
    /// Properties without a set value are left out.
    pub fn to_map(properties: &[Property]) -> BTreeMap<String, String> {
        properties
            .iter()
            .filter_map(|p| p.value().map(|v| (p.name.clone(), v.to_string())))
            .collect()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw structure value, including a deletion marker.
    pub fn structure_value(&self) -> Option<&str> {
        self.structure_value.as_deref()
    }

    /// The raw resource value, including a deletion marker.
    pub fn resource_value(&self) -> Option<&str> {
        self.resource_value.as_deref()
    }

    pub fn is_structure_value_set(&self) -> bool {
        is_set(&self.structure_value)
    }

    pub fn is_resource_value_set(&self) -> bool {
        is_set(&self.resource_value)
    }

    /// Returns `true` if either value is set.
    pub fn has_value(&self) -> bool {
        self.is_structure_value_set() || self.is_resource_value_set()
    }

    /// Returns `true` if every present value is a deletion marker.
    pub fn is_deleted(&self) -> bool {
        let marker = |v: &Option<String>| v.as_deref().map_or(true, |v| v == DELETE_VALUE);
        (self.structure_value.is_some() || self.resource_value.is_some())
            && marker(&self.structure_value)
            && marker(&self.resource_value)
    }

    /// The structure value if set, else the resource value if set.
    pub fn value(&self) -> Option<&str> {
        if self.is_structure_value_set() {
            self.structure_value.as_deref()
        } else if self.is_resource_value_set() {
            self.resource_value.as_deref()
        } else {
            None
        }
    }

    /// The compound value, or `default` if neither value is set.
    pub fn value_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.value().unwrap_or(default)
    }

    pub fn value_list(&self) -> Option<Vec<String>> {
        self.value().map(codec::decode_list)
    }

    pub fn structure_value_list(&self) -> Option<Vec<String>> {
        self.structure_value.as_deref().map(codec::decode_list)
    }

    pub fn resource_value_list(&self) -> Option<Vec<String>> {
        self.resource_value.as_deref().map(codec::decode_list)
    }

    pub fn value_map(&self) -> Option<IndexMap<String, String>> {
        self.value().map(codec::decode_map)
    }

    pub fn structure_value_map(&self) -> Option<IndexMap<String, String>> {
        self.structure_value.as_deref().map(codec::decode_map)
    }

    pub fn resource_value_map(&self) -> Option<IndexMap<String, String>> {
        self.resource_value.as_deref().map(codec::decode_map)
    }

    /// Root path of the resource the value was read from, if known.
    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    /// Whether persistence should create a missing property definition
    /// instead of failing.
    pub fn auto_create_definition(&self) -> bool {
        self.auto_create_definition
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Returns `true` if name and both raw values are equal.
    pub fn is_identical(&self, other: &Property) -> bool {
        self.name == other.name
            && self.structure_value == other.structure_value
            && self.resource_value == other.resource_value
    }

    /// An editable copy of this property.
    pub fn unfrozen_copy(&self) -> Property {
        Property {
            frozen: false,
            ..self.clone()
        }
    }

    /// Consume and return a frozen property.
    pub fn frozen(mut self) -> Property {
        self.frozen = true;
        self
    }

    fn check_frozen(&self) -> Result<()> {
        if self.frozen {
            return Err(PropertyError::Frozen {
                name: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Freeze or unfreeze. A frozen property can be re-frozen, never thawed.
    pub fn set_frozen(&mut self, frozen: bool) -> Result<()> {
        if !frozen {
            self.check_frozen()?;
        }
        self.frozen = frozen;
        Ok(())
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        self.check_frozen()?;
        let name = name.into();
        validate_name(&name)?;
        self.name = name;
        Ok(())
    }

    pub fn set_structure_value(&mut self, value: Option<String>) -> Result<()> {
        self.check_frozen()?;
        self.structure_value = value;
        Ok(())
    }

    pub fn set_resource_value(&mut self, value: Option<String>) -> Result<()> {
        self.check_frozen()?;
        self.resource_value = value;
        Ok(())
    }

    /// Set the value of the given scope.
    pub fn set_value(&mut self, value: impl Into<String>, scope: PropertyScope) -> Result<()> {
        let value = Some(value.into());
        match scope {
            PropertyScope::Structure => self.set_structure_value(value),
            PropertyScope::Resource => self.set_resource_value(value),
        }
    }

    /// Mark the structure value for deletion.
    pub fn delete_structure_value(&mut self) -> Result<()> {
        self.set_structure_value(Some(DELETE_VALUE.to_string()))
    }

    /// Mark the resource value for deletion.
    pub fn delete_resource_value(&mut self) -> Result<()> {
        self.set_resource_value(Some(DELETE_VALUE.to_string()))
    }

    /// Set the structure value from a list. An empty list clears the value.
    pub fn set_structure_value_list<S: AsRef<str>>(&mut self, values: &[S]) -> Result<()> {
        self.set_structure_value(encode_nonempty_list(values))
    }

    /// Set the resource value from a list. An empty list clears the value.
    pub fn set_resource_value_list<S: AsRef<str>>(&mut self, values: &[S]) -> Result<()> {
        self.set_resource_value(encode_nonempty_list(values))
    }

    /// Set the structure value from a map. An empty map clears the value.
    pub fn set_structure_value_map(&mut self, map: &IndexMap<String, String>) -> Result<()> {
        self.set_structure_value(encode_nonempty_map(map))
    }

    /// Set the resource value from a map. An empty map clears the value.
    pub fn set_resource_value_map(&mut self, map: &IndexMap<String, String>) -> Result<()> {
        self.set_resource_value(encode_nonempty_map(map))
    }

    pub fn set_auto_create_definition(&mut self, auto_create: bool) -> Result<()> {
        self.check_frozen()?;
        self.auto_create_definition = auto_create;
        Ok(())
    }

    pub fn set_origin(&mut self, origin: impl Into<String>) -> Result<()> {
        self.check_frozen()?;
        self.origin = Some(origin.into());
        Ok(())
    }
}

fn encode_nonempty_list<S: AsRef<str>>(values: &[S]) -> Option<String> {
    (!values.is_empty()).then(|| codec::encode_list(values))
}

fn encode_nonempty_map(map: &IndexMap<String, String>) -> Option<String> {
    (!map.is_empty()).then(|| codec::encode_map(map))
}

impl PartialEq for Property {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Property {}

impl PartialOrd for Property {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Property {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (structure: {:?}, resource: {:?})",
            self.name, self.structure_value, self.resource_value
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prop(structure: Option<&str>, resource: Option<&str>) -> Property {
        Property::with_values("Title", structure, resource).unwrap()
    }

    #[test]
    fn structure_value_wins() {
        let p = prop(Some("mine"), Some("shared"));
        assert_eq!(p.value(), Some("mine"));
        assert_eq!(p.value(), p.structure_value());
    }

    #[test]
    fn resource_value_is_fallback() {
        let p = prop(None, Some("shared"));
        assert_eq!(p.value(), Some("shared"));
        assert_eq!(p.value(), p.resource_value());
    }

    #[test]
    fn deletion_marker_is_not_a_value() {
        let p = prop(Some(DELETE_VALUE), Some("shared"));
        assert_eq!(p.value(), Some("shared"));
        assert!(!p.is_deleted());

        let gone = prop(Some(DELETE_VALUE), Some(DELETE_VALUE));
        assert_eq!(gone.value(), None);
        assert!(gone.is_deleted());
        assert!(!gone.has_value());
        assert!(!prop(None, None).is_deleted());
    }

    #[test]
    fn default_when_unset() {
        assert_eq!(prop(None, None).value_or("fallback"), "fallback");
    }

    #[test]
    fn list_and_map_accessors() {
        let mut p = Property::new("keywords").unwrap();
        p.set_structure_value_list(&["a", "b|c"]).unwrap();
        assert_eq!(p.structure_value(), Some("a|b%(ld)c"));
        assert_eq!(p.value_list().unwrap(), vec!["a", "b|c"]);

        let mut map = IndexMap::new();
        map.insert("lang".to_string(), "en".to_string());
        p.set_resource_value_map(&map).unwrap();
        assert_eq!(p.resource_value(), Some("lang=en"));
        assert_eq!(p.resource_value_map().unwrap(), map);

        p.set_structure_value_list::<&str>(&[]).unwrap();
        assert_eq!(p.structure_value(), None);
    }

    #[test]
    fn frozen_rejects_every_mutator() {
        let mut p = prop(Some("a"), None).frozen();
        assert!(p.is_frozen());
        assert!(matches!(
            p.set_structure_value(Some("b".into())),
            Err(PropertyError::Frozen { .. })
        ));
        assert!(p.set_resource_value(None).is_err());
        assert!(p.set_value("x", PropertyScope::Resource).is_err());
        assert!(p.delete_structure_value().is_err());
        assert!(p.delete_resource_value().is_err());
        assert!(p.set_structure_value_list(&["x"]).is_err());
        assert!(p.set_resource_value_list(&["x"]).is_err());
        assert!(p.set_structure_value_map(&IndexMap::new()).is_err());
        assert!(p.set_resource_value_map(&IndexMap::new()).is_err());
        assert!(p.set_name("Other").is_err());
        assert!(p.set_auto_create_definition(true).is_err());
        assert!(p.set_origin("/x").is_err());
        assert!(p.set_frozen(false).is_err());

        // nothing was written
        assert_eq!(p.structure_value(), Some("a"));
        assert_eq!(p.name(), "Title");

        // re-freezing is allowed
        assert!(p.set_frozen(true).is_ok());
    }

    #[test]
    fn unfrozen_copy_is_editable() {
        let frozen = prop(Some("a"), None).frozen();
        let mut copy = frozen.unfrozen_copy();
        copy.set_structure_value(Some("b".into())).unwrap();
        assert_eq!(copy.value(), Some("b"));
        assert_eq!(frozen.value(), Some("a"));
    }

    #[test]
    fn equality_by_name_identity_by_values() {
        let a = prop(Some("x"), None);
        let b = prop(Some("y"), None);
        assert_eq!(a, b);
        assert!(!a.is_identical(&b));
        assert!(a.is_identical(&a.clone()));
    }

    #[test]
    fn name_validation() {
        assert!(Property::new("content-encoding").is_ok());
        assert!(Property::new("template.elements").is_ok());
        assert!(Property::new("").is_err());
        assert!(Property::new("bad name").is_err());
        assert!(Property::new("bad|name").is_err());
    }

    #[test]
    fn find_and_to_map() {
        let list = vec![
            Property::with_values("Title", Some("Home"), None).unwrap(),
            Property::with_values("Description", None, Some("shared")).unwrap(),
            Property::with_values("Keywords", Some(DELETE_VALUE), None).unwrap(),
        ];
        assert_eq!(Property::find("Description", &list).unwrap().value(), Some("shared"));
        assert!(Property::find("Missing", &list).is_none());

        let map = Property::to_map(&list);
        assert_eq!(map.len(), 2);
        assert_eq!(map["Title"], "Home");
    }

    #[test]
    fn serde_roundtrip() {
        let p = prop(Some("a"), Some("b")).frozen();
        let json = serde_json::to_string(&p).unwrap();
        let parsed: Property = serde_json::from_str(&json).unwrap();
        assert!(parsed.is_identical(&p));
        assert!(parsed.is_frozen());
    }
}
