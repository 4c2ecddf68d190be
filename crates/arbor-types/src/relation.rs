//! Typed, directed edges between resources.
//!
//! A relation is either defined inside the source's content (a link the type
//! layer parses out of the document) or structural only (recorded without any
//! textual counterpart). [`RelationType::LocaleVariant`] is structural but is
//! never propagated by copy operations and has to be re-created explicitly.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::ids::StructureId;
use crate::path;
use crate::resource::Resource;

/// The kind of a relation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RelationType {
    Hyperlink,
    EmbeddedImage,
    EmbeddedObject,
    XmlStrong,
    XmlWeak,
    JspStrong,
    JspWeak,
    /// Schema definition used by an XML content.
    Xsd,
    /// Resource assigned to an organizational unit.
    OuResource,
    /// Category assignment.
    Category,
    /// Links the locale variants of one document.
    LocaleVariant,
}

impl RelationType {
    pub const ALL: [RelationType; 11] = [
        Self::Hyperlink,
        Self::EmbeddedImage,
        Self::EmbeddedObject,
        Self::XmlStrong,
        Self::XmlWeak,
        Self::JspStrong,
        Self::JspWeak,
        Self::Xsd,
        Self::OuResource,
        Self::Category,
        Self::LocaleVariant,
    ];

    /// Canonical persisted name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Hyperlink => "A",
            Self::EmbeddedImage => "IMG",
            Self::EmbeddedObject => "OBJECT",
            Self::XmlStrong => "XML_STRONG",
            Self::XmlWeak => "XML_WEAK",
            Self::JspStrong => "JSP_STRONG",
            Self::JspWeak => "JSP_WEAK",
            Self::Xsd => "XSD",
            Self::OuResource => "OU_RESOURCE",
            Self::Category => "CATEGORY",
            Self::LocaleVariant => "LOCALE_VARIANT",
        }
    }

    /// Returns `true` if the relation is parsed out of the source's content.
    pub fn is_defined_in_content(self) -> bool {
        matches!(
            self,
            Self::Hyperlink
                | Self::EmbeddedImage
                | Self::EmbeddedObject
                | Self::XmlStrong
                | Self::XmlWeak
                | Self::JspStrong
                | Self::JspWeak
                | Self::Xsd
        )
    }

    /// Strong relations make the target a publish dependency of the source.
    pub fn is_strong(self) -> bool {
        matches!(
            self,
            Self::EmbeddedImage
                | Self::EmbeddedObject
                | Self::XmlStrong
                | Self::JspStrong
                | Self::Xsd
        )
    }

    pub fn is_locale_variant(self) -> bool {
        self == Self::LocaleVariant
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RelationType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| TypeError::UnknownRelationType(s.to_string()))
    }
}

/// A directed, typed edge from `source` to `target`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    pub source_id: StructureId,
    pub source_path: String,
    pub target_id: StructureId,
    pub target_path: String,
    pub relation_type: RelationType,
}

impl Relation {
    pub fn new(source: &Resource, target: &Resource, relation_type: RelationType) -> Self {
        Self {
            source_id: source.structure_id(),
            source_path: source.root_path().to_string(),
            target_id: target.structure_id(),
            target_path: target.root_path().to_string(),
            relation_type,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -[{}]-> {}",
            self.source_path, self.relation_type, self.target_path
        )
    }
}

/// A path constraint of a [`RelationFilter`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMatch {
    pub path: String,
    /// Also match everything below `path`.
    pub include_subresources: bool,
}

impl PathMatch {
    pub fn matches(&self, candidate: &str) -> bool {
        if self.include_subresources {
            path::is_sub_path(&self.path, candidate)
        } else {
            candidate == self.path
        }
    }
}

/// Selects relations by endpoint, type, and origin.
///
/// Every `with_*` method narrows the filter. An empty filter matches every
/// relation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationFilter {
    source_path: Option<PathMatch>,
    target_path: Option<PathMatch>,
    source_id: Option<StructureId>,
    target_id: Option<StructureId>,
    types: Option<BTreeSet<RelationType>>,
    in_content: Option<bool>,
}

impl RelationFilter {
    /// Matches every relation.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_source_path(mut self, path: impl Into<String>, include_subresources: bool) -> Self {
        self.source_path = Some(PathMatch {
            path: path.into(),
            include_subresources,
        });
        self
    }

    pub fn with_target_path(mut self, path: impl Into<String>, include_subresources: bool) -> Self {
        self.target_path = Some(PathMatch {
            path: path.into(),
            include_subresources,
        });
        self
    }

    pub fn with_source_id(mut self, id: StructureId) -> Self {
        self.source_id = Some(id);
        self
    }

    pub fn with_target_id(mut self, id: StructureId) -> Self {
        self.target_id = Some(id);
        self
    }

    /// Add a relation type to the accepted set.
    pub fn with_type(mut self, relation_type: RelationType) -> Self {
        self.types
            .get_or_insert_with(BTreeSet::new)
            .insert(relation_type);
        self
    }

    /// Only relations defined in the source's content.
    pub fn only_in_content(mut self) -> Self {
        self.in_content = Some(true);
        self
    }

    /// Only structural relations.
    pub fn only_structural(mut self) -> Self {
        self.in_content = Some(false);
        self
    }

    pub fn matches(&self, relation: &Relation) -> bool {
        if let Some(m) = &self.source_path {
            if !m.matches(&relation.source_path) {
                return false;
            }
        }
        if let Some(m) = &self.target_path {
            if !m.matches(&relation.target_path) {
                return false;
            }
        }
        if self.source_id.is_some_and(|id| id != relation.source_id) {
            return false;
        }
        if self.target_id.is_some_and(|id| id != relation.target_id) {
            return false;
        }
        if let Some(types) = &self.types {
            if !types.contains(&relation.relation_type) {
                return false;
            }
        }
        if let Some(in_content) = self.in_content {
            if relation.relation_type.is_defined_in_content() != in_content {
                return false;
            }
        }
        true
    }
}
