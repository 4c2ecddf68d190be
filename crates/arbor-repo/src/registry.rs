//! Resource type information, injected wherever type behaviour matters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{RepoError, RepoResult};

pub const TYPE_FOLDER: i32 = 0;
pub const TYPE_PLAIN: i32 = 1;
pub const TYPE_BINARY: i32 = 2;
pub const TYPE_IMAGE: i32 = 3;
pub const TYPE_JSP: i32 = 4;
pub const TYPE_XML_PAGE: i32 = 5;
pub const TYPE_XML_CONTENT: i32 = 6;

/// How the content of a type is decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// Parsed and re-serialized as XML.
    Xml,
    /// Decoded as text, never parsed.
    Script,
    Plain,
    Binary,
}

impl ContentKind {
    pub fn is_text(self) -> bool {
        !matches!(self, ContentKind::Binary)
    }
}

/// Static facts about one resource type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTypeInfo {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub folder: bool,
    pub kind: ContentKind,
    /// Links in the content are parsed into relations.
    #[serde(default)]
    pub link_parsing: bool,
}

impl ResourceTypeInfo {
    pub fn new(id: i32, name: impl Into<String>, kind: ContentKind) -> Self {
        Self {
            id,
            name: name.into(),
            folder: false,
            kind,
            link_parsing: false,
        }
    }

    pub fn folder(id: i32, name: impl Into<String>) -> Self {
        Self {
            folder: true,
            ..Self::new(id, name, ContentKind::Binary)
        }
    }

    pub fn with_link_parsing(mut self) -> Self {
        self.link_parsing = true;
        self
    }
}

/// Lookup of resource type behaviour by type id.
///
/// Unknown type ids are treated as binary, non-folder, without link parsing.
pub trait TypeRegistry: Send + Sync {
    fn type_info(&self, type_id: i32) -> Option<&ResourceTypeInfo>;

    fn is_folder_type(&self, type_id: i32) -> bool {
        self.type_info(type_id).is_some_and(|t| t.folder)
    }

    fn supports_link_parsing(&self, type_id: i32) -> bool {
        self.type_info(type_id).is_some_and(|t| t.link_parsing)
    }

    fn content_kind(&self, type_id: i32) -> ContentKind {
        self.type_info(type_id)
            .map_or(ContentKind::Binary, |t| t.kind)
    }
}

/// A [`TypeRegistry`] backed by a fixed map.
#[derive(Clone, Debug, Default)]
pub struct StaticTypeRegistry {
    types: BTreeMap<i32, ResourceTypeInfo>,
}

impl StaticTypeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in types: folder, plain, binary, image, jsp, xmlpage,
    /// xmlcontent.
    pub fn standard() -> Self {
        Self::new()
            .with_type(ResourceTypeInfo::folder(TYPE_FOLDER, "folder"))
            .with_type(ResourceTypeInfo::new(TYPE_PLAIN, "plain", ContentKind::Plain))
            .with_type(ResourceTypeInfo::new(TYPE_BINARY, "binary", ContentKind::Binary))
            .with_type(ResourceTypeInfo::new(TYPE_IMAGE, "image", ContentKind::Binary))
            .with_type(ResourceTypeInfo::new(TYPE_JSP, "jsp", ContentKind::Script).with_link_parsing())
            .with_type(
                ResourceTypeInfo::new(TYPE_XML_PAGE, "xmlpage", ContentKind::Xml).with_link_parsing(),
            )
            .with_type(
                ResourceTypeInfo::new(TYPE_XML_CONTENT, "xmlcontent", ContentKind::Xml)
                    .with_link_parsing(),
            )
    }

    /// Add or replace a type.
    pub fn with_type(mut self, info: ResourceTypeInfo) -> Self {
        self.types.insert(info.id, info);
        self
    }

    /// Add a type, failing if its id is taken.
    pub fn register(&mut self, info: ResourceTypeInfo) -> RepoResult<()> {
        if let Some(existing) = self.types.get(&info.id) {
            return Err(RepoError::AlreadyExists(format!(
                "resource type {} ({})",
                info.id, existing.name
            )));
        }
        self.types.insert(info.id, info);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn types(&self) -> impl Iterator<Item = &ResourceTypeInfo> {
        self.types.values()
    }
}

impl TypeRegistry for StaticTypeRegistry {
    fn type_info(&self, type_id: i32) -> Option<&ResourceTypeInfo> {
        self.types.get(&type_id)
    }
}
