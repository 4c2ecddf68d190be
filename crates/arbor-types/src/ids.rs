//! UUID-backed identifiers.
//!
//! A resource carries two ids: the [`StructureId`] identifies one name-slot
//! (one sibling), the [`ResourceId`] identifies the content body shared by all
//! siblings. Users, groups, and projects are identified the same way.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Generate a new time-ordered id (UUID v7).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// The nil id. Never identifies a real entity.
            pub const fn nil() -> Self {
                Self(Uuid::nil())
            }

            /// Create from an existing UUID.
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Create from a `u128`, mostly useful for well-known constants.
            pub const fn from_u128(value: u128) -> Self {
                Self(Uuid::from_u128(value))
            }

            /// The underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Returns `true` if this is the nil id.
            pub fn is_nil(&self) -> bool {
                self.0.is_nil()
            }

            /// Short representation (first 8 characters of the UUID).
            pub fn short_id(&self) -> String {
                self.0.to_string()[..8].to_string()
            }

            /// Reject the nil id where a real one is required.
            pub fn require_real(self, field: &'static str) -> Result<Self, TypeError> {
                if self.is_nil() {
                    return Err(TypeError::NilId { field });
                }
                Ok(self)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.short_id())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|e| TypeError::InvalidId(format!("{s:?}: {e}")))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }
    };
}

uuid_id!(
    /// Identifies one name-slot of content. Unique per sibling.
    StructureId
);
uuid_id!(
    /// Identifies a content body, shared by all siblings of that content.
    ResourceId
);
uuid_id!(
    /// Identifies a principal.
    UserId
);
uuid_id!(
    /// Identifies a group of principals.
    GroupId
);
uuid_id!(
    /// Identifies a project (workspace).
    ProjectId
);
