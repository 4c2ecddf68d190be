use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// Kind of lock held on a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockKind {
    Unlocked,
    /// Held directly on the path.
    Exclusive,
    /// Held on an ancestor folder.
    Inherited,
}

/// Lock state of a path as reported by the repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    pub path: String,
    pub owner: Option<UserId>,
    pub kind: LockKind,
}

impl Lock {
    pub fn unlocked(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            owner: None,
            kind: LockKind::Unlocked,
        }
    }

    pub fn exclusive(path: impl Into<String>, owner: UserId) -> Self {
        Self {
            path: path.into(),
            owner: Some(owner),
            kind: LockKind::Exclusive,
        }
    }

    pub fn inherited(path: impl Into<String>, owner: UserId) -> Self {
        Self {
            path: path.into(),
            owner: Some(owner),
            kind: LockKind::Inherited,
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.kind == LockKind::Unlocked
    }

    pub fn is_inherited(&self) -> bool {
        self.kind == LockKind::Inherited
    }

    pub fn is_owned_by(&self, user: UserId) -> bool {
        !self.is_unlocked() && self.owner == Some(user)
    }
}
