//! Projects: the workspace scopes that control visibility.
//!
//! The "Online" project is the single published state and always exists.
//! Every other project is an offline working scope.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TypeError};
use crate::ids::{GroupId, ProjectId, UserId};
use crate::path;

/// Id of the always-existing published project.
pub const ONLINE_PROJECT_ID: ProjectId = ProjectId::from_u128(1);

/// Name of the always-existing published project.
pub const ONLINE_PROJECT_NAME: &str = "Online";

/// Kind of a project.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectType {
    Normal,
    /// Deleted automatically after it has been published.
    Temporary,
    /// Created by a workflow engine.
    Workflow,
}

impl ProjectType {
    pub fn code(self) -> i32 {
        match self {
            Self::Normal => 0,
            Self::Temporary => 1,
            Self::Workflow => 2,
        }
    }

    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(Self::Normal),
            1 => Ok(Self::Temporary),
            2 => Ok(Self::Workflow),
            other => Err(TypeError::UnknownProjectType(other)),
        }
    }
}

bitflags! {
    /// Flag bits of a project.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ProjectFlags: u32 {
        /// Not listed in project selectors.
        const HIDDEN = 4;
    }
}

/// A versioning scope.
///
/// Equality is by id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Project {
    id: ProjectId,
    name: String,
    description: String,
    owner_id: UserId,
    group_id: GroupId,
    manager_group_id: GroupId,
    flags: ProjectFlags,
    project_type: ProjectType,
    date_created: i64,
}

impl Project {
    /// Create a project. Owner and group ids must be real (non-nil) ids.
    pub fn new(
        id: ProjectId,
        name: impl Into<String>,
        owner_id: UserId,
        group_id: GroupId,
        manager_group_id: GroupId,
        project_type: ProjectType,
        date_created: i64,
    ) -> Result<Self> {
        let mut project = Self {
            id: id.require_real("project id")?,
            name: String::new(),
            description: String::new(),
            owner_id: owner_id.require_real("owner id")?,
            group_id: group_id.require_real("group id")?,
            manager_group_id: manager_group_id.require_real("manager group id")?,
            flags: ProjectFlags::empty(),
            project_type,
            date_created,
        };
        project.set_name(name)?;
        Ok(project)
    }

    /// The published project.
    pub fn online(owner_id: UserId, group_id: GroupId) -> Result<Self> {
        Self::new(
            ONLINE_PROJECT_ID,
            ONLINE_PROJECT_NAME,
            owner_id,
            group_id,
            group_id,
            ProjectType::Normal,
            0,
        )
    }

    /// Returns `true` if `path` is inside one of `project_resources`.
    ///
    /// Folder entries (ending in `/`) match every path below them, file
    /// entries only match exactly. Entries are checked from the end of the
    /// list backward.
    pub fn is_inside(project_resources: &[String], path: &str) -> bool {
        project_resources.iter().rev().any(|entry| {
            if path::is_folder_path(entry) {
                path.starts_with(entry.as_str())
            } else {
                path == entry
            }
        })
    }

    pub fn id(&self) -> ProjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn owner_id(&self) -> UserId {
        self.owner_id
    }

    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    pub fn manager_group_id(&self) -> GroupId {
        self.manager_group_id
    }

    pub fn flags(&self) -> ProjectFlags {
        self.flags
    }

    pub fn project_type(&self) -> ProjectType {
        self.project_type
    }

    pub fn date_created(&self) -> i64 {
        self.date_created
    }

    pub fn is_online(&self) -> bool {
        self.id == ONLINE_PROJECT_ID
    }

    pub fn is_hidden(&self) -> bool {
        self.flags.contains(ProjectFlags::HIDDEN)
    }

    pub fn is_temporary(&self) -> bool {
        self.project_type == ProjectType::Temporary
    }

    pub fn is_workflow(&self) -> bool {
        self.project_type == ProjectType::Workflow
    }

    /// Temporary projects are removed once published.
    pub fn is_delete_after_publishing(&self) -> bool {
        self.is_temporary()
    }

    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(TypeError::InvalidName {
                name,
                reason: "project name must not be empty".into(),
            });
        }
        self.name = name;
        Ok(())
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn set_owner_id(&mut self, owner_id: UserId) -> Result<()> {
        self.owner_id = owner_id.require_real("owner id")?;
        Ok(())
    }

    pub fn set_group_id(&mut self, group_id: GroupId) -> Result<()> {
        self.group_id = group_id.require_real("group id")?;
        Ok(())
    }

    pub fn set_manager_group_id(&mut self, group_id: GroupId) -> Result<()> {
        self.manager_group_id = group_id.require_real("manager group id")?;
        Ok(())
    }

    pub fn set_flags(&mut self, flags: ProjectFlags) {
        self.flags = flags;
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.flags.set(ProjectFlags::HIDDEN, hidden);
    }

    pub fn set_project_type(&mut self, project_type: ProjectType) {
        self.project_type = project_type;
    }
}

impl PartialEq for Project {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Project {}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id.short_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline(project_type: ProjectType) -> Project {
        Project::new(
            ProjectId::new(),
            "Offline",
            UserId::new(),
            GroupId::new(),
            GroupId::new(),
            project_type,
            1000,
        )
        .unwrap()
    }

    #[test]
    fn online_project_is_online() {
        let online = Project::online(UserId::new(), GroupId::new()).unwrap();
        assert!(online.is_online());
        assert_eq!(online.name(), ONLINE_PROJECT_NAME);
        assert!(!offline(ProjectType::Normal).is_online());
    }

    #[test]
    fn classification() {
        let temp = offline(ProjectType::Temporary);
        assert!(temp.is_temporary());
        assert!(temp.is_delete_after_publishing());
        assert!(!temp.is_workflow());
        assert!(offline(ProjectType::Workflow).is_workflow());
    }

    #[test]
    fn hidden_flag() {
        let mut p = offline(ProjectType::Normal);
        assert!(!p.is_hidden());
        p.set_hidden(true);
        assert!(p.is_hidden());
        p.set_hidden(false);
        assert!(!p.is_hidden());
    }

    #[test]
    fn is_inside_matches_folders_by_prefix_and_files_exactly() {
        let resources = vec!["/sites/a/".to_string(), "/shared/logo.png".to_string()];
        assert!(Project::is_inside(&resources, "/sites/a/"));
        assert!(Project::is_inside(&resources, "/sites/a/deep/page.html"));
        assert!(Project::is_inside(&resources, "/shared/logo.png"));
        assert!(!Project::is_inside(&resources, "/shared/logo.png.bak"));
        assert!(!Project::is_inside(&resources, "/sites/b/"));
        assert!(!Project::is_inside(&[], "/sites/a/"));
    }

    #[test]
    fn setters_reject_nil_ids() {
        let mut p = offline(ProjectType::Normal);
        assert_eq!(
            p.set_owner_id(UserId::nil()).unwrap_err(),
            TypeError::NilId { field: "owner id" }
        );
        assert!(p.set_group_id(GroupId::nil()).is_err());
        assert!(p.set_manager_group_id(GroupId::nil()).is_err());
        let owner = UserId::new();
        p.set_owner_id(owner).unwrap();
        assert_eq!(p.owner_id(), owner);
    }

    #[test]
    fn constructor_rejects_nil_ids_and_blank_names() {
        assert!(Project::new(
            ProjectId::nil(),
            "x",
            UserId::new(),
            GroupId::new(),
            GroupId::new(),
            ProjectType::Normal,
            0
        )
        .is_err());
        assert!(Project::new(
            ProjectId::new(),
            "  ",
            UserId::new(),
            GroupId::new(),
            GroupId::new(),
            ProjectType::Normal,
            0
        )
        .is_err());
    }

    #[test]
    fn type_codes() {
        assert_eq!(ProjectType::from_code(2).unwrap(), ProjectType::Workflow);
        assert_eq!(
            ProjectType::from_code(5).unwrap_err(),
            TypeError::UnknownProjectType(5)
        );
    }
}
