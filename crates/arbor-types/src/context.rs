use serde::{Deserialize, Serialize};

use crate::ids::UserId;
use crate::project::Project;
use crate::temporal;

/// Who performs an operation, in which project, and at what time.
///
/// Filters evaluate validity windows against `request_time`; lock checks
/// compare against `user`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestContext {
    pub user: UserId,
    pub project: Project,
    /// Milliseconds since epoch, or [`temporal::TIME_IGNORE`].
    pub request_time: i64,
    /// Prefix prepended to site-relative paths. Empty for root-path access.
    pub site_root: String,
}

impl RequestContext {
    /// A context at the current time with an empty site root.
    pub fn new(user: UserId, project: Project) -> Self {
        Self {
            user,
            project,
            request_time: temporal::now_millis(),
            site_root: String::new(),
        }
    }

    pub fn with_request_time(mut self, request_time: i64) -> Self {
        self.request_time = request_time;
        self
    }

    pub fn with_site_root(mut self, site_root: impl Into<String>) -> Self {
        self.site_root = site_root.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_online(&self) -> bool {
        self.project.is_online()
    }

    /// Turn a site-relative path into a root path.
    pub fn add_site_root(&self, path: &str) -> String {
        if self.site_root.is_empty() || path.starts_with(&format!("{}/", self.site_root)) {
            return path.to_string();
        }
        format!("{}{}", self.site_root, path)
    }

    /// Turn a root path into a site-relative path.
    pub fn remove_site_root(&self, root_path: &str) -> String {
        match root_path.strip_prefix(self.site_root.as_str()) {
            Some(rest) if !self.site_root.is_empty() && rest.starts_with('/') => rest.to_string(),
            _ => root_path.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::GroupId;

    fn context() -> RequestContext {
        let online = Project::online(UserId::new(), GroupId::new()).unwrap();
        RequestContext::new(UserId::new(), online)
    }

    #[test]
    fn site_root_roundtrip() {
        let ctx = context().with_site_root("/sites/default/");
        assert_eq!(ctx.add_site_root("/index.html"), "/sites/default/index.html");
        assert_eq!(
            ctx.add_site_root("/sites/default/index.html"),
            "/sites/default/index.html"
        );
        assert_eq!(ctx.remove_site_root("/sites/default/index.html"), "/index.html");
        assert_eq!(ctx.remove_site_root("/shared/x"), "/shared/x");
    }

    #[test]
    fn empty_site_root_is_identity() {
        let ctx = context();
        assert_eq!(ctx.add_site_root("/a/b"), "/a/b");
        assert_eq!(ctx.remove_site_root("/a/b"), "/a/b");
        assert!(ctx.is_online());
    }
}
