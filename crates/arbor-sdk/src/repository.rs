use std::sync::Arc;

use arbor_repo::{InMemoryRepository, ResourcePort, TypeRegistry};
use arbor_rewrite::{RewritePair, RewriteReport, SubtreeRewriter};
use arbor_types::{path, RequestContext, Resource};
use tracing::{info, warn};

use crate::config::ArborConfig;
use crate::error::SdkResult;

/// High-level Arbor API: an in-memory repository, its type registry, and
/// copy operations that repair links in the copy.
pub struct Arbor {
    repository: InMemoryRepository,
    config: ArborConfig,
}

impl Arbor {
    /// Open an empty repository acting for `context`.
    pub fn open(context: RequestContext, config: ArborConfig) -> SdkResult<Self> {
        config.rewrite.validate()?;
        let registry = config.type_registry()?;
        info!(
            user = %context.user,
            project = %context.project.name(),
            types = registry.len(),
            "opened repository"
        );
        Ok(Self {
            repository: InMemoryRepository::new(context, Arc::new(registry)),
            config,
        })
    }

    pub fn repository(&self) -> &InMemoryRepository {
        &self.repository
    }

    pub fn registry(&self) -> &dyn TypeRegistry {
        self.repository.registry().as_ref()
    }

    pub fn config(&self) -> &ArborConfig {
        &self.config
    }

    pub fn rewriter(&self) -> SdkResult<SubtreeRewriter<'_>> {
        Ok(SubtreeRewriter::new(
            &self.repository,
            self.registry(),
            self.config.rewrite.clone(),
        )?)
    }

    // ---- Copy operations ----

    /// Copy `source` to `target` and point the links inside the copy at the
    /// copy.
    pub fn copy_subtree(&self, source: &str, target: &str) -> SdkResult<(Resource, RewriteReport)> {
        let copy = self.repository.copy_resource(source, target)?;
        let pair = RewritePair::new(source, copy.root_path());
        let report = self.rewrite_and_release(&[pair])?;
        Ok((copy, report))
    }

    /// Copy every resource in `sources` into `target_folder`, then repair
    /// links across all copies in one pass.
    ///
    /// Sources that cannot be copied are logged and skipped.
    pub fn copy_many(
        &self,
        sources: &[&str],
        target_folder: &str,
    ) -> SdkResult<(Vec<Resource>, RewriteReport)> {
        let folder = path::ensure_folder(target_folder);
        let mut copies = Vec::with_capacity(sources.len());
        let mut pairs = Vec::with_capacity(sources.len());
        for source in sources {
            let target = path::join(&folder, path::name(source));
            match self.repository.copy_resource(source, &target) {
                Ok(copy) => {
                    pairs.push(RewritePair::new(*source, copy.root_path()));
                    copies.push(copy);
                }
                Err(e) => warn!(source = %source, target = %target, error = %e, "copy failed, skipping"),
            }
        }
        let report = self.rewrite_and_release(&pairs)?;
        Ok((copies, report))
    }

    /// Repair links for already copied pairs. Target root locks taken by
    /// the rewriter stay in place.
    pub fn rewrite_links(&self, pairs: &[RewritePair]) -> SdkResult<RewriteReport> {
        Ok(self.rewriter()?.rewrite_links(pairs)?)
    }

    /// Rewrite, then release the target locks that were not held before,
    /// whether or not the rewrite succeeded.
    fn rewrite_and_release(&self, pairs: &[RewritePair]) -> SdkResult<RewriteReport> {
        let mut unlocked = Vec::new();
        for pair in pairs {
            if self.repository.get_lock(&pair.target)?.is_unlocked() {
                unlocked.push(pair.target.as_str());
            }
        }
        let result = self.rewrite_links(pairs);
        for target in unlocked {
            if let Err(e) = self.repository.unlock(target) {
                warn!(path = %target, error = %e, "could not release target lock");
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use arbor_filter::ALL;
    use arbor_repo::registry::{TYPE_PLAIN, TYPE_XML_CONTENT};
    use arbor_repo::{render_link, ResourceRef};
    use arbor_types::{GroupId, Project, ProjectId, ProjectType, RelationFilter, RelationType, UserId};

    use super::*;

    fn context(user: UserId) -> RequestContext {
        let project =
            Project::new(ProjectId::new(), "Offline", user, GroupId::new(), GroupId::new(), ProjectType::Normal, 0)
                .unwrap();
        RequestContext::new(user, project)
    }

    fn open() -> Arbor {
        Arbor::open(context(UserId::new()), ArborConfig::default()).unwrap()
    }

    fn page(target: &Resource) -> Vec<u8> {
        format!(
            "<page>{}</page>",
            render_link(RelationType::XmlStrong, target.structure_id(), target.root_path())
        )
        .into_bytes()
    }

    fn link_targets(arbor: &Arbor, path: &str) -> Vec<String> {
        let mut targets: Vec<String> = arbor
            .repository()
            .read_relations(&RelationFilter::all().with_source_path(path, false))
            .unwrap()
            .into_iter()
            .map(|r| r.target_path)
            .collect();
        targets.sort();
        targets
    }

    #[test]
    fn copy_subtree_repairs_links_and_releases_lock() {
        let arbor = open();
        let repo = arbor.repository();
        repo.create_folder("/a/").unwrap();
        let x = repo.create_file("/a/x", TYPE_XML_CONTENT, b"<page/>").unwrap();
        let y = repo.create_file("/a/y", TYPE_XML_CONTENT, b"<page/>").unwrap();
        repo.write_file(&x, &page(&y)).unwrap();

        let (copy, report) = arbor.copy_subtree("/a/", "/b").unwrap();
        assert_eq!(copy.root_path(), "/b/");
        assert_eq!(report.contents_rewritten, 1);
        assert_eq!(link_targets(&arbor, "/b/x"), vec!["/b/y".to_string()]);
        assert_eq!(link_targets(&arbor, "/a/x"), vec!["/a/y".to_string()]);
        assert!(repo.get_lock("/b/").unwrap().is_unlocked());
    }

    #[test]
    fn copy_subtree_keeps_existing_lock() {
        let arbor = open();
        let repo = arbor.repository();
        repo.create_folder("/a/").unwrap();
        repo.create_folder("/t/").unwrap();
        repo.create_file("/a/x", TYPE_PLAIN, b"text").unwrap();
        repo.lock("/t/").unwrap();

        arbor.copy_subtree("/a/", "/t/a/").unwrap();
        assert!(repo.get_lock("/t/a/").unwrap().is_inherited());
        assert!(!repo.get_lock("/t/").unwrap().is_unlocked());
    }

    #[test]
    fn copy_many_repairs_links_between_sources() {
        let arbor = open();
        let repo = arbor.repository();
        repo.create_folder("/a/").unwrap();
        repo.create_folder("/c/").unwrap();
        repo.create_folder("/t/").unwrap();
        let x = repo.create_file("/a/x", TYPE_XML_CONTENT, b"<page/>").unwrap();
        let y = repo.create_file("/c/y", TYPE_XML_CONTENT, b"<page/>").unwrap();
        repo.write_file(&x, &page(&y)).unwrap();
        repo.write_file(&y, &page(&x)).unwrap();

        let (copies, report) = arbor.copy_many(&["/a/", "/c/", "/missing/"], "/t/").unwrap();
        let paths: Vec<&str> = copies.iter().map(Resource::root_path).collect();
        assert_eq!(paths, vec!["/t/a/", "/t/c/"]);
        assert_eq!(report.contents_rewritten, 2);
        assert_eq!(link_targets(&arbor, "/t/a/x"), vec!["/t/c/y".to_string()]);
        assert_eq!(link_targets(&arbor, "/t/c/y"), vec!["/t/a/x".to_string()]);
        assert!(repo.get_lock("/t/a/").unwrap().is_unlocked());
    }

    #[test]
    fn failed_rewrite_releases_locks_it_took() {
        let alice = UserId::new();
        let bob = UserId::new();
        let arbor = Arbor::open(context(alice), ArborConfig::default()).unwrap();
        let repo = arbor.repository();
        repo.create_folder("/a/").unwrap();
        repo.create_folder("/c/").unwrap();
        repo.create_folder("/t/").unwrap();
        repo.copy_resource("/a/", "/t/a/").unwrap();
        repo.copy_resource("/c/", "/t/c/").unwrap();
        repo.set_context(context(bob)).unwrap();
        repo.lock("/t/c/").unwrap();
        repo.set_context(context(alice)).unwrap();

        let pairs = [RewritePair::new("/a/", "/t/a/"), RewritePair::new("/c/", "/t/c/")];
        let result = arbor.rewrite_and_release(&pairs);
        assert!(matches!(
            result,
            Err(crate::SdkError::Rewrite(arbor_rewrite::RewriteError::LockConflict { .. }))
        ));
        assert!(repo.get_lock("/t/a/").unwrap().is_unlocked());
        assert!(repo.get_lock("/t/c/").unwrap().is_owned_by(bob));
    }

    #[test]
    fn rewrite_links_rejects_dependent_target() {
        let arbor = open();
        let result = arbor.rewrite_links(&[RewritePair::new("/a/", "/a/copy/")]);
        assert!(matches!(
            result,
            Err(crate::SdkError::Rewrite(arbor_rewrite::RewriteError::DependentTarget { .. }))
        ));
    }

    #[test]
    fn configured_types_are_used() {
        let config = ArborConfig::from_toml_str(
            r#"
            [[types]]
            id = 100
            name = "article"
            kind = "xml"
            link_parsing = true
            "#,
        )
        .unwrap();
        let arbor = Arbor::open(context(UserId::new()), config).unwrap();
        let repo = arbor.repository();
        repo.create_folder("/a/").unwrap();
        let y = repo.create_file("/a/y", 100, b"<page/>").unwrap();
        let x = repo.create_file("/a/x", 100, &page(&y)).unwrap();
        assert!(arbor.registry().supports_link_parsing(x.type_id()));

        arbor.copy_subtree("/a/", "/b/").unwrap();
        let bx = repo.read_resource(ResourceRef::Path("/b/x"), &ALL).unwrap();
        assert_eq!(bx.type_id(), 100);
        assert_eq!(link_targets(&arbor, "/b/x"), vec!["/b/y".to_string()]);
    }
}
