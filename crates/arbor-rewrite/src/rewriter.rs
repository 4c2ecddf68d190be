//! The subtree link rewriter.
//!
//! After a subtree has been copied, links inside the copy still point back
//! into the source subtree. [`SubtreeRewriter::rewrite_links`] repairs them:
//!
//! 1. validate that no target lies inside its source (before any I/O),
//! 2. index both subtrees by relative path and build a [`TranslationTable`],
//! 3. lock every target root,
//! 4. find relations from a target subtree into any source subtree,
//! 5. rewrite content ids and structural relations per resource,
//! 6. optionally sweep every other link-parsing resource under the targets,
//! 7. re-create locale-variant relations between the copies.
//!
//! Only validation and lock failures abort the operation. Everything that
//! goes wrong for a single resource is logged and recorded in the report.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use arbor_filter::presets::IGNORE_EXPIRATION;
use arbor_repo::{ResourcePort, ResourceRef, TypeRegistry};
use arbor_types::{path, Relation, RelationFilter, RelationType, Resource, StructureId, UserId};
use encoding_rs::Encoding;
use tracing::{debug, info, warn};

use crate::codec::ContentCodec;
use crate::config::RewriteConfig;
use crate::error::{RewriteError, RewriteResult};
use crate::report::RewriteReport;
use crate::substitute::translate_ids;
use crate::translation::TranslationTable;

// ---------------------------------------------------------------------------
// RewritePair
// ---------------------------------------------------------------------------

/// A copied root: `source` was copied to `target`.
///
/// Folder roots end with `/`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewritePair {
    pub source: String,
    pub target: String,
}

impl RewritePair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// An indexed pair, with root paths as stored.
struct IndexedRoot {
    source_root: String,
    target_root: String,
    targets: Vec<Resource>,
}

// ---------------------------------------------------------------------------
// SubtreeRewriter
// ---------------------------------------------------------------------------

/// Repairs links after a subtree copy. See the [module docs](self).
pub struct SubtreeRewriter<'a> {
    port: &'a dyn ResourcePort,
    registry: &'a dyn TypeRegistry,
    config: RewriteConfig,
    codec: ContentCodec,
}

impl<'a> SubtreeRewriter<'a> {
    /// Create a rewriter. Fails if `config` does not validate.
    pub fn new(
        port: &'a dyn ResourcePort,
        registry: &'a dyn TypeRegistry,
        config: RewriteConfig,
    ) -> RewriteResult<Self> {
        config.validate()?;
        let codec = ContentCodec::new(&config.default_encoding)?;
        Ok(Self {
            port,
            registry,
            config,
            codec,
        })
    }

    pub fn config(&self) -> &RewriteConfig {
        &self.config
    }

    /// Repair the links of a single copied root.
    pub fn rewrite_subtree(&self, source: &str, target: &str) -> RewriteResult<RewriteReport> {
        self.rewrite_links(&[RewritePair::new(source, target)])
    }

    /// Repair links for every `(source, target)` pair.
    ///
    /// The target root locks acquired here are left in place; releasing them
    /// is up to the caller.
    pub fn rewrite_links(&self, pairs: &[RewritePair]) -> RewriteResult<RewriteReport> {
        validate_pairs(pairs)?;

        let mut report = RewriteReport::default();
        let user = self.port.request_context()?.user;
        let (table, roots) = self.index(pairs, &mut report);
        info!(
            pairs = pairs.len(),
            matched = report.matched,
            "indexed rewrite pairs"
        );

        self.acquire_locks(&roots, user)?;

        let grouped = self.discover(&roots)?;
        report.relations_found = grouped.values().map(Vec::len).sum();

        let mut content_rewritten: HashSet<StructureId> = HashSet::new();
        for (source_id, relations) in &grouped {
            match self.rewrite_resource(*source_id, relations, &table) {
                Ok((content, relations)) => {
                    if content {
                        content_rewritten.insert(*source_id);
                        report.contents_rewritten += 1;
                    }
                    report.relations_rewritten += relations;
                }
                Err(e) => {
                    let path = relations
                        .first()
                        .map_or_else(|| source_id.to_string(), |r| r.source_path.clone());
                    warn!(path = %path, error = %e, "skipping resource");
                    report.skipped.push(path);
                }
            }
        }

        if self.config.rewrite_all {
            self.sweep(&roots, &content_rewritten, &mut report);
        }

        self.copy_locale_relations(&roots, &table, &mut report)?;

        info!(
            contents = report.contents_rewritten,
            relations = report.relations_rewritten,
            swept = report.swept,
            locale = report.locale_relations_copied,
            skipped = report.skipped.len(),
            "rewrite finished"
        );
        Ok(report)
    }

    // ---- Index ----

    fn index(
        &self,
        pairs: &[RewritePair],
        report: &mut RewriteReport,
    ) -> (TranslationTable, Vec<IndexedRoot>) {
        let mut table = TranslationTable::default();
        let mut roots = Vec::new();
        for pair in pairs {
            let indexed = self
                .index_root(&pair.source)
                .and_then(|s| Ok((s, self.index_root(&pair.target)?)));
            let ((source_root, sources), (target_root, targets)) = match indexed {
                Ok(indexed) => indexed,
                Err(e) => {
                    warn!(
                        source = %pair.source,
                        target = %pair.target,
                        error = %e,
                        "skipping unreadable pair"
                    );
                    report.skipped.push(pair.target.clone());
                    continue;
                }
            };
            for (relative, source) in &sources {
                if let Some(target) = targets.get(relative) {
                    table.insert(source, target.clone());
                    report.matched += 1;
                }
            }
            roots.push(IndexedRoot {
                source_root,
                target_root,
                targets: targets.into_values().collect(),
            });
        }
        (table, roots)
    }

    /// The resource at `root` and everything below it, keyed by path
    /// relative to the root (the root itself under `""`).
    fn index_root(&self, root: &str) -> RewriteResult<(String, BTreeMap<String, Resource>)> {
        let resource = self
            .port
            .read_resource(ResourceRef::Path(root), &IGNORE_EXPIRATION)?;
        let root_path = resource.root_path().to_string();
        let mut index = BTreeMap::new();
        if resource.is_folder() {
            for child in self.port.read_resources(&root_path, &IGNORE_EXPIRATION, true)? {
                if let Some(relative) = path::relative_path(&root_path, child.root_path()) {
                    index.insert(relative.to_string(), child);
                }
            }
        }
        index.insert(String::new(), resource);
        Ok((root_path, index))
    }

    // ---- Acquire ----

    fn acquire_locks(&self, roots: &[IndexedRoot], user: UserId) -> RewriteResult<()> {
        let targets: BTreeSet<&str> = roots.iter().map(|r| r.target_root.as_str()).collect();
        for target in targets {
            let lock = self.port.get_lock(target)?;
            if lock.is_unlocked() {
                self.port.lock(target).map_err(RewriteError::from_lock)?;
                debug!(path = %target, "locked target root");
            } else if !lock.is_owned_by(user) {
                return Err(RewriteError::LockConflict {
                    path: target.to_string(),
                    owner: lock.owner,
                });
            }
        }
        Ok(())
    }

    // ---- Discover ----

    fn discover(&self, roots: &[IndexedRoot]) -> RewriteResult<BTreeMap<StructureId, Vec<Relation>>> {
        let mut grouped: BTreeMap<StructureId, Vec<Relation>> = BTreeMap::new();
        let into_source = |relation: &Relation| {
            roots
                .iter()
                .any(|r| path::is_sub_path(&r.source_root, &relation.target_path))
        };
        for root in roots {
            let filter = RelationFilter::all().with_source_path(&root.target_root, true);
            for relation in self.port.read_relations(&filter)? {
                if !into_source(&relation) {
                    continue;
                }
                let group = grouped.entry(relation.source_id).or_default();
                if !group.contains(&relation) {
                    group.push(relation);
                }
            }
        }
        Ok(grouped)
    }

    // ---- Rewrite ----

    /// Rewrite one resource. Returns whether its content was written and
    /// how many structural relations were re-created.
    fn rewrite_resource(
        &self,
        source_id: StructureId,
        relations: &[Relation],
        table: &TranslationTable,
    ) -> RewriteResult<(bool, usize)> {
        let resource = self
            .port
            .read_resource(ResourceRef::Id(source_id), &IGNORE_EXPIRATION)?;
        let (in_content, structural): (Vec<&Relation>, Vec<&Relation>) = relations
            .iter()
            .filter(|r| !r.relation_type.is_locale_variant())
            .partition(|r| r.relation_type.is_defined_in_content());

        let mut content_written = false;
        if !in_content.is_empty() && self.registry.supports_link_parsing(resource.type_id()) {
            content_written = self.rewrite_content(&resource, table)?;
        }

        let mut rewritten = 0;
        for relation in structural {
            let Some(target) = table.target_of(relation) else {
                continue;
            };
            // add first so a failure leaves the stale edge in place
            self.port.add_relation(&resource, target, relation.relation_type)?;
            let stale = RelationFilter::all()
                .with_target_id(relation.target_id)
                .with_type(relation.relation_type);
            self.port.delete_relations(&resource, &stale)?;
            rewritten += 1;
        }

        debug!(
            path = %resource.root_path(),
            content = content_written,
            relations = rewritten,
            "rewrote resource"
        );
        Ok((content_written, rewritten))
    }

    /// Translate the ids in the content of `resource`; write only if the
    /// bytes change.
    fn rewrite_content(&self, resource: &Resource, table: &TranslationTable) -> RewriteResult<bool> {
        let bytes = self.port.read_file(resource)?;
        let encoding = self.encoding_of(resource)?;
        let kind = self.registry.content_kind(resource.type_id());
        let text = self
            .codec
            .decode(&bytes, encoding, kind, resource.root_path())?;
        let translated = translate_ids(&text, table);
        let rewritten = self.codec.encode(&translated, encoding);
        if rewritten == bytes {
            return Ok(false);
        }
        self.port.write_file(resource, &rewritten)?;
        Ok(true)
    }

    fn encoding_of(&self, resource: &Resource) -> RewriteResult<&'static Encoding> {
        let declared = self
            .port
            .read_property(resource, &self.config.encoding_property, true)?;
        Ok(self
            .codec
            .resolve(declared.as_ref().and_then(|p| p.value())))
    }

    // ---- Sweep ----

    fn sweep(
        &self,
        roots: &[IndexedRoot],
        content_rewritten: &HashSet<StructureId>,
        report: &mut RewriteReport,
    ) {
        let mut seen: HashSet<StructureId> = HashSet::new();
        let candidates = roots.iter().flat_map(|r| r.targets.iter()).filter(|r| {
            r.is_file()
                && !content_rewritten.contains(&r.structure_id())
                && self.registry.supports_link_parsing(r.type_id())
        });
        for resource in candidates {
            if !seen.insert(resource.structure_id()) {
                continue;
            }
            let result = self
                .port
                .read_file(resource)
                .and_then(|content| self.port.write_file(resource, &content));
            match result {
                Ok(_) => report.swept += 1,
                Err(e) => {
                    warn!(path = %resource.root_path(), error = %e, "sweep failed, skipping");
                    report.skipped.push(resource.root_path().to_string());
                }
            }
        }
        debug!(swept = report.swept, "secondary sweep finished");
    }

    // ---- Locale relations ----

    fn copy_locale_relations(
        &self,
        roots: &[IndexedRoot],
        table: &TranslationTable,
        report: &mut RewriteReport,
    ) -> RewriteResult<()> {
        for root in roots {
            let filter = RelationFilter::all()
                .with_source_path(&root.source_root, true)
                .with_type(RelationType::LocaleVariant);
            for relation in self.port.read_relations(&filter)? {
                let (Some(source), Some(target)) =
                    (table.source_of(&relation), table.target_of(&relation))
                else {
                    continue;
                };
                let existing = RelationFilter::all()
                    .with_source_id(source.structure_id())
                    .with_target_id(target.structure_id())
                    .with_type(RelationType::LocaleVariant);
                let result = self.port.read_relations(&existing).and_then(|found| {
                    if found.is_empty() {
                        self.port
                            .add_relation(source, target, RelationType::LocaleVariant)
                            .map(|_| true)
                    } else {
                        Ok(false)
                    }
                });
                match result {
                    Ok(true) => report.locale_relations_copied += 1,
                    Ok(false) => {}
                    Err(e) => {
                        warn!(relation = %relation, error = %e, "could not copy locale relation");
                        report.skipped.push(source.root_path().to_string());
                    }
                }
            }
        }
        Ok(())
    }
}

fn validate_pairs(pairs: &[RewritePair]) -> RewriteResult<()> {
    for pair in pairs {
        if path::is_sub_path(&pair.source, &pair.target) {
            return Err(RewriteError::DependentTarget {
                source_path: pair.source.clone(),
                target_path: pair.target.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arbor_filter::{ResourceFilter, ALL};
    use arbor_props::{Property, PropertyScope};
    use arbor_repo::registry::{TYPE_JSP, TYPE_XML_CONTENT};
    use arbor_repo::{render_link, InMemoryRepository, RepoError, RepoResult, StaticTypeRegistry};
    use arbor_types::{GroupId, Lock, Project, ProjectId, ProjectType, RequestContext};

    use super::*;

    fn init_tracing() {
        tracing_subscriber::fmt().with_test_writer().try_init().ok();
    }

    fn context(user: UserId) -> RequestContext {
        let project = Project::new(
            ProjectId::new(),
            "Offline",
            user,
            GroupId::new(),
            GroupId::new(),
            ProjectType::Normal,
            0,
        )
        .unwrap();
        RequestContext::new(user, project)
    }

    fn repo() -> (InMemoryRepository, UserId) {
        init_tracing();
        let user = UserId::new();
        let repo = InMemoryRepository::new(context(user), Arc::new(StaticTypeRegistry::standard()));
        (repo, user)
    }

    fn rewriter(repo: &InMemoryRepository, config: RewriteConfig) -> SubtreeRewriter<'_> {
        SubtreeRewriter::new(repo, repo.registry().as_ref(), config).unwrap()
    }

    fn page(links: &[&Resource]) -> Vec<u8> {
        let body: String = links
            .iter()
            .map(|r| render_link(RelationType::XmlStrong, r.structure_id(), r.root_path()))
            .collect();
        format!("<page>{body}</page>").into_bytes()
    }

    /// `/a/x` and `/a/y` link to each other; `/a/` is copied to `/b/`.
    fn linked_copy(repo: &InMemoryRepository) -> (Resource, Resource) {
        repo.create_folder("/a/").unwrap();
        let x = repo.create_file("/a/x", TYPE_XML_CONTENT, b"<page/>").unwrap();
        let y = repo.create_file("/a/y", TYPE_XML_CONTENT, b"<page/>").unwrap();
        repo.write_file(&x, &page(&[&y])).unwrap();
        repo.write_file(&y, &page(&[&x])).unwrap();
        repo.copy_resource("/a/", "/b/").unwrap();
        (x, y)
    }

    fn resource(repo: &InMemoryRepository, path: &str) -> Resource {
        repo.read_resource(ResourceRef::Path(path), &ALL).unwrap()
    }

    /// Target paths of the relations starting at `path`, with their types.
    fn relations_from(repo: &InMemoryRepository, path: &str) -> Vec<(String, RelationType)> {
        let mut found: Vec<(String, RelationType)> = repo
            .read_relations(&RelationFilter::all().with_source_path(path, false))
            .unwrap()
            .into_iter()
            .map(|r| (r.target_path, r.relation_type))
            .collect();
        found.sort();
        found
    }

    fn content(repo: &InMemoryRepository, path: &str) -> String {
        String::from_utf8(repo.read_file(&resource(repo, path)).unwrap()).unwrap()
    }

    // ---- Test 1: dependency rejection happens before any I/O ----

    struct NoIo;

    impl ResourcePort for NoIo {
        fn request_context(&self) -> RepoResult<RequestContext> {
            panic!("unexpected I/O: request_context")
        }
        fn read_resource(&self, _: ResourceRef<'_>, _: &ResourceFilter) -> RepoResult<Resource> {
            panic!("unexpected I/O: read_resource")
        }
        fn read_resources(&self, _: &str, _: &ResourceFilter, _: bool) -> RepoResult<Vec<Resource>> {
            panic!("unexpected I/O: read_resources")
        }
        fn read_relations(&self, _: &RelationFilter) -> RepoResult<Vec<Relation>> {
            panic!("unexpected I/O: read_relations")
        }
        fn add_relation(&self, _: &Resource, _: &Resource, _: RelationType) -> RepoResult<()> {
            panic!("unexpected I/O: add_relation")
        }
        fn delete_relations(&self, _: &Resource, _: &RelationFilter) -> RepoResult<usize> {
            panic!("unexpected I/O: delete_relations")
        }
        fn read_file(&self, _: &Resource) -> RepoResult<Vec<u8>> {
            panic!("unexpected I/O: read_file")
        }
        fn write_file(&self, _: &Resource, _: &[u8]) -> RepoResult<Resource> {
            panic!("unexpected I/O: write_file")
        }
        fn read_property(&self, _: &Resource, _: &str, _: bool) -> RepoResult<Option<Property>> {
            panic!("unexpected I/O: read_property")
        }
        fn write_property(&self, _: &Resource, _: &Property) -> RepoResult<()> {
            panic!("unexpected I/O: write_property")
        }
        fn lock(&self, _: &str) -> RepoResult<Lock> {
            panic!("unexpected I/O: lock")
        }
        fn get_lock(&self, _: &str) -> RepoResult<Lock> {
            panic!("unexpected I/O: get_lock")
        }
    }

    #[test]
    fn target_inside_source_is_rejected_before_io() {
        let registry = StaticTypeRegistry::standard();
        let rewriter = SubtreeRewriter::new(&NoIo, &registry, RewriteConfig::default()).unwrap();
        let result = rewriter.rewrite_subtree("/a/", "/a/b/");
        assert!(matches!(
            result,
            Err(RewriteError::DependentTarget { ref source_path, ref target_path })
                if source_path == "/a/" && target_path == "/a/b/"
        ));

        // a later dependent pair still fails before the first one is touched
        let pairs = [RewritePair::new("/a/", "/c/"), RewritePair::new("/d/", "/d/e/")];
        assert!(rewriter.rewrite_links(&pairs).is_err());
    }

    #[test]
    fn unknown_default_encoding_is_rejected() {
        let registry = StaticTypeRegistry::standard();
        let config = RewriteConfig {
            default_encoding: "klingon".into(),
            ..Default::default()
        };
        assert!(matches!(
            SubtreeRewriter::new(&NoIo, &registry, config),
            Err(RewriteError::UnknownEncoding(_))
        ));
    }

    // ---- Test 2: copied links are repaired ----

    #[test]
    fn copied_links_point_into_the_copy() {
        let (repo, _) = repo();
        linked_copy(&repo);
        assert_eq!(relations_from(&repo, "/b/x"), vec![("/a/y".into(), RelationType::XmlStrong)]);

        let report = rewriter(&repo, RewriteConfig::default())
            .rewrite_subtree("/a/", "/b/")
            .unwrap();
        assert_eq!(report.matched, 3);
        assert_eq!(report.relations_found, 2);
        assert_eq!(report.contents_rewritten, 2);
        assert!(report.skipped.is_empty());

        assert_eq!(relations_from(&repo, "/b/x"), vec![("/b/y".into(), RelationType::XmlStrong)]);
        assert_eq!(relations_from(&repo, "/b/y"), vec![("/b/x".into(), RelationType::XmlStrong)]);
        assert_eq!(relations_from(&repo, "/a/x"), vec![("/a/y".into(), RelationType::XmlStrong)]);
        assert_eq!(relations_from(&repo, "/a/y"), vec![("/a/x".into(), RelationType::XmlStrong)]);

        let by = resource(&repo, "/b/y");
        let bx = content(&repo, "/b/x");
        assert!(bx.contains(&by.structure_id().to_string()));
        assert!(bx.contains(">/b/y</link>"));
        assert!(content(&repo, "/a/x").contains(">/a/y</link>"));
    }

    // ---- Test 3: a second run is a no-op ----

    #[test]
    fn second_run_is_a_noop() {
        let (repo, _) = repo();
        let (x, y) = linked_copy(&repo);
        repo.add_relation(&x, &y, RelationType::Category).unwrap();
        repo.add_relation(&x, &y, RelationType::LocaleVariant).unwrap();
        repo.copy_resource("/a/", "/c/").unwrap();
        let rewriter = rewriter(&repo, RewriteConfig::default());

        let first = rewriter.rewrite_subtree("/a/", "/c/").unwrap();
        assert!(!first.is_noop());
        let writes = repo.file_write_count().unwrap();
        let relations = repo.read_relations(&RelationFilter::all()).unwrap().len();

        let second = rewriter.rewrite_subtree("/a/", "/c/").unwrap();
        assert!(second.is_noop(), "{second:?}");
        assert_eq!(second.relations_found, 0);
        assert_eq!(repo.file_write_count().unwrap(), writes);
        assert_eq!(repo.read_relations(&RelationFilter::all()).unwrap().len(), relations);
    }

    // ---- Test 4: structural relations are re-anchored ----

    #[test]
    fn structural_relations_are_recreated() {
        let (repo, _) = repo();
        repo.create_folder("/a/").unwrap();
        let x = repo.create_file("/a/x", TYPE_XML_CONTENT, b"<page/>").unwrap();
        let y = repo.create_file("/a/y", TYPE_XML_CONTENT, b"<page/>").unwrap();
        repo.add_relation(&x, &y, RelationType::Category).unwrap();
        repo.copy_resource("/a/", "/b/").unwrap();

        let writes = repo.file_write_count().unwrap();
        let report = rewriter(&repo, RewriteConfig::default())
            .rewrite_subtree("/a/", "/b/")
            .unwrap();
        assert_eq!(report.relations_rewritten, 1);
        assert_eq!(report.contents_rewritten, 0);
        assert_eq!(repo.file_write_count().unwrap(), writes);
        assert_eq!(relations_from(&repo, "/b/x"), vec![("/b/y".into(), RelationType::Category)]);
        assert_eq!(relations_from(&repo, "/a/x"), vec![("/a/y".into(), RelationType::Category)]);
    }

    /// Delegates to the in-memory repository but refuses to add relations.
    struct NoNewRelations<'a>(&'a InMemoryRepository);

    impl ResourcePort for NoNewRelations<'_> {
        fn request_context(&self) -> RepoResult<RequestContext> {
            self.0.request_context()
        }
        fn read_resource(&self, r: ResourceRef<'_>, f: &ResourceFilter) -> RepoResult<Resource> {
            self.0.read_resource(r, f)
        }
        fn read_resources(&self, p: &str, f: &ResourceFilter, rec: bool) -> RepoResult<Vec<Resource>> {
            self.0.read_resources(p, f, rec)
        }
        fn read_relations(&self, f: &RelationFilter) -> RepoResult<Vec<Relation>> {
            self.0.read_relations(f)
        }
        fn add_relation(&self, _: &Resource, target: &Resource, _: RelationType) -> RepoResult<()> {
            Err(RepoError::NotFound(target.root_path().to_string()))
        }
        fn delete_relations(&self, s: &Resource, f: &RelationFilter) -> RepoResult<usize> {
            self.0.delete_relations(s, f)
        }
        fn read_file(&self, r: &Resource) -> RepoResult<Vec<u8>> {
            self.0.read_file(r)
        }
        fn write_file(&self, r: &Resource, c: &[u8]) -> RepoResult<Resource> {
            self.0.write_file(r, c)
        }
        fn read_property(&self, r: &Resource, n: &str, search: bool) -> RepoResult<Option<Property>> {
            self.0.read_property(r, n, search)
        }
        fn write_property(&self, r: &Resource, p: &Property) -> RepoResult<()> {
            self.0.write_property(r, p)
        }
        fn lock(&self, p: &str) -> RepoResult<Lock> {
            self.0.lock(p)
        }
        fn get_lock(&self, p: &str) -> RepoResult<Lock> {
            self.0.get_lock(p)
        }
    }

    #[test]
    fn failed_relation_update_keeps_stale_edge() {
        let (repo, _) = repo();
        repo.create_folder("/a/").unwrap();
        let x = repo.create_file("/a/x", TYPE_XML_CONTENT, b"<page/>").unwrap();
        let y = repo.create_file("/a/y", TYPE_XML_CONTENT, b"<page/>").unwrap();
        repo.add_relation(&x, &y, RelationType::Category).unwrap();
        repo.copy_resource("/a/", "/b/").unwrap();

        let port = NoNewRelations(&repo);
        let report = SubtreeRewriter::new(&port, repo.registry().as_ref(), RewriteConfig::default())
            .unwrap()
            .rewrite_subtree("/a/", "/b/")
            .unwrap();
        assert_eq!(report.skipped, vec!["/b/x".to_string()]);
        assert_eq!(report.relations_rewritten, 0);
        assert_eq!(relations_from(&repo, "/b/x"), vec![("/a/y".into(), RelationType::Category)]);
    }

    // ---- Test 5: locale relations ----

    #[test]
    fn locale_relations_are_copied_once() {
        let (repo, _) = repo();
        repo.create_folder("/a/").unwrap();
        let en = repo.create_file("/a/en", TYPE_XML_CONTENT, b"<page/>").unwrap();
        let de = repo.create_file("/a/de", TYPE_XML_CONTENT, b"<page/>").unwrap();
        repo.add_relation(&en, &de, RelationType::LocaleVariant).unwrap();
        repo.copy_resource("/a/", "/b/").unwrap();
        assert!(relations_from(&repo, "/b/en").is_empty());

        let rewriter = rewriter(&repo, RewriteConfig::default());
        let report = rewriter.rewrite_subtree("/a/", "/b/").unwrap();
        assert_eq!(report.locale_relations_copied, 1);
        assert_eq!(report.relations_rewritten, 0);
        assert_eq!(
            relations_from(&repo, "/b/en"),
            vec![("/b/de".into(), RelationType::LocaleVariant)]
        );

        let again = rewriter.rewrite_subtree("/a/", "/b/").unwrap();
        assert_eq!(again.locale_relations_copied, 0);
        assert_eq!(relations_from(&repo, "/b/en").len(), 1);
    }

    // ---- Test 6: secondary sweep ----

    #[test]
    fn sweep_disabled_writes_nothing_extra() {
        let (repo, _) = repo();
        repo.create_folder("/a/").unwrap();
        repo.create_file("/a/z", TYPE_XML_CONTENT, b"<page>plain</page>").unwrap();
        repo.copy_resource("/a/", "/b/").unwrap();

        let report = rewriter(&repo, RewriteConfig::default())
            .rewrite_subtree("/a/", "/b/")
            .unwrap();
        assert_eq!(report.swept, 0);
        assert!(report.is_noop());
        assert_eq!(repo.file_write_count().unwrap(), 0);
    }

    #[test]
    fn sweep_enabled_touches_every_parsable_file() {
        let (repo, _) = repo();
        linked_copy(&repo);
        repo.create_file("/a/z", TYPE_XML_CONTENT, b"<page>plain</page>").unwrap();
        repo.copy_resource("/a/z", "/b/z").unwrap();
        let before = repo.file_write_count().unwrap();

        let report = rewriter(&repo, RewriteConfig::rewrite_all())
            .rewrite_subtree("/a/", "/b/")
            .unwrap();
        assert_eq!(report.contents_rewritten, 2);
        // only /b/z was not already rewritten
        assert_eq!(report.swept, 1);
        assert_eq!(repo.file_write_count().unwrap(), before + 3);
        assert!(resource(&repo, "/b/z").is_touched());
    }

    // ---- Test 7: locks ----

    #[test]
    fn foreign_lock_aborts() {
        let (repo, alice) = repo();
        linked_copy(&repo);
        let bob = UserId::new();
        repo.set_context(context(bob)).unwrap();
        repo.lock("/b/").unwrap();
        repo.set_context(context(alice)).unwrap();

        let result = rewriter(&repo, RewriteConfig::default()).rewrite_subtree("/a/", "/b/");
        assert!(matches!(
            result,
            Err(RewriteError::LockConflict { owner: Some(owner), .. }) if owner == bob
        ));
        assert_eq!(relations_from(&repo, "/b/x"), vec![("/a/y".into(), RelationType::XmlStrong)]);
    }

    #[test]
    fn target_root_stays_locked_by_caller() {
        let (repo, alice) = repo();
        linked_copy(&repo);
        rewriter(&repo, RewriteConfig::default())
            .rewrite_subtree("/a/", "/b/")
            .unwrap();
        let lock = repo.get_lock("/b/").unwrap();
        assert!(lock.is_owned_by(alice));
        assert!(!lock.is_inherited());
    }

    // ---- Test 8: content decoding ----

    #[test]
    fn broken_xml_is_rewritten_as_raw_text() {
        let (repo, _) = repo();
        repo.create_folder("/a/").unwrap();
        let x = repo.create_file("/a/x", TYPE_XML_CONTENT, b"<page/>").unwrap();
        let y = repo.create_file("/a/y", TYPE_XML_CONTENT, b"<page/>").unwrap();
        let broken = format!(
            "<page><p>{}</page>",
            render_link(RelationType::XmlStrong, y.structure_id(), "/a/y")
        );
        repo.write_file(&x, broken.as_bytes()).unwrap();
        repo.copy_resource("/a/", "/b/").unwrap();

        let report = rewriter(&repo, RewriteConfig::default())
            .rewrite_subtree("/a/", "/b/")
            .unwrap();
        assert_eq!(report.contents_rewritten, 1);
        assert_eq!(relations_from(&repo, "/b/x"), vec![("/b/y".into(), RelationType::XmlStrong)]);
        assert!(content(&repo, "/b/x").starts_with("<page><p><link"));
    }

    #[test]
    fn unsupported_declared_encoding_falls_back() {
        let (repo, _) = repo();
        linked_copy(&repo);
        let folder = resource(&repo, "/b/");
        let mut encoding = Property::new("content-encoding").unwrap();
        encoding.set_value("klingon", PropertyScope::Resource).unwrap();
        repo.write_property(&folder, &encoding).unwrap();

        let report = rewriter(&repo, RewriteConfig::default())
            .rewrite_subtree("/a/", "/b/")
            .unwrap();
        assert_eq!(report.contents_rewritten, 2);
        assert!(report.skipped.is_empty());
    }

    fn utf16le(text: &str) -> Vec<u8> {
        text.encode_utf16().flat_map(u16::to_le_bytes).collect()
    }

    #[test]
    fn utf16_content_is_written_back_as_utf16() {
        let (repo, _) = repo();
        let folder = repo.create_folder("/a/").unwrap();
        let mut encoding = Property::new("content-encoding").unwrap();
        encoding.set_value("UTF-16LE", PropertyScope::Resource).unwrap();
        repo.write_property(&folder, &encoding).unwrap();
        let y = repo.create_file("/a/y", TYPE_JSP, b"").unwrap();
        let source = utf16le(&format!("<%-- include {} --%>", y.structure_id()));
        let x = repo.create_file("/a/x", TYPE_JSP, &source).unwrap();
        repo.add_relation(&x, &y, RelationType::JspStrong).unwrap();
        repo.copy_resource("/a/", "/b/").unwrap();

        let report = rewriter(&repo, RewriteConfig::default())
            .rewrite_subtree("/a/", "/b/")
            .unwrap();
        assert_eq!(report.contents_rewritten, 1);
        assert!(report.skipped.is_empty());

        let by = resource(&repo, "/b/y");
        let written = repo.read_file(&resource(&repo, "/b/x")).unwrap();
        assert_eq!(written, utf16le(&format!("<%-- include {} --%>", by.structure_id())));
        assert_eq!(repo.read_file(&x).unwrap(), source);
    }

    // ---- Test 9: per-resource failures are skipped ----

    #[test]
    fn undecodable_resource_is_skipped() {
        let (repo, _) = repo();
        linked_copy(&repo);
        let bx = resource(&repo, "/b/x");
        let raw = repo.read_file(&bx).unwrap();
        // an odd number of bytes is never valid UTF-16
        let padded = if raw.len() % 2 == 0 {
            [raw.as_slice(), b" "].concat()
        } else {
            raw
        };
        let bx = repo.write_file(&bx, &padded).unwrap();
        let mut encoding = Property::new("content-encoding").unwrap();
        encoding.set_value("UTF-16BE", PropertyScope::Structure).unwrap();
        repo.write_property(&bx, &encoding).unwrap();

        let report = rewriter(&repo, RewriteConfig::default())
            .rewrite_subtree("/a/", "/b/")
            .unwrap();
        assert_eq!(report.skipped, vec!["/b/x".to_string()]);
        assert_eq!(report.contents_rewritten, 1);
        assert_eq!(relations_from(&repo, "/b/y"), vec![("/b/x".into(), RelationType::XmlStrong)]);
        assert_eq!(relations_from(&repo, "/b/x"), vec![("/a/y".into(), RelationType::XmlStrong)]);
    }

    #[test]
    fn unreadable_pair_is_skipped() {
        let (repo, _) = repo();
        linked_copy(&repo);
        let pairs = [
            RewritePair::new("/missing/", "/elsewhere/"),
            RewritePair::new("/a/", "/b/"),
        ];
        let report = rewriter(&repo, RewriteConfig::default())
            .rewrite_links(&pairs)
            .unwrap();
        assert_eq!(report.skipped, vec!["/elsewhere/".to_string()]);
        assert_eq!(report.contents_rewritten, 2);
    }
}
