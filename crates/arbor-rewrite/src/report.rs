use serde::Serialize;

/// What a rewrite did.
///
/// Skipped resources are logged as they happen and also listed here by
/// root path (or structure id, if the path could not be read).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RewriteReport {
    /// Source/target resource pairs matched by relative path.
    pub matched: usize,
    /// Relations from a target subtree back into its source subtree.
    pub relations_found: usize,
    pub contents_rewritten: usize,
    pub relations_rewritten: usize,
    /// Resources re-written by the secondary sweep.
    pub swept: usize,
    pub locale_relations_copied: usize,
    pub skipped: Vec<String>,
}

impl RewriteReport {
    /// Returns `true` if nothing was written.
    pub fn is_noop(&self) -> bool {
        self.contents_rewritten == 0
            && self.relations_rewritten == 0
            && self.swept == 0
            && self.locale_relations_copied == 0
    }
}
