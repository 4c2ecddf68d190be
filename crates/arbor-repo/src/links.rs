//! Link markup embedded in text content.
//!
//! A link is written as
//! `<link type="XML_STRONG" id="0190...">/sites/a/x.html</link>`: the
//! relation type, the structure id of the target, and its root path at the
//! time of writing. The id is authoritative; the path is refreshed by
//! [`correct_links`].

use std::borrow::Cow;
use std::sync::LazyLock;

use arbor_types::{RelationType, StructureId};
use regex::{Captures, Regex};
use tracing::trace;

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<link\s+type="([A-Za-z_]+)"(?:\s+id="([^"]*)")?\s*>([^<]*)</link>"#)
        .expect("valid link regex")
});

/// One link found in content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    pub relation_type: RelationType,
    /// `None` if the markup has no id or an unparseable one.
    pub target_id: Option<StructureId>,
    pub target_path: String,
}

impl Link {
    fn from_captures(caps: &Captures<'_>) -> Option<Link> {
        let relation_type = match caps[1].parse::<RelationType>() {
            Ok(t) => t,
            Err(e) => {
                trace!(error = %e, "skipping link with unknown type");
                return None;
            }
        };
        Some(Link {
            relation_type,
            target_id: caps.get(2).and_then(|m| m.as_str().parse().ok()),
            target_path: caps[3].trim().to_string(),
        })
    }
}

/// Render a link to `target_path`.
pub fn render_link(relation_type: RelationType, target_id: StructureId, target_path: &str) -> String {
    format!(
        r#"<link type="{}" id="{}">{}</link>"#,
        relation_type.name(),
        target_id,
        target_path
    )
}

/// All well-formed links in `content`, in document order.
pub fn parse_links(content: &str) -> Vec<Link> {
    LINK_RE
        .captures_iter(content)
        .filter_map(|caps| Link::from_captures(&caps))
        .collect()
}

/// Re-render every link that `resolve` maps to a current `(id, path)`.
///
/// Links that do not resolve are left as they are. Returns borrowed content
/// if nothing was found to replace.
pub fn correct_links<'a, F>(content: &'a str, resolve: F) -> Cow<'a, str>
where
    F: Fn(&Link) -> Option<(StructureId, String)>,
{
    LINK_RE.replace_all(content, |caps: &Captures<'_>| {
        Link::from_captures(caps)
            .and_then(|link| {
                resolve(&link).map(|(id, path)| render_link(link.relation_type, id, &path))
            })
            .unwrap_or_else(|| caps[0].to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_render() {
        let id = StructureId::new();
        let content = format!(
            "<page>{}<p>text</p><link type=\"img\">/img/logo.png</link></page>",
            render_link(RelationType::XmlStrong, id, "/a/y")
        );
        let links = parse_links(&content);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].relation_type, RelationType::XmlStrong);
        assert_eq!(links[0].target_id, Some(id));
        assert_eq!(links[0].target_path, "/a/y");
        assert_eq!(links[1].relation_type, RelationType::EmbeddedImage);
        assert_eq!(links[1].target_id, None);
    }

    #[test]
    fn unknown_types_are_skipped() {
        let content = r#"<link type="BOGUS" id="x">/a</link>"#;
        assert!(parse_links(content).is_empty());
    }

    #[test]
    fn correct_refreshes_paths() {
        let id = StructureId::new();
        let content = render_link(RelationType::Hyperlink, id, "/old/path");
        let corrected = correct_links(&content, |link| {
            (link.target_id == Some(id)).then(|| (id, "/new/path".to_string()))
        });
        assert_eq!(corrected, render_link(RelationType::Hyperlink, id, "/new/path"));
    }

    #[test]
    fn unresolved_links_are_kept() {
        let content = format!(
            "before {} after",
            render_link(RelationType::XmlWeak, StructureId::new(), "/gone")
        );
        let corrected = correct_links(&content, |_| None);
        assert_eq!(corrected, content);
    }
}
