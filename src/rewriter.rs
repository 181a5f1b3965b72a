//! Splices hyperlink elements back into scanned text.

use crate::citation::{Citation, Span};
use crate::citator::Citator;
use fancy_regex::Regex as FancyRegex;
use std::sync::Arc;

/// Inline tags treated as "markup to see through" when `ignore_markup` is
/// set. Matches the tag set the universal bare-id pattern itself already
/// tolerates (`</i>`, `</em>`, `</u>`), extended with the two common bold
/// tags for symmetry.
pub static IGNORED_INLINE_TAGS: phf::Set<&str> = phf::phf_set! {
    "i", "em", "u", "b", "strong",
};

/// Policy flags controlling how [`insert_links`] decides what to link and
/// how.
#[derive(Clone, Debug)]
pub struct RewritePolicy {
    /// Attributes applied to every emitted anchor element.
    pub attrs: Vec<(String, String)>,
    /// Emit an anchor even when a citation has no URL.
    pub url_optional: bool,
    /// When false, suppress a citation whose URL equals the immediately
    /// previous emitted link's URL.
    pub redundant_links: bool,
    /// Link idform citations with no named captures (e.g. a bare `Id.`).
    pub link_plain_ids: bool,
    /// Link idform citations that do have named captures (e.g.
    /// `Id. at (c)`).
    pub link_detailed_ids: bool,
    /// Tolerate inline markup interrupting a citation (see
    /// [`IGNORED_INLINE_TAGS`]).
    pub ignore_markup: bool,
}

impl Default for RewritePolicy {
    fn default() -> Self {
        Self {
            attrs: vec![("class".to_string(), "citation".to_string())],
            url_optional: false,
            redundant_links: true,
            link_plain_ids: true,
            link_detailed_ids: true,
            ignore_markup: false,
        }
    }
}

/// Splices hyperlink elements for `citations` into `text`. Citations are
/// processed in order; offsets are applied cumulatively so later citations
/// still index into the *original* text.
pub fn insert_links(text: &str, citations: &[Arc<Citation>], policy: &RewritePolicy) -> String {
    let mut out = text.to_string();
    let mut offset: isize = 0;
    let mut previous_url: Option<String> = None;

    for citation in citations {
        if citation.is_id {
            let detailed = citation.idform_is_detailed();
            if detailed && !policy.link_detailed_ids {
                continue;
            }
            if !detailed && !policy.link_plain_ids {
                continue;
            }
        }

        let Some(url) = &citation.url else {
            if !policy.url_optional {
                continue;
            }
            splice_anchor(&mut out, citation, None, policy, &mut offset);
            previous_url = None;
            continue;
        };

        if !policy.redundant_links && previous_url.as_deref() == Some(url.as_str()) {
            continue;
        }

        splice_anchor(&mut out, citation, Some(url.as_str()), policy, &mut offset);
        previous_url = Some(url.clone());
    }

    out
}

/// Replaces the citation's original span (in the *current*, already-spliced
/// text, accounting for `offset`) with an anchor element wrapping it.
fn splice_anchor(
    out: &mut String,
    citation: &Citation,
    url: Option<&str>,
    policy: &RewritePolicy,
    offset: &mut isize,
) {
    let start = (citation.span.start as isize + *offset) as usize;
    let end = (citation.span.end as isize + *offset) as usize;
    if start > out.len() || end > out.len() || start > end {
        return;
    }

    let mut attrs = String::new();
    for (key, value) in &policy.attrs {
        attrs.push(' ');
        attrs.push_str(key);
        attrs.push_str("=\"");
        attrs.push_str(&html_escape::encode_double_quoted_attribute(value));
        attrs.push('"');
    }
    if let Some(url) = url {
        attrs.push_str(" href=\"");
        attrs.push_str(&html_escape::encode_double_quoted_attribute(url));
        attrs.push('"');
    }

    let original = out[start..end].to_string();
    let replacement = format!("<a{attrs}>{original}</a>");
    let delta = replacement.len() as isize - original.len() as isize;
    out.replace_range(start..end, &replacement);
    *offset += delta;
}

/// Scans `text` and splices in links in one step, honoring
/// `policy.ignore_markup` by routing through
/// [`Citator::list_cites_ignoring_markup`] when set.
pub fn scan_and_insert_links(
    citator: &Citator,
    text: &str,
    id_break: Option<&FancyRegex>,
    policy: &RewritePolicy,
) -> String {
    let citations: Vec<Arc<Citation>> = if policy.ignore_markup {
        citator
            .list_cites_ignoring_markup(text, id_break, &IGNORED_INLINE_TAGS)
            .into_iter()
            .map(Arc::new)
            .collect()
    } else {
        citator.list_cites(text, id_break).into_iter().map(Arc::new).collect()
    };
    insert_links(text, &citations, policy)
}

/// Removes bare `<tag>`/`</tag>` occurrences (case-insensitive, no
/// attributes) naming any entry of `tags`, returning the stripped text
/// alongside a byte-offset map: `map[i]` is `text`'s byte offset
/// corresponding to the stripped string's byte offset `i`, and
/// `map[stripped.len()] == text.len()`.
pub(crate) fn strip_markup(text: &str, tags: &phf::Set<&str>) -> (String, Vec<usize>) {
    let mut stripped = String::with_capacity(text.len());
    let mut map = Vec::with_capacity(text.len() + 1);
    let mut i = 0;
    while i < text.len() {
        if text.as_bytes()[i] == b'<' {
            if let Some(end) = match_ignored_tag(text, i, tags) {
                i = end;
                continue;
            }
        }
        let ch = text[i..].chars().next().expect("i < text.len()");
        let ch_len = ch.len_utf8();
        for k in 0..ch_len {
            map.push(i + k);
        }
        stripped.push(ch);
        i += ch_len;
    }
    map.push(text.len());
    (stripped, map)
}

/// If `text[start..]` begins with `<[/]name>` where `name` (case-folded) is
/// in `tags`, returns the byte offset just past the closing `>`.
fn match_ignored_tag(text: &str, start: usize, tags: &phf::Set<&str>) -> Option<usize> {
    let rest = text[start..].as_bytes();
    let mut idx = 1; // past '<'
    if rest.get(idx) == Some(&b'/') {
        idx += 1;
    }
    let name_start = idx;
    while rest.get(idx).is_some_and(u8::is_ascii_alphabetic) {
        idx += 1;
    }
    if idx == name_start || rest.get(idx) != Some(&b'>') {
        return None;
    }
    let name = std::str::from_utf8(&rest[name_start..idx]).ok()?.to_lowercase();
    if tags.contains(name.as_str()) {
        Some(start + idx + 1)
    } else {
        None
    }
}

/// Maps a citation's own `span`/`text` from a stripped view's coordinates
/// back into `original`'s, via `map` (as produced by [`strip_markup`]).
///
/// The boundaries snap outward to swallow any stripped markup run
/// immediately adjacent to the match, so e.g. a bare-id match on `Id.`
/// inside `<i>Id.</i>` remaps to the whole `<i>Id.</i>` span — the inserted
/// link wraps the surrounding tag, not just the bare text.
///
/// See [`Citator::list_cites_ignoring_markup`] for the scoping caveat on
/// `parent` chains.
pub(crate) fn remap_citation(citation: Citation, map: &[usize], original: &str) -> Citation {
    let start = if citation.span.start == 0 {
        0
    } else {
        map[citation.span.start - 1] + 1
    };
    let end = map[citation.span.end];
    Citation {
        span: Span { start, end },
        text: original[start..end].to_string(),
        ..citation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::Template;
    use indexmap::IndexMap;

    fn template() -> Arc<Template> {
        Arc::new(Template {
            name: "USC".to_string(),
            meta: IndexMap::new(),
            tokens: IndexMap::new(),
            regexes: vec![],
            broad_regexes: vec![],
            shortform_patterns: vec![],
            idform_patterns: vec![],
            url_builder: None,
            name_builder: None,
        })
    }

    fn citation(start: usize, end: usize, url: &str) -> Arc<Citation> {
        id_citation(start, end, url, false, false)
    }

    fn id_citation(
        start: usize,
        end: usize,
        url: &str,
        is_id: bool,
        idform_has_named_captures: bool,
    ) -> Arc<Citation> {
        let mut raw_tokens = IndexMap::new();
        if is_id {
            // A real id-chain citation inherits its parent's prior raw
            // tokens even on a bare `Id.` match; this must not by itself
            // make the citation look "detailed".
            raw_tokens.insert("section".to_string(), "1988".to_string());
        }
        Arc::new(Citation {
            template: template(),
            span: Span { start, end },
            text: String::new(),
            raw_tokens,
            tokens: IndexMap::new(),
            url: Some(url.to_string()),
            name: None,
            parent: None,
            is_id,
            idform_has_named_captures,
            shortform_patterns: vec![],
            idform_patterns: vec![],
        })
    }

    #[test]
    fn splices_two_non_overlapping_links_with_cumulative_offset() {
        let text = "42 USC 1983. 18 USC 242.";
        let citations = vec![citation(0, 11, "https://a"), citation(13, 23, "https://b")];
        let policy = RewritePolicy::default();
        let out = insert_links(text, &citations, &policy);
        assert!(out.contains("href=\"https://a\""));
        assert!(out.contains("href=\"https://b\""));
        assert!(out.starts_with("<a class=\"citation\" href=\"https://a\">42 USC 1983</a>"));
    }

    #[test]
    fn redundant_links_suppressed_when_url_repeats() {
        let text = "42 USC 1983. Id.";
        let citations = vec![citation(0, 11, "https://a"), citation(13, 16, "https://a")];
        let mut policy = RewritePolicy::default();
        policy.redundant_links = false;
        let out = insert_links(text, &citations, &policy);
        assert_eq!(out.matches("<a").count(), 1);
    }

    #[test]
    fn bare_id_with_inherited_raw_tokens_is_not_treated_as_detailed() {
        // A bare `Id.` that inherited a parent's raw token (but whose own
        // matched pattern has no named capture group) must be linkable
        // under `link_plain_ids` alone, not misclassified as detailed.
        let bare_id = id_citation(0, 4, "https://a", true, false);
        let mut policy = RewritePolicy::default();
        policy.link_plain_ids = true;
        policy.link_detailed_ids = false;
        let out = insert_links("Id. ", &[bare_id], &policy);
        assert!(out.contains("href=\"https://a\""));
    }

    #[test]
    fn detailed_id_is_suppressed_when_link_detailed_ids_is_false() {
        let detailed_id = id_citation(0, 11, "https://a", true, true);
        let mut policy = RewritePolicy::default();
        policy.link_plain_ids = false;
        policy.link_detailed_ids = false;
        let out = insert_links("Id. at (c)", &[detailed_id], &policy);
        assert!(!out.contains("<a"));
    }

    #[test]
    fn strip_markup_removes_tags_and_maps_offsets_back() {
        let text = "<i>Id.</i> at (b)";
        let (stripped, map) = strip_markup(&text, &IGNORED_INLINE_TAGS);
        assert_eq!(stripped, "Id. at (b)");
        let stripped_end = stripped.len();
        assert_eq!(map[0], 3); // 'I' in stripped is the 'I' right after <i>
        assert_eq!(map[stripped_end], text.len());
        assert_eq!(&text[map[0]..map[stripped_end]], "Id.</i> at (b)");
    }

    #[test]
    fn strip_markup_leaves_unlisted_tags_alone() {
        let text = "<span>Id.</span>";
        let (stripped, _) = strip_markup(&text, &IGNORED_INLINE_TAGS);
        assert_eq!(stripped, text);
    }

    #[test]
    fn remap_citation_reslices_text_from_original() {
        let citation = Citation {
            template: template(),
            span: Span { start: 0, end: 3 },
            text: "Id.".to_string(),
            raw_tokens: IndexMap::new(),
            tokens: IndexMap::new(),
            url: None,
            name: None,
            parent: None,
            is_id: true,
            idform_has_named_captures: false,
            shortform_patterns: vec![],
            idform_patterns: vec![],
        };
        let original = "<i>Id.</i> at (b)";
        let (_, map) = strip_markup(original, &IGNORED_INLINE_TAGS);
        let remapped = remap_citation(citation, &map, original);
        assert_eq!(remapped.span, Span { start: 0, end: 10 });
        assert_eq!(remapped.text, "<i>Id.</i>");
    }
}
