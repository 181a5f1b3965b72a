//! A single matched citation, immutable once built.

use crate::pattern::process_pattern;
use crate::template::{ChildPattern, RawMatch, Template};
use fancy_regex::Regex as FancyRegex;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// The universal bare-id pattern appended to every Citation's idform list.
/// Shared by identity; never recompiled.
static BARE_ID: LazyLock<Arc<FancyRegex>> = LazyLock::new(|| {
    Arc::new(FancyRegex::new(r"[Ii](bi)?d\.(</(i|em|u)>)?").expect("bare id pattern is valid"))
});

/// A byte-offset span within the scanned text.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Span {
    /// Inclusive start offset, in bytes.
    pub start: usize,
    /// Exclusive end offset, in bytes.
    pub end: usize,
}

/// An immutable record of a single matched citation.
#[derive(Debug)]
pub struct Citation {
    /// The template this citation was matched against.
    pub template: Arc<Template>,
    /// The citation's location in the scanned text.
    pub span: Span,
    /// The exact matched text.
    pub text: String,
    /// Captured substrings, with inherited entries from the parent up to
    /// (exclusive of) the first token the child actually captured.
    pub raw_tokens: IndexMap<String, String>,
    /// Normalized token values. Entries whose name starts with `_` are
    /// builder-internal and hidden from the public token view (see
    /// [`Citation::public_tokens`]).
    pub tokens: IndexMap<String, String>,
    /// The canonical URL, if the template has a URL builder and it produced
    /// a value.
    pub url: Option<String>,
    /// The canonical display name, if the template has a name builder and
    /// it produced a value.
    pub name: Option<String>,
    /// The ancestor this citation refers back to, if it is a shortform or
    /// idform citation.
    pub parent: Option<Arc<Citation>>,
    /// Whether this citation was produced by an idform pattern (used by the
    /// Rewriter's `link_plain_ids`/`link_detailed_ids` policy).
    pub is_id: bool,
    /// Whether the specific idform regex that matched has any named capture
    /// group, regardless of whether this particular match actually filled
    /// one in (e.g. an optional trailing group left empty still counts).
    /// Meaningless when `is_id` is false.
    pub(crate) idform_has_named_captures: bool,
    pub(crate) shortform_patterns: Vec<ChildPattern>,
    pub(crate) idform_patterns: Vec<ChildPattern>,
}

impl Citation {
    /// Builds a Citation from a longform [`RawMatch`]. Never fails: a
    /// longform raw match's tokens are exactly what `tokens` declares
    /// present by construction. See [`Citation::build_child`] for the
    /// fallible shortform/idform path.
    pub(crate) fn from_longform(template: Arc<Template>, m: RawMatch) -> Citation {
        // Longform matches always build successfully: every mandatory edit
        // failure would mean the template's own token declarations are
        // internally inconsistent, which would already have surfaced as a
        // load-time error.
        Self::build(template, m, None, false, false)
            .expect("longform citation construction should not fail")
    }

    /// Builds a shortform or idform Citation that refers back to `parent`.
    /// `matched_has_named_captures` records whether the specific idform
    /// regex that produced `m` declares any named capture group, regardless
    /// of what this particular match actually captured; ignored unless
    /// `is_id` is true. Returns `None` if a mandatory edit failed (the
    /// Scanner then treats this as "no match here").
    pub(crate) fn build_child(
        template: Arc<Template>,
        m: RawMatch,
        parent: Arc<Citation>,
        is_id: bool,
        matched_has_named_captures: bool,
    ) -> Option<Citation> {
        Self::build(template, m, Some(parent), is_id, matched_has_named_captures)
    }

    fn build(
        template: Arc<Template>,
        m: RawMatch,
        parent: Option<Arc<Citation>>,
        is_id: bool,
        idform_has_named_captures: bool,
    ) -> Option<Citation> {
        // Step 1: inherit parent raw values up to (exclusive of) the first
        // token name the child actually captured.
        let mut raw_tokens = IndexMap::new();
        if let Some(parent) = &parent {
            let mut child_has_captured = false;
            for token_name in template.tokens.keys() {
                if m.raw_tokens.contains_key(token_name) {
                    child_has_captured = true;
                }
                if !child_has_captured {
                    if let Some(value) = parent.raw_tokens.get(token_name) {
                        raw_tokens.insert(token_name.clone(), value.clone());
                    }
                } else if let Some(value) = m.raw_tokens.get(token_name) {
                    raw_tokens.insert(token_name.clone(), value.clone());
                }
            }
        } else {
            raw_tokens = m.raw_tokens.clone();
        }

        // Step 2: normalize each declared token in order; a mandatory edit
        // failure invalidates the whole Citation.
        let mut tokens = IndexMap::new();
        for (token_name, token_type) in &template.tokens {
            let normalized = token_type.normalize(raw_tokens.get(token_name).map(String::as_str)).ok()?;
            if let Some(value) = normalized {
                tokens.insert(token_name.clone(), value);
            }
        }

        // Step 3: compile (or reuse) this citation's child regexes.
        let shortform_patterns = recompile_child_patterns(&template.shortform_patterns, &raw_tokens);
        let mut idform_patterns = recompile_child_patterns(&template.idform_patterns, &raw_tokens);
        idform_patterns.push(ChildPattern::Fixed(BARE_ID.clone()));

        // Step 4: build URL and name.
        let url = template.url_builder.as_ref().and_then(|b| b.build(&tokens));
        let name = template.name_builder.as_ref().and_then(|b| b.build(&tokens));

        Some(Citation {
            template,
            span: Span { start: m.start, end: m.end },
            text: m.text,
            raw_tokens,
            tokens,
            url,
            name,
            parent,
            is_id,
            idform_has_named_captures,
            shortform_patterns,
            idform_patterns,
        })
    }

    /// The normalized tokens visible to external callers: entries whose
    /// name starts with `_` are builder-internal and omitted here.
    pub fn public_tokens(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tokens
            .iter()
            .filter(|(k, _)| !k.starts_with('_'))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns true if this citation's idform regex has any named capture
    /// group (a "detailed" idform like `Id. at (c)`, as opposed to a
    /// "plain" one like a bare `Id.`). Used by the Rewriter's
    /// `link_plain_ids`/`link_detailed_ids` policy.
    pub(crate) fn idform_is_detailed(&self) -> bool {
        self.idform_has_named_captures
    }
}

/// Recompiles [`ChildPattern::Deferred`] entries against the concrete parent
/// raw token values, and passes [`ChildPattern::Fixed`] entries through by
/// cloning the shared `Arc`.
fn recompile_child_patterns(
    patterns: &[ChildPattern],
    raw_tokens: &IndexMap<String, String>,
) -> Vec<ChildPattern> {
    patterns
        .iter()
        .map(|pattern| match pattern {
            ChildPattern::Fixed(regex) => ChildPattern::Fixed(regex.clone()),
            ChildPattern::Deferred(source) => {
                let mut same_replacements: HashMap<String, String> = HashMap::new();
                for (name, value) in raw_tokens {
                    same_replacements.insert(format!("same {name}"), regex::escape(value));
                }
                let processed = process_pattern(source, &same_replacements, false);
                match FancyRegex::new(&processed) {
                    Ok(regex) => ChildPattern::Fixed(Arc::new(regex)),
                    Err(_) => ChildPattern::Deferred(processed),
                }
            }
        })
        .collect()
}
