//! A bundle of tokens, metadata, and patterns for one kind of citation.

use crate::builder::StringBuilder;
use crate::config::TemplateDoc;
use crate::error::{PatternCompileError, PatternKind, TemplateLoadError};
use crate::pattern::{has_unresolved_placeholder, process_pattern, unknown_placeholders};
use crate::scanner::resolve_overlaps;
use crate::tokens::TokenType;
use fancy_regex::{Regex as FancyRegex, RegexBuilder};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A shortform or idform pattern, as deferred until a parent citation's raw
/// token values are known (if it references `{same X}`) or compiled eagerly
/// and shared by identity otherwise.
#[derive(Debug)]
pub(crate) enum ChildPattern {
    /// Contains no `{same X}` reference; compiled once at Template
    /// construction and shared by identity across every Citation.
    Fixed(Arc<FancyRegex>),
    /// Still contains unresolved `{same X}` markers; the processed-but-not-
    /// compiled pattern source, recompiled per Citation once parent raw
    /// token values are known.
    Deferred(String),
}

/// One matched longform occurrence, with enough data to build a Citation.
#[derive(Clone, Debug)]
pub(crate) struct RawMatch {
    /// Start offset, in bytes, of the whole match.
    pub start: usize,
    /// End offset, in bytes, of the whole match.
    pub end: usize,
    /// The exact matched text.
    pub text: String,
    /// Named captures belonging to declared tokens, substring as captured.
    pub raw_tokens: IndexMap<String, String>,
    /// Index into whichever regex list (`regexes` or `broad_regexes`) this
    /// match came from; lower wins same-start/same-length ties.
    pub regex_index: usize,
}

/// A named pattern plus normalization and URL/name rules for one kind of
/// citation.
#[derive(Debug)]
pub struct Template {
    /// The template's name.
    pub name: String,
    /// Free-form metadata shared with builders and patterns.
    pub meta: IndexMap<String, String>,
    /// Ordered token declarations; order encodes containment hierarchy.
    pub tokens: IndexMap<String, TokenType>,
    pub(crate) regexes: Vec<FancyRegex>,
    pub(crate) broad_regexes: Vec<FancyRegex>,
    pub(crate) shortform_patterns: Vec<ChildPattern>,
    pub(crate) idform_patterns: Vec<ChildPattern>,
    pub(crate) url_builder: Option<StringBuilder>,
    pub(crate) name_builder: Option<StringBuilder>,
}

impl Template {
    /// Builds a Template from an already inherit-merged declarative
    /// document.
    pub(crate) fn from_doc(name: String, doc: TemplateDoc) -> Result<Template, TemplateLoadError> {
        let tokens: IndexMap<String, TokenType> = doc
            .tokens
            .into_iter()
            .map(|(token_name, token_doc)| {
                token_doc
                    .into_token_type(&name)
                    .map(|t| (token_name, t))
            })
            .collect::<Result<_, _>>()?;

        let mut replacements: HashMap<String, String> = HashMap::new();
        for (key, value) in &doc.meta {
            replacements.insert(key.clone(), value.clone());
        }
        for (token_name, token) in &tokens {
            replacements.insert(
                token_name.clone(),
                format!("(?P<{token_name}>{})", token.regex),
            );
        }

        let longform_sources = doc.pattern.map(crate::config::StringOrList::into_vec).unwrap_or_default();
        let broad_extra_sources = doc
            .broad_pattern
            .map(crate::config::StringOrList::into_vec)
            .unwrap_or_default();
        let shortform_sources = doc
            .shortform_pattern
            .map(crate::config::StringOrList::into_vec)
            .unwrap_or_default();
        let idform_sources = doc
            .idform_pattern
            .map(crate::config::StringOrList::into_vec)
            .unwrap_or_default();

        let token_names: HashSet<String> = tokens.keys().cloned().collect();
        let plain_names: HashSet<String> = token_names
            .iter()
            .cloned()
            .chain(doc.meta.keys().cloned())
            .collect();
        for source in longform_sources.iter().chain(broad_extra_sources.iter()) {
            check_known_placeholders(source, &plain_names, None, &name)?;
        }
        for source in shortform_sources.iter().chain(idform_sources.iter()) {
            check_known_placeholders(source, &plain_names, Some(&token_names), &name)?;
        }

        let mut regexes = Vec::with_capacity(longform_sources.len());
        for source in &longform_sources {
            let processed = process_pattern(source, &replacements, true);
            let compiled = FancyRegex::new(&processed).map_err(|e| {
                TemplateLoadError::PatternCompile(PatternCompileError {
                    template: name.clone(),
                    kind: PatternKind::Longform,
                    source: e,
                })
            })?;
            regexes.push(compiled);
        }

        let mut broad_regexes = Vec::with_capacity(longform_sources.len() + broad_extra_sources.len());
        for source in longform_sources.iter().chain(broad_extra_sources.iter()) {
            let processed = process_pattern(source, &replacements, true);
            let compiled = RegexBuilder::new(&processed)
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    TemplateLoadError::PatternCompile(PatternCompileError {
                        template: name.clone(),
                        kind: PatternKind::Broad,
                        source: e,
                    })
                })?;
            broad_regexes.push(compiled);
        }

        let shortform_patterns =
            compile_child_patterns(shortform_sources, &replacements, &name, PatternKind::Shortform)?;
        let idform_patterns =
            compile_child_patterns(idform_sources, &replacements, &name, PatternKind::Idform)?;

        let url_builder = doc
            .url_builder
            .map(|b| b.into_builder(&name, true))
            .transpose()?;
        let name_builder = doc
            .name_builder
            .map(|b| b.into_builder(&name, false))
            .transpose()?;

        Ok(Template {
            name,
            meta: doc.meta,
            tokens,
            regexes,
            broad_regexes,
            shortform_patterns,
            idform_patterns,
            url_builder,
            name_builder,
        })
    }

    /// Finds every longform match of this template in `text`, restricted to
    /// `span` if given, with overlaps among this template's own regexes
    /// resolved (longest match wins, then earliest-listed regex).
    pub(crate) fn find_longform_matches(
        &self,
        text: &str,
        broad: bool,
        span: Option<(usize, usize)>,
    ) -> Vec<RawMatch> {
        let (lo, hi) = span.unwrap_or((0, text.len()));
        let candidates = if broad { &self.broad_regexes } else { &self.regexes };
        let mut found = Vec::new();
        for (regex_index, regex) in candidates.iter().enumerate() {
            for m in regex.captures_iter(&text[lo..hi]) {
                let Ok(caps) = m else { continue };
                let Some(whole) = caps.get(0) else { continue };
                let start = lo + whole.start();
                let end = lo + whole.end();
                let mut raw_tokens = IndexMap::new();
                for token_name in self.tokens.keys() {
                    if let Some(value) = caps.name(token_name) {
                        raw_tokens.insert(token_name.clone(), value.as_str().to_string());
                    }
                }
                found.push(RawMatch {
                    start,
                    end,
                    text: whole.as_str().to_string(),
                    raw_tokens,
                    regex_index,
                });
            }
        }
        resolve_overlaps(&found, |m| (m.start, m.end))
    }

    /// Finds the first (earliest-starting) longform match.
    pub(crate) fn cite_match(
        &self,
        text: &str,
        broad: bool,
        span: Option<(usize, usize)>,
    ) -> Option<RawMatch> {
        self.find_longform_matches(text, broad, span).into_iter().next()
    }
}

/// Checks that every placeholder in `source` resolves: a plain `{name}`
/// must name a token or metadata key; a `{same name}` must name a token,
/// and only when `known_same` is given (shortform/idform patterns).
fn check_known_placeholders(
    source: &str,
    known_plain: &HashSet<String>,
    known_same: Option<&HashSet<String>>,
    template: &str,
) -> Result<(), TemplateLoadError> {
    let bad = unknown_placeholders(source, known_plain, known_same);
    if let Some(placeholder) = bad.into_iter().next() {
        return Err(TemplateLoadError::UnknownPlaceholder {
            template: template.to_string(),
            placeholder,
        });
    }
    Ok(())
}

fn compile_child_patterns(
    sources: Vec<String>,
    replacements: &HashMap<String, String>,
    template: &str,
    kind: PatternKind,
) -> Result<Vec<ChildPattern>, TemplateLoadError> {
    let mut out = Vec::with_capacity(sources.len());
    for source in sources {
        let processed = process_pattern(&source, replacements, true);
        if has_unresolved_placeholder(&processed) {
            out.push(ChildPattern::Deferred(processed));
        } else {
            let compiled = FancyRegex::new(&processed).map_err(|e| {
                TemplateLoadError::PatternCompile(PatternCompileError {
                    template: template.to_string(),
                    kind,
                    source: e,
                })
            })?;
            out.push(ChildPattern::Fixed(Arc::new(compiled)));
        }
    }
    Ok(out)
}
