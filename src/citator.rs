//! Loads declarative template documents and exposes the citation-engine's
//! external surface.

use crate::authority::{list_authorities, Authority};
use crate::citation::Citation;
use crate::config::{parse_yaml, TemplateSetDoc};
use crate::error::TemplateLoadError;
use crate::scanner::list_cites;
use crate::template::Template;
use fancy_regex::Regex as FancyRegex;
use indexmap::IndexMap;
use std::path::Path;
use std::sync::{Arc, LazyLock};

/// A loaded set of templates, ready to scan text against. Templates are
/// loaded incrementally: a later document's entry overrides an earlier
/// one of the same name, and `inherit` may reference any template loaded
/// so far (including one from an earlier document).
#[derive(Debug, Default)]
pub struct Citator {
    /// Parsed-but-not-yet-merged documents, kept so a later `inherit` can
    /// still resolve against an earlier template's declarative body.
    raw: IndexMap<String, crate::config::TemplateDoc>,
    /// Compiled templates, in load order (insertion order is preserved by
    /// `IndexMap` even across overrides, so longform scanning always
    /// follows declared order).
    templates: IndexMap<String, Arc<Template>>,
}

impl Citator {
    /// An empty citator with no templates loaded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every template in a YAML document, overriding by name.
    pub fn load_yaml_str(&mut self, source: &str) -> Result<(), TemplateLoadError> {
        let doc = parse_yaml(source)?;
        self.load_doc(doc)
    }

    /// Reads and loads a YAML document from disk.
    pub fn load_yaml_file(&mut self, path: &Path) -> Result<(), TemplateLoadError> {
        let source = std::fs::read_to_string(path).map_err(|e| TemplateLoadError::Malformed {
            path: Some(path.to_path_buf()),
            message: e.to_string(),
        })?;
        let doc = parse_yaml(&source)?;
        self.load_doc(doc)
    }

    fn load_doc(&mut self, doc: TemplateSetDoc) -> Result<(), TemplateLoadError> {
        for (name, body) in doc {
            let merged = match &body.inherit {
                Some(base_name) => {
                    let base = self.raw.get(base_name).ok_or_else(|| {
                        TemplateLoadError::UndefinedInherit {
                            template: name.clone(),
                            base: base_name.clone(),
                        }
                    })?;
                    body.merge_over(base)
                }
                None => body,
            };
            let template = Template::from_doc(name.clone(), merged.clone())?;
            self.raw.insert(name.clone(), merged);
            self.templates.insert(name, Arc::new(template));
        }
        Ok(())
    }

    /// Iterates loaded templates in declaration order.
    pub fn templates(&self) -> impl Iterator<Item = &Arc<Template>> {
        self.templates.values()
    }

    /// Looks up a single template by name.
    pub fn template(&self, name: &str) -> Option<&Arc<Template>> {
        self.templates.get(name)
    }

    /// Finds a longform citation in `text`: templates are tried in
    /// declaration order, and the first one with any match anywhere in the
    /// text wins, regardless of where in the text a later template might
    /// have matched earlier. `broad` scans with each template's extra
    /// permissive patterns.
    pub fn cite(&self, text: &str, broad: bool) -> Option<Citation> {
        self.templates.values().find_map(|template| {
            template
                .cite_match(text, broad, None)
                .map(|m| Citation::from_longform(template.clone(), m))
        })
    }

    /// Scans `text` for every citation. `id_break` is an optional extra
    /// id-chain breakpoint pattern (e.g. a paragraph or heading boundary),
    /// on top of every committed citation's own start.
    pub fn list_cites(&self, text: &str, id_break: Option<&FancyRegex>) -> Vec<Citation> {
        let templates: Vec<Arc<Template>> = self.templates.values().cloned().collect();
        list_cites(&templates, text, id_break)
    }

    /// Groups the result of [`Citator::list_cites`] into authorities.
    pub fn list_authorities(&self, text: &str, id_break: Option<&FancyRegex>) -> Vec<Authority> {
        let citations: Vec<Arc<Citation>> =
            self.list_cites(text, id_break).into_iter().map(Arc::new).collect();
        list_authorities(&citations)
    }

    /// Scans a *markup-tolerant view* of `text`: occurrences of `tags`
    /// (matched case-insensitively as bare `<tag>`/`</tag>` with no
    /// attributes) are removed before scanning, and each resulting
    /// citation's `span`/`text` is mapped back into `text`'s own
    /// coordinates.
    ///
    /// Only the top-level `span`/`text` of each returned citation is
    /// remapped; a citation's `parent` chain (if any) keeps spans in the
    /// stripped view's coordinates. This is sufficient for
    /// [`insert_links`](crate::insert_links), which only reads a
    /// citation's own fields.
    pub fn list_cites_ignoring_markup(
        &self,
        text: &str,
        id_break: Option<&FancyRegex>,
        tags: &phf::Set<&str>,
    ) -> Vec<Citation> {
        let (stripped, map) = crate::rewriter::strip_markup(text, tags);
        self.list_cites(&stripped, id_break)
            .into_iter()
            .map(|c| crate::rewriter::remap_citation(c, &map, text))
            .collect()
    }
}

/// A minimal bundled template set, illustrative rather than exhaustive: a
/// full corpus would compile templates for every US title and a long tail
/// of state-specific sources, which is well outside this crate's scope.
/// Provided so [`default_citator`] has something to load.
const BUNDLED_TEMPLATES_YAML: &str = r#"
U.S.C.:
  meta:
    name: United States Code
  tokens:
    title:
      regex: \d+[A-Za-z]?
    section:
      regex: \d+[a-z0-9-]*
  pattern:
    - '{title}\s+U\.?\s?S\.?\s?C\.?(?:A\.?)?\s*§?\s*{section}'
  shortform pattern:
    - '§\s*{section}'
  idform pattern:
    - '§\s*(?P<section>[\d][a-z0-9-]*)'
  URL builder:
    parts:
      - 'https://www.law.cornell.edu/uscode/text/{title}/{section}'

C.F.R.:
  meta:
    name: Code of Federal Regulations
  tokens:
    title:
      regex: \d+
    part:
      regex: \d+
    section:
      regex: \d+(\.\d+)?
  pattern:
    - '{title}\s+C\.?\s?F\.?\s?R\.?\s*§?\s*{part}\.{section}'
  URL builder:
    parts:
      - 'https://www.ecfr.gov/current/title-{title}/part-{part}/section-{part}.{section}'
"#;

/// The explicit default citator. Unlike a bundled global, nothing in this
/// crate calls this implicitly: callers who want the bundled template set
/// must ask for it by name.
static DEFAULT_CITATOR: LazyLock<Citator> = LazyLock::new(|| {
    let mut citator = Citator::new();
    citator
        .load_yaml_str(BUNDLED_TEMPLATES_YAML)
        .expect("bundled template set is well-formed");
    citator
});

/// Returns the shared default citator, loaded once on first use.
pub fn default_citator() -> &'static Citator {
    &DEFAULT_CITATOR
}

impl Citator {
    /// Builds a fresh, independently extensible `Citator` preloaded with the
    /// bundled default template set. Unlike [`default_citator`], this
    /// returns an owned value a caller can keep loading `--template`
    /// documents into.
    pub fn with_bundled_templates() -> Citator {
        let mut citator = Citator::new();
        citator
            .load_yaml_str(BUNDLED_TEMPLATES_YAML)
            .expect("bundled template set is well-formed");
        citator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc() -> &'static str {
        r"
USC:
  tokens:
    title:
      regex: \d+
    section:
      regex: \d+
  pattern: '{title} U\.S\.C\. {section}'
  URL builder:
    parts:
      - 'https://example.com/{title}/{section}'

USC sub:
  inherit: USC
  meta:
    suffix: sub
"
    }

    #[test]
    fn loads_and_cites_a_template() {
        let mut citator = Citator::new();
        citator.load_yaml_str(sample_doc()).unwrap();
        let citation = citator.cite("See 42 U.S.C. 1983 for details.", false).unwrap();
        assert_eq!(citation.url.as_deref(), Some("https://example.com/42/1983"));
    }

    #[test]
    fn inherit_resolves_against_already_loaded_template() {
        let mut citator = Citator::new();
        citator.load_yaml_str(sample_doc()).unwrap();
        let sub = citator.template("USC sub").unwrap();
        assert_eq!(sub.tokens.len(), 2);
    }

    #[test]
    fn undefined_inherit_is_an_error() {
        let mut citator = Citator::new();
        let result = citator.load_yaml_str("A:\n  inherit: B\n");
        assert!(matches!(result, Err(TemplateLoadError::UndefinedInherit { .. })));
    }

    #[test]
    fn default_citator_loads_bundled_templates() {
        let citator = default_citator();
        assert!(citator.template("U.S.C.").is_some());
    }
}
