//! A portable, lookup-only projection of a [`Citator`](crate::citator::Citator)
//! for embedding in non-Rust consumers (e.g. a browser-side script).
//!
//! This is deliberately a reduced view: it carries enough to recognize a
//! citation and build its URL/name, but none of the shortform/idform
//! chaining or authority-grouping machinery, since those need the full
//! Scanner rather than a single independent regex match.

use crate::citator::Citator;
use crate::template::Template;
use crate::tokens::{Case, NumberStyle, OperationKind, TokenOperation};
use indexmap::IndexMap;
use serde::Serialize;

/// A single string transform, flattened to a form a non-Rust consumer can
/// replay without any of this crate's types.
#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum JsOperationKind {
    /// Regex substitution: `(pattern, replacement)`.
    Sub {
        /// Regex source, in the same dialect as `JsLookupEntry::patterns`.
        pattern: String,
        replacement: String,
    },
    /// Case-insensitive full-match lookup; first match wins.
    Lookup {
        /// `(pattern, replacement)` pairs, in priority order.
        table: Vec<(String, String)>,
    },
    /// Case-fold the value.
    Case { style: Case },
    /// Left-pad with `pad_char` until at least `min_len` characters long.
    LPad { min_len: usize, pad_char: char },
    /// Reinterpret the value as a number and re-emit it in `style`.
    NumberStyle { style: NumberStyle },
}

/// One operation from a template's flattened edit list: which token it
/// applies to in place, whether its failure is fatal, and what it does.
/// Only in-place operations are representable here; one whose `output`
/// forks to a separate token is dropped before reaching this type (see
/// [`flat_operations`]).
#[derive(Debug, Serialize)]
pub struct JsOperation {
    /// The token this operation reads from and rewrites in place.
    pub token: Option<String>,
    /// Whether a failed lookup/number-style conversion invalidates the
    /// citation.
    pub mandatory: bool,
    #[serde(flatten)]
    pub kind: JsOperationKind,
}

/// One template's lookup-only projection.
#[derive(Debug, Serialize)]
pub struct JsLookupEntry {
    /// Longform regex sources, in the same alternative order as
    /// `Template::regexes`. Consumers compile these with their own regex
    /// engine; fancy-regex's lookaround syntax (`(?!\w)`, `(?<!\w)`) is
    /// supported by ECMAScript 2018+ engines but not older ones.
    pub patterns: Vec<String>,
    /// Every token edit and URL-builder edit, merged in application order:
    /// each token's own edits (token declaration order), then the URL
    /// builder's edits. Operations whose `output` is set write to a
    /// separate token rather than producing the emitted value and are
    /// dropped from this list.
    pub operations: Vec<JsOperation>,
    /// URL builder parts, still containing unexpanded `{name}`
    /// placeholders for the consumer to interpolate against its own
    /// captured token values.
    pub url_parts: Vec<String>,
    /// Name builder parts, same shape as `url_parts`.
    pub name_parts: Vec<String>,
    /// Free-form template metadata, copied through verbatim.
    pub meta: IndexMap<String, String>,
}

/// Serializes [`export_lookup_table`]'s result to a JSON string, ready to
/// embed in a generated script (e.g. `const CITEURL_TEMPLATES = ...;`).
pub fn export_lookup_table_json(citator: &Citator) -> serde_json::Result<String> {
    serde_json::to_string(&export_lookup_table(citator))
}

/// Builds a lookup-only table from every template in `citator` that has a
/// URL builder, in declaration order, suitable for `serde_json::to_string`
/// and embedding in a generated script. Templates with no URL builder carry
/// nothing a lookup-only consumer could act on and are omitted.
pub fn export_lookup_table(citator: &Citator) -> IndexMap<String, JsLookupEntry> {
    let mut table = IndexMap::new();
    for template in citator.templates() {
        let Some(url_builder) = template.url_builder.as_ref() else {
            continue;
        };
        let patterns = template.regexes.iter().map(|r| r.as_str().to_string()).collect();
        let operations = flat_operations(template);
        let name_parts = template
            .name_builder
            .as_ref()
            .map(|b| b.parts.clone())
            .unwrap_or_default();
        table.insert(
            template.name.clone(),
            JsLookupEntry {
                patterns,
                operations,
                url_parts: url_builder.parts.clone(),
                name_parts,
                meta: template.meta.clone(),
            },
        );
    }
    table
}

/// Flattens a template's per-token edits and URL-builder edits into a
/// single ordered list, dropping any operation whose `output` is set (it
/// writes a side token rather than contributing to the emitted value).
fn flat_operations(template: &Template) -> Vec<JsOperation> {
    let mut ops = Vec::new();
    for (token_name, token_type) in &template.tokens {
        for edit in &token_type.edits {
            if let Some(op) = to_js_operation(edit, Some(token_name.as_str())) {
                ops.push(op);
            }
        }
    }
    if let Some(url_builder) = &template.url_builder {
        for edit in &url_builder.edits {
            if let Some(op) = to_js_operation(edit, None) {
                ops.push(op);
            }
        }
    }
    ops
}

/// Converts one [`TokenOperation`] to its JS-exportable form, or `None` if
/// it only projects to a side token (`output` set). `implicit_token` fills
/// in the operated-on token name for a `TokenType`'s own edits, which leave
/// `token`/`output` unset since they act on the value being normalized
/// directly rather than through a token map.
fn to_js_operation(op: &TokenOperation, implicit_token: Option<&str>) -> Option<JsOperation> {
    if op.output.is_some() {
        return None;
    }
    let kind = match &op.kind {
        OperationKind::Sub(pattern, replacement) => JsOperationKind::Sub {
            pattern: pattern.as_str().to_string(),
            replacement: replacement.clone(),
        },
        OperationKind::Lookup(table) => JsOperationKind::Lookup {
            table: table.iter().map(|(p, r)| (p.as_str().to_string(), r.clone())).collect(),
        },
        OperationKind::Case(case) => JsOperationKind::Case { style: *case },
        OperationKind::LPad { min_len, pad_char } => {
            JsOperationKind::LPad { min_len: *min_len, pad_char: *pad_char }
        }
        OperationKind::NumberStyle(style) => JsOperationKind::NumberStyle { style: *style },
    };
    Some(JsOperation {
        token: op.token.clone().or_else(|| implicit_token.map(str::to_string)),
        mandatory: op.mandatory,
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citator::Citator;

    #[test]
    fn exports_patterns_and_url_parts() {
        let mut citator = Citator::new();
        citator
            .load_yaml_str(
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
",
            )
            .unwrap();
        let table = export_lookup_table(&citator);
        let entry = table.get("USC").unwrap();
        assert_eq!(entry.patterns.len(), 1);
        assert_eq!(entry.url_parts, vec!["https://example.com/{title}/{section}".to_string()]);
    }

    #[test]
    fn flattens_token_edits_in_declaration_order() {
        let mut citator = Citator::new();
        citator
            .load_yaml_str(
                r"
USC:
  tokens:
    title:
      regex: \d+
      edits:
        - lpad: 3
    section:
      regex: \d+
      edits:
        - case: upper
  pattern: '{title} U\.S\.C\. {section}'
  URL builder:
    parts:
      - 'https://example.com/{title}/{section}'
",
            )
            .unwrap();
        let table = export_lookup_table(&citator);
        let entry = table.get("USC").unwrap();
        assert_eq!(entry.operations.len(), 2);
        assert_eq!(entry.operations[0].token.as_deref(), Some("title"));
        assert_eq!(entry.operations[1].token.as_deref(), Some("section"));
    }

    #[test]
    fn templates_without_a_url_builder_are_omitted() {
        let mut citator = Citator::new();
        citator
            .load_yaml_str(
                r"
NoUrl:
  tokens:
    section:
      regex: \d+
  pattern: '§ {section}'
",
            )
            .unwrap();
        let table = export_lookup_table(&citator);
        assert!(table.get("NoUrl").is_none());
    }
}
