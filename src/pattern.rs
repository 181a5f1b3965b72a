//! Expands template placeholders into compilable regex source.
//!
//! This module is a pure function over strings; it knows nothing about
//! [`Template`](crate::template::Template) or
//! [`Citation`](crate::citation::Citation).

use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

/// Matches a `{name}` or `{same name}` placeholder.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(same\s+)?([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

/// Replaces each `{[same ]name}` marker in `pattern` with its entry in
/// `replacements`, keyed by `name` (plain markers) or `"same name"` (same
/// markers). A marker whose key is absent from `replacements` is left
/// untouched, so that multi-round substitution (plain tokens/meta first,
/// `{same X}` later once a parent citation is known) works by calling this
/// function more than once with progressively larger maps.
///
/// If `outer_word_break` is true, the whole result is wrapped with a
/// negative lookbehind/lookahead `\w` guard.
pub(crate) fn process_pattern(
    pattern: &str,
    replacements: &HashMap<String, String>,
    outer_word_break: bool,
) -> String {
    let expanded = PLACEHOLDER.replace_all(pattern, |caps: &regex::Captures<'_>| {
        let is_same = caps.get(1).is_some();
        let name = &caps[2];
        let key = if is_same {
            format!("same {name}")
        } else {
            name.to_string()
        };
        match replacements.get(&key) {
            Some(value) => wrap_with_guard(value),
            None => caps[0].to_string(),
        }
    });

    if outer_word_break {
        format!(r"(?<!\w)(?:{expanded})(?!\w)")
    } else {
        expanded.into_owned()
    }
}

/// Wraps `value` in a non-capturing group (unless already parenthesized) and
/// appends a positive lookahead word-break guard.
fn wrap_with_guard(value: &str) -> String {
    let body = if is_parenthesized(value) {
        value.to_string()
    } else {
        format!("(?:{value})")
    };
    format!("{body}(?!\\w)")
}

/// Best-effort check for "the whole fragment is already one parenthesized
/// group", to avoid double-wrapping, via a simple balance scan.
fn is_parenthesized(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.first() != Some(&b'(') || bytes.last() != Some(&b')') {
        return false;
    }
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 && i != bytes.len() - 1 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Returns true if `pattern` still contains any unresolved `{[same ]name}`
/// markers, i.e. it needs a later substitution round before it can compile.
pub(crate) fn has_unresolved_placeholder(pattern: &str) -> bool {
    PLACEHOLDER.is_match(pattern)
}

/// Returns every placeholder in `pattern` that cannot be resolved: a plain
/// `{name}` must name an entry of `known_plain` (a token or metadata key); a
/// `{same name}` must have `name` in `known_same` (token names), and only
/// when `known_same` is given at all — longform/broad patterns pass `None`
/// since `{same X}` is only valid in shortform/idform patterns. The
/// returned strings are `"same name"` for a bad `same` marker, `name`
/// otherwise, suitable for direct use in an error message.
pub(crate) fn unknown_placeholders(
    pattern: &str,
    known_plain: &HashSet<String>,
    known_same: Option<&HashSet<String>>,
) -> Vec<String> {
    PLACEHOLDER
        .captures_iter(pattern)
        .filter_map(|caps| {
            let is_same = caps.get(1).is_some();
            let name = caps[2].to_string();
            if is_same {
                match known_same {
                    Some(set) if set.contains(&name) => None,
                    _ => Some(format!("same {name}")),
                }
            } else if known_plain.contains(&name) {
                None
            } else {
                Some(name)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_plain_placeholder_and_guards_it() {
        let mut replacements = HashMap::new();
        replacements.insert("section".to_string(), r"\d+".to_string());
        let out = process_pattern("§ {section}", &replacements, false);
        assert_eq!(out, r"§ (?:\d+)(?!\w)");
    }

    #[test]
    fn leaves_same_placeholder_when_key_absent() {
        let replacements = HashMap::new();
        let out = process_pattern("Id. at {same section}", &replacements, false);
        assert_eq!(out, "Id. at {same section}");
        assert!(has_unresolved_placeholder(&out));
    }

    #[test]
    fn resolves_same_placeholder_once_provided() {
        let mut replacements = HashMap::new();
        replacements.insert("same section".to_string(), "1988".to_string());
        let out = process_pattern("Id. at {same section}", &replacements, false);
        assert_eq!(out, "Id. at (?:1988)(?!\\w)");
    }

    #[test]
    fn outer_word_break_wraps_whole_pattern() {
        let replacements = HashMap::new();
        let out = process_pattern("Id\\.", &replacements, true);
        assert_eq!(out, r"(?<!\w)(?:Id\.)(?!\w)");
    }

    #[test]
    fn does_not_double_wrap_already_parenthesized_value() {
        let mut replacements = HashMap::new();
        replacements.insert("x".to_string(), "(?:a|b)".to_string());
        let out = process_pattern("{x}", &replacements, false);
        assert_eq!(out, "(?:a|b)(?!\\w)");
    }

    #[test]
    fn plain_placeholder_unknown_to_known_plain_is_flagged() {
        let known: HashSet<String> = ["section".to_string()].into_iter().collect();
        let bad = unknown_placeholders("{title} {section}", &known, None);
        assert_eq!(bad, vec!["title".to_string()]);
    }

    #[test]
    fn same_placeholder_without_known_same_is_flagged() {
        let known: HashSet<String> = ["section".to_string()].into_iter().collect();
        let bad = unknown_placeholders("Id. at {same section}", &known, None);
        assert_eq!(bad, vec!["same section".to_string()]);
    }

    #[test]
    fn same_placeholder_resolved_when_token_known() {
        let known: HashSet<String> = ["section".to_string()].into_iter().collect();
        let bad = unknown_placeholders("Id. at {same section}", &known, Some(&known));
        assert!(bad.is_empty());
    }
}
