//! Groups citations that refer to the same underlying source.

use crate::citation::Citation;
use std::sync::Arc;

/// An equivalence class of citations judged to refer to the same underlying
/// source.
#[derive(Debug)]
pub struct Authority {
    /// The template name shared by every citation in this authority.
    pub template_name: String,
    /// Every citation belonging to this authority, in scan order.
    pub citations: Vec<Arc<Citation>>,
}

/// Groups `citations` into authorities: two citations belong to the same
/// authority iff their templates share a name and, for every token with at
/// least one upper-case character in its *value* (the heuristic used here
/// to recognize "identity" tokens), their values are equal — with
/// severable tokens matching when one is a prefix of the other.
pub fn list_authorities(citations: &[Arc<Citation>]) -> Vec<Authority> {
    let mut authorities: Vec<Authority> = Vec::new();
    'next_citation: for citation in citations {
        for authority in &mut authorities {
            if authority.template_name != citation.template.name {
                continue;
            }
            if let Some(representative) = authority.citations.first() {
                if same_authority(representative, citation) {
                    authority.citations.push(citation.clone());
                    continue 'next_citation;
                }
            }
        }
        authorities.push(Authority {
            template_name: citation.template.name.clone(),
            citations: vec![citation.clone()],
        });
    }
    authorities
}

/// Checks whether `a` and `b` belong to the same authority, per the rule
/// above. Walks the union of token names either citation carries a value
/// for (not just `a.template.tokens`), since underscore-prefixed
/// builder-internal tokens and any name absent from one side still need to
/// be compared against an empty string.
fn same_authority(a: &Citation, b: &Citation) -> bool {
    if a.template.name != b.template.name {
        return false;
    }
    let mut names: std::collections::BTreeSet<&str> =
        a.tokens.keys().map(String::as_str).collect();
    names.extend(b.tokens.keys().map(String::as_str));

    for name in names {
        let a_value = a.tokens.get(name).map(String::as_str).unwrap_or("");
        let b_value = b.tokens.get(name).map(String::as_str).unwrap_or("");
        let has_identity =
            a_value.chars().any(char::is_uppercase) || b_value.chars().any(char::is_uppercase);
        if !has_identity {
            continue;
        }
        let severable = a
            .template
            .tokens
            .get(name)
            .is_some_and(|token| token.severable);
        let matches = if severable {
            a_value.starts_with(b_value) || b_value.starts_with(a_value)
        } else {
            a_value == b_value
        };
        if !matches {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citation::Span;
    use crate::template::Template;
    use indexmap::IndexMap;

    fn bare_template(name: &str) -> Arc<Template> {
        Arc::new(Template {
            name: name.to_string(),
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

    fn citation_with_tokens(template: Arc<Template>, tokens: &[(&str, &str)]) -> Arc<Citation> {
        let mut map = IndexMap::new();
        for (k, v) in tokens {
            map.insert((*k).to_string(), (*v).to_string());
        }
        Arc::new(Citation {
            template,
            span: Span { start: 0, end: 0 },
            text: String::new(),
            raw_tokens: IndexMap::new(),
            tokens: map,
            url: None,
            name: None,
            parent: None,
            is_id: false,
            idform_has_named_captures: false,
            shortform_patterns: vec![],
            idform_patterns: vec![],
        })
    }

    #[test]
    fn groups_citations_with_matching_identity_tokens() {
        let template = bare_template("USC");
        let a = citation_with_tokens(template.clone(), &[("Title", "42")]);
        let b = citation_with_tokens(template, &[("Title", "42")]);
        let authorities = list_authorities(&[a, b]);
        assert_eq!(authorities.len(), 1);
        assert_eq!(authorities[0].citations.len(), 2);
    }

    #[test]
    fn different_identity_values_form_separate_authorities() {
        let template = bare_template("USC");
        let a = citation_with_tokens(template.clone(), &[("Title", "42")]);
        let b = citation_with_tokens(template, &[("Title", "18")]);
        let authorities = list_authorities(&[a, b]);
        assert_eq!(authorities.len(), 2);
    }
}
