//! Composes a string (URL or canonical name) from tokens and metadata.

use crate::tokens::TokenOperation;
use indexmap::IndexMap;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left unescaped when interpolating a captured token value into
/// a URL builder's parts: the RFC 3986 unreserved set. Everything else,
/// including path/query separators like `/` and `&`, is percent-encoded,
/// since an interpolated value is untrusted captured text, not the
/// template author's own literal URL structure.
const URL_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// An ordered sequence of text parts, edits, and defaults used to build a
/// URL or display name from a citation's tokens.
#[derive(Debug)]
pub struct StringBuilder {
    /// Literal text parts, each possibly containing `{name}` placeholders.
    pub parts: Vec<String>,
    /// Edits run over an ephemeral copy of the tokens before interpolation.
    pub edits: Vec<TokenOperation>,
    /// Default token values, overridden by anything the citation supplies.
    pub defaults: IndexMap<String, String>,
    /// Whether interpolated token values are percent-encoded before being
    /// spliced into a part. Set for URL builders, unset for name builders.
    pub escape_for_url: bool,
}

impl StringBuilder {
    /// Builds the string. Returns `None` if nothing was
    /// produced, or if a mandatory edit failed.
    pub(crate) fn build(&self, tokens: &IndexMap<String, String>) -> Option<String> {
        let mut working = self.defaults.clone();
        for (key, value) in tokens {
            if !value.is_empty() {
                working.insert(key.clone(), value.clone());
            }
        }
        working.retain(|_, v| !v.is_empty());

        for edit in &self.edits {
            if edit.modify_tokens(&mut working).is_err() {
                return None;
            }
        }

        let mut out = String::new();
        let mut produced_anything = false;
        for part in &self.parts {
            match interpolate(part, &working, self.escape_for_url) {
                Some(rendered) => {
                    out.push_str(&rendered);
                    produced_anything = true;
                }
                None => continue,
            }
        }
        if produced_anything { Some(out) } else { None }
    }
}

/// Interpolates `{name}` placeholders in `part` from `tokens`. Returns `None`
/// (silently dropping the whole part) if any placeholder it contains has no
/// entry in `tokens`. When `escape_for_url` is set, interpolated values
/// (never the literal surrounding text) are percent-encoded.
fn interpolate(part: &str, tokens: &IndexMap<String, String>, escape_for_url: bool) -> Option<String> {
    let mut out = String::with_capacity(part.len());
    let mut chars = part.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c == '{' {
            let end = part[i + 1..].find('}')? + i + 1;
            let name = &part[i + 1..end];
            let value = tokens.get(name)?;
            if escape_for_url {
                out.extend(utf8_percent_encode(value, URL_SAFE));
            } else {
                out.push_str(value);
            }
            while let Some(&(j, _)) = chars.peek() {
                if j >= end + 1 {
                    break;
                }
                chars.next();
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_part_with_missing_token() {
        let builder = StringBuilder {
            parts: vec![
                "https://example.com/{title}".to_string(),
                "#{section}".to_string(),
            ],
            edits: vec![],
            defaults: IndexMap::new(),
            escape_for_url: true,
        };
        let mut tokens = IndexMap::new();
        tokens.insert("title".to_string(), "42".to_string());
        assert_eq!(
            builder.build(&tokens),
            Some("https://example.com/42".to_string())
        );
    }

    #[test]
    fn empty_build_is_none() {
        let builder = StringBuilder {
            parts: vec!["{missing}".to_string()],
            edits: vec![],
            defaults: IndexMap::new(),
            escape_for_url: true,
        };
        assert_eq!(builder.build(&IndexMap::new()), None);
    }

    #[test]
    fn url_builder_percent_encodes_interpolated_values() {
        let builder = StringBuilder {
            parts: vec!["https://example.com/search?q={query}".to_string()],
            edits: vec![],
            defaults: IndexMap::new(),
            escape_for_url: true,
        };
        let mut tokens = IndexMap::new();
        tokens.insert("query".to_string(), "foo bar/baz".to_string());
        assert_eq!(
            builder.build(&tokens),
            Some("https://example.com/search?q=foo%20bar%2Fbaz".to_string())
        );
    }

    #[test]
    fn name_builder_does_not_escape_interpolated_values() {
        let builder = StringBuilder {
            parts: vec!["Title {title}".to_string()],
            edits: vec![],
            defaults: IndexMap::new(),
            escape_for_url: false,
        };
        let mut tokens = IndexMap::new();
        tokens.insert("title".to_string(), "42/43".to_string());
        assert_eq!(builder.build(&tokens), Some("Title 42/43".to_string()));
    }
}
