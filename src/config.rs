//! The declarative template document schema, and conversion from parsed
//! documents into the runtime [`TokenType`]/[`TokenOperation`]/
//! [`StringBuilder`] types.

use crate::builder::StringBuilder;
use crate::error::TemplateLoadError;
use crate::tokens::{Case, NumberStyle, OperationKind, TokenOperation, TokenType};
use fancy_regex::Regex as FancyRegex;
use indexmap::IndexMap;
use serde::Deserialize;

/// A whole declarative template document: template name → body. Later
/// documents loaded into the same [`Citator`](crate::citator::Citator)
/// override earlier entries by name.
pub(crate) type TemplateSetDoc = IndexMap<String, TemplateDoc>;

/// One template's declarative body.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct TemplateDoc {
    /// Free-form metadata available to patterns and builders.
    #[serde(default)]
    pub meta: IndexMap<String, String>,
    /// Ordered token declarations.
    #[serde(default)]
    pub tokens: IndexMap<String, TokenDoc>,
    /// Longform pattern(s).
    #[serde(default, alias = "patterns")]
    pub pattern: Option<StringOrList>,
    /// Extra permissive longform pattern(s), only used when scanning broad.
    #[serde(default, rename = "broad pattern", alias = "broad patterns")]
    pub broad_pattern: Option<StringOrList>,
    /// Shortform pattern(s); may reference `{same X}`.
    #[serde(default, rename = "shortform pattern", alias = "shortform patterns")]
    pub shortform_pattern: Option<StringOrList>,
    /// Idform pattern(s); may reference `{same X}`.
    #[serde(default, rename = "idform pattern", alias = "idform patterns")]
    pub idform_pattern: Option<StringOrList>,
    /// Canonical-name builder.
    #[serde(default, rename = "name builder")]
    pub name_builder: Option<StringBuilderDoc>,
    /// URL builder.
    #[serde(default, rename = "URL builder")]
    pub url_builder: Option<StringBuilderDoc>,
    /// Name of an already-loaded template to use as a base.
    #[serde(default)]
    pub inherit: Option<String>,
}

impl TemplateDoc {
    /// Layers `self` on top of `base`: fields `self` left unset fall back to
    /// `base`'s, `meta`/`tokens` maps merge (self's entries override base's
    /// by key).
    pub(crate) fn merge_over(self, base: &TemplateDoc) -> TemplateDoc {
        let mut meta = base.meta.clone();
        meta.extend(self.meta);
        let mut tokens = base.tokens.clone();
        tokens.extend(self.tokens);
        TemplateDoc {
            meta,
            tokens,
            pattern: self.pattern.or_else(|| base.pattern.clone()),
            broad_pattern: self.broad_pattern.or_else(|| base.broad_pattern.clone()),
            shortform_pattern: self
                .shortform_pattern
                .or_else(|| base.shortform_pattern.clone()),
            idform_pattern: self.idform_pattern.or_else(|| base.idform_pattern.clone()),
            name_builder: self.name_builder.or_else(|| base.name_builder.clone()),
            url_builder: self.url_builder.or_else(|| base.url_builder.clone()),
            inherit: None,
        }
    }
}

/// Accepts either a single pattern string, or a list of alternative pattern
/// strings (each compiled as its own regex, one entry of
/// `Template::regexes`).
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum StringOrList {
    /// A single pattern.
    One(String),
    /// Several alternative patterns.
    Many(Vec<String>),
}

impl StringOrList {
    pub(crate) fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(s) => vec![s],
            Self::Many(v) => v,
        }
    }
}

/// A declarative [`TokenType`].
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct TokenDoc {
    /// The unwrapped regex fragment.
    pub regex: String,
    /// Normalization edits, applied in order.
    #[serde(default)]
    pub edits: Vec<OperationDoc>,
    /// Default value when the token is absent.
    #[serde(default)]
    pub default: Option<String>,
    /// Whether a prefix match still counts as the same authority.
    #[serde(default)]
    pub severable: bool,
}

impl TokenDoc {
    pub(crate) fn into_token_type(self, template: &str) -> Result<TokenType, TemplateLoadError> {
        let edits = self
            .edits
            .into_iter()
            .map(|op| op.into_operation(template))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TokenType {
            regex: self.regex,
            edits,
            default: self.default,
            severable: self.severable,
        })
    }
}

/// Accepts a bare length, or a `[length, pad_char]` pair.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum LPadDoc {
    /// Pad with `'0'`.
    Len(usize),
    /// Pad with the given character.
    LenChar(usize, String),
}

/// A declarative [`TokenOperation`].
#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct OperationDoc {
    /// `[pattern, replacement]` regex substitution.
    #[serde(default)]
    pub sub: Option<(String, String)>,
    /// Case-insensitive full-match lookup table, in document order.
    #[serde(default)]
    pub lookup: Option<IndexMap<String, String>>,
    /// `"upper"`, `"lower"`, or `"title"`.
    #[serde(default)]
    pub case: Option<String>,
    /// Zero-pad length, optionally with a custom pad character.
    #[serde(default)]
    pub lpad: Option<LPadDoc>,
    /// `"digit"`, `"roman"` (or `"roman numeral"`), `"cardinal"`, or
    /// `"ordinal"`.
    #[serde(default, rename = "number style")]
    pub number_style: Option<String>,
    /// Whether a failed lookup/number-style conversion invalidates the
    /// enclosing build. Defaults to `true`.
    #[serde(default = "default_true")]
    pub mandatory: bool,
    /// Input token name, when used inside a `StringBuilder`.
    #[serde(default)]
    pub token: Option<String>,
    /// Output token name, when used inside a `StringBuilder`.
    #[serde(default)]
    pub output: Option<String>,
}

fn default_true() -> bool {
    true
}

impl OperationDoc {
    pub(crate) fn into_operation(self, template: &str) -> Result<TokenOperation, TemplateLoadError> {
        let malformed = |message: String| TemplateLoadError::Malformed {
            path: None,
            message: format!("template '{template}': {message}"),
        };

        let kind = if let Some((pattern, replacement)) = &self.sub {
            let compiled = FancyRegex::new(pattern)
                .map_err(|e| malformed(format!("invalid 'sub' pattern '{pattern}': {e}")))?;
            OperationKind::Sub(compiled, replacement.clone())
        } else if let Some(table) = &self.lookup {
            let mut compiled = Vec::with_capacity(table.len());
            for (pattern, replacement) in table {
                let regex = fancy_regex::RegexBuilder::new(&format!("^(?:{pattern})$"))
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        malformed(format!("invalid 'lookup' key '{pattern}': {e}"))
                    })?;
                compiled.push((regex, replacement.clone()));
            }
            OperationKind::Lookup(compiled)
        } else if let Some(case) = &self.case {
            let case = match case.as_str() {
                "upper" => Case::Upper,
                "lower" => Case::Lower,
                "title" => Case::Title,
                other => return Err(malformed(format!("unknown case style '{other}'"))),
            };
            OperationKind::Case(case)
        } else if let Some(lpad) = &self.lpad {
            let (min_len, pad_char) = match lpad {
                LPadDoc::Len(len) => (*len, '0'),
                LPadDoc::LenChar(len, ch) => (
                    *len,
                    ch.chars().next().ok_or_else(|| malformed("empty lpad character".into()))?,
                ),
            };
            OperationKind::LPad { min_len, pad_char }
        } else if let Some(style) = &self.number_style {
            let style = match style.as_str() {
                "digit" => NumberStyle::Digit,
                "roman" | "roman numeral" => NumberStyle::Roman,
                "cardinal" => NumberStyle::Cardinal,
                "ordinal" => NumberStyle::Ordinal,
                other => return Err(malformed(format!("unknown number style '{other}'"))),
            };
            OperationKind::NumberStyle(style)
        } else {
            return Err(malformed("operation has no recognized action key".into()));
        };

        Ok(TokenOperation {
            kind,
            mandatory: self.mandatory,
            token: self.token,
            output: self.output,
        })
    }
}

/// A declarative [`StringBuilder`].
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct StringBuilderDoc {
    /// Literal parts, each possibly containing `{name}` placeholders.
    pub parts: Vec<String>,
    /// Edits run over an ephemeral token copy before interpolation.
    #[serde(default)]
    pub edits: Vec<OperationDoc>,
    /// Default token values.
    #[serde(default)]
    pub defaults: IndexMap<String, String>,
}

impl StringBuilderDoc {
    pub(crate) fn into_builder(
        self,
        template: &str,
        escape_for_url: bool,
    ) -> Result<StringBuilder, TemplateLoadError> {
        let edits = self
            .edits
            .into_iter()
            .map(|op| op.into_operation(template))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(StringBuilder {
            parts: self.parts,
            edits,
            defaults: self.defaults,
            escape_for_url,
        })
    }
}

/// Parses a declarative template document from YAML source.
pub(crate) fn parse_yaml(source: &str) -> Result<TemplateSetDoc, TemplateLoadError> {
    serde_yaml::from_str(source).map_err(|e| TemplateLoadError::Malformed {
        path: None,
        message: e.to_string(),
    })
}
