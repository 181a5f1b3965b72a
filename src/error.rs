//! Error kinds surfaced to callers.
//!
//! `CitationInvalidation` and `LookupMiss` are deliberately not represented
//! here: both are swallowed internally (`Option`/`Vec` results), never
//! propagated as errors.

use std::path::PathBuf;

/// Which kind of pattern a [`PatternCompileError`] was compiling.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PatternKind {
    /// A longform pattern.
    Longform,
    /// A broad (permissive, case-insensitive) longform pattern.
    Broad,
    /// A shortform pattern.
    Shortform,
    /// An idform pattern.
    Idform,
    /// A URL builder part or edit regex.
    UrlBuilder,
    /// A name builder part or edit regex.
    NameBuilder,
}

impl core::fmt::Display for PatternKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Longform => "longform",
            Self::Broad => "broad",
            Self::Shortform => "shortform",
            Self::Idform => "idform",
            Self::UrlBuilder => "URL builder",
            Self::NameBuilder => "name builder",
        })
    }
}

/// A declarative template document could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum TemplateLoadError {
    /// The document's top level was not a mapping from template name to
    /// template body, or a required field was the wrong shape.
    #[error("malformed template document{}: {message}", path.as_ref().map(|p| format!(" ({})", p.display())).unwrap_or_default())]
    Malformed {
        /// The source path, if loaded from a file.
        path: Option<PathBuf>,
        /// The underlying parser message.
        message: String,
    },
    /// A template's `inherit` key named a template that was not already
    /// loaded.
    #[error("template '{template}' inherits from undefined template '{base}'")]
    UndefinedInherit {
        /// The inheriting template's name.
        template: String,
        /// The missing base template's name.
        base: String,
    },
    /// A pattern referenced a placeholder that names neither a declared
    /// token nor a metadata key.
    #[error("template '{template}' pattern references unknown placeholder '{placeholder}'")]
    UnknownPlaceholder {
        /// The template name.
        template: String,
        /// The unresolved placeholder name.
        placeholder: String,
    },
    /// A pattern failed to compile.
    #[error(transparent)]
    PatternCompile(#[from] PatternCompileError),
}

/// A pattern was syntactically invalid for the underlying regex engine.
#[derive(Debug, thiserror::Error)]
#[error("template '{template}' {kind} pattern failed to compile: {source}")]
pub struct PatternCompileError {
    /// The template the pattern belongs to. For shortform/idform patterns
    /// this is the *parent* template's name.
    pub template: String,
    /// Which kind of pattern failed.
    pub kind: PatternKind,
    /// The underlying regex engine's error.
    #[source]
    pub source: fancy_regex::Error,
}
