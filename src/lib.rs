//! Recognizes, normalizes, and hyperlinks legal citations in free-form
//! text.
#![warn(clippy::pedantic, missing_docs, rust_2018_idioms)]
#![allow(clippy::module_name_repetitions)]

mod authority;
mod builder;
mod citation;
mod citator;
mod config;
mod error;
mod jsexport;
mod pattern;
mod rewriter;
#[cfg(feature = "server")]
mod server;
mod scanner;
mod template;
mod tokens;

pub use authority::{list_authorities, Authority};
pub use citation::{Citation, Span};
pub use citator::{default_citator, Citator};
pub use error::{PatternCompileError, PatternKind, TemplateLoadError};
pub use jsexport::{
    export_lookup_table, export_lookup_table_json, JsLookupEntry, JsOperation, JsOperationKind,
};
pub use rewriter::{insert_links, scan_and_insert_links, RewritePolicy, IGNORED_INLINE_TAGS};
pub use template::Template;
pub use tokens::{Case, NumberStyle, OperationKind, TokenOperation, TokenType};

#[cfg(feature = "server")]
pub use server::serve;

#[cfg(test)]
mod tests;
