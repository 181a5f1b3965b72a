#![warn(clippy::pedantic, missing_docs, rust_2018_idioms)]
#![allow(clippy::module_name_repetitions)]
//! Command-line interface over the citation engine.

use citeurl_rs::{export_lookup_table_json, insert_links, Citator, RewritePolicy};
use std::io::Read as _;

/// Errors that may occur when parsing arguments.
#[derive(Debug, thiserror::Error)]
enum ArgsError {
    /// No subcommand was given.
    #[error(
        "missing subcommand (expected one of: cite, list-cites, list-authorities, insert-links, export-js)"
    )]
    MissingCommand,
    /// The subcommand name was not recognized.
    #[error("unknown subcommand '{0}'")]
    UnknownCommand(String),
    /// Extra unknown junk on the command line.
    #[error("unknown arguments: {}", _0.display())]
    Extra(std::ffi::OsString),
    /// Some other parsing error.
    #[error(transparent)]
    Pico(#[from] pico_args::Error),
}

/// Which operation to run.
enum Command {
    /// Print the single earliest citation found.
    Cite,
    /// Print every citation found, one per line.
    ListCites,
    /// Print every authority group found.
    ListAuthorities,
    /// Print the input text with hyperlinks spliced in.
    InsertLinks,
    /// Print a JSON lookup table for embedding in another language.
    ExportJs,
}

/// Command-line arguments.
struct Args {
    /// Which operation to run.
    command: Command,
    /// `--template <path>`, repeatable; additional declarative template
    /// documents to load on top of the bundled default set.
    template_paths: Vec<String>,
    /// Skip the bundled default template set, using only `--template`
    /// paths.
    no_default_templates: bool,
    /// Scan with each template's extra permissive patterns too.
    broad: bool,
    /// The text to scan, or `None` to read it from stdin.
    text: Option<String>,
}

impl Args {
    /// Parses [`Args`] from the process's command line.
    fn new() -> Result<Args, ArgsError> {
        let mut args = pico_args::Arguments::from_env();

        let command = match args.subcommand()?.ok_or(ArgsError::MissingCommand)?.as_str() {
            "cite" => Command::Cite,
            "list-cites" => Command::ListCites,
            "list-authorities" => Command::ListAuthorities,
            "insert-links" => Command::InsertLinks,
            "export-js" => Command::ExportJs,
            other => return Err(ArgsError::UnknownCommand(other.to_string())),
        };

        let mut template_paths = Vec::new();
        while let Some(path) = args.opt_value_from_str::<_, String>("--template")? {
            template_paths.push(path);
        }
        let no_default_templates = args.contains("--no-default-templates");
        let broad = args.contains("--broad");
        let text = args.opt_free_from_str::<String>()?;

        let rest = args.finish();
        if !rest.is_empty() {
            return Err(ArgsError::Extra(rest.join(std::ffi::OsStr::new(" "))));
        }

        Ok(Self {
            command,
            template_paths,
            no_default_templates,
            broad,
            text,
        })
    }
}

/// Command line usage instructions.
fn usage() {
    let exe = std::env::args().next().unwrap_or_default();
    eprintln!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    eprintln!("Usage: {exe} <command> [options] [text]\n");
    eprintln!("Commands:");
    eprintln!("  cite             Print the single earliest citation found");
    eprintln!("  list-cites       Print every citation found, one per line");
    eprintln!("  list-authorities Print every authority group found");
    eprintln!("  insert-links     Print the text with hyperlinks spliced in");
    eprintln!("  export-js        Print a JSON lookup table for embedding elsewhere\n");
    eprintln!("If [text] is omitted, it is read from stdin.\n");
    eprintln!("Options:");
    eprintln!("  --template <path>       Load an extra template document (repeatable)");
    eprintln!("  --no-default-templates  Skip the bundled default template set");
    eprintln!("  --broad                 Also scan with each template's broad patterns");
}

/// Builds the citator for a run, per `--template`/`--no-default-templates`.
fn build_citator(args: &Args) -> Result<Citator, citeurl_rs::TemplateLoadError> {
    let mut citator = if args.no_default_templates {
        Citator::new()
    } else {
        Citator::with_bundled_templates()
    };
    for path in &args.template_paths {
        citator.load_yaml_file(std::path::Path::new(path))?;
    }
    Ok(citator)
}

fn read_text(args: &Args) -> std::io::Result<String> {
    match &args.text {
        Some(text) => Ok(text.clone()),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

/// Runs the requested command, returning the process exit code: `0` on
/// success with output, `1` on success with no matches, `2` on error.
fn run() -> Result<i32, Box<dyn std::error::Error>> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let args = match Args::new() {
        Ok(args) => args,
        Err(err) => {
            usage();
            return Err(Box::new(err));
        }
    };

    let citator = build_citator(&args)?;

    if let Command::ExportJs = args.command {
        println!("{}", export_lookup_table_json(&citator)?);
        return Ok(0);
    }

    let text = read_text(&args)?;

    match args.command {
        Command::Cite => match citator.cite(&text, args.broad) {
            Some(citation) => {
                println!("{}", citation.text);
                if let Some(url) = &citation.url {
                    println!("{url}");
                }
                Ok(0)
            }
            None => Ok(1),
        },
        Command::ListCites => {
            let citations = citator.list_cites(&text, None);
            if citations.is_empty() {
                return Ok(1);
            }
            for citation in &citations {
                match &citation.url {
                    Some(url) => println!("{}\t{url}", citation.text),
                    None => println!("{}", citation.text),
                }
            }
            Ok(0)
        }
        Command::ListAuthorities => {
            let authorities = citator.list_authorities(&text, None);
            if authorities.is_empty() {
                return Ok(1);
            }
            for authority in &authorities {
                let names: Vec<&str> = authority.citations.iter().map(|c| c.text.as_str()).collect();
                println!("{}: {}", authority.template_name, names.join(" ~ "));
            }
            Ok(0)
        }
        Command::InsertLinks => {
            let citations: Vec<_> = citator.list_cites(&text, None).into_iter().map(std::sync::Arc::new).collect();
            if citations.is_empty() {
                println!("{text}");
                return Ok(1);
            }
            let policy = RewritePolicy::default();
            println!("{}", insert_links(&text, &citations, &policy));
            Ok(0)
        }
        Command::ExportJs => unreachable!("handled before text was read"),
    }
}

/// Uses the [`Display`](core::fmt::Display) formatter for an error even when
/// the [`Debug`](core::fmt::Debug) formatter is requested.
struct DisplayError(Box<dyn std::error::Error>);

impl core::fmt::Debug for DisplayError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

fn main() {
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:?}", DisplayError(err));
            std::process::exit(2);
        }
    }
}
