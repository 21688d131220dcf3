//! `glaemc`: a thin CLI collaborator around [`glaemscribe::mode::Mode`].
//!
//! Loads a `.glaem` mode file (plus whatever `.cst` charset files it
//! references, resolved relative to the mode file's directory), compiles
//! it, and transcribes one piece of input text through it.

use clap::Parser as ClapParser;
use glaemscribe::glaem;
use glaemscribe::mode::{CharsetSources, Mode};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(ClapParser)]
#[command(name = "glaemc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Transliterate text through a glaemscribe mode", long_about = None)]
struct Cli {
    /// Path to the `.glaem` mode file to compile.
    mode: PathBuf,

    /// Input text to transcribe.
    text: String,

    /// Charset name to transcribe into (defaults to the mode's first
    /// declared charset).
    #[arg(short, long)]
    charset: Option<String>,

    /// Directory holding the `.cst` files the mode file references by name
    /// (defaults to the mode file's own directory).
    #[arg(long)]
    charset_dir: Option<PathBuf>,

    /// Print the processor's debug trace (trie reachability) as JSON
    /// instead of transcribing.
    #[arg(long)]
    debug_tree: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("glaemscribe=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    run(&cli)
}

fn run(cli: &Cli) -> ExitCode {
    let mode_source = match std::fs::read_to_string(&cli.mode) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("0:io_error: failed to read {}: {e}", cli.mode.display());
            return ExitCode::FAILURE;
        }
    };

    let charset_dir = cli.charset_dir.clone().unwrap_or_else(|| {
        cli.mode.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."))
    });

    let document = match glaem::parse(&mode_source) {
        Ok(doc) => doc,
        Err(errors) => {
            print_errors(&errors);
            return ExitCode::FAILURE;
        }
    };

    let mut cst_docs = HashMap::new();
    let mut cst_sources = HashMap::new();
    for node in document.children_named("charset") {
        let Some(ref_name) = node.args.get(1) else { continue };
        if cst_sources.contains_key(ref_name.as_str()) {
            continue;
        }
        let path = charset_dir.join(format!("{ref_name}.cst"));
        match std::fs::read_to_string(&path) {
            Ok(src) => {
                cst_sources.insert(ref_name.clone(), src);
            }
            Err(e) => {
                eprintln!("0:io_error: failed to read {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        }
    }
    for (name, src) in &cst_sources {
        match glaem::parse(src) {
            Ok(doc) => {
                cst_docs.insert(name.clone(), doc);
            }
            Err(errors) => {
                print_errors(&errors);
                return ExitCode::FAILURE;
            }
        }
    }

    let mut sources: CharsetSources = HashMap::new();
    for (name, doc) in &cst_docs {
        sources.insert(name.as_str(), doc);
    }

    let mode = match Mode::finalize(&mode_source, &sources) {
        Ok(m) => m,
        Err(errors) => {
            print_errors(errors.iter());
            return ExitCode::FAILURE;
        }
    };

    if cli.debug_tree {
        match serde_json::to_string_pretty(&mode.debug_tree()) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("0:io_error: failed to serialize debug tree: {e}");
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    match mode.transcribe(&cli.text, cli.charset.as_deref()) {
        Some(output) => {
            println!("{}", output.text);
            for warning in &output.warnings {
                eprintln!("warning: {}", warning.message);
            }
            ExitCode::SUCCESS
        }
        None => {
            eprintln!("0:charset_error: unknown charset, or mode declares none");
            ExitCode::FAILURE
        }
    }
}

fn print_errors<'a>(errors: impl IntoIterator<Item = &'a glaemscribe::ModeError>) {
    for err in errors {
        eprintln!("{err}");
    }
}
