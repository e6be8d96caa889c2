use super::{emit, load_document};
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use scribe_model::{document_excerpt, render_with, DeserializeReport, NodeRegistry};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Stored document (JSON or plain text)
    pub input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// One block per indented line (overrides config)
    #[arg(long)]
    pub pretty: bool,
}

pub fn render(args: RenderArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let (tree, report) = load_document(&args.input)?;
    print_repairs(&args.input, &report);

    let mut options = config.render.options();
    options.pretty |= args.pretty;
    let html = render_with(&tree, NodeRegistry::global(), &options);
    info!(input = %args.input.display(), bytes = html.len(), "rendered document");

    emit(args.output.as_deref(), &html)
}

#[derive(Debug, Args)]
pub struct ExcerptArgs {
    /// Stored document (JSON or plain text)
    pub input: PathBuf,

    /// Characters to keep (defaults to the configured excerpt limit)
    #[arg(short, long)]
    pub limit: Option<usize>,
}

pub fn excerpt(args: ExcerptArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let (tree, report) = load_document(&args.input)?;
    print_repairs(&args.input, &report);

    let limit = args.limit.unwrap_or(config.editor.excerpt_limit);
    println!("{}", document_excerpt(&tree, limit));
    Ok(())
}

/// Deserialization repairs go to stderr so stdout stays clean for piping
pub(crate) fn print_repairs(input: &Path, report: &DeserializeReport) {
    if report.is_clean() {
        return;
    }
    eprintln!(
        "{} {} was repaired while loading",
        "⚠️".yellow(),
        input.display()
    );
    for tag in &report.skipped {
        eprintln!("   {} skipped {}", "-".dimmed(), tag);
    }
    for repair in &report.repairs {
        eprintln!("   {} {}", "-".dimmed(), repair);
    }
}
