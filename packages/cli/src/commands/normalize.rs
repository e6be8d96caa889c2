use super::emit;
use super::render::print_repairs;
use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use scribe_editor::EditorSession;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct NormalizeArgs {
    /// Stored document in any accepted shape
    pub input: PathBuf,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Rewrite the input file in place
    #[arg(long, conflicts_with = "output")]
    pub in_place: bool,

    /// Emit compact JSON
    #[arg(long)]
    pub compact: bool,
}

/// Rewrite a stored document in the current canonical JSON shape
pub fn normalize(args: NormalizeArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let content = fs::read_to_string(&args.input)
        .with_context(|| format!("Cannot read {}", args.input.display()))?;

    let id = args.input.display().to_string();
    let (session, report) = EditorSession::from_value(id, &Value::String(content), config.editor);
    print_repairs(&args.input, &report);

    let value = session.serialize();
    let json = if args.compact {
        serde_json::to_string(&value)?
    } else {
        serde_json::to_string_pretty(&value)?
    };

    let output = if args.in_place {
        Some(args.input.as_path())
    } else {
        args.output.as_deref()
    };
    emit(output, &json)?;

    if let Some(path) = output {
        eprintln!("{} {}", "✓".green(), path.display());
    }
    Ok(())
}
