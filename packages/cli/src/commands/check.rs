use super::load_document;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Stored document or directory of `.json` documents
    pub input: PathBuf,

    /// Also list documents that load cleanly
    #[arg(short, long)]
    pub verbose: bool,
}

/// Per-document result of a check
#[derive(Debug, Default, Clone, Copy, PartialEq)]
struct FileStatus {
    skipped: usize,
    repairs: usize,
    invalid: bool,
}

impl FileStatus {
    fn is_clean(&self) -> bool {
        self.skipped == 0 && self.repairs == 0 && !self.invalid
    }
}

pub fn check(args: CheckArgs, _cwd: &str) -> Result<()> {
    println!("🔍 {} document check", "Starting".green().bold());
    println!("   Input: {}", args.input.display());
    println!();

    let files = if args.input.is_file() {
        vec![args.input.clone()]
    } else if args.input.is_dir() {
        let files = find_documents(&args.input)?;
        println!("   Found {} documents", files.len());
        println!();
        files
    } else {
        return Err(anyhow!("Input path does not exist: {}", args.input.display()));
    };

    let mut needs_repair = 0;
    let mut invalid = 0;
    for file in &files {
        let status = check_file(file, args.verbose)?;
        if status.invalid {
            invalid += 1;
        } else if !status.is_clean() {
            needs_repair += 1;
        }
    }

    println!();
    println!(
        "✨ {} Check complete!",
        if invalid > 0 {
            "Done".red().bold()
        } else {
            "Done".green().bold()
        }
    );
    println!("   Documents checked: {}", files.len());
    if needs_repair > 0 {
        println!("   {} {}", "Repaired on load:".yellow(), needs_repair);
    }
    if invalid > 0 {
        println!("   {} {}", "Invalid:".red(), invalid);
        return Err(anyhow!("{invalid} document(s) failed validation"));
    }
    if needs_repair == 0 {
        println!("   {} No issues found!", "✓".green());
    }
    Ok(())
}

fn check_file(path: &Path, verbose: bool) -> Result<FileStatus> {
    let (tree, report) = load_document(path)?;
    let validation = tree.validate();
    let status = FileStatus {
        skipped: report.skipped.len(),
        repairs: report.repairs.len(),
        invalid: validation.is_err(),
    };

    if status.is_clean() {
        if verbose {
            println!("{} {}", "✓".green(), path.display());
        }
        return Ok(status);
    }

    println!("{}", path.display());
    for tag in &report.skipped {
        println!("  {} skipped unknown or malformed `{}` node", "warning".yellow().bold(), tag);
    }
    for repair in &report.repairs {
        println!("  {} {}", "repair".blue().bold(), repair);
    }
    if let Err(err) = validation {
        println!("  {} {}", "error".red().bold(), err);
    }
    Ok(status)
}

/// `.json` files under `dir`, following symlinks; loops and repeat visits are skipped
fn find_documents(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(%err, "skipping unreadable entry");
                continue;
            }
        };
        let path = entry.path();
        if !(path.is_file() && path.extension().map(|e| e == "json").unwrap_or(false)) {
            continue;
        }
        let canonical = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        if seen.insert(canonical) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    Ok(files)
}
