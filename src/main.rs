//! Snapvault - Main entry point
//!
//! CLI front end for the snapshot engine. Long-running operations run
//! through the task-runner wrappers so the engine stays off the interactive
//! path; destructive actions ask for confirmation first.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use snapvault::compare::DiffResult;
use snapvault::snapshot::{catalog, SnapshotRef, SnapshotStatus};
use snapvault::utils::format::format_size;
use snapvault::{config::CONFIG_FILE, tasks, utils, Config};
use std::io::{BufRead, Write};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture a new snapshot of the source directory
    Backup {
        /// Directory to snapshot (remembered for next time)
        #[arg(long)]
        source: Option<PathBuf>,

        /// Directory snapshots are stored in (remembered for next time)
        #[arg(long)]
        target: Option<PathBuf>,

        /// Free-text note to attach to the snapshot
        #[arg(long)]
        note: Option<String>,
    },

    /// List snapshots in the target directory, oldest first
    List {
        #[arg(long)]
        target: Option<PathBuf>,
    },

    /// Compare two snapshots by name (older first)
    Compare {
        older: String,
        newer: String,

        #[arg(long)]
        target: Option<PathBuf>,

        /// Print line diffs for modified text files
        #[arg(long)]
        diff: bool,
    },

    /// Restore a snapshot (overlay: files not in the snapshot are kept)
    Restore {
        name: String,

        /// Restore destination; defaults to the snapshot's recorded source
        #[arg(long)]
        to: Option<PathBuf>,

        #[arg(long)]
        target: Option<PathBuf>,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Delete a snapshot and all of its artifacts
    Delete {
        name: String,

        #[arg(long)]
        target: Option<PathBuf>,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Show or set the free-text note attached to a snapshot
    Note {
        name: String,

        /// New note text; omit to print the current note
        text: Option<String>,

        #[arg(long)]
        target: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    utils::logger::init(cli.log_level.as_deref().unwrap_or("warn"))?;

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    let mut config = Config::load(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;

    match cli.command {
        Command::Backup {
            source,
            target,
            note,
        } => {
            remember_dirs(&mut config, &config_path, source.as_ref(), target.as_ref())?;
            let source_dir = resolve_dir(source, config.source_dir.clone(), "source")?;
            let target_dir = resolve_dir(target, config.target_dir.clone(), "target")?;

            let snap = tasks::spawn_create_snapshot(source_dir, target_dir, note).await??;
            println!(
                "Created {} ({} files, {})",
                snap.paths.name,
                snap.manifest.total_files,
                format_size(snap.manifest.total_bytes)
            );
        }

        Command::List { target } => {
            let target_dir = resolve_dir(target, config.target_dir.clone(), "target")?;
            let refs = catalog::list_snapshots(&target_dir)?;
            if refs.is_empty() {
                println!("No snapshots in {}", target_dir.display());
            }
            for snap in &refs {
                print_listing(snap);
            }
        }

        Command::Compare {
            older,
            newer,
            target,
            diff,
        } => {
            let target_dir = resolve_dir(target, config.target_dir.clone(), "target")?;
            let older_ref = catalog::find_snapshot(&target_dir, &older)?;
            let newer_ref = catalog::find_snapshot(&target_dir, &newer)?;

            let result = tasks::spawn_compare(older_ref, newer_ref).await??;
            print_diff(&older, &newer, &result, diff);
        }

        Command::Restore {
            name,
            to,
            target,
            yes,
        } => {
            let target_dir = resolve_dir(target, config.target_dir.clone(), "target")?;
            let snap = catalog::find_snapshot(&target_dir, &name)?;
            let manifest = catalog::load_manifest(&snap)?;
            let restore_to = to.unwrap_or_else(|| manifest.source_directory.clone());

            if !yes
                && !confirm(&format!(
                    "Restore {} onto {}? Conflicting files will be overwritten",
                    name,
                    restore_to.display()
                ))?
            {
                println!("Aborted.");
                return Ok(());
            }

            let report = tasks::spawn_restore(snap, restore_to.clone()).await??;
            if report.is_complete() {
                println!(
                    "Restored {} files to {}",
                    report.restored.len(),
                    restore_to.display()
                );
            } else {
                println!(
                    "Partial restore: {} restored, {} failed, {} not attempted",
                    report.restored.len(),
                    report.failed.len(),
                    report.not_attempted.len()
                );
                for failure in &report.failed {
                    println!("  failed: {} ({})", failure.path, failure.reason);
                }
                for path in &report.not_attempted {
                    println!("  not attempted: {path}");
                }
                bail!("restore of {name} did not complete");
            }
        }

        Command::Delete { name, target, yes } => {
            let target_dir = resolve_dir(target, config.target_dir.clone(), "target")?;
            let snap = catalog::find_snapshot(&target_dir, &name)?;

            if !yes && !confirm(&format!("Delete snapshot {name} and its artifacts?"))? {
                println!("Aborted.");
                return Ok(());
            }

            catalog::delete_snapshot(&snap)?;
            println!("Deleted {name}");
        }

        Command::Note { name, text, target } => {
            let target_dir = resolve_dir(target, config.target_dir.clone(), "target")?;
            let snap = catalog::find_snapshot(&target_dir, &name)?;

            match text {
                Some(text) => {
                    catalog::save_note(&snap, &text)?;
                    println!("Note updated for {name}");
                }
                None => match catalog::load_note(&snap)? {
                    Some(note) => println!("{note}"),
                    None => println!("(no note)"),
                },
            }
        }
    }

    Ok(())
}

/// Pick the explicit flag over the remembered config value; neither set is a
/// usage error.
fn resolve_dir(flag: Option<PathBuf>, remembered: Option<PathBuf>, kind: &str) -> Result<PathBuf> {
    flag.or(remembered)
        .with_context(|| format!("no {kind} directory configured; pass --{kind}"))
}

/// Persist directory flags so the next invocation can omit them.
fn remember_dirs(
    config: &mut Config,
    config_path: &std::path::Path,
    source: Option<&PathBuf>,
    target: Option<&PathBuf>,
) -> Result<()> {
    let mut changed = false;
    if let Some(source) = source {
        if config.source_dir.as_ref() != Some(source) {
            config.source_dir = Some(source.clone());
            changed = true;
        }
    }
    if let Some(target) = target {
        if config.target_dir.as_ref() != Some(target) {
            config.target_dir = Some(target.clone());
            changed = true;
        }
    }
    if changed {
        config
            .save(config_path)
            .with_context(|| format!("saving config to {}", config_path.display()))?;
    }
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let answer = line.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

fn print_listing(snap: &SnapshotRef) {
    match &snap.status {
        SnapshotStatus::Corrupt(reason) => {
            println!("{}  [CORRUPT: {reason}]", snap.name);
        }
        SnapshotStatus::Intact => {
            let detail = catalog::load_manifest(snap)
                .map(|m| format!("{} files, {}", m.total_files, format_size(m.total_bytes)))
                .unwrap_or_else(|e| format!("manifest unreadable: {e}"));
            let note = catalog::load_note(snap)
                .ok()
                .flatten()
                .map(|n| {
                    let n = n.trim().to_string();
                    if n.chars().count() > 30 {
                        format!("  # {}...", n.chars().take(30).collect::<String>())
                    } else {
                        format!("  # {n}")
                    }
                })
                .unwrap_or_default();
            println!("{}  ({detail}){note}", snap.name);
        }
    }
}

fn print_diff(older: &str, newer: &str, diff: &DiffResult, show_lines: bool) {
    println!("Comparing {older} -> {newer}");
    println!("Summary: {}", diff.summary());

    for (title, paths) in [
        ("Added", diff.added.keys().collect::<Vec<_>>()),
        ("Removed", diff.removed.keys().collect::<Vec<_>>()),
        ("Unchanged", diff.unchanged.keys().collect::<Vec<_>>()),
    ] {
        if paths.is_empty() {
            continue;
        }
        println!("\n{title}:");
        for path in paths {
            println!("  {path}");
        }
    }

    if !diff.modified.is_empty() {
        println!("\nModified:");
        for (path, entry) in &diff.modified {
            println!("  {path}");
            match (&entry.line_diff, show_lines) {
                (Some(changes), true) => {
                    for change in changes {
                        let prefix = match change.kind {
                            snapvault::compare::ChangeKind::Insert => '+',
                            snapvault::compare::ChangeKind::Delete => '-',
                            snapvault::compare::ChangeKind::Equal => ' ',
                        };
                        println!("    {prefix} {}", change.text);
                    }
                }
                (None, true) => println!("    (binary change, no line diff)"),
                _ => {}
            }
        }
    }
}
