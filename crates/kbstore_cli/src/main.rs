//! `kbstore` command-line entry point.
//!
//! Opens one store, runs one command, prints plain text (or JSON for `log`).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kbstore_core::hierarchy::query::child_entries;
use kbstore_core::{CoreConfig, DateNotes, NoteTree, Repository, WeekStart, ROOT_NOTE_ID};
use log::debug;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "kbstore")]
#[command(about = "Transactional knowledge-base store")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Config file (TOML). Missing file means defaults.
    #[arg(long, global = true, default_value = "kbstore.toml")]
    config: PathBuf,

    /// SQLite database file; overrides the config file
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Replica source id; overrides the config file
    #[arg(long, global = true)]
    source_id: Option<String>,

    /// Output as JSON where supported
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create (or migrate) the store and print its source id
    Init,
    /// Print sync ledger entries
    Log {
        /// Only entries with a greater sync id
        #[arg(long, default_value_t = 0)]
        since: i64,
        /// Resolve each entry to the entity's current state
        #[arg(long)]
        resolve: bool,
        #[arg(long, default_value_t = 1000)]
        limit: u32,
    },
    /// Find or create the date note for YYYY-MM-DD
    DateNote { date: String },
    /// Find or create the date note of the week's first day
    WeekNote {
        date: String,
        /// monday or sunday; defaults to the configured value
        #[arg(long)]
        week_start: Option<String>,
    },
    /// List active notes without any active placement
    Orphans,
    /// Print the note tree below a note
    Tree {
        #[arg(default_value = ROOT_NOTE_ID)]
        note_id: String,
    },
    /// Re-queue a note with its branches and attributes for sync
    ForceSync { note_id: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = CoreConfig::load_from_path(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(db) = cli.db {
        config.db_path = Some(db);
    }
    if let Some(source_id) = cli.source_id {
        config.source_id = Some(source_id);
    }
    if config.log_level.is_none() && config.log_dir.is_none() {
        config.log_level = Some("warn".to_string());
    }
    kbstore_core::init_from_config(&config)
        .map_err(|err| anyhow::anyhow!("starting logging: {err}"))?;

    let repo = Repository::open(&config).context("opening store")?;
    debug!(
        "event=cli_start module=cli status=ok source_id={}",
        repo.source_id()
    );

    match cli.command {
        Commands::Init => {
            println!("source_id={}", repo.source_id());
            println!("last_sync_id={}", repo.last_sync_id()?);
        }
        Commands::Log {
            since,
            resolve,
            limit,
        } => print_log(&repo, since, resolve, limit, cli.json)?,
        Commands::DateNote { date } => {
            let note = DateNotes::from_config(&repo, &config)?.date_note(&date)?;
            println!("{}\t{}", note.note_id, note.title);
        }
        Commands::WeekNote { date, week_start } => {
            let mut notes = DateNotes::from_config(&repo, &config)?;
            if let Some(value) = week_start {
                notes = notes.with_week_start(WeekStart::parse(&value)?);
            }
            let note = notes.week_note(&date)?;
            println!("{}\t{}", note.note_id, note.title);
        }
        Commands::Orphans => {
            for note in NoteTree::new(&repo).orphaned_notes()? {
                println!("{}\t{}", note.note_id, note.title);
            }
        }
        Commands::Tree { note_id } => {
            let note = repo
                .get_note(&note_id)?
                .with_context(|| format!("note not found: {note_id}"))?;
            println!("{}", note.title);
            print_subtree(&repo, &note_id, 1)?;
        }
        Commands::ForceSync { note_id } => {
            let written = repo.force_note_sync(&note_id)?;
            println!("queued {written} ledger entries");
        }
    }
    Ok(())
}

fn print_log(repo: &Repository, since: i64, resolve: bool, limit: u32, json: bool) -> Result<()> {
    if resolve {
        for change in repo.changes_since(since, limit)? {
            if json {
                let line = serde_json::json!({
                    "entry": change.entry,
                    "record": change.record,
                });
                println!("{line}");
            } else {
                println!(
                    "{}\t{}\t{}\t{}",
                    change.entry.sync_id,
                    change.entry.entity_name,
                    change.entry.entity_id,
                    if change.record.is_some() { "present" } else { "missing" }
                );
            }
        }
        return Ok(());
    }

    for entry in repo.read_since(since)?.into_iter().take(limit as usize) {
        if json {
            println!("{}", serde_json::to_string(&entry)?);
        } else {
            println!(
                "{}\t{}\t{}\t{}\t{}",
                entry.sync_id,
                entry.entity_name,
                entry.entity_id,
                entry.source_id,
                entry.utc_date_changed
            );
        }
    }
    Ok(())
}

fn print_subtree(repo: &Repository, parent_note_id: &str, depth: usize) -> Result<()> {
    let entries = repo.read(|conn| child_entries(conn, parent_note_id))?;
    for (branch, note) in entries {
        let prefix = branch
            .prefix
            .as_deref()
            .map(|prefix| format!("{prefix} - "))
            .unwrap_or_default();
        println!("{}{}{}", "  ".repeat(depth), prefix, note.title);
        print_subtree(repo, &note.note_id, depth + 1)?;
    }
    Ok(())
}
