//! Codetable CLI
//!
//! Command-line front for the batch conflict engine and the file-backed
//! codebook store:
//! - validating batches (`check`) with the same results the web/bot layers
//!   consume,
//! - previewing the per-code diff a pending batch would produce (`preview`),
//! - converting bot-style batch text into JSON operations (`parse`),
//! - applying a batch atomically (`apply`).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

use codetable_engine::{
    apply_batch, build_dependencies, check_batch, preview_pending, submit_gate,
};
use codetable_model::{batch_v1, Code, Entry, EntryType, PendingOperation};
use codetable_storage::persistence::FileStore;
use codetable_storage::{Batch, BatchStatus};

mod report;

#[derive(Parser)]
#[command(name = "codetable")]
#[command(
    author,
    version,
    about = "Codetable: collaborative input-method codebook tooling"
)]
struct Cli {
    /// Store directory (codebook.json, batches/, changelog.json).
    #[arg(long, global = true, default_value = "./store")]
    store: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a store directory.
    Init {
        /// Seed a few sample entries.
        #[arg(long)]
        sample: bool,
    },

    /// List persisted entries.
    Entries {
        #[arg(long)]
        json: bool,
    },

    /// Validate a batch file (.json operation array, or .txt batch text).
    Check {
        batch: PathBuf,
        #[arg(long)]
        json: bool,
        /// Also print dependency edges for in-batch-resolved conflicts.
        #[arg(long)]
        deps: bool,
    },

    /// Preview the per-code diff a pending batch would produce.
    Preview {
        batch: PathBuf,
        #[arg(long)]
        json: bool,
    },

    /// Convert batch text (`batch_v1`) into JSON operations.
    Parse {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Gate and apply a batch as one atomic transaction.
    Apply {
        batch: PathBuf,
        #[arg(long, default_value = "cli batch")]
        name: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Init { sample } => cmd_init(&cli.store, sample),
        Commands::Entries { json } => cmd_entries(&cli.store, json),
        Commands::Check { batch, json, deps } => cmd_check(&cli.store, &batch, json, deps),
        Commands::Preview { batch, json } => cmd_preview(&cli.store, &batch, json),
        Commands::Parse { input, output } => cmd_parse(&input, output.as_deref()),
        Commands::Apply { batch, name } => cmd_apply(&cli.store, &batch, &name),
    }
}

fn load_operations(path: &Path) -> Result<Vec<PendingOperation>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    if path
        .extension()
        .map_or(false, |ext| ext == "txt" || ext == "text")
    {
        Ok(batch_v1::parse_batch_v1(&text)?)
    } else {
        serde_json::from_str(&text)
            .with_context(|| format!("parsing operations from {}", path.display()))
    }
}

fn cmd_init(store_dir: &Path, sample: bool) -> Result<()> {
    let store = FileStore::open(store_dir)?;
    if sample {
        store.seed(sample_entries())?;
    } else {
        store.save()?;
    }
    println!(
        "initialized store at {} ({} entries)",
        store_dir.display(),
        store.entries().len()
    );
    Ok(())
}

fn sample_entries() -> Vec<Entry> {
    let phrase = |word: &str, c: &str, weight: i64| {
        Entry::new(word, Code::new(c).unwrap(), EntryType::Phrase, weight)
    };
    vec![
        phrase("如果", "rjgl", 100),
        phrase("这里", "felk", 100),
        phrase("你好", "nihk", 100),
        Entry::new("的", Code::new("d").unwrap(), EntryType::Single, 10),
    ]
}

fn cmd_entries(store_dir: &Path, json: bool) -> Result<()> {
    let store = FileStore::open(store_dir)?;
    let entries = store.entries();
    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    for entry in &entries {
        println!(
            "{:<8} {:<10} {:<6} {}",
            entry.code.as_str(),
            entry.word,
            entry.weight,
            entry.entry_type.label()
        );
    }
    println!("{} entries", entries.len());
    Ok(())
}

fn cmd_check(store_dir: &Path, batch: &Path, json: bool, deps: bool) -> Result<()> {
    let store = FileStore::open(store_dir)?;
    let operations = load_operations(batch)?;
    let checks = check_batch(&store, &operations)?;
    let edges = build_dependencies(&operations, &checks);
    let gate = submit_gate(&operations, &checks);

    if json {
        let payload = serde_json::json!({
            "checks": checks,
            "dependencies": edges,
            "submittable": gate.is_ok(),
            "rejection": gate.as_ref().err(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        report::render_checks(&operations, &checks);
        if deps && !edges.is_empty() {
            report::render_dependencies(&edges);
        }
        match &gate {
            Ok(()) => println!("\n{}", "batch is submittable".green().bold()),
            Err(rejection) => {
                println!("\n{}: {rejection}", "not submittable".red().bold());
            }
        }
    }

    gate.map_err(|rejection| anyhow::anyhow!("{rejection}"))
}

fn cmd_preview(store_dir: &Path, batch: &Path, json: bool) -> Result<()> {
    let store = FileStore::open(store_dir)?;
    let operations = load_operations(batch)?;
    let diff = preview_pending(&store, &operations)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&diff)?);
    } else {
        report::render_diff(&diff);
    }
    Ok(())
}

fn cmd_parse(input: &Path, output: Option<&Path>) -> Result<()> {
    let text =
        fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let operations = batch_v1::parse_batch_v1(&text)?;
    let rendered = serde_json::to_string_pretty(&operations)?;
    match output {
        Some(path) => {
            fs::write(path, rendered)?;
            println!("wrote {} operations to {}", operations.len(), path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

fn cmd_apply(store_dir: &Path, batch_path: &Path, name: &str) -> Result<()> {
    let store = FileStore::open(store_dir)?;
    let operations = load_operations(batch_path)?;

    let mut batch = Batch::new(name, operations);
    batch.set_status(BatchStatus::Approved);
    let summary = apply_batch(&store, &mut batch)?;
    store.save_batch(&batch)?;
    let recorded = store.append_changelog(&batch)?;

    println!(
        "applied batch {}: {} created, {} changed, {} deleted ({})",
        summary.batch_id,
        summary.created.to_string().green(),
        summary.changed.to_string().yellow(),
        summary.deleted.to_string().red(),
        recorded.digest
    );
    Ok(())
}
