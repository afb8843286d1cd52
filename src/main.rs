//! promptglow - prompt authoring and AI enhancement CLI

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use promptglow::config::Config;
use promptglow::enhancer::{
    ConnectionTracker, DomainContext, EnhancementClient, EnhancementLevel, EnhancementRequest,
};
use promptglow::error::EnhanceError;
use promptglow::notes::{export_notes, import_notes, NoteStore};

/// Exit code for a user-initiated cancellation
const EXIT_CANCELLED: i32 = 130;

/// Default note store location relative to the user's home directory
const DEFAULT_STORE_FILE: &str = ".promptglow/notes.json";

#[derive(Parser, Debug)]
#[command(name = "promptglow")]
#[command(about = "Prompt authoring and AI enhancement")]
struct Args {
    /// Note store file (defaults to ~/.promptglow/notes.json)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Enhance a prompt with the remote model
    Enhance {
        /// Prompt text; omit to read from a stored note or stdin
        prompt: Option<String>,

        /// Read the prompt from a file instead of the command line
        #[arg(long, conflicts_with = "prompt")]
        file: Option<PathBuf>,

        /// Enhancement intensity
        #[arg(long, value_enum, default_value = "glow")]
        level: EnhancementLevel,

        /// Domain the prompt is written for
        #[arg(long, value_enum, default_value = "general")]
        context: DomainContext,
    },

    /// Probe the enhancement API and report connection state
    Status,

    /// List stored notes, optionally filtered by a search query
    List {
        /// Case-insensitive search over titles, content, and tags
        query: Option<String>,
    },

    /// Export all notes to a bundle file
    Export { path: PathBuf },

    /// Import notes from a bundle file, merging by id
    Import { path: PathBuf },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let exit_code = match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    };

    std::process::exit(exit_code);
}

async fn run(args: Args) -> Result<i32> {
    match args.command {
        Command::Enhance {
            prompt,
            file,
            level,
            context,
        } => run_enhance(prompt, file, level, context).await,
        Command::Status => run_status().await,
        Command::List { query } => run_list(args.store, query),
        Command::Export { path } => run_export(args.store, path),
        Command::Import { path } => run_import(args.store, path),
    }
}

async fn run_enhance(
    prompt: Option<String>,
    file: Option<PathBuf>,
    level: EnhancementLevel,
    context: DomainContext,
) -> Result<i32> {
    let content = match (prompt, file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(&path)?,
        (None, None) => {
            use std::io::Read;
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Enhancement unavailable: {}", e);
            return Ok(2);
        }
    };

    let tracker = Arc::new(ConnectionTracker::new());
    let client = EnhancementClient::new(config, tracker)?;
    let request = EnhancementRequest::new(content, level, context);

    // Ctrl-C triggers cooperative cancellation of the in-flight request
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, cancelling enhancement");
            signal_token.cancel();
        }
    });

    match client.enhance(&request, &cancel).await {
        Ok(result) => {
            println!("{}", result.enhanced_content);
            if !result.improvements_summary.is_empty() {
                eprintln!();
                eprintln!("Improvements (confidence {:.2}):", result.confidence);
                for item in &result.improvements_summary {
                    eprintln!("  - {}", item);
                }
            }
            Ok(0)
        }
        Err(EnhanceError::Cancelled) => {
            eprintln!("Enhancement cancelled.");
            Ok(EXIT_CANCELLED)
        }
        Err(e) => Err(e.into()),
    }
}

async fn run_status() -> Result<i32> {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Enhancement unavailable: {}", e);
            return Ok(2);
        }
    };

    let tracker = ConnectionTracker::new();
    let client = reqwest::Client::new();
    let state = tracker.refresh(&client, &config).await;

    println!("Connection: {}", state);
    println!("Base URL:   {}", config.base_url);
    println!("Candidates: {}", config.models.join(", "));
    Ok(0)
}

fn run_list(store: Option<PathBuf>, query: Option<String>) -> Result<i32> {
    let store = open_store(store)?;
    let notes = match query {
        Some(q) => store.search(&q),
        None => store.list(),
    };

    if notes.is_empty() {
        println!("No notes found.");
        return Ok(0);
    }

    for note in notes {
        let tags = if note.tags.is_empty() {
            String::new()
        } else {
            format!("  [{}]", note.tags.join(", "))
        };
        println!(
            "{}  {}{}  ({})",
            note.id,
            note.title,
            tags,
            note.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(0)
}

fn run_export(store: Option<PathBuf>, path: PathBuf) -> Result<i32> {
    let store = open_store(store)?;
    let count = export_notes(&store, &path)?;
    println!("Exported {} notes to {}", count, path.display());
    Ok(0)
}

fn run_import(store: Option<PathBuf>, path: PathBuf) -> Result<i32> {
    let mut store = open_store(store)?;
    let stats = import_notes(&mut store, &path)?;
    println!(
        "Imported {} new, updated {}, skipped {}",
        stats.imported, stats.updated, stats.skipped
    );
    Ok(0)
}

fn open_store(store: Option<PathBuf>) -> Result<NoteStore> {
    let path = match store {
        Some(path) => path,
        None => {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(DEFAULT_STORE_FILE)
        }
    };
    NoteStore::open(path)
}
