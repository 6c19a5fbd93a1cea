//! Thin CLI consumer for `notecore`: list notes in the store and render
//! them to Markdown on stdout, or into one file per note.
//!
//! This plays the role the donor application's Tauri commands played —
//! the one real caller of the library in this repository — but with no
//! UI framework: flags in, Markdown out.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use notecore::{open_store, render_note, render_notes, ListConfig, NoteSummary, StoreError};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "notecore-cli", about = "Dump notes from a notes store to Markdown")]
struct Cli {
    /// Path to the notes store file. Defaults to the donor app's default
    /// macOS location under the current user's home directory.
    #[arg(short, long)]
    store: Option<PathBuf>,

    /// Maximum number of notes to read, most recently modified first.
    #[arg(short, long, default_value_t = 50)]
    limit: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List note ids, titles and folders without decoding bodies.
    List {
        /// Print each note as a JSON object instead of a tab-separated line.
        #[arg(long)]
        json: bool,
    },
    /// Render every listed note into a single Markdown document on stdout.
    Dump,
    /// Render every listed note into its own `.md` file under `out`.
    Export {
        #[arg(short, long, default_value = "notes-export")]
        out: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let cli = Cli::parse();
    let config = ListConfig::new(cli.store.clone(), cli.limit);

    let handle = open_store(&config.store_path).map_err(|e| describe_store_error(&config.store_path, &e))?;
    let notes = notecore::list_notes(&handle, config.limit)?;

    match cli.command {
        Command::List { json: true } => {
            let summaries: Vec<NoteSummary> = notes.iter().map(NoteSummary::from).collect();
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        Command::List { json: false } => {
            for note in &notes {
                println!(
                    "{}\t{}\t{}",
                    note.note_id,
                    note.folder_name.as_deref().unwrap_or("Notes"),
                    note.title
                );
            }
        }
        Command::Dump => {
            println!("{}", render_notes(notes.iter()));
        }
        Command::Export { out } => {
            fs::create_dir_all(&out)?;
            for note in &notes {
                let markdown = render_note(note);
                let filename = format!("{}-{}.md", note.note_id, slugify(&note.title));
                fs::write(out.join(filename), markdown)?;
            }
            eprintln!("wrote {} notes to {}", notes.len(), out.display());
        }
    }

    Ok(())
}

fn slugify(title: &str) -> String {
    let slug: String = title
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    slug.split('-').filter(|s| !s.is_empty()).collect::<Vec<_>>().join("-")
}

fn describe_store_error(path: &std::path::Path, err: &StoreError) -> String {
    match err {
        StoreError::NotFound(_) => format!(
            "notes store not found at {}. Pass --store to point at the right file.",
            path.display()
        ),
        StoreError::PermissionDenied(msg) => format!(
            "could not open {}: {msg}. On macOS this usually means Full Disk Access is \
             required for this terminal/binary under System Settings -> Privacy & Security.",
            path.display()
        ),
        other => other.to_string(),
    }
}
