use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::path::{Path, PathBuf};
use tag_updater::config::load_from_path;
use tag_updater::{TagPath, UpdateRequest, Updater, UpdaterConfig};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter, e.g. `tag_updater=debug`.
const LOG_ENV: &str = "TAG_UPDATER_LOG";

#[derive(Parser)]
#[command(name = "tag-updater")]
#[command(about = "Locate and update release tags in YAML files", long_about = None)]
#[command(version)]
struct Cli {
    /// Updater configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set a tag value and write the file back
    Update {
        /// YAML file to update
        file: PathBuf,

        /// New tag value
        value: String,

        /// Dotted path of the field (auto-detected if not specified)
        #[arg(short, long)]
        path: Option<String>,

        /// Do not write a backup of the original file
        #[arg(long)]
        no_backup: bool,

        /// Skip re-parsing the updated document before writing
        #[arg(long)]
        no_validate: bool,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// List tag-like fields in a file
    List {
        file: PathBuf,

        /// Print locations as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the value at a dotted path
    Get { file: PathBuf, path: String },

    /// Check that a file parses as a single YAML document
    Validate { file: PathBuf },

    /// Re-emit a file with the configured indentation
    Format {
        file: PathBuf,

        /// Write the result back instead of printing it
        #[arg(short, long)]
        write: bool,
    },

    /// Restore a file from one of its backups
    Rollback { file: PathBuf, backup: PathBuf },

    /// Delete backups of a file beyond the retention limit
    Cleanup { file: PathBuf },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let updater = build_updater(cli.config.as_deref())?;

    match cli.command {
        Commands::Update {
            file,
            value,
            path,
            no_backup,
            no_validate,
            dry_run,
            diff,
        } => {
            let mut request = UpdateRequest::new(&file, value)
                .create_backup(!no_backup)
                .validate_after(!no_validate)
                .dry_run(dry_run);
            if let Some(path) = path {
                request = request.tag_path(TagPath::parse(&path)?);
            }
            cmd_update(&updater, &request, diff)
        }

        Commands::List { file, json } => cmd_list(&updater, &file, json),

        Commands::Get { file, path } => cmd_get(&updater, &file, &path),

        Commands::Validate { file } => cmd_validate(&updater, &file),

        Commands::Format { file, write } => cmd_format(&updater, &file, write),

        Commands::Rollback { file, backup } => cmd_rollback(&updater, &file, &backup),

        Commands::Cleanup { file } => cmd_cleanup(&updater, &file),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_updater(config: Option<&Path>) -> Result<Updater> {
    let config = match config {
        Some(path) => load_from_path(path)?,
        None => UpdaterConfig::default(),
    };
    Ok(Updater::from_config(config))
}

fn cmd_update(updater: &Updater, request: &UpdateRequest, show_diff: bool) -> Result<()> {
    let file = request.file_path.as_path();
    let result = updater.update_tag_in_file(request)?;

    if let Some(err) = &result.validation_error {
        eprintln!(
            "{} {}: updated document is invalid, nothing written",
            "✗".red(),
            file.display()
        );
        eprintln!("  Error: {}", err);
        std::process::exit(1);
    }

    if request.dry_run {
        println!("{}", "[DRY RUN - nothing was written]".cyan());
    }

    if result.changes_detected {
        let verb = if request.dry_run { "Would set" } else { "Set" };
        println!(
            "{} {}: {} {} = {}",
            "✓".green(),
            file.display(),
            verb,
            result.tag_path,
            request.new_value
        );
    } else {
        println!(
            "{} {}: {} already {}",
            "⊙".yellow(),
            file.display(),
            result.tag_path,
            request.new_value
        );
    }

    if let Some(backup) = &result.backup_path {
        println!("  Backup: {}", backup.display().to_string().dimmed());
    }

    if show_diff && result.changes_detected {
        display_diff(file, &result.original_text, &result.updated_text);
    }

    Ok(())
}

fn cmd_list(updater: &Updater, file: &Path, json: bool) -> Result<()> {
    let locations = updater.get_file_tag_locations(file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&locations)?);
        return Ok(());
    }

    if locations.is_empty() {
        println!("{}", "No tag fields found".yellow());
        return Ok(());
    }

    println!(
        "{} ({} fields)",
        file.display().to_string().bold(),
        locations.len()
    );
    for location in &locations {
        println!(
            "  {} = {} {}",
            location.path.to_string().cyan(),
            location.value,
            format!("(line {}, column {})", location.line, location.column).dimmed()
        );
    }
    Ok(())
}

fn cmd_get(updater: &Updater, file: &Path, path: &str) -> Result<()> {
    let path = TagPath::parse(path)?;
    let text = updater.store().read_validated(file)?;
    let parsed = updater
        .editor()
        .parse_content(&text)
        .with_context(|| format!("failed to parse {}", file.display()))?;
    let value = updater.editor().get_tag_value(&parsed, &path)?;
    println!("{}", value);
    Ok(())
}

fn cmd_validate(updater: &Updater, file: &Path) -> Result<()> {
    match updater.validate_file(file) {
        Ok(()) => {
            println!("{} {}: valid", "✓".green(), file.display());
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}: invalid", "✗".red(), file.display());
            eprintln!("  Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn cmd_format(updater: &Updater, file: &Path, write: bool) -> Result<()> {
    let text = updater.store().read_validated(file)?;
    let formatted = updater
        .editor()
        .format_yaml(&text)
        .with_context(|| format!("failed to format {}", file.display()))?;

    if !write {
        print!("{}", formatted);
        return Ok(());
    }

    if formatted == text {
        println!("{} {}: already formatted", "⊙".yellow(), file.display());
        return Ok(());
    }

    updater.store().write_atomic(file, &formatted)?;
    println!("{} {}: formatted", "✓".green(), file.display());
    Ok(())
}

fn cmd_rollback(updater: &Updater, file: &Path, backup: &Path) -> Result<()> {
    updater.rollback_from_backup(file, backup)?;
    println!(
        "{} {}: restored from {}",
        "✓".green(),
        file.display(),
        backup.display()
    );
    Ok(())
}

fn cmd_cleanup(updater: &Updater, file: &Path) -> Result<()> {
    let removed = updater.cleanup_old_backups(file)?;
    if removed.is_empty() {
        println!("{} {}: nothing to remove", "⊙".yellow(), file.display());
        return Ok(());
    }

    println!(
        "{} {}: removed {} backups",
        "✓".green(),
        file.display(),
        removed.len()
    );
    for path in &removed {
        println!("  - {}", path.display().to_string().dimmed());
    }
    Ok(())
}

/// Display a unified diff between original and updated content.
fn display_diff(file: &Path, original: &str, updated: &str) {
    let diff = TextDiff::from_lines(original, updated);

    println!("{}", format!("--- {} (original)", file.display()).dimmed());
    println!("{}", format!("+++ {} (updated)", file.display()).dimmed());

    for change in diff.iter_all_changes() {
        let line = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", line);
    }
    println!();
}
