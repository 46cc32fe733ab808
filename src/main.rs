// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use asset_overview::config::{init_tracing, Config};
use asset_overview::{
    export_counts_csv, get_all_assets, get_recent_visits, insert_assets, load_assets_json,
    record_visit, setup_database, verify_count, AssetCountAggregator, AssetKey,
};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "asset-overview", version, about = "Asset catalog dashboard")]
struct Cli {
    /// SQLite catalog store (overrides ASSET_OVERVIEW_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Import asset records from a JSON catalog export
    Import { file: PathBuf },
    /// Write per-owner, compute kind, group and code location counts as CSV
    Export { file: PathBuf },
    /// Record a visit to an asset, e.g. `warehouse/orders`
    Visit { key: String },
    /// Print the dashboard counts as plain text
    Summary,
    /// Interactive dashboard (default)
    Ui,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing("warn")?;

    let mut config = Config::from_env()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    match cli.command.unwrap_or(Command::Ui) {
        Command::Import { file } => run_import(&config, &file),
        Command::Export { file } => run_export(&config, &file),
        Command::Visit { key } => run_visit(&config, &key),
        Command::Summary => run_summary(&config),
        Command::Ui => run_ui_mode(&config),
    }
}

fn open_database(config: &Config) -> Result<Connection> {
    let conn = Connection::open(&config.db_path)
        .with_context(|| format!("Failed to open database {}", config.db_path.display()))?;
    setup_database(&conn)?;
    Ok(conn)
}

fn run_import(config: &Config, file: &Path) -> Result<()> {
    println!("🗄️  Asset import - JSON → SQLite + WAL");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    println!("\n📂 Loading {}...", file.display());
    let records = load_assets_json(file)?;
    println!("✓ Loaded {} asset records", records.len());

    let conn = open_database(config)?;
    let summary = insert_assets(&conn, &records)?;
    println!("✓ Inserted: {} assets", summary.inserted);
    println!("✓ Updated: {} assets", summary.updated);

    let count = verify_count(&conn)?;
    println!("\n✓ Catalog contains {} assets", count);

    Ok(())
}

fn run_export(config: &Config, file: &Path) -> Result<()> {
    let conn = open_database(config)?;
    let records = get_all_assets(&conn)?;
    let counts = AssetCountAggregator::new().aggregate(&records);

    let rows = export_counts_csv(&counts, file)?;
    println!("✓ Wrote {} rows to {}", rows, file.display());

    Ok(())
}

fn run_visit(config: &Config, key: &str) -> Result<()> {
    let key = AssetKey::parse(key)?;
    let conn = open_database(config)?;

    record_visit(&conn, &key)?;
    println!("✓ Recorded visit to {}", key);

    Ok(())
}

fn run_summary(config: &Config) -> Result<()> {
    let conn = open_database(config)?;
    let records = get_all_assets(&conn)?;
    let recent: Vec<AssetKey> = get_recent_visits(&conn, config.recent_limit)?
        .into_iter()
        .map(|visit| visit.key)
        .collect();

    let overview =
        asset_overview::build_overview(&records, &recent, &chrono::Local::now(), config.recent_limit)?;

    println!("{}! {} assets in the catalog.", overview.greeting, overview.total_assets);

    if !overview.recently_visited.is_empty() {
        println!("\nRecently visited");
        for recent in &overview.recently_visited {
            println!("  {}", recent.label);
        }
    }

    for section in &overview.sections {
        println!("\n{} ({})", section.title, section.items.len());
        for item in &section.items {
            match &item.caption {
                Some(caption) => println!("  {:>6}  {} ({})", item.count, item.label, caption),
                None => println!("  {:>6}  {}", item.count, item.label),
            }
        }
    }

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &Config) -> Result<()> {
    if !config.db_path.exists() {
        eprintln!("❌ Catalog not found at {}", config.db_path.display());
        eprintln!("   Run: asset-overview import <assets.json>");
        eprintln!("   to import assets first.");
        std::process::exit(1);
    }

    let conn = open_database(config)?;
    let records = get_all_assets(&conn)?;
    let recent: Vec<AssetKey> = get_recent_visits(&conn, config.recent_limit)?
        .into_iter()
        .map(|visit| visit.key)
        .collect();

    let mut app = ui::App::new(records, recent, config.recent_limit)?;
    let result = ui::run_ui(&mut app);

    // Persist visits even if the terminal loop failed.
    for key in &app.pending_visits {
        record_visit(&conn, key)?;
    }

    result
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &Config) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the web dashboard: cargo run --bin asset-overview-server --features server");
    std::process::exit(1);
}
