use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use rowmap_core::{Record, ShutdownHooks, Store, StoreConfig, Value};
use rowmap_sqlite::SqliteEngine;
use tracing_subscriber::EnvFilter;

/// CLI output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "rowmap")]
#[command(about = "Inspect and edit a rowmap store described by a YAML configuration")]
#[command(version)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Open the database and apply creation and migration statements.
    Migrate(StoreArgs),
    /// Show the database version and row counts per table.
    Status(StatusArgs),
    /// Print one row by id.
    Get(GetArgs),
    /// Print the rows of a table, optionally filtered.
    Query(QueryArgs),
    /// Count the rows of a table, optionally filtered.
    Count(QueryArgs),
    /// Execute a SQL statement.
    Exec(ExecArgs),
    /// Insert a row given as a JSON object and print its id.
    Insert(InsertArgs),
    /// Delete one row by id.
    Delete(GetArgs),
}

#[derive(Debug, Args)]
struct StoreArgs {
    /// Store configuration (YAML).
    #[arg(long)]
    config: PathBuf,
    /// Database location, overriding the configuration.
    #[arg(long)]
    db: Option<String>,
}

#[derive(Debug, Args)]
struct StatusArgs {
    /// Store configuration (YAML); only its location and SQLite options are used.
    #[arg(long, required_unless_present = "db")]
    config: Option<PathBuf>,
    /// Database location.
    #[arg(long)]
    db: Option<String>,
}

#[derive(Debug, Args)]
struct GetArgs {
    #[command(flatten)]
    store: StoreArgs,
    /// Table name.
    table: String,
    /// Row id; parsed as JSON when possible, otherwise taken as text.
    id: String,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
}

#[derive(Debug, Args)]
struct QueryArgs {
    #[command(flatten)]
    store: StoreArgs,
    /// Table name.
    table: String,
    /// SQL fragment appended after `FROM <table>` (e.g. "WHERE done = ?").
    #[arg(long = "where")]
    where_clause: Option<String>,
    /// Bound parameter, repeatable; parsed as JSON when possible.
    #[arg(long = "param")]
    params: Vec<String>,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
}

#[derive(Debug, Args)]
struct ExecArgs {
    #[command(flatten)]
    store: StoreArgs,
    /// SQL statement.
    sql: String,
    /// Bound parameter, repeatable; parsed as JSON when possible.
    #[arg(long = "param")]
    params: Vec<String>,
}

#[derive(Debug, Args)]
struct InsertArgs {
    #[command(flatten)]
    store: StoreArgs,
    /// Table name.
    table: String,
    /// Row as a JSON object keyed by attribute name.
    json: String,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Migrate(args) => run_migrate(args),
        Command::Status(args) => run_status(args),
        Command::Get(args) => run_get(args),
        Command::Query(args) => run_query(args),
        Command::Count(args) => run_count(args),
        Command::Exec(args) => run_exec(args),
        Command::Insert(args) => run_insert(args),
        Command::Delete(args) => run_delete(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

/// Installs the stderr log subscriber; `RUST_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    // Targets are prefix-matched, so `rowmap` covers `rowmap_core` and `rowmap_sqlite`.
    let default = if verbose { "rowmap=debug" } else { "rowmap=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}

// ---------------------------------------------------------------------------
// Store setup
// ---------------------------------------------------------------------------

/// An initialized store plus the hooks that close it.
struct OpenStore {
    store: Store<SqliteEngine>,
    hooks: Arc<ShutdownHooks>,
}

impl Drop for OpenStore {
    fn drop(&mut self) {
        self.hooks.run();
    }
}

fn load_config(path: &Path, db: Option<String>) -> Result<StoreConfig, String> {
    let mut config = StoreConfig::load(path)
        .map_err(|e| format!("Failed to load configuration '{}': {e}", path.display()))?;
    if let Some(db) = db {
        config.location = db;
    }
    Ok(config)
}

fn open_store(args: &StoreArgs) -> Result<(OpenStore, StoreConfig), String> {
    let config = load_config(&args.config, args.db.clone())?;
    let hooks = Arc::new(ShutdownHooks::new());
    let store = Store::new(SqliteEngine::new(config.sqlite.clone()), hooks.clone());
    store
        .initialize(&config.location, &config.to_schemas(), config.version)
        .map_err(|e| format!("Failed to open database '{}': {e}", config.location))?;
    Ok((OpenStore { store, hooks }, config))
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn run_migrate(args: StoreArgs) -> Result<(), String> {
    let (open, config) = open_store(&args)?;
    let registry = open.store.registry();
    let version = registry
        .version()
        .ok_or_else(|| "Database closed before its version could be read".to_string())?;
    println!(
        "Migration complete. '{}' is at version {version}.",
        config.location
    );
    println!("  Tables: {}", registry.table_names().join(", "));
    Ok(())
}

fn run_status(args: StatusArgs) -> Result<(), String> {
    let config = match &args.config {
        Some(path) => load_config(path, args.db.clone())?,
        None => StoreConfig {
            location: args.db.clone().unwrap_or_default(),
            ..StoreConfig::default()
        },
    };
    let conn = SqliteEngine::new(config.sqlite.clone())
        .connect(&config.location)
        .map_err(|e| format!("Failed to open database '{}': {e}", config.location))?;
    let status = rowmap_sqlite::status(&conn)
        .map_err(|e| format!("Failed to read database status: {e}"))?;
    println!("Database: {}", config.location);
    println!("  Version: {}", status.version);
    if status.tables.is_empty() {
        println!("  Tables: none");
    }
    for (table, rows) in &status.tables {
        println!("  {table}: {rows} rows");
    }
    Ok(())
}

fn run_get(args: GetArgs) -> Result<(), String> {
    let (open, _) = open_store(&args.store)?;
    let record = open
        .store
        .select_by_id(&args.table, parse_param(&args.id))
        .into_result()
        .map_err(|e| format!("Lookup in '{}' failed: {e}", args.table))?
        .ok_or_else(|| format!("No row in '{}' with id {}", args.table, args.id))?;
    print_output(&record.to_json(), args.format)
}

fn run_query(args: QueryArgs) -> Result<(), String> {
    let (open, _) = open_store(&args.store)?;
    let params = parse_params(&args.params);
    let records = open
        .store
        .query(&args.table, args.where_clause.as_deref(), &params)
        .into_result()
        .map_err(|e| format!("Query on '{}' failed: {e}", args.table))?;
    let json = serde_json::Value::Array(records.iter().map(Record::to_json).collect());
    print_output(&json, args.format)
}

fn run_count(args: QueryArgs) -> Result<(), String> {
    let (open, _) = open_store(&args.store)?;
    let params = parse_params(&args.params);
    let count = open
        .store
        .count(&args.table, args.where_clause.as_deref(), &params)
        .into_result()
        .map_err(|e| format!("Count on '{}' failed: {e}", args.table))?;
    println!("{count}");
    Ok(())
}

fn run_exec(args: ExecArgs) -> Result<(), String> {
    let (open, _) = open_store(&args.store)?;
    let params = parse_params(&args.params);
    open.store
        .exec_sql(&args.sql, &params)
        .map_err(|e| format!("Statement failed: {e}"))?;
    println!("OK");
    Ok(())
}

fn run_insert(args: InsertArgs) -> Result<(), String> {
    let (open, _) = open_store(&args.store)?;
    let json: serde_json::Value =
        serde_json::from_str(&args.json).map_err(|e| format!("Invalid JSON row: {e}"))?;
    let record = Record::from_serialize(&json)
        .map_err(|e| format!("Invalid JSON row: {e}"))?
        .ok_or_else(|| "Row must be a JSON object".to_string())?;
    let id = open
        .store
        .insert(&args.table, Some(&record))
        .into_result()
        .map_err(|e| format!("Insert into '{}' failed: {e}", args.table))?;
    println!("{id}");
    Ok(())
}

fn run_delete(args: GetArgs) -> Result<(), String> {
    let (open, _) = open_store(&args.store)?;
    let deleted = open
        .store
        .delete_by_id(&args.table, parse_param(&args.id))
        .into_result()
        .map_err(|e| format!("Delete from '{}' failed: {e}", args.table))?
        .unwrap_or(0);
    println!("{deleted}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parses a command-line value: JSON scalars keep their type, anything that
/// is not valid JSON is text.
fn parse_param(raw: &str) -> Value {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(json) => Value::from_json(&json),
        Err(_) => Value::from(raw),
    }
}

fn parse_params(raw: &[String]) -> Vec<Value> {
    raw.iter().map(|p| parse_param(p)).collect()
}

fn format_output(json: &serde_json::Value, format: CliOutputFormat) -> Result<String, String> {
    match format {
        CliOutputFormat::Json => {
            serde_json::to_string_pretty(json).map_err(|e| format!("JSON serialization failed: {e}"))
        }
        CliOutputFormat::Yaml => {
            serde_yaml::to_string(json).map_err(|e| format!("YAML serialization failed: {e}"))
        }
    }
}

fn print_output(json: &serde_json::Value, format: CliOutputFormat) -> Result<(), String> {
    let out = format_output(json, format)?;
    println!("{}", out.trim_end());
    Ok(())
}
