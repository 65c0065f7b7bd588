//! access-convert CLI - convert a desktop-database catalog to MySQL, SQLite or JSON.

use access_convert::{
    Config, ConversionResult, ConvertError, FilesMode, JsonRowShape, Orchestrator, TargetKind,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "access-convert")]
#[command(about = "Convert a desktop-database catalog to a MySQL dump, a SQLite database or JSON")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert the source catalog
    Convert {
        /// Override the source catalog path
        #[arg(long)]
        source: Option<PathBuf>,

        /// Override the target kind (mysql_dump, sqlite or json)
        #[arg(long)]
        target: Option<TargetKind>,

        /// Override the output path
        #[arg(long)]
        output: Option<PathBuf>,

        /// Override the blob storage mode (reference, inline, file, file_absolute)
        #[arg(long)]
        files_mode: Option<FilesMode>,

        /// Replace externalized files that already exist
        #[arg(long)]
        overwrite_files: bool,

        /// Drop each table before creating it
        #[arg(long)]
        drop_tables: bool,

        /// JSON row shape (assoc or array)
        #[arg(long)]
        json_rows: Option<JsonRowShape>,

        /// Include column metadata in JSON output
        #[arg(long)]
        json_columns: bool,
    },

    /// Load the configuration and catalog and report what would be converted
    Validate,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

fn run() -> Result<ExitCode, ConvertError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::Convert {
            source,
            target,
            output,
            files_mode,
            overwrite_files,
            drop_tables,
            json_rows,
            json_columns,
        } => {
            // Apply overrides
            if let Some(path) = source {
                config.source.path = path;
            }
            if let Some(t) = target {
                config.target.r#type = t;
            }
            if let Some(path) = output {
                config.target.output = Some(path);
            }
            if let Some(mode) = files_mode {
                config.conversion.files_mode = mode;
            }
            if overwrite_files {
                config.conversion.overwrite_existing_files = true;
            }
            if drop_tables {
                config.conversion.drop_tables = true;
            }
            if let Some(shape) = json_rows {
                config.target.json_rows = shape;
            }
            if json_columns {
                config.target.json_columns = true;
            }
            config.validate()?;

            let result = Orchestrator::new(config).run();

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                print_summary(&result);
            }

            if let Some(err) = &result.error {
                eprintln!("{}", err.message);
            }
            Ok(ExitCode::from(result.exit_code()))
        }

        Commands::Validate => {
            let summary = Orchestrator::new(config).validate()?;

            if cli.output_json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("Catalog: {}", summary.source);
                println!("  Tables: {}", summary.tables);
                println!("  Rows: {}", summary.rows);
                println!("  Relationships: {}", summary.relationships);
                if !summary.tables_without_primary_key.is_empty() {
                    println!(
                        "  Without primary key: {}",
                        summary.tables_without_primary_key.join(", ")
                    );
                }
                println!("  Output: {}", summary.output_file);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_summary(result: &ConversionResult) {
    if result.is_success() {
        println!("\nConversion completed!");
    } else {
        println!("\nConversion failed!");
    }
    println!("  Run ID: {}", result.run_id);
    println!("  Duration: {:.2}s", result.duration_seconds);
    println!("  Target: {} ({})", result.target, result.output_file);
    println!("  Tables: {}/{}", result.tables_success, result.tables_total);
    println!("  Rows: {}", result.rows_written);
    if !result.failed_tables.is_empty() {
        println!("  Failed tables: {:?}", result.failed_tables);
    }
    if !result.diagnostics.is_empty() {
        println!("  Diagnostics: {}", result.diagnostics.len());
        for d in &result.diagnostics {
            println!(
                "    {} [{:?}] {}{}: {}",
                if d.kind.is_warning() { "warning" } else { "error" },
                d.kind,
                d.table.as_deref().unwrap_or("-"),
                d.column.as_deref().map(|c| format!(".{}", c)).unwrap_or_default(),
                d.message
            );
        }
    }
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // stdout is reserved for the result
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
