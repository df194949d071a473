//! wirebind: converter registry diagnostics
//!
//! # Usage
//!
//! ```bash
//! # Explain which converter a request resolves to
//! wirebind resolve 'Manager@VARCHAR'
//!
//! # Run a query and decode every column through the registry
//! wirebind probe 'SELECT $1 AS n' --bind 42 --database-url postgres://localhost/app
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use sqlx::Any;
use tracing_subscriber::EnvFilter;
use wirebind::driver::{self, SqlxArguments, SqlxRow};
use wirebind::prelude::*;

#[derive(Parser)]
#[command(name = "wirebind")]
#[command(version)]
#[command(about = "Inspect converter resolution and decode query results", long_about = None)]
#[command(after_help = "EXAMPLES:
    wirebind types
    wirebind resolve 'OrderStatus@INTEGER'
    wirebind resolve '@NUMERIC' --extract
    wirebind probe 'SELECT * FROM orders WHERE id = $1' --bind 7 --format json")]
struct Cli {
    /// Settings file (defaults to <config dir>/wirebind/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show every wire type with its null capability and default converter
    Types,
    /// Explain how a request resolves: Type@TAG, Type or @TAG
    Resolve {
        request: String,

        /// Resolve for extraction (the wire type is only a hint)
        #[arg(short, long)]
        extract: bool,
    },
    /// List registered converters in registration order
    List,
    /// Load and validate the settings file
    Check,
    /// Run a query and decode every column without an application type
    Probe {
        sql: String,

        /// Parameter bindings ($1, $2, etc.)
        #[arg(short, long, value_delimiter = ',')]
        bind: Vec<String>,

        /// Database connection URL
        #[arg(long, env = "WIREBIND_DATABASE_URL")]
        database_url: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("wirebind=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    match &cli.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("failed to load {}", path.display())),
        None => Ok(Settings::discover()?),
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let settings = load_settings(cli)?;
    let registry = ConverterRegistry::from_settings(&settings)?;

    match &cli.command {
        Commands::Types => show_types(&registry),
        Commands::Resolve { request, extract } => explain_request(&registry, request, *extract)?,
        Commands::List => list_entries(&registry),
        Commands::Check => check_settings(cli, &settings, &registry),
        Commands::Probe {
            sql,
            bind,
            database_url,
            format,
        } => probe(&registry, sql, bind, database_url, format).await?,
    }
    Ok(())
}

fn show_types(registry: &ConverterRegistry) {
    println!("{}", "Wire Types".cyan().bold());
    println!();
    println!(
        "{:26} {:10} {}",
        "Tag".white().bold(),
        "Nullable".white().bold(),
        "Default converter".white().bold()
    );
    println!("{}", "─".repeat(60).dimmed());

    for wire in WireType::ALL {
        let nullable = if wire.is_nullable() { "yes".green() } else { "no".red() };
        let default = registry
            .wire_default(wire)
            .map(|c| format!("{} ({})", c.name(), c.app_type()))
            .unwrap_or_else(|| "-".to_string());
        println!("{:26} {:10} {}", wire.name().cyan(), nullable, default.dimmed());
    }
}

fn explain_request(registry: &ConverterRegistry, input: &str, extract: bool) -> anyhow::Result<()> {
    let request = parse_request(input)?;
    let mode = if extract || request.app_type.is_none() {
        Mode::Extraction
    } else {
        Mode::Binding
    };

    println!("{} {}", "Request:".dimmed(), input.yellow());
    println!("{} {:?}", "Mode:".dimmed(), mode);
    println!();

    let resolution = registry.explain(request.app_type.as_ref(), request.wire_type, mode)?;
    let conv = &resolution.converter;
    println!("{}", "Resolved:".green().bold());
    println!("  {} {}", "Converter:".dimmed(), conv.name().cyan());
    println!("  {} {}", "Produces:".dimmed(), conv.app_type().to_string().white());
    println!("  {} {}", "Match:".dimmed(), resolution.kind.to_string().white());
    if let Some(ty) = &resolution.matched_type {
        println!("  {} {} (depth {})", "Entry:".dimmed(), ty.to_string().white(), resolution.depth);
    }
    let tag = resolution
        .entry_tag
        .map_or_else(|| "any".to_string(), |w| w.to_string());
    println!("  {} {}", "Entry tag:".dimmed(), tag.white());

    let declared: Vec<&str> = conv.wire_types().iter().map(|w| w.name()).collect();
    println!("  {} {}", "Declares:".dimmed(), declared.join(", ").dimmed());
    Ok(())
}

fn list_entries(registry: &ConverterRegistry) {
    let entries = registry.entries();
    if entries.is_empty() {
        println!("{}", "(no converters registered)".dimmed());
        return;
    }

    println!(
        "{:>4} {:24} {:24} {}",
        "#".white().bold(),
        "Type".white().bold(),
        "Wire type".white().bold(),
        "Converter".white().bold()
    );
    println!("{}", "─".repeat(70).dimmed());
    for entry in entries {
        let tag = entry
            .wire_type
            .map_or_else(|| "any".to_string(), |w| w.to_string());
        println!(
            "{:>4} {:24} {:24} {}",
            entry.seq.to_string().dimmed(),
            entry.app_type.to_string().cyan(),
            tag.yellow(),
            entry.converter.name()
        );
    }
}

fn check_settings(cli: &Cli, settings: &Settings, registry: &ConverterRegistry) {
    let source = cli
        .config
        .clone()
        .or_else(|| Settings::default_path().filter(|p| p.exists()));
    match source {
        Some(path) => println!("{} {}", "Settings:".dimmed(), path.display()),
        None => println!("{} {}", "Settings:".dimmed(), "(defaults)".dimmed()),
    }
    println!("  {} {}", "Declarations:".dimmed(), settings.declarations.len());
    println!("  {} {}", "Wire defaults:".dimmed(), settings.wire_defaults.len());
    println!("  {} {}", "Null wire type:".dimmed(), registry.wire_type_for_null());
    println!("  {} {}", "Frozen:".dimmed(), registry.is_frozen());
    println!();
    println!("{} Settings are valid", "✓".green());
}

/// A `--bind` literal as a value, guessed the way a shell user writes it.
fn guess_value(literal: &str) -> Value {
    if literal.eq_ignore_ascii_case("null") {
        Value::Null
    } else if let Ok(n) = literal.parse::<i64>() {
        Value::I64(n)
    } else if let Ok(f) = literal.parse::<f64>() {
        Value::F64(f)
    } else if literal == "true" || literal == "false" {
        Value::Bool(literal == "true")
    } else {
        Value::from(literal)
    }
}

async fn probe(
    registry: &ConverterRegistry,
    sql: &str,
    bind: &[String],
    database_url: &str,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let mut args = SqlxArguments::new();
    for (i, literal) in bind.iter().enumerate() {
        let value = guess_value(literal);
        registry.bind(&mut args, i + 1, &value.natural_type(), &value, None)?;
    }

    tracing::debug!("Connecting to {}", database_url);
    let pool = driver::connect(database_url).await?;
    let rows = args
        .apply(sqlx::query::<Any>(sql))?
        .fetch_all(&pool)
        .await
        .context("query failed")?;

    let mut columns: Vec<String> = Vec::new();
    let mut decoded: Vec<Vec<Value>> = Vec::with_capacity(rows.len());
    for row in &rows {
        let row = SqlxRow::new(row);
        if columns.is_empty() {
            columns = row.column_names().into_iter().map(str::to_string).collect();
        }
        let values = (0..row.column_count())
            .map(|i| registry.extract(&row, Column::Index(i), None))
            .collect::<BindResult<Vec<_>>>()?;
        decoded.push(values);
    }

    format_output(&columns, &decoded, format);
    Ok(())
}

fn format_output(columns: &[String], rows: &[Vec<Value>], format: &OutputFormat) {
    if rows.is_empty() {
        println!("{}", "(no results)".dimmed());
        return;
    }

    match format {
        OutputFormat::Json => {
            let objects: Vec<serde_json::Value> = rows
                .iter()
                .map(|row| {
                    let map = columns
                        .iter()
                        .zip(row)
                        .map(|(c, v)| (c.clone(), v.to_json()))
                        .collect::<serde_json::Map<_, _>>();
                    serde_json::Value::Object(map)
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&objects).unwrap_or_default());
        }
        OutputFormat::Table => {
            let mut widths: Vec<usize> = columns.iter().map(|c| c.len()).collect();
            for row in rows {
                for (w, v) in widths.iter_mut().zip(row) {
                    *w = (*w).max(v.to_string().len());
                }
            }

            let header: Vec<String> = columns
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{:width$}", c, width = *w))
                .collect();
            println!("{}", header.join(" │ ").white().bold());

            let sep: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
            println!("{}", sep.join("─┼─").dimmed());

            for row in rows {
                let cells: Vec<String> = row
                    .iter()
                    .zip(&widths)
                    .map(|(v, w)| format!("{:width$}", v.to_string(), width = *w))
                    .collect();
                println!("{}", cells.join(" │ "));
            }

            println!();
            println!("{} row(s) returned", rows.len().to_string().cyan());
        }
    }
}
