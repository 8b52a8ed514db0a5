//! fixgraph CLI - Plan test fixtures from an existing database
//!
//! Usage:
//!   fixgraph [--config <file>] [--database <path>] schema
//!   fixgraph [--config <file>] [--database <path>] plan [--output <file>]
//!   fixgraph [--config <file>] [--database <path>] order
//!
//! Examples:
//!   fixgraph --database ./fixtures.db schema
//!   fixgraph --config fixgraph.toml plan --output plan.json
//!   RUST_LOG=info fixgraph order

use clap::{Parser, Subcommand};
use fixgraph::config::Settings;
use fixgraph::pipeline::{connect, Pipeline, PipelineError};
use fixgraph::schema::Schema;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

type CmdResult = Result<(), Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "fixgraph")]
#[command(about = "fixgraph - Dependency-ordered test fixtures from a relational database")]
#[command(version)]
struct Cli {
    /// Config file (defaults to FIXGRAPH_CONFIG, ./fixgraph.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database path, overriding connection.path
    #[arg(short, long, global = true)]
    database: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarise tables, foreign keys and join tables
    Schema,

    /// Extract, resolve and order entities; print the plan as JSON
    Plan {
        /// Write the plan to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print entity labels in creation order
    Order,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    let settings = match load_settings(&cli) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Commands::Schema => cmd_schema(settings),
        Commands::Plan { output } => cmd_plan(settings, output),
        Commands::Order => cmd_order(settings),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_settings(cli: &Cli) -> Result<Settings, PipelineError> {
    let mut settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::load()?,
    };
    if let Some(database) = &cli.database {
        settings.connection.path = database.clone();
    }
    Ok(settings)
}

fn cmd_schema(settings: Settings) -> CmdResult {
    let source = connect(&settings)?;
    let pipeline = Pipeline::new(settings);
    let (schema, joins) = pipeline.inspect(&source)?;

    println!("Schema: {}", schema.name);
    println!();
    for table in schema.tables() {
        let key: Vec<&str> = table.primary_key_columns().map(|c| c.name.as_str()).collect();
        println!(
            "  {} ({} columns, key: {})",
            table.name.name,
            table.columns.len(),
            if key.is_empty() {
                "none".to_string()
            } else {
                key.join(", ")
            }
        );
        for fk in schema.outgoing(table.id) {
            let nullability = if fk.nullable { "nullable" } else { "required" };
            println!("    -> {} [{}]", fk, nullability);
        }
    }

    if !joins.is_empty() {
        println!();
        println!("Join tables:");
        for (anchor, join, shape) in joins.iter() {
            let args: Vec<String> = shape.iter().map(ToString::to_string).collect();
            println!(
                "  {} via {}: ({})",
                table_name(&schema, anchor),
                table_name(&schema, join),
                args.join(", ")
            );
        }
    }

    println!();
    let order: Vec<&str> = schema
        .creation_order()
        .into_iter()
        .map(|id| table_name(&schema, id))
        .collect();
    println!("Creation order: {}", order.join(", "));
    Ok(())
}

fn cmd_plan(settings: Settings, output: Option<PathBuf>) -> CmdResult {
    let source = connect(&settings)?;
    let plan = Pipeline::new(settings).run_configured(&source)?;

    let json = plan.to_json()?;

    match output {
        Some(path) => {
            fs::write(&path, json)
                .map_err(|e| format!("cannot write '{}': {}", path.display(), e))?;
            println!("Wrote {} entities to {}", plan.order.len(), path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn cmd_order(settings: Settings) -> CmdResult {
    let source = connect(&settings)?;
    let plan = Pipeline::new(settings).run_configured(&source)?;

    for (position, label) in plan.labels().iter().enumerate() {
        println!("{:>5}  {}", position + 1, label);
    }
    Ok(())
}

fn table_name(schema: &Schema, id: fixgraph::schema::TableId) -> &str {
    &schema.table(id).name.name
}
