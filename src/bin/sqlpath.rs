//! sqlpath: explain association joins for a schema
//!
//! # Usage
//!
//! ```bash
//! # Joins, aliases and SQL for two paths sharing a prefix
//! sqlpath --config shop.toml explain orders customer customer.address:addr
//!
//! # List tables and associations
//! sqlpath --config shop.toml schema
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use sqlpath::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sqlpath")]
#[command(version)]
#[command(about = "Resolve association paths into SQL joins", long_about = None)]
#[command(after_help = "EXAMPLES:
    sqlpath explain orders customer.address:addr
    sqlpath explain orders tags --outer --fetch --dialect mysql
    sqlpath explain orders customer --filter status=open --format json")]
struct Cli {
    /// Schema file (defaults to <config dir>/sqlpath/config.toml)
    #[arg(short, long, env = "SQLPATH_CONFIG", global = true)]
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
    /// Resolve association paths on a base table and show the resulting SQL
    Explain {
        /// Base table
        table: String,

        /// Dotted association paths; `step:alias` sets a preferred alias
        paths: Vec<String>,

        /// Use left outer joins
        #[arg(long)]
        outer: bool,

        /// Select the columns of the joined tables
        #[arg(long)]
        fetch: bool,

        /// Base table alias
        #[arg(short, long)]
        alias: Option<String>,

        /// Top-level `column=value` restrictions
        #[arg(long, value_delimiter = ',')]
        filter: Vec<String>,

        /// Placeholder style (named, postgres, mysql, sqlite)
        #[arg(short, long)]
        dialect: Option<Dialect>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// List tables and associations
    Schema,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { "sqlpath=debug" } else { "sqlpath=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let config = Config::load_or_default(cli.config.as_deref()).context("loading configuration")?;
    let settings = config.settings.clone();
    let schema = Arc::new(config.schema.into_schema().context("building schema")?);

    match &cli.command {
        Commands::Explain {
            table,
            paths,
            outer,
            fetch,
            alias,
            filter,
            dialect,
            format,
        } => {
            let base = schema.table_by_name(table)?;
            let mut session = Session::new(Arc::clone(&schema), base)
                .with_alias(alias.as_deref().unwrap_or(&settings.alias));

            for path in paths {
                let elements = parse_path(&schema, base, path, !outer)
                    .with_context(|| format!("resolving path '{}'", path))?;
                session.join_to(elements, *fetch);
            }

            let restrictions = filter
                .iter()
                .map(|f| parse_filter(f))
                .collect::<Result<Vec<_>>>()?;
            session.where_(restrictions);

            let stmt = session.build(&[], dialect.unwrap_or(settings.dialect))?;
            match format {
                OutputFormat::Table => print_explain(&session, &stmt),
                OutputFormat::Json => {
                    let (hops, _) = session.hops();
                    let out = serde_json::json!({
                        "sql": stmt.raw.sql,
                        "named": stmt.raw.original,
                        "parameters": stmt.raw.names,
                        "values": stmt.values,
                        "joins": hops,
                    });
                    println!("{}", serde_json::to_string_pretty(&out)?);
                }
            }
        }
        Commands::Schema => print_schema(&schema),
    }
    Ok(())
}

/// `customer.address:addr` -> path elements, aliases attached to their step.
fn parse_path(schema: &Schema, base: TableId, path: &str, inner: bool) -> Result<Vec<PathElement>> {
    let mut current = base;
    let mut elements = Vec::new();
    for step in path.split('.').map(str::trim).filter(|s| !s.is_empty()) {
        let (name, alias) = match step.split_once(':') {
            Some((name, alias)) => (name, Some(alias)),
            None => (step, None),
        };
        let id = schema.association_by_name(current, name)?;
        current = schema.association(id).table_to;
        let mut pe = PathElement::new(id, inner);
        if let Some(alias) = alias {
            pe = pe.with_alias(alias);
        }
        elements.push(pe);
    }
    Ok(elements)
}

fn parse_filter(s: &str) -> Result<Criteria> {
    let (column, value) = s
        .split_once('=')
        .with_context(|| format!("filter '{}' is not column=value", s))?;
    Ok(eq(col(column.trim()), raw(parse_literal(value.trim()))))
}

fn parse_literal(s: &str) -> Value {
    match s {
        "null" => Value::Null,
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => s
            .parse::<i64>()
            .map(Value::Int)
            .or_else(|_| s.parse::<f64>().map(Value::Float))
            .unwrap_or_else(|_| Value::String(s.to_string())),
    }
}

fn print_explain(session: &Session, stmt: &Statement) {
    let schema = session.schema();
    println!("{}", "Aliases:".cyan().bold());
    println!(
        "  {:<10} {}",
        session.table_alias().yellow(),
        schema.table(session.table()).name
    );
    let (hops, _) = session.hops();
    for hop in &hops {
        let kind = match hop.kind {
            JoinKind::Inner => "inner",
            JoinKind::Left => "outer",
        };
        println!("  {:<10} {} {}", hop.alias.yellow(), hop.table, kind.dimmed());
        if let Some(on) = &hop.on {
            println!("  {:<10} {} {}", "", "on".dimmed(), on);
        }
    }

    println!();
    println!("{}", "Generated SQL:".green().bold());
    println!("{}", stmt.raw.sql.white());

    if !stmt.values.is_empty() {
        println!();
        println!("{}", "Bindings:".cyan());
        for (i, (name, value)) in stmt.raw.names.iter().zip(&stmt.values).enumerate() {
            println!("  {:>2}. {:<10} = {}", i + 1, name, value.to_string().yellow());
        }
    }
}

fn print_schema(schema: &Schema) {
    println!("{}", "Tables:".cyan().bold());
    for table in schema.tables() {
        let columns: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
        println!("  {} ({})", table.name.yellow(), columns.join(", "));
        for criteria in &table.criteria {
            println!("      {} {}", "where".dimmed(), criteria);
        }
    }

    println!();
    println!("{}", "Associations:".cyan().bold());
    for a in schema.associations() {
        let from = &schema.table(a.table_from).name;
        let to = &schema.table(a.table_to).name;
        let via = match a.many_to_many {
            Some(m2m) => {
                let junction = schema.association(m2m.from_junction).table_to;
                format!(" via {}", schema.table(junction).name)
            }
            None => String::new(),
        };
        println!("  {}.{} -> {}{}", from, a.name.yellow(), to, via.dimmed());
        for d in &a.discriminators {
            println!("      {} {} = {}", "where".dimmed(), d.column, d.value);
        }
    }
}
