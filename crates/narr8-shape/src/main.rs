//! CLI entry point for narr8-shape.
//!
//! Reads graph query rows as a JSON array from stdin, folds them into an
//! entity graph, and writes either the graph or a JSON:API document to
//! stdout.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use narr8_core::{MemoryRow, Narr8Config};
use narr8_graph::{GraphMaterializer, Schema, SchemaRegistry};
use narr8_jsonapi::JsonApiBuilder;

#[derive(Parser)]
#[command(name = "narr8-shape")]
#[command(about = "Shape narr8 graph query rows into entity graphs and JSON:API documents")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file prefix (default: narr8).
    #[arg(short, long, default_value = "narr8", global = true)]
    config: String,
}

#[derive(Subcommand)]
enum Command {
    /// Print the materialized entity graph (reads rows from stdin).
    Materialize {
        /// Root entity type, e.g. `character`.
        #[arg(long)]
        root: String,
    },
    /// Print a JSON:API document (reads rows from stdin).
    Render {
        /// Root entity type, e.g. `character`.
        #[arg(long)]
        root: String,
        /// Request query string: include, fields[type], page[size], page[offset].
        #[arg(long)]
        query: Option<String>,
        /// Render the first root entity as a single-resource document.
        #[arg(long)]
        single: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Narr8Config::load(&cli.config)?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let (schemas, descriptors) = narr8_models::registries();
    let materializer = GraphMaterializer::new(schemas.clone());

    match cli.command {
        Command::Materialize { ref root } => {
            let root = root_schema(&schemas, root)?;
            let rows = read_rows()?;
            let entities = materializer.create_graph_list(&root, &rows);
            println!("{}", serde_json::to_string(&entities)?);
        }
        Command::Render {
            ref root,
            ref query,
            single,
        } => {
            let root = root_schema(&schemas, root)?;
            let rows = read_rows()?;
            let entities = materializer.create_graph_list(&root, &rows);

            let builder = JsonApiBuilder::new(&config, descriptors, query.as_deref());
            let descriptor = builder.descriptor(&root.type_name)?;
            let document = if single {
                builder.build_single(&descriptor, entities.first()).await?
            } else {
                builder.build_list(&descriptor, &entities).await?
            };
            println!("{}", serde_json::to_string(&document)?);
        }
    }

    Ok(())
}

fn root_schema(schemas: &SchemaRegistry, root: &str) -> anyhow::Result<Arc<Schema>> {
    schemas.get(root).ok_or_else(|| {
        anyhow::anyhow!(
            "unknown root type {root}; expected one of {}",
            schemas.type_names().join(", ")
        )
    })
}

fn read_rows() -> anyhow::Result<Vec<MemoryRow>> {
    let input = std::io::read_to_string(std::io::stdin())?;
    serde_json::from_str(&input).context("stdin must be a JSON array of rows")
}
