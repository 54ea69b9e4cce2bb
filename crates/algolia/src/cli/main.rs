//! Algolia administration CLI
//!
//! Runs backend operations against the indexes described by a registry file.
//!
//! # Usage
//!
//! ```bash
//! # Push index settings for every registered model
//! algolia-admin --registry models.json setup
//!
//! # Remove every document of one model (or of all models when none is given)
//! algolia-admin --registry models.json clear --yes blog.post
//!
//! # Search one model
//! algolia-admin --registry models.json search --model blog.post hello world
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `ALGOLIA_APP_ID` | | Application id (required) |
//! | `ALGOLIA_API_KEY` | | API key (required) |
//! | `ALGOLIA_INDEX_NAME` | | Single index shared by every model |
//! | `ALGOLIA_INDEX_NAME_PREFIX` | | Prefix of per-model index names |
//! | `ALGOLIA_OPTIONAL_WORDS` | | Comma-separated optional words |
//! | `ALGOLIA_REGISTRY` | | Registry JSON file (required) |
//! | `ALGOLIA_LOG_LEVEL` | info | Log level |

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use serde_json::json;

use haystack_algolia::registry::StaticRegistry;
use haystack_algolia::{AlgoliaConfig, AlgoliaSearchBackend, AlgoliaSearchQuery, ModelId};

#[derive(Debug, Parser)]
#[command(name = "algolia-admin")]
#[command(about = "Administer Algolia search indexes")]
struct Cli {
    /// Algolia application id.
    #[arg(long, env = "ALGOLIA_APP_ID")]
    app_id: String,

    /// Algolia API key.
    #[arg(long, env = "ALGOLIA_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Single index name shared by every model.
    #[arg(long, env = "ALGOLIA_INDEX_NAME")]
    index_name: Option<String>,

    /// Prefix of per-model index names.
    #[arg(long, env = "ALGOLIA_INDEX_NAME_PREFIX")]
    index_name_prefix: Option<String>,

    /// Words treated as optional in every query.
    #[arg(long, env = "ALGOLIA_OPTIONAL_WORDS", value_delimiter = ',')]
    optional_words: Vec<String>,

    /// Registry JSON file describing the indexed models.
    #[arg(long, env = "ALGOLIA_REGISTRY")]
    registry: PathBuf,

    /// Connection alias used in error messages.
    #[arg(long, default_value = "default")]
    alias: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "ALGOLIA_LOG_LEVEL", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Push index settings for every registered model.
    Setup,

    /// Delete every document of the given models, or of all models.
    Clear {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,

        /// Models to clear, as `app_label.model_name`.
        models: Vec<ModelId>,
    },

    /// Search one model and print the results as JSON.
    Search {
        /// Model to search, as `app_label.model_name`.
        #[arg(long)]
        model: ModelId,

        /// Offset of the first result.
        #[arg(long, default_value = "0")]
        start: usize,

        /// Offset one past the last result.
        #[arg(long, default_value = "20")]
        end: usize,

        /// Query terms. Matches everything when empty.
        terms: Vec<String>,
    },
}

impl Cli {
    fn config(&self) -> AlgoliaConfig {
        AlgoliaConfig {
            app_id: self.app_id.clone(),
            api_key: self.api_key.clone(),
            index_name: self.index_name.clone(),
            index_name_prefix: self.index_name_prefix.clone(),
            optional_words: (!self.optional_words.is_empty()).then(|| self.optional_words.clone()),
            ..Default::default()
        }
    }
}

fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("haystack_algolia={},algolia_admin={}", level, level)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let raw = std::fs::read_to_string(&cli.registry)
        .with_context(|| format!("failed to read registry file {}", cli.registry.display()))?;
    let registry = StaticRegistry::from_json(&raw)
        .with_context(|| format!("invalid registry file {}", cli.registry.display()))?;

    let backend = AlgoliaSearchBackend::new(cli.alias.clone(), cli.config(), Arc::new(registry))?;

    match &cli.command {
        Command::Setup => {
            backend.setup().await?;
            tracing::info!("Index settings pushed");
        }
        Command::Clear { yes, models } => {
            if !yes {
                bail!("refusing to clear indexes without --yes");
            }
            backend.clear(models, true).await?;
        }
        Command::Search {
            model,
            start,
            end,
            terms,
        } => {
            let mut query = AlgoliaSearchQuery::new();
            for term in terms {
                query.add_filter("content", term.as_str());
            }
            query.add_model(model.clone()).set_limits(*start, *end);

            let response = query.run(&backend).await?;
            let output = json!({
                "hits": response.hits,
                "results": response.results,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
