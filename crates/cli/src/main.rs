mod exam_commands;
mod import_commands;
mod index_commands;
mod knowledge_base;
mod telemetry;

use std::path::PathBuf;

use {
    clap::{Parser, Subcommand},
    exambank_vector::QUESTIONS,
    tracing::info,
};

use crate::{
    index_commands::SearchArgs,
    knowledge_base::KnowledgeBase,
    telemetry::{TelemetryOptions, init_telemetry},
};

#[derive(Parser)]
#[command(name = "exambank", about = "Exam question knowledge base")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: discover exambank.{toml,yaml,yml,json}).
    #[arg(long, global = true, env = "EXAMBANK_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides the config file.
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Directory for rotating log files. Overrides the config file.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Bulk-load records; each one is indexed as it is saved.
    Import {
        #[command(subcommand)]
        action: import_commands::ImportAction,
    },
    /// Rebuild the vector index from the relational store.
    Sync,
    /// Similarity search over a collection.
    Search {
        /// Free-text query.
        query: String,
        /// Collection to search.
        #[arg(long, default_value = QUESTIONS)]
        collection: String,
        /// Maximum number of records to return.
        #[arg(long, default_value_t = 5)]
        limit: usize,
        /// Restrict to one question type.
        #[arg(long = "type")]
        question_type: Option<String>,
        /// Output results as JSON for scripting.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show a collection's chunk count and first chunks.
    Describe {
        collection: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate an exam.
    Generate {
        /// Exam spec file (default: exam.spec from the config, else the 408 layout).
        #[arg(long)]
        spec: Option<PathBuf>,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Delete every record and every vector.
    Reset {
        /// Confirm the reset.
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = exambank_config::load_or_discover(cli.config.as_deref())?;
    let _telemetry = init_telemetry(&TelemetryOptions {
        level: cli
            .log_level
            .clone()
            .unwrap_or_else(|| config.logging.level.clone()),
        json: cli.json_logs || config.logging.json,
        dir: cli.log_dir.clone().or_else(|| config.logging.dir.clone()),
    })?;
    info!(version = env!("CARGO_PKG_VERSION"), "exambank starting");

    let kb = KnowledgeBase::open(config.validated()?).await?;

    match cli.command {
        Commands::Import { action } => import_commands::handle_import(&kb, action).await,
        Commands::Sync => index_commands::handle_sync(&kb).await,
        Commands::Search {
            query,
            collection,
            limit,
            question_type,
            json,
        } => {
            index_commands::handle_search(&kb, SearchArgs {
                query,
                collection,
                limit,
                question_type,
                json,
            })
            .await
        },
        Commands::Describe { collection, limit } => {
            index_commands::handle_describe(&kb, &collection, limit).await
        },
        Commands::Generate { spec, json } => exam_commands::handle_generate(&kb, spec, json).await,
        Commands::Reset { yes } => index_commands::handle_reset(&kb, yes).await,
    }
}
