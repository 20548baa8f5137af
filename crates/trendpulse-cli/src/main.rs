mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Upper bound on queries per `compare` run.
pub(crate) const MAX_COMPARE_QUERIES: usize = 5;

#[derive(Debug, Parser)]
#[command(name = "trendpulse-cli")]
#[command(about = "Fetch, score and summarize trends for a query")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the full pipeline for one query and print the response JSON
    Enrich {
        /// Search query sent to every source
        #[arg(long, short)]
        query: String,

        /// Items requested per source (clamped to the configured maximum)
        #[arg(long, short)]
        limit: Option<usize>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// Compare per-source trends for several queries side by side
    Compare {
        /// Query to compare; repeat the flag for each (at most 5)
        #[arg(long = "query", short, required = true, num_args = 1)]
        queries: Vec<String>,

        /// Items requested per source (clamped to the configured maximum)
        #[arg(long, short)]
        limit: Option<usize>,
    },
    /// Score a single piece of text with the configured backend
    Score {
        /// Text to score
        text: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = trendpulse_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    // stdout carries command output; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Some(Commands::Enrich {
            query,
            limit,
            pretty,
        }) => commands::run_enrich(&config, &query, limit, pretty).await?,
        Some(Commands::Compare { queries, limit }) => {
            commands::run_compare(&config, &queries, limit).await?;
        }
        Some(Commands::Score { text }) => commands::run_score(&config, &text).await?,
        None => println!("trendpulse-cli: run with --help to list commands"),
    }

    Ok(())
}
