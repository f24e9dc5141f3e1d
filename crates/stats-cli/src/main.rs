use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use common::bands::SimilarityBand;
use common::configuration::Configuration;
use common::similarity::similarity;
use common::tokens::{BpeTokenEstimator, TokenEstimator};
use serde::Serialize;
use stats_cli::commands;
use stats_cli::input::{parse_chats, parse_history, parse_json, parse_transcript, read_input};
use stats_cli::utils::tracing::init_tracer;
use std::path::PathBuf;
use tracing::{debug, error};

const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Parser)]
#[command(
    name = "personastats",
    version,
    about = "Similarity and interaction statistics for persona chats"
)]
struct Cli {
    /// YAML configuration file (defaults to $PERSONA_STATS_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Cosine similarity between two texts
    Similarity { text1: String, text2: String },

    /// Score `{"pairs": [{"text1", "text2"}, ...]}`; prints one score per pair
    Batch {
        #[arg(long, short)]
        input: Option<PathBuf>,
    },

    /// Estimate the token count of a text
    Tokens {
        text: String,
        /// Count with the cl100k_base tokenizer instead of the configured estimator
        #[arg(long)]
        bpe: bool,
    },

    /// Interaction records and aggregate stats for one chat
    Aggregate {
        #[arg(long, short)]
        input: Option<PathBuf>,
        /// Compute stats for assistant replies stored without them
        #[arg(long)]
        backfill: bool,
    },

    /// Persona dashboard figures over an array of chats
    Persona {
        #[arg(long, short)]
        input: Option<PathBuf>,
        /// Persona's own last update (RFC 3339); defaults to now
        #[arg(long)]
        persona_updated_at: Option<DateTime<Utc>>,
    },

    /// Every user/assistant exchange across chats, scored and banded
    Outputs {
        #[arg(long, short)]
        input: Option<PathBuf>,
        /// Only show outputs in this band (high, medium, low)
        #[arg(long)]
        band: Option<SimilarityBand>,
    },

    /// Similarity and response-time trend over time
    History {
        #[arg(long, short)]
        input: Option<PathBuf>,
        /// Roll up per UTC day instead of per interaction
        #[arg(long)]
        daily: bool,
    },

    /// Citations referenced in a response text
    Citations {
        #[arg(long, short)]
        input: Option<PathBuf>,
    },
}

fn print<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{out}");
    Ok(())
}

fn run(cli: Cli, config: Configuration) -> Result<()> {
    let estimator: Box<dyn TokenEstimator> = config
        .token_estimator
        .build()
        .context("failed to build token estimator")?;
    debug!(estimator = estimator.name(), "token estimator ready");

    match cli.command {
        Command::Similarity { text1, text2 } => print(&similarity(&text1, &text2), cli.pretty),
        Command::Batch { input } => {
            let body = parse_json(&read_input(input.as_deref())?)?;
            print(&commands::batch(&body)?, cli.pretty)
        }
        Command::Tokens { text, bpe } => {
            let count = if bpe {
                BpeTokenEstimator::cl100k()?.estimate(&text)
            } else {
                estimator.estimate(&text)
            };
            print(&count, cli.pretty)
        }
        Command::Aggregate { input, backfill } => {
            let mut transcript = parse_transcript(&read_input(input.as_deref())?)?;
            if backfill {
                commands::backfill(&mut transcript, estimator.as_ref());
            }
            let report = commands::aggregate_transcript(&transcript, estimator.as_ref());
            print(&report, cli.pretty)
        }
        Command::Persona {
            input,
            persona_updated_at,
        } => {
            let chats = parse_chats(&read_input(input.as_deref())?)?;
            print(&commands::persona(&chats, persona_updated_at), cli.pretty)
        }
        Command::Outputs { input, band } => {
            let chats = parse_chats(&read_input(input.as_deref())?)?;
            let report = commands::outputs(&chats, &config.similarity_bands, band);
            print(&report, cli.pretty)
        }
        Command::History { input, daily } => {
            let history = parse_history(&read_input(input.as_deref())?)?;
            print(
                &commands::history(&history, estimator.as_ref(), daily)?,
                cli.pretty,
            )
        }
        Command::Citations { input } => {
            let text = read_input(input.as_deref())?;
            print(&commands::citations(&text), cli.pretty)
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let config = match Configuration::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            init_tracer(DEFAULT_LOG_LEVEL);
            error!(error = %e, "failed to load configuration");
            std::process::exit(2);
        }
    };
    init_tracer(config.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL));
    debug!(?config, "configuration loaded");

    if let Err(e) = run(cli, config) {
        error!(error = %format!("{e:#}"), "command failed");
        std::process::exit(1);
    }
}
