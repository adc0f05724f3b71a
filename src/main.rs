//! Command-line front end for the deep-link engine.
//!
//! # Usage
//!
//! ```bash
//! # Parse a link and print it as JSON
//! cargo run -- parse "freshcuts://shop?shop=nyc_01"
//!
//! # Dispatch one or more links against the sandbox gateway
//! cargo run -- dispatch "freshcuts://payment?amount=45&shop=nyc_01" "freshcuts://tip?barber=jb"
//!
//! # Dispatch as a specific caller and show the analytics summary
//! cargo run -- dispatch --caller u_42 --source qr --metrics "freshcuts://booking?shop=nyc_01"
//! ```
//!
//! # Environment Variables
//!
//! See [`freshcuts_deeplinks::config`] for the full list.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::sync::Arc;

use freshcuts_deeplinks::application::services::DispatchContext;
use freshcuts_deeplinks::config;
use freshcuts_deeplinks::domain::entities::AnalyticsMetrics;
use freshcuts_deeplinks::domain::repositories::AnalyticsRepository;
use freshcuts_deeplinks::infrastructure::payment::SandboxPaymentGateway;
use freshcuts_deeplinks::state::EngineState;
use freshcuts_deeplinks::telemetry;
use freshcuts_deeplinks::utils::deep_link_parser;

/// Parse and dispatch freshcuts:// deep links.
#[derive(Parser)]
#[command(name = "freshcuts-deeplinks")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a link without dispatching it
    Parse {
        /// Raw link, e.g. "freshcuts://shop?shop=nyc_01"
        uri: String,
    },

    /// Dispatch links through the full pipeline
    Dispatch {
        /// Links to dispatch, in order
        #[arg(required = true)]
        uris: Vec<String>,

        /// Caller identity used for rate-limit keys
        #[arg(short, long)]
        caller: Option<String>,

        /// Source recorded on analytics events
        #[arg(short, long, default_value = "cli")]
        source: String,

        /// Print the analytics summary afterwards
        #[arg(short, long)]
        metrics: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = config::load_from_env().context("Invalid configuration")?;
    telemetry::init_tracing(&config)?;
    config.print_summary();

    let cli = Cli::parse();

    match cli.command {
        Commands::Parse { uri } => handle_parse(&uri)?,
        Commands::Dispatch {
            uris,
            caller,
            source,
            metrics,
        } => {
            let engine = EngineState::from_config(&config, Arc::new(SandboxPaymentGateway::new()));
            let context = DispatchContext {
                identity: caller,
                source,
            };

            handle_dispatch(&engine, &uris, &context).await?;

            if metrics {
                let summary = engine.analytics.get_metrics(None).await?;
                print_metrics(&summary);
            }

            engine.shutdown();
        }
    }

    Ok(())
}

fn handle_parse(uri: &str) -> Result<()> {
    match deep_link_parser::parse(uri) {
        Ok(link) => {
            println!("{}", "✓ Valid link".green().bold());
            println!("{}", serde_json::to_string_pretty(&link)?);
        }
        Err(e) => {
            println!("{} {}", "✗".red().bold(), e.to_string().red());
            println!("  {}: {}", "code".dimmed(), e.code());
            println!("  {}: {}", "details".dimmed(), e.details());
        }
    }

    Ok(())
}

async fn handle_dispatch(engine: &EngineState, uris: &[String], context: &DispatchContext) -> Result<()> {
    for uri in uris {
        println!();
        println!("{} {}", "→".bright_blue(), uri.bold());

        match engine.dispatcher.dispatch(uri, context).await {
            Ok(result) => {
                println!(
                    "  {} {} / {:?}",
                    "✓".green().bold(),
                    result.result_type.to_string().green(),
                    result.action
                );
                println!("{}", serde_json::to_string_pretty(&result.data)?);
            }
            Err(e) => {
                println!("  {} [{}] {}", "✗".red().bold(), e.code().yellow(), e.to_string().red());
            }
        }
    }

    Ok(())
}

fn print_metrics(metrics: &AnalyticsMetrics) {
    println!();
    println!("{}", "Analytics".bright_blue().bold());
    println!("  Total links:      {}", metrics.total_links.to_string().cyan());
    println!("  Success rate:     {:.1}%", metrics.success_rate * 100.0);
    println!("  Avg processing:   {:.3} ms", metrics.average_processing_time);

    if !metrics.popular_actions.is_empty() {
        println!("  Actions:");
        for entry in &metrics.popular_actions {
            println!("    {:<12} {}", entry.action, entry.count);
        }
    }

    if !metrics.errors.is_empty() {
        println!("  Errors:");
        for entry in &metrics.errors {
            println!("    {} × {}", entry.count, entry.error.red());
        }
    }
}
