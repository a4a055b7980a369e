use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use trendscout::{TrendDeps, TrendRequest, TrendService};
use trendscout_common::Config;

#[derive(Parser)]
#[command(name = "trendscout", about = "Score a topic's momentum across public signals")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a full analysis and print the report as JSON
    Analyze {
        #[arg(long)]
        topic: String,
        #[arg(long, default_value = "US")]
        country: String,
        #[arg(long, default_value = "30d")]
        range: String,
        /// Record the run in this user's history
        #[arg(long)]
        user: Option<String>,
    },
    /// Print the normalized keyword and its search variants
    Keywords {
        #[arg(long)]
        topic: String,
    },
    /// Print a user's past analyses, newest first
    History {
        #[arg(long)]
        user: String,
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    let filter = EnvFilter::from_default_env().add_directive("trendscout=info".parse()?);
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let cli = Cli::parse();

    let config = Config::from_env()?;
    config.log_redacted();

    let service = TrendService::new(TrendDeps::from_config(&config).await?);

    match cli.command {
        Command::Analyze {
            topic,
            country,
            range,
            user,
        } => {
            let mut request = TrendRequest::new(topic).country(country).range(range);
            if let Some(user) = user {
                request = request.user(user);
            }
            let report = service.analyze(request).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Keywords { topic } => {
            let keywords = service.keywords(&topic)?;
            println!("{}", serde_json::to_string_pretty(&keywords)?);
        }
        Command::History { user, limit } => {
            let records = service.history(&user, limit).await?;
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
    }

    service.drain_pending_writes().await;
    info!("Done");
    Ok(())
}
