//! Weather Agent - interactive CLI entry point.
//!
//! Reads questions from stdin and answers them, calling the weather tool as needed.

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weather_agent::{agent, cli, config::Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging on stderr so it stays out of the REPL output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weather_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        "Loaded configuration: model={} mode={:?}",
        config.default_model, config.mode
    );

    let agent = agent::build_agent(&config);
    let stdin = cli::stdin_lines()?;

    let end = cli::run_session(agent.as_ref(), stdin, tokio::signal::ctrl_c()).await?;
    info!("Session ended: {:?}", end);

    Ok(())
}
