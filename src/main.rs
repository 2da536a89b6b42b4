use crate::cli::args::Args;
use dotenvy::dotenv;
use tracing::error;
use tracing_subscriber::filter::EnvFilter;

mod cli;

/// Entry point of the server.
///
/// Loads `.env`, sets up logging from `RUST_LOG` and runs the parsed command.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::new();

    if let Err(e) = args.run().await {
        error!("{e:#}");
        return Err(e);
    }

    Ok(())
}
