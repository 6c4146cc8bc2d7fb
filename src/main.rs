use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use persona_forge::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    persona_forge::bootstrap::load_forge_env();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "persona_forge=info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    cli::run(Cli::parse()).await
}
