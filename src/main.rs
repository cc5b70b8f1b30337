use tracing_subscriber::EnvFilter;

use ghmig::{cli, migrator};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match cli::run() {
        Ok(config) => config,
        Err(error) => {
            eprintln!("{error:#}");
            std::process::exit(1);
        }
    };

    if let Err(error) = migrator::run(config).await {
        tracing::error!("{error:#}");
        std::process::exit(1);
    }
}
