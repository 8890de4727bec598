use clap::Parser;
use color_eyre::eyre::Result;
use yahtzee_client::{
    client,
    config::{
        AppConfig,
        Args,
    },
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let config = AppConfig::try_from(Args::parse())?;
    let _log_guard = client::init_tracing(&config.log_dir)?;
    tracing::info!("starting yahtzee-client");
    client::run_app(config).await
}
