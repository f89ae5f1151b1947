use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use coverage_merge::app::{self, AppConfig, Args, FAILURE_EXIT_CODE};
use tracing::error;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match try_main().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::from(FAILURE_EXIT_CODE)
        }
    }
}

async fn try_main() -> Result<()> {
    let args = Args::parse();
    app::init_tracing();
    let config = AppConfig::try_from(args).context("error while merging coverage files")?;
    app::run(config)
        .await
        .context("error while merging coverage files")?;
    Ok(())
}
