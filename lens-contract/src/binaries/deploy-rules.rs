//! Deploy every rule behind a transparent proxy owned by the rules owner.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use lens_contract::{OWNER_KEY, Session, role, scripts::rules::deploy_rules};
use lens_utils::logging;

#[derive(Clone, Debug, Parser)]
struct Args {
    /// Deployment config.
    #[clap(short, long, default_value = "./deploy.toml")]
    config: PathBuf,

    /// Regenerate the env file afterwards.
    #[clap(long)]
    write_env: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();
    let args = Args::parse();

    let (_, owner) = role(OWNER_KEY)?;
    let session = Session::open(&args.config, Vec::new())
        .await
        .with_context(|| format!("failed to start session from {:?}", args.config))?;

    let records = deploy_rules(&session.deployer(), owner).await?;
    tracing::info!(rules = records.len(), %owner, "rules deployed");

    if args.write_env {
        session.write_env_file().await?;
    }
    Ok(())
}
