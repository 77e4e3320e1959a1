//! Deploy the actions bound to the recorded `ActionHub`.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use lens_contract::{OWNER_KEY, PROXY_ADMIN_KEY, Session, role, scripts::actions::deploy_actions};
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

    let (_, proxy_admin) = role(PROXY_ADMIN_KEY)?;
    let (_, owner) = role(OWNER_KEY)?;
    let session = Session::open(&args.config, Vec::new())
        .await
        .with_context(|| format!("failed to start session from {:?}", args.config))?;

    let records = deploy_actions(&session.deployer(), proxy_admin, owner).await?;
    tracing::info!(actions = records.len(), %owner, "actions deployed");

    if args.write_env {
        session.write_env_file().await?;
    }
    Ok(())
}
