//! Upgrade the primitive beacons to a new implementation version.
use std::path::PathBuf;

use alloy::primitives::U256;
use anyhow::{Context, Result};
use clap::Parser;
use lens_contract::{
    BEACON_OWNER_KEY, Session, role,
    scripts::beacons::{PRIMITIVES, upgrade_beacons},
};
use lens_utils::logging;

#[derive(Clone, Debug, Parser)]
struct Args {
    /// Deployment config.
    #[clap(short, long, default_value = "./deploy.toml")]
    config: PathBuf,

    /// Implementation version to set and make the default.
    #[clap(short, long)]
    version: U256,

    /// Primitives to upgrade, all of them if omitted.
    #[clap(long, value_delimiter = ',')]
    contract: Vec<String>,

    /// Regenerate the env file afterwards.
    #[clap(long)]
    write_env: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();
    let args = Args::parse();

    let (owner, owner_address) = role(BEACON_OWNER_KEY)?;
    let session = Session::open(&args.config, vec![owner])
        .await
        .with_context(|| format!("failed to start session from {:?}", args.config))?;

    let names = if args.contract.is_empty() {
        PRIMITIVES.map(String::from).to_vec()
    } else {
        args.contract
    };
    tracing::info!(?names, version = %args.version, owner = %owner_address, "upgrading beacons");
    upgrade_beacons(&session.deployer(), owner_address, &names, args.version).await?;

    if args.write_env {
        session.write_env_file().await?;
    }
    Ok(())
}
