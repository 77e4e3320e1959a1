//! Deploy `ActionHub`, `LensFees`, the actions and the rules at deterministic
//! addresses through the LensCreate2 factory.
//!
//! Transactions to the factory are signed with
//! `LENS_CREATE2_OWNER_PRIVATE_KEY`, which must be the factory owner.
use std::path::PathBuf;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use clap::Parser;
use lens_contract::{
    CREATE2_OWNER_KEY, OWNER_KEY, PROXY_ADMIN_KEY, Session, role,
    scripts::create2_batch::{Create2BatchParams, deploy_many_with_create2},
};
use lens_utils::{env, logging};

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

    let (create2_owner, create2_owner_address) = role(CREATE2_OWNER_KEY)?;
    let (_, proxy_admin) = role(PROXY_ADMIN_KEY)?;
    let (_, owner) = role(OWNER_KEY)?;
    let treasury: Address = env::require("TREASURY_ADDRESS")?
        .parse()
        .context("TREASURY_ADDRESS is not an address")?;
    let treasury_fee_bps = env::require("TREASURY_FEE_BPS")?;

    let session = Session::open(&args.config, vec![create2_owner])
        .await
        .with_context(|| format!("failed to start session from {:?}", args.config))?;
    let factory = session.create2_factory(create2_owner_address)?;

    let params = Create2BatchParams {
        proxy_admin,
        owner,
        treasury,
        treasury_fee_bps,
    };
    deploy_many_with_create2(&session.deployer(), &factory, &params).await?;
    tracing::info!(factory = %factory.address, "create2 deployment finished");

    if args.write_env {
        session.write_env_file().await?;
    }
    Ok(())
}
