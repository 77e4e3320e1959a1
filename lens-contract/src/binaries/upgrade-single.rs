//! Point one proxy at the implementation recorded under `<name>Impl`.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use lens_contract::{PROXY_ADMIN_KEY, Session, role};
use lens_utils::logging;

#[derive(Clone, Debug, Parser)]
struct Args {
    /// Deployment config.
    #[clap(short, long, default_value = "./deploy.toml")]
    config: PathBuf,

    /// Address book key of the proxy.
    #[clap(short, long)]
    name: String,

    /// Regenerate the env file afterwards.
    #[clap(long)]
    write_env: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();
    let args = Args::parse();

    let (admin, admin_address) = role(PROXY_ADMIN_KEY)?;
    let session = Session::open(&args.config, vec![admin])
        .await
        .with_context(|| format!("failed to start session from {:?}", args.config))?;

    let min_balance = session.config.create2.min_balance_wei()?;
    let record = session
        .deployer()
        .upgrade_single(admin_address, &args.name, min_balance)
        .await?;
    tracing::info!(
        name = %args.name,
        implementation = ?record.implementation,
        "proxy upgraded"
    );

    if args.write_env {
        session.write_env_file().await?;
    }
    Ok(())
}
