//! Roll out changed bytecode to a group of transparent proxies and verify
//! the on-chain code afterwards.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use lens_contract::{
    PROXY_ADMIN_KEY, Session, role,
    scripts::{actions::upgrade_actions, rules::upgrade_rules, upgrades::upgrade_factories},
};
use lens_utils::logging;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Group {
    Factories,
    Rules,
    Actions,
}

#[derive(Clone, Debug, Parser)]
struct Args {
    /// Deployment config.
    #[clap(short, long, default_value = "./deploy.toml")]
    config: PathBuf,

    #[clap(short, long, value_enum, default_value = "factories")]
    group: Group,

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
    let deployer = session.deployer();

    tracing::info!(group = ?args.group, admin = %admin_address, "upgrading proxies");
    let records = match args.group {
        Group::Factories => upgrade_factories(&deployer, admin_address).await?,
        Group::Rules => upgrade_rules(&deployer, admin_address).await?,
        Group::Actions => upgrade_actions(&deployer, admin_address).await?,
    };
    tracing::info!(proxies = records.len(), "upgrade finished");

    if args.write_env {
        session.write_env_file().await?;
    }
    Ok(())
}
