//! Deploy the factories, the prerequisite rules and `LensFactory`.
//!
//! The rules are owned by `OWNER_PRIVATE_KEY`'s address and the factory
//! proxies are administered by `PROXY_ADMIN_PRIVATE_KEY`'s address.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use lens_contract::{
    OWNER_KEY, PROXY_ADMIN_KEY, Session, role,
    scripts::factories::{FactoriesParams, deploy_factories},
};
use lens_utils::logging;

#[derive(Clone, Debug, Parser)]
struct Args {
    /// Deployment config.
    #[clap(short, long, default_value = "./deploy.toml")]
    config: PathBuf,

    /// Deploy the migration variants of the factories and skip the rules.
    #[clap(long)]
    migration: bool,

    /// Metadata URI the rules are initialized with.
    #[clap(long, default_value = "")]
    metadata_uri: String,

    /// Regenerate the env file afterwards.
    #[clap(long)]
    write_env: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();
    let args = Args::parse();

    let (_, rules_owner) = role(OWNER_KEY)?;
    let (_, proxy_owner) = role(PROXY_ADMIN_KEY)?;
    let session = Session::open(&args.config, Vec::new())
        .await
        .with_context(|| format!("failed to start session from {:?}", args.config))?;

    tracing::info!(migration = args.migration, %rules_owner, %proxy_owner, "deploying factories");
    let params = FactoriesParams {
        migration: args.migration,
        rules_owner,
        proxy_owner,
        metadata_uri: args.metadata_uri,
    };
    let lens_factory = deploy_factories(&session.deployer(), &params).await?;
    tracing::info!(%lens_factory, "factories deployed");

    if args.write_env {
        session.write_env_file().await?;
    }
    Ok(())
}
