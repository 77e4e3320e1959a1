//! Deploy one contract, plainly, behind a transparent proxy or through the
//! LensCreate2 factory.
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use lens_address_book::ContractType;
use lens_contract::{
    CREATE2_OWNER_KEY, PROXY_ADMIN_KEY, Session, Target, role,
    sol_types::initialize_with_metadata_call,
};
use lens_utils::logging;
use serde_json::Value;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Plain,
    Proxy,
    Create2,
}

#[derive(Clone, Debug, Parser)]
struct Args {
    /// Deployment config.
    #[clap(short, long, default_value = "./deploy.toml")]
    config: PathBuf,

    /// Artifact to deploy.
    #[clap(long)]
    contract: String,

    /// Address book key, defaults to the contract name.
    #[clap(long)]
    name: Option<String>,

    /// Contract type, by name or index.
    #[clap(long = "type", default_value = "Misc")]
    contract_type: ContractType,

    /// Constructor arguments as a JSON array.
    #[clap(long, default_value = "[]")]
    args: String,

    #[clap(long, value_enum, default_value = "plain")]
    mode: Mode,

    /// Initialize the proxy with `initialize(owner, metadataURI)` for this
    /// owner.
    #[clap(long)]
    owner: Option<alloy::primitives::Address>,

    #[clap(long, default_value = "")]
    metadata_uri: String,

    /// Deploy a new proxy even if one is already recorded under the name.
    #[clap(long)]
    force: bool,

    /// Regenerate the env file afterwards.
    #[clap(long)]
    write_env: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();
    let args = Args::parse();

    let constructor_arguments: Vec<Value> =
        serde_json::from_str(&args.args).context("--args must be a JSON array")?;
    let target = Target::builder()
        .contract_name(args.contract.clone())
        .contract_type(args.contract_type)
        .maybe_name(args.name.clone())
        .constructor_arguments(constructor_arguments)
        .maybe_initializer(
            args.owner
                .map(|o| initialize_with_metadata_call(o, &args.metadata_uri)),
        )
        .build();

    let record = match args.mode {
        Mode::Plain => {
            let session = open(&args, Vec::new()).await?;
            let record = session.deployer().deploy_single(&target).await?;
            finish(&session, &args).await?;
            record
        }
        Mode::Proxy => {
            let (_, proxy_admin) = role(PROXY_ADMIN_KEY)?;
            let session = open(&args, Vec::new()).await?;
            let record = session
                .deployer()
                .deploy_proxy(&target, proxy_admin, args.force)
                .await?;
            finish(&session, &args).await?;
            record
        }
        Mode::Create2 => {
            let (_, proxy_admin) = role(PROXY_ADMIN_KEY)?;
            let (signer, create2_owner) = role(CREATE2_OWNER_KEY)?;
            let session = open(&args, vec![signer]).await?;
            let factory = session.create2_factory(create2_owner)?;
            let record = session
                .deployer()
                .deploy_with_create2(&factory, &target, proxy_admin)
                .await?;
            finish(&session, &args).await?;
            record
        }
    };
    tracing::info!(name = %target.logical_name(), address = ?record.address, "done");
    Ok(())
}

async fn open(
    args: &Args,
    roles: Vec<alloy::signers::local::PrivateKeySigner>,
) -> Result<Session> {
    Session::open(&args.config, roles)
        .await
        .with_context(|| format!("failed to start session from {:?}", args.config))
}

async fn finish(session: &Session, args: &Args) -> Result<()> {
    if args.write_env {
        session.write_env_file().await?;
    }
    Ok(())
}
