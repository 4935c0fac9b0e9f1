//! zkdeploy is a CLI tool that deploys the zkLink contract suite with a
//! durable checkpoint log, so an interrupted deployment can simply be
//! re-run.

mod cli;

use alloy_core::primitives::{Address, Bytes};
use anyhow::{Context, Result};
use clap::Parser;

use cli::Cli;
use zklink_deploy::{
    DEPLOY_ZKLINK_LOG_PREFIX, DeployLog, DeployOutcome, DeployParams, DeployPipeline,
    EtherscanVerifier, RpcChainClient, VerifierClient, VerifyFailure, default_benign,
};

/// Stand-in verifier for runs with verification disabled. Never called,
/// because those runs set `skip_verify`.
struct NoVerifier;

impl VerifierClient for NoVerifier {
    async fn verify(
        &self,
        _address: Address,
        _contract: &str,
        _constructor_args: Bytes,
    ) -> std::result::Result<(), VerifyFailure> {
        Err(VerifyFailure::new("no verification endpoint configured"))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let mut skip_verify = cli.skip_verify;
    if !skip_verify && cli.verify_url.is_none() {
        tracing::warn!("No --verify-url configured, skipping source verification");
        skip_verify = true;
    }

    let params = DeployParams {
        deployer: cli.deployer,
        governor: cli.governor.unwrap_or(cli.deployer),
        validator: cli.validator.unwrap_or(cli.deployer),
        fee_account: cli.fee_account.unwrap_or(cli.deployer),
        block_number: cli.block_number,
        timestamp: cli.timestamp,
        genesis_root: cli.genesis_root,
        commitment: cli.commitment,
        sync_hash: cli.sync_hash,
        force: cli.force,
        skip_verify,
    };

    let mut log = DeployLog::load(&cli.log_dir, DEPLOY_ZKLINK_LOG_PREFIX, &cli.net)?;
    tracing::info!(
        net = %cli.net,
        log_path = %log.path().display(),
        rpc_url = %cli.rpc_url,
        "Starting deployment..."
    );

    let chain = RpcChainClient::new(cli.rpc_url, cli.deployer, cli.artifacts)?;
    let pipeline = DeployPipeline::new(params);

    let outcome = match cli.verify_url {
        Some(verify_url) if !skip_verify => {
            let verifier = EtherscanVerifier::new(verify_url, cli.verify_api_key)
                .context("Failed to create verification client")?;
            pipeline
                .run(&mut log, &chain, &verifier, &default_benign)
                .await?
        }
        _ => {
            pipeline
                .run(&mut log, &chain, &NoVerifier, &default_benign)
                .await?
        }
    };

    print_summary(&outcome);
    Ok(())
}

fn print_summary(outcome: &DeployOutcome) {
    tracing::info!("=== Deployed contracts ===");
    tracing::info!("Verifier target:   {}", outcome.verifier_target);
    tracing::info!("Periphery target:  {}", outcome.periphery_target);
    tracing::info!("ZkLink target:     {}", outcome.zklink_target);
    tracing::info!("Deploy factory:    {}", outcome.deploy_factory);
    tracing::info!("ZkLink proxy:      {}", outcome.bundle.zklink_proxy);
    tracing::info!("Verifier proxy:    {}", outcome.bundle.verifier_proxy);
    tracing::info!("Upgrade gatekeeper: {}", outcome.bundle.gatekeeper);
}
