//! The deployment pipeline: fixed stage order, checkpointed, resumable.
//!
//! Stage order is dictated by constructor dependencies: the three target
//! contracts are independent, the DeployFactory consumes all of them, and
//! the proxies/gatekeeper only exist as side effects of the factory
//! constructor. Any deployment failure aborts the run; the deploy log on
//! disk is the resumption point for the next invocation.

use alloy_core::primitives::{Address, B256, Bytes, U256, b256};
use alloy_core::sol_types::SolValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{ChainClient, VerifierClient};
use crate::error::DeployError;
use crate::log::{DeployLog, keys};
use crate::recover::{AddressBundle, recover_addresses};
use crate::stage::{ReceiptKeys, Stage};
use crate::verify::VerifyStep;

/// keccak256 of the empty string, the default genesis sync hash.
pub const EMPTY_STRING_KECCAK: B256 =
    b256!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470");

/// Contract artifact names, as produced by the upstream build.
const VERIFIER_CONTRACT: &str = "Verifier";
const PERIPHERY_CONTRACT: &str = "ZkLinkPeriphery";
const ZKLINK_CONTRACT: &str = "ZkLink";
const FACTORY_CONTRACT: &str = "DeployFactory";
const PROXY_CONTRACT: &str = "Proxy";
const GATEKEEPER_CONTRACT: &str = "UpgradeGatekeeper";

const VERIFIER_STAGE: Stage = Stage::new("verifier", keys::VERIFIER_TARGET);
const PERIPHERY_STAGE: Stage = Stage::new("periphery", keys::PERIPHERY_TARGET);
const ZKLINK_STAGE: Stage = Stage::new("zklink", keys::ZKLINK_TARGET);
const FACTORY_STAGE: Stage =
    Stage::new("deploy_factory", keys::DEPLOY_FACTORY).with_receipt_keys(ReceiptKeys {
        block_number: keys::DEPLOY_FACTORY_BLOCK_NUMBER,
        block_hash: keys::DEPLOY_FACTORY_BLOCK_HASH,
        tx_hash: keys::DEPLOY_FACTORY_TX_HASH,
    });

/// Parameters of one logical deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployParams {
    /// Account the deploy transactions are sent from.
    pub deployer: Address,
    /// Network governor. Defaults to the deployer when unset on the CLI.
    pub governor: Address,
    /// Block submitter. Defaults to the deployer when unset on the CLI.
    pub validator: Address,
    /// Fee collection account. Defaults to the deployer when unset on the CLI.
    pub fee_account: Address,
    /// Genesis block number.
    pub block_number: u32,
    /// Genesis block timestamp.
    pub timestamp: u64,
    /// Genesis block root hash.
    pub genesis_root: B256,
    /// Genesis block commitment.
    pub commitment: B256,
    /// Genesis block sync hash.
    pub sync_hash: B256,
    /// Redeploy every contract, overwriting existing checkpoints.
    pub force: bool,
    /// Suppress every verification step. Orthogonal to `force`.
    pub skip_verify: bool,
}

/// Every address the pipeline produced, for the end-of-run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployOutcome {
    pub verifier_target: Address,
    pub periphery_target: Address,
    pub zklink_target: Address,
    pub deploy_factory: Address,
    pub bundle: AddressBundle,
}

/// Drives the stages in order against the supplied clients.
#[derive(Debug, Clone)]
pub struct DeployPipeline {
    pub params: DeployParams,
}

impl DeployPipeline {
    pub fn new(params: DeployParams) -> Self {
        Self { params }
    }

    /// Run the whole pipeline.
    ///
    /// Re-invoking after a partial run skips every stage whose output is
    /// already in `log`, unless `params.force` is set. Verification
    /// failures never surface here; the only errors out of this function
    /// are deployment-path errors.
    pub async fn run<C, V, F>(
        &self,
        log: &mut DeployLog,
        chain: &C,
        verifier: &V,
        classify_benign: &F,
    ) -> Result<DeployOutcome, DeployError>
    where
        C: ChainClient,
        V: VerifierClient,
        F: Fn(&str) -> bool,
    {
        let p = &self.params;
        tracing::info!(
            deployer = %p.deployer,
            governor = %p.governor,
            validator = %p.validator,
            fee_account = %p.fee_account,
            force = p.force,
            skip_verify = p.skip_verify,
            "Starting zkLink deployment"
        );

        log.set_many_and_persist([
            (keys::DEPLOYER.to_string(), Value::from(p.deployer.to_string())),
            (keys::GOVERNOR.to_string(), Value::from(p.governor.to_string())),
        ])?;

        // Target contracts: independent of each other, deployed bare.
        let verifier_target = VERIFIER_STAGE
            .run(log, p.force, || {
                chain.deploy_contract(VERIFIER_CONTRACT, Bytes::new())
            })
            .await?;
        self.verify_plain(log, verifier, classify_benign, VerifyStep {
            verified_key: keys::VERIFIER_TARGET_VERIFIED,
            contract: VERIFIER_CONTRACT,
            address: verifier_target,
            constructor_args: Bytes::new(),
        })
        .await?;

        let periphery_target = PERIPHERY_STAGE
            .run(log, p.force, || {
                chain.deploy_contract(PERIPHERY_CONTRACT, Bytes::new())
            })
            .await?;
        self.verify_plain(log, verifier, classify_benign, VerifyStep {
            verified_key: keys::PERIPHERY_TARGET_VERIFIED,
            contract: PERIPHERY_CONTRACT,
            address: periphery_target,
            constructor_args: Bytes::new(),
        })
        .await?;

        let zklink_target = ZKLINK_STAGE
            .run(log, p.force, || {
                chain.deploy_contract(ZKLINK_CONTRACT, Bytes::new())
            })
            .await?;
        self.verify_plain(log, verifier, classify_benign, VerifyStep {
            verified_key: keys::ZKLINK_TARGET_VERIFIED,
            contract: ZKLINK_CONTRACT,
            address: zklink_target,
            constructor_args: Bytes::new(),
        })
        .await?;

        // The aggregating factory: its constructor wires the proxies and
        // transfers control to the gatekeeper, so it consumes everything
        // deployed so far plus the genesis parameters.
        let factory_args: Bytes = (
            verifier_target,
            zklink_target,
            periphery_target,
            p.block_number,
            U256::from(p.timestamp),
            p.genesis_root,
            p.commitment,
            p.sync_hash,
            p.validator,
            p.governor,
            p.fee_account,
        )
            .abi_encode_params()
            .into();
        let deploy_factory = FACTORY_STAGE
            .run(log, p.force, || {
                chain.deploy_contract(FACTORY_CONTRACT, factory_args.clone())
            })
            .await?;

        let bundle = self.recover_bundle(log, chain, deploy_factory).await?;
        tracing::info!(
            zklink_proxy = %bundle.zklink_proxy,
            verifier_proxy = %bundle.verifier_proxy,
            gatekeeper = %bundle.gatekeeper,
            "Factory addresses recovered"
        );

        // The proxies carry constructor arguments, so their verification
        // requests must reproduce them.
        let zklink_init: Bytes = (
            bundle.verifier_proxy,
            periphery_target,
            deploy_factory,
            p.block_number,
            U256::from(p.timestamp),
            p.genesis_root,
            p.commitment,
            p.sync_hash,
        )
            .abi_encode_params()
            .into();
        self.verify_plain(log, verifier, classify_benign, VerifyStep {
            verified_key: keys::ZKLINK_PROXY_VERIFIED,
            contract: PROXY_CONTRACT,
            address: bundle.zklink_proxy,
            constructor_args: (zklink_target, zklink_init).abi_encode_params().into(),
        })
        .await?;
        self.verify_plain(log, verifier, classify_benign, VerifyStep {
            verified_key: keys::VERIFIER_PROXY_VERIFIED,
            contract: PROXY_CONTRACT,
            address: bundle.verifier_proxy,
            constructor_args: (verifier_target, Bytes::new()).abi_encode_params().into(),
        })
        .await?;
        self.verify_plain(log, verifier, classify_benign, VerifyStep {
            verified_key: keys::GATEKEEPER_VERIFIED,
            contract: GATEKEEPER_CONTRACT,
            address: bundle.gatekeeper,
            constructor_args: bundle.zklink_proxy.abi_encode().into(),
        })
        .await?;

        tracing::info!("Deployment complete");
        Ok(DeployOutcome {
            verifier_target,
            periphery_target,
            zklink_target,
            deploy_factory,
            bundle,
        })
    }

    async fn verify_plain<V, F>(
        &self,
        log: &mut DeployLog,
        verifier: &V,
        classify_benign: &F,
        step: VerifyStep,
    ) -> Result<(), DeployError>
    where
        V: VerifierClient,
        F: Fn(&str) -> bool,
    {
        step.run(
            log,
            self.params.force,
            self.params.skip_verify,
            verifier,
            classify_benign,
        )
        .await
    }

    /// Skip-if-present wrapper around event-based address recovery.
    ///
    /// The confirmation block number committed by the factory stage is the
    /// only way to find the event once the in-process receipt is gone.
    async fn recover_bundle<C: ChainClient>(
        &self,
        log: &mut DeployLog,
        chain: &C,
        deploy_factory: Address,
    ) -> Result<AddressBundle, DeployError> {
        if !self.params.force && log.has(keys::ZKLINK_PROXY) {
            return Ok(AddressBundle {
                zklink_proxy: log.get_address(keys::ZKLINK_PROXY)?,
                verifier_proxy: log.get_address(keys::VERIFIER_PROXY)?,
                gatekeeper: log.get_address(keys::GATEKEEPER)?,
            });
        }

        let block = log.get_u64(keys::DEPLOY_FACTORY_BLOCK_NUMBER)?;
        let bundle = recover_addresses(chain, deploy_factory, block).await?;

        log.set_many_and_persist([
            (
                keys::ZKLINK_PROXY.to_string(),
                Value::from(bundle.zklink_proxy.to_string()),
            ),
            (
                keys::VERIFIER_PROXY.to_string(),
                Value::from(bundle.verifier_proxy.to_string()),
            ),
            (
                keys::GATEKEEPER.to_string(),
                Value::from(bundle.gatekeeper.to_string()),
            ),
        ])?;
        Ok(bundle)
    }
}
