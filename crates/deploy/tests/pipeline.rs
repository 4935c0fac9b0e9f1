//! End-to-end pipeline tests against in-memory mock clients.
//!
//! These cover the checkpoint/resume behavior: a finished run is a no-op
//! when repeated, an interrupted run resumes past committed stages, force
//! redeploys everything, and verification failures never stop deployment.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use alloy_core::primitives::{Address, B256, Bytes, address, keccak256};
use alloy_core::sol;
use alloy_core::sol_types::SolEvent;
use tempdir::TempDir;
use zklink_deploy::{
    ChainClient, DEPLOY_ZKLINK_LOG_PREFIX, DeployLog, DeployParams, DeployPipeline,
    DeployedContract, EMPTY_STRING_KECCAK, RawLog, VerifierClient, VerifyFailure, keys,
};

sol! {
    event Addresses(address zkLink, address verifier, address gatekeeper);
}

const ZKLINK_PROXY: Address = address!("00000000000000000000000000000000000000a1");
const VERIFIER_PROXY: Address = address!("00000000000000000000000000000000000000a2");
const GATEKEEPER: Address = address!("00000000000000000000000000000000000000a3");

/// Initialize tracing for tests (idempotent).
fn init_test_tracing() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init()
        .ok();
}

/// Chain mock: deterministic addresses per artifact, a synthetic
/// `Addresses` event emitted when the factory deploys, and call counters.
struct MockChain {
    deploys: Mutex<Vec<String>>,
    logs: Mutex<Vec<RawLog>>,
    next_block: AtomicU64,
    queries: AtomicUsize,
}

impl MockChain {
    fn new() -> Self {
        Self {
            deploys: Mutex::new(Vec::new()),
            logs: Mutex::new(Vec::new()),
            next_block: AtomicU64::new(100),
            queries: AtomicUsize::new(0),
        }
    }

    fn deploy_count(&self) -> usize {
        self.deploys.lock().unwrap().len()
    }

    fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn artifact_address(artifact: &str) -> Address {
        Address::from_slice(&keccak256(artifact.as_bytes())[12..])
    }
}

impl ChainClient for MockChain {
    async fn deploy_contract(
        &self,
        artifact: &str,
        _constructor_args: Bytes,
    ) -> anyhow::Result<DeployedContract> {
        let block = self.next_block.fetch_add(1, Ordering::SeqCst);
        let address = Self::artifact_address(artifact);
        self.deploys.lock().unwrap().push(artifact.to_string());

        if artifact == "DeployFactory" {
            let event = Addresses {
                zkLink: ZKLINK_PROXY,
                verifier: VERIFIER_PROXY,
                gatekeeper: GATEKEEPER,
            };
            self.logs.lock().unwrap().push(RawLog {
                address,
                topics: vec![Addresses::SIGNATURE_HASH],
                data: Bytes::from(event.encode_data()),
                block_number: block,
            });
        }

        Ok(DeployedContract {
            address,
            block_number: block,
            block_hash: keccak256(block.to_be_bytes()),
            tx_hash: keccak256(artifact.as_bytes()),
        })
    }

    async fn query_events(
        &self,
        address: Address,
        topic0: B256,
        from_block: u64,
        to_block: u64,
    ) -> anyhow::Result<Vec<RawLog>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|l| {
                l.address == address
                    && l.topics.first() == Some(&topic0)
                    && l.block_number >= from_block
                    && l.block_number <= to_block
            })
            .cloned()
            .collect())
    }
}

struct MockVerifier {
    calls: AtomicUsize,
    failure: Option<&'static str>,
}

impl MockVerifier {
    fn succeeding() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failure: None,
        }
    }

    fn failing(message: &'static str) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failure: Some(message),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl VerifierClient for MockVerifier {
    async fn verify(
        &self,
        _address: Address,
        _contract: &str,
        _constructor_args: Bytes,
    ) -> Result<(), VerifyFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.failure {
            None => Ok(()),
            Some(message) => Err(VerifyFailure::new(message)),
        }
    }
}

fn params(force: bool, skip_verify: bool) -> DeployParams {
    let deployer = address!("52908400098527886E0F7030069857D2E4169EE7");
    DeployParams {
        deployer,
        governor: deployer,
        validator: deployer,
        fee_account: deployer,
        block_number: 0,
        timestamp: 0,
        genesis_root: B256::with_last_byte(0x11),
        commitment: B256::ZERO,
        sync_hash: EMPTY_STRING_KECCAK,
        force,
        skip_verify,
    }
}

fn load_log(dir: &TempDir) -> DeployLog {
    DeployLog::load(dir.path(), DEPLOY_ZKLINK_LOG_PREFIX, "test").expect("load log")
}

fn log_file_contents(dir: &TempDir) -> String {
    std::fs::read_to_string(dir.path().join("deploy_zklink_test.json")).expect("read log file")
}

#[tokio::test]
async fn fresh_run_deploys_everything_and_checkpoints() {
    init_test_tracing();
    let dir = TempDir::new("zklink-pipeline").expect("temp dir");
    let chain = MockChain::new();
    let verifier = MockVerifier::succeeding();
    let mut log = load_log(&dir);

    let outcome = DeployPipeline::new(params(false, false))
        .run(&mut log, &chain, &verifier, &zklink_deploy::default_benign)
        .await
        .expect("pipeline");

    assert_eq!(chain.deploy_count(), 4);
    assert_eq!(verifier.call_count(), 6);
    assert_eq!(outcome.bundle.zklink_proxy, ZKLINK_PROXY);
    assert_eq!(outcome.bundle.verifier_proxy, VERIFIER_PROXY);
    assert_eq!(outcome.bundle.gatekeeper, GATEKEEPER);

    // Four identifiers plus the factory receipt facts plus the proxies.
    for key in [
        keys::DEPLOYER,
        keys::GOVERNOR,
        keys::VERIFIER_TARGET,
        keys::PERIPHERY_TARGET,
        keys::ZKLINK_TARGET,
        keys::DEPLOY_FACTORY,
        keys::DEPLOY_FACTORY_BLOCK_NUMBER,
        keys::DEPLOY_FACTORY_BLOCK_HASH,
        keys::DEPLOY_FACTORY_TX_HASH,
        keys::ZKLINK_PROXY,
        keys::VERIFIER_PROXY,
        keys::GATEKEEPER,
    ] {
        assert!(log.has(key), "missing checkpoint key {key}");
    }
    for key in [
        keys::VERIFIER_TARGET_VERIFIED,
        keys::PERIPHERY_TARGET_VERIFIED,
        keys::ZKLINK_TARGET_VERIFIED,
        keys::ZKLINK_PROXY_VERIFIED,
        keys::VERIFIER_PROXY_VERIFIED,
        keys::GATEKEEPER_VERIFIED,
    ] {
        assert!(log.get_bool(key).unwrap(), "flag {key} should be true");
    }
}

#[tokio::test]
async fn second_run_is_a_no_op_with_identical_checkpoint() {
    init_test_tracing();
    let dir = TempDir::new("zklink-pipeline").expect("temp dir");
    let pipeline = DeployPipeline::new(params(false, false));

    let chain = MockChain::new();
    let verifier = MockVerifier::succeeding();
    let mut log = load_log(&dir);
    pipeline
        .run(&mut log, &chain, &verifier, &zklink_deploy::default_benign)
        .await
        .expect("first run");
    let after_first = log_file_contents(&dir);

    let chain2 = MockChain::new();
    let verifier2 = MockVerifier::succeeding();
    let mut log = load_log(&dir);
    let outcome = pipeline
        .run(&mut log, &chain2, &verifier2, &zklink_deploy::default_benign)
        .await
        .expect("second run");

    assert_eq!(chain2.deploy_count(), 0, "no stage may re-execute");
    assert_eq!(
        chain2.query_count(),
        0,
        "the bundle must come from the log, not an event query"
    );
    assert_eq!(verifier2.call_count(), 0, "no verification may re-execute");
    assert_eq!(log_file_contents(&dir), after_first);
    assert_eq!(outcome.bundle.zklink_proxy, ZKLINK_PROXY);
}

#[tokio::test]
async fn interrupted_run_resumes_from_first_incomplete_stage() {
    init_test_tracing();
    let dir = TempDir::new("zklink-pipeline").expect("temp dir");

    // Simulate a crash after the first two stages committed.
    {
        let mut log = load_log(&dir);
        log.set_and_persist(
            keys::VERIFIER_TARGET,
            MockChain::artifact_address("Verifier").to_string(),
        )
        .expect("persist");
        log.set_and_persist(keys::VERIFIER_TARGET_VERIFIED, true)
            .expect("persist");
        log.set_and_persist(
            keys::PERIPHERY_TARGET,
            MockChain::artifact_address("ZkLinkPeriphery").to_string(),
        )
        .expect("persist");
        log.set_and_persist(keys::PERIPHERY_TARGET_VERIFIED, true)
            .expect("persist");
    }

    let chain = MockChain::new();
    let verifier = MockVerifier::succeeding();
    let mut log = load_log(&dir);
    DeployPipeline::new(params(false, false))
        .run(&mut log, &chain, &verifier, &zklink_deploy::default_benign)
        .await
        .expect("resumed run");

    let deploys = chain.deploys.lock().unwrap().clone();
    assert_eq!(deploys, vec!["ZkLink", "DeployFactory"]);
    // Only the remaining four verifications run.
    assert_eq!(verifier.call_count(), 4);
}

#[tokio::test]
async fn force_redeploys_every_stage() {
    init_test_tracing();
    let dir = TempDir::new("zklink-pipeline").expect("temp dir");

    let chain = MockChain::new();
    let verifier = MockVerifier::succeeding();
    let mut log = load_log(&dir);
    DeployPipeline::new(params(false, false))
        .run(&mut log, &chain, &verifier, &zklink_deploy::default_benign)
        .await
        .expect("first run");

    let chain2 = MockChain::new();
    let verifier2 = MockVerifier::succeeding();
    let mut log = load_log(&dir);
    DeployPipeline::new(params(true, false))
        .run(&mut log, &chain2, &verifier2, &zklink_deploy::default_benign)
        .await
        .expect("forced run");

    assert_eq!(chain2.deploy_count(), 4, "every stage must re-execute");
    assert_eq!(verifier2.call_count(), 6, "every verification must re-execute");
}

#[tokio::test]
async fn verification_failures_never_abort_the_pipeline() {
    init_test_tracing();
    let dir = TempDir::new("zklink-pipeline").expect("temp dir");
    let chain = MockChain::new();
    let verifier = MockVerifier::failing("internal server error");
    let mut log = load_log(&dir);

    DeployPipeline::new(params(false, false))
        .run(&mut log, &chain, &verifier, &zklink_deploy::default_benign)
        .await
        .expect("pipeline must succeed despite verification failures");

    assert_eq!(chain.deploy_count(), 4, "all stages must still run");
    assert_eq!(verifier.call_count(), 6, "every verification was attempted");
    assert!(!log.has(keys::VERIFIER_TARGET_VERIFIED));
    assert!(!log.has(keys::GATEKEEPER_VERIFIED));
}

#[tokio::test]
async fn failed_verifications_are_retried_on_the_next_run() {
    init_test_tracing();
    let dir = TempDir::new("zklink-pipeline").expect("temp dir");
    let pipeline = DeployPipeline::new(params(false, false));

    let chain = MockChain::new();
    let verifier = MockVerifier::failing("rate limit reached");
    let mut log = load_log(&dir);
    pipeline
        .run(&mut log, &chain, &verifier, &zklink_deploy::default_benign)
        .await
        .expect("first run");

    // Flags were not committed, so verification (and only verification)
    // re-runs next time.
    let chain2 = MockChain::new();
    let verifier2 = MockVerifier::succeeding();
    let mut log = load_log(&dir);
    pipeline
        .run(&mut log, &chain2, &verifier2, &zklink_deploy::default_benign)
        .await
        .expect("second run");

    assert_eq!(chain2.deploy_count(), 0);
    assert_eq!(verifier2.call_count(), 6);
    assert!(log.get_bool(keys::ZKLINK_PROXY_VERIFIED).unwrap());
}

#[tokio::test]
async fn skip_verify_makes_no_verifier_calls() {
    init_test_tracing();
    let dir = TempDir::new("zklink-pipeline").expect("temp dir");
    let chain = MockChain::new();
    let verifier = MockVerifier::succeeding();
    let mut log = load_log(&dir);

    DeployPipeline::new(params(false, true))
        .run(&mut log, &chain, &verifier, &zklink_deploy::default_benign)
        .await
        .expect("pipeline");

    assert_eq!(chain.deploy_count(), 4);
    assert_eq!(verifier.call_count(), 0);
    assert!(!log.has(keys::VERIFIER_TARGET_VERIFIED));
}

#[tokio::test]
async fn deploy_failure_aborts_and_leaves_resumption_point() {
    init_test_tracing();
    let dir = TempDir::new("zklink-pipeline").expect("temp dir");

    /// Fails every deploy after the first two artifacts.
    struct FlakyChain {
        inner: MockChain,
    }

    impl ChainClient for FlakyChain {
        async fn deploy_contract(
            &self,
            artifact: &str,
            constructor_args: Bytes,
        ) -> anyhow::Result<DeployedContract> {
            if self.inner.deploy_count() >= 2 {
                anyhow::bail!("rpc connection lost")
            }
            self.inner.deploy_contract(artifact, constructor_args).await
        }

        async fn query_events(
            &self,
            address: Address,
            topic0: B256,
            from_block: u64,
            to_block: u64,
        ) -> anyhow::Result<Vec<RawLog>> {
            self.inner
                .query_events(address, topic0, from_block, to_block)
                .await
        }
    }

    let chain = FlakyChain {
        inner: MockChain::new(),
    };
    let verifier = MockVerifier::succeeding();
    let mut log = load_log(&dir);

    let err = DeployPipeline::new(params(false, false))
        .run(&mut log, &chain, &verifier, &zklink_deploy::default_benign)
        .await
        .unwrap_err();
    assert!(
        matches!(err, zklink_deploy::DeployError::Action { ref stage, .. } if stage == "zklink"),
        "got {err:?}"
    );

    // The two committed stages survive; the failed one left nothing.
    assert!(log.has(keys::VERIFIER_TARGET));
    assert!(log.has(keys::PERIPHERY_TARGET));
    assert!(!log.has(keys::ZKLINK_TARGET));

    // Re-invocation with a healthy client picks up at the failed stage.
    let chain2 = MockChain::new();
    let verifier2 = MockVerifier::succeeding();
    let mut log = load_log(&dir);
    DeployPipeline::new(params(false, false))
        .run(&mut log, &chain2, &verifier2, &zklink_deploy::default_benign)
        .await
        .expect("resumed run");
    let deploys = chain2.deploys.lock().unwrap().clone();
    assert_eq!(deploys, vec!["ZkLink", "DeployFactory"]);
}
