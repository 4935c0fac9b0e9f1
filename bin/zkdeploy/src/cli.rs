use std::path::PathBuf;

use alloy_core::primitives::{Address, B256};
use clap::Parser;
use tracing::level_filters::LevelFilter;
use url::Url;
use zklink_deploy::EMPTY_STRING_KECCAK;

#[derive(Parser)]
#[command(name = "zkdeploy")]
#[command(
    author,
    version,
    about = "Deploy the zkLink contracts, resumably and idempotently"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "ZKDEPLOY_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// JSON-RPC endpoint of the target chain. The node must manage the
    /// deployer account (dev node or unlocked signer).
    #[arg(long, alias = "rpc", env = "ZKDEPLOY_RPC_URL")]
    pub rpc_url: Url,

    /// Network name. Each network keeps its own deploy log, so partially
    /// completed deployments resume per network.
    #[arg(long, env = "ZKDEPLOY_NET", default_value = "devnet")]
    pub net: String,

    /// The account deploy transactions are sent from.
    #[arg(long, env = "ZKDEPLOY_DEPLOYER")]
    pub deployer: Address,

    /// Directory holding the compiled contract artifacts.
    #[arg(long, env = "ZKDEPLOY_ARTIFACTS", default_value = "artifacts")]
    pub artifacts: PathBuf,

    /// Directory the deploy log is written to.
    #[arg(long, env = "ZKDEPLOY_LOG_DIR", default_value = "deploy_log")]
    pub log_dir: PathBuf,

    /// The governor address (defaults to the deployer).
    #[arg(long, env = "ZKDEPLOY_GOVERNOR")]
    pub governor: Option<Address>,

    /// The validator address (defaults to the deployer).
    #[arg(long, env = "ZKDEPLOY_VALIDATOR")]
    pub validator: Option<Address>,

    /// The fee account address (defaults to the deployer).
    #[arg(long, env = "ZKDEPLOY_FEE_ACCOUNT")]
    pub fee_account: Option<Address>,

    /// The genesis block number.
    #[arg(long, env = "ZKDEPLOY_BLOCK_NUMBER", default_value_t = 0)]
    pub block_number: u32,

    /// The genesis block timestamp.
    #[arg(long, env = "ZKDEPLOY_TIMESTAMP", default_value_t = 0)]
    pub timestamp: u64,

    /// The genesis block root hash.
    #[arg(long, env = "ZKDEPLOY_GENESIS_ROOT")]
    pub genesis_root: B256,

    /// The genesis block commitment.
    #[arg(long, env = "ZKDEPLOY_COMMITMENT", default_value_t = B256::ZERO)]
    pub commitment: B256,

    /// The genesis block sync hash.
    #[arg(long, env = "ZKDEPLOY_SYNC_HASH", default_value_t = EMPTY_STRING_KECCAK)]
    pub sync_hash: B256,

    /// Redeploy all contracts, overwriting existing checkpoints.
    #[arg(long, env = "ZKDEPLOY_FORCE", default_value_t = false)]
    pub force: bool,

    /// Skip source verification entirely.
    #[arg(long, env = "ZKDEPLOY_SKIP_VERIFY", default_value_t = false)]
    pub skip_verify: bool,

    /// Etherscan-compatible verification API endpoint.
    ///
    /// When omitted and verification is not skipped, verification is
    /// downgraded to a skip with a warning.
    #[arg(long, env = "ZKDEPLOY_VERIFY_URL")]
    pub verify_url: Option<Url>,

    /// API key for the verification endpoint.
    #[arg(long, env = "ZKDEPLOY_VERIFY_API_KEY", default_value = "")]
    pub verify_api_key: String,
}
