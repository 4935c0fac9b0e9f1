//! zklink-deploy - checkpointed, resumable deployment of the zkLink
//! contract suite.
//!
//! Every stage consults the on-disk deploy log before acting and commits
//! its result immediately after, so a run interrupted anywhere can simply
//! be re-invoked: completed stages are skipped, the first incomplete one
//! resumes. Source verification rides along as a best-effort step that
//! never blocks deployment.

mod client;
mod error;
mod etherscan;
mod log;
mod pipeline;
mod recover;
mod rpc;
mod stage;
mod verify;

pub use client::{ChainClient, DeployedContract, RawLog, VerifierClient};
pub use error::{DeployError, VerifyFailure};
pub use etherscan::{EtherscanVerifier, default_benign};
pub use log::{DEPLOY_ZKLINK_LOG_PREFIX, DeployLog, keys};
pub use pipeline::{DeployOutcome, DeployParams, DeployPipeline, EMPTY_STRING_KECCAK};
pub use recover::{AddressBundle, recover_addresses};
pub use rpc::{RpcChainClient, json_rpc_call};
pub use stage::{ReceiptKeys, Stage};
pub use verify::VerifyStep;
