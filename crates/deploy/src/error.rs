//! Error taxonomy for the deployment pipeline.
//!
//! Everything on the deployment path is fatal for the current run and maps
//! to a [`DeployError`] variant; re-invoking the pipeline resumes past the
//! stages that already committed. Verification failures are deliberately a
//! separate type ([`VerifyFailure`]) because they are never fatal.

use std::path::PathBuf;

use alloy_core::primitives::Address;
use thiserror::Error;

/// Fatal errors on the deployment path.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The deploy log file exists but is not valid JSON.
    #[error("deploy log at {path} is corrupt: {source}")]
    CorruptStore {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The deploy log file could not be read or written.
    #[error("deploy log io error at {path}: {source}")]
    StoreIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stage consumed a key that no prior stage committed.
    ///
    /// This is a stage-ordering bug, not a recoverable condition.
    #[error("deploy log key `{0}` is missing")]
    MissingKey(String),

    /// A key is present in the log but holds a value of the wrong shape.
    #[error("deploy log key `{key}` is malformed: {reason}")]
    MalformedKey { key: String, reason: String },

    /// A remote deployment action failed (RPC error, revert, timeout).
    ///
    /// Nothing was committed for the stage, so a re-invocation retries it
    /// from scratch.
    #[error("deploy stage `{stage}` failed: {cause:#}")]
    Action {
        stage: String,
        cause: anyhow::Error,
    },

    /// The aggregating deploy's event lookup found no `Addresses` event at
    /// the recorded block. Requires operator investigation (wrong block
    /// persisted, or the node pruned its logs).
    #[error("no Addresses event emitted by factory {factory} at block {block}")]
    AddressRecovery { factory: Address, block: u64 },
}

/// A failed source-verification attempt.
///
/// Carries the raw failure message from the verification service so the
/// caller-supplied classifier can decide whether it is benign (e.g. the
/// contract is already verified). Swallowed by the pipeline either way.
#[derive(Debug, Clone)]
pub struct VerifyFailure {
    pub message: String,
}

impl VerifyFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for VerifyFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "verification failed: {}", self.message)
    }
}

impl std::error::Error for VerifyFailure {}
