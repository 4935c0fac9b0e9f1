//! The durable deploy log.
//!
//! A flat key/value JSON file recording every fact the pipeline produces
//! (addresses, the factory's confirmation block, verified flags). It is the
//! single source of truth for "what has already happened": every commit is
//! flushed to disk immediately, so a crash mid-pipeline loses at most the
//! in-flight stage. Keys are never removed by the pipeline; a force
//! redeploy overwrites them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use alloy_core::primitives::{Address, B256};
use serde_json::Value;

use crate::error::DeployError;

/// Prefix of the deploy log file name; the network name is appended.
pub const DEPLOY_ZKLINK_LOG_PREFIX: &str = "deploy_zklink";

pub mod keys {
    //! Checkpoint key names, one per persisted fact.

    pub const DEPLOYER: &str = "deployer";
    pub const GOVERNOR: &str = "governor";

    pub const VERIFIER_TARGET: &str = "verifier_target";
    pub const VERIFIER_TARGET_VERIFIED: &str = "verifier_target_verified";
    pub const PERIPHERY_TARGET: &str = "periphery_target";
    pub const PERIPHERY_TARGET_VERIFIED: &str = "periphery_target_verified";
    pub const ZKLINK_TARGET: &str = "zklink_target";
    pub const ZKLINK_TARGET_VERIFIED: &str = "zklink_target_verified";

    pub const DEPLOY_FACTORY: &str = "deploy_factory";
    pub const DEPLOY_FACTORY_BLOCK_NUMBER: &str = "deploy_factory_block_number";
    pub const DEPLOY_FACTORY_BLOCK_HASH: &str = "deploy_factory_block_hash";
    pub const DEPLOY_FACTORY_TX_HASH: &str = "deploy_factory_tx_hash";

    pub const ZKLINK_PROXY: &str = "zklink_proxy";
    pub const ZKLINK_PROXY_VERIFIED: &str = "zklink_proxy_verified";
    pub const VERIFIER_PROXY: &str = "verifier_proxy";
    pub const VERIFIER_PROXY_VERIFIED: &str = "verifier_proxy_verified";
    pub const GATEKEEPER: &str = "gatekeeper";
    pub const GATEKEEPER_VERIFIED: &str = "gatekeeper_verified";
}

/// In-memory view of the deploy log, tagged with the path it persists to.
#[derive(Debug, Clone)]
pub struct DeployLog {
    path: PathBuf,
    entries: BTreeMap<String, Value>,
}

impl DeployLog {
    /// Load the deploy log for `net` from `dir`, or start an empty one if
    /// no file exists yet.
    ///
    /// The file name is `{log_name}_{net}.json`, so each network keeps its
    /// own resumption point.
    pub fn load(dir: &Path, log_name: &str, net: &str) -> Result<Self, DeployError> {
        let path = dir.join(format!("{log_name}_{net}.json"));

        if !path.exists() {
            tracing::info!(path = %path.display(), "No existing deploy log, starting fresh");
            return Ok(Self {
                path,
                entries: BTreeMap::new(),
            });
        }

        let content = std::fs::read_to_string(&path).map_err(|source| DeployError::StoreIo {
            path: path.clone(),
            source,
        })?;
        let entries: BTreeMap<String, Value> =
            serde_json::from_str(&content).map_err(|source| DeployError::CorruptStore {
                path: path.clone(),
                source,
            })?;

        tracing::info!(path = %path.display(), entries = entries.len(), "Loaded existing deploy log");
        Ok(Self { path, entries })
    }

    /// The path this log persists to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get_str(&self, key: &str) -> Result<&str, DeployError> {
        match self.entries.get(key) {
            None => Err(DeployError::MissingKey(key.to_string())),
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(DeployError::MalformedKey {
                key: key.to_string(),
                reason: format!("expected a string, got {other}"),
            }),
        }
    }

    pub fn get_u64(&self, key: &str) -> Result<u64, DeployError> {
        match self.entries.get(key) {
            None => Err(DeployError::MissingKey(key.to_string())),
            Some(value) => value.as_u64().ok_or_else(|| DeployError::MalformedKey {
                key: key.to_string(),
                reason: format!("expected an unsigned integer, got {value}"),
            }),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, DeployError> {
        match self.entries.get(key) {
            None => Err(DeployError::MissingKey(key.to_string())),
            Some(value) => value.as_bool().ok_or_else(|| DeployError::MalformedKey {
                key: key.to_string(),
                reason: format!("expected a boolean, got {value}"),
            }),
        }
    }

    /// Get a previously committed address.
    pub fn get_address(&self, key: &str) -> Result<Address, DeployError> {
        let s = self.get_str(key)?;
        Address::from_str(s).map_err(|e| DeployError::MalformedKey {
            key: key.to_string(),
            reason: format!("expected an address, got `{s}`: {e}"),
        })
    }

    /// Get a previously committed 32-byte hash.
    pub fn get_b256(&self, key: &str) -> Result<B256, DeployError> {
        let s = self.get_str(key)?;
        B256::from_str(s).map_err(|e| DeployError::MalformedKey {
            key: key.to_string(),
            reason: format!("expected a 32-byte hash, got `{s}`: {e}"),
        })
    }

    /// Set one key and rewrite the file.
    pub fn set_and_persist(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), DeployError> {
        self.entries.insert(key.into(), value.into());
        self.persist()
    }

    /// Set several keys and rewrite the file once.
    ///
    /// Used where related facts must land together, e.g. the factory
    /// address and the block number needed to find its event later.
    pub fn set_many_and_persist(
        &mut self,
        entries: impl IntoIterator<Item = (String, Value)>,
    ) -> Result<(), DeployError> {
        self.entries.extend(entries);
        self.persist()
    }

    /// Rewrite the whole file: serialize to a temp file in the same
    /// directory, then rename over the old contents so a crash during the
    /// write never leaves a truncated log behind.
    fn persist(&self) -> Result<(), DeployError> {
        let io_err = |source| DeployError::StoreIo {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let json = serde_json::to_string_pretty(&self.entries).map_err(|source| {
            DeployError::CorruptStore {
                path: self.path.clone(),
                source,
            }
        })?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, &self.path).map_err(io_err)?;

        tracing::debug!(path = %self.path.display(), entries = self.entries.len(), "Deploy log persisted");
        Ok(())
    }
}
