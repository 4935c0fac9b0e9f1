//! The per-stage skip/deploy/commit policy.
//!
//! Every deployment stage follows the same shape: if the output key is
//! already in the deploy log (and `force` is off), return the recorded
//! address without touching the chain; otherwise run the deploy action,
//! then commit the address durably before anything else happens. A failed
//! action commits nothing, so a restarted run retries that stage from
//! scratch.

use std::future::Future;

use alloy_core::primitives::Address;
use serde_json::Value;

use crate::client::DeployedContract;
use crate::error::DeployError;
use crate::log::DeployLog;

/// Extra checkpoint keys for a stage whose confirmation metadata must be
/// persisted alongside the address (the factory stage needs its block
/// number to find the `Addresses` event on a resumed run).
#[derive(Debug, Clone, Copy)]
pub struct ReceiptKeys {
    pub block_number: &'static str,
    pub block_hash: &'static str,
    pub tx_hash: &'static str,
}

/// Descriptor for one deployment stage.
#[derive(Debug, Clone, Copy)]
pub struct Stage {
    /// Stage name, used in logs and error context.
    pub name: &'static str,
    /// Deploy log key the produced address is committed under.
    pub address_key: &'static str,
    /// Receipt keys to commit in the same write, if any.
    pub receipt_keys: Option<ReceiptKeys>,
}

impl Stage {
    pub const fn new(name: &'static str, address_key: &'static str) -> Self {
        Self {
            name,
            address_key,
            receipt_keys: None,
        }
    }

    pub const fn with_receipt_keys(mut self, receipt_keys: ReceiptKeys) -> Self {
        self.receipt_keys = Some(receipt_keys);
        self
    }

    /// Run the stage: skip if already committed (unless `force`), otherwise
    /// execute `deploy` and commit its result.
    pub async fn run<F, Fut>(
        &self,
        log: &mut DeployLog,
        force: bool,
        deploy: F,
    ) -> Result<Address, DeployError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<DeployedContract>>,
    {
        if !force && log.has(self.address_key) {
            let address = log.get_address(self.address_key)?;
            tracing::info!(stage = self.name, %address, "Already deployed, skipping");
            return Ok(address);
        }

        tracing::info!(stage = self.name, "Deploying...");
        let deployed = deploy().await.map_err(|cause| DeployError::Action {
            stage: self.name.to_string(),
            cause,
        })?;

        let mut entries = vec![(
            self.address_key.to_string(),
            Value::from(deployed.address.to_string()),
        )];
        if let Some(keys) = self.receipt_keys {
            entries.push((keys.block_number.to_string(), Value::from(deployed.block_number)));
            entries.push((
                keys.block_hash.to_string(),
                Value::from(deployed.block_hash.to_string()),
            ));
            entries.push((
                keys.tx_hash.to_string(),
                Value::from(deployed.tx_hash.to_string()),
            ));
        }
        log.set_many_and_persist(entries)?;

        tracing::info!(
            stage = self.name,
            address = %deployed.address,
            block = deployed.block_number,
            "Deployed and committed"
        );
        Ok(deployed.address)
    }
}
