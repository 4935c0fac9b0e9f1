//! Address recovery for the aggregating factory deploy.
//!
//! The DeployFactory constructor instantiates the proxies and the upgrade
//! gatekeeper, then emits a single `Addresses` event listing them. The
//! factory's own receipt is gone after a process restart, so the pipeline
//! persists the confirmation block number and recovers the addresses here
//! by querying exactly that block.

use alloy_core::primitives::Address;
use alloy_core::sol;
use alloy_core::sol_types::SolEvent;

use crate::client::ChainClient;
use crate::error::DeployError;

sol! {
    /// Emitted once, from the DeployFactory constructor.
    event Addresses(address zkLink, address verifier, address gatekeeper);
}

/// The identifiers created as side effects of the factory deploy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressBundle {
    pub zklink_proxy: Address,
    pub verifier_proxy: Address,
    pub gatekeeper: Address,
}

/// Recover the bundle from the `Addresses` event the factory emitted at
/// `block`. The factory emits it exactly once, so a single-block query
/// with zero matches means the persisted block is wrong or the node has
/// pruned its logs.
pub async fn recover_addresses<C: ChainClient>(
    client: &C,
    factory: Address,
    block: u64,
) -> Result<AddressBundle, DeployError> {
    tracing::info!(%factory, block, "Querying factory Addresses event...");

    let logs = client
        .query_events(factory, Addresses::SIGNATURE_HASH, block, block)
        .await
        .map_err(|cause| DeployError::Action {
            stage: "recover_addresses".to_string(),
            cause,
        })?;

    let Some(raw) = logs.first() else {
        return Err(DeployError::AddressRecovery { factory, block });
    };

    let event = Addresses::decode_raw_log(raw.topics.iter().copied(), &raw.data, true)
        .map_err(|e| DeployError::Action {
            stage: "recover_addresses".to_string(),
            cause: anyhow::anyhow!("failed to decode Addresses event: {e}"),
        })?;

    Ok(AddressBundle {
        zklink_proxy: event.zkLink,
        verifier_proxy: event.verifier,
        gatekeeper: event.gatekeeper,
    })
}
