//! Client traits the pipeline is written against.
//!
//! The pipeline never talks to a node or a verification service directly;
//! it drives these two capability traits. [`crate::rpc::RpcChainClient`]
//! and [`crate::etherscan::EtherscanVerifier`] are the production
//! implementations, tests substitute in-memory mocks.

use std::future::Future;

use alloy_core::primitives::{Address, B256, Bytes};
use anyhow::Result;

use crate::error::VerifyFailure;

/// A confirmed contract deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployedContract {
    /// The address assigned by the chain.
    pub address: Address,
    /// Block the deploy transaction was included in.
    pub block_number: u64,
    /// Hash of that block.
    pub block_hash: B256,
    /// Transaction hash of the deploy.
    pub tx_hash: B256,
}

/// An undecoded event log entry.
#[derive(Debug, Clone)]
pub struct RawLog {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: u64,
}

/// Capability to deploy contracts and read back their event logs.
pub trait ChainClient: Send + Sync {
    /// Deploy `artifact` with ABI-encoded constructor args and block until
    /// the transaction is confirmed.
    fn deploy_contract(
        &self,
        artifact: &str,
        constructor_args: Bytes,
    ) -> impl Future<Output = Result<DeployedContract>> + Send;

    /// Fetch logs emitted by `address` with the given first topic, within
    /// an inclusive block range.
    fn query_events(
        &self,
        address: Address,
        topic0: B256,
        from_block: u64,
        to_block: u64,
    ) -> impl Future<Output = Result<Vec<RawLog>>> + Send;
}

/// Capability to submit source-verification requests.
pub trait VerifierClient: Send + Sync {
    /// Ask the service to verify the contract at `address`.
    ///
    /// Failures carry the service's message so the caller can classify
    /// them; they are never fatal to the pipeline.
    fn verify(
        &self,
        address: Address,
        contract: &str,
        constructor_args: Bytes,
    ) -> impl Future<Output = Result<(), VerifyFailure>> + Send;
}
