//! JSON-RPC backed chain client.
//!
//! Talks to a node that manages the deployer account itself (a dev node or
//! an unlocked signer): deploys go out as `eth_sendTransaction` and
//! confirmation is a receipt-polling loop. Creation bytecode is read from
//! compiled artifact JSON files produced by the upstream contract build.

use std::path::PathBuf;
use std::time::Duration;

use alloy_core::primitives::{Address, B256, Bytes};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::client::{ChainClient, DeployedContract, RawLog};

/// Per-request timeout. Confirmation waits are unbounded by design; only
/// the individual HTTP round trips are capped.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval between receipt polling attempts.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Deserialize a u64 from a hex quantity string (with 0x prefix).
fn deserialize_u64_from_hex<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: String = Deserialize::deserialize(deserializer)?;
    u64::from_str_radix(s.trim_start_matches("0x"), 16).map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TxReceipt {
    contract_address: Option<Address>,
    #[serde(deserialize_with = "deserialize_u64_from_hex")]
    block_number: u64,
    block_hash: B256,
    transaction_hash: B256,
    #[serde(deserialize_with = "deserialize_u64_from_hex")]
    status: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogEntry {
    address: Address,
    topics: Vec<B256>,
    data: Bytes,
    #[serde(deserialize_with = "deserialize_u64_from_hex")]
    block_number: u64,
}

/// Compiled contract artifact, hardhat shape. Only the creation bytecode
/// is consumed here.
#[derive(Debug, Deserialize)]
struct Artifact {
    bytecode: Bytes,
}

/// Make a JSON-RPC call and deserialize the result.
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &Url,
    method: &str,
    params: Vec<Value>,
) -> Result<T> {
    let response = client
        .post(url.clone())
        .json(&serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        }))
        .send()
        .await
        .with_context(|| format!("Failed to send {} request", method))?;

    let result: Value = response
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", method))?;

    if let Some(error) = result.get("error") {
        anyhow::bail!(
            "RPC error from {}: {}",
            method,
            error
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown")
        );
    }

    let result_value = result
        .get("result")
        .context("No result in response")?
        .clone();

    serde_json::from_value(result_value)
        .with_context(|| format!("Failed to deserialize {} result", method))
}

/// Chain client over plain Ethereum JSON-RPC.
#[derive(Debug, Clone)]
pub struct RpcChainClient {
    client: reqwest::Client,
    url: Url,
    deployer: Address,
    artifacts_dir: PathBuf,
}

impl RpcChainClient {
    pub fn new(url: Url, deployer: Address, artifacts_dir: PathBuf) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            client,
            url,
            deployer,
            artifacts_dir,
        })
    }

    /// Read the creation bytecode for `artifact` from
    /// `{artifacts_dir}/{artifact}.json`.
    fn load_bytecode(&self, artifact: &str) -> Result<Bytes> {
        let path = self.artifacts_dir.join(format!("{artifact}.json"));
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read artifact {}", path.display()))?;
        let artifact: Artifact = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse artifact {}", path.display()))?;
        Ok(artifact.bytecode)
    }

    /// Poll for the transaction receipt until the node has one. No overall
    /// timeout; the caller cancels from outside if needed.
    async fn wait_for_receipt(&self, tx_hash: B256) -> Result<TxReceipt> {
        loop {
            let receipt: Option<TxReceipt> = json_rpc_call(
                &self.client,
                &self.url,
                "eth_getTransactionReceipt",
                vec![Value::from(tx_hash.to_string())],
            )
            .await?;

            match receipt {
                Some(receipt) => return Ok(receipt),
                None => {
                    tracing::trace!(%tx_hash, "No receipt yet, retrying...");
                    tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
                }
            }
        }
    }
}

impl ChainClient for RpcChainClient {
    async fn deploy_contract(
        &self,
        artifact: &str,
        constructor_args: Bytes,
    ) -> Result<DeployedContract> {
        let bytecode = self.load_bytecode(artifact)?;
        let mut data = bytecode.to_vec();
        data.extend_from_slice(&constructor_args);

        let tx_hash: B256 = json_rpc_call(
            &self.client,
            &self.url,
            "eth_sendTransaction",
            vec![serde_json::json!({
                "from": self.deployer,
                "data": format!("0x{}", hex::encode(&data)),
            })],
        )
        .await
        .with_context(|| format!("Failed to submit deploy transaction for {artifact}"))?;

        tracing::debug!(%tx_hash, artifact, "Deploy transaction submitted, waiting for confirmation...");
        let receipt = self.wait_for_receipt(tx_hash).await?;

        if receipt.status == 0 {
            anyhow::bail!("Deploy transaction for {artifact} reverted: {tx_hash}");
        }
        let address = receipt
            .contract_address
            .with_context(|| format!("Receipt for {artifact} has no contract address"))?;

        Ok(DeployedContract {
            address,
            block_number: receipt.block_number,
            block_hash: receipt.block_hash,
            tx_hash: receipt.transaction_hash,
        })
    }

    async fn query_events(
        &self,
        address: Address,
        topic0: B256,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<RawLog>> {
        let entries: Vec<LogEntry> = json_rpc_call(
            &self.client,
            &self.url,
            "eth_getLogs",
            vec![serde_json::json!({
                "address": address,
                "topics": [topic0],
                "fromBlock": format!("{:#x}", from_block),
                "toBlock": format!("{:#x}", to_block),
            })],
        )
        .await
        .context("Failed to query event logs")?;

        Ok(entries
            .into_iter()
            .map(|e| RawLog {
                address: e.address,
                topics: e.topics,
                data: e.data,
                block_number: e.block_number,
            })
            .collect())
    }
}
