//! Etherscan-style source verification client.
//!
//! Submits a `verifysourcecode` form to the configured API endpoint. The
//! service frequently answers with errors that are semantically successes
//! ("already verified") or transient ("rate limit"); [`default_benign`]
//! classifies those, and the pipeline swallows everything else too.

use std::time::Duration;

use alloy_core::primitives::{Address, Bytes};
use serde::Deserialize;
use url::Url;

use crate::client::VerifierClient;
use crate::error::VerifyFailure;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Etherscan-shaped API response: status "1" means accepted.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    result: String,
}

/// The stock classifier for verification failure messages.
///
/// "Already verified" is a success in disguise; rate limiting resolves
/// itself on the next invocation. Anything else is unclassified and gets
/// logged more loudly, but still never blocks deployment.
pub fn default_benign(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("already verified") || message.contains("rate limit")
}

/// Verification client for an Etherscan-compatible API.
#[derive(Debug, Clone)]
pub struct EtherscanVerifier {
    client: reqwest::Client,
    api_url: Url,
    api_key: String,
}

impl EtherscanVerifier {
    pub fn new(api_url: Url, api_key: String) -> Result<Self, VerifyFailure> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| VerifyFailure::new(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_url,
            api_key,
        })
    }
}

impl VerifierClient for EtherscanVerifier {
    async fn verify(
        &self,
        address: Address,
        contract: &str,
        constructor_args: Bytes,
    ) -> Result<(), VerifyFailure> {
        let form = [
            ("module", "contract".to_string()),
            ("action", "verifysourcecode".to_string()),
            ("apikey", self.api_key.clone()),
            ("contractaddress", address.to_string()),
            ("contractname", contract.to_string()),
            // Constructor args go over the wire without the 0x prefix.
            ("constructorArguements", hex::encode(&constructor_args)),
        ];

        let response = self
            .client
            .post(self.api_url.clone())
            .form(&form)
            .send()
            .await
            .map_err(|e| VerifyFailure::new(format!("request failed: {e}")))?;

        let api: ApiResponse = response
            .json()
            .await
            .map_err(|e| VerifyFailure::new(format!("malformed response: {e}")))?;

        if api.status == "1" {
            Ok(())
        } else {
            Err(VerifyFailure::new(api.result))
        }
    }
}
