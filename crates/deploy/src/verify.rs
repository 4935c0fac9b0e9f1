//! Best-effort source verification, one step per deployed artifact.
//!
//! Verification is an external, often-already-done operation. An artifact's
//! on-chain correctness never depends on it, so a failed attempt is logged
//! and swallowed; only a success commits the verified flag. Re-submitting
//! for an already-verified address is the common benign case, and the
//! caller-supplied classifier decides which failure messages fall into that
//! bucket.

use alloy_core::primitives::{Address, Bytes};

use crate::client::VerifierClient;
use crate::error::DeployError;
use crate::log::DeployLog;

/// One verification attempt for a deployed artifact.
#[derive(Debug, Clone)]
pub struct VerifyStep {
    /// Deploy log key for the verified flag.
    pub verified_key: &'static str,
    /// Contract name submitted to the verification service.
    pub contract: &'static str,
    /// Address of the deployed artifact.
    pub address: Address,
    /// ABI-encoded constructor arguments.
    pub constructor_args: Bytes,
}

impl VerifyStep {
    /// Attempt verification and commit the flag on success.
    ///
    /// No-op when `skip` is set or the flag is already committed (unless
    /// forced). Never returns a verification failure: the only error path
    /// out of here is a deploy log write failure.
    pub async fn run<V, C>(
        &self,
        log: &mut DeployLog,
        force: bool,
        skip: bool,
        client: &V,
        classify_benign: C,
    ) -> Result<(), DeployError>
    where
        V: VerifierClient,
        C: Fn(&str) -> bool,
    {
        if skip {
            return Ok(());
        }
        if !force && log.has(self.verified_key) {
            tracing::info!(contract = self.contract, address = %self.address, "Already verified, skipping");
            return Ok(());
        }

        tracing::info!(contract = self.contract, address = %self.address, "Verifying...");
        match client
            .verify(self.address, self.contract, self.constructor_args.clone())
            .await
        {
            Ok(()) => {
                log.set_and_persist(self.verified_key, true)?;
                tracing::info!(contract = self.contract, address = %self.address, "Verified");
            }
            Err(failure) if classify_benign(&failure.message) => {
                tracing::warn!(
                    contract = self.contract,
                    address = %self.address,
                    message = %failure.message,
                    "Verification failed benignly, continuing"
                );
            }
            Err(failure) => {
                tracing::error!(
                    contract = self.contract,
                    address = %self.address,
                    message = %failure.message,
                    "Verification failed, continuing without the verified flag"
                );
            }
        }
        Ok(())
    }
}
