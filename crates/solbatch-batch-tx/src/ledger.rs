/*!
# Ledger Client

The network seam of the engine. Everything the batch pipeline needs from the
cluster goes through [`LedgerClient`], so the pipeline can run against
[`RpcLedger`] in production and an in-memory ledger in tests.
*/

use crate::{
    config::TxBatchConfig,
    error::{TxBatchError, TxBatchResult},
};
use async_trait::async_trait;
use backoff::future::retry;
use solana_client::{
    client_error::ClientError, nonblocking::rpc_client::RpcClient,
    rpc_config::RpcSendTransactionConfig,
};
use solana_sdk::{
    account::Account,
    commitment_config::{CommitmentConfig, CommitmentLevel},
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::{Transaction, TransactionError},
};
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

/// A recent blockhash together with the last block height it is valid for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockReference {
    pub blockhash: Hash,
    pub last_valid_block_height: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    pub skip_preflight: bool,
    pub preflight_commitment: CommitmentLevel,
}

impl From<&TxBatchConfig> for SendOptions {
    fn from(config: &TxBatchConfig) -> Self {
        Self {
            skip_preflight: config.skip_preflight,
            preflight_commitment: config.preflight_commitment,
        }
    }
}

#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn latest_block_reference(
        &self,
        commitment: CommitmentConfig,
    ) -> TxBatchResult<BlockReference>;

    async fn send_transaction(
        &self,
        transaction: &Transaction,
        options: SendOptions,
    ) -> TxBatchResult<Signature>;

    /// Wait until `signature` reaches `commitment`, returning the on-chain
    /// error if the transaction landed but failed.
    async fn confirm_transaction(
        &self,
        signature: &Signature,
        reference: &BlockReference,
        commitment: CommitmentConfig,
    ) -> TxBatchResult<Option<TransactionError>>;

    async fn get_account(&self, address: &Pubkey) -> TxBatchResult<Option<Account>>;
}

/// [`LedgerClient`] over the nonblocking Solana JSON-RPC client
pub struct RpcLedger {
    rpc_client: Arc<RpcClient>,
    poll_interval: Duration,
    send_backoff: backoff::ExponentialBackoff,
}

impl RpcLedger {
    pub fn new(rpc_client: Arc<RpcClient>) -> Self {
        Self::with_config(rpc_client, &TxBatchConfig::default())
    }

    pub fn with_config(rpc_client: Arc<RpcClient>, config: &TxBatchConfig) -> Self {
        Self {
            rpc_client,
            poll_interval: config.confirmation_poll_interval,
            send_backoff: config.send_retry_backoff.clone(),
        }
    }

    pub fn rpc_client(&self) -> &Arc<RpcClient> {
        &self.rpc_client
    }
}

#[async_trait]
impl LedgerClient for RpcLedger {
    async fn latest_block_reference(
        &self,
        commitment: CommitmentConfig,
    ) -> TxBatchResult<BlockReference> {
        let (blockhash, last_valid_block_height) = self
            .rpc_client
            .get_latest_blockhash_with_commitment(commitment)
            .await?;
        Ok(BlockReference {
            blockhash,
            last_valid_block_height,
        })
    }

    async fn send_transaction(
        &self,
        transaction: &Transaction,
        options: SendOptions,
    ) -> TxBatchResult<Signature> {
        let rpc_client = self.rpc_client.clone();

        // The same signed bytes are re-sent; a retry never re-signs
        retry(self.send_backoff.clone(), || {
            let rpc_client = rpc_client.clone();
            let send_config = RpcSendTransactionConfig {
                skip_preflight: options.skip_preflight,
                preflight_commitment: Some(options.preflight_commitment),
                ..Default::default()
            };

            async move {
                match rpc_client
                    .send_transaction_with_config(transaction, send_config)
                    .await
                {
                    Ok(signature) => Ok(signature),
                    Err(e) if is_transient(&e) => {
                        warn!("Transient send failure, retrying: {}", e);
                        Err(backoff::Error::Transient {
                            err: TxBatchError::RpcClient(e),
                            retry_after: None,
                        })
                    }
                    Err(e) => Err(backoff::Error::Permanent(TxBatchError::SendFailed(
                        e.to_string(),
                    ))),
                }
            }
        })
        .await
        .map_err(|e| match e {
            TxBatchError::RpcClient(rpc_err) => TxBatchError::SendFailed(rpc_err.to_string()),
            other => other,
        })
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        reference: &BlockReference,
        commitment: CommitmentConfig,
    ) -> TxBatchResult<Option<TransactionError>> {
        loop {
            let statuses = self
                .rpc_client
                .get_signature_statuses(&[*signature])
                .await?
                .value;

            if let Some(Some(status)) = statuses.into_iter().next() {
                if status.err.is_some() {
                    return Ok(status.err);
                }
                if status.satisfies_commitment(commitment) {
                    return Ok(None);
                }
            }

            let block_height = self
                .rpc_client
                .get_block_height_with_commitment(commitment)
                .await?;
            if block_height > reference.last_valid_block_height {
                return Err(TxBatchError::BlockReferenceExpired(*signature));
            }

            debug!(
                "Waiting for {} (block height {} / valid until {})",
                signature, block_height, reference.last_valid_block_height
            );
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn get_account(&self, address: &Pubkey) -> TxBatchResult<Option<Account>> {
        let response = self
            .rpc_client
            .get_account_with_commitment(address, self.rpc_client.commitment())
            .await?;
        Ok(response.value)
    }
}

/// Transport-level failures worth re-sending the same bytes for
fn is_transient(error: &ClientError) -> bool {
    let message = error.to_string().to_lowercase();
    ["timed out", "timeout", "429", "too many requests", "connection"]
        .iter()
        .any(|needle| message.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_client::client_error::ClientErrorKind;
    use std::io;

    #[test]
    fn test_transient_classification() {
        let timeout = ClientError::from(io::Error::new(io::ErrorKind::TimedOut, "operation timed out"));
        assert!(is_transient(&timeout));

        let throttled = ClientError::from(ClientErrorKind::Custom(
            "HTTP status client error (429 Too Many Requests)".to_string(),
        ));
        assert!(is_transient(&throttled));

        let rejected = ClientError::from(ClientErrorKind::Custom(
            "Transaction simulation failed: insufficient funds".to_string(),
        ));
        assert!(!is_transient(&rejected));
    }

    #[test]
    fn test_send_options_follow_config() {
        let config = TxBatchConfig {
            skip_preflight: true,
            preflight_commitment: CommitmentLevel::Finalized,
            ..Default::default()
        };
        let options = SendOptions::from(&config);
        assert!(options.skip_preflight);
        assert_eq!(options.preflight_commitment, CommitmentLevel::Finalized);
    }
}
