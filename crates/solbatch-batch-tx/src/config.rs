use crate::limits::{TransactionLimits, MAX_TRANSACTION_SIZE_BYTES, MAX_UNIQUE_ACCOUNTS};
use backoff::ExponentialBackoff;
use solana_sdk::{
    commitment_config::{CommitmentConfig, CommitmentLevel},
    signature::Keypair,
};
use std::{sync::Arc, time::Duration};

/// Hard ceiling on the batch sizes the dynamic sizer will probe
pub const MAX_PROBE_BATCH_SIZE: usize = 20;

/// Client-wide configuration for batch transaction operations
#[derive(Debug, Clone)]
pub struct TxBatchConfig {
    /// Commitment level a transaction must reach to count as confirmed
    pub confirmation_commitment: CommitmentConfig,

    /// Whether to skip preflight checks (simulation before sending)
    pub skip_preflight: bool,

    /// Commitment used by the node for preflight simulation
    pub preflight_commitment: CommitmentLevel,

    /// How often signature status is polled while confirming
    pub confirmation_poll_interval: Duration,

    /// Backoff for re-sending signed bytes after transient transport failures
    pub send_retry_backoff: ExponentialBackoff,

    /// Largest batch the dynamic sizer will try
    pub max_probe_batch_size: usize,

    /// Maximum transaction size in bytes
    pub max_transaction_size_bytes: usize,

    /// Maximum unique accounts per transaction
    pub max_unique_accounts: usize,
}

impl TxBatchConfig {
    pub fn limits(&self) -> TransactionLimits {
        TransactionLimits {
            max_size_bytes: self.max_transaction_size_bytes,
            max_unique_accounts: self.max_unique_accounts,
        }
    }
}

impl Default for TxBatchConfig {
    fn default() -> Self {
        Self {
            confirmation_commitment: CommitmentConfig::confirmed(),
            skip_preflight: false,
            preflight_commitment: CommitmentLevel::Confirmed,
            confirmation_poll_interval: Duration::from_millis(500),
            send_retry_backoff: ExponentialBackoff {
                initial_interval: Duration::from_millis(250),
                max_interval: Duration::from_secs(5),
                max_elapsed_time: Some(Duration::from_secs(20)),
                multiplier: 2.0,
                ..Default::default()
            },
            max_probe_batch_size: MAX_PROBE_BATCH_SIZE,
            max_transaction_size_bytes: MAX_TRANSACTION_SIZE_BYTES,
            max_unique_accounts: MAX_UNIQUE_ACCOUNTS,
        }
    }
}

/// Per-call options for [`crate::BatchTxClient::execute_batch`]
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Operations per transaction when dynamic batching is off.
    ///
    /// A value larger than what fits is the caller's responsibility: the
    /// oversized chunk fails validation and its operations are reported failed.
    pub max_parallel: usize,

    /// Pause between consecutive chunk submissions
    pub delay_between: Duration,

    /// Re-run failed operations after the batched pass
    pub retry_failed: bool,

    /// Operator override that suppresses the individual fallback retry
    pub disable_fallback_retry: bool,

    /// Probe for the largest chunk size instead of using `max_parallel`
    pub dynamic_batching: bool,

    /// Shared fee payer; otherwise each chunk's first signer pays
    pub fee_payer: Option<Arc<Keypair>>,
}

impl BatchOptions {
    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel;
        self
    }

    pub fn with_delay_between(mut self, delay_between: Duration) -> Self {
        self.delay_between = delay_between;
        self
    }

    pub fn with_retry_failed(mut self, retry_failed: bool) -> Self {
        self.retry_failed = retry_failed;
        self
    }

    pub fn with_disable_fallback_retry(mut self, disable: bool) -> Self {
        self.disable_fallback_retry = disable;
        self
    }

    pub fn with_dynamic_batching(mut self, dynamic_batching: bool) -> Self {
        self.dynamic_batching = dynamic_batching;
        self
    }

    pub fn with_fee_payer(mut self, fee_payer: Arc<Keypair>) -> Self {
        self.fee_payer = Some(fee_payer);
        self
    }
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            max_parallel: 3,
            delay_between: Duration::from_millis(1000),
            retry_failed: false,
            disable_fallback_retry: false,
            dynamic_batching: false,
            fee_payer: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TxBatchConfig::default();
        assert_eq!(config.max_probe_batch_size, 20);
        assert_eq!(config.max_transaction_size_bytes, 1232);
        assert_eq!(config.max_unique_accounts, 64);
        assert!(!config.skip_preflight);
        assert_eq!(config.limits(), TransactionLimits::default());
    }

    #[test]
    fn test_default_options() {
        let options = BatchOptions::default();
        assert_eq!(options.max_parallel, 3);
        assert_eq!(options.delay_between, Duration::from_secs(1));
        assert!(!options.retry_failed);
        assert!(!options.disable_fallback_retry);
        assert!(!options.dynamic_batching);
        assert!(options.fee_payer.is_none());
    }

    #[test]
    fn test_option_setters() {
        let payer = Arc::new(Keypair::new());
        let options = BatchOptions::default()
            .with_max_parallel(5)
            .with_delay_between(Duration::ZERO)
            .with_retry_failed(true)
            .with_dynamic_batching(true)
            .with_fee_payer(payer.clone());
        assert_eq!(options.max_parallel, 5);
        assert!(options.retry_failed);
        assert!(options.dynamic_batching);
        assert!(Arc::ptr_eq(options.fee_payer.as_ref().unwrap(), &payer));
    }
}
