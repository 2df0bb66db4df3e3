use crate::{
    assembler::InstructionAssembler,
    builder::BatchInstructionBuilder,
    executor::{ChunkOutcome, TransactionExecutor},
    ledger::LedgerClient,
    limits::LimitsReport,
    operation::Operation,
    reconcile::{reconcile_chunk, BatchResult, BatchResults},
    retry::{plan_fallback, FallbackPlan},
    sizer::{BatchSizeDecision, DynamicBatchSizer},
    validation::ensure_unique_ids,
    BatchOptions, TxBatchConfig, TxBatchError, TxBatchResult,
};
use solana_sdk::{
    pubkey::Pubkey,
    signature::Keypair,
    signer::Signer,
};
use std::{ops::Range, sync::Arc};
use tracing::{info, warn};

/// Dry-run view of one chunk: what would be sent, and whether it fits
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    pub operation_range: Range<usize>,
    pub fee_payer: Option<Pubkey>,
    pub signer_count: usize,
    pub instruction_count: usize,
    pub limits: Option<LimitsReport>,
    pub error: Option<String>,
}

/// High-level client for batching operations into as few transactions as fit
pub struct BatchTxClient {
    ledger: Arc<dyn LedgerClient>,
    assembler: Arc<dyn InstructionAssembler>,
    default_signer: Option<Arc<Keypair>>,
    config: TxBatchConfig,
}

impl BatchTxClient {
    /// Create a new client with default configuration
    pub fn new(ledger: Arc<dyn LedgerClient>, assembler: Arc<dyn InstructionAssembler>) -> Self {
        Self::with_config(ledger, assembler, TxBatchConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(
        ledger: Arc<dyn LedgerClient>,
        assembler: Arc<dyn InstructionAssembler>,
        config: TxBatchConfig,
    ) -> Self {
        Self {
            ledger,
            assembler,
            default_signer: None,
            config,
        }
    }

    /// Signer for operations that carry no sender of their own
    pub fn with_default_signer(mut self, signer: Arc<Keypair>) -> Self {
        self.default_signer = Some(signer);
        self
    }

    pub fn default_signer_pubkey(&self) -> Option<Pubkey> {
        self.default_signer.as_ref().map(|s| s.pubkey())
    }

    pub fn config(&self) -> &TxBatchConfig {
        &self.config
    }

    /// Execute every operation, batching as many per transaction as allowed.
    ///
    /// Chunks run sequentially against one shared block reference. A failed
    /// chunk never stops the ones after it, and the returned list holds exactly
    /// one result per operation. Look results up by operation id: fallback
    /// retries overwrite entries in place.
    pub async fn execute_batch(
        &self,
        operations: &[Operation],
        options: &BatchOptions,
    ) -> TxBatchResult<Vec<BatchResult>> {
        if operations.is_empty() {
            return Err(TxBatchError::NoOperations);
        }
        ensure_unique_ids(operations)?;

        let chunk_size = self.chunk_size(operations, options).await;

        // Nothing can proceed without the pass's block reference
        let reference = self
            .ledger
            .latest_block_reference(self.config.confirmation_commitment)
            .await?;

        let builder = BatchInstructionBuilder::new(
            self.assembler.as_ref(),
            self.default_signer.as_ref(),
            options.fee_payer.as_ref(),
        );
        let chunks = builder.build_batch(operations, chunk_size, reference).await;
        let executor = TransactionExecutor::new(self.ledger.as_ref(), &self.config);

        info!(
            "Executing {} operations in {} transactions ({} per transaction)",
            operations.len(),
            chunks.len(),
            chunk_size
        );

        let mut results = BatchResults::new();
        let total = chunks.len();
        for (chunk_idx, chunk) in chunks.into_iter().enumerate() {
            if chunk_idx > 0 && !options.delay_between.is_zero() {
                tokio::time::sleep(options.delay_between).await;
            }
            info!(
                "Sending chunk {} of {} ({} operations)",
                chunk_idx + 1,
                total,
                chunk.operation_range.len()
            );

            let outcome: ChunkOutcome = match chunk.skeleton {
                Ok(skeleton) => executor.execute(skeleton).await,
                Err(e) => {
                    warn!("Chunk {} could not be built: {}", chunk_idx + 1, e);
                    Err(e)
                }
            };
            results.extend(reconcile_chunk(
                &operations[chunk.operation_range],
                &outcome,
            ));
        }

        self.apply_fallback(&mut results, operations, options).await;

        info!(
            "Batch complete: {} succeeded, {} failed",
            results.succeeded(),
            results.failed()
        );
        Ok(results.into_vec())
    }

    /// Execute one operation in its own transaction, with a fresh block
    /// reference and a freshly built skeleton
    pub async fn execute_single(
        &self,
        operation: &Operation,
        fee_payer: Option<&Arc<Keypair>>,
    ) -> BatchResult {
        let outcome = self.run_single(operation, fee_payer).await;
        BatchResult::from_outcome(operation, &outcome)
    }

    /// Probe for the largest chunk size. Probing problems never escape: they
    /// degrade to a chunk size of 1.
    pub async fn estimate_batch_size(
        &self,
        operations: &[Operation],
        fee_payer: Option<&Arc<Keypair>>,
    ) -> BatchSizeDecision {
        let sizer = DynamicBatchSizer::new(
            self.assembler.as_ref(),
            self.default_signer.as_ref(),
            fee_payer,
        )
        .with_limits(self.config.limits())
        .with_probe_ceiling(self.config.max_probe_batch_size);

        match sizer.determine(operations).await {
            Ok(decision) => decision,
            Err(e) => {
                warn!("Dynamic batch sizing failed, using 1 per batch: {}", e);
                BatchSizeDecision {
                    max_ops_per_batch: 1,
                    reasoning: format!("probing failed ({}); using 1 per batch", e),
                }
            }
        }
    }

    /// Build a pass's skeletons without signing or sending anything
    pub async fn plan_batch(
        &self,
        operations: &[Operation],
        options: &BatchOptions,
    ) -> TxBatchResult<Vec<ChunkPlan>> {
        if operations.is_empty() {
            return Err(TxBatchError::NoOperations);
        }
        ensure_unique_ids(operations)?;

        let chunk_size = self.chunk_size(operations, options).await;
        let reference = self
            .ledger
            .latest_block_reference(self.config.confirmation_commitment)
            .await?;
        let builder = BatchInstructionBuilder::new(
            self.assembler.as_ref(),
            self.default_signer.as_ref(),
            options.fee_payer.as_ref(),
        );
        let limits = self.config.limits();

        Ok(builder
            .build_batch(operations, chunk_size, reference)
            .await
            .into_iter()
            .map(|chunk| match chunk.skeleton {
                Ok(skeleton) => ChunkPlan {
                    operation_range: chunk.operation_range,
                    fee_payer: skeleton.fee_payer(),
                    signer_count: skeleton.signing_order().len(),
                    instruction_count: skeleton.instructions().len(),
                    limits: Some(skeleton.limits_report(&limits)),
                    error: None,
                },
                Err(e) => ChunkPlan {
                    operation_range: chunk.operation_range,
                    fee_payer: None,
                    signer_count: 0,
                    instruction_count: 0,
                    limits: None,
                    error: Some(e.to_string()),
                },
            })
            .collect())
    }

    async fn chunk_size(&self, operations: &[Operation], options: &BatchOptions) -> usize {
        if options.dynamic_batching {
            self.estimate_batch_size(operations, options.fee_payer.as_ref())
                .await
                .max_ops_per_batch
        } else {
            options.max_parallel.max(1)
        }
    }

    async fn run_single(
        &self,
        operation: &Operation,
        fee_payer: Option<&Arc<Keypair>>,
    ) -> ChunkOutcome {
        let reference = self
            .ledger
            .latest_block_reference(self.config.confirmation_commitment)
            .await?;
        let builder = BatchInstructionBuilder::new(
            self.assembler.as_ref(),
            self.default_signer.as_ref(),
            fee_payer,
        );
        let skeleton = builder
            .build_chunk(std::slice::from_ref(operation), 0..1, reference)
            .await?;
        TransactionExecutor::new(self.ledger.as_ref(), &self.config)
            .execute(skeleton)
            .await
    }

    async fn apply_fallback(
        &self,
        results: &mut BatchResults,
        operations: &[Operation],
        options: &BatchOptions,
    ) {
        match plan_fallback(results, operations, options) {
            FallbackPlan::NothingFailed => {}
            FallbackPlan::RetryNotRequested { failed } => {
                info!("{} operations failed; retry not requested", failed);
            }
            FallbackPlan::FallbackDisabled { failed } => {
                info!(
                    "{} operations failed; individual fallback retry is disabled",
                    failed
                );
            }
            FallbackPlan::RetryIndividually(retry) => {
                warn!("Retrying {} failed operations individually", retry.len());
                for operation in retry {
                    if !options.delay_between.is_zero() {
                        tokio::time::sleep(options.delay_between).await;
                    }
                    let result = self
                        .execute_single(operation, options.fee_payer.as_ref())
                        .await;
                    if !result.success {
                        warn!(
                            "Fallback for {} failed: {}",
                            operation.id,
                            result.error.as_deref().unwrap_or("unknown error")
                        );
                    }
                    results.upsert(result);
                }
            }
        }
    }
}
