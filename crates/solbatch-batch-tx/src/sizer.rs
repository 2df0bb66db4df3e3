/*!
# Dynamic Batch Sizer

Finds how many operations fit in one transaction by building real instructions
for growing prefixes of the operation list and asking the limits estimator
about each. Instruction shapes depend on derived addresses and per-type
layouts, so there is no closed-form answer.

The leading operations stand in for the whole list. A list that mixes cheap
transfers with heavier swaps later on may produce chunks that no longer fit;
those chunks fail validation in the executor and are reported, never sent.
*/

use crate::{
    assembler::InstructionAssembler,
    builder::resolve_signer,
    config::MAX_PROBE_BATCH_SIZE,
    error::TxBatchResult,
    limits::TransactionLimits,
    operation::Operation,
};
use solana_sdk::{pubkey::Pubkey, signature::Keypair, signer::Signer};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Chunk size chosen by probing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSizeDecision {
    pub max_ops_per_batch: usize,
    pub reasoning: String,
}

pub struct DynamicBatchSizer<'a> {
    assembler: &'a dyn InstructionAssembler,
    default_signer: Option<&'a Arc<Keypair>>,
    fee_payer: Option<&'a Arc<Keypair>>,
    limits: TransactionLimits,
    probe_ceiling: usize,
}

impl<'a> DynamicBatchSizer<'a> {
    pub fn new(
        assembler: &'a dyn InstructionAssembler,
        default_signer: Option<&'a Arc<Keypair>>,
        fee_payer: Option<&'a Arc<Keypair>>,
    ) -> Self {
        Self {
            assembler,
            default_signer,
            fee_payer,
            limits: TransactionLimits::default(),
            probe_ceiling: MAX_PROBE_BATCH_SIZE,
        }
    }

    pub fn with_limits(mut self, limits: TransactionLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Lower the probing ceiling; it can never exceed [`MAX_PROBE_BATCH_SIZE`]
    pub fn with_probe_ceiling(mut self, ceiling: usize) -> Self {
        self.probe_ceiling = ceiling.clamp(1, MAX_PROBE_BATCH_SIZE);
        self
    }

    /// Probe trial sizes 1, 2, 3, ... and return the last size that fit.
    ///
    /// An operation without a resolvable signer is an error. An assembly
    /// failure or the first trial that does not fit ends probing; the result
    /// is never below 1.
    pub async fn determine(&self, operations: &[Operation]) -> TxBatchResult<BatchSizeDecision> {
        let ceiling = self.probe_ceiling.min(operations.len());
        if ceiling == 0 {
            return Ok(BatchSizeDecision {
                max_ops_per_batch: 1,
                reasoning: "no operations to probe".to_string(),
            });
        }

        let fee_payer = self.fee_payer.map(|payer| payer.pubkey());
        let mut instructions = Vec::new();
        let mut signers: Vec<Pubkey> = Vec::new();
        let mut best = 0;
        let mut stop_reason = None;

        for (index, operation) in operations.iter().take(ceiling).enumerate() {
            let trial = index + 1;
            let signer = resolve_signer(operation, self.default_signer)?.pubkey();

            let built = match self
                .assembler
                .build_instructions(operation, &signer, fee_payer.as_ref())
                .await
            {
                Ok(built) => built,
                Err(e) => {
                    warn!("Probing stopped at trial {}: {}", trial, e);
                    stop_reason = Some(format!(
                        "instruction assembly failed for operation {} at trial size {}: {}",
                        operation.id, trial, e
                    ));
                    break;
                }
            };
            instructions.extend(built);
            if !signers.contains(&signer) {
                signers.push(signer);
            }

            let mut trial_signers = signers.clone();
            if let Some(payer) = fee_payer {
                if !trial_signers.contains(&payer) {
                    trial_signers.push(payer);
                }
            }

            let report = self.limits.check(&instructions, &trial_signers);
            debug!(
                "Trial {}: {} bytes, {} accounts, fits: {}",
                trial, report.estimated_size_bytes, report.unique_account_count, report.can_fit
            );
            if !report.can_fit {
                stop_reason = Some(format!(
                    "trial size {} does not fit ({})",
                    trial,
                    report.reasons.join("; ")
                ));
                break;
            }
            best = trial;
        }

        let max_ops_per_batch = best.max(1);
        let reasoning = match stop_reason {
            Some(reason) => format!("{}; using {} per batch", reason, max_ops_per_batch),
            None if ceiling == self.probe_ceiling => format!(
                "all trial sizes up to the probing ceiling of {} fit",
                self.probe_ceiling
            ),
            None => format!(
                "all {} operations fit in a single transaction",
                max_ops_per_batch
            ),
        };

        info!("Dynamic batch size: {} ({})", max_ops_per_batch, reasoning);
        Ok(BatchSizeDecision {
            max_ops_per_batch,
            reasoning,
        })
    }
}
