/*!
# Batch Instruction Builder

Splits the operation list into consecutive chunks and turns each chunk into a
[`TransactionSkeleton`]: resolved signers, instructions in input order, a fee
payer chosen at construction time, and the pass's shared block reference.
*/

use crate::{
    assembler::InstructionAssembler,
    error::{TxBatchError, TxBatchResult},
    ledger::BlockReference,
    operation::Operation,
    skeleton::{FeePayerSource, TransactionSkeleton},
};
use solana_sdk::{signature::Keypair, signer::Signer};
use std::{ops::Range, sync::Arc};
use tracing::debug;

/// One chunk of a pass; a build failure is scoped to its own chunk
#[derive(Debug)]
pub struct ChunkBuild {
    pub operation_range: Range<usize>,
    pub skeleton: TxBatchResult<TransactionSkeleton>,
}

/// Consecutive index ranges of at most `chunk_size` operations
pub fn plan_chunks(operation_count: usize, chunk_size: usize) -> Vec<Range<usize>> {
    let chunk_size = chunk_size.max(1);
    (0..operation_count)
        .step_by(chunk_size)
        .map(|start| start..(start + chunk_size).min(operation_count))
        .collect()
}

/// The operation's bound signer, else the default signer
pub fn resolve_signer(
    operation: &Operation,
    default_signer: Option<&Arc<Keypair>>,
) -> TxBatchResult<Arc<Keypair>> {
    operation
        .sender
        .as_ref()
        .or(default_signer)
        .cloned()
        .ok_or_else(|| TxBatchError::MissingSigner(operation.id.clone()))
}

pub struct BatchInstructionBuilder<'a> {
    assembler: &'a dyn InstructionAssembler,
    default_signer: Option<&'a Arc<Keypair>>,
    fee_payer: Option<&'a Arc<Keypair>>,
}

impl<'a> BatchInstructionBuilder<'a> {
    pub fn new(
        assembler: &'a dyn InstructionAssembler,
        default_signer: Option<&'a Arc<Keypair>>,
        fee_payer: Option<&'a Arc<Keypair>>,
    ) -> Self {
        Self {
            assembler,
            default_signer,
            fee_payer,
        }
    }

    /// Build one skeleton per chunk of `chunk_size` operations, all sharing
    /// `reference`. Chunks are built sequentially in input order.
    pub async fn build_batch(
        &self,
        operations: &[Operation],
        chunk_size: usize,
        reference: BlockReference,
    ) -> Vec<ChunkBuild> {
        let mut chunks = Vec::new();
        for range in plan_chunks(operations.len(), chunk_size) {
            let skeleton = self.build_chunk(operations, range.clone(), reference).await;
            chunks.push(ChunkBuild {
                operation_range: range,
                skeleton,
            });
        }
        chunks
    }

    pub async fn build_chunk(
        &self,
        operations: &[Operation],
        range: Range<usize>,
        reference: BlockReference,
    ) -> TxBatchResult<TransactionSkeleton> {
        let mut skeleton = TransactionSkeleton::new(range.clone());
        let fee_payer_key = self.fee_payer.map(|payer| payer.pubkey());

        for operation in &operations[range] {
            let signer = resolve_signer(operation, self.default_signer)?;
            let instructions = self
                .assembler
                .build_instructions(operation, &signer.pubkey(), fee_payer_key.as_ref())
                .await
                .map_err(|source| TxBatchError::Assembly {
                    operation_id: operation.id.clone(),
                    source,
                })?;
            skeleton.push_instructions(instructions);
            skeleton.add_signer(signer);
        }

        match self.fee_payer {
            Some(payer) => skeleton.set_fee_payer(payer.clone(), FeePayerSource::Explicit),
            None => {
                let first = skeleton.operation_signers().first().cloned().ok_or_else(|| {
                    TxBatchError::InvalidSkeleton("chunk has no signer to pay fees".to_string())
                })?;
                skeleton.set_fee_payer(first, FeePayerSource::FirstSigner);
            }
        }
        skeleton.attach_block_reference(reference);

        debug!(
            "Built chunk {:?}: {} instructions, {} signers, fee payer {:?}",
            skeleton.operation_range(),
            skeleton.instructions().len(),
            skeleton.signing_order().len(),
            skeleton.fee_payer_source()
        );
        Ok(skeleton)
    }
}
