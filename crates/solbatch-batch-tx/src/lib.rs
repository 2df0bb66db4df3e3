/*!
# Solbatch Batch Transaction Engine

Groups independent on-chain operations (token transfers, lamport transfers and
bonding-curve / AMM trades) into as few Solana transactions as the network's
size and account limits allow, signs each with every signer it needs, and
reports exactly one result per operation.

Protocol specifics live behind [`InstructionAssembler`]; the network lives
behind [`LedgerClient`]. [`RpcLedger`] is the production ledger.

## Quick Start

```rust,no_run
use solbatch_batch_tx::{
    BatchOptions, BatchTxClient, InstructionAssembler, Operation, OperationParams, RpcClient,
    RpcLedger,
};
use solana_sdk::{pubkey::Pubkey, signature::Keypair};
use std::sync::Arc;

# async fn example(assembler: Arc<dyn InstructionAssembler>) -> Result<(), Box<dyn std::error::Error>> {
let rpc_client = Arc::new(RpcClient::new("https://api.devnet.solana.com".to_string()));
let ledger = Arc::new(RpcLedger::new(rpc_client));
let client = BatchTxClient::new(ledger, assembler).with_default_signer(Arc::new(Keypair::new()));

let operations = vec![Operation::new(
    "pay-1",
    "pay alice",
    OperationParams::SolTransfer {
        recipient: Pubkey::new_unique(),
        lamports: 1_000_000,
    },
)];

let options = BatchOptions::default()
    .with_dynamic_batching(true)
    .with_retry_failed(true);
for result in client.execute_batch(&operations, &options).await? {
    println!("{}: {:?}", result.operation_id, result.signature);
}
# Ok(())
# }
```

## Validation

Operation lists read from files arrive as [`RawOperation`]s; run
[`validate_operations`] over them to collect every problem at once, and
[`parse_operations`] to turn a valid list into typed [`Operation`]s.
*/

mod assembler;
mod builder;
mod client;
mod config;
mod error;
mod executor;
mod ledger;
mod limits;
mod operation;
mod reconcile;
mod retry;
mod sizer;
mod skeleton;
mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use assembler::InstructionAssembler;
pub use builder::{plan_chunks, BatchInstructionBuilder, ChunkBuild};
pub use client::{BatchTxClient, ChunkPlan};
pub use config::{BatchOptions, TxBatchConfig, MAX_PROBE_BATCH_SIZE};
pub use error::{AssemblyError, TxBatchError, TxBatchResult};
pub use executor::{ChunkOutcome, TransactionExecutor};
pub use ledger::{BlockReference, LedgerClient, RpcLedger, SendOptions};
pub use limits::{
    estimate_transaction_limits, LimitsReport, TransactionLimits, MAX_TRANSACTION_SIZE_BYTES,
    MAX_UNIQUE_ACCOUNTS,
};
pub use operation::{
    valid_type_names, Operation, OperationParams, OperationType, SlippageQuote, BPS_DENOMINATOR,
};
pub use reconcile::{reconcile_chunk, BatchResult, BatchResults};
pub use retry::{plan_fallback, FallbackPlan};
pub use sizer::{BatchSizeDecision, DynamicBatchSizer};
pub use skeleton::{FeePayerSource, TransactionSkeleton};
pub use validation::{
    ensure_unique_ids, parse_operations, validate_operations, RawOperation, ValidationReport,
    DEFAULT_SLIPPAGE_BPS,
};

// Re-export key Solana types for convenience
pub use solana_client::nonblocking::rpc_client::RpcClient;
pub use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::Transaction,
};
