use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::TransactionError};
use thiserror::Error;

pub type TxBatchResult<T> = Result<T, TxBatchError>;

/// Errors that can occur during batch transaction operations
#[derive(Error, Debug)]
pub enum TxBatchError {
    #[error("RPC client error: {0}")]
    RpcClient(#[from] solana_client::client_error::ClientError),

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Duplicate operation id: {0}")]
    DuplicateOperationId(String),

    #[error("No operations provided")]
    NoOperations,

    #[error("Operation {0} has no sender and no default signer is configured")]
    MissingSigner(String),

    #[error("Failed to build instructions for operation {operation_id}: {source}")]
    Assembly {
        operation_id: String,
        #[source]
        source: AssemblyError,
    },

    #[error("Transaction skeleton is invalid: {0}")]
    InvalidSkeleton(String),

    #[error("Transaction too large: {}", .reasons.join("; "))]
    TransactionTooLarge { reasons: Vec<String> },

    #[error("Failed to sign transaction: {0}")]
    Signing(String),

    #[error("Failed to send transaction: {0}")]
    SendFailed(String),

    #[error("Transaction {signature} failed on-chain: {error}")]
    TransactionFailed {
        signature: Signature,
        error: TransactionError,
    },

    #[error("Block reference expired before {0} was confirmed")]
    BlockReferenceExpired(Signature),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors raised while turning one operation into instructions
#[derive(Error, Debug)]
pub enum AssemblyError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Account not found: {0}")]
    AccountNotFound(Pubkey),

    #[error("Invalid account data for {address}: {reason}")]
    InvalidAccountData { address: Pubkey, reason: String },

    #[error("Bonding curve for mint {0} is complete; trade on the AMM instead")]
    CurveComplete(Pubkey),

    #[error("Instruction builder error: {0}")]
    Instruction(#[from] solana_sdk::program_error::ProgramError),

    #[error("Account read failed: {0}")]
    Ledger(String),
}
