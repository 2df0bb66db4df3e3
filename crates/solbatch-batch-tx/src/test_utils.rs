//! In-memory doubles for the ledger and assembler seams.

use crate::{
    assembler::InstructionAssembler,
    error::{AssemblyError, TxBatchError, TxBatchResult},
    ledger::{BlockReference, LedgerClient, SendOptions},
    operation::{Operation, OperationParams},
};
use async_trait::async_trait;
use solana_sdk::{
    account::Account,
    commitment_config::CommitmentConfig,
    hash::Hash,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    signature::Signature,
    system_instruction,
    transaction::{Transaction, TransactionError},
};
use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

pub const PAYLOAD_PROGRAM_ID: Pubkey = Pubkey::new_from_array([7u8; 32]);

pub fn test_reference() -> BlockReference {
    BlockReference {
        blockhash: Hash::new_unique(),
        last_valid_block_height: 100,
    }
}

pub fn sol_transfer_op(id: &str) -> Operation {
    Operation::new(
        id,
        format!("transfer lamports ({})", id),
        OperationParams::SolTransfer {
            recipient: Pubkey::new_unique(),
            lamports: 1_000,
        },
    )
}

/// Operation whose instructions come from [`MockAssembler::with_payload_len`]
pub fn payload_op(id: &str) -> Operation {
    Operation::new(
        id,
        "fixed-size payload",
        OperationParams::SolTransfer {
            recipient: Pubkey::new_unique(),
            lamports: 1,
        },
    )
}

/// In-memory ledger with scripted send and confirmation failures.
///
/// Failures are keyed by send attempt index (0 for the first call to
/// `send_transaction`, and so on).
#[derive(Default)]
pub struct MockLedger {
    attempts: AtomicUsize,
    block_reference_calls: AtomicUsize,
    sent: Mutex<Vec<(usize, Transaction)>>,
    send_rejections: HashMap<usize, String>,
    confirmation_failures: HashMap<usize, TransactionError>,
    block_reference_error: Option<String>,
    accounts: HashMap<Pubkey, Account>,
}

impl MockLedger {
    pub fn fail_confirmation(mut self, attempt: usize, error: TransactionError) -> Self {
        self.confirmation_failures.insert(attempt, error);
        self
    }

    pub fn reject_send(mut self, attempt: usize, message: &str) -> Self {
        self.send_rejections.insert(attempt, message.to_string());
        self
    }

    pub fn failing_block_reference(mut self, message: &str) -> Self {
        self.block_reference_error = Some(message.to_string());
        self
    }

    pub fn with_account(mut self, address: Pubkey, account: Account) -> Self {
        self.accounts.insert(address, account);
        self
    }

    pub fn sent(&self) -> Vec<Transaction> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, tx)| tx.clone())
            .collect()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn block_reference_calls(&self) -> usize {
        self.block_reference_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerClient for MockLedger {
    async fn latest_block_reference(
        &self,
        _commitment: CommitmentConfig,
    ) -> TxBatchResult<BlockReference> {
        self.block_reference_calls.fetch_add(1, Ordering::SeqCst);
        match &self.block_reference_error {
            Some(message) => Err(TxBatchError::Ledger(message.clone())),
            None => Ok(BlockReference {
                blockhash: Hash::new_unique(),
                last_valid_block_height: 1_000,
            }),
        }
    }

    async fn send_transaction(
        &self,
        transaction: &Transaction,
        _options: SendOptions,
    ) -> TxBatchResult<Signature> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.send_rejections.get(&attempt) {
            return Err(TxBatchError::SendFailed(message.clone()));
        }
        if !transaction.is_signed() || transaction.verify().is_err() {
            return Err(TxBatchError::SendFailed(
                "signature verification failure".to_string(),
            ));
        }
        self.sent
            .lock()
            .unwrap()
            .push((attempt, transaction.clone()));
        Ok(transaction.signatures[0])
    }

    async fn confirm_transaction(
        &self,
        signature: &Signature,
        _reference: &BlockReference,
        _commitment: CommitmentConfig,
    ) -> TxBatchResult<Option<TransactionError>> {
        let sent = self.sent.lock().unwrap();
        let attempt = sent
            .iter()
            .find(|(_, tx)| tx.signatures[0] == *signature)
            .map(|(attempt, _)| *attempt)
            .ok_or_else(|| TxBatchError::Ledger(format!("unknown signature {}", signature)))?;
        Ok(self.confirmation_failures.get(&attempt).cloned())
    }

    async fn get_account(&self, address: &Pubkey) -> TxBatchResult<Option<Account>> {
        Ok(self.accounts.get(address).cloned())
    }
}

/// Assembler producing system transfers, or fixed-size payload instructions
#[derive(Default)]
pub struct MockAssembler {
    payload_len: Option<usize>,
    shared_recipient: Option<Pubkey>,
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl MockAssembler {
    /// One instruction per operation: `len` data bytes, the sender as signer
    /// and one fresh writable account
    pub fn with_payload_len(len: usize) -> Self {
        Self {
            payload_len: Some(len),
            ..Default::default()
        }
    }

    /// System transfers that all pay the same recipient
    pub fn shared_recipient() -> Self {
        Self {
            shared_recipient: Some(Pubkey::new_unique()),
            ..Default::default()
        }
    }

    pub fn failing_for(mut self, operation_id: &str) -> Self {
        self.failing.insert(operation_id.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InstructionAssembler for MockAssembler {
    async fn build_instructions(
        &self,
        operation: &Operation,
        sender: &Pubkey,
        _fee_payer: Option<&Pubkey>,
    ) -> Result<Vec<Instruction>, AssemblyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&operation.id) {
            return Err(AssemblyError::MissingParameter(format!(
                "mock failure for {}",
                operation.id
            )));
        }

        if let Some(len) = self.payload_len {
            return Ok(vec![Instruction::new_with_bytes(
                PAYLOAD_PROGRAM_ID,
                &vec![0u8; len],
                vec![
                    AccountMeta::new(*sender, true),
                    AccountMeta::new(Pubkey::new_unique(), false),
                ],
            )]);
        }

        let (recipient, lamports) = match &operation.params {
            OperationParams::SolTransfer {
                recipient,
                lamports,
            } => (*recipient, *lamports),
            _ => (Pubkey::new_unique(), 1),
        };
        let recipient = self.shared_recipient.unwrap_or(recipient);
        Ok(vec![system_instruction::transfer(sender, &recipient, lamports)])
    }
}
