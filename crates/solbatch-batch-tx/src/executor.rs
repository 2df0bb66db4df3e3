/*!
# Multi-Signer Transaction Executor

Drives one skeleton through `built -> validated -> signed -> submitted ->
confirmed`. A skeleton that fails validation never reaches the network, and
signing happens exactly once with the complete signer set so no signature can
overwrite another.
*/

use crate::{
    config::TxBatchConfig,
    error::{TxBatchError, TxBatchResult},
    ledger::{LedgerClient, SendOptions},
    skeleton::TransactionSkeleton,
};
use solana_sdk::{
    message::Message,
    pubkey::Pubkey,
    signature::{Keypair, Signature},
    transaction::Transaction,
};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Outcome of executing one chunk's transaction
pub type ChunkOutcome = TxBatchResult<Signature>;

pub struct TransactionExecutor<'a> {
    ledger: &'a dyn LedgerClient,
    config: &'a TxBatchConfig,
}

impl<'a> TransactionExecutor<'a> {
    pub fn new(ledger: &'a dyn LedgerClient, config: &'a TxBatchConfig) -> Self {
        Self { ledger, config }
    }

    /// Check everything that must hold before a skeleton may be signed
    pub fn validate(&self, skeleton: &TransactionSkeleton) -> TxBatchResult<()> {
        let fee_payer = skeleton
            .fee_payer()
            .ok_or_else(|| TxBatchError::InvalidSkeleton("no fee payer set".to_string()))?;
        if skeleton.block_reference().is_none() {
            return Err(TxBatchError::InvalidSkeleton(
                "no block reference set".to_string(),
            ));
        }
        if skeleton.instructions().is_empty() {
            return Err(TxBatchError::InvalidSkeleton(
                "skeleton has no instructions".to_string(),
            ));
        }

        let signer_keys = skeleton.signer_pubkeys();
        let unique: HashSet<Pubkey> = signer_keys.iter().copied().collect();
        if unique.len() != signer_keys.len() {
            return Err(TxBatchError::InvalidSkeleton(
                "duplicate public key in signer list".to_string(),
            ));
        }

        let required = skeleton
            .instructions()
            .iter()
            .flat_map(|ix| ix.accounts.iter())
            .filter(|meta| meta.is_signer)
            .map(|meta| meta.pubkey)
            .chain(std::iter::once(fee_payer));
        let missing: Vec<String> = required
            .filter(|key| !unique.contains(key))
            .map(|key| key.to_string())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        if !missing.is_empty() {
            return Err(TxBatchError::InvalidSkeleton(format!(
                "missing required signers: {}",
                missing.join(", ")
            )));
        }

        let report = skeleton.limits_report(&self.config.limits());
        if !report.can_fit {
            return Err(TxBatchError::TransactionTooLarge {
                reasons: report.reasons,
            });
        }

        Ok(())
    }

    /// Compile and sign in a single call with every required signer
    pub fn sign(&self, skeleton: &TransactionSkeleton) -> TxBatchResult<Transaction> {
        let fee_payer = skeleton
            .fee_payer()
            .ok_or_else(|| TxBatchError::InvalidSkeleton("no fee payer set".to_string()))?;
        let reference = skeleton
            .block_reference()
            .ok_or_else(|| TxBatchError::InvalidSkeleton("no block reference set".to_string()))?;

        let message = Message::new_with_blockhash(
            skeleton.instructions(),
            Some(&fee_payer),
            &reference.blockhash,
        );
        let mut transaction = Transaction::new_unsigned(message);

        let signers = skeleton.signing_order();
        let signer_refs: Vec<&Keypair> = signers.iter().map(|s| s.as_ref()).collect();
        transaction
            .try_sign(signer_refs.as_slice(), reference.blockhash)
            .map_err(|e| TxBatchError::Signing(e.to_string()))?;

        if !transaction.is_signed() {
            return Err(TxBatchError::Signing(
                "transaction is missing required signatures".to_string(),
            ));
        }
        Ok(transaction)
    }

    /// Validate, sign, submit and confirm. The skeleton is consumed.
    pub async fn execute(&self, skeleton: TransactionSkeleton) -> ChunkOutcome {
        let range = skeleton.operation_range();

        if let Err(e) = self.validate(&skeleton) {
            warn!("Chunk {:?} invalid, not submitted: {}", range, e);
            return Err(e);
        }
        debug!("Chunk {:?} validated", range);

        let transaction = self.sign(&skeleton)?;
        let reference = *skeleton
            .block_reference()
            .ok_or_else(|| TxBatchError::InvalidSkeleton("no block reference set".to_string()))?;
        drop(skeleton);
        debug!(
            "Chunk {:?} signed by {} signers",
            range,
            transaction.signatures.len()
        );

        let signature = self
            .ledger
            .send_transaction(&transaction, SendOptions::from(self.config))
            .await?;
        debug!("Chunk {:?} submitted as {}", range, signature);

        match self
            .ledger
            .confirm_transaction(&signature, &reference, self.config.confirmation_commitment)
            .await?
        {
            None => {
                info!("Chunk {:?} confirmed: {}", range, signature);
                Ok(signature)
            }
            Some(error) => {
                warn!("Chunk {:?} rejected on-chain: {}", range, error);
                Err(TxBatchError::TransactionFailed { signature, error })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        skeleton::FeePayerSource,
        test_utils::{test_reference, MockLedger},
    };
    use solana_sdk::{
        instruction::{AccountMeta, Instruction},
        signer::Signer,
        system_instruction,
        transaction::TransactionError,
    };
    use std::sync::Arc;

    fn transfer_skeleton(sender: &Arc<Keypair>) -> TransactionSkeleton {
        let mut skeleton = TransactionSkeleton::new(0..1);
        skeleton.push_instructions([system_instruction::transfer(
            &sender.pubkey(),
            &Pubkey::new_unique(),
            10,
        )]);
        skeleton.add_signer(sender.clone());
        skeleton.set_fee_payer(sender.clone(), FeePayerSource::FirstSigner);
        skeleton.attach_block_reference(test_reference());
        skeleton
    }

    #[test]
    fn test_validate_rejects_incomplete_skeletons() {
        let ledger = MockLedger::default();
        let config = TxBatchConfig::default();
        let executor = TransactionExecutor::new(&ledger, &config);
        let sender = Arc::new(Keypair::new());

        let empty = TransactionSkeleton::new(0..1);
        assert!(matches!(
            executor.validate(&empty),
            Err(TxBatchError::InvalidSkeleton(msg)) if msg.contains("fee payer")
        ));

        let mut no_reference = TransactionSkeleton::new(0..1);
        no_reference.set_fee_payer(sender.clone(), FeePayerSource::Explicit);
        assert!(matches!(
            executor.validate(&no_reference),
            Err(TxBatchError::InvalidSkeleton(msg)) if msg.contains("block reference")
        ));

        let mut no_instructions = TransactionSkeleton::new(0..1);
        no_instructions.set_fee_payer(sender, FeePayerSource::Explicit);
        no_instructions.attach_block_reference(test_reference());
        assert!(matches!(
            executor.validate(&no_instructions),
            Err(TxBatchError::InvalidSkeleton(msg)) if msg.contains("no instructions")
        ));
    }

    #[test]
    fn test_validate_requires_every_flagged_signer() {
        let ledger = MockLedger::default();
        let config = TxBatchConfig::default();
        let executor = TransactionExecutor::new(&ledger, &config);
        let sender = Arc::new(Keypair::new());
        let absent = Pubkey::new_unique();

        let mut skeleton = transfer_skeleton(&sender);
        skeleton.push_instructions([Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[1],
            vec![AccountMeta::new(absent, true)],
        )]);

        match executor.validate(&skeleton) {
            Err(TxBatchError::InvalidSkeleton(msg)) => assert!(msg.contains(&absent.to_string())),
            other => panic!("expected missing signer, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_oversized() {
        let ledger = MockLedger::default();
        let config = TxBatchConfig::default();
        let executor = TransactionExecutor::new(&ledger, &config);
        let sender = Arc::new(Keypair::new());

        let mut skeleton = transfer_skeleton(&sender);
        skeleton.push_instructions([Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[0u8; 1200],
            vec![AccountMeta::new(sender.pubkey(), true)],
        )]);

        assert!(matches!(
            executor.validate(&skeleton),
            Err(TxBatchError::TransactionTooLarge { .. })
        ));
    }

    #[test]
    fn test_sign_once_with_all_signers() {
        let ledger = MockLedger::default();
        let config = TxBatchConfig::default();
        let executor = TransactionExecutor::new(&ledger, &config);
        let alice = Arc::new(Keypair::new());
        let bob = Arc::new(Keypair::new());
        let payer = Arc::new(Keypair::new());

        let mut skeleton = TransactionSkeleton::new(0..2);
        skeleton.push_instructions([
            system_instruction::transfer(&alice.pubkey(), &Pubkey::new_unique(), 1),
            system_instruction::transfer(&bob.pubkey(), &Pubkey::new_unique(), 1),
        ]);
        skeleton.add_signer(alice.clone());
        skeleton.add_signer(bob.clone());
        skeleton.set_fee_payer(payer.clone(), FeePayerSource::Explicit);
        skeleton.attach_block_reference(test_reference());

        executor.validate(&skeleton).unwrap();
        let transaction = executor.sign(&skeleton).unwrap();

        assert!(transaction.is_signed());
        assert_eq!(transaction.signatures.len(), 3);
        assert_eq!(transaction.message.account_keys[0], payer.pubkey());
        assert!(transaction.verify().is_ok());
    }

    #[tokio::test]
    async fn test_execute_confirms() {
        let ledger = MockLedger::default();
        let config = TxBatchConfig::default();
        let executor = TransactionExecutor::new(&ledger, &config);
        let sender = Arc::new(Keypair::new());

        let signature = executor.execute(transfer_skeleton(&sender)).await.unwrap();
        assert_eq!(ledger.sent_count(), 1);
        assert_eq!(ledger.sent()[0].signatures[0], signature);
    }

    #[tokio::test]
    async fn test_execute_reports_on_chain_error() {
        let ledger = MockLedger::default().fail_confirmation(0, TransactionError::AccountNotFound);
        let config = TxBatchConfig::default();
        let executor = TransactionExecutor::new(&ledger, &config);
        let sender = Arc::new(Keypair::new());

        let outcome = executor.execute(transfer_skeleton(&sender)).await;
        assert!(matches!(
            outcome,
            Err(TxBatchError::TransactionFailed {
                error: TransactionError::AccountNotFound,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_execute_never_submits_invalid() {
        let ledger = MockLedger::default();
        let config = TxBatchConfig::default();
        let executor = TransactionExecutor::new(&ledger, &config);

        let outcome = executor.execute(TransactionSkeleton::new(0..1)).await;
        assert!(outcome.is_err());
        assert_eq!(ledger.sent_count(), 0);
    }

    #[tokio::test]
    async fn test_send_failure_surfaces() {
        let ledger = MockLedger::default().reject_send(0, "blockhash not found");
        let config = TxBatchConfig::default();
        let executor = TransactionExecutor::new(&ledger, &config);
        let sender = Arc::new(Keypair::new());

        let outcome = executor.execute(transfer_skeleton(&sender)).await;
        assert!(matches!(outcome, Err(TxBatchError::SendFailed(msg)) if msg.contains("blockhash")));
    }
}
