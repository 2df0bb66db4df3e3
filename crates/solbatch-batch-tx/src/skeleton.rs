use crate::{
    ledger::BlockReference,
    limits::{LimitsReport, TransactionLimits},
};
use solana_sdk::{instruction::Instruction, pubkey::Pubkey, signature::Keypair, signer::Signer};
use std::{ops::Range, sync::Arc};

/// How the fee payer of a skeleton was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeePayerSource {
    /// The caller's shared fee payer
    Explicit,
    /// No shared fee payer; the chunk's first operation signer pays
    FirstSigner,
}

#[derive(Debug)]
struct FeePayer {
    keypair: Arc<Keypair>,
    source: FeePayerSource,
}

/// Unsigned transaction for one chunk of operations.
///
/// Built fresh per chunk per pass and consumed by the executor; a retry builds
/// a new skeleton rather than reusing a signed one.
#[derive(Debug)]
pub struct TransactionSkeleton {
    operation_range: Range<usize>,
    instructions: Vec<Instruction>,
    signers: Vec<Arc<Keypair>>,
    fee_payer: Option<FeePayer>,
    block_reference: Option<BlockReference>,
}

impl TransactionSkeleton {
    /// Empty skeleton for the operations at `operation_range` of the input list
    pub fn new(operation_range: Range<usize>) -> Self {
        Self {
            operation_range,
            instructions: Vec::new(),
            signers: Vec::new(),
            fee_payer: None,
            block_reference: None,
        }
    }

    pub fn push_instructions(&mut self, instructions: impl IntoIterator<Item = Instruction>) {
        self.instructions.extend(instructions);
    }

    /// Record an operation signer; returns false if its key was already recorded
    pub fn add_signer(&mut self, signer: Arc<Keypair>) -> bool {
        let pubkey = signer.pubkey();
        if self.signers.iter().any(|s| s.pubkey() == pubkey) {
            return false;
        }
        self.signers.push(signer);
        true
    }

    pub fn set_fee_payer(&mut self, keypair: Arc<Keypair>, source: FeePayerSource) {
        self.fee_payer = Some(FeePayer { keypair, source });
    }

    pub fn attach_block_reference(&mut self, reference: BlockReference) {
        self.block_reference = Some(reference);
    }

    pub fn operation_range(&self) -> Range<usize> {
        self.operation_range.clone()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn block_reference(&self) -> Option<&BlockReference> {
        self.block_reference.as_ref()
    }

    pub fn fee_payer(&self) -> Option<Pubkey> {
        self.fee_payer.as_ref().map(|payer| payer.keypair.pubkey())
    }

    pub fn fee_payer_source(&self) -> Option<FeePayerSource> {
        self.fee_payer.as_ref().map(|payer| payer.source)
    }

    /// Operation signers in first-seen order
    pub fn operation_signers(&self) -> &[Arc<Keypair>] {
        &self.signers
    }

    /// Every key that signs: operation signers in first-seen order, then the
    /// fee payer last unless it is already one of them.
    pub fn signing_order(&self) -> Vec<Arc<Keypair>> {
        let mut order = self.signers.clone();
        if let Some(payer) = &self.fee_payer {
            let payer_key = payer.keypair.pubkey();
            if !order.iter().any(|s| s.pubkey() == payer_key) {
                order.push(payer.keypair.clone());
            }
        }
        order
    }

    pub fn signer_pubkeys(&self) -> Vec<Pubkey> {
        self.signing_order().iter().map(|s| s.pubkey()).collect()
    }

    pub fn limits_report(&self, limits: &TransactionLimits) -> LimitsReport {
        limits.check(&self.instructions, &self.signer_pubkeys())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signers_deduplicated_by_pubkey() {
        let alice = Arc::new(Keypair::new());
        let alice_again = Arc::new(alice.insecure_clone());
        let bob = Arc::new(Keypair::new());

        let mut skeleton = TransactionSkeleton::new(0..3);
        assert!(skeleton.add_signer(alice.clone()));
        assert!(skeleton.add_signer(bob.clone()));
        assert!(!skeleton.add_signer(alice_again));

        assert_eq!(skeleton.signer_pubkeys(), vec![alice.pubkey(), bob.pubkey()]);
    }

    #[test]
    fn test_distinct_fee_payer_signs_last() {
        let alice = Arc::new(Keypair::new());
        let payer = Arc::new(Keypair::new());

        let mut skeleton = TransactionSkeleton::new(0..1);
        skeleton.set_fee_payer(payer.clone(), FeePayerSource::Explicit);
        skeleton.add_signer(alice.clone());

        assert_eq!(skeleton.signer_pubkeys(), vec![alice.pubkey(), payer.pubkey()]);
        assert_eq!(skeleton.fee_payer(), Some(payer.pubkey()));
        assert_eq!(skeleton.fee_payer_source(), Some(FeePayerSource::Explicit));
    }

    #[test]
    fn test_fee_payer_already_a_signer_not_repeated() {
        let alice = Arc::new(Keypair::new());
        let mut skeleton = TransactionSkeleton::new(0..1);
        skeleton.add_signer(alice.clone());
        skeleton.set_fee_payer(alice.clone(), FeePayerSource::FirstSigner);

        assert_eq!(skeleton.signer_pubkeys(), vec![alice.pubkey()]);
    }
}
