/*!
# Transaction Limits

Pure size and account-count estimate for a candidate transaction. Nothing is
serialized or sent, so the dynamic sizer can call this once per trial.
*/

use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use std::collections::HashSet;

/// Maximum serialized transaction size (1280 MTU - 40 IPv6 header - 8 fragment header)
pub const MAX_TRANSACTION_SIZE_BYTES: usize = 1232;

/// Maximum number of unique accounts a legacy transaction may lock
pub const MAX_UNIQUE_ACCOUNTS: usize = 64;

const SIGNATURE_SIZE: usize = 64;
const ACCOUNT_KEY_SIZE: usize = 32;
const INSTRUCTION_OVERHEAD: usize = 4;
const ACCOUNT_REFERENCE_SIZE: usize = 1;
const FIXED_OVERHEAD: usize = 100;

/// Ceilings a transaction is checked against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionLimits {
    pub max_size_bytes: usize,
    pub max_unique_accounts: usize,
}

impl Default for TransactionLimits {
    fn default() -> Self {
        Self {
            max_size_bytes: MAX_TRANSACTION_SIZE_BYTES,
            max_unique_accounts: MAX_UNIQUE_ACCOUNTS,
        }
    }
}

/// Result of [`estimate_transaction_limits`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitsReport {
    pub can_fit: bool,
    pub estimated_size_bytes: usize,
    pub unique_account_count: usize,
    pub reasons: Vec<String>,
}

/// Estimate the size and account count of a transaction built from
/// `instructions` and signed by `signers`, against the protocol ceilings.
pub fn estimate_transaction_limits(instructions: &[Instruction], signers: &[Pubkey]) -> LimitsReport {
    TransactionLimits::default().check(instructions, signers)
}

impl TransactionLimits {
    pub fn check(&self, instructions: &[Instruction], signers: &[Pubkey]) -> LimitsReport {
        let mut accounts: HashSet<Pubkey> = signers.iter().copied().collect();
        for ix in instructions {
            accounts.insert(ix.program_id);
            accounts.extend(ix.accounts.iter().map(|meta| meta.pubkey));
        }
        let unique_account_count = accounts.len();

        let instruction_bytes: usize = instructions
            .iter()
            .map(|ix| ix.data.len() + INSTRUCTION_OVERHEAD)
            .sum();
        let reference_bytes: usize = instructions
            .iter()
            .map(|ix| ix.accounts.len() * ACCOUNT_REFERENCE_SIZE)
            .sum();

        let estimated_size_bytes = signers.len() * SIGNATURE_SIZE
            + unique_account_count * ACCOUNT_KEY_SIZE
            + instruction_bytes
            + reference_bytes
            + FIXED_OVERHEAD;

        let mut reasons = Vec::new();
        if estimated_size_bytes > self.max_size_bytes {
            reasons.push(format!(
                "estimated size {} bytes exceeds limit of {} bytes",
                estimated_size_bytes, self.max_size_bytes
            ));
        }
        if unique_account_count > self.max_unique_accounts {
            reasons.push(format!(
                "{} unique accounts exceeds limit of {}",
                unique_account_count, self.max_unique_accounts
            ));
        }

        LimitsReport {
            can_fit: reasons.is_empty(),
            estimated_size_bytes,
            unique_account_count,
            reasons,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::{instruction::AccountMeta, system_instruction};

    #[test]
    fn test_single_system_transfer() {
        let from = Pubkey::new_unique();
        let to = Pubkey::new_unique();
        let ix = system_instruction::transfer(&from, &to, 1);

        let report = estimate_transaction_limits(&[ix], &[from]);

        // from, to, system program
        assert_eq!(report.unique_account_count, 3);
        // 64 + 3*32 + (12 + 4) + 2 + 100
        assert_eq!(report.estimated_size_bytes, 278);
        assert!(report.can_fit);
        assert!(report.reasons.is_empty());
    }

    #[test]
    fn test_signers_counted_once_as_accounts() {
        let signer = Pubkey::new_unique();
        let ix = system_instruction::transfer(&signer, &Pubkey::new_unique(), 1);

        let report = estimate_transaction_limits(&[ix.clone(), ix], &[signer]);
        assert_eq!(report.unique_account_count, 3);
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let signer = Pubkey::new_unique();
        let ix = Instruction::new_with_bytes(
            Pubkey::new_unique(),
            &[7u8; 1100],
            vec![AccountMeta::new(signer, true)],
        );

        let report = estimate_transaction_limits(&[ix], &[signer]);
        assert!(!report.can_fit);
        assert_eq!(report.reasons.len(), 1);
        assert!(report.reasons[0].contains("exceeds limit of 1232"));
    }

    #[test]
    fn test_too_many_accounts_rejected() {
        let signer = Pubkey::new_unique();
        let metas: Vec<_> = (0..70)
            .map(|_| AccountMeta::new_readonly(Pubkey::new_unique(), false))
            .collect();
        let ix = Instruction::new_with_bytes(Pubkey::new_unique(), &[], metas);

        let report = estimate_transaction_limits(&[ix], &[signer]);
        assert!(!report.can_fit);
        assert_eq!(report.unique_account_count, 72);
        // both the size and the account ceiling are violated
        assert_eq!(report.reasons.len(), 2);
    }

    #[test]
    fn test_custom_limits() {
        let signer = Pubkey::new_unique();
        let ix = system_instruction::transfer(&signer, &Pubkey::new_unique(), 1);
        let tight = TransactionLimits {
            max_size_bytes: 200,
            max_unique_accounts: 2,
        };

        let report = tight.check(&[ix], &[signer]);
        assert!(!report.can_fit);
        assert_eq!(report.reasons.len(), 2);
    }
}
