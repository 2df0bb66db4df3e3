use crate::{error::AssemblyError, operation::Operation};
use async_trait::async_trait;
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};

/// Turns one operation into the ordered instructions that perform it.
///
/// Implementations may read accounts from the network to resolve derived
/// addresses, and must not sign anything. `fee_payer` is the shared fee payer
/// when the caller configured one, so rent for created accounts can be charged
/// to it instead of the sender.
#[async_trait]
pub trait InstructionAssembler: Send + Sync {
    async fn build_instructions(
        &self,
        operation: &Operation,
        sender: &Pubkey,
        fee_payer: Option<&Pubkey>,
    ) -> Result<Vec<Instruction>, AssemblyError>;
}
