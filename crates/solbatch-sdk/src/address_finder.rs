use solana_sdk::{pubkey, pubkey::Pubkey, system_program};
use spl_associated_token_account::get_associated_token_address_with_program_id;

pub const BONDING_CURVE_PROGRAM_ID: Pubkey = pubkey!("6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P");
pub const AMM_PROGRAM_ID: Pubkey = pubkey!("pAMMBay6oceH9fJKBRHGP5D4bD4sWpmSwMn52FMfXEA");

pub const GLOBAL_SEED: &[u8] = b"global";
pub const BONDING_CURVE_SEED: &[u8] = b"bonding-curve";
pub const CREATOR_VAULT_SEED: &[u8] = b"creator-vault";
pub const GLOBAL_CONFIG_SEED: &[u8] = b"global_config";
pub const COIN_CREATOR_VAULT_SEED: &[u8] = b"creator_vault";
pub const EVENT_AUTHORITY_SEED: &[u8] = b"__event_authority";

/// Derives every program address the assembler needs
#[derive(Debug, Clone)]
pub struct AddressFinder {
    pub bonding_curve_program_id: Pubkey,
    pub amm_program_id: Pubkey,

    pub associated_token_program_id: Pubkey,
    pub system_program_id: Pubkey,
    pub token_program_id: Pubkey,
}

impl AddressFinder {
    pub fn new(
        bonding_curve_program_id: Pubkey,
        amm_program_id: Pubkey,
        associated_token_program_id: Pubkey,
        system_program_id: Pubkey,
        token_program_id: Pubkey,
    ) -> Self {
        Self {
            bonding_curve_program_id,
            amm_program_id,
            associated_token_program_id,
            system_program_id,
            token_program_id,
        }
    }

    pub fn find_associated_token_address(&self, owner: &Pubkey, mint: &Pubkey) -> Pubkey {
        get_associated_token_address_with_program_id(owner, mint, &self.token_program_id)
    }

    // ================================================================================================
    // Bonding curve program
    // ================================================================================================

    pub fn find_global_address(&self) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[GLOBAL_SEED], &self.bonding_curve_program_id)
    }

    pub fn find_bonding_curve_address(&self, mint: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(
            &[BONDING_CURVE_SEED, mint.as_ref()],
            &self.bonding_curve_program_id,
        )
    }

    /// The curve's own token account for `mint`
    pub fn find_associated_bonding_curve_address(&self, mint: &Pubkey) -> Pubkey {
        let (bonding_curve, _) = self.find_bonding_curve_address(mint);
        self.find_associated_token_address(&bonding_curve, mint)
    }

    pub fn find_creator_vault_address(&self, creator: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(
            &[CREATOR_VAULT_SEED, creator.as_ref()],
            &self.bonding_curve_program_id,
        )
    }

    pub fn find_bonding_curve_event_authority_address(&self) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[EVENT_AUTHORITY_SEED], &self.bonding_curve_program_id)
    }

    // ================================================================================================
    // AMM program
    // ================================================================================================

    pub fn find_global_config_address(&self) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[GLOBAL_CONFIG_SEED], &self.amm_program_id)
    }

    pub fn find_coin_creator_vault_authority_address(&self, coin_creator: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(
            &[COIN_CREATOR_VAULT_SEED, coin_creator.as_ref()],
            &self.amm_program_id,
        )
    }

    pub fn find_amm_event_authority_address(&self) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[EVENT_AUTHORITY_SEED], &self.amm_program_id)
    }
}

impl Default for AddressFinder {
    fn default() -> Self {
        Self::new(
            BONDING_CURVE_PROGRAM_ID,
            AMM_PROGRAM_ID,
            spl_associated_token_account::ID,
            system_program::ID,
            spl_token::ID,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdas_are_deterministic_and_distinct() {
        let finder = AddressFinder::default();
        let mint = Pubkey::new_unique();
        let creator = Pubkey::new_unique();

        assert_eq!(
            finder.find_bonding_curve_address(&mint),
            finder.find_bonding_curve_address(&mint)
        );
        assert_ne!(
            finder.find_bonding_curve_address(&mint).0,
            finder.find_bonding_curve_address(&Pubkey::new_unique()).0
        );
        // same seed prefix on different programs
        assert_ne!(
            finder.find_bonding_curve_event_authority_address().0,
            finder.find_amm_event_authority_address().0
        );
        assert_ne!(
            finder.find_creator_vault_address(&creator).0,
            finder.find_coin_creator_vault_authority_address(&creator).0
        );
    }

    #[test]
    fn test_associated_bonding_curve_is_curve_ata() {
        let finder = AddressFinder::default();
        let mint = Pubkey::new_unique();
        let (curve, _) = finder.find_bonding_curve_address(&mint);

        assert_eq!(
            finder.find_associated_bonding_curve_address(&mint),
            spl_associated_token_account::get_associated_token_address(&curve, &mint)
        );
    }
}
