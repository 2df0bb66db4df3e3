/*!
# On-chain Account Decoding

Anchor accounts start with an 8-byte discriminator, `sha256("account:<Name>")[..8]`,
followed by the borsh-encoded fields. Only the leading fields the assembler
reads are decoded; trailing bytes are ignored.
*/

use borsh::BorshDeserialize;
use sha2::{Digest, Sha256};
use solana_sdk::pubkey::Pubkey;
use solbatch_batch_tx::AssemblyError;

pub const DISCRIMINATOR_LEN: usize = 8;

fn sighash(namespace: &str, name: &str) -> [u8; DISCRIMINATOR_LEN] {
    let digest = Sha256::digest(format!("{}:{}", namespace, name).as_bytes());
    let mut discriminator = [0u8; DISCRIMINATOR_LEN];
    discriminator.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
    discriminator
}

pub fn account_discriminator(name: &str) -> [u8; DISCRIMINATOR_LEN] {
    sighash("account", name)
}

pub fn instruction_discriminator(name: &str) -> [u8; DISCRIMINATOR_LEN] {
    sighash("global", name)
}

/// An anchor account the assembler knows how to read
pub trait ProgramAccount: Sized {
    const NAME: &'static str;

    fn decode_fields(data: &mut &[u8]) -> std::io::Result<Self>;

    fn try_from_account_data(address: &Pubkey, data: &[u8]) -> Result<Self, AssemblyError> {
        let invalid = |reason: String| AssemblyError::InvalidAccountData {
            address: *address,
            reason,
        };

        if data.len() < DISCRIMINATOR_LEN {
            return Err(invalid(format!(
                "{} bytes is too short for a {} account",
                data.len(),
                Self::NAME
            )));
        }
        let (discriminator, mut fields) = data.split_at(DISCRIMINATOR_LEN);
        if discriminator != account_discriminator(Self::NAME) {
            return Err(invalid(format!("not a {} account", Self::NAME)));
        }
        Self::decode_fields(&mut fields).map_err(|e| invalid(e.to_string()))
    }
}

// ================================================================================================
// Bonding curve program
// ================================================================================================

#[derive(BorshDeserialize)]
struct GlobalLayout {
    initialized: bool,
    authority: [u8; 32],
    fee_recipient: [u8; 32],
}

/// Bonding-curve program settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Global {
    pub initialized: bool,
    pub authority: Pubkey,
    pub fee_recipient: Pubkey,
}

impl ProgramAccount for Global {
    const NAME: &'static str = "Global";

    fn decode_fields(data: &mut &[u8]) -> std::io::Result<Self> {
        let layout = GlobalLayout::deserialize(data)?;
        Ok(Self {
            initialized: layout.initialized,
            authority: Pubkey::new_from_array(layout.authority),
            fee_recipient: Pubkey::new_from_array(layout.fee_recipient),
        })
    }
}

#[derive(BorshDeserialize)]
struct BondingCurveLayout {
    virtual_token_reserves: u64,
    virtual_sol_reserves: u64,
    real_token_reserves: u64,
    real_sol_reserves: u64,
    token_total_supply: u64,
    complete: bool,
    creator: [u8; 32],
}

/// Per-mint curve state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BondingCurve {
    pub virtual_token_reserves: u64,
    pub virtual_sol_reserves: u64,
    pub real_token_reserves: u64,
    pub real_sol_reserves: u64,
    pub token_total_supply: u64,
    /// Set once the curve migrated; trading continues on the AMM
    pub complete: bool,
    pub creator: Pubkey,
}

impl ProgramAccount for BondingCurve {
    const NAME: &'static str = "BondingCurve";

    fn decode_fields(data: &mut &[u8]) -> std::io::Result<Self> {
        let layout = BondingCurveLayout::deserialize(data)?;
        Ok(Self {
            virtual_token_reserves: layout.virtual_token_reserves,
            virtual_sol_reserves: layout.virtual_sol_reserves,
            real_token_reserves: layout.real_token_reserves,
            real_sol_reserves: layout.real_sol_reserves,
            token_total_supply: layout.token_total_supply,
            complete: layout.complete,
            creator: Pubkey::new_from_array(layout.creator),
        })
    }
}

// ================================================================================================
// AMM program
// ================================================================================================

#[derive(BorshDeserialize)]
struct PoolLayout {
    pool_bump: u8,
    index: u16,
    creator: [u8; 32],
    base_mint: [u8; 32],
    quote_mint: [u8; 32],
    lp_mint: [u8; 32],
    pool_base_token_account: [u8; 32],
    pool_quote_token_account: [u8; 32],
    lp_supply: u64,
    coin_creator: [u8; 32],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pool {
    pub pool_bump: u8,
    pub index: u16,
    pub creator: Pubkey,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub lp_mint: Pubkey,
    pub pool_base_token_account: Pubkey,
    pub pool_quote_token_account: Pubkey,
    pub lp_supply: u64,
    pub coin_creator: Pubkey,
}

impl ProgramAccount for Pool {
    const NAME: &'static str = "Pool";

    fn decode_fields(data: &mut &[u8]) -> std::io::Result<Self> {
        let layout = PoolLayout::deserialize(data)?;
        Ok(Self {
            pool_bump: layout.pool_bump,
            index: layout.index,
            creator: Pubkey::new_from_array(layout.creator),
            base_mint: Pubkey::new_from_array(layout.base_mint),
            quote_mint: Pubkey::new_from_array(layout.quote_mint),
            lp_mint: Pubkey::new_from_array(layout.lp_mint),
            pool_base_token_account: Pubkey::new_from_array(layout.pool_base_token_account),
            pool_quote_token_account: Pubkey::new_from_array(layout.pool_quote_token_account),
            lp_supply: layout.lp_supply,
            coin_creator: Pubkey::new_from_array(layout.coin_creator),
        })
    }
}

pub const PROTOCOL_FEE_RECIPIENT_COUNT: usize = 8;

#[derive(BorshDeserialize)]
struct GlobalConfigLayout {
    admin: [u8; 32],
    lp_fee_basis_points: u64,
    protocol_fee_basis_points: u64,
    disable_flags: u8,
    protocol_fee_recipients: [[u8; 32]; PROTOCOL_FEE_RECIPIENT_COUNT],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalConfig {
    pub admin: Pubkey,
    pub lp_fee_basis_points: u64,
    pub protocol_fee_basis_points: u64,
    pub disable_flags: u8,
    pub protocol_fee_recipients: [Pubkey; PROTOCOL_FEE_RECIPIENT_COUNT],
}

impl GlobalConfig {
    /// First configured recipient; unused slots are the default key
    pub fn protocol_fee_recipient(&self) -> Option<Pubkey> {
        self.protocol_fee_recipients
            .iter()
            .copied()
            .find(|recipient| *recipient != Pubkey::default())
    }
}

impl ProgramAccount for GlobalConfig {
    const NAME: &'static str = "GlobalConfig";

    fn decode_fields(data: &mut &[u8]) -> std::io::Result<Self> {
        let layout = GlobalConfigLayout::deserialize(data)?;
        Ok(Self {
            admin: Pubkey::new_from_array(layout.admin),
            lp_fee_basis_points: layout.lp_fee_basis_points,
            protocol_fee_basis_points: layout.protocol_fee_basis_points,
            disable_flags: layout.disable_flags,
            protocol_fee_recipients: layout.protocol_fee_recipients.map(Pubkey::new_from_array),
        })
    }
}


#[cfg(test)]
mod tests {
    use super::{fixtures::*, *};

    #[test]
    fn test_discriminators() {
        assert_ne!(account_discriminator("Pool"), account_discriminator("GlobalConfig"));
        assert_ne!(instruction_discriminator("buy"), account_discriminator("buy"));
        // well-known anchor sighash of `global:buy`
        assert_eq!(
            instruction_discriminator("buy"),
            [102, 6, 61, 18, 1, 218, 235, 234]
        );
    }

    #[test]
    fn test_decode_bonding_curve() {
        let creator = Pubkey::new_unique();
        let curve = BondingCurve::try_from_account_data(
            &Pubkey::new_unique(),
            &bonding_curve_data(true, &creator),
        )
        .unwrap();

        assert!(curve.complete);
        assert_eq!(curve.creator, creator);
        assert_eq!(curve.virtual_sol_reserves, 30_000_000_000);
    }

    #[test]
    fn test_decode_global_ignores_trailing_fields() {
        let fee_recipient = Pubkey::new_unique();
        let global =
            Global::try_from_account_data(&Pubkey::new_unique(), &global_data(&fee_recipient)).unwrap();
        assert!(global.initialized);
        assert_eq!(global.fee_recipient, fee_recipient);
    }

    #[test]
    fn test_decode_pool_and_config() {
        let pool = Pool {
            pool_bump: 254,
            index: 0,
            creator: Pubkey::new_unique(),
            base_mint: Pubkey::new_unique(),
            quote_mint: spl_token::native_mint::ID,
            lp_mint: Pubkey::new_unique(),
            pool_base_token_account: Pubkey::new_unique(),
            pool_quote_token_account: Pubkey::new_unique(),
            lp_supply: 42,
            coin_creator: Pubkey::new_unique(),
        };
        let address = Pubkey::new_unique();
        assert_eq!(Pool::try_from_account_data(&address, &pool_data(&pool)).unwrap(), pool);

        let recipient = Pubkey::new_unique();
        let config =
            GlobalConfig::try_from_account_data(&address, &global_config_data(&recipient)).unwrap();
        assert_eq!(config.protocol_fee_recipient(), Some(recipient));
        assert_eq!(config.lp_fee_basis_points, 20);
    }

    #[test]
    fn test_rejects_wrong_discriminator_and_short_data() {
        let address = Pubkey::new_unique();
        let curve_bytes = bonding_curve_data(false, &Pubkey::new_unique());

        assert!(matches!(
            Pool::try_from_account_data(&address, &curve_bytes),
            Err(AssemblyError::InvalidAccountData { reason, .. }) if reason.contains("not a Pool")
        ));
        assert!(matches!(
            BondingCurve::try_from_account_data(&address, &curve_bytes[..20]),
            Err(AssemblyError::InvalidAccountData { .. })
        ));
        assert!(matches!(
            BondingCurve::try_from_account_data(&address, &[0u8; 4]),
            Err(AssemblyError::InvalidAccountData { reason, .. }) if reason.contains("too short")
        ));
    }
}
