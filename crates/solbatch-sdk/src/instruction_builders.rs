use crate::{accounts::instruction_discriminator, accounts::Pool, AddressFinder};
use borsh::BorshSerialize;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_instruction,
};
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;

/// Borsh-encoded anchor instruction arguments
pub trait InstructionArgs: BorshSerialize {
    const NAME: &'static str;

    fn data(&self) -> Result<Vec<u8>, ProgramError> {
        let mut data = instruction_discriminator(Self::NAME).to_vec();
        self.serialize(&mut data)
            .map_err(|e| ProgramError::BorshIoError(e.to_string()))?;
        Ok(data)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize)]
pub struct BondingCurveBuyArgs {
    pub amount: u64,
    pub max_sol_cost: u64,
}

impl InstructionArgs for BondingCurveBuyArgs {
    const NAME: &'static str = "buy";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize)]
pub struct BondingCurveSellArgs {
    pub amount: u64,
    pub min_sol_output: u64,
}

impl InstructionArgs for BondingCurveSellArgs {
    const NAME: &'static str = "sell";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize)]
pub struct AmmBuyArgs {
    pub base_amount_out: u64,
    pub max_quote_amount_in: u64,
}

impl InstructionArgs for AmmBuyArgs {
    const NAME: &'static str = "buy";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, BorshSerialize)]
pub struct AmmSellArgs {
    pub base_amount_in: u64,
    pub min_quote_amount_out: u64,
}

impl InstructionArgs for AmmSellArgs {
    const NAME: &'static str = "sell";
}

// ================================================================================================
// Transfers
// ================================================================================================

pub fn build_sol_transfer_ix(sender: &Pubkey, recipient: &Pubkey, lamports: u64) -> Instruction {
    system_instruction::transfer(sender, recipient, lamports)
}

/// Idempotent ATA create; a no-op on-chain when the account already exists
pub fn build_create_ata_ix(
    address_finder: &AddressFinder,
    rent_payer: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
) -> Instruction {
    create_associated_token_account_idempotent(
        rent_payer,
        owner,
        mint,
        &address_finder.token_program_id,
    )
}

/// Create the recipient's token account if needed, then move `amount` from
/// the sender's token account
pub fn build_token_transfer_ixs(
    address_finder: &AddressFinder,
    sender: &Pubkey,
    recipient: &Pubkey,
    mint: &Pubkey,
    amount: u64,
    rent_payer: &Pubkey,
) -> Result<Vec<Instruction>, ProgramError> {
    let source = address_finder.find_associated_token_address(sender, mint);
    let destination = address_finder.find_associated_token_address(recipient, mint);

    Ok(vec![
        build_create_ata_ix(address_finder, rent_payer, recipient, mint),
        spl_token::instruction::transfer(
            &address_finder.token_program_id,
            &source,
            &destination,
            sender,
            &[],
            amount,
        )?,
    ])
}

/// Fund the owner's wrapped-SOL account with `lamports` and resync its balance
pub fn build_wrap_sol_ixs(
    address_finder: &AddressFinder,
    owner: &Pubkey,
    lamports: u64,
) -> Result<Vec<Instruction>, ProgramError> {
    let wsol_account =
        address_finder.find_associated_token_address(owner, &spl_token::native_mint::ID);
    Ok(vec![
        system_instruction::transfer(owner, &wsol_account, lamports),
        spl_token::instruction::sync_native(&address_finder.token_program_id, &wsol_account)?,
    ])
}

// ================================================================================================
// Bonding curve program
// ================================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BondingCurveTradeAccounts {
    pub global: Pubkey,
    pub fee_recipient: Pubkey,
    pub mint: Pubkey,
    pub bonding_curve: Pubkey,
    pub associated_bonding_curve: Pubkey,
    pub associated_user: Pubkey,
    pub user: Pubkey,
    pub system_program: Pubkey,
    pub token_program: Pubkey,
    pub creator_vault: Pubkey,
    pub event_authority: Pubkey,
    pub program: Pubkey,
}

impl BondingCurveTradeAccounts {
    pub fn new(
        address_finder: &AddressFinder,
        user: &Pubkey,
        mint: &Pubkey,
        creator: &Pubkey,
        fee_recipient: &Pubkey,
    ) -> Self {
        let (bonding_curve, _) = address_finder.find_bonding_curve_address(mint);
        Self {
            global: address_finder.find_global_address().0,
            fee_recipient: *fee_recipient,
            mint: *mint,
            bonding_curve,
            associated_bonding_curve: address_finder.find_associated_bonding_curve_address(mint),
            associated_user: address_finder.find_associated_token_address(user, mint),
            user: *user,
            system_program: address_finder.system_program_id,
            token_program: address_finder.token_program_id,
            creator_vault: address_finder.find_creator_vault_address(creator).0,
            event_authority: address_finder.find_bonding_curve_event_authority_address().0,
            program: address_finder.bonding_curve_program_id,
        }
    }

    fn leading_metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new_readonly(self.global, false),
            AccountMeta::new(self.fee_recipient, false),
            AccountMeta::new_readonly(self.mint, false),
            AccountMeta::new(self.bonding_curve, false),
            AccountMeta::new(self.associated_bonding_curve, false),
            AccountMeta::new(self.associated_user, false),
            AccountMeta::new(self.user, true),
            AccountMeta::new_readonly(self.system_program, false),
        ]
    }

    /// Buy order: token program, then creator vault
    pub fn to_buy_account_metas(&self) -> Vec<AccountMeta> {
        let mut metas = self.leading_metas();
        metas.extend([
            AccountMeta::new_readonly(self.token_program, false),
            AccountMeta::new(self.creator_vault, false),
            AccountMeta::new_readonly(self.event_authority, false),
            AccountMeta::new_readonly(self.program, false),
        ]);
        metas
    }

    /// Sell order: creator vault, then token program
    pub fn to_sell_account_metas(&self) -> Vec<AccountMeta> {
        let mut metas = self.leading_metas();
        metas.extend([
            AccountMeta::new(self.creator_vault, false),
            AccountMeta::new_readonly(self.token_program, false),
            AccountMeta::new_readonly(self.event_authority, false),
            AccountMeta::new_readonly(self.program, false),
        ]);
        metas
    }
}

pub fn build_bonding_curve_buy_ix(
    address_finder: &AddressFinder,
    user: &Pubkey,
    mint: &Pubkey,
    creator: &Pubkey,
    fee_recipient: &Pubkey,
    args: BondingCurveBuyArgs,
) -> Result<(Instruction, BondingCurveTradeAccounts, BondingCurveBuyArgs), ProgramError> {
    let ix_accounts =
        BondingCurveTradeAccounts::new(address_finder, user, mint, creator, fee_recipient);

    let ix = Instruction {
        program_id: address_finder.bonding_curve_program_id,
        accounts: ix_accounts.to_buy_account_metas(),
        data: args.data()?,
    };

    Ok((ix, ix_accounts, args))
}

pub fn build_bonding_curve_sell_ix(
    address_finder: &AddressFinder,
    user: &Pubkey,
    mint: &Pubkey,
    creator: &Pubkey,
    fee_recipient: &Pubkey,
    args: BondingCurveSellArgs,
) -> Result<(Instruction, BondingCurveTradeAccounts, BondingCurveSellArgs), ProgramError> {
    let ix_accounts =
        BondingCurveTradeAccounts::new(address_finder, user, mint, creator, fee_recipient);

    let ix = Instruction {
        program_id: address_finder.bonding_curve_program_id,
        accounts: ix_accounts.to_sell_account_metas(),
        data: args.data()?,
    };

    Ok((ix, ix_accounts, args))
}

// ================================================================================================
// AMM program
// ================================================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmmTradeAccounts {
    pub pool: Pubkey,
    pub user: Pubkey,
    pub global_config: Pubkey,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
    pub user_base_token_account: Pubkey,
    pub user_quote_token_account: Pubkey,
    pub pool_base_token_account: Pubkey,
    pub pool_quote_token_account: Pubkey,
    pub protocol_fee_recipient: Pubkey,
    pub protocol_fee_recipient_token_account: Pubkey,
    pub base_token_program: Pubkey,
    pub quote_token_program: Pubkey,
    pub system_program: Pubkey,
    pub associated_token_program: Pubkey,
    pub event_authority: Pubkey,
    pub program: Pubkey,
    pub coin_creator_vault_ata: Pubkey,
    pub coin_creator_vault_authority: Pubkey,
}

impl AmmTradeAccounts {
    pub fn new(
        address_finder: &AddressFinder,
        user: &Pubkey,
        pool_address: &Pubkey,
        pool: &Pool,
        protocol_fee_recipient: &Pubkey,
    ) -> Self {
        let (coin_creator_vault_authority, _) =
            address_finder.find_coin_creator_vault_authority_address(&pool.coin_creator);
        Self {
            pool: *pool_address,
            user: *user,
            global_config: address_finder.find_global_config_address().0,
            base_mint: pool.base_mint,
            quote_mint: pool.quote_mint,
            user_base_token_account: address_finder
                .find_associated_token_address(user, &pool.base_mint),
            user_quote_token_account: address_finder
                .find_associated_token_address(user, &pool.quote_mint),
            pool_base_token_account: pool.pool_base_token_account,
            pool_quote_token_account: pool.pool_quote_token_account,
            protocol_fee_recipient: *protocol_fee_recipient,
            protocol_fee_recipient_token_account: address_finder
                .find_associated_token_address(protocol_fee_recipient, &pool.quote_mint),
            base_token_program: address_finder.token_program_id,
            quote_token_program: address_finder.token_program_id,
            system_program: address_finder.system_program_id,
            associated_token_program: address_finder.associated_token_program_id,
            event_authority: address_finder.find_amm_event_authority_address().0,
            program: address_finder.amm_program_id,
            coin_creator_vault_ata: address_finder
                .find_associated_token_address(&coin_creator_vault_authority, &pool.quote_mint),
            coin_creator_vault_authority,
        }
    }

    pub fn to_account_metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.pool, false),
            AccountMeta::new(self.user, true),
            AccountMeta::new_readonly(self.global_config, false),
            AccountMeta::new_readonly(self.base_mint, false),
            AccountMeta::new_readonly(self.quote_mint, false),
            AccountMeta::new(self.user_base_token_account, false),
            AccountMeta::new(self.user_quote_token_account, false),
            AccountMeta::new(self.pool_base_token_account, false),
            AccountMeta::new(self.pool_quote_token_account, false),
            AccountMeta::new_readonly(self.protocol_fee_recipient, false),
            AccountMeta::new(self.protocol_fee_recipient_token_account, false),
            AccountMeta::new_readonly(self.base_token_program, false),
            AccountMeta::new_readonly(self.quote_token_program, false),
            AccountMeta::new_readonly(self.system_program, false),
            AccountMeta::new_readonly(self.associated_token_program, false),
            AccountMeta::new_readonly(self.event_authority, false),
            AccountMeta::new_readonly(self.program, false),
            AccountMeta::new(self.coin_creator_vault_ata, false),
            AccountMeta::new_readonly(self.coin_creator_vault_authority, false),
        ]
    }
}

pub fn build_amm_buy_ix(
    address_finder: &AddressFinder,
    user: &Pubkey,
    pool_address: &Pubkey,
    pool: &Pool,
    protocol_fee_recipient: &Pubkey,
    args: AmmBuyArgs,
) -> Result<(Instruction, AmmTradeAccounts, AmmBuyArgs), ProgramError> {
    let ix_accounts =
        AmmTradeAccounts::new(address_finder, user, pool_address, pool, protocol_fee_recipient);

    let ix = Instruction {
        program_id: address_finder.amm_program_id,
        accounts: ix_accounts.to_account_metas(),
        data: args.data()?,
    };

    Ok((ix, ix_accounts, args))
}

pub fn build_amm_sell_ix(
    address_finder: &AddressFinder,
    user: &Pubkey,
    pool_address: &Pubkey,
    pool: &Pool,
    protocol_fee_recipient: &Pubkey,
    args: AmmSellArgs,
) -> Result<(Instruction, AmmTradeAccounts, AmmSellArgs), ProgramError> {
    let ix_accounts =
        AmmTradeAccounts::new(address_finder, user, pool_address, pool, protocol_fee_recipient);

    let ix = Instruction {
        program_id: address_finder.amm_program_id,
        accounts: ix_accounts.to_account_metas(),
        data: args.data()?,
    };

    Ok((ix, ix_accounts, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pool() -> Pool {
        Pool {
            pool_bump: 255,
            index: 0,
            creator: Pubkey::new_unique(),
            base_mint: Pubkey::new_unique(),
            quote_mint: spl_token::native_mint::ID,
            lp_mint: Pubkey::new_unique(),
            pool_base_token_account: Pubkey::new_unique(),
            pool_quote_token_account: Pubkey::new_unique(),
            lp_supply: 0,
            coin_creator: Pubkey::new_unique(),
        }
    }

    #[test]
    fn test_args_encoding() {
        let data = BondingCurveBuyArgs {
            amount: 1_000,
            max_sol_cost: 2_000,
        }
        .data()
        .unwrap();

        assert_eq!(data.len(), 24);
        assert_eq!(&data[..8], &instruction_discriminator("buy"));
        assert_eq!(&data[8..16], &1_000u64.to_le_bytes());
        assert_eq!(&data[16..], &2_000u64.to_le_bytes());
    }

    #[test]
    fn test_token_transfer_creates_recipient_account_first() {
        let finder = AddressFinder::default();
        let sender = Pubkey::new_unique();
        let recipient = Pubkey::new_unique();
        let payer = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let ixs = build_token_transfer_ixs(&finder, &sender, &recipient, &mint, 5, &payer).unwrap();

        assert_eq!(ixs.len(), 2);
        assert_eq!(ixs[0].program_id, spl_associated_token_account::ID);
        assert_eq!(ixs[0].accounts[0].pubkey, payer);
        assert!(ixs[0].accounts[0].is_signer);
        assert_eq!(ixs[1].program_id, spl_token::ID);
        assert_eq!(
            ixs[1].accounts[0].pubkey,
            finder.find_associated_token_address(&sender, &mint)
        );
        assert_eq!(
            ixs[1].accounts[1].pubkey,
            finder.find_associated_token_address(&recipient, &mint)
        );
        assert!(ixs[1].accounts.iter().any(|m| m.pubkey == sender && m.is_signer));
    }

    #[test]
    fn test_bonding_curve_account_orders_differ() {
        let finder = AddressFinder::default();
        let user = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let creator = Pubkey::new_unique();
        let fee_recipient = Pubkey::new_unique();

        let (buy, accounts, _) = build_bonding_curve_buy_ix(
            &finder,
            &user,
            &mint,
            &creator,
            &fee_recipient,
            BondingCurveBuyArgs {
                amount: 10,
                max_sol_cost: u64::MAX,
            },
        )
        .unwrap();
        let (sell, _, _) = build_bonding_curve_sell_ix(
            &finder,
            &user,
            &mint,
            &creator,
            &fee_recipient,
            BondingCurveSellArgs {
                amount: 10,
                min_sol_output: 0,
            },
        )
        .unwrap();

        assert_eq!(buy.accounts.len(), 12);
        assert_eq!(sell.accounts.len(), 12);
        assert_eq!(buy.accounts[8].pubkey, accounts.token_program);
        assert_eq!(buy.accounts[9].pubkey, accounts.creator_vault);
        assert_eq!(sell.accounts[8].pubkey, accounts.creator_vault);
        assert_eq!(sell.accounts[9].pubkey, accounts.token_program);

        let signers: Vec<_> = buy.accounts.iter().filter(|m| m.is_signer).collect();
        assert_eq!(signers.len(), 1);
        assert_eq!(signers[0].pubkey, user);
        assert_eq!(&sell.data[..8], &instruction_discriminator("sell"));
    }

    #[test]
    fn test_amm_accounts_follow_pool() {
        let finder = AddressFinder::default();
        let user = Pubkey::new_unique();
        let pool_address = Pubkey::new_unique();
        let pool = sample_pool();
        let fee_recipient = Pubkey::new_unique();

        let (ix, accounts, args) = build_amm_sell_ix(
            &finder,
            &user,
            &pool_address,
            &pool,
            &fee_recipient,
            AmmSellArgs {
                base_amount_in: 7,
                min_quote_amount_out: 3,
            },
        )
        .unwrap();

        assert_eq!(ix.program_id, finder.amm_program_id);
        assert_eq!(ix.accounts.len(), 19);
        assert_eq!(ix.accounts[0].pubkey, pool_address);
        assert_eq!(accounts.pool_quote_token_account, pool.pool_quote_token_account);
        assert_eq!(
            accounts.user_quote_token_account,
            finder.find_associated_token_address(&user, &spl_token::native_mint::ID)
        );
        assert_eq!(args.min_quote_amount_out, 3);
    }

    #[test]
    fn test_wrap_sol() {
        let finder = AddressFinder::default();
        let owner = Pubkey::new_unique();
        let ixs = build_wrap_sol_ixs(&finder, &owner, 1_500).unwrap();

        assert_eq!(ixs.len(), 2);
        assert_eq!(ixs[0].program_id, solana_sdk::system_program::ID);
        assert_eq!(ixs[1].program_id, spl_token::ID);
        assert_eq!(ixs[0].accounts[1].pubkey, ixs[1].accounts[0].pubkey);
    }
}
