/*!
# Program Instruction Assembler

Turns one [`Operation`] into the instructions that carry it out, reading the
program accounts each trade needs through the ledger.
*/

use crate::{
    accounts::{BondingCurve, Global, GlobalConfig, Pool, ProgramAccount},
    instruction_builders::*,
    AddressFinder,
};
use async_trait::async_trait;
use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use solbatch_batch_tx::{
    AssemblyError, InstructionAssembler, LedgerClient, Operation, OperationParams, SlippageQuote,
};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct ProgramInstructionAssembler {
    ledger: Arc<dyn LedgerClient>,
    address_finder: AddressFinder,
}

impl ProgramInstructionAssembler {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self::with_address_finder(ledger, AddressFinder::default())
    }

    pub fn with_address_finder(ledger: Arc<dyn LedgerClient>, address_finder: AddressFinder) -> Self {
        Self {
            ledger,
            address_finder,
        }
    }

    pub fn address_finder(&self) -> &AddressFinder {
        &self.address_finder
    }

    async fn fetch<T: ProgramAccount>(&self, address: &Pubkey) -> Result<T, AssemblyError> {
        let account = self
            .ledger
            .get_account(address)
            .await
            .map_err(|e| AssemblyError::Ledger(e.to_string()))?
            .ok_or(AssemblyError::AccountNotFound(*address))?;
        T::try_from_account_data(address, &account.data)
    }

    /// Curve state plus the program fee recipient; refuses a migrated curve
    async fn tradable_curve(&self, mint: &Pubkey) -> Result<(BondingCurve, Global), AssemblyError> {
        let (curve_address, _) = self.address_finder.find_bonding_curve_address(mint);
        let curve: BondingCurve = self.fetch(&curve_address).await?;
        if curve.complete {
            return Err(AssemblyError::CurveComplete(*mint));
        }
        let (global_address, _) = self.address_finder.find_global_address();
        let global: Global = self.fetch(&global_address).await?;
        Ok((curve, global))
    }

    async fn pool_with_fee_recipient(
        &self,
        pool_address: &Pubkey,
    ) -> Result<(Pool, Pubkey), AssemblyError> {
        let pool: Pool = self.fetch(pool_address).await?;
        let (config_address, _) = self.address_finder.find_global_config_address();
        let config: GlobalConfig = self.fetch(&config_address).await?;
        let fee_recipient =
            config
                .protocol_fee_recipient()
                .ok_or_else(|| AssemblyError::InvalidAccountData {
                    address: config_address,
                    reason: "no protocol fee recipient configured".to_string(),
                })?;
        Ok((pool, fee_recipient))
    }

    async fn buy_bonding_curve(
        &self,
        operation: &Operation,
        sender: &Pubkey,
        rent_payer: &Pubkey,
        mint: &Pubkey,
        token_amount: u64,
        quote: Option<&SlippageQuote>,
    ) -> Result<Vec<Instruction>, AssemblyError> {
        let (curve, global) = self.tradable_curve(mint).await?;
        let max_sol_cost = max_in_or_unbounded(operation, quote);

        let (trade_ix, _, _) = build_bonding_curve_buy_ix(
            &self.address_finder,
            sender,
            mint,
            &curve.creator,
            &global.fee_recipient,
            BondingCurveBuyArgs {
                amount: token_amount,
                max_sol_cost,
            },
        )?;
        Ok(vec![
            build_create_ata_ix(&self.address_finder, rent_payer, sender, mint),
            trade_ix,
        ])
    }

    async fn sell_bonding_curve(
        &self,
        operation: &Operation,
        sender: &Pubkey,
        mint: &Pubkey,
        token_amount: u64,
        quote: Option<&SlippageQuote>,
    ) -> Result<Vec<Instruction>, AssemblyError> {
        let (curve, global) = self.tradable_curve(mint).await?;
        let min_sol_output = min_out_or_zero(operation, quote);

        let (trade_ix, _, _) = build_bonding_curve_sell_ix(
            &self.address_finder,
            sender,
            mint,
            &curve.creator,
            &global.fee_recipient,
            BondingCurveSellArgs {
                amount: token_amount,
                min_sol_output,
            },
        )?;
        Ok(vec![trade_ix])
    }

    async fn buy_amm(
        &self,
        operation: &Operation,
        sender: &Pubkey,
        rent_payer: &Pubkey,
        pool_address: &Pubkey,
        base_amount: u64,
        quote: Option<&SlippageQuote>,
    ) -> Result<Vec<Instruction>, AssemblyError> {
        let (pool, fee_recipient) = self.pool_with_fee_recipient(pool_address).await?;
        let native_quote = pool.quote_mint == spl_token::native_mint::ID;

        // Wrapping needs a bounded amount of lamports
        if native_quote && quote.is_none() {
            return Err(AssemblyError::MissingParameter(format!(
                "quoteAmount (operation {} buys against a native SOL pool)",
                operation.id
            )));
        }
        let max_quote_amount_in = max_in_or_unbounded(operation, quote);

        let mut instructions = vec![
            build_create_ata_ix(&self.address_finder, rent_payer, sender, &pool.base_mint),
            build_create_ata_ix(&self.address_finder, rent_payer, sender, &pool.quote_mint),
        ];
        if native_quote {
            instructions.extend(build_wrap_sol_ixs(
                &self.address_finder,
                sender,
                max_quote_amount_in,
            )?);
        }
        let (trade_ix, _, _) = build_amm_buy_ix(
            &self.address_finder,
            sender,
            pool_address,
            &pool,
            &fee_recipient,
            AmmBuyArgs {
                base_amount_out: base_amount,
                max_quote_amount_in,
            },
        )?;
        instructions.push(trade_ix);
        Ok(instructions)
    }

    async fn sell_amm(
        &self,
        operation: &Operation,
        sender: &Pubkey,
        rent_payer: &Pubkey,
        pool_address: &Pubkey,
        base_amount: u64,
        quote: Option<&SlippageQuote>,
    ) -> Result<Vec<Instruction>, AssemblyError> {
        let (pool, fee_recipient) = self.pool_with_fee_recipient(pool_address).await?;
        let min_quote_amount_out = min_out_or_zero(operation, quote);

        let (trade_ix, _, _) = build_amm_sell_ix(
            &self.address_finder,
            sender,
            pool_address,
            &pool,
            &fee_recipient,
            AmmSellArgs {
                base_amount_in: base_amount,
                min_quote_amount_out,
            },
        )?;
        Ok(vec![
            build_create_ata_ix(&self.address_finder, rent_payer, sender, &pool.quote_mint),
            trade_ix,
        ])
    }
}

fn max_in_or_unbounded(operation: &Operation, quote: Option<&SlippageQuote>) -> u64 {
    match quote {
        Some(quote) => quote.max_in(),
        None => {
            warn!(
                "Operation {} has no quote; sending without a cost ceiling",
                operation.id
            );
            u64::MAX
        }
    }
}

fn min_out_or_zero(operation: &Operation, quote: Option<&SlippageQuote>) -> u64 {
    match quote {
        Some(quote) => quote.min_out(),
        None => {
            warn!(
                "Operation {} has no quote; sending without a minimum output",
                operation.id
            );
            0
        }
    }
}

#[async_trait]
impl InstructionAssembler for ProgramInstructionAssembler {
    async fn build_instructions(
        &self,
        operation: &Operation,
        sender: &Pubkey,
        fee_payer: Option<&Pubkey>,
    ) -> Result<Vec<Instruction>, AssemblyError> {
        debug!(
            "Assembling {} operation {}",
            operation.operation_type(),
            operation.id
        );
        let rent_payer = fee_payer.unwrap_or(sender);

        match &operation.params {
            OperationParams::Transfer {
                recipient,
                mint,
                amount,
            } => Ok(build_token_transfer_ixs(
                &self.address_finder,
                sender,
                recipient,
                mint,
                *amount,
                rent_payer,
            )?),
            OperationParams::SolTransfer {
                recipient,
                lamports,
            } => Ok(vec![build_sol_transfer_ix(sender, recipient, *lamports)]),
            OperationParams::BuyBondingCurve {
                mint,
                token_amount,
                quote,
            } => {
                self.buy_bonding_curve(
                    operation,
                    sender,
                    rent_payer,
                    mint,
                    *token_amount,
                    quote.as_ref(),
                )
                .await
            }
            OperationParams::SellBondingCurve {
                mint,
                token_amount,
                quote,
            } => {
                self.sell_bonding_curve(operation, sender, mint, *token_amount, quote.as_ref())
                    .await
            }
            OperationParams::BuyAmm {
                pool,
                base_amount,
                quote,
            } => {
                self.buy_amm(
                    operation,
                    sender,
                    rent_payer,
                    pool,
                    *base_amount,
                    quote.as_ref(),
                )
                .await
            }
            OperationParams::SellAmm {
                pool,
                base_amount,
                quote,
            } => {
                self.sell_amm(
                    operation,
                    sender,
                    rent_payer,
                    pool,
                    *base_amount,
                    quote.as_ref(),
                )
                .await
            }
        }
    }
}
