/*!
# Operations

Typed model of the on-chain actions a batch is made of. The `type` discriminant
of the loosely typed input becomes the [`OperationParams`] variant, so every
consumer (validator, assembler, sizer) matches exhaustively instead of probing
fields.
*/

use solana_sdk::{pubkey::Pubkey, signature::Keypair};
use std::{fmt, str::FromStr, sync::Arc};

/// Basis points in one whole (100%)
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Closed set of operation kinds the engine knows how to batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationType {
    Transfer,
    SolTransfer,
    BuyBondingCurve,
    SellBondingCurve,
    BuyAmm,
    SellAmm,
}

impl OperationType {
    pub const ALL: [OperationType; 6] = [
        OperationType::Transfer,
        OperationType::SolTransfer,
        OperationType::BuyBondingCurve,
        OperationType::SellBondingCurve,
        OperationType::BuyAmm,
        OperationType::SellAmm,
    ];

    /// Wire name used in operation files
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Transfer => "transfer",
            OperationType::SolTransfer => "sol-transfer",
            OperationType::BuyBondingCurve => "buy-bonding-curve",
            OperationType::SellBondingCurve => "sell-bonding-curve",
            OperationType::BuyAmm => "buy-amm",
            OperationType::SellAmm => "sell-amm",
        }
    }

    /// Parameter keys that must be present for this type
    pub fn required_params(&self) -> &'static [&'static str] {
        match self {
            OperationType::Transfer => &["recipient", "mint", "amount"],
            OperationType::SolTransfer => &["recipient", "amount"],
            OperationType::BuyBondingCurve | OperationType::SellBondingCurve => {
                &["mint", "amount"]
            }
            OperationType::BuyAmm | OperationType::SellAmm => &["poolKey", "amount"],
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown operation type '{}'", s))
    }
}

/// Every wire name in [`OperationType::ALL`]
pub fn valid_type_names() -> Vec<&'static str> {
    OperationType::ALL.iter().map(OperationType::as_str).collect()
}

/// A caller-supplied price quote plus the tolerated deviation from it.
///
/// Deriving the quote is the caller's business; the engine only widens or
/// narrows it into the limit the program enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlippageQuote {
    pub quoted_amount: u64,
    pub slippage_bps: u16,
}

impl SlippageQuote {
    pub fn new(quoted_amount: u64, slippage_bps: u16) -> Self {
        Self {
            quoted_amount,
            slippage_bps,
        }
    }

    /// Most the caller is willing to pay in
    pub fn max_in(&self) -> u64 {
        let scaled = self.quoted_amount as u128 * (BPS_DENOMINATOR + self.slippage_bps as u128)
            / BPS_DENOMINATOR;
        u64::try_from(scaled).unwrap_or(u64::MAX)
    }

    /// Least the caller is willing to receive
    pub fn min_out(&self) -> u64 {
        let bps = (self.slippage_bps as u128).min(BPS_DENOMINATOR);
        (self.quoted_amount as u128 * (BPS_DENOMINATOR - bps) / BPS_DENOMINATOR) as u64
    }
}

/// Type-specific parameters; the variant is the operation's type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationParams {
    /// SPL token transfer in raw base units
    Transfer {
        recipient: Pubkey,
        mint: Pubkey,
        amount: u64,
    },
    SolTransfer {
        recipient: Pubkey,
        lamports: u64,
    },
    BuyBondingCurve {
        mint: Pubkey,
        token_amount: u64,
        quote: Option<SlippageQuote>,
    },
    SellBondingCurve {
        mint: Pubkey,
        token_amount: u64,
        quote: Option<SlippageQuote>,
    },
    BuyAmm {
        pool: Pubkey,
        base_amount: u64,
        quote: Option<SlippageQuote>,
    },
    SellAmm {
        pool: Pubkey,
        base_amount: u64,
        quote: Option<SlippageQuote>,
    },
}

impl OperationParams {
    pub fn operation_type(&self) -> OperationType {
        match self {
            OperationParams::Transfer { .. } => OperationType::Transfer,
            OperationParams::SolTransfer { .. } => OperationType::SolTransfer,
            OperationParams::BuyBondingCurve { .. } => OperationType::BuyBondingCurve,
            OperationParams::SellBondingCurve { .. } => OperationType::SellBondingCurve,
            OperationParams::BuyAmm { .. } => OperationType::BuyAmm,
            OperationParams::SellAmm { .. } => OperationType::SellAmm,
        }
    }
}

/// One requested on-chain action. Never mutated once handed to the engine.
#[derive(Debug, Clone)]
pub struct Operation {
    pub id: String,
    pub description: String,
    pub params: OperationParams,
    /// Bound signer; the client's default signer is used when absent
    pub sender: Option<Arc<Keypair>>,
}

impl Operation {
    pub fn new(id: impl Into<String>, description: impl Into<String>, params: OperationParams) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            params,
            sender: None,
        }
    }

    pub fn with_sender(mut self, sender: Arc<Keypair>) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn operation_type(&self) -> OperationType {
        self.params.operation_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names_round_trip() {
        for t in OperationType::ALL {
            assert_eq!(t.as_str().parse::<OperationType>().unwrap(), t);
        }
        assert!("swap".parse::<OperationType>().is_err());
        assert_eq!(valid_type_names().len(), 6);
    }

    #[test]
    fn test_slippage_bounds() {
        let quote = SlippageQuote::new(1_000_000, 250);
        assert_eq!(quote.max_in(), 1_025_000);
        assert_eq!(quote.min_out(), 975_000);

        let extreme = SlippageQuote::new(u64::MAX, 10_000);
        assert_eq!(extreme.max_in(), u64::MAX);

        let overflowing_bps = SlippageQuote::new(500, u16::MAX);
        assert_eq!(overflowing_bps.min_out(), 0);
    }

    #[test]
    fn test_operation_type_follows_params() {
        let op = Operation::new(
            "op1",
            "send lamports",
            OperationParams::SolTransfer {
                recipient: Pubkey::new_unique(),
                lamports: 10,
            },
        );
        assert_eq!(op.operation_type(), OperationType::SolTransfer);
        assert!(op.sender.is_none());
    }
}
