//! Instruction assembly for the token, bonding-curve and AMM programs.

mod accounts;
mod address_finder;
mod assembler;
mod instruction_builders;

pub use accounts::{
    account_discriminator, instruction_discriminator, BondingCurve, Global, GlobalConfig, Pool,
    ProgramAccount,
};
pub use address_finder::*;
pub use assembler::ProgramInstructionAssembler;
pub use instruction_builders::*;
