pub mod estimate;
pub mod execute;
pub mod validate;

use crate::{
    config::{KeypairCache, OperationsFile, DEFAULT_RPC_URL},
    error::{CliError, CliResult},
};
use clap::Args;
use solana_sdk::signature::Signer;
use solbatch_batch_tx::{
    parse_operations, BatchOptions, BatchTxClient, Operation, RpcClient, RpcLedger, TxBatchConfig,
    ValidationReport,
};
use solbatch_sdk::ProgramInstructionAssembler;
use std::{path::PathBuf, sync::Arc};
use tracing::info;

/// Connection flags shared by every command that talks to a cluster
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Solana RPC URL (overrides settings.rpc_url)
    #[arg(short, long)]
    pub rpc_url: Option<String>,

    /// Default signer keypair (overrides settings.default_keypair)
    #[arg(short, long)]
    pub keypair: Option<PathBuf>,

    /// Shared fee payer keypair (overrides settings.fee_payer_keypair)
    #[arg(long)]
    pub fee_payer: Option<PathBuf>,

    /// processed, confirmed or finalized (overrides settings.commitment)
    #[arg(long)]
    pub commitment: Option<String>,
}

/// A loaded operations file bound to a client
pub struct Session {
    pub operations: Vec<Operation>,
    pub client: BatchTxClient,
    pub options: BatchOptions,
}

impl Session {
    pub fn open(ops_file: OperationsFile, args: &ConnectionArgs) -> CliResult<Self> {
        let mut settings = ops_file.settings.clone();
        if args.commitment.is_some() {
            settings.commitment = args.commitment.clone();
        }
        let commitment = settings.commitment()?;
        let rpc_url = args
            .rpc_url
            .clone()
            .or_else(|| settings.rpc_url.clone())
            .unwrap_or_else(|| DEFAULT_RPC_URL.to_string());

        let operations = parse_operations(&ops_file.raw_operations()).map_err(print_report)?;

        let mut keypairs = KeypairCache::default();
        let operations = operations
            .into_iter()
            .zip(&ops_file.operations)
            .map(|(operation, entry)| match &entry.sender_keypair {
                Some(path) => Ok(operation.with_sender(keypairs.load(path)?)),
                None => Ok(operation),
            })
            .collect::<CliResult<Vec<_>>>()?;

        let mut options = settings.batch_options();
        if let Some(path) = args.fee_payer.as_ref().or(settings.fee_payer_keypair.as_ref()) {
            let fee_payer = keypairs.load(path)?;
            info!("Fee payer: {}", fee_payer.pubkey());
            options = options.with_fee_payer(fee_payer);
        }

        let config = TxBatchConfig {
            confirmation_commitment: commitment,
            preflight_commitment: commitment.commitment,
            skip_preflight: settings.skip_preflight.unwrap_or(false),
            ..Default::default()
        };
        let rpc_client = Arc::new(RpcClient::new_with_commitment(rpc_url.clone(), commitment));
        let ledger = Arc::new(RpcLedger::with_config(rpc_client, &config));
        let assembler = Arc::new(ProgramInstructionAssembler::new(ledger.clone()));
        let mut client = BatchTxClient::with_config(ledger, assembler, config);

        if let Some(path) = args.keypair.as_ref().or(settings.default_keypair.as_ref()) {
            let signer = keypairs.load(path)?;
            info!("Default signer: {}", signer.pubkey());
            client = client.with_default_signer(signer);
        }
        info!("Connected to {}", rpc_url);

        Ok(Self {
            operations,
            client,
            options,
        })
    }
}

/// Print every validation error and turn the report into a CLI error
pub fn print_report(report: ValidationReport) -> CliError {
    println!("❌ Operations file is invalid:");
    for error in &report.errors {
        println!("   - {}", error);
    }
    CliError::Validation(report.errors.len())
}
