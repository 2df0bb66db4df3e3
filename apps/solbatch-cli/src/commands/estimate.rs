use super::{ConnectionArgs, Session};
use crate::{config::OperationsFile, error::CliResult};
use std::path::PathBuf;

pub async fn execute(operations_file: PathBuf, connection: ConnectionArgs) -> CliResult<()> {
    let session = Session::open(OperationsFile::load(&operations_file)?, &connection)?;

    println!(
        "📏 Probing batch sizes for {} operations...",
        session.operations.len()
    );
    let decision = session
        .client
        .estimate_batch_size(&session.operations, session.options.fee_payer.as_ref())
        .await;

    let transactions = session.operations.len().div_ceil(decision.max_ops_per_batch);
    println!("✅ Max operations per transaction: {}", decision.max_ops_per_batch);
    println!("   Transactions needed: {}", transactions);
    println!("   Reasoning: {}", decision.reasoning);
    Ok(())
}
