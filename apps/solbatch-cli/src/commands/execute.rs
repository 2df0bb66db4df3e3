use super::{ConnectionArgs, Session};
use crate::{
    config::{OperationsFile, ResultRecord},
    error::{CliError, CliResult},
};
use solbatch_batch_tx::{BatchResult, ChunkPlan};
use std::{fs, path::PathBuf, time::Duration};

/// Flags that override the file's batch settings
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ExecuteArgs {
    /// Operations per transaction when not batching dynamically
    #[arg(long)]
    pub max_parallel: Option<usize>,

    /// Milliseconds to wait between transactions
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Probe for the largest batch size that fits
    #[arg(long)]
    pub dynamic: bool,

    /// Re-run failed operations one at a time after the batched pass
    #[arg(long)]
    pub retry_failed: bool,

    /// Never fall back to individual execution
    #[arg(long)]
    pub disable_fallback_retry: bool,

    /// Build and check every transaction without sending anything
    #[arg(long)]
    pub dry_run: bool,

    /// Write per-operation results as JSON
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Exit with an error when any operation failed
    #[arg(long)]
    pub fail_on_error: bool,
}

pub async fn execute(
    operations_file: PathBuf,
    connection: ConnectionArgs,
    args: ExecuteArgs,
) -> CliResult<()> {
    let mut session = Session::open(OperationsFile::load(&operations_file)?, &connection)?;
    let options = &mut session.options;
    if let Some(max_parallel) = args.max_parallel {
        options.max_parallel = max_parallel;
    }
    if let Some(delay_ms) = args.delay_ms {
        options.delay_between = Duration::from_millis(delay_ms);
    }
    options.dynamic_batching |= args.dynamic;
    options.retry_failed |= args.retry_failed;
    options.disable_fallback_retry |= args.disable_fallback_retry;

    if args.dry_run {
        println!("🔍 Dry run: building transactions without sending");
        let plans = session
            .client
            .plan_batch(&session.operations, &session.options)
            .await?;
        print_plans(&plans);
        return Ok(());
    }

    println!(
        "🚀 Executing {} operations from {}",
        session.operations.len(),
        operations_file.display()
    );
    let results = session
        .client
        .execute_batch(&session.operations, &session.options)
        .await?;
    print_results(&results);

    if let Some(output) = args.output {
        let records: Vec<ResultRecord> = results.iter().map(ResultRecord::from).collect();
        fs::write(&output, serde_json::to_string_pretty(&records)?)?;
        println!("📝 Results written to {}", output.display());
    }

    check_failures(&results, args.fail_on_error)
}

/// Partial success is a normal outcome unless `--fail-on-error` asks otherwise
fn check_failures(results: &[BatchResult], fail_on_error: bool) -> CliResult<()> {
    let failed = results.iter().filter(|r| !r.success).count();
    if fail_on_error && failed > 0 {
        return Err(CliError::OperationsFailed {
            failed,
            total: results.len(),
        });
    }
    Ok(())
}

fn print_plans(plans: &[ChunkPlan]) {
    for (idx, plan) in plans.iter().enumerate() {
        let range = &plan.operation_range;
        match (&plan.limits, &plan.error) {
            (Some(limits), _) => println!(
                "{} transaction {} (operations {}..{}): {} bytes, {} accounts, {} signers{}",
                if limits.can_fit { "✅" } else { "❌" },
                idx + 1,
                range.start,
                range.end,
                limits.estimated_size_bytes,
                limits.unique_account_count,
                plan.signer_count,
                if limits.can_fit {
                    String::new()
                } else {
                    format!(" ({})", limits.reasons.join("; "))
                }
            ),
            (None, error) => println!(
                "❌ transaction {} (operations {}..{}): {}",
                idx + 1,
                range.start,
                range.end,
                error.as_deref().unwrap_or("not built")
            ),
        }
    }
}

fn print_results(results: &[BatchResult]) {
    for result in results {
        match (&result.signature, &result.error) {
            (Some(signature), _) => println!("✅ {} ({}): {}", result.operation_id, result.operation_type, signature),
            (None, error) => println!(
                "❌ {} ({}): {}",
                result.operation_id,
                result.operation_type,
                error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
    let succeeded = results.iter().filter(|r| r.success).count();
    println!(
        "\n📊 {} succeeded, {} failed",
        succeeded,
        results.len() - succeeded
    );
}
