/*!
# Retry / Fallback

After a batched pass, operations without a successful result may be re-run one
at a time. Running them individually gives up the shared transaction in
exchange for isolating whichever operation broke its chunk. A fallback failure
is final.
*/

use crate::{config::BatchOptions, operation::Operation, reconcile::BatchResults};
use std::collections::HashSet;

/// What the fallback controller will do after a pass
#[derive(Debug)]
pub enum FallbackPlan<'o> {
    /// Every operation already succeeded
    NothingFailed,
    /// `retry_failed` is off
    RetryNotRequested { failed: usize },
    /// The operator disabled the individual fallback
    FallbackDisabled { failed: usize },
    /// Re-run these operations individually, in input order
    RetryIndividually(Vec<&'o Operation>),
}

/// Decide how failed operations are handled after a pass
pub fn plan_fallback<'o>(
    results: &BatchResults,
    operations: &'o [Operation],
    options: &BatchOptions,
) -> FallbackPlan<'o> {
    let failed_ids: HashSet<&str> = results
        .failed_operation_ids(operations)
        .into_iter()
        .collect();
    if failed_ids.is_empty() {
        return FallbackPlan::NothingFailed;
    }
    if !options.retry_failed {
        return FallbackPlan::RetryNotRequested {
            failed: failed_ids.len(),
        };
    }
    if options.disable_fallback_retry {
        return FallbackPlan::FallbackDisabled {
            failed: failed_ids.len(),
        };
    }

    FallbackPlan::RetryIndividually(
        operations
            .iter()
            .filter(|op| failed_ids.contains(op.id.as_str()))
            .collect(),
    )
}
