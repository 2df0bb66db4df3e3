/*!
# Result Reconciliation

A chunk is one transaction, so its outcome is broadcast unchanged to every
operation in it. Results are kept in an append-only list indexed by operation
id; lookups go through the id, never through list position.
*/

use crate::{
    executor::ChunkOutcome,
    operation::{Operation, OperationType},
};
use solana_sdk::signature::Signature;
use std::collections::HashMap;

/// Final outcome of one operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub operation_id: String,
    pub operation_type: OperationType,
    pub success: bool,
    /// Present only on success
    pub signature: Option<Signature>,
    /// Present only on failure
    pub error: Option<String>,
}

impl BatchResult {
    pub fn succeeded(operation: &Operation, signature: Signature) -> Self {
        Self {
            operation_id: operation.id.clone(),
            operation_type: operation.operation_type(),
            success: true,
            signature: Some(signature),
            error: None,
        }
    }

    pub fn failed(operation: &Operation, error: impl Into<String>) -> Self {
        Self {
            operation_id: operation.id.clone(),
            operation_type: operation.operation_type(),
            success: false,
            signature: None,
            error: Some(error.into()),
        }
    }

    pub fn from_outcome(operation: &Operation, outcome: &ChunkOutcome) -> Self {
        match outcome {
            Ok(signature) => Self::succeeded(operation, *signature),
            Err(e) => Self::failed(operation, e.to_string()),
        }
    }
}

/// One result per operation of the chunk, all sharing the chunk's outcome
pub fn reconcile_chunk(chunk: &[Operation], outcome: &ChunkOutcome) -> Vec<BatchResult> {
    chunk
        .iter()
        .map(|operation| BatchResult::from_outcome(operation, outcome))
        .collect()
}

/// Result list addressable by operation id
#[derive(Debug, Clone, Default)]
pub struct BatchResults {
    entries: Vec<BatchResult>,
    index: HashMap<String, usize>,
}

impl BatchResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert, or overwrite the entry with the same operation id in place
    pub fn upsert(&mut self, result: BatchResult) {
        match self.index.get(&result.operation_id) {
            Some(&position) => self.entries[position] = result,
            None => {
                self.index
                    .insert(result.operation_id.clone(), self.entries.len());
                self.entries.push(result);
            }
        }
    }

    pub fn extend(&mut self, results: impl IntoIterator<Item = BatchResult>) {
        for result in results {
            self.upsert(result);
        }
    }

    pub fn get(&self, operation_id: &str) -> Option<&BatchResult> {
        self.index.get(operation_id).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BatchResult> {
        self.entries.iter()
    }

    pub fn succeeded(&self) -> usize {
        self.entries.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.succeeded()
    }

    /// Operations without a successful result, including ones with no entry
    pub fn failed_operation_ids<'o>(&self, operations: &'o [Operation]) -> Vec<&'o str> {
        operations
            .iter()
            .filter(|op| !self.get(&op.id).is_some_and(|r| r.success))
            .map(|op| op.id.as_str())
            .collect()
    }

    pub fn into_vec(self) -> Vec<BatchResult> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::TxBatchError, test_utils::sol_transfer_op};

    fn ops(count: usize) -> Vec<Operation> {
        (0..count).map(|i| sol_transfer_op(&format!("op{}", i))).collect()
    }

    #[test]
    fn test_success_broadcast() {
        let chunk = ops(3);
        let signature = Signature::new_unique();
        let results = reconcile_chunk(&chunk, &Ok(signature));

        assert_eq!(results.len(), 3);
        for (result, op) in results.iter().zip(&chunk) {
            assert_eq!(result.operation_id, op.id);
            assert!(result.success);
            assert_eq!(result.signature, Some(signature));
            assert!(result.error.is_none());
        }
    }

    #[test]
    fn test_failure_broadcast_is_identical() {
        let chunk = ops(2);
        let outcome: ChunkOutcome = Err(TxBatchError::SendFailed("node is behind".to_string()));
        let results = reconcile_chunk(&chunk, &outcome);

        assert!(results.iter().all(|r| !r.success && r.signature.is_none()));
        assert_eq!(results[0].error, results[1].error);
        assert!(results[0].error.as_deref().unwrap().contains("node is behind"));
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let chunk = ops(4);
        let outcome: ChunkOutcome = Ok(Signature::new_unique());
        assert_eq!(reconcile_chunk(&chunk, &outcome), reconcile_chunk(&chunk, &outcome));

        let mut results = BatchResults::new();
        results.extend(reconcile_chunk(&chunk, &outcome));
        results.extend(reconcile_chunk(&chunk, &outcome));
        assert_eq!(results.len(), 4);
    }

    #[test]
    fn test_upsert_overwrites_in_place() {
        let chunk = ops(3);
        let mut results = BatchResults::new();
        results.extend(reconcile_chunk(
            &chunk,
            &Err(TxBatchError::Ledger("down".to_string())),
        ));
        assert_eq!(results.failed(), 3);

        let signature = Signature::new_unique();
        results.upsert(BatchResult::succeeded(&chunk[1], signature));

        assert_eq!(results.len(), 3);
        assert_eq!(results.succeeded(), 1);
        assert_eq!(results.get("op1").unwrap().signature, Some(signature));
        assert_eq!(results.failed_operation_ids(&chunk), vec!["op0", "op2"]);
    }

    #[test]
    fn test_missing_entries_count_as_failed() {
        let chunk = ops(2);
        let results = BatchResults::new();
        assert_eq!(results.failed_operation_ids(&chunk), vec!["op0", "op1"]);
    }
}
