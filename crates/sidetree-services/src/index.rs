//! Append-only per-suffix operation log.
//!
//! Exclusive per key, lock-free across keys — a `DashMap` gives this for
//! free via its per-shard locking. No lock is ever held across a CAS read:
//! by the time an operation reaches `insert`, batch assembly has already
//! completed and the operation carries everything `resolve` needs.

use dashmap::DashMap;
use sidetree_core::capability::SignatureVerifier;
use sidetree_core::document::ResolutionResult;
use sidetree_core::operation::{Operation, TransactionCoordinates};

/// One entry in a suffix's log: the operation plus where it was observed.
#[derive(Debug, Clone)]
pub struct OperationRecord {
    pub coordinates: TransactionCoordinates,
    pub operation: Operation,
}

/// Operation log keyed by `unique_suffix`. Entries within a suffix are kept
/// sorted by transaction coordinates so `resolve` can fold them directly.
#[derive(Default)]
pub struct OperationIndex {
    log: DashMap<String, Vec<OperationRecord>>,
}

impl OperationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one operation into its suffix's log, keeping the log sorted.
    /// A record already present at the same coordinates for the same
    /// suffix is treated as a duplicate submission and ignored.
    pub fn insert(&self, operation: Operation, coordinates: TransactionCoordinates) {
        let mut entry = self.log.entry(operation.unique_suffix.clone()).or_default();
        if entry.iter().any(|r| r.coordinates == coordinates && r.operation.id == operation.id) {
            return;
        }
        let insert_at = match entry.binary_search_by(|r| r.coordinates.cmp(&coordinates)) {
            Ok(idx) => {
                tracing::warn!(
                    suffix = %operation.unique_suffix,
                    existing_id = %entry[idx].operation.id,
                    incoming_id = %operation.id,
                    "two operations observed at identical transaction coordinates; ordering by id",
                );
                if operation.id < entry[idx].operation.id {
                    idx
                } else {
                    idx + 1
                }
            }
            Err(pos) => pos,
        };
        entry.insert(insert_at, OperationRecord { coordinates, operation });
    }

    pub fn len_for(&self, unique_suffix: &str) -> usize {
        self.log.get(unique_suffix).map(|v| v.len()).unwrap_or(0)
    }

    /// Resolve a suffix by folding its full log through the document
    /// processor. Returns the "no operations observed" result for an
    /// unknown suffix rather than an error — this mirrors resolving a DID
    /// that was never anchored.
    pub fn resolve(&self, unique_suffix: &str, verifier: &dyn SignatureVerifier) -> ResolutionResult {
        match self.log.get(unique_suffix) {
            Some(entries) => {
                let ops: Vec<Operation> = entries.iter().map(|r| r.operation.clone()).collect();
                crate::processor::resolve(unique_suffix, &ops, verifier)
            }
            None => crate::processor::resolve(unique_suffix, &[], verifier),
        }
    }
}
