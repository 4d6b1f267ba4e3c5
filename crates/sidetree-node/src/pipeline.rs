//! Wires the anchor observer to batch assembly to the operation index.
//!
//! Batch assembly is embarrassingly parallel across anchors: each observed
//! transaction is handed to its own task, bounded by a semaphore sized from
//! config. Per-suffix ordering is never at risk from that parallelism —
//! every assembled operation carries its own transaction coordinates, and
//! `OperationIndex::insert` keeps each suffix's log sorted by them
//! regardless of arrival order.

use std::sync::Arc;

use sidetree_core::capability::{Cas, Compression};
use sidetree_core::operation::TransactionCoordinates;
use sidetree_core::protocol::ProtocolClient;
use sidetree_services::{assemble_operations, AnchorTransaction, OperationIndex};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::observer::AnchorObserver;

pub struct Pipeline {
    pub index: Arc<OperationIndex>,
    pub cas: Arc<dyn Cas>,
    pub compression: Arc<dyn Compression>,
    pub protocol_client: Arc<dyn ProtocolClient>,
    pub semaphore: Arc<Semaphore>,
}

impl Pipeline {
    pub fn new(
        index: Arc<OperationIndex>,
        cas: Arc<dyn Cas>,
        compression: Arc<dyn Compression>,
        protocol_client: Arc<dyn ProtocolClient>,
        max_concurrent_batches: usize,
    ) -> Self {
        Self {
            index,
            cas,
            compression,
            protocol_client,
            semaphore: Arc::new(Semaphore::new(max_concurrent_batches.max(1))),
        }
    }
}

/// Drain `observer` until it ends or `cancel` fires, assembling and
/// indexing each observed transaction's operations along the way.
pub async fn run(mut observer: impl AnchorObserver, pipeline: Arc<Pipeline>, cancel: CancellationToken) {
    loop {
        let transaction = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = observer.next() => match next {
                Some(t) => t,
                None => break,
            },
        };

        let permit = match pipeline.semaphore.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => break,
        };
        let pipeline = pipeline.clone();
        let cancel = cancel.clone();

        tokio::spawn(async move {
            let _permit = permit;
            assemble_and_index(&transaction, &pipeline, &cancel).await;
        });
    }
}

#[tracing::instrument(skip(pipeline, cancel), fields(anchor = %transaction.anchor_string))]
async fn assemble_and_index(transaction: &AnchorTransaction, pipeline: &Pipeline, cancel: &CancellationToken) {
    let result = assemble_operations(
        transaction,
        pipeline.cas.clone(),
        pipeline.compression.clone(),
        pipeline.protocol_client.clone(),
        cancel,
    )
    .await;

    match result {
        Ok(operations) => {
            for (i, operation) in operations.into_iter().enumerate() {
                let coordinates = TransactionCoordinates {
                    transaction_time: transaction.transaction_time,
                    transaction_number: transaction.transaction_number,
                    operation_index: i as u32,
                };
                pipeline.index.insert(operation, coordinates);
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "batch assembly failed; anchor dropped");
        }
    }
}
