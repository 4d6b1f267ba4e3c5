//! sidetree-node — DID processing node.

use std::sync::Arc;

use anyhow::Result;
use sidetree_core::protocol::StaticProtocolClient;
use sidetree_node::adapters::{GzipCompression, InMemoryCas};
use sidetree_node::config::NodeConfig;
use sidetree_node::observer::ChannelAnchorObserver;
use sidetree_node::pipeline::{self, Pipeline};
use sidetree_services::OperationIndex;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = NodeConfig::load()?;
    tracing::info!(namespace = %config.namespace.name, "sidetree-node starting");

    let protocol_client =
        Arc::new(StaticProtocolClient::new().with_namespace(&config.namespace.name, config.protocol.to_protocol()));

    // The node ships its own in-memory CAS/compression adapters; a
    // production deployment supplies real ones backed by whatever content
    // store and anchoring system it runs against.
    let index = Arc::new(OperationIndex::new());
    let pipeline = Arc::new(Pipeline::new(
        index,
        Arc::new(InMemoryCas::new()),
        Arc::new(GzipCompression),
        protocol_client,
        config.concurrency.resolved_max_concurrent_batches(),
    ));

    // Nothing feeds this channel yet — wiring in a real anchor feed (a
    // ledger watcher, a test harness) means handing it this sender.
    let (_anchor_feed, observer) = ChannelAnchorObserver::channel(64);
    let cancel = CancellationToken::new();

    let pipeline_task = tokio::spawn(pipeline::run(observer, pipeline, cancel.clone()));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
            cancel.cancel();
        }
        r = pipeline_task => {
            tracing::error!(?r, "pipeline task exited");
        }
    }

    Ok(())
}
