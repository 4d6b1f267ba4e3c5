//! The anchor observer: a single producer of `AnchorTransaction`s in strict
//! observation order. The node never talks to an anchoring system directly
//! — whatever watches the underlying ledger/log feeds transactions in here.

use async_trait::async_trait;
use sidetree_services::AnchorTransaction;
use tokio::sync::mpsc;

#[async_trait]
pub trait AnchorObserver: Send {
    async fn next(&mut self) -> Option<AnchorTransaction>;
}

/// An `AnchorObserver` backed by an `mpsc` channel. The process feeding the
/// channel (a ledger watcher, a test harness) is external to this crate.
pub struct ChannelAnchorObserver {
    receiver: mpsc::Receiver<AnchorTransaction>,
}

impl ChannelAnchorObserver {
    pub fn new(receiver: mpsc::Receiver<AnchorTransaction>) -> Self {
        Self { receiver }
    }

    /// Build a connected `(sender, observer)` pair for wiring into a feed.
    pub fn channel(capacity: usize) -> (mpsc::Sender<AnchorTransaction>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl AnchorObserver for ChannelAnchorObserver {
    async fn next(&mut self) -> Option<AnchorTransaction> {
        self.receiver.recv().await
    }
}
