//! Consumer of the consensus engine's event stream

use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use consensus_core::notify::ConsensusEvent;

use super::Processing;
use crate::error::{ProcessingError, Result, ResultExt};

/// Feeds engine events, in order, to the processing service.
///
/// A failed event or a broken stream is fatal: the ingestor stops and returns the error.
pub struct EventIngestor {
    processing: Arc<Processing>,
}

impl EventIngestor {
    pub fn new(processing: Arc<Processing>) -> Self {
        Self { processing }
    }

    /// Runs until the engine closes the event channel
    pub async fn run(&self, mut events: UnboundedReceiver<ConsensusEvent>) -> Result<()> {
        info!("Event ingestor started");
        let mut handled: u64 = 0;
        while let Some(event) = events.recv().await {
            if let Err(err) = self.handle(event).await {
                error!("Event ingestor stopped after {} events: {}", handled, err);
                return Err(err);
            }
            handled += 1;
        }
        info!("Event channel closed, event ingestor stopped after {} events", handled);
        Ok(())
    }

    pub fn spawn(self, events: UnboundedReceiver<ConsensusEvent>) -> JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run(events).await })
    }

    async fn handle(&self, event: ConsensusEvent) -> Result<()> {
        match event {
            ConsensusEvent::BlockAdded(block) => {
                debug!("Event ingestor gets block {}", block.hash());
                self.processing.process_block(&block).await.context("Failed to process block added consensus event")
            }
            ConsensusEvent::VirtualChange(changes) => self
                .processing
                .process_virtual_change(&changes)
                .await
                .context("Failed to process virtual change consensus event"),
            ConsensusEvent::Unsupported(kind) => Err(ProcessingError::UnsupportedEvent(kind)),
            ConsensusEvent::StreamError(reason) => Err(ProcessingError::EventStream(reason)),
        }
    }
}
