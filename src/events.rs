//! "Mutation completed" notifications.
//!
//! The upload workflow and the delete action hold a [`MutationNotifier`];
//! the document registry owns the matching [`MutationListener`] and refreshes
//! when it drains events. Neither side holds a reference to the other.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MutationEvent {
    DocumentUploaded { filename: String },
    /// Emitted whether or not the backend accepted the delete, since a failed
    /// delete can still have changed server state.
    DocumentDeleted { filename: String, succeeded: bool },
}

#[derive(Debug, Clone)]
pub struct MutationNotifier {
    tx: mpsc::UnboundedSender<MutationEvent>,
}

impl MutationNotifier {
    pub fn notify(&self, event: MutationEvent) {
        if let Err(e) = self.tx.send(event) {
            debug!("No registry listening for {:?}", e.0);
        }
    }
}

#[derive(Debug)]
pub struct MutationListener {
    rx: mpsc::UnboundedReceiver<MutationEvent>,
}

impl MutationListener {
    /// Takes every queued event without waiting.
    pub fn drain(&mut self) -> Vec<MutationEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Waits for the next event. `None` once every notifier is gone.
    pub async fn next(&mut self) -> Option<MutationEvent> {
        self.rx.recv().await
    }
}

pub fn mutation_channel() -> (MutationNotifier, MutationListener) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MutationNotifier { tx }, MutationListener { rx })
}
