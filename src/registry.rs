use crate::events::MutationListener;
use crate::gateway::{Gateway, GatewayError};
use crate::models::Document;
use std::sync::Arc;
use tracing::{debug, info};

/// Client-side reflection of the backend's document set.
///
/// The snapshot is only ever replaced wholesale, so a reader holding an
/// `Arc` from [`DocumentRegistry::snapshot`] never sees a half-applied update.
pub struct DocumentRegistry {
    gateway: Arc<dyn Gateway>,
    snapshot: Arc<[Document]>,
    mutations: MutationListener,
}

impl DocumentRegistry {
    pub fn new(gateway: Arc<dyn Gateway>, mutations: MutationListener) -> Self {
        Self {
            gateway,
            snapshot: Arc::from(Vec::<Document>::new()),
            mutations,
        }
    }

    /// Fetches the full listing and swaps it in. On failure the previous
    /// snapshot is left untouched and the error is handed back for logging.
    pub async fn refresh(&mut self) -> Result<usize, GatewayError> {
        let documents = self.gateway.list_documents().await?;
        let count = documents.len();
        self.snapshot = Arc::from(documents);
        debug!("Document registry refreshed: {} documents", count);
        Ok(count)
    }

    /// Refreshes once if any mutation was signalled since the last call.
    /// Returns `None` when nothing was queued.
    pub async fn process_mutations(&mut self) -> Option<Result<usize, GatewayError>> {
        let events = self.mutations.drain();
        if events.is_empty() {
            return None;
        }
        info!("Refreshing registry after {} mutation(s)", events.len());
        Some(self.refresh().await)
    }

    pub fn documents(&self) -> &[Document] {
        &self.snapshot
    }

    pub fn snapshot(&self) -> Arc<[Document]> {
        Arc::clone(&self.snapshot)
    }

    pub fn has_documents(&self) -> bool {
        !self.snapshot.is_empty()
    }

    pub fn contains_filename(&self, filename: &str) -> bool {
        self.snapshot.iter().any(|d| d.filename == filename)
    }
}
