use crate::config::{ClientConfig, ConfigError};
use crate::conversation::{ConversationEngine, PendingQuestion, SubmitRejection};
use crate::events::{mutation_channel, MutationEvent, MutationNotifier};
use crate::gateway::{Answer, Gateway, GatewayError, HttpGateway};
use crate::models::Message;
use crate::registry::DocumentRegistry;
use crate::upload::{SelectedFile, UploadRejection, UploadState, UploadTicket, UploadWorkflow};
use std::sync::Arc;
use tracing::{info, warn};

/// One client session: owns the registry, the upload workflow and the
/// conversation, and wires the mutation channel between them.
pub struct Session {
    gateway: Arc<dyn Gateway>,
    notifier: MutationNotifier,
    registry: DocumentRegistry,
    upload: UploadWorkflow,
    conversation: ConversationEngine,
}

impl Session {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        let (notifier, listener) = mutation_channel();
        Self {
            registry: DocumentRegistry::new(Arc::clone(&gateway), listener),
            upload: UploadWorkflow::new(Arc::clone(&gateway), notifier.clone()),
            conversation: ConversationEngine::new(Arc::clone(&gateway)),
            notifier,
            gateway,
        }
    }

    pub fn connect(config: &ClientConfig) -> Result<Self, ConfigError> {
        let gateway = HttpGateway::new(config)?;
        Ok(Self::new(Arc::new(gateway)))
    }

    /// Initial registry load. A failure is logged and leaves the registry
    /// empty; the session stays usable.
    pub async fn start(&mut self) {
        match self.registry.refresh().await {
            Ok(count) => info!("Session started with {} document(s)", count),
            Err(e) => warn!("Error fetching documents: {}", e),
        }
    }

    /// Shared handle for running a request between a `begin_*` and the
    /// matching `complete_*` without borrowing the session.
    pub fn gateway(&self) -> Arc<dyn Gateway> {
        Arc::clone(&self.gateway)
    }

    pub fn registry(&self) -> &DocumentRegistry {
        &self.registry
    }

    pub fn upload(&self) -> &UploadWorkflow {
        &self.upload
    }

    pub fn conversation(&self) -> &ConversationEngine {
        &self.conversation
    }

    pub fn select_file(&mut self, file: SelectedFile) -> Result<(), UploadRejection> {
        self.upload.select_file(file)
    }

    /// Enters `Uploading`. The shell sends `ticket.file()` through
    /// [`Session::gateway`] and hands the outcome to
    /// [`Session::complete_upload`].
    pub fn begin_upload(&mut self) -> Result<UploadTicket, UploadRejection> {
        self.upload.begin()
    }

    /// Applies an upload outcome and refreshes the registry if it succeeded.
    pub async fn complete_upload(
        &mut self,
        ticket: UploadTicket,
        result: Result<(), GatewayError>,
    ) -> &UploadState {
        self.upload.complete(ticket, result);
        self.sync_registry().await;
        self.upload.state()
    }

    pub async fn submit_upload(&mut self) -> Result<&UploadState, UploadRejection> {
        self.upload.submit().await?;
        self.sync_registry().await;
        Ok(self.upload.state())
    }

    /// Deletes by filename. The outcome is logged rather than surfaced as
    /// blocking, and the registry is refreshed either way.
    pub async fn delete_document(&mut self, filename: &str) -> Result<(), GatewayError> {
        let result = self.gateway.delete_document(filename).await;
        self.complete_delete(filename, result).await
    }

    /// Records the outcome of a delete issued through [`Session::gateway`].
    pub async fn complete_delete(
        &mut self,
        filename: &str,
        result: Result<(), GatewayError>,
    ) -> Result<(), GatewayError> {
        match &result {
            Ok(()) => info!("Deleted {}", filename),
            Err(e) => warn!("Error deleting document {}: {}", filename, e),
        }
        self.notifier.notify(MutationEvent::DocumentDeleted {
            filename: filename.to_string(),
            succeeded: result.is_ok(),
        });
        self.sync_registry().await;
        result
    }

    /// Appends the user turn and enters the pending state; the transcript
    /// ends in [`crate::TranscriptEntry::Pending`] until
    /// [`Session::complete_ask`] runs.
    pub fn begin_ask(&mut self, question: &str) -> Result<PendingQuestion, SubmitRejection> {
        self.conversation.begin(question, &self.registry)
    }

    pub fn complete_ask(
        &mut self,
        ticket: PendingQuestion,
        result: Result<Answer, GatewayError>,
    ) -> Result<&Message, SubmitRejection> {
        self.conversation.complete(ticket, result)
    }

    pub async fn ask(&mut self, question: &str) -> Result<Message, SubmitRejection> {
        self.conversation.submit(question, &self.registry).await
    }

    async fn sync_registry(&mut self) {
        if let Some(Err(e)) = self.registry.process_mutations().await {
            warn!("Error fetching documents: {}", e);
        }
    }
}
