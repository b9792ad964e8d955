pub mod config;
pub mod conversation;
pub mod events;
pub mod gateway;
pub mod logging;
pub mod models;
pub mod registry;
pub mod session;
pub mod upload;

#[cfg(test)]
mod test_support;

pub use config::{ClientConfig, ConfigError};
pub use conversation::{ConversationEngine, PendingQuestion, SubmitRejection, TranscriptEntry};
pub use events::{mutation_channel, MutationEvent, MutationListener, MutationNotifier};
pub use gateway::{Answer, Gateway, GatewayError, HttpGateway, Scope};
pub use models::{Document, Message, Role};
pub use registry::DocumentRegistry;
pub use session::Session;
pub use upload::{
    SelectedFile, StatusKind, StatusMessage, UploadRejection, UploadState, UploadTicket,
    UploadWorkflow,
};
