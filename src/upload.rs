//! Upload lifecycle for a single document.
//!
//! `Idle -> FileSelected -> Uploading -> Succeeded | Failed`. A failed upload
//! keeps the file so the user can retry without picking it again; a
//! successful one clears it and bumps the picker generation so the shell can
//! reset its file input. At most one upload is in flight.

use crate::events::{MutationEvent, MutationNotifier};
use crate::gateway::{Gateway, GatewayError};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub const ACCEPTED_EXTENSIONS: &[&str] = &["pdf", "md", "markdown"];
pub const UPLOAD_SUCCEEDED: &str = "Document uploaded and indexed successfully!";
pub const UPLOAD_RETRY: &str = "Upload failed. Please try again.";

/// A file picked by the user: the raw bytes plus the name sent to the backend.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    filename: String,
    bytes: Arc<[u8]>,
}

impl SelectedFile {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        let bytes = std::fs::read(path)?;
        Ok(Self::new(filename, bytes))
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lowercased extension, if any.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    pub fn has_accepted_extension(&self) -> bool {
        self.extension()
            .is_some_and(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()))
    }
}

impl fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedFile")
            .field("filename", &self.filename)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    FileSelected(SelectedFile),
    Uploading(SelectedFile),
    Succeeded { filename: String },
    /// `file` is the retained selection, absent when the selection itself
    /// was refused.
    Failed {
        reason: String,
        file: Option<SelectedFile>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Success,
    Error,
}

/// Inline feedback shown next to the upload control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadRejection {
    #[error("Unsupported file type. Allowed types: .pdf, .md, .markdown")]
    UnsupportedFileType { filename: String },
    #[error("No file selected")]
    NoFileSelected,
    #[error("An upload is already in progress")]
    UploadInFlight,
}

/// Proof that an upload was started; handed back to [`UploadWorkflow::complete`].
#[derive(Debug)]
pub struct UploadTicket {
    seq: u64,
    file: SelectedFile,
}

impl UploadTicket {
    pub fn file(&self) -> &SelectedFile {
        &self.file
    }
}

pub struct UploadWorkflow {
    gateway: Arc<dyn Gateway>,
    notifier: MutationNotifier,
    state: UploadState,
    in_flight: Option<u64>,
    next_seq: u64,
    picker_generation: u64,
}

impl UploadWorkflow {
    pub fn new(gateway: Arc<dyn Gateway>, notifier: MutationNotifier) -> Self {
        Self {
            gateway,
            notifier,
            state: UploadState::Idle,
            in_flight: None,
            next_seq: 0,
            picker_generation: 0,
        }
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    pub fn is_uploading(&self) -> bool {
        matches!(self.state, UploadState::Uploading(_))
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        match &self.state {
            UploadState::FileSelected(file) | UploadState::Uploading(file) => Some(file),
            UploadState::Failed { file, .. } => file.as_ref(),
            UploadState::Idle | UploadState::Succeeded { .. } => None,
        }
    }

    pub fn can_submit(&self) -> bool {
        !self.is_uploading() && self.selected_file().is_some()
    }

    /// Incremented after every successful upload; a shell keys its file
    /// input on this to clear it.
    pub fn picker_generation(&self) -> u64 {
        self.picker_generation
    }

    pub fn status_message(&self) -> Option<StatusMessage> {
        match &self.state {
            UploadState::Succeeded { .. } => Some(StatusMessage {
                kind: StatusKind::Success,
                text: UPLOAD_SUCCEEDED.to_string(),
            }),
            UploadState::Failed { reason, .. } => Some(StatusMessage {
                kind: StatusKind::Error,
                text: reason.clone(),
            }),
            _ => None,
        }
    }

    /// Selects a file, clearing any previous feedback. Extensions outside
    /// [`ACCEPTED_EXTENSIONS`] are refused up front; the backend still has
    /// the final say.
    pub fn select_file(&mut self, file: SelectedFile) -> Result<(), UploadRejection> {
        if self.is_uploading() {
            return Err(UploadRejection::UploadInFlight);
        }
        if !file.has_accepted_extension() {
            let rejection = UploadRejection::UnsupportedFileType {
                filename: file.filename().to_string(),
            };
            self.state = UploadState::Failed {
                reason: rejection.to_string(),
                file: None,
            };
            return Err(rejection);
        }
        self.state = UploadState::FileSelected(file);
        Ok(())
    }

    /// Moves the selected file into `Uploading`.
    pub fn begin(&mut self) -> Result<UploadTicket, UploadRejection> {
        if self.is_uploading() {
            return Err(UploadRejection::UploadInFlight);
        }
        let file = self
            .selected_file()
            .cloned()
            .ok_or(UploadRejection::NoFileSelected)?;

        self.next_seq += 1;
        self.in_flight = Some(self.next_seq);
        self.state = UploadState::Uploading(file.clone());
        Ok(UploadTicket {
            seq: self.next_seq,
            file,
        })
    }

    /// Applies the outcome of the upload started by `ticket`. Tickets that do
    /// not match the in-flight upload are ignored.
    pub fn complete(
        &mut self,
        ticket: UploadTicket,
        result: Result<(), GatewayError>,
    ) -> &UploadState {
        if self.in_flight != Some(ticket.seq) {
            warn!("Ignoring stale upload result for {}", ticket.file.filename());
            return &self.state;
        }
        self.in_flight = None;

        match result {
            Ok(()) => {
                let filename = ticket.file.filename().to_string();
                info!("Uploaded {}", filename);
                self.picker_generation += 1;
                self.notifier.notify(MutationEvent::DocumentUploaded {
                    filename: filename.clone(),
                });
                self.state = UploadState::Succeeded { filename };
            }
            Err(err) => {
                warn!("Upload of {} failed: {}", ticket.file.filename(), err);
                let reason = match err {
                    GatewayError::Validation(detail) => detail,
                    GatewayError::Network(_)
                    | GatewayError::Protocol(_)
                    | GatewayError::Answer(_) => UPLOAD_RETRY.to_string(),
                };
                self.state = UploadState::Failed {
                    reason,
                    file: Some(ticket.file),
                };
            }
        }
        &self.state
    }

    /// Uploads the selected file and reports the resulting state.
    pub async fn submit(&mut self) -> Result<&UploadState, UploadRejection> {
        let ticket = self.begin()?;
        let gateway = Arc::clone(&self.gateway);

        let mut guard = InFlightGuard {
            seq: ticket.seq,
            workflow: &mut *self,
        };
        let result = gateway
            .upload_document(ticket.file.bytes(), ticket.file.filename())
            .await;
        guard.workflow.complete(ticket, result);
        drop(guard);
        Ok(&self.state)
    }
}

/// Puts the file back into `FileSelected` if a `submit` future is dropped
/// before the backend answers. After `complete` the upload is no longer in
/// flight and the guard does nothing.
struct InFlightGuard<'a> {
    seq: u64,
    workflow: &'a mut UploadWorkflow,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.workflow.in_flight != Some(self.seq) {
            return;
        }
        self.workflow.in_flight = None;
        if let UploadState::Uploading(file) = &self.workflow.state {
            warn!("Upload of {} abandoned", file.filename());
            self.workflow.state = UploadState::FileSelected(file.clone());
        }
    }
}
