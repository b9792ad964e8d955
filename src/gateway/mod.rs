pub mod http;

use crate::models::Document;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use http::HttpGateway;

/// Which documents a question is asked against.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Scope {
    /// The whole registry. Sent as `document_ids: null`.
    #[default]
    All,
    /// A specific set of document ids. Not used by the session today but part
    /// of the backend contract.
    Subset(Vec<String>),
}

impl Scope {
    pub fn document_ids(&self) -> Option<&[String]> {
        match self {
            Scope::All => None,
            Scope::Subset(ids) => Some(ids),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Answer {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Network boundary to the retrieval service. Holds no session state.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn list_documents(&self) -> Result<Vec<Document>, GatewayError>;

    async fn upload_document(&self, bytes: &[u8], filename: &str) -> Result<(), GatewayError>;

    async fn delete_document(&self, filename: &str) -> Result<(), GatewayError>;

    async fn ask(&self, question: &str, scope: &Scope) -> Result<Answer, GatewayError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The request could not be sent or completed.
    #[error("Network error: {0}")]
    Network(String),
    /// A response arrived but did not have the expected shape.
    #[error("Protocol error: {0}")]
    Protocol(String),
    /// The backend rejected the input.
    #[error("{0}")]
    Validation(String),
    /// Ask-specific failure with a user-facing reason.
    #[error("{0}")]
    Answer(String),
}

impl GatewayError {
    /// The human-readable reason without the classification prefix.
    pub fn reason(&self) -> &str {
        match self {
            GatewayError::Network(reason)
            | GatewayError::Protocol(reason)
            | GatewayError::Validation(reason)
            | GatewayError::Answer(reason) => reason,
        }
    }
}

impl Serialize for GatewayError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_document_ids() {
        assert_eq!(Scope::All.document_ids(), None);
        let subset = Scope::Subset(vec!["a".into()]);
        assert_eq!(subset.document_ids(), Some(&["a".to_string()][..]));
    }

    #[test]
    fn test_reason_strips_classification() {
        let err = GatewayError::Network("connection refused".into());
        assert_eq!(err.to_string(), "Network error: connection refused");
        assert_eq!(err.reason(), "connection refused");

        let err = GatewayError::Answer("No documents indexed".into());
        assert_eq!(err.to_string(), "No documents indexed");
    }

    #[test]
    fn test_error_serializes_as_display_string() {
        let err = GatewayError::Protocol("missing field `documents`".into());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json, "Protocol error: missing field `documents`");
    }

    #[test]
    fn test_answer_tolerates_missing_sources_and_extra_fields() {
        let answer: Answer =
            serde_json::from_str(r#"{"question": "q", "answer": "a"}"#).unwrap();
        assert_eq!(answer.answer, "a");
        assert!(answer.sources.is_empty());
    }
}
