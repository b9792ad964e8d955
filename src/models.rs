use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A document as reported by the backend's `/documents` listing.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: String,
    pub filename: String,
    pub indexed: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One transcript entry. Fields are private so that a user message can never
/// carry sources and nothing is edited after it is appended.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct Message {
    id: Uuid,
    role: Role,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sources: Option<Vec<String>>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            content: content.into(),
            sources: None,
        }
    }

    /// Assistant reply; an empty source list is dropped rather than stored.
    pub fn assistant(content: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            content: content.into(),
            sources: if sources.is_empty() {
                None
            } else {
                Some(sources)
            },
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn sources(&self) -> Option<&[String]> {
        self.sources.as_deref()
    }
}
