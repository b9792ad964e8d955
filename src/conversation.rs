use crate::gateway::{Answer, Gateway, GatewayError, Scope};
use crate::models::Message;
use crate::registry::DocumentRegistry;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitRejection {
    #[error("question cannot be empty")]
    EmptyQuestion,
    #[error("a question is already pending")]
    QuestionPending,
    #[error("no documents to ask about")]
    NoDocuments,
    #[error("no matching question is pending")]
    NotPending,
}

/// The question currently awaiting an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuestion {
    seq: u64,
    question: String,
}

impl PendingQuestion {
    pub fn question(&self) -> &str {
        &self.question
    }
}

/// What a shell renders, in order: every message, then the "assistant is
/// responding" marker while a question is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptEntry<'a> {
    Message(&'a Message),
    Pending,
}

/// Ordered question/answer log with at most one question in flight.
pub struct ConversationEngine {
    gateway: Arc<dyn Gateway>,
    transcript: Vec<Message>,
    pending: Option<PendingQuestion>,
    next_seq: u64,
}

impl ConversationEngine {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            gateway,
            transcript: Vec::new(),
            pending: None,
            next_seq: 0,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.transcript
    }

    pub fn pending(&self) -> Option<&PendingQuestion> {
        self.pending.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn entries(&self) -> impl Iterator<Item = TranscriptEntry<'_>> {
        self.transcript
            .iter()
            .map(TranscriptEntry::Message)
            .chain(self.pending.as_ref().map(|_| TranscriptEntry::Pending))
    }

    /// Whether a shell should offer the question input at all.
    pub fn can_submit(&self, registry: &DocumentRegistry) -> bool {
        registry.has_documents() && !self.is_pending()
    }

    /// Checks the guards, appends the user turn and enters the pending state.
    /// The returned ticket is handed back to [`ConversationEngine::complete`].
    pub fn begin(
        &mut self,
        question: &str,
        registry: &DocumentRegistry,
    ) -> Result<PendingQuestion, SubmitRejection> {
        if !registry.has_documents() {
            return Err(SubmitRejection::NoDocuments);
        }
        if self.pending.is_some() {
            return Err(SubmitRejection::QuestionPending);
        }
        let question = question.trim();
        if question.is_empty() {
            return Err(SubmitRejection::EmptyQuestion);
        }

        self.next_seq += 1;
        let pending = PendingQuestion {
            seq: self.next_seq,
            question: question.to_string(),
        };
        self.transcript.push(Message::user(question));
        self.pending = Some(pending.clone());
        Ok(pending)
    }

    /// Appends the assistant turn for `ticket` and leaves the pending state.
    /// Failures become an ordinary assistant message prefixed with `Error: `.
    pub fn complete(
        &mut self,
        ticket: PendingQuestion,
        result: Result<Answer, GatewayError>,
    ) -> Result<&Message, SubmitRejection> {
        if self.pending.as_ref() != Some(&ticket) {
            return Err(SubmitRejection::NotPending);
        }
        self.pending = None;

        let reply = match result {
            Ok(answer) => {
                debug!("Answer received with {} source(s)", answer.sources.len());
                Message::assistant(answer.answer, answer.sources)
            }
            Err(err) => {
                warn!("Question failed: {}", err);
                Message::assistant(format!("Error: {}", err.reason()), Vec::new())
            }
        };
        self.transcript.push(reply);
        Ok(&self.transcript[self.transcript.len() - 1])
    }

    /// Asks `question` across every document and returns the assistant turn
    /// that was appended. Rejected submissions leave the transcript untouched
    /// and make no request.
    pub async fn submit(
        &mut self,
        question: &str,
        registry: &DocumentRegistry,
    ) -> Result<Message, SubmitRejection> {
        let ticket = self.begin(question, registry)?;
        let gateway = Arc::clone(&self.gateway);

        let mut guard = PendingGuard {
            seq: ticket.seq,
            engine: &mut *self,
        };
        let result = gateway.ask(ticket.question(), &Scope::All).await;
        let reply = guard.engine.complete(ticket, result).cloned();
        drop(guard);
        reply
    }
}

/// Clears the pending state if a `submit` future is dropped mid-request.
/// Once `complete` has run the pending slot no longer holds `seq` and the
/// guard does nothing.
struct PendingGuard<'a> {
    seq: u64,
    engine: &'a mut ConversationEngine,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.engine.pending.as_ref().is_some_and(|p| p.seq == self.seq) {
            self.engine.pending = None;
            warn!("Question abandoned before an answer arrived");
        }
    }
}
