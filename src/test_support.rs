use crate::gateway::{Answer, Gateway, GatewayError, Scope};
use crate::models::Document;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// In-memory stand-in for the retrieval service with scripted failures.
#[derive(Default)]
pub struct FakeGateway {
    state: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    documents: Vec<Document>,
    list_error: Option<GatewayError>,
    upload_error: Option<GatewayError>,
    answers: VecDeque<Result<Answer, GatewayError>>,
    hang_requests: bool,
    list_calls: usize,
    upload_calls: usize,
    delete_calls: usize,
    asked: Vec<(String, Scope)>,
}

pub fn doc(name: &str) -> Document {
    Document {
        id: name.to_string(),
        filename: name.to_string(),
        indexed: true,
    }
}

impl FakeGateway {
    pub fn with_documents(names: &[&str]) -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().documents = names.iter().map(|n| doc(n)).collect();
        fake
    }

    pub fn set_documents(&self, names: &[&str]) {
        self.state.lock().unwrap().documents = names.iter().map(|n| doc(n)).collect();
    }

    pub fn fail_list(&self, error: Option<GatewayError>) {
        self.state.lock().unwrap().list_error = error;
    }

    pub fn fail_upload(&self, error: Option<GatewayError>) {
        self.state.lock().unwrap().upload_error = error;
    }

    pub fn push_answer(&self, result: Result<Answer, GatewayError>) {
        self.state.lock().unwrap().answers.push_back(result);
    }

    pub fn hang_requests(&self) {
        self.state.lock().unwrap().hang_requests = true;
    }

    pub fn resume_requests(&self) {
        self.state.lock().unwrap().hang_requests = false;
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    pub fn upload_calls(&self) -> usize {
        self.state.lock().unwrap().upload_calls
    }

    pub fn delete_calls(&self) -> usize {
        self.state.lock().unwrap().delete_calls
    }

    pub fn asked(&self) -> Vec<(String, Scope)> {
        self.state.lock().unwrap().asked.clone()
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn list_documents(&self) -> Result<Vec<Document>, GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;
        match &state.list_error {
            Some(err) => Err(err.clone()),
            None => Ok(state.documents.clone()),
        }
    }

    async fn upload_document(&self, _bytes: &[u8], filename: &str) -> Result<(), GatewayError> {
        let hang = {
            let mut state = self.state.lock().unwrap();
            state.upload_calls += 1;
            state.hang_requests
        };
        if hang {
            std::future::pending::<()>().await;
        }
        let mut state = self.state.lock().unwrap();
        if let Some(err) = &state.upload_error {
            return Err(err.clone());
        }
        if !state.documents.iter().any(|d| d.filename == filename) {
            state.documents.push(doc(filename));
        }
        Ok(())
    }

    async fn delete_document(&self, filename: &str) -> Result<(), GatewayError> {
        let mut state = self.state.lock().unwrap();
        state.delete_calls += 1;
        let before = state.documents.len();
        state.documents.retain(|d| d.filename != filename);
        if state.documents.len() == before {
            return Err(GatewayError::Validation(format!(
                "Document {} not found",
                filename
            )));
        }
        Ok(())
    }

    async fn ask(&self, question: &str, scope: &Scope) -> Result<Answer, GatewayError> {
        let (hang, result) = {
            let mut state = self.state.lock().unwrap();
            state.asked.push((question.to_string(), scope.clone()));
            let result = state.answers.pop_front().unwrap_or_else(|| {
                Ok(Answer {
                    answer: "ok".into(),
                    sources: vec![],
                })
            });
            (state.hang_requests, result)
        };
        if hang {
            std::future::pending::<()>().await;
        }
        result
    }
}
