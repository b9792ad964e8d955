use super::{Answer, Gateway, GatewayError, Scope};
use crate::config::{ClientConfig, ConfigError};
use crate::models::Document;
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

pub const UPLOAD_FAILED: &str = "Upload failed";
pub const DELETE_FAILED: &str = "Delete failed";
pub const ANSWER_FAILED: &str = "Failed to get answer. Please try again.";
pub const CONNECT_FAILED: &str =
    "Failed to connect to the server. Please make sure the backend is running.";

#[derive(Deserialize)]
struct DocumentsResponse {
    documents: Vec<Document>,
}

#[derive(Serialize)]
struct AskRequest<'a> {
    question: &'a str,
    document_ids: Option<&'a [String]>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// reqwest implementation of the retrieval service contract.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: Url,
}

impl HttpGateway {
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let base_url = config.endpoint()?;
        let mut builder =
            Client::builder().connect_timeout(Duration::from_secs(config.connect_timeout_secs));
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| ConfigError::Client(e.to_string()))?;

        info!("Retrieval service gateway: {}", base_url);
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Appends path segments to the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// What a non-2xx body said about the failure.
#[derive(Debug, PartialEq, Eq)]
enum ErrorDetail {
    Message(String),
    /// JSON, but no usable `detail`.
    Missing,
    /// Not JSON at all (proxy pages, empty bodies, truncated reads).
    Unreadable,
}

impl ErrorDetail {
    /// Parses a FastAPI-style error body. String details are used as-is;
    /// structured ones (422 validation lists) are rendered as JSON.
    fn parse(text: &str) -> Self {
        let Ok(body) = serde_json::from_str::<ErrorBody>(text) else {
            return Self::Unreadable;
        };
        match body.detail {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Self::Message(s),
            None | Some(serde_json::Value::Null) | Some(serde_json::Value::String(_)) => {
                Self::Missing
            }
            Some(other) => Self::Message(other.to_string()),
        }
    }

    async fn from_response(resp: Response) -> Self {
        match resp.text().await {
            Ok(text) => Self::parse(&text),
            Err(_) => Self::Unreadable,
        }
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn list_documents(&self) -> Result<Vec<Document>, GatewayError> {
        let url = self.url(&["documents"]);
        debug!("GET {}", url);

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = match ErrorDetail::from_response(resp).await {
                ErrorDetail::Message(detail) => format!("listing returned {}: {}", status, detail),
                ErrorDetail::Missing | ErrorDetail::Unreadable => {
                    format!("listing returned {}", status)
                }
            };
            return Err(GatewayError::Protocol(message));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;
        let data: DocumentsResponse =
            serde_json::from_slice(&body).map_err(|e| GatewayError::Protocol(e.to_string()))?;
        Ok(data.documents)
    }

    async fn upload_document(&self, bytes: &[u8], filename: &str) -> Result<(), GatewayError> {
        let url = self.url(&["upload"]);
        debug!("POST {} ({}, {} bytes)", url, filename, bytes.len());

        let part = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            return Err(match ErrorDetail::from_response(resp).await {
                ErrorDetail::Message(detail) => GatewayError::Validation(detail),
                ErrorDetail::Missing => GatewayError::Validation(UPLOAD_FAILED.to_string()),
                ErrorDetail::Unreadable => {
                    GatewayError::Protocol(format!("upload returned {} with no JSON body", status))
                }
            });
        }
        Ok(())
    }

    async fn delete_document(&self, filename: &str) -> Result<(), GatewayError> {
        let url = self.url(&["documents", filename]);
        debug!("DELETE {}", url);

        let resp = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|e| GatewayError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            return Err(match ErrorDetail::from_response(resp).await {
                ErrorDetail::Message(detail) => GatewayError::Validation(detail),
                ErrorDetail::Missing => GatewayError::Validation(DELETE_FAILED.to_string()),
                ErrorDetail::Unreadable => {
                    GatewayError::Protocol(format!("delete returned {} with no JSON body", status))
                }
            });
        }
        Ok(())
    }

    async fn ask(&self, question: &str, scope: &Scope) -> Result<Answer, GatewayError> {
        let url = self.url(&["ask"]);
        debug!("POST {} (scope: {:?})", url, scope);

        let body = AskRequest {
            question,
            document_ids: scope.document_ids(),
        };

        let resp = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                debug!("ask transport failure: {}", e);
                GatewayError::Answer(CONNECT_FAILED.to_string())
            })?;

        if !resp.status().is_success() {
            let reason = match ErrorDetail::from_response(resp).await {
                ErrorDetail::Message(detail) => detail,
                ErrorDetail::Missing => ANSWER_FAILED.to_string(),
                ErrorDetail::Unreadable => CONNECT_FAILED.to_string(),
            };
            return Err(GatewayError::Answer(reason));
        }

        // A 2xx body that cannot be read or decoded is reported the same way
        // the connectivity failure is.
        let body = resp.bytes().await.map_err(|e| {
            debug!("ask body read failure: {}", e);
            GatewayError::Answer(CONNECT_FAILED.to_string())
        })?;
        serde_json::from_slice::<Answer>(&body).map_err(|e| {
            debug!("ask decode failure: {}", e);
            GatewayError::Answer(CONNECT_FAILED.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(base: &str) -> HttpGateway {
        HttpGateway::new(&ClientConfig {
            base_url: base.into(),
            ..ClientConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_url_joins_segments() {
        let gw = gateway("http://localhost:8000");
        assert_eq!(gw.url(&["documents"]).as_str(), "http://localhost:8000/documents");
    }

    #[test]
    fn test_url_keeps_base_path() {
        let gw = gateway("http://rag.internal/api/");
        assert_eq!(gw.url(&["ask"]).as_str(), "http://rag.internal/api/ask");
    }

    #[test]
    fn test_url_encodes_filename_segment() {
        let gw = gateway("http://localhost:8000");
        let url = gw.url(&["documents", "q1 report/final.pdf"]);
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/documents/q1%20report%2Ffinal.pdf"
        );
    }

    #[test]
    fn test_ask_request_serializes_null_for_all() {
        let body = AskRequest {
            question: "q",
            document_ids: Scope::All.document_ids(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({"question": "q", "document_ids": null}));
    }

    #[test]
    fn test_error_detail_distinguishes_missing_from_unreadable() {
        assert_eq!(
            ErrorDetail::parse(r#"{"detail": "too large"}"#),
            ErrorDetail::Message("too large".into())
        );
        assert_eq!(ErrorDetail::parse(r#"{"detail": ""}"#), ErrorDetail::Missing);
        assert_eq!(ErrorDetail::parse(r#"{"detail": null}"#), ErrorDetail::Missing);
        assert_eq!(ErrorDetail::parse(r#"{"error": "x"}"#), ErrorDetail::Missing);
        assert_eq!(ErrorDetail::parse("<html>Bad Gateway</html>"), ErrorDetail::Unreadable);
        assert_eq!(ErrorDetail::parse(""), ErrorDetail::Unreadable);
    }

    #[test]
    fn test_error_detail_renders_structured_detail() {
        let detail = ErrorDetail::parse(r#"{"detail": [{"msg": "field required"}]}"#);
        assert_eq!(detail, ErrorDetail::Message(r#"[{"msg":"field required"}]"#.into()));
    }

    #[test]
    fn test_new_rejects_invalid_base_url() {
        let result = HttpGateway::new(&ClientConfig {
            base_url: "localhost:8000".into(),
            ..ClientConfig::default()
        });
        assert!(result.is_err());
    }
}
