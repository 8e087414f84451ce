//! Backend client: typed contracts for every call the assessment makes to the
//! external analysis service.
//!
//! Calls are never retried. A failure is returned to the caller, which shows it
//! and waits for the user to repeat the action.

pub mod models;
pub mod upload;

use async_trait::async_trait;
use reqwest::{multipart, Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::backend::models::{
    AnalysisOutcome, AnswerMap, FinalizeEnvelope, FinalizeRequest, GenerateQuestionsRequest,
    Question, QuestionList, SubmitAnswersResponse, UploadResumeResponse,
};
use crate::backend::upload::ResumeFile;
use crate::validation::ValidationError;

pub const DEFAULT_API_URL: &str = "http://localhost:3001/api";

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Reads `API_URL`, falling back to the local development backend.
    pub fn from_env() -> Self {
        Self::new(std::env::var("API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned status {status}")]
    Server {
        status: u16,
        message: Option<String>,
    },

    #[error("Backend rejected the request")]
    Rejected { message: Option<String> },

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl BackendError {
    /// Message to show the user: the server's own message when it sent one,
    /// otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            BackendError::Server {
                message: Some(message),
                ..
            }
            | BackendError::Rejected {
                message: Some(message),
            } => message.clone(),
            BackendError::Invalid(err) => err.to_string(),
            _ => fallback.to_string(),
        }
    }
}

/// The five backend operations the assessment depends on. `HttpBackend` is
/// the production implementation; tests swap in in-memory fakes.
#[async_trait]
pub trait AssessmentBackend: Send + Sync {
    async fn fetch_initial_questions(&self) -> Result<Vec<Question>, BackendError>;

    async fn submit_initial_answers(
        &self,
        answers: &AnswerMap,
    ) -> Result<SubmitAnswersResponse, BackendError>;

    async fn upload_resume(&self, file: &ResumeFile)
        -> Result<UploadResumeResponse, BackendError>;

    async fn generate_dynamic_questions(
        &self,
        request: &GenerateQuestionsRequest,
    ) -> Result<Vec<Question>, BackendError>;

    async fn finalize_analysis(
        &self,
        request: &FinalizeRequest,
    ) -> Result<AnalysisOutcome, BackendError>;
}

/// reqwest-backed client. Keeps a cookie store so every call carries the
/// backend's session cookie.
#[derive(Clone)]
pub struct HttpBackend {
    config: BackendConfig,
    client: Client,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(concat!("career-portal/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        debug!("POST {path}");
        let response = self.client.post(self.url(path)).json(body).send().await?;
        read_envelope(response).await
    }
}

#[async_trait]
impl AssessmentBackend for HttpBackend {
    async fn fetch_initial_questions(&self) -> Result<Vec<Question>, BackendError> {
        debug!("GET questions");
        let response = self.client.get(self.url("questions")).send().await?;
        let list: QuestionList = read_envelope(response).await?;
        debug!(count = list.data.len(), "Fetched initial questions");
        Ok(list.data)
    }

    async fn submit_initial_answers(
        &self,
        answers: &AnswerMap,
    ) -> Result<SubmitAnswersResponse, BackendError> {
        self.post_json("answers", answers).await
    }

    async fn upload_resume(
        &self,
        file: &ResumeFile,
    ) -> Result<UploadResumeResponse, BackendError> {
        file.validate()?;

        let part = multipart::Part::bytes(file.bytes.to_vec())
            .file_name(file.file_name.clone())
            .mime_str(&file.mime_type)?;
        let form = multipart::Form::new().part("resume", part);

        debug!(size = file.size(), "POST upload-resume");
        let response = self
            .client
            .post(self.url("upload-resume"))
            .multipart(form)
            .send()
            .await?;
        read_envelope(response).await
    }

    async fn generate_dynamic_questions(
        &self,
        request: &GenerateQuestionsRequest,
    ) -> Result<Vec<Question>, BackendError> {
        let list: QuestionList = self.post_json("generate-questions", request).await?;
        debug!(count = list.data.len(), "Generated dynamic questions");
        Ok(list.data)
    }

    async fn finalize_analysis(
        &self,
        request: &FinalizeRequest,
    ) -> Result<AnalysisOutcome, BackendError> {
        let envelope: FinalizeEnvelope = self.post_json("finalize-analysis", request).await?;
        Ok(envelope.data)
    }
}

/// Decodes a `{success, ...}` envelope. Non-2xx statuses and `success: false`
/// bodies both become errors carrying the server's message when present.
async fn read_envelope<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let status = response.status();
    let body = response.bytes().await?;

    if !status.is_success() {
        let message = serde_json::from_slice::<Value>(&body)
            .ok()
            .and_then(|v| extract_message(&v));
        warn!(
            "Backend returned {}: {}",
            status,
            message.as_deref().unwrap_or("<no message>")
        );
        return Err(BackendError::Server {
            status: status.as_u16(),
            message,
        });
    }

    let value: Value = serde_json::from_slice(&body)?;
    if value.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(BackendError::Rejected {
            message: extract_message(&value),
        });
    }

    Ok(serde_json::from_value(value)?)
}

fn extract_message(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .or_else(|| body.pointer("/error/message").and_then(Value::as_str))
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
}
