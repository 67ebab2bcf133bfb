//! AI task splitter.
//!
//! Turns a task title into a handful of subtask drafts, either from fixed
//! templates (`mock`) or by asking a generative-text endpoint (`real`).

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::AiConfig;

pub const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    #[default]
    Mock,
    Real,
}

impl SplitMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SplitMode::Mock => "mock",
            SplitMode::Real => "real",
        }
    }
}

impl fmt::Display for SplitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitMode {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(SplitMode::Mock),
            "real" => Ok(SplitMode::Real),
            _ => Err(crate::error::Error::InvalidArgument(format!(
                "invalid split mode '{s}' (expected mock|real)"
            ))),
        }
    }
}

/// A candidate subtask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtaskDraft {
    pub title: String,
    pub description: String,
}

impl SubtaskDraft {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplitError {
    #[error("missing API credential (pass --api-key or set the configured environment variable)")]
    MissingCredential,

    #[error("request failed: {0}")]
    Request(String),

    #[error("{0}")]
    Api(String),

    #[error("AI returned no content")]
    NoContent,

    #[error("AI returned malformed JSON: {0}")]
    MalformedJson(String),

    #[error("AI returned unexpected data: {0}")]
    InvalidShape(String),
}

impl SplitError {
    pub fn kind(&self) -> &'static str {
        match self {
            SplitError::MissingCredential => "missing_credential",
            SplitError::Request(_) => "request",
            SplitError::Api(_) => "api",
            SplitError::NoContent => "no_content",
            SplitError::MalformedJson(_) => "malformed_json",
            SplitError::InvalidShape(_) => "invalid_shape",
        }
    }
}

#[async_trait]
pub trait TaskSplitter: Send + Sync {
    async fn split(
        &self,
        title: &str,
        credential: &str,
        mode: SplitMode,
    ) -> Result<Vec<SubtaskDraft>, SplitError>;
}

/// Four fixed subtasks with the title interpolated.
pub fn mock_subtasks(title: &str) -> Vec<SubtaskDraft> {
    vec![
        SubtaskDraft::new(
            format!("Research: background for {title}"),
            "Gather context and look at existing solutions",
        ),
        SubtaskDraft::new(
            format!("Design: first plan for {title}"),
            "Choose the tools and the core features",
        ),
        SubtaskDraft::new(
            format!("Execute: first step of {title}"),
            "Set up the environment and build a demo",
        ),
        SubtaskDraft::new(
            format!("Review: check {title} for completeness"),
            "Fill the gaps and polish the details",
        ),
    ]
}

pub fn build_prompt(title: &str) -> String {
    format!(
        "You are an efficient task-planning assistant. Split the task \"{title}\" into 3 to 5 concrete subtasks.\n\
         Requirements:\n\
         1. The reply must be a pure JSON array.\n\
         2. Each object in the array has a \"title\" (subtask title) and a \"description\" (short description).\n\
         3. Do not use Markdown formatting such as ```json; return plain-text JSON only.\n\
         4. Answer in the same language as the task."
    )
}

/// Remove Markdown code-fence markers and surrounding whitespace.
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

/// Parse model output into drafts, rejecting anything not shaped like
/// `[{"title": "...", "description": "..."}, ...]`.
pub fn parse_subtasks(text: &str) -> Result<Vec<SubtaskDraft>, SplitError> {
    let cleaned = strip_code_fences(text);
    let value: Value =
        serde_json::from_str(&cleaned).map_err(|err| SplitError::MalformedJson(err.to_string()))?;
    let items = value
        .as_array()
        .ok_or_else(|| SplitError::InvalidShape("expected a JSON array".to_string()))?;

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let object = item
                .as_object()
                .ok_or_else(|| SplitError::InvalidShape(format!("item {idx} is not an object")))?;
            let title = object
                .get("title")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|title| !title.is_empty())
                .ok_or_else(|| SplitError::InvalidShape(format!("item {idx} has no title")))?;
            let description = match object.get("description") {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(text)) => text.trim().to_string(),
                Some(_) => {
                    return Err(SplitError::InvalidShape(format!(
                        "item {idx} description is not a string"
                    )))
                }
            };
            Ok(SubtaskDraft::new(title, description))
        })
        .collect()
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

/// Splitter backed by the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiSplitter {
    client: reqwest::Client,
    endpoint: String,
    mock_delay: Duration,
}

impl GeminiSplitter {
    pub fn new(endpoint: impl Into<String>, mock_delay: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            mock_delay,
        }
    }

    pub fn from_config(config: &AiConfig) -> Self {
        Self::new(
            config.endpoint.clone(),
            Duration::from_millis(config.mock_delay_ms),
        )
    }

    async fn request_subtasks(
        &self,
        title: &str,
        credential: &str,
    ) -> Result<Vec<SubtaskDraft>, SplitError> {
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart {
                    text: build_prompt(title),
                }],
            }],
        };

        debug!(endpoint = %self.endpoint, "requesting subtasks");
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", credential)])
            .json(&body)
            .send()
            .await
            .map_err(|err| SplitError::Request(err.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ApiErrorBody>()
                .await
                .ok()
                .and_then(|body| body.error)
                .and_then(|detail| detail.message)
                .unwrap_or_else(|| format!("API request failed ({status})"));
            return Err(SplitError::Api(message));
        }

        let payload = response
            .json::<GenerateResponse>()
            .await
            .map_err(|err| SplitError::MalformedJson(err.without_url().to_string()))?;
        let text = payload.first_text().ok_or(SplitError::NoContent)?;
        parse_subtasks(text)
    }
}

#[async_trait]
impl TaskSplitter for GeminiSplitter {
    async fn split(
        &self,
        title: &str,
        credential: &str,
        mode: SplitMode,
    ) -> Result<Vec<SubtaskDraft>, SplitError> {
        match mode {
            SplitMode::Mock => {
                tokio::time::sleep(self.mock_delay).await;
                Ok(mock_subtasks(title))
            }
            SplitMode::Real => {
                let credential = credential.trim();
                if credential.is_empty() {
                    return Err(SplitError::MissingCredential);
                }
                self.request_subtasks(title, credential).await
            }
        }
    }
}

/// Observable state of a split call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitState {
    pub loading: bool,
    pub error: Option<SplitError>,
}

/// Runs a splitter and tracks its loading flag and last error.
pub struct Expander<T> {
    splitter: T,
    state: watch::Sender<SplitState>,
}

impl<T: TaskSplitter> Expander<T> {
    pub fn new(splitter: T) -> Self {
        let (state, _) = watch::channel(SplitState::default());
        Self { splitter, state }
    }

    /// Watch state changes (loading set/cleared, errors).
    pub fn subscribe(&self) -> watch::Receiver<SplitState> {
        self.state.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<SplitError> {
        self.state.borrow().error.clone()
    }

    /// Ask for subtasks. Failures are recorded and yield an empty list.
    pub async fn run(&mut self, title: &str, credential: &str, mode: SplitMode) -> Vec<SubtaskDraft> {
        self.state.send_replace(SplitState {
            loading: true,
            error: None,
        });

        match self.splitter.split(title, credential, mode).await {
            Ok(drafts) => {
                info!(%mode, count = drafts.len(), "split finished");
                self.state.send_replace(SplitState::default());
                drafts
            }
            Err(err) => {
                warn!(%mode, kind = err.kind(), "split failed: {err}");
                self.state.send_replace(SplitState {
                    loading: false,
                    error: Some(err),
                });
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tokio::sync::Notify;

    use super::*;

    /// Returns a canned result, optionally waiting on a gate first.
    pub struct ScriptedSplitter {
        result: Result<Vec<SubtaskDraft>, SplitError>,
        gate: Option<Arc<Notify>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedSplitter {
        pub fn ok(drafts: Vec<SubtaskDraft>) -> Self {
            Self {
                result: Ok(drafts),
                gate: None,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn err(err: SplitError) -> Self {
            Self {
                result: Err(err),
                gate: None,
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        pub fn gated(mut self, gate: Arc<Notify>) -> Self {
            self.gate = Some(gate);
            self
        }

        pub fn calls(&self) -> Arc<AtomicUsize> {
            Arc::clone(&self.calls)
        }
    }

    #[async_trait]
    impl TaskSplitter for ScriptedSplitter {
        async fn split(
            &self,
            _title: &str,
            _credential: &str,
            _mode: SplitMode,
        ) -> Result<Vec<SubtaskDraft>, SplitError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.result.clone()
        }
    }
}
