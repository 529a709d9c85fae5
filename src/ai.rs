//! AI collaborator boundary: request/response types and the async dispatcher.
//!
//! The engine never awaits a model call. It emits an [`AiRequest`] carrying a
//! fresh [`RequestToken`]; the host hands it to an [`AiDispatcher`], which runs
//! the call on the tokio runtime under a timeout and queues an
//! [`AiCompletion`]. The host drains completions on its UI thread and feeds
//! them back to the owning session.

#[cfg(test)]
#[path = "ai_test.rs"]
mod ai_test;

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::doc::RequestToken;
use crate::session::SessionId;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by AI collaborator calls. All of them are recoverable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AiError {
    /// The service rejected the call or could not be reached.
    #[error("AI request failed: {0}")]
    Request(String),

    /// No answer within the configured timeout.
    #[error("AI request timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The answer could not be parsed into the expected structure.
    #[error("AI response malformed: {0}")]
    Malformed(String),
}

// =============================================================================
// REQUESTS
// =============================================================================

/// What the collaborator is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiKind {
    Summarize,
    Keywords,
    Quiz,
    Roadmap,
    Image,
    CleanTranscript,
    /// Recognize handwriting in a captured ink image.
    Handwriting,
    /// Assign the whole session to a category.
    Categorize,
}

impl AiKind {
    /// Whether the request produces a placeholder card while pending.
    #[must_use]
    pub fn uses_placeholder(self) -> bool {
        !matches!(self, Self::Handwriting | Self::Categorize)
    }

    /// Short label shown on a placeholder and stored as the card's prompt.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Summarize => "Summary",
            Self::Keywords => "Keywords",
            Self::Quiz => "Quiz",
            Self::Roadmap => "Roadmap",
            Self::Image => "Image",
            Self::CleanTranscript => "Transcript",
            Self::Handwriting => "Handwriting",
            Self::Categorize => "Category",
        }
    }
}

/// One outstanding call to the collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct AiRequest {
    pub token: RequestToken,
    pub kind: AiKind,
    /// Source text. Empty for handwriting.
    pub text: String,
    /// PNG input, used by handwriting recognition.
    pub image: Option<Vec<u8>>,
}

// =============================================================================
// RESPONSES
// =============================================================================

/// A summary bullet plus the verbatim quote it was drawn from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryPoint {
    pub text: String,
    #[serde(default)]
    pub source_quote: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    #[serde(default)]
    pub options: Vec<String>,
    /// Index into `options`.
    #[serde(default)]
    pub answer: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadmapStep {
    pub title: String,
    #[serde(default)]
    pub detail: String,
}

/// Well-formed result of a collaborator call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiOutput {
    Summary(Vec<SummaryPoint>),
    Keywords(Vec<String>),
    Quiz(Vec<QuizQuestion>),
    Roadmap(Vec<RoadmapStep>),
    /// Generated image as PNG bytes.
    Image(Vec<u8>),
    Transcript(String),
    Handwriting(String),
    Category(String),
}

impl AiOutput {
    /// Plain-text rendering for text cards. `None` for images.
    #[must_use]
    pub fn to_card_text(&self) -> Option<String> {
        match self {
            Self::Summary(points) => {
                Some(points.iter().map(|p| format!("• {}", p.text)).collect::<Vec<_>>().join("\n"))
            }
            Self::Keywords(words) => Some(words.iter().map(|w| format!("• {w}")).collect::<Vec<_>>().join("\n")),
            Self::Quiz(questions) => Some(
                questions
                    .iter()
                    .enumerate()
                    .map(|(i, q)| format_question(i + 1, q))
                    .collect::<Vec<_>>()
                    .join("\n\n"),
            ),
            Self::Roadmap(steps) => Some(
                steps
                    .iter()
                    .enumerate()
                    .map(|(i, s)| {
                        if s.detail.is_empty() {
                            format!("{}. {}", i + 1, s.title)
                        } else {
                            format!("{}. {}: {}", i + 1, s.title, s.detail)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            Self::Transcript(text) | Self::Handwriting(text) | Self::Category(text) => Some(text.clone()),
            Self::Image(_) => None,
        }
    }
}

fn format_question(number: usize, q: &QuizQuestion) -> String {
    let mut out = format!("{number}. {}", q.question);
    for (i, option) in q.options.iter().enumerate() {
        let marker = if i == q.answer { '*' } else { '-' };
        out.push_str(&format!("\n   {marker} {option}"));
    }
    out
}

/// Parse a schema-constrained JSON answer, tolerating a Markdown code fence.
///
/// # Errors
///
/// Returns [`AiError::Malformed`] when the payload does not match `T`.
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T, AiError> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(body.trim()).map_err(|e| AiError::Malformed(e.to_string()))
}

// =============================================================================
// SERVICE TRAIT
// =============================================================================

/// The external AI collaborator. Enables mocking in tests.
#[async_trait::async_trait]
pub trait AiService: Send + Sync {
    /// Run one request.
    ///
    /// # Errors
    ///
    /// Any [`AiError`]; the engine reports it and marks the card failed.
    async fn run(&self, request: &AiRequest) -> Result<AiOutput, AiError>;
}

// =============================================================================
// DISPATCHER
// =============================================================================

/// A finished call, routed back by session and token.
#[derive(Debug, Clone)]
pub struct AiCompletion {
    pub session_id: SessionId,
    pub token: RequestToken,
    pub result: Result<AiOutput, AiError>,
}

/// Fire-and-forget runner for AI requests.
///
/// There is no cancellation: a request always runs to completion or timeout,
/// and the owning session decides whether the answer is still wanted.
pub struct AiDispatcher {
    service: Arc<dyn AiService>,
    runtime: tokio::runtime::Handle,
    timeout: Duration,
    tx: mpsc::UnboundedSender<AiCompletion>,
    rx: mpsc::UnboundedReceiver<AiCompletion>,
}

impl AiDispatcher {
    /// Build a dispatcher that spawns onto `runtime`.
    #[must_use]
    pub fn new(service: Arc<dyn AiService>, runtime: tokio::runtime::Handle, timeout_secs: u64) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        info!(timeout_secs, "AI dispatcher configured");
        Self { service, runtime, timeout: Duration::from_secs(timeout_secs), tx, rx }
    }

    /// Start `request` in the background on behalf of `session_id`.
    pub fn dispatch(&self, session_id: SessionId, request: AiRequest) {
        let service = Arc::clone(&self.service);
        let tx = self.tx.clone();
        let timeout = self.timeout;
        debug!(%session_id, token = %request.token, kind = ?request.kind, "dispatching AI request");

        self.runtime.spawn(async move {
            let result = match tokio::time::timeout(timeout, service.run(&request)).await {
                Ok(result) => result,
                Err(_) => Err(AiError::Timeout { secs: timeout.as_secs() }),
            };
            if let Err(e) = &result {
                warn!(%session_id, token = %request.token, error = %e, "AI request failed");
            }
            let completion = AiCompletion { session_id, token: request.token, result };
            if tx.send(completion).is_err() {
                warn!(%session_id, token = %request.token, "AI completion dropped; dispatcher gone");
            }
        });
    }

    /// Every completion that has arrived so far, without blocking.
    pub fn drain(&mut self) -> Vec<AiCompletion> {
        let mut out = Vec::new();
        while let Ok(completion) = self.rx.try_recv() {
            out.push(completion);
        }
        out
    }

    /// Wait for the next completion.
    pub async fn next(&mut self) -> Option<AiCompletion> {
        self.rx.recv().await
    }
}
