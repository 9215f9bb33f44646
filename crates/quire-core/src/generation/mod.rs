//! Content generation: actions, the client boundary and the request
//! controller that streams results into a placeholder block.

mod controller;
mod gemini;
mod insights;
mod prompts;
#[cfg(any(test, feature = "test-support"))]
mod scripted;

pub use controller::{GenerationController, GenerationOutcome, PendingGeneration};
pub use gemini::GeminiClient;
pub use insights::{
    ActionItem, InsightMetrics, Insights, Priority, Sentiment, TaskStatus, TopicStat,
};
pub use prompts::{build_prompt, insights_prompt, SYSTEM_INSTRUCTION};
#[cfg(any(test, feature = "test-support"))]
pub use scripted::{Script, ScriptedClient};

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationAction {
    Summarize,
    FixSpelling,
    ImproveWriting,
    ContinueWriting,
    GenerateFromPrompt,
}

impl GenerationAction {
    pub const ALL: [GenerationAction; 5] = [
        GenerationAction::Summarize,
        GenerationAction::FixSpelling,
        GenerationAction::ImproveWriting,
        GenerationAction::ContinueWriting,
        GenerationAction::GenerateFromPrompt,
    ];
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationRequest {
    pub action: GenerationAction,
    pub context: String,
    pub instruction: Option<String>,
}

impl GenerationRequest {
    pub fn new(action: GenerationAction, context: impl Into<String>) -> Self {
        Self {
            action,
            context: context.into(),
            instruction: None,
        }
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    pub fn prompt(&self) -> String {
        build_prompt(self.action, &self.context, self.instruction.as_deref())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("a generation request is already in progress")]
    Busy,

    #[error("generation backend unavailable: {0}")]
    Unavailable(String),

    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for GenerationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<ureq::Error> for GenerationError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => {
                let message = response
                    .into_string()
                    .unwrap_or_else(|_| "unreadable error body".to_string());
                Self::Api { status, message }
            }
            ureq::Error::Transport(transport) => Self::Network(transport.to_string()),
        }
    }
}

pub type GenerationResult<T> = Result<T, GenerationError>;

/// Cumulative text snapshots: every item is the full text produced so far.
pub type SnapshotStream = BoxStream<'static, GenerationResult<String>>;

#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Start a streaming generation. Snapshots arrive in order, each one a
    /// continuation of the previous.
    async fn stream_generate(&self, request: GenerationRequest) -> GenerationResult<SnapshotStream>;

    /// One-shot structured (JSON) generation over `context`, shaped as
    /// [`Insights`].
    async fn generate_structured(&self, context: &str) -> GenerationResult<serde_json::Value>;
}
