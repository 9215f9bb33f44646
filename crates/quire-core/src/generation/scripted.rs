use super::{GenerationClient, GenerationError, GenerationRequest, GenerationResult, SnapshotStream};
use async_trait::async_trait;
use futures::channel::mpsc::UnboundedReceiver;
use futures::StreamExt;
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Canned response for one `stream_generate` call.
pub enum Script {
    /// Yield these snapshots, then end normally.
    Snapshots(Vec<String>),
    /// Yield these snapshots, then fail mid-stream.
    FailAfter(Vec<String>, String),
    /// Reject the call before any snapshot.
    Reject(String),
    /// Forward whatever the test pushes into the channel.
    Channel(UnboundedReceiver<GenerationResult<String>>),
}

impl Script {
    pub fn snapshots<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Snapshots(items.into_iter().map(Into::into).collect())
    }
}

/// In-memory [`GenerationClient`] that replays queued scripts in order.
#[derive(Default)]
pub struct ScriptedClient {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<GenerationRequest>>,
    structured: Mutex<Option<serde_json::Value>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, script: Script) -> &Self {
        self.scripts.lock().push_back(script);
        self
    }

    pub fn set_structured(&self, value: serde_json::Value) {
        *self.structured.lock() = Some(value);
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn stream_generate(&self, request: GenerationRequest) -> GenerationResult<SnapshotStream> {
        self.requests.lock().push(request);
        let script = self
            .scripts
            .lock()
            .pop_front()
            .ok_or_else(|| GenerationError::Unavailable("no script queued".into()))?;
        match script {
            Script::Snapshots(items) => Ok(futures::stream::iter(items.into_iter().map(Ok)).boxed()),
            Script::FailAfter(items, message) => {
                let failure = std::iter::once(Err(GenerationError::Network(message)));
                Ok(futures::stream::iter(items.into_iter().map(Ok).chain(failure)).boxed())
            }
            Script::Reject(message) => Err(GenerationError::Unavailable(message)),
            Script::Channel(receiver) => Ok(receiver.boxed()),
        }
    }

    async fn generate_structured(&self, _context: &str) -> GenerationResult<serde_json::Value> {
        self.structured
            .lock()
            .clone()
            .ok_or_else(|| GenerationError::Unavailable("no structured result queued".into()))
    }
}
