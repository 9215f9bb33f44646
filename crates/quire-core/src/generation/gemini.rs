use super::prompts::{insights_prompt, SYSTEM_INSTRUCTION};
use super::{GenerationClient, GenerationError, GenerationRequest, GenerationResult, SnapshotStream};
use crate::config::EditorConfig;
use async_trait::async_trait;
use futures::channel::mpsc::{self, UnboundedSender};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{BufRead, BufReader};
use std::time::Duration;

/// Gemini REST backend. Requests run on tokio's blocking pool through
/// `ureq`; streamed text is forwarded as cumulative snapshots.
#[derive(Clone)]
pub struct GeminiClient {
    agent: ureq::Agent,
    api_base: String,
    api_key: String,
    model: String,
    system_instruction: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody<'a> {
    contents: [Content<'a>; 1],
    system_instruction: SystemInstruction<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct SystemInstruction<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn text(&self) -> String {
        self.candidates
            .iter()
            .filter_map(|candidate| candidate.content.as_ref())
            .flat_map(|content| content.parts.iter())
            .filter_map(|part| part.text.as_deref())
            .collect()
    }
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, api_base: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .build();
        Self {
            agent,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
        }
    }

    pub fn from_config(config: &EditorConfig) -> GenerationResult<Self> {
        let api_key = config.api_key().ok_or_else(|| {
            GenerationError::Unavailable(format!("{} is not set", config.api_key_env))
        })?;
        let mut client = Self::new(api_key, &config.model, &config.api_base);
        client.system_instruction = config.system_instruction.clone();
        Ok(client)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/models/{}:{method}", self.api_base, self.model)
    }

    fn body<'a>(&'a self, prompt: &'a str, json: bool) -> GenerateBody<'a> {
        GenerateBody {
            contents: [Content {
                role: "user",
                parts: [Part { text: prompt }],
            }],
            system_instruction: SystemInstruction {
                parts: [Part {
                    text: &self.system_instruction,
                }],
            },
            generation_config: json.then_some(GenerationConfig {
                response_mime_type: "application/json",
            }),
        }
    }

    fn stream_blocking(&self, prompt: &str, tx: &UnboundedSender<GenerationResult<String>>) -> GenerationResult<()> {
        let body = serde_json::to_value(self.body(prompt, false))?;
        let response = self
            .agent
            .post(&self.endpoint("streamGenerateContent"))
            .query("alt", "sse")
            .query("key", &self.api_key)
            .send_json(body)?;

        let reader = BufReader::new(response.into_reader());
        let mut full_text = String::new();
        for line in reader.lines() {
            let line = line?;
            let Some(payload) = parse_sse_data(&line) else {
                continue;
            };
            let chunk: GenerateResponse = serde_json::from_str(payload)?;
            let text = chunk.text();
            if text.is_empty() {
                continue;
            }
            full_text.push_str(&text);
            if tx.unbounded_send(Ok(full_text.clone())).is_err() {
                tracing::debug!(model = %self.model, "snapshot receiver dropped, aborting stream");
                return Ok(());
            }
        }
        Ok(())
    }

    fn structured_blocking(&self, prompt: &str) -> GenerationResult<Value> {
        let body = serde_json::to_value(self.body(prompt, true))?;
        let response: GenerateResponse = self
            .agent
            .post(&self.endpoint("generateContent"))
            .query("key", &self.api_key)
            .send_json(body)?
            .into_json()?;
        let text = response.text();
        if text.trim().is_empty() {
            return Err(GenerationError::Decode("empty structured response".into()));
        }
        Ok(serde_json::from_str(&text)?)
    }
}

fn parse_sse_data(line: &str) -> Option<&str> {
    let payload = line.strip_prefix("data:")?.trim();
    if payload.is_empty() || payload == "[DONE]" {
        None
    } else {
        Some(payload)
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn stream_generate(&self, request: GenerationRequest) -> GenerationResult<SnapshotStream> {
        let prompt = request.prompt();
        let client = self.clone();
        let (tx, rx) = mpsc::unbounded();
        tracing::debug!(action = ?request.action, model = %self.model, "starting gemini stream");
        tokio::task::spawn_blocking(move || {
            if let Err(err) = client.stream_blocking(&prompt, &tx) {
                let _ = tx.unbounded_send(Err(err));
            }
        });
        Ok(rx.boxed())
    }

    async fn generate_structured(&self, context: &str) -> GenerationResult<Value> {
        let client = self.clone();
        let prompt = insights_prompt(context);
        tokio::task::spawn_blocking(move || client.structured_blocking(&prompt))
            .await
            .map_err(|err| GenerationError::Unavailable(format!("structured task failed: {err}")))?
    }
}
