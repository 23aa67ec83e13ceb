//! Inference backend abstraction and the Gemini implementation.
//!
//! The [`Inference`] trait decouples the agent loop from the model API.
//! Tests use scripted backends that return predetermined replies without
//! any network traffic.

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, instrument};

use crate::core::tools::ToolInvocation;
use crate::core::transcript::{Transcript, Turn};
use crate::registry::Declaration;

/// Prompt/response token counts reported by the backend. Observational
/// only; never affects control flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt: u64,
    pub response: u64,
}

impl TokenUsage {
    pub fn add(&mut self, other: Self) {
        self.prompt += other.prompt;
        self.response += other.response;
    }
}

/// One model reply: final text, a tool call, or (degenerate) neither.
#[derive(Debug, Clone, Default)]
pub struct ModelReply {
    pub text: Option<String>,
    pub call: Option<ToolInvocation>,
    pub usage: TokenUsage,
}

/// Abstraction over the model API. An `Err` here aborts the whole run;
/// there is no retry.
pub trait Inference {
    fn generate(&self, transcript: &Transcript, declarations: &[Declaration])
    -> Result<ModelReply>;
}

/// Instruction text sent with every request.
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful AI coding agent.\n\n\
When the user asks a question or makes a request, make a function call plan. \
You can perform the following operations:\n\n\
- List files and directories\n\
- Read file contents\n\
- Execute Python files with optional arguments\n\
- Write or overwrite files\n\n\
All paths you provide should be relative to the working directory. You do not \
need to specify the working directory in your function calls as it is \
automatically injected for security reasons.";

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Backend that calls the Gemini `generateContent` endpoint.
pub struct GeminiModel {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
}

// Manual Debug: the key must not leak into logs.
impl std::fmt::Debug for GeminiModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiModel")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl GeminiModel {
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            api_key,
            model,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: WireContent,
    contents: Vec<WireContent>,
    tools: Vec<WireTools<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireTools<'a> {
    function_declarations: &'a [Declaration],
}

#[derive(Debug, Serialize, Deserialize)]
struct WireContent {
    role: String,
    #[serde(default)]
    parts: Vec<WirePart>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<WireFunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<WireFunctionResponse>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    #[serde(default)]
    args: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<WireContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

fn text_part(text: impl Into<String>) -> WirePart {
    WirePart {
        text: Some(text.into()),
        ..WirePart::default()
    }
}

/// Map the transcript onto Gemini wire roles. Tool results travel back as
/// `functionResponse` parts under the `user` role.
fn encode_transcript(transcript: &Transcript) -> Vec<WireContent> {
    let mut contents = Vec::with_capacity(transcript.len());
    for turn in transcript.turns() {
        match turn {
            Turn::User(text) => contents.push(WireContent {
                role: "user".to_string(),
                parts: vec![text_part(text)],
            }),
            Turn::Model { text, call } => {
                let mut parts = Vec::new();
                if let Some(text) = text {
                    parts.push(text_part(text));
                }
                if let Some(call) = call {
                    parts.push(WirePart {
                        function_call: Some(WireFunctionCall {
                            name: call.name.clone(),
                            args: call.arguments.clone(),
                        }),
                        ..WirePart::default()
                    });
                }
                contents.push(WireContent {
                    role: "model".to_string(),
                    parts,
                });
            }
            Turn::Tool { name, result } => contents.push(WireContent {
                role: "user".to_string(),
                parts: vec![WirePart {
                    function_response: Some(WireFunctionResponse {
                        name: name.clone(),
                        response: json!({ "result": result }),
                    }),
                    ..WirePart::default()
                }],
            }),
        }
    }
    contents
}

fn parse_reply(parsed: GenerateResponse) -> ModelReply {
    let usage = parsed
        .usage_metadata
        .map(|u| TokenUsage {
            prompt: u.prompt_token_count,
            response: u.candidates_token_count,
        })
        .unwrap_or_default();

    let mut text = String::new();
    let mut call = None;
    if let Some(content) = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
    {
        for part in content.parts {
            if let Some(chunk) = part.text {
                text.push_str(&chunk);
            }
            if call.is_none()
                && let Some(function_call) = part.function_call
            {
                call = Some(ToolInvocation {
                    name: function_call.name,
                    arguments: function_call.args,
                });
            }
        }
    }

    ModelReply {
        text: if text.trim().is_empty() { None } else { Some(text) },
        call,
        usage,
    }
}

impl Inference for GeminiModel {
    #[instrument(skip_all, fields(model = %self.model, turns = transcript.len()))]
    fn generate(
        &self,
        transcript: &Transcript,
        declarations: &[Declaration],
    ) -> Result<ModelReply> {
        let request = GenerateRequest {
            system_instruction: WireContent {
                role: "user".to_string(),
                parts: vec![text_part(SYSTEM_INSTRUCTION)],
            },
            contents: encode_transcript(transcript),
            tools: vec![WireTools {
                function_declarations: declarations,
            }],
        };

        let url = format!("{API_BASE}/{}:generateContent", self.model);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .context("send generateContent request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(anyhow!(
                "generateContent failed with status {status}: {body}"
            ));
        }

        let parsed: GenerateResponse =
            response.json().context("parse generateContent response")?;
        let reply = parse_reply(parsed);
        debug!(
            has_call = reply.call.is_some(),
            has_text = reply.text.is_some(),
            prompt_tokens = reply.usage.prompt,
            response_tokens = reply.usage.response,
            "model reply parsed"
        );
        Ok(reply)
    }
}
