//! Test-only doubles for the inference backend.

use std::cell::RefCell;

use anyhow::{Result, anyhow};
use serde_json::{Map, Value};

use crate::core::tools::ToolInvocation;
use crate::core::transcript::Transcript;
use crate::io::model::{Inference, ModelReply, TokenUsage};
use crate::registry::Declaration;

/// Token counts the scripted backend attaches to every successful reply.
pub const SCRIPTED_PROMPT_TOKENS: u64 = 7;
pub const SCRIPTED_RESPONSE_TOKENS: u64 = 3;

/// One scripted reply (or fault), consumed in order.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Final text, no tool call.
    Text(String),
    /// Tool call, no text.
    Call {
        name: String,
        arguments: Map<String, Value>,
    },
    /// Tool call with accompanying text.
    CallWithText {
        text: String,
        name: String,
        arguments: Map<String, Value>,
    },
    /// Neither text nor call.
    Empty,
    /// Inference-call fault.
    Fault(String),
}

/// Build a `Call` reply from string arguments.
pub fn call_with(name: &str, args: &[(&str, &str)]) -> ScriptedReply {
    ScriptedReply::Call {
        name: name.to_string(),
        arguments: Map::from_iter(
            args.iter()
                .map(|(k, v)| ((*k).to_string(), Value::String((*v).to_string()))),
        ),
    }
}

/// Inference double that replays scripted replies without network traffic.
#[derive(Debug)]
pub struct ScriptedInference {
    replies: RefCell<Vec<ScriptedReply>>,
    repeat_last: bool,
    /// Transcript length observed at each call, for asserting growth.
    pub seen_turns: RefCell<Vec<usize>>,
}

impl ScriptedInference {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: RefCell::new(replies),
            repeat_last: false,
            seen_turns: RefCell::new(Vec::new()),
        }
    }

    /// Double that returns the same reply on every call.
    pub fn repeating(reply: ScriptedReply) -> Self {
        Self {
            replies: RefCell::new(vec![reply]),
            repeat_last: true,
            seen_turns: RefCell::new(Vec::new()),
        }
    }
}

impl Inference for ScriptedInference {
    fn generate(
        &self,
        transcript: &Transcript,
        _declarations: &[Declaration],
    ) -> Result<ModelReply> {
        self.seen_turns.borrow_mut().push(transcript.len());

        let mut replies = self.replies.borrow_mut();
        if replies.is_empty() {
            return Err(anyhow!("scripted inference exhausted"));
        }
        let reply = if self.repeat_last && replies.len() == 1 {
            replies[0].clone()
        } else {
            replies.remove(0)
        };

        let usage = TokenUsage {
            prompt: SCRIPTED_PROMPT_TOKENS,
            response: SCRIPTED_RESPONSE_TOKENS,
        };
        match reply {
            ScriptedReply::Text(text) => Ok(ModelReply {
                text: Some(text),
                call: None,
                usage,
            }),
            ScriptedReply::Call { name, arguments } => Ok(ModelReply {
                text: None,
                call: Some(ToolInvocation { name, arguments }),
                usage,
            }),
            ScriptedReply::CallWithText {
                text,
                name,
                arguments,
            } => Ok(ModelReply {
                text: Some(text),
                call: Some(ToolInvocation { name, arguments }),
                usage,
            }),
            ScriptedReply::Empty => Ok(ModelReply {
                usage,
                ..ModelReply::default()
            }),
            ScriptedReply::Fault(message) => Err(anyhow!(message)),
        }
    }
}
