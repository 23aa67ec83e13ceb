//! Bounded model/tool exchange loop.
//!
//! One run is single-threaded and processes one round at a time: send the
//! transcript, interpret the reply, maybe execute a tool, append, repeat.
//! Tool failures are recovered into result strings the model can react to;
//! a failed inference call aborts the run outright. That asymmetry is
//! deliberate.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::core::tools::{ToolInvocation, render_outcome};
use crate::core::transcript::{Transcript, Turn};
use crate::io::model::{Inference, ModelReply, TokenUsage};
use crate::registry::ToolRegistry;

/// Reason why the loop stopped. Each variant is a distinct terminal
/// condition the caller must handle; only inference faults are `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopStop {
    /// The model produced a final answer.
    Finished(String),
    /// The round budget ran out before a final answer.
    BudgetExhausted { rounds: u32 },
    /// A reply carried neither text nor a usable tool call.
    ProtocolViolation { round: u32 },
}

/// Summary of one agent run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopOutcome {
    /// Model calls made.
    pub rounds: u32,
    /// Token counts accumulated across all model calls.
    pub usage: TokenUsage,
    pub stop: LoopStop,
}

/// One executed tool round, reported through the `on_round` observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundRecord {
    pub round: u32,
    pub tool: String,
    pub result: String,
}

enum RoundAction {
    Finish(String),
    Execute {
        text: Option<String>,
        call: ToolInvocation,
    },
    Stall,
}

/// A tool call wins even when text accompanies it; text is final only on
/// its own. Neither present is a protocol violation.
fn classify(reply: ModelReply) -> RoundAction {
    match (reply.text, reply.call) {
        (text, Some(call)) => RoundAction::Execute { text, call },
        (Some(text), None) => RoundAction::Finish(text),
        (None, None) => RoundAction::Stall,
    }
}

/// Drive model/tool exchanges until a final answer, a protocol violation,
/// or `max_rounds` model calls.
///
/// `on_round` fires after every executed tool round with the result string
/// that was appended to the transcript.
pub fn run_loop<I: Inference, F: FnMut(&RoundRecord)>(
    inference: &I,
    registry: &ToolRegistry,
    prompt: &str,
    max_rounds: u32,
    mut on_round: F,
) -> Result<LoopOutcome> {
    let declarations = registry.declarations();
    let mut transcript = Transcript::new(prompt);
    let mut usage = TokenUsage::default();
    let mut rounds = 0u32;

    while rounds < max_rounds {
        let reply = inference.generate(&transcript, &declarations)?;
        usage.add(reply.usage);
        rounds += 1;

        match classify(reply) {
            RoundAction::Finish(text) => {
                info!(rounds, "model produced a final answer");
                return Ok(LoopOutcome {
                    rounds,
                    usage,
                    stop: LoopStop::Finished(text),
                });
            }
            RoundAction::Execute { text, call } => {
                let outcome = registry.dispatch(&call);
                if outcome.is_err() {
                    warn!(round = rounds, tool = %call.name, "tool invocation failed");
                }
                let result = render_outcome(&outcome);
                on_round(&RoundRecord {
                    round: rounds,
                    tool: call.name.clone(),
                    result: result.clone(),
                });
                debug!(round = rounds, tool = %call.name, "tool round appended");
                transcript.push(Turn::Model {
                    text,
                    call: Some(call.clone()),
                });
                transcript.push(Turn::Tool {
                    name: call.name,
                    result,
                });
            }
            RoundAction::Stall => {
                warn!(round = rounds, "reply had neither text nor a tool call");
                return Ok(LoopOutcome {
                    rounds,
                    usage,
                    stop: LoopStop::ProtocolViolation { round: rounds },
                });
            }
        }
    }

    info!(max_rounds, "round budget exhausted without a final answer");
    Ok(LoopOutcome {
        rounds,
        usage,
        stop: LoopStop::BudgetExhausted { rounds: max_rounds },
    })
}
