//! Agent configuration loaded from an optional TOML file.
//!
//! Intended to be edited by humans and remain stable. Missing fields (or a
//! missing file) fall back to defaults that match the original agent's
//! behavior.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::io::script::ScriptPolicy;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum model/tool exchanges before the run stops with budget
    /// exhaustion.
    pub max_rounds: u32,

    /// Character limit for `read-file` before truncation.
    pub read_limit_chars: usize,

    /// Wall-clock timeout for `run-script` in seconds.
    pub script_timeout_secs: u64,

    /// Truncate captured script stdout/stderr beyond this many bytes.
    pub script_output_limit_bytes: usize,

    /// Interpreter binary used by `run-script`.
    pub interpreter: String,

    /// Model identifier sent to the inference service.
    pub model: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_rounds: 20,
            read_limit_chars: 10_000,
            script_timeout_secs: 30,
            script_output_limit_bytes: 100_000,
            interpreter: "python3".to_string(),
            model: "gemini-2.0-flash-001".to_string(),
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_rounds == 0 {
            return Err(anyhow!("max_rounds must be > 0"));
        }
        if self.read_limit_chars == 0 {
            return Err(anyhow!("read_limit_chars must be > 0"));
        }
        if self.script_timeout_secs == 0 {
            return Err(anyhow!("script_timeout_secs must be > 0"));
        }
        if self.script_output_limit_bytes == 0 {
            return Err(anyhow!("script_output_limit_bytes must be > 0"));
        }
        if self.interpreter.trim().is_empty() {
            return Err(anyhow!("interpreter must be non-empty"));
        }
        if self.model.trim().is_empty() {
            return Err(anyhow!("model must be non-empty"));
        }
        Ok(())
    }

    /// Script-execution slice of the config.
    pub fn script_policy(&self) -> ScriptPolicy {
        ScriptPolicy {
            interpreter: self.interpreter.clone(),
            timeout: Duration::from_secs(self.script_timeout_secs),
            output_limit_bytes: self.script_output_limit_bytes,
        }
    }
}

/// Load config from a TOML file.
///
/// `None` or a missing file returns `AgentConfig::default()`.
pub fn load_config(path: Option<&Path>) -> Result<AgentConfig> {
    let Some(path) = path else {
        let cfg = AgentConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    };
    if !path.exists() {
        let cfg = AgentConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AgentConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
