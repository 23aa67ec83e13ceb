//! Whitelisted script execution inside the sandbox.
//!
//! One fixed interpreter, one accepted extension. The child runs with the
//! working root as its current directory so relative paths inside the script
//! see the same sandbox base as the tools do.

use std::process::Command;
use std::time::Duration;

use tracing::{debug, instrument};

use crate::core::tools::{ErrorKind, ToolError, ToolOutcome};
use crate::io::process::run_command_with_timeout;
use crate::io::sandbox::WorkingRoot;

/// The only extension `run-script` accepts.
pub const SCRIPT_EXTENSION: &str = ".py";

/// Execution limits and the interpreter binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptPolicy {
    pub interpreter: String,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

impl Default for ScriptPolicy {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            timeout: Duration::from_secs(30),
            output_limit_bytes: 100_000,
        }
    }
}

/// Run a sandboxed Python file and report its output.
///
/// The result is an `STDOUT:` block when trimmed stdout is non-empty, an
/// `STDERR:` block when trimmed stderr is non-empty, and an exit-code line
/// when the code is non-zero; blocks are separated by blank lines. A run
/// with none of those yields the fixed `No output produced.` sentinel.
#[instrument(skip_all, fields(file_path))]
pub fn run_script(
    root: &WorkingRoot,
    policy: &ScriptPolicy,
    file_path: &str,
    args: &[String],
) -> ToolOutcome {
    let resolved = root.resolve(file_path);
    if !resolved.contained {
        return Err(ToolError::new(
            ErrorKind::OutsideRoot,
            format!(
                "Cannot execute \"{file_path}\" as it is outside the permitted working directory"
            ),
        ));
    }
    // Checked on the path string as given, independent of resolution.
    if !file_path.ends_with(SCRIPT_EXTENSION) {
        return Err(ToolError::new(
            ErrorKind::WrongType,
            format!("\"{file_path}\" is not a Python file."),
        ));
    }
    if !resolved.path.is_file() {
        return Err(ToolError::new(
            ErrorKind::NotFound,
            format!("File \"{file_path}\" not found."),
        ));
    }

    let mut cmd = Command::new(&policy.interpreter);
    cmd.arg(&resolved.path).args(args).current_dir(root.path());

    let output = match run_command_with_timeout(cmd, policy.timeout, policy.output_limit_bytes) {
        Ok(output) => output,
        Err(err) => {
            return Err(ToolError::new(
                ErrorKind::Launch,
                format!("executing Python file: {err:#}"),
            ));
        }
    };

    if output.timed_out {
        return Err(ToolError::new(
            ErrorKind::TimedOut,
            format!(
                "The script timed out after {} seconds.",
                policy.timeout.as_secs()
            ),
        ));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stdout = stdout.trim();
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();

    let mut parts = Vec::new();
    if !stdout.is_empty() {
        parts.push(format!("STDOUT:\n{stdout}"));
    }
    if !stderr.is_empty() {
        parts.push(format!("STDERR:\n{stderr}"));
    }
    match output.status.code() {
        Some(0) => {}
        Some(code) => parts.push(format!("Process exited with code {code}")),
        None => parts.push("Process terminated by signal".to_string()),
    }

    debug!(file_path, blocks = parts.len(), "script finished");
    if parts.is_empty() {
        return Ok("No output produced.".to_string());
    }
    Ok(parts.join("\n\n"))
}
