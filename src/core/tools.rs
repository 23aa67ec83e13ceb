//! Tool invocation and result types.
//!
//! The model requests work by symbolic name; the set of names is a closed
//! enum so dispatch is an exhaustive match rather than a runtime lookup that
//! can silently miss. Failures are typed internally ([`ToolError`]) and only
//! flattened to the `Error: ...` sentinel string at the model boundary.

use std::fmt;

use serde_json::{Map, Value};

/// The four operations the model may invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    ListDirectory,
    ReadFile,
    RunScript,
    WriteFile,
}

impl ToolKind {
    pub const ALL: [Self; 4] = [
        Self::ListDirectory,
        Self::ReadFile,
        Self::RunScript,
        Self::WriteFile,
    ];

    /// Symbolic name used on the wire.
    pub fn name(self) -> &'static str {
        match self {
            Self::ListDirectory => "list-directory",
            Self::ReadFile => "read-file",
            Self::RunScript => "run-script",
            Self::WriteFile => "write-file",
        }
    }

    /// Reverse of [`ToolKind::name`]. `None` marks an unknown tool; the
    /// caller turns that into an error result, never an abort.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

/// A model-issued request to execute one tool. Consumed exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Map<String, Value>,
}

/// Why a tool invocation failed. Recovered locally: every variant becomes a
/// descriptive result string fed back to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Requested path resolves outside the working root.
    OutsideRoot,
    /// Target does not exist.
    NotFound,
    /// Target exists but is not the expected kind (file vs. directory vs. script).
    WrongType,
    /// File content is not decodable as text.
    NotText,
    /// The OS denied access.
    PermissionDenied,
    /// Required argument missing or of the wrong shape.
    BadArguments,
    /// Child process could not be launched.
    Launch,
    /// Child process exceeded its wall-clock timeout.
    TimedOut,
    /// Tool name not in the registry.
    UnknownTool,
    /// Any other I/O failure.
    Io,
}

/// A failed tool invocation: a kind for tests and the loop, a detail
/// sentence for the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolError {
    pub kind: ErrorKind,
    pub detail: String,
}

impl ToolError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error: {}", self.detail)
    }
}

impl std::error::Error for ToolError {}

/// Result of one tool invocation, before serialization to the model.
pub type ToolOutcome = Result<String, ToolError>;

/// Flatten an outcome to the single string the model sees. This is the wire
/// contract: success payload verbatim, failure as an `Error: ...` sentence.
pub fn render_outcome(outcome: &ToolOutcome) -> String {
    match outcome {
        Ok(payload) => payload.clone(),
        Err(err) => err.to_string(),
    }
}
