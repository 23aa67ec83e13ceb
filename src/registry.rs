//! Dispatch from symbolic tool names to sandboxed operations.
//!
//! The registry closes over the working root: the model never supplies it
//! and never sees it, and a root-like argument in an invocation is simply
//! ignored rather than honored. An unrecognized name becomes an error
//! result fed back to the model, never an abort of the run.

use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::core::tools::{ErrorKind, ToolError, ToolInvocation, ToolKind, ToolOutcome};
use crate::io::files;
use crate::io::sandbox::WorkingRoot;
use crate::io::script::{ScriptPolicy, run_script};

/// Model-facing description of one tool, serialized into the request's
/// function declarations. Descriptive only; argument validation belongs to
/// each operation.
#[derive(Debug, Clone, Serialize)]
pub struct Declaration {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug)]
pub struct ToolRegistry {
    root: WorkingRoot,
    read_limit_chars: usize,
    script: ScriptPolicy,
}

impl ToolRegistry {
    pub fn new(root: WorkingRoot, read_limit_chars: usize, script: ScriptPolicy) -> Self {
        Self {
            root,
            read_limit_chars,
            script,
        }
    }

    /// Execute one invocation. Consumes it conceptually: callers pass each
    /// model-issued invocation here exactly once.
    pub fn dispatch(&self, invocation: &ToolInvocation) -> ToolOutcome {
        let Some(kind) = ToolKind::from_name(&invocation.name) else {
            return Err(ToolError::new(
                ErrorKind::UnknownTool,
                format!("Unknown tool \"{}\"", invocation.name),
            ));
        };
        debug!(tool = kind.name(), "dispatching tool invocation");
        match kind {
            ToolKind::ListDirectory => {
                let directory = opt_str_arg(invocation, "directory").unwrap_or(".");
                files::list_directory(&self.root, directory)
            }
            ToolKind::ReadFile => {
                let file_path = require_str_arg(invocation, "file_path")?;
                files::read_file(&self.root, file_path, self.read_limit_chars)
            }
            ToolKind::RunScript => {
                let file_path = require_str_arg(invocation, "file_path")?;
                let args = str_list_arg(invocation, "args")?;
                run_script(&self.root, &self.script, file_path, &args)
            }
            ToolKind::WriteFile => {
                let file_path = require_str_arg(invocation, "file_path")?;
                let content = require_str_arg(invocation, "content")?;
                files::write_file(&self.root, file_path, content)
            }
        }
    }

    /// Capability description sent to the model with every request.
    pub fn declarations(&self) -> Vec<Declaration> {
        vec![
            Declaration {
                name: ToolKind::ListDirectory.name().to_string(),
                description: "Lists files in the specified directory along with their sizes, \
                              constrained to the working directory."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "directory": {
                            "type": "string",
                            "description": "The directory to list files from, relative to the \
                                            working directory. If not provided, lists the working \
                                            directory itself."
                        }
                    }
                }),
            },
            Declaration {
                name: ToolKind::ReadFile.name().to_string(),
                description: format!(
                    "Reads and returns the first {} characters of the specified file, \
                     constrained to the working directory.",
                    self.read_limit_chars
                ),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "file_path": {
                            "type": "string",
                            "description": "The file to read, relative to the working directory."
                        }
                    },
                    "required": ["file_path"]
                }),
            },
            Declaration {
                name: ToolKind::RunScript.name().to_string(),
                description: "Executes a Python file within the working directory and returns \
                              the output from the interpreter."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "file_path": {
                            "type": "string",
                            "description": "The Python file to execute, relative to the working \
                                            directory."
                        },
                        "args": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "Optional command-line arguments for the script."
                        }
                    },
                    "required": ["file_path"]
                }),
            },
            Declaration {
                name: ToolKind::WriteFile.name().to_string(),
                description: "Writes content to a file within the working directory, creating \
                              it if missing and overwriting it otherwise."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "file_path": {
                            "type": "string",
                            "description": "The file to write, relative to the working directory."
                        },
                        "content": {
                            "type": "string",
                            "description": "The full content to write."
                        }
                    },
                    "required": ["file_path", "content"]
                }),
            },
        ]
    }
}

fn require_str_arg<'a>(invocation: &'a ToolInvocation, key: &str) -> Result<&'a str, ToolError> {
    invocation
        .arguments
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ToolError::new(
                ErrorKind::BadArguments,
                format!(
                    "Missing or invalid \"{key}\" argument for {}",
                    invocation.name
                ),
            )
        })
}

fn opt_str_arg<'a>(invocation: &'a ToolInvocation, key: &str) -> Option<&'a str> {
    invocation.arguments.get(key).and_then(Value::as_str)
}

fn str_list_arg(invocation: &ToolInvocation, key: &str) -> Result<Vec<String>, ToolError> {
    let Some(value) = invocation.arguments.get(key) else {
        return Ok(Vec::new());
    };
    let Some(items) = value.as_array() else {
        return Err(ToolError::new(
            ErrorKind::BadArguments,
            format!("\"{key}\" argument for {} must be an array of strings", invocation.name),
        ));
    };
    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                ToolError::new(
                    ErrorKind::BadArguments,
                    format!(
                        "\"{key}\" argument for {} must be an array of strings",
                        invocation.name
                    ),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use std::fs;

    fn registry() -> (tempfile::TempDir, ToolRegistry) {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = WorkingRoot::new(temp.path()).expect("working root");
        let registry = ToolRegistry::new(root, 10_000, ScriptPolicy::default());
        (temp, registry)
    }

    fn invocation(name: &str, args: &[(&str, Value)]) -> ToolInvocation {
        ToolInvocation {
            name: name.to_string(),
            arguments: Map::from_iter(
                args.iter().map(|(k, v)| ((*k).to_string(), v.clone())),
            ),
        }
    }

    #[test]
    fn unknown_tool_is_an_error_result() {
        let (_temp, registry) = registry();
        let err = registry
            .dispatch(&invocation("teleport", &[]))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownTool);
        assert_eq!(err.to_string(), "Error: Unknown tool \"teleport\"");
    }

    #[test]
    fn list_defaults_to_the_working_root() {
        let (temp, registry) = registry();
        fs::write(temp.path().join("hello.txt"), "hi").expect("write");

        let listing = registry
            .dispatch(&invocation("list-directory", &[]))
            .expect("listing");
        assert!(listing.contains("- hello.txt: file_size=2 bytes, is_dir=false"));
    }

    #[test]
    fn model_supplied_working_root_is_ignored() {
        let (temp, registry) = registry();
        fs::write(temp.path().join("sandboxed.txt"), "x").expect("write");

        // A model trying to redirect the sandbox gets the fixed root anyway.
        let listing = registry
            .dispatch(&invocation(
                "list-directory",
                &[
                    ("working_directory", Value::String("/".to_string())),
                    ("directory", Value::String(".".to_string())),
                ],
            ))
            .expect("listing");
        assert!(listing.contains("sandboxed.txt"));
        assert!(!listing.contains("- bin:"));
    }

    #[test]
    fn read_and_write_dispatch_through_the_sandbox() {
        let (_temp, registry) = registry();
        registry
            .dispatch(&invocation(
                "write-file",
                &[
                    ("file_path", Value::String("note.txt".to_string())),
                    ("content", Value::String("remember".to_string())),
                ],
            ))
            .expect("write");

        let content = registry
            .dispatch(&invocation(
                "read-file",
                &[("file_path", Value::String("note.txt".to_string()))],
            ))
            .expect("read");
        assert_eq!(content, "remember");
    }

    #[test]
    fn missing_required_argument_is_a_bad_arguments_error() {
        let (_temp, registry) = registry();
        let err = registry
            .dispatch(&invocation("read-file", &[]))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadArguments);
        assert_eq!(
            err.detail,
            "Missing or invalid \"file_path\" argument for read-file"
        );
    }

    #[test]
    fn script_args_must_be_strings() {
        let (_temp, registry) = registry();
        let err = registry
            .dispatch(&invocation(
                "run-script",
                &[
                    ("file_path", Value::String("main.py".to_string())),
                    ("args", json!([1, 2])),
                ],
            ))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadArguments);
    }

    #[test]
    fn declarations_cover_every_tool_kind() {
        let (_temp, registry) = registry();
        let declarations = registry.declarations();
        let names: Vec<&str> = declarations.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            ["list-directory", "read-file", "run-script", "write-file"]
        );
        for declaration in &declarations {
            assert_eq!(declaration.parameters["type"], "object");
        }
    }
}
