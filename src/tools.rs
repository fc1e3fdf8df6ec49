use std::fs;
use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::time::Duration;

use serde_json::Value;
use wait_timeout::ChildExt;

const DEFAULT_BASH_TIMEOUT_SEC: u64 = 30;
const DEFAULT_BASH_MAX_OUTPUT_BYTES: usize = 100 * 1024;
const DEFAULT_READ_MAX_BYTES: usize = 200 * 1024;

/// Boundary between the orchestrator and local capabilities.
///
/// `execute` always returns a string; failures come back as descriptive
/// error text the model can read and react to, never as a panic or an Err.
pub trait ToolDispatcher {
    fn execute(&mut self, name: &str, arguments_json: &str) -> String;

    /// Function schemas advertised in each request's `tools` array.
    fn tool_schemas(&self) -> Vec<Value>;
}

/// Dispatcher for the built-in file, directory, and shell tools.
#[derive(Debug, Clone)]
pub struct BuiltinToolDispatcher {
    bash_timeout_sec: u64,
    bash_max_output_bytes: usize,
    read_max_bytes: usize,
}

impl Default for BuiltinToolDispatcher {
    fn default() -> Self {
        Self {
            bash_timeout_sec: DEFAULT_BASH_TIMEOUT_SEC,
            bash_max_output_bytes: DEFAULT_BASH_MAX_OUTPUT_BYTES,
            read_max_bytes: DEFAULT_READ_MAX_BYTES,
        }
    }
}

impl BuiltinToolDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bash_timeout(mut self, timeout_sec: u64) -> Self {
        self.bash_timeout_sec = timeout_sec;
        self
    }

    fn read_file(&self, filepath: &str) -> String {
        let bytes = match fs::read(filepath) {
            Ok(bytes) => bytes,
            Err(error) => return format!("Error: Cannot open file '{filepath}': {error}"),
        };

        if bytes.len() > self.read_max_bytes {
            return format!(
                "Error: File '{filepath}' exceeds max read size ({} bytes > {} bytes)",
                bytes.len(),
                self.read_max_bytes
            );
        }

        match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(_) => format!("Error: File '{filepath}' is not valid UTF-8 text"),
        }
    }

    fn write_file(&self, filepath: &str, content: &str) -> String {
        match fs::write(filepath, content) {
            Ok(()) => format!("Written to {filepath}"),
            Err(error) => format!("Error: Cannot write to file '{filepath}': {error}"),
        }
    }

    fn list_dir(&self, dirpath: &str) -> String {
        let entries = match fs::read_dir(dirpath) {
            Ok(entries) => entries,
            Err(error) => return format!("Error: Cannot open directory '{dirpath}': {error}"),
        };

        let mut lines = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }

            match entry.metadata() {
                Ok(metadata) if metadata.is_dir() => lines.push(format!("[DIR]  {name}/")),
                Ok(metadata) => lines.push(format!("[FILE] {name} ({} bytes)", metadata.len())),
                Err(_) => continue,
            }
        }

        lines.sort();
        if lines.is_empty() {
            format!("Directory '{dirpath}' contains no visible entries")
        } else {
            lines.join("\n")
        }
    }

    fn bash(&self, command: &str) -> String {
        let mut child = match Command::new("bash")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(error) => return format!("Error: Failed to launch bash command: {error}"),
        };

        let timeout = self.bash_timeout_sec;
        let (timed_out, status) = match child.wait_timeout(Duration::from_secs(timeout)) {
            Ok(Some(status)) => (false, Some(status)),
            Ok(None) => {
                let _ = child.kill();
                let _ = child.wait();
                (true, None)
            }
            Err(error) => {
                let _ = child.kill();
                return format!("Error: Failed waiting for bash command: {error}");
            }
        };

        let stdout = read_pipe_bytes(child.stdout.take());
        let stderr = read_pipe_bytes(child.stderr.take());

        let status_label = match (timed_out, status) {
            (true, _) => format!("timeout after {timeout}s"),
            (false, Some(status)) => format_exit_status(status),
            (false, None) => "exit_code=unknown".to_string(),
        };

        let content = format!(
            "status: {status_label}\nstdout:\n{}\nstderr:\n{}",
            String::from_utf8_lossy(&stdout),
            String::from_utf8_lossy(&stderr)
        );
        truncate_to_byte_limit(content, self.bash_max_output_bytes)
    }
}

impl ToolDispatcher for BuiltinToolDispatcher {
    fn execute(&mut self, name: &str, arguments_json: &str) -> String {
        let arguments: Value = match serde_json::from_str(arguments_json) {
            Ok(arguments) => arguments,
            Err(error) => return format!("Error: Invalid tool arguments JSON: {error}"),
        };

        match name {
            "read_file" => match required_string(&arguments, "filepath") {
                Ok(filepath) => self.read_file(filepath),
                Err(error) => error,
            },
            "write_file" => {
                match (
                    required_string(&arguments, "filepath"),
                    required_string(&arguments, "content"),
                ) {
                    (Ok(filepath), Ok(content)) => self.write_file(filepath, content),
                    (Err(error), _) | (_, Err(error)) => error,
                }
            }
            "list_dir" => match required_string(&arguments, "dirpath") {
                Ok(dirpath) => self.list_dir(dirpath),
                Err(error) => error,
            },
            "bash" => match required_string(&arguments, "command") {
                Ok(command) => self.bash(command),
                Err(error) => error,
            },
            _ => format!("Error: Unknown tool '{name}'"),
        }
    }

    fn tool_schemas(&self) -> Vec<Value> {
        builtin_tool_schemas()
    }
}

/// Function schemas for the built-in tools, in the chat-completions
/// `{type:"function", function:{...}}` shape.
pub fn builtin_tool_schemas() -> Vec<Value> {
    vec![
        function_schema(
            "read_file",
            "Read and return the contents of a text file",
            &[("filepath", "Path of the file to read")],
        ),
        function_schema(
            "write_file",
            "Write content to a file, replacing any existing content",
            &[
                ("filepath", "Path of the file to write"),
                ("content", "Full content to write"),
            ],
        ),
        function_schema(
            "list_dir",
            "List the visible entries of a directory",
            &[("dirpath", "Path of the directory to list")],
        ),
        function_schema(
            "bash",
            "Execute a bash command and return its output and exit status",
            &[("command", "Command line to execute")],
        ),
    ]
}

fn function_schema(name: &str, description: &str, parameters: &[(&str, &str)]) -> Value {
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();
    for (parameter, description) in parameters {
        properties.insert(
            (*parameter).to_string(),
            serde_json::json!({"type": "string", "description": description}),
        );
        required.push(Value::String((*parameter).to_string()));
    }

    serde_json::json!({
        "type": "function",
        "function": {
            "name": name,
            "description": description,
            "parameters": {
                "type": "object",
                "properties": properties,
                "required": required,
            },
        },
    })
}

fn required_string<'a>(arguments: &'a Value, key: &str) -> Result<&'a str, String> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("Error: Missing required string argument '{key}'"))
}

fn read_pipe_bytes(pipe: Option<impl Read>) -> Vec<u8> {
    let Some(mut pipe) = pipe else {
        return Vec::new();
    };

    let mut bytes = Vec::new();
    let _ = pipe.read_to_end(&mut bytes);
    bytes
}

fn truncate_to_byte_limit(content: String, max_bytes: usize) -> String {
    if content.len() <= max_bytes {
        return content;
    }

    let mut cutoff = max_bytes.min(content.len());
    while cutoff > 0 && !content.is_char_boundary(cutoff) {
        cutoff -= 1;
    }

    let mut truncated = content[..cutoff].to_string();
    truncated.push_str("\n[truncated]");
    truncated
}

fn format_exit_status(status: ExitStatus) -> String {
    match status.code() {
        Some(code) => format!("exit_code={code}"),
        None => "exit_code=terminated_by_signal".to_string(),
    }
}
