// ocular-core/src/tools/mod.rs

//! Thin wrappers around external security and network CLIs.
//!
//! Each wrapper validates caller arguments, turns them into a shell-safe command
//! line and hands off to [`crate::execute_command`]. Wrappers never run anything
//! themselves and never parse tool output; callers get `raw_output` back. The
//! `time` tool is the exception: it answers through [`ServiceTool::evaluate`].
//!
//! Every option table is a closed enum declared with [`flag_options!`], so the
//! friendly names accepted in arguments and the flags they expand to live side
//! by side.

use crate::executor::{execute_command_with_env, DEFAULT_EXPECTED_LINES, NOT_RUN_RETURN_CODE};
use crate::progress::ProgressSink;
use crate::response::ServiceResponse;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Declares a closed option table: an enum whose variants carry a friendly
/// name, a flag template and a description.
#[macro_export]
macro_rules! flag_options {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : default $default:ident {
            $( $variant:ident => ($key:literal, $flags:literal, $desc:literal) ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $( #[serde(rename = $key)] $variant, )+
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl $crate::tools::FlagOption for $name {
            const ALL: &'static [Self] = &[$( $name::$variant ),+];

            fn name(&self) -> &'static str {
                match self {
                    $( $name::$variant => $key, )+
                }
            }

            fn flags(&self) -> &'static str {
                match self {
                    $( $name::$variant => $flags, )+
                }
            }

            fn description(&self) -> &'static str {
                match self {
                    $( $name::$variant => $desc, )+
                }
            }
        }
    };
}

mod command_line;
pub mod curl;
pub mod dns;
pub mod enum4linux;
pub mod httpx;
pub mod masscan;
pub mod nbtscan;
pub mod nikto;
pub mod nmap;
pub mod ping;
mod registry;
pub mod smbclient;
pub mod time;
pub mod whois;
pub mod wpscan;

pub use command_line::CommandLine;
pub use registry::{builtin_tools, ToolRegistry};
pub(crate) use command_line::{validate_host, validate_ports, validate_token, validate_url};

/// Errors produced while resolving or validating a tool call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool '{0}' is disabled on this server")]
    Disabled(String),

    #[error("{0} parameter is required")]
    MissingArgument(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("{name} {reason}")]
    InvalidValue { name: String, reason: String },
}

impl ToolError {
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ToolError::InvalidValue {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// A named option from a tool's closed option table.
pub trait FlagOption: Sized + Copy + 'static {
    const ALL: &'static [Self];
    /// The name callers use in arguments.
    fn name(&self) -> &'static str;
    /// The command-line flags this option expands to. May be empty.
    fn flags(&self) -> &'static str;
    fn description(&self) -> &'static str;
}

/// How long a tool may run, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    pub default_secs: u64,
    pub min_secs: u64,
    pub max_secs: u64,
}

impl TimeoutPolicy {
    pub const fn new(default_secs: u64, min_secs: u64, max_secs: u64) -> Self {
        Self {
            default_secs,
            min_secs,
            max_secs,
        }
    }

    /// Picks the per-call value, else the configured default, else the built-in
    /// default, and clamps it into `[min_secs, max_secs]`.
    pub fn resolve(&self, requested: Option<u64>, configured: Option<u64>) -> Duration {
        let secs = requested
            .or(configured)
            .unwrap_or(self.default_secs)
            .clamp(self.min_secs, self.max_secs);
        Duration::from_secs(secs)
    }
}

/// Per-tool settings resolved from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolSettings {
    /// Replaces the tool's default executable name or path.
    pub executable: Option<String>,
    pub timeout_secs: Option<u64>,
    pub expected_lines: Option<u32>,
    /// Environment variable holding an API token (wpscan).
    pub api_token_env_var: Option<String>,
}

impl ToolSettings {
    pub fn executable_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.executable.as_deref().unwrap_or(default)
    }
}

/// A wrapper around one external CLI.
pub trait ServiceTool: Send + Sync {
    /// Tool name as exposed to callers and recorded in `ServiceResponse::service`.
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// Default executable, used unless [`ToolSettings::executable`] overrides it.
    fn executable(&self) -> &'static str;
    /// The argument holding the scan target.
    fn target_key(&self) -> &'static str;
    /// JSON schema properties and required list for the tool's arguments.
    fn input_schema(&self) -> Map<String, Value>;
    fn timeout_policy(&self) -> TimeoutPolicy;

    fn expected_lines(&self, _args: &Map<String, Value>) -> u32 {
        DEFAULT_EXPECTED_LINES
    }

    /// Arguments carrying secrets, each paired with the environment variable
    /// the command line reads it from. Their values reach the child through its
    /// environment and are masked in the recorded arguments.
    fn secret_arguments(&self) -> &'static [(&'static str, &'static str)] {
        &[]
    }

    /// Tools that answer without running anything return their output here.
    /// `None` (the default) means [`ServiceTool::build_command`] is executed.
    fn evaluate(&self, _args: &Map<String, Value>) -> Option<Result<String, ToolError>> {
        None
    }

    /// Validates `args` and assembles the command line to execute.
    fn build_command(
        &self,
        args: &Map<String, Value>,
        settings: &ToolSettings,
    ) -> Result<String, ToolError>;
}

/// Placeholder recorded in place of secret argument values.
pub const REDACTED: &str = "[REDACTED]";

/// Runs `tool` with `args`, returning a terminal response in every case.
///
/// Validation failures are recorded in the response without executing anything.
pub async fn run_tool(
    tool: &dyn ServiceTool,
    args: Map<String, Value>,
    settings: &ToolSettings,
    progress: Option<&dyn ProgressSink>,
) -> ServiceResponse {
    let target = args.get(tool.target_key()).map(target_text).unwrap_or_default();
    let mut response = ServiceResponse::new(tool.name(), target, args);
    let env = take_secrets(tool, &mut response.arguments);

    let requested = match requested_timeout(&response.arguments) {
        Ok(requested) => requested,
        Err(e) => return rejected(tool, response, e),
    };

    if let Some(answer) = tool.evaluate(&response.arguments) {
        return match answer {
            Ok(output) => {
                debug!(tool = tool.name(), "Answered in-process");
                response.raw_output = output;
                response.end_process_timer();
                response
            }
            Err(e) => rejected(tool, response, e),
        };
    }

    // Secrets are already masked here; commands read them from `env`.
    let command = match tool.build_command(&response.arguments, settings) {
        Ok(command) => command,
        Err(e) => return rejected(tool, response, e),
    };
    let timeout = tool.timeout_policy().resolve(requested, settings.timeout_secs);
    let expected_lines = settings
        .expected_lines
        .unwrap_or_else(|| tool.expected_lines(&response.arguments));
    debug!(tool = tool.name(), command = %command, timeout_secs = timeout.as_secs(), "Prepared tool command");

    execute_command_with_env(&command, &env, response, progress, timeout, Some(expected_lines)).await
}

fn rejected(tool: &dyn ServiceTool, mut response: ServiceResponse, error: ToolError) -> ServiceResponse {
    warn!(tool = tool.name(), error = %error, "Rejected tool arguments");
    response.add_error(error.to_string(), Some(NOT_RUN_RETURN_CODE));
    response
}

/// Moves non-empty secret argument values into environment pairs, leaving
/// [`REDACTED`] behind in `args`.
fn take_secrets(tool: &dyn ServiceTool, args: &mut Map<String, Value>) -> Vec<(&'static str, String)> {
    let mut env = Vec::new();
    for &(key, var) in tool.secret_arguments() {
        let Some(Value::String(value)) = args.get(key) else {
            continue;
        };
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        env.push((var, value.to_string()));
        args.insert(key.to_string(), Value::String(REDACTED.to_string()));
    }
    env
}

/// Builds the full JSON schema object for a tool, adding the shared `timeout`
/// argument.
pub fn schema_for(tool: &dyn ServiceTool) -> Map<String, Value> {
    let mut schema = tool.input_schema();
    let policy = tool.timeout_policy();
    if let Some(Value::Object(props)) = schema.get_mut("properties") {
        props.insert(
            "timeout".to_string(),
            json!({
                "type": "integer",
                "description": format!(
                    "Command timeout in seconds ({}-{}, default: {}).",
                    policy.min_secs, policy.max_secs, policy.default_secs
                ),
                "minimum": policy.min_secs,
                "maximum": policy.max_secs,
            }),
        );
    }
    schema
}

/// Helper to create a JSON schema object from properties and a required list.
pub(crate) fn schema_object(properties: Vec<(&str, Value)>, required: Vec<&str>) -> Map<String, Value> {
    let props: Map<String, Value> = properties
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    let mut schema = Map::new();
    schema.insert("type".into(), json!("object"));
    schema.insert("properties".into(), Value::Object(props));
    schema.insert("required".into(), json!(required));
    schema
}

/// Schema fragment for a closed option table, listing every choice.
pub(crate) fn option_schema<T: FlagOption + Default>(summary: &str) -> Value {
    let names: Vec<&str> = T::ALL.iter().map(FlagOption::name).collect();
    let choices = T::ALL
        .iter()
        .map(|o| format!("{}: {}", o.name(), o.description()))
        .collect::<Vec<_>>()
        .join("; ");
    json!({
        "type": "string",
        "enum": names,
        "default": T::default().name(),
        "description": format!("{} Choices: {}.", summary, choices),
    })
}

/// Fails with [`ToolError::MissingArgument`] unless `key` holds a non-empty value.
pub(crate) fn require(args: &Map<String, Value>, key: &str) -> Result<(), ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Err(ToolError::MissingArgument(key.to_string())),
        Some(Value::String(s)) if s.trim().is_empty() => Err(ToolError::MissingArgument(key.to_string())),
        Some(Value::Array(items)) if items.is_empty() => Err(ToolError::MissingArgument(key.to_string())),
        Some(_) => Ok(()),
    }
}

/// Deserializes the argument map into a tool's typed argument struct.
pub(crate) fn parse_args<T: DeserializeOwned>(args: &Map<String, Value>) -> Result<T, ToolError> {
    serde_json::from_value(Value::Object(args.clone()))
        .map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// Checks that `value` lies within `[min, max]`.
pub(crate) fn check_range<T: PartialOrd + std::fmt::Display>(
    name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<T, ToolError> {
    if value < min || value > max {
        return Err(ToolError::invalid(name, format!("must be between {} and {}", min, max)));
    }
    Ok(value)
}

pub(crate) fn requested_timeout(args: &Map<String, Value>) -> Result<Option<u64>, ToolError> {
    match args.get("timeout") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .map(Some)
            .ok_or_else(|| ToolError::invalid("timeout", "must be a positive number of seconds")),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ToolError::invalid("timeout", "must be a positive number of seconds")),
        Some(_) => Err(ToolError::invalid("timeout", "must be a positive number of seconds")),
    }
}

/// Splits a built command back into words, for asserting on command lines
/// independently of quoting style.
#[cfg(test)]
pub(crate) fn words(cmd: &str) -> Vec<String> {
    shlex::split(cmd).unwrap_or_default()
}

fn target_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string))
            .collect::<Vec<_>>()
            .join(","),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
