// ocular-core/src/response.rs

//! The uniform result record produced by every tool invocation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Describes one external-command invocation: what was asked for, what was run,
/// how long it took and what came back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceResponse {
    /// Logical name of the invoking tool (e.g. `ping`).
    pub service: String,
    /// Host, URL or domain the command operates against.
    pub target: String,
    /// Caller-supplied parameters, before validation.
    pub arguments: Map<String, Value>,
    /// Fully assembled command line. Empty until execution starts.
    pub raw_command: String,
    /// Exit code. `Some(0)` is success; negative or `None` means the command
    /// never produced a code of its own.
    pub return_code: Option<i32>,
    pub raw_output: String,
    pub raw_error: String,
    pub process_start_time: DateTime<Utc>,
    pub process_end_time: Option<DateTime<Utc>>,
    /// Elapsed milliseconds between start and end. `0` until the timer stops.
    pub process_time_ms: u64,
}

impl ServiceResponse {
    /// Creates a fresh response with the timer started now.
    pub fn new(
        service: impl Into<String>,
        target: impl Into<String>,
        arguments: Map<String, Value>,
    ) -> Self {
        Self {
            service: service.into(),
            target: target.into(),
            arguments,
            raw_command: String::new(),
            return_code: Some(0),
            raw_output: String::new(),
            raw_error: String::new(),
            process_start_time: Utc::now(),
            process_end_time: None,
            process_time_ms: 0,
        }
    }

    /// Renders every attribute as a JSON object. Timestamps are RFC 3339 strings.
    pub fn to_dict(&self) -> Value {
        let mut map = Map::new();
        map.insert("service".into(), Value::String(self.service.clone()));
        map.insert("target".into(), Value::String(self.target.clone()));
        map.insert("arguments".into(), Value::Object(self.arguments.clone()));
        map.insert("raw_command".into(), Value::String(self.raw_command.clone()));
        map.insert(
            "return_code".into(),
            self.return_code.map_or(Value::Null, Value::from),
        );
        map.insert("raw_output".into(), Value::String(self.raw_output.clone()));
        map.insert("raw_error".into(), Value::String(self.raw_error.clone()));
        map.insert(
            "process_start_time".into(),
            Value::String(self.process_start_time.to_rfc3339()),
        );
        map.insert(
            "process_end_time".into(),
            self.process_end_time
                .map_or(Value::Null, |t| Value::String(t.to_rfc3339())),
        );
        map.insert("process_time_ms".into(), Value::from(self.process_time_ms));
        Value::Object(map)
    }

    /// Rebuilds a response from [`ServiceResponse::to_dict`] output.
    ///
    /// Missing or mistyped keys fall back to defaults rather than failing.
    pub fn from_dict(data: &Value) -> Self {
        let text = |key: &str| {
            data.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let timestamp = |key: &str| {
            data.get(key)
                .and_then(Value::as_str)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| t.with_timezone(&Utc))
        };

        let return_code = match data.get("return_code") {
            Some(Value::Null) => None,
            Some(v) => Some(v.as_i64().and_then(|c| i32::try_from(c).ok()).unwrap_or(0)),
            None => Some(0),
        };

        Self {
            service: text("service"),
            target: text("target"),
            arguments: data
                .get("arguments")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
            raw_command: text("raw_command"),
            return_code,
            raw_output: text("raw_output"),
            raw_error: text("raw_error"),
            process_start_time: timestamp("process_start_time").unwrap_or_else(Utc::now),
            process_end_time: timestamp("process_end_time"),
            process_time_ms: data
                .get("process_time_ms")
                .and_then(Value::as_u64)
                .unwrap_or(0),
        }
    }

    pub fn is_successful(&self) -> bool {
        self.return_code == Some(0)
    }

    /// True when anything was written to `raw_error` or the exit code is not `0`.
    pub fn has_errors(&self) -> bool {
        !self.raw_error.is_empty() || self.return_code != Some(0)
    }

    /// Stamps the end time and recomputes the duration from the original start.
    ///
    /// Safe to call repeatedly; each call measures again from the same start.
    pub fn end_process_timer(&mut self) {
        let end = Utc::now();
        let elapsed = (end - self.process_start_time).num_milliseconds().max(0);
        self.process_end_time = Some(end);
        self.process_time_ms = elapsed as u64;
    }

    /// Appends `message` to `raw_error`, optionally overrides the return code,
    /// and stops the timer.
    pub fn add_error(&mut self, message: impl AsRef<str>, return_code: Option<i32>) {
        if let Some(code) = return_code {
            self.return_code = Some(code);
        }
        if !self.raw_error.is_empty() {
            self.raw_error.push('\n');
        }
        self.raw_error.push_str(message.as_ref());
        self.end_process_timer();
    }

    pub fn is_terminal(&self) -> bool {
        self.process_end_time.is_some()
    }
}

impl fmt::Display for ServiceResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self
            .return_code
            .map_or_else(|| "None".to_string(), |c| c.to_string());
        write!(
            f,
            "ServiceResponse(service='{}', target='{}', process_time_ms={}, return_code={})",
            self.service, self.target, self.process_time_ms, code
        )
    }
}
