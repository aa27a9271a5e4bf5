// ocular-core/src/tools/httpx.rs

//! HTTP probing with ProjectDiscovery's `httpx`.

use super::nikto::validate_target;
use super::{
    option_schema, parse_args, require, schema_object, validate_ports, CommandLine, FlagOption,
    ServiceTool, TimeoutPolicy, ToolError, ToolSettings,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

const METHODS: &[&str] = &["GET", "HEAD", "POST", "PUT", "OPTIONS"];
const MAX_TARGETS: usize = 256;

crate::flag_options! {
    pub enum HttpxOption: default Basic {
        Basic => ("basic", "-status-code -content-length -title", "Status, length and title"),
        Headers => ("headers", "-status-code -content-length -title -include-response-header", "Basic plus response headers"),
        Detailed => ("detailed", "-status-code -content-length -title -tech-detect -web-server -response-time", "Technology, server and timing details"),
        Vuln => ("vuln", "-status-code -title -tech-detect -web-server -tls-probe -csp-probe -jarm -hash md5", "Fingerprinting useful for vulnerability triage"),
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TargetList {
    Joined(String),
    List(Vec<String>),
}

impl Default for TargetList {
    fn default() -> Self {
        TargetList::Joined(String::new())
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct HttpxArgs {
    targets: TargetList,
    options: HttpxOption,
    ports: Option<String>,
    paths: Option<String>,
    method: String,
}

impl Default for HttpxArgs {
    fn default() -> Self {
        Self {
            targets: TargetList::default(),
            options: HttpxOption::default(),
            ports: None,
            paths: None,
            method: "GET".to_string(),
        }
    }
}

pub struct Httpx;

impl ServiceTool for Httpx {
    fn name(&self) -> &'static str {
        "httpx"
    }

    fn description(&self) -> &'static str {
        "Probe one or more hosts or URLs for live HTTP services, titles, technologies and headers with httpx."
    }

    fn executable(&self) -> &'static str {
        "httpx"
    }

    fn target_key(&self) -> &'static str {
        "targets"
    }

    fn input_schema(&self) -> Map<String, Value> {
        schema_object(
            vec![
                ("targets", json!({ "type": "string", "description": "Hosts or URLs, comma separated." })),
                ("options", option_schema::<HttpxOption>("Probe profile.")),
                ("ports", json!({ "type": "string", "description": "Ports to probe, e.g. 80,443,8080." })),
                ("paths", json!({ "type": "string", "description": "Paths to request, comma separated, e.g. /admin,/login." })),
                ("method", json!({ "type": "string", "enum": METHODS, "default": "GET", "description": "HTTP method." })),
            ],
            vec!["targets"],
        )
    }

    fn timeout_policy(&self) -> TimeoutPolicy {
        TimeoutPolicy::new(60, 10, 600)
    }

    fn expected_lines(&self, args: &Map<String, Value>) -> u32 {
        // Roughly one line per target.
        match args.get("targets") {
            Some(Value::String(s)) => s.split(',').filter(|t| !t.trim().is_empty()).count().max(1) as u32,
            Some(Value::Array(items)) => items.len().max(1) as u32,
            _ => 1,
        }
    }

    fn build_command(&self, args: &Map<String, Value>, settings: &ToolSettings) -> Result<String, ToolError> {
        require(args, "targets")?;
        let args: HttpxArgs = parse_args(args)?;

        let raw: Vec<&str> = match &args.targets {
            TargetList::Joined(s) => s.split(',').collect(),
            TargetList::List(items) => items.iter().map(String::as_str).collect(),
        };
        let targets = raw
            .into_iter()
            .filter(|t| !t.trim().is_empty())
            .map(validate_target)
            .collect::<Result<Vec<_>, _>>()?;
        if targets.is_empty() {
            return Err(ToolError::MissingArgument("targets".to_string()));
        }
        if targets.len() > MAX_TARGETS {
            return Err(ToolError::invalid(
                "targets",
                format!("must list at most {} entries", MAX_TARGETS),
            ));
        }

        let method = args.method.trim().to_ascii_uppercase();
        if !METHODS.contains(&method.as_str()) {
            return Err(ToolError::invalid("method", format!("must be one of {}", METHODS.join(", "))));
        }

        let mut cmd = CommandLine::new(settings.executable_or(self.executable()));
        for target in &targets {
            cmd = cmd.opt("-u", target);
        }
        cmd = cmd.flags(args.options.flags());
        if let Some(ports) = args.ports.as_deref().filter(|p| !p.trim().is_empty()) {
            cmd = cmd.opt("-ports", validate_ports("ports", ports)?);
        }
        if let Some(paths) = args.paths.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            if paths.chars().any(char::is_whitespace) {
                return Err(ToolError::invalid("paths", "must be a comma separated list without spaces"));
            }
            cmd = cmd.opt("-path", paths);
        }
        cmd.opt("-method", method).flags("-silent -no-color").build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::words;

    fn build(value: Value) -> Result<Vec<String>, ToolError> {
        Httpx.build_command(value.as_object().unwrap(), &ToolSettings::default())
            .map(|cmd| words(&cmd))
    }

    #[test]
    fn test_single_target() {
        assert_eq!(
            build(json!({ "targets": "example.com" })).unwrap(),
            [
                "httpx", "-u", "example.com", "-status-code", "-content-length", "-title",
                "-method", "GET", "-silent", "-no-color",
            ]
        );
    }

    #[test]
    fn test_multiple_targets_and_options() {
        let words = build(json!({
            "targets": "example.com, https://app.example.com/",
            "options": "headers",
            "ports": "80,8443",
            "paths": "/admin,/login",
            "method": "head"
        }))
        .unwrap();
        assert_eq!(&words[..5], ["httpx", "-u", "example.com", "-u", "https://app.example.com/"]);
        assert!(words.contains(&"-include-response-header".to_string()));
        let tail: Vec<&str> = words[words.len() - 8..].iter().map(String::as_str).collect();
        assert_eq!(tail, ["-ports", "80,8443", "-path", "/admin,/login", "-method", "HEAD", "-silent", "-no-color"]);
    }

    #[test]
    fn test_list_targets() {
        let words = build(json!({ "targets": ["10.0.0.1", "10.0.0.2"] })).unwrap();
        assert_eq!(&words[..5], ["httpx", "-u", "10.0.0.1", "-u", "10.0.0.2"]);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(build(json!({ "targets": ",," })).is_err());
        assert!(build(json!({ "targets": "example.com,-l /etc/hosts" })).is_err());
        assert!(build(json!({ "targets": "example.com", "paths": "/a /b" })).is_err());
        assert!(build(json!({ "targets": "example.com", "method": "DELETE" })).is_err());
    }

    #[test]
    fn test_expected_lines_counts_targets() {
        let args = json!({ "targets": "a.com,b.com,c.com" });
        assert_eq!(Httpx.expected_lines(args.as_object().unwrap()), 3);
    }
}
