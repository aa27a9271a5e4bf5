// ocular-core/src/tools/curl.rs

//! HTTP requests with `curl`.

use super::{
    parse_args, require, requested_timeout, schema_object, validate_url, CommandLine, ServiceTool, TimeoutPolicy,
    ToolError, ToolSettings,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

const METHODS: &[&str] = &["GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"];

#[derive(Debug, Deserialize)]
#[serde(default)]
struct CurlArgs {
    url: String,
    method: String,
    /// Semicolon-separated `Name: value` pairs.
    headers: Option<String>,
    data: Option<String>,
    follow_redirects: bool,
    verbose: bool,
    insecure: bool,
    user_agent: Option<String>,
    headers_only: bool,
}

impl Default for CurlArgs {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: "GET".to_string(),
            headers: None,
            data: None,
            follow_redirects: false,
            verbose: false,
            insecure: false,
            user_agent: None,
            headers_only: false,
        }
    }
}

pub struct Curl;

impl ServiceTool for Curl {
    fn name(&self) -> &'static str {
        "curl"
    }

    fn description(&self) -> &'static str {
        "Make an HTTP request with curl and return the response body (or headers)."
    }

    fn executable(&self) -> &'static str {
        "curl"
    }

    fn target_key(&self) -> &'static str {
        "url"
    }

    fn input_schema(&self) -> Map<String, Value> {
        schema_object(
            vec![
                ("url", json!({ "type": "string", "description": "http or https URL to request." })),
                ("method", json!({ "type": "string", "enum": METHODS, "default": "GET", "description": "HTTP method." })),
                ("headers", json!({ "type": "string", "description": "Extra headers separated by ';', e.g. 'Accept: text/html; X-Debug: 1'." })),
                ("data", json!({ "type": "string", "description": "Request body." })),
                ("follow_redirects", json!({ "type": "boolean", "default": false, "description": "Follow redirects (-L)." })),
                ("verbose", json!({ "type": "boolean", "default": false, "description": "Verbose output on stderr (-v)." })),
                ("insecure", json!({ "type": "boolean", "default": false, "description": "Skip TLS certificate verification (-k)." })),
                ("user_agent", json!({ "type": "string", "description": "User-Agent header value." })),
                ("headers_only", json!({ "type": "boolean", "default": false, "description": "Fetch headers only (-I)." })),
            ],
            vec!["url"],
        )
    }

    fn timeout_policy(&self) -> TimeoutPolicy {
        TimeoutPolicy::new(30, 5, 120)
    }

    fn build_command(&self, args: &Map<String, Value>, settings: &ToolSettings) -> Result<String, ToolError> {
        require(args, "url")?;
        let max_time = self
            .timeout_policy()
            .resolve(requested_timeout(args)?, settings.timeout_secs);
        let args: CurlArgs = parse_args(args)?;
        let url = validate_url("url", &args.url)?;

        let method = args.method.trim().to_ascii_uppercase();
        if !METHODS.contains(&method.as_str()) {
            return Err(ToolError::invalid(
                "method",
                format!("must be one of {}", METHODS.join(", ")),
            ));
        }

        let mut cmd = CommandLine::new(settings.executable_or(self.executable()))
            .flags("-sS")
            .opt("--max-time", max_time.as_secs())
            .flag_if(args.headers_only, "-I")
            .flag_if(args.follow_redirects, "-L")
            .flag_if(args.verbose, "-v")
            .flag_if(args.insecure, "-k");
        if method != "GET" && !args.headers_only {
            cmd = cmd.opt("-X", &method);
        }
        for header in args.headers.iter().flat_map(|h| h.split(';')) {
            let header = header.trim();
            if !header.is_empty() {
                cmd = cmd.opt("-H", header);
            }
        }
        if let Some(agent) = args.user_agent.as_deref().filter(|a| !a.trim().is_empty()) {
            cmd = cmd.opt("-A", agent.trim());
        }
        if let Some(data) = args.data.as_deref().filter(|d| !d.is_empty()) {
            cmd = cmd.opt("-d", data);
        }
        cmd.arg(url).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::words;

    fn build(value: Value) -> Result<String, ToolError> {
        Curl.build_command(value.as_object().unwrap(), &ToolSettings::default())
    }

    #[test]
    fn test_simple_get() {
        let cmd = build(json!({ "url": "https://example.com" })).unwrap();
        assert_eq!(words(&cmd), ["curl", "-sS", "--max-time", "30", "https://example.com/"]);
    }

    #[test]
    fn test_all_options() {
        let cmd = build(json!({
            "url": "http://10.0.0.5:8080/api",
            "method": "post",
            "headers": "Content-Type: application/json; X-Trace: 1;",
            "data": "{\"a\":1}",
            "follow_redirects": true,
            "insecure": true,
            "user_agent": "ocular/1.0",
            "timeout": 10
        }))
        .unwrap();
        assert_eq!(
            words(&cmd),
            [
                "curl", "-sS", "--max-time", "10", "-L", "-k", "-X", "POST",
                "-H", "Content-Type: application/json", "-H", "X-Trace: 1",
                "-A", "ocular/1.0", "-d", "{\"a\":1}", "http://10.0.0.5:8080/api",
            ]
        );
    }

    #[test]
    fn test_headers_only_skips_method() {
        let cmd = build(json!({ "url": "https://example.com", "headers_only": true, "method": "HEAD" })).unwrap();
        assert_eq!(words(&cmd), ["curl", "-sS", "--max-time", "30", "-I", "https://example.com/"]);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(build(json!({ "url": "file:///etc/passwd" })).is_err());
        assert!(build(json!({ "url": "https://example.com", "method": "TRACE" })).is_err());
        assert_eq!(build(json!({ "url": "" })).unwrap_err().to_string(), "url parameter is required");
    }
}
