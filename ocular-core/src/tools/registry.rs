// ocular-core/src/tools/registry.rs

//! The set of tools a server exposes, with their configured settings.

use super::{
    curl::Curl, dns::Dns, enum4linux::Enum4linux, httpx::Httpx, masscan::Masscan,
    nbtscan::Nbtscan, nikto::Nikto, nmap::Nmap, ping::Ping, run_tool, schema_for,
    smbclient::Smbclient, time::Time, whois::Whois, wpscan::Wpscan, ServiceTool, ToolError,
    ToolSettings,
};
use crate::config::OcularConfig;
use crate::executor::find_executable;
use crate::progress::ProgressSink;
use crate::response::ServiceResponse;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Name shown for tools answered in-process.
pub const BUILT_IN: &str = "built-in";

/// Every wrapper this crate ships.
pub fn builtin_tools() -> Vec<Arc<dyn ServiceTool>> {
    vec![
        Arc::new(Ping),
        Arc::new(Curl),
        Arc::new(Dns),
        Arc::new(Whois),
        Arc::new(Nmap),
        Arc::new(Masscan),
        Arc::new(Nikto),
        Arc::new(Wpscan),
        Arc::new(Httpx),
        Arc::new(Nbtscan),
        Arc::new(Enum4linux),
        Arc::new(Smbclient),
        Arc::new(Time),
    ]
}

struct RegisteredTool {
    tool: Arc<dyn ServiceTool>,
    settings: ToolSettings,
}

/// Enabled tools keyed by name. Cheap to clone.
#[derive(Clone)]
pub struct ToolRegistry {
    tools: Arc<BTreeMap<&'static str, RegisteredTool>>,
    disabled: Arc<Vec<&'static str>>,
}

impl ToolRegistry {
    pub fn from_config(config: &OcularConfig) -> Self {
        let mut tools = BTreeMap::new();
        let mut disabled = Vec::new();
        for tool in builtin_tools() {
            let name = tool.name();
            if !config.is_enabled(name) {
                info!(tool = name, "Tool disabled by configuration");
                disabled.push(name);
                continue;
            }
            let settings = config.settings_for(name);
            debug!(tool = name, ?settings, "Registered tool");
            tools.insert(name, RegisteredTool { tool, settings });
        }
        Self {
            tools: Arc::new(tools),
            disabled: Arc::new(disabled),
        }
    }

    /// Names of the enabled tools, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        self.tools.keys().copied().collect()
    }

    pub fn get(&self, name: &str) -> Option<&dyn ServiceTool> {
        self.tools.get(name).map(|r| r.tool.as_ref())
    }

    pub fn settings(&self, name: &str) -> Option<&ToolSettings> {
        self.tools.get(name).map(|r| &r.settings)
    }

    /// Full JSON schema for a tool's arguments, including `timeout`.
    pub fn schema(&self, name: &str) -> Option<Map<String, Value>> {
        self.get(name).map(schema_for)
    }

    /// Catalogue of enabled tools: what they do, what they run and whether the
    /// executable is installed.
    pub fn describe(&self) -> Value {
        let entries: Vec<Value> = self
            .tools
            .values()
            .map(|r| {
                let policy = r.tool.timeout_policy();
                let (executable, installed) = if r.tool.executable().is_empty() {
                    (BUILT_IN, true)
                } else {
                    let executable = r.settings.executable_or(r.tool.executable());
                    (executable, find_executable(executable).is_some())
                };
                json!({
                    "name": r.tool.name(),
                    "description": r.tool.description(),
                    "executable": executable,
                    "installed": installed,
                    "target": r.tool.target_key(),
                    "timeout": {
                        "default": r.settings.timeout_secs.unwrap_or(policy.default_secs).clamp(policy.min_secs, policy.max_secs),
                        "min": policy.min_secs,
                        "max": policy.max_secs,
                    },
                    "input_schema": Value::Object(schema_for(r.tool.as_ref())),
                })
            })
            .collect();
        Value::Array(entries)
    }

    /// Runs `name` with `args`. Only lookup failures are errors; everything
    /// else is reported inside the response.
    pub async fn call(
        &self,
        name: &str,
        args: Map<String, Value>,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<ServiceResponse, ToolError> {
        let Some(registered) = self.tools.get(name) else {
            if self.disabled.iter().any(|d| *d == name) {
                return Err(ToolError::Disabled(name.to_string()));
            }
            return Err(ToolError::UnknownTool(name.to_string()));
        };
        Ok(run_tool(registered.tool.as_ref(), args, &registered.settings, progress).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(toml: &str) -> ToolRegistry {
        ToolRegistry::from_config(&OcularConfig::from_toml_str(toml).unwrap())
    }

    #[test]
    fn test_default_registry_has_every_tool() {
        let names = registry("").names();
        assert_eq!(
            names,
            [
                "curl", "dns", "enum4linux", "httpx", "masscan", "nbtscan", "nikto", "nmap", "ping",
                "smbclient", "time", "whois", "wpscan"
            ]
        );
        let mut builtin: Vec<_> = builtin_tools().iter().map(|t| t.name()).collect();
        builtin.sort();
        assert_eq!(names, builtin);
    }

    #[test]
    fn test_describe_lists_schema_and_timeouts() {
        let reg = registry("[tools.nmap]\ntimeout_secs = 5000\nexecutable = \"/opt/nmap/bin/nmap\"");
        let catalogue = reg.describe();
        let nmap = catalogue
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["name"] == "nmap")
            .unwrap();
        assert_eq!(nmap["executable"], "/opt/nmap/bin/nmap");
        assert_eq!(nmap["timeout"]["default"], 1800);
        assert_eq!(nmap["timeout"]["min"], 30);
        assert_eq!(nmap["input_schema"]["required"], json!(["target"]));
        assert!(nmap["input_schema"]["properties"]["scan_type"]["enum"].is_array());
        assert!(nmap["input_schema"]["properties"]["timeout"].is_object());
    }

    #[test]
    fn test_describe_marks_in_process_tools_installed() {
        let catalogue = registry("").describe();
        let time = catalogue
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["name"] == "time")
            .unwrap();
        assert_eq!(time["executable"], BUILT_IN);
        assert_eq!(time["installed"], true);
        assert_eq!(time["input_schema"]["required"], json!([]));
    }

    #[tokio::test]
    async fn test_call_time() {
        let args = json!({ "clock": "utc" }).as_object().cloned().unwrap();
        let response = registry("").call("time", args, None).await.unwrap();
        assert!(response.raw_output.ends_with('Z'), "output: {:?}", response.raw_output);
        assert!(!response.has_errors());
    }

    #[tokio::test]
    async fn test_call_unknown_and_disabled() {
        let reg = registry("[tools.smbclient]\nenabled = false");
        assert!(reg.get("smbclient").is_none());
        assert_eq!(
            reg.call("smbclient", Map::new(), None).await.unwrap_err(),
            ToolError::Disabled("smbclient".into())
        );
        assert_eq!(
            reg.call("nessus", Map::new(), None).await.unwrap_err(),
            ToolError::UnknownTool("nessus".into())
        );
    }

    #[tokio::test]
    async fn test_call_reports_validation_errors_in_response() {
        let response = registry("").call("ping", Map::new(), None).await.unwrap();
        assert_eq!(response.service, "ping");
        assert_eq!(response.raw_error, "host parameter is required");
        assert!(response.is_terminal());
    }

    #[tokio::test]
    async fn test_call_uses_configured_executable() {
        // `echo` stands in for ping so the assembled arguments come back as output.
        let reg = registry("[tools.ping]\nexecutable = \"echo\"");
        let args = json!({ "host": "localhost", "count": 2 }).as_object().cloned().unwrap();
        let response = reg.call("ping", args, None).await.unwrap();
        assert_eq!(response.raw_command, "echo -c 2 -i 1 -s 56 localhost");
        assert_eq!(response.target, "localhost");
        assert!(response.raw_output.contains("-s 56 localhost"), "output: {:?}", response.raw_output);
        assert_eq!(response.return_code, Some(0));
    }
}
