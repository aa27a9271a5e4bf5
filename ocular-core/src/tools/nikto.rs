// ocular-core/src/tools/nikto.rs

//! Web server vulnerability scanning with `nikto`.

use super::{
    check_range, option_schema, parse_args, require, schema_object, validate_host, validate_token,
    validate_url, CommandLine, FlagOption, ServiceTool, TimeoutPolicy, ToolError, ToolSettings,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

crate::flag_options! {
    pub enum NiktoScan: default Basic {
        Basic => ("basic", "", "Default checks"),
        Ssl => ("ssl", "-ssl", "Force SSL on the target port"),
        Cgi => ("cgi", "-C all", "Check every CGI directory"),
        Files => ("files", "-Tuning 1", "Interesting files"),
        Misconfig => ("misconfig", "-Tuning 2", "Misconfigurations and default files"),
        Disclosure => ("disclosure", "-Tuning 3", "Information disclosure"),
        Comprehensive => ("comprehensive", "-Tuning 123456789", "Every tuning category"),
        Fast => ("fast", "-timeout 5", "Short per-request timeout"),
    }
}

/// A scan target is either a URL or a bare host.
pub(crate) fn validate_target(value: &str) -> Result<String, ToolError> {
    let trimmed = value.trim();
    if trimmed.contains("://") {
        Ok(validate_url("target", trimmed)?.to_string())
    } else {
        Ok(validate_host("target", trimmed)?.to_string())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NiktoArgs {
    target: String,
    scan_type: NiktoScan,
    ssl: bool,
    port: Option<u32>,
    tuning: Option<String>,
    plugins: Option<String>,
    vhost: Option<String>,
}

pub struct Nikto;

impl ServiceTool for Nikto {
    fn name(&self) -> &'static str {
        "nikto"
    }

    fn description(&self) -> &'static str {
        "Scan a web server for dangerous files, outdated software and misconfigurations with nikto."
    }

    fn executable(&self) -> &'static str {
        "nikto"
    }

    fn target_key(&self) -> &'static str {
        "target"
    }

    fn input_schema(&self) -> Map<String, Value> {
        schema_object(
            vec![
                ("target", json!({ "type": "string", "description": "URL or hostname of the web server." })),
                ("scan_type", option_schema::<NiktoScan>("Scan profile.")),
                ("ssl", json!({ "type": "boolean", "default": false, "description": "Force SSL mode." })),
                ("port", json!({ "type": "integer", "minimum": 1, "maximum": 65535, "description": "Port to scan." })),
                ("tuning", json!({ "type": "string", "description": "Custom -Tuning categories, e.g. 123b." })),
                ("plugins", json!({ "type": "string", "description": "Plugins to run, e.g. headers,robots." })),
                ("vhost", json!({ "type": "string", "description": "Virtual host for the Host header." })),
            ],
            vec!["target"],
        )
    }

    fn timeout_policy(&self) -> TimeoutPolicy {
        TimeoutPolicy::new(300, 60, 1800)
    }

    fn expected_lines(&self, _args: &Map<String, Value>) -> u32 {
        40
    }

    fn build_command(&self, args: &Map<String, Value>, settings: &ToolSettings) -> Result<String, ToolError> {
        require(args, "target")?;
        let args: NiktoArgs = parse_args(args)?;
        let target = validate_target(&args.target)?;

        let mut cmd = CommandLine::new(settings.executable_or(self.executable()))
            .opt("-h", target)
            .flags(args.scan_type.flags())
            .flag_if(args.ssl && args.scan_type != NiktoScan::Ssl, "-ssl");
        if let Some(port) = args.port {
            cmd = cmd.opt("-port", check_range("port", port, 1, 65535)?);
        }
        if let Some(tuning) = args.tuning.as_deref().filter(|t| !t.trim().is_empty()) {
            cmd = cmd.opt("-Tuning", validate_token("tuning", tuning)?);
        }
        if let Some(plugins) = args.plugins.as_deref().filter(|p| !p.trim().is_empty()) {
            cmd = cmd.opt("-Plugins", validate_token("plugins", plugins)?);
        }
        if let Some(vhost) = args.vhost.as_deref().filter(|v| !v.trim().is_empty()) {
            cmd = cmd.opt("-vhost", validate_host("vhost", vhost)?);
        }
        cmd.flags("-nointeractive").build()
    }
}
