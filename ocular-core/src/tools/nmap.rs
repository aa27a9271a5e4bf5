// ocular-core/src/tools/nmap.rs

//! Network and port scanning with `nmap`.

use super::{
    option_schema, parse_args, require, schema_object, validate_host, validate_ports,
    validate_token, CommandLine, FlagOption, ServiceTool, TimeoutPolicy, ToolError, ToolSettings,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

crate::flag_options! {
    pub enum ScanType: default Fast {
        Fast => ("fast", "-F -Pn", "Top 100 ports, skip host discovery"),
        Service => ("service", "-sV --top-ports 20", "Service and version detection on the top 20 ports"),
        Stealth => ("stealth", "-sS -Pn", "SYN scan (needs root)"),
        Rdp => ("rdp", "-p 3389 --script 'rdp-*'", "RDP checks on port 3389"),
        Aggressive => ("aggressive", "-A -T4", "OS and version detection, scripts and traceroute"),
        Udp => ("udp", "-sU --top-ports 20", "UDP scan of the top 20 ports (needs root)"),
        Vuln => ("vuln", "-Pn --script vuln", "Run the vuln script category"),
    }
}

/// Strips the port selection from a scan type's flags so that an explicit
/// `ports` argument can replace it.
fn without_port_selection(flags: &str) -> String {
    let mut kept = Vec::new();
    let mut tokens = flags.split_whitespace();
    while let Some(token) = tokens.next() {
        match token {
            "-p" | "--top-ports" => {
                tokens.next();
            }
            "-F" => {}
            _ => kept.push(token),
        }
    }
    kept.join(" ")
}

/// Targets may be a single string (space or comma separated) or a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Targets {
    One(String),
    Many(Vec<String>),
}

impl Default for Targets {
    fn default() -> Self {
        Targets::One(String::new())
    }
}

impl Targets {
    pub(crate) fn split(&self) -> Vec<&str> {
        let raw: Vec<&str> = match self {
            Targets::One(s) => s.split(|c: char| c == ',' || c.is_whitespace()).collect(),
            Targets::Many(items) => items.iter().map(String::as_str).collect(),
        };
        raw.into_iter().map(str::trim).filter(|t| !t.is_empty()).collect()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NmapArgs {
    target: Targets,
    scan_type: ScanType,
    ports: Option<String>,
    scripts: Option<String>,
}

pub struct Nmap;

impl ServiceTool for Nmap {
    fn name(&self) -> &'static str {
        "nmap"
    }

    fn description(&self) -> &'static str {
        "Scan hosts or networks for open ports and services with nmap."
    }

    fn executable(&self) -> &'static str {
        "nmap"
    }

    fn target_key(&self) -> &'static str {
        "target"
    }

    fn input_schema(&self) -> Map<String, Value> {
        schema_object(
            vec![
                ("target", json!({ "type": "string", "description": "Host, IP address, CIDR block or range; several may be separated by spaces or commas." })),
                ("scan_type", option_schema::<ScanType>("Scan profile.")),
                ("ports", json!({ "type": "string", "description": "Ports to scan, e.g. 22,80,8000-8100. Replaces the profile's port selection." })),
                ("scripts", json!({ "type": "string", "description": "Additional NSE scripts, comma separated." })),
            ],
            vec!["target"],
        )
    }

    fn timeout_policy(&self) -> TimeoutPolicy {
        TimeoutPolicy::new(240, 30, 1800)
    }

    fn expected_lines(&self, _args: &Map<String, Value>) -> u32 {
        50
    }

    fn build_command(&self, args: &Map<String, Value>, settings: &ToolSettings) -> Result<String, ToolError> {
        require(args, "target")?;
        let args: NmapArgs = parse_args(args)?;
        let targets = args.target.split();
        if targets.is_empty() {
            return Err(ToolError::MissingArgument("target".to_string()));
        }

        let ports = args.ports.as_deref().filter(|p| !p.trim().is_empty());
        let mut cmd = CommandLine::new(settings.executable_or(self.executable()));
        cmd = match ports {
            Some(ports) => cmd
                .flags(&without_port_selection(args.scan_type.flags()))
                .opt("-p", validate_ports("ports", ports)?),
            None => cmd.flags(args.scan_type.flags()),
        };
        if let Some(scripts) = args.scripts.as_deref().filter(|s| !s.trim().is_empty()) {
            cmd = cmd.opt("--script", validate_token("scripts", scripts)?);
        }
        for target in targets {
            cmd = cmd.arg(validate_host("target", target)?);
        }
        cmd.build()
    }
}
