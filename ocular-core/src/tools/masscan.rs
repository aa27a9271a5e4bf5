// ocular-core/src/tools/masscan.rs

//! High-rate port sweeps with `masscan`. Raw packet scanning needs root.

use super::nmap::Targets;
use super::{
    check_range, option_schema, parse_args, require, schema_object, validate_host, validate_ports,
    CommandLine, FlagOption, ServiceTool, TimeoutPolicy, ToolError, ToolSettings,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

const MAX_RATE: u32 = 100_000;

crate::flag_options! {
    pub enum MasscanOption: default Top100 {
        Top1000 => ("top_1000", "--top-ports 1000 --rate 1000", "Top 1000 ports at 1000 packets/sec"),
        Top100 => ("top_100", "--top-ports 100 --rate 1000", "Top 100 ports at 1000 packets/sec"),
        VeryFast => ("very_fast", "--top-ports 100 --rate 10000", "Top 100 ports at 10000 packets/sec"),
        Full => ("full", "-p 1-65535 --rate 1000", "All 65535 ports at 1000 packets/sec, slow"),
        Lite => ("lite", "-p 22,80,443,445,3389,8080 --rate 1000", "Common ports only (22,80,443,445,3389,8080)"),
    }
}

/// Drops the port selection and/or the rate from a profile's flags so explicit
/// arguments can take their place.
fn without_overrides(flags: &str, ports: bool, rate: bool) -> String {
    let mut kept = Vec::new();
    let mut tokens = flags.split_whitespace();
    while let Some(token) = tokens.next() {
        let replaced = match token {
            "-p" | "--top-ports" => ports,
            "--rate" => rate,
            _ => false,
        };
        if replaced {
            tokens.next();
        } else {
            kept.push(token);
        }
    }
    kept.join(" ")
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MasscanArgs {
    target: Targets,
    options: MasscanOption,
    ports: Option<String>,
    rate: Option<u32>,
}

pub struct Masscan;

impl ServiceTool for Masscan {
    fn name(&self) -> &'static str {
        "masscan"
    }

    fn description(&self) -> &'static str {
        "Sweep IP ranges for open TCP ports at high packet rates with masscan (requires root)."
    }

    fn executable(&self) -> &'static str {
        "masscan"
    }

    fn target_key(&self) -> &'static str {
        "target"
    }

    fn input_schema(&self) -> Map<String, Value> {
        schema_object(
            vec![
                ("target", json!({ "type": "string", "description": "IP address, CIDR block or range; several may be separated by spaces or commas." })),
                ("options", option_schema::<MasscanOption>("Scan profile.")),
                ("ports", json!({ "type": "string", "description": "Ports to scan, e.g. 22,80,8000-8100. Replaces the profile's port selection." })),
                ("rate", json!({ "type": "integer", "minimum": 1, "maximum": MAX_RATE, "description": "Packets per second. Replaces the profile's rate." })),
            ],
            vec!["target"],
        )
    }

    fn timeout_policy(&self) -> TimeoutPolicy {
        TimeoutPolicy::new(300, 60, 1800)
    }

    fn build_command(&self, args: &Map<String, Value>, settings: &ToolSettings) -> Result<String, ToolError> {
        require(args, "target")?;
        let args: MasscanArgs = parse_args(args)?;
        let targets = args.target.split();
        if targets.is_empty() {
            return Err(ToolError::MissingArgument("target".to_string()));
        }
        let ports = args.ports.as_deref().filter(|p| !p.trim().is_empty());
        let rate = args.rate.map(|r| check_range("rate", r, 1, MAX_RATE)).transpose()?;

        let mut cmd = CommandLine::new(settings.executable_or(self.executable()));
        for target in targets {
            cmd = cmd.arg(validate_host("target", target)?);
        }
        cmd = cmd.flags(&without_overrides(args.options.flags(), ports.is_some(), rate.is_some()));
        if let Some(ports) = ports {
            cmd = cmd.opt("-p", validate_ports("ports", ports)?);
        }
        cmd.opt_if_some("--rate", rate).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::words;

    fn build(value: Value) -> Result<String, ToolError> {
        Masscan.build_command(value.as_object().unwrap(), &ToolSettings::default())
    }

    #[test]
    fn test_default_profile() {
        let cmd = build(json!({ "target": "10.0.0.0/24" })).unwrap();
        assert_eq!(words(&cmd), ["masscan", "10.0.0.0/24", "--top-ports", "100", "--rate", "1000"]);
    }

    #[test]
    fn test_ports_and_rate_replace_the_profile() {
        let cmd = build(json!({ "target": "10.0.0.1 10.0.0.2", "options": "full", "ports": "80,443", "rate": 500 })).unwrap();
        assert_eq!(words(&cmd), ["masscan", "10.0.0.1", "10.0.0.2", "-p", "80,443", "--rate", "500"]);

        let cmd = build(json!({ "target": "10.0.0.1", "options": "lite", "rate": 50 })).unwrap();
        assert_eq!(
            words(&cmd),
            ["masscan", "10.0.0.1", "-p", "22,80,443,445,3389,8080", "--rate", "50"]
        );
    }

    #[test]
    fn test_validation() {
        assert_eq!(build(json!({})).unwrap_err().to_string(), "target parameter is required");
        assert_eq!(build(json!({ "target": " , " })), Err(ToolError::MissingArgument("target".into())));
        assert_eq!(
            build(json!({ "target": "10.0.0.1", "rate": 0 })).unwrap_err().to_string(),
            "rate must be between 1 and 100000"
        );
        assert!(build(json!({ "target": "10.0.0.1", "ports": "80;reboot" })).is_err());
        assert!(build(json!({ "target": "--excludefile=/etc/passwd" })).is_err());
        assert!(build(json!({ "target": "10.0.0.1", "options": "everything" })).is_err());
    }

    #[test]
    fn test_without_overrides() {
        let flags = "--top-ports 100 --rate 1000";
        assert_eq!(without_overrides(flags, true, false), "--rate 1000");
        assert_eq!(without_overrides(flags, false, true), "--top-ports 100");
        assert_eq!(without_overrides(flags, false, false), flags);
    }
}
