// ocular-core/src/tools/ping.rs

//! ICMP reachability checks with `ping`.

use super::{
    check_range, parse_args, require, schema_object, validate_host, CommandLine, ServiceTool,
    TimeoutPolicy, ToolError, ToolSettings,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

#[derive(Debug, Deserialize)]
#[serde(default)]
struct PingArgs {
    host: String,
    count: u32,
    interval: f64,
    packet_size: u32,
}

impl Default for PingArgs {
    fn default() -> Self {
        Self {
            host: String::new(),
            count: 5,
            interval: 1.0,
            packet_size: 56,
        }
    }
}

pub struct Ping;

impl ServiceTool for Ping {
    fn name(&self) -> &'static str {
        "ping"
    }

    fn description(&self) -> &'static str {
        "Send ICMP echo requests to a host to check reachability and round-trip latency."
    }

    fn executable(&self) -> &'static str {
        "ping"
    }

    fn target_key(&self) -> &'static str {
        "host"
    }

    fn input_schema(&self) -> Map<String, Value> {
        schema_object(
            vec![
                ("host", json!({ "type": "string", "description": "Hostname or IP address to ping." })),
                ("count", json!({ "type": "integer", "minimum": 1, "maximum": 99, "default": 5, "description": "Number of echo requests (1-99)." })),
                ("interval", json!({ "type": "number", "minimum": 0.01, "maximum": 5.0, "default": 1.0, "description": "Seconds between requests (0.01-5.0)." })),
                ("packet_size", json!({ "type": "integer", "minimum": 1, "maximum": 65524, "default": 56, "description": "Payload size in bytes (1-65524)." })),
            ],
            vec!["host"],
        )
    }

    fn timeout_policy(&self) -> TimeoutPolicy {
        TimeoutPolicy::new(60, 5, 300)
    }

    fn expected_lines(&self, args: &Map<String, Value>) -> u32 {
        // One line per reply plus header and summary.
        let count = args.get("count").and_then(Value::as_u64).unwrap_or(5).min(99) as u32;
        count + 5
    }

    fn build_command(&self, args: &Map<String, Value>, settings: &ToolSettings) -> Result<String, ToolError> {
        require(args, "host")?;
        let args: PingArgs = parse_args(args)?;
        let host = validate_host("host", &args.host)?;
        let count = check_range("count", args.count, 1, 99)?;
        let interval = check_range("interval", args.interval, 0.01, 5.0)?;
        let packet_size = check_range("packet_size", args.packet_size, 1, 65524)?;

        CommandLine::new(settings.executable_or(self.executable()))
            .opt("-c", count)
            .opt("-i", interval)
            .opt("-s", packet_size)
            .arg(host)
            .build()
    }
}
