// ocular-core/src/tools/dns.rs

//! DNS record lookups with `dig`.

use super::{
    parse_args, require, schema_object, validate_host, CommandLine, ServiceTool, TimeoutPolicy,
    ToolError, ToolSettings,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

const RECORD_TYPES: &[&str] = &["A", "AAAA", "TXT", "MX", "CNAME", "NS", "PTR", "SOA"];

/// Record types arrive either as a list or as a comma-separated string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordTypes {
    List(Vec<String>),
    Joined(String),
}

impl Default for RecordTypes {
    fn default() -> Self {
        RecordTypes::List(vec!["A".to_string()])
    }
}

impl RecordTypes {
    fn normalized(&self) -> Result<Vec<String>, ToolError> {
        let raw: Vec<&str> = match self {
            RecordTypes::List(items) => items.iter().map(String::as_str).collect(),
            RecordTypes::Joined(joined) => joined.split(',').collect(),
        };
        let mut types = Vec::new();
        for item in raw.into_iter().map(str::trim).filter(|s| !s.is_empty()) {
            let upper = item.to_ascii_uppercase();
            if !RECORD_TYPES.contains(&upper.as_str()) {
                return Err(ToolError::invalid(
                    "record_types",
                    format!("'{}' is not one of {}", item, RECORD_TYPES.join(", ")),
                ));
            }
            if !types.contains(&upper) {
                types.push(upper);
            }
        }
        if types.is_empty() {
            types.push("A".to_string());
        }
        Ok(types)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DnsArgs {
    host: String,
    record_types: RecordTypes,
}

pub struct Dns;

impl ServiceTool for Dns {
    fn name(&self) -> &'static str {
        "dns"
    }

    fn description(&self) -> &'static str {
        "Look up DNS records (A, AAAA, TXT, MX, CNAME, NS, PTR, SOA) for a host with dig."
    }

    fn executable(&self) -> &'static str {
        "dig"
    }

    fn target_key(&self) -> &'static str {
        "host"
    }

    fn input_schema(&self) -> Map<String, Value> {
        schema_object(
            vec![
                ("host", json!({ "type": "string", "description": "Domain name (or IP address for PTR) to resolve." })),
                ("record_types", json!({
                    "type": "array",
                    "items": { "type": "string", "enum": RECORD_TYPES },
                    "default": ["A"],
                    "description": "Record types to query.",
                })),
            ],
            vec!["host"],
        )
    }

    fn timeout_policy(&self) -> TimeoutPolicy {
        TimeoutPolicy::new(5, 1, 30)
    }

    fn expected_lines(&self, _args: &Map<String, Value>) -> u32 {
        20
    }

    fn build_command(&self, args: &Map<String, Value>, settings: &ToolSettings) -> Result<String, ToolError> {
        require(args, "host")?;
        let args: DnsArgs = parse_args(args)?;
        let host = validate_host("host", &args.host)?;

        // dig accepts several `name type` queries on one command line.
        let mut cmd = CommandLine::new(settings.executable_or(self.executable())).flags("+noall +answer");
        for record_type in args.record_types.normalized()? {
            if record_type == "PTR" {
                cmd = cmd.opt("-x", host);
            } else {
                cmd = cmd.arg(host).arg(record_type);
            }
        }
        cmd.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::words;

    fn build(value: Value) -> Result<Vec<String>, ToolError> {
        Dns.build_command(value.as_object().unwrap(), &ToolSettings::default())
            .map(|cmd| words(&cmd))
    }

    #[test]
    fn test_default_is_a_record() {
        assert_eq!(
            build(json!({ "host": "example.com" })).unwrap(),
            ["dig", "+noall", "+answer", "example.com", "A"]
        );
    }

    #[test]
    fn test_multiple_types_from_list_or_string() {
        let expected = ["dig", "+noall", "+answer", "example.com", "MX", "example.com", "TXT"];
        assert_eq!(build(json!({ "host": "example.com", "record_types": ["mx", "TXT", "MX"] })).unwrap(), expected);
        assert_eq!(build(json!({ "host": "example.com", "record_types": "MX, txt" })).unwrap(), expected);
    }

    #[test]
    fn test_ptr_uses_reverse_lookup() {
        assert_eq!(
            build(json!({ "host": "8.8.8.8", "record_types": ["PTR"] })).unwrap(),
            ["dig", "+noall", "+answer", "-x", "8.8.8.8"]
        );
    }

    #[test]
    fn test_rejects_unknown_type() {
        let err = build(json!({ "host": "example.com", "record_types": ["ANY"] })).unwrap_err();
        assert!(err.to_string().starts_with("record_types 'ANY' is not one of"));
    }
}
