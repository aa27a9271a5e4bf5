// ocular-core/src/tools/whois.rs

//! Domain registration lookups with `whois`.

use super::{
    option_schema, parse_args, require, schema_object, validate_host, CommandLine, FlagOption,
    ServiceTool, TimeoutPolicy, ToolError, ToolSettings,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

crate::flag_options! {
    pub enum WhoisOption: default Basic {
        Basic => ("basic", "", "Default lookup"),
        Registrar => ("registrar", "-R", "Follow referrals to the registrar's server"),
        Admin => ("admin", "-a", "Search all databases, including admin contacts"),
        Tech => ("tech", "-t", "Request the object template / technical data"),
        Full => ("full", "-H", "Full output without legal disclaimers"),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WhoisArgs {
    domain: String,
    option: WhoisOption,
    server: Option<String>,
}

pub struct Whois;

impl ServiceTool for Whois {
    fn name(&self) -> &'static str {
        "whois"
    }

    fn description(&self) -> &'static str {
        "Query WHOIS registration data (registrar, contacts, dates, name servers) for a domain."
    }

    fn executable(&self) -> &'static str {
        "whois"
    }

    fn target_key(&self) -> &'static str {
        "domain"
    }

    fn input_schema(&self) -> Map<String, Value> {
        schema_object(
            vec![
                ("domain", json!({ "type": "string", "description": "Domain name to look up, e.g. example.com." })),
                ("option", option_schema::<WhoisOption>("Lookup style.")),
                ("server", json!({ "type": "string", "description": "Specific WHOIS server to query." })),
            ],
            vec!["domain"],
        )
    }

    fn timeout_policy(&self) -> TimeoutPolicy {
        TimeoutPolicy::new(30, 10, 120)
    }

    fn build_command(&self, args: &Map<String, Value>, settings: &ToolSettings) -> Result<String, ToolError> {
        require(args, "domain")?;
        let args: WhoisArgs = parse_args(args)?;
        let domain = validate_host("domain", &args.domain)?;

        let mut cmd = CommandLine::new(settings.executable_or(self.executable())).flags(args.option.flags());
        if let Some(server) = args.server.as_deref().filter(|s| !s.trim().is_empty()) {
            cmd = cmd.opt("-h", validate_host("server", server)?);
        }
        cmd.arg(domain).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(value: Value) -> Result<String, ToolError> {
        Whois.build_command(value.as_object().unwrap(), &ToolSettings::default())
    }

    #[test]
    fn test_basic_lookup() {
        assert_eq!(build(json!({ "domain": "example.com" })).unwrap(), "whois example.com");
    }

    #[test]
    fn test_option_and_server() {
        assert_eq!(
            build(json!({ "domain": "example.com", "option": "full", "server": "whois.iana.org" })).unwrap(),
            "whois -H -h whois.iana.org example.com"
        );
    }

    #[test]
    fn test_rejects_unknown_option() {
        let err = build(json!({ "domain": "example.com", "option": "-v" })).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
        assert!(build(json!({ "domain": "example.com", "server": "-x" })).is_err());
    }
}
