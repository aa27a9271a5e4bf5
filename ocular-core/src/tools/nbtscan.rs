// ocular-core/src/tools/nbtscan.rs

//! NetBIOS name scanning with `nbtscan`.

use super::{
    check_range, option_schema, parse_args, require, schema_object, validate_host, CommandLine,
    FlagOption, ServiceTool, TimeoutPolicy, ToolError, ToolSettings,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

crate::flag_options! {
    pub enum NbtscanOption: default Basic {
        Basic => ("basic", "", "One line per host"),
        Verbose => ("verbose", "-v", "All names each host reports"),
        Script => ("script", "-v -s :", "Verbose, colon-separated script-friendly output"),
        Hosts => ("hosts", "-e", "/etc/hosts format"),
        Lmhosts => ("lmhosts", "-l", "lmhosts format"),
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct NbtscanArgs {
    target: String,
    options: NbtscanOption,
    verbose: bool,
    retransmits: u32,
    response_timeout_ms: u32,
}

impl Default for NbtscanArgs {
    fn default() -> Self {
        Self {
            target: String::new(),
            options: NbtscanOption::default(),
            verbose: false,
            retransmits: 0,
            response_timeout_ms: 1000,
        }
    }
}

pub struct Nbtscan;

impl ServiceTool for Nbtscan {
    fn name(&self) -> &'static str {
        "nbtscan"
    }

    fn description(&self) -> &'static str {
        "Discover NetBIOS names, workgroups and MAC addresses on a host or network range with nbtscan."
    }

    fn executable(&self) -> &'static str {
        "nbtscan"
    }

    fn target_key(&self) -> &'static str {
        "target"
    }

    fn input_schema(&self) -> Map<String, Value> {
        schema_object(
            vec![
                ("target", json!({ "type": "string", "description": "IP address, CIDR block (192.168.1.0/24) or range (192.168.1.1-254)." })),
                ("options", option_schema::<NbtscanOption>("Output style.")),
                ("verbose", json!({ "type": "boolean", "default": false, "description": "Add -v to any style." })),
                ("retransmits", json!({ "type": "integer", "minimum": 0, "maximum": 10, "default": 0, "description": "Number of retransmits (0-10)." })),
                ("response_timeout_ms", json!({ "type": "integer", "minimum": 100, "maximum": 30000, "default": 1000, "description": "Per-host response timeout in milliseconds." })),
            ],
            vec!["target"],
        )
    }

    fn timeout_policy(&self) -> TimeoutPolicy {
        TimeoutPolicy::new(60, 10, 300)
    }

    fn build_command(&self, args: &Map<String, Value>, settings: &ToolSettings) -> Result<String, ToolError> {
        require(args, "target")?;
        let args: NbtscanArgs = parse_args(args)?;
        let target = validate_host("target", &args.target)?;
        let retransmits = check_range("retransmits", args.retransmits, 0, 10)?;
        let response_timeout = check_range("response_timeout_ms", args.response_timeout_ms, 100, 30000)?;

        let style = args.options.flags();
        let has_verbose = style.split_whitespace().any(|f| f == "-v");
        let mut cmd = CommandLine::new(settings.executable_or(self.executable()))
            .flags(style)
            .flag_if(args.verbose && !has_verbose, "-v")
            .opt("-t", response_timeout);
        if retransmits > 0 {
            cmd = cmd.opt("-m", retransmits);
        }
        cmd.flags("-q").arg(target).build()
    }
}
