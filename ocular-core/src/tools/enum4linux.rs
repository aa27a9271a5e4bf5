// ocular-core/src/tools/enum4linux.rs

//! SMB/Windows enumeration with `enum4linux`.

use super::{
    option_schema, parse_args, require, schema_object, validate_host, CommandLine, FlagOption,
    ServiceTool, TimeoutPolicy, ToolError, ToolSettings,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

crate::flag_options! {
    pub enum Enum4linuxOption: default All {
        All => ("all", "-a", "Every simple enumeration"),
        Users => ("users", "-U", "User list"),
        Machines => ("machines", "-M", "Machine list"),
        Shares => ("shares", "-S", "Share list"),
        PasswordPolicy => ("password_policy", "-P", "Password policy"),
        Groups => ("groups", "-G", "Groups and members"),
        Detailed => ("detailed", "-U -S -d", "Users and shares with details"),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Enum4linuxArgs {
    target: String,
    options: Enum4linuxOption,
    username: Option<String>,
    password: Option<String>,
}

pub struct Enum4linux;

impl ServiceTool for Enum4linux {
    fn name(&self) -> &'static str {
        "enum4linux"
    }

    fn description(&self) -> &'static str {
        "Enumerate users, shares, groups and password policy from a Windows/Samba host with enum4linux."
    }

    fn executable(&self) -> &'static str {
        "enum4linux"
    }

    fn target_key(&self) -> &'static str {
        "target"
    }

    fn input_schema(&self) -> Map<String, Value> {
        schema_object(
            vec![
                ("target", json!({ "type": "string", "description": "Host or IP address." })),
                ("options", option_schema::<Enum4linuxOption>("What to enumerate.")),
                ("username", json!({ "type": "string", "description": "Username for authenticated enumeration." })),
                ("password", json!({ "type": "string", "description": "Password for the username." })),
            ],
            vec!["target"],
        )
    }

    fn timeout_policy(&self) -> TimeoutPolicy {
        TimeoutPolicy::new(120, 30, 600)
    }

    fn expected_lines(&self, _args: &Map<String, Value>) -> u32 {
        200
    }

    fn build_command(&self, args: &Map<String, Value>, settings: &ToolSettings) -> Result<String, ToolError> {
        require(args, "target")?;
        let args: Enum4linuxArgs = parse_args(args)?;
        let target = validate_host("target", &args.target)?;
        let username = args.username.filter(|u| !u.is_empty());
        let password = args.password.filter(|p| !p.is_empty());
        if password.is_some() && username.is_none() {
            return Err(ToolError::invalid("password", "requires a username"));
        }

        CommandLine::new(settings.executable_or(self.executable()))
            .flags(args.options.flags())
            .opt_if_some("-u", username)
            .opt_if_some("-p", password)
            .arg(target)
            .build()
    }
}
