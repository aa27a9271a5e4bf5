// ocular-core/src/tools/smbclient.rs

//! SMB share listing with `smbclient`.

use super::{
    option_schema, parse_args, require, schema_object, validate_host, validate_token, CommandLine,
    FlagOption, ServiceTool, TimeoutPolicy, ToolError, ToolSettings,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};

crate::flag_options! {
    pub enum SmbclientOption: default ListShares {
        ListShares => ("list_shares", "", "List shares"),
        NullSession => ("null_session", "-N", "List shares without a password"),
        Smb2 => ("smb2", "-m SMB2", "List shares over SMB2"),
        Smb3 => ("smb3", "-m SMB3", "List shares over SMB3"),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SmbclientArgs {
    target: String,
    options: SmbclientOption,
    username: Option<String>,
    workgroup: Option<String>,
}

pub struct Smbclient;

impl ServiceTool for Smbclient {
    fn name(&self) -> &'static str {
        "smbclient"
    }

    fn description(&self) -> &'static str {
        "List SMB shares exposed by a host with smbclient."
    }

    fn executable(&self) -> &'static str {
        "smbclient"
    }

    fn target_key(&self) -> &'static str {
        "target"
    }

    fn input_schema(&self) -> Map<String, Value> {
        schema_object(
            vec![
                ("target", json!({ "type": "string", "description": "Host or IP address." })),
                ("options", option_schema::<SmbclientOption>("Listing mode.")),
                ("username", json!({ "type": "string", "description": "Username to connect as." })),
                ("workgroup", json!({ "type": "string", "description": "Workgroup or domain." })),
            ],
            vec!["target"],
        )
    }

    fn timeout_policy(&self) -> TimeoutPolicy {
        TimeoutPolicy::new(30, 10, 120)
    }

    fn expected_lines(&self, _args: &Map<String, Value>) -> u32 {
        30
    }

    fn build_command(&self, args: &Map<String, Value>, settings: &ToolSettings) -> Result<String, ToolError> {
        require(args, "target")?;
        let args: SmbclientArgs = parse_args(args)?;
        let target = validate_host("target", &args.target)?;

        // stdin is closed, so a password prompt can never be answered: every
        // mode connects without one.
        let style = args.options.flags();
        let needs_no_pass = !style.split_whitespace().any(|f| f == "-N");
        let mut cmd = CommandLine::new(settings.executable_or(self.executable()))
            .opt("-L", target)
            .flags(style)
            .flag_if(needs_no_pass, "-N");
        if let Some(username) = args.username.as_deref().filter(|u| !u.trim().is_empty()) {
            cmd = cmd.opt("-U", validate_token("username", username)?);
        }
        if let Some(workgroup) = args.workgroup.as_deref().filter(|w| !w.trim().is_empty()) {
            cmd = cmd.opt("-W", validate_token("workgroup", workgroup)?);
        }
        cmd.build()
    }
}
