// ocular-core/src/tools/wpscan.rs

//! WordPress scanning with `wpscan`.

use super::{
    option_schema, parse_args, require, schema_object, validate_url, CommandLine, FlagOption,
    ServiceTool, TimeoutPolicy, ToolError, ToolSettings,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::env;

/// Environment variable consulted for an API token when none is passed.
pub const DEFAULT_TOKEN_ENV_VAR: &str = "WPSCAN_API_TOKEN";
/// Child environment variable carrying an `api_token` passed by the caller.
pub const ARGUMENT_TOKEN_ENV_VAR: &str = "OCULAR_WPSCAN_API_TOKEN";

crate::flag_options! {
    pub enum WpscanOption: default Basic {
        Basic => ("basic", "--enumerate p,t,u --plugins-detection mixed", "Plugins, themes and users"),
        Plugins => ("plugins", "--enumerate p --plugins-detection aggressive", "Aggressive plugin discovery"),
        Themes => ("themes", "--enumerate t --themes-detection aggressive", "Aggressive theme discovery"),
        Users => ("users", "--enumerate u", "User enumeration"),
        Vuln => ("vuln", "--enumerate vp,vt --plugins-detection aggressive", "Vulnerable plugins and themes (API token recommended)"),
        Full => ("full", "--enumerate ap,at,tt,cb,dbe,u,m --plugins-detection aggressive", "Everything, slow"),
        Passive => ("passive", "--enumerate p,t,u --plugins-detection passive", "Passive detection only"),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WpscanArgs {
    url: String,
    options: WpscanOption,
    api_token: Option<String>,
    force: bool,
    random_user_agent: bool,
}

pub(crate) fn is_env_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

pub struct Wpscan;

impl ServiceTool for Wpscan {
    fn name(&self) -> &'static str {
        "wpscan"
    }

    fn description(&self) -> &'static str {
        "Scan a WordPress site for plugins, themes, users and known vulnerabilities with wpscan."
    }

    fn executable(&self) -> &'static str {
        "wpscan"
    }

    fn target_key(&self) -> &'static str {
        "url"
    }

    fn input_schema(&self) -> Map<String, Value> {
        schema_object(
            vec![
                ("url", json!({ "type": "string", "description": "URL of the WordPress site." })),
                ("options", option_schema::<WpscanOption>("Enumeration profile.")),
                ("api_token", json!({ "type": "string", "description": "WPScan API token. Defaults to the server's configured environment variable." })),
                ("force", json!({ "type": "boolean", "default": false, "description": "Scan even if the site does not look like WordPress." })),
                ("random_user_agent", json!({ "type": "boolean", "default": false, "description": "Use a random User-Agent." })),
            ],
            vec!["url"],
        )
    }

    fn timeout_policy(&self) -> TimeoutPolicy {
        TimeoutPolicy::new(300, 60, 1800)
    }

    fn expected_lines(&self, _args: &Map<String, Value>) -> u32 {
        80
    }

    fn secret_arguments(&self) -> &'static [(&'static str, &'static str)] {
        &[("api_token", ARGUMENT_TOKEN_ENV_VAR)]
    }

    fn build_command(&self, args: &Map<String, Value>, settings: &ToolSettings) -> Result<String, ToolError> {
        require(args, "url")?;
        let args: WpscanArgs = parse_args(args)?;
        let url = validate_url("url", &args.url)?;

        let mut cmd = CommandLine::new(settings.executable_or(self.executable()))
            .opt("--url", url)
            .flags(args.options.flags());

        // Tokens always go through the environment and are expanded by the
        // shell, so they never show up in the recorded command line.
        match args.api_token.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            Some(_) => cmd = cmd.flags(&format!("--api-token \"${}\"", ARGUMENT_TOKEN_ENV_VAR)),
            None => {
                let var = settings
                    .api_token_env_var
                    .as_deref()
                    .unwrap_or(DEFAULT_TOKEN_ENV_VAR);
                if !is_env_var_name(var) {
                    return Err(ToolError::invalid(
                        "api_token_env_var",
                        format!("'{}' is not a valid environment variable name", var),
                    ));
                }
                if env::var(var).map(|v| !v.trim().is_empty()).unwrap_or(false) {
                    cmd = cmd.flags(&format!("--api-token \"${}\"", var));
                }
            }
        }

        cmd.flag_if(args.force, "--force")
            .flag_if(args.random_user_agent, "--random-user-agent")
            .flags("--no-banner --disable-tls-checks")
            .build()
    }
}
