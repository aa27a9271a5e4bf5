// ocular-core/src/config.rs

//! `Ocular.toml` parsing, validation and discovery.

use crate::errors::OcularError;
use crate::tools::wpscan::is_env_var_name;
use crate::tools::{builtin_tools, ToolSettings};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CONFIG_FILENAME: &str = "Ocular.toml";
pub const DEFAULT_SERVER_NAME: &str = "ocular-agents";

const LOG_LEVELS: &[&str] = &["off", "error", "warn", "info", "debug", "trace"];

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct OcularConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Per-tool overrides keyed by tool name.
    #[serde(default)]
    pub tools: HashMap<String, ToolConfig>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Implementation name reported to MCP clients.
    #[serde(default = "default_server_name")]
    pub name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Filter used when neither `RUST_LOG` nor `-v` is given.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ToolConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub expected_lines: Option<u32>,
    #[serde(default)]
    pub executable: Option<String>,
    #[serde(default)]
    pub api_token_env_var: Option<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: None,
            expected_lines: None,
            executable: None,
            api_token_env_var: None,
        }
    }
}

impl ToolConfig {
    pub fn settings(&self) -> ToolSettings {
        ToolSettings {
            executable: self.executable.clone(),
            timeout_secs: self.timeout_secs,
            expected_lines: self.expected_lines,
            api_token_env_var: self.api_token_env_var.clone(),
        }
    }
}

fn default_server_name() -> String {
    DEFAULT_SERVER_NAME.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_enabled() -> bool {
    true
}

impl OcularConfig {
    pub fn from_toml_str(content: &str) -> Result<OcularConfig, OcularError> {
        let config: OcularConfig = toml::from_str(content).map_err(|e| {
            tracing::error!(error = %e, "Failed to parse TOML content");
            OcularError::config(format!("Failed to parse configuration TOML: {}", e))
        })?;

        if config.server.name.trim().is_empty() {
            return Err(OcularError::config("'server.name' is empty."));
        }
        if !LOG_LEVELS.contains(&config.logging.level.trim().to_ascii_lowercase().as_str()) {
            return Err(OcularError::config(format!(
                "'logging.level' must be one of {}, got '{}'.",
                LOG_LEVELS.join(", "),
                config.logging.level
            )));
        }

        let known: Vec<&'static str> = builtin_tools().iter().map(|t| t.name()).collect();
        for (name, tool) in &config.tools {
            if !known.contains(&name.as_str()) {
                return Err(OcularError::config(format!(
                    "Unknown tool '{}' in [tools]. Known tools: {}.",
                    name,
                    known.join(", ")
                )));
            }
            if tool.timeout_secs == Some(0) {
                return Err(OcularError::config(format!("Tool '{}' has a zero 'timeout_secs'.", name)));
            }
            if tool.expected_lines == Some(0) {
                return Err(OcularError::config(format!("Tool '{}' has a zero 'expected_lines'.", name)));
            }
            if matches!(&tool.executable, Some(exe) if exe.trim().is_empty()) {
                return Err(OcularError::config(format!("Tool '{}' has an empty 'executable'.", name)));
            }
            if let Some(var) = &tool.api_token_env_var {
                if !is_env_var_name(var) {
                    return Err(OcularError::config(format!(
                        "Tool '{}' has an invalid 'api_token_env_var' ('{}').",
                        name, var
                    )));
                }
            }
        }

        debug!(tools = config.tools.len(), "Parsed and validated Ocular configuration");
        Ok(config)
    }

    /// Reads and validates the configuration at `path`.
    pub fn load(path: &Path) -> Result<OcularConfig> {
        let content = fs::read_to_string(path)
            .map_err(OcularError::from)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        OcularConfig::from_toml_str(&content)
            .with_context(|| format!("Invalid configuration in {:?}", path))
    }

    /// Loads `explicit` if given, else the nearest `Ocular.toml` above the
    /// current directory, else the defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<(OcularConfig, Option<PathBuf>)> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let cwd = env::current_dir().context("Failed to get current directory")?;
                find_config_file(&cwd)
            }
        };
        match path {
            Some(path) => {
                let config = OcularConfig::load(&path)?;
                info!("Loaded configuration from {:?}", path);
                Ok((config, Some(path)))
            }
            None => {
                debug!("No {} found, using defaults", CONFIG_FILENAME);
                Ok((OcularConfig::default(), None))
            }
        }
    }

    pub fn is_enabled(&self, tool: &str) -> bool {
        self.tools.get(tool).map_or(true, |t| t.enabled)
    }

    pub fn settings_for(&self, tool: &str) -> ToolSettings {
        self.tools.get(tool).map(ToolConfig::settings).unwrap_or_default()
    }
}

/// Walks up from `start` looking for `Ocular.toml`.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILENAME))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_config_content() -> &'static str {
        r#"
            [server]
            name = "ocular-test"

            [logging]
            level = "debug"
            directory = "/tmp/ocular-logs"

            [tools.nmap]
            timeout_secs = 600
            expected_lines = 200
            executable = "/usr/bin/nmap"

            [tools.wpscan]
            api_token_env_var = "MY_WPSCAN_TOKEN"

            [tools.smbclient]
            enabled = false
        "#
    }

    #[test]
    fn test_parse_full_config() {
        let result = OcularConfig::from_toml_str(full_config_content());
        assert!(result.is_ok(), "Parse failed: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.server.name, "ocular-test");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.directory, Some(PathBuf::from("/tmp/ocular-logs")));

        let nmap = config.settings_for("nmap");
        assert_eq!(nmap.timeout_secs, Some(600));
        assert_eq!(nmap.expected_lines, Some(200));
        assert_eq!(nmap.executable.as_deref(), Some("/usr/bin/nmap"));
        assert_eq!(config.settings_for("wpscan").api_token_env_var.as_deref(), Some("MY_WPSCAN_TOKEN"));

        assert!(config.is_enabled("nmap"));
        assert!(config.is_enabled("ping"));
        assert!(!config.is_enabled("smbclient"));
        assert_eq!(config.settings_for("ping"), ToolSettings::default());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = OcularConfig::from_toml_str("").unwrap();
        assert_eq!(config, OcularConfig::default());
        assert_eq!(config.server.name, DEFAULT_SERVER_NAME);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validation_errors() {
        let cases = [
            ("[tools.nessus]\nenabled = true", "Unknown tool 'nessus'"),
            ("[server]\nname = \"  \"", "'server.name' is empty"),
            ("[logging]\nlevel = \"loud\"", "'logging.level' must be one of"),
            ("[tools.ping]\ntimeout_secs = 0", "zero 'timeout_secs'"),
            ("[tools.ping]\nexpected_lines = 0", "zero 'expected_lines'"),
            ("[tools.ping]\nexecutable = \"\"", "empty 'executable'"),
            ("[tools.wpscan]\napi_token_env_var = \"$(id)\"", "invalid 'api_token_env_var'"),
            ("[server\nname = 1", "Failed to parse configuration TOML"),
        ];
        for (content, expected) in cases {
            let err = OcularConfig::from_toml_str(content).unwrap_err().to_string();
            assert!(err.contains(expected), "for {:?}: unexpected error {}", content, err);
        }
    }

    #[test]
    fn test_find_config_file_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        assert!(find_config_file(&nested).map_or(true, |p| !p.starts_with(dir.path())));

        let config_path = dir.path().join(CONFIG_FILENAME);
        fs::write(&config_path, "[server]\nname = \"walked\"\n").unwrap();
        assert_eq!(find_config_file(&nested), Some(config_path.clone()));

        let (config, found) = OcularConfig::discover(Some(&config_path)).unwrap();
        assert_eq!(found, Some(config_path));
        assert_eq!(config.server.name, "walked");
    }

    #[test]
    fn test_load_reports_path_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = OcularConfig::load(&missing).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read config file"));
        assert!(matches!(err.downcast_ref::<OcularError>(), Some(OcularError::Io(_))));

        let bad = dir.path().join(CONFIG_FILENAME);
        fs::write(&bad, "[tools.bogus]\n").unwrap();
        let err = OcularConfig::load(&bad).unwrap_err();
        let chain = format!("{:#}", err);
        assert!(chain.contains("Invalid configuration"), "{}", chain);
        assert!(chain.contains("Unknown tool 'bogus'"), "{}", chain);
        assert!(matches!(err.downcast_ref::<OcularError>(), Some(OcularError::Config(_))));
    }
}
