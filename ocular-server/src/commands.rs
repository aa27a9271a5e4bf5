// ocular-server/src/commands.rs

//! One-shot `run` and `list` subcommands.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use colored::*;
use ocular_core::{ProgressSink, ProgressUpdate, ToolRegistry, TracingProgress};
use serde_json::{Map, Value};
use std::io::Write;
use tracing::info;

/// Echoes each output line to stderr while a tool runs.
struct StderrProgress;

#[async_trait]
impl ProgressSink for StderrProgress {
    async fn report(&self, update: ProgressUpdate) -> Result<()> {
        let counter = match update.total {
            Some(total) => format!("[{}/{}]", update.progress, total),
            None => format!("[{}]", update.progress),
        };
        eprintln!("{} {}", counter.dimmed(), update.message);
        Ok(())
    }
}

fn parse_arguments(raw: &str) -> Result<Map<String, Value>> {
    let value: Value = serde_json::from_str(raw).context("--args is not valid JSON")?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(anyhow!("--args must be a JSON object, got {}", other)),
    }
}

/// Runs `tool` once and writes the response JSON to `out`. Returns whether the
/// run was free of errors.
pub async fn run_once(
    registry: &ToolRegistry,
    tool: &str,
    raw_args: &str,
    quiet: bool,
    out: &mut impl Write,
) -> Result<bool> {
    let args = parse_arguments(raw_args)?;
    // Quiet runs still leave the output lines in the debug log.
    let progress: Box<dyn ProgressSink> = if quiet {
        Box::new(TracingProgress::new(tool))
    } else {
        Box::new(StderrProgress)
    };
    let response = registry.call(tool, args, Some(progress.as_ref())).await?;
    info!(tool, return_code = ?response.return_code, "Run finished");

    let json = serde_json::to_string_pretty(&response.to_dict())
        .context("Failed to serialize response")?;
    writeln!(out, "{}", json).context("Failed to write response")?;
    Ok(!response.has_errors())
}

/// Writes the tool catalogue to `out`, as JSON or as a readable list.
pub fn list_tools(registry: &ToolRegistry, json: bool, out: &mut impl Write) -> Result<()> {
    let catalogue = registry.describe();
    if json {
        let text = serde_json::to_string_pretty(&catalogue).context("Failed to serialize catalogue")?;
        writeln!(out, "{}", text)?;
        return Ok(());
    }

    writeln!(out, "{}", "Available tools:".bold())?;
    for entry in catalogue.as_array().into_iter().flatten() {
        let name = entry["name"].as_str().unwrap_or_default();
        let installed = entry["installed"].as_bool().unwrap_or(false);
        let status = if installed {
            "installed".green()
        } else {
            "not installed".red()
        };
        writeln!(
            out,
            "  {} ({}, {}, timeout {}s)",
            name.cyan().bold(),
            entry["executable"].as_str().unwrap_or_default(),
            status,
            entry["timeout"]["default"],
        )?;
        writeln!(out, "      {}", entry["description"].as_str().unwrap_or_default())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocular_core::{OcularConfig, ToolError};

    fn registry(toml: &str) -> ToolRegistry {
        ToolRegistry::from_config(&OcularConfig::from_toml_str(toml).unwrap())
    }

    #[test]
    fn test_parse_arguments() {
        assert!(parse_arguments("{}").unwrap().is_empty());
        assert_eq!(parse_arguments(r#"{"host":"a.com"}"#).unwrap()["host"], "a.com");
        assert!(parse_arguments("[1,2]").is_err());
        assert!(parse_arguments("{oops").is_err());
    }

    #[tokio::test]
    async fn test_run_once_success() {
        let reg = registry("[tools.ping]\nexecutable = \"echo\"");
        let mut out = Vec::new();
        let ok = run_once(&reg, "ping", r#"{"host":"localhost","count":1}"#, true, &mut out).await.unwrap();
        assert!(ok);
        let body: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(body["service"], "ping");
        assert_eq!(body["return_code"], 0);
    }

    #[tokio::test]
    async fn test_run_once_reports_failures() {
        let reg = registry("");
        let mut out = Vec::new();
        let ok = run_once(&reg, "dns", "{}", true, &mut out).await.unwrap();
        assert!(!ok);
        let body: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(body["raw_error"], "host parameter is required");

        let err = run_once(&reg, "nessus", "{}", true, &mut Vec::new()).await.unwrap_err();
        assert_eq!(err.downcast_ref::<ToolError>(), Some(&ToolError::UnknownTool("nessus".into())));
    }

    #[test]
    fn test_list_tools_plain_and_json() {
        colored::control::set_override(false);
        let reg = registry("[tools.whois]\nenabled = false");

        let mut out = Vec::new();
        list_tools(&reg, false, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Available tools:"));
        assert!(text.contains("  nmap (nmap, "));
        assert!(text.contains("  time (built-in, installed, timeout 5s)"));
        assert!(!text.contains("whois"));

        let mut out = Vec::new();
        list_tools(&reg, true, &mut out).unwrap();
        let catalogue: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(catalogue.as_array().unwrap().len(), 12);
    }
}
