// ocular-core/src/tools/time.rs

//! Current date and time on the server. Answered in-process, no executable.

use super::{parse_args, schema_object, ServiceTool, TimeoutPolicy, ToolError, ToolSettings};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Local, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Clock {
    #[default]
    Local,
    Utc,
}

impl Clock {
    fn now(self) -> DateTime<FixedOffset> {
        match self {
            Clock::Local => Local::now().into(),
            Clock::Utc => Utc::now().into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TimeArgs {
    clock: Clock,
    format: Option<String>,
    as_json: bool,
}

/// ISO-8601 with microseconds (`Z` for UTC), or `format` as a strftime pattern.
fn render(now: &DateTime<FixedOffset>, format: Option<&str>) -> Result<String, ToolError> {
    let Some(format) = format.filter(|f| !f.trim().is_empty()) else {
        return Ok(now.to_rfc3339_opts(SecondsFormat::Micros, true));
    };
    let items: Vec<Item> = StrftimeItems::new(format).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        return Err(ToolError::invalid("format", "is not a valid strftime pattern"));
    }
    let mut out = String::new();
    write!(out, "{}", now.format_with_items(items.iter()))
        .map_err(|_| ToolError::invalid("format", "cannot be applied to this time"))?;
    Ok(out)
}

pub struct Time;

impl ServiceTool for Time {
    fn name(&self) -> &'static str {
        "time"
    }

    fn description(&self) -> &'static str {
        "Report the server's current date and time in ISO-8601, in UTC or local time."
    }

    fn executable(&self) -> &'static str {
        ""
    }

    fn target_key(&self) -> &'static str {
        "clock"
    }

    fn input_schema(&self) -> Map<String, Value> {
        schema_object(
            vec![
                ("clock", json!({ "type": "string", "enum": ["local", "utc"], "default": "local", "description": "Report local time or UTC." })),
                ("format", json!({ "type": "string", "description": "strftime pattern, e.g. %Y-%m-%d %H:%M. ISO-8601 when omitted." })),
                ("as_json", json!({ "type": "boolean", "default": false, "description": "Wrap the result as {\"datetime\": ...}." })),
            ],
            vec![],
        )
    }

    fn timeout_policy(&self) -> TimeoutPolicy {
        TimeoutPolicy::new(5, 1, 30)
    }

    fn expected_lines(&self, _args: &Map<String, Value>) -> u32 {
        1
    }

    fn evaluate(&self, args: &Map<String, Value>) -> Option<Result<String, ToolError>> {
        let answer = parse_args::<TimeArgs>(args).and_then(|args| {
            let text = render(&args.clock.now(), args.format.as_deref())?;
            Ok(if args.as_json {
                json!({ "datetime": text }).to_string()
            } else {
                text
            })
        });
        Some(answer)
    }

    fn build_command(&self, _args: &Map<String, Value>, _settings: &ToolSettings) -> Result<String, ToolError> {
        Err(ToolError::InvalidArguments("time is answered in-process and runs no command".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::run_tool;
    use chrono::TimeZone;

    fn evaluate(value: Value) -> Result<String, ToolError> {
        Time.evaluate(value.as_object().unwrap()).unwrap()
    }

    #[test]
    fn test_utc_is_iso_8601_with_zulu() {
        let text = evaluate(json!({ "clock": "utc" })).unwrap();
        assert!(text.ends_with('Z'), "time: {}", text);
        let parsed = DateTime::parse_from_rfc3339(&text).unwrap();
        assert_eq!(parsed.offset().local_minus_utc(), 0);
        assert!((Utc::now() - parsed.with_timezone(&Utc)).num_seconds().abs() < 5);
    }

    #[test]
    fn test_local_parses_back() {
        let text = evaluate(json!({})).unwrap();
        let parsed = DateTime::parse_from_rfc3339(&text).unwrap();
        assert!((Utc::now() - parsed.with_timezone(&Utc)).num_seconds().abs() < 5);
    }

    #[test]
    fn test_render_formats() {
        let moment: DateTime<FixedOffset> = FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 5, 1, 12, 30, 0)
            .unwrap();
        assert_eq!(render(&moment, None).unwrap(), "2024-05-01T12:30:00.000000+02:00");
        assert_eq!(render(&moment, Some("%Y-%m-%d %H:%M")).unwrap(), "2024-05-01 12:30");
        assert_eq!(render(&moment, Some("  ")).unwrap(), "2024-05-01T12:30:00.000000+02:00");
        assert_eq!(
            render(&moment, Some("%Q")).unwrap_err().to_string(),
            "format is not a valid strftime pattern"
        );
    }

    #[test]
    fn test_json_wrapping_and_bad_clock() {
        let text = evaluate(json!({ "clock": "utc", "as_json": true })).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert!(value["datetime"].as_str().unwrap().ends_with('Z'));

        assert!(matches!(
            evaluate(json!({ "clock": "mars" })),
            Err(ToolError::InvalidArguments(_))
        ));
    }

    #[tokio::test]
    async fn test_run_tool_answers_without_a_command() {
        let args = json!({ "clock": "utc" }).as_object().cloned().unwrap();
        let response = run_tool(&Time, args, &ToolSettings::default(), None).await;
        assert_eq!(response.service, "time");
        assert_eq!(response.target, "utc");
        assert!(response.raw_command.is_empty());
        assert_eq!(response.return_code, Some(0));
        assert!(response.is_terminal());
        assert!(DateTime::parse_from_rfc3339(&response.raw_output).is_ok());
    }

    #[tokio::test]
    async fn test_run_tool_reports_bad_format() {
        let args = json!({ "format": "%Q" }).as_object().cloned().unwrap();
        let response = run_tool(&Time, args, &ToolSettings::default(), None).await;
        assert_eq!(response.raw_error, "format is not a valid strftime pattern");
        assert_eq!(response.return_code, Some(-1));
        assert!(response.raw_output.is_empty());
    }
}
