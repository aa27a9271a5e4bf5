// ocular-core/src/tools/command_line.rs

//! Shell-safe command line assembly and argument validation shared by the
//! tool wrappers.

use super::ToolError;
use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

lazy_static! {
    // Hostnames, IPv4/IPv6 addresses, CIDR blocks and nmap-style ranges.
    static ref HOST_RE: Regex = Regex::new(r"^[A-Za-z0-9\[][A-Za-z0-9._:\-/\[\]%]*$").unwrap();
    static ref PORTS_RE: Regex = Regex::new(r"^\d{1,5}(-\d{1,5})?(,\d{1,5}(-\d{1,5})?)*$").unwrap();
    static ref TOKEN_RE: Regex = Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9._,:/*+\-]*$").unwrap();
}

const MAX_HOST_LEN: usize = 255;

/// Builds a command line one piece at a time.
///
/// Flag templates are trusted (they come from option tables) and are appended
/// verbatim. Everything else is quoted for `sh`.
#[derive(Debug, Clone)]
pub struct CommandLine {
    program: String,
    parts: Vec<Part>,
}

#[derive(Debug, Clone)]
enum Part {
    Raw(String),
    Value(String),
}

impl CommandLine {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            parts: Vec::new(),
        }
    }

    /// Appends a trusted flag template such as `-sV --top-ports 20`. Empty
    /// templates are skipped.
    pub fn flags(mut self, template: &str) -> Self {
        let template = template.trim();
        if !template.is_empty() {
            self.parts.push(Part::Raw(template.to_string()));
        }
        self
    }

    pub fn flag_if(self, condition: bool, template: &str) -> Self {
        if condition {
            self.flags(template)
        } else {
            self
        }
    }

    /// Appends a caller-supplied value, quoted.
    pub fn arg(mut self, value: impl ToString) -> Self {
        self.parts.push(Part::Value(value.to_string()));
        self
    }

    /// Appends `flag value`, quoting only the value.
    pub fn opt(self, flag: &str, value: impl ToString) -> Self {
        self.flags(flag).arg(value)
    }

    pub fn opt_if_some<T: ToString>(self, flag: &str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.opt(flag, v),
            None => self,
        }
    }

    pub fn build(self) -> Result<String, ToolError> {
        let mut words = Vec::with_capacity(self.parts.len() + 1);
        words.push(quote(&self.program)?);
        for part in self.parts {
            match part {
                Part::Raw(flags) => words.push(flags),
                Part::Value(value) => words.push(quote(&value)?),
            }
        }
        Ok(words.join(" "))
    }
}

fn quote(value: &str) -> Result<String, ToolError> {
    shlex::try_quote(value)
        .map(|q| q.into_owned())
        .map_err(|e| ToolError::invalid("argument", format!("cannot be passed to a shell: {}", e)))
}

/// Accepts a hostname, IP address, CIDR block or range; rejects anything that
/// could be read as an option.
pub(crate) fn validate_host<'a>(name: &str, value: &'a str) -> Result<&'a str, ToolError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ToolError::MissingArgument(name.to_string()));
    }
    if value.len() > MAX_HOST_LEN || !HOST_RE.is_match(value) {
        return Err(ToolError::invalid(
            name,
            format!("'{}' is not a valid host, IP address or network range", value),
        ));
    }
    Ok(value)
}

/// Accepts absolute `http`/`https` URLs with a host.
pub(crate) fn validate_url(name: &str, value: &str) -> Result<Url, ToolError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ToolError::MissingArgument(name.to_string()));
    }
    let url = Url::parse(value)
        .map_err(|e| ToolError::invalid(name, format!("'{}' is not a valid URL: {}", value, e)))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ToolError::invalid(name, "must be an http or https URL"));
    }
    Ok(url)
}

/// Accepts port lists such as `22,80,8000-8100`.
pub(crate) fn validate_ports<'a>(name: &str, value: &'a str) -> Result<&'a str, ToolError> {
    let value = value.trim();
    if !PORTS_RE.is_match(value) {
        return Err(ToolError::invalid(
            name,
            format!("'{}' is not a valid port list (e.g. 22,80,8000-8100)", value),
        ));
    }
    Ok(value)
}

/// Accepts a single word such as a script name, tuning string or username.
pub(crate) fn validate_token<'a>(name: &str, value: &'a str) -> Result<&'a str, ToolError> {
    let value = value.trim();
    if !TOKEN_RE.is_match(value) {
        return Err(ToolError::invalid(
            name,
            format!("'{}' contains unsupported characters", value),
        ));
    }
    Ok(value)
}
