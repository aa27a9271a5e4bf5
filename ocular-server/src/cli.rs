// ocular-server/src/cli.rs
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Ocular: network diagnostic and penetration-testing tools over MCP.
/// Serves every enabled tool on stdio by default.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase message verbosity.
    ///
    /// Specify multiple times for more verbose output:
    ///  -v:  INFO level
    ///  -vv: DEBUG level
    ///  -vvv: TRACE level (most verbose)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to Ocular.toml. Defaults to the nearest one above the current directory.
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Serve all enabled tools over MCP on stdin/stdout.
    Serve,
    /// Run one tool and print its response as JSON.
    Run {
        /// Tool name, e.g. ping or nmap.
        tool: String,
        /// Tool arguments as a JSON object.
        #[arg(short, long, default_value = "{}")]
        args: String,
        /// Don't echo output lines to stderr while the tool runs.
        #[arg(short, long)]
        quiet: bool,
    },
    /// List the available tools.
    List {
        /// Print the full catalogue, schemas included, as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_serve() {
        let cli = Cli::try_parse_from(["ocular-server"]).unwrap();
        assert_eq!(cli.verbose, 0);
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_run_subcommand() {
        let cli = Cli::try_parse_from([
            "ocular-server", "-vv", "--config", "/etc/ocular/Ocular.toml",
            "run", "ping", "--args", r#"{"host":"localhost"}"#, "-q",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/ocular/Ocular.toml")));
        assert_eq!(
            cli.command,
            Some(Commands::Run {
                tool: "ping".into(),
                args: r#"{"host":"localhost"}"#.into(),
                quiet: true,
            })
        );
    }

    #[test]
    fn test_list_json_and_global_flags() {
        let cli = Cli::try_parse_from(["ocular-server", "list", "--json", "-v"]).unwrap();
        assert_eq!(cli.command, Some(Commands::List { json: true }));
        assert_eq!(cli.verbose, 1);
    }
}
