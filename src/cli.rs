// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `jinja2config`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "jinja2config",
    version,
    about = "Watch a directory for *.yaml.jinja templates and compile them to YAML.",
    long_about = None
)]
pub struct CliArgs {
    /// Directory to scan and watch for templates.
    #[arg(long, env = "HASS_CONFIG_DIR", value_name = "DIR")]
    pub root: PathBuf,

    /// Optional TOML file with renderer/formatter/watch settings.
    ///
    /// Built-in defaults are used when omitted.
    #[arg(long, value_name = "PATH")]
    pub settings: Option<PathBuf>,

    /// Compile every template once, then exit (no watching).
    #[arg(long)]
    pub once: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `JINJA2CONFIG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// List discovered templates and their skip status without compiling.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags() {
        let args = CliArgs::try_parse_from([
            "jinja2config",
            "--root",
            "/config",
            "--settings",
            "tools.toml",
            "--once",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(args.root, PathBuf::from("/config"));
        assert_eq!(args.settings, Some(PathBuf::from("tools.toml")));
        assert!(args.once);
        assert!(!args.dry_run);
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    }

    #[test]
    fn rejects_unknown_log_level() {
        let res = CliArgs::try_parse_from(["jinja2config", "--root", "/c", "--log-level", "loud"]);
        assert!(res.is_err());
    }
}
