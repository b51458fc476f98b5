use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::telemetry::logging::{LogConfig, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "playground",
    about = "Run source code on a remote playground server and talk to it live",
    author,
    version
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        value_name = "ADDR",
        help = "Execution server address (host:port or URL); defaults to $PLAYGROUND_SERVER or 127.0.0.1:8080"
    )]
    pub server: Option<String>,

    #[command(flatten)]
    pub logging: LoggingArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct LoggingArgs {
    #[arg(
        long = "log-level",
        global = true,
        value_enum,
        env = "PLAYGROUND_LOG_LEVEL",
        default_value_t = LogLevel::Warn,
        help = "Minimum log level (error, warn, info, debug, trace)"
    )]
    pub level: LogLevel,

    #[arg(
        long = "log-file",
        global = true,
        value_name = "PATH",
        env = "PLAYGROUND_LOG_FILE",
        help = "Write structured logs to the specified file"
    )]
    pub file: Option<PathBuf>,

    #[arg(
        long = "trace-wire",
        global = true,
        env = "PLAYGROUND_TRACE_WIRE",
        action = clap::ArgAction::SetTrue,
        help = "At trace level, also log every frame and the websocket/HTTP crates"
    )]
    pub wire_trace: bool,
}

impl LoggingArgs {
    pub fn to_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            file: self.file.clone(),
            wire_trace: self.wire_trace,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile and run a source file, streaming output and forwarding stdin
    Run(RunArgs),
    /// Ask the assistant to generate test cases for a source file
    TestCases(SourceArgs),
    /// Ask the assistant for hints about a source file
    Hints(SourceArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[arg(value_name = "FILE", help = "Source file to run")]
    pub file: PathBuf,

    #[arg(
        long = "no-color",
        action = clap::ArgAction::SetTrue,
        help = "Disable styled output even when stdout is a terminal"
    )]
    pub no_color: bool,
}

#[derive(Args, Debug)]
pub struct SourceArgs {
    #[arg(value_name = "FILE", help = "Source file to send")]
    pub file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_with_global_flags() {
        let cli = Cli::try_parse_from([
            "playground",
            "run",
            "Main.java",
            "--server",
            "ws://10.0.0.2:8080",
            "--log-level",
            "debug",
        ])
        .expect("parse");
        assert_eq!(cli.server.as_deref(), Some("ws://10.0.0.2:8080"));
        assert_eq!(cli.logging.level, LogLevel::Debug);
        assert!(!cli.logging.to_config().wire_trace);
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.file, PathBuf::from("Main.java"));
                assert!(!args.no_color);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_assistant_commands() {
        let cli = Cli::try_parse_from(["playground", "test-cases", "Main.java"]).expect("parse");
        assert!(matches!(cli.command, Command::TestCases(_)));
        let cli = Cli::try_parse_from(["playground", "hints", "Main.java"]).expect("parse");
        assert!(matches!(cli.command, Command::Hints(_)));
    }
}
