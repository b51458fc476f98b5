use std::io::{self, IsTerminal};
use std::path::Path;

use anyhow::Result;
use tokio::io::BufReader;
use tracing::info;

use crate::assistant::AssistantClient;
use crate::config::Config;
use crate::console::TerminalConsole;
use crate::controller::{Console, LineStyle};
use crate::runner::drive_run;
use crate::telemetry::logging;
use crate::terminal::cli::{Cli, Command, RunArgs, SourceArgs};
use crate::terminal::error::CliError;
use crate::transport::WebSocketConnector;

/// Runs the parsed command line and returns the process exit status.
pub async fn execute(cli: Cli) -> Result<i32> {
    logging::init(&cli.logging.to_config()).map_err(CliError::from)?;
    let config = cli
        .server
        .map(Config::with_server)
        .unwrap_or_else(Config::from_env);

    match cli.command {
        Command::Run(args) => run_file(&config, args).await,
        Command::TestCases(args) => ask_assistant(&config, args, AssistantTask::TestCases).await,
        Command::Hints(args) => ask_assistant(&config, args, AssistantTask::Hints).await,
    }
}

async fn run_file(config: &Config, args: RunArgs) -> Result<i32> {
    let source = read_source(&args.file).await?;
    let url = config.terminal_url().map_err(CliError::from)?;
    info!(%url, file = %args.file.display(), "starting run");

    let color = !args.no_color && io::stdout().is_terminal();
    // An interactive terminal already echoes what the user typed.
    let echo_input = !io::stdin().is_terminal();
    let console = TerminalConsole::new(io::stdout(), color).with_input_echo(echo_input);
    let stdin = BufReader::new(tokio::io::stdin());
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    let mut report = drive_run(
        WebSocketConnector::new(url),
        &source,
        console,
        stdin,
        shutdown,
    )
    .await;

    let gutter = report.annotator.render_gutter();
    if !gutter.is_empty() {
        report
            .console
            .append(&format!("{}:", args.file.display()), LineStyle::System);
        for row in gutter {
            report.console.append(&row, LineStyle::Error);
        }
    }
    Ok(report.exit_code())
}

#[derive(Debug, Clone, Copy)]
enum AssistantTask {
    TestCases,
    Hints,
}

async fn ask_assistant(config: &Config, args: SourceArgs, task: AssistantTask) -> Result<i32> {
    let source = read_source(&args.file).await?;
    let client = AssistantClient::new(config.http_base().map_err(CliError::from)?);
    let mut console = TerminalConsole::stdout();

    let result = match task {
        AssistantTask::TestCases => {
            console.append("Generating test cases...", LineStyle::System);
            client.test_cases(&source).await
        }
        AssistantTask::Hints => {
            console.append("Analyzing code for hints...", LineStyle::System);
            client.hints(&source).await
        }
    };

    match result {
        Ok(text) => {
            console.append(&text, LineStyle::Assistant);
            Ok(0)
        }
        Err(err) => {
            console.append(&format!("Error calling assistant: {err}"), LineStyle::Error);
            Err(CliError::from(err).into())
        }
    }
}

async fn read_source(path: &Path) -> Result<String, CliError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CliError::ReadSource {
            path: path.to_path_buf(),
            source,
        })
}
