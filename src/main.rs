use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser as _;
use piperbook::config::ToolConfig;
use piperbook::error::{Interrupted, MissingTool};
use piperbook::tools::ExternalTools;
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber as _;

const EXIT_MISSING_TOOL: u8 = 1;
const EXIT_FATAL: u8 = 2;
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let dispatch = match piperbook::logging::subscriber() {
        Ok(dispatch) => dispatch,
        Err(err) => {
            eprintln!("{err:#}");
            return ExitCode::from(EXIT_FATAL);
        }
    };

    let cli = piperbook::cli::Cli::parse();

    async move {
        tracing::debug!(?cli, "parsed cli");

        let cancel = CancellationToken::new();
        let interrupt = cancel.clone();
        tokio::spawn(
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("interrupted, stopping workers");
                    interrupt.cancel();
                }
            }
            .with_current_subscriber(),
        );

        match try_main(&cli, cancel).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("{err:#}");
                exit_code(&err)
            }
        }
    }
    .with_subscriber(dispatch)
    .await
}

async fn try_main(cli: &piperbook::cli::Cli, cancel: CancellationToken) -> anyhow::Result<()> {
    let config = ToolConfig::from_env();
    let tools = Arc::new(ExternalTools::new(config.clone()));
    piperbook::convert::run(cli, &config, tools, cancel).await?;
    Ok(())
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    if err.chain().any(|cause| cause.is::<Interrupted>()) {
        return ExitCode::from(EXIT_INTERRUPTED);
    }
    if err.chain().any(|cause| cause.is::<MissingTool>()) {
        return ExitCode::from(EXIT_MISSING_TOOL);
    }
    ExitCode::from(EXIT_FATAL)
}
