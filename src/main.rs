use std::process::ExitCode;

use clap::Parser;

use headprobe::cli::Cli;
use headprobe::http_probe::report;
use headprobe::report::ConsoleSink;
use headprobe::{ConfigError, Orchestrator, RunSummary, load_config};

async fn probe(cli: Cli) -> Result<RunSummary, ConfigError> {
    let app_config = load_config(&cli)?;
    let sink = ConsoleSink::new(&app_config.targets);

    Orchestrator::new(app_config.settings)
        .with_sink(Box::new(sink))
        .run(&app_config.targets)
        .await
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match probe(cli).await {
        Ok(summary) => {
            println!("{summary}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", report(&e));
            ExitCode::FAILURE
        }
    }
}
