//! recplay CLI entry point

use std::process::ExitCode;

use clap::Parser;

use recplay::cli::{
    app::{load_merged_config, run_info, run_play, run_record, EXIT_ERROR, EXIT_USAGE_ERROR},
    args::{Cli, Commands},
    config_cmd::handle_config_command,
    init_logging,
    presenter::Presenter,
};
use recplay::domain::config::AppConfig;
use recplay::infrastructure::XdgConfigStore;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let presenter = Presenter::new();

    // Build CLI config from global args
    let mut cli_config = AppConfig {
        platform: cli.platform.clone(),
        recordings_dir: cli
            .recordings_dir
            .as_ref()
            .map(|dir| dir.to_string_lossy().into_owned()),
        ..Default::default()
    };

    match cli.command {
        Commands::Config { action } => {
            let store = XdgConfigStore::new();
            if let Err(e) = handle_config_command(action, &store, &presenter).await {
                presenter.error(&e.to_string());
                return ExitCode::from(EXIT_ERROR);
            }
            ExitCode::SUCCESS
        }
        Commands::Record(args) => {
            let (options, recorder) = match args.options().and_then(|options| {
                args.recorder_overrides().map(|recorder| (options, recorder))
            }) {
                Ok(parsed) => parsed,
                Err(e) => {
                    presenter.error(&e);
                    return ExitCode::from(EXIT_USAGE_ERROR);
                }
            };
            cli_config.recorder = Some(recorder);
            cli_config.player = Some(args.player_overrides());

            let config = load_merged_config(cli_config).await;
            run_record(config, options).await
        }
        Commands::Play(args) => {
            let options = match args.options() {
                Ok(options) => options,
                Err(e) => {
                    presenter.error(&e);
                    return ExitCode::from(EXIT_USAGE_ERROR);
                }
            };
            cli_config.player = Some(args.player_overrides());

            let config = load_merged_config(cli_config).await;
            run_play(config, options).await
        }
        Commands::Info(args) => {
            let config = load_merged_config(cli_config).await;
            run_info(config, args).await
        }
    }
}
