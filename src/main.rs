use clap::Parser;

use settlewatch::Delivery;
use settlewatch::cli::commands::{config::run_config, watch::run_watch};
use settlewatch::cli::{Cli, Commands};
use settlewatch::config::Settings;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Settings::load(cli.config.as_deref()).unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        Settings::default()
    });

    settlewatch::logging::init_with_config(&config.logging);

    match cli.command {
        Commands::Config => {
            run_config(&config);
            Ok(())
        }

        Commands::Watch {
            file,
            dead_time_ms,
            count,
            best_effort,
        } => {
            // Override config with CLI args
            if let Some(ms) = dead_time_ms {
                config.watch.dead_time_ms = ms;
            }
            if best_effort {
                config.watch.delivery = Delivery::BestEffort;
            }

            run_watch(&file, &config.watch, count)
        }
    }
}
