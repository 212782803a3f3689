//! Command-line entry point, meant to be triggered by cron or a CI schedule.
//!
//! Usage: evardalen_service [run|status] [--config <path>]

use evardalen_service::config::{Config, DEFAULT_CONFIG_PATH};
use evardalen_service::fetch::HttpFetcher;
use evardalen_service::history::HistoryStore;
use evardalen_service::logging::{self, Stage};
use evardalen_service::pipeline::Pipeline;
use std::error::Error;
use std::process::ExitCode;

enum Command {
    Run,
    Status,
}

fn parse_args() -> Result<(Command, String), String> {
    let mut command = Command::Run;
    let mut config_path = DEFAULT_CONFIG_PATH.to_string();

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "run" => command = Command::Run,
            "status" => command = Command::Status,
            "--config" | "-c" => {
                config_path = args.next().ok_or("--config needs a path")?;
            }
            other => return Err(format!("unknown argument '{}'", other)),
        }
    }
    Ok((command, config_path))
}

fn main() -> ExitCode {
    let (command, config_path) = match parse_args() {
        Ok(parsed) => parsed,
        Err(msg) => {
            eprintln!("{}\nUsage: evardalen_service [run|status] [--config <path>]", msg);
            return ExitCode::from(2);
        }
    };

    match execute(command, &config_path) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("evardalen_service: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn execute(command: Command, config_path: &str) -> Result<bool, Box<dyn Error>> {
    let config = Config::load(config_path)?;
    logging::init_logger(
        config.logging.level,
        config.logging.file.as_deref(),
        config.logging.console_timestamps,
    );

    let store = HistoryStore::open(&config)?;

    match command {
        Command::Status => {
            print_status(&store);
            Ok(true)
        }
        Command::Run => {
            let fetcher = HttpFetcher::new(&config)?;
            let mut pipeline = Pipeline::new(&config, &fetcher, &fetcher, store)?;
            let outcome = pipeline.run_cycle();
            logging::debug(Stage::System, None, &format!("Cycle outcome: {:?}", outcome));
            Ok(outcome.is_success())
        }
    }
}

fn print_status(store: &HistoryStore) {
    match store.load_current_snapshot() {
        Some(current) => {
            println!("Current reading ({}):", current.reading.timestamp);
            println!(
                "  Wind:        {}",
                match (current.reading.wind_speed, &current.reading.wind_direction) {
                    (Some(speed), Some(dir)) => format!("{:.1} m/s {}", speed, dir),
                    _ => "n/a".to_string(),
                }
            );
            println!(
                "  Temperature: {}",
                current
                    .reading
                    .temperature
                    .map(|t| format!("{:.1} °C", t))
                    .unwrap_or_else(|| "n/a".to_string())
            );
            println!(
                "  Image:       {}",
                current.image_path.as_deref().unwrap_or("none")
            );
        }
        None => println!("No current reading stored yet."),
    }
    println!("History: {} record(s)", store.history().len());
}
