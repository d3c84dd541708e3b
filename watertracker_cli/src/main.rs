mod cli;
mod display;
mod error;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, RunCommand};
use error::WaterTrackerCliResult;
use log::{debug, warn};
use watertracker::config::Config;

const DEFAULT_LOGGING_LEVEL: &str = "warn";

fn main() -> Result<()> {
    // Set RUST_LOG to `DEFAULT_LOGGING_LEVEL` if not set
    let _ =
        std::env::var("RUST_LOG").map_err(|_| std::env::set_var("RUST_LOG", DEFAULT_LOGGING_LEVEL));
    pretty_env_logger::init_timed();
    let args = Cli::parse();
    debug!("args: {args:?}");
    let mut config: Config = read_config_from_toml(config_file_path())?;
    if let Some(geo_data) = args.geo_data.as_ref() {
        config.geo_data_path.clone_from(geo_data);
    }
    if let Some(predictions) = args.predictions.as_ref() {
        config.predictions_path.clone_from(predictions);
    }
    debug!("config: {config:?}");

    if let Some(command) = args.command {
        command.run(config)?;
    }
    Ok(())
}

fn config_file_path() -> Option<PathBuf> {
    // macOS: ~/Library/Application Support/watertracker/config.toml
    dirs::config_dir().map(|dir| dir.join("watertracker").join("config.toml"))
}

fn read_config_from_toml(file_path: Option<PathBuf>) -> WaterTrackerCliResult<Config> {
    let Some(file_path) = file_path else {
        warn!("No config directory on this platform, using default config");
        return Ok(Config::default());
    };
    match std::fs::read_to_string(&file_path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
        Err(e) => Err(e.into()),
    }
}
