use std::env;
use std::process::ExitCode;

use aqmap_service::{config, logging, pipeline};
use tracing::error;

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let config_path = env::var("AQMAP_CONFIG").unwrap_or_else(|_| "./aqmap.toml".to_string());

    let config = match config::load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Failed to load configuration {}: {}", config_path, e);
            return ExitCode::FAILURE;
        }
    };

    logging::init_logger(
        config.logging.level,
        config.logging.file.as_deref(),
        config.logging.timestamps,
    );

    let result = pipeline::run_from_config(&config)
        .and_then(|report| pipeline::write_report(&report, config.output_file.as_deref()));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("classification run failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
