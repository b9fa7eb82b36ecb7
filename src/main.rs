use std::path::{Path, PathBuf};
use std::process::ExitCode;

use unpixel::config::{load_config, FileConfig};
use unpixel::driver;
use unpixel::DepixResult;

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let Some(config_path) = args.next() else {
        eprintln!("usage: unpixel <config.toml> [pixelized-image]");
        return ExitCode::from(2);
    };
    let image_override = args.next().map(PathBuf::from);

    let config = match load_config(Path::new(&config_path)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load {config_path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config);

    match run(&config, image_override) {
        Ok(Some(reconstructed)) => {
            println!("{reconstructed}");
            ExitCode::SUCCESS
        }
        Ok(None) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}

/// Environment filter wins over the config's logging section, so
/// `RUST_LOG` can override a run without editing the file.
fn init_tracing(config: &FileConfig) {
    let fallback = config
        .logging_params()
        .map(|params| params.filter_directives())
        .unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback)),
        )
        .init();
}

fn run(config: &FileConfig, image_override: Option<PathBuf>) -> DepixResult<Option<String>> {
    let image_path = image_override.or_else(|| config.input_image.clone());
    let image_path = image_path.as_deref();

    match config.grid_params()? {
        Some((picture_grid, training_grid)) => {
            driver::run_grid_search(&picture_grid, &training_grid, image_path)
        }
        None => driver::run(
            config.picture_params()?,
            config.training_params(),
            image_path,
        ),
    }
}
