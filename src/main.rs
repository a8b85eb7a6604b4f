use std::path::PathBuf;

use anyhow::{Context, Result};
use sensordemo_lib::sensors::ReplaySource;
use tokio::io::BufReader;

#[tokio::main]
async fn main() -> Result<()> {
    let debug_mode = std::env::var("SENSORDEMO_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    // Default level, overridable through RUST_LOG
    env_logger::Builder::new()
        .filter_level(if debug_mode {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .parse_default_env()
        .init();

    log::info!("sensordemo starting up...");

    // Replay file from the first argument, stdin otherwise.
    let source = match std::env::args_os().nth(1) {
        Some(path) => {
            let path = PathBuf::from(path);
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?;
            ReplaySource::new(BufReader::new(file))
        }
        None => ReplaySource::stdin()?,
    };

    let data_dir = sensordemo_lib::data_dir_from_env();
    let summary = sensordemo_lib::run(&source, &data_dir).await?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
