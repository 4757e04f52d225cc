use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use wastedetect_frontend::{run_frontend, FrontendConfig};

#[derive(Parser)]
#[command(author, version, about = "Detect and classify waste objects in an image")]
struct Args {
    /// JPEG or PNG image to analyze
    image: PathBuf,
    /// Detection API base URL (overrides WASTEDETECT_API_URL)
    #[arg(long)]
    api_url: Option<String>,
    /// Request timeout in seconds, 0 for none (overrides WASTEDETECT_TIMEOUT_SECS)
    #[arg(long)]
    timeout_secs: Option<u64>,
}

fn main() -> Result<ExitCode> {
    env_logger::init();
    let args = Args::parse();

    let mut config = FrontendConfig::from_env();
    if let Some(api_url) = args.api_url {
        config = config.with_api_url(api_url);
    }
    if let Some(secs) = args.timeout_secs {
        config = config.with_timeout_secs(secs);
    }

    // Give the worker a little longer than the HTTP client's own deadline.
    let settle_timeout = config
        .request_timeout
        .map(|timeout| timeout + Duration::from_secs(5))
        .unwrap_or(Duration::from_secs(24 * 60 * 60));

    let mut last = String::new();
    let outcome = run_frontend(&config, &args.image, settle_timeout, |screen| {
        let text = screen.to_string();
        if text != last {
            print!("{text}");
            last = text;
        }
    })?;
    log::info!("finished: {outcome:?}");

    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
