//! Water Sentry - offline classifier
//!
//! Reads one JSON reading per line from stdin, fills missing sensor fields,
//! classifies it and prints a one-line summary:
//!
//!   echo '{"location":"well-3","tds":480}' | cargo run --bin water_sentry
//!
//! Blank lines are skipped; malformed lines are reported and skipped.
//! WATER_SYNTHESIS / WATER_SYNTHESIS_SEED select the synthesis strategy.

use eyre::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use water_sentry::api::SubmitReadingRequest;
use water_sentry::{RiskClassifier, RiskStatus, ServiceConfig, Synthesizer};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = ServiceConfig::from_env();
    let classifier = RiskClassifier::new(config.classifier);
    let synthesizer = Synthesizer::new(config.synthesis);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let (mut total, mut rejected) = (0u64, 0u64);
    let mut by_status = [0u64; 3];

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        total += 1;

        let outcome = serde_json::from_str::<SubmitReadingRequest>(line)
            .map_err(water_sentry::AppError::from)
            .and_then(|req| synthesizer.fill(req.into()))
            .and_then(|reading| classifier.assess(&reading).map(|a| (reading, a)));

        match outcome {
            Ok((reading, assessment)) => {
                by_status[match assessment.status {
                    RiskStatus::Safe => 0,
                    RiskStatus::Moderate => 1,
                    RiskStatus::High => 2,
                }] += 1;
                println!("{:<20} {}", reading.location, assessment.summary());
            }
            Err(e) => {
                rejected += 1;
                warn!(line = total, "Skipping reading: {}", e);
            }
        }
    }

    println!(
        "\n{} readings | safe {} | moderate {} | high {} | rejected {}",
        total, by_status[0], by_status[1], by_status[2], rejected
    );
    info!("Synthesis strategy: {}", synthesizer.strategy().name());

    Ok(())
}
