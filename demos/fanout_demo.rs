//! Fan-out Demo
//!
//! Loads a blueprint (or builds a default one), fans a handful of lines out
//! to stdout and the tracing log, then closes the dispatcher.
//!
//! Run with: cargo run -p fanout_demo -- [config.toml]

use std::collections::HashMap;
use std::path::Path;

use config_loader::ConfigLoader;
use contracts::{DestinationConfig, DestinationKind, WriteMode};
use dispatcher::{MemoryDestination, create_dispatcher};
use observability::{LogFormat, ObservabilityConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    observability::init_with_config(ObservabilityConfig {
        log_format: LogFormat::Pretty,
        default_log_level: "info".to_string(),
        ..Default::default()
    })?;

    tracing::info!("Starting Fan-out Demo");

    // ==== Stage 1: Use default config or load from file ====
    let path = std::env::args().nth(1);
    let mut blueprint = ConfigLoader::load_or_default(path.as_deref().map(Path::new))?;
    if blueprint.destinations.is_empty() {
        tracing::info!("No destinations configured, using console + trace");
        blueprint.destinations = default_destinations();
    }

    // ==== Stage 2: Build dispatcher ====
    let dispatcher = create_dispatcher(&blueprint).await?;
    let capture = MemoryDestination::new("capture");
    dispatcher.add_destination(capture.clone());
    tracing::info!(
        destinations = dispatcher.destination_count(),
        queue_capacity = dispatcher.queue_capacity(),
        "Dispatcher ready"
    );

    let mut failures = dispatcher.subscribe_failures();
    let failure_logger = tokio::spawn(async move {
        while let Ok(failure) = failures.recv().await {
            tracing::warn!(mode = %failure.mode, error = %failure.error, "Delivery failed");
        }
    });

    // ==== Stage 3: Write ====
    for i in 0..5 {
        dispatcher.write(format!("buffered line {i}\n").as_bytes()).await?;
    }
    dispatcher
        .write_tagged(WriteMode::Immediate, b"immediate line\n")
        .await?;

    // ==== Stage 4: Drain and report ====
    dispatcher.close().await?;
    drop(dispatcher);
    let _ = failure_logger.await;

    tracing::info!(payloads = capture.len(), "Demo complete");
    Ok(())
}

fn default_destinations() -> Vec<DestinationConfig> {
    vec![
        DestinationConfig {
            name: "console".to_string(),
            kind: DestinationKind::Stdout,
            params: HashMap::new(),
        },
        DestinationConfig {
            name: "trace".to_string(),
            kind: DestinationKind::Log,
            params: HashMap::new(),
        },
    ]
}
