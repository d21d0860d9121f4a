//! Configuration, retry, caching, metrics and the end-to-end pipeline
//! shared by the HTTP server and the `run_pipeline` binary.

pub mod cache;
pub mod config;
pub mod metrics;
pub mod pipeline;
pub mod retry;

pub use config::{AppConfig, OperationMode};
pub use metrics::{Metrics, MetricsSnapshot};
pub use pipeline::{Pipeline, PipelineReport, RunOptions};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. Filter from `RUST_LOG` (default `info`);
/// `ONTOGEN_LOG_FORMAT=json` switches to JSON lines.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());

    let json = std::env::var("ONTOGEN_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
