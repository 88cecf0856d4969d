//! Log subscriber setup for binaries and tests embedding this crate

use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber honouring `RUST_LOG`, defaulting to `info`.
pub fn init_logging() {
    if let Err(e) = try_init_logging("info") {
        log::debug!("Logging already initialized: {}", e);
    }
}

pub fn try_init_logging(
    default_directive: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).try_init()
}
