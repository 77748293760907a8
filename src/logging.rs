//! Structured logging init (C9, ambient). Mirrors the DEBUG/INFO/WARN/ERROR
//! level model of the system this core was distilled from, filtered by
//! `RUST_LOG` (defaulting to `info`).

use tracing_subscriber::EnvFilter;

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
