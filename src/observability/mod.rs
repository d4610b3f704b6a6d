//! 可观测性：tracing 日志
//!
//! 默认 info，可通过 RUST_LOG 覆盖（如 `RUST_LOG=cfbot=debug`）。

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}
