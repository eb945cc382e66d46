//! Logging setup shared by Chanoma binaries.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber with the specified default log level.
///
/// The default directive covers the workspace crates and the calling
/// binary; `RUST_LOG` overrides everything when set.
///
/// # Arguments
///
/// * `binary_name` - The name of the binary (e.g., "chanoma-server")
/// * `default_level` - The default log level (e.g., "debug", "info")
pub fn setup_logger(binary_name: &str, default_level: &str) {
    let default_directives = format!(
        "chanoma_server={level},chanoma_shared={level},{bin}={level}",
        level = default_level,
        bin = binary_name.replace('-', "_"),
    );

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directives.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
