//! Logging setup for tests and host binaries.
//!
//! The library only emits `tracing` events and never installs a subscriber on
//! its own. Enable the `tracing-subscriber` feature to get a ready-made one.

/// Installs a formatting subscriber filtered by `RUST_LOG`.
///
/// Falls back to `tickloop=debug` when `RUST_LOG` is unset. Calling this more
/// than once is harmless; only the first call installs anything.
#[cfg(feature = "tracing-subscriber")]
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tickloop=debug"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_test_writer()
        .try_init();
}

#[cfg(not(feature = "tracing-subscriber"))]
pub fn init_tracing() {}
