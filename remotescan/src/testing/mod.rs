//! Test support: scripted transports and logging setup.

mod mocks;

pub use mocks::ScriptedTransport;

/// Initializes a tracing subscriber for tests and examples.
///
/// Honors `RUST_LOG`; safe to call multiple times.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
