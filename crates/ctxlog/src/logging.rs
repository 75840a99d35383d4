use tracing_subscriber::EnvFilter;

/// Routes the library's own tracing events (unserializable records, failed
/// sink writes) to stderr, keeping stdout for emitted records.
pub fn init(log_level: &str) {
    // --log-level sets the default; RUST_LOG wins when present.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ctxlog={log_level}")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
