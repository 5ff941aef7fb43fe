//! Logging initialization

/// Initialize the logging system
///
/// Uses env_logger with default filter level of `info`, writing unbuffered
/// to stderr with millisecond timestamps.
/// Override with RUST_LOG environment variable.
///
/// # Example
/// ```no_run
/// vcbake::core::logging::init();
/// log::info!("Baker started");
/// ```
pub fn init() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    )
    .format_timestamp_millis()
    .init();
}
