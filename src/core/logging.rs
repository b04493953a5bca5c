//! Logging initialization

/// Initialize the logging system
///
/// Uses env_logger with default filter level of `info`.
/// Override with RUST_LOG environment variable.
///
/// # Example
/// ```no_run
/// strata::core::logging::init();
/// log::info!("Terrain core started");
/// ```
pub fn init() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info")
    )
    .format_timestamp_millis()
    .init();
}

/// Initialize logging for tests; safe to call more than once.
pub fn init_for_tests() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("debug")
    ).is_test(true).try_init();
}
