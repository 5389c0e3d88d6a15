/// Shared setup for the integration tests: route engine logs through
/// env_logger so failures print the operation trace.
pub fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}
