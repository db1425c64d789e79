//! Test utilities & fixtures for engine-level integration tests.

use tempfile::TempDir;

use mallpoints::config::Config;
use mallpoints::engine::GamificationEngine;

/// Build an engine over a throwaway data directory. The TempDir must stay
/// alive for the duration of the test.
pub fn test_engine() -> (TempDir, GamificationEngine) {
    let dir = TempDir::new().expect("tempdir");
    let mut config = Config::default();
    config.storage.data_dir = dir.path().to_string_lossy().to_string();
    config.security.jwt_secret = "integration-test-secret-0123456789abcdef".to_string();
    // Pin to UTC so time-of-day assertions don't depend on the host clock's
    // relation to the configured mall timezone.
    config.mall.timezone_offset_hours = 0;
    let engine = GamificationEngine::open(config).expect("engine");
    (dir, engine)
}

/// Register a member and return the username.
#[allow(dead_code)] // Not every test file uses the helper.
pub fn register_member(engine: &GamificationEngine, name: &str) -> String {
    engine
        .register(name, name, "password123")
        .expect("register");
    name.to_string()
}
