use std::sync::LazyLock;

pub static SESSION_COOKIE_NAME: LazyLock<String> = LazyLock::new(|| {
    std::env::var("SESSION_COOKIE_NAME")
        .ok()
        .unwrap_or("__Host-SnipboxId".to_string())
});

/// Absolute session lifetime in seconds. Default 12 hours.
pub static SESSION_TTL: LazyLock<u64> = LazyLock::new(|| {
    std::env::var("SESSION_TTL")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(43200)
});

/// Idle timeout in seconds; a session untouched for longer reads as gone.
/// Default 30 minutes.
pub static SESSION_IDLE_TIMEOUT: LazyLock<u64> = LazyLock::new(|| {
    std::env::var("SESSION_IDLE_TIMEOUT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(1800)
});
