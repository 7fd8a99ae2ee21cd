//! Shared test initialization
//!
//! Tests touching the global stores call [`init_test_environment`] first and
//! run under `#[serial]`, since the cache and data stores are process-wide.

use std::sync::Once;

use tokio::sync::OnceCell;

/// Point the global stores at test-local backends and create the tables once
/// per test process.
pub(crate) async fn init_test_environment() {
    static ENV_INIT: Once = Once::new();
    ENV_INIT.call_once(|| {
        // Only fill in what the surrounding environment did not set
        if std::env::var("CACHE_STORE_TYPE").is_err() {
            unsafe { std::env::set_var("CACHE_STORE_TYPE", "memory") };
        }
        if std::env::var("DATA_STORE_URL").is_err() {
            // Each #[tokio::test] spins up its own runtime, and an in-memory
            // SQLite database dies with the connection that created it. A
            // per-process file survives across runtimes.
            let path =
                std::env::temp_dir().join(format!("snipbox-test-{}.db", std::process::id()));
            let _ = std::fs::remove_file(&path);
            unsafe { std::env::set_var("DATA_STORE_URL", format!("sqlite:{}", path.display())) };
        }
    });

    static STORE_INIT: OnceCell<()> = OnceCell::const_new();
    STORE_INIT
        .get_or_init(|| async {
            crate::userdb::init().await.expect("user store init");
            crate::snippets::init().await.expect("snippet store init");
        })
        .await;
}
