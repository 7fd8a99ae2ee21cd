//! SQLite-backed data store shared by the user and snippet repositories.

use std::{env, str::FromStr, sync::LazyLock};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

static DATA_STORE_URL: LazyLock<String> =
    LazyLock::new(|| env::var("DATA_STORE_URL").unwrap_or_else(|_| "sqlite:snipbox.db".to_string()));

pub(crate) static DATA_STORE: LazyLock<Pool<Sqlite>> = LazyLock::new(|| {
    let store_url = DATA_STORE_URL.as_str();

    tracing::info!("Initializing data store at: {}", store_url);

    let opts = SqliteConnectOptions::from_str(store_url)
        .expect("Failed to parse SQLite connection string")
        .create_if_missing(true);

    // An in-memory SQLite database exists per connection; pin the pool to a
    // single connection so every query sees the same database.
    if store_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect_lazy_with(opts)
    } else {
        SqlitePoolOptions::new().connect_lazy_with(opts)
    }
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_store_url_default() {
        if env::var("DATA_STORE_URL").is_err() {
            assert_eq!(DATA_STORE_URL.as_str(), "sqlite:snipbox.db");
        }
    }
}
