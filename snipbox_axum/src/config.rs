use std::sync::LazyLock;

/// Where unauthenticated requests for protected pages are sent.
pub(crate) static LOGIN_URL: LazyLock<String> =
    LazyLock::new(|| std::env::var("LOGIN_URL").unwrap_or_else(|_| "/user/login".to_string()));

/// Flash message shown after a redirect to the login page.
pub(crate) const LOGIN_REQUIRED_FLASH: &str = "Please log in first";
