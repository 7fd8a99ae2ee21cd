use http::StatusCode;

use snipbox::{SessionError, SnippetError, UserError};

/// Helper trait for converting errors to a standard response error format
pub(crate) trait IntoResponseError<T> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)>;
}

fn server_error(context: &str, err: impl std::fmt::Display) -> (StatusCode, String) {
    // Full context to the log, generic message to the client
    tracing::error!("{context}: {err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal Server Error".to_string(),
    )
}

impl<T> IntoResponseError<T> for Result<T, SessionError> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| server_error("session error", e))
    }
}

impl<T> IntoResponseError<T> for Result<T, UserError> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| match e {
            UserError::NotFound => (StatusCode::NOT_FOUND, "Not Found".to_string()),
            // Handlers resolve these into validation errors; reaching here
            // means a handler forgot to
            UserError::InvalidCredentials | UserError::DuplicateEmail => {
                (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
            }
            _ => server_error("user store error", e),
        })
    }
}

impl<T> IntoResponseError<T> for Result<T, SnippetError> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| server_error("snippet store error", e))
    }
}

impl<T> IntoResponseError<T> for Result<T, askama::Error> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| server_error("template error", e))
    }
}
