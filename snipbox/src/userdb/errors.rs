use thiserror::Error;

#[derive(Clone, Error, Debug)]
pub enum UserError {
    #[error("User not found")]
    NotFound,

    /// Wrong e-mail/password pair or wrong current password. Surfaced to the
    /// client as a validation error, never as a server failure.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Email address is already in use")]
    DuplicateEmail,

    #[error("Storage error: {0}")]
    Storage(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            UserError::InvalidCredentials.to_string(),
            "Invalid credentials"
        );
        assert_eq!(
            UserError::DuplicateEmail.to_string(),
            "Email address is already in use"
        );
    }

    /// Errors propagate through the ? operator unchanged.
    #[test]
    fn test_error_propagation() {
        fn require_id(id: i64) -> Result<(), UserError> {
            if id <= 0 {
                return Err(UserError::NotFound);
            }
            Ok(())
        }

        fn process(id: i64) -> Result<String, UserError> {
            require_id(id)?;
            Ok(format!("user {id}"))
        }

        assert!(process(3).is_ok());
        assert!(matches!(process(0), Err(UserError::NotFound)));
    }

    #[test]
    fn test_error_is_sync_and_send() {
        fn assert_sync_send<T: Sync + Send>() {}
        assert_sync_send::<UserError>();
    }
}
