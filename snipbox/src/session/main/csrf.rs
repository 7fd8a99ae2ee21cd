use subtle::ConstantTimeEq;

use crate::session::errors::SessionError;
use crate::utils::gen_random_string;

/// Mint a per-session CSRF token. Minted with the session and rotated
/// whenever the session token is renewed.
pub fn new_csrf_token() -> Result<String, SessionError> {
    Ok(gen_random_string(32)?)
}

/// Compare a client-submitted token against the session's stored token in
/// constant time. Length differences return false without leaking where the
/// mismatch is.
pub fn verify_csrf_token(submitted: &str, expected: &str) -> bool {
    submitted.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_csrf_token_is_unique() {
        let a = new_csrf_token().unwrap();
        let b = new_csrf_token().unwrap();
        assert_ne!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn test_verify_matching_token() {
        let token = new_csrf_token().unwrap();
        assert!(verify_csrf_token(&token, &token));
    }

    #[test]
    fn test_verify_mismatched_token() {
        let token = new_csrf_token().unwrap();
        let other = new_csrf_token().unwrap();
        assert!(!verify_csrf_token(&token, &other));
    }

    #[test]
    fn test_verify_empty_submission() {
        let token = new_csrf_token().unwrap();
        assert!(!verify_csrf_token("", &token));
    }

    #[test]
    fn test_verify_length_mismatch() {
        let token = new_csrf_token().unwrap();
        let truncated = &token[..token.len() - 1];
        assert!(!verify_csrf_token(truncated, &token));
    }
}
