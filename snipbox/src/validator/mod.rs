//! Form-validation accumulator
//!
//! A `Validator` collects errors for one form submission: at most one error
//! per named field (the first failure wins, later failures on the same field
//! are dropped) plus an ordered list of whole-form errors. Checks are chained
//! through a [`FieldCursor`] bound to the last-selected field, so a handler
//! can declare every constraint for a field in a single expression and defer
//! accept/reject to a final [`Validator::is_valid`] call.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

/// E-mail shape check, compiled once.
pub static EMAIL_RX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("EMAIL_RX is a valid regex")
});

#[derive(Debug, Default)]
pub struct Validator {
    field_errors: HashMap<String, String>,
    non_field_errors: Vec<String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a field and begin a chained check sequence against its value.
    pub fn check_field<'v>(&'v mut self, name: &str, value: &str) -> FieldCursor<'v> {
        FieldCursor {
            validator: self,
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    /// Record an error for `name` unless one is already present.
    pub fn add_field_error(&mut self, name: &str, message: &str) {
        self.field_errors
            .entry(name.to_string())
            .or_insert_with(|| message.to_string());
    }

    /// Record an error attributed to the submission as a whole.
    pub fn add_non_field_error(&mut self, message: &str) {
        self.non_field_errors.push(message.to_string());
    }

    /// True iff no field errors and no non-field errors were recorded.
    pub fn is_valid(&self) -> bool {
        self.field_errors.is_empty() && self.non_field_errors.is_empty()
    }

    pub fn field_error(&self, name: &str) -> Option<&str> {
        self.field_errors.get(name).map(String::as_str)
    }

    pub fn field_errors(&self) -> &HashMap<String, String> {
        &self.field_errors
    }

    pub fn non_field_errors(&self) -> &[String] {
        &self.non_field_errors
    }
}

/// Check handle bound to the last-selected field of a [`Validator`].
pub struct FieldCursor<'v> {
    validator: &'v mut Validator,
    name: String,
    value: String,
}

impl<'v> FieldCursor<'v> {
    fn fail(&mut self, message: &str) {
        self.validator.add_field_error(&self.name, message);
    }

    /// Fails if the value is empty or whitespace-only.
    pub fn not_blank(mut self, message: &str) -> Self {
        if self.value.trim().is_empty() {
            self.fail(message);
        }
        self
    }

    /// Fails if the value is longer than `n` characters.
    pub fn max_chars(mut self, n: usize, message: &str) -> Self {
        if self.value.chars().count() > n {
            self.fail(message);
        }
        self
    }

    /// Fails if the value is shorter than `n` characters.
    pub fn min_chars(mut self, n: usize, message: &str) -> Self {
        if self.value.chars().count() < n {
            self.fail(message);
        }
        self
    }

    /// Fails unless the value is one of `permitted`.
    pub fn one_of(mut self, permitted: &[&str], message: &str) -> Self {
        if !permitted.contains(&self.value.as_str()) {
            self.fail(message);
        }
        self
    }

    /// Fails unless the value matches `rx`.
    pub fn matches(mut self, rx: &Regex, message: &str) -> Self {
        if !rx.is_match(&self.value) {
            self.fail(message);
        }
        self
    }

    pub fn is_email(self, message: &str) -> Self {
        self.matches(&EMAIL_RX, message)
    }

    /// Fails unless the value equals `other` (e.g. a password confirmation).
    pub fn equals(mut self, other: &str, message: &str) -> Self {
        if self.value != other {
            self.fail(message);
        }
        self
    }

    /// Parse the value as an integer.
    ///
    /// On failure this records a field error and returns 0; the caller must
    /// check [`Validator::is_valid`] before trusting the result. Parse
    /// failures never propagate past the validator.
    pub fn to_int(mut self, message: &str) -> i64 {
        match self.value.parse::<i64>() {
            Ok(n) => n,
            Err(_) => {
                self.fail(message);
                0
            }
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}
