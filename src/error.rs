//! Application-level error with a process exit code.
//!
//! Core fitting failures are reported through `fit::FitError`; this type is
//! for everything that should stop a command: bad arguments, unreadable files,
//! empty datasets, terminal failures.

use crate::fit::FitError;

/// Bad arguments, unreadable/unwritable files, malformed input schema.
pub const EXIT_INPUT: u8 = 2;
/// No usable data after cleaning or filtering.
pub const EXIT_NO_DATA: u8 = 3;
/// Internal or terminal failures.
pub const EXIT_INTERNAL: u8 = 4;
/// A fit failed and `--strict` was requested.
pub const EXIT_FIT_FAILED: u8 = 5;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::new(EXIT_INPUT, message)
    }

    pub fn no_data(message: impl Into<String>) -> Self {
        Self::new(EXIT_NO_DATA, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(EXIT_INTERNAL, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        let code = if err.is_contract_violation() {
            EXIT_INTERNAL
        } else {
            EXIT_FIT_FAILED
        };
        AppError::new(code, format!("Fit failed: {err}"))
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_failures_map_to_fit_exit_code() {
        let err: AppError = FitError::InsufficientData { n: 2, required: 6 }.into();
        assert_eq!(err.exit_code(), EXIT_FIT_FAILED);
        assert!(err.to_string().contains("insufficient data"));

        let err: AppError = FitError::EmptyInput.into();
        assert_eq!(err.exit_code(), EXIT_INTERNAL);
    }
}
