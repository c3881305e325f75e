//! Shared error type and the context handed to command handlers.

use std::fmt::{self, Display, Formatter};

use ferry_config::FerryConfig;

use crate::cli::OutputFormat;

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

/// Loaded configuration plus the selected renderer.
pub(crate) struct CliContext {
    pub(crate) config: FerryConfig,
    pub(crate) output: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn exit_codes_separate_validation_from_failure() {
        let validation = CliError::validation("bad input");
        assert_eq!(validation.exit_code(), 2);
        assert_eq!(validation.display_message(), "bad input");

        let failure = CliError::failure(anyhow!("socket closed").context("upload failed"));
        assert_eq!(failure.exit_code(), 3);
        assert_eq!(failure.display_message(), "upload failed: socket closed");
    }
}
