//! Common error types used throughout transcodr.

/// Common error type for transcodr.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A value is not one of the supported choices for an option.
    #[error("unsupported {option} '{value}' (expected one of: {expected})")]
    InvalidOption {
        option: &'static str,
        value: String,
        expected: String,
    },
}

impl Error {
    /// Create a new InvalidOption error listing the accepted values.
    pub fn invalid_option<S, I, E>(option: &'static str, value: S, expected: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = E>,
        E: std::fmt::Display,
    {
        Self::InvalidOption {
            option,
            value: value.into(),
            expected: expected
                .into_iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_option_display() {
        let err = Error::invalid_option("frame rate", "31", ["24", "25"]);
        assert_eq!(
            err.to_string(),
            "unsupported frame rate '31' (expected one of: 24, 25)"
        );
    }
}
