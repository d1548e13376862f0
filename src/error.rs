use std::io;
use thiserror::Error;

/// Hard-failure error type for the crate.
///
/// Soft diagnostics never appear here: per-row casting and raggedness
/// accumulate in [`crate::reader::ErrorLog`], and structural ambiguity
/// (dialect detection, header location) is surfaced as queryable state on
/// [`crate::Sniffer`] instead of raised.
#[derive(Error, Debug)]
pub enum TabbedError {
    /// IO error during stream operations.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error from the underlying line splitter.
    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    /// A construction-time invariant was violated.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TabbedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_invalid_config() {
        let err = TabbedError::InvalidConfig("start precedes autostart".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: start precedes autostart"
        );
    }
}
