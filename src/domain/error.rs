//! Domain error types.

/// Top-level error type for macross.
#[derive(Debug, thiserror::Error)]
pub enum MacrossError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("invalid price data: {reason}")]
    Data { reason: String },

    #[error("no data for {code}")]
    NoData { code: String },

    #[error("insufficient data for {code}: have {bars} bars, need {minimum}")]
    InsufficientData {
        code: String,
        bars: usize,
        minimum: usize,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MacrossError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        MacrossError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&MacrossError> for std::process::ExitCode {
    fn from(err: &MacrossError) -> Self {
        let code: u8 = match err {
            MacrossError::Io(_) | MacrossError::Csv(_) => 1,
            MacrossError::ConfigParse { .. }
            | MacrossError::ConfigMissing { .. }
            | MacrossError::ConfigInvalid { .. } => 2,
            MacrossError::Data { .. }
            | MacrossError::NoData { .. }
            | MacrossError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_invalid_message() {
        let err = MacrossError::invalid("strategy", "short_period", "must be at least 1");
        assert_eq!(
            err.to_string(),
            "invalid config value [strategy] short_period: must be at least 1"
        );
    }

    #[test]
    fn insufficient_data_message() {
        let err = MacrossError::InsufficientData {
            code: "AAPL".into(),
            bars: 12,
            minimum: 31,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data for AAPL: have 12 bars, need 31"
        );
    }

    #[test]
    fn exit_codes_by_category() {
        use std::process::ExitCode;

        let io = MacrossError::Io(std::io::Error::other("boom"));
        assert_eq!(ExitCode::from(&io), ExitCode::from(1));

        let missing = MacrossError::ConfigMissing {
            section: "data".into(),
            key: "path".into(),
        };
        assert_eq!(ExitCode::from(&missing), ExitCode::from(2));

        let no_data = MacrossError::NoData { code: "AAPL".into() };
        assert_eq!(ExitCode::from(&no_data), ExitCode::from(5));
    }
}
