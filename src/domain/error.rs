//! Domain error types.

/// A parse error with position information for condition parsing.
#[derive(Debug, Clone, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Top-level error type for gridtrader.
#[derive(Debug, thiserror::Error)]
pub enum GridtraderError {
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

    #[error(transparent)]
    ConditionParse(#[from] ParseError),

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("invalid data for {symbol}: {reason}")]
    DataInvalid { symbol: String, reason: String },

    #[error("cannot simulate an empty bar sequence")]
    EmptyBars,

    #[error("indicator {indicator} referenced by a condition was not computed")]
    MissingIndicator { indicator: String },

    #[error("signal length {signal_len} does not match bar count {bar_count}")]
    SignalLengthMismatch { signal_len: usize, bar_count: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&GridtraderError> for std::process::ExitCode {
    fn from(err: &GridtraderError) -> Self {
        let code: u8 = match err {
            GridtraderError::Io(_) => 1,
            GridtraderError::ConfigParse { .. }
            | GridtraderError::ConfigMissing { .. }
            | GridtraderError::ConfigInvalid { .. } => 2,
            GridtraderError::ConditionParse(_) => 4,
            GridtraderError::NoData { .. }
            | GridtraderError::DataInvalid { .. }
            | GridtraderError::EmptyBars => 5,
            GridtraderError::MissingIndicator { .. }
            | GridtraderError::SignalLengthMismatch { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
