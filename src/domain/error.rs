//! Domain error types.

/// Top-level error type for zonetrader.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
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

    #[error("malformed bar at {time}: {reason}")]
    MalformedBar { time: i64, reason: String },

    #[error("out-of-order bar at {time}: last stored bar is {last}")]
    OutOfOrder { time: i64, last: i64 },

    #[error("bar at {time} is already closed")]
    BarAlreadyClosed { time: i64 },

    #[error("engine has not been bootstrapped with history")]
    NotBootstrapped,

    #[error("history error: {reason}")]
    History { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Errors raised by a single bad feed event. The engine stays usable.
    pub fn is_feed_rejection(&self) -> bool {
        matches!(
            self,
            EngineError::MalformedBar { .. }
                | EngineError::OutOfOrder { .. }
                | EngineError::BarAlreadyClosed { .. }
        )
    }
}

impl From<&EngineError> for std::process::ExitCode {
    fn from(err: &EngineError) -> Self {
        let code: u8 = match err {
            EngineError::Io(_) => 1,
            EngineError::ConfigParse { .. }
            | EngineError::ConfigMissing { .. }
            | EngineError::ConfigInvalid { .. } => 2,
            EngineError::History { .. } | EngineError::NotBootstrapped => 3,
            EngineError::MalformedBar { .. }
            | EngineError::OutOfOrder { .. }
            | EngineError::BarAlreadyClosed { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
