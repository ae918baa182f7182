use thiserror::Error;

/// Every failure an operator can see, one kind per notification message.
/// Engine failures are converted to exactly one of the two engine kinds at
/// the orchestrator boundary; nothing escapes as a raw panic or I/O error.
#[derive(Clone, Debug, Error, PartialEq)]
pub(crate) enum ConsoleError {
    #[error("You need to specify an input file")]
    InputMissing,
    #[error("Cannot parse time {value:?}")]
    TimeInvalid { value: String },
    #[error("A calibration is already running")]
    JobAlreadyRunning,
    #[error("File {path} not found")]
    FileNotFound { path: String },
    #[error("{path} is a directory")]
    FileIsDirectory { path: String },
    #[error("File {path} is not a valid file")]
    FileInvalid { path: String },
    #[error("Impossible to open {path}")]
    EngineInputError { path: String },
    #[error("{message}")]
    EngineGenericError { message: String },
}

impl ConsoleError {
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            ConsoleError::InputMissing => "input_missing",
            ConsoleError::TimeInvalid { .. } => "time_invalid",
            ConsoleError::JobAlreadyRunning => "job_already_running",
            ConsoleError::FileNotFound { .. } => "file_not_found",
            ConsoleError::FileIsDirectory { .. } => "file_is_directory",
            ConsoleError::FileInvalid { .. } => "file_invalid",
            ConsoleError::EngineInputError { .. } => "engine_input_error",
            ConsoleError::EngineGenericError { .. } => "engine_generic_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_input_error_names_the_dataset() {
        let err = ConsoleError::EngineInputError {
            path: "/data/run_8090.json".into(),
        };
        assert!(err.to_string().contains("/data/run_8090.json"));
        assert_eq!(err.kind(), "engine_input_error");
    }
}
