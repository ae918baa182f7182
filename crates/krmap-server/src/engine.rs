//! Boundary to the external calibration engine.
//!
//! The engine is an opaque command consuming the merged configuration
//! snapshot and writing the map and histogram artifacts itself. Its
//! stdout/stderr are the run diagnostics and stream into the session's
//! LogSink while the child runs, so log polls observe output live.

use std::{path::PathBuf, process::Stdio, sync::Arc};

use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::Command,
};

use crate::logsink::LogSink;

/// Exit code the engine uses for malformed or unreadable input data. Any
/// other non-zero exit is a generic failure.
const INPUT_DATA_EXIT_CODE: i32 = 2;

#[derive(Debug)]
pub(crate) enum EngineFailure {
    /// The engine flagged the input dataset itself as unusable.
    InputData,
    Other { message: String },
}

pub(crate) struct EngineRun {
    pub(crate) snapshot: PathBuf,
    pub(crate) work_dir: PathBuf,
}

pub(crate) trait Engine: Send + Sync + 'static {
    async fn run(&self, run: &EngineRun, log: &Arc<LogSink>) -> Result<(), EngineFailure>;
}

/// Production engine: `<program> maps <snapshot>` run in the working
/// directory.
pub(crate) struct CommandEngine {
    program: String,
}

impl CommandEngine {
    pub(crate) fn from_env() -> Self {
        Self {
            program: krmap_util::engine_program(),
        }
    }
}

impl Engine for CommandEngine {
    async fn run(&self, run: &EngineRun, log: &Arc<LogSink>) -> Result<(), EngineFailure> {
        let mut child = Command::new(&self.program)
            .arg("maps")
            .arg(&run.snapshot)
            .current_dir(&run.work_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| EngineFailure::Other {
                message: format!("failed to start {}: {err}", self.program),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| EngineFailure::Other {
            message: "stdout pipe missing".into(),
        })?;
        let stderr = child.stderr.take().ok_or_else(|| EngineFailure::Other {
            message: "stderr pipe missing".into(),
        })?;

        let out_pump = tokio::spawn(pump_lines(stdout, Arc::clone(log), false));
        let err_pump = tokio::spawn(pump_lines(stderr, Arc::clone(log), true));

        let status = child.wait().await.map_err(|err| EngineFailure::Other {
            message: format!("{} did not return a status: {err}", self.program),
        })?;

        // Drain both channels fully before interpreting the outcome.
        let _ = out_pump.await;
        let _ = err_pump.await;

        if status.success() {
            Ok(())
        } else if status.code() == Some(INPUT_DATA_EXIT_CODE) {
            Err(EngineFailure::InputData)
        } else {
            Err(EngineFailure::Other {
                message: format!("{} failed: {status}", self.program),
            })
        }
    }
}

async fn pump_lines<R: AsyncRead + Unpin>(reader: R, log: Arc<LogSink>, to_err: bool) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let text = format!("{line}\n");
        if to_err {
            log.append_err(&text);
        } else {
            log.append_out(&text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// Stand-in engine: a shell script taking the same `maps <snapshot>`
    /// arguments as the real command.
    fn fake_engine(dir: &tempfile::TempDir, body: &str) -> (CommandEngine, EngineRun) {
        let program = dir.path().join("fake-engine");
        std::fs::write(&program, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

        let snapshot = dir.path().join("config.conf");
        std::fs::write(&snapshot, "").unwrap();
        (
            CommandEngine {
                program: program.display().to_string(),
            },
            EngineRun {
                snapshot,
                work_dir: dir.path().to_path_buf(),
            },
        )
    }

    #[tokio::test]
    async fn output_channels_stream_into_the_sink() {
        let dir = tempfile::TempDir::new().unwrap();
        let (engine, run) = fake_engine(&dir, "echo fitting bins\necho low stats >&2\nexit 0");
        let log = Arc::new(LogSink::default());
        engine.run(&run, &log).await.unwrap();
        assert_eq!(log.snapshot(), "fitting bins\nlow stats\n");
    }

    #[tokio::test]
    async fn input_data_exit_code_is_tagged() {
        let dir = tempfile::TempDir::new().unwrap();
        let (engine, run) = fake_engine(&dir, "exit 2");
        let log = Arc::new(LogSink::default());
        let err = engine.run(&run, &log).await.unwrap_err();
        assert!(matches!(err, EngineFailure::InputData));
    }

    #[tokio::test]
    async fn other_exit_codes_are_generic_failures() {
        let dir = tempfile::TempDir::new().unwrap();
        let (engine, run) = fake_engine(&dir, "exit 1");
        let log = Arc::new(LogSink::default());
        let err = engine.run(&run, &log).await.unwrap_err();
        assert!(matches!(err, EngineFailure::Other { .. }));
    }

    #[tokio::test]
    async fn missing_program_is_a_generic_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        let engine = CommandEngine {
            program: "/no/such/engine".into(),
        };
        let run = EngineRun {
            snapshot: dir.path().join("config.conf"),
            work_dir: dir.path().to_path_buf(),
        };
        let log = Arc::new(LogSink::default());
        let err = engine.run(&run, &log).await.unwrap_err();
        let EngineFailure::Other { message } = err else {
            panic!("expected a generic failure");
        };
        assert!(message.contains("/no/such/engine"));
    }
}
