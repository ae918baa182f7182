//! Session state: the current job slot and the outcome of the most recent
//! run. One session per server process.

use std::sync::{Arc, Mutex};

use krmap_data::maps::CorrectionMaps;

use crate::error::ConsoleError;
use crate::logsink::LogSink;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum RunStatus {
    Idle,
    Running,
    Done,
    Error,
}

impl RunStatus {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Idle => "idle",
            RunStatus::Running => "running",
            RunStatus::Done => "done",
            RunStatus::Error => "error",
        }
    }
}

#[derive(Default)]
struct LastRun {
    run_id: Option<String>,
    config_text: Option<String>,
    maps: Option<CorrectionMaps>,
    error: Option<ConsoleError>,
}

/// What `/api/session` reports.
pub(crate) struct SessionSnapshot {
    pub(crate) status: RunStatus,
    pub(crate) run_id: Option<String>,
    pub(crate) has_result: bool,
    pub(crate) error: Option<ConsoleError>,
}

pub(crate) struct SessionState {
    pub(crate) log: Arc<LogSink>,
    status: Mutex<RunStatus>,
    last: Mutex<LastRun>,
}

impl SessionState {
    pub(crate) fn new() -> Self {
        Self {
            log: Arc::new(LogSink::default()),
            status: Mutex::new(RunStatus::Idle),
            last: Mutex::new(LastRun::default()),
        }
    }

    pub(crate) fn status(&self) -> RunStatus {
        *self.status.lock().unwrap()
    }

    /// Claims the single job slot. While a run holds it, every further
    /// trigger is rejected; the previous outcome is cleared only once the
    /// slot is claimed.
    pub(crate) fn try_begin(&self, run_id: &str, config_text: &str) -> Result<(), ConsoleError> {
        let mut status = self.status.lock().unwrap();
        if *status == RunStatus::Running {
            return Err(ConsoleError::JobAlreadyRunning);
        }
        *status = RunStatus::Running;

        let mut last = self.last.lock().unwrap();
        last.run_id = Some(run_id.to_string());
        last.config_text = Some(config_text.to_string());
        last.maps = None;
        last.error = None;
        Ok(())
    }

    /// Releases the slot with a result. A Done session holds maps and no
    /// error.
    pub(crate) fn finish_done(&self, maps: CorrectionMaps) {
        let mut last = self.last.lock().unwrap();
        last.maps = Some(maps);
        last.error = None;
        drop(last);
        *self.status.lock().unwrap() = RunStatus::Done;
    }

    /// Releases the slot with a failure. An Error session holds an error and
    /// no maps.
    pub(crate) fn finish_error(&self, error: ConsoleError) {
        let mut last = self.last.lock().unwrap();
        last.maps = None;
        last.error = Some(error);
        drop(last);
        *self.status.lock().unwrap() = RunStatus::Error;
    }

    pub(crate) fn last_config_text(&self) -> Option<String> {
        self.last.lock().unwrap().config_text.clone()
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        let status = self.status();
        let last = self.last.lock().unwrap();
        SessionSnapshot {
            status,
            run_id: last.run_id.clone(),
            has_result: last.maps.is_some(),
            error: last.error.clone(),
        }
    }
}
