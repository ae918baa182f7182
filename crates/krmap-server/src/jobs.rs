//! The job orchestrator: one calibration trigger end to end.
//!
//! Validation runs before the slot is claimed and the slot is claimed before
//! anything touches the working directory. Every exit path releases the slot
//! through a session transition, and no engine failure propagates past this
//! module.

use krmap_data::maps::CorrectionMaps;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{self, TimeWindow, WorkPaths};
use crate::engine::{Engine, EngineFailure, EngineRun};
use crate::error::ConsoleError;
use crate::state::SessionState;

pub(crate) struct CalibrateRequest {
    pub(crate) config_text: String,
    pub(crate) path: String,
    pub(crate) start: String,
    pub(crate) end: String,
}

pub(crate) struct JobRunner<E> {
    engine: E,
    paths: WorkPaths,
}

impl<E: Engine> JobRunner<E> {
    pub(crate) fn new(engine: E, paths: WorkPaths) -> Self {
        Self { engine, paths }
    }

    pub(crate) fn paths(&self) -> &WorkPaths {
        &self.paths
    }

    /// Runs one calibration: validate, claim the job slot, snapshot the
    /// merged configuration, run the engine, read the artifact back.
    pub(crate) async fn calibrate(
        &self,
        session: &SessionState,
        req: &CalibrateRequest,
    ) -> Result<CorrectionMaps, ConsoleError> {
        let path = req.path.trim();
        if path.is_empty() {
            return Err(ConsoleError::InputMissing);
        }
        let window = TimeWindow {
            start: parse_bound(&req.start)?,
            end: parse_bound(&req.end)?,
        };

        let run_id = Uuid::new_v4().to_string();
        let merged = config::merge_run_config(&req.config_text, &self.paths, path, window);
        let effective = merged.render();
        session.try_begin(&run_id, &effective)?;

        match self.run(session, path, &effective, &run_id).await {
            Ok(maps) => {
                info!(run_id = %run_id, "calibration finished");
                session.finish_done(maps.clone());
                Ok(maps)
            }
            Err(err) => {
                warn!(run_id = %run_id, "calibration failed: {err}");
                session.log.append_err(&format!("{err}\n"));
                session.finish_error(err.clone());
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        session: &SessionState,
        dataset_path: &str,
        effective: &str,
        run_id: &str,
    ) -> Result<CorrectionMaps, ConsoleError> {
        config::write_snapshot(&self.paths, effective).map_err(|err| {
            ConsoleError::EngineGenericError {
                message: format!("cannot write {}: {err}", self.paths.snapshot.display()),
            }
        })?;

        let log = &session.log;
        log.append_out(&format!("Run {run_id}\n"));
        log.append_out(&format!("Input dst: {dataset_path}\n"));
        log.append_out(&format!(
            "Output map file: {}\n",
            self.paths.map_out.display()
        ));
        log.append_out(&format!(
            "Output histograms file: {}\n",
            self.paths.hists_out.display()
        ));
        info!(run_id = %run_id, dataset = dataset_path, "calibration started");

        let run = EngineRun {
            snapshot: self.paths.snapshot.clone(),
            work_dir: self.paths.work_dir.clone(),
        };
        self.engine
            .run(&run, log)
            .await
            .map_err(|failure| match failure {
                EngineFailure::InputData => ConsoleError::EngineInputError {
                    path: dataset_path.to_string(),
                },
                EngineFailure::Other { message } => ConsoleError::EngineGenericError { message },
            })?;

        CorrectionMaps::read(&self.paths.map_out).map_err(|err| {
            ConsoleError::EngineGenericError {
                message: format!(
                    "cannot read map artifact {}: {err}",
                    self.paths.map_out.display()
                ),
            }
        })
    }
}

fn parse_bound(text: &str) -> Result<i64, ConsoleError> {
    krmap_util::parse_local_datetime(text).ok_or_else(|| ConsoleError::TimeInvalid {
        value: text.to_string(),
    })
}
