//! Time-stamped dataset files: an ordered event-time table probed for its
//! bounds. The container mirrors the acquisition layout (`events.time`,
//! epoch seconds).

use std::{fs, io, path::Path};

use serde::Deserialize;
use thiserror::Error;

#[derive(Deserialize)]
struct DatasetFile {
    events: EventTable,
}

#[derive(Deserialize)]
struct EventTable {
    time: Vec<f64>,
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("File {path} not found")]
    NotFound { path: String },
    #[error("{path} is a directory")]
    IsDirectory { path: String },
    #[error("File {path} is not a valid file")]
    Invalid { path: String },
}

impl DatasetError {
    pub fn path(&self) -> &str {
        match self {
            DatasetError::NotFound { path }
            | DatasetError::IsDirectory { path }
            | DatasetError::Invalid { path } => path,
        }
    }
}

/// Earliest and latest event time of a dataset, epoch seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeBounds {
    pub start: f64,
    pub end: f64,
}

/// Opens a dataset and extracts its time bounds. A dataset with no events is
/// not a valid dataset.
pub fn probe(path: &Path) -> Result<TimeBounds, DatasetError> {
    let shown = path.display().to_string();
    let meta = fs::metadata(path).map_err(|err| {
        if err.kind() == io::ErrorKind::NotFound {
            DatasetError::NotFound {
                path: shown.clone(),
            }
        } else {
            DatasetError::Invalid {
                path: shown.clone(),
            }
        }
    })?;
    if meta.is_dir() {
        return Err(DatasetError::IsDirectory { path: shown });
    }

    let data = fs::read_to_string(path).map_err(|_| DatasetError::Invalid {
        path: shown.clone(),
    })?;
    let parsed: DatasetFile =
        serde_json::from_str(&data).map_err(|_| DatasetError::Invalid {
            path: shown.clone(),
        })?;

    let mut times = parsed.events.time.into_iter();
    let first = times.next().ok_or(DatasetError::Invalid { path: shown })?;
    let (start, end) = times.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t)));
    Ok(TimeBounds { start, end })
}
