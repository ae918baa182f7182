//! The correction-map artifact: four equally-shaped 2D grids written by the
//! engine and read back by the console.

use std::{fs, io, path::Path};

use serde::{Deserialize, Serialize};

pub type Grid = Vec<Vec<f64>>;

/// Energy scale, energy-scale uncertainty, electron lifetime and lifetime
/// uncertainty over the detector plane.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionMaps {
    pub e0: Grid,
    pub e0u: Grid,
    pub lt: Grid,
    pub ltu: Grid,
}

impl CorrectionMaps {
    pub fn read(path: &Path) -> io::Result<Self> {
        let data = fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(io::Error::other)
    }

    pub fn write(&self, path: &Path) -> io::Result<()> {
        krmap_util::write_json_atomic(path, self)
    }
}
