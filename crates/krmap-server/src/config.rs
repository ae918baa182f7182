//! Run configuration: the operator's free-text `key = value` edits merged
//! with the derived parameters of a run. The merged text is what gets
//! snapshotted and handed to the engine.

use std::{fs, io, path::Path, path::PathBuf};

/// Filenames inside the shared working directory.
const SNAPSHOT_FILE: &str = "config.conf";
const MAP_FILE: &str = "map.json";
const HISTS_FILE: &str = "histos.json";

/// Reference assets, fixed for every run.
const REF_HISTO_FILE: &str = "z_dst_LB_mean_ref.json";
const BOOTSTRAP_MAP_FILE: &str = "kr_emap_xy_100_100.json";

#[derive(Clone, Debug)]
pub(crate) struct WorkPaths {
    pub(crate) work_dir: PathBuf,
    pub(crate) snapshot: PathBuf,
    pub(crate) map_out: PathBuf,
    pub(crate) hists_out: PathBuf,
    pub(crate) ref_histogram: PathBuf,
    pub(crate) bootstrap_map: PathBuf,
}

impl WorkPaths {
    pub(crate) fn resolve() -> Self {
        Self::rooted(&krmap_util::work_dir(), &krmap_util::ref_root())
    }

    pub(crate) fn rooted(work_dir: &Path, ref_root: &Path) -> Self {
        Self {
            work_dir: work_dir.to_path_buf(),
            snapshot: work_dir.join(SNAPSHOT_FILE),
            map_out: work_dir.join(MAP_FILE),
            hists_out: work_dir.join(HISTS_FILE),
            ref_histogram: ref_root.join(REF_HISTO_FILE),
            bootstrap_map: ref_root.join(BOOTSTRAP_MAP_FILE),
        }
    }
}

/// Time window converted to epoch seconds, exactly as submitted. Ordering is
/// not checked anywhere; the engine sees the window as given.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TimeWindow {
    pub(crate) start: i64,
    pub(crate) end: i64,
}

/// Ordered key/value configuration. Later assignments to an existing key
/// replace its value in place, so the operator's layout survives the merge.
#[derive(Clone, Debug, Default)]
pub(crate) struct RunConfig {
    entries: Vec<(String, String)>,
}

impl RunConfig {
    /// Parses `key = value` lines; blank lines and `#` comments are dropped.
    /// Lines without `=` are ignored rather than rejected; the grammar
    /// belongs to the engine, not the console.
    pub(crate) fn parse(text: &str) -> Self {
        let mut config = RunConfig::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                if !key.is_empty() {
                    config.set(key, value.trim());
                }
            }
        }
        config
    }

    pub(crate) fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key.to_string(), value));
        }
    }

    pub(crate) fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub(crate) fn render(&self) -> String {
        let mut text = String::new();
        for (key, value) in &self.entries {
            text.push_str(key);
            text.push_str(" = ");
            text.push_str(value);
            text.push('\n');
        }
        text
    }
}

/// Merges the free text with the fixed derived parameters and the window.
/// Derived keys win over operator edits of the same key.
pub(crate) fn merge_run_config(
    user_text: &str,
    paths: &WorkPaths,
    dataset_path: &str,
    window: TimeWindow,
) -> RunConfig {
    let mut config = RunConfig::parse(user_text);
    config.set("time_start", window.start.to_string());
    config.set("time_end", window.end.to_string());
    config.set("nS1_eff_min", "0.7");
    config.set("nS2_eff_min", "0.7");
    config.set("folder", paths.work_dir.display().to_string());
    config.set("file_in", dataset_path);
    config.set("file_out_map", paths.map_out.display().to_string());
    config.set("file_out_hists", paths.hists_out.display().to_string());
    config.set("ref_histo_file", paths.ref_histogram.display().to_string());
    config.set("key_Z_histo", "histo_Z_dst");
    config.set("run_number", "1");
    config.set(
        "file_bootstrap_map",
        paths.bootstrap_map.display().to_string(),
    );
    config
}

/// Persists the effective configuration text, replacing any prior snapshot.
pub(crate) fn write_snapshot(paths: &WorkPaths, text: &str) -> io::Result<()> {
    fs::create_dir_all(&paths.work_dir)?;
    fs::write(&paths.snapshot, text)
}
