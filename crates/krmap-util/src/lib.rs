use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::{Local, NaiveDateTime, TimeZone};
use serde::Serialize;

pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:8050";

/// Wall-clock format used for the time-window fields, whole-second precision.
pub const LOCAL_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

pub fn env_addr(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn server_addr() -> String {
    env_addr("KRMAP_ADDR", DEFAULT_SERVER_ADDR)
}

pub fn data_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".local/share/krmap")
    } else {
        PathBuf::from("/tmp/krmap")
    }
}

fn env_dir(key: &str, default: PathBuf) -> PathBuf {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => expand_user(value.trim()),
        _ => default,
    }
}

/// Working directory shared with the engine: config snapshot plus map and
/// histogram artifacts.
pub fn work_dir() -> PathBuf {
    env_dir("KRMAP_WORK_DIR", data_dir().join("work"))
}

/// Base path for the fixed reference assets every run points at.
pub fn ref_root() -> PathBuf {
    env_dir("KRMAP_REF_ROOT", data_dir().join("reference"))
}

pub fn engine_program() -> String {
    env_addr("KRMAP_ENGINE", "krcal-maps")
}

pub fn expand_user(path: &str) -> PathBuf {
    if path == "~" || path.starts_with("~/") {
        if let Ok(home) = std::env::var("HOME") {
            let rest = path.strip_prefix("~/").unwrap_or("");
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    let data = serde_json::to_vec_pretty(value).map_err(io::Error::other)?;
    fs::write(&tmp, data)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Formats an epoch-second instant as a local datetime string, dropping any
/// sub-second part. None only for instants outside the calendar range.
pub fn format_local_datetime(epoch_secs: f64) -> Option<String> {
    let dt = Local.timestamp_opt(epoch_secs as i64, 0).single()?;
    Some(dt.format(LOCAL_DATETIME_FORMAT).to_string())
}

/// Parses a local datetime string back to epoch seconds. Seconds may be
/// omitted (datetime-local inputs drop a zero seconds part). None when the
/// text matches neither form or names a nonexistent local instant.
pub fn parse_local_datetime(text: &str) -> Option<i64> {
    let text = text.trim();
    let naive = NaiveDateTime::parse_from_str(text, LOCAL_DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M"))
        .ok()?;
    naive
        .and_local_timezone(Local)
        .earliest()
        .map(|dt| dt.timestamp())
}

pub fn init_tracing() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?),
        )
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datetime_round_trip_at_second_precision() {
        let text = "2024-03-05T12:34:56";
        let secs = parse_local_datetime(text).unwrap();
        assert_eq!(format_local_datetime(secs as f64).unwrap(), text);
    }

    #[test]
    fn format_truncates_subsecond_part() {
        let secs = parse_local_datetime("2024-03-05T12:34:56").unwrap() as f64;
        assert_eq!(
            format_local_datetime(secs + 0.73),
            format_local_datetime(secs)
        );
    }

    #[test]
    fn parse_accepts_minute_precision() {
        assert_eq!(
            parse_local_datetime("2024-03-05T12:34"),
            parse_local_datetime("2024-03-05T12:34:00")
        );
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(parse_local_datetime("not a datetime"), None);
        assert_eq!(parse_local_datetime(""), None);
    }

    #[test]
    fn write_json_atomic_creates_parents_and_replaces() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested/state.json");
        write_json_atomic(&path, &vec![1, 2, 3]).unwrap();
        write_json_atomic(&path, &vec![4, 5]).unwrap();
        let data = fs::read_to_string(&path).unwrap();
        let parsed: Vec<i32> = serde_json::from_str(&data).unwrap();
        assert_eq!(parsed, vec![4, 5]);
    }

    #[test]
    fn expand_user_leaves_absolute_paths_alone() {
        assert_eq!(expand_user("/tmp/x"), PathBuf::from("/tmp/x"));
    }
}
