//! On-disk snapshot, bounded history, and camera images.
//!
//! Layout under the configured output directory:
//!
//! - `current_data.json`: the most recent record, overwritten every cycle
//! - `history.json`: JSON array of records, oldest first, capped
//! - `images/<file name>`: downloaded camera images
//!
//! Every file is written to a temporary sibling, flushed to disk, and then
//! renamed over the target, so an interrupted write leaves the previous
//! content in place.

use crate::config::Config;
use crate::logging::{self, Stage};
use crate::model::{HistoryRecord, PersistError};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub struct HistoryStore {
    current_path: PathBuf,
    history_path: PathBuf,
    images_path: PathBuf,
    cap: usize,
    history: Vec<HistoryRecord>,
}

impl HistoryStore {
    /// Creates the output and image directories if needed and loads the
    /// persisted history.
    pub fn open(config: &Config) -> Result<Self, PersistError> {
        let images_path = config.images_path();
        for dir in [&config.output_dir, &images_path] {
            if !dir.exists() {
                fs::create_dir_all(dir).map_err(|source| PersistError::Io {
                    path: dir.clone(),
                    source,
                })?;
                logging::info(Stage::Store, None, &format!("Created directory: {}", dir.display()));
            }
        }

        let history_path = config.history_path();
        let history = load(&history_path);

        Ok(HistoryStore {
            current_path: config.current_path(),
            history_path,
            images_path,
            cap: config.history_cap,
            history,
        })
    }

    /// Re-reads the history file. See [`load`].
    pub fn load(&self) -> Vec<HistoryRecord> {
        load(&self.history_path)
    }

    pub fn history(&self) -> &[HistoryRecord] {
        &self.history
    }

    /// Most recently appended record.
    pub fn current(&self) -> Option<&HistoryRecord> {
        self.history.last()
    }

    /// Reads the current-snapshot file, `None` if missing or unreadable.
    pub fn load_current_snapshot(&self) -> Option<HistoryRecord> {
        let contents = fs::read_to_string(&self.current_path).ok()?;
        serde_json::from_str(&contents).ok()
    }

    /// Appends `record` to the history, evicting the oldest entries beyond
    /// the cap, and writes it as the current snapshot.
    ///
    /// The history file is written first and the snapshot last, so the
    /// snapshot on disk is never newer than the history. In-memory state
    /// changes only once both files are written.
    pub fn append(&mut self, record: HistoryRecord) -> Result<(), PersistError> {
        let mut updated = self.history.clone();
        updated.push(record);
        if updated.len() > self.cap {
            let excess = updated.len() - self.cap;
            updated.drain(..excess);
        }

        write_json_atomic(&self.history_path, &updated)?;
        // `updated` is non-empty: it just received `record`.
        if let Some(latest) = updated.last() {
            write_json_atomic(&self.current_path, latest)?;
        }

        self.history = updated;
        Ok(())
    }

    /// Stores image bytes under the images directory, returning the path.
    pub fn save_image(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, PersistError> {
        if filename.is_empty()
            || filename == "."
            || filename == ".."
            || filename.contains(['/', '\\'])
        {
            return Err(PersistError::InvalidFilename(filename.to_string()));
        }

        let path = self.images_path.join(filename);
        write_atomic(&path, bytes)?;
        Ok(path)
    }
}

/// Reads a history file. A missing file is an empty history; an unreadable
/// or corrupt one is logged and also treated as empty.
pub fn load(path: &Path) -> Vec<HistoryRecord> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            logging::warn(
                Stage::Store,
                Some(&path.display().to_string()),
                &format!("Error reading history file, starting fresh: {}", e),
            );
            return Vec::new();
        }
    };

    match serde_json::from_str(&contents) {
        Ok(history) => history,
        Err(e) => {
            logging::warn(
                Stage::Store,
                Some(&path.display().to_string()),
                &format!("Corrupt history file, starting fresh: {}", e),
            );
            Vec::new()
        }
    }
}

fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PersistError> {
    let json = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &json)
}

/// Temp file in the target's directory, fsync, then rename over the target.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
    let io_err = |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
    tmp.write_all(bytes).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WeatherReading;
    use chrono::{Duration, NaiveDate, NaiveDateTime};
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> Config {
        Config {
            output_dir: dir.path().join("docs"),
            ..Config::default()
        }
    }

    fn base_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 2, 11)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    /// Record `n`: timestamp n minutes after midnight, image `cam_<n>.jpg`.
    fn record(n: i64) -> HistoryRecord {
        let reading = WeatherReading {
            timestamp: base_time() + Duration::minutes(n),
            wind_speed: Some(n as f64 * 0.5),
            wind_direction: Some("SV".to_string()),
            temperature: Some(-(n as f64) / 4.0),
        };
        HistoryRecord::new(reading, Some(format!("cam_{}.jpg", n)))
    }

    #[test]
    fn test_open_creates_directories_and_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let store = HistoryStore::open(&config).unwrap();

        assert!(config.output_dir.is_dir());
        assert!(config.images_path().is_dir());
        assert!(store.history().is_empty());
        assert!(store.current().is_none());
        assert!(store.load_current_snapshot().is_none());
    }

    #[test]
    fn test_append_writes_snapshot_and_history() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let mut store = HistoryStore::open(&config).unwrap();

        store.append(record(1)).unwrap();
        store.append(record(2)).unwrap();

        assert_eq!(store.current(), Some(&record(2)));
        assert_eq!(store.load_current_snapshot(), Some(record(2)));
        assert_eq!(store.load(), vec![record(1), record(2)]);
    }

    #[test]
    fn test_round_trip_reproduces_records_field_for_field() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let mut store = HistoryStore::open(&config).unwrap();

        let mut without_image = record(3);
        without_image.image_path = None;
        without_image.reading.wind_speed = None;
        without_image.reading.wind_direction = None;

        let written = vec![record(1), record(2), without_image];
        for r in &written {
            store.append(r.clone()).unwrap();
        }

        let reopened = HistoryStore::open(&config).unwrap();
        assert_eq!(reopened.history(), written.as_slice());
    }

    #[test]
    fn test_history_never_exceeds_cap_and_evicts_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let mut store = HistoryStore::open(&config).unwrap();

        for n in 0..30 {
            store.append(record(n)).unwrap();
        }
        assert_eq!(store.history().len(), 30);

        store.append(record(30)).unwrap();
        store.append(record(31)).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.len(), 30);
        assert!(!loaded.contains(&record(0)), "oldest record should be evicted");
        assert!(!loaded.contains(&record(1)), "second oldest record should be evicted");
        let expected: Vec<_> = (2..32).map(record).collect();
        assert_eq!(loaded, expected, "insertion order must be preserved");
    }

    #[test]
    fn test_custom_cap_is_honoured() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            history_cap: 3,
            ..config_in(&dir)
        };
        let mut store = HistoryStore::open(&config).unwrap();
        for n in 0..5 {
            store.append(record(n)).unwrap();
        }
        assert_eq!(store.load(), vec![record(2), record(3), record(4)]);
    }

    #[test]
    fn test_corrupt_history_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        fs::create_dir_all(&config.output_dir).unwrap();
        fs::write(config.history_path(), "[{\"timestamp\": \"2024-02-1").unwrap();

        let mut store = HistoryStore::open(&config).unwrap();
        assert!(store.history().is_empty());

        store.append(record(7)).unwrap();
        assert_eq!(store.load(), vec![record(7)]);
    }

    #[test]
    fn test_wrong_shape_history_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        fs::create_dir_all(&config.output_dir).unwrap();
        fs::write(config.history_path(), r#"{"not": "a list"}"#).unwrap();

        let store = HistoryStore::open(&config).unwrap();
        assert!(store.history().is_empty());
    }

    #[test]
    fn test_failed_snapshot_write_leaves_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let mut store = HistoryStore::open(&config).unwrap();
        store.append(record(1)).unwrap();

        // A directory where the snapshot file should be makes the rename fail.
        fs::remove_file(config.current_path()).unwrap();
        fs::create_dir(config.current_path()).unwrap();

        assert!(store.append(record(2)).is_err());
        assert_eq!(store.history(), &[record(1)]);
        assert!(store.load_current_snapshot().is_none());
    }

    #[test]
    fn test_failed_history_write_leaves_snapshot_and_memory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let mut store = HistoryStore::open(&config).unwrap();
        store.append(record(1)).unwrap();

        fs::remove_file(config.history_path()).unwrap();
        fs::create_dir(config.history_path()).unwrap();

        assert!(store.append(record(2)).is_err());
        assert_eq!(store.history(), &[record(1)]);
        assert_eq!(
            store.load_current_snapshot(),
            Some(record(1)),
            "snapshot must not run ahead of the history"
        );
    }

    #[test]
    fn test_history_file_is_pretty_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let mut store = HistoryStore::open(&config).unwrap();
        store.append(record(1)).unwrap();

        let raw = fs::read_to_string(config.history_path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["timestamp"], "2024-02-11 00:01:00");
        assert_eq!(value[0]["image_path"], "cam_1.jpg");
        assert!(raw.contains('\n'), "history should be human-readable");
    }

    #[test]
    fn test_save_image_writes_bytes_under_images_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(&dir);
        let store = HistoryStore::open(&config).unwrap();

        let path = store.save_image("cam_1.jpg", b"\xFF\xD8\xFFjpeg").unwrap();
        assert_eq!(path, config.images_path().join("cam_1.jpg"));
        assert_eq!(fs::read(&path).unwrap(), b"\xFF\xD8\xFFjpeg");
    }

    #[test]
    fn test_save_image_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::open(&config_in(&dir)).unwrap();

        for bad in ["", "..", "../history.json", "a\\b.jpg"] {
            assert!(
                matches!(store.save_image(bad, b"x"), Err(PersistError::InvalidFilename(_))),
                "'{}' should be rejected",
                bad
            );
        }
    }
}
