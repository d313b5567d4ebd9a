use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use serde_json::{Map, Value};

use crate::error::{io_err, StoreError};

/// Append-only, date-partitioned persistence for webhook payloads.
/// One newline-delimited JSON file per calendar day; every operation
/// opens and closes the file, so the filesystem's append semantics are
/// the only serialization between concurrent writers.
#[derive(Debug, Clone)]
pub struct LogStore {
    dir: PathBuf,
}

impl LogStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Today's date in the local calendar, the default partition key.
    pub fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    fn file_path(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("webhook_logs_{}.json", date.format("%Y-%m-%d")))
    }

    /// Append one event to the partition for `date` as a single line.
    /// The line is written with one buffered call so concurrent appends
    /// interleave at line boundaries but never split a line.
    pub fn append(&self, date: NaiveDate, event: &Map<String, Value>) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let path = self.file_path(date);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| io_err(&path, e))?;
        file.write_all(&line).map_err(|e| io_err(&path, e))
    }

    /// Read every event in the partition for `date`, in arrival order.
    /// A missing partition is `NotFound`, not an empty success; an
    /// undecodable line aborts the whole read.
    pub fn read(&self, date: NaiveDate) -> Result<Vec<Map<String, Value>>, StoreError> {
        let path = self.file_path(date);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(date)
            } else {
                io_err(&path, e)
            }
        })?;

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(StoreError::Json))
            .collect()
    }

    /// Delete the partition for `date`.
    pub fn clear(&self, date: NaiveDate) -> Result<(), StoreError> {
        let path = self.file_path(date);
        std::fs::remove_file(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(date)
            } else {
                io_err(&path, e)
            }
        })
    }

    /// Warm-up scan at startup: create today's partition if absent so the
    /// first webhook of the day doesn't pay file creation inside a request,
    /// otherwise scan and discard its lines.
    pub fn ensure_today_file(&self) -> Result<(), StoreError> {
        let date = Self::today();
        let path = self.file_path(date);

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                std::fs::File::create(&path).map_err(|e| io_err(&path, e))?;
                tracing::info!(path = %path.display(), "created new log file");
                return Ok(());
            }
            Err(e) => return Err(io_err(&path, e)),
        };

        let lines = content.lines().filter(|l| !l.trim().is_empty()).count();
        tracing::info!(path = %path.display(), lines, "existing log file scanned");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store() -> (LogStore, TempDir) {
        let dir = TempDir::new().unwrap();
        (LogStore::new(dir.path().to_path_buf()), dir)
    }

    fn event(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn append_then_read_round_trips_nested_objects() {
        let (store, _dir) = store();
        let date = NaiveDate::from_ymd_opt(2026, 8, 25).unwrap();
        let payload = event(json!({
            "event": "push",
            "repository": { "name": "tap", "topics": ["dev", "hooks"] },
            "count": 3,
            "verified": null
        }));

        store.append(date, &payload).unwrap();
        let events = store.read(date).unwrap();
        assert_eq!(events, vec![payload]);
    }

    #[test]
    fn read_preserves_arrival_order() {
        let (store, _dir) = store();
        let date = NaiveDate::from_ymd_opt(2026, 8, 25).unwrap();
        for i in 0..5 {
            store.append(date, &event(json!({ "seq": i }))).unwrap();
        }

        let events = store.read(date).unwrap();
        let seqs: Vec<i64> = events.iter().map(|e| e["seq"].as_i64().unwrap()).collect();
        assert_eq!(seqs, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn read_missing_partition_is_not_found() {
        let (store, _dir) = store();
        let date = NaiveDate::from_ymd_opt(1999, 1, 2).unwrap();
        assert!(matches!(store.read(date), Err(StoreError::NotFound(d)) if d == date));
    }

    #[test]
    fn read_skips_blank_lines() {
        let (store, dir) = store();
        let date = NaiveDate::from_ymd_opt(2026, 8, 25).unwrap();
        std::fs::write(
            dir.path().join("webhook_logs_2026-08-25.json"),
            "{\"a\":1}\n\n{\"b\":2}\n",
        )
        .unwrap();

        let events = store.read(date).unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn read_aborts_on_corrupt_line() {
        let (store, dir) = store();
        let date = NaiveDate::from_ymd_opt(2026, 8, 25).unwrap();
        std::fs::write(
            dir.path().join("webhook_logs_2026-08-25.json"),
            "{\"a\":1}\nnot json\n",
        )
        .unwrap();

        assert!(matches!(store.read(date), Err(StoreError::Json(_))));
    }

    #[test]
    fn clear_removes_partition_and_second_clear_is_not_found() {
        let (store, _dir) = store();
        let date = NaiveDate::from_ymd_opt(2026, 8, 25).unwrap();
        store.append(date, &event(json!({ "x": 1 }))).unwrap();

        store.clear(date).unwrap();
        assert!(matches!(store.read(date), Err(StoreError::NotFound(_))));
        assert!(matches!(store.clear(date), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn ensure_today_file_creates_empty_partition() {
        let (store, dir) = store();
        store.ensure_today_file().unwrap();

        let name = format!("webhook_logs_{}.json", LogStore::today().format("%Y-%m-%d"));
        let metadata = std::fs::metadata(dir.path().join(name)).unwrap();
        assert_eq!(metadata.len(), 0);
    }

    #[test]
    fn ensure_today_file_leaves_existing_content_alone() {
        let (store, _dir) = store();
        let today = LogStore::today();
        store.append(today, &event(json!({ "kept": true }))).unwrap();

        store.ensure_today_file().unwrap();
        assert_eq!(store.read(today).unwrap().len(), 1);
    }
}
