//! Append-only message logs on disk.
//!
//! Every delivered message is written as one JSON line
//! `{"timestamp", "topic", "data"}` to a file per topic per day:
//! `<dir>/<topic with '/' replaced by '_'>_<YYYYMMDD>.log`.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::Message;

/// A downstream consumer of delivered messages.
///
/// The ingestion loop hands every message to its sinks after queueing it
/// for the UI. A failing sink is logged and skipped; it never stops
/// ingestion.
pub trait MessageSink: Send {
    fn record(&mut self, message: &Message) -> Result<(), Error>;
}

/// One line of a message log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: String,
    pub topic: String,
    pub data: Value,
}

#[derive(Debug)]
pub struct MessageLogger {
    dir: PathBuf,
}

impl MessageLogger {
    /// Create the logger, making `dir` if it does not exist yet.
    pub fn new<P: Into<PathBuf>>(dir: P) -> Result<MessageLogger, Error> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        tracing::info!(dir = %dir.display(), "message logger ready");
        Ok(MessageLogger { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn log_path(&self, topic: &str, date: NaiveDate) -> PathBuf {
        let safe_topic = topic.replace('/', "_");
        self.dir
            .join(format!("{}_{}.log", safe_topic, date.format("%Y%m%d")))
    }

    /// Append one record for `topic`. `timestamp` defaults to now.
    pub fn log_message(&self, topic: &str, data: Value, timestamp: Option<String>) -> Result<(), Error> {
        let now = Local::now();
        let record = LogRecord {
            timestamp: timestamp.unwrap_or_else(|| now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()),
            topic: topic.to_string(),
            data,
        };

        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let path = self.log_path(topic, now.date_naive());
        let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Read every record logged for `topic` on `date` (today by default).
    ///
    /// A missing file yields no records.
    pub fn read_logs(&self, topic: &str, date: Option<NaiveDate>) -> Result<Vec<LogRecord>, Error> {
        let date = date.unwrap_or_else(|| Local::now().date_naive());
        let path = self.log_path(topic, date);

        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "log file not found");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }
}

impl MessageSink for MessageLogger {
    fn record(&mut self, message: &Message) -> Result<(), Error> {
        self.log_message(&message.topic, Value::Object(message.data.clone()), None)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encode or decode log record: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn file_name_per_topic_per_day() {
        let dir = tempfile::tempdir().expect("tempdir");
        let logger = MessageLogger::new(dir.path().join("logs")).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();

        assert_eq!(
            logger.log_path("sensor/esp32/data", date),
            dir.path().join("logs").join("sensor_esp32_data_20240309.log")
        );
    }

    #[test]
    fn appends_and_reads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let logger = MessageLogger::new(dir.path()).unwrap();

        logger
            .log_message("sensor/data", json!({ "temperature": 24.1 }), Some("t1".to_string()))
            .unwrap();
        logger
            .log_message("sensor/data", json!({ "humidity": 51 }), Some("t2".to_string()))
            .unwrap();

        let records = logger.read_logs("sensor/data", None).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].timestamp, "t1");
        assert_eq!(records[1].data, json!({ "humidity": 51 }));
    }

    #[test]
    fn missing_log_reads_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let logger = MessageLogger::new(dir.path()).unwrap();
        assert!(logger.read_logs("nothing", None).unwrap().is_empty());
    }
}
