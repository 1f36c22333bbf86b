//! CSV export of logged messages.

use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::recorder::LogRecord;

/// Default export file name, stamped with the local time.
pub fn default_export_path() -> PathBuf {
    PathBuf::from(format!(
        "export_{}.csv",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    ))
}

/// Write `records` as CSV to `path` (or [`default_export_path`]).
///
/// The columns are `timestamp`, `topic`, then the keys of the first
/// record's data object in order, or a single `value` column when that
/// data is not an object. Keys missing from later records are left empty;
/// keys the first record lacks are not exported.
#[tracing::instrument(skip(records), fields(records = records.len()), err)]
pub fn export_to_csv(records: &[LogRecord], path: Option<&Path>) -> Result<PathBuf, Error> {
    let Some(first) = records.first() else {
        tracing::warn!("no records to export");
        return Err(Error::NoRecords);
    };

    let path = path.map_or_else(default_export_path, Path::to_path_buf);

    let data_columns: Vec<String> = match &first.data {
        Value::Object(map) => map.keys().cloned().collect(),
        _ => vec!["value".to_string()],
    };

    let mut out = csv::Writer::from_path(&path)?;

    let header = ["timestamp", "topic"]
        .into_iter()
        .chain(data_columns.iter().map(String::as_str));
    out.write_record(header)?;

    for record in records {
        let mut row = vec![record.timestamp.clone(), record.topic.clone()];
        match &record.data {
            Value::Object(map) => {
                row.extend(data_columns.iter().map(|key| map.get(key).map(cell).unwrap_or_default()));
            }
            other => {
                // a scalar record only has somewhere to go under `value`
                row.extend(data_columns.iter().map(|key| {
                    if key == "value" {
                        cell(other)
                    } else {
                        String::new()
                    }
                }));
            }
        }
        out.write_record(&row)?;
    }

    out.flush()?;
    tracing::info!(path = %path.display(), "exported records");
    Ok(path)
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("no records to export")]
    NoRecords,

    #[error("write csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use serde_json::json;

    fn record(timestamp: &str, data: Value) -> LogRecord {
        LogRecord {
            timestamp: timestamp.to_string(),
            topic: "sensor/data".to_string(),
            data,
        }
    }

    #[test]
    fn columns_follow_first_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.csv");
        let records = [
            record("t1", json!({ "humidity": 50.5, "temperature": 24.0 })),
            record("t2", json!({ "temperature": 25.0, "note": "a,b" })),
        ];

        export_to_csv(&records, Some(&path)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "timestamp,topic,humidity,temperature");
        assert_eq!(lines[1], "t1,sensor/data,50.5,24.0");
        assert_eq!(lines[2], "t2,sensor/data,,25.0");
    }

    #[test]
    fn columns_keep_payload_key_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.csv");
        let message = Message::from_payload(
            "sensor/esp32/data",
            br#"{"temperature": 24.5, "humidity": 51.0, "pressure": 1013.2, "timestamp": 1700000000}"#,
        );
        let records = [LogRecord {
            timestamp: "t1".to_string(),
            topic: message.topic,
            data: Value::Object(message.data),
        }];

        export_to_csv(&records, Some(&path)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("timestamp,topic,temperature,humidity,pressure,timestamp")
        );
        assert_eq!(lines.next(), Some("t1,sensor/esp32/data,24.5,51.0,1013.2,1700000000"));
    }

    #[test]
    fn scalar_data_goes_to_value_column() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.csv");
        export_to_csv(&[record("t1", json!("on, really"))], Some(&path)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "timestamp,topic,value\nt1,sensor/data,\"on, really\"\n");
    }

    #[test]
    fn nothing_to_export() {
        assert!(matches!(export_to_csv(&[], None), Err(Error::NoRecords)));
    }
}
