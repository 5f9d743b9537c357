//! Records and the CSV-backed result set.
//!
//! An [`ExtractedRecord`] is whatever JSON object came back for one file,
//! plus the `filename` key. Records are not schema-checked: a well-behaved
//! reply carries the eleven fields of [`crate::prompts::RECORD_FIELDS`], an
//! error record carries `error` with `details` or `raw_content`, and a
//! chatty model may add keys of its own. The CSV header is therefore the
//! sorted union of every key seen so far in the run; it can grow from one
//! rewrite to the next but never shrinks.

use crate::error::ExtractError;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

/// Key the orchestrator adds to every record.
pub const FILENAME_KEY: &str = "filename";

/// Key present on every degraded record.
pub const ERROR_KEY: &str = "error";

/// One row of output: field name → JSON value.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRecord(Map<String, Value>);

impl ExtractedRecord {
    /// Wrap a recovered reply. Only JSON objects can carry a `filename`
    /// column; any other shape is rejected.
    pub fn from_value(value: Value) -> Result<Self, ExtractError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Array(_) => Err(ExtractError::UnexpectedReplyShape { kind: "array" }),
            Value::String(_) => Err(ExtractError::UnexpectedReplyShape { kind: "string" }),
            Value::Number(_) => Err(ExtractError::UnexpectedReplyShape { kind: "number" }),
            Value::Bool(_) => Err(ExtractError::UnexpectedReplyShape { kind: "boolean" }),
            Value::Null => Err(ExtractError::UnexpectedReplyShape { kind: "null" }),
        }
    }

    /// Set (or overwrite) the `filename` key.
    pub fn set_filename(&mut self, name: impl Into<String>) {
        self.0
            .insert(FILENAME_KEY.to_string(), Value::String(name.into()));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// True for API-failure and unparseable-reply records.
    pub fn is_error(&self) -> bool {
        self.0.contains_key(ERROR_KEY)
    }

    /// One-line reason for a degraded record: the `error` value, followed
    /// by `details` when the service reported any.
    pub fn error_summary(&self) -> Option<String> {
        let error = self.0.get(ERROR_KEY)?;
        let error = match error {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        match self.0.get("details") {
            Some(Value::String(details)) if !details.is_empty() => {
                Some(format!("{error}: {details}"))
            }
            _ => Some(error),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Render the cell for `key`: missing or null → empty, strings verbatim,
    /// anything else as compact JSON.
    pub fn cell(&self, key: &str) -> String {
        match self.0.get(key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

/// Ordered accumulation of records for one run, mirrored to a CSV file.
#[derive(Debug, Default, Clone)]
pub struct ResultSet {
    records: Vec<ExtractedRecord>,
    columns: BTreeSet<String>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record and widen the header with its keys.
    pub fn push(&mut self, record: ExtractedRecord) {
        self.columns.extend(record.keys().map(str::to_string));
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ExtractedRecord] {
        &self.records
    }

    /// Sorted union of every key seen so far.
    pub fn header(&self) -> Vec<&str> {
        self.columns.iter().map(String::as_str).collect()
    }

    /// Number of degraded (error) records.
    pub fn error_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_error()).count()
    }

    /// Truncate `path` and write the header plus every row, CRLF-terminated.
    ///
    /// An empty set leaves the file untouched.
    pub fn write_csv(&self, path: &Path) -> Result<(), ExtractError> {
        if self.records.is_empty() {
            info!("No data to save");
            return Ok(());
        }

        let csv_err = |source: csv::Error| ExtractError::CsvWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::CRLF)
            .from_path(path)
            .map_err(csv_err)?;
        let header = self.header();
        writer.write_record(&header).map_err(csv_err)?;
        for record in &self.records {
            writer
                .write_record(header.iter().map(|key| record.cell(key)))
                .map_err(csv_err)?;
        }
        writer.flush().map_err(|e| csv_err(e.into()))?;

        debug!(
            "Wrote {} rows × {} columns to {}",
            self.records.len(),
            header.len(),
            path.display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> ExtractedRecord {
        ExtractedRecord::from_value(value).unwrap()
    }

    #[test]
    fn non_objects_are_rejected() {
        for (value, kind) in [
            (json!([1, 2]), "array"),
            (json!("text"), "string"),
            (json!(3), "number"),
            (json!(true), "boolean"),
            (Value::Null, "null"),
        ] {
            match ExtractedRecord::from_value(value) {
                Err(ExtractError::UnexpectedReplyShape { kind: k }) => assert_eq!(k, kind),
                other => panic!("expected UnexpectedReplyShape, got {other:?}"),
            }
        }
    }

    #[test]
    fn filename_overwrites_model_supplied_value() {
        let mut r = record(json!({"filename": "hallucinated.png", "surname": "DOE"}));
        r.set_filename("scan_01.png");
        assert_eq!(r.get("filename"), Some(&json!("scan_01.png")));
    }

    #[test]
    fn cells_render_null_and_non_strings() {
        let r = record(json!({
            "surname": "DOE",
            "placeOfBirth": null,
            "age": 42,
            "flags": ["a"]
        }));
        assert_eq!(r.cell("surname"), "DOE");
        assert_eq!(r.cell("placeOfBirth"), "");
        assert_eq!(r.cell("missing"), "");
        assert_eq!(r.cell("age"), "42");
        assert_eq!(r.cell("flags"), r#"["a"]"#);
    }

    #[test]
    fn header_grows_and_stays_sorted() {
        let mut set = ResultSet::new();
        set.push(record(json!({"b": "1", "a": "2"})));
        assert_eq!(set.header(), vec!["a", "b"]);
        set.push(record(json!({"a": "3", "c": "4"})));
        assert_eq!(set.header(), vec!["a", "b", "c"]);
        set.push(record(json!({"a": "5"})));
        assert_eq!(set.header(), vec!["a", "b", "c"]);
    }

    #[test]
    fn write_csv_fills_missing_cells_with_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut set = ResultSet::new();
        set.push(record(json!({"a": "x1", "b": "y1"})));
        set.push(record(json!({"a": "x2", "c": "z2"})));
        set.write_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["a,b,c", "x1,y1,", "x2,,z2"]);
    }

    #[test]
    fn write_csv_rewrites_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "stale,content\n1,2\n3,4\n5,6\n").unwrap();

        let mut set = ResultSet::new();
        set.push(record(json!({"surname": "DOE"})));
        set.write_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "surname\r\nDOE\r\n");
    }

    #[test]
    fn write_csv_quotes_embedded_commas() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut set = ResultSet::new();
        set.push(record(json!({"placeOfBirth": "Paris, France"})));
        set.write_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "placeOfBirth\r\n\"Paris, France\"\r\n");
    }

    #[test]
    fn empty_set_does_not_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        ResultSet::new().write_csv(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn write_csv_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("out.csv");
        let mut set = ResultSet::new();
        set.push(record(json!({"a": "1"})));
        let err = set.write_csv(&path).unwrap_err();
        assert!(matches!(err, ExtractError::CsvWriteFailed { .. }));
    }

    #[test]
    fn rows_end_with_crlf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut set = ResultSet::new();
        let mut r = record(json!({"surname": "DOE"}));
        r.set_filename("a.png");
        set.push(r);
        set.write_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "filename,surname\r\na.png,DOE\r\n");
    }

    #[test]
    fn error_summary_includes_details() {
        let failed = record(json!({"error": "API call failed", "details": "401 invalid x-api-key"}));
        assert_eq!(
            failed.error_summary().as_deref(),
            Some("API call failed: 401 invalid x-api-key")
        );

        let unparsed = record(json!({
            "error": "Unable to parse response",
            "raw_content": "no idea, sorry"
        }));
        assert_eq!(
            unparsed.error_summary().as_deref(),
            Some("Unable to parse response")
        );

        assert_eq!(record(json!({"surname": "DOE"})).error_summary(), None);
    }

    #[test]
    fn error_records_are_counted() {
        let mut set = ResultSet::new();
        set.push(record(json!({"surname": "DOE"})));
        set.push(record(json!({"error": "API call failed", "details": "timeout"})));
        assert_eq!(set.error_count(), 1);
    }
}
