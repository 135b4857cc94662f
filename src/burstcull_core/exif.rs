use crate::burstcull_core::error::{CullError, Result};
use exiftool::ExifTool;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

/// One unparsed capture-time field and the offset that goes with it.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureTime {
    /// Raw capture time, `YYYY:MM:DD HH:MM:SS`.
    pub raw: String,
    /// Raw offset such as `+09:00`.
    pub offset: Option<String>,
}

impl CaptureTime {
    pub fn new(raw: &str, offset: Option<&str>) -> Self {
        CaptureTime {
            raw: raw.to_string(),
            offset: offset.map(str::to_string),
        }
    }
}

/// Embedded metadata fields the resolver cares about, still unparsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddedMetadata {
    /// Capture-time candidates, best first.
    pub capture_times: Vec<CaptureTime>,
    pub duration_seconds: Option<f64>,
}

/// Source of embedded capture-time metadata.
pub trait MetadataReader {
    fn read(&mut self, path: &Path) -> Result<EmbeddedMetadata>;
}

impl MetadataReader for Box<dyn MetadataReader> {
    fn read(&mut self, path: &Path) -> Result<EmbeddedMetadata> {
        (**self).read(path)
    }
}

/// Reader used when metadata extraction is disabled or exiftool is missing.
#[derive(Debug, Default)]
pub struct NoMetadata;

impl MetadataReader for NoMetadata {
    fn read(&mut self, _path: &Path) -> Result<EmbeddedMetadata> {
        Ok(EmbeddedMetadata::default())
    }
}

/// Raw exiftool output, numeric mode (`-n`).
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "PascalCase")]
struct RawExifInfo {
    #[serde(default)]
    date_time_original: Option<Value>,
    #[serde(default)]
    create_date: Option<Value>,
    #[serde(default)]
    offset_time_original: Option<String>,
    #[serde(default)]
    offset_time: Option<String>,
    #[serde(default)]
    duration: Option<Value>, // Number in -n mode, but some containers report strings
}

/// Metadata reader backed by a long-running exiftool process.
pub struct ExifToolReader {
    exiftool: ExifTool,
}

impl ExifToolReader {
    pub fn new() -> Result<Self> {
        let exiftool = ExifTool::new().map_err(|e| CullError::MetadataExtraction {
            path: "exiftool".into(),
            reason: e.to_string(),
        })?;
        Ok(ExifToolReader { exiftool })
    }
}

impl MetadataReader for ExifToolReader {
    fn read(&mut self, path: &Path) -> Result<EmbeddedMetadata> {
        let raw: RawExifInfo = self
            .exiftool
            .read_metadata(path, &["-n"])
            .map_err(|e| CullError::MetadataExtraction {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        Ok(embedded_from_raw(raw))
    }
}

fn embedded_from_raw(raw: RawExifInfo) -> EmbeddedMetadata {
    let offset_time = raw.offset_time.filter(|o| !o.trim().is_empty());
    let offset_original = raw
        .offset_time_original
        .filter(|o| !o.trim().is_empty())
        .or_else(|| offset_time.clone());

    // DateTimeOriginal is the shutter time; CreateDate is the fallback
    let mut capture_times = Vec::new();
    if let Some(date) = raw.date_time_original.as_ref().and_then(value_to_date_string) {
        capture_times.push(CaptureTime {
            raw: date,
            offset: offset_original,
        });
    }
    if let Some(date) = raw.create_date.as_ref().and_then(value_to_date_string) {
        capture_times.push(CaptureTime {
            raw: date,
            offset: offset_time,
        });
    }

    EmbeddedMetadata {
        capture_times,
        duration_seconds: raw.duration.as_ref().and_then(value_to_seconds),
    }
}

/// Date fields are strings, but broken files sometimes carry numbers.
fn value_to_date_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.trim().is_empty() && !s.starts_with("0000") => {
            Some(s.trim().to_string())
        }
        _ => None,
    }
}

/// Parse a duration like `12.5`, `"12.5 s"` or `"0:01:02"` to seconds.
fn value_to_seconds(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64().filter(|f| *f >= 0.0),
        Value::String(s) => {
            let s = s.trim();
            if let Some(secs) = s.strip_suffix(" s") {
                return secs.trim().parse().ok();
            }
            if s.contains(':') {
                let mut total = 0.0;
                for part in s.split(':') {
                    let value: f64 = part.trim().parse().ok()?;
                    total = total * 60.0 + value;
                }
                return Some(total);
            }
            s.parse().ok()
        }
        _ => None,
    }
}

/// Check if exiftool is available on the system.
pub fn exiftool_available() -> bool {
    std::process::Command::new("exiftool")
        .arg("-ver")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawExifInfo {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_prefers_date_time_original() {
        let meta = embedded_from_raw(raw(json!({
            "DateTimeOriginal": "2024:05:21 12:30:00",
            "CreateDate": "2024:05:21 12:31:00",
            "OffsetTimeOriginal": "+09:00",
            "OffsetTime": "+01:00"
        })));
        assert_eq!(
            meta.capture_times,
            vec![
                CaptureTime::new("2024:05:21 12:30:00", Some("+09:00")),
                CaptureTime::new("2024:05:21 12:31:00", Some("+01:00")),
            ]
        );
    }

    #[test]
    fn test_zero_date_leaves_create_date() {
        let meta = embedded_from_raw(raw(json!({
            "DateTimeOriginal": "0000:00:00 00:00:00",
            "CreateDate": "2023:01:02 03:04:05",
            "OffsetTime": "-05:00"
        })));
        assert_eq!(
            meta.capture_times,
            vec![CaptureTime::new("2023:01:02 03:04:05", Some("-05:00"))]
        );
    }

    #[test]
    fn test_truncated_original_keeps_create_date_candidate() {
        let meta = embedded_from_raw(raw(json!({
            "DateTimeOriginal": "2024:05:21",
            "CreateDate": "2023:01:02 03:04:05"
        })));
        assert_eq!(meta.capture_times.len(), 2);
        assert_eq!(meta.capture_times[1].raw, "2023:01:02 03:04:05");
    }

    #[test]
    fn test_missing_dates() {
        let meta = embedded_from_raw(raw(json!({ "OffsetTime": "" })));
        assert_eq!(meta, EmbeddedMetadata::default());
    }

    #[test]
    fn test_duration_formats() {
        assert_eq!(value_to_seconds(&json!(12.5)), Some(12.5));
        assert_eq!(value_to_seconds(&json!("12.5 s")), Some(12.5));
        assert_eq!(value_to_seconds(&json!("0:01:02")), Some(62.0));
        assert_eq!(value_to_seconds(&json!("n/a")), None);
    }
}
