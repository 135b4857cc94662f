use crate::burstcull_core::error::{CullError, Result};
use crate::burstcull_core::exif::{EmbeddedMetadata, MetadataReader};
use crate::burstcull_core::media::TimestampSource;
use std::path::Path;
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

/// Date format used in EXIF data.
const EXIF_DATE_FORMAT: &[time::format_description::FormatItem] =
    time::macros::format_description!("[year]:[month]:[day] [hour]:[minute]:[second]");

const EXIF_OFFSET_FORMAT: &[time::format_description::FormatItem] =
    time::macros::format_description!("[offset_hour]:[offset_minute]");

/// Best-known capture time for one file.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTimestamp {
    pub at: Option<OffsetDateTime>,
    pub source: TimestampSource,
    pub duration_seconds: Option<f64>,
}

/// Derives capture times by falling through metadata, filename and filesystem.
pub struct TimestampResolver<R: MetadataReader> {
    reader: R,
    offset: UtcOffset,
}

impl<R: MetadataReader> TimestampResolver<R> {
    pub fn new(reader: R) -> Self {
        Self::with_offset(reader, get_local_offset())
    }

    /// Use a fixed offset for times that carry none.
    pub fn with_offset(reader: R, offset: UtcOffset) -> Self {
        TimestampResolver { reader, offset }
    }

    /// Resolve the capture time of `path`. Never fails; the filesystem time is
    /// the last resort and may itself be absent.
    pub fn resolve(&mut self, path: &Path, fs_created: Option<OffsetDateTime>) -> ResolvedTimestamp {
        let metadata = self.reader.read(path).unwrap_or_else(|e| {
            log::debug!("No metadata for {}: {}", path.display(), e);
            EmbeddedMetadata::default()
        });

        for candidate in &metadata.capture_times {
            match parse_exif_date(&candidate.raw, candidate.offset.as_deref(), self.offset) {
                Ok(at) => {
                    return ResolvedTimestamp {
                        at: Some(at),
                        source: TimestampSource::Metadata,
                        duration_seconds: metadata.duration_seconds,
                    };
                }
                Err(e) => log::debug!(
                    "Ignoring capture time '{}' of {}: {}",
                    candidate.raw,
                    path.display(),
                    e
                ),
            }
        }

        let from_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| parse_filename_timestamp(n, self.offset));

        if let Some(at) = from_name {
            return ResolvedTimestamp {
                at: Some(at),
                source: TimestampSource::Filename,
                duration_seconds: metadata.duration_seconds,
            };
        }

        ResolvedTimestamp {
            at: fs_created,
            source: TimestampSource::Filesystem,
            duration_seconds: metadata.duration_seconds,
        }
    }
}

/// Parse an EXIF date string with optional timezone offset.
fn parse_exif_date(
    date_str: &str,
    offset_str: Option<&str>,
    fallback: UtcOffset,
) -> Result<OffsetDateTime> {
    if date_str.is_empty() {
        return Err(CullError::InvalidDateFormat("empty date".to_string()));
    }

    let date_time = PrimitiveDateTime::parse(date_str.trim(), EXIF_DATE_FORMAT)
        .map_err(|e| CullError::InvalidDateFormat(e.to_string()))?;

    let offset = match offset_str {
        Some(o) if !o.is_empty() => UtcOffset::parse(o.trim(), EXIF_OFFSET_FORMAT).unwrap_or(fallback),
        _ => fallback,
    };

    Ok(date_time.assume_offset(offset))
}

/// Parse a leading `YYYYMMDD_HHMMSS` from a file name.
pub fn parse_filename_timestamp(name: &str, offset: UtcOffset) -> Option<OffsetDateTime> {
    let bytes = name.as_bytes();
    if bytes.len() < 15 || bytes[8] != b'_' {
        return None;
    }
    if !bytes[..8].iter().chain(&bytes[9..15]).all(u8::is_ascii_digit) {
        return None;
    }

    let field = |range: std::ops::Range<usize>| name[range].parse::<u32>().ok();
    let year = field(0..4)? as i32;
    let month = Month::try_from(field(4..6)? as u8).ok()?;
    let day = field(6..8)? as u8;
    let hour = field(9..11)? as u8;
    let minute = field(11..13)? as u8;
    let second = field(13..15)? as u8;

    let date = Date::from_calendar_date(year, month, day).ok()?;
    let time = Time::from_hms(hour, minute, second).ok()?;
    Some(PrimitiveDateTime::new(date, time).assume_offset(offset))
}

/// Get the local timezone offset, falling back to UTC if unavailable.
pub fn get_local_offset() -> UtcOffset {
    OffsetDateTime::now_local()
        .map(|dt| dt.offset())
        .unwrap_or(UtcOffset::UTC)
}
