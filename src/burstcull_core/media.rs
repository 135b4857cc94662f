use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

use crate::burstcull_core::config::MediaFilter;

/// A photo or video that takes part in a culling session.
///
/// Identity is the path: two items with the same path are the same item even if
/// their rotation differs.
#[derive(Debug, Clone)]
pub struct MediaItem {
    pub path: PathBuf,
    pub resolved_at: Option<OffsetDateTime>,
    pub timestamp_source: TimestampSource,
    /// One of 0, 90, 180, 270.
    pub rotation_degrees: u16,
    pub file_size: u64,
    pub duration_seconds: Option<f64>,
}

/// Where a resolved timestamp came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimestampSource {
    Metadata,
    Filename,
    Filesystem,
}

impl TimestampSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimestampSource::Metadata => "metadata",
            TimestampSource::Filename => "filename",
            TimestampSource::Filesystem => "filesystem",
        }
    }
}

impl std::fmt::Display for TimestampSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl MediaItem {
    pub fn new(
        path: impl Into<PathBuf>,
        resolved_at: Option<OffsetDateTime>,
        timestamp_source: TimestampSource,
    ) -> Self {
        MediaItem {
            path: path.into(),
            resolved_at,
            timestamp_source,
            rotation_degrees: 0,
            file_size: 0,
            duration_seconds: None,
        }
    }

    pub fn with_size(mut self, file_size: u64) -> Self {
        self.file_size = file_size;
        self
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string()
    }

    pub fn kind(&self) -> Option<MediaKind> {
        detect_media_kind(&self.path)
    }

    /// Rotate by a signed number of degrees, wrapping into 0..360.
    pub fn rotate(&mut self, delta: i32) {
        self.rotation_degrees = (i32::from(self.rotation_degrees) + delta).rem_euclid(360) as u16;
    }
}

impl PartialEq for MediaItem {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for MediaItem {}

impl Hash for MediaItem {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

/// The outcome of culling one batch: what stays and what goes to quarantine.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    pub kept: Vec<MediaItem>,
    pub rejected: Vec<MediaItem>,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.kept.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kept.is_empty() && self.rejected.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Image file extensions (lowercase).
const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp", "heic", "heif", "avif",
    // RAW formats
    "raw", "cr2", "cr3", "nef", "orf", "arw", "dng", "sr2", "raf", "rw2", "pef",
];

/// Video file extensions (lowercase).
const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mov", "m4v", "avi", "mkv", "webm", "mts", "m2ts", "3gp", "wmv", "flv",
];

/// Detect media kind from a file extension.
pub fn detect_media_kind(path: &Path) -> Option<MediaKind> {
    let ext = path.extension().and_then(|e| e.to_str())?.to_lowercase();

    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

/// Whether a path passes the extension allow-list for the given filter.
pub fn is_allowed(path: &Path, filter: MediaFilter) -> bool {
    match (detect_media_kind(path), filter) {
        (None, _) => false,
        (Some(_), MediaFilter::All) => true,
        (Some(MediaKind::Image), MediaFilter::Images) => true,
        (Some(MediaKind::Video), MediaFilter::Videos) => true,
        _ => false,
    }
}
