use crate::burstcull_core::config::{CullConfig, QUARANTINE_DIR_NAME};
use crate::burstcull_core::error::{CullError, Result};
use crate::burstcull_core::exif::{ExifToolReader, MetadataReader, NoMetadata, exiftool_available};
use crate::burstcull_core::media::{MediaItem, is_allowed};
use crate::burstcull_core::timestamp::{TimestampResolver, get_local_offset};
use crossbeam_channel::unbounded;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use walkdir::WalkDir;

/// One entry of a directory listing.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub path: PathBuf,
    pub is_dir: bool,
    pub size: u64,
    pub created_at: Option<OffsetDateTime>,
}

/// List `root`, skipping the quarantine folder. Unreadable entries are logged
/// and skipped.
pub fn list_directory(root: &Path, recursive: bool) -> Result<Vec<FileEntry>> {
    if !root.exists() {
        return Err(CullError::PathNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(CullError::NotADirectory(root.to_path_buf()));
    }

    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .sort_by_file_name();

    let mut entries = Vec::new();
    let iter = walker
        .into_iter()
        .filter_entry(|e| !(e.depth() == 1 && e.file_name() == QUARANTINE_DIR_NAME));

    for entry in iter {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                log::warn!("Skipping {}: {}", entry.path().display(), e);
                continue;
            }
        };

        let created_at = metadata
            .created()
            .or_else(|_| metadata.modified())
            .ok()
            .map(OffsetDateTime::from);

        entries.push(FileEntry {
            path: entry.into_path(),
            is_dir: metadata.is_dir(),
            size: metadata.len(),
            created_at,
        });
    }

    Ok(entries)
}

/// Scan a folder and resolve a timestamp for every allowed media file.
///
/// Metadata extraction runs on a pool of workers, each with its own exiftool
/// process. The returned items are in listing order.
pub fn scan_media(root: &Path, config: &CullConfig) -> Result<Vec<MediaItem>> {
    log::info!("Scanning {}", root.display());

    let files: Vec<FileEntry> = list_directory(root, config.recursive)?
        .into_iter()
        .filter(|e| !e.is_dir && is_allowed(&e.path, config.media))
        .collect();

    log::info!("Found {} media files", files.len());
    if files.is_empty() {
        return Ok(Vec::new());
    }

    let use_metadata = config.use_metadata && exiftool_available();
    if config.use_metadata && !use_metadata {
        log::warn!("exiftool not found; using filenames and file times");
    }
    // Resolve once so every worker applies the same offset
    let offset = get_local_offset();
    let total = files.len();

    let bar_style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
        .map_err(|e| CullError::Argument(e.to_string()))?;
    let bar = ProgressBar::new(total as u64).with_style(bar_style);
    bar.set_message("Reading timestamps");

    let num_workers = num_cpus::get().min(total).max(1);
    let (job_tx, job_rx) = unbounded::<(usize, FileEntry)>();
    let (result_tx, result_rx) = unbounded::<(usize, MediaItem)>();

    for job in files.into_iter().enumerate() {
        if job_tx.send(job).is_err() {
            log::error!("Failed to queue scan job");
            break;
        }
    }
    drop(job_tx);

    let worker_bar = bar.clone();

    rayon::scope(move |s| {
        for _ in 0..num_workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let bar = worker_bar.clone();

            s.spawn(move |_| {
                let reader: Box<dyn MetadataReader> = if use_metadata {
                    match ExifToolReader::new() {
                        Ok(reader) => Box::new(reader),
                        Err(e) => {
                            log::warn!("{}; falling back to filenames and file times", e);
                            Box::new(NoMetadata)
                        }
                    }
                } else {
                    Box::new(NoMetadata)
                };
                let mut resolver = TimestampResolver::with_offset(reader, offset);

                for (index, entry) in job_rx {
                    let item = resolve_entry(&mut resolver, entry);
                    bar.inc(1);
                    if result_tx.send((index, item)).is_err() {
                        log::error!("Failed to send scan result to main thread");
                        break;
                    }
                }
            });
        }
    });

    let mut results: Vec<(usize, MediaItem)> = result_rx.iter().collect();
    results.sort_by_key(|(index, _)| *index);

    bar.finish_with_message("Timestamps resolved");
    Ok(results.into_iter().map(|(_, item)| item).collect())
}

/// Build a media item from a listing entry.
pub fn resolve_entry<R: MetadataReader>(resolver: &mut TimestampResolver<R>, entry: FileEntry) -> MediaItem {
    let resolved = resolver.resolve(&entry.path, entry.created_at);
    log::debug!(
        "{} resolved from {} to {:?}",
        entry.path.display(),
        resolved.source,
        resolved.at
    );

    let mut item = MediaItem::new(entry.path, resolved.at, resolved.source).with_size(entry.size);
    item.duration_seconds = resolved.duration_seconds;
    item
}
