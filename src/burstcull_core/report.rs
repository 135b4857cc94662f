use crate::burstcull_core::batch::{Batch, BatchSummary};
use crate::burstcull_core::cli::OutputFormat;
use crate::burstcull_core::media::MediaItem;
use time::OffsetDateTime;
use time::format_description::FormatItem;
use time::macros::format_description;

pub const DISPLAY_DATE_FORMAT: &[FormatItem] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

pub fn format_batches(batches: &[Batch], format: &OutputFormat) -> String {
    match format {
        OutputFormat::Paths => batches
            .iter()
            .flat_map(|b| b.items.iter())
            .map(|i| i.path.display().to_string())
            .collect::<Vec<_>>()
            .join("\n"),
        OutputFormat::Json => {
            let summaries: Vec<BatchSummary> = batches.iter().map(Batch::summary).collect();
            serde_json::to_string_pretty(&summaries).unwrap_or_else(|_| "[]".to_string())
        }
        OutputFormat::Table => {
            let mut output = String::new();
            output.push_str(&format!(
                "{:>6} {:>6} {:<20} {:>9} {:>10}\n",
                "Batch", "Items", "Start", "Span", "Size"
            ));
            output.push_str(&format!("{}\n", "─".repeat(55)));
            for batch in batches {
                let summary = batch.summary();
                output.push_str(&format!(
                    "{:>6} {:>6} {:<20} {:>8.1}s {:>10}\n",
                    summary.number,
                    summary.count,
                    format_time(summary.start),
                    summary.span_seconds,
                    format_size(summary.total_bytes)
                ));
            }
            let items: usize = batches.iter().map(Batch::len).sum();
            output.push_str(&format!("\nTotal: {} batches, {} files", batches.len(), items));
            output
        }
    }
}

/// One-line description of an item for the interactive prompts.
pub fn describe_item(item: &MediaItem) -> String {
    let kind = item.kind().map(|k| k.as_str()).unwrap_or("file");
    let mut line = format!(
        "{} [{}]  {} ({})  {}",
        item.file_name(),
        kind,
        format_time(item.resolved_at),
        item.timestamp_source,
        format_size(item.file_size)
    );
    if let Some(duration) = item.duration_seconds {
        line.push_str(&format!("  {:.1}s", duration));
    }
    if item.rotation_degrees != 0 {
        line.push_str(&format!("  rotated {}°", item.rotation_degrees));
    }
    line
}

pub fn format_time(at: Option<OffsetDateTime>) -> String {
    at.and_then(|t| t.format(DISPLAY_DATE_FORMAT).ok())
        .unwrap_or_else(|| "-".to_string())
}

pub fn format_size(bytes: u64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.1} GB", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.1} MB", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1_024 {
        format!("{:.1} KB", bytes as f64 / 1_024.0)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::burstcull_core::media::TimestampSource;
    use time::macros::datetime;

    fn sample() -> Vec<Batch> {
        let items = vec![
            MediaItem::new("/p/a.jpg", Some(datetime!(2024-01-01 10:00:00 UTC)), TimestampSource::Filename)
                .with_size(2048),
            MediaItem::new("/p/b.jpg", Some(datetime!(2024-01-01 10:00:01 UTC)), TimestampSource::Filename)
                .with_size(2048),
        ];
        vec![Batch::new(1, items)]
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1_048_576), "5.0 MB");
    }

    #[test]
    fn test_table_output() {
        let table = format_batches(&sample(), &OutputFormat::Table);
        assert!(table.contains("2024-01-01 10:00:00"));
        assert!(table.contains("4.0 KB"));
        assert!(table.ends_with("Total: 1 batches, 2 files"));
    }

    #[test]
    fn test_paths_and_json_output() {
        let paths = format_batches(&sample(), &OutputFormat::Paths);
        assert_eq!(paths, "/p/a.jpg\n/p/b.jpg");

        let json: serde_json::Value =
            serde_json::from_str(&format_batches(&sample(), &OutputFormat::Json)).unwrap();
        assert_eq!(json[0]["count"], 2);
        assert_eq!(json[0]["spanSeconds"], 1.0);
    }

    #[test]
    fn test_describe_item() {
        let mut item = MediaItem::new("/p/clip.mp4", None, TimestampSource::Filesystem).with_size(100);
        item.duration_seconds = Some(3.25);
        item.rotate(-90);
        let line = describe_item(&item);
        assert!(line.starts_with("clip.mp4 [video]  - (filesystem)  100 B"));
        assert!(line.contains("3.2s") || line.contains("3.3s"));
        assert!(line.ends_with("rotated 270°"));
    }
}
