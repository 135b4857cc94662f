use crate::burstcull_core::config::OrderingMode;
use crate::burstcull_core::media::MediaItem;
use serde::Serialize;
use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Unprocessed,
    Active,
    Completed,
}

/// A group of items culled as one unit.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Sequential number, starting at 1.
    pub number: usize,
    pub items: Vec<MediaItem>,
    pub status: BatchStatus,
}

/// Per-batch summary for display and JSON output.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub number: usize,
    pub count: usize,
    #[serde(with = "time::serde::rfc3339::option")]
    pub start: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end: Option<OffsetDateTime>,
    pub span_seconds: f64,
    pub total_bytes: u64,
    pub status: BatchStatus,
}

impl Batch {
    pub fn new(number: usize, items: Vec<MediaItem>) -> Self {
        Batch {
            number,
            items,
            status: BatchStatus::Unprocessed,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn summary(&self) -> BatchSummary {
        let start = self.items.iter().filter_map(|i| i.resolved_at).min();
        let end = self.items.iter().filter_map(|i| i.resolved_at).max();
        let span_seconds = match (start, end) {
            (Some(s), Some(e)) => (e - s).as_seconds_f64(),
            _ => 0.0,
        };

        BatchSummary {
            number: self.number,
            count: self.items.len(),
            start,
            end,
            span_seconds,
            total_bytes: self.items.iter().map(|i| i.file_size).sum(),
            status: self.status,
        }
    }
}

/// Slice items into batches.
///
/// Chronological mode splits on time gaps larger than `max_gap_seconds` and on
/// `max_batch_size`. Lexical mode ignores time and chunks by filename order.
/// Groups smaller than `min_batch_size` are dropped.
pub fn build_batches(
    mut items: Vec<MediaItem>,
    max_gap_seconds: f64,
    min_batch_size: usize,
    max_batch_size: usize,
    ordering: OrderingMode,
) -> Vec<Batch> {
    let max_batch_size = max_batch_size.max(1);
    let mut batches = Vec::new();

    match ordering {
        OrderingMode::Chronological => {
            items.sort_by(|a, b| {
                a.resolved_at
                    .cmp(&b.resolved_at)
                    .then_with(|| compare_names(a, b))
            });

            let mut open: Vec<MediaItem> = Vec::new();
            for item in items {
                let fits = match open.last() {
                    None => true,
                    Some(last) => open.len() < max_batch_size && within_gap(last, &item, max_gap_seconds),
                };
                if !fits {
                    close_batch(&mut batches, std::mem::take(&mut open), min_batch_size);
                }
                open.push(item);
            }
            close_batch(&mut batches, open, min_batch_size);
        }
        OrderingMode::Lexical => {
            items.sort_by(compare_names);

            let mut rest = items.into_iter().peekable();
            while rest.peek().is_some() {
                let chunk: Vec<MediaItem> = rest.by_ref().take(max_batch_size).collect();
                close_batch(&mut batches, chunk, min_batch_size);
            }
        }
    }

    log::info!("Built {} batches", batches.len());
    batches
}

fn within_gap(last: &MediaItem, next: &MediaItem, max_gap_seconds: f64) -> bool {
    match (last.resolved_at, next.resolved_at) {
        (Some(a), Some(b)) => (b - a).as_seconds_f64() <= max_gap_seconds,
        _ => false,
    }
}

fn close_batch(batches: &mut Vec<Batch>, items: Vec<MediaItem>, min_batch_size: usize) {
    if items.is_empty() {
        return;
    }
    if items.len() < min_batch_size {
        log::debug!(
            "Dropping group of {} starting at {}",
            items.len(),
            items[0].path.display()
        );
        return;
    }
    batches.push(Batch::new(batches.len() + 1, items));
}

fn compare_names(a: &MediaItem, b: &MediaItem) -> Ordering {
    natural_cmp(&a.file_name(), &b.file_name()).then_with(|| a.path.cmp(&b.path))
}

/// Compare strings the way people sort filenames: digit runs by value, the
/// rest case-insensitively. `IMG_2` sorts before `IMG_10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let xs = take_digits(&mut left);
                let ys = take_digits(&mut right);
                let ord = compare_digit_runs(&xs, &ys);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                let ord = x.to_lowercase().cmp(y.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                left.next();
                right.next();
            }
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
        run.push(c);
    }
    run
}

fn compare_digit_runs(x: &str, y: &str) -> Ordering {
    let xt = x.trim_start_matches('0');
    let yt = y.trim_start_matches('0');
    xt.len().cmp(&yt.len()).then_with(|| xt.cmp(yt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::burstcull_core::media::TimestampSource;
    use time::macros::datetime;

    fn at(name: &str, time: OffsetDateTime) -> MediaItem {
        MediaItem::new(name, Some(time), TimestampSource::Metadata)
    }

    fn names(batch: &Batch) -> Vec<String> {
        batch.items.iter().map(|i| i.file_name()).collect()
    }

    fn burst() -> Vec<MediaItem> {
        vec![
            at("t3.jpg", datetime!(2024-01-01 10:01:30 UTC)),
            at("t0.jpg", datetime!(2024-01-01 10:00:00 UTC)),
            at("t4.jpg", datetime!(2024-01-01 10:01:45 UTC)),
            at("t1.jpg", datetime!(2024-01-01 10:00:25 UTC)),
            at("t2.jpg", datetime!(2024-01-01 10:00:50 UTC)),
        ]
    }

    #[test]
    fn test_gap_scenario() {
        let batches = build_batches(burst(), 30.0, 2, 10, OrderingMode::Chronological);
        assert_eq!(batches.len(), 2);
        assert_eq!(names(&batches[0]), vec!["t0.jpg", "t1.jpg", "t2.jpg"]);
        assert_eq!(names(&batches[1]), vec!["t3.jpg", "t4.jpg"]);
        assert_eq!(batches[0].number, 1);
        assert_eq!(batches[1].number, 2);
        assert!(batches.iter().all(|b| b.status == BatchStatus::Unprocessed));
    }

    #[test]
    fn test_gap_is_measured_from_last_item() {
        // Each step is 25s, the whole run spans 100s
        let items = (0..5)
            .map(|i| at(&format!("{i}.jpg"), datetime!(2024-01-01 10:00:00 UTC) + time::Duration::seconds(25 * i)))
            .collect();
        let batches = build_batches(items, 30.0, 2, 10, OrderingMode::Chronological);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 5);
    }

    #[test]
    fn test_max_size_splits_and_min_size_drops() {
        let items = (0..5)
            .map(|i| at(&format!("{i}.jpg"), datetime!(2024-01-01 10:00:00 UTC) + time::Duration::seconds(i)))
            .collect();
        let batches = build_batches(items, 30.0, 2, 2, OrderingMode::Chronological);
        // [0,1] [2,3] and a dropped trailing [4]
        assert_eq!(batches.len(), 2);
        assert_eq!(names(&batches[1]), vec!["2.jpg", "3.jpg"]);
    }

    #[test]
    fn test_singletons_are_dropped() {
        let items = vec![
            at("a.jpg", datetime!(2024-01-01 10:00:00 UTC)),
            at("b.jpg", datetime!(2024-01-01 11:00:00 UTC)),
            at("c.jpg", datetime!(2024-01-01 12:00:00 UTC)),
        ];
        assert!(build_batches(items, 30.0, 2, 10, OrderingMode::Chronological).is_empty());
    }

    #[test]
    fn test_missing_timestamps_sort_first_and_stand_alone() {
        let items = vec![
            at("b.jpg", datetime!(2024-01-01 10:00:00 UTC)),
            MediaItem::new("x.jpg", None, TimestampSource::Filesystem),
            MediaItem::new("y.jpg", None, TimestampSource::Filesystem),
            at("c.jpg", datetime!(2024-01-01 10:00:01 UTC)),
        ];
        let batches = build_batches(items, 30.0, 1, 10, OrderingMode::Chronological);
        assert_eq!(names(&batches[0]), vec!["x.jpg"]);
        assert_eq!(names(&batches[1]), vec!["y.jpg"]);
        assert_eq!(names(&batches[2]), vec!["b.jpg", "c.jpg"]);
    }

    #[test]
    fn test_chronological_batch_properties() {
        let base = datetime!(2024-06-01 08:00:00 UTC);
        let offsets = [0, 1, 3, 4, 20, 21, 22, 23, 24, 25, 26, 60, 61, 200, 202, 203];
        let items = offsets
            .iter()
            .enumerate()
            .map(|(i, s)| at(&format!("{i}.jpg"), base + time::Duration::seconds(*s)))
            .collect();
        let (gap, min, max) = (2.0, 2, 4);
        let batches = build_batches(items, gap, min, max, OrderingMode::Chronological);

        let mut previous_end = None;
        for batch in &batches {
            assert!(batch.len() >= min && batch.len() <= max);
            for pair in batch.items.windows(2) {
                let delta = (pair[1].resolved_at.unwrap() - pair[0].resolved_at.unwrap()).as_seconds_f64();
                assert!((0.0..=gap).contains(&delta));
            }
            let start = batch.items[0].resolved_at;
            assert!(previous_end <= start);
            previous_end = batch.items.last().unwrap().resolved_at;
        }
    }

    #[test]
    fn test_lexical_chunks() {
        let items = ["img10.jpg", "img2.jpg", "img1.jpg", "IMG3.jpg", "img11.jpg"]
            .iter()
            .map(|n| MediaItem::new(*n, None, TimestampSource::Filesystem))
            .collect();
        let batches = build_batches(items, 0.0, 2, 2, OrderingMode::Lexical);
        assert_eq!(batches.len(), 2);
        assert_eq!(names(&batches[0]), vec!["img1.jpg", "img2.jpg"]);
        assert_eq!(names(&batches[1]), vec!["IMG3.jpg", "img10.jpg"]);
    }

    #[test]
    fn test_natural_cmp() {
        assert_eq!(natural_cmp("IMG_2.jpg", "IMG_10.jpg"), Ordering::Less);
        assert_eq!(natural_cmp("a", "B"), Ordering::Less);
        assert_eq!(natural_cmp("file", "file1"), Ordering::Less);
        assert_eq!(natural_cmp("x007", "x7"), Ordering::Less);
        assert_eq!(natural_cmp("same", "same"), Ordering::Equal);
    }

    #[test]
    fn test_summary() {
        let batches = build_batches(burst(), 30.0, 2, 10, OrderingMode::Chronological);
        let summary = batches[0].summary();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.span_seconds, 50.0);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["status"], "unprocessed");
        assert_eq!(json["start"], "2024-01-01T10:00:00Z");
    }
}
