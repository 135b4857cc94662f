use crate::burstcull_core::error::{CullError, Result};
use crate::burstcull_core::media::{MediaItem, Partition};
use crate::burstcull_core::relocate::{FileMover, QuarantineRecord, Relocator};

/// Single-cursor culling: walk the items in order and quarantine the ones the
/// user does not want. Unlike the tournament, files move immediately.
pub struct LinearCull<'r, M: FileMover> {
    items: Vec<MediaItem>,
    cursor: usize,
    /// Index into `items` and the record of its move, oldest first.
    records: Vec<(usize, QuarantineRecord)>,
    relocator: &'r Relocator<M>,
}

impl<'r, M: FileMover> LinearCull<'r, M> {
    pub fn new(items: Vec<MediaItem>, relocator: &'r Relocator<M>) -> Self {
        LinearCull {
            items,
            cursor: 0,
            records: Vec::new(),
            relocator,
        }
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&MediaItem> {
        self.items.get(self.cursor)
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.items.len()
    }

    pub fn is_relocated(&self, index: usize) -> bool {
        self.records.iter().any(|(i, _)| *i == index)
    }

    pub fn records(&self) -> impl Iterator<Item = &QuarantineRecord> {
        self.records.iter().map(|(_, record)| record)
    }

    /// Leave the current item in place and move on.
    pub fn keep(&mut self) -> Result<()> {
        if self.is_finished() {
            return Err(CullError::InvalidState("no items left".to_string()));
        }
        self.cursor += 1;
        Ok(())
    }

    /// Quarantine the item under the cursor.
    pub fn mark_current(&mut self) -> Result<&QuarantineRecord> {
        self.mark_for_deletion(self.cursor)
    }

    /// Quarantine the item at `index` and move the cursor past it. Items
    /// skipped over count as kept; marking an item behind the cursor leaves the
    /// cursor where it is. An item that is already quarantined is left alone.
    pub fn mark_for_deletion(&mut self, index: usize) -> Result<&QuarantineRecord> {
        let item = self
            .items
            .get(index)
            .ok_or_else(|| CullError::InvalidState(format!("no item at position {}", index + 1)))?;
        if self.is_relocated(index) {
            return Err(CullError::InvalidState(format!(
                "{} is already quarantined",
                item.file_name()
            )));
        }

        let record = self.relocator.relocate(&item.path)?;
        self.records.push((index, record));
        if index >= self.cursor {
            self.cursor = index + 1;
        }

        Ok(&self.records[self.records.len() - 1].1)
    }

    /// Bring back the most recent quarantined copy of the item at `index`.
    pub fn restore(&mut self, index: usize) -> Result<()> {
        let position = self
            .records
            .iter()
            .rposition(|(i, _)| *i == index)
            .ok_or_else(|| CullError::InvalidState(format!("item {} is not quarantined", index + 1)))?;

        self.relocator.restore(&self.records[position].1)?;
        self.records.remove(position);
        Ok(())
    }

    /// Restore the most recently quarantined item and step back one place.
    pub fn undo_last(&mut self) -> Result<()> {
        let (_, record) = self
            .records
            .last()
            .ok_or_else(|| CullError::InvalidState("nothing to undo".to_string()))?;

        self.relocator.restore(record)?;
        self.records.pop();
        self.cursor = self.cursor.saturating_sub(1);
        Ok(())
    }

    /// Kept and quarantined items, plus the records of every move still in
    /// effect.
    pub fn into_parts(self) -> (Partition, Vec<QuarantineRecord>) {
        let mut partition = Partition::default();
        for (index, item) in self.items.into_iter().enumerate() {
            if self.records.iter().any(|(i, _)| *i == index) {
                partition.rejected.push(item);
            } else {
                partition.kept.push(item);
            }
        }
        let records = self.records.into_iter().map(|(_, record)| record).collect();
        (partition, records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::burstcull_core::media::TimestampSource;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;

    fn setup(names: &[&str]) -> (TempDir, Vec<MediaItem>) {
        let temp = TempDir::new().unwrap();
        let items = names
            .iter()
            .map(|n| {
                let child = temp.child(n);
                child.write_str(n).unwrap();
                MediaItem::new(child.path(), None, TimestampSource::Filesystem)
            })
            .collect();
        (temp, items)
    }

    #[test]
    fn test_mark_keep_and_finish() {
        let (temp, items) = setup(&["a.mp4", "b.mp4", "c.mp4"]);
        let relocator = Relocator::for_root(temp.path());
        let mut cull = LinearCull::new(items, &relocator);

        cull.keep().unwrap();
        let record = cull.mark_current().unwrap().clone();
        assert!(record.destination_path.exists());
        assert_eq!(cull.cursor(), 2);
        cull.keep().unwrap();
        assert!(cull.is_finished());
        assert!(cull.keep().unwrap_err().is_invalid_state());

        let (partition, records) = cull.into_parts();
        assert_eq!(partition.kept.len(), 2);
        assert_eq!(partition.rejected[0].file_name(), "b.mp4");
        assert_eq!(records, vec![record]);
    }

    #[test]
    fn test_already_relocated_is_noop() {
        let (temp, items) = setup(&["a.mp4", "b.mp4"]);
        let relocator = Relocator::for_root(temp.path());
        let mut cull = LinearCull::new(items, &relocator);

        cull.mark_for_deletion(0).unwrap();
        assert!(cull.mark_for_deletion(0).unwrap_err().is_invalid_state());
        assert_eq!(cull.cursor(), 1);
        assert_eq!(cull.records().count(), 1);
    }

    #[test]
    fn test_mark_ahead_moves_cursor_past_it() {
        let (temp, items) = setup(&["a.mp4", "b.mp4", "c.mp4", "d.mp4"]);
        let relocator = Relocator::for_root(temp.path());
        let mut cull = LinearCull::new(items, &relocator);

        cull.mark_for_deletion(2).unwrap();
        assert_eq!(cull.cursor(), 3);

        // Marking behind the cursor does not rewind it
        cull.mark_for_deletion(0).unwrap();
        assert_eq!(cull.cursor(), 3);

        cull.keep().unwrap();
        let (partition, _) = cull.into_parts();
        assert_eq!(partition.kept.len(), 2);
        assert_eq!(partition.rejected.len(), 2);
    }

    #[test]
    fn test_undo_last_is_lifo() {
        let (temp, items) = setup(&["a.mp4", "b.mp4", "c.mp4"]);
        let relocator = Relocator::for_root(temp.path());
        let mut cull = LinearCull::new(items, &relocator);

        cull.mark_current().unwrap();
        cull.mark_current().unwrap();
        assert_eq!(cull.cursor(), 2);

        cull.undo_last().unwrap();
        assert_eq!(cull.cursor(), 1);
        assert!(temp.child("b.mp4").path().exists());
        assert!(!temp.child("a.mp4").path().exists());

        cull.undo_last().unwrap();
        assert_eq!(cull.cursor(), 0);
        assert!(temp.child("a.mp4").path().exists());
        assert!(cull.undo_last().unwrap_err().is_invalid_state());
    }

    #[test]
    fn test_restore_specific_item() {
        let (temp, items) = setup(&["a.mp4", "b.mp4", "c.mp4"]);
        let relocator = Relocator::for_root(temp.path());
        let mut cull = LinearCull::new(items, &relocator);

        cull.mark_current().unwrap();
        cull.mark_current().unwrap();
        cull.restore(0).unwrap();
        assert!(temp.child("a.mp4").path().exists());
        assert!(!cull.is_relocated(0));
        assert!(cull.is_relocated(1));
        // Cursor does not move on restore
        assert_eq!(cull.cursor(), 2);
        assert!(cull.restore(2).unwrap_err().is_invalid_state());
    }

    #[test]
    fn test_restore_conflict_keeps_record() {
        let (temp, items) = setup(&["a.mp4"]);
        let relocator = Relocator::for_root(temp.path());
        let mut cull = LinearCull::new(items, &relocator);

        cull.mark_current().unwrap();
        temp.child("a.mp4").write_str("new file").unwrap();

        assert!(matches!(cull.restore(0), Err(CullError::RestoreConflict(_))));
        assert!(cull.is_relocated(0));
    }
}
