use crate::burstcull_core::batch::{Batch, BatchStatus};
use crate::burstcull_core::error::{CullError, RelocationFailures, Result};
use crate::burstcull_core::media::Partition;
use crate::burstcull_core::relocate::{FileMover, FsMover, QuarantineRecord, Relocator};
use crate::burstcull_core::state::SessionDocument;
use std::collections::HashSet;

/// Totals reported when a session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionSummary {
    pub batches_completed: usize,
    pub kept_count: usize,
    pub rejected_count: usize,
    /// Everything currently in the quarantine folder, including earlier runs.
    pub bytes_reclaimed: u64,
}

/// What happened to one batch.
#[derive(Debug)]
pub struct BatchReport {
    pub number: usize,
    pub kept: usize,
    pub relocated: Vec<QuarantineRecord>,
    pub failures: RelocationFailures,
}

/// Runs batches one after another and moves each batch's rejects into
/// quarantine when it is done.
pub struct Session<M: FileMover = FsMover> {
    batches: Vec<Batch>,
    relocator: Relocator<M>,
    active: Option<usize>,
    batches_completed: usize,
    kept_count: usize,
    rejected_count: usize,
}

impl<M: FileMover> Session<M> {
    pub fn new(batches: Vec<Batch>, relocator: Relocator<M>) -> Self {
        Session {
            batches,
            relocator,
            active: None,
            batches_completed: 0,
            kept_count: 0,
            rejected_count: 0,
        }
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn relocator(&self) -> &Relocator<M> {
        &self.relocator
    }

    pub fn active_batch(&self) -> Option<&Batch> {
        self.active.map(|i| &self.batches[i])
    }

    /// Whether no batch is running and none is left to start.
    pub fn is_finished(&self) -> bool {
        self.active.is_none()
            && self
                .batches
                .iter()
                .all(|b| b.status == BatchStatus::Completed)
    }

    /// Activate the next unprocessed batch. Batches that a saved session has
    /// already fully handled are marked completed and skipped.
    pub fn start_next(&mut self, doc: Option<&SessionDocument>) -> Result<Option<&Batch>> {
        if let Some(active) = self.active {
            return Err(CullError::InvalidState(format!(
                "batch {} is still active",
                self.batches[active].number
            )));
        }

        for index in 0..self.batches.len() {
            let batch = &mut self.batches[index];
            if batch.status != BatchStatus::Unprocessed {
                continue;
            }
            if doc.is_some_and(|d| d.covers(&batch.items)) {
                log::info!("Skipping batch {}, already processed", batch.number);
                batch.status = BatchStatus::Completed;
                continue;
            }

            batch.status = BatchStatus::Active;
            self.active = Some(index);
            log::info!("Starting batch {} ({} items)", batch.number, batch.len());
            return Ok(Some(&self.batches[index]));
        }

        Ok(None)
    }

    /// Finish the active batch: relocate the rejects in order and record the
    /// outcome. A reject that cannot be moved is reported and stays kept.
    pub fn complete_batch(
        &mut self,
        partition: Partition,
        doc: Option<&mut SessionDocument>,
    ) -> Result<BatchReport> {
        let index = self.check_partition(&partition)?;

        let mut kept = partition.kept;
        let mut relocated = Vec::new();
        let mut failures = RelocationFailures::new();

        for item in partition.rejected {
            match self.relocator.relocate(&item.path) {
                Ok(record) => relocated.push(record),
                Err(e) => {
                    log::error!("Failed to quarantine {}: {}", item.path.display(), e);
                    failures.add(item.path.clone(), e);
                    kept.push(item);
                }
            }
        }

        let batch = &mut self.batches[index];
        if let Some(doc) = doc {
            doc.record_batch(&batch.items, &kept, &relocated);
        }
        batch.status = BatchStatus::Completed;
        self.active = None;
        self.batches_completed += 1;
        self.kept_count += kept.len();
        self.rejected_count += relocated.len();

        log::info!(
            "Batch {} done: {} kept, {} quarantined, {} failed",
            batch.number,
            kept.len(),
            relocated.len(),
            failures.len()
        );

        Ok(BatchReport {
            number: batch.number,
            kept: kept.len(),
            relocated,
            failures,
        })
    }

    /// Finish the active batch whose rejects were already moved, as the
    /// linear engine does.
    pub fn complete_relocated_batch(
        &mut self,
        partition: Partition,
        records: Vec<QuarantineRecord>,
        doc: Option<&mut SessionDocument>,
    ) -> Result<BatchReport> {
        let index = self.check_partition(&partition)?;

        let batch = &mut self.batches[index];
        if let Some(doc) = doc {
            doc.record_batch(&batch.items, &partition.kept, &records);
        }
        batch.status = BatchStatus::Completed;
        self.active = None;
        self.batches_completed += 1;
        self.kept_count += partition.kept.len();
        self.rejected_count += records.len();

        Ok(BatchReport {
            number: batch.number,
            kept: partition.kept.len(),
            relocated: records,
            failures: RelocationFailures::new(),
        })
    }

    pub fn summary(&self) -> Result<SessionSummary> {
        let (_, bytes_reclaimed) = self.relocator.quarantine_size()?;
        Ok(SessionSummary {
            batches_completed: self.batches_completed,
            kept_count: self.kept_count,
            rejected_count: self.rejected_count,
            bytes_reclaimed,
        })
    }

    /// The partition must cover exactly the active batch's items.
    fn check_partition(&self, partition: &Partition) -> Result<usize> {
        let index = self
            .active
            .ok_or_else(|| CullError::InvalidState("no batch is active".to_string()))?;
        let batch = &self.batches[index];

        let expected: HashSet<_> = batch.items.iter().map(|i| &i.path).collect();
        let seen: HashSet<_> = partition
            .kept
            .iter()
            .chain(&partition.rejected)
            .map(|i| &i.path)
            .collect();

        if partition.len() != batch.len() || seen != expected {
            return Err(CullError::Argument(format!(
                "result does not match the {} items of batch {}",
                batch.len(),
                batch.number
            )));
        }
        Ok(index)
    }
}

/// Outcome of moving a folder's quarantined files back.
#[derive(Debug, Default)]
pub struct RestoreReport {
    pub restored: usize,
    pub failures: RelocationFailures,
}

/// Restore every quarantined file recorded in `doc`, most recent first.
/// Restored files are forgotten by the document so the next run culls them
/// again; files that cannot go back stay recorded.
pub fn restore_all<M: FileMover>(relocator: &Relocator<M>, doc: &mut SessionDocument) -> RestoreReport {
    let mut report = RestoreReport::default();

    let records: Vec<QuarantineRecord> = doc.quarantined.iter().rev().cloned().collect();
    for record in records {
        match relocator.restore(&record) {
            Ok(()) => {
                doc.forget(&record);
                report.restored += 1;
            }
            Err(e) => {
                log::warn!("Leaving {} in quarantine: {}", record.destination_path.display(), e);
                report.failures.add(record.original_path.clone(), e);
            }
        }
    }

    report
}
