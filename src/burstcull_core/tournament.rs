use crate::burstcull_core::error::{CullError, Result};
use crate::burstcull_core::media::{MediaItem, Partition};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Which item of the current pair the user kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TournamentPhase {
    /// More than one item left to compare.
    Active,
    SingleSurvivor,
    Empty,
    /// The user stopped comparing; everything still in the pool is kept.
    EndedEarly,
}

impl TournamentPhase {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TournamentPhase::Active)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UndoEntry {
    /// `item` was removed from `index`; `cursor` is where the pair started.
    RejectedOne {
        item: MediaItem,
        index: usize,
        cursor: usize,
    },
    KeptBoth,
}

/// Pairwise elimination over the items of one batch.
///
/// Items are compared two at a time: `(pool[cursor], pool[cursor + 1])`. When
/// the cursor runs off the end of the pool, the pool is shuffled and the cursor
/// starts over, so every survivor keeps coming back for comparison.
#[derive(Debug)]
pub struct Tournament<R: Rng = StdRng> {
    pool: Vec<MediaItem>,
    rejected: Vec<MediaItem>,
    cursor: usize,
    history: Vec<UndoEntry>,
    ended: bool,
    rng: R,
}

impl Tournament<StdRng> {
    pub fn new(items: Vec<MediaItem>) -> Self {
        Tournament::with_rng(items, StdRng::from_entropy())
    }

    pub fn seeded(items: Vec<MediaItem>, seed: u64) -> Self {
        Tournament::with_rng(items, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Tournament<R> {
    pub fn with_rng(items: Vec<MediaItem>, rng: R) -> Self {
        let mut tournament = Tournament {
            pool: items,
            rejected: Vec::new(),
            cursor: 0,
            history: Vec::new(),
            ended: false,
            rng,
        };
        tournament.normalize();
        tournament
    }

    pub fn phase(&self) -> TournamentPhase {
        if self.ended {
            return TournamentPhase::EndedEarly;
        }
        match self.pool.len() {
            0 => TournamentPhase::Empty,
            1 => TournamentPhase::SingleSurvivor,
            _ => TournamentPhase::Active,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase().is_terminal()
    }

    pub fn pool(&self) -> &[MediaItem] {
        &self.pool
    }

    pub fn rejected(&self) -> &[MediaItem] {
        &self.rejected
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn history(&self) -> &[UndoEntry] {
        &self.history
    }

    /// The pair to show, or `None` once the tournament is over.
    pub fn current_pair(&self) -> Option<(&MediaItem, &MediaItem)> {
        if self.is_finished() {
            return None;
        }
        Some((&self.pool[self.cursor], &self.pool[self.cursor + 1]))
    }

    /// Keep one side of the current pair and reject the other.
    pub fn pick_winner(&mut self, side: Side) -> Result<()> {
        self.ensure_active("pick")?;

        let cursor = self.cursor;
        let (winner, loser) = match side {
            Side::Left => (cursor, cursor + 1),
            Side::Right => (cursor + 1, cursor),
        };

        let item = self.pool.remove(loser);
        log::debug!("Rejected {}", item.path.display());
        self.rejected.push(item.clone());
        self.history.push(UndoEntry::RejectedOne {
            item,
            index: loser,
            cursor,
        });
        self.cursor = if winner > loser { winner - 1 } else { winner };

        self.normalize();
        Ok(())
    }

    /// Keep both items of the current pair and move on to the next pair.
    pub fn keep_both(&mut self) -> Result<()> {
        self.ensure_active("keep both")?;

        self.history.push(UndoEntry::KeptBoth);
        self.cursor += 2;

        self.normalize();
        Ok(())
    }

    /// Revert the most recent pick or keep-both.
    pub fn undo(&mut self) -> Result<()> {
        self.ensure_active("undo")?;

        let entry = self
            .history
            .pop()
            .ok_or_else(|| CullError::InvalidState("nothing to undo".to_string()))?;

        match entry {
            UndoEntry::RejectedOne { item, index, cursor } => {
                // The rejected copy carries any rotation applied since the pick
                let restored = match self.rejected.iter().rposition(|r| *r == item) {
                    Some(position) => self.rejected.remove(position),
                    None => {
                        log::warn!("{} was not in the rejected list", item.path.display());
                        item
                    }
                };
                let index = index.min(self.pool.len());
                self.pool.insert(index, restored);
                self.cursor = cursor;
            }
            UndoEntry::KeptBoth => {
                self.cursor = self.cursor.saturating_sub(2);
            }
        }

        self.normalize();
        Ok(())
    }

    /// Stop comparing and keep everything still in the pool.
    pub fn end_early(&mut self) -> Result<()> {
        self.ensure_active("end")?;
        log::debug!("Ending early with {} items in the pool", self.pool.len());
        self.ended = true;
        Ok(())
    }

    /// Rotate every item of the batch by a multiple of 90 degrees.
    pub fn rotate_all(&mut self, degrees: i32) -> Result<()> {
        self.ensure_active("rotate")?;
        if degrees % 90 != 0 {
            return Err(CullError::Argument(format!(
                "rotation must be a multiple of 90, got {}",
                degrees
            )));
        }

        for item in self.pool.iter_mut().chain(self.rejected.iter_mut()) {
            item.rotate(degrees);
        }
        Ok(())
    }

    /// Final kept/rejected split, available once the tournament is over.
    pub fn outcome(&self) -> Option<Partition> {
        if !self.is_finished() {
            return None;
        }
        Some(Partition {
            kept: self.pool.clone(),
            rejected: self.rejected.clone(),
        })
    }

    /// Hand off the current split, finished or not. An abandoned tournament
    /// keeps whatever is still in the pool.
    pub fn into_partition(self) -> Partition {
        Partition {
            kept: self.pool,
            rejected: self.rejected,
        }
    }

    fn ensure_active(&self, action: &str) -> Result<()> {
        match self.phase() {
            TournamentPhase::Active => Ok(()),
            phase => Err(CullError::InvalidState(format!(
                "cannot {} in a finished tournament ({:?})",
                action, phase
            ))),
        }
    }

    /// Reshuffle when the cursor has no partner left.
    fn normalize(&mut self) {
        if self.ended || self.pool.len() < 2 {
            return;
        }
        if self.cursor + 1 >= self.pool.len() {
            self.pool.shuffle(&mut self.rng);
            self.cursor = 0;
            log::debug!("Reshuffled pool of {}", self.pool.len());
        }
    }
}
