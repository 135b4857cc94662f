use crate::burstcull_core::batch::build_batches;
use crate::burstcull_core::config::CullConfig;
use crate::burstcull_core::error::{CullError, Result};
use crate::burstcull_core::linear::LinearCull;
use crate::burstcull_core::relocate::{FileMover, Relocator};
use crate::burstcull_core::report::{describe_item, format_size};
use crate::burstcull_core::scan::scan_media;
use crate::burstcull_core::session::{BatchReport, Session, SessionSummary};
use crate::burstcull_core::state::{SessionDocument, SessionStore};
use crate::burstcull_core::tournament::{Side, Tournament};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// Whether the user wants to keep going after a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CullMode {
    Tournament,
    Strip,
}

/// Session-level options of an interactive run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: CullMode,
    pub seed: Option<u64>,
    pub state_file: PathBuf,
    pub fresh: bool,
}

/// Read one trimmed line. `None` at end of input.
fn read_choice<I: BufRead, O: Write>(input: &mut I, out: &mut O, prompt: &str) -> Result<Option<String>> {
    write!(out, "{}", prompt)?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        writeln!(out)?;
        return Ok(None);
    }
    Ok(Some(line.trim().to_lowercase()))
}

/// Print an engine error and carry on. Anything the user can cause at the
/// prompt is recoverable.
fn report_error<O: Write>(out: &mut O, error: CullError) -> Result<()> {
    if error.is_invalid_state() {
        log::debug!("{}", error);
    } else {
        log::warn!("{}", error);
    }
    writeln!(out, "  {}", error)?;
    Ok(())
}

/// Drive a tournament from user input until it is over. End of input or `q`
/// leaves the tournament as it is and asks the caller to stop.
pub fn run_tournament<R: Rng, I: BufRead, O: Write>(
    tournament: &mut Tournament<R>,
    input: &mut I,
    out: &mut O,
) -> Result<Flow> {
    while let Some((left, right)) = tournament.current_pair() {
        writeln!(out, "\n{} left in this batch", tournament.pool().len())?;
        writeln!(out, "  [1] {}", describe_item(left))?;
        writeln!(out, "  [2] {}", describe_item(right))?;

        let Some(choice) = read_choice(input, out, "Choice [1/2/b/u/e/l/r/q]: ")? else {
            return Ok(Flow::Quit);
        };

        let result = match choice.as_str() {
            "1" => tournament.pick_winner(Side::Left),
            "2" => tournament.pick_winner(Side::Right),
            "b" => tournament.keep_both(),
            "u" => tournament.undo(),
            "e" => tournament.end_early(),
            "l" => tournament.rotate_all(-90),
            "r" => tournament.rotate_all(90),
            "q" => return Ok(Flow::Quit),
            other => {
                writeln!(out, "  Unknown choice '{}'", other)?;
                continue;
            }
        };
        if let Err(e) = result {
            report_error(out, e)?;
        }
    }

    Ok(Flow::Continue)
}

/// Drive a linear cull from user input until every item has been seen.
pub fn run_strip<M: FileMover, I: BufRead, O: Write>(
    cull: &mut LinearCull<'_, M>,
    input: &mut I,
    out: &mut O,
) -> Result<Flow> {
    while let Some(item) = cull.current() {
        writeln!(
            out,
            "\n[{}/{}] {}",
            cull.cursor() + 1,
            cull.items().len(),
            describe_item(item)
        )?;

        let Some(choice) = read_choice(input, out, "Choice [k/d/u/s <n>/q]: ")? else {
            return Ok(Flow::Quit);
        };

        let mut words = choice.split_whitespace();
        let result = match (words.next(), words.next()) {
            (Some("k"), None) => cull.keep(),
            (Some("d"), None) => cull.mark_current().map(|record| {
                log::debug!("Marked {}", record.original_path.display());
            }),
            (Some("u"), None) => cull.undo_last(),
            (Some("s"), Some(n)) => match n.parse::<usize>() {
                Ok(n) if n >= 1 => cull.restore(n - 1),
                _ => Err(CullError::Argument(format!("'{}' is not an item number", n))),
            },
            (Some("q"), None) => return Ok(Flow::Quit),
            _ => {
                writeln!(out, "  Unknown choice '{}'", choice)?;
                continue;
            }
        };
        if let Err(e) = result {
            report_error(out, e)?;
        }
    }

    Ok(Flow::Continue)
}

fn print_report<O: Write>(out: &mut O, report: &BatchReport) -> Result<()> {
    writeln!(
        out,
        "Batch {}: kept {}, quarantined {}",
        report.number,
        report.kept,
        report.relocated.len()
    )?;
    if !report.failures.is_empty() {
        writeln!(out, "Could not quarantine {} files:", report.failures.len())?;
        write!(out, "{}", report.failures)?;
    }
    Ok(())
}

/// Scan `root`, then cull its batches one by one, saving progress after each
/// batch.
pub fn run_session<I: BufRead, O: Write>(
    root: &Path,
    config: &CullConfig,
    options: &RunOptions,
    input: &mut I,
    out: &mut O,
) -> Result<SessionSummary> {
    if !root.exists() {
        return Err(CullError::PathNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(CullError::NotADirectory(root.to_path_buf()));
    }

    let items = scan_media(root, config)?;
    let batches = build_batches(
        items,
        config.max_gap_seconds,
        config.min_batch_size,
        config.max_batch_size,
        config.ordering,
    );

    let mut store = SessionStore::load(&options.state_file);
    let mut doc = store
        .document(root)
        .cloned()
        .unwrap_or_else(|| SessionDocument::new(root));
    if options.fresh {
        // Keep the quarantine records so earlier moves can still be undone
        doc.processed_paths.clear();
        doc.selections.clear();
    }

    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let total = batches.len();
    let mut session = Session::new(batches, Relocator::for_root(root));

    while let Some(batch) = session.start_next(Some(&doc))? {
        let batch = batch.clone();
        writeln!(out, "\n=== Batch {} of {} ({} items) ===", batch.number, total, batch.len())?;

        let (report, flow) = match options.mode {
            CullMode::Tournament => {
                let mut tournament = Tournament::with_rng(batch.items, &mut rng);
                let flow = run_tournament(&mut tournament, input, out)?;
                let report = session.complete_batch(tournament.into_partition(), Some(&mut doc))?;
                (report, flow)
            }
            CullMode::Strip => {
                let mut cull = LinearCull::new(batch.items, session.relocator());
                let flow = run_strip(&mut cull, input, out)?;
                let (partition, records) = cull.into_parts();
                let report = session.complete_relocated_batch(partition, records, Some(&mut doc))?;
                (report, flow)
            }
        };
        print_report(out, &report)?;

        store.put(doc.clone());
        if let Err(e) = store.save() {
            log::warn!("Could not save progress to {}: {}", store.path().display(), e);
        }

        if flow == Flow::Quit {
            writeln!(out, "Stopping. Progress is saved.")?;
            break;
        }
    }

    let summary = session.summary()?;
    writeln!(out, "\nSession complete!")?;
    writeln!(out, "  {} batches culled", summary.batches_completed)?;
    writeln!(out, "  {} files kept", summary.kept_count)?;
    writeln!(out, "  {} files quarantined", summary.rejected_count)?;
    writeln!(out, "  {} in quarantine", format_size(summary.bytes_reclaimed))?;
    Ok(summary)
}
