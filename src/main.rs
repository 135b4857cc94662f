use anyhow::Result;
use burstcull::burstcull_core::prompt::{CullMode, RunOptions, run_session};
use burstcull::burstcull_core::report::{format_batches, format_size};
use burstcull::burstcull_core::state::Selection;
use burstcull::burstcull_core::{
    Cli, Commands, Relocator, SessionDocument, SessionStore, build_batches, restore_all,
};
use clap::Parser;
use simplelog::{CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, WriteLogger};
use std::fs::File;
use std::io;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize loggers
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        LevelFilter::Warn,
        Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )];

    if cli.log {
        loggers.push(WriteLogger::new(
            cli.log_level,
            Config::default(),
            File::create("burstcull.log")?,
        ));
    }

    CombinedLogger::init(loggers)?;

    match cli.command {
        Commands::Batches { scan, output } => {
            let config = scan.config();
            let items = burstcull::burstcull_core::scan::scan_media(&scan.dir, &config)?;
            let batches = build_batches(
                items,
                config.max_gap_seconds,
                config.min_batch_size,
                config.max_batch_size,
                config.ordering,
            );
            println!("{}", format_batches(&batches, &output));
        }

        Commands::Cull {
            scan,
            session,
            seed,
        } => {
            let options = RunOptions {
                mode: CullMode::Tournament,
                seed,
                state_file: session.store_path(),
                fresh: session.fresh,
            };
            run_session(&scan.dir, &scan.config(), &options, &mut io::stdin().lock(), &mut io::stdout())?;
        }

        Commands::Strip { scan, session } => {
            let options = RunOptions {
                mode: CullMode::Strip,
                seed: None,
                state_file: session.store_path(),
                fresh: session.fresh,
            };
            run_session(&scan.dir, &scan.config(), &options, &mut io::stdin().lock(), &mut io::stdout())?;
        }

        Commands::Restore { dir, session } => {
            let mut store = SessionStore::load(&session.store_path());
            let Some(mut doc) = store.document(&dir).cloned() else {
                println!("No saved session for {}", dir.display());
                return Ok(());
            };

            let report = restore_all(&Relocator::for_root(&dir), &mut doc);
            store.put(doc);
            store.save()?;

            println!("\nRestore complete!");
            println!("  {} files restored", report.restored);
            if !report.failures.is_empty() {
                println!("  {} files left in quarantine:", report.failures.len());
                print!("{}", report.failures);
            }
        }

        Commands::Status { dir, session } => {
            let (files, bytes) = Relocator::for_root(&dir).quarantine_size()?;
            let store = SessionStore::load(&session.store_path());

            println!("Folder: {}", dir.display());
            println!("─────────────────────────────────");
            println!("Quarantine: {:>8} files ({})", files, format_size(bytes));
            match store.document(&dir) {
                Some(doc) => print_progress(doc),
                None => println!("No saved session"),
            }
        }
    }

    Ok(())
}

fn print_progress(doc: &SessionDocument) {
    println!("Processed:  {:>8} files", doc.processed_paths.len());
    println!("Kept:       {:>8} files", doc.count(Selection::Kept));
    println!("Discarded:  {:>8} files", doc.count(Selection::Discarded));
    println!("Restorable: {:>8} files", doc.quarantined.len());
}
