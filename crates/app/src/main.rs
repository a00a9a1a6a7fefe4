//! `hearth-migrate`: upgrade every save in a directory to the current
//! save version.
//!
//! ```text
//! hearth-migrate <save-dir> [--dry-run] [--prune] [--no-compress]
//! ```
//!
//! Exits non-zero if any file failed to migrate.

mod batch;

use std::process::ExitCode;
use std::sync::Arc;

use bevy::app::App;
use bevy::log::{error, info, LogPlugin};

use hearth_save::{FileStorage, Storage, SystemClock, CURRENT_SAVE_VERSION};

use batch::{BatchOptions, FileOutcome};

fn main() -> ExitCode {
    let options = match BatchOptions::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(msg) => {
            eprintln!("{msg}\n{}", batch::USAGE);
            return ExitCode::from(2);
        }
    };

    // Only the log layer; the tool never runs a schedule.
    let mut app = App::new();
    app.add_plugins(LogPlugin::default());

    let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(options.dir.clone()));
    let mut config = batch::load_config(storage.as_ref());
    if options.no_compress {
        config.compress = false;
    }

    info!(
        "Migrating saves in {} to v{}{}",
        options.dir.display(),
        CURRENT_SAVE_VERSION,
        if options.dry_run { " (dry run)" } else { "" }
    );

    let clock = Arc::new(SystemClock);
    let reports = match batch::migrate_directory(storage, &config, clock, &options) {
        Ok(reports) => reports,
        Err(e) => {
            error!("Could not scan {}: {}", options.dir.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let mut failed = 0;
    for report in &reports {
        match &report.outcome {
            FileOutcome::Migrated {
                from,
                steps,
                repairs,
            } => println!(
                "{}: migrated v{} -> v{} ({} step(s), {} repair(s))",
                report.name, from, CURRENT_SAVE_VERSION, steps, repairs
            ),
            FileOutcome::Current { repairs } => {
                println!("{}: already current ({} repair(s))", report.name, repairs)
            }
            FileOutcome::Failed(reason) => {
                failed += 1;
                println!("{}: FAILED: {}", report.name, reason);
            }
        }
    }
    println!(
        "{} file(s), {} migrated, {} failed",
        reports.len(),
        reports
            .iter()
            .filter(|r| matches!(r.outcome, FileOutcome::Migrated { .. }))
            .count(),
        failed
    );

    if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
