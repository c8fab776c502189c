use std::path::PathBuf;

use daybook::config::Config;
use daybook::core::temporal::BucketedEvents;
use daybook::import::Importer;
use daybook::store::{EventStore, JsonFileStorage, StoreChange};

enum Command {
    Import(Vec<PathBuf>),
    Agenda,
    Complete(String),
    Help,
}

fn parse_args(args: &[String]) -> Command {
    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();
    match positional.split_first() {
        Some((cmd, rest)) if cmd.as_str() == "import" && !rest.is_empty() => {
            Command::Import(rest.iter().map(PathBuf::from).collect())
        }
        Some((cmd, [id])) if cmd.as_str() == "complete" => Command::Complete(id.to_string()),
        Some((cmd, [])) if cmd.as_str() == "agenda" => Command::Agenda,
        None => Command::Agenda,
        _ => Command::Help,
    }
}

/// Send this crate's records to the systemd user journal
/// (`journalctl --user -t daybook -f`); everything else only at warn.
fn init_logging() {
    struct FilteredJournal {
        inner: systemd_journal_logger::JournalLog,
    }

    impl log::Log for FilteredJournal {
        fn enabled(&self, metadata: &log::Metadata) -> bool {
            if metadata.target().starts_with("daybook") {
                let max = if daybook::debug_logging() {
                    log::LevelFilter::Debug
                } else {
                    log::LevelFilter::Info
                };
                metadata.level() <= max
            } else {
                metadata.level() <= log::LevelFilter::Warn
            }
        }
        fn log(&self, record: &log::Record) {
            if self.enabled(record.metadata()) {
                self.inner.log(record);
            }
        }
        fn flush(&self) {
            self.inner.flush();
        }
    }

    let journal = match systemd_journal_logger::JournalLog::new() {
        Ok(journal) => journal.with_syslog_identifier("daybook".to_string()),
        Err(e) => {
            eprintln!("journald unavailable, logging disabled: {}", e);
            return;
        }
    };
    if log::set_boxed_logger(Box::new(FilteredJournal { inner: journal })).is_ok() {
        // Global max must be Debug so daybook debug logs can pass through when toggled
        log::set_max_level(log::LevelFilter::Debug);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let config = match Config::default_path() {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    daybook::set_debug_logging(config.debug_logging || args.iter().any(|a| a == "--debug"));
    init_logging();

    let mut store = EventStore::open(JsonFileStorage::new(config.events_path()))?;
    log::debug!("Using store at {}", store.storage().path().display());
    store.subscribe(|change: &StoreChange| log::debug!("store change: {:?}", change));

    match parse_args(&args) {
        Command::Import(paths) => {
            let mut importer = Importer::new(&mut store).with_occurrence_cap(config.recurrence_cap);
            for path in paths {
                let result = importer.handle_file_import(&path).await;
                println!("{}: {}", path.display(), serde_json::to_string(&result)?);
            }
        }
        Command::Agenda => {
            let view = BucketedEvents::build(store.get_events(), chrono::Local::now().naive_local());
            for (bucket, events) in view.iter() {
                if events.is_empty() {
                    continue;
                }
                println!("== {} ({})", bucket.label(), events.len());
                for event in events {
                    let when = event
                        .start_time
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "undated".to_string());
                    let mark = if event.completed { "x" } else { " " };
                    match event.priority {
                        Some(priority) => println!(
                            "  [{}] {}  {}  <{}>  ({})",
                            mark, when, event.name, priority, event.id
                        ),
                        None => println!("  [{}] {}  {}  ({})", mark, when, event.name, event.id),
                    }
                }
            }
        }
        Command::Complete(id) => {
            store.mark_event_completed(&id, true)?;
            println!("Completed {}", id);
        }
        Command::Help => {
            eprintln!("usage: daybook [agenda | import <file>... | complete <id>] [--debug]");
            std::process::exit(2);
        }
    }

    Ok(())
}
