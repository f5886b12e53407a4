use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;

static LOGGER: StderrLogger = StderrLogger;
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let thread = std::thread::current();
            eprintln!(
                "[{:<5}] [{}] {}: {}",
                record.level(),
                thread.name().unwrap_or("?"),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Installs the stderr logger. Call once at startup.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}
