use std::fs::{self, File, OpenOptions};
use std::io::{self, Error, ErrorKind, Write};
use std::path::Path;

use slog::{Drain, Level, Logger};

use super::log_format::BenchFormat;

/// init_logger builds the root logger.
/// Records go to `path` in append mode if it is given, otherwise to stderr.
/// `debug` lowers the level filter from Info to Debug.
pub fn init_logger(path: Option<&Path>, debug: bool) -> io::Result<Logger> {
    let out: Box<dyn Write + Send> = match path {
        Some(p) => Box::new(open_log_file(p)?),
        None => Box::new(io::stderr()),
    };

    let level = if debug { Level::Debug } else { Level::Info };

    let decorator = slog_term::PlainDecorator::new(out);
    let drain = BenchFormat::new(decorator).fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let drain = drain.filter_level(level).fuse();

    let logger = Logger::root(drain, slog::o!());

    info!(logger, "logger ready"; "debug" => debug);
    Ok(logger)
}

/// Opens log file with append mode. Creates a new log file if it doesn't exist.
fn open_log_file<P: AsRef<Path>>(path: P) -> io::Result<File> {
    let path = path.as_ref();
    let parent = path.parent().ok_or_else(|| {
        Error::new(
            ErrorKind::Other,
            "Unable to get parent directory of log file",
        )
    })?;
    if !parent.as_os_str().is_empty() && !parent.is_dir() {
        fs::create_dir_all(parent)?
    }
    OpenOptions::new().append(true).create(true).open(path)
}
