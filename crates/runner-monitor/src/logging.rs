//! Logging setup.

use std::io;
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, fmt::writer::BoxMakeWriter, prelude::*, EnvFilter};

/// Setup logging with the given level.
///
/// `RUST_LOG` wins over `level` when set. With `file`, output is appended
/// there without colours, which keeps the dashboard screen clean.
pub fn setup_logging(level: &str, json: bool, file: Option<&Path>) -> io::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let writer = match file {
        Some(path) => BoxMakeWriter::new(file_appender(path)?),
        None => BoxMakeWriter::new(io::stdout),
    };
    let ansi = file.is_none();

    let result = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(writer))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty().with_ansi(ansi).with_writer(writer))
            .try_init()
    };
    result.map_err(io::Error::other)
}

fn file_appender(path: &Path) -> io::Result<RollingFileAppender> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "log file needs a name"))?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name)
        .build(dir)
        .map_err(io::Error::other)
}
