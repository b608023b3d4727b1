//! Installs the process-wide `tracing` subscriber, mirroring the
//! `tracing_subscriber::registry().with(...).init()` idiom `pmoserver`
//! documents, generalized from an SSE log layer to a plain `fmt` layer
//! plus an optional file sink.

use aural_config::{Config, LogLevel};
use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Clone)]
struct SharedFileWriter(Arc<Mutex<std::fs::File>>);

impl io::Write for SharedFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.lock().unwrap().flush()
    }
}

fn open_file_writer(path: &Path) -> anyhow::Result<SharedFileWriter> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(SharedFileWriter(Arc::new(Mutex::new(file))))
}

/// Initializes the global subscriber from `config`'s `LOG_LEVEL` and
/// optional `LOG_FILE`. Returns an error rather than panicking, since an
/// unwritable log file shouldn't be a hard process-start failure that
/// panic-unwinds before any diagnostic reaches the user.
pub fn init(config: &Config) -> anyhow::Result<()> {
    let filter = EnvFilter::new(level_directive(config.log_level()));

    match config.log_file() {
        Some(path) => {
            let writer = open_file_writer(path)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(move || writer.clone()).with_ansi(false))
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .init();
        }
    }

    Ok(())
}

fn level_directive(level: LogLevel) -> String {
    format!("aural_bot={0},aural_router={0},aural_engine={0},aural_audio={0},aural_processor={0},aural_resolver={0},aural_cache={0},aural_playlist={0},aural_tracklist={0}", level.as_tracing_filter())
}
