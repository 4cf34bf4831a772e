//! Logging setup with indicatif integration

use indicatif::MultiProgress;

/// Padded label and ANSI color for a log level.
fn level_label(level: log::Level) -> (&'static str, &'static str) {
    match level {
        log::Level::Error => ("ERROR", "\x1b[31m"),
        log::Level::Warn => ("WARN ", "\x1b[33m"),
        log::Level::Info => ("INFO ", "\x1b[32m"),
        log::Level::Debug => ("DEBUG", "\x1b[36m"),
        log::Level::Trace => ("TRACE", "\x1b[35m"),
    }
}

/// Logger that prints through indicatif MultiProgress so log lines don't
/// tear through active progress bars.
pub struct ProgressLogger {
    inner: env_logger::Logger,
    multi: MultiProgress,
}

impl ProgressLogger {
    pub fn new(inner: env_logger::Logger, multi: MultiProgress) -> Self {
        Self { inner, multi }
    }
}

impl log::Log for ProgressLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if self.inner.enabled(record.metadata()) {
            // only installed in TTY mode, so color is always on
            let (label, color) = level_label(record.level());
            let line = format!("[{color}{label}\x1b[0m] {}", record.args());
            self.multi.suspend(|| eprintln!("{line}"));
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Initialize logging.
///
/// `level` is the configured default filter (overridable via RUST_LOG).
/// With a MultiProgress the indicatif bridge is installed; without one,
/// plain env_logger output with uncolored labels.
pub fn init_logging(level: &str, multi: Option<&MultiProgress>) {
    use std::io::Write;

    if let Some(multi) = multi {
        let logger =
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
                .build();
        let max_level = logger.filter();

        log::set_boxed_logger(Box::new(ProgressLogger::new(logger, multi.clone())))
            .expect("failed to init logger");
        log::set_max_level(max_level);
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
            .format(|buf, record| {
                let (label, _) = level_label(record.level());
                writeln!(buf, "[{label}] {}", record.args())
            })
            .init();
    }
}
