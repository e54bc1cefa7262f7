/// Colored logger writing to stderr; stdout is reserved for the worker protocol.
pub struct ColoredLogger;

impl ColoredLogger {
    fn is_lume_target(target: &str) -> bool {
        target.starts_with("lume") || matches!(target, "cms" | "server" | "worker")
    }
}

impl log::Log for ColoredLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        Self::is_lume_target(metadata.target()) || metadata.level() <= log::Level::Warn
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level = record.level();
        let msg = record.args();
        let target = record.target();

        let color = match level {
            log::Level::Info => "\x1b[36m",  // Cyan
            log::Level::Warn => "\x1b[33m",  // Yellow
            log::Level::Error => "\x1b[31m", // Red
            log::Level::Debug => "\x1b[35m", // Magenta
            log::Level::Trace => "\x1b[37m", // White
        };

        let reset = "\x1b[0m";
        let bold = "\x1b[1m";

        eprintln!(
            "{color}{bold}[{target}]{reset} {msg}",
            target = target,
            msg = msg
        );
    }

    fn flush(&self) {}
}

pub static LOGGER: ColoredLogger = ColoredLogger;
