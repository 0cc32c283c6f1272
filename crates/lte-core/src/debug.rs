use core::fmt;
use std::fs::OpenOptions;
use std::sync::Once;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::fmt::format::{self, FormatEvent, FormatFields};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, fmt as tracingfmt};

/// Width of the "LEVEL ts target" column before the message
const PREFIX_WIDTH: usize = 48;

/// Collects the `ts` field and renders all other fields
#[derive(Default)]
struct FieldVisitor {
    ts: Option<String>,
    message: String,
    extra: String,
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        match field.name() {
            "ts" => self.ts = Some(format!("{:?}", value)),
            "message" => self.message = format!("{:?}", value),
            name => {
                use fmt::Write;
                let _ = write!(self.extra, " {}={:?}", name, value);
            }
        }
    }
}

/// One line per event: level, subframe, shortened target, message
struct TtiFormatter;

/// "lte_entities::mac::ra_proc" becomes "entities/ra_proc"
fn short_target(target: &str) -> String {
    let mut parts = target.split("::");
    let krate = parts.next().unwrap_or(target);
    let krate = krate.strip_prefix("lte_").unwrap_or(krate);
    match parts.last() {
        Some(module) => format!("{}/{}", krate, module),
        None => krate.to_string(),
    }
}

impl<S, N> FormatEvent<S, N> for TtiFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();
        let mut fields = FieldVisitor::default();
        event.record(&mut fields);

        let level = *metadata.level();
        let color = if writer.has_ansi_escapes() {
            match level {
                tracing::Level::ERROR => "\x1b[31m",
                tracing::Level::WARN => "\x1b[33m",
                tracing::Level::INFO => "\x1b[32m",
                tracing::Level::DEBUG => "\x1b[34m",
                tracing::Level::TRACE => "\x1b[35m",
            }
        } else {
            ""
        };
        let reset = if color.is_empty() { "" } else { "\x1b[0m" };

        let prefix = format!(
            "{}{:<5}{} {:>8} {}",
            color,
            level,
            reset,
            fields.ts.as_deref().unwrap_or(""),
            short_target(metadata.target())
        );
        // Escape sequences take no room on screen
        let width = PREFIX_WIDTH + color.len() + reset.len();
        writeln!(writer, "{:<width$} {}{}", prefix, fields.message, fields.extra, width = width)
    }
}

static INIT_LOG: Once = Once::new();

/// Sets up logging with maximum verbosity (trace level)
/// Mainly for unit tests
pub fn setup_logging_verbose() {
    setup_logging(EnvFilter::new("trace"), None);
}

/// Sets up default logging to stdout and optionally, a verbose log file
/// Returns a guard, that needs to be kept alive for logging to file to work
pub fn setup_logging_default(verbose_logfile: Option<String>) -> Option<WorkerGuard> {
    let logfile_and_filter = verbose_logfile.map(|file| (file, EnvFilter::new("trace")));
    setup_logging(get_default_stdout_filter(), logfile_and_filter)
}

/// RUST_LOG if set, otherwise info with the random access procedure at debug
pub fn get_default_stdout_filter() -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    EnvFilter::new("info")
        .add_directive("lte_core::bitbuffer=warn".parse().expect("static directive"))
        .add_directive("lte_entities::mac::timers=info".parse().expect("static directive"))
        .add_directive("lte_entities::mac::ra_proc=debug".parse().expect("static directive"))
        .add_directive("lte_ra_sim=debug".parse().expect("static directive"))
}

/// Installs the global subscriber on the first call only.
/// If an output file is requested, returns Some<WorkerGuard>. Keep this value alive
/// or logging to file may cease working.
fn setup_logging(stdout_filter: EnvFilter, outfile: Option<(String, EnvFilter)>) -> Option<WorkerGuard> {
    let Some((outfile, outfile_filter)) = outfile else {
        INIT_LOG.call_once(|| {
            let stdout_layer = tracingfmt::layer().event_format(TtiFormatter);
            // try_init: another test harness may already have installed a subscriber
            let _ = tracing_subscriber::registry()
                .with(stdout_layer.with_filter(stdout_filter))
                .try_init();
        });
        return None;
    };

    let file = match OpenOptions::new().create(true).append(true).open(&outfile) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Failed to open log file {}: {}, logging to stdout only", outfile, e);
            return setup_logging(stdout_filter, None);
        }
    };
    let (file_writer, guard) = tracing_appender::non_blocking(file);
    INIT_LOG.call_once(|| {
        let file_layer = tracingfmt::layer()
            .event_format(TtiFormatter)
            .with_writer(file_writer)
            .with_ansi(false);
        let stdout_layer = tracingfmt::layer().event_format(TtiFormatter);
        let _ = tracing_subscriber::registry()
            .with(file_layer.with_filter(outfile_filter))
            .with(stdout_layer.with_filter(stdout_filter))
            .try_init();
    });
    Some(guard)
}
