use std::fmt;

use colored::*;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::FormatEvent;
use tracing_subscriber::fmt::format::{self, Writer};
use tracing_subscriber::registry::LookupSpan;

/// Maps the `--log-level` vocabulary onto tracing levels.
///
/// `fatal` and `panic` have no tracing counterpart and collapse to `error`;
/// anything unrecognised falls back to `warn`.
pub fn parse_level(level: &str) -> Level {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" | "fatal" | "panic" => Level::ERROR,
        _ => Level::WARN,
    }
}

/// Installs the global subscriber. `RUST_LOG` still wins when set.
pub fn init_logging(level: &str, json: bool) {
    let level = parse_level(level);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    // a subscriber may already be installed when embedded in tests
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.event_format(HavocFormatter).try_init()
    };
}

/// Fields of one event, split into the parts the terminal prefix shows.
#[derive(Default)]
struct EventFields {
    message: String,
    name: Option<String>,
    phase: Option<String>,
    rest: Vec<(&'static str, String)>,
}

impl EventFields {
    fn put(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = value,
            "name" => self.name = Some(value),
            "phase" => self.phase = Some(value),
            other => self.rest.push((other, value)),
        }
    }

    /// `(phase) name: message key=value ...`, with absent parts left out.
    fn render(&self) -> String {
        let mut line = String::new();
        if let Some(phase) = &self.phase {
            line.push_str(&format!("({phase}) "));
        }
        if let Some(name) = &self.name {
            line.push_str(&format!("{name}: "));
        }
        line.push_str(&self.message);
        for (key, value) in &self.rest {
            line.push_str(&format!(" {key}={value}"));
        }
        line
    }
}

impl Visit for EventFields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, format!("{value:?}"));
    }
}

/// Terminal format: a level symbol, then the phase and the object name the
/// event is about, then the message.
pub struct HavocFormatter;

impl<S, N> FormatEvent<S, N> for HavocFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> format::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let (symbol, color_func): (&str, fn(ColoredString) -> ColoredString) =
            match *event.metadata().level() {
                Level::TRACE => ("[ ]", |s| s.dimmed()),
                Level::DEBUG => ("[?]", |s| s.blue()),
                Level::INFO => ("[+]", |s| s.green().bold()),
                Level::WARN => ("[*]", |s| s.yellow().bold()),
                Level::ERROR => ("[-]", |s| s.red().bold()),
            };

        let mut fields = EventFields::default();
        event.record(&mut fields);

        writeln!(writer, "{} {}", color_func(symbol.into()), fields.render())
    }
}
