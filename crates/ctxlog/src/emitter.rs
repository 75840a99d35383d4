use std::{collections::BTreeMap, fmt, sync::Arc};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::{
    error::{LogError, LogResult},
    level::Level,
    params::ParamBag,
    sink::{Sink, StderrSink, StdoutSink},
};

/// Environment key read for the output format.
pub const FORMAT_ENV: &str = "LOG_FORMAT";

/// UTC, second precision, literal `Z`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

pub type Clock = fn() -> DateTime<Utc>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    /// One JSON object per line: `level`, `message`, then the params.
    #[default]
    Json,
    /// `TIMESTAMP [LEVEL] message key=value ...`. Values are written unescaped,
    /// so a value containing spaces or `=` makes the line ambiguous.
    Line,
}

impl Format {
    /// Unrecognized input falls back to `Json`.
    pub fn parse(s: &str) -> Format {
        match s.trim().to_ascii_lowercase().as_str() {
            "line" | "text" => Format::Line,
            _ => Format::Json,
        }
    }

    pub fn from_env() -> Format {
        std::env::var(FORMAT_ENV)
            .map(|v| Format::parse(&v))
            .unwrap_or_default()
    }
}

/// Filter, format and write pipeline shared by every log call.
///
/// All work happens on the calling thread. Failures never reach the caller:
/// a record whose message cannot be formatted or whose params cannot be
/// serialized is replaced by a diagnostic record,
/// and a failed sink write is reported on the diagnostics sink.
#[derive(Clone)]
pub struct Emitter {
    level: Level,
    format: Format,
    sink: Arc<dyn Sink>,
    diagnostics: Arc<dyn Sink>,
    clock: Clock,
}

impl fmt::Debug for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("level", &self.level)
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new(Arc::new(StdoutSink))
    }
}

impl Emitter {
    pub fn new(sink: Arc<dyn Sink>) -> Self {
        Self {
            level: Level::default(),
            format: Format::default(),
            sink,
            diagnostics: Arc::new(StderrSink),
            clock: Utc::now,
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Sink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn set_level(&mut self, level: Level) {
        self.level = level;
    }

    pub fn set_format(&mut self, format: Format) {
        self.format = format;
    }

    pub fn set_sink(&mut self, sink: Arc<dyn Sink>) {
        self.sink = sink;
    }

    pub fn set_diagnostics(&mut self, diagnostics: Arc<dyn Sink>) {
        self.diagnostics = diagnostics;
    }

    pub fn set_clock(&mut self, clock: Clock) {
        self.clock = clock;
    }

    pub fn enabled(&self, level: Level) -> bool {
        level >= self.level
    }

    pub fn emit(&self, level: Level, args: fmt::Arguments<'_>, params: &ParamBag) {
        self.dispatch(level, args, &[params]);
    }

    /// Like [`emit`](Self::emit), with call-site fields layered over the
    /// ambient ones.
    pub fn emit_with(
        &self,
        level: Level,
        args: fmt::Arguments<'_>,
        ambient: &ParamBag,
        call: &ParamBag,
    ) {
        self.dispatch(level, args, &[ambient, call]);
    }

    fn dispatch(&self, level: Level, args: fmt::Arguments<'_>, layers: &[&ParamBag]) {
        if !self.enabled(level) {
            return;
        }

        let line = match self.build(level, args, layers) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(code = e.code(), error = %e, "log record could not be rendered");
                self.render_failure(&e)
            }
        };

        if let Err(e) = self.sink.write_line(&line) {
            self.report(&LogError::Io(e));
        }
    }

    fn build(&self, level: Level, args: fmt::Arguments<'_>, layers: &[&ParamBag]) -> LogResult<String> {
        // `to_string` would panic on a `Display` impl that returns an error.
        let mut message = String::new();
        fmt::write(&mut message, args)?;
        self.render(level, &message, layers)
    }

    fn render(&self, level: Level, message: &str, layers: &[&ParamBag]) -> LogResult<String> {
        let fields = collect_fields(layers)?;
        match self.format {
            Format::Json => render_json(level, message, &fields),
            Format::Line => Ok(self.render_line(level, message, &fields)),
        }
    }

    fn render_line(&self, level: Level, message: &str, fields: &BTreeMap<&str, &Value>) -> String {
        let ts = (self.clock)().format(TIMESTAMP_FORMAT);
        let mut line = format!("{ts} [{level}] {message}");
        for (k, v) in fields {
            line.push(' ');
            line.push_str(k);
            line.push('=');
            match v {
                Value::String(s) => line.push_str(s),
                other => line.push_str(&other.to_string()),
            }
        }
        line
    }

    fn render_failure(&self, err: &LogError) -> String {
        let message = match err {
            LogError::Format(_) => format!("failed to format log message: {err}"),
            _ => format!("failed to serialize log record: {err}"),
        };
        self.render(Level::Error, &message, &[])
            .unwrap_or(message)
    }

    fn report(&self, err: &LogError) {
        tracing::warn!(code = err.code(), error = %err, "log sink write failed");
        let _ = self
            .diagnostics
            .write_line(&format!("ctxlog: failed to write log message: {err}"));
    }
}

// Later layers win on key conflicts.
fn collect_fields<'a>(layers: &[&'a ParamBag]) -> LogResult<BTreeMap<&'a str, &'a Value>> {
    let mut fields = BTreeMap::new();
    for bag in layers.iter().copied() {
        fields.extend(bag.resolve()?);
    }
    Ok(fields)
}

fn render_json(level: Level, message: &str, fields: &BTreeMap<&str, &Value>) -> LogResult<String> {
    let mut obj = Map::with_capacity(fields.len() + 2);
    obj.insert("level".into(), Value::from(level.as_str()));
    obj.insert("message".into(), Value::from(message));
    // Params are applied last and may overwrite the two built-in fields.
    for (k, v) in fields {
        obj.insert((*k).to_string(), (*v).clone());
    }
    Ok(serde_json::to_string(&Value::Object(obj))?)
}
