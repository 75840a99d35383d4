use std::{
    fmt,
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use once_cell::sync::Lazy;

use crate::{
    context::Context,
    emitter::{Clock, Emitter, Format},
    level::Level,
    params::ParamBag,
    sink::Sink,
};

static GLOBAL: Lazy<Arc<Config>> = Lazy::new(|| Arc::new(Config::from_env()));

/// Process-wide configuration used by ambient [`Context`] logging.
pub fn global() -> Arc<Config> {
    Arc::clone(&GLOBAL)
}

/// Shared level, format and sink for contexts.
///
/// Each log call copies the emitter out of the lock and writes without
/// holding it, so a sink may call back into the setters. A poisoned lock is
/// recovered rather than propagated.
#[derive(Debug, Default)]
pub struct Config {
    emitter: RwLock<Emitter>,
}

impl Config {
    pub fn new(emitter: Emitter) -> Self {
        Self {
            emitter: RwLock::new(emitter),
        }
    }

    /// Stdout, with level from `LOG_LEVEL` and format from `LOG_FORMAT`.
    pub fn from_env() -> Self {
        Self::new(
            Emitter::default()
                .with_level(Level::from_env())
                .with_format(Format::from_env()),
        )
    }

    pub fn level(&self) -> Level {
        self.read().level()
    }

    pub fn format(&self) -> Format {
        self.read().format()
    }

    pub fn set_level(&self, level: Level) {
        self.write().set_level(level);
    }

    pub fn set_format(&self, format: Format) {
        self.write().set_format(format);
    }

    pub fn set_output(&self, sink: Arc<dyn Sink>) {
        self.write().set_sink(sink);
    }

    pub fn set_diagnostics(&self, diagnostics: Arc<dyn Sink>) {
        self.write().set_diagnostics(diagnostics);
    }

    pub fn set_clock(&self, clock: Clock) {
        self.write().set_clock(clock);
    }

    /// Copy of the current pipeline, e.g. to seed an owned [`Logger`](crate::Logger).
    pub fn emitter(&self) -> Emitter {
        self.read().clone()
    }

    pub fn log(&self, ctx: &Context, level: Level, args: fmt::Arguments<'_>) {
        self.emitter().emit(level, args, ctx.param_bag());
    }

    pub fn log_with(&self, ctx: &Context, level: Level, fields: &ParamBag, args: fmt::Arguments<'_>) {
        self.emitter().emit_with(level, args, ctx.param_bag(), fields);
    }

    fn read(&self) -> RwLockReadGuard<'_, Emitter> {
        self.emitter.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Emitter> {
        self.emitter.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::{io, sync::Weak, thread};

    use serde_json::Value;
    use serial_test::serial;

    use super::*;
    use crate::{emitter::FORMAT_ENV, level::LEVEL_ENV, sink::MemorySink};

    // Raises the config's level from inside `write_line`.
    struct EscalatingSink {
        config: Weak<Config>,
        out: MemorySink,
    }

    impl Sink for EscalatingSink {
        fn write_line(&self, line: &str) -> io::Result<()> {
            if let Some(config) = self.config.upgrade() {
                config.set_level(Level::Error);
            }
            self.out.write_line(line)
        }
    }

    fn config_with(out: &MemorySink, level: Level) -> Config {
        Config::new(Emitter::new(Arc::new(out.clone())).with_level(level))
    }

    #[test]
    fn explicit_config_logs_context_params() {
        let out = MemorySink::new();
        let config = config_with(&out, Level::Info);
        let ctx = Context::new().add_param("key", "value");

        config.log(&ctx, Level::Debug, format_args!("x"));
        assert!(out.is_empty());

        config.log(&ctx, Level::Warn, format_args!("x"));
        let v: Value = serde_json::from_str(&out.lines()[0]).unwrap();
        assert_eq!(v["level"], "WARN");
        assert_eq!(v["message"], "x");
        assert_eq!(v["key"], "value");
    }

    #[test]
    fn setters_take_effect_for_later_calls() {
        let first = MemorySink::new();
        let second = MemorySink::new();
        let config = config_with(&first, Level::Error);
        let ctx = Context::new();

        config.log(&ctx, Level::Info, format_args!("dropped"));
        config.set_level(Level::Debug);
        config.log(&ctx, Level::Info, format_args!("kept"));
        config.set_output(Arc::new(second.clone()));
        config.set_format(Format::Line);
        config.log(&ctx, Level::Info, format_args!("moved"));

        assert_eq!(first.lines().len(), 1);
        assert!(second.contents().contains("[INFO] moved"));
        assert_eq!(config.level(), Level::Debug);
        assert_eq!(config.format(), Format::Line);
    }

    #[test]
    fn snapshot_seeds_an_owned_logger() {
        fn epoch() -> chrono::DateTime<chrono::Utc> {
            chrono::DateTime::<chrono::Utc>::UNIX_EPOCH
        }

        let out = MemorySink::new();
        let diag = MemorySink::new();
        let config = config_with(&out, Level::Warn);
        config.set_clock(epoch);
        config.set_format(Format::Line);
        config.set_diagnostics(Arc::new(diag.clone()));

        let mut logger = crate::Logger::from_emitter(config.emitter());
        logger.add_param("component", "db");
        crate::Log::warn(&logger, format_args!("slow query"));
        // Later changes to the config do not reach the snapshot.
        config.set_level(Level::Fatal);
        crate::Log::error(&logger, format_args!("timeout"));

        assert_eq!(
            out.lines(),
            [
                "1970-01-01T00:00:00Z [WARN] slow query component=db",
                "1970-01-01T00:00:00Z [ERROR] timeout component=db",
            ]
        );
        assert!(diag.is_empty());
    }

    #[test]
    fn sink_may_reconfigure_during_write() {
        let out = MemorySink::new();
        let config = Arc::new_cyclic(|weak| {
            let sink = EscalatingSink {
                config: weak.clone(),
                out: out.clone(),
            };
            Config::new(Emitter::new(Arc::new(sink)).with_level(Level::Info))
        });
        let ctx = Context::new();

        config.log(&ctx, Level::Info, format_args!("first"));
        assert_eq!(config.level(), Level::Error);
        config.log(&ctx, Level::Info, format_args!("dropped"));
        config.log(&ctx, Level::Error, format_args!("second"));

        assert_eq!(out.lines().len(), 2);
    }

    #[test]
    #[serial]
    fn from_env_reads_level_and_format() {
        std::env::set_var(FORMAT_ENV, "line");
        std::env::set_var(LEVEL_ENV, "warn");
        let config = Config::from_env();
        std::env::remove_var(FORMAT_ENV);
        std::env::remove_var(LEVEL_ENV);

        assert_eq!(config.format(), Format::Line);
        assert_eq!(config.level(), Level::Warn);

        let defaults = Config::from_env();
        assert_eq!(defaults.format(), Format::Json);
        assert_eq!(defaults.level(), Level::Info);
    }

    #[test]
    fn concurrent_readers_and_writers() {
        let out = MemorySink::new();
        let config = Arc::new(config_with(&out, Level::Debug));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let config = Arc::clone(&config);
                thread::spawn(move || {
                    let ctx = Context::new().add_param("worker", i);
                    for j in 0..25 {
                        if j % 5 == 0 {
                            config.set_level(Level::Debug);
                        }
                        config.log(&ctx, Level::Info, format_args!("iteration {j}"));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let lines = out.lines();
        assert_eq!(lines.len(), 100);
        for line in lines {
            let v: Value = serde_json::from_str(&line).unwrap();
            assert!(v["worker"].is_number());
        }
    }
}
