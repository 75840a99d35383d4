use std::{fmt, sync::Arc};

use serde_json::Value;

use crate::{
    context::Context,
    emitter::{Emitter, Format},
    facade::Log,
    level::Level,
    params::ParamBag,
    sink::{Sink, StdoutSink},
};

/// Owned logger: its own params, level floor and sink.
///
/// Param mutation takes `&mut self` and is not synchronized. Share a logger
/// across threads behind an `Arc` once it is configured, and use [`sub`]
/// to derive per-request children.
///
/// [`sub`]: Logger::sub
#[derive(Debug, Clone)]
pub struct Logger {
    params: ParamBag,
    emitter: Emitter,
}

impl Logger {
    /// Level comes from `LOG_LEVEL`, defaulting to `Info`.
    pub fn new(sink: impl Sink + 'static) -> Self {
        Self::with_level(sink, Level::from_env())
    }

    pub fn with_level(sink: impl Sink + 'static, level: Level) -> Self {
        Self::from_emitter(Emitter::new(Arc::new(sink)).with_level(level))
    }

    pub fn from_emitter(emitter: Emitter) -> Self {
        Self {
            params: ParamBag::new(),
            emitter,
        }
    }

    pub fn add_param(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.params.set(key, value);
        self
    }

    pub fn add_params(&mut self, params: &ParamBag) -> &mut Self {
        self.params.merge(params);
        self
    }

    pub fn params(&self) -> &ParamBag {
        &self.params
    }

    pub fn level(&self) -> Level {
        self.emitter.level()
    }

    pub fn set_level(&mut self, level: Level) -> &mut Self {
        self.emitter.set_level(level);
        self
    }

    pub fn set_format(&mut self, format: Format) -> &mut Self {
        self.emitter.set_format(format);
        self
    }

    /// Child with a snapshot of the current params. Level, format and sink
    /// carry over; later param changes on either side stay private.
    pub fn sub(&self) -> Logger {
        self.clone()
    }

    /// Returns a context carrying `logger`. The logger itself is shared, not copied.
    pub fn attach(ctx: &Context, logger: Arc<Logger>) -> Context {
        ctx.with_logger(logger)
    }

    /// Logger attached to `ctx`, or a stdout logger attached to a new
    /// context when there is none.
    pub fn from_context(ctx: &Context) -> (Context, Arc<Logger>) {
        Self::from_context_or_else(ctx, || Logger::new(StdoutSink))
    }

    pub fn from_context_or_else<F>(ctx: &Context, fallback: F) -> (Context, Arc<Logger>)
    where
        F: FnOnce() -> Logger,
    {
        if let Some(logger) = ctx.logger() {
            return (ctx.clone(), Arc::clone(logger));
        }

        let logger = Arc::new(fallback());
        logger.debug(format_args!("no logger attached to context, using default"));
        (Logger::attach(ctx, Arc::clone(&logger)), logger)
    }
}

impl Log for Logger {
    fn log_with(&self, level: Level, fields: &ParamBag, args: fmt::Arguments<'_>) {
        self.emitter.emit_with(level, args, &self.params, fields);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};
    use serial_test::serial;

    use super::*;
    use crate::{level::LEVEL_ENV, sink::MemorySink};

    fn parse_lines(sink: &MemorySink) -> Vec<Value> {
        sink.lines()
            .iter()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn add_param_chains() {
        let out = MemorySink::new();
        let mut logger = Logger::with_level(out.clone(), Level::Debug);
        logger.add_param("a", 1).add_param("b", "two");
        logger.info(format_args!("hi"));
        assert_eq!(
            parse_lines(&out),
            [json!({"level": "INFO", "message": "hi", "a": 1, "b": "two"})]
        );
    }

    #[test]
    fn add_params_merges_in_bulk() {
        let mut logger = Logger::with_level(MemorySink::new(), Level::Info);
        logger.add_param("a", 1);
        logger.add_params(&ParamBag::new().with("a", 2).with("b", 3));
        assert_eq!(logger.params().get("a"), Some(&json!(2)));
        assert_eq!(logger.params().get("b"), Some(&json!(3)));
    }

    #[test]
    fn sub_logger_is_independent() {
        let out = MemorySink::new();
        let mut parent = Logger::with_level(out.clone(), Level::Info);
        parent.add_param("key1", "value1");

        let mut child = parent.sub();
        child.add_param("key2", "value2");
        parent.add_param("key3", "value3");

        child.info(format_args!("from child"));
        parent.info(format_args!("from parent"));

        let lines = parse_lines(&out);
        assert_eq!(lines[0]["key1"], "value1");
        assert_eq!(lines[0]["key2"], "value2");
        assert!(lines[0].get("key3").is_none());
        assert_eq!(lines[1]["key1"], "value1");
        assert_eq!(lines[1]["key3"], "value3");
        assert!(lines[1].get("key2").is_none());
    }

    #[test]
    fn sub_logger_keeps_level_and_sink() {
        let out = MemorySink::new();
        let parent = Logger::with_level(out.clone(), Level::Warn);
        let child = parent.sub();
        assert_eq!(child.level(), Level::Warn);
        child.info(format_args!("dropped"));
        child.error(format_args!("kept"));
        assert_eq!(out.lines().len(), 1);
    }

    #[test]
    fn attach_then_extract_returns_same_logger() {
        let logger = Arc::new(Logger::with_level(MemorySink::new(), Level::Info));
        let ctx = Logger::attach(&Context::new(), Arc::clone(&logger));
        let (same_ctx, found) = Logger::from_context(&ctx);
        assert!(Arc::ptr_eq(&found, &logger));
        assert!(same_ctx.logger().is_some());
    }

    #[test]
    fn missing_logger_falls_back_and_self_logs() {
        let out = MemorySink::new();
        let bare = Context::new().add_param("trace_id", "t");
        let (ctx, logger) =
            Logger::from_context_or_else(&bare, || Logger::with_level(out.clone(), Level::Debug));

        assert!(bare.logger().is_none());
        assert!(Arc::ptr_eq(ctx.logger().unwrap(), &logger));
        assert_eq!(ctx.params().get("trace_id"), Some(&json!("t")));
        assert_eq!(
            parse_lines(&out),
            [json!({"level": "DEBUG", "message": "no logger attached to context, using default"})]
        );

        // Second lookup hits the attached logger and does not self-log again.
        let (_, again) = Logger::from_context(&ctx);
        assert!(Arc::ptr_eq(&again, &logger));
        assert_eq!(out.lines().len(), 1);
    }

    #[test]
    #[serial]
    fn level_defaults_to_info_without_env() {
        std::env::remove_var(LEVEL_ENV);
        let out = MemorySink::new();
        let logger = Logger::new(out.clone());
        assert_eq!(logger.level(), Level::Info);
        logger.debug(format_args!("hidden"));
        logger.info(format_args!("shown"));
        assert_eq!(out.lines().len(), 1);
    }

    #[test]
    #[serial]
    fn level_read_from_env_at_construction() {
        std::env::set_var(LEVEL_ENV, "error");
        let logger = Logger::new(MemorySink::new());
        std::env::set_var(LEVEL_ENV, "debug");
        assert_eq!(logger.level(), Level::Error);
        std::env::remove_var(LEVEL_ENV);
    }
}
