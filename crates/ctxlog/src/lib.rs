//! Leveled, structured logging with request-scoped params.
//!
//! Params travel with a call chain in one of two ways:
//!
//! - an immutable [`Context`] value, logged through the process-wide
//!   [`Config`] (see [`config::global`]);
//! - an owned [`Logger`] holding its own params, level and sink.
//!
//! ```
//! use ctxlog::{Level, Logger, MemorySink};
//!
//! let out = MemorySink::new();
//! let mut logger = Logger::with_level(out.clone(), Level::Info);
//! logger.add_param("user_id", 7);
//!
//! ctxlog::debug!(logger, "not written");
//! ctxlog::warn!(logger, "disk at {}%", 93);
//! assert_eq!(out.lines().len(), 1);
//! ```

mod macros;

pub mod config;
mod context;
mod emitter;
mod error;
mod facade;
mod level;
mod logger;
mod params;
pub mod scope;
mod sink;

use std::sync::Arc;

pub use config::Config;
pub use context::Context;
pub use emitter::{Clock, Emitter, Format, FORMAT_ENV, TIMESTAMP_FORMAT};
pub use error::{LogError, LogResult};
pub use facade::Log;
pub use level::{Level, LEVEL_ENV};
pub use logger::Logger;
pub use params::ParamBag;
pub use sink::{MemorySink, Sink, StderrSink, StdoutSink, WriterSink};

/// Sets the minimum level for ambient context logging.
pub fn set_level(level: Level) {
    config::global().set_level(level);
}

/// Redirects ambient context logging to `sink`.
pub fn set_output(sink: impl Sink + 'static) {
    config::global().set_output(Arc::new(sink));
}

/// Switches ambient context logging between JSON and line output.
pub fn set_format(format: Format) {
    config::global().set_format(format);
}
