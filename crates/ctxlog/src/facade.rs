use std::{fmt, sync::Arc};

use crate::{config, context::Context, level::Level, params::ParamBag};

/// Anything a record can be logged through.
///
/// Implementors supply `log_with`; the level helpers and the crate's
/// macros (`info!`, `warn!`, ...) build on it.
pub trait Log {
    /// `fields` are call-site params layered over the target's own.
    fn log_with(&self, level: Level, fields: &ParamBag, args: fmt::Arguments<'_>);

    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        self.log_with(level, &ParamBag::new(), args);
    }

    fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args);
    }

    fn fatal(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Fatal, args);
    }
}

/// Ambient form: the context's params, filtered and written by the
/// process-wide configuration.
impl Log for Context {
    fn log_with(&self, level: Level, fields: &ParamBag, args: fmt::Arguments<'_>) {
        config::global().log_with(self, level, fields, args);
    }
}

impl<T: Log + ?Sized> Log for &T {
    fn log_with(&self, level: Level, fields: &ParamBag, args: fmt::Arguments<'_>) {
        (**self).log_with(level, fields, args);
    }
}

impl<T: Log + ?Sized> Log for Arc<T> {
    fn log_with(&self, level: Level, fields: &ParamBag, args: fmt::Arguments<'_>) {
        (**self).log_with(level, fields, args);
    }
}
