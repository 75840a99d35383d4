/// Logs through any [`Log`](crate::Log) target at an explicit level.
///
/// ```
/// use ctxlog::{Context, Level};
///
/// let ctx = Context::new().add_param("trace_id", "abc");
/// ctxlog::log!(ctx, Level::Info, "handled {} items", 3);
/// ```
#[macro_export]
macro_rules! log {
    ($target:expr, $level:expr, $($arg:tt)+) => {
        $crate::Log::log(&$target, $level, ::std::format_args!($($arg)+))
    };
}

#[macro_export]
macro_rules! debug {
    ($target:expr, $($arg:tt)+) => {
        $crate::log!($target, $crate::Level::Debug, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($target:expr, $($arg:tt)+) => {
        $crate::log!($target, $crate::Level::Info, $($arg)+)
    };
}

#[macro_export]
macro_rules! warn {
    ($target:expr, $($arg:tt)+) => {
        $crate::log!($target, $crate::Level::Warn, $($arg)+)
    };
}

#[macro_export]
macro_rules! error {
    ($target:expr, $($arg:tt)+) => {
        $crate::log!($target, $crate::Level::Error, $($arg)+)
    };
}

#[macro_export]
macro_rules! fatal {
    ($target:expr, $($arg:tt)+) => {
        $crate::log!($target, $crate::Level::Fatal, $($arg)+)
    };
}
