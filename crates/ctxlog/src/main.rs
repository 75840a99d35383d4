mod cli;
mod logging;

use clap::Parser;
use ctxlog::{Format, Level, Log, Logger, StdoutSink};

use crate::cli::Args;

fn main() {
    let args = Args::parse();
    logging::init(&args.log_level);

    let mut logger = Logger::with_level(StdoutSink, args.level.unwrap_or_else(Level::from_env));
    logger.set_format(args.format.unwrap_or_else(Format::from_env));
    for (k, v) in &args.params {
        logger.add_param(k.as_str(), cli::param_value(v));
    }

    tracing::debug!(level = %logger.level(), at = %args.at, "emitting record");
    logger.log(args.at, format_args!("{}", args.message.join(" ")));
}
