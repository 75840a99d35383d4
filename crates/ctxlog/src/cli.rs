use std::convert::Infallible;

use clap::Parser;
use ctxlog::{Format, Level};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArgError {
    #[error("invalid param: {0}")]
    InvalidParam(String),
}

#[derive(Parser, Debug, Clone)]
#[command(name = "ctxlog")]
pub struct Args {
    /// Minimum level written. Falls back to LOG_LEVEL, then info.
    #[arg(long, value_parser = parse_level)]
    pub level: Option<Level>,

    /// Level of the emitted record.
    #[arg(long, default_value = "info", value_parser = parse_level)]
    pub at: Level,

    /// Output format: json or line. Falls back to LOG_FORMAT, then json.
    #[arg(long, value_parser = parse_format)]
    pub format: Option<Format>,

    /// Extra field as key=value (repeatable).
    #[arg(long = "param", short = 'p', value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// Diagnostics level (stderr). Also supports RUST_LOG.
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Message words, joined with single spaces.
    #[arg(required = true)]
    pub message: Vec<String>,
}

fn parse_level(s: &str) -> Result<Level, Infallible> {
    Ok(Level::parse(s))
}

fn parse_format(s: &str) -> Result<Format, Infallible> {
    Ok(Format::parse(s))
}

fn parse_param(s: &str) -> Result<(String, String), ArgError> {
    match s.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
        _ => Err(ArgError::InvalidParam(format!("expected key=value, got {s:?}"))),
    }
}

/// Numbers, booleans and null keep their JSON type; anything else is a string.
pub fn param_value(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(v @ (Value::Number(_) | Value::Bool(_) | Value::Null)) => v,
        _ => Value::from(raw),
    }
}
