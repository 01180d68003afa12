use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use crate::leaderboard::Movement;
use crate::scoring::factors::FactorLabel;
use crate::scoring::ClassificationSource;

pub fn to_u8(value: i64, field: &str) -> Result<u8> {
    u8::try_from(value).map_err(|_| anyhow!("{field} contains out-of-range value {value}"))
}

pub fn to_i64(value: usize) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_source(value: &str) -> Result<ClassificationSource> {
    ClassificationSource::parse(value)
        .ok_or_else(|| anyhow!("unknown classification source {value}"))
}

pub fn parse_movement(value: &str) -> Result<Movement> {
    Movement::parse(value).ok_or_else(|| anyhow!("unknown leaderboard movement {value}"))
}

pub fn parse_optional_label<T: FactorLabel>(value: Option<String>, field: &str) -> Result<Option<T>> {
    match value {
        Some(raw) => T::parse_label(&raw)
            .map(Some)
            .ok_or_else(|| anyhow!("unknown {field} label {raw}")),
        None => Ok(None),
    }
}
