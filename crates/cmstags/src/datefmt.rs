// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Date helpers shared by `[field:...]` functions and the generic stage.
//!
//! Templates write formats with PHP-style letters (`Y-m-d H:i:s`). They are
//! translated to strftime one character at a time:
//!
//! | token | meaning          | strftime |
//! |-------|------------------|----------|
//! | `Y`   | four-digit year  | `%Y`     |
//! | `m`   | month, 01-12     | `%m`     |
//! | `d`   | day, 01-31       | `%d`     |
//! | `H`   | hour, 00-23      | `%H`     |
//! | `i`   | minute, 00-59    | `%M`     |
//! | `s`   | second, 00-59    | `%S`     |
//!
//! Every other character is copied literally.

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde_json::Value as JsonValue;

/// Canonical text form of a timestamp.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Translates a PHP-style date format into a strftime pattern.
pub fn php_to_strftime(format: &str) -> String {
    let mut out = String::with_capacity(format.len() * 2);
    for ch in format.chars() {
        match ch {
            'Y' => out.push_str("%Y"),
            'm' => out.push_str("%m"),
            'd' => out.push_str("%d"),
            'H' => out.push_str("%H"),
            'i' => out.push_str("%M"),
            's' => out.push_str("%S"),
            '%' => out.push_str("%%"),
            other => out.push(other),
        }
    }
    out
}

/// Formats a time with a PHP-style format.
pub fn format_php(time: &DateTime<Local>, format: &str) -> String {
    time.format(&php_to_strftime(format)).to_string()
}

/// Local time of a unix timestamp.
pub fn from_unix(secs: i64) -> Option<DateTime<Local>> {
    Local.timestamp_opt(secs, 0).single()
}

/// Parses `YYYY-mm-dd HH:MM:SS` (or a bare `YYYY-mm-dd`) as local time.
pub fn parse_datetime(text: &str) -> Option<DateTime<Local>> {
    let text = text.trim();
    let naive = NaiveDateTime::parse_from_str(text, DATETIME_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
    Local.from_local_datetime(&naive).earliest()
}

/// Reads a JSON value as a time: integers are unix seconds, strings are
/// either all digits (unix seconds) or `YYYY-mm-dd HH:MM:SS`.
pub fn time_from_json(value: &JsonValue) -> Option<DateTime<Local>> {
    match value {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .and_then(from_unix),
        JsonValue::String(s) => {
            let trimmed = s.trim();
            if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
                trimmed.parse().ok().and_then(from_unix)
            } else {
                parse_datetime(trimmed)
            }
        }
        _ => None,
    }
}

/// Parses a duration such as `1h30m`, `-15m`, `2.5s` or `300ms`.
///
/// Units are `h`, `m`, `s`, `ms`, `us` (or `µs`) and `ns`; a sign may lead
/// and every number may carry a fraction. `0` alone is accepted.
pub fn parse_duration(text: &str) -> Option<Duration> {
    let text = text.trim();
    let (negative, mut rest) = match text.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    if rest == "0" {
        return Some(Duration::zero());
    }
    if rest.is_empty() {
        return None;
    }

    let mut total_nanos: f64 = 0.0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return None;
        }
        let number: f64 = rest[..number_len].parse().ok()?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit_nanos = match &rest[..unit_len] {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60.0 * 1e9,
            "h" => 3600.0 * 1e9,
            _ => return None,
        };
        rest = &rest[unit_len..];
        total_nanos += number * unit_nanos;
    }

    let nanos = if negative { -total_nanos } else { total_nanos };
    Some(Duration::nanoseconds(nanos.round() as i64))
}
