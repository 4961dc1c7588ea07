// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! Function library of the generic stage.
//!
//! Every helper is a global function (`{{ substr(Fields.title, 0, 10) }}`),
//! never a filter, so the builtin minijinja filters keep their meaning.
//!
//! ## Coercion
//!
//! Numeric helpers accept integers, floats and numeric strings; anything
//! else counts as `0`. Division or modulo by zero yields `0`. Integral
//! results are returned as integers, so `add(1, 2)` prints `3`.
//!
//! Date helpers accept unix seconds or `YYYY-mm-dd HH:MM:SS` strings and
//! return the same string form. Formats use the PHP-style letters described
//! in [`datefmt`](crate::datefmt); durations use `1h30m` syntax.
//!
//! `and`, `or`, `not` and `if` are operators of the template syntax itself,
//! so the conditional helper is `ifelse(cond, a, b)`.

use crate::datefmt;
use chrono::{DateTime, Local};
use lazy_static::lazy_static;
use minijinja::value::{Value, ValueKind};
use minijinja::{Environment, HtmlEscape};
use regex::Regex;
use std::cmp::Ordering;

lazy_static! {
    static ref TAGS: Regex = Regex::new(r"<[^>]*>").unwrap();
}

/// Registers the whole library on `env`.
pub fn register_functions(env: &mut Environment<'static>) {
    // strings
    env.add_function("html", html);
    env.add_function("url", url_encode);
    env.add_function("js", js);
    env.add_function("lower", |v: Value| text(&v).to_lowercase());
    env.add_function("upper", |v: Value| text(&v).to_uppercase());
    env.add_function("trim", |v: Value| text(&v).trim().to_string());
    env.add_function("substr", substr);
    env.add_function("replace", replace);
    env.add_function("contains", |s: Value, sub: Value| text(&s).contains(&text(&sub)));
    env.add_function("hasPrefix", |s: Value, p: Value| text(&s).starts_with(&text(&p)));
    env.add_function("hasSuffix", |s: Value, p: Value| text(&s).ends_with(&text(&p)));
    env.add_function("split", split);
    env.add_function("join", join);
    env.add_function("stripTags", strip_tags);
    env.add_function("truncate", truncate);
    env.add_function("nl2br", nl2br);
    env.add_function("urlEncode", url_encode);
    env.add_function("urlDecode", |v: Value| url_decode(&text(&v)));
    env.add_function("htmlDecode", |v: Value| Value::from_safe_string(text(&v)));

    // numbers
    env.add_function("add", |a: Value, b: Value| number(to_number(&a) + to_number(&b)));
    env.add_function("sub", |a: Value, b: Value| number(to_number(&a) - to_number(&b)));
    env.add_function("mul", |a: Value, b: Value| number(to_number(&a) * to_number(&b)));
    env.add_function("div", div);
    env.add_function("mod", modulo);
    env.add_function("round", round);
    env.add_function("floor", |a: Value| number(to_number(&a).floor()));
    env.add_function("ceil", |a: Value| number(to_number(&a).ceil()));
    env.add_function("max", |a: Value, b: Value| number(to_number(&a).max(to_number(&b))));
    env.add_function("min", |a: Value, b: Value| number(to_number(&a).min(to_number(&b))));
    env.add_function("abs", |a: Value| number(to_number(&a).abs()));
    env.add_function("formatNum", |a: Value, format: Value| {
        format_number(to_number(&a), &text(&format))
    });

    // dates
    env.add_function("now", || datefmt_string(&Local::now()));
    env.add_function("date", date);
    env.add_function("dateAdd", |t: Value, d: Value| shift_date(&t, &d, false));
    env.add_function("dateSub", |t: Value, d: Value| shift_date(&t, &d, true));
    env.add_function("dateCompare", date_compare);
    env.add_function("timestamp", timestamp);

    // comparisons
    env.add_function("eq", |a: Value, b: Value| a == b);
    env.add_function("ne", |a: Value, b: Value| a != b);
    env.add_function("lt", |a: Value, b: Value| to_number(&a) < to_number(&b));
    env.add_function("le", |a: Value, b: Value| to_number(&a) <= to_number(&b));
    env.add_function("gt", |a: Value, b: Value| to_number(&a) > to_number(&b));
    env.add_function("ge", |a: Value, b: Value| to_number(&a) >= to_number(&b));
    env.add_function("ifelse", |cond: Value, a: Value, b: Value| {
        if cond.is_true() {
            a
        } else {
            b
        }
    });

    // sequences
    env.add_function("first", |v: Value| nth(&v, |len| (len > 0).then_some(0)));
    env.add_function("last", |v: Value| nth(&v, |len| len.checked_sub(1)));
    env.add_function("slice", slice);
    env.add_function("inArray", in_array);
    env.add_function("length", length);

    // other
    env.add_function("default", default);
    env.add_function("raw", |v: Value| Value::from_safe_string(text(&v)));
}

/// Text form of a value; undefined and none are empty.
pub fn text(value: &Value) -> String {
    if value.is_undefined() || value.is_none() {
        return String::new();
    }
    match value.as_str() {
        Some(s) => s.to_string(),
        None => value.to_string(),
    }
}

/// Numeric form of a value; non-numeric input is `0`.
pub fn to_number(value: &Value) -> f64 {
    match value.kind() {
        ValueKind::Number => f64::try_from(value.clone()).unwrap_or(0.0),
        ValueKind::String => value
            .as_str()
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Wraps a float, keeping integral values integral.
pub fn number(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::from(n as i64)
    } else {
        Value::from(n)
    }
}

fn html(value: Value) -> Value {
    Value::from_safe_string(HtmlEscape(&text(&value)).to_string())
}

fn url_encode(value: Value) -> String {
    form_urlencoded::byte_serialize(text(&value).as_bytes()).collect()
}

/// Form decoding with `+` as space. Malformed escapes stay literal; `&`
/// and `=` are plain characters here, not pair separators.
fn url_decode(input: &str) -> String {
    let escaped = input.replace('&', "%26").replace('=', "%3D");
    form_urlencoded::parse(escaped.as_bytes())
        .next()
        .map(|(decoded, _)| decoded.into_owned())
        .unwrap_or_default()
}

fn js(value: Value) -> String {
    let mut out = String::new();
    for ch in text(&value).chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '<' | '>' | '&' | '=' => out.push_str(&format!("\\u{:04X}", ch as u32)),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

fn substr(s: Value, start: Value, len: Value) -> String {
    let chars: Vec<char> = text(&s).chars().collect();
    let start = (to_number(&start) as i64).max(0) as usize;
    if start > chars.len() {
        return String::new();
    }
    let len = (to_number(&len) as i64).max(0) as usize;
    let end = start.saturating_add(len).min(chars.len());
    chars[start..end].iter().collect()
}

fn replace(s: Value, old: Value, new: Value, n: Option<Value>) -> String {
    let (s, old, new) = (text(&s), text(&old), text(&new));
    match n.map(|n| to_number(&n) as i64) {
        Some(n) if n >= 0 => s.replacen(&old, &new, n as usize),
        _ => s.replace(&old, &new),
    }
}

fn split(s: Value, sep: Value) -> Vec<String> {
    let (s, sep) = (text(&s), text(&sep));
    if sep.is_empty() {
        return s.chars().map(String::from).collect();
    }
    s.split(sep.as_str()).map(String::from).collect()
}

fn join(list: Value, sep: Value) -> String {
    let sep = text(&sep);
    match list.try_iter() {
        Ok(items) => items.map(|item| text(&item)).collect::<Vec<_>>().join(&sep),
        Err(_) => text(&list),
    }
}

fn strip_tags(value: Value) -> String {
    TAGS.replace_all(&text(&value), "").into_owned()
}

fn truncate(s: Value, len: Value) -> String {
    let s = text(&s);
    let len = (to_number(&len) as i64).max(0) as usize;
    if s.chars().count() <= len {
        return s;
    }
    let mut cut: String = s.chars().take(len).collect();
    cut.push_str("...");
    cut
}

fn nl2br(value: Value) -> Value {
    let escaped = HtmlEscape(&text(&value)).to_string();
    Value::from_safe_string(escaped.replace('\n', "<br>"))
}

fn div(a: Value, b: Value) -> Value {
    let b = to_number(&b);
    if b == 0.0 {
        return Value::from(0);
    }
    number(to_number(&a) / b)
}

fn modulo(a: Value, b: Value) -> Value {
    let b = to_number(&b);
    if b == 0.0 {
        return Value::from(0);
    }
    number(to_number(&a) % b)
}

fn round(a: Value, precision: Option<Value>) -> Value {
    let precision = precision.map(|p| to_number(&p) as i32).unwrap_or(0);
    let scale = 10f64.powi(precision);
    number((to_number(&a) * scale).round() / scale)
}

/// Reads a value as local time.
pub fn to_time(value: &Value) -> Option<DateTime<Local>> {
    match value.kind() {
        ValueKind::Number => match value.as_i64() {
            Some(secs) => datefmt::from_unix(secs),
            None => datefmt::from_unix(to_number(value) as i64),
        },
        ValueKind::String => value
            .as_str()
            .and_then(|s| datefmt::time_from_json(&serde_json::Value::String(s.to_string()))),
        _ => None,
    }
}

fn datefmt_string(time: &DateTime<Local>) -> String {
    time.format(datefmt::DATETIME_FORMAT).to_string()
}

fn date(t: Value, format: Value) -> String {
    match to_time(&t) {
        Some(time) => datefmt::format_php(&time, &text(&format)),
        None => String::new(),
    }
}

fn shift_date(t: &Value, d: &Value, backwards: bool) -> String {
    let Some(time) = to_time(t) else {
        return datefmt_string(&Local::now());
    };
    let shifted = match datefmt::parse_duration(&text(d)) {
        Some(delta) if backwards => time - delta,
        Some(delta) => time + delta,
        None => time,
    };
    datefmt_string(&shifted)
}

fn date_compare(a: Value, b: Value) -> i64 {
    match (to_time(&a), to_time(&b)) {
        (Some(a), Some(b)) => match a.cmp(&b) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        },
        _ => 0,
    }
}

fn timestamp(t: Option<Value>) -> i64 {
    match t {
        Some(v) if v.kind() == ValueKind::String => to_time(&v).map_or(0, |t| t.timestamp()),
        Some(v) if v.kind() == ValueKind::Number => to_number(&v) as i64,
        _ => Local::now().timestamp(),
    }
}

fn is_sequence(value: &Value) -> bool {
    matches!(value.kind(), ValueKind::Seq | ValueKind::Iterable)
}

fn items(value: &Value) -> Vec<Value> {
    if !is_sequence(value) {
        return Vec::new();
    }
    value.try_iter().map(|iter| iter.collect()).unwrap_or_default()
}

fn nth(value: &Value, pick: impl Fn(usize) -> Option<usize>) -> Value {
    let items = items(value);
    pick(items.len())
        .and_then(|i| items.get(i).cloned())
        .unwrap_or_else(|| Value::from(()))
}

fn slice(value: Value, start: Value, end: Value) -> Value {
    if !is_sequence(&value) {
        return Value::from(());
    }
    let items = items(&value);
    let start = (to_number(&start) as i64).max(0) as usize;
    let end = ((to_number(&end) as i64).max(0) as usize).min(items.len());
    if start > end {
        return Value::from(());
    }
    Value::from(items[start..end].to_vec())
}

fn in_array(needle: Value, haystack: Value) -> bool {
    items(&haystack).iter().any(|item| *item == needle)
}

fn length(value: Value) -> usize {
    match value.kind() {
        ValueKind::Seq | ValueKind::Map | ValueKind::String => value.len().unwrap_or(0),
        ValueKind::Iterable => items(&value).len(),
        _ => 0,
    }
}

fn default(value: Value, fallback: Value) -> Value {
    let empty = match value.kind() {
        ValueKind::Undefined | ValueKind::None => true,
        ValueKind::String => value.as_str().is_some_and(str::is_empty),
        ValueKind::Number => to_number(&value) == 0.0,
        ValueKind::Bool => !value.is_true(),
        ValueKind::Seq | ValueKind::Map => value.len() == Some(0),
        _ => false,
    };
    if empty {
        fallback
    } else {
        value
    }
}

/// Upper bound for widths and precisions in [`format_number`].
const MAX_FIELD: usize = 256;

/// printf-style formatting of one number.
///
/// Supports the `-`, `0` and `+` flags, a width, a precision and the verbs
/// `f`, `e`, `d`, `g`, `v` and `s`. Unknown verbs are copied literally.
/// Widths and precisions above 256 are clamped.
pub fn format_number(n: f64, format: &str) -> String {
    let mut out = String::new();
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }

        let (mut left, mut zero, mut plus) = (false, false, false);
        while let Some(&flag) = chars.peek() {
            match flag {
                '-' => left = true,
                '0' => zero = true,
                '+' => plus = true,
                _ => break,
            }
            chars.next();
        }
        let mut width = 0usize;
        while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
            width = width.saturating_mul(10).saturating_add(d as usize);
            chars.next();
        }
        let width = width.min(MAX_FIELD);
        let mut precision = None;
        if chars.peek() == Some(&'.') {
            chars.next();
            let mut p = 0usize;
            while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                p = p.saturating_mul(10).saturating_add(d as usize);
                chars.next();
            }
            precision = Some(p.min(MAX_FIELD));
        }

        let Some(verb) = chars.next() else {
            out.push('%');
            break;
        };
        let body = match verb {
            '%' => {
                out.push('%');
                continue;
            }
            'f' | 'F' => format!("{:.*}", precision.unwrap_or(6), n),
            'e' => exponent(n, precision.unwrap_or(6)),
            'd' => format!("{}", n.trunc() as i64),
            'g' | 'v' | 's' => number(n).to_string(),
            other => {
                out.push('%');
                out.push(other);
                continue;
            }
        };
        let body = if plus && n >= 0.0 { format!("+{}", body) } else { body };
        out.push_str(&pad(body, width, left, zero));
    }
    out
}

fn exponent(n: f64, precision: usize) -> String {
    let formatted = format!("{:.*e}", precision, n);
    match formatted.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => formatted,
    }
}

fn pad(body: String, width: usize, left: bool, zero: bool) -> String {
    let len = body.chars().count();
    if len >= width {
        return body;
    }
    let fill = width - len;
    if left {
        format!("{}{}", body, " ".repeat(fill))
    } else if zero {
        let (sign, digits) = match body.chars().next() {
            Some(s @ ('-' | '+')) => (s.to_string(), &body[1..]),
            _ => (String::new(), body.as_str()),
        };
        format!("{}{}{}", sign, "0".repeat(fill), digits)
    } else {
        format!("{}{}", " ".repeat(fill), body)
    }
}
