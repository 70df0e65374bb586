//! `format` keyword and the built-in format validators.
//!
//! Validators accept non-string values; a format only constrains strings.
//! Unknown format names are ignored.

use crate::draft::{FormatFn, Keyword, has_keyword};
use crate::error::{ErrorKind, JsonError};
use crate::node::Node;
use crate::validate::EvalContext;
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

pub fn format() -> Keyword {
    Keyword::new("format").with_validate(has_keyword, validate_format)
}

fn validate_format(node: &Node, data: &Value, pointer: &str, _: &mut EvalContext<'_>) -> Vec<JsonError> {
    if !node.options().validate_formats {
        return Vec::new();
    }
    let Some(name) = node.keyword("format").and_then(Value::as_str) else {
        return Vec::new();
    };
    match node.draft().format(name) {
        Some(check) if !check(data) => {
            vec![node.error(ErrorKind::Format, pointer, data, json!({ "format": name }))]
        }
        _ => Vec::new(),
    }
}

/// Format validators registered on every built-in draft
pub(crate) fn builtin_formats() -> HashMap<String, FormatFn> {
    let checks: [(&str, fn(&str) -> bool); 14] = [
        ("date", is_date),
        ("date-time", is_date_time),
        ("time", is_time),
        ("duration", is_duration),
        ("email", is_email),
        ("hostname", is_hostname),
        ("ipv4", is_ipv4),
        ("ipv6", is_ipv6),
        ("uri", is_uri),
        ("uri-reference", is_uri_reference),
        ("uuid", is_uuid),
        ("regex", is_regex),
        ("json-pointer", is_json_pointer),
        ("relative-json-pointer", is_relative_json_pointer),
    ];
    checks
        .into_iter()
        .map(|(name, check)| {
            let validator: FormatFn = Arc::new(move |value: &Value| value.as_str().is_none_or(check));
            (name.to_string(), validator)
        })
        .collect()
}

static DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^P(?:\d+W|(?:\d+Y)?(?:\d+M)?(?:\d+D)?(?:T(?:\d+H)?(?:\d+M)?(?:\d+S)?)?)$")
        .expect("valid duration regex")
});

/// RFC 3339 `full-date`, zero padded
pub fn is_date(text: &str) -> bool {
    text.len() == 10
        && text.bytes().enumerate().all(|(index, byte)| match index {
            4 | 7 => byte == b'-',
            _ => byte.is_ascii_digit(),
        })
        && NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
}

/// RFC 3339 `full-time`
pub fn is_time(text: &str) -> bool {
    is_date_time(&format!("2000-01-01T{text}"))
}

/// RFC 3339 `date-time`. A leap second is only accepted at 23:59:60 UTC.
pub fn is_date_time(text: &str) -> bool {
    let text = text.to_ascii_uppercase();
    if !text.get(..10).is_some_and(is_date) || text.get(10..11) != Some("T") {
        return false;
    }
    let Ok(parsed) = DateTime::parse_from_rfc3339(&text) else {
        return false;
    };
    if text.get(17..19) == Some("60") {
        let utc = parsed.with_timezone(&Utc);
        return utc.hour() == 23 && utc.minute() == 59;
    }
    true
}

pub fn is_duration(text: &str) -> bool {
    DURATION.is_match(text) && text != "P" && !text.ends_with('T')
}

pub fn is_hostname(text: &str) -> bool {
    let host = text.strip_suffix('.').unwrap_or(text);
    if host.is_empty() || host.len() > 253 {
        return false;
    }
    host.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

pub fn is_email(text: &str) -> bool {
    let Some((local, domain)) = text.rsplit_once('@') else {
        return false;
    };
    if local.is_empty()
        || local.starts_with('.')
        || local.ends_with('.')
        || local.contains("..")
        || local.contains(char::is_whitespace)
    {
        return false;
    }
    match domain.strip_prefix('[').and_then(|d| d.strip_suffix(']')) {
        Some(literal) => match literal.strip_prefix("IPv6:") {
            Some(address) => is_ipv6(address),
            None => is_ipv4(literal),
        },
        None => is_hostname(domain),
    }
}

pub fn is_ipv4(text: &str) -> bool {
    text.parse::<Ipv4Addr>().is_ok()
}

pub fn is_ipv6(text: &str) -> bool {
    text.parse::<Ipv6Addr>().is_ok()
}

fn has_invalid_uri_chars(text: &str) -> bool {
    text.chars()
        .any(|c| c.is_whitespace() || matches!(c, '\\' | '"' | '<' | '>' | '^' | '`' | '{' | '|' | '}'))
}

pub fn is_uri(text: &str) -> bool {
    !has_invalid_uri_chars(text) && Url::parse(text).is_ok()
}

pub fn is_uri_reference(text: &str) -> bool {
    if has_invalid_uri_chars(text) {
        return false;
    }
    static BASE: Lazy<Option<Url>> = Lazy::new(|| Url::parse("http://example.com/").ok());
    Url::parse(text).is_ok() || BASE.as_ref().is_some_and(|base| base.join(text).is_ok())
}

/// Hyphenated form only
pub fn is_uuid(text: &str) -> bool {
    text.len() == 36 && Uuid::try_parse(text).is_ok()
}

pub fn is_regex(text: &str) -> bool {
    Regex::new(text).is_ok()
}

pub fn is_json_pointer(text: &str) -> bool {
    if text.is_empty() {
        return true;
    }
    if !text.starts_with('/') {
        return false;
    }
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '~' && !matches!(chars.next(), Some('0' | '1')) {
            return false;
        }
    }
    true
}

pub fn is_relative_json_pointer(text: &str) -> bool {
    let digits = text.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 || (digits > 1 && text.starts_with('0')) {
        return false;
    }
    let rest = &text[digits..];
    rest == "#" || is_json_pointer(rest)
}
