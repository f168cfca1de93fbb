// src/utils/text.rs

//! Display-text parsing helpers.
//!
//! The platform renders ages, durations and counts as English display
//! strings ("3 weeks ago", "1:02:03", "2 minutes, 5 seconds"). These helpers
//! turn them into numbers the pager can compare against limits.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Keywords marking a stream that has not started yet.
pub const UPCOMING_KEYWORDS: [&str; 4] = ["scheduled", "premieres", "waiting", "upcoming"];

static RELATIVE_AGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*(second|minute|hour|day|week|month|year)s?\b").expect("valid regex")
});

static CLOCK_DURATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?::\d{1,2}){0,2}$").expect("valid regex"));

static LABEL_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*(hour|minute|second)s?\b").expect("valid regex")
});

/// Approximate age in whole days of a relative time text such as
/// "Streamed 3 weeks ago". Sub-day units count as zero days.
pub fn parse_relative_age_days(text: &str) -> Option<u32> {
    let caps = RELATIVE_AGE.captures(text)?;
    let amount: u32 = caps[1].parse().ok()?;
    let unit_days = match caps[2].to_ascii_lowercase().as_str() {
        "second" | "minute" | "hour" => 0,
        "day" => 1,
        "week" => 7,
        "month" => 30,
        "year" => 365,
        _ => return None,
    };
    Some(amount.saturating_mul(unit_days))
}

/// Length in seconds of a clock text ("1:02:03", "4:05") or an
/// accessibility label ("1 hour, 2 minutes, 3 seconds").
pub fn parse_duration_secs(text: &str) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if CLOCK_DURATION.is_match(text) {
        return text
            .split(':')
            .try_fold(0u32, |acc, part| {
                acc.checked_mul(60)?.checked_add(part.parse::<u32>().ok()?)
            });
    }

    let mut total = 0u32;
    let mut matched = false;
    for caps in LABEL_DURATION.captures_iter(text) {
        let amount: u32 = caps[1].parse().ok()?;
        let unit = match caps[2].to_ascii_lowercase().as_str() {
            "hour" => 3600,
            "minute" => 60,
            _ => 1,
        };
        total = total.checked_add(amount.checked_mul(unit)?)?;
        matched = true;
    }
    matched.then_some(total)
}

/// Whether a relative time text describes a scheduled/premiering stream.
pub fn is_upcoming(text: &str) -> bool {
    let lower = text.to_lowercase();
    UPCOMING_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Text of a formatted-string node.
///
/// Multi-run text (`runs`) wins over `simpleText`; view-model nodes carry a
/// plain `content` string instead.
pub fn json_text(node: &Value) -> Option<String> {
    let text = if let Some(runs) = node.get("runs").and_then(Value::as_array) {
        runs.iter()
            .filter_map(|run| run.get("text").and_then(Value::as_str))
            .collect::<String>()
    } else if let Some(simple) = node.get("simpleText").and_then(Value::as_str) {
        simple.to_string()
    } else if let Some(content) = node.get("content").and_then(Value::as_str) {
        content.to_string()
    } else {
        node.as_str()?.to_string()
    };

    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Accessibility label attached to a formatted-string node.
pub fn accessibility_label(node: &Value) -> Option<String> {
    node.pointer("/accessibility/accessibilityData/label")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
