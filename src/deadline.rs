use std::sync::OnceLock;

use chrono::{
    DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, SubsecRound, TimeDelta,
    TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("could not resolve {input:?} into a point in time")]
    AmbiguousDeadline { input: String },
}

/// The outcome of a successful parse: an absolute instant plus the optional
/// quoted message that should accompany the delivery.
#[derive(Debug, PartialEq, Eq)]
pub struct ParsedReminder {
    pub deadline: DateTime<Utc>,
    pub body: Option<String>,
}

/// Splits `raw_text` into a time expression and an optional quoted body, then
/// resolves the expression against `zone`. Expressions without explicit zone
/// information are interpreted as local time in `zone`.
pub fn parse(raw_text: &str, zone: Tz) -> Result<ParsedReminder, ParseError> {
    parse_at(raw_text, zone, Utc::now())
}

pub(crate) fn parse_at(
    raw_text: &str,
    zone: Tz,
    now: DateTime<Utc>,
) -> Result<ParsedReminder, ParseError> {
    let (expression, body) = split_quoted(raw_text);
    let deadline = resolve_expression(expression.trim(), zone, now).ok_or_else(|| {
        ParseError::AmbiguousDeadline {
            input: raw_text.trim().to_owned(),
        }
    })?;

    // Whole-second resolution keeps the stored timestamp stable.
    Ok(ParsedReminder {
        deadline: deadline.trunc_subsecs(0),
        body,
    })
}

/// Separates a leading time expression from a trailing quoted segment. Both
/// straight and curly double quotes delimit the segment; the quotes themselves
/// are stripped from the returned body.
fn split_quoted(raw_text: &str) -> (&str, Option<String>) {
    static QUOTED: OnceLock<Regex> = OnceLock::new();
    let pattern = QUOTED
        .get_or_init(|| Regex::new(r#"^([^"“”]*)(["“”].*["“”])?"#).expect("quote pattern is valid"));

    match pattern.captures(raw_text) {
        Some(captures) => {
            let expression = captures.get(1).map_or("", |m| m.as_str());
            let body = captures.get(2).map(|m| strip_quotes(m.as_str()));
            (expression, body)
        }
        None => (raw_text, None),
    }
}

fn strip_quotes(segment: &str) -> String {
    let mut chars = segment.chars();
    chars.next();
    chars.next_back();
    chars.as_str().to_owned()
}

fn resolve_expression(expression: &str, zone: Tz, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let expression = expression.split_whitespace().collect::<Vec<_>>().join(" ");
    if expression.is_empty() {
        return None;
    }

    if expression.eq_ignore_ascii_case("now") {
        return Some(now);
    }

    if let Some(deadline) = resolve_relative(&expression, now) {
        return Some(deadline);
    }

    // Calendar expressions may carry their own zone as a trailing token,
    // which then overrides the configured default.
    let (expression, explicit_zone) = split_zone(&expression);
    let resolved_zone = explicit_zone.unwrap_or(zone);
    let local_now = now.with_timezone(&resolved_zone).naive_local();

    let naive = resolve_calendar(&expression.to_lowercase(), local_now)?;
    localize(naive, resolved_zone)
}

/// Relative durations: `in 1 hour`, `in 2 days and 30 minutes`,
/// `10 minutes from now`. Months and years move along the calendar instead of
/// assuming a fixed length.
fn resolve_relative(expression: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let lowered = expression.to_lowercase();
    let terms = lowered
        .strip_prefix("in ")
        .or_else(|| lowered.strip_suffix(" from now"))?;

    let mut months = 0u32;
    let mut delta = TimeDelta::zero();
    let mut matched = false;

    let mut tokens = terms
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|token| !token.is_empty() && *token != "and");
    while let Some(token) = tokens.next() {
        let amount: i64 = match token {
            "a" | "an" => 1,
            _ => token.parse().ok()?,
        };
        match tokens.next()? {
            "second" | "seconds" | "sec" | "secs" => {
                delta = delta.checked_add(&TimeDelta::try_seconds(amount)?)?
            }
            "minute" | "minutes" | "min" | "mins" => {
                delta = delta.checked_add(&TimeDelta::try_minutes(amount)?)?
            }
            "hour" | "hours" | "hr" | "hrs" => {
                delta = delta.checked_add(&TimeDelta::try_hours(amount)?)?
            }
            "day" | "days" => delta = delta.checked_add(&TimeDelta::try_days(amount)?)?,
            "week" | "weeks" => delta = delta.checked_add(&TimeDelta::try_weeks(amount)?)?,
            "month" | "months" => months = months.checked_add(u32::try_from(amount).ok()?)?,
            "year" | "years" => {
                let years = u32::try_from(amount).ok()?;
                months = months.checked_add(years.checked_mul(12)?)?;
            }
            _ => return None,
        }
        matched = true;
    }

    if !matched {
        return None;
    }
    now.checked_add_months(Months::new(months))?
        .checked_add_signed(delta)
}

/// Peels a trailing timezone token off the expression: `UTC`/`GMT` or an
/// IANA name such as `Europe/Stockholm`, matched in any casing.
fn split_zone(expression: &str) -> (String, Option<Tz>) {
    let Some((rest, last)) = expression.rsplit_once(' ') else {
        return (expression.to_owned(), None);
    };

    let zone = chrono_tz::TZ_VARIANTS
        .iter()
        .find(|zone| zone.name().eq_ignore_ascii_case(last))
        .copied();
    match zone {
        Some(zone) => (rest.to_owned(), Some(zone)),
        None => (expression.to_owned(), None),
    }
}

fn resolve_calendar(lowered: &str, local_now: NaiveDateTime) -> Option<NaiveDateTime> {
    resolve_day_keyword(lowered, local_now)
        .or_else(|| resolve_weekday(lowered, local_now))
        .or_else(|| resolve_absolute(lowered, local_now))
}

/// `today`/`tomorrow`, with an optional `at <time>`. Without a time the
/// current time of day carries over.
fn resolve_day_keyword(lowered: &str, local_now: NaiveDateTime) -> Option<NaiveDateTime> {
    let (keyword, rest) = match lowered.split_once(' ') {
        Some((keyword, rest)) => (keyword, Some(rest)),
        None => (lowered, None),
    };
    let days = match keyword {
        "today" => 0,
        "tomorrow" => 1,
        _ => return None,
    };

    let date = local_now.date().checked_add_days(Days::new(days))?;
    let time = match rest {
        Some(rest) => parse_time(rest.strip_prefix("at ").unwrap_or(rest))?,
        None => local_now.time(),
    };
    Some(date.and_time(time))
}

/// Weekday names resolve to their next strict occurrence: `on monday` said on
/// a Monday means a week ahead.
fn resolve_weekday(lowered: &str, local_now: NaiveDateTime) -> Option<NaiveDateTime> {
    let trimmed = lowered
        .strip_prefix("on ")
        .or_else(|| lowered.strip_prefix("next "))
        .unwrap_or(lowered);
    let (day_token, rest) = match trimmed.split_once(' ') {
        Some((day_token, rest)) => (day_token, Some(rest)),
        None => (trimmed, None),
    };
    let weekday: Weekday = day_token.parse().ok()?;

    let today = local_now.date();
    let mut days_ahead =
        (weekday.num_days_from_monday() + 7 - today.weekday().num_days_from_monday()) % 7;
    if days_ahead == 0 {
        days_ahead = 7;
    }

    let date = today.checked_add_days(Days::new(u64::from(days_ahead)))?;
    let time = match rest {
        Some(rest) => parse_time(rest.strip_prefix("at ").unwrap_or(rest))?,
        None => local_now.time(),
    };
    Some(date.and_time(time))
}

/// Fixed dates and datetimes, tried against a list of common layouts after
/// commas and the filler word `at` have been dropped. Date-only expressions
/// resolve to midnight, time-only expressions to today.
fn resolve_absolute(lowered: &str, local_now: NaiveDateTime) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
        "%B %d %Y %H:%M:%S",
        "%B %d %Y %H:%M",
        "%d %B %Y %H:%M:%S",
        "%d %B %Y %H:%M",
        "%B %d %Y %I:%M:%S %p",
        "%B %d %Y %I:%M %p",
        "%B %d %Y %I %p",
    ];
    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%B %d %Y", "%d %B %Y"];

    let cleaned = lowered.replace(',', " ");
    let cleaned = cleaned
        .split_whitespace()
        .filter(|token| *token != "at")
        .collect::<Vec<_>>()
        .join(" ");

    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(&cleaned, format) {
            return Some(parsed);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(&cleaned, format) {
            return parsed.and_hms_opt(0, 0, 0);
        }
    }
    parse_time(&cleaned).map(|time| local_now.date().and_time(time))
}

fn parse_time(token: &str) -> Option<NaiveTime> {
    const TIME_FORMATS: &[&str] = &[
        "%H:%M:%S",
        "%H:%M",
        "%I:%M:%S %p",
        "%I:%M %p",
        "%I:%M%p",
        "%I %p",
        "%I%p",
    ];

    let trimmed = token.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok())
}

/// Maps a wall-clock instant into `zone`, preferring the earlier instant when
/// a daylight-saving transition makes the mapping ambiguous.
fn localize(naive: NaiveDateTime, zone: Tz) -> Option<DateTime<Utc>> {
    zone.from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}
