//! Publish date normalization.
//!
//! Feeds in the wild use a handful of date formats. [`normalize_pub_date`]
//! tries a fixed list of layouts in order and returns the first match,
//! converted to UTC. The order only matters for strings that more than one
//! layout accepts; the first success wins.
//!
//! Four-digit years are written without a sign, and a result whose UTC year
//! leaves 0000..=9999 is rejected so stored timestamps stay fixed width.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDateTime, TimeZone, Utc};

use crate::{GatorError, Result};

/// A supported publish date layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateLayout {
    /// `Mon, 02 Jan 2006 15:04:05 -0700`
    Rfc1123Z,
    /// `Mon, 02 Jan 2006 15:04:05 MST`
    Rfc1123,
    /// `02 Jan 06 15:04 -0700`
    Rfc822Z,
    /// `02 Jan 06 15:04 MST`
    Rfc822,
    /// `2006-01-02T15:04:05Z07:00`
    Iso8601,
    /// `2006-01-02 15:04:05`, read as UTC
    Plain,
    /// `Mon, 2 Jan 2006 15:04:05 -0700`
    Rfc1123ZUnpadded,
    /// `Mon, 2 Jan 2006 15:04:05 MST`
    Rfc1123Unpadded,
}

/// Layouts in the order they are tried.
pub const LAYOUTS: [DateLayout; 8] = [
    DateLayout::Rfc1123Z,
    DateLayout::Rfc1123,
    DateLayout::Rfc822Z,
    DateLayout::Rfc822,
    DateLayout::Iso8601,
    DateLayout::Plain,
    DateLayout::Rfc1123ZUnpadded,
    DateLayout::Rfc1123Unpadded,
];

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

impl DateLayout {
    /// Reference rendering of the layout.
    pub fn example(&self) -> &'static str {
        match self {
            DateLayout::Rfc1123Z => "Mon, 02 Jan 2006 15:04:05 -0700",
            DateLayout::Rfc1123 => "Mon, 02 Jan 2006 15:04:05 MST",
            DateLayout::Rfc822Z => "02 Jan 06 15:04 -0700",
            DateLayout::Rfc822 => "02 Jan 06 15:04 MST",
            DateLayout::Iso8601 => "2006-01-02T15:04:05Z07:00",
            DateLayout::Plain => "2006-01-02 15:04:05",
            DateLayout::Rfc1123ZUnpadded => "Mon, 2 Jan 2006 15:04:05 -0700",
            DateLayout::Rfc1123Unpadded => "Mon, 2 Jan 2006 15:04:05 MST",
        }
    }

    /// Parse `s` with this layout only.
    pub fn parse(&self, s: &str) -> Option<DateTime<Utc>> {
        match self {
            DateLayout::Rfc1123Z => {
                parse_numeric_zone(rfc1123_body(s, true)?, "%d %b %Y %H:%M:%S %z")
            }
            DateLayout::Rfc1123 => parse_named_zone(rfc1123_body(s, true)?, "%d %b %Y %H:%M:%S"),
            DateLayout::Rfc822Z => parse_numeric_zone(day_padded(s, true)?, "%d %b %y %H:%M %z"),
            DateLayout::Rfc822 => parse_named_zone(day_padded(s, true)?, "%d %b %y %H:%M"),
            DateLayout::Iso8601 => DateTime::parse_from_rfc3339(leading_year(s)?)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            DateLayout::Plain => {
                NaiveDateTime::parse_from_str(leading_year(s)?, "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(|naive| naive.and_utc())
            }
            DateLayout::Rfc1123ZUnpadded => {
                parse_numeric_zone(rfc1123_body(s, false)?, "%d %b %Y %H:%M:%S %z")
            }
            DateLayout::Rfc1123Unpadded => {
                parse_named_zone(rfc1123_body(s, false)?, "%d %b %Y %H:%M:%S")
            }
        }
    }
}

/// Normalize a feed publish date to UTC.
///
/// Fails with [`GatorError::DateParse`] carrying the original string when
/// no layout matches.
pub fn normalize_pub_date(raw: &str) -> Result<DateTime<Utc>> {
    match_layout(raw)
        .map(|(_, dt)| dt)
        .ok_or_else(|| GatorError::DateParse(raw.to_string()))
}

/// Find the first layout that accepts `raw`.
pub fn match_layout(raw: &str) -> Option<(DateLayout, DateTime<Utc>)> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    LAYOUTS
        .iter()
        .find_map(|layout| {
            layout
                .parse(s)
                .filter(storable_year)
                .map(|dt| (*layout, dt))
        })
}

fn storable_year(dt: &DateTime<Utc>) -> bool {
    (0..=9999).contains(&dt.year())
}

fn is_year(token: &str) -> bool {
    token.len() == 4 && token.bytes().all(|b| b.is_ascii_digit())
}

/// `s` without its weekday, once the day width and the year are checked.
fn rfc1123_body(s: &str, padded: bool) -> Option<&str> {
    let body = day_padded(strip_weekday(s)?, padded)?;
    is_year(body.split(' ').nth(2)?).then_some(body)
}

/// Require `YYYY-` at the start of `s`.
fn leading_year(s: &str) -> Option<&str> {
    let (year, _) = s.split_once('-')?;
    is_year(year).then_some(s)
}

/// Drop a leading `Mon, ` weekday. The weekday is not checked against the date.
fn strip_weekday(s: &str) -> Option<&str> {
    let (weekday, rest) = s.split_once(", ")?;
    WEEKDAYS
        .iter()
        .any(|day| day.eq_ignore_ascii_case(weekday))
        .then_some(rest)
}

/// Check the day-of-month token width: exactly two digits when padded, one
/// or two otherwise.
fn day_padded(s: &str, padded: bool) -> Option<&str> {
    let day = s.split(' ').next()?;
    if !day.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let ok = if padded {
        day.len() == 2
    } else {
        (1..=2).contains(&day.len())
    };
    ok.then_some(s)
}

/// Parse a date ending in a `-0700` offset. `-07:00` is not accepted.
fn parse_numeric_zone(s: &str, format: &str) -> Option<DateTime<Utc>> {
    let (_, zone) = s.rsplit_once(' ')?;
    let zone = zone.as_bytes();
    let signed = matches!(zone.first(), Some(b'+' | b'-'));
    if zone.len() != 5 || !signed || !zone[1..].iter().all(u8::is_ascii_digit) {
        return None;
    }
    DateTime::parse_from_str(s, format)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a date whose last token is an alphabetic zone abbreviation.
fn parse_named_zone(s: &str, format: &str) -> Option<DateTime<Utc>> {
    let (datetime, zone) = s.rsplit_once(' ')?;
    let offset_secs = zone_offset_secs(zone)?;
    let naive = NaiveDateTime::parse_from_str(datetime, format).ok()?;
    FixedOffset::east_opt(offset_secs)?
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Offset for an RFC 822 zone name. Other alphabetic abbreviations are
/// accepted and read as UTC.
fn zone_offset_secs(zone: &str) -> Option<i32> {
    if zone.is_empty() || zone.len() > 5 || !zone.bytes().all(|b| b.is_ascii_alphabetic()) {
        return None;
    }
    let hours = match zone.to_ascii_uppercase().as_str() {
        "EDT" => -4,
        "EST" | "CDT" => -5,
        "CST" | "MDT" => -6,
        "MST" | "PDT" => -7,
        "PST" => -8,
        _ => 0,
    };
    Some(hours * 3600)
}
