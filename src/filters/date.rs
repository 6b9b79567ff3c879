//! Date parsing for the `parseDate` filter
//!
//! Layouts containing `%` are strftime patterns. Anything else is a Go-style
//! reference layout (`Mon Jan 2 15:04:05 MST 2006`), which older templates
//! use. Missing time defaults to midnight, missing offset to UTC. A missing
//! month or day is 1 and a missing year is 0, so time-only layouts parse to
//! January 1st of year 0.

use std::sync::LazyLock;

use chrono::format::{self, Fixed, Item, Numeric, Pad, Parsed, StrftimeItems};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};

use crate::error::{Result, ScrapeError};

// Longest tokens first where one is a prefix of another
// chrono only exposes its permissive offset parser through the `%#z` specifier
static REFERENCE_TOKENS: LazyLock<Vec<(&str, Item<'static>)>> = LazyLock::new(|| vec![
    ("January", Item::Fixed(Fixed::LongMonthName)),
    ("Jan", Item::Fixed(Fixed::ShortMonthName)),
    ("Monday", Item::Fixed(Fixed::LongWeekdayName)),
    ("Mon", Item::Fixed(Fixed::ShortWeekdayName)),
    ("MST", Item::Fixed(Fixed::TimezoneName)),
    ("2006", Item::Numeric(Numeric::Year, Pad::Zero)),
    ("01", Item::Numeric(Numeric::Month, Pad::Zero)),
    ("02", Item::Numeric(Numeric::Day, Pad::Zero)),
    ("03", Item::Numeric(Numeric::Hour12, Pad::Zero)),
    ("04", Item::Numeric(Numeric::Minute, Pad::Zero)),
    ("05", Item::Numeric(Numeric::Second, Pad::Zero)),
    ("06", Item::Numeric(Numeric::YearMod100, Pad::Zero)),
    ("_2", Item::Numeric(Numeric::Day, Pad::Space)),
    ("15", Item::Numeric(Numeric::Hour, Pad::Zero)),
    ("1", Item::Numeric(Numeric::Month, Pad::None)),
    ("2", Item::Numeric(Numeric::Day, Pad::None)),
    ("3", Item::Numeric(Numeric::Hour12, Pad::None)),
    ("4", Item::Numeric(Numeric::Minute, Pad::None)),
    ("5", Item::Numeric(Numeric::Second, Pad::None)),
    ("PM", Item::Fixed(Fixed::UpperAmPm)),
    ("pm", Item::Fixed(Fixed::LowerAmPm)),
    ("-07:00", Item::Fixed(Fixed::TimezoneOffsetColon)),
    ("-0700", Item::Fixed(Fixed::TimezoneOffset)),
    ("-07", StrftimeItems::new("%#z").next().expect("%#z yields an item")),
    ("Z07:00", Item::Fixed(Fixed::TimezoneOffsetColonZ)),
    ("Z0700", Item::Fixed(Fixed::TimezoneOffsetZ)),
]);

/// Parse `input` according to `layout`
pub fn parse_date(input: &str, layout: &str) -> Result<DateTime<FixedOffset>> {
    let fail = |reason: String| ScrapeError::ParseDate {
        input: input.to_string(),
        layout: layout.to_string(),
        reason,
    };

    let mut parsed = Parsed::new();
    let outcome = if layout.contains('%') {
        format::parse(&mut parsed, input, StrftimeItems::new(layout))
    } else {
        format::parse(&mut parsed, input, reference_items(layout).iter())
    };
    outcome.map_err(|e| fail(e.to_string()))?;

    let date = naive_date(&parsed).map_err(|e| fail(e.to_string()))?;
    let time = parsed.to_naive_time().unwrap_or(NaiveTime::MIN);
    let offset = parsed.to_fixed_offset().unwrap_or_else(|_| Utc.fix());

    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .ok_or_else(|| fail("date out of range".to_string()))
}

/// Calendar date from the parsed fields, filling in month and day, then year
fn naive_date(parsed: &Parsed) -> format::ParseResult<NaiveDate> {
    let err = match parsed.to_naive_date() {
        Ok(date) => return Ok(date),
        Err(err) => err,
    };

    let mut filled = parsed.clone();
    let _ = filled.set_month(1);
    let _ = filled.set_day(1);
    if let Ok(date) = filled.to_naive_date() {
        return Ok(date);
    }
    let _ = filled.set_year(0);
    filled.to_naive_date().map_err(|_| err)
}

/// Translate a Go reference layout into chrono format items
fn reference_items(layout: &str) -> Vec<Item<'_>> {
    let mut items = Vec::new();
    let mut literal_start = 0;
    let mut pos = 0;

    while pos < layout.len() {
        let rest = &layout[pos..];
        let token = fraction_len(rest)
            .map(|len| (len, Item::Fixed(Fixed::Nanosecond)))
            .or_else(|| {
                REFERENCE_TOKENS
                    .iter()
                    .find(|(token, _)| rest.starts_with(token))
                    .map(|(token, item)| (token.len(), item.clone()))
            });

        match token {
            Some((len, item)) => {
                push_literal(&mut items, &layout[literal_start..pos]);
                items.push(item);
                pos += len;
                literal_start = pos;
            }
            None => pos += rest.chars().next().map_or(1, char::len_utf8),
        }
    }
    push_literal(&mut items, &layout[literal_start..]);

    items
}

/// `.000` / `.999` style fractional seconds
fn fraction_len(rest: &str) -> Option<usize> {
    let digits = rest.strip_prefix('.')?;
    let count = digits.chars().take_while(|c| *c == '0' || *c == '9').count();
    let followed_by_digit = digits[count..].starts_with(|c: char| c.is_ascii_digit());
    (count > 0 && !followed_by_digit).then_some(count + 1)
}

fn push_literal<'a>(items: &mut Vec<Item<'a>>, literal: &'a str) {
    let mut rest = literal;
    while let Some(first) = rest.chars().next() {
        let is_space = first.is_whitespace();
        let end = rest
            .find(|c: char| c.is_whitespace() != is_space)
            .unwrap_or(rest.len());
        let (run, tail) = rest.split_at(end);
        items.push(if is_space {
            Item::Space(run)
        } else {
            Item::Literal(run)
        });
        rest = tail;
    }
}
