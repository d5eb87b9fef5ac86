//! Classification of cleaned source lines.

use tracing::warn;

use super::lexer::{clean_line, Cleaned};
use super::{
    DaylightSavingRule, LeapLine, LinkLine, OffsetIndicator, RuleDay, RuleLine, RulePolicy,
    TzSource, ZoneLine,
};
use crate::datetime::{date_of_unix_time, days_since_unix_epoch, NTP_UNIX_DELTA, SECONDS_PER_DAY};
use crate::Error;

/// Streaming parser building a [`TzSource`] from the source files
#[derive(Debug, Default)]
pub struct SourceParser {
    /// Accumulated entities
    source: TzSource,
    /// Zone ID inherited by continuation lines
    open_zone: Option<String>,
    /// Set once the expiry annotation has been captured
    expiry_seen: bool,
}

impl SourceParser {
    /// Construct an empty parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the contents of one source file
    pub fn feed(&mut self, filename: &str, text: &str) -> Result<(), Error> {
        let capture_expiry = filename == "leap-seconds.list";

        for raw in text.lines() {
            match clean_line(raw, capture_expiry && !self.expiry_seen)? {
                Cleaned::Blank => {}
                Cleaned::Expiry(ntp) => {
                    self.source.expiry = date_of_unix_time(ntp - NTP_UNIX_DELTA);
                    self.expiry_seen = true;
                }
                Cleaned::Fields(fields) => self.classify(&fields)?,
            }
        }

        Ok(())
    }

    /// Freeze and return the accumulated source
    pub fn finish(self) -> TzSource {
        self.source
    }

    fn classify(&mut self, fields: &[String]) -> Result<(), Error> {
        match fields[0].as_str() {
            "Rule" => self.rule_line(fields),
            "Zone" => self.zone_line(fields),
            // A continuation line carries no keyword but inherits the open zone
            _ if self.open_zone.is_some() => self.continuation_line(fields),
            "Link" => self.link_line(fields),
            "Leap" => self.leap_line(fields),
            _ => Ok(()),
        }
    }

    fn rule_line(&mut self, fields: &[String]) -> Result<(), Error> {
        if fields.len() < 10 {
            return Err(line_error(fields, "rule line has too few fields"));
        }

        if fields[4] != "-" {
            warn!("ignoring rule line with filled type info: {}", fields.join(" "));
            return Ok(());
        }

        let from = if "minimum".starts_with(fields[2].as_str()) {
            i32::MIN
        } else {
            parse_field(fields, &fields[2])?
        };

        let to = if "maximum".starts_with(fields[3].as_str()) {
            i32::MAX
        } else if fields[3] == "only" {
            from
        } else {
            parse_field(fields, &fields[3])?
        };

        let month = parse_month(&fields[5]).map_err(|error| wrap_line(fields, error))?;
        let day = parse_day_spec(&fields[6]).map_err(|error| wrap_line(fields, error))?;
        let (time_of_day, indicator) =
            parse_time_of_day(&fields[7]).map_err(|error| wrap_line(fields, error))?;
        let saving = parse_offset(&fields[8]).map_err(|error| wrap_line(fields, error))?;
        let letter = if fields[9] == "-" { String::new() } else { fields[9].clone() };

        let line = RuleLine {
            name: fields[1].clone(),
            from,
            to,
            pattern: DaylightSavingRule::new(month, day, time_of_day, indicator, saving),
            letter,
        };

        let bucket = self.source.rules.entry(line.name.clone()).or_default();
        bucket.push(line);
        // Stable sort: lines firing at the same prototype instant keep their
        // insertion order.
        bucket.sort_by_key(RuleLine::prototype_instant);
        Ok(())
    }

    fn zone_line(&mut self, fields: &[String]) -> Result<(), Error> {
        if fields.len() < 2 {
            return Err(line_error(fields, "zone line has too few fields"));
        }

        let id = fields[1].clone();
        let era = parse_zone_era(fields, 2)?;
        self.open_zone = if era.is_last() { None } else { Some(id.clone()) };
        self.source.zones.insert(id, vec![era]);
        Ok(())
    }

    fn continuation_line(&mut self, fields: &[String]) -> Result<(), Error> {
        let era = parse_zone_era(fields, 0)?;
        let close = era.is_last();

        let id = match &self.open_zone {
            Some(id) => id.clone(),
            None => return Ok(()),
        };
        if let Some(eras) = self.source.zones.get_mut(&id) {
            eras.push(era);
        }
        if close {
            self.open_zone = None;
        }
        Ok(())
    }

    fn link_line(&mut self, fields: &[String]) -> Result<(), Error> {
        if fields.len() < 3 {
            return Err(line_error(fields, "link line has too few fields"));
        }

        // The file writes `Link CANONICAL ALIAS`; the entry is keyed by alias.
        self.source.links.push(LinkLine { alias: fields[2].clone(), target: fields[1].clone() });
        Ok(())
    }

    fn leap_line(&mut self, fields: &[String]) -> Result<(), Error> {
        if fields.len() < 7 {
            return Err(line_error(fields, "leap line has too few fields"));
        }

        let year = parse_field(fields, &fields[1])?;
        let month = parse_month(&fields[2]).map_err(|error| wrap_line(fields, error))?;
        let day = parse_field(fields, &fields[3])?;

        let shift = match fields[5].as_str() {
            "+" => {
                if fields[4] != "23:59:60" {
                    return Err(Error::LeapLine(format!("unexpected leap time: {}", fields.join(" "))));
                }
                1
            }
            "-" => {
                if fields[4] != "23:59:58" {
                    return Err(Error::LeapLine(format!("unexpected leap time: {}", fields.join(" "))));
                }
                -1
            }
            _ => {
                return Err(Error::LeapLine(format!("unexpected correction: {}", fields.join(" "))))
            }
        };

        if !"STATIONARY".starts_with(&fields[6].to_ascii_uppercase()) {
            return Err(Error::LeapLine(format!("leap line not stationary: {}", fields.join(" "))));
        }

        self.source.leaps.push(LeapLine { year, month, day, shift });
        Ok(())
    }
}

/// Parse one zone era, with `start` selecting the first payload field
fn parse_zone_era(fields: &[String], start: usize) -> Result<ZoneLine, Error> {
    if fields.len() < start + 3 {
        return Err(line_error(fields, "zone line has too few fields"));
    }

    let raw_field = &fields[start];
    if raw_field == "-" {
        return Err(line_error(fields, "undefined raw offset"));
    }
    let raw_offset = parse_offset(raw_field).map_err(|error| wrap_line(fields, error))?;

    let rule_field = &fields[start + 1];
    let rule = match rule_field.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => RulePolicy::Named(rule_field.clone()),
        _ if rule_field == "-" => RulePolicy::Standard,
        _ => RulePolicy::Fixed(parse_offset(rule_field).map_err(|error| wrap_line(fields, error))?),
    };

    let format = fields[start + 2].clone();

    let mut year = 0;
    let mut month = 1;
    let mut day_spec = RuleDay::Fixed(1);
    let mut time_of_day = 0;
    let mut indicator = OffsetIndicator::Wall;

    for (position, field) in fields[start + 3..].iter().enumerate() {
        match position {
            0 => year = parse_field(fields, field)?,
            1 => month = parse_month(field).map_err(|error| wrap_line(fields, error))?,
            2 => day_spec = parse_day_spec(field).map_err(|error| wrap_line(fields, error))?,
            3 => {
                let (time, tagged) =
                    parse_time_of_day(field).map_err(|error| wrap_line(fields, error))?;
                time_of_day = time;
                indicator = tagged;
            }
            _ => return Err(line_error(fields, "unknown UNTIL field")),
        }
    }

    let (until, until_indicator) = if fields.len() == start + 3 {
        (i64::MAX, None)
    } else {
        let day = day_spec.resolve(year, month);
        let until = days_since_unix_epoch(year, month, day) * SECONDS_PER_DAY + time_of_day as i64;
        (until, Some(indicator))
    };

    Ok(ZoneLine { raw_offset, rule, format, until, until_indicator })
}

/// Short month names, indexed by month number minus one
const SHORT_MONTHS: [&str; 12] =
    ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"];
/// Full month names for prefix matching
const LONG_MONTHS: [&str; 12] = [
    "JANUARY", "FEBRUARY", "MARCH", "APRIL", "MAY", "JUNE", "JULY", "AUGUST", "SEPTEMBER",
    "OCTOBER", "NOVEMBER", "DECEMBER",
];
/// Short week day names, indexed from Sunday
const SHORT_DAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
/// Full week day names for prefix matching
const LONG_DAYS: [&str; 7] =
    ["SUNDAY", "MONDAY", "TUESDAY", "WEDNESDAY", "THURSDAY", "FRIDAY", "SATURDAY"];

/// Parse a month field, accepting the 3-letter abbreviation or any prefix of
/// the full English name, case-insensitively. Returns the month in `[1, 12]`.
pub(crate) fn parse_month(field: &str) -> Result<u8, Error> {
    for (index, short) in SHORT_MONTHS.iter().enumerate() {
        if field.eq_ignore_ascii_case(short) {
            return Ok(index as u8 + 1);
        }
    }

    let upper = field.to_ascii_uppercase();
    for (index, long) in LONG_MONTHS.iter().enumerate() {
        if long.starts_with(&upper) {
            return Ok(index as u8 + 1);
        }
    }

    Err(Error::InvalidLine(format!("not representable as month: {}", field)))
}

/// Parse a week day field, accepting the 3-letter abbreviation or any prefix
/// of the full English name, case-insensitively. Returns the day in `[0, 6]`
/// from Sunday.
pub(crate) fn parse_weekday(field: &str) -> Result<u8, Error> {
    for (index, short) in SHORT_DAYS.iter().enumerate() {
        if field.eq_ignore_ascii_case(short) {
            return Ok(index as u8);
        }
    }

    let upper = field.to_ascii_uppercase();
    for (index, long) in LONG_DAYS.iter().enumerate() {
        if long.starts_with(&upper) {
            return Ok(index as u8);
        }
    }

    Err(Error::InvalidLine(format!("not representable as week day: {}", field)))
}

/// Parse an offset field `[-]HH[:MM[:SS]]` into seconds.
///
/// A bare `"-"` is zero.
pub(crate) fn parse_offset(field: &str) -> Result<i32, Error> {
    let (negative, rest) = match field.strip_prefix('-') {
        Some("") => return Ok(0),
        Some(rest) => (true, rest),
        None => (false, field),
    };

    let mut hour: i64 = 0;
    let mut minute: i64 = 0;
    let mut second: i64 = 0;

    for (position, part) in rest.split(':').enumerate() {
        if part.starts_with('-') {
            return Err(Error::InvalidLine(format!("misplaced sign in offset: {}", field)));
        }
        match position {
            0 => hour = part.parse()?,
            1 => minute = part.parse()?,
            2 => second = part.parse()?,
            _ => {}
        }
    }

    let total = hour * 3600 + minute * 60 + second;
    Ok(i32::try_from(if negative { -total } else { total })?)
}

/// Parse a time-of-day field `[+-]HH[:MM[:SS[.frac]]][u|s|w]` into seconds
/// and an offset indicator.
///
/// The indicator letters are accepted case-insensitively, `g` and `z` alias
/// `u`, and the default is wall-clock time. Fractional seconds are truncated.
/// A bare `"-"` is zero.
pub(crate) fn parse_time_of_day(field: &str) -> Result<(i32, OffsetIndicator), Error> {
    let last = match field.chars().last() {
        Some(last) => last,
        None => return Err(Error::InvalidLine("empty time of day".to_string())),
    };

    let (body, indicator) = match last {
        'u' | 'U' | 'g' | 'G' | 'z' | 'Z' => (&field[..field.len() - 1], OffsetIndicator::Utc),
        's' | 'S' => (&field[..field.len() - 1], OffsetIndicator::Standard),
        'w' | 'W' => (&field[..field.len() - 1], OffsetIndicator::Wall),
        '-' if field.len() == 1 => return Ok((0, OffsetIndicator::Wall)),
        c if c.is_ascii_digit() => (field, OffsetIndicator::Wall),
        _ => return Err(Error::InvalidLine(format!("unparseable time of day: {}", field))),
    };

    if body == "-" {
        return Ok((0, indicator));
    }

    let mut hour: i64 = 0;
    let mut minute: i64 = 0;
    let mut second: i64 = 0;
    let mut negative = false;

    for (position, part) in body.split(':').enumerate() {
        match position {
            0 => {
                let hours = match part.strip_prefix('-') {
                    Some(rest) => {
                        negative = true;
                        rest
                    }
                    None => part.strip_prefix('+').unwrap_or(part),
                };
                hour = hours.parse()?;
            }
            1 => minute = part.parse()?,
            2 => {
                // Subsecond precision is conceptual nonsense here; truncate.
                let seconds = match part.split_once('.') {
                    Some((integral, _)) => integral,
                    None => part,
                };
                second = seconds.parse()?;
            }
            _ => {}
        }
    }

    let total = hour * 3600 + minute * 60 + second;
    Ok((i32::try_from(if negative { -total } else { total })?, indicator))
}

/// Parse a day specifier: a decimal day of the month, `last<Weekday>` or
/// `<Weekday><cmp>=<day>` with `<cmp>` one of `>` and `<`.
pub(crate) fn parse_day_spec(field: &str) -> Result<RuleDay, Error> {
    match field.chars().next() {
        Some(c) if c.is_ascii_digit() => return Ok(RuleDay::Fixed(field.parse()?)),
        Some(_) => {}
        None => return Err(Error::InvalidLine("empty day specifier".to_string())),
    }

    if let Some(rest) = field.strip_prefix("last") {
        return Ok(RuleDay::LastWeekday(parse_weekday(rest)?));
    }

    let position = match field.find(|c| c == '>' || c == '<') {
        Some(position) => position,
        None => {
            return Err(Error::InvalidLine(format!("unparseable day specifier: {}", field)))
        }
    };
    if field.as_bytes().get(position + 1) != Some(&b'=') {
        return Err(Error::InvalidLine(format!("day specifier without '=': {}", field)));
    }

    let week_day = parse_weekday(&field[..position])?;
    let day = field[position + 2..].parse()?;

    if field.as_bytes()[position] == b'>' {
        Ok(RuleDay::WeekdayOnOrAfter(week_day, day))
    } else {
        Ok(RuleDay::WeekdayOnOrBefore(week_day, day))
    }
}

/// Parse an integer field, embedding the whole line into the error
fn parse_field<T: std::str::FromStr<Err = std::num::ParseIntError>>(
    fields: &[String],
    field: &str,
) -> Result<T, Error> {
    field.parse().map_err(|_| line_error(fields, "unparseable number"))
}

fn line_error(fields: &[String], reason: &str) -> Error {
    Error::InvalidLine(format!("{}: {}", reason, fields.join(" ")))
}

fn wrap_line(fields: &[String], error: Error) -> Error {
    let reason = match error {
        Error::InvalidLine(reason) => reason,
        other => other.to_string(),
    };
    Error::InvalidLine(format!("{} in line: {}", reason, fields.join(" ")))
}
