//! Parsed representation of the tz database source files.

use std::collections::{BTreeMap, HashMap};

use crate::datetime::{days_since_unix_epoch, month_length, week_day, DAYS_PER_WEEK, SECONDS_PER_DAY};

mod lexer;
mod parser;
pub use parser::SourceParser;

#[cfg(test)]
mod tests;

/// Reference year used to order the lines of a rule family (must be a leap year)
pub(crate) const PROTOTYPE_YEAR: i32 = 2000;

/// Indicator qualifying a time-of-day field
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum OffsetIndicator {
    /// Time of day is in UTC
    Utc,
    /// Time of day is in local standard time
    Standard,
    /// Time of day is in local wall-clock time
    Wall,
}

impl OffsetIndicator {
    /// Returns the shift to subtract from a tagged local time to obtain POSIX time
    pub(crate) fn shift(self, raw_offset: i32, dst_offset: i32) -> i64 {
        match self {
            Self::Utc => 0,
            Self::Standard => raw_offset as i64,
            Self::Wall => raw_offset as i64 + dst_offset as i64,
        }
    }
}

/// Day specifier of a daylight-saving rule or an UNTIL field.
///
/// Week days are counted in `[0, 6]` from Sunday.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RuleDay {
    /// Fixed day of the month
    Fixed(u8),
    /// Last occurrence of a week day in the month
    LastWeekday(u8),
    /// First occurrence of a week day on or after the given day
    WeekdayOnOrAfter(u8, u8),
    /// Last occurrence of a week day on or before the given day
    WeekdayOnOrBefore(u8, u8),
}

impl RuleDay {
    /// Resolve to a concrete day of the month for the provided year and month.
    ///
    /// The result may lie outside of the month length; conversions through
    /// `days_since_unix_epoch` carry the overflow into the neighbouring
    /// months.
    pub(crate) fn resolve(&self, year: i32, month: u8) -> i64 {
        match *self {
            Self::Fixed(day) => day as i64,
            Self::LastWeekday(week_day_target) => {
                let last = month_length(year, month);
                let delta =
                    (week_day(year, month, last) - week_day_target as i64).rem_euclid(DAYS_PER_WEEK);
                last - delta
            }
            Self::WeekdayOnOrAfter(week_day_target, day) => {
                let delta = (week_day_target as i64 - week_day(year, month, day as i64))
                    .rem_euclid(DAYS_PER_WEEK);
                day as i64 + delta
            }
            Self::WeekdayOnOrBefore(week_day_target, day) => {
                let delta = (week_day(year, month, day as i64) - week_day_target as i64)
                    .rem_euclid(DAYS_PER_WEEK);
                day as i64 - delta
            }
        }
    }
}

/// Recurring daylight-saving pattern carried by a rule line
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct DaylightSavingRule {
    /// Month in `[1, 12]`
    month: u8,
    /// Day specifier
    day: RuleDay,
    /// Time of day in seconds, qualified by the indicator
    time_of_day: i32,
    /// Indicator of the time-of-day field
    indicator: OffsetIndicator,
    /// Daylight-saving offset in seconds
    saving: i32,
}

impl DaylightSavingRule {
    /// Construct a daylight-saving pattern, with `month` in `[1, 12]`
    pub(crate) fn new(
        month: u8,
        day: RuleDay,
        time_of_day: i32,
        indicator: OffsetIndicator,
        saving: i32,
    ) -> Self {
        Self { month, day, time_of_day, indicator, saving }
    }

    /// Returns the month in `[1, 12]`
    pub fn month(&self) -> u8 {
        self.month
    }

    /// Returns the day specifier
    pub fn day(&self) -> RuleDay {
        self.day
    }

    /// Returns the time of day in seconds
    pub fn time_of_day(&self) -> i32 {
        self.time_of_day
    }

    /// Returns the indicator of the time-of-day field
    pub fn indicator(&self) -> OffsetIndicator {
        self.indicator
    }

    /// Returns the daylight-saving offset in seconds
    pub fn saving(&self) -> i32 {
        self.saving
    }

    /// Returns the concrete transition date for the provided year
    pub fn date(&self, year: i32) -> (u8, i64) {
        (self.month, self.day.resolve(year, self.month))
    }

    /// Returns the POSIX time of the transition in the provided year.
    ///
    /// The shift converts the tagged local time of day to UTC and is derived
    /// from the indicator by the caller.
    pub(crate) fn posix_time(&self, year: i32, shift: i64) -> i64 {
        let (month, day) = self.date(year);
        days_since_unix_epoch(year, month, day) * SECONDS_PER_DAY + self.time_of_day as i64 - shift
    }
}

/// One line of a named daylight-saving rule family
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RuleLine {
    /// Rule family name
    name: String,
    /// First year of validity; `i32::MIN` encodes the minimum sentinel
    from: i32,
    /// Last year of validity; `i32::MAX` encodes the maximum sentinel
    to: i32,
    /// Recurring pattern
    pattern: DaylightSavingRule,
    /// Tag letter for format expansion
    letter: String,
}

impl RuleLine {
    /// Returns the rule family name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the first year of validity
    pub fn from(&self) -> i32 {
        self.from
    }

    /// Returns the last year of validity
    pub fn to(&self) -> i32 {
        self.to
    }

    /// Returns the recurring pattern
    pub fn pattern(&self) -> &DaylightSavingRule {
        &self.pattern
    }

    /// Returns the tag letter for format expansion
    pub fn letter(&self) -> &str {
        &self.letter
    }

    /// Returns the POSIX time at which the rule fires in the provided year
    pub(crate) fn posix_time(&self, year: i32, shift: i64) -> i64 {
        self.pattern.posix_time(year, shift)
    }

    /// Instant used to order the lines of a family, at the reference leap year
    pub(crate) fn prototype_instant(&self) -> i64 {
        self.pattern.posix_time(PROTOTYPE_YEAR, 0)
    }
}

/// RULES column of a zone line
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum RulePolicy {
    /// Constant standard time
    Standard,
    /// Daylight saving governed by the named rule family
    Named(String),
    /// Fixed daylight-saving offset in seconds
    Fixed(i32),
}

/// One era of a named zone
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ZoneLine {
    /// Standard UTC offset in seconds, positive east
    raw_offset: i32,
    /// Daylight-saving policy of the era
    rule: RulePolicy,
    /// Zone abbreviation format
    format: String,
    /// Era boundary as a tagged local time in seconds; `i64::MAX` on the final era
    until: i64,
    /// Indicator of the era boundary; `None` marks the final era of a zone
    until_indicator: Option<OffsetIndicator>,
}

impl ZoneLine {
    /// Returns the standard UTC offset in seconds
    pub fn raw_offset(&self) -> i32 {
        self.raw_offset
    }

    /// Returns the daylight-saving policy
    pub fn rule(&self) -> &RulePolicy {
        &self.rule
    }

    /// Returns the zone abbreviation format
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Returns the era boundary as a tagged local time in seconds
    pub fn until(&self) -> i64 {
        self.until
    }

    /// Returns the indicator of the era boundary
    pub fn until_indicator(&self) -> Option<OffsetIndicator> {
        self.until_indicator
    }

    /// Returns `true` on the final era of a zone
    pub fn is_last(&self) -> bool {
        self.until_indicator.is_none()
    }

    /// Returns the shift converting the era boundary to POSIX time
    pub(crate) fn shift(&self, dst_offset: i32) -> i64 {
        match self.until_indicator {
            Some(indicator) => indicator.shift(self.raw_offset, dst_offset),
            None => 0,
        }
    }
}

/// Alias of a zone, stored alias → target (inverted from the file order)
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LinkLine {
    /// Alias name
    alias: String,
    /// Target zone ID or further alias
    target: String,
}

impl LinkLine {
    /// Returns the alias name
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Returns the target zone ID, which may itself be an alias
    pub fn target(&self) -> &str {
        &self.target
    }
}

/// One leap second
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct LeapLine {
    /// Gregorian year
    year: i32,
    /// Month in `[1, 12]`
    month: u8,
    /// Day of the month
    day: u8,
    /// Leap-second shift, `+1` or `-1`
    shift: i8,
}

impl LeapLine {
    /// Returns the Gregorian year
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Returns the month in `[1, 12]`
    pub fn month(&self) -> u8 {
        self.month
    }

    /// Returns the day of the month
    pub fn day(&self) -> u8 {
        self.day
    }

    /// Returns the leap-second shift
    pub fn shift(&self) -> i8 {
        self.shift
    }
}

/// Frozen output of the parsing stage
#[derive(Debug)]
pub struct TzSource {
    /// Zone eras keyed by zone ID, in ascending ID order
    pub zones: BTreeMap<String, Vec<ZoneLine>>,
    /// Rule families keyed by name, each sorted by prototype instant
    pub rules: HashMap<String, Vec<RuleLine>>,
    /// Zone aliases
    pub links: Vec<LinkLine>,
    /// Leap seconds
    pub leaps: Vec<LeapLine>,
    /// Expiry date of the leap-second table
    pub expiry: (i32, u8, u8),
}

impl Default for TzSource {
    fn default() -> Self {
        Self {
            zones: BTreeMap::new(),
            rules: HashMap::new(),
            links: Vec::new(),
            leaps: Vec::new(),
            expiry: (1900, 1, 1),
        }
    }
}
