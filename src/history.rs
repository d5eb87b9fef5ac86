//! Validated per-zone transition history and its binary encoding.

use crate::cursor::Cursor;
use crate::tzdb::{DaylightSavingRule, OffsetIndicator, RuleDay};
use crate::Error;

/// Offset transition of a zone
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ZonalTransition {
    /// POSIX time of the transition
    posix_time: i64,
    /// Total offset in effect before the transition, in seconds
    previous_offset: i32,
    /// Total offset in effect from the transition on, in seconds
    total_offset: i32,
    /// Daylight-saving part of the new total offset, in seconds
    dst_offset: i32,
}

impl ZonalTransition {
    /// Construct a zonal transition
    pub fn new(posix_time: i64, previous_offset: i32, total_offset: i32, dst_offset: i32) -> Self {
        Self { posix_time, previous_offset, total_offset, dst_offset }
    }

    /// Returns the POSIX time of the transition
    pub fn posix_time(&self) -> i64 {
        self.posix_time
    }

    /// Returns the total offset in effect before the transition
    pub fn previous_offset(&self) -> i32 {
        self.previous_offset
    }

    /// Returns the total offset in effect from the transition on
    pub fn total_offset(&self) -> i32 {
        self.total_offset
    }

    /// Returns the daylight-saving part of the new total offset
    pub fn dst_offset(&self) -> i32 {
        self.dst_offset
    }
}

/// Validated transition history of a zone.
///
/// A history consists of the total offset in effect before the first
/// transition, the materialised transitions over historical time and the
/// recurring daylight-saving patterns covering the open-ended future.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TransitionHistory {
    /// Total offset in effect before the first transition, in seconds
    initial_offset: i32,
    /// Materialised transitions in strictly increasing POSIX time order
    transitions: Vec<ZonalTransition>,
    /// Recurring patterns applicable after the last transition
    rules: Vec<DaylightSavingRule>,
}

impl TransitionHistory {
    /// Construct a transition history, checking internal consistency
    pub fn new(
        initial_offset: i32,
        transitions: Vec<ZonalTransition>,
        rules: Vec<DaylightSavingRule>,
    ) -> Result<Self, Error> {
        let history = Self { initial_offset, transitions, rules };
        history.check_inputs()?;
        Ok(history)
    }

    /// Returns the total offset in effect before the first transition
    pub fn initial_offset(&self) -> i32 {
        self.initial_offset
    }

    /// Returns the materialised transitions
    pub fn transitions(&self) -> &[ZonalTransition] {
        &self.transitions
    }

    /// Returns the recurring patterns applicable after the last transition
    pub fn rules(&self) -> &[DaylightSavingRule] {
        &self.rules
    }

    /// Check transition history inputs
    fn check_inputs(&self) -> Result<(), Error> {
        for window in self.transitions.windows(2) {
            if window[0].posix_time >= window[1].posix_time {
                return Err(Error::History("transition times must be strictly increasing"));
            }
            if window[0].total_offset != window[1].previous_offset {
                return Err(Error::History("transition offsets must be contiguous"));
            }
        }
        Ok(())
    }

    /// Encode the history into the opaque repository blob.
    ///
    /// All integers are big-endian; the layout is shared with
    /// [`TransitionHistory::from_bytes`] and the runtime reader.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut bytes = Vec::with_capacity(10 + self.transitions.len() * 20);

        bytes.extend_from_slice(&self.initial_offset.to_be_bytes());

        let count: u32 = self.transitions.len().try_into()?;
        bytes.extend_from_slice(&count.to_be_bytes());
        for transition in &self.transitions {
            bytes.extend_from_slice(&transition.posix_time.to_be_bytes());
            bytes.extend_from_slice(&transition.previous_offset.to_be_bytes());
            bytes.extend_from_slice(&transition.total_offset.to_be_bytes());
            bytes.extend_from_slice(&transition.dst_offset.to_be_bytes());
        }

        let count: u16 = self.rules.len().try_into()?;
        bytes.extend_from_slice(&count.to_be_bytes());
        for rule in &self.rules {
            write_rule(&mut bytes, rule);
        }

        Ok(bytes)
    }

    /// Decode a repository blob produced by [`TransitionHistory::to_bytes`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut cursor = Cursor::new(bytes);

        let initial_offset = cursor.read_be_i32()?;

        let transition_count = cursor.read_be_u32()?;
        let mut transitions = Vec::with_capacity(transition_count as usize);
        for _ in 0..transition_count {
            let posix_time = cursor.read_be_i64()?;
            let previous_offset = cursor.read_be_i32()?;
            let total_offset = cursor.read_be_i32()?;
            let dst_offset = cursor.read_be_i32()?;
            transitions.push(ZonalTransition::new(
                posix_time,
                previous_offset,
                total_offset,
                dst_offset,
            ));
        }

        let rule_count = cursor.read_be_u16()?;
        let mut rules = Vec::with_capacity(rule_count as usize);
        for _ in 0..rule_count {
            rules.push(read_rule(&mut cursor)?);
        }

        if !cursor.is_empty() {
            return Err(Error::Repository("remaining data after end of transition history"));
        }

        Self::new(initial_offset, transitions, rules)
    }
}

/// Day-specifier tag for a fixed day of the month
const DAY_FIXED: u8 = 0;
/// Day-specifier tag for the last occurrence of a week day
const DAY_LAST_WEEKDAY: u8 = 1;
/// Day-specifier tag for a week day on or after a date
const DAY_ON_OR_AFTER: u8 = 2;
/// Day-specifier tag for a week day on or before a date
const DAY_ON_OR_BEFORE: u8 = 3;

fn write_rule(bytes: &mut Vec<u8>, rule: &DaylightSavingRule) {
    bytes.push(rule.month());

    match rule.day() {
        RuleDay::Fixed(day) => bytes.extend_from_slice(&[DAY_FIXED, day]),
        RuleDay::LastWeekday(week_day) => bytes.extend_from_slice(&[DAY_LAST_WEEKDAY, week_day]),
        RuleDay::WeekdayOnOrAfter(week_day, day) => {
            bytes.extend_from_slice(&[DAY_ON_OR_AFTER, week_day, day])
        }
        RuleDay::WeekdayOnOrBefore(week_day, day) => {
            bytes.extend_from_slice(&[DAY_ON_OR_BEFORE, week_day, day])
        }
    }

    bytes.extend_from_slice(&rule.time_of_day().to_be_bytes());
    bytes.push(match rule.indicator() {
        OffsetIndicator::Utc => 0,
        OffsetIndicator::Standard => 1,
        OffsetIndicator::Wall => 2,
    });
    bytes.extend_from_slice(&rule.saving().to_be_bytes());
}

fn read_rule(cursor: &mut Cursor) -> Result<DaylightSavingRule, Error> {
    let month = cursor.read_u8()?;
    if !(1..=12).contains(&month) {
        return Err(Error::Repository("invalid rule month"));
    }

    let day = match cursor.read_u8()? {
        DAY_FIXED => RuleDay::Fixed(cursor.read_u8()?),
        DAY_LAST_WEEKDAY => RuleDay::LastWeekday(cursor.read_u8()?),
        DAY_ON_OR_AFTER => RuleDay::WeekdayOnOrAfter(cursor.read_u8()?, cursor.read_u8()?),
        DAY_ON_OR_BEFORE => RuleDay::WeekdayOnOrBefore(cursor.read_u8()?, cursor.read_u8()?),
        _ => return Err(Error::Repository("invalid day specifier tag")),
    };

    let time_of_day = cursor.read_be_i32()?;
    let indicator = match cursor.read_u8()? {
        0 => OffsetIndicator::Utc,
        1 => OffsetIndicator::Standard,
        2 => OffsetIndicator::Wall,
        _ => return Err(Error::Repository("invalid offset indicator")),
    };
    let saving = cursor.read_be_i32()?;

    Ok(DaylightSavingRule::new(month, day, time_of_day, indicator, saving))
}
