//! Zone synthesis: interleaving the eras of a zone with its rule families.

use std::collections::HashMap;

use crate::datetime::year_of_unix_time;
use crate::history::{TransitionHistory, ZonalTransition};
use crate::tzdb::{DaylightSavingRule, RuleLine, RulePolicy, ZoneLine};
use crate::Error;

/// Synthesise the validated transition history of one zone.
///
/// The eras are walked in order; for each era boundary and each firing rule a
/// transition is materialised, open-ended rule patterns are retained for the
/// future, and the result is checked for internal consistency. Unless
/// `keep_lmt` is set, leading local-mean-time eras are elided.
pub fn synthesize(
    zone_id: &str,
    eras: &[ZoneLine],
    rule_map: &HashMap<String, Vec<RuleLine>>,
    keep_lmt: bool,
) -> Result<TransitionHistory, Error> {
    let mut transitions: Vec<ZonalTransition> = Vec::new();
    let mut rules: Vec<DaylightSavingRule> = Vec::new();
    let mut previous: Option<&ZoneLine> = None;
    let mut initial_offset = 0;
    let mut dst_offset = 0;
    let mut has_lmt = true;
    let mut lmt_count = 0;

    for current in eras {
        match previous {
            None => {
                match current.rule() {
                    RulePolicy::Fixed(saving) => dst_offset = *saving,
                    RulePolicy::Named(name) => {
                        let bucket = lookup(rule_map, name, zone_id)?;
                        let earliest = match bucket.iter().map(|line| line.from()).min() {
                            Some(earliest) => earliest,
                            None => {
                                return Err(zone_error(zone_id, Error::RuleFamily(name.clone())))
                            }
                        };
                        dst_offset = add_rule_transitions(
                            &mut transitions,
                            &mut rules,
                            current,
                            dst_offset,
                            bucket,
                            earliest,
                            i64::MIN,
                        );
                    }
                    RulePolicy::Standard => {}
                }
                initial_offset = current.raw_offset() + dst_offset;
            }
            Some(previous) => {
                let old_dst = dst_offset;
                let start_time = previous.until() - previous.shift(old_dst);
                let start_year = year_of_unix_time(start_time);

                dst_offset = match current.rule() {
                    RulePolicy::Fixed(saving) => *saving,
                    RulePolicy::Named(name) => rule_offset(
                        lookup(rule_map, name, zone_id)?,
                        previous.raw_offset(),
                        old_dst,
                        start_year,
                        start_time,
                    ),
                    RulePolicy::Standard => 0,
                };

                if previous.raw_offset() != current.raw_offset() || dst_offset != old_dst {
                    push_transition(
                        &mut transitions,
                        ZonalTransition::new(
                            start_time,
                            previous.raw_offset() + old_dst,
                            current.raw_offset() + dst_offset,
                            dst_offset,
                        ),
                    );
                }

                if let RulePolicy::Named(name) = current.rule() {
                    dst_offset = add_rule_transitions(
                        &mut transitions,
                        &mut rules,
                        current,
                        dst_offset,
                        lookup(rule_map, name, zone_id)?,
                        start_year,
                        start_time,
                    );
                }
            }
        }

        previous = Some(current);
        has_lmt = has_lmt && current.format() == "LMT";
        if has_lmt {
            lmt_count += 1;
        }
    }

    if !keep_lmt {
        while lmt_count > 0 && !transitions.is_empty() {
            let lmt_transition = transitions.remove(0);
            initial_offset = lmt_transition.total_offset();
            lmt_count -= 1;
        }
    }

    TransitionHistory::new(initial_offset, transitions, rules)
        .map_err(|error| zone_error(zone_id, error))
}

/// Materialise the transitions of one era governed by a rule family.
///
/// Expansion is bounded by the window `[start_year - 1, end_year + 1]`;
/// open-ended rules of the final era are retained as recurring patterns
/// instead of being expanded forever. Returns the daylight-saving offset in
/// effect after the last emitted transition.
fn add_rule_transitions(
    transitions: &mut Vec<ZonalTransition>,
    rules: &mut Vec<DaylightSavingRule>,
    era: &ZoneLine,
    mut dst_offset: i32,
    bucket: &[RuleLine],
    start_year: i32,
    start_time: i64,
) -> i32 {
    let mut end_year = start_year;

    if era.is_last() {
        for line in bucket {
            if line.to() == i32::MAX {
                if line.from() > end_year {
                    end_year = line.from();
                }
                rules.push(*line.pattern());
            } else if line.to() > end_year {
                end_year = line.to();
            }
        }
    } else {
        end_year = year_of_unix_time(era.until());
    }

    // A family opening at the minimum sentinel cannot be expanded year by year.
    if start_year == i32::MIN {
        return dst_offset;
    }

    'years: for year in (start_year - 1)..=end_year.saturating_add(1) {
        // The bucket fires in ascending order within a year
        for line in bucket {
            if line.from() > year || line.to() < year {
                continue;
            }

            let old_dst = dst_offset;
            let rule_shift = line.pattern().indicator().shift(era.raw_offset(), old_dst);
            let tt = line.posix_time(year, rule_shift);
            let end_time = if era.is_last() { i64::MAX } else { era.until() - era.shift(old_dst) };

            if tt < start_time {
                continue;
            } else if tt >= end_time {
                break 'years;
            }

            dst_offset = line.pattern().saving();
            push_transition(
                transitions,
                ZonalTransition::new(
                    tt,
                    era.raw_offset() + old_dst,
                    era.raw_offset() + dst_offset,
                    dst_offset,
                ),
            );
        }
    }

    dst_offset
}

/// Determine the daylight-saving offset imposed by a rule family at the
/// start of an era.
///
/// Only lines covering `year` are considered; the latest-firing line whose
/// realised instant does not exceed `start_time` wins. The shift basis of
/// each line uses the saving of the line before it, or `old_dst` for the
/// earliest one.
fn rule_offset(
    bucket: &[RuleLine],
    raw_offset: i32,
    old_dst: i32,
    year: i32,
    start_time: i64,
) -> i32 {
    let lines: Vec<&RuleLine> = bucket
        .iter()
        .filter(|line| line.from() <= year && line.to() >= year)
        .collect();

    for (index, line) in lines.iter().enumerate().rev() {
        let previous_saving = if index > 0 { lines[index - 1].pattern().saving() } else { old_dst };
        let shift = line.pattern().indicator().shift(raw_offset, previous_saving);
        if start_time >= line.posix_time(year, shift) {
            return line.pattern().saving();
        }
    }

    if lines.is_empty() {
        0
    } else {
        old_dst
    }
}

/// Append a transition, coalescing with the previous one when both fall on
/// the same instant and dropping it when nothing changes.
fn push_transition(transitions: &mut Vec<ZonalTransition>, new: ZonalTransition) {
    let last = match transitions.last() {
        None => {
            transitions.push(new);
            return;
        }
        Some(last) => *last,
    };

    if last.posix_time() == new.posix_time() {
        // Two emissions on one instant collapse into a single record keeping
        // the original previous offset.
        let index = transitions.len() - 1;
        transitions[index] = ZonalTransition::new(
            new.posix_time(),
            last.previous_offset(),
            new.total_offset(),
            new.dst_offset(),
        );
    } else if last.total_offset() != new.total_offset() || last.dst_offset() != new.dst_offset() {
        transitions.push(new);
    }
}

fn lookup<'a>(
    rule_map: &'a HashMap<String, Vec<RuleLine>>,
    name: &str,
    zone_id: &str,
) -> Result<&'a [RuleLine], Error> {
    match rule_map.get(name) {
        Some(bucket) => Ok(bucket),
        None => Err(zone_error(zone_id, Error::RuleFamily(name.to_string()))),
    }
}

fn zone_error(zone_id: &str, error: Error) -> Error {
    Error::Zone(zone_id.to_string(), Box::new(error))
}

#[cfg(test)]
mod tests;
