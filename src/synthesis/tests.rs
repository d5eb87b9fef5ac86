use super::{rule_offset, synthesize};
use crate::history::ZonalTransition;
use crate::tzdb::{SourceParser, TzSource};
use crate::Error;

fn parse(text: &str) -> Result<TzSource, Error> {
    let mut parser = SourceParser::new();
    parser.feed("europe", text)?;
    Ok(parser.finish())
}

#[test]
fn test_fixed_zone() -> Result<(), Error> {
    let source = parse("Zone Etc/UTC 0 - UTC\n")?;
    let history = synthesize("Etc/UTC", &source.zones["Etc/UTC"], &source.rules, false)?;

    assert_eq!(history.initial_offset(), 0);
    assert!(history.transitions().is_empty());
    assert!(history.rules().is_empty());
    Ok(())
}

#[test]
fn test_unchanged_continuation() -> Result<(), Error> {
    let source = parse("Zone Test/Fixed 1:00 - CET 1980 Jan 1 0:00u\n\t1:00 - CET\n")?;
    let history = synthesize("Test/Fixed", &source.zones["Test/Fixed"], &source.rules, false)?;

    assert_eq!(history.initial_offset(), 3600);
    assert!(history.transitions().is_empty());
    Ok(())
}

#[test]
fn test_recurring_rules() -> Result<(), Error> {
    let source = parse(
        "Rule R 1970 max - Mar lastSun 2:00 1:00 D\n\
         Rule R 1970 max - Oct lastSun 3:00 0 S\n\
         Zone Test/Alternating 1:00 R CE%sT\n",
    )?;
    let history =
        synthesize("Test/Alternating", &source.zones["Test/Alternating"], &source.rules, false)?;

    assert_eq!(history.initial_offset(), 3600);

    // Expansion stops after the window around the earliest year; the
    // open-ended patterns cover the rest. All instants fall on last Sundays.
    assert_eq!(
        history.transitions(),
        [
            ZonalTransition::new(7_520_400, 3600, 7200, 3600), // 1970-03-29
            ZonalTransition::new(25_664_400, 7200, 3600, 0),   // 1970-10-25
            ZonalTransition::new(38_970_000, 3600, 7200, 3600), // 1971-03-28
            ZonalTransition::new(57_718_800, 7200, 3600, 0),   // 1971-10-31
        ]
        .as_slice()
    );

    assert_eq!(history.rules().len(), 2);
    assert_eq!(history.rules()[0].month(), 3);
    assert_eq!(history.rules()[0].saving(), 3600);
    assert_eq!(history.rules()[1].month(), 10);
    assert_eq!(history.rules()[1].saving(), 0);
    Ok(())
}

#[test]
fn test_same_instant_coalescing() -> Result<(), Error> {
    // Both rules realise to the identical POSIX second; the collapsed record
    // keeps the pre-collision previous offset and the post-collision totals.
    let source = parse(
        "Rule S 1980 only - Apr 1 2:00u 1:00 D\n\
         Rule S 1980 only - Apr 1 2:00u 0:30 H\n\
         Zone Test/Coalesced 1:00 S CET\n",
    )?;
    let history =
        synthesize("Test/Coalesced", &source.zones["Test/Coalesced"], &source.rules, false)?;

    assert_eq!(
        history.transitions(),
        [ZonalTransition::new(323_402_400, 3600, 5400, 1800)].as_slice()
    );
    assert_eq!(history.initial_offset(), 5400);
    assert!(history.rules().is_empty());
    Ok(())
}

#[test]
fn test_lmt_elision() -> Result<(), Error> {
    let text = "Zone Test/City -0:52:44 - LMT 1900 Jan 1\n\t1:00 - CET\n";

    let source = parse(text)?;
    let history = synthesize("Test/City", &source.zones["Test/City"], &source.rules, false)?;
    assert_eq!(history.initial_offset(), 3600);
    assert!(history.transitions().is_empty());

    let source = parse(text)?;
    let history = synthesize("Test/City", &source.zones["Test/City"], &source.rules, true)?;
    assert_eq!(history.initial_offset(), -3164);
    assert_eq!(
        history.transitions(),
        [ZonalTransition::new(-2_208_985_636, -3164, 3600, 0)].as_slice()
    );
    Ok(())
}

#[test]
fn test_era_boundaries() -> Result<(), Error> {
    let source = parse(
        "Rule EU 1977 1980 - Apr Sun>=1 1:00u 1:00 S\n\
         Rule EU 1977 1980 - Sep lastSun 1:00u 0 -\n\
         Zone Test/Europe 1:00 - CET 1978 Jul 1 0:00u\n\
         \t1:00 EU CE%sT 1981 Jan 1 0:00u\n\
         \t1:00 - CET\n",
    )?;
    let history = synthesize("Test/Europe", &source.zones["Test/Europe"], &source.rules, false)?;

    // The era starting mid-1978 opens in daylight saving time (the April
    // rule has already fired), so the boundary itself emits a transition.
    assert_eq!(history.initial_offset(), 3600);
    assert_eq!(
        history.transitions(),
        [
            ZonalTransition::new(268_099_200, 3600, 7200, 3600), // 1978-07-01 era start
            ZonalTransition::new(275_446_800, 7200, 3600, 0),    // 1978-09-24
            ZonalTransition::new(291_776_400, 3600, 7200, 3600), // 1979-04-01
            ZonalTransition::new(307_501_200, 7200, 3600, 0),    // 1979-09-30
            ZonalTransition::new(323_830_800, 3600, 7200, 3600), // 1980-04-06
            ZonalTransition::new(338_950_800, 7200, 3600, 0),    // 1980-09-28
        ]
        .as_slice()
    );
    assert!(history.rules().is_empty());
    Ok(())
}

#[test]
fn test_rule_offset() -> Result<(), Error> {
    let source = parse(
        "Rule EU 1977 1980 - Apr Sun>=1 1:00u 1:00 S\n\
         Rule EU 1977 1980 - Sep lastSun 1:00u 0 -\n",
    )?;
    let bucket = &source.rules["EU"];

    // No line covers the year
    assert_eq!(rule_offset(bucket, 3600, 1800, 1985, i64::MAX), 0);
    // Lines cover the year but none has fired yet
    assert_eq!(rule_offset(bucket, 3600, 1800, 1977, i64::MIN), 1800);
    // The April line has fired
    assert_eq!(rule_offset(bucket, 3600, 0, 1978, 268_099_200), 3600);
    Ok(())
}

#[test]
fn test_unknown_rule_family() -> Result<(), Error> {
    let source = parse("Zone Test/Broken 1:00 Missing CET\n")?;
    let result = synthesize("Test/Broken", &source.zones["Test/Broken"], &source.rules, false);

    assert!(matches!(result, Err(Error::Zone(id, _)) if id == "Test/Broken"));
    Ok(())
}

#[test]
fn test_transition_chain() -> Result<(), Error> {
    // Property: each previous total equals the offset in effect before the
    // transition, starting from the initial offset.
    let source = parse(
        "Rule R 1970 max - Mar lastSun 2:00 1:00 D\n\
         Rule R 1970 max - Oct lastSun 3:00 0 S\n\
         Zone Test/Alternating 1:00 R CE%sT\n",
    )?;
    let history =
        synthesize("Test/Alternating", &source.zones["Test/Alternating"], &source.rules, false)?;

    let mut in_effect = history.initial_offset();
    for transition in history.transitions() {
        assert_eq!(transition.previous_offset(), in_effect);
        in_effect = transition.total_offset();
    }
    Ok(())
}
