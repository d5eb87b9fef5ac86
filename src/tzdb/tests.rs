use super::lexer::{clean_line, Cleaned};
use super::parser::{parse_day_spec, parse_month, parse_offset, parse_time_of_day, parse_weekday};
use super::{OffsetIndicator, RuleDay, RulePolicy, SourceParser, TzSource};
use crate::Error;

fn parse(filename: &str, text: &str) -> Result<TzSource, Error> {
    let mut parser = SourceParser::new();
    parser.feed(filename, text)?;
    Ok(parser.finish())
}

#[test]
fn test_clean_line() -> Result<(), Error> {
    assert_eq!(clean_line("", false)?, Cleaned::Blank);
    assert_eq!(clean_line("   \t ", false)?, Cleaned::Blank);
    assert_eq!(clean_line("# full line comment", false)?, Cleaned::Blank);

    assert_eq!(
        clean_line("Rule\tEU  1977\t 1980 - Apr", false)?,
        Cleaned::Fields(vec![
            "Rule".to_string(),
            "EU".to_string(),
            "1977".to_string(),
            "1980".to_string(),
            "-".to_string(),
            "Apr".to_string(),
        ])
    );

    // Comments terminate the line, trailing whitespace is dropped
    assert_eq!(
        clean_line("Link  Etc/UTC  Universal \t # alias", false)?,
        Cleaned::Fields(vec![
            "Link".to_string(),
            "Etc/UTC".to_string(),
            "Universal".to_string(),
        ])
    );

    // Quoted text keeps interior whitespace and comment characters
    assert_eq!(
        clean_line("a \"b # c\" d", false)?,
        Cleaned::Fields(vec!["a".to_string(), "b # c".to_string(), "d".to_string()])
    );

    Ok(())
}

#[test]
fn test_clean_line_expiry() -> Result<(), Error> {
    assert_eq!(clean_line("#@ 2208988800", true)?, Cleaned::Expiry(2_208_988_800));
    assert_eq!(clean_line("#@\t3676924800", true)?, Cleaned::Expiry(3_676_924_800));
    // Without the capture flag the annotation is an ordinary comment
    assert_eq!(clean_line("#@ 2208988800", false)?, Cleaned::Blank);
    assert!(clean_line("#@ not-a-number", true).is_err());
    Ok(())
}

#[test]
fn test_parse_month() -> Result<(), Error> {
    assert_eq!(parse_month("Jan")?, 1);
    assert_eq!(parse_month("mar")?, 3);
    assert_eq!(parse_month("SEP")?, 9);
    // Any unambiguous prefix of the full name works; the earliest month wins
    assert_eq!(parse_month("O")?, 10);
    assert_eq!(parse_month("Ju")?, 6);
    assert_eq!(parse_month("December")?, 12);
    assert!(parse_month("Mxr").is_err());
    Ok(())
}

#[test]
fn test_parse_weekday() -> Result<(), Error> {
    assert_eq!(parse_weekday("Sun")?, 0);
    assert_eq!(parse_weekday("mon")?, 1);
    assert_eq!(parse_weekday("SATURDAY")?, 6);
    assert_eq!(parse_weekday("Th")?, 4);
    assert!(parse_weekday("Xyz").is_err());
    Ok(())
}

#[test]
fn test_parse_offset() -> Result<(), Error> {
    assert_eq!(parse_offset("1:00")?, 3600);
    assert_eq!(parse_offset("-5:30")?, -19800);
    assert_eq!(parse_offset("0:44:30")?, 2670);
    assert_eq!(parse_offset("24:00")?, 86400);
    assert_eq!(parse_offset("-")?, 0);
    assert_eq!(parse_offset("2")?, 7200);
    assert!(parse_offset("1:-30").is_err());
    assert!(parse_offset("abc").is_err());
    Ok(())
}

#[test]
fn test_parse_time_of_day() -> Result<(), Error> {
    assert_eq!(parse_time_of_day("2:00")?, (7200, OffsetIndicator::Wall));
    assert_eq!(parse_time_of_day("2:00u")?, (7200, OffsetIndicator::Utc));
    assert_eq!(parse_time_of_day("2:00s")?, (7200, OffsetIndicator::Standard));
    assert_eq!(parse_time_of_day("2:00w")?, (7200, OffsetIndicator::Wall));
    // `g` and `z` alias `u`, capitals are tolerated
    assert_eq!(parse_time_of_day("15:00z")?, (54000, OffsetIndicator::Utc));
    assert_eq!(parse_time_of_day("1:00G")?, (3600, OffsetIndicator::Utc));
    assert_eq!(parse_time_of_day("0:30S")?, (1800, OffsetIndicator::Standard));
    // Signs and subsecond truncation
    assert_eq!(parse_time_of_day("-1:00")?, (-3600, OffsetIndicator::Wall));
    assert_eq!(parse_time_of_day("+2:30")?, (9000, OffsetIndicator::Wall));
    assert_eq!(parse_time_of_day("2:30:15.5")?, (9015, OffsetIndicator::Wall));
    // Bare dashes
    assert_eq!(parse_time_of_day("-")?, (0, OffsetIndicator::Wall));
    assert_eq!(parse_time_of_day("-u")?, (0, OffsetIndicator::Utc));
    assert!(parse_time_of_day("2:00x").is_err());
    Ok(())
}

#[test]
fn test_parse_day_spec() -> Result<(), Error> {
    assert_eq!(parse_day_spec("15")?, RuleDay::Fixed(15));
    assert_eq!(parse_day_spec("lastSun")?, RuleDay::LastWeekday(0));
    assert_eq!(parse_day_spec("lastFri")?, RuleDay::LastWeekday(5));
    assert_eq!(parse_day_spec("Sun>=8")?, RuleDay::WeekdayOnOrAfter(0, 8));
    assert_eq!(parse_day_spec("Mon<=15")?, RuleDay::WeekdayOnOrBefore(1, 15));
    assert!(parse_day_spec("Sun>8").is_err());
    assert!(parse_day_spec("someday").is_err());
    Ok(())
}

#[test]
fn test_rule_day_resolution() -> Result<(), Error> {
    // March 2000: the last Sunday is the 26th, the last Friday the 31st
    assert_eq!(RuleDay::LastWeekday(0).resolve(2000, 3), 26);
    assert_eq!(RuleDay::LastWeekday(5).resolve(2000, 3), 31);
    // April 1980: the first Sunday on or after the 1st is the 6th
    assert_eq!(RuleDay::WeekdayOnOrAfter(0, 1).resolve(1980, 4), 6);
    assert_eq!(RuleDay::WeekdayOnOrAfter(0, 6).resolve(1980, 4), 6);
    // October 1970: the Sunday on or before the 31st is the 25th
    assert_eq!(RuleDay::WeekdayOnOrBefore(0, 31).resolve(1970, 10), 25);
    assert_eq!(RuleDay::Fixed(29).resolve(2000, 2), 29);
    Ok(())
}

#[test]
fn test_rule_lines() -> Result<(), Error> {
    // Buckets are sorted by their in-year firing instant
    let source = parse(
        "europe",
        "Rule R 1996 max - Oct lastSun 1:00u 0 -\n\
         Rule R 1981 max - Mar lastSun 1:00u 1:00 S\n",
    )?;
    let bucket = &source.rules["R"];

    assert_eq!(bucket.len(), 2);
    assert_eq!(bucket[0].pattern().month(), 3);
    assert_eq!(bucket[0].from(), 1981);
    assert_eq!(bucket[0].to(), i32::MAX);
    assert_eq!(bucket[0].pattern().saving(), 3600);
    assert_eq!(bucket[0].letter(), "S");
    assert_eq!(bucket[1].pattern().month(), 10);
    assert_eq!(bucket[1].pattern().saving(), 0);
    assert_eq!(bucket[1].letter(), "");
    Ok(())
}

#[test]
fn test_rule_year_sentinels() -> Result<(), Error> {
    let source = parse(
        "europe",
        "Rule S min 1977 - Jan 1 0:00 0 -\n\
         Rule S 1978 only - Jun 1 0:00 1:00 D\n",
    )?;
    let bucket = &source.rules["S"];

    assert_eq!(bucket[0].from(), i32::MIN);
    assert_eq!(bucket[0].to(), 1977);
    assert_eq!(bucket[1].from(), 1978);
    assert_eq!(bucket[1].to(), 1978);
    Ok(())
}

#[test]
fn test_rule_type_column_skipped() -> Result<(), Error> {
    let source = parse("europe", "Rule T 1970 max odd Mar lastSun 2:00 1:00 D\n")?;
    assert!(source.rules.is_empty());
    Ok(())
}

#[test]
fn test_zone_lines() -> Result<(), Error> {
    let source = parse(
        "northamerica",
        "Zone America/Test -5:00 US E%sT 1970 Mar lastSun 2:00s\n\
         \t-5:00 - EST 1975 Apr 6\n\
         \t-6:00 1:00 CDT\n",
    )?;
    let eras = &source.zones["America/Test"];
    assert_eq!(eras.len(), 3);

    assert_eq!(eras[0].raw_offset(), -18000);
    assert_eq!(eras[0].rule(), &RulePolicy::Named("US".to_string()));
    assert_eq!(eras[0].format(), "E%sT");
    // 1970-03-29T02:00 standard time, as seconds since the epoch
    assert_eq!(eras[0].until(), 87 * 86400 + 7200);
    assert_eq!(eras[0].until_indicator(), Some(OffsetIndicator::Standard));

    assert_eq!(eras[1].rule(), &RulePolicy::Standard);
    assert_eq!(eras[1].until(), 1921 * 86400);
    assert_eq!(eras[1].until_indicator(), Some(OffsetIndicator::Wall));

    assert_eq!(eras[2].rule(), &RulePolicy::Fixed(3600));
    assert!(eras[2].is_last());
    Ok(())
}

#[test]
fn test_zone_closure() -> Result<(), Error> {
    // The first zone has no UNTIL and closes immediately; the orphan
    // continuation-like line after it is not attributed to any zone.
    let source = parse(
        "europe",
        "Zone Test/One 0 - GMT\n\
         Zone Test/Two 1:00 - CET 1990 Jan 1\n\
         \t2:00 - EET\n",
    )?;

    assert_eq!(source.zones["Test/One"].len(), 1);
    assert_eq!(source.zones["Test/Two"].len(), 2);
    Ok(())
}

#[test]
fn test_zone_errors() {
    assert!(matches!(
        parse("europe", "Zone Test/Bad - - GMT\n"),
        Err(Error::InvalidLine(_))
    ));
    assert!(matches!(
        parse("europe", "Zone Test/Bad 0 - GMT 1990 Jan 1 0:00 extra\n"),
        Err(Error::InvalidLine(_))
    ));
}

#[test]
fn test_link_lines() -> Result<(), Error> {
    let source = parse("backward", "Link Etc/UTC Universal\n")?;
    assert_eq!(source.links.len(), 1);
    assert_eq!(source.links[0].alias(), "Universal");
    assert_eq!(source.links[0].target(), "Etc/UTC");
    Ok(())
}

#[test]
fn test_leap_lines() -> Result<(), Error> {
    let source = parse("leapseconds", "Leap 1972 Jun 30 23:59:60 + S\n")?;
    assert_eq!(source.leaps.len(), 1);
    assert_eq!(source.leaps[0].year(), 1972);
    assert_eq!(source.leaps[0].month(), 6);
    assert_eq!(source.leaps[0].day(), 30);
    assert_eq!(source.leaps[0].shift(), 1);

    assert!(matches!(
        parse("leapseconds", "Leap 1972 Jun 30 23:59:60 - S\n"),
        Err(Error::LeapLine(_))
    ));
    assert!(matches!(
        parse("leapseconds", "Leap 1972 Jun 30 23:59:59 + S\n"),
        Err(Error::LeapLine(_))
    ));
    assert!(matches!(
        parse("leapseconds", "Leap 1972 Jun 30 23:59:60 + R\n"),
        Err(Error::LeapLine(_))
    ));
    Ok(())
}

#[test]
fn test_expiry_capture() -> Result<(), Error> {
    // The NTP epoch itself maps to the Unix epoch
    let source = parse("leap-seconds.list", "#@ 2208988800\n3692217600 37 # data\n")?;
    assert_eq!(source.expiry, (1970, 1, 1));

    // 2016-07-08, taken from a real leap-seconds.list
    let source = parse("leap-seconds.list", "#@\t3676924800\n")?;
    assert_eq!(source.expiry, (2016, 7, 8));

    // Outside of leap-seconds.list the annotation is ignored
    let source = parse("europe", "#@ 2208988800\n")?;
    assert_eq!(source.expiry, (1900, 1, 1));
    Ok(())
}
