//! Source text cleaning.

use crate::Error;

/// A cleaned source line
#[derive(Debug, Eq, PartialEq)]
pub(crate) enum Cleaned {
    /// Nothing left after comment stripping
    Blank,
    /// Whitespace-collapsed fields
    Fields(Vec<String>),
    /// NTP timestamp carried by a `#@` expiry annotation
    Expiry(i64),
}

/// Clean one raw source line.
///
/// Comments start at an unquoted `#` and run to the end of the line. Runs of
/// unquoted whitespace collapse to a single tab, which also separates the
/// returned fields; quoted text is kept verbatim. With `capture_expiry` set,
/// a comment of the form `#@<seconds>` is returned as [`Cleaned::Expiry`];
/// the annotation stands on a line of its own in `leap-seconds.list`.
pub(crate) fn clean_line(line: &str, capture_expiry: bool) -> Result<Cleaned, Error> {
    let line = line.trim();
    let mut collapsed = String::with_capacity(line.len());
    let mut quotation = false;

    for (position, c) in line.char_indices() {
        if c == '"' {
            quotation = !quotation;
        } else if quotation {
            collapsed.push(c);
        } else if c == '#' {
            let comment = &line[position + 1..];
            if capture_expiry && comment.starts_with('@') {
                let ntp = comment[1..].trim().parse()?;
                return Ok(Cleaned::Expiry(ntp));
            }
            break;
        } else if c.is_whitespace() {
            if !collapsed.is_empty() && !collapsed.ends_with('\t') {
                collapsed.push('\t');
            }
        } else {
            collapsed.push(c);
        }
    }

    let collapsed = collapsed.trim_matches('\t');
    if collapsed.is_empty() {
        return Ok(Cleaned::Blank);
    }

    Ok(Cleaned::Fields(collapsed.split('\t').map(str::to_string).collect()))
}
