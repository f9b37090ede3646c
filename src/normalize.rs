//! Turns locale-formatted listing text into canonical fields.
//!
//! Housing sites render numbers the German way ("65,5 m²", "ab 1.234,50 €").
//! Everything here works on the first numeric run in the text, so unit
//! suffixes and qualifier words ("ab", "ca.", "Zimmer") never reach the
//! float parser.

use crate::error::ScoutError;
use url::Url;

fn is_grouping_space(c: char) -> bool {
    matches!(c, ' ' | '\u{a0}' | '\u{202f}')
}

/// First run of digits, separators and grouping spaces, with spaces removed.
fn numeric_run(text: &str) -> Result<String, ScoutError> {
    let start = text
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| ScoutError::parse(format!("no number in {:?}", text)))?;

    let run: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',' || *c == '.' || is_grouping_space(*c))
        .filter(|c| !is_grouping_space(*c))
        .collect();

    Ok(run.trim_end_matches(['.', ',']).to_string())
}

fn to_f64(raw: &str, original: &str) -> Result<f64, ScoutError> {
    raw.parse::<f64>()
        .map_err(|_| ScoutError::parse(format!("not a number: {:?}", original)))
}

/// Parse a small decimal value such as a room count or floor area.
///
/// "2,5" -> 2.5, "65,0 m²" -> 65.0, "3 Zimmer" -> 3.0
pub fn parse_number(text: &str) -> Result<f64, ScoutError> {
    let run = numeric_run(text)?;
    to_f64(&run.replace(',', "."), text)
}

/// Parse a money amount that may carry thousands grouping.
///
/// Grouping is stripped before the decimal comma is converted, so
/// "1.234,50 €" -> 1234.5 rather than 1.2345.
pub fn parse_amount(text: &str) -> Result<f64, ScoutError> {
    let run = numeric_run(text)?;

    let canonical = if run.contains(',') {
        run.replace('.', "").replace(',', ".")
    } else if is_dot_grouped(&run) {
        run.replace('.', "")
    } else {
        run
    };

    to_f64(&canonical, text)
}

/// "1.450" and "1.234.567" are grouped; "12.5" is a decimal.
fn is_dot_grouped(run: &str) -> bool {
    let mut groups = run.split('.');
    let Some(head) = groups.next() else {
        return false;
    };
    let tail: Vec<&str> = groups.collect();
    !tail.is_empty()
        && (1..=3).contains(&head.len())
        && tail.iter().all(|g| g.len() == 3)
}

/// Resolve a (possibly relative) href against the source's listing page.
pub fn resolve_link(base: &Url, href: &str) -> Result<String, ScoutError> {
    let href = href.trim();
    if href.is_empty() {
        return Err(ScoutError::parse("empty link"));
    }
    base.join(href)
        .map(String::from)
        .map_err(|e| ScoutError::parse(format!("bad link {:?}: {}", href, e)))
}

/// Render a number without a trailing ".0"; non-integers keep one decimal.
pub fn humanize_number(value: f64) -> String {
    if value.fract() == 0.0 {
        return format!("{}", value as i64);
    }
    let formatted = format!("{:.1}", value);
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}
