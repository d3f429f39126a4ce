use itertools::Itertools;
use regex::Regex;

use crate::error::{ConfigError, WarroomResult};

/// Separator characters the workbook's author has used inside tab names,
/// in addition to plain whitespace. The full-width dash shows up when the
/// name was typed with a CJK input method.
const NAME_SEPARATORS: [char; 5] = ['_', '－', '/', '.', '-'];

/// Normalized form of a tab name: whitespace and separator variants removed.
pub fn normalize_sheet_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && !NAME_SEPARATORS.contains(c))
        .collect()
}

/// Normalized candidates for a monthly tab, zero-padded and unpadded.
pub fn monthly_candidates(label: &str, year: i32, month: u32) -> Vec<String> {
    [
        format!("{label}{year}{month}"),
        format!("{label}{year}{month:02}"),
    ]
    .into_iter()
    .unique()
    .collect()
}

/// Resolves the raw tab name holding the daily report for `year`/`month`.
///
/// Returns the first raw name whose normalized form equals a candidate, or
/// `None`. Callers treat `None` as "month absent", never as an error.
pub fn resolve_monthly_sheet<'a>(
    sheet_names: &'a [String],
    label: &str,
    year: i32,
    month: u32,
) -> Option<&'a str> {
    let candidates = monthly_candidates(label, year, month);
    sheet_names
        .iter()
        .find(|raw| {
            let normalized = normalize_sheet_name(raw);
            candidates.iter().any(|c| *c == normalized)
        })
        .map(String::as_str)
}

/// Resolves the first tab whose raw name contains `marker`.
///
/// Used for the trade-log tab, whose name only has to *contain* the marker
/// (the author decorates it freely).
pub fn resolve_marked_sheet<'a>(sheet_names: &'a [String], marker: &str) -> Option<&'a str> {
    sheet_names
        .iter()
        .find(|raw| raw.contains(marker))
        .map(String::as_str)
}

/// Years for which at least one daily-report tab exists, newest first.
pub fn detect_years(sheet_names: &[String], label: &str) -> WarroomResult<Vec<i32>> {
    let pattern = format!(r"{}(\d{{4}})", regex::escape(&normalize_sheet_name(label)));
    let re = Regex::new(&pattern)
        .map_err(|e| ConfigError::InvalidSheetLabel(format!("Label not regex-safe: {e}")))?;

    let years = sheet_names
        .iter()
        .filter_map(|raw| {
            let normalized = normalize_sheet_name(raw);
            re.captures(&normalized)
                .and_then(|caps| caps.get(1))
                .and_then(|m| m.as_str().parse::<i32>().ok())
        })
        .unique()
        .sorted_unstable()
        .rev()
        .collect();

    Ok(years)
}
