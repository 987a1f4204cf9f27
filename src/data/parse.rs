use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// Date and date-time layouts seen in the extracts, day before month.
const DATE_TIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
];

const DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d"];

/// Parse a day-first date, ignoring any time of day.
pub fn parse_day_first(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATE_TIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Parse a month reference. Accepts full day-first dates as well as
/// `MM/YYYY` and `YYYY-MM`, returning the first day of the month.
pub fn parse_month(raw: &str) -> Option<NaiveDate> {
    let value = raw.trim();
    if let Some(date) = parse_day_first(value) {
        return NaiveDate::from_ymd_opt(date.year(), date.month(), 1);
    }
    NaiveDate::parse_from_str(&format!("01/{value}"), "%d/%m/%Y")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d"))
        .ok()
}

/// Parse an amount written with either a comma or a dot as decimal mark.
/// Anything that is not a finite number becomes `None`.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    value
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Normalize an identifier column: trimmed, with the `.0` suffix that
/// spreadsheet round-trips add to integer codes removed.
pub fn normalize_code(raw: &str) -> String {
    let value = raw.trim();
    match value.strip_suffix(".0") {
        Some(stem) if !stem.is_empty() && stem.chars().all(|c| c.is_ascii_digit()) => {
            stem.to_string()
        }
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn day_comes_before_month() {
        assert_eq!(parse_day_first("03/04/2024"), Some(ymd(2024, 4, 3)));
        assert_eq!(parse_day_first("31-12-2023"), Some(ymd(2023, 12, 31)));
        assert_eq!(parse_day_first("13/01/2024 08:15:00"), Some(ymd(2024, 1, 13)));
        assert_eq!(parse_day_first("13/01/2024 08:15"), Some(ymd(2024, 1, 13)));
    }

    #[test]
    fn iso_dates_are_still_accepted() {
        assert_eq!(parse_day_first("2024-02-29"), Some(ymd(2024, 2, 29)));
        assert_eq!(parse_day_first("2024-02-29 10:00:00"), Some(ymd(2024, 2, 29)));
    }

    #[test]
    fn garbage_dates_are_rejected() {
        assert_eq!(parse_day_first(""), None);
        assert_eq!(parse_day_first("not a date"), None);
        assert_eq!(parse_day_first("32/01/2024"), None);
    }

    #[test]
    fn months_snap_to_first_day() {
        assert_eq!(parse_month("15/03/2024"), Some(ymd(2024, 3, 1)));
        assert_eq!(parse_month("03/2024"), Some(ymd(2024, 3, 1)));
        assert_eq!(parse_month("2024-03"), Some(ymd(2024, 3, 1)));
        assert_eq!(parse_month("march"), None);
    }

    #[test]
    fn comma_decimals_are_normalized() {
        assert_eq!(parse_decimal("1234,56"), Some(1234.56));
        assert_eq!(parse_decimal(" 10.5 "), Some(10.5));
        assert_eq!(parse_decimal("1.234,56"), None);
        assert_eq!(parse_decimal("abc"), None);
        assert_eq!(parse_decimal(""), None);
    }

    #[test]
    fn integer_codes_lose_float_suffix() {
        assert_eq!(normalize_code(" 1042.0 "), "1042");
        assert_eq!(normalize_code("1042"), "1042");
        assert_eq!(normalize_code("A.0"), "A.0");
    }
}
