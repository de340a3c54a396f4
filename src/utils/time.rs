use chrono::NaiveDate;

/// Date format the historical endpoints expect for `from`/`to`.
pub const API_DATE_FORMAT: &str = "%d-%m-%Y";

const RECORD_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%b-%Y", "%d-%m-%Y"];

pub fn api_date(date: NaiveDate) -> String {
    date.format(API_DATE_FORMAT).to_string()
}

/// Contract expiry as the derivatives endpoint spells it, e.g. `30-JAN-2020`.
pub fn expiry_code(date: NaiveDate) -> String {
    date.format("%d-%b-%Y").to_string().to_uppercase()
}

/// Parse the date strings that show up inside API records.
pub fn parse_record_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    RECORD_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn formats_api_dates() {
        assert_eq!(api_date(date(2020, 4, 5)), "05-04-2020");
        assert_eq!(expiry_code(date(2020, 1, 30)), "30-JAN-2020");
    }

    #[test]
    fn parses_record_dates_in_known_formats() {
        assert_eq!(parse_record_date("2020-01-02"), Some(date(2020, 1, 2)));
        assert_eq!(parse_record_date("30-Jan-2020"), Some(date(2020, 1, 30)));
        assert_eq!(parse_record_date(" 30-JAN-2020 "), Some(date(2020, 1, 30)));
        assert_eq!(parse_record_date("02-01-2020"), Some(date(2020, 1, 2)));
        assert_eq!(parse_record_date("yesterday"), None);
    }
}
