use chrono::NaiveDate;

pub mod assets;
pub mod export;
pub mod files;
pub mod text;
pub mod validation;

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";

/// `YYYY-MM-DD` to `DD/MM/YYYY`. Empty input stays empty, anything unrecognized is returned
/// unchanged.
pub fn format_date(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return date.format(DISPLAY_DATE_FORMAT).to_string();
    }
    // keep partial or out-of-range dates readable, e.g. 2025-13-40
    let parts: Vec<&str> = trimmed.split('-').collect();
    match parts.as_slice() {
        [y, m, d] if !y.is_empty() && !m.is_empty() && !d.is_empty() => format!("{d}/{m}/{y}"),
        _ => input.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_iso_dates() {
        assert_eq!(format_date("2024-12-31"), "31/12/2024");
        assert_eq!(format_date("2025-05-15"), "15/05/2025");
    }

    #[test]
    fn empty_stays_empty() {
        assert_eq!(format_date(""), "");
        assert_eq!(format_date("   "), "");
    }

    #[test]
    fn unrecognized_is_unchanged() {
        assert_eq!(format_date("15 de mayo"), "15 de mayo");
        assert_eq!(format_date("2025-05"), "2025-05");
    }

    #[test]
    fn out_of_range_parts_are_reordered() {
        assert_eq!(format_date("2025-13-40"), "40/13/2025");
    }
}
