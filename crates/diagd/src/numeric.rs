//! Locale normalization for sheet cells.

/// Parse a sheet cell as a number, accepting a comma decimal separator
/// ("5,8" == 5.8). Blank and non-numeric cells are `None`.
pub fn parse_number(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Round to a fixed number of decimals. Trend slopes are rounded before
/// classification so threshold boundaries are not decided by float noise.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_accepts_comma_decimal() {
        assert_eq!(parse_number("5,8"), Some(5.8));
        assert_eq!(parse_number(" 7.25 "), Some(7.25));
        assert_eq!(parse_number("-3"), Some(-3.0));
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("ON"), None);
        assert_eq!(parse_number("NaN"), None);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(-0.49999999, 3), -0.5);
        assert_eq!(round_to(0.12346, 4), 0.1235);
    }
}
