use chrono::NaiveDate;

use crate::domain::{parse_cents, BillMonth, Cents};

use super::AppError;

/// Parse a `YYYY-MM-DD` business day.
pub fn parse_day(input: &str) -> Result<NaiveDate, AppError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AppError::MissingField("date".to_string()));
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|_| AppError::InvalidDate(input.to_string()))
}

/// Parse a `YYYY-MM` billing month.
pub fn parse_month(input: &str) -> Result<BillMonth, AppError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AppError::MissingField("month".to_string()));
    }
    input
        .parse()
        .map_err(|_| AppError::InvalidMonth(input.to_string()))
}

/// Parse a non-negative money amount such as "25" or "25.50".
pub fn parse_price(input: &str) -> Result<Cents, AppError> {
    let cents = parse_cents(input)
        .map_err(|e| AppError::InvalidAmount(format!("'{}': {}", input.trim(), e)))?;
    if cents < 0 {
        return Err(AppError::InvalidAmount(format!(
            "'{}' cannot be negative",
            input.trim()
        )));
    }
    Ok(cents)
}

/// Reject blank customer names before any lookup.
pub(crate) fn require_name<'a>(field: &str, value: &'a str) -> Result<&'a str, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::MissingField(field.to_string()));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_day() {
        assert_eq!(
            parse_day("2024-03-09").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
        );
        assert!(matches!(parse_day(""), Err(AppError::MissingField(_))));
        assert!(matches!(
            parse_day("09/03/2024"),
            Err(AppError::InvalidDate(_))
        ));
        assert!(matches!(
            parse_day("2024-02-30"),
            Err(AppError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_parse_month() {
        assert_eq!(parse_month("2024-03").unwrap().to_string(), "2024-03");
        assert!(matches!(parse_month(" "), Err(AppError::MissingField(_))));
        assert!(matches!(
            parse_month("2024-3"),
            Err(AppError::InvalidMonth(_))
        ));
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("25.50").unwrap(), 2550);
        assert!(matches!(parse_price("-1"), Err(AppError::InvalidAmount(_))));
        assert!(matches!(parse_price("ten"), Err(AppError::InvalidAmount(_))));
    }

    #[test]
    fn test_require_name() {
        assert_eq!(require_name("customer", " Hotel ").unwrap(), "Hotel");
        assert!(matches!(
            require_name("customer", "  "),
            Err(AppError::MissingField(f)) if f == "customer"
        ));
    }
}
