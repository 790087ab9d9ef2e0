// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use time::Date;
use time::macros::format_description;

pub const DATE_LAYOUT: &str = "YYYY-MM-DD";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    InvalidMoney,
    NegativeMoney,
    InvalidDate,
    InvalidInt,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidMoney => f.write_str("invalid money value"),
            Self::NegativeMoney => f.write_str("negative money value"),
            Self::InvalidDate => f.write_str("invalid date value"),
            Self::InvalidInt => f.write_str("invalid integer value"),
        }
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult<T> = std::result::Result<T, ValidationError>;

pub fn parse_required_cents(input: &str) -> ValidationResult<i64> {
    parse_cents(input.trim())
}

pub fn parse_optional_cents(input: &str) -> ValidationResult<Option<i64>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    parse_cents(trimmed).map(Some)
}

pub fn format_cents(cents: i64) -> String {
    let (sign, cents) = normalize_sign(cents);
    let dollars = cents / 100;
    let remainder = cents % 100;
    format!("{sign}${}.{:02}", comma_format(dollars), remainder)
}

pub fn format_optional_cents(cents: Option<i64>) -> String {
    cents.map_or_else(String::new, format_cents)
}

pub fn parse_required_date(input: &str) -> ValidationResult<Date> {
    parse_date(input.trim())
}

pub fn parse_optional_date(input: &str) -> ValidationResult<Option<Date>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    parse_date(trimmed).map(Some)
}

pub fn format_date(value: Option<Date>) -> String {
    let Some(value) = value else {
        return String::new();
    };
    value
        .format(&format_description!("[year]-[month]-[day]"))
        .expect("date format is valid")
}

pub fn parse_optional_int(input: &str) -> ValidationResult<i32> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    let value = trimmed
        .parse::<i32>()
        .map_err(|_| ValidationError::InvalidInt)?;
    if value < 0 {
        return Err(ValidationError::InvalidInt);
    }
    Ok(value)
}

pub fn parse_required_int(input: &str) -> ValidationResult<i32> {
    if input.trim().is_empty() {
        return Err(ValidationError::InvalidInt);
    }
    parse_optional_int(input)
}

/// Positive whole number, e.g. a page size or appointment duration.
pub fn parse_positive_int(input: &str) -> ValidationResult<i32> {
    let value = parse_required_int(input)?;
    if value == 0 {
        return Err(ValidationError::InvalidInt);
    }
    Ok(value)
}

fn parse_cents(input: &str) -> ValidationResult<i64> {
    let cleaned: String = input
        .chars()
        .filter(|c| *c != '$' && *c != ',')
        .collect();
    if cleaned.is_empty() {
        return Err(ValidationError::InvalidMoney);
    }

    let negative = cleaned.starts_with('-');
    let unsigned = cleaned.trim_start_matches('-');

    let (dollars_raw, cents_raw) = match unsigned.split_once('.') {
        Some((dollars, cents)) => (dollars, cents),
        None => (unsigned, ""),
    };

    if cents_raw.len() > 2 || cents_raw.chars().any(|c| !c.is_ascii_digit()) {
        return Err(ValidationError::InvalidMoney);
    }

    let dollars = if dollars_raw.is_empty() {
        0
    } else {
        dollars_raw
            .parse::<i64>()
            .map_err(|_| ValidationError::InvalidMoney)?
    };

    let cents_fraction = match cents_raw.len() {
        0 => 0,
        1 => {
            cents_raw
                .parse::<i64>()
                .map_err(|_| ValidationError::InvalidMoney)?
                * 10
        }
        _ => cents_raw
            .parse::<i64>()
            .map_err(|_| ValidationError::InvalidMoney)?,
    };

    let total = dollars
        .checked_mul(100)
        .and_then(|value| value.checked_add(cents_fraction))
        .ok_or(ValidationError::InvalidMoney)?;

    if negative || total < 0 {
        return Err(ValidationError::NegativeMoney);
    }
    Ok(total)
}

fn parse_date(input: &str) -> ValidationResult<Date> {
    Date::parse(input, &format_description!("[year]-[month]-[day]"))
        .map_err(|_| ValidationError::InvalidDate)
}

fn normalize_sign(cents: i64) -> (&'static str, i64) {
    if cents < 0 {
        ("-", cents.saturating_abs())
    } else {
        ("", cents)
    }
}

fn comma_format(value: i64) -> String {
    let digits = value.to_string();
    let mut output = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            output.push(',');
        }
        output.push(digit);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::{
        ValidationError, format_cents, format_date, parse_optional_cents, parse_optional_date,
        parse_optional_int, parse_positive_int, parse_required_cents, parse_required_date,
    };
    use time::{Date, Month};

    #[test]
    fn cents_parse_handles_symbols_and_fractions() {
        assert_eq!(parse_required_cents("$1,250.50"), Ok(125_050));
        assert_eq!(parse_required_cents("80"), Ok(8_000));
        assert_eq!(parse_required_cents("12.5"), Ok(1_250));
        assert_eq!(parse_optional_cents("  "), Ok(None));
        assert_eq!(parse_optional_cents("42"), Ok(Some(4_200)));
    }

    #[test]
    fn cents_parse_rejects_garbage_and_negatives() {
        assert_eq!(
            parse_required_cents("12.345"),
            Err(ValidationError::InvalidMoney)
        );
        assert_eq!(
            parse_required_cents("abc"),
            Err(ValidationError::InvalidMoney)
        );
        assert_eq!(
            parse_required_cents("-5"),
            Err(ValidationError::NegativeMoney)
        );
    }

    #[test]
    fn cents_format_groups_thousands() {
        assert_eq!(format_cents(125_050), "$1,250.50");
        assert_eq!(format_cents(99), "$0.99");
        assert_eq!(format_cents(-1_500), "-$15.00");
    }

    #[test]
    fn date_parse_and_format_round_trip() {
        let parsed = parse_required_date("2026-03-09").expect("valid date");
        assert_eq!(
            parsed,
            Date::from_calendar_date(2026, Month::March, 9).expect("valid calendar date")
        );
        assert_eq!(format_date(Some(parsed)), "2026-03-09");
        assert_eq!(format_date(None), "");
        assert_eq!(parse_optional_date(""), Ok(None));
        assert_eq!(
            parse_required_date("03/09/2026"),
            Err(ValidationError::InvalidDate)
        );
    }

    #[test]
    fn int_parse_bounds() {
        assert_eq!(parse_optional_int(""), Ok(0));
        assert_eq!(parse_optional_int("14"), Ok(14));
        assert_eq!(parse_optional_int("-2"), Err(ValidationError::InvalidInt));
        assert_eq!(parse_positive_int("0"), Err(ValidationError::InvalidInt));
        assert_eq!(parse_positive_int("30"), Ok(30));
    }
}
