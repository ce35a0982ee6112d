use crate::core::rates::RateTable;
use crate::domain::model::{Record, CREATION_DATE_FIELD, CURRENCY_FIELD, PRICE_FIELD};
use crate::utils::error::{NormalizerError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Fraction digits kept on converted prices.
pub const PRICE_SCALE: u32 = 2;

/// Normalizes one listing row.
///
/// Rows without both `price` and `currency`, and rows whose currency is not in
/// the rate table, pass through with only `creationDate` added. Convertible
/// rows get the price in the reference currency, rounded half-up to cents.
/// An unparseable price is an error and the caller drops the row.
pub fn normalize(row: &Record, rates: &RateTable, now: DateTime<Utc>) -> Result<Record> {
    let mut normalized = row.clone();

    if let (Some(price), Some(currency)) = (row.get(PRICE_FIELD), row.get(CURRENCY_FIELD)) {
        match rates.multiplier(currency) {
            Some(multiplier) => {
                let converted = convert_price(price, multiplier)?;
                normalized.set(PRICE_FIELD, converted.to_string());
                normalized.set(CURRENCY_FIELD, rates.reference());
            }
            None => {
                tracing::debug!("No rate for currency '{}', price left unconverted", currency);
            }
        }
    }

    normalized.set(CREATION_DATE_FIELD, format_timestamp(now));
    Ok(normalized)
}

fn convert_price(price: &str, multiplier: Decimal) -> Result<Decimal> {
    let amount = parse_decimal(price).ok_or_else(|| NormalizerError::InvalidPrice {
        value: price.to_string(),
        reason: unparseable_reason(price).to_string(),
    })?;

    let converted = amount
        .checked_mul(multiplier)
        .ok_or_else(|| NormalizerError::InvalidPrice {
            value: price.to_string(),
            reason: format!("conversion by {} overflows", multiplier),
        })?;

    Ok(round_half_up(converted, PRICE_SCALE))
}

/// Rounds half away from zero and pads to exactly `dp` fraction digits, so
/// `10.005 -> 10.01` and `110 -> 110.00`.
pub fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(dp);
    rounded
}

/// Exact decimal parse of plain (`12.50`) or scientific (`1.25e3`) text.
pub(crate) fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(text)
        .ok()
        .or_else(|| Decimal::from_scientific(text).ok())
}

/// Tells a well-formed number that `Decimal` cannot hold (more than 28
/// significant digits, or a magnitude past about 7.9e28) apart from junk.
pub(crate) fn unparseable_reason(text: &str) -> &'static str {
    match text.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => "out of decimal range",
        _ => "not a decimal number",
    }
}

pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    fn rates() -> RateTable {
        RateTable::from_multipliers(
            "USD",
            HashMap::from([
                ("USD".to_string(), Decimal::ONE),
                ("EUR".to_string(), dec!(1.10)),
                ("GBP".to_string(), dec!(1.2745)),
            ]),
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    fn row(fields: &[(&str, &str)]) -> Record {
        fields.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn test_converts_eur_listing() {
        let input = row(&[("price", "100"), ("currency", "EUR"), ("zpid", "123")]);

        let output = normalize(&input, &rates(), now()).unwrap();

        assert_eq!(output.get("price"), Some("110.00"));
        assert_eq!(output.get("currency"), Some("USD"));
        assert_eq!(output.get("zpid"), Some("123"));
        assert_eq!(output.get("creationDate"), Some("2024-05-01T12:30:00.000000Z"));
        let names: Vec<&str> = output.field_names().collect();
        assert_eq!(names, vec!["price", "currency", "zpid", "creationDate"]);
    }

    #[test]
    fn test_rounds_half_up_at_boundary() {
        let table = RateTable::from_multipliers("USD", HashMap::from([("CAD".to_string(), Decimal::ONE)]));
        let input = row(&[("price", "10.005"), ("currency", "CAD")]);

        let output = normalize(&input, &table, now()).unwrap();

        assert_eq!(output.get("price"), Some("10.01"));
    }

    #[test]
    fn test_round_half_up_is_not_bankers() {
        assert_eq!(round_half_up(dec!(10.005), 2).to_string(), "10.01");
        assert_eq!(round_half_up(dec!(10.015), 2).to_string(), "10.02");
        assert_eq!(round_half_up(dec!(-10.005), 2).to_string(), "-10.01");
        assert_eq!(round_half_up(dec!(10.004999), 2).to_string(), "10.00");
        assert_eq!(round_half_up(dec!(7), 2).to_string(), "7.00");
    }

    #[test]
    fn test_gbp_conversion_matches_formula() {
        let input = row(&[("price", "249999.99"), ("currency", "GBP")]);

        let output = normalize(&input, &rates(), now()).unwrap();

        let expected = round_half_up(dec!(249999.99) * dec!(1.2745), 2);
        assert_eq!(output.get("price"), Some(expected.to_string().as_str()));
        assert_eq!(output.get("price"), Some("318624.99"));
    }

    #[test]
    fn test_missing_price_or_currency_passes_through() {
        let no_currency = row(&[("zpid", "1"), ("price", "abc")]);
        let output = normalize(&no_currency, &rates(), now()).unwrap();
        assert_eq!(output.get("price"), Some("abc"));
        assert_eq!(output.len(), 3);

        let no_price = row(&[("zpid", "2"), ("currency", "EUR")]);
        let output = normalize(&no_price, &rates(), now()).unwrap();
        assert_eq!(output.get("currency"), Some("EUR"));
        assert!(output.contains("creationDate"));
    }

    #[test]
    fn test_unknown_currency_passes_through() {
        let input = row(&[("price", "500000"), ("currency", "JPY"), ("zpid", "7")]);

        let output = normalize(&input, &rates(), now()).unwrap();

        assert_eq!(output.get("price"), Some("500000"));
        assert_eq!(output.get("currency"), Some("JPY"));
        assert!(output.contains("creationDate"));
    }

    #[test]
    fn test_invalid_price_is_an_error() {
        for bad in ["abc", "", "1,000", "12.5.3"] {
            let input = row(&[("price", bad), ("currency", "EUR")]);
            let err = normalize(&input, &rates(), now()).unwrap_err();
            assert!(matches!(err, NormalizerError::InvalidPrice { .. }), "price {:?}", bad);
        }
    }

    #[test]
    fn test_out_of_range_price_reports_range() {
        let input = row(&[("price", "1e30"), ("currency", "EUR")]);

        let err = normalize(&input, &rates(), now()).unwrap_err();

        match err {
            NormalizerError::InvalidPrice { value, reason } => {
                assert_eq!(value, "1e30");
                assert_eq!(reason, "out of decimal range");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_unparseable_reason_tells_range_from_junk() {
        assert_eq!(unparseable_reason("99999999999999999999999999999999"), "out of decimal range");
        assert_eq!(unparseable_reason("call us"), "not a decimal number");
        assert_eq!(unparseable_reason("NaN"), "not a decimal number");
        assert_eq!(unparseable_reason(""), "not a decimal number");
    }

    #[test]
    fn test_price_parsing_accepts_whitespace_and_exponent() {
        let input = row(&[("price", " 1.5e3 "), ("currency", "USD")]);
        let output = normalize(&input, &rates(), now()).unwrap();
        assert_eq!(output.get("price"), Some("1500.00"));
    }

    #[test]
    fn test_existing_creation_date_is_replaced() {
        let input = row(&[("creationDate", "old"), ("zpid", "3")]);
        let output = normalize(&input, &rates(), now()).unwrap();
        assert_eq!(output.get("creationDate"), Some("2024-05-01T12:30:00.000000Z"));
        assert_eq!(output.field_names().next(), Some("creationDate"));
    }
}
