// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Share quantities are stored as integers scaled by this factor,
/// i.e. with exactly 5 fractional digits.
pub const QTY_FACTOR: i64 = 100_000;

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

pub fn parse_year(s: &str) -> Result<i32> {
    let y: i32 = s
        .parse()
        .with_context(|| format!("Invalid year '{}'", s))?;
    if !(1000..=9999).contains(&y) {
        return Err(anyhow!("Invalid year '{}', expected a four-digit year", s));
    }
    Ok(y)
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    s.parse::<Decimal>()
        .with_context(|| format!("Invalid decimal '{}'", s))
}

/// Scaled share count to its exact decimal form (5 fractional digits).
pub fn qty_to_decimal(scaled: i64) -> Decimal {
    Decimal::new(scaled, 5)
}

/// Exact decimal share count to its scaled integer form. Rejects values
/// with more than 5 fractional digits rather than rounding them.
pub fn qty_from_decimal(d: Decimal) -> Result<i64> {
    let scaled = d * Decimal::from(QTY_FACTOR);
    if !scaled.is_integer() {
        return Err(anyhow!(
            "Quantity '{}' has more than 5 decimal places",
            d
        ));
    }
    scaled
        .to_i64()
        .ok_or_else(|| anyhow!("Quantity '{}' out of range", d))
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn qty_round_trips_through_scaled_form() {
        let d = Decimal::from_str("12.34567").unwrap();
        let scaled = qty_from_decimal(d).unwrap();
        assert_eq!(scaled, 1_234_567);
        assert_eq!(qty_to_decimal(scaled), d);
    }

    #[test]
    fn qty_rejects_more_than_five_decimal_places() {
        let d = Decimal::from_str("1.000001").unwrap();
        assert!(qty_from_decimal(d).is_err());
    }

    #[test]
    fn qty_accepts_whole_numbers() {
        assert_eq!(qty_from_decimal(Decimal::from(10)).unwrap(), 1_000_000);
        assert_eq!(qty_to_decimal(1_000_000), Decimal::from_str("10.00000").unwrap());
    }

    #[test]
    fn parse_year_rejects_garbage() {
        assert!(parse_year("20x5").is_err());
        assert!(parse_year("99").is_err());
        assert_eq!(parse_year("2020").unwrap(), 2020);
    }
}
