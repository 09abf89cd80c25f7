// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::anyhow;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "Buy",
            TradeSide::Sell => "Sell",
        }
    }
}

impl FromStr for TradeSide {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Buy" => Ok(TradeSide::Buy),
            "Sell" => Ok(TradeSide::Sell),
            other => Err(anyhow!("Unknown trade side '{}'", other)),
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MovementKind {
    Dividends,
    Invoice,
    Funding,
    Divestment,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Dividends => "Dividends",
            MovementKind::Invoice => "Invoice",
            MovementKind::Funding => "Funding",
            MovementKind::Divestment => "Divestment",
        }
    }
}

impl FromStr for MovementKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Dividends" => Ok(MovementKind::Dividends),
            "Invoice" => Ok(MovementKind::Invoice),
            "Funding" => Ok(MovementKind::Funding),
            "Divestment" => Ok(MovementKind::Divestment),
            other => Err(anyhow!("Unknown movement kind '{}'", other)),
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One executed trade. `quantity` is the share count scaled by
/// `utils::QTY_FACTOR`; `total` follows the ledger sign convention
/// (positive cost for a Buy, negative proceeds for a Sell).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: i64,
    pub date: NaiveDate,
    pub name: Option<String>,
    pub isin: String,
    pub symbol: Option<String>,
    pub exchange: Option<String>,
    pub side: TradeSide,
    pub price: Decimal,
    pub quantity: i64,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movement {
    pub id: i64,
    pub date: NaiveDate,
    pub kind: MovementKind,
    pub amount: Decimal,
}

/// One row of the append-only match ledger: `quantity` units (scaled)
/// of purchase `purchase_id` were consumed to satisfy sale `sale_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: i64,
    pub sale_id: i64,
    pub purchase_id: i64,
    pub quantity: i64,
}
