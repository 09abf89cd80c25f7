// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{MovementKind, TradeSide};
use crate::utils::{parse_date, parse_decimal, qty_from_decimal};
use anyhow::{Context, Result};
use csv::ReaderBuilder;
use rusqlite::{Connection, params};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("trades", sub)) => import_trades(conn, sub),
        Some(("movements", sub)) => import_movements(conn, sub),
        _ => Ok(()),
    }
}

/// Columns: date, name, isin, symbol, exchange, side, price, quantity, total.
/// The header row is skipped; quantities are scaled to integers on ingest.
fn import_trades(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let path = sub.get_one::<String>("path").unwrap().trim();
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Open CSV {}", path))?;

    let tx = conn.transaction()?;
    let mut count = 0usize;
    {
        let mut insert = tx.prepare(
            "INSERT INTO trades(date, name, isin, symbol, exchange, side, price, quantity, total)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
        )?;

        for result in rdr.records() {
            let rec = result?;
            let date_raw = rec.get(0).context("date missing")?.trim();
            let name = rec.get(1).unwrap_or("").trim();
            let isin = rec.get(2).context("isin missing")?.trim();
            let symbol = rec.get(3).unwrap_or("").trim();
            let exchange = rec.get(4).unwrap_or("").trim();
            let side_raw = rec.get(5).context("side missing")?.trim();
            let price_raw = rec.get(6).context("price missing")?.trim();
            let qty_raw = rec.get(7).context("quantity missing")?.trim();
            let total_raw = rec.get(8).context("total missing")?.trim();

            let date = parse_date(date_raw)
                .with_context(|| format!("Invalid trade date '{}'", date_raw))?;
            let side: TradeSide = side_raw
                .parse()
                .with_context(|| format!("Invalid trade side '{}' on {}", side_raw, date))?;
            let price = parse_decimal(price_raw)
                .with_context(|| format!("Invalid price '{}' for {}", price_raw, isin))?;
            let quantity = parse_decimal(qty_raw)
                .and_then(qty_from_decimal)
                .with_context(|| format!("Invalid quantity '{}' for {}", qty_raw, isin))?;
            let total = parse_decimal(total_raw)
                .with_context(|| format!("Invalid total '{}' for {}", total_raw, isin))?;

            insert.execute(params![
                date.to_string(),
                if name.is_empty() { None } else { Some(name) },
                isin,
                if symbol.is_empty() { None } else { Some(symbol) },
                if exchange.is_empty() { None } else { Some(exchange) },
                side.as_str(),
                price.to_string(),
                quantity,
                total.to_string()
            ])?;
            count += 1;
        }
    }
    tx.commit()?;
    println!("Imported {} trades from {}", count, path);
    Ok(())
}

/// Columns: date, kind, amount.
fn import_movements(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let path = sub.get_one::<String>("path").unwrap().trim();
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Open CSV {}", path))?;

    let tx = conn.transaction()?;
    let mut count = 0usize;
    {
        let mut insert =
            tx.prepare("INSERT INTO movements(date, kind, amount) VALUES (?1, ?2, ?3)")?;

        for result in rdr.records() {
            let rec = result?;
            let date_raw = rec.get(0).context("date missing")?.trim();
            let kind_raw = rec.get(1).context("kind missing")?.trim();
            let amount_raw = rec.get(2).context("amount missing")?.trim();

            let date = parse_date(date_raw)
                .with_context(|| format!("Invalid movement date '{}'", date_raw))?;
            let kind: MovementKind = kind_raw
                .parse()
                .with_context(|| format!("Invalid movement kind '{}' on {}", kind_raw, date))?;
            let amount = parse_decimal(amount_raw)
                .with_context(|| format!("Invalid amount '{}' on {}", amount_raw, date))?;

            insert.execute(params![date.to_string(), kind.as_str(), amount.to_string()])?;
            count += 1;
        }
    }
    tx.commit()?;
    println!("Imported {} movements from {}", count, path);
    Ok(())
}
