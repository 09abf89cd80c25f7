// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{Trade, TradeSide};
use crate::utils::{
    maybe_print_json, parse_date, parse_decimal, pretty_table, qty_from_decimal, qty_to_decimal,
};
use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("buy", sub)) => record_trade(conn, sub, TradeSide::Buy)?,
        Some(("sell", sub)) => record_trade(conn, sub, TradeSide::Sell)?,
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn record_trade(conn: &Connection, sub: &clap::ArgMatches, side: TradeSide) -> Result<()> {
    let date = parse_date(sub.get_one::<String>("date").unwrap().trim())?;
    let isin = sub
        .get_one::<String>("isin")
        .map(|s| s.trim().to_string())
        .unwrap();
    let qty = parse_decimal(sub.get_one::<String>("quantity").unwrap().trim())?.abs();
    let scaled_qty = qty_from_decimal(qty)?;
    let price = parse_decimal(sub.get_one::<String>("price").unwrap().trim())?;
    let name = sub.get_one::<String>("name").map(|s| s.trim().to_string());
    let symbol = sub.get_one::<String>("symbol").map(|s| s.trim().to_string());
    let exchange = sub
        .get_one::<String>("exchange")
        .map(|s| s.trim().to_string());

    // Ledger sign convention: a Buy's total is its cost, a Sell's total
    // is recorded negative and negated again at reporting time.
    let magnitude = match sub.get_one::<String>("total") {
        Some(raw) => parse_decimal(raw.trim())?.abs(),
        None => price * qty,
    };
    let total = match side {
        TradeSide::Buy => magnitude,
        TradeSide::Sell => -magnitude,
    };

    conn.execute(
        "INSERT INTO trades(date, name, isin, symbol, exchange, side, price, quantity, total)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
        params![
            date.to_string(),
            name,
            isin,
            symbol,
            exchange,
            side.as_str(),
            price.to_string(),
            scaled_qty,
            total.to_string()
        ],
    )?;
    println!(
        "Recorded {} {} x {} @ {} (total {})",
        side, qty, isin, price, total
    );
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let data = query_rows(conn, sub)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|t| {
                vec![
                    t.date.to_string(),
                    t.side.to_string(),
                    t.isin.clone(),
                    t.name.clone().unwrap_or_default(),
                    qty_to_decimal(t.quantity).to_string(),
                    t.price.to_string(),
                    t.total.to_string(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Date", "Side", "ISIN", "Name", "Qty", "Price", "Total"],
                rows,
            )
        );
    }
    Ok(())
}

pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<Trade>> {
    let mut sql = String::from(
        "SELECT id, date, name, isin, symbol, exchange, side, price, quantity, total
         FROM trades WHERE 1=1",
    );
    let mut params_vec: Vec<String> = Vec::new();

    if let Some(isin) = sub.get_one::<String>("isin") {
        sql.push_str(" AND isin=?");
        params_vec.push(isin.into());
    }
    if let Some(side) = sub.get_one::<String>("side") {
        let side: TradeSide = side.trim().parse()?;
        sql.push_str(" AND side=?");
        params_vec.push(side.as_str().into());
    }
    sql.push_str(" ORDER BY date DESC, id DESC");
    if let Some(limit) = sub.get_one::<usize>("limit") {
        sql.push_str(" LIMIT ?");
        params_vec.push(limit.to_string());
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = if params_vec.is_empty() {
        stmt.query([])?
    } else {
        let params: Vec<&dyn rusqlite::ToSql> = params_vec
            .iter()
            .map(|s| s as &dyn rusqlite::ToSql)
            .collect();
        stmt.query(rusqlite::params_from_iter(params))?
    };

    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        let id: i64 = r.get(0)?;
        let date_s: String = r.get(1)?;
        let side_s: String = r.get(6)?;
        let price_s: String = r.get(7)?;
        let total_s: String = r.get(9)?;
        data.push(Trade {
            id,
            date: parse_date(&date_s)
                .with_context(|| format!("Invalid stored date '{}' for trade {}", date_s, id))?,
            name: r.get(2)?,
            isin: r.get(3)?,
            symbol: r.get(4)?,
            exchange: r.get(5)?,
            side: side_s.parse()?,
            price: Decimal::from_str_exact(&price_s)
                .with_context(|| format!("Invalid stored price '{}' for trade {}", price_s, id))?,
            quantity: r.get(8)?,
            total: Decimal::from_str_exact(&total_s)
                .with_context(|| format!("Invalid stored total '{}' for trade {}", total_s, id))?,
        });
    }
    Ok(data)
}
