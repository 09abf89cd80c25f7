// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::{Movement, MovementKind};
use crate::utils::{maybe_print_json, parse_date, parse_decimal, pretty_table};
use anyhow::{Context, Result};
use rusqlite::{Connection, params};
use rust_decimal::Decimal;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let date = parse_date(sub.get_one::<String>("date").unwrap().trim())?;
    let kind: MovementKind = sub.get_one::<String>("kind").unwrap().trim().parse()?;
    let amount = parse_decimal(sub.get_one::<String>("amount").unwrap().trim())?;

    conn.execute(
        "INSERT INTO movements(date, kind, amount) VALUES (?1, ?2, ?3)",
        params![date.to_string(), kind.as_str(), amount.to_string()],
    )?;
    println!("Recorded {} of {} on {}", kind, amount, date);
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let data = query_rows(conn, sub)?;
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|m| vec![m.date.to_string(), m.kind.to_string(), m.amount.to_string()])
            .collect();
        println!("{}", pretty_table(&["Date", "Kind", "Amount"], rows));
    }
    Ok(())
}

pub fn query_rows(conn: &Connection, sub: &clap::ArgMatches) -> Result<Vec<Movement>> {
    let mut sql = String::from("SELECT id, date, kind, amount FROM movements WHERE 1=1");
    let mut params_vec: Vec<String> = Vec::new();

    if let Some(kind) = sub.get_one::<String>("kind") {
        let kind: MovementKind = kind.trim().parse()?;
        sql.push_str(" AND kind=?");
        params_vec.push(kind.as_str().into());
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
        let kind_s: String = r.get(2)?;
        let amount_s: String = r.get(3)?;
        data.push(Movement {
            id,
            date: parse_date(&date_s)
                .with_context(|| format!("Invalid stored date '{}' for movement {}", date_s, id))?,
            kind: kind_s.parse()?,
            amount: Decimal::from_str_exact(&amount_s).with_context(|| {
                format!("Invalid stored amount '{}' for movement {}", amount_s, id)
            })?,
        });
    }
    Ok(data)
}
