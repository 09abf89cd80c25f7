// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{pretty_table, qty_to_decimal};
use anyhow::Result;
use rusqlite::Connection;
use rust_decimal::Decimal;

pub fn handle(conn: &Connection) -> Result<()> {
    let rows = collect_issues(conn)?;
    if rows.is_empty() {
        println!("doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}

pub fn collect_issues(conn: &Connection) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();

    // 1) Purchases consumed beyond their own quantity
    let mut stmt = conn.prepare(
        "SELECT t.id, t.isin, t.quantity, SUM(r.quantity) AS matched
         FROM trades t JOIN reconciliation r ON t.id = r.purchase_id
         WHERE t.side = 'Buy'
         GROUP BY t.id, t.isin, t.quantity
         HAVING matched > t.quantity",
    )?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        let isin: String = r.get(1)?;
        let quantity: i64 = r.get(2)?;
        let matched: i64 = r.get(3)?;
        rows.push(vec![
            "over_matched_purchase".into(),
            format!(
                "purchase {} ({}) holds {} but {} matched",
                id,
                isin,
                qty_to_decimal(quantity),
                qty_to_decimal(matched)
            ),
        ]);
    }

    // 2) Matches pairing trades of different securities
    let mut stmt2 = conn.prepare(
        "SELECT r.id, s.isin, p.isin FROM reconciliation r
         JOIN trades s ON r.sale_id = s.id
         JOIN trades p ON r.purchase_id = p.id
         WHERE s.isin <> p.isin",
    )?;
    let mut cur2 = stmt2.query([])?;
    while let Some(r) = cur2.next()? {
        let id: i64 = r.get(0)?;
        let sale_isin: String = r.get(1)?;
        let purchase_isin: String = r.get(2)?;
        rows.push(vec![
            "cross_isin_match".into(),
            format!("match {} pairs {} with {}", id, sale_isin, purchase_isin),
        ]);
    }

    // 3) Matches whose referenced trades are missing or of the wrong side
    let mut stmt3 = conn.prepare(
        "SELECT r.id, r.sale_id, r.purchase_id, s.side, p.side
         FROM reconciliation r
         LEFT JOIN trades s ON r.sale_id = s.id
         LEFT JOIN trades p ON r.purchase_id = p.id
         WHERE s.id IS NULL OR p.id IS NULL OR s.side <> 'Sell' OR p.side <> 'Buy'",
    )?;
    let mut cur3 = stmt3.query([])?;
    while let Some(r) = cur3.next()? {
        let id: i64 = r.get(0)?;
        let sale_id: i64 = r.get(1)?;
        let purchase_id: i64 = r.get(2)?;
        rows.push(vec![
            "dangling_match".into(),
            format!("match {} references sale {} / purchase {}", id, sale_id, purchase_id),
        ]);
    }

    // 4) FIFO order: a later purchase must not be consumed while an earlier
    //    purchase of the same security still has unconsumed quantity
    let mut stmt4 = conn.prepare(
        "WITH consumed AS (
             SELECT t.id, t.isin, t.date, t.quantity, IFNULL(SUM(r.quantity),0) AS matched
             FROM trades t LEFT JOIN reconciliation r ON t.id = r.purchase_id
             WHERE t.side = 'Buy'
             GROUP BY t.id, t.isin, t.date, t.quantity
         )
         SELECT a.id, b.id, a.isin FROM consumed a
         JOIN consumed b ON a.isin = b.isin
             AND (a.date < b.date OR (a.date = b.date AND a.id < b.id))
         WHERE b.matched > 0 AND a.matched < a.quantity",
    )?;
    let mut cur4 = stmt4.query([])?;
    while let Some(r) = cur4.next()? {
        let earlier: i64 = r.get(0)?;
        let later: i64 = r.get(1)?;
        let isin: String = r.get(2)?;
        rows.push(vec![
            "fifo_violation".into(),
            format!(
                "purchase {} ({}) consumed before earlier purchase {}",
                later, isin, earlier
            ),
        ]);
    }

    // 5) Sales not (yet) fully covered by match records
    let mut stmt5 = conn.prepare(
        "SELECT t.id, t.isin, t.date, t.quantity, IFNULL(SUM(r.quantity),0) AS matched
         FROM trades t LEFT JOIN reconciliation r ON t.id = r.sale_id
         WHERE t.side = 'Sell'
         GROUP BY t.id, t.isin, t.date, t.quantity
         HAVING matched <> t.quantity",
    )?;
    let mut cur5 = stmt5.query([])?;
    while let Some(r) = cur5.next()? {
        let id: i64 = r.get(0)?;
        let isin: String = r.get(1)?;
        let date: String = r.get(2)?;
        let quantity: i64 = r.get(3)?;
        let matched: i64 = r.get(4)?;
        rows.push(vec![
            "unreconciled_sale".into(),
            format!(
                "sale {} ({}) on {}: {} of {} matched",
                id,
                isin,
                date,
                qty_to_decimal(matched),
                qty_to_decimal(quantity)
            ),
        ]);
    }

    // 6) Stored decimals and the sale-total sign convention
    let mut stmt6 = conn.prepare("SELECT id, side, price, total FROM trades ORDER BY id")?;
    let mut cur6 = stmt6.query([])?;
    while let Some(r) = cur6.next()? {
        let id: i64 = r.get(0)?;
        let side: String = r.get(1)?;
        let price: String = r.get(2)?;
        let total: String = r.get(3)?;
        if Decimal::from_str_exact(&price).is_err() {
            rows.push(vec![
                "invalid_decimal".into(),
                format!("trade {} price '{}'", id, price),
            ]);
        }
        match Decimal::from_str_exact(&total) {
            Err(_) => rows.push(vec![
                "invalid_decimal".into(),
                format!("trade {} total '{}'", id, total),
            ]),
            Ok(t) if side == "Sell" && t > Decimal::ZERO => rows.push(vec![
                "positive_sale_total".into(),
                format!("sale {} has total {} (proceeds are stored negative)", id, t),
            ]),
            Ok(_) => {}
        }
    }
    let mut stmt7 = conn.prepare("SELECT id, amount FROM movements ORDER BY id")?;
    let mut cur7 = stmt7.query([])?;
    while let Some(r) = cur7.next()? {
        let id: i64 = r.get(0)?;
        let amount: String = r.get(1)?;
        if Decimal::from_str_exact(&amount).is_err() {
            rows.push(vec![
                "invalid_decimal".into(),
                format!("movement {} amount '{}'", id, amount),
            ]);
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::{Connection, params};

    fn setup_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE trades(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                name TEXT,
                isin TEXT NOT NULL,
                symbol TEXT,
                exchange TEXT,
                side TEXT NOT NULL,
                price TEXT NOT NULL,
                quantity INTEGER NOT NULL,
                total TEXT NOT NULL
            );
            CREATE TABLE movements(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                kind TEXT NOT NULL,
                amount TEXT NOT NULL
            );
            CREATE TABLE reconciliation(
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sale_id INTEGER NOT NULL,
                purchase_id INTEGER NOT NULL,
                quantity INTEGER NOT NULL
            );
            "#,
        )
        .unwrap();
        conn
    }

    fn insert_trade(conn: &Connection, date: &str, isin: &str, side: &str, qty: i64, total: &str) -> i64 {
        conn.execute(
            "INSERT INTO trades(date, isin, side, price, quantity, total) VALUES (?1,?2,?3,'10',?4,?5)",
            params![date, isin, side, qty, total],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    fn issue_kinds(rows: &[Vec<String>]) -> Vec<&str> {
        rows.iter().map(|r| r[0].as_str()).collect()
    }

    #[test]
    fn clean_ledger_has_no_issues() {
        let conn = setup_conn();
        let buy = insert_trade(&conn, "2020-01-01", "IE00B0", "Buy", 1_000_000, "1000");
        let sell = insert_trade(&conn, "2020-06-01", "IE00B0", "Sell", 1_000_000, "-1500");
        conn.execute(
            "INSERT INTO reconciliation(sale_id, purchase_id, quantity) VALUES (?1, ?2, 1000000)",
            params![sell, buy],
        )
        .unwrap();

        assert!(collect_issues(&conn).unwrap().is_empty());
    }

    #[test]
    fn over_matched_purchase_is_flagged() {
        let conn = setup_conn();
        let buy = insert_trade(&conn, "2020-01-01", "IE00B0", "Buy", 500_000, "500");
        let sell = insert_trade(&conn, "2020-06-01", "IE00B0", "Sell", 800_000, "-1200");
        conn.execute(
            "INSERT INTO reconciliation(sale_id, purchase_id, quantity) VALUES (?1, ?2, 800000)",
            params![sell, buy],
        )
        .unwrap();

        let rows = collect_issues(&conn).unwrap();
        assert!(issue_kinds(&rows).contains(&"over_matched_purchase"));
    }

    #[test]
    fn fifo_violation_is_flagged() {
        let conn = setup_conn();
        let _old = insert_trade(&conn, "2020-01-01", "IE00B0", "Buy", 500_000, "500");
        let newer = insert_trade(&conn, "2020-02-01", "IE00B0", "Buy", 500_000, "600");
        let sell = insert_trade(&conn, "2020-06-01", "IE00B0", "Sell", 300_000, "-450");
        // Hand-written match skipping the older lot.
        conn.execute(
            "INSERT INTO reconciliation(sale_id, purchase_id, quantity) VALUES (?1, ?2, 300000)",
            params![sell, newer],
        )
        .unwrap();

        let rows = collect_issues(&conn).unwrap();
        assert!(issue_kinds(&rows).contains(&"fifo_violation"));
    }

    #[test]
    fn cross_isin_and_dangling_matches_are_flagged() {
        let conn = setup_conn();
        let buy = insert_trade(&conn, "2020-01-01", "IE00AAA", "Buy", 500_000, "500");
        let sell = insert_trade(&conn, "2020-06-01", "IE00BBB", "Sell", 500_000, "-600");
        conn.execute(
            "INSERT INTO reconciliation(sale_id, purchase_id, quantity) VALUES (?1, ?2, 500000)",
            params![sell, buy],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO reconciliation(sale_id, purchase_id, quantity) VALUES (?1, 9999, 100000)",
            params![sell],
        )
        .unwrap();

        let rows = collect_issues(&conn).unwrap();
        let kinds = issue_kinds(&rows);
        assert!(kinds.contains(&"cross_isin_match"));
        assert!(kinds.contains(&"dangling_match"));
    }

    #[test]
    fn sign_convention_and_bad_decimals_are_flagged() {
        let conn = setup_conn();
        insert_trade(&conn, "2020-06-01", "IE00B0", "Sell", 0, "1500");
        conn.execute(
            "INSERT INTO movements(date, kind, amount) VALUES ('2020-01-01', 'Dividends', 'oops')",
            [],
        )
        .unwrap();

        let rows = collect_issues(&conn).unwrap();
        let kinds = issue_kinds(&rows);
        assert!(kinds.contains(&"positive_sale_total"));
        assert!(kinds.contains(&"invalid_decimal"));
    }
}
