// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::MatchRecord;
use crate::utils::qty_to_decimal;
use anyhow::Result;
use rusqlite::{Connection, Transaction, params};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(
        "Sale {sale_id} of {isin} on {date} cannot be fully matched: {remaining} units have no unconsumed purchase"
    )]
    UnattributableSale {
        sale_id: i64,
        isin: String,
        date: String,
        remaining: Decimal,
    },
}

/// A Sell trade whose match records do not yet cover its full quantity.
#[derive(Debug)]
struct SaleCandidate {
    id: i64,
    date: String,
    isin: String,
    quantity: i64,
    reconciled: i64,
}

/// A Buy trade with unconsumed quantity left for the sale's ISIN.
#[derive(Debug)]
struct PurchaseCandidate {
    id: i64,
    date: String,
    quantity: i64,
    reconciled: i64,
}

pub fn handle(conn: &mut Connection) -> Result<usize> {
    let written = run(conn)?;
    if written == 0 {
        println!("Nothing to reconcile");
    } else {
        println!("Wrote {} match records", written);
    }
    Ok(written)
}

/// Match every unreconciled sale against unconsumed purchases of the same
/// ISIN, oldest purchase first. Each sale's matches commit in their own
/// transaction, so a failure further down the ledger keeps earlier sales'
/// matches. Re-running on a reconciled ledger writes nothing.
pub fn run(conn: &mut Connection) -> Result<usize> {
    let sales = unreconciled_sales(conn)?;
    let mut written = 0usize;
    for sale in &sales {
        let tx = conn.transaction()?;
        written += reconcile_sale(&tx, sale)?;
        tx.commit()?;
    }
    Ok(written)
}

/// Match records filtered by sale and/or purchase, in insertion order.
pub fn matches(
    conn: &Connection,
    sale_id: Option<i64>,
    purchase_id: Option<i64>,
) -> Result<Vec<MatchRecord>> {
    let mut sql =
        String::from("SELECT id, sale_id, purchase_id, quantity FROM reconciliation WHERE 1=1");
    let mut params_vec: Vec<i64> = Vec::new();
    if let Some(id) = sale_id {
        sql.push_str(" AND sale_id=?");
        params_vec.push(id);
    }
    if let Some(id) = purchase_id {
        sql.push_str(" AND purchase_id=?");
        params_vec.push(id);
    }
    sql.push_str(" ORDER BY id ASC");

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(rusqlite::params_from_iter(params_vec))?;
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        out.push(MatchRecord {
            id: r.get(0)?,
            sale_id: r.get(1)?,
            purchase_id: r.get(2)?,
            quantity: r.get(3)?,
        });
    }
    Ok(out)
}

fn unreconciled_sales(conn: &Connection) -> Result<Vec<SaleCandidate>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.date, t.isin, t.quantity, SUM(r.quantity) AS reconciled
         FROM trades t
         LEFT JOIN reconciliation r ON t.id = r.sale_id
         WHERE t.side = 'Sell'
         GROUP BY t.id, t.date, t.isin, t.quantity
         HAVING reconciled IS NULL OR reconciled < t.quantity
         ORDER BY t.date ASC, t.id ASC",
    )?;
    let mut rows = stmt.query([])?;
    let mut sales = Vec::new();
    while let Some(r) = rows.next()? {
        let reconciled: Option<i64> = r.get(4)?;
        sales.push(SaleCandidate {
            id: r.get(0)?,
            date: r.get(1)?,
            isin: r.get(2)?,
            quantity: r.get(3)?,
            reconciled: reconciled.unwrap_or(0),
        });
    }
    Ok(sales)
}

fn unreconciled_purchases(conn: &Connection, isin: &str) -> Result<Vec<PurchaseCandidate>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.date, t.quantity, SUM(r.quantity) AS reconciled
         FROM trades t
         LEFT JOIN reconciliation r ON t.id = r.purchase_id
         WHERE t.side = 'Buy' AND t.isin = ?1
         GROUP BY t.id, t.date, t.quantity
         HAVING reconciled IS NULL OR reconciled < t.quantity
         ORDER BY t.date ASC, t.id ASC",
    )?;
    let mut rows = stmt.query([isin])?;
    let mut purchases = Vec::new();
    while let Some(r) = rows.next()? {
        let reconciled: Option<i64> = r.get(3)?;
        purchases.push(PurchaseCandidate {
            id: r.get(0)?,
            date: r.get(1)?,
            quantity: r.get(2)?,
            reconciled: reconciled.unwrap_or(0),
        });
    }
    Ok(purchases)
}

fn reconcile_sale(tx: &Transaction, sale: &SaleCandidate) -> Result<usize> {
    let mut remaining = sale.quantity - sale.reconciled;
    let purchases = unreconciled_purchases(tx, &sale.isin)?;
    let mut written = 0usize;

    for pur in &purchases {
        if remaining == 0 {
            break;
        }
        let available = pur.quantity - pur.reconciled;
        let take = remaining.min(available);
        tx.execute(
            "INSERT INTO reconciliation(sale_id, purchase_id, quantity) VALUES (?1, ?2, ?3)",
            params![sale.id, pur.id, take],
        )?;
        println!(
            "Matched {} of sale {} ({}) from {} against purchase {} ({}) from {}",
            qty_to_decimal(take),
            sale.id,
            qty_to_decimal(sale.quantity),
            sale.date,
            pur.id,
            qty_to_decimal(pur.quantity),
            pur.date
        );
        remaining -= take;
        written += 1;
    }

    if remaining > 0 {
        // Fatal: nothing is fabricated, and the per-sale transaction rolls
        // back any partial matches written above for this sale.
        return Err(ReconcileError::UnattributableSale {
            sale_id: sale.id,
            isin: sale.isin.clone(),
            date: sale.date.clone(),
            remaining: qty_to_decimal(remaining),
        }
        .into());
    }
    Ok(written)
}
