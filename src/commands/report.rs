// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::{maybe_print_json, parse_year, pretty_table, qty_to_decimal};
use anyhow::{Context, Result, anyhow};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::Serialize;

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("year", sub)) => year_cmd(conn, sub)?,
        Some(("all", _)) => all_years(conn)?,
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct DividendRow {
    pub date: String,
    pub amount: Decimal,
}

/// One purchase lot's contribution to a sale. `allocated_cost` is the
/// 2-decimal-rounded fraction of the lot times the lot's total cost; the
/// fraction is rounded before multiplying, matching historical reports.
#[derive(Debug, Serialize)]
pub struct PurchaseAllocation {
    pub purchase_id: i64,
    pub date: String,
    pub quantity: Decimal,
    pub purchase_quantity: Decimal,
    pub price: Decimal,
    pub allocated_cost: Decimal,
}

#[derive(Debug, Serialize)]
pub struct SaleSummary {
    pub sale_id: i64,
    pub date: String,
    pub isin: String,
    pub name: String,
    pub quantity: Decimal,
    pub price: Decimal,
    pub proceeds: Decimal,
    pub allocations: Vec<PurchaseAllocation>,
    pub cost: Decimal,
    pub profit: Decimal,
}

#[derive(Debug, Serialize)]
pub struct YearReport {
    pub year: i32,
    pub dividends: Vec<DividendRow>,
    pub dividend_total: Decimal,
    pub sales: Vec<SaleSummary>,
    pub year_profit: Decimal,
}

impl YearReport {
    pub fn is_empty(&self) -> bool {
        self.dividends.is_empty() && self.sales.is_empty()
    }
}

/// Pure function of ledger + match state: dividends received and realized
/// gains for every sale dated in `year`. Read-only and re-runnable.
pub fn capital_gains_report(conn: &Connection, year: i32) -> Result<YearReport> {
    ensure_sales_reconciled(conn, year)?;

    let dividends = year_dividends(conn, year)?;
    let dividend_total = dividends
        .iter()
        .fold(Decimal::ZERO, |acc, d| acc + d.amount);

    let sales = year_sales(conn, year)?;
    let year_profit = sales.iter().fold(Decimal::ZERO, |acc, s| acc + s.profit);

    Ok(YearReport {
        year,
        dividends,
        dividend_total,
        sales,
        year_profit,
    })
}

/// Every Sell of the year must be fully covered by match records before it
/// can be reported; a partial or missing match is a data defect, not a row
/// to skip.
fn ensure_sales_reconciled(conn: &Connection, year: i32) -> Result<()> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.isin, t.date, t.quantity, IFNULL(SUM(r.quantity),0) AS reconciled
         FROM trades t
         LEFT JOIN reconciliation r ON t.id = r.sale_id
         WHERE t.side = 'Sell' AND substr(t.date,1,4) = ?1
         GROUP BY t.id, t.isin, t.date, t.quantity
         HAVING reconciled <> t.quantity
         ORDER BY t.date ASC, t.id ASC",
    )?;
    let mut rows = stmt.query([year.to_string()])?;
    if let Some(r) = rows.next()? {
        let id: i64 = r.get(0)?;
        let isin: String = r.get(1)?;
        let date: String = r.get(2)?;
        let quantity: i64 = r.get(3)?;
        let reconciled: i64 = r.get(4)?;
        return Err(anyhow!(
            "Sale {} of {} on {} is not fully reconciled ({} of {} units matched); run reconcile first",
            id,
            isin,
            date,
            qty_to_decimal(reconciled),
            qty_to_decimal(quantity)
        ));
    }
    Ok(())
}

fn year_dividends(conn: &Connection, year: i32) -> Result<Vec<DividendRow>> {
    let mut stmt = conn.prepare(
        "SELECT date, amount FROM movements
         WHERE kind = 'Dividends' AND substr(date,1,4) = ?1
         ORDER BY date ASC, id ASC",
    )?;
    let mut rows = stmt.query([year.to_string()])?;
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        let date: String = r.get(0)?;
        let amount_s: String = r.get(1)?;
        let amount = Decimal::from_str_exact(&amount_s)
            .with_context(|| format!("Invalid stored dividend amount '{}' on {}", amount_s, date))?;
        out.push(DividendRow { date, amount });
    }
    Ok(out)
}

struct SaleMatchRow {
    sale_id: i64,
    sale_date: String,
    sale_isin: String,
    sale_name: Option<String>,
    sale_quantity: i64,
    sale_price: String,
    sale_total: String,
    match_quantity: i64,
    purchase_id: i64,
    purchase_date: String,
    purchase_quantity: i64,
    purchase_price: String,
    purchase_total: String,
}

fn year_sales(conn: &Connection, year: i32) -> Result<Vec<SaleSummary>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.date, s.isin, s.name, s.quantity, s.price, s.total,
                r.quantity,
                p.id, p.date, p.quantity, p.price, p.total
         FROM trades s
         INNER JOIN reconciliation r ON s.id = r.sale_id
         INNER JOIN trades p ON r.purchase_id = p.id
         WHERE s.side = 'Sell' AND substr(s.date,1,4) = ?1
         ORDER BY s.date ASC, s.id ASC, r.id ASC",
    )?;
    let mut cur = stmt.query([year.to_string()])?;

    let mut sales: Vec<SaleSummary> = Vec::new();
    let mut matched_seen: i64 = 0;
    let mut expected: i64 = 0;

    fn finish(sale: &mut SaleSummary, matched_seen: i64, expected: i64) -> Result<()> {
        if matched_seen != expected {
            return Err(anyhow!(
                "Match records for sale {} of {} on {} reference missing purchases ({} of {} units joined)",
                sale.sale_id,
                sale.isin,
                sale.date,
                qty_to_decimal(matched_seen),
                sale.quantity
            ));
        }
        sale.profit = sale.proceeds - sale.cost;
        Ok(())
    }

    while let Some(r) = cur.next()? {
        let row = SaleMatchRow {
            sale_id: r.get(0)?,
            sale_date: r.get(1)?,
            sale_isin: r.get(2)?,
            sale_name: r.get(3)?,
            sale_quantity: r.get(4)?,
            sale_price: r.get(5)?,
            sale_total: r.get(6)?,
            match_quantity: r.get(7)?,
            purchase_id: r.get(8)?,
            purchase_date: r.get(9)?,
            purchase_quantity: r.get(10)?,
            purchase_price: r.get(11)?,
            purchase_total: r.get(12)?,
        };

        if sales.last().map(|s| s.sale_id) != Some(row.sale_id) {
            if let Some(prev) = sales.last_mut() {
                finish(prev, matched_seen, expected)?;
            }
            matched_seen = 0;
            expected = row.sale_quantity;

            let price = Decimal::from_str_exact(&row.sale_price).with_context(|| {
                format!("Invalid stored price '{}' for sale {}", row.sale_price, row.sale_id)
            })?;
            let total = Decimal::from_str_exact(&row.sale_total).with_context(|| {
                format!("Invalid stored total '{}' for sale {}", row.sale_total, row.sale_id)
            })?;
            sales.push(SaleSummary {
                sale_id: row.sale_id,
                date: row.sale_date.clone(),
                isin: row.sale_isin.clone(),
                name: row.sale_name.clone().unwrap_or_default(),
                quantity: qty_to_decimal(row.sale_quantity),
                price,
                // Sell totals are stored negative; negate once to get proceeds.
                proceeds: -total,
                allocations: Vec::new(),
                cost: Decimal::ZERO,
                profit: Decimal::ZERO,
            });
        }

        let purchase_price = Decimal::from_str_exact(&row.purchase_price).with_context(|| {
            format!(
                "Invalid stored price '{}' for purchase {}",
                row.purchase_price, row.purchase_id
            )
        })?;
        let purchase_total = Decimal::from_str_exact(&row.purchase_total).with_context(|| {
            format!(
                "Invalid stored total '{}' for purchase {}",
                row.purchase_total, row.purchase_id
            )
        })?;

        // Round the fraction to 2 places, then take that share of the lot's
        // cost. Historical reports depend on this exact rounding point.
        let fraction = (Decimal::from(row.match_quantity) / Decimal::from(row.purchase_quantity))
            .round_dp(2);
        let allocated_cost = fraction * purchase_total;

        let sale = sales.last_mut().unwrap();
        sale.allocations.push(PurchaseAllocation {
            purchase_id: row.purchase_id,
            date: row.purchase_date,
            quantity: qty_to_decimal(row.match_quantity),
            purchase_quantity: qty_to_decimal(row.purchase_quantity),
            price: purchase_price,
            allocated_cost,
        });
        sale.cost += allocated_cost;
        matched_seen += row.match_quantity;
    }

    if let Some(prev) = sales.last_mut() {
        finish(prev, matched_seen, expected)?;
    }
    Ok(sales)
}

fn year_cmd(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let year = parse_year(sub.get_one::<String>("year").unwrap().trim())?;

    let report = capital_gains_report(conn, year)?;
    if !maybe_print_json(json_flag, jsonl_flag, &report)? {
        render(&report);
    }
    Ok(())
}

fn all_years(conn: &Connection) -> Result<()> {
    let range: (Option<String>, Option<String>) = conn.query_row(
        "SELECT MIN(substr(date,1,4)), MAX(substr(date,1,4)) FROM trades",
        [],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    let (Some(start), Some(end)) = range else {
        println!("No trades recorded");
        return Ok(());
    };
    let start = parse_year(&start)?;
    let end = parse_year(&end)?;

    for year in start..=end {
        let report = capital_gains_report(conn, year)?;
        if report.is_empty() {
            continue;
        }
        render(&report);
        println!();
    }
    Ok(())
}

fn render(report: &YearReport) {
    println!("CAPITAL INVESTMENTS TAX SUMMARY, {}", report.year);
    println!("#####################################");

    println!();
    println!("Dividends");
    println!("---------");
    if report.dividends.is_empty() {
        println!("(none)");
    } else {
        let rows = report
            .dividends
            .iter()
            .map(|d| vec![d.date.clone(), format!("{:.4}", d.amount)])
            .collect();
        println!("{}", pretty_table(&["Date", "Amount"], rows));
    }

    println!();
    println!("Capital gains");
    println!("-------------");
    for sale in &report.sales {
        let label = if sale.name.is_empty() {
            sale.isin.clone()
        } else {
            sale.name.clone()
        };
        println!();
        println!("Sale of {} (ISIN {})", label, sale.isin);
        println!(
            "    Sell ({}): {:.5} units @ {:.4} = {:.4}",
            sale.date, sale.quantity, sale.price, sale.proceeds
        );
        for alloc in &sale.allocations {
            println!(
                "    Buy  ({}): {:.5}/{:.5} units @ {:.4} = {:.4}",
                alloc.date,
                alloc.quantity,
                alloc.purchase_quantity,
                alloc.price,
                alloc.allocated_cost
            );
        }
        println!("    Purchase total        = {:.4}", sale.cost);
        println!("    Net profit            = {:.4}", sale.profit);
    }

    println!();
    println!("Total dividends           = {:.4}", report.dividend_total);
    println!("Total capital gains       = {:.4}", report.year_profit);
}
