// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use capgains::{
    cli,
    commands::{doctor, movements, reconcile, report, trades},
    db,
};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::str::FromStr;

fn setup(dir: &tempfile::TempDir) -> Connection {
    db::open_or_init(&dir.path().join("test.sqlite")).unwrap()
}

fn run(conn: &Connection, args: &[&str]) {
    let matches = cli::build_cli().get_matches_from(args);
    match matches.subcommand() {
        Some(("trade", sub)) => trades::handle(conn, sub).unwrap(),
        Some(("movement", sub)) => movements::handle(conn, sub).unwrap(),
        other => panic!("unexpected subcommand {:?}", other.map(|(n, _)| n)),
    }
}

/// Full pipeline over the two-lot example: buys of 5 @ 100 and 5 @ 120,
/// a sell of 8 @ 150, plus a dividend. The second lot's allocation
/// fraction is round(3/5, 2) = 0.60, so the allocated cost is 360.
#[test]
fn end_to_end_two_lot_year_report() {
    let dir = tempfile::tempdir().unwrap();
    let mut conn = setup(&dir);

    run(
        &conn,
        &[
            "capgains", "trade", "buy", "--date", "2020-01-01", "--isin", "IE00B0",
            "--quantity", "5", "--price", "100", "--name", "Test Fund",
        ],
    );
    run(
        &conn,
        &[
            "capgains", "trade", "buy", "--date", "2020-02-01", "--isin", "IE00B0",
            "--quantity", "5", "--price", "120", "--name", "Test Fund",
        ],
    );
    run(
        &conn,
        &[
            "capgains", "trade", "sell", "--date", "2020-06-01", "--isin", "IE00B0",
            "--quantity", "8", "--price", "150", "--name", "Test Fund",
        ],
    );
    run(
        &conn,
        &[
            "capgains", "movement", "add", "--date", "2020-03-01", "--kind", "Dividends",
            "--amount", "12.50",
        ],
    );

    let written = reconcile::run(&mut conn).unwrap();
    assert_eq!(written, 2);

    let report = report::capital_gains_report(&conn, 2020).unwrap();
    assert_eq!(report.dividend_total, Decimal::from_str("12.50").unwrap());
    assert_eq!(report.sales.len(), 1);

    let sale = &report.sales[0];
    assert_eq!(sale.proceeds, Decimal::from_str("1200").unwrap());
    assert_eq!(sale.allocations.len(), 2);
    assert_eq!(
        sale.allocations[1].allocated_cost,
        Decimal::from_str("360.00").unwrap()
    );
    assert_eq!(sale.cost, Decimal::from_str("860.00").unwrap());
    assert_eq!(sale.profit, Decimal::from_str("340.00").unwrap());
    assert_eq!(report.year_profit, Decimal::from_str("340.00").unwrap());

    // The reconciled ledger passes the integrity scan.
    assert!(doctor::collect_issues(&conn).unwrap().is_empty());
}

#[test]
fn short_sale_fails_instead_of_reporting_zero_cost() {
    let dir = tempfile::tempdir().unwrap();
    let mut conn = setup(&dir);

    run(
        &conn,
        &[
            "capgains", "trade", "sell", "--date", "2020-06-01", "--isin", "IE00ZZZ",
            "--quantity", "10", "--price", "150",
        ],
    );

    let err = reconcile::run(&mut conn).unwrap_err();
    assert!(err.to_string().contains("IE00ZZZ"));

    // The reporter refuses the unreconciled sale rather than skipping it.
    let err = report::capital_gains_report(&conn, 2020).unwrap_err();
    assert!(err.to_string().contains("not fully reconciled"));
}

#[test]
fn empty_year_reports_zero_totals() {
    let dir = tempfile::tempdir().unwrap();
    let conn = setup(&dir);

    let report = report::capital_gains_report(&conn, 2020).unwrap();
    assert!(report.is_empty());
    assert_eq!(report.dividend_total, Decimal::ZERO);
    assert_eq!(report.year_profit, Decimal::ZERO);
}
