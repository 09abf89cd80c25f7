// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use capgains::{cli, commands::trades, db, models::TradeSide};
use rusqlite::Connection;

fn setup(dir: &tempfile::TempDir) -> Connection {
    db::open_or_init(&dir.path().join("test.sqlite")).unwrap()
}

fn run_trade(conn: &Connection, args: &[&str]) {
    let matches = cli::build_cli().get_matches_from(args);
    if let Some(("trade", sub)) = matches.subcommand() {
        trades::handle(conn, sub).unwrap();
    } else {
        panic!("no trade subcommand");
    }
}

#[test]
fn sell_totals_are_stored_negative() {
    let dir = tempfile::tempdir().unwrap();
    let conn = setup(&dir);
    run_trade(
        &conn,
        &[
            "capgains", "trade", "sell", "--date", "2020-06-01", "--isin", "IE00B0",
            "--quantity", "8", "--price", "150",
        ],
    );

    let (qty, total): (i64, String) = conn
        .query_row("SELECT quantity, total FROM trades WHERE id=1", [], |r| {
            Ok((r.get(0)?, r.get(1)?))
        })
        .unwrap();
    assert_eq!(qty, 800_000);
    assert_eq!(total, "-1200");
}

#[test]
fn buy_total_defaults_to_price_times_quantity() {
    let dir = tempfile::tempdir().unwrap();
    let conn = setup(&dir);
    run_trade(
        &conn,
        &[
            "capgains", "trade", "buy", "--date", "2020-01-01", "--isin", "IE00B0",
            "--quantity", "10.5", "--price", "100", "--name", "Test Fund",
        ],
    );

    let (qty, total, name): (i64, String, String) = conn
        .query_row(
            "SELECT quantity, total, name FROM trades WHERE id=1",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .unwrap();
    assert_eq!(qty, 1_050_000);
    assert_eq!(total, "1050.0");
    assert_eq!(name, "Test Fund");
}

#[test]
fn list_limit_and_side_filter_respected() {
    let dir = tempfile::tempdir().unwrap();
    let conn = setup(&dir);
    for (date, side) in [
        ("2020-01-01", "buy"),
        ("2020-01-02", "buy"),
        ("2020-01-03", "sell"),
    ] {
        run_trade(
            &conn,
            &[
                "capgains", "trade", side, "--date", date, "--isin", "IE00B0",
                "--quantity", "1", "--price", "10",
            ],
        );
    }

    let matches =
        cli::build_cli().get_matches_from(["capgains", "trade", "list", "--limit", "2"]);
    if let Some(("trade", trade_m)) = matches.subcommand() {
        if let Some(("list", list_m)) = trade_m.subcommand() {
            let rows = trades::query_rows(&conn, list_m).unwrap();
            assert_eq!(rows.len(), 2);
            assert_eq!(rows[0].date.to_string(), "2020-01-03");
        } else {
            panic!("no list subcommand");
        }
    } else {
        panic!("no trade subcommand");
    }

    let matches =
        cli::build_cli().get_matches_from(["capgains", "trade", "list", "--side", "Sell"]);
    if let Some(("trade", trade_m)) = matches.subcommand() {
        if let Some(("list", list_m)) = trade_m.subcommand() {
            let rows = trades::query_rows(&conn, list_m).unwrap();
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].side, TradeSide::Sell);
        }
    }
}
