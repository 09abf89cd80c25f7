// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};

static APP: Lazy<(&str, &str, &str)> = Lazy::new(|| ("com.alphavelocity", "Capgains", "capgains"));

pub fn db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("capgains.sqlite"))
}

pub fn open_or_init(path: &Path) -> Result<Connection> {
    let mut conn =
        Connection::open(path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    Ok(conn)
}

fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS trades(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL,
        name TEXT,
        isin TEXT NOT NULL,
        symbol TEXT,
        exchange TEXT,
        side TEXT NOT NULL CHECK(side IN ('Buy','Sell')),
        price TEXT NOT NULL,
        -- scaled by QTY_FACTOR, 5 fractional digits
        quantity INTEGER NOT NULL CHECK(quantity > 0),
        total TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_trades_date ON trades(date);
    CREATE INDEX IF NOT EXISTS idx_trades_isin ON trades(isin);

    CREATE TABLE IF NOT EXISTS movements(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL,
        kind TEXT NOT NULL CHECK(kind IN ('Dividends','Invoice','Funding','Divestment')),
        amount TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_movements_date ON movements(date);

    -- Append-only match ledger: quantity units of purchase_id satisfy sale_id.
    CREATE TABLE IF NOT EXISTS reconciliation(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        sale_id INTEGER NOT NULL,
        purchase_id INTEGER NOT NULL,
        quantity INTEGER NOT NULL CHECK(quantity > 0),
        FOREIGN KEY(sale_id) REFERENCES trades(id),
        FOREIGN KEY(purchase_id) REFERENCES trades(id)
    );
    CREATE INDEX IF NOT EXISTS idx_reconciliation_sale ON reconciliation(sale_id);
    CREATE INDEX IF NOT EXISTS idx_reconciliation_purchase ON reconciliation(purchase_id);
    "#,
    )?;
    Ok(())
}
