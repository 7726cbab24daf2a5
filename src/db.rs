use std::path::Path;

use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::Connection;

use crate::extract::ratings::BODY_LEN;
use crate::extract::TechSpecRecord;

/// Rating columns after `model`, in row order.
const RATING_COLUMNS: [&str; BODY_LEN] = [
    "price",
    "avg_rating",
    "buy_again",
    "overall",
    "category_01",
    "category_02",
    "category_03",
    "category_04",
    "category_05",
    "category_06",
    "category_07",
    "category_08",
    "category_09",
    "category_10",
    "category_11",
    "category_12",
    "category_13",
];

pub fn connect(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    let rating_columns: Vec<String> = RATING_COLUMNS
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let ty = if i == 0 { "INTEGER" } else { "REAL" };
            format!("{} {}", c, ty)
        })
        .collect();

    conn.execute_batch(&format!(
        "
        CREATE TABLE IF NOT EXISTS ratings (
            id          INTEGER PRIMARY KEY,
            model       TEXT NOT NULL,
            {},
            imported_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_ratings_model ON ratings(model);

        -- one row per (record, label); records do not share a key set
        CREATE TABLE IF NOT EXISTS tech_specs (
            id          INTEGER PRIMARY KEY,
            record_no   INTEGER NOT NULL,
            model       TEXT NOT NULL,
            label       TEXT NOT NULL,
            value       TEXT NOT NULL,
            source_file TEXT NOT NULL,
            imported_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_tech_specs_model ON tech_specs(model);
        CREATE INDEX IF NOT EXISTS idx_tech_specs_label ON tech_specs(label);
        ",
        rating_columns.join(",\n            ")
    ))?;
    Ok(())
}

/// Append raw rating rows (identifier + cells). Short rows are padded with NULLs,
/// empty or unparsable cells become NULL.
pub fn insert_ratings(conn: &Connection, rows: &[Vec<String>]) -> Result<usize> {
    let placeholders: Vec<String> = (1..=BODY_LEN + 1).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "INSERT INTO ratings (model, {}) VALUES ({})",
        RATING_COLUMNS.join(", "),
        placeholders.join(", ")
    );

    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(&sql)?;
        for row in rows {
            let Some((model, cells)) = row.split_first() else {
                continue;
            };
            let mut params = Vec::with_capacity(BODY_LEN + 1);
            params.push(Value::Text(model.clone()));
            for i in 0..BODY_LEN {
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                params.push(if i == 0 { int_cell(cell) } else { real_cell(cell) });
            }
            count += stmt.execute(rusqlite::params_from_iter(params))?;
        }
    }
    tx.commit()?;
    Ok(count)
}

/// Append every label/value pair of `records`, tagged with the file they came from.
pub fn insert_tech_specs(
    conn: &Connection,
    source_file: &str,
    records: &[TechSpecRecord],
) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO tech_specs (record_no, model, label, value, source_file)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for (no, record) in records.iter().enumerate() {
            let model = record.model().unwrap_or_default();
            for (label, value) in record.pairs() {
                count += stmt.execute(rusqlite::params![no as i64, model, label, value, source_file])?;
            }
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn count_rows(conn: &Connection, table: &str) -> Result<usize> {
    let n: usize = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
    Ok(n)
}

fn int_cell(cell: &str) -> Value {
    cell.parse::<i64>().map(Value::Integer).unwrap_or(Value::Null)
}

fn real_cell(cell: &str) -> Value {
    cell.parse::<f64>().map(Value::Real).unwrap_or(Value::Null)
}
