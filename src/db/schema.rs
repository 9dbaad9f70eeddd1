//! Table definitions and startup seeding

use super::{DbConnection, settle};
use crate::Result;
use crate::models::TaxSuperRule;
use sqlx::SqliteConnection;
use tracing::{debug, info};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS employee (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT,
        employment_type TEXT NOT NULL DEFAULT 'TFN',
        tfn TEXT,
        abn TEXT,
        hourly_rate REAL NOT NULL DEFAULT 0.0,
        role TEXT,
        max_hours_week REAL,
        pay_preference TEXT NOT NULL DEFAULT 'bank'
    )",
    "CREATE TABLE IF NOT EXISTS shift (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        employee_id INTEGER REFERENCES employee(id),
        day TEXT NOT NULL,
        start_time TEXT NOT NULL,
        end_time TEXT NOT NULL,
        role TEXT,
        expected_busyness TEXT NOT NULL DEFAULT 'med',
        max_shift_hours REAL
    )",
    "CREATE INDEX IF NOT EXISTS idx_shift_day ON shift(day)",
    "CREATE TABLE IF NOT EXISTS cash_transaction (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL,
        kind TEXT NOT NULL,
        method TEXT NOT NULL DEFAULT 'bank',
        category TEXT,
        amount REAL NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS tax_super_rule (
        id INTEGER PRIMARY KEY,
        super_rate REAL NOT NULL,
        int_student_weekly_cap REAL NOT NULL,
        bracket1_max REAL NOT NULL,
        bracket1_rate REAL NOT NULL,
        bracket2_max REAL NOT NULL,
        bracket2_base REAL NOT NULL,
        bracket2_rate REAL NOT NULL,
        bracket3_base REAL NOT NULL,
        bracket3_rate REAL NOT NULL,
        abn_withholding_rate REAL NOT NULL
    )",
];

/// Create missing tables and seed the default tax rules. Safe to run on
/// every startup.
pub async fn migrate(conn: &mut DbConnection) -> Result<()> {
    let result = create_schema(conn.session()).await;
    let seeded = settle(conn, result)?;
    if seeded {
        info!("Seeded default tax and super rules");
    }
    Ok(())
}

async fn create_schema(db: &mut SqliteConnection) -> std::result::Result<bool, sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(&mut *db).await?;
    }
    debug!("Schema is up to date ({} statements)", SCHEMA.len());

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tax_super_rule")
        .fetch_one(&mut *db)
        .await?;
    if existing > 0 {
        return Ok(false);
    }

    let rule = TaxSuperRule::default();
    sqlx::query(
        "INSERT INTO tax_super_rule (id, super_rate, int_student_weekly_cap, bracket1_max, \
         bracket1_rate, bracket2_max, bracket2_base, bracket2_rate, bracket3_base, \
         bracket3_rate, abn_withholding_rate) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(rule.id)
    .bind(rule.super_rate)
    .bind(rule.int_student_weekly_cap)
    .bind(rule.bracket1_max)
    .bind(rule.bracket1_rate)
    .bind(rule.bracket2_max)
    .bind(rule.bracket2_base)
    .bind(rule.bracket2_rate)
    .bind(rule.bracket3_base)
    .bind(rule.bracket3_rate)
    .bind(rule.abn_withholding_rate)
    .execute(&mut *db)
    .await?;

    Ok(true)
}
