//! Queries over a lent [`DbConnection`]
//!
//! Every statement runs inside a `session()`/[`settle`] pair so that a
//! cancelled or failed query never puts a half-used connection back in the
//! pool.

use crate::api_models::{EmployeeIn, RuleUpdate, ShiftIn, TransactionIn};
use crate::db::{DbConnection, settle};
use crate::models::{Employee, Shift, TaxSuperRule, Transaction};
use crate::{BusinessError, Result};
use sqlx::{Connection, SqliteConnection};
use tracing::{debug, instrument};

pub async fn list_employees(conn: &mut DbConnection) -> Result<Vec<Employee>> {
    let result = sqlx::query_as::<_, Employee>("SELECT * FROM employee ORDER BY id")
        .fetch_all(conn.session())
        .await;
    settle(conn, result)
}

pub async fn count_employees(conn: &mut DbConnection) -> Result<usize> {
    let result = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employee")
        .fetch_one(conn.session())
        .await;
    Ok(settle(conn, result)? as usize)
}

pub async fn find_employee(conn: &mut DbConnection, id: i64) -> Result<Option<Employee>> {
    let result = sqlx::query_as::<_, Employee>("SELECT * FROM employee WHERE id = ?")
        .bind(id)
        .fetch_optional(conn.session())
        .await;
    settle(conn, result)
}

#[instrument(skip(conn, employee), fields(name = %employee.name))]
pub async fn insert_employee(conn: &mut DbConnection, employee: &EmployeeIn) -> Result<Employee> {
    let result = sqlx::query_as::<_, Employee>(
        "INSERT INTO employee (name, email, employment_type, tfn, abn, hourly_rate, role, \
         max_hours_week, pay_preference) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(&employee.name)
    .bind(&employee.email)
    .bind(employee.employment_type)
    .bind(&employee.tfn)
    .bind(&employee.abn)
    .bind(employee.hourly_rate)
    .bind(&employee.role)
    .bind(employee.max_hours_week)
    .bind(employee.pay_preference)
    .fetch_one(conn.session())
    .await;
    let created = settle(conn, result)?;
    debug!("Created employee {}", created.id);
    Ok(created)
}

pub async fn list_shifts(conn: &mut DbConnection) -> Result<Vec<Shift>> {
    let result = sqlx::query_as::<_, Shift>("SELECT * FROM shift ORDER BY id")
        .fetch_all(conn.session())
        .await;
    settle(conn, result)
}

#[instrument(skip(conn, shift), fields(day = %shift.day))]
pub async fn insert_shift(conn: &mut DbConnection, shift: &ShiftIn) -> Result<Shift> {
    if let Some(employee_id) = shift.employee_id {
        if find_employee(conn, employee_id).await?.is_none() {
            return Err(BusinessError::Validation(format!(
                "employee {} does not exist",
                employee_id
            )));
        }
    }

    let result = sqlx::query_as::<_, Shift>(
        "INSERT INTO shift (employee_id, day, start_time, end_time, role, expected_busyness, \
         max_shift_hours) VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(shift.employee_id)
    .bind(&shift.day)
    .bind(&shift.start)
    .bind(&shift.end)
    .bind(&shift.role)
    .bind(shift.expected_busyness)
    .bind(shift.max_shift_hours)
    .fetch_one(conn.session())
    .await;
    settle(conn, result)
}

/// Apply `(shift_id, employee_id)` assignments atomically. A shift someone
/// else assigned in the meantime keeps its employee. Returns the number of
/// shifts updated.
#[instrument(skip(conn, assignments), fields(count = assignments.len()))]
pub async fn assign_shifts(conn: &mut DbConnection, assignments: &[(i64, i64)]) -> Result<u64> {
    let result = apply_assignments(conn.session(), assignments).await;
    let updated = settle(conn, result)?;
    debug!("Assigned {} of {} shifts", updated, assignments.len());
    Ok(updated)
}

async fn apply_assignments(
    db: &mut SqliteConnection,
    assignments: &[(i64, i64)],
) -> sqlx::Result<u64> {
    let mut tx = db.begin().await?;
    let mut updated = 0;
    for (shift_id, employee_id) in assignments {
        updated += sqlx::query(
            "UPDATE shift SET employee_id = ? WHERE id = ? AND employee_id IS NULL",
        )
        .bind(employee_id)
        .bind(shift_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }
    tx.commit().await?;
    Ok(updated)
}

pub async fn list_transactions(conn: &mut DbConnection) -> Result<Vec<Transaction>> {
    let result = sqlx::query_as::<_, Transaction>("SELECT * FROM cash_transaction ORDER BY id")
        .fetch_all(conn.session())
        .await;
    settle(conn, result)
}

pub async fn insert_transaction(
    conn: &mut DbConnection,
    tx: &TransactionIn,
) -> Result<Transaction> {
    let result = sqlx::query_as::<_, Transaction>(
        "INSERT INTO cash_transaction (date, kind, method, category, amount) \
         VALUES (?, ?, ?, ?, ?) RETURNING *",
    )
    .bind(&tx.date)
    .bind(tx.kind)
    .bind(tx.method)
    .bind(&tx.category)
    .bind(tx.amount)
    .fetch_one(conn.session())
    .await;
    settle(conn, result)
}

/// The active tax and super rules
pub async fn load_rules(conn: &mut DbConnection) -> Result<TaxSuperRule> {
    let result =
        sqlx::query_as::<_, TaxSuperRule>("SELECT * FROM tax_super_rule ORDER BY id LIMIT 1")
            .fetch_optional(conn.session())
            .await;
    settle(conn, result)?
        .ok_or_else(|| BusinessError::NotFound("tax and super rules".to_string()))
}

/// Overwrite the fields present in `update`, keeping the rest
#[instrument(skip(conn, update))]
pub async fn update_rules(conn: &mut DbConnection, update: &RuleUpdate) -> Result<TaxSuperRule> {
    let current = load_rules(conn).await?;

    let result = sqlx::query_as::<_, TaxSuperRule>(
        "UPDATE tax_super_rule SET \
            super_rate = COALESCE(?, super_rate), \
            int_student_weekly_cap = COALESCE(?, int_student_weekly_cap), \
            bracket1_max = COALESCE(?, bracket1_max), \
            bracket1_rate = COALESCE(?, bracket1_rate), \
            bracket2_max = COALESCE(?, bracket2_max), \
            bracket2_base = COALESCE(?, bracket2_base), \
            bracket2_rate = COALESCE(?, bracket2_rate), \
            bracket3_base = COALESCE(?, bracket3_base), \
            bracket3_rate = COALESCE(?, bracket3_rate), \
            abn_withholding_rate = COALESCE(?, abn_withholding_rate) \
         WHERE id = ? RETURNING *",
    )
    .bind(update.super_rate)
    .bind(update.int_student_weekly_cap)
    .bind(update.bracket1_max)
    .bind(update.bracket1_rate)
    .bind(update.bracket2_max)
    .bind(update.bracket2_base)
    .bind(update.bracket2_rate)
    .bind(update.bracket3_base)
    .bind(update.bracket3_rate)
    .bind(update.abn_withholding_rate)
    .bind(current.id)
    .fetch_one(conn.session())
    .await;
    settle(conn, result)
}
