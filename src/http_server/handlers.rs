//! Route handlers
//!
//! Each handler borrows one pooled connection for the whole request and
//! hands it back when the handle drops at the end of the function.

use super::AppState;
use crate::api_models::{
    CashflowSummary, DashboardSummary, EmployeeIn, GenerateRosterResponse, PayrollLine,
    PayrollRequest, RosterWeekQuery, RuleUpdate, ServiceInfo, ShiftIn, TransactionIn,
};
use crate::health::ServiceStatus;
use crate::models::{Employee, Shift, TaxSuperRule, Transaction};
use crate::{BusinessError, Result, cashflow, payroll, store};
use axum::{
    Json,
    extract::{Query, State, rejection::JsonRejection, rejection::QueryRejection},
    http::Uri,
};
use tracing::info;

const SERVICE_NAME: &str = "Business Manager API";

/// Unwrap a JSON body, turning axum's rejection into a 400
fn payload<T>(body: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    body.map(|Json(value)| value)
        .map_err(|rejection| BusinessError::BadRequest(rejection.body_text()))
}

pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        ok: true,
        service: SERVICE_NAME.to_string(),
    })
}

pub async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardSummary>> {
    let mut conn = state.pool.acquire().await?;
    let employees = store::count_employees(&mut conn).await?;
    let transactions = store::list_transactions(&mut conn).await?;
    Ok(Json(cashflow::dashboard(employees, &transactions)))
}

pub async fn create_employee(
    State(state): State<AppState>,
    body: std::result::Result<Json<EmployeeIn>, JsonRejection>,
) -> Result<Json<Employee>> {
    let employee = payload(body)?.normalized();
    let mut conn = state.pool.acquire().await?;
    Ok(Json(store::insert_employee(&mut conn, &employee).await?))
}

pub async fn list_employees(State(state): State<AppState>) -> Result<Json<Vec<Employee>>> {
    let mut conn = state.pool.acquire().await?;
    Ok(Json(store::list_employees(&mut conn).await?))
}

pub async fn create_shift(
    State(state): State<AppState>,
    body: std::result::Result<Json<ShiftIn>, JsonRejection>,
) -> Result<Json<Shift>> {
    let shift = payload(body)?;
    shift.validate()?;
    let mut conn = state.pool.acquire().await?;
    Ok(Json(store::insert_shift(&mut conn, &shift).await?))
}

/// Shifts in `[start, end]`, or every shift when no end is given
pub async fn roster_week(
    State(state): State<AppState>,
    query: std::result::Result<Query<RosterWeekQuery>, QueryRejection>,
) -> Result<Json<Vec<Shift>>> {
    let Query(query) = query.map_err(|rejection| BusinessError::BadRequest(rejection.body_text()))?;

    let shifts = {
        let mut conn = state.pool.acquire().await?;
        store::list_shifts(&mut conn).await?
    };

    match query.end.as_deref() {
        Some(end) if !end.is_empty() => {
            let selected = payroll::shifts_in_period(&shifts, &query.start, end)?;
            Ok(Json(selected.into_iter().cloned().collect()))
        }
        _ => Ok(Json(shifts)),
    }
}

/// Assign open shifts to the cheapest matching employee and cost the roster
pub async fn generate_roster(
    State(state): State<AppState>,
) -> Result<Json<GenerateRosterResponse>> {
    let mut conn = state.pool.acquire().await?;

    let employees = store::list_employees(&mut conn).await?;
    let shifts = store::list_shifts(&mut conn).await?;
    let assignments = payroll::assign_cheapest(&shifts, &employees);
    if !assignments.is_empty() {
        store::assign_shifts(&mut conn, &assignments).await?;
    }

    let shifts = store::list_shifts(&mut conn).await?;
    let rules = store::load_rules(&mut conn).await?;
    drop(conn);

    let totals = payroll::roster_totals(&shifts, &employees, &rules)?;
    info!("Generated roster with {} new assignments", assignments.len());
    Ok(Json(GenerateRosterResponse {
        status: "ok".to_string(),
        totals,
    }))
}

pub async fn payroll_calc(
    State(state): State<AppState>,
    body: std::result::Result<Json<PayrollRequest>, JsonRejection>,
) -> Result<Json<Vec<PayrollLine>>> {
    let request = payload(body)?;

    let (rules, shifts, employees) = {
        let mut conn = state.pool.acquire().await?;
        let rules = store::load_rules(&mut conn).await?;
        let shifts = store::list_shifts(&mut conn).await?;
        let employees = store::list_employees(&mut conn).await?;
        (rules, shifts, employees)
    };

    let lines = payroll::payroll_lines(
        &shifts,
        &employees,
        &rules,
        &request.period_start,
        &request.period_end,
        request.default_pay_method,
    )?;
    Ok(Json(lines))
}

pub async fn get_rules(State(state): State<AppState>) -> Result<Json<TaxSuperRule>> {
    let mut conn = state.pool.acquire().await?;
    Ok(Json(store::load_rules(&mut conn).await?))
}

pub async fn update_rules(
    State(state): State<AppState>,
    body: std::result::Result<Json<RuleUpdate>, JsonRejection>,
) -> Result<Json<TaxSuperRule>> {
    let update = payload(body)?;
    let mut conn = state.pool.acquire().await?;
    Ok(Json(store::update_rules(&mut conn, &update).await?))
}

pub async fn create_transaction(
    State(state): State<AppState>,
    body: std::result::Result<Json<TransactionIn>, JsonRejection>,
) -> Result<Json<Transaction>> {
    let tx = payload(body)?;
    let mut conn = state.pool.acquire().await?;
    Ok(Json(store::insert_transaction(&mut conn, &tx).await?))
}

pub async fn cashflow_summary(State(state): State<AppState>) -> Result<Json<CashflowSummary>> {
    let transactions = {
        let mut conn = state.pool.acquire().await?;
        store::list_transactions(&mut conn).await?
    };
    Ok(Json(cashflow::summary(&transactions)))
}

pub async fn health(State(state): State<AppState>) -> Result<String> {
    state.health.check_health().await
}

pub async fn status(State(state): State<AppState>) -> Json<ServiceStatus> {
    Json(state.health.detailed_status().await)
}

pub async fn not_found(uri: Uri) -> BusinessError {
    BusinessError::NotFound(format!("no route for {}", uri.path()))
}
