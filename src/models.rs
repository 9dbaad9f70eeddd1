use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmploymentType {
    #[default]
    Tfn,        // Employee paid through payroll with a tax file number
    Abn,        // Contractor invoicing under an ABN
    IntStudent, // International student on a capped visa
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PayMethod {
    #[default]
    Bank,
    Cash,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Busyness {
    Low,
    #[default]
    Med,
    High,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, FromRow)]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub employment_type: EmploymentType,
    pub tfn: Option<String>,
    pub abn: Option<String>,
    pub hourly_rate: f64,
    pub role: Option<String>,
    pub max_hours_week: Option<f64>,
    pub pay_preference: PayMethod,
}

/// A rostered shift; `employee_id` stays empty until someone is assigned
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, FromRow)]
pub struct Shift {
    pub id: i64,
    pub employee_id: Option<i64>,
    /// YYYY-MM-DD
    pub day: String,
    /// HH:MM
    #[sqlx(rename = "start_time")]
    pub start: String,
    /// HH:MM, earlier than `start` for shifts that run past midnight
    #[sqlx(rename = "end_time")]
    pub end: String,
    pub role: Option<String>,
    pub expected_busyness: Busyness,
    pub max_shift_hours: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, FromRow)]
pub struct Transaction {
    pub id: i64,
    pub date: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub method: PayMethod,
    pub category: Option<String>,
    pub amount: f64,
}

/// Withholding brackets and superannuation rate. One row, seeded at startup.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, FromRow)]
pub struct TaxSuperRule {
    pub id: i64,
    pub super_rate: f64,
    pub int_student_weekly_cap: f64,
    pub bracket1_max: f64,
    pub bracket1_rate: f64,
    pub bracket2_max: f64,
    pub bracket2_base: f64,
    pub bracket2_rate: f64,
    pub bracket3_base: f64,
    pub bracket3_rate: f64,
    pub abn_withholding_rate: f64,
}

impl Default for TaxSuperRule {
    fn default() -> Self {
        Self {
            id: 1,
            super_rate: 0.115,
            int_student_weekly_cap: 24.0,
            bracket1_max: 500.0,
            bracket1_rate: 0.05,
            bracket2_max: 1000.0,
            bracket2_base: 25.0,
            bracket2_rate: 0.15,
            bracket3_base: 100.0,
            bracket3_rate: 0.25,
            abn_withholding_rate: 0.0,
        }
    }
}
