use crate::models::{Busyness, EmploymentType, PayMethod, TransactionType};
use crate::payroll::{hours_between, parse_day};
use crate::{BusinessError, Result};
use serde::{Deserialize, Serialize};

/// Payload for `POST /employees`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmployeeIn {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub employment_type: EmploymentType,
    #[serde(default)]
    pub tfn: Option<String>,
    #[serde(default)]
    pub abn: Option<String>,
    #[serde(default)]
    pub hourly_rate: f64,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub max_hours_week: Option<f64>,
    #[serde(default)]
    pub pay_preference: PayMethod,
}

impl EmployeeIn {
    /// International students are always paid into a bank account
    pub fn normalized(mut self) -> Self {
        if self.employment_type == EmploymentType::IntStudent {
            self.pay_preference = PayMethod::Bank;
        }
        self
    }
}

/// Payload for `POST /roster/shifts`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShiftIn {
    #[serde(default)]
    pub employee_id: Option<i64>,
    pub day: String,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub expected_busyness: Busyness,
    #[serde(default)]
    pub max_shift_hours: Option<f64>,
}

impl ShiftIn {
    /// Check formats and the per-shift hour cap
    pub fn validate(&self) -> Result<()> {
        parse_day(&self.day)?;
        let hours = hours_between(&self.start, &self.end)?;
        if let Some(max) = self.max_shift_hours {
            if hours > max {
                return Err(BusinessError::BadRequest("Shift exceeds max_shift_hours".to_string()));
            }
        }
        Ok(())
    }
}

/// Query string for `GET /roster/week`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RosterWeekQuery {
    pub start: String,
    #[serde(default)]
    pub end: Option<String>,
}

/// Payload for `POST /payroll/calc`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PayrollRequest {
    pub period_start: String,
    pub period_end: String,
    /// Used for ABN contractors, whose own preference is ignored
    #[serde(default)]
    pub default_pay_method: PayMethod,
}

/// Partial update for `POST /taxsuper/rules`; absent fields are left alone
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RuleUpdate {
    pub super_rate: Option<f64>,
    pub int_student_weekly_cap: Option<f64>,
    pub bracket1_max: Option<f64>,
    pub bracket1_rate: Option<f64>,
    pub bracket2_max: Option<f64>,
    pub bracket2_base: Option<f64>,
    pub bracket2_rate: Option<f64>,
    pub bracket3_base: Option<f64>,
    pub bracket3_rate: Option<f64>,
    pub abn_withholding_rate: Option<f64>,
}

/// Payload for `POST /cashflow/tx`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransactionIn {
    pub date: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(default)]
    pub method: PayMethod,
    #[serde(default)]
    pub category: Option<String>,
    pub amount: f64,
}

/// Body of `GET /`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceInfo {
    pub ok: bool,
    pub service: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DashboardSummary {
    pub employees: usize,
    pub income: f64,
    pub expense: f64,
    pub profit_est: f64,
    pub cash: f64,
    pub bank: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CashflowSummary {
    pub income: f64,
    pub expense: f64,
    pub profit_est: f64,
    pub cash: f64,
    pub bank: f64,
    pub wages_pct_of_income: f64,
}

/// One employee's pay for a period
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PayrollLine {
    pub employee_id: i64,
    pub hours: f64,
    pub gross: f64,
    pub tax: f64,
    #[serde(rename = "super")]
    pub superannuation: f64,
    pub net: f64,
    pub pay_method: PayMethod,
}

/// Cost snapshot over every assigned shift
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct RosterTotals {
    pub employee_cost: f64,
    pub tax_cost: f64,
    pub super_cost: f64,
    pub cash_cost: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerateRosterResponse {
    pub status: String,
    pub totals: RosterTotals,
}
