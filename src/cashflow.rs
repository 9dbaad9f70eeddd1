//! Cash-flow bookkeeping summaries

use crate::api_models::{CashflowSummary, DashboardSummary};
use crate::models::{PayMethod, Transaction, TransactionType};
use crate::payroll::round2;

const WAGES_CATEGORY: &str = "wages";

#[derive(Debug, Default)]
struct Ledger {
    income: f64,
    expense: f64,
    cash: f64,
    bank: f64,
    wages: f64,
}

impl Ledger {
    /// `cash` and `bank` total money moved through each method, in either
    /// direction
    fn tally(transactions: &[Transaction]) -> Self {
        let mut ledger = Ledger::default();
        for tx in transactions {
            match tx.kind {
                TransactionType::Income => ledger.income += tx.amount,
                TransactionType::Expense => ledger.expense += tx.amount,
            }
            match tx.method {
                PayMethod::Cash => ledger.cash += tx.amount,
                PayMethod::Bank => ledger.bank += tx.amount,
            }
            if tx
                .category
                .as_deref()
                .is_some_and(|category| category.eq_ignore_ascii_case(WAGES_CATEGORY))
            {
                ledger.wages += tx.amount;
            }
        }
        ledger
    }
}

pub fn dashboard(employee_count: usize, transactions: &[Transaction]) -> DashboardSummary {
    let ledger = Ledger::tally(transactions);
    DashboardSummary {
        employees: employee_count,
        income: round2(ledger.income),
        expense: round2(ledger.expense),
        profit_est: round2(ledger.income - ledger.expense),
        cash: round2(ledger.cash),
        bank: round2(ledger.bank),
    }
}

/// Totals plus wages as a percentage of income (zero with no income)
pub fn summary(transactions: &[Transaction]) -> CashflowSummary {
    let ledger = Ledger::tally(transactions);
    let wages_pct = if ledger.income > 0.0 {
        ledger.wages / ledger.income * 100.0
    } else {
        0.0
    };
    CashflowSummary {
        income: round2(ledger.income),
        expense: round2(ledger.expense),
        profit_est: round2(ledger.income - ledger.expense),
        cash: round2(ledger.cash),
        bank: round2(ledger.bank),
        wages_pct_of_income: round2(wages_pct),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx(
        kind: TransactionType,
        method: PayMethod,
        category: Option<&str>,
        amount: f64,
    ) -> Transaction {
        Transaction {
            id: 0,
            date: "2024-07-01".to_string(),
            kind,
            method,
            category: category.map(str::to_string),
            amount,
        }
    }

    fn sample() -> Vec<Transaction> {
        vec![
            tx(TransactionType::Income, PayMethod::Bank, Some("sales"), 1000.0),
            tx(TransactionType::Income, PayMethod::Cash, None, 200.0),
            tx(TransactionType::Expense, PayMethod::Bank, Some("Wages"), 300.0),
            tx(TransactionType::Expense, PayMethod::Cash, Some("stock"), 50.5),
        ]
    }

    #[test]
    fn test_dashboard_totals() {
        let summary = dashboard(3, &sample());
        assert_eq!(summary.employees, 3);
        assert_eq!(summary.income, 1200.0);
        assert_eq!(summary.expense, 350.5);
        assert_eq!(summary.profit_est, 849.5);
        assert_eq!(summary.cash, 250.5);
        assert_eq!(summary.bank, 1300.0);
    }

    #[test]
    fn test_wages_share_is_case_insensitive() {
        let result = summary(&sample());
        assert_eq!(result.wages_pct_of_income, 25.0);
    }

    #[test]
    fn test_no_income_means_zero_wage_share() {
        let result = summary(&[tx(TransactionType::Expense, PayMethod::Bank, Some("wages"), 80.0)]);
        assert_eq!(result.wages_pct_of_income, 0.0);
        assert_eq!(result.profit_est, -80.0);
    }

    #[test]
    fn test_empty_ledger() {
        let summary = dashboard(0, &[]);
        assert_eq!(summary.income, 0.0);
        assert_eq!(summary.bank, 0.0);
    }
}
