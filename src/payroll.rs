//! Roster costing and payroll calculations
//!
//! Everything here is pure: callers load employees, shifts and the current
//! [`TaxSuperRule`] from the store and pass them in.

use crate::api_models::{PayrollLine, RosterTotals};
use crate::models::{Employee, EmploymentType, PayMethod, Shift, TaxSuperRule};
use crate::{BusinessError, Result};
use chrono::{NaiveDate, NaiveTime};
use tracing::warn;

const TIME_FORMAT: &str = "%H:%M";
const DAY_FORMAT: &str = "%Y-%m-%d";

pub fn parse_time(hhmm: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(hhmm, TIME_FORMAT)
        .map_err(|_| BusinessError::Validation(format!("invalid time {:?}, expected HH:MM", hhmm)))
}

pub fn parse_day(day: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(day, DAY_FORMAT)
        .map_err(|_| {
            BusinessError::Validation(format!("invalid date {:?}, expected YYYY-MM-DD", day))
        })
}

/// Length of a shift in hours. An end earlier than the start means the
/// shift runs past midnight.
pub fn hours_between(start: &str, end: &str) -> Result<f64> {
    let start = parse_time(start)?;
    let end = parse_time(end)?;
    let mut seconds = (end - start).num_seconds();
    if seconds < 0 {
        seconds += 24 * 60 * 60;
    }
    Ok(seconds as f64 / 3600.0)
}

/// Whether `day` falls in the inclusive range `[start, end]`
pub fn within_period(day: &str, start: &str, end: &str) -> Result<bool> {
    let day = parse_day(day)?;
    Ok(parse_day(start)? <= day && day <= parse_day(end)?)
}

/// Shifts whose day falls in the inclusive range `[start, end]`
pub fn shifts_in_period<'a>(shifts: &'a [Shift], start: &str, end: &str) -> Result<Vec<&'a Shift>> {
    let start = parse_day(start)?;
    let end = parse_day(end)?;

    let mut selected = Vec::with_capacity(shifts.len());
    for shift in shifts {
        let day = parse_day(&shift.day)?;
        if start <= day && day <= end {
            selected.push(shift);
        }
    }
    Ok(selected)
}

/// Round half away from zero to whole cents
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Withholding on `gross` for one pay run
pub fn compute_tax(employee: &Employee, gross: f64, rules: &TaxSuperRule) -> f64 {
    let tax = if employee.employment_type == EmploymentType::Abn {
        gross * rules.abn_withholding_rate
    } else if gross <= rules.bracket1_max {
        gross * rules.bracket1_rate
    } else if gross <= rules.bracket2_max {
        rules.bracket2_base + (gross - rules.bracket1_max) * rules.bracket2_rate
    } else {
        rules.bracket3_base + (gross - rules.bracket2_max) * rules.bracket3_rate
    };
    round2(tax)
}

pub fn compute_super(gross: f64, rules: &TaxSuperRule) -> f64 {
    round2(gross * rules.super_rate)
}

/// Pick the cheapest suitable employee for every unassigned shift.
///
/// A shift with a role only matches employees with exactly that role; a
/// shift without one matches anybody. Ties go to the employee listed first.
/// Returns `(shift_id, employee_id)` pairs.
pub fn assign_cheapest(shifts: &[Shift], employees: &[Employee]) -> Vec<(i64, i64)> {
    shifts
        .iter()
        .filter(|shift| shift.employee_id.is_none())
        .filter_map(|shift| {
            employees
                .iter()
                .filter(|employee| shift.role.is_none() || employee.role == shift.role)
                .min_by(|a, b| a.hourly_rate.total_cmp(&b.hourly_rate))
                .map(|employee| (shift.id, employee.id))
        })
        .collect()
}

/// Hours per assigned employee, in the order employees first appear
fn hours_by_employee<'a>(shifts: impl Iterator<Item = &'a Shift>) -> Result<Vec<(i64, f64)>> {
    let mut totals: Vec<(i64, f64)> = Vec::new();
    for shift in shifts {
        let Some(employee_id) = shift.employee_id else {
            continue;
        };
        let hours = hours_between(&shift.start, &shift.end)?;
        match totals.iter_mut().find(|(id, _)| *id == employee_id) {
            Some((_, total)) => *total += hours,
            None => totals.push((employee_id, hours)),
        }
    }
    Ok(totals)
}

fn find_employee(employees: &[Employee], id: i64) -> Option<&Employee> {
    let found = employees.iter().find(|employee| employee.id == id);
    if found.is_none() {
        warn!("Shift assigned to unknown employee {}, skipping", id);
    }
    found
}

/// Wage, tax and super cost of every assigned shift
pub fn roster_totals(
    shifts: &[Shift],
    employees: &[Employee],
    rules: &TaxSuperRule,
) -> Result<RosterTotals> {
    let mut totals = RosterTotals::default();

    for (employee_id, hours) in hours_by_employee(shifts.iter())? {
        let Some(employee) = find_employee(employees, employee_id) else {
            continue;
        };
        let gross = hours * employee.hourly_rate;
        totals.employee_cost += gross;
        totals.tax_cost += compute_tax(employee, gross, rules);
        totals.super_cost += compute_super(gross, rules);
        if employee.pay_preference == PayMethod::Cash {
            totals.cash_cost += gross;
        }
    }

    Ok(RosterTotals {
        employee_cost: round2(totals.employee_cost),
        tax_cost: round2(totals.tax_cost),
        super_cost: round2(totals.super_cost),
        cash_cost: round2(totals.cash_cost),
    })
}

/// One pay line per employee with assigned shifts in `[period_start, period_end]`.
///
/// Contractors on an ABN are paid with `default_pay_method`; everybody else
/// by their own preference.
pub fn payroll_lines(
    shifts: &[Shift],
    employees: &[Employee],
    rules: &TaxSuperRule,
    period_start: &str,
    period_end: &str,
    default_pay_method: PayMethod,
) -> Result<Vec<PayrollLine>> {
    let in_period = shifts_in_period(shifts, period_start, period_end)?;

    let mut lines = Vec::new();
    for (employee_id, hours) in hours_by_employee(in_period.into_iter())? {
        let Some(employee) = find_employee(employees, employee_id) else {
            continue;
        };
        let gross = round2(hours * employee.hourly_rate);
        let tax = compute_tax(employee, gross, rules);
        let pay_method = match employee.employment_type {
            EmploymentType::Abn => default_pay_method,
            _ => employee.pay_preference,
        };
        lines.push(PayrollLine {
            employee_id,
            hours,
            gross,
            tax,
            superannuation: compute_super(gross, rules),
            net: round2(gross - tax),
            pay_method,
        });
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Busyness;

    fn employee(id: i64, kind: EmploymentType, rate: f64, role: Option<&str>) -> Employee {
        Employee {
            id,
            name: format!("Employee {}", id),
            email: None,
            employment_type: kind,
            tfn: None,
            abn: None,
            hourly_rate: rate,
            role: role.map(str::to_string),
            max_hours_week: None,
            pay_preference: PayMethod::Bank,
        }
    }

    fn shift(id: i64, employee_id: Option<i64>, day: &str, start: &str, end: &str) -> Shift {
        Shift {
            id,
            employee_id,
            day: day.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            role: None,
            expected_busyness: Busyness::Med,
            max_shift_hours: None,
        }
    }

    #[test]
    fn test_hours_between_same_day() {
        assert_eq!(hours_between("09:00", "17:30").unwrap(), 8.5);
        assert_eq!(hours_between("10:00", "10:00").unwrap(), 0.0);
    }

    #[test]
    fn test_hours_between_wraps_midnight() {
        assert_eq!(hours_between("22:00", "02:00").unwrap(), 4.0);
    }

    #[test]
    fn test_hours_between_rejects_bad_time() {
        assert!(matches!(hours_between("9am", "17:00"), Err(BusinessError::Validation(_))));
        assert!(hours_between("25:00", "17:00").is_err());
    }

    #[test]
    fn test_within_period_is_inclusive() {
        assert!(within_period("2024-07-01", "2024-07-01", "2024-07-07").unwrap());
        assert!(within_period("2024-07-07", "2024-07-01", "2024-07-07").unwrap());
        assert!(!within_period("2024-07-08", "2024-07-01", "2024-07-07").unwrap());
        assert!(within_period("07/01/2024", "2024-07-01", "2024-07-07").is_err());
    }

    #[test]
    fn test_shifts_in_period() {
        let shifts = vec![
            shift(1, None, "2024-06-30", "09:00", "17:00"),
            shift(2, None, "2024-07-01", "09:00", "17:00"),
            shift(3, Some(4), "2024-07-07", "09:00", "17:00"),
            shift(4, None, "2024-07-08", "09:00", "17:00"),
        ];
        let ids: Vec<i64> = shifts_in_period(&shifts, "2024-07-01", "2024-07-07")
            .unwrap()
            .iter()
            .map(|shift| shift.id)
            .collect();
        assert_eq!(ids, vec![2, 3]);
    }

    #[test]
    fn test_tax_brackets() {
        let rules = TaxSuperRule::default();
        let tfn = employee(1, EmploymentType::Tfn, 25.0, None);

        assert_eq!(compute_tax(&tfn, 400.0, &rules), 20.0);
        assert_eq!(compute_tax(&tfn, 500.0, &rules), 25.0);
        // 25 + 300 * 0.15
        assert_eq!(compute_tax(&tfn, 800.0, &rules), 70.0);
        // 100 + 200 * 0.25
        assert_eq!(compute_tax(&tfn, 1200.0, &rules), 150.0);
    }

    #[test]
    fn test_abn_uses_withholding_rate() {
        let rules = TaxSuperRule {
            abn_withholding_rate: 0.1,
            ..TaxSuperRule::default()
        };
        let abn = employee(1, EmploymentType::Abn, 40.0, None);
        assert_eq!(compute_tax(&abn, 1200.0, &rules), 120.0);
    }

    #[test]
    fn test_super_rounds_to_cents() {
        let rules = TaxSuperRule::default();
        assert_eq!(compute_super(123.45, &rules), 14.2);
    }

    #[test]
    fn test_assign_cheapest_matches_role() {
        let employees = vec![
            employee(1, EmploymentType::Tfn, 30.0, Some("barista")),
            employee(2, EmploymentType::Tfn, 22.0, Some("barista")),
            employee(3, EmploymentType::Tfn, 18.0, Some("kitchen")),
            employee(4, EmploymentType::Tfn, 15.0, None),
        ];
        let mut barista = shift(10, None, "2024-07-01", "09:00", "17:00");
        barista.role = Some("barista".to_string());
        let anyone = shift(11, None, "2024-07-01", "09:00", "17:00");
        let taken = shift(12, Some(1), "2024-07-01", "09:00", "17:00");
        let mut nobody = shift(13, None, "2024-07-01", "09:00", "17:00");
        nobody.role = Some("manager".to_string());

        let assignments = assign_cheapest(&[barista, anyone, taken, nobody], &employees);
        assert_eq!(assignments, vec![(10, 2), (11, 4)]);
    }

    #[test]
    fn test_assign_cheapest_tie_goes_to_first() {
        let employees = vec![
            employee(5, EmploymentType::Tfn, 20.0, None),
            employee(6, EmploymentType::Tfn, 20.0, None),
        ];
        let open = [shift(1, None, "2024-07-01", "09:00", "12:00")];
        let assignments = assign_cheapest(&open, &employees);
        assert_eq!(assignments, vec![(1, 5)]);
    }

    #[test]
    fn test_roster_totals() {
        let rules = TaxSuperRule::default();
        let mut cash = employee(2, EmploymentType::Tfn, 20.0, None);
        cash.pay_preference = PayMethod::Cash;
        let employees = vec![employee(1, EmploymentType::Tfn, 25.0, None), cash];
        let shifts = vec![
            shift(1, Some(1), "2024-07-01", "09:00", "17:00"),
            shift(2, Some(2), "2024-07-01", "09:00", "14:00"),
            shift(3, None, "2024-07-01", "09:00", "17:00"),
            shift(4, Some(99), "2024-07-01", "09:00", "17:00"),
        ];

        let totals = roster_totals(&shifts, &employees, &rules).unwrap();
        assert_eq!(totals.employee_cost, 300.0);
        assert_eq!(totals.tax_cost, 15.0);
        assert_eq!(totals.super_cost, 34.5);
        assert_eq!(totals.cash_cost, 100.0);
    }

    #[test]
    fn test_payroll_lines_filter_period_and_keep_order() {
        let rules = TaxSuperRule::default();
        let mut contractor = employee(7, EmploymentType::Abn, 50.0, None);
        contractor.pay_preference = PayMethod::Bank;
        let employees = vec![employee(3, EmploymentType::Tfn, 30.0, None), contractor];
        let shifts = vec![
            shift(1, Some(7), "2024-07-02", "08:00", "12:00"),
            shift(2, Some(3), "2024-07-03", "22:00", "06:00"),
            shift(3, Some(3), "2024-07-04", "09:00", "13:00"),
            shift(4, Some(3), "2024-07-20", "09:00", "17:00"),
        ];

        let lines = payroll_lines(
            &shifts,
            &employees,
            &rules,
            "2024-07-01",
            "2024-07-07",
            PayMethod::Cash,
        )
        .unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].employee_id, 7);
        assert_eq!(lines[0].gross, 200.0);
        assert_eq!(lines[0].tax, 0.0);
        assert_eq!(lines[0].pay_method, PayMethod::Cash);

        assert_eq!(lines[1].employee_id, 3);
        assert_eq!(lines[1].hours, 12.0);
        assert_eq!(lines[1].gross, 360.0);
        assert_eq!(lines[1].tax, 18.0);
        assert_eq!(lines[1].superannuation, 41.4);
        assert_eq!(lines[1].net, 342.0);
        assert_eq!(lines[1].pay_method, PayMethod::Bank);
    }

    #[test]
    fn test_payroll_rejects_bad_period() {
        let rules = TaxSuperRule::default();
        let result = payroll_lines(&[], &[], &rules, "2024-13-01", "2024-07-07", PayMethod::Bank);
        assert!(matches!(result, Err(BusinessError::Validation(_))));
    }
}
