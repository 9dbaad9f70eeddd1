use business_manager::models::Busyness;
use business_manager::payroll::{assign_cheapest, payroll_lines, roster_totals};
use business_manager::{Employee, EmploymentType, PayMethod, Shift, TaxSuperRule};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

const ROLES: [&str; 3] = ["barista", "cook", "floor"];

fn generate_staff(count: usize) -> Vec<Employee> {
    (0..count)
        .map(|i| Employee {
            id: i as i64 + 1,
            name: format!("Staff {}", i),
            email: None,
            employment_type: match i % 3 {
                0 => EmploymentType::Tfn,
                1 => EmploymentType::Abn,
                _ => EmploymentType::IntStudent,
            },
            tfn: None,
            abn: None,
            hourly_rate: 24.0 + (i % 7) as f64 * 1.5,
            role: Some(ROLES[i % ROLES.len()].to_string()),
            max_hours_week: None,
            pay_preference: if i % 4 == 0 { PayMethod::Cash } else { PayMethod::Bank },
        })
        .collect()
}

/// A fortnight of shifts spread over `staff` employees; every fifth one open
fn generate_shifts(count: usize, staff: usize) -> Vec<Shift> {
    (0..count)
        .map(|i| Shift {
            id: i as i64 + 1,
            employee_id: (i % 5 != 0).then(|| (i % staff) as i64 + 1),
            day: format!("2025-01-{:02}", 6 + i % 14),
            start: format!("{:02}:00", 6 + i % 8),
            end: format!("{:02}:30", 12 + i % 10),
            role: Some(ROLES[i % ROLES.len()].to_string()),
            expected_busyness: Busyness::Med,
            max_shift_hours: None,
        })
        .collect()
}

fn bench_payroll_lines(c: &mut Criterion) {
    let rules = TaxSuperRule::default();
    let mut group = c.benchmark_group("payroll_lines");

    for shift_count in [100, 1_000, 10_000].iter() {
        let staff = generate_staff(50);
        let shifts = generate_shifts(*shift_count, staff.len());

        group.bench_with_input(BenchmarkId::new("week", shift_count), shift_count, |b, _| {
            b.iter(|| {
                payroll_lines(
                    black_box(&shifts),
                    black_box(&staff),
                    &rules,
                    "2025-01-06",
                    "2025-01-12",
                    PayMethod::Bank,
                )
            })
        });
    }

    group.finish();
}

fn bench_roster(c: &mut Criterion) {
    let rules = TaxSuperRule::default();
    let staff = generate_staff(50);
    let shifts = generate_shifts(2_000, staff.len());
    let mut group = c.benchmark_group("roster");

    group.bench_function("assign_cheapest", |b| {
        b.iter(|| assign_cheapest(black_box(&shifts), black_box(&staff)))
    });

    group.bench_function("roster_totals", |b| {
        b.iter(|| roster_totals(black_box(&shifts), black_box(&staff), &rules))
    });

    group.finish();
}

criterion_group!(benches, bench_payroll_lines, bench_roster);
criterion_main!(benches);
