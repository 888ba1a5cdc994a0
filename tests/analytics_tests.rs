// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use fintrack::analytics::{
    budget_progress, calculate_totals, category_breakdown, spending_trends, top_categories,
};
use fintrack::models::{BudgetLine, BudgetTracking, Expense, TransactionType};
use rust_decimal::Decimal;

fn dec(s: &str) -> Decimal {
    s.parse().unwrap()
}

fn rec(date: &str, amount: &str, kind: &str, category: Option<&str>) -> Expense {
    Expense {
        id: None,
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        amount: dec(amount),
        description: "x".into(),
        kind: TransactionType::from(kind.to_string()),
        category: category.map(str::to_string),
        source: None,
        tags: Vec::new(),
    }
}

fn sample() -> Vec<Expense> {
    vec![
        rec("2025-03-02", "120.00", "Expense", Some("Groceries")),
        rec("2025-03-05", "45.50", "Expense", Some("Dining")),
        rec("2025-03-09", "80.00", "Expense", Some("Groceries")),
        rec("2025-03-11", "10.00", "Expense", None),
        rec("2025-03-15", "3000.00", "Income", Some("Salary")),
        rec("2025-03-20", "500.00", "Investment", None),
        rec("2025-03-21", "200.00", "Transfer", None),
        rec("2025-02-14", "60.00", "Expense", Some("Dining")),
        rec("2024-12-24", "99.99", "Expense", Some("Gifts")),
    ]
}

#[test]
fn totals_split_by_type() {
    let t = calculate_totals(&sample());
    assert_eq!(t.total_expense, dec("415.49"));
    assert_eq!(t.total_income, dec("3000.00"));
    assert_eq!(t.total_investment, dec("500.00"));
    assert_eq!(t.total_others, dec("200.00"));
}

#[test]
fn trends_cover_requested_months_oldest_first() {
    let today = NaiveDate::from_ymd_opt(2025, 3, 28).unwrap();
    let trends = spending_trends(&sample(), today, 4);
    let labels: Vec<&str> = trends.iter().map(|m| m.month.as_str()).collect();
    assert_eq!(labels, vec!["Dec 24", "Jan 25", "Feb 25", "Mar 25"]);
    assert_eq!(trends[0].amount, dec("99.99"));
    assert_eq!(trends[1].amount, Decimal::ZERO);
    assert_eq!(trends[2].amount, dec("60.00"));
    assert_eq!(trends[3].amount, dec("255.50"));
}

#[test]
fn breakdown_counts_expenses_only_and_defaults_category() {
    let march: Vec<Expense> = sample()
        .into_iter()
        .filter(|e| e.date >= NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
        .collect();
    let b = category_breakdown(&march);
    let names: Vec<&str> = b.iter().map(|c| c.category.as_str()).collect();
    assert_eq!(names, vec!["Groceries", "Dining", "Other"]);
    assert_eq!(b[0].value, dec("200.00"));
}

#[test]
fn top_categories_report_share_of_spend() {
    let top = top_categories(&sample(), 2);
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].category, "Groceries");
    // 200 / 415.49
    assert_eq!(top[0].percentage, dec("48.1"));
    assert_eq!(top[1].category, "Dining");
    assert_eq!(top[1].amount, dec("105.50"));
    assert!(top_categories(&[], 5).is_empty());
}

#[test]
fn budget_progress_caps_and_flags_overspend() {
    let tracking = BudgetTracking {
        overall: BudgetLine::default(),
        categories: vec![
            BudgetLine {
                category: Some("Dining".into()),
                budgeted: dec("100"),
                spent: dec("130"),
                remaining: dec("-30"),
                percentage: dec("130"),
            },
            BudgetLine {
                category: Some("Groceries".into()),
                budgeted: dec("400"),
                spent: dec("200"),
                remaining: dec("200"),
                percentage: dec("50"),
            },
            BudgetLine {
                category: Some("Travel".into()),
                budgeted: Decimal::ZERO,
                spent: dec("20"),
                remaining: dec("-20"),
                percentage: Decimal::ZERO,
            },
        ],
    };
    let p = budget_progress(&tracking);
    assert_eq!(p.len(), 2);
    assert_eq!(p[0].progress, Decimal::ONE_HUNDRED);
    assert!(p[0].over_budget);
    assert_eq!(p[1].progress, dec("50"));
    assert!(!p[1].over_budget);
}
