// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Dashboard aggregates computed client-side from fetched records.

use crate::models::{BudgetTracking, Expense, TransactionType};
use crate::utils::MonthPeriod;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub total_expense: Decimal,
    pub total_income: Decimal,
    pub total_investment: Decimal,
    pub total_others: Decimal,
}

pub fn calculate_totals(expenses: &[Expense]) -> Totals {
    let mut t = Totals::default();
    for e in expenses {
        match e.kind {
            TransactionType::Expense => t.total_expense += e.amount,
            TransactionType::Income => t.total_income += e.amount,
            TransactionType::Investment => t.total_investment += e.amount,
            _ => t.total_others += e.amount,
        }
    }
    t
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlySpend {
    pub month: String,
    pub amount: Decimal,
}

/// Expense totals for the `months_back` months ending with the one holding
/// `today`, oldest first.
pub fn spending_trends(expenses: &[Expense], today: NaiveDate, months_back: usize) -> Vec<MonthlySpend> {
    let mut period = MonthPeriod::containing(today);
    let mut periods = Vec::with_capacity(months_back);
    for _ in 0..months_back {
        periods.push(period);
        period = period.previous();
    }
    periods.reverse();

    periods
        .into_iter()
        .map(|p| {
            let total: Decimal = expenses
                .iter()
                .filter(|e| e.kind == TransactionType::Expense && p.contains(e.date))
                .map(|e| e.amount)
                .sum();
            MonthlySpend {
                month: p.short_label(),
                amount: total.round_dp(2),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub value: Decimal,
}

fn category_name(e: &Expense) -> &str {
    match e.category.as_deref().map(str::trim) {
        Some(c) if !c.is_empty() => c,
        _ => "Other",
    }
}

/// Expense-only totals per category, largest first.
pub fn category_breakdown(expenses: &[Expense]) -> Vec<CategoryTotal> {
    let mut totals: HashMap<&str, Decimal> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for e in expenses.iter().filter(|e| e.kind == TransactionType::Expense) {
        let name = category_name(e);
        let slot = totals.entry(name).or_insert_with(|| {
            order.push(name);
            Decimal::ZERO
        });
        *slot += e.amount;
    }
    let mut out: Vec<CategoryTotal> = order
        .into_iter()
        .map(|c| CategoryTotal {
            category: c.to_string(),
            value: totals[c].round_dp(2),
        })
        .collect();
    out.sort_by(|a, b| b.value.cmp(&a.value));
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopCategory {
    pub category: String,
    pub amount: Decimal,
    pub percentage: Decimal,
}

pub fn top_categories(expenses: &[Expense], top_n: usize) -> Vec<TopCategory> {
    let breakdown = category_breakdown(expenses);
    let total: Decimal = breakdown.iter().map(|c| c.value).sum();
    breakdown
        .into_iter()
        .take(top_n)
        .map(|c| {
            let percentage = if total > Decimal::ZERO {
                (c.value / total * Decimal::ONE_HUNDRED).round_dp(1)
            } else {
                Decimal::ZERO
            };
            TopCategory {
                category: c.category,
                amount: c.value,
                percentage,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BudgetProgress {
    pub category: String,
    pub budgeted: Decimal,
    pub spent: Decimal,
    pub remaining: Decimal,
    /// Capped at 100 for display.
    pub progress: Decimal,
    pub over_budget: bool,
}

/// Per-category progress, skipping categories with nothing budgeted.
pub fn budget_progress(tracking: &BudgetTracking) -> Vec<BudgetProgress> {
    tracking
        .categories
        .iter()
        .filter(|c| c.budgeted > Decimal::ZERO)
        .map(|c| BudgetProgress {
            category: c.category.clone().unwrap_or_else(|| "Other".to_string()),
            budgeted: c.budgeted,
            spent: c.spent,
            remaining: c.remaining,
            progress: c.percentage.min(Decimal::ONE_HUNDRED),
            over_budget: c.spent > c.budgeted,
        })
        .collect()
}
