// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::analytics::{
    budget_progress, calculate_totals, spending_trends, top_categories, BudgetProgress,
    MonthlySpend, TopCategory, Totals,
};
use crate::api::ApiClient;
use crate::utils::{fmt_money, maybe_print_json, month_arg, pretty_table, MonthPeriod};
use anyhow::Result;
use chrono::Months;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub month: MonthPeriod,
    pub totals: Totals,
    pub trends: Vec<MonthlySpend>,
    pub top_categories: Vec<TopCategory>,
    pub budget: Vec<BudgetProgress>,
}

pub fn build(api: &ApiClient, month: MonthPeriod, months_back: usize, top: usize) -> Result<Dashboard> {
    let span = u32::try_from(months_back.saturating_sub(1)).unwrap_or(u32::MAX);
    let from = month
        .first_day()
        .checked_sub_months(Months::new(span))
        .unwrap_or(month.first_day());
    let history = api.expenses_between(from, month.last_day())?;
    let current: Vec<_> = history
        .iter()
        .filter(|e| month.contains(e.date))
        .cloned()
        .collect();

    // Budget tracking failures do not fail the dashboard.
    let budget = match api.budget_tracking(month.month0(), month.year()) {
        Ok(t) => budget_progress(&t),
        Err(e) => {
            tracing::warn!(error = %e, "budget tracking unavailable");
            Vec::new()
        }
    };

    Ok(Dashboard {
        month,
        totals: calculate_totals(&current),
        trends: spending_trends(&history, month.first_day(), months_back),
        top_categories: top_categories(&current, top),
        budget,
    })
}

pub fn handle(api: &ApiClient, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let month = month_arg(sub)?;
    let months_back = sub.get_one::<usize>("months-back").copied().unwrap_or(6);
    let top = sub.get_one::<usize>("top").copied().unwrap_or(5);

    let d = build(api, month, months_back, top)?;
    if maybe_print_json(json_flag, jsonl_flag, &d)? {
        return Ok(());
    }

    let t = &d.totals;
    println!("{}", d.month);
    println!(
        "{}",
        pretty_table(
            &["Income", "Expenses", "Investments", "Other"],
            vec![vec![
                fmt_money(&t.total_income),
                fmt_money(&t.total_expense),
                fmt_money(&t.total_investment),
                fmt_money(&t.total_others),
            ]]
        )
    );

    let trend_rows = d
        .trends
        .iter()
        .map(|m| vec![m.month.clone(), fmt_money(&m.amount)])
        .collect();
    println!("{}", pretty_table(&["Month", "Spent"], trend_rows));

    let top_rows = d
        .top_categories
        .iter()
        .map(|c| {
            vec![
                c.category.clone(),
                fmt_money(&c.amount),
                format!("{}%", c.percentage),
            ]
        })
        .collect();
    println!("{}", pretty_table(&["Category", "Spent", "Share"], top_rows));

    if !d.budget.is_empty() {
        let rows = d
            .budget
            .iter()
            .map(|b| {
                vec![
                    b.category.clone(),
                    fmt_money(&b.spent),
                    fmt_money(&b.budgeted),
                    format!("{}%", b.progress.round_dp(0)),
                    if b.over_budget { "OVER".into() } else { String::new() },
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Budget", "Spent", "Limit", "Progress", ""], rows)
        );
    }
    Ok(())
}
