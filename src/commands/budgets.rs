// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::analytics::budget_progress;
use crate::api::ApiClient;
use crate::models::{Budget, CategoryBudget};
use crate::utils::{fmt_money, maybe_print_json, month_arg, parse_decimal, pretty_table};
use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;

pub fn handle(api: &ApiClient, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("set", sub)) => set(api, sub)?,
        Some(("show", sub)) => show(api, sub)?,
        Some(("track", sub)) => track(api, sub)?,
        Some(("delete", sub)) => delete(api, sub)?,
        _ => {}
    }
    Ok(())
}

/// Parses `NAME=AMOUNT`.
pub fn parse_category_budget(s: &str) -> Result<CategoryBudget> {
    let (name, amount) = s
        .split_once('=')
        .with_context(|| format!("Invalid category budget '{}', expected NAME=AMOUNT", s))?;
    let name = name.trim();
    if name.is_empty() {
        bail!("Category name missing in '{}'", s);
    }
    let amount = parse_decimal(amount)?;
    if amount < Decimal::ZERO {
        bail!("Budget for {} must not be negative", name);
    }
    Ok(CategoryBudget {
        category: name.to_string(),
        amount,
    })
}

fn set(api: &ApiClient, sub: &clap::ArgMatches) -> Result<()> {
    let month = month_arg(sub)?;
    let overall = parse_decimal(sub.get_one::<String>("overall").context("--overall is required")?)?;
    if overall < Decimal::ZERO {
        bail!("Overall budget must not be negative");
    }
    let category_budgets = sub
        .get_many::<String>("category")
        .into_iter()
        .flatten()
        .map(|s| parse_category_budget(s))
        .collect::<Result<Vec<_>>>()?;
    let budget = Budget {
        month: month.month0(),
        year: month.year(),
        overall_budget: overall,
        category_budgets,
    };
    api.save_budget(&budget)?;
    println!(
        "Budget set for {}: {} overall, {} categories",
        month,
        fmt_money(&overall),
        budget.category_budgets.len()
    );
    Ok(())
}

fn show(api: &ApiClient, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let month = month_arg(sub)?;
    let Some(budget) = api.budget(month.month0(), month.year())? else {
        println!("No budget set for {}", month);
        return Ok(());
    };
    if maybe_print_json(json_flag, jsonl_flag, &budget)? {
        return Ok(());
    }
    let mut rows = vec![vec!["(overall)".to_string(), fmt_money(&budget.overall_budget)]];
    rows.extend(
        budget
            .category_budgets
            .iter()
            .map(|c| vec![c.category.clone(), fmt_money(&c.amount)]),
    );
    println!("Budget for {}", month);
    println!("{}", pretty_table(&["Category", "Budget"], rows));
    Ok(())
}

fn track(api: &ApiClient, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let month = month_arg(sub)?;
    let tracking = api.budget_tracking(month.month0(), month.year())?;
    let progress = budget_progress(&tracking);
    if maybe_print_json(json_flag, jsonl_flag, &progress)? {
        return Ok(());
    }

    let o = &tracking.overall;
    println!(
        "{}: spent {} of {} ({}%), {} remaining",
        month,
        fmt_money(&o.spent),
        fmt_money(&o.budgeted),
        o.percentage.round_dp(1),
        fmt_money(&o.remaining)
    );
    let rows = progress
        .iter()
        .map(|p| {
            vec![
                p.category.clone(),
                fmt_money(&p.budgeted),
                fmt_money(&p.spent),
                fmt_money(&p.remaining),
                format!("{}%", p.progress.round_dp(1)),
                if p.over_budget { "OVER".into() } else { String::new() },
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Category", "Budget", "Spent", "Remaining", "Progress", ""],
            rows
        )
    );
    Ok(())
}

fn delete(api: &ApiClient, sub: &clap::ArgMatches) -> Result<()> {
    let month = month_arg(sub)?;
    api.delete_budget(month.month0(), month.year())?;
    println!("Deleted budget for {}", month);
    Ok(())
}
