// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::api::ApiClient;
use crate::models::{Expense, NewExpense, RecordId, TransactionType};
use crate::utils::{
    fmt_money, maybe_print_json, parse_date, parse_decimal, pretty_table, range_args, truncate,
};
use anyhow::{anyhow, bail, Context, Result};

pub fn handle(api: &ApiClient, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => list(api, sub)?,
        Some(("add", sub)) => add(api, sub)?,
        Some(("update", sub)) => update(api, sub)?,
        Some(("delete", sub)) => delete(api, sub)?,
        Some(("export", sub)) => export(api, sub)?,
        Some(("categories", _)) => categories(api)?,
        _ => {}
    }
    Ok(())
}

fn parse_kind(s: &str) -> Result<TransactionType> {
    s.parse().map_err(|e: String| anyhow!(e))
}

fn record_id(sub: &clap::ArgMatches) -> Result<RecordId> {
    let raw = sub.get_one::<String>("id").context("id is required")?;
    Ok(raw.parse().unwrap_or_else(|e| match e {}))
}

fn fetch(api: &ApiClient, sub: &clap::ArgMatches) -> Result<Vec<Expense>> {
    if sub.try_get_one::<bool>("all").ok().flatten().copied().unwrap_or(false) {
        return Ok(api.list_expenses()?);
    }
    let (from, to) = range_args(sub)?;
    Ok(api.expenses_between(from, to)?)
}

fn list(api: &ApiClient, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let mut items = fetch(api, sub)?;
    items.sort_by(|a, b| b.date.cmp(&a.date));
    if let Some(limit) = sub.get_one::<usize>("limit") {
        items.truncate(*limit);
    }

    if maybe_print_json(json_flag, jsonl_flag, &items)? {
        return Ok(());
    }
    let rows = items
        .iter()
        .map(|e| {
            vec![
                e.id.as_ref().map(|i| i.to_string()).unwrap_or_default(),
                e.date.to_string(),
                e.kind.to_string(),
                e.category.clone().unwrap_or_default(),
                truncate(&e.description, 40),
                fmt_money(&e.amount),
                e.source.clone().unwrap_or_default(),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["ID", "Date", "Type", "Category", "Description", "Amount", "Source"],
            rows
        )
    );
    Ok(())
}

fn add(api: &ApiClient, sub: &clap::ArgMatches) -> Result<()> {
    let date = parse_date(sub.get_one::<String>("date").context("--date is required")?)?;
    let amount = parse_decimal(sub.get_one::<String>("amount").context("--amount is required")?)?;
    let description = sub
        .get_one::<String>("description")
        .context("--description is required")?;
    if description.trim().is_empty() {
        bail!("Description must not be empty");
    }
    let kind = parse_kind(sub.get_one::<String>("type").context("--type is required")?)?;
    let expense = NewExpense::new(
        date,
        amount,
        description.trim(),
        kind,
        sub.get_one::<String>("category").cloned(),
        sub.get_one::<String>("source").cloned(),
    );
    api.create_expense(&expense)?;
    println!(
        "Added {} {} on {} ({})",
        expense.kind,
        fmt_money(&expense.amount),
        expense.date,
        expense.category
    );
    Ok(())
}

fn update(api: &ApiClient, sub: &clap::ArgMatches) -> Result<()> {
    let id = record_id(sub)?;
    let mut expense = api
        .list_expenses()?
        .into_iter()
        .find(|e| e.id.as_ref() == Some(&id))
        .with_context(|| format!("No record with id {}", id))?;

    if let Some(d) = sub.get_one::<String>("date") {
        expense.date = parse_date(d)?;
    }
    if let Some(a) = sub.get_one::<String>("amount") {
        expense.amount = parse_decimal(a)?;
    }
    if let Some(d) = sub.get_one::<String>("description") {
        expense.description = d.trim().to_string();
    }
    if let Some(t) = sub.get_one::<String>("type") {
        expense.kind = parse_kind(t)?;
    }
    if let Some(c) = sub.get_one::<String>("category") {
        expense.category = Some(c.clone());
    }
    if let Some(s) = sub.get_one::<String>("source") {
        expense.source = Some(s.clone());
    }
    let saved = api.update_expense(expense.id.as_ref().unwrap_or(&id), &expense)?;
    println!(
        "Updated {}: {} {} on {}",
        id,
        saved.kind,
        fmt_money(&saved.amount),
        saved.date
    );
    Ok(())
}

fn delete(api: &ApiClient, sub: &clap::ArgMatches) -> Result<()> {
    let id = record_id(sub)?;
    api.delete_expense(&id)?;
    println!("Deleted record {}", id);
    Ok(())
}

fn export(api: &ApiClient, sub: &clap::ArgMatches) -> Result<()> {
    let fmt = sub
        .get_one::<String>("format")
        .map(|s| s.to_lowercase())
        .unwrap_or_else(|| "csv".into());
    let out = sub.get_one::<String>("out").context("--out is required")?;
    if fmt != "csv" && fmt != "json" {
        bail!("Unknown format: {} (use csv|json)", fmt);
    }

    let mut items = fetch(api, sub)?;
    items.sort_by(|a, b| a.date.cmp(&b.date));

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record(["date", "type", "category", "description", "amount", "source"])?;
            for e in &items {
                wtr.write_record([
                    e.date.to_string(),
                    e.kind.to_string(),
                    e.category.clone().unwrap_or_default(),
                    e.description.clone(),
                    e.amount.round_dp(2).to_string(),
                    e.source.clone().unwrap_or_default(),
                ])?;
            }
            wtr.flush()?;
        }
        _ => {
            std::fs::write(out, serde_json::to_string_pretty(&items)?)?;
        }
    }
    println!("Exported {} records to {}", items.len(), out);
    Ok(())
}

fn categories(api: &ApiClient) -> Result<()> {
    let rows = api
        .categories()?
        .into_iter()
        .map(|c| vec![c.name, c.color.unwrap_or_default()])
        .collect();
    println!("{}", pretty_table(&["Category", "Color"], rows));
    Ok(())
}
