// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::api::ApiClient;
use crate::config::Config;
use crate::models::{RecordId, SplitwiseEntry};
use crate::utils::{fmt_money, maybe_print_json, pretty_table, range_args, truncate};
use anyhow::{anyhow, Context, Result};
use rust_decimal::Decimal;

pub fn handle(api: &ApiClient, cfg: &Config, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("sync", _)) => {
            let res = api
                .sync_splitwise()
                .map_err(|e| anyhow!(e.user_message("Failed to sync Splitwise data")))?;
            println!("Synced {} Splitwise records", res.records_processed);
        }
        Some(("status", _)) => match api.splitwise_status()? {
            Some(s) if !s.has_never_synced => {
                println!(
                    "Last synced: {}",
                    s.last_synced_at.as_deref().unwrap_or("unknown")
                );
            }
            _ => println!("Splitwise has never been synced"),
        },
        Some(("list", sub)) => list(api, cfg, sub)?,
        _ => {}
    }
    Ok(())
}

/// Fetches and flattens the listing; `--user`/`--user-id` beat the stored settings.
pub fn fetch(api: &ApiClient, cfg: &Config, sub: &clap::ArgMatches) -> Result<Vec<SplitwiseEntry>> {
    let user = sub
        .get_one::<String>("user")
        .or(cfg.splitwise_user.as_ref())
        .context("No Splitwise user: pass --user or run `fintrack config set-splitwise-user`")?;
    let user_id: Option<RecordId> = sub
        .get_one::<String>("user-id")
        .or(cfg.splitwise_user_id.as_ref())
        .map(|s| s.parse().unwrap_or_else(|e| match e {}));
    let (from, to) = range_args(sub)?;
    let listing = api
        .splitwise_expenses(from, to, user)
        .map_err(|e| anyhow!(e.user_message("Failed to load Splitwise expenses")))?;
    let mut entries: Vec<SplitwiseEntry> = listing
        .iter()
        .map(|l| l.normalize(user_id.as_ref()))
        .collect();
    entries.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(entries)
}

fn list(api: &ApiClient, cfg: &Config, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let entries = fetch(api, cfg, sub)?;
    if maybe_print_json(json_flag, jsonl_flag, &entries)? {
        return Ok(());
    }

    let rows = entries
        .iter()
        .map(|e| {
            vec![
                e.date.to_string(),
                e.category.clone(),
                truncate(&e.description, 40),
                fmt_money(&e.amount),
                e.owed_share.map(|s| fmt_money(&s)).unwrap_or_else(|| "-".into()),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(&["Date", "Category", "Description", "Cost", "Your share"], rows)
    );
    let owed: Decimal = entries.iter().filter_map(|e| e.owed_share).sum();
    println!("{} expenses, your share {}", entries.len(), fmt_money(&owed));
    Ok(())
}
