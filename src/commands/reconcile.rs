// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::api::ApiClient;
use crate::models::{BankTransaction, RecordId};
use crate::reconcile::{best_confidence, Confidence, MatchCandidate, ReconcileError, ReconciliationBoard};
use crate::utils::{fmt_money, maybe_print_json, month_arg, pretty_table, truncate};
use anyhow::{Context, Result};
use serde::Serialize;

pub fn handle(api: &ApiClient, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => list(api, sub)?,
        Some(("match", sub)) => mark(api, sub)?,
        Some(("unmatch", sub)) => unmatch(api, sub)?,
        _ => {}
    }
    Ok(())
}

#[derive(Serialize)]
struct Row<'a> {
    transaction: &'a BankTransaction,
    confidence: Option<Confidence>,
    candidates: Vec<MatchCandidate<'a>>,
}

fn ids(sub: &clap::ArgMatches) -> Vec<RecordId> {
    sub.get_many::<String>("id")
        .into_iter()
        .flatten()
        .map(|s| s.parse().unwrap_or_else(|e| match e {}))
        .collect()
}

fn list(api: &ApiClient, sub: &clap::ArgMatches) -> Result<()> {
    let json_flag = sub.get_flag("json");
    let jsonl_flag = sub.get_flag("jsonl");
    let board = ReconciliationBoard::load(api, month_arg(sub)?)?;

    let mut rows = Vec::with_capacity(board.bank_transactions().len());
    for tx in board.bank_transactions() {
        let candidates = board.matches_for(&tx.id)?;
        rows.push(Row {
            transaction: tx,
            confidence: best_confidence(&candidates),
            candidates,
        });
    }
    if maybe_print_json(json_flag, jsonl_flag, &rows)? {
        return Ok(());
    }

    println!(
        "{}: {} unreconciled bank transactions, {} Splitwise expenses",
        board.period(),
        board.bank_transactions().len(),
        board.splitwise_expenses().len()
    );
    let mut data = Vec::new();
    for r in &rows {
        let tx = r.transaction;
        let best = r
            .candidates
            .first()
            .map(|c| {
                format!(
                    "{} {} ({}d, {})",
                    truncate(&c.expense.description, 24),
                    fmt_money(&c.expense.paid_share()),
                    c.days_diff,
                    c.match_score
                )
            })
            .unwrap_or_else(|| "-".into());
        data.push(vec![
            tx.id.to_string(),
            tx.date.to_string(),
            truncate(&tx.description, 32),
            fmt_money(&tx.amount),
            best,
            r.confidence.map(|c| c.as_str().to_string()).unwrap_or_default(),
            r.candidates.len().to_string(),
        ]);
    }
    println!(
        "{}",
        pretty_table(
            &["ID", "Date", "Description", "Amount", "Best match", "Confidence", "Candidates"],
            data
        )
    );
    Ok(())
}

/// Loads the month first; ids outside it are rejected before any update.
fn load_checked(api: &ApiClient, sub: &clap::ArgMatches, wanted: &[RecordId]) -> Result<ReconciliationBoard> {
    let board = ReconciliationBoard::load(api, month_arg(sub)?)?;
    if let Some(missing) = wanted.iter().find(|id| board.transaction(id).is_none()) {
        return Err(ReconcileError::UnknownTransaction(missing.clone()))
            .with_context(|| format!("use --month to pick the month holding {}", missing));
    }
    Ok(board)
}

fn mark(api: &ApiClient, sub: &clap::ArgMatches) -> Result<()> {
    let wanted = ids(sub);
    let mut board = load_checked(api, sub, &wanted)?;
    match wanted.as_slice() {
        [one] => board.mark_matched(api, one)?,
        many => board.mark_matched_bulk(api, many)?,
    }
    println!(
        "Marked {} transaction(s) as matched; {} left unreconciled in {}",
        wanted.len(),
        board.bank_transactions().len(),
        board.period()
    );
    Ok(())
}

fn unmatch(api: &ApiClient, sub: &clap::ArgMatches) -> Result<()> {
    let wanted = ids(sub);
    // Matched transactions are not part of the unreconciled view.
    let mut board = ReconciliationBoard::load(api, month_arg(sub)?)?;
    for id in &wanted {
        board.clear_status(api, id)?;
    }
    println!("Cleared match status of {}", wanted.len());
    Ok(())
}
