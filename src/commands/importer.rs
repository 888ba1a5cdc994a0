// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::analytics::calculate_totals;
use crate::api::{ApiClient, ImportApi};
use crate::models::{LogicalField, RecordId};
use crate::utils::{fmt_money, pretty_table, truncate, MonthPeriod};
use crate::wizard::{ImportWizard, PreviewState, WizardError};
use anyhow::{anyhow, Context, Result};
use std::cell::Cell;
use std::io::{BufRead, Write};
use std::path::Path;
use std::time::Duration;

pub fn handle(api: &ApiClient, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("csv", sub)) => import_csv(api, sub)?,
        Some(("rollback", sub)) => rollback(api, sub)?,
        _ => {}
    }
    Ok(())
}

/// Splits `FIELD=COLUMN`; an empty column clears the field.
pub fn parse_override(s: &str) -> Result<(LogicalField, Option<&str>)> {
    let (field, column) = s
        .split_once('=')
        .with_context(|| format!("Invalid mapping '{}', expected FIELD=COLUMN", s))?;
    let field: LogicalField = field.parse().map_err(|e: String| anyhow!(e))?;
    let column = column.trim();
    Ok((field, (!column.is_empty()).then_some(column)))
}

/// Applies `--map` and `--source` to a wizard sitting on the mapping step.
pub fn apply_mapping_args(wizard: &mut ImportWizard, sub: &clap::ArgMatches) -> Result<()> {
    for raw in sub.get_many::<String>("map").into_iter().flatten() {
        let (field, column) = parse_override(raw)?;
        let index = match (column, wizard.session()) {
            (Some(c), Some(session)) => Some(session.resolve_column(c)?),
            _ => None,
        };
        wizard.set_column(field, index)?;
    }
    if let Some(source) = sub.get_one::<String>("source") {
        wizard.set_source(source)?;
    }
    Ok(())
}

/// Applies `--include-duplicates` and `--rows` to a loaded preview.
pub fn apply_preview_args(wizard: &mut ImportWizard, sub: &clap::ArgMatches) -> Result<()> {
    let preview = wizard.preview_mut()?;
    if sub.get_flag("include-duplicates") {
        preview.set_skip_duplicates(false);
    }
    if let Some(rows) = sub.get_many::<usize>("rows") {
        preview.set_selection_mode(true);
        preview.set_selection(rows.copied())?;
    }
    Ok(())
}

fn print_mapping(wizard: &ImportWizard) {
    let Some(session) = wizard.session() else {
        return;
    };
    println!(
        "Uploaded {} rows, {} columns: {}",
        session.total_rows,
        session.headers.len(),
        session.headers.join(", ")
    );
    let rows = LogicalField::ALL
        .into_iter()
        .map(|f| {
            let column = session
                .column_mapping
                .get(f)
                .and_then(|i| session.headers.get(i).map(|h| format!("{} ({})", h, i)))
                .unwrap_or_else(|| "-".into());
            let label = if f.is_required() {
                format!("{} *", f.label())
            } else {
                f.label().to_string()
            };
            vec![label, column, wizard.sample_value(f)]
        })
        .collect();
    println!("{}", pretty_table(&["Field", "Column", "Sample"], rows));
}

fn print_preview(preview: &PreviewState, page_size: usize) {
    let stats = preview.statistics();
    println!(
        "{} rows: {} income, {} expense, {} potential duplicates",
        stats.total_rows, stats.income_rows, stats.expense_rows, stats.potential_duplicates
    );
    let rows = preview
        .page(1, page_size.max(1))
        .iter()
        .map(|r| {
            vec![
                r.original_index.to_string(),
                r.date.to_string(),
                r.kind.to_string(),
                r.category.clone().unwrap_or_default(),
                truncate(&r.description, 40),
                fmt_money(&r.amount),
                if r.is_duplicate { "dup".into() } else { String::new() },
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["#", "Date", "Type", "Category", "Description", "Amount", ""],
            rows
        )
    );
    if preview.rows().len() > page_size {
        println!("... {} more rows", preview.rows().len() - page_size);
    }
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}

/// Re-reads the current month after the backend has had `delay` to settle.
fn refresh_summary(api: &ApiClient, delay: Duration) {
    std::thread::sleep(delay);
    let month = MonthPeriod::current();
    match api.expenses_between(month.first_day(), month.last_day()) {
        Ok(items) => {
            let t = calculate_totals(&items);
            println!(
                "{}: income {}, expenses {}, investments {}",
                month,
                fmt_money(&t.total_income),
                fmt_money(&t.total_expense),
                fmt_money(&t.total_investment)
            );
        }
        Err(e) => tracing::warn!(error = %e, "dashboard refresh failed"),
    }
}

/// Runs a refresh the wizard requested, once the result has been printed.
pub fn run_pending_refresh(api: &ApiClient, pending: &Cell<Option<Duration>>) {
    if let Some(delay) = pending.take() {
        refresh_summary(api, delay);
    }
}

/// Undo hint for the finished import, only when rollback is allowed.
pub fn undo_hint(wizard: &ImportWizard) -> Option<String> {
    if !wizard.can_rollback() {
        return None;
    }
    let id = wizard.result()?.import_id.as_ref()?;
    Some(format!(
        "Import id: {} (undo with `fintrack import rollback {}`)",
        id, id
    ))
}

fn import_csv(api: &ApiClient, sub: &clap::ArgMatches) -> Result<()> {
    let path = sub.get_one::<String>("path").context("path is required")?;
    let page_size = sub.get_one::<usize>("page-size").copied().unwrap_or(10);
    let dry_run = sub.get_flag("dry-run");
    let assume_yes = sub.get_flag("yes");
    let pending = Cell::new(None);
    let mut refresh = |delay: Duration| pending.set(Some(delay));

    let mut wizard = ImportWizard::new();
    wizard.upload(api, Path::new(path))?;
    apply_mapping_args(&mut wizard, sub)?;
    print_mapping(&wizard);
    wizard.confirm_mapping()?;

    let preview = wizard.load_preview(api)?;
    print_preview(preview, page_size);
    apply_preview_args(&mut wizard, sub)?;
    let action = wizard.preview_mut()?.import_action();
    println!("{}", action.label);

    if dry_run {
        wizard.close();
        return Ok(());
    }
    match wizard.confirm_preview().map(|_| ()) {
        Ok(()) => {}
        Err(WizardError::NothingToImport) => {
            println!("Nothing to import.");
            wizard.close();
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    }

    let result = match wizard.start_import(api, &mut refresh) {
        Ok(Some(r)) => r,
        Ok(None) => return Ok(()),
        Err(e) => {
            eprintln!("{}", e);
            if assume_yes || !confirm("Retry the import?")? {
                wizard.close();
                return Err(e.into());
            }
            wizard.retry_import(api, &mut refresh)?
        }
    };
    println!(
        "Imported {} rows, skipped {} duplicates",
        result.imported, result.duplicates_skipped
    );
    if let Some(hint) = undo_hint(&wizard) {
        println!("{}", hint);
    }
    run_pending_refresh(api, &pending);

    if wizard.can_rollback() && !assume_yes && confirm("Undo this import?")? {
        wizard.rollback(api, &mut refresh)?;
        println!("Import rolled back.");
        run_pending_refresh(api, &pending);
    }
    wizard.close();
    Ok(())
}

fn rollback(api: &ApiClient, sub: &clap::ArgMatches) -> Result<()> {
    let raw = sub
        .get_one::<String>("import-id")
        .context("import id is required")?;
    let id: RecordId = raw.parse().unwrap_or_else(|e| match e {});
    api.rollback_import(&id)
        .map_err(|e| anyhow!(e.user_message("Failed to rollback import")))?;
    println!("Rolled back import {}", id);
    Ok(())
}
