// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use fintrack::api::ApiClient;
use fintrack::commands::budgets::parse_category_budget;
use fintrack::commands::importer::{self, apply_mapping_args, parse_override};
use fintrack::commands::{expenses, reconcile, splitwise};
use fintrack::config::Config;
use fintrack::db;
use fintrack::models::LogicalField;
use fintrack::wizard::ImportWizard;
use fintrack::cli;
use httpmock::prelude::*;
use serde_json::json;
use tempfile::tempdir;

fn sub<'a>(m: &'a clap::ArgMatches, name: &str) -> &'a clap::ArgMatches {
    match m.subcommand() {
        Some((n, s)) if n == name => s,
        _ => panic!("no {} subcommand", name),
    }
}

#[test]
fn global_api_url_is_seen_after_subcommand() {
    let m = cli::build_cli().get_matches_from([
        "fintrack",
        "recon",
        "list",
        "--api-url",
        "http://10.0.0.5:3001",
    ]);
    assert_eq!(
        m.get_one::<String>("api-url").map(String::as_str),
        Some("http://10.0.0.5:3001")
    );
}

#[test]
fn import_flags_parse() {
    let m = cli::build_cli().get_matches_from([
        "fintrack",
        "import",
        "csv",
        "bank.csv",
        "--map",
        "type=Kind",
        "--map",
        "category=",
        "--rows",
        "0,3,4",
        "--dry-run",
    ]);
    let csv = sub(sub(&m, "import"), "csv");
    let maps: Vec<&String> = csv.get_many::<String>("map").unwrap().collect();
    assert_eq!(maps, vec!["type=Kind", "category="]);
    let rows: Vec<usize> = csv.get_many::<usize>("rows").unwrap().copied().collect();
    assert_eq!(rows, vec![0, 3, 4]);
    assert!(csv.get_flag("dry-run"));
    assert!(!csv.get_flag("yes"));
}

#[test]
fn mapping_overrides_and_category_budgets_parse() {
    assert_eq!(parse_override("Type=Kind").unwrap(), (LogicalField::Type, Some("Kind")));
    assert_eq!(parse_override("tags= ").unwrap(), (LogicalField::Tags, None));
    assert!(parse_override("memo=2").is_err());
    assert!(parse_override("date").is_err());

    let b = parse_category_budget(" Dining = 250.00").unwrap();
    assert_eq!(b.category, "Dining");
    assert_eq!(b.amount, "250".parse::<rust_decimal::Decimal>().unwrap());
    assert!(parse_category_budget("Dining=-5").is_err());
    assert!(parse_category_budget("=5").is_err());
}

fn mock_upload(server: &MockServer) {
    server.mock(|when, then| {
        when.method(POST).path("/api/v1/csv/upload");
        then.status(200).json_body(json!({
            "error_status": false,
            "data": {
                "sessionId": "s1",
                "headers": ["Posted", "Details", "Debit", "Kind"],
                "preview": [["2025-06-01", "Bakery", "7.25", "Expense"]],
                "totalRows": 3,
                "suggestedMapping": {"date": 0, "description": 1, "amount": null}
            }
        }));
    });
}

#[test]
fn map_flags_resolve_header_names() {
    let server = MockServer::start();
    mock_upload(&server);
    let api = ApiClient::new(&server.base_url()).unwrap();
    let dir = tempdir().unwrap();
    let path = dir.path().join("card.csv");
    std::fs::write(&path, "Posted,Details,Debit,Kind\n2025-06-01,Bakery,7.25,Expense\n").unwrap();
    let path_str = path.to_string_lossy().to_string();

    let m = cli::build_cli().get_matches_from([
        "fintrack", "import", "csv", &path_str, "--map", "amount=debit", "--map", "type=3",
        "--source", "Visa",
    ]);
    let csv = sub(sub(&m, "import"), "csv");
    let mut w = ImportWizard::new();
    w.upload(&api, &path).unwrap();
    assert!(!w.can_advance());
    apply_mapping_args(&mut w, csv).unwrap();
    let mapping = &w.session().unwrap().column_mapping;
    assert_eq!(mapping.amount, Some(2));
    assert_eq!(mapping.kind, Some(3));
    assert!(w.can_advance());
    w.confirm_mapping().unwrap();
    assert_eq!(w.session().unwrap().source, "Visa");
}

#[test]
fn import_dry_run_never_commits() {
    let server = MockServer::start();
    mock_upload(&server);
    let preview = server.mock(|when, then| {
        when.method(POST).path("/api/v1/csv/preview");
        then.status(200).json_body(json!({
            "error_status": false,
            "data": {
                "preview": [
                    {"date": "2025-06-01", "amount": -7.25, "description": "Bakery", "type": "Expense", "isDuplicate": false}
                ],
                "statistics": {"totalRows": 1, "potentialDuplicates": 0, "incomeRows": 0, "expenseRows": 1}
            }
        }));
    });
    let commit = server.mock(|when, then| {
        when.method(POST).path("/api/v1/csv/import");
        then.status(200).json_body(json!({"error_status": false, "data": {"imported": 1}}));
    });

    let dir = tempdir().unwrap();
    let path = dir.path().join("card.csv");
    std::fs::write(&path, "Posted,Details,Debit\n2025-06-01,Bakery,7.25\n").unwrap();
    let path_str = path.to_string_lossy().to_string();
    let m = cli::build_cli().get_matches_from([
        "fintrack", "import", "csv", &path_str, "--map", "amount=Debit", "--dry-run",
    ]);

    let api = ApiClient::new(&server.base_url()).unwrap();
    importer::handle(&api, sub(&m, "import")).unwrap();
    preview.assert();
    assert_eq!(commit.hits(), 0);
}

#[test]
fn import_with_unmapped_amount_fails_before_preview() {
    let server = MockServer::start();
    mock_upload(&server);
    let preview = server.mock(|when, then| {
        when.method(POST).path("/api/v1/csv/preview");
        then.status(200).json_body(json!({"error_status": false, "data": {}}));
    });

    let dir = tempdir().unwrap();
    let path = dir.path().join("card.csv");
    std::fs::write(&path, "Posted,Details,Debit\n").unwrap();
    let path_str = path.to_string_lossy().to_string();
    let m = cli::build_cli().get_matches_from(["fintrack", "import", "csv", &path_str, "--yes"]);

    let api = ApiClient::new(&server.base_url()).unwrap();
    let err = importer::handle(&api, sub(&m, "import")).unwrap_err();
    assert!(err.to_string().contains("amount"));
    assert_eq!(preview.hits(), 0);
}

#[test]
fn export_month_to_csv() {
    let server = MockServer::start();
    let list = server.mock(|when, then| {
        when.method(GET)
            .path("/api/v1/expense")
            .query_param("startDate", "2025-01-01")
            .query_param("endDate", "2025-01-31");
        then.status(200).json_body(json!({
            "error_status": false,
            "data": [
                {"_id": "e2", "date": "2025-01-09T00:00:00Z", "amount": 3200, "description": "Salary",
                 "type": "Income", "category": "Salary", "source": "Chequing"},
                {"_id": "e1", "date": "2025-01-02", "amount": "12.345", "description": "Corner Shop, weekly run",
                 "type": "Expense", "category": "Groceries", "source": "Visa"}
            ]
        }));
    });

    let dir = tempdir().unwrap();
    let out = dir.path().join("jan.csv");
    let out_str = out.to_string_lossy().to_string();
    let m = cli::build_cli().get_matches_from([
        "fintrack", "expense", "export", "--month", "2025-01", "--out", &out_str,
    ]);

    let api = ApiClient::new(&server.base_url()).unwrap();
    expenses::handle(&api, sub(&m, "expense")).unwrap();
    list.assert();

    let contents = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines[0], "date,type,category,description,amount,source");
    assert_eq!(lines[1], "2025-01-02,Expense,Groceries,\"Corner Shop, weekly run\",12.34,Visa");
    assert_eq!(lines[2], "2025-01-09,Income,Salary,Salary,3200,Chequing");
}

#[test]
fn recon_match_rejects_ids_outside_the_month() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/v1/reconciliation/unreconciled");
        then.status(200).json_body(json!({
            "error_status": false,
            "data": {
                "bankTransactions": [{"id": 1, "date": "2025-06-03", "amount": -20}],
                "splitwiseExpenses": []
            }
        }));
    });
    let update = server.mock(|when, then| {
        when.method(PUT).path("/api/v1/reconciliation/status");
        then.status(200).json_body(json!({"error_status": false, "data": {}}));
    });

    let m = cli::build_cli().get_matches_from([
        "fintrack", "recon", "match", "42", "--month", "2025-06",
    ]);
    let api = ApiClient::new(&server.base_url()).unwrap();
    assert!(reconcile::handle(&api, sub(&m, "recon")).is_err());
    assert_eq!(update.hits(), 0);

    let m = cli::build_cli().get_matches_from([
        "fintrack", "recon", "match", "1", "--month", "2025-06",
    ]);
    reconcile::handle(&api, sub(&m, "recon")).unwrap();
    update.assert();
}

#[test]
fn recon_match_accepts_string_numeric_ids() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/v1/reconciliation/unreconciled");
        then.status(200).json_body(json!({
            "error_status": false,
            "data": {
                "bankTransactions": [{"id": "42", "date": "2025-06-11", "amount": "-31.50"}],
                "splitwiseExpenses": []
            }
        }));
    });
    let update = server.mock(|when, then| {
        when.method(PUT)
            .path("/api/v1/reconciliation/status")
            .json_body(json!({"transactionId": "42", "status": "reconciled_with_splitwise"}));
        then.status(200).json_body(json!({"error_status": false, "data": {}}));
    });

    let m = cli::build_cli().get_matches_from([
        "fintrack", "recon", "match", "42", "--month", "2025-06",
    ]);
    let api = ApiClient::new(&server.base_url()).unwrap();
    reconcile::handle(&api, sub(&m, "recon")).unwrap();
    update.assert();
}

#[test]
fn expense_update_finds_string_numeric_id() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/v1/expense");
        then.status(200).json_body(json!({
            "error_status": false,
            "data": [{"id": "42", "date": "2025-06-02", "amount": 18, "description": "Taxi",
                      "type": "Expense", "category": "Transport"}]
        }));
    });
    let put = server.mock(|when, then| {
        when.method(PUT).path("/api/v1/expense/42");
        then.status(200).json_body(json!({
            "error_status": false,
            "data": {"id": "42", "date": "2025-06-02", "amount": 21, "description": "Taxi",
                     "type": "Expense", "category": "Transport"}
        }));
    });

    let m = cli::build_cli().get_matches_from([
        "fintrack", "expense", "update", "42", "--amount", "21",
    ]);
    let api = ApiClient::new(&server.base_url()).unwrap();
    expenses::handle(&api, sub(&m, "expense")).unwrap();
    put.assert();
}

fn mock_one_row_preview(server: &MockServer) {
    server.mock(|when, then| {
        when.method(POST).path("/api/v1/csv/preview");
        then.status(200).json_body(json!({
            "error_status": false,
            "data": {
                "preview": [
                    {"date": "2025-06-01", "amount": -7.25, "description": "Bakery", "type": "Expense", "isDuplicate": false}
                ],
                "statistics": {"totalRows": 1, "potentialDuplicates": 0, "incomeRows": 0, "expenseRows": 1}
            }
        }));
    });
}

fn committed_wizard(server: &MockServer, path: &std::path::Path) -> ImportWizard {
    let api = ApiClient::new(&server.base_url()).unwrap();
    let mut w = ImportWizard::new();
    w.upload(&api, path).unwrap();
    w.set_column(LogicalField::Amount, Some(2)).unwrap();
    w.confirm_mapping().unwrap();
    w.load_preview(&api).unwrap();
    w.confirm_preview().unwrap();
    let mut refresh = |_: std::time::Duration| {};
    w.start_import(&api, &mut refresh).unwrap();
    w
}

#[test]
fn zero_row_import_offers_no_undo() {
    let server = MockServer::start();
    mock_upload(&server);
    mock_one_row_preview(&server);
    server.mock(|when, then| {
        when.method(POST).path("/api/v1/csv/import");
        then.status(200).json_body(json!({
            "error_status": false,
            "data": {"imported": 0, "duplicatesSkipped": 1, "importId": "imp-9"}
        }));
    });
    let rollback = server.mock(|when, then| {
        when.method(DELETE).path("/api/v1/csv/import/imp-9");
        then.status(200).json_body(json!({"error_status": false}));
    });

    let dir = tempdir().unwrap();
    let path = dir.path().join("card.csv");
    std::fs::write(&path, "Posted,Details,Debit\n2025-06-01,Bakery,7.25\n").unwrap();

    let w = committed_wizard(&server, &path);
    assert_eq!(w.result().map(|r| r.imported), Some(0));
    assert_eq!(importer::undo_hint(&w), None);

    let path_str = path.to_string_lossy().to_string();
    let m = cli::build_cli().get_matches_from([
        "fintrack", "import", "csv", &path_str, "--map", "amount=Debit", "--yes",
    ]);
    let api = ApiClient::new(&server.base_url()).unwrap();
    importer::handle(&api, sub(&m, "import")).unwrap();
    assert_eq!(rollback.hits(), 0);
}

#[test]
fn undo_hint_names_the_import_when_rows_landed() {
    let server = MockServer::start();
    mock_upload(&server);
    mock_one_row_preview(&server);
    server.mock(|when, then| {
        when.method(POST).path("/api/v1/csv/import");
        then.status(200).json_body(json!({
            "error_status": false,
            "data": {"imported": 1, "duplicatesSkipped": 0, "importId": "imp-10"}
        }));
    });

    let dir = tempdir().unwrap();
    let path = dir.path().join("card.csv");
    std::fs::write(&path, "Posted,Details,Debit\n2025-06-01,Bakery,7.25\n").unwrap();

    let w = committed_wizard(&server, &path);
    assert_eq!(
        importer::undo_hint(&w).as_deref(),
        Some("Import id: imp-10 (undo with `fintrack import rollback imp-10`)")
    );
}

#[test]
fn deferred_refresh_runs_once_after_reporting() {
    let server = MockServer::start();
    let totals = server.mock(|when, then| {
        when.method(GET).path("/api/v1/expense");
        then.status(200).json_body(json!({"error_status": false, "data": []}));
    });
    let api = ApiClient::new(&server.base_url()).unwrap();

    let pending = std::cell::Cell::new(None);
    importer::run_pending_refresh(&api, &pending);
    assert_eq!(totals.hits(), 0);

    pending.set(Some(std::time::Duration::ZERO));
    importer::run_pending_refresh(&api, &pending);
    importer::run_pending_refresh(&api, &pending);
    assert_eq!(totals.hits(), 1);
    assert!(pending.get().is_none());
}

#[test]
fn splitwise_list_uses_stored_user_and_range_flags() {
    let server = MockServer::start();
    let listing = server.mock(|when, then| {
        when.method(GET)
            .path("/api/v1/splitwise")
            .query_param("from", "2025-05-10")
            .query_param("to", "2025-05-20")
            .query_param("user", "Sam");
        then.status(200).json_body(json!({
            "error_status": false,
            "data": [
                {"id": 1, "date": "2025-05-11", "description": "Cab", "cost": 24,
                 "category": {"name": "Transport"},
                 "users": [{"user_id": "88", "owed_share": "12.00"}]},
                {"id": 2, "date": "2025-05-18", "description": "Brunch", "cost": "45.50",
                 "users": []}
            ]
        }));
    });

    let dir = tempdir().unwrap();
    let conn = db::open_at(&dir.path().join("s.sqlite")).unwrap();
    fintrack::config::save_splitwise_user(&conn, "Sam", Some("88")).unwrap();
    let cfg = Config::load(&conn, Some(&server.base_url())).unwrap();

    let m = cli::build_cli().get_matches_from([
        "fintrack", "splitwise", "list", "--from", "2025-05-10", "--to", "2025-05-20",
    ]);
    let api = ApiClient::new(&cfg.api_url).unwrap();
    let list_args = sub(sub(&m, "splitwise"), "list");
    let entries = splitwise::fetch(&api, &cfg, list_args).unwrap();
    listing.assert();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].description, "Brunch");
    assert_eq!(entries[0].category, "Other");
    assert_eq!(entries[0].owed_share, None);
    assert_eq!(entries[1].owed_share, "12".parse::<rust_decimal::Decimal>().ok());
    assert_eq!(entries[1].source, "Splitwise API");

    splitwise::handle(&api, &cfg, sub(&m, "splitwise")).unwrap();
}

#[test]
fn splitwise_list_without_user_fails_before_request() {
    let server = MockServer::start();
    let listing = server.mock(|when, then| {
        when.method(GET).path("/api/v1/splitwise");
        then.status(200).json_body(json!({"error_status": false, "data": []}));
    });
    let dir = tempdir().unwrap();
    let conn = db::open_at(&dir.path().join("s.sqlite")).unwrap();
    let cfg = Config::load(&conn, Some(&server.base_url())).unwrap();

    let m = cli::build_cli().get_matches_from(["fintrack", "splitwise", "list", "--month", "2025-05"]);
    let api = ApiClient::new(&cfg.api_url).unwrap();
    let err = splitwise::handle(&api, &cfg, sub(&m, "splitwise")).unwrap_err();
    assert!(err.to_string().contains("Splitwise user"));
    assert_eq!(listing.hits(), 0);
}
