// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use fintrack::api::{ApiError, ReconciliationApi, STATUS_RECONCILED};
use fintrack::models::{BankTransaction, RecordId, SplitwiseExpense, UnreconciledData};
use fintrack::reconcile::{
    best_confidence, find_potential_matches, score_pair, Confidence, ReconciliationBoard,
};
use fintrack::utils::MonthPeriod;
use rust_decimal::Decimal;
use std::cell::{Cell, RefCell};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn bank(id: i64, date: NaiveDate, amount: &str) -> BankTransaction {
    BankTransaction {
        id: RecordId::Num(id),
        date,
        amount: amount.parse().unwrap(),
        description: format!("Card purchase {}", id),
        category: None,
        source: Some("Chequing".into()),
        reconciliation_status: None,
    }
}

fn paid(id: &str, date: NaiveDate, share: &str) -> SplitwiseExpense {
    SplitwiseExpense {
        id: RecordId::Text(id.into()),
        date,
        description: format!("Splitwise {}", id),
        amount: None,
        category: None,
        splitwise_paid_share: Some(share.parse().unwrap()),
        splitwise_owed_share: None,
    }
}

#[test]
fn five_percent_off_same_day_scores_75() {
    let e = paid("a", d(2025, 6, 10), "95.00");
    let c = score_pair(&bank(1, d(2025, 6, 10), "100.00"), &e).unwrap();
    assert_eq!(c.days_diff, 0);
    assert_eq!(c.percent_diff, Decimal::from(5));
    assert_eq!(c.amount_diff, "5.00".parse::<Decimal>().unwrap());
    assert_eq!(c.match_score, 75);
    assert_eq!(Confidence::from_score(c.match_score), Confidence::Medium);
}

#[test]
fn exact_amount_two_days_apart_scores_80() {
    let e = paid("a", d(2025, 6, 12), "50.00");
    let c = score_pair(&bank(1, d(2025, 6, 10), "50.00"), &e).unwrap();
    assert_eq!(c.days_diff, 2);
    assert!(c.percent_diff.is_zero());
    assert_eq!(c.match_score, 80);
    assert_eq!(Confidence::from_score(c.match_score), Confidence::High);
}

#[test]
fn candidates_stay_inside_date_and_amount_windows() {
    let tx = bank(1, d(2025, 6, 15), "100.00");
    let expenses = vec![
        paid("in-window", d(2025, 6, 18), "100.00"),
        paid("four-days", d(2025, 6, 19), "100.00"),
        paid("too-cheap", d(2025, 6, 15), "89.99"),
        paid("edge-ten-pct", d(2025, 6, 15), "110.00"),
        paid("owed-only", d(2025, 6, 15), "0"),
    ];
    let found = find_potential_matches(&tx, &expenses);
    let ids: Vec<String> = found.iter().map(|c| c.expense.id.to_string()).collect();
    // 3 days off at 0% -> 70; same day at exactly 10% -> 50
    assert_eq!(ids, vec!["in-window", "edge-ten-pct"]);
    for c in &found {
        assert!(c.days_diff <= 3);
        assert!(c.percent_diff <= Decimal::TEN);
    }
}

#[test]
fn at_most_three_sorted_by_score() {
    let tx = bank(1, d(2025, 6, 15), "-40.00");
    let expenses = vec![
        paid("b", d(2025, 6, 17), "40.00"),
        paid("a", d(2025, 6, 15), "40.00"),
        paid("d", d(2025, 6, 18), "39.00"),
        paid("c", d(2025, 6, 16), "40.00"),
        paid("e", d(2025, 6, 14), "40.00"),
    ];
    let found = find_potential_matches(&tx, &expenses);
    assert_eq!(found.len(), 3);
    assert!(found.windows(2).all(|w| w[0].match_score >= w[1].match_score));
    assert_eq!(found[0].expense.id, RecordId::Text("a".into()));
    // c and e tie at one day off; input order decides.
    assert_eq!(found[1].expense.id, RecordId::Text("c".into()));
    assert_eq!(found[2].expense.id, RecordId::Text("e".into()));
    assert_eq!(best_confidence(&found), Some(Confidence::High));
    assert_eq!(best_confidence(&[]), None);
}

/// In-memory backend that records every status update.
struct FakeBackend {
    data: RefCell<UnreconciledData>,
    fetches: RefCell<Vec<(NaiveDate, NaiveDate)>>,
    updates: RefCell<Vec<(Vec<RecordId>, Option<String>)>>,
    fail_updates: Cell<bool>,
}

impl FakeBackend {
    fn new(data: UnreconciledData) -> Self {
        Self {
            data: RefCell::new(data),
            fetches: RefCell::new(Vec::new()),
            updates: RefCell::new(Vec::new()),
            fail_updates: Cell::new(false),
        }
    }

    fn apply(&self, ids: &[RecordId], status: Option<&str>) -> Result<(), ApiError> {
        if self.fail_updates.get() {
            return Err(ApiError::Server {
                status: Some(500),
                message: Some("Database unavailable".into()),
            });
        }
        self.updates
            .borrow_mut()
            .push((ids.to_vec(), status.map(str::to_string)));
        if status.is_some() {
            self.data
                .borrow_mut()
                .bank_transactions
                .retain(|t| !ids.contains(&t.id));
        }
        Ok(())
    }
}

impl ReconciliationApi for FakeBackend {
    fn unreconciled(&self, from: NaiveDate, to: NaiveDate) -> Result<UnreconciledData, ApiError> {
        self.fetches.borrow_mut().push((from, to));
        let all = self.data.borrow();
        Ok(UnreconciledData {
            bank_transactions: all
                .bank_transactions
                .iter()
                .filter(|t| t.date >= from && t.date <= to)
                .cloned()
                .collect(),
            splitwise_expenses: all
                .splitwise_expenses
                .iter()
                .filter(|e| e.date >= from && e.date <= to)
                .cloned()
                .collect(),
        })
    }

    fn update_status(&self, id: &RecordId, status: Option<&str>) -> Result<(), ApiError> {
        self.apply(std::slice::from_ref(id), status)
    }

    fn bulk_update_status(&self, ids: &[RecordId], status: Option<&str>) -> Result<(), ApiError> {
        self.apply(ids, status)
    }
}

fn june_backend() -> FakeBackend {
    FakeBackend::new(UnreconciledData {
        bank_transactions: vec![
            bank(1, d(2025, 6, 3), "-62.40"),
            bank(2, d(2025, 6, 20), "-18.00"),
            bank(3, d(2025, 5, 30), "-9.99"),
        ],
        splitwise_expenses: vec![
            paid("sw-1", d(2025, 6, 2), "62.40"),
            paid("sw-2", d(2025, 6, 21), "17.50"),
        ],
    })
}

#[test]
fn board_loads_one_month_and_navigates() {
    let api = june_backend();
    let mut board = ReconciliationBoard::load(&api, MonthPeriod::new(2025, 6).unwrap()).unwrap();
    assert_eq!(board.bank_transactions().len(), 2);
    assert_eq!(api.fetches.borrow()[0], (d(2025, 6, 1), d(2025, 6, 30)));

    let m = board.matches_for(&RecordId::Num(1)).unwrap();
    assert_eq!(m.len(), 1);
    assert_eq!(m[0].expense.id, RecordId::Text("sw-1".into()));
    assert!(board.matches_for(&RecordId::Num(99)).is_err());

    board.previous_month(&api).unwrap();
    assert_eq!(board.period().to_string(), "2025-05");
    assert_eq!(board.bank_transactions().len(), 1);
    board.next_month(&api).unwrap();
    assert_eq!(board.period().to_string(), "2025-06");
}

#[test]
fn marking_matched_refetches_from_backend() {
    let api = june_backend();
    let mut board = ReconciliationBoard::load(&api, MonthPeriod::new(2025, 6).unwrap()).unwrap();
    board.mark_matched(&api, &RecordId::Num(1)).unwrap();

    let updates = api.updates.borrow();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].1.as_deref(), Some(STATUS_RECONCILED));
    assert_eq!(api.fetches.borrow().len(), 2);
    assert!(board.transaction(&RecordId::Num(1)).is_none());
}

#[test]
fn failed_update_leaves_board_untouched() {
    let api = june_backend();
    let mut board = ReconciliationBoard::load(&api, MonthPeriod::new(2025, 6).unwrap()).unwrap();
    api.fail_updates.set(true);
    let err = board.mark_matched(&api, &RecordId::Num(2)).unwrap_err();
    assert!(err.to_string().contains("Database unavailable"));
    assert!(board.transaction(&RecordId::Num(2)).is_some());
    assert_eq!(api.fetches.borrow().len(), 1);
}

#[test]
fn bulk_and_clear_send_expected_statuses() {
    let api = june_backend();
    let mut board = ReconciliationBoard::load(&api, MonthPeriod::new(2025, 6).unwrap()).unwrap();
    board
        .mark_matched_bulk(&api, &[RecordId::Num(1), RecordId::Num(2)])
        .unwrap();
    assert!(board.bank_transactions().is_empty());
    board.clear_status(&api, &RecordId::Num(1)).unwrap();

    let updates = api.updates.borrow();
    assert_eq!(updates[0].0.len(), 2);
    assert_eq!(updates[1], (vec![RecordId::Num(1)], None));
    board.mark_matched_bulk(&api, &[]).unwrap();
    assert_eq!(updates.len(), 2);
}

#[test]
fn numeric_ids_match_string_ids_and_keep_backend_form() {
    let mut tx = bank(0, d(2025, 6, 9), "-25.00");
    tx.id = RecordId::Text("42".into());
    let api = FakeBackend::new(UnreconciledData {
        bank_transactions: vec![tx],
        splitwise_expenses: vec![],
    });
    let mut board = ReconciliationBoard::load(&api, MonthPeriod::new(2025, 6).unwrap()).unwrap();
    let cli_id: RecordId = "42".parse().unwrap();
    assert!(matches!(cli_id, RecordId::Num(42)));
    assert!(board.transaction(&cli_id).is_some());

    board.mark_matched(&api, &cli_id).unwrap();
    let updates = api.updates.borrow();
    assert!(matches!(&updates[0].0[..], [RecordId::Text(s)] if s == "42"));
    assert!(board.bank_transactions().is_empty());
}

#[test]
fn record_ids_hash_by_printed_form() {
    use std::collections::HashSet;
    let set: HashSet<RecordId> = [RecordId::Num(7), RecordId::Text("7".into())].into();
    assert_eq!(set.len(), 1);
    assert_ne!(RecordId::Num(7), RecordId::Text("007".into()));
}
