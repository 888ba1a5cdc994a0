// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Matching bank transactions against Splitwise expenses the user paid for.

use crate::api::{ApiError, ReconciliationApi, STATUS_RECONCILED};
use crate::models::{BankTransaction, RecordId, SplitwiseExpense, UnreconciledData};
use crate::utils::MonthPeriod;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use thiserror::Error;

pub const MAX_DAYS_DIFF: i64 = 3;
pub const MAX_PERCENT_DIFF: Decimal = Decimal::TEN;
pub const MAX_CANDIDATES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate<'a> {
    pub expense: &'a SplitwiseExpense,
    pub match_score: u32,
    pub days_diff: i64,
    pub amount_diff: Decimal,
    pub percent_diff: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn from_score(score: u32) -> Confidence {
        match score {
            80.. => Confidence::High,
            60..=79 => Confidence::Medium,
            _ => Confidence::Low,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

/// Scores one pair, or `None` when it falls outside the date or amount window.
pub fn score_pair<'a>(
    bank: &BankTransaction,
    expense: &'a SplitwiseExpense,
) -> Option<MatchCandidate<'a>> {
    let paid = expense.paid_share();
    if paid <= Decimal::ZERO {
        return None;
    }
    let days_diff = (bank.date - expense.date).num_days().abs();
    if days_diff > MAX_DAYS_DIFF {
        return None;
    }
    let bank_amount = bank.amount.abs();
    if bank_amount.is_zero() {
        return None;
    }
    let amount_diff = (bank_amount - paid).abs();
    let percent_diff = amount_diff
        .checked_div(bank_amount)?
        .checked_mul(Decimal::ONE_HUNDRED)?;
    if percent_diff > MAX_PERCENT_DIFF {
        return None;
    }

    let date_score =
        (Decimal::ONE_HUNDRED - Decimal::from(days_diff * 20)).max(Decimal::ZERO);
    let amount_score = (Decimal::ONE_HUNDRED - percent_diff * Decimal::TEN).max(Decimal::ZERO);
    let match_score = ((date_score + amount_score) / Decimal::TWO)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_u32()
        .unwrap_or(0);

    Some(MatchCandidate {
        expense,
        match_score,
        days_diff,
        amount_diff: amount_diff.round_dp(2),
        percent_diff,
    })
}

/// Up to three best candidates, highest score first. Ties keep input order.
pub fn find_potential_matches<'a>(
    bank: &BankTransaction,
    expenses: &'a [SplitwiseExpense],
) -> Vec<MatchCandidate<'a>> {
    let mut matches: Vec<MatchCandidate<'a>> =
        expenses.iter().filter_map(|e| score_pair(bank, e)).collect();
    matches.sort_by(|a, b| b.match_score.cmp(&a.match_score));
    matches.truncate(MAX_CANDIDATES);
    matches
}

pub fn best_confidence(candidates: &[MatchCandidate<'_>]) -> Option<Confidence> {
    candidates
        .first()
        .map(|c| Confidence::from_score(c.match_score))
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("transaction {0} is not in the current view")]
    UnknownTransaction(RecordId),
    #[error("failed to update transaction: {0}")]
    Update(#[source] ApiError),
    #[error("failed to load transactions: {0}")]
    Load(#[source] ApiError),
}

/// Unreconciled data for one month.
#[derive(Debug, Clone)]
pub struct ReconciliationBoard {
    period: MonthPeriod,
    data: UnreconciledData,
}

impl ReconciliationBoard {
    pub fn load<A: ReconciliationApi + ?Sized>(
        api: &A,
        period: MonthPeriod,
    ) -> Result<Self, ReconcileError> {
        let mut board = Self {
            period,
            data: UnreconciledData::default(),
        };
        board.refetch(api)?;
        Ok(board)
    }

    pub fn period(&self) -> MonthPeriod {
        self.period
    }

    pub fn bank_transactions(&self) -> &[BankTransaction] {
        &self.data.bank_transactions
    }

    pub fn splitwise_expenses(&self) -> &[SplitwiseExpense] {
        &self.data.splitwise_expenses
    }

    pub fn refetch<A: ReconciliationApi + ?Sized>(&mut self, api: &A) -> Result<(), ReconcileError> {
        self.switch_to(api, self.period)
    }

    /// Loads `period` and only then makes it current.
    fn switch_to<A: ReconciliationApi + ?Sized>(
        &mut self,
        api: &A,
        period: MonthPeriod,
    ) -> Result<(), ReconcileError> {
        let data = api
            .unreconciled(period.first_day(), period.last_day())
            .map_err(ReconcileError::Load)?;
        tracing::debug!(
            period = %period,
            bank = data.bank_transactions.len(),
            splitwise = data.splitwise_expenses.len(),
            "unreconciled data loaded"
        );
        self.period = period;
        self.data = data;
        Ok(())
    }

    pub fn previous_month<A: ReconciliationApi + ?Sized>(
        &mut self,
        api: &A,
    ) -> Result<(), ReconcileError> {
        self.switch_to(api, self.period.previous())
    }

    pub fn next_month<A: ReconciliationApi + ?Sized>(
        &mut self,
        api: &A,
    ) -> Result<(), ReconcileError> {
        self.switch_to(api, self.period.next())
    }

    pub fn transaction(&self, id: &RecordId) -> Option<&BankTransaction> {
        self.data.bank_transactions.iter().find(|t| &t.id == id)
    }

    /// The id exactly as the backend sent it, when the transaction is loaded.
    fn wire_id(&self, id: &RecordId) -> RecordId {
        self.transaction(id)
            .map(|t| t.id.clone())
            .unwrap_or_else(|| id.clone())
    }

    /// Computed on demand, never cached.
    pub fn matches_for(&self, id: &RecordId) -> Result<Vec<MatchCandidate<'_>>, ReconcileError> {
        let tx = self
            .transaction(id)
            .ok_or_else(|| ReconcileError::UnknownTransaction(id.clone()))?;
        Ok(find_potential_matches(tx, &self.data.splitwise_expenses))
    }

    pub fn mark_matched<A: ReconciliationApi + ?Sized>(
        &mut self,
        api: &A,
        id: &RecordId,
    ) -> Result<(), ReconcileError> {
        self.set_status(api, id, Some(STATUS_RECONCILED))
    }

    pub fn clear_status<A: ReconciliationApi + ?Sized>(
        &mut self,
        api: &A,
        id: &RecordId,
    ) -> Result<(), ReconcileError> {
        self.set_status(api, id, None)
    }

    /// Local data changes only through the refetch after a confirmed update.
    fn set_status<A: ReconciliationApi + ?Sized>(
        &mut self,
        api: &A,
        id: &RecordId,
        status: Option<&str>,
    ) -> Result<(), ReconcileError> {
        let id = self.wire_id(id);
        api.update_status(&id, status)
            .map_err(ReconcileError::Update)?;
        tracing::info!(transaction = %id, status = status.unwrap_or("none"), "status updated");
        self.refetch(api)
    }

    pub fn mark_matched_bulk<A: ReconciliationApi + ?Sized>(
        &mut self,
        api: &A,
        ids: &[RecordId],
    ) -> Result<(), ReconcileError> {
        if ids.is_empty() {
            return Ok(());
        }
        let ids: Vec<RecordId> = ids.iter().map(|id| self.wire_id(id)).collect();
        api.bulk_update_status(&ids, Some(STATUS_RECONCILED))
            .map_err(ReconcileError::Update)?;
        tracing::info!(count = ids.len(), "bulk status updated");
        self.refetch(api)
    }
}
