// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Wire types exchanged with the finance backend.
//!
//! Field names follow the backend's JSON (camelCase for the CSV and budget
//! endpoints, snake_case for reconciliation records).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Record identifier as the backend sends it: numeric or opaque string.
///
/// Equality and hashing go through the printed form, so `42` and `"42"`
/// name the same record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Num(i64),
    Text(String),
}

impl PartialEq for RecordId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RecordId::Num(a), RecordId::Num(b)) => a == b,
            (RecordId::Text(a), RecordId::Text(b)) => a == b,
            (RecordId::Num(n), RecordId::Text(s)) | (RecordId::Text(s), RecordId::Num(n)) => {
                *s == n.to_string()
            }
        }
    }
}

impl Eq for RecordId {}

impl Hash for RecordId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state);
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Num(n) => write!(f, "{}", n),
            RecordId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl FromStr for RecordId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s.parse::<i64>() {
            Ok(n) => RecordId::Num(n),
            Err(_) => RecordId::Text(s.to_string()),
        })
    }
}

/// Dates arrive either as `YYYY-MM-DD` or as a full ISO timestamp.
pub mod iso_date {
    use super::*;

    pub fn parse(raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        let day = raw.get(..10).unwrap_or(raw);
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }

    pub fn serialize<S: Serializer>(d: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&d.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid date '{}'", raw)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransactionType {
    Income,
    Expense,
    Investment,
    Transfer,
    Other(String),
}

impl From<String> for TransactionType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Income" => TransactionType::Income,
            "Expense" => TransactionType::Expense,
            "Investment" => TransactionType::Investment,
            "Transfer" => TransactionType::Transfer,
            _ => TransactionType::Other(s),
        }
    }
}

impl From<TransactionType> for String {
    fn from(t: TransactionType) -> Self {
        t.as_str().to_string()
    }
}

impl TransactionType {
    pub fn as_str(&self) -> &str {
        match self {
            TransactionType::Income => "Income",
            TransactionType::Expense => "Expense",
            TransactionType::Investment => "Investment",
            TransactionType::Transfer => "Transfer",
            TransactionType::Other(s) => s.as_str(),
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    /// Case-insensitive, restricted to the four known kinds.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            "investment" => Ok(TransactionType::Investment),
            "transfer" => Ok(TransactionType::Transfer),
            other => Err(format!(
                "Unknown type '{}', expected Income|Expense|Investment|Transfer",
                other
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// CSV import
// ---------------------------------------------------------------------------

/// Logical fields a CSV column can be mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogicalField {
    Date,
    Amount,
    Description,
    Type,
    Category,
    Tags,
}

impl LogicalField {
    pub const ALL: [LogicalField; 6] = [
        LogicalField::Date,
        LogicalField::Amount,
        LogicalField::Description,
        LogicalField::Type,
        LogicalField::Category,
        LogicalField::Tags,
    ];

    pub fn is_required(self) -> bool {
        matches!(
            self,
            LogicalField::Date | LogicalField::Amount | LogicalField::Description
        )
    }

    pub fn key(self) -> &'static str {
        match self {
            LogicalField::Date => "date",
            LogicalField::Amount => "amount",
            LogicalField::Description => "description",
            LogicalField::Type => "type",
            LogicalField::Category => "category",
            LogicalField::Tags => "tags",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            LogicalField::Date => "Transaction Date",
            LogicalField::Amount => "Amount",
            LogicalField::Description => "Description",
            LogicalField::Type => "Transaction Type",
            LogicalField::Category => "Category",
            LogicalField::Tags => "Tags",
        }
    }
}

impl fmt::Display for LogicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for LogicalField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let k = s.trim().to_ascii_lowercase();
        LogicalField::ALL
            .into_iter()
            .find(|f| f.key() == k)
            .ok_or_else(|| {
                format!(
                    "Unknown field '{}', expected one of date|amount|description|type|category|tags",
                    s.trim()
                )
            })
    }
}

/// Logical field -> column index. `None` means unmapped; for optional fields
/// that tells the backend to auto-detect or default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    #[serde(default)]
    pub date: Option<usize>,
    #[serde(default)]
    pub amount: Option<usize>,
    #[serde(default)]
    pub description: Option<usize>,
    #[serde(default, rename = "type")]
    pub kind: Option<usize>,
    #[serde(default)]
    pub category: Option<usize>,
    #[serde(default)]
    pub tags: Option<usize>,
}

impl ColumnMapping {
    pub fn get(&self, field: LogicalField) -> Option<usize> {
        match field {
            LogicalField::Date => self.date,
            LogicalField::Amount => self.amount,
            LogicalField::Description => self.description,
            LogicalField::Type => self.kind,
            LogicalField::Category => self.category,
            LogicalField::Tags => self.tags,
        }
    }

    pub fn set(&mut self, field: LogicalField, column: Option<usize>) {
        let slot = match field {
            LogicalField::Date => &mut self.date,
            LogicalField::Amount => &mut self.amount,
            LogicalField::Description => &mut self.description,
            LogicalField::Type => &mut self.kind,
            LogicalField::Category => &mut self.category,
            LogicalField::Tags => &mut self.tags,
        };
        *slot = column;
    }

    pub fn missing_required(&self) -> Vec<LogicalField> {
        LogicalField::ALL
            .into_iter()
            .filter(|f| f.is_required() && self.get(*f).is_none())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub session_id: String,
    #[serde(default)]
    pub headers: Vec<String>,
    /// Raw sample rows, one cell per header.
    #[serde(default)]
    pub preview: Vec<Vec<String>>,
    #[serde(default)]
    pub total_rows: u64,
    #[serde(default)]
    pub suggested_mapping: ColumnMapping,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub payment_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRow {
    #[serde(with = "iso_date")]
    pub date: NaiveDate,
    pub amount: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_duplicate: bool,
    /// Position in the fetched preview; stable across any paging of the rows.
    #[serde(rename = "_originalIndex", skip_deserializing)]
    pub original_index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewStatistics {
    #[serde(default)]
    pub total_rows: u64,
    #[serde(default)]
    pub potential_duplicates: u64,
    #[serde(default)]
    pub income_rows: u64,
    #[serde(default)]
    pub expense_rows: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreviewResponse {
    #[serde(default)]
    pub preview: Vec<PreviewRow>,
    #[serde(default)]
    pub statistics: PreviewStatistics,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOptions {
    pub skip_duplicates: bool,
    pub overwrite_duplicates: bool,
    pub source: String,
    pub payment_type: String,
    /// `None` applies `skip_duplicates` over every row; a list overrides it.
    pub selected_row_indices: Option<Vec<usize>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub session_id: String,
    pub column_mapping: ColumnMapping,
    pub options: ImportOptions,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    #[serde(default)]
    pub imported: u64,
    #[serde(default)]
    pub duplicates_skipped: u64,
    #[serde(default)]
    pub import_id: Option<RecordId>,
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankTransaction {
    #[serde(alias = "_id")]
    pub id: RecordId,
    #[serde(with = "iso_date")]
    pub date: NaiveDate,
    pub amount: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub reconciliation_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitwiseExpense {
    #[serde(alias = "_id")]
    pub id: RecordId,
    #[serde(with = "iso_date")]
    pub date: NaiveDate,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub splitwise_paid_share: Option<Decimal>,
    #[serde(default)]
    pub splitwise_owed_share: Option<Decimal>,
}

impl SplitwiseExpense {
    pub fn paid_share(&self) -> Decimal {
        self.splitwise_paid_share.unwrap_or(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnreconciledData {
    #[serde(default)]
    pub bank_transactions: Vec<BankTransaction>,
    #[serde(default)]
    pub splitwise_expenses: Vec<SplitwiseExpense>,
}

// ---------------------------------------------------------------------------
// Expenses, budgets, Splitwise sync
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    #[serde(alias = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(with = "iso_date")]
    pub date: NaiveDate,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub amount: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Payload for creating a record; defaults mirror manual entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewExpense {
    #[serde(with = "iso_date")]
    pub date: NaiveDate,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub amount: Decimal,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: String,
    pub source: String,
}

impl NewExpense {
    pub const DEFAULT_CATEGORY: &'static str = "Other";
    pub const DEFAULT_SOURCE: &'static str = "Manual Entry";

    pub fn new(
        date: NaiveDate,
        amount: Decimal,
        description: impl Into<String>,
        kind: TransactionType,
        category: Option<String>,
        source: Option<String>,
    ) -> Self {
        Self {
            date,
            amount,
            description: description.into(),
            kind,
            category: category
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| Self::DEFAULT_CATEGORY.to_string()),
            source: source
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| Self::DEFAULT_SOURCE.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBudget {
    pub category: String,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub amount: Decimal,
}

/// `month` is zero-based on the wire (January = 0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub month: u32,
    pub year: i32,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub overall_budget: Decimal,
    #[serde(default)]
    pub category_budgets: Vec<CategoryBudget>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetLine {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub budgeted: Decimal,
    #[serde(default)]
    pub spent: Decimal,
    #[serde(default)]
    pub remaining: Decimal,
    #[serde(default)]
    pub percentage: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetTracking {
    #[serde(default)]
    pub overall: BudgetLine,
    #[serde(default)]
    pub categories: Vec<BudgetLine>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    #[serde(default)]
    pub records_processed: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    #[serde(default)]
    pub last_synced_at: Option<String>,
    #[serde(default)]
    pub has_never_synced: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Splitwise listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitwiseCategory {
    #[serde(default)]
    pub name: String,
}

/// One participant's share of a Splitwise expense.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitwiseShare {
    pub user_id: RecordId,
    #[serde(default)]
    pub paid_share: Option<Decimal>,
    #[serde(default)]
    pub owed_share: Option<Decimal>,
}

/// An expense as the Splitwise listing returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitwiseListing {
    #[serde(alias = "_id", default)]
    pub id: Option<RecordId>,
    #[serde(with = "iso_date")]
    pub date: NaiveDate,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cost: Decimal,
    #[serde(default)]
    pub category: Option<SplitwiseCategory>,
    #[serde(default)]
    pub users: Vec<SplitwiseShare>,
}

/// Flattened view of a [`SplitwiseListing`] for one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SplitwiseEntry {
    #[serde(with = "iso_date")]
    pub date: NaiveDate,
    pub description: String,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub source: String,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub amount: Decimal,
    #[serde(serialize_with = "rust_decimal::serde::float::serialize")]
    pub paid_amount: Decimal,
    #[serde(serialize_with = "rust_decimal::serde::float_option::serialize")]
    pub owed_share: Option<Decimal>,
}

impl SplitwiseListing {
    pub const SOURCE: &'static str = "Splitwise API";

    /// `owed_share` is the given user's share; `None` when they are not on
    /// the expense or no user id is configured.
    pub fn normalize(&self, user_id: Option<&RecordId>) -> SplitwiseEntry {
        let owed_share = user_id.and_then(|uid| {
            self.users
                .iter()
                .find(|u| &u.user_id == uid)
                .map(|u| u.owed_share.unwrap_or(Decimal::ZERO))
        });
        SplitwiseEntry {
            date: self.date,
            description: self.description.clone(),
            category: self
                .category
                .as_ref()
                .map(|c| c.name.clone())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| NewExpense::DEFAULT_CATEGORY.to_string()),
            kind: TransactionType::Expense,
            source: Self::SOURCE.to_string(),
            amount: self.cost,
            paid_amount: self.cost,
            owed_share,
        }
    }
}
