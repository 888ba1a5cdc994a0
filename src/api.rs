// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Blocking client for the finance backend.
//!
//! Every response is wrapped in `{error_status, data | message}`. A truthy
//! `error_status` is a failure whatever the HTTP status says.

use crate::models::{
    Budget, BudgetTracking, Category, ColumnMapping, Expense, ImportRequest, ImportResult,
    NewExpense, PreviewResponse, RecordId, SplitwiseListing, SyncResult, SyncStatus,
    UnreconciledData, UploadResponse,
};
use chrono::NaiveDate;
use reqwest::blocking::{multipart, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server error: {}", .message.as_deref().unwrap_or("no message"))]
    Server {
        status: Option<u16>,
        message: Option<String>,
    },
    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Backend message verbatim when it sent one, otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Server {
                message: Some(m), ..
            } if !m.trim().is_empty() => m.clone(),
            _ => fallback.to_string(),
        }
    }
}

/// Status value stored on a bank transaction matched to a Splitwise expense.
pub const STATUS_RECONCILED: &str = "reconciled_with_splitwise";

/// Backend calls used by the CSV import wizard.
pub trait ImportApi {
    fn upload_csv(&self, file_name: &str, contents: Vec<u8>) -> Result<UploadResponse, ApiError>;
    fn preview_csv(
        &self,
        session_id: &str,
        mapping: &ColumnMapping,
    ) -> Result<PreviewResponse, ApiError>;
    fn commit_import(&self, request: &ImportRequest) -> Result<ImportResult, ApiError>;
    fn rollback_import(&self, import_id: &RecordId) -> Result<(), ApiError>;
}

/// Backend calls used by the reconciliation board.
pub trait ReconciliationApi {
    fn unreconciled(&self, from: NaiveDate, to: NaiveDate) -> Result<UnreconciledData, ApiError>;
    fn update_status(&self, transaction_id: &RecordId, status: Option<&str>)
    -> Result<(), ApiError>;
    fn bulk_update_status(
        &self,
        transaction_ids: &[RecordId],
        status: Option<&str>,
    ) -> Result<(), ApiError>;
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

#[derive(Debug, serde::Deserialize)]
struct Envelope {
    #[serde(default)]
    error_status: Value,
    #[serde(default)]
    data: Value,
    #[serde(default, alias = "error_message")]
    message: Option<String>,
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !(s.is_empty() || s == "false" || s == "0"),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Unwraps the uniform envelope around a response body.
pub fn unwrap_envelope(status: u16, body: &str) -> Result<Value, ApiError> {
    let success = (200..300).contains(&status);
    let env: Envelope = match serde_json::from_str(body) {
        Ok(env) => env,
        Err(_) if !success => {
            return Err(ApiError::Server {
                status: Some(status),
                message: None,
            });
        }
        Err(e) => return Err(ApiError::Decode(e)),
    };
    if is_truthy(&env.error_status) || !success {
        return Err(ApiError::Server {
            status: Some(status),
            message: env.message,
        });
    }
    Ok(env.data)
}

/// Decodes envelope `data`, treating an absent payload as the empty list
/// when the target is a sequence.
fn decode_data<T: DeserializeOwned>(data: Value) -> Result<T, ApiError> {
    if data.is_null() {
        if let Ok(v) = serde_json::from_value::<T>(Value::Array(Vec::new())) {
            return Ok(v);
        }
    }
    Ok(serde_json::from_value(data)?)
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let http = crate::utils::http_client()?;
        Ok(Self::with_http(http, base_url))
    }

    pub fn with_http(http: reqwest::blocking::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn send(&self, req: RequestBuilder, what: &str) -> Result<Value, ApiError> {
        tracing::debug!(call = what, "sending request");
        let resp = req.send().map_err(|e| {
            tracing::warn!(call = what, error = %e, "transport failure");
            ApiError::Transport(e)
        })?;
        let status = resp.status().as_u16();
        let body = resp.text()?;
        unwrap_envelope(status, &body).inspect_err(|e| {
            tracing::warn!(call = what, status, error = %e, "backend rejected request");
        })
    }

    fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ApiError> {
        let data = self.send(self.http.get(self.url(path)).query(query), path)?;
        decode_data(data)
    }

    fn write<B: Serialize + ?Sized>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> Result<Value, ApiError> {
        let req = self
            .http
            .request(method, self.url(path))
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body);
        self.send(req, path)
    }

    // -- expenses ---------------------------------------------------------

    pub fn list_expenses(&self) -> Result<Vec<Expense>, ApiError> {
        self.get("expense", &[])
    }

    pub fn expenses_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Expense>, ApiError> {
        self.get(
            "expense",
            &[("startDate", from.to_string()), ("endDate", to.to_string())],
        )
    }

    pub fn create_expense(&self, expense: &NewExpense) -> Result<Value, ApiError> {
        self.write(reqwest::Method::POST, "expense", expense)
    }

    pub fn update_expense(&self, id: &RecordId, expense: &Expense) -> Result<Expense, ApiError> {
        let data = self.write(reqwest::Method::PUT, &format!("expense/{}", id), expense)?;
        decode_data(data)
    }

    pub fn delete_expense(&self, id: &RecordId) -> Result<(), ApiError> {
        self.send(
            self.http.delete(self.url(&format!("expense/{}", id))),
            "expense",
        )?;
        Ok(())
    }

    pub fn categories(&self) -> Result<Vec<Category>, ApiError> {
        self.get("categories", &[])
    }

    // -- budgets ----------------------------------------------------------

    /// `month0` is zero-based, as the backend expects.
    pub fn budget(&self, month0: u32, year: i32) -> Result<Option<Budget>, ApiError> {
        self.get(
            "budget",
            &[("month", month0.to_string()), ("year", year.to_string())],
        )
    }

    pub fn budget_tracking(&self, month0: u32, year: i32) -> Result<BudgetTracking, ApiError> {
        let data: Option<BudgetTracking> = self.get(
            "budget/tracking",
            &[("month", month0.to_string()), ("year", year.to_string())],
        )?;
        Ok(data.unwrap_or_default())
    }

    pub fn save_budget(&self, budget: &Budget) -> Result<Value, ApiError> {
        self.write(reqwest::Method::POST, "budget", budget)
    }

    pub fn delete_budget(&self, month0: u32, year: i32) -> Result<(), ApiError> {
        let req = self
            .http
            .delete(self.url("budget"))
            .query(&[("month", month0.to_string()), ("year", year.to_string())]);
        self.send(req, "budget")?;
        Ok(())
    }

    // -- splitwise --------------------------------------------------------

    pub fn sync_splitwise(&self) -> Result<SyncResult, ApiError> {
        let data = self.write(reqwest::Method::POST, "splitwise/sync", &json!({}))?;
        decode_data(data)
    }

    pub fn splitwise_status(&self) -> Result<Option<SyncStatus>, ApiError> {
        self.get("splitwise/status", &[])
    }

    /// Splitwise expenses between `from` and `to` for the named user.
    pub fn splitwise_expenses(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        user: &str,
    ) -> Result<Vec<SplitwiseListing>, ApiError> {
        self.get(
            "splitwise",
            &[
                ("from", from.to_string()),
                ("to", to.to_string()),
                ("user", user.to_string()),
            ],
        )
    }
}

impl ImportApi for ApiClient {
    fn upload_csv(&self, file_name: &str, contents: Vec<u8>) -> Result<UploadResponse, ApiError> {
        let part = multipart::Part::bytes(contents)
            .file_name(file_name.to_string())
            .mime_str("text/csv")?;
        let form = multipart::Form::new().part("file", part);
        let data = self.send(self.http.post(self.url("csv/upload")).multipart(form), "csv/upload")?;
        decode_data(data)
    }

    fn preview_csv(
        &self,
        session_id: &str,
        mapping: &ColumnMapping,
    ) -> Result<PreviewResponse, ApiError> {
        let body = json!({ "sessionId": session_id, "columnMapping": mapping });
        let data = self.write(reqwest::Method::POST, "csv/preview", &body)?;
        decode_data(data)
    }

    fn commit_import(&self, request: &ImportRequest) -> Result<ImportResult, ApiError> {
        let data = self.write(reqwest::Method::POST, "csv/import", request)?;
        decode_data(data)
    }

    fn rollback_import(&self, import_id: &RecordId) -> Result<(), ApiError> {
        let req = self.http.delete(self.url(&format!("csv/import/{}", import_id)));
        self.send(req, "csv/import")?;
        Ok(())
    }
}

impl ReconciliationApi for ApiClient {
    fn unreconciled(&self, from: NaiveDate, to: NaiveDate) -> Result<UnreconciledData, ApiError> {
        let data: Option<UnreconciledData> = self.get(
            "reconciliation/unreconciled",
            &[("from", from.to_string()), ("to", to.to_string())],
        )?;
        Ok(data.unwrap_or_default())
    }

    fn update_status(
        &self,
        transaction_id: &RecordId,
        status: Option<&str>,
    ) -> Result<(), ApiError> {
        let body = json!({ "transactionId": transaction_id, "status": status });
        self.write(reqwest::Method::PUT, "reconciliation/status", &body)?;
        Ok(())
    }

    fn bulk_update_status(
        &self,
        transaction_ids: &[RecordId],
        status: Option<&str>,
    ) -> Result<(), ApiError> {
        let body = json!({ "transactionIds": transaction_ids, "status": status });
        self.write(reqwest::Method::PUT, "reconciliation/status/bulk", &body)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthy_error_status_fails_even_on_200() {
        let err = unwrap_envelope(200, r#"{"error_status":true,"message":"Bad file"}"#)
            .unwrap_err();
        assert_eq!(err.user_message("Upload failed"), "Bad file");

        let err = unwrap_envelope(200, r#"{"error_status":1}"#).unwrap_err();
        assert_eq!(err.user_message("Upload failed"), "Upload failed");
    }

    #[test]
    fn falsy_error_status_passes_data_through() {
        let data = unwrap_envelope(200, r#"{"error_status":false,"data":{"a":1}}"#).unwrap();
        assert_eq!(data["a"], 1);
        let data = unwrap_envelope(201, r#"{"data":[1,2]}"#).unwrap();
        assert_eq!(data.as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn non_json_error_body_is_server_error() {
        let err = unwrap_envelope(502, "<html>Bad gateway</html>").unwrap_err();
        assert!(matches!(
            err,
            ApiError::Server {
                status: Some(502),
                message: None
            }
        ));
    }

    #[test]
    fn error_message_alias_is_read() {
        let err = unwrap_envelope(200, r#"{"error_status":"true","error_message":"nope"}"#)
            .unwrap_err();
        assert_eq!(err.user_message("x"), "nope");
    }

    #[test]
    fn missing_list_data_decodes_empty() {
        let v: Vec<Category> = decode_data(Value::Null).unwrap();
        assert!(v.is_empty());
        let v: Option<Budget> = decode_data(Value::Null).unwrap();
        assert!(v.is_none());
    }
}
