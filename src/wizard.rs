// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! CSV import wizard.
//!
//! Four steps in strict forward order, `Upload -> Mapping -> Preview -> Import`,
//! with a single back edge from Preview to Mapping. All session data is held
//! in memory and discarded by [`ImportWizard::close`].

use crate::api::{ApiError, ImportApi};
use crate::models::{
    ColumnMapping, ImportOptions, ImportRequest, ImportResult, LogicalField, PreviewResponse,
    PreviewRow, PreviewStatistics, UploadResponse,
};
use crate::utils::truncate;
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Delay before the post-import refresh, giving the backend time to settle.
pub const REFRESH_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_SOURCE: &str = "CSV Import";
pub const DEFAULT_PAYMENT_TYPE: &str = "CSV Import";
const SAMPLE_MAX_CHARS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    Upload,
    Mapping,
    Preview,
    Import,
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WizardStep::Upload => "upload",
            WizardStep::Mapping => "mapping",
            WizardStep::Preview => "preview",
            WizardStep::Import => "import",
        })
    }
}

fn join_fields(fields: &[LogicalField]) -> String {
    fields
        .iter()
        .map(|f| f.key())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("upload rejected: {0}")]
    UploadRejected(String),
    #[error("{0}")]
    ServerError(String),
    #[error("required fields not mapped: {}", join_fields(.0))]
    ValidationIncomplete(Vec<LogicalField>),
    #[error("cannot {action} during the {step} step")]
    InvalidStep {
        action: &'static str,
        step: WizardStep,
    },
    #[error("column '{column}' does not exist (file has {available} columns)")]
    UnknownColumn { column: String, available: usize },
    #[error("row {0} is not part of the preview")]
    UnknownRow(usize),
    #[error("preview has not been loaded")]
    PreviewNotLoaded,
    #[error("nothing to import")]
    NothingToImport,
    #[error("rollback is not available for this import")]
    RollbackUnavailable,
    #[error("could not read {path}: {message}")]
    Io { path: String, message: String },
}

impl WizardError {
    fn server(err: ApiError, fallback: &str) -> Self {
        WizardError::ServerError(err.user_message(fallback))
    }
}

/// Called when the dashboard data should be refetched.
pub trait RefreshHook {
    fn refresh(&mut self, delay: Duration);
}

impl<F: FnMut(Duration)> RefreshHook for F {
    fn refresh(&mut self, delay: Duration) {
        self(delay)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportSession {
    pub session_id: String,
    pub headers: Vec<String>,
    pub sample_rows: Vec<Vec<String>>,
    pub total_rows: u64,
    pub suggested_mapping: ColumnMapping,
    pub column_mapping: ColumnMapping,
    pub source: String,
    pub payment_type: String,
    pub import_options: Option<ImportOptions>,
}

impl ImportSession {
    fn from_upload(resp: UploadResponse) -> Self {
        Self {
            session_id: resp.session_id,
            headers: resp.headers,
            sample_rows: resp.preview,
            total_rows: resp.total_rows,
            column_mapping: resp.suggested_mapping.clone(),
            suggested_mapping: resp.suggested_mapping,
            source: resp.source.unwrap_or_default(),
            payment_type: resp.payment_type.unwrap_or_default(),
            import_options: None,
        }
    }

    /// Resolves a header name (case-insensitive) or a zero-based index.
    pub fn resolve_column(&self, wanted: &str) -> Result<usize, WizardError> {
        let wanted = wanted.trim();
        let by_name = self
            .headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(wanted));
        let found = by_name.or_else(|| {
            wanted.parse::<usize>()
                .ok()
                .filter(|i| *i < self.headers.len())
        });
        found.ok_or_else(|| WizardError::UnknownColumn {
            column: wanted.to_string(),
            available: self.headers.len(),
        })
    }
}

/// Label and enabled state of the preview's import action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportAction {
    pub count: u64,
    pub enabled: bool,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewState {
    rows: Vec<PreviewRow>,
    statistics: PreviewStatistics,
    skip_duplicates: bool,
    selection_mode: bool,
    selected: BTreeSet<usize>,
}

impl PreviewState {
    fn from_response(resp: PreviewResponse) -> Self {
        let rows = resp
            .preview
            .into_iter()
            .enumerate()
            .map(|(i, mut row)| {
                row.original_index = i;
                row
            })
            .collect();
        Self {
            rows,
            statistics: resp.statistics,
            skip_duplicates: true,
            selection_mode: false,
            selected: BTreeSet::new(),
        }
    }

    pub fn rows(&self) -> &[PreviewRow] {
        &self.rows
    }

    /// One page of rows, `page` starting at 1.
    pub fn page(&self, page: usize, page_size: usize) -> &[PreviewRow] {
        let start = page.saturating_sub(1).saturating_mul(page_size);
        let end = start.saturating_add(page_size).min(self.rows.len());
        self.rows.get(start..end).unwrap_or(&[])
    }

    pub fn statistics(&self) -> &PreviewStatistics {
        &self.statistics
    }

    pub fn skip_duplicates(&self) -> bool {
        self.skip_duplicates
    }

    pub fn set_skip_duplicates(&mut self, skip: bool) {
        self.skip_duplicates = skip;
    }

    pub fn selection_mode(&self) -> bool {
        self.selection_mode
    }

    /// Turning selection on seeds it with every importable row: non-duplicates
    /// when duplicates are skipped, otherwise everything. Turning it off clears it.
    pub fn set_selection_mode(&mut self, on: bool) {
        self.selection_mode = on;
        self.selected = if on {
            self.rows
                .iter()
                .filter(|r| !self.skip_duplicates || !r.is_duplicate)
                .map(|r| r.original_index)
                .collect()
        } else {
            BTreeSet::new()
        };
    }

    pub fn selected(&self) -> Vec<usize> {
        self.selected.iter().copied().collect()
    }

    fn check_row(&self, index: usize) -> Result<(), WizardError> {
        if self.rows.iter().any(|r| r.original_index == index) {
            Ok(())
        } else {
            Err(WizardError::UnknownRow(index))
        }
    }

    pub fn select_row(&mut self, index: usize) -> Result<(), WizardError> {
        self.check_row(index)?;
        self.selected.insert(index);
        Ok(())
    }

    pub fn deselect_row(&mut self, index: usize) -> Result<(), WizardError> {
        self.check_row(index)?;
        self.selected.remove(&index);
        Ok(())
    }

    /// Replaces the selection; all indices are checked before anything changes.
    pub fn set_selection<I: IntoIterator<Item = usize>>(
        &mut self,
        indices: I,
    ) -> Result<(), WizardError> {
        let wanted: BTreeSet<usize> = indices.into_iter().collect();
        for i in &wanted {
            self.check_row(*i)?;
        }
        self.selected = wanted;
        Ok(())
    }

    pub fn new_rows(&self) -> u64 {
        self.statistics
            .total_rows
            .saturating_sub(self.statistics.potential_duplicates)
    }

    pub fn import_action(&self) -> ImportAction {
        if self.selection_mode {
            let count = self.selected.len() as u64;
            let label = if count == 0 {
                "Select rows".to_string()
            } else {
                format!("Import {}", count)
            };
            return ImportAction {
                count,
                enabled: count > 0,
                label,
            };
        }
        let count = if self.skip_duplicates {
            self.new_rows()
        } else {
            self.statistics.total_rows
        };
        let label = if self.skip_duplicates && count == 0 {
            "No new rows".to_string()
        } else {
            format!("Import {}", count)
        };
        ImportAction {
            count,
            enabled: count > 0,
            label,
        }
    }

    fn options(&self) -> (bool, Option<Vec<usize>>) {
        let selection = self.selection_mode.then(|| self.selected());
        (self.skip_duplicates, selection)
    }
}

#[derive(Debug, Default)]
struct CommitLatch(AtomicBool);

impl CommitLatch {
    /// True exactly once until the latch is replaced.
    fn try_acquire(&self) -> bool {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
enum ImportOutcome {
    #[default]
    Pending,
    Succeeded(ImportResult),
    Failed(String),
}

#[derive(Debug)]
pub struct ImportWizard {
    step: WizardStep,
    session: Option<ImportSession>,
    source_label: String,
    preview: Option<PreviewState>,
    latch: CommitLatch,
    outcome: ImportOutcome,
}

impl Default for ImportWizard {
    fn default() -> Self {
        Self {
            step: WizardStep::Upload,
            session: None,
            source_label: String::new(),
            preview: None,
            latch: CommitLatch::default(),
            outcome: ImportOutcome::Pending,
        }
    }
}

/// Checks the file locally; rejections never reach the network.
pub fn read_upload(path: &Path) -> Result<Vec<u8>, WizardError> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return Err(WizardError::UploadRejected(format!(
            "{} is not a .csv file",
            path.display()
        )));
    }
    let bytes = std::fs::read(path).map_err(|e| WizardError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    if bytes.is_empty() {
        return Err(WizardError::UploadRejected("file is empty".into()));
    }
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes.as_slice());
    match rdr.records().next() {
        None => Err(WizardError::UploadRejected("file has no header row".into())),
        Some(Err(e)) => Err(WizardError::UploadRejected(format!(
            "not a readable CSV: {}",
            e
        ))),
        Some(Ok(_)) => Ok(bytes),
    }
}

impl ImportWizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn session(&self) -> Option<&ImportSession> {
        self.session.as_ref()
    }

    fn expect_step(&self, step: WizardStep, action: &'static str) -> Result<(), WizardError> {
        if self.step == step {
            Ok(())
        } else {
            Err(WizardError::InvalidStep {
                action,
                step: self.step,
            })
        }
    }

    fn session_mut(&mut self, action: &'static str) -> Result<&mut ImportSession, WizardError> {
        let step = self.step;
        self.session
            .as_mut()
            .ok_or(WizardError::InvalidStep { action, step })
    }

    // -- Upload -----------------------------------------------------------

    pub fn upload<A: ImportApi + ?Sized>(
        &mut self,
        api: &A,
        path: &Path,
    ) -> Result<&ImportSession, WizardError> {
        self.expect_step(WizardStep::Upload, "upload a file")?;
        let bytes = read_upload(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.csv".to_string());
        let resp = api
            .upload_csv(&file_name, bytes)
            .map_err(|e| WizardError::server(e, "Upload failed"))?;
        tracing::info!(session = %resp.session_id, rows = resp.total_rows, "csv uploaded");
        self.step = WizardStep::Mapping;
        Ok(self.session.insert(ImportSession::from_upload(resp)))
    }

    // -- Mapping ----------------------------------------------------------

    pub fn set_column(
        &mut self,
        field: LogicalField,
        column: Option<usize>,
    ) -> Result<(), WizardError> {
        self.expect_step(WizardStep::Mapping, "change the column mapping")?;
        let session = self.session_mut("change the column mapping")?;
        if let Some(c) = column {
            if c >= session.headers.len() {
                return Err(WizardError::UnknownColumn {
                    column: c.to_string(),
                    available: session.headers.len(),
                });
            }
        }
        session.column_mapping.set(field, column);
        Ok(())
    }

    pub fn set_source(&mut self, label: &str) -> Result<(), WizardError> {
        self.expect_step(WizardStep::Mapping, "set the data source")?;
        self.source_label = label.trim().to_string();
        Ok(())
    }

    pub fn missing_required(&self) -> Vec<LogicalField> {
        match &self.session {
            Some(s) => s.column_mapping.missing_required(),
            None => LogicalField::ALL
                .into_iter()
                .filter(|f| f.is_required())
                .collect(),
        }
    }

    /// Whether "Next" is enabled on the Mapping step.
    pub fn can_advance(&self) -> bool {
        self.step == WizardStep::Mapping && self.missing_required().is_empty()
    }

    /// Example value for a field from the first sample row, or `-`.
    pub fn sample_value(&self, field: LogicalField) -> String {
        self.session
            .as_ref()
            .and_then(|s| {
                let col = s.column_mapping.get(field)?;
                s.sample_rows.first()?.get(col).filter(|v| !v.is_empty())
            })
            .map(|v| truncate(v, SAMPLE_MAX_CHARS))
            .unwrap_or_else(|| "-".to_string())
    }

    pub fn confirm_mapping(&mut self) -> Result<(), WizardError> {
        self.expect_step(WizardStep::Mapping, "confirm the mapping")?;
        let missing = self.missing_required();
        if !missing.is_empty() {
            return Err(WizardError::ValidationIncomplete(missing));
        }
        let source = if self.source_label.is_empty() {
            DEFAULT_SOURCE.to_string()
        } else {
            self.source_label.clone()
        };
        let session = self.session_mut("confirm the mapping")?;
        session.source = source;
        session.payment_type = String::new();
        tracing::info!(mapping = ?session.column_mapping, "mapping confirmed");
        self.step = WizardStep::Preview;
        Ok(())
    }

    // -- Preview ----------------------------------------------------------

    /// Fetches the transformed preview. Calling again after a failure retries.
    pub fn load_preview<A: ImportApi + ?Sized>(
        &mut self,
        api: &A,
    ) -> Result<&PreviewState, WizardError> {
        self.expect_step(WizardStep::Preview, "load the preview")?;
        self.preview = None;
        let session = self.session_mut("load the preview")?;
        let resp = api
            .preview_csv(&session.session_id, &session.column_mapping)
            .map_err(|e| WizardError::server(e, "Failed to generate preview"))?;
        tracing::info!(
            rows = resp.preview.len(),
            duplicates = resp.statistics.potential_duplicates,
            "preview loaded"
        );
        Ok(self.preview.insert(PreviewState::from_response(resp)))
    }

    pub fn preview(&self) -> Option<&PreviewState> {
        self.preview.as_ref()
    }

    pub fn preview_mut(&mut self) -> Result<&mut PreviewState, WizardError> {
        self.expect_step(WizardStep::Preview, "change the preview selection")?;
        self.preview.as_mut().ok_or(WizardError::PreviewNotLoaded)
    }

    /// The one backward transition. The mapping is kept; the preview is not.
    pub fn back_to_mapping(&mut self) -> Result<(), WizardError> {
        self.expect_step(WizardStep::Preview, "go back to mapping")?;
        self.preview = None;
        self.step = WizardStep::Mapping;
        Ok(())
    }

    pub fn confirm_preview(&mut self) -> Result<&ImportOptions, WizardError> {
        self.expect_step(WizardStep::Preview, "confirm the preview")?;
        let preview = self.preview.as_ref().ok_or(WizardError::PreviewNotLoaded)?;
        if !preview.import_action().enabled {
            return Err(WizardError::NothingToImport);
        }
        let (skip_duplicates, selected_row_indices) = preview.options();
        let session = self.session_mut("confirm the preview")?;
        let options = ImportOptions {
            skip_duplicates,
            overwrite_duplicates: false,
            source: session.source.clone(),
            payment_type: session.payment_type.clone(),
            selected_row_indices,
        };
        self.step = WizardStep::Import;
        Ok(self
            .session_mut("confirm the preview")?
            .import_options
            .insert(options))
    }

    // -- Import -----------------------------------------------------------

    /// Commits the import once. Repeat calls before [`close`](Self::close)
    /// are ignored and return `Ok(None)` without touching the network.
    pub fn start_import<A, R>(
        &mut self,
        api: &A,
        refresh: &mut R,
    ) -> Result<Option<ImportResult>, WizardError>
    where
        A: ImportApi + ?Sized,
        R: RefreshHook + ?Sized,
    {
        self.expect_step(WizardStep::Import, "start the import")?;
        if !self.latch.try_acquire() {
            tracing::debug!("import already started; ignoring repeat invocation");
            return Ok(None);
        }
        self.commit(api, refresh).map(Some)
    }

    /// Re-sends the same commit after a failure.
    pub fn retry_import<A, R>(
        &mut self,
        api: &A,
        refresh: &mut R,
    ) -> Result<ImportResult, WizardError>
    where
        A: ImportApi + ?Sized,
        R: RefreshHook + ?Sized,
    {
        self.expect_step(WizardStep::Import, "retry the import")?;
        if !matches!(self.outcome, ImportOutcome::Failed(_)) {
            return Err(WizardError::InvalidStep {
                action: "retry an import that has not failed",
                step: self.step,
            });
        }
        self.commit(api, refresh)
    }

    fn import_request(&mut self) -> Result<ImportRequest, WizardError> {
        let session = self.session_mut("start the import")?;
        let mut options = session.import_options.clone().unwrap_or(ImportOptions {
            skip_duplicates: true,
            overwrite_duplicates: false,
            source: session.source.clone(),
            payment_type: session.payment_type.clone(),
            selected_row_indices: None,
        });
        if options.source.is_empty() {
            options.source = DEFAULT_SOURCE.to_string();
        }
        if options.payment_type.is_empty() {
            options.payment_type = DEFAULT_PAYMENT_TYPE.to_string();
        }
        Ok(ImportRequest {
            session_id: session.session_id.clone(),
            column_mapping: session.column_mapping.clone(),
            options,
        })
    }

    fn commit<A, R>(&mut self, api: &A, refresh: &mut R) -> Result<ImportResult, WizardError>
    where
        A: ImportApi + ?Sized,
        R: RefreshHook + ?Sized,
    {
        let request = self.import_request()?;
        match api.commit_import(&request) {
            Ok(result) => {
                tracing::info!(
                    imported = result.imported,
                    skipped = result.duplicates_skipped,
                    "import committed"
                );
                self.outcome = ImportOutcome::Succeeded(result.clone());
                refresh.refresh(REFRESH_DELAY);
                Ok(result)
            }
            Err(e) => {
                let message = e.user_message("Import failed");
                self.outcome = ImportOutcome::Failed(message.clone());
                Err(WizardError::ServerError(message))
            }
        }
    }

    pub fn result(&self) -> Option<&ImportResult> {
        match &self.outcome {
            ImportOutcome::Succeeded(r) => Some(r),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match &self.outcome {
            ImportOutcome::Failed(m) => Some(m),
            _ => None,
        }
    }

    /// Undo is offered only when something was actually imported.
    pub fn can_rollback(&self) -> bool {
        self.result()
            .is_some_and(|r| r.imported > 0 && r.import_id.is_some())
    }

    /// Deletes the import; on success refreshes and closes the wizard.
    pub fn rollback<A, R>(&mut self, api: &A, refresh: &mut R) -> Result<(), WizardError>
    where
        A: ImportApi + ?Sized,
        R: RefreshHook + ?Sized,
    {
        let import_id = match self.result() {
            Some(r) if self.can_rollback() => r.import_id.clone(),
            _ => None,
        }
        .ok_or(WizardError::RollbackUnavailable)?;
        api.rollback_import(&import_id)
            .map_err(|e| WizardError::server(e, "Failed to rollback import"))?;
        tracing::info!(import = %import_id, "import rolled back");
        refresh.refresh(Duration::ZERO);
        self.close();
        Ok(())
    }

    /// Resets every piece of wizard state, whatever step it is in.
    pub fn close(&mut self) {
        *self = Self::default();
    }
}
