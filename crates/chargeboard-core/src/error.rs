//! Error types for chargeboard-core
//!
//! Provides the error hierarchy with thiserror, plus the refresh report used
//! for graceful degradation when individual collections fail to load.

use crate::source::Collection;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Core error type for chargeboard operations
#[derive(Error, Debug)]
pub enum CoreError {
    // ===================
    // Store Errors
    // ===================
    #[error("Record store unreachable: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("Failed to load collection {collection}: {message}")]
    Load {
        collection: Collection,
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("Failed to decode row {row} of {collection}: {message}")]
    Scan {
        collection: Collection,
        row: usize,
        message: String,
    },

    // ===================
    // Config Errors
    // ===================
    #[error("Failed to read config file: {path}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    // ===================
    // Scheduler Errors
    // ===================
    #[error("Refresh scheduler is not running")]
    SchedulerStopped,
}

impl CoreError {
    /// Connection error without an underlying driver error
    pub fn connection(message: impl Into<String>) -> Self {
        CoreError::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Load error without an underlying driver error
    pub fn load(collection: Collection, message: impl Into<String>) -> Self {
        CoreError::Load {
            collection,
            message: message.into(),
            source: None,
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, CoreError::Connection { .. })
    }
}

/// Severity level for errors during a refresh pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Rows skipped, the collection was still replaced
    Warning,
    /// The collection kept its previous snapshot
    Error,
    /// The store could not be reached at all
    Fatal,
}

/// Individual error entry in a refresh report
#[derive(Debug, Clone, Serialize)]
pub struct LoadError {
    pub source: String,
    pub message: String,
    pub severity: ErrorSeverity,
    /// Actionable suggestion for the operator (optional)
    pub suggestion: Option<String>,
}

impl LoadError {
    pub fn warning(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            severity: ErrorSeverity::Warning,
            suggestion: None,
        }
    }

    pub fn error(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            severity: ErrorSeverity::Error,
            suggestion: None,
        }
    }

    pub fn fatal(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            severity: ErrorSeverity::Fatal,
            suggestion: None,
        }
    }

    /// Add an actionable suggestion to this error
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Create an operator-facing entry from a CoreError
    pub fn from_core_error(source: impl Into<String>, error: &CoreError) -> Self {
        let message = error.to_string();
        match error {
            CoreError::Connection { .. } => LoadError::fatal(source, message)
                .with_suggestion("Check that the database file exists and is readable"),
            CoreError::Load { collection, .. } => LoadError::error(source, message)
                .with_suggestion(format!("Check the schema of table {}", collection.table_name())),
            CoreError::Scan { .. } => LoadError::warning(source, message),
            _ => LoadError::error(source, message),
        }
    }
}

/// Per-collection result of one refresh pass
#[derive(Debug, Clone, Serialize)]
pub struct CollectionOutcome {
    pub collection: Collection,
    /// Number of records published, `None` when the previous snapshot was kept
    pub loaded: Option<usize>,
    /// Rows dropped because they failed to decode
    pub skipped: usize,
}

impl CollectionOutcome {
    pub fn succeeded(&self) -> bool {
        self.loaded.is_some()
    }
}

/// Report of one refresh pass over every collection
///
/// Partial failures are recorded here instead of aborting the pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshReport {
    pub errors: Vec<LoadError>,
    pub outcomes: Vec<CollectionOutcome>,
    pub records_loaded: usize,
    pub records_skipped: usize,
    pub connection_failed: bool,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RefreshReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: LoadError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, source: impl Into<String>, message: impl Into<String>) {
        self.errors.push(LoadError::warning(source, message));
    }

    /// Record a successfully published collection
    pub fn record_loaded(&mut self, collection: Collection, loaded: usize, skipped: usize) {
        self.records_loaded += loaded;
        self.records_skipped += skipped;
        self.outcomes.push(CollectionOutcome {
            collection,
            loaded: Some(loaded),
            skipped,
        });
    }

    /// Record a collection that kept its previous snapshot
    pub fn record_failed(&mut self, collection: Collection) {
        self.outcomes.push(CollectionOutcome {
            collection,
            loaded: None,
            skipped: 0,
        });
    }

    /// Returns true if there are any fatal errors
    pub fn has_fatal_errors(&self) -> bool {
        self.errors
            .iter()
            .any(|e| e.severity == ErrorSeverity::Fatal)
    }

    /// Returns true if there are any errors (including warnings)
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns count by severity
    pub fn error_count(&self) -> (usize, usize, usize) {
        let count = |severity| self.errors.iter().filter(|e| e.severity == severity).count();
        (
            count(ErrorSeverity::Warning),
            count(ErrorSeverity::Error),
            count(ErrorSeverity::Fatal),
        )
    }

    /// Whether the given collection was replaced in this pass
    pub fn succeeded(&self, collection: Collection) -> bool {
        self.outcomes
            .iter()
            .any(|o| o.collection == collection && o.succeeded())
    }

    /// Collections that kept their previous snapshot
    pub fn failed_collections(&self) -> Vec<Collection> {
        self.outcomes
            .iter()
            .filter(|o| !o.succeeded())
            .map(|o| o.collection)
            .collect()
    }
}

/// Degraded state indicator for the analytical cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DegradedState {
    /// Every collection was refreshed on the last pass
    Healthy,
    /// Some collections are serving stale snapshots
    PartialData {
        missing: Vec<String>,
        reason: String,
    },
    /// The store was unreachable on the last pass
    Unreachable { reason: String },
}

impl DegradedState {
    pub fn is_healthy(&self) -> bool {
        matches!(self, DegradedState::Healthy)
    }

    pub fn is_degraded(&self) -> bool {
        !self.is_healthy()
    }

    /// Derive the state from the outcome of a refresh pass
    pub fn from_report(report: &RefreshReport) -> Self {
        if report.connection_failed {
            return DegradedState::Unreachable {
                reason: "Record store unreachable during last refresh".to_string(),
            };
        }

        let missing: Vec<String> = report
            .failed_collections()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        if missing.is_empty() {
            DegradedState::Healthy
        } else {
            DegradedState::PartialData {
                reason: format!("Stale: {}", missing.join(", ")),
                missing,
            }
        }
    }
}
