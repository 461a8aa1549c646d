//! chargeboard-core - Core library for chargeboard
//!
//! Provides the record models, the record store boundary, the refreshable
//! analytical cache, the session filter pipeline and the KPI aggregations.

pub mod analytics;
pub mod cache;
pub mod config;
pub mod date_range;
pub mod error;
pub mod event;
pub mod filters;
pub mod models;
pub mod scheduler;
pub mod source;

pub use cache::AnalyticalCache;
pub use config::ChargeboardConfig;
pub use date_range::{DateMode, DateRangeResolver, DateWindow};
pub use error::{CoreError, DegradedState, LoadError, RefreshReport};
pub use event::{DataEvent, EventBus};
pub use filters::{Filter, QueryParams};
pub use scheduler::{RefreshHandle, RefreshScheduler};
pub use source::{Batch, Collection, InMemoryStore, RecordStore, SqliteRecordStore};
