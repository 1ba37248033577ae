use gitlink_api::{BackendError, Filter};
use serde_json::Value;

/// Table access on the hosted backend
///
/// Every call yields either data or a `BackendError`; an unconfigured store
/// answers `NotConfigured` without going anywhere near the network.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    fn is_configured(&self) -> bool;

    async fn select(&self, table: &str, columns: &str, filters: &[Filter]) -> Result<Vec<Value>, BackendError>;

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<(), BackendError>;

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), BackendError>;
}
