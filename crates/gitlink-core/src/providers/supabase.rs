// Hosted backend provider - PostgREST tables behind the RecordStore trait
use async_trait::async_trait;
use gitlink_api::{BackendClient, BackendError, Filter};
use serde_json::Value;

use crate::store::RecordStore;

pub struct SupabaseStore {
    client: BackendClient,
}

impl SupabaseStore {
    pub fn new(client: BackendClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecordStore for SupabaseStore {
    fn is_configured(&self) -> bool {
        self.client.is_configured()
    }

    async fn select(&self, table: &str, columns: &str, filters: &[Filter]) -> Result<Vec<Value>, BackendError> {
        self.client.select(table, columns, filters).await
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<(), BackendError> {
        self.client.insert(table, &rows).await
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), BackendError> {
        self.client.delete(table, filters).await
    }
}
