use super::{SheetRecord, SheetStore};
use crate::core::error::StoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Default)]
struct Datasheet {
    records: Vec<SheetRecord>,
    updates: Vec<Vec<SheetRecord>>,
}

/// In-process store. Keeps every update call so writes can be inspected
/// afterwards; used for dry runs.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, Datasheet>>,
    fail_after: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds `datasheet` with `records`.
    pub fn with_records(self, datasheet: &str, records: Vec<SheetRecord>) -> Self {
        let mut inner = self.inner.into_inner();
        inner.entry(datasheet.to_string()).or_default().records = records;
        MemoryStore {
            inner: Mutex::new(inner),
            fail_after: self.fail_after,
        }
    }

    /// Rejects every update after the first `calls` succeeded.
    pub fn failing_after(mut self, calls: usize) -> Self {
        self.fail_after = Some(calls);
        self
    }

    /// Records passed to each successful `update` call, in call order.
    pub async fn update_calls(&self, datasheet: &str) -> Vec<Vec<SheetRecord>> {
        let inner = self.inner.lock().await;
        inner
            .get(datasheet)
            .map(|sheet| sheet.updates.clone())
            .unwrap_or_default()
    }

    pub async fn records(&self, datasheet: &str) -> Vec<SheetRecord> {
        let inner = self.inner.lock().await;
        inner
            .get(datasheet)
            .map(|sheet| sheet.records.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SheetStore for MemoryStore {
    async fn query_all(&self, datasheet: &str) -> Result<Vec<SheetRecord>, StoreError> {
        Ok(self.records(datasheet).await)
    }

    async fn update(&self, datasheet: &str, records: &[SheetRecord]) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        let successful: usize = inner.values().map(|sheet| sheet.updates.len()).sum();
        if self.fail_after.is_some_and(|limit| successful >= limit) {
            return Err(StoreError::Rejected {
                code: 500,
                message: "update rejected".to_string(),
            });
        }

        let sheet = inner.entry(datasheet.to_string()).or_default();
        for update in records {
            match sheet
                .records
                .iter_mut()
                .find(|r| r.record_id == update.record_id)
            {
                Some(existing) => existing
                    .fields
                    .extend(update.fields.iter().map(|(k, v)| (k.clone(), v.clone()))),
                None => sheet.records.push(update.clone()),
            }
        }
        sheet.updates.push(records.to_vec());
        debug!(datasheet, count = records.len(), "Stored update in memory");
        Ok(())
    }
}
