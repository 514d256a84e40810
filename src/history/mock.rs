use super::HistoryStore;
use crate::models::GenerationRecord;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct MockHistoryStore {
    records: Arc<Mutex<Vec<GenerationRecord>>>,
    fail_writes: Arc<Mutex<bool>>,
    write_count: Arc<Mutex<usize>>,
}

impl MockHistoryStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(Vec::new())),
            fail_writes: Arc::new(Mutex::new(false)),
            write_count: Arc::new(Mutex::new(0)),
        }
    }

    /// Make every subsequent write fail, for testing best-effort persistence.
    pub fn with_failing_writes(self) -> Self {
        *self.fail_writes.lock().unwrap() = true;
        self
    }

    pub fn get_write_count(&self) -> usize {
        *self.write_count.lock().unwrap()
    }

    pub fn get_records(&self) -> Vec<GenerationRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl Default for MockHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for MockHistoryStore {
    async fn save_generation(&self, record: &GenerationRecord) -> Result<()> {
        let mut count = self.write_count.lock().unwrap();
        *count += 1;

        if *self.fail_writes.lock().unwrap() {
            return Err(Error::History("mock write failure".to_string()));
        }

        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}
