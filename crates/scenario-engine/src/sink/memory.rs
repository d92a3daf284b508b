//! 进程内接收端

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use traffic_shared::error::Result;

use super::LogSink;
use crate::record::LogRecord;

/// 把记录保存在内存中，克隆体共享同一份存储
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已接收记录的快照
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }

    /// 取出并清空已接收的记录
    pub fn drain(&self) -> Vec<LogRecord> {
        std::mem::take(&mut *self.records.lock())
    }
}

#[async_trait]
impl LogSink for MemorySink {
    async fn dispatch(&self, record: &LogRecord) -> Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
