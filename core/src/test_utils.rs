//! Shared test utilities

use std::io::{self, Read, Write};

use crate::error::LogError;
use crate::log_store::{LogStore, MemoryLogStore};
use crate::snapshot::InputSnapshot;

/// Two-axis, one-button snapshot
pub fn snap(x: f32, y: f32, pressed: bool) -> InputSnapshot {
    InputSnapshot::new([x, y], [pressed])
}

/// Store whose writers fail once a byte budget is used up
pub struct FailingStore {
    inner: MemoryLogStore,
    byte_budget: usize,
}

impl FailingStore {
    pub fn new(byte_budget: usize) -> Self {
        Self {
            inner: MemoryLogStore::new(),
            byte_budget,
        }
    }
}

impl LogStore for FailingStore {
    fn create_raw(&self, name: &str) -> Result<Box<dyn Write + Send>, LogError> {
        Ok(Box::new(BudgetSink {
            inner: self.inner.create_raw(name)?,
            remaining: self.byte_budget,
        }))
    }

    fn open_raw(&self, name: &str) -> Result<Box<dyn Read + Send>, LogError> {
        self.inner.open_raw(name)
    }

    fn list(&self) -> Result<Vec<String>, LogError> {
        self.inner.list()
    }
}

struct BudgetSink {
    inner: Box<dyn Write + Send>,
    remaining: usize,
}

impl Write for BudgetSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.len() > self.remaining {
            return Err(io::Error::other("device full"));
        }
        self.remaining -= buf.len();
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
