use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;

#[derive(Clone, Debug, PartialEq)]
pub enum ErrorLevel {
    Warning,
    Error,
}

#[derive(Clone, Debug)]
pub struct ErrorEntry {
    pub timestamp: SystemTime,
    pub level: ErrorLevel,
    pub message: String,
    pub target: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub fields: HashMap<String, String>,
}

/// Bounded log of captured warnings and errors, oldest evicted first.
#[derive(Clone)]
pub struct ErrorStore {
    entries: Arc<Mutex<VecDeque<ErrorEntry>>>,
    max_entries: usize,
}

impl ErrorStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::new())),
            max_entries,
        }
    }

    pub fn add_entry(&self, entry: ErrorEntry) {
        let mut entries = self.entries.lock();
        entries.push_back(entry);
        while entries.len() > self.max_entries {
            entries.pop_front();
        }
    }

    pub fn get_all_entries(&self) -> Vec<ErrorEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn error_count(&self) -> usize {
        self.count(ErrorLevel::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(ErrorLevel::Warning)
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn count(&self, level: ErrorLevel) -> usize {
        self.entries.lock().iter().filter(|e| e.level == level).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(level: ErrorLevel, message: &str) -> ErrorEntry {
        ErrorEntry {
            timestamp: SystemTime::now(),
            level,
            message: message.into(),
            target: "test".into(),
            file: None,
            line: None,
            fields: HashMap::new(),
        }
    }

    #[test]
    fn test_fifo_eviction() {
        let store = ErrorStore::new(2);
        store.add_entry(entry(ErrorLevel::Error, "one"));
        store.add_entry(entry(ErrorLevel::Warning, "two"));
        store.add_entry(entry(ErrorLevel::Error, "three"));

        let messages: Vec<String> = store.get_all_entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["two", "three"]);
        assert_eq!(store.error_count(), 1);
        assert_eq!(store.warning_count(), 1);

        store.clear();
        assert!(store.get_all_entries().is_empty());
    }
}
