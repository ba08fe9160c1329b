use std::collections::VecDeque;

use serde::Serialize;

use crate::types::ApiResult;

pub const HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub action: String,
    pub time: String,
    pub success: bool,
    pub summary: String,
}

impl HistoryEntry {
    pub fn new(action: impl Into<String>, time: impl Into<String>, result: &ApiResult) -> Self {
        Self {
            action: action.into(),
            time: time.into(),
            success: result.success,
            summary: summarize(result),
        }
    }
}

/// `"<status> <statusText> (<time>)"`, else the error, else `"Unknown"`
pub fn summarize(result: &ApiResult) -> String {
    match (&result.http_response, &result.error) {
        (Some(response), _) => format!(
            "{} {} ({})",
            response.status, response.status_text, response.time
        ),
        (None, Some(error)) => error.clone(),
        (None, None) => "Unknown".to_string(),
    }
}

/// Rolling call history, newest first
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl History {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HttpResponseTrace;
    use serde_json::Value;
    use std::collections::BTreeMap;

    fn entry(i: usize) -> HistoryEntry {
        HistoryEntry {
            action: format!("call-{i}"),
            time: "12:00:00".into(),
            success: true,
            summary: String::new(),
        }
    }

    #[test]
    fn test_newest_first_and_bounded() {
        let mut history = History::new();
        for i in 0..60 {
            history.push(entry(i));
        }
        assert_eq!(history.len(), HISTORY_CAPACITY);
        assert_eq!(history.iter().next().unwrap().action, "call-59");
        assert_eq!(history.iter().last().unwrap().action, "call-10");
    }

    #[test]
    fn test_summaries() {
        let mut result = ApiResult::failure("Unknown action: nope");
        assert_eq!(summarize(&result), "Unknown action: nope");

        result.http_response = Some(HttpResponseTrace {
            status: 401,
            status_text: "Unauthorized".into(),
            headers: BTreeMap::new(),
            body: Value::Null,
            time: "87ms".into(),
        });
        assert_eq!(summarize(&result), "401 Unauthorized (87ms)");

        assert_eq!(summarize(&ApiResult::default()), "Unknown");
    }
}
