//! Symbol-to-display-name cache shared across collaborators.

use std::collections::HashMap;
use std::sync::Mutex;

/// Names for issues that matter even before any listing has been fetched.
const WELL_KNOWN: &[(&str, &str)] = &[
    ("005930", "삼성전자"),
    ("000660", "SK하이닉스"),
    ("035420", "NAVER"),
    ("035720", "카카오"),
    ("051910", "LG화학"),
    ("207940", "삼성바이오로직스"),
    ("006400", "삼성SDI"),
    ("005380", "현대차"),
    ("000270", "기아"),
    ("373220", "LG에너지솔루션"),
];

/// Explicit, shareable symbol-name cache.
///
/// Passed by reference (typically `Arc`) to the collaborators that need it
/// instead of living as ambient process-wide state. Unknown symbols resolve
/// to themselves, so callers always get something printable.
pub struct StockNameCache {
    names: Mutex<HashMap<String, String>>,
}

impl StockNameCache {
    /// A cache pre-seeded with well-known KRX issues.
    pub fn new() -> Self {
        let names = WELL_KNOWN
            .iter()
            .map(|(code, name)| (code.to_string(), name.to_string()))
            .collect();
        Self {
            names: Mutex::new(names),
        }
    }

    pub fn insert(&self, code: &str, name: &str) {
        self.lock().insert(code.to_string(), name.to_string());
    }

    /// The display name for `code`, or `code` itself when unknown.
    pub fn resolve(&self, code: &str) -> String {
        self.lock()
            .get(code)
            .cloned()
            .unwrap_or_else(|| code.to_string())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.names
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for StockNameCache {
    fn default() -> Self {
        Self::new()
    }
}
