//! Sheet-id cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Sheet name to sheet id, for one spreadsheet
pub type SheetIds = HashMap<String, i64>;

/// Remembers the sheet-name-to-id table of every spreadsheet looked up.
///
/// A table is stored the first time a spreadsheet's metadata is read and is
/// never refreshed. Sheets added, removed or renamed afterwards are not seen
/// until a new cache is created.
#[derive(Debug, Default)]
pub struct SheetIdCache {
    tables: Mutex<HashMap<String, Arc<SheetIds>>>,
}

impl SheetIdCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached title table, if one has been stored
    pub fn get(&self, spreadsheet_id: &str) -> Option<Arc<SheetIds>> {
        self.lock().get(spreadsheet_id).cloned()
    }

    /// Store the table of `spreadsheet_id`, replacing any earlier one.
    pub fn insert(&self, spreadsheet_id: &str, ids: SheetIds) -> Arc<SheetIds> {
        let ids = Arc::new(ids);
        self.lock()
            .insert(spreadsheet_id.to_string(), Arc::clone(&ids));
        ids
    }

    /// Whether a table is cached for the spreadsheet
    pub fn is_populated(&self, spreadsheet_id: &str) -> bool {
        self.lock().contains_key(spreadsheet_id)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<SheetIds>>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let cache = SheetIdCache::new();
        assert!(!cache.is_populated("abc"));
        assert!(cache.get("abc").is_none());

        cache.insert("abc", HashMap::from([("Sheet1".to_string(), 0)]));
        assert!(cache.is_populated("abc"));
        assert_eq!(cache.get("abc").unwrap().get("Sheet1"), Some(&0));
        assert!(!cache.is_populated("other"));
    }
}
