//! In-memory client record cache.
//!
//! The cache holds one immutable [`CacheSnapshot`] behind an `Arc`. A refresh
//! builds a complete new snapshot first and then swaps the pointer, so
//! readers always see either the old or the new snapshot, never a mix.
//! Each snapshot also carries the id → sheet row index built from the very
//! rows it was made of; store writes go through that index.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use subclaw_core::phone::to_digits;
use subclaw_core::types::{ClientRecord, id_key};

use crate::records::{is_blank_row, record_from_row};

/// One complete, consistent view of the backing sheet.
#[derive(Debug, Default)]
pub struct CacheSnapshot {
    records: Vec<ClientRecord>,
    /// [`id_key`] → 1-based sheet row.
    rows: HashMap<String, u32>,
    loaded_at: Option<DateTime<Utc>>,
}

impl CacheSnapshot {
    /// Map raw sheet rows. `first_data_row` is the sheet row number of `rows[0]`.
    /// Blank rows are skipped; with duplicate ids the first row wins.
    pub fn from_rows(rows: &[Vec<String>], first_data_row: u32, loaded_at: DateTime<Utc>) -> Self {
        let mut records = Vec::with_capacity(rows.len());
        let mut index = HashMap::with_capacity(rows.len());

        for (offset, row) in rows.iter().enumerate() {
            if is_blank_row(row) {
                continue;
            }
            let record = record_from_row(row);
            if !record.id.is_empty() {
                let key = id_key(&record.id);
                let sheet_row = first_data_row + offset as u32;
                if let Some(existing) = index.get(&key) {
                    tracing::warn!(
                        "⚠️ Duplicate client id '{}' at row {} (keeping row {})",
                        record.id,
                        sheet_row,
                        existing
                    );
                } else {
                    index.insert(key, sheet_row);
                }
            }
            records.push(record);
        }

        Self {
            records,
            rows: index,
            loaded_at: Some(loaded_at),
        }
    }

    pub fn records(&self) -> &[ClientRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// When this snapshot was read. `None` until the first refresh.
    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.loaded_at
    }

    /// Case-insensitive exact id match; first match wins.
    pub fn find_by_id(&self, id: &str) -> Option<&ClientRecord> {
        let id = id.trim();
        if id.is_empty() {
            return None;
        }
        self.records.iter().find(|c| c.id_matches(id))
    }

    /// Sheet row holding the client with this id.
    pub fn row_of(&self, id: &str) -> Option<u32> {
        self.rows.get(&id_key(id)).copied()
    }

    /// Case-insensitive substring on name, or digit substring on phone.
    /// A query without digits never matches on phone.
    pub fn search(&self, query: &str) -> Vec<&ClientRecord> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let needle_digits = to_digits(&needle);

        self.records
            .iter()
            .filter(|c| {
                c.name.to_lowercase().contains(&needle)
                    || (!needle_digits.is_empty() && to_digits(&c.phone).contains(&needle_digits))
            })
            .collect()
    }
}

/// Single-writer, many-reader holder of the current snapshot.
#[derive(Debug, Default)]
pub struct ClientCache {
    current: RwLock<Arc<CacheSnapshot>>,
}

impl ClientCache {
    /// Empty cache; populated by the first refresh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot. Cheap: clones an `Arc`.
    pub fn snapshot(&self) -> Arc<CacheSnapshot> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Swap in a fully built snapshot.
    pub fn replace(&self, snapshot: CacheSnapshot) {
        let snapshot = Arc::new(snapshot);
        match self.current.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    pub fn find_by_id(&self, id: &str) -> Option<ClientRecord> {
        self.snapshot().find_by_id(id).cloned()
    }

    pub fn search(&self, query: &str) -> Vec<ClientRecord> {
        self.snapshot().search(query).into_iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::client_row;

    fn snapshot() -> CacheSnapshot {
        let rows = vec![
            client_row("C1", "Ana Pérez", "809-555-1234", "15/01/2024", 100.0, 200.0),
            client_row("C2", "Luis Gómez", "(829) 555-0000", "", 0.0, 0.0),
            vec![String::new(); 3],
            client_row("c1", "Duplicate Ana", "8095559999", "", 0.0, 0.0),
            client_row("C3", "Ana María", "", "01/02/2024", 0.0, 0.0),
        ];
        CacheSnapshot::from_rows(&rows, 2, Utc::now())
    }

    #[test]
    fn test_from_rows_skips_blank_and_indexes_rows() {
        let snap = snapshot();
        assert_eq!(snap.len(), 4);
        assert_eq!(snap.row_of("C1"), Some(2));
        assert_eq!(snap.row_of("c2"), Some(3));
        // Blank row 4 skipped, duplicate at row 5 ignored in the index.
        assert_eq!(snap.row_of("C3"), Some(6));
        assert_eq!(snap.row_of("nope"), None);
    }

    #[test]
    fn test_find_by_id_first_match() {
        let snap = snapshot();
        assert_eq!(snap.find_by_id("c1").unwrap().name, "Ana Pérez");
        assert_eq!(snap.find_by_id(" C2 ").unwrap().name, "Luis Gómez");
        assert!(snap.find_by_id("").is_none());
        assert!(snap.find_by_id("C9").is_none());
    }

    #[test]
    fn test_non_ascii_id_resolves_in_both_lookups() {
        let rows = vec![client_row("É1", "Élena", "8095550001", "", 0.0, 0.0)];
        let snap = CacheSnapshot::from_rows(&rows, 2, Utc::now());
        assert_eq!(snap.find_by_id("é1").map(|c| c.name.as_str()), Some("Élena"));
        assert_eq!(snap.row_of("é1"), Some(2));
    }

    #[test]
    fn test_search_by_name_and_phone() {
        let snap = snapshot();
        let names: Vec<&str> = snap.search("ana").iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Ana Pérez", "Duplicate Ana", "Ana María"]);

        let by_phone = snap.search("829-555");
        assert_eq!(by_phone.len(), 1);
        assert_eq!(by_phone[0].id, "C2");

        assert!(snap.search("   ").is_empty());
        assert!(snap.search("zzz").is_empty());
    }

    #[test]
    fn test_replace_is_wholesale() {
        let cache = ClientCache::new();
        assert!(cache.is_empty());
        assert!(cache.snapshot().loaded_at().is_none());

        cache.replace(snapshot());
        let before = cache.snapshot();
        assert_eq!(cache.len(), 4);

        let rows = vec![client_row("N1", "Nuevo", "8095550001", "", 0.0, 0.0)];
        cache.replace(CacheSnapshot::from_rows(&rows, 2, Utc::now()));
        assert_eq!(cache.len(), 1);
        assert!(cache.find_by_id("C1").is_none());
        assert_eq!(cache.find_by_id("n1").unwrap().name, "Nuevo");
        // Readers holding the old snapshot keep a consistent view.
        assert_eq!(before.len(), 4);
    }
}
