//! ledger.rs: in-memory table of every ingested record for the run.
//!
//! Append-only, keyed by `url`. Single writer: the orchestrator owns it and
//! hands out `&mut` per cycle, so there is no lock here. If cycles ever run
//! concurrently, the dedup check + insert + flag update must move behind one
//! lock together.

use std::collections::{BTreeSet, HashMap};

use crate::record::Record;

#[derive(Debug, Default)]
pub struct Ledger {
    records: Vec<Record>,
    by_url: HashMap<String, usize>,
    flagged: BTreeSet<String>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the url is already present. Never overwrites.
    /// Returns true if the record was added.
    pub fn insert(&mut self, record: Record) -> bool {
        if self.by_url.contains_key(&record.url) {
            return false;
        }
        let idx = self.records.len();
        self.by_url.insert(record.url.clone(), idx);
        if record.is_on_front_page() {
            self.flagged.insert(record.url.clone());
        }
        self.records.push(record);
        true
    }

    pub fn contains(&self, url: &str) -> bool {
        self.by_url.contains_key(url)
    }

    pub fn get(&self, url: &str) -> Option<&Record> {
        self.by_url.get(url).map(|&i| &self.records[i])
    }

    /// Flag a record as on the front page. Returns true only on the
    /// false → true transition; unknown urls and already-flagged ones are no-ops.
    pub fn mark_front_page(&mut self, url: &str) -> bool {
        let Some(&i) = self.by_url.get(url) else {
            return false;
        };
        let changed = self.records[i].mark_front_page();
        if changed {
            self.flagged.insert(url.to_string());
        }
        changed
    }

    /// Urls of every record currently flagged. Only ever grows.
    pub fn flagged_ids(&self) -> &BTreeSet<String> {
        &self.flagged
    }

    /// Records in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn rec(url: &str, title: &str) -> Record {
        Record::new(url, title, Utc::now())
    }

    #[test]
    fn duplicate_insert_is_noop_not_overwrite() {
        let mut l = Ledger::new();
        assert!(l.insert(rec("u1", "first")));
        assert!(!l.insert(rec("u1", "second")));
        assert_eq!(l.len(), 1);
        assert_eq!(l.get("u1").unwrap().title, "first");
    }

    #[test]
    fn flag_transition_happens_once() {
        let mut l = Ledger::new();
        l.insert(rec("u1", "a"));
        assert!(l.mark_front_page("u1"));
        assert!(!l.mark_front_page("u1"));
        assert!(!l.mark_front_page("missing"));
        assert!(l.get("u1").unwrap().is_on_front_page());
        assert_eq!(l.flagged_ids().len(), 1);
    }

    #[test]
    fn iteration_keeps_insertion_order() {
        let mut l = Ledger::new();
        for u in ["c", "a", "b"] {
            l.insert(rec(u, u));
        }
        let urls: Vec<_> = l.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, ["c", "a", "b"]);
    }
}
