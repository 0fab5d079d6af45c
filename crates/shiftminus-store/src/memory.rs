//! In-process store with the same filtered-CRUD semantics as the hosted
//! tables. Used by the scheduler and gateway test suites.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use shiftminus_core::error::{Result, ShiftError};
use shiftminus_core::traits::{DeadlineStore, ShortfallStore};
use shiftminus_core::types::{DeadlineRecord, NewShortfall, ShortfallRecord};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
struct Tables {
    shortfalls: Vec<ShortfallRecord>,
    deadlines: Vec<DeadlineRecord>,
    next_id: i64,
    /// Logical clock for `created_at`, one second per insert.
    ticks: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn next_created_at(&mut self) -> DateTime<Utc> {
        self.ticks += 1;
        DateTime::<Utc>::default() + Duration::seconds(self.ticks)
    }
}

/// Mutex-guarded in-memory tables.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    reject_deadline_inserts: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| ShiftError::Store("memory store poisoned".into()))
    }

    /// Insert a shortfall row directly, returning its id.
    pub fn seed_shortfall(
        &self,
        category: &str,
        date_display: &str,
        date_origin: NaiveDate,
        time_range: &str,
        minus_count: u32,
    ) -> i64 {
        let mut t = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        let id = t.next_id();
        t.shortfalls.push(ShortfallRecord::new(
            id,
            category,
            date_display,
            date_origin,
            time_range,
            minus_count,
        ));
        id
    }

    /// Insert a deadline row directly, bypassing the state machine. Lets
    /// callers reproduce the duplicates concurrent writers leave behind.
    pub fn seed_deadline(&self, deadline: NaiveDate) -> i64 {
        let mut t = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        let id = t.next_id();
        let created_at = t.next_created_at();
        t.deadlines.push(DeadlineRecord { id, deadline, created_at });
        id
    }

    /// Make subsequent deadline inserts answer as if the store refused them.
    pub fn reject_deadline_inserts(&self, reject: bool) {
        self.reject_deadline_inserts.store(reject, Ordering::SeqCst);
    }

    pub fn shortfall_rows(&self) -> Vec<ShortfallRecord> {
        self.tables
            .lock()
            .map(|t| t.shortfalls.clone())
            .unwrap_or_default()
    }

    pub fn deadline_rows(&self) -> Vec<DeadlineRecord> {
        self.tables
            .lock()
            .map(|t| t.deadlines.clone())
            .unwrap_or_default()
    }
}

fn sorted_by_date(mut rows: Vec<ShortfallRecord>) -> Vec<ShortfallRecord> {
    rows.sort_by_key(|r| r.date_origin);
    rows
}

#[async_trait]
impl ShortfallStore for MemoryStore {
    async fn insert_shortfall(&self, new: &NewShortfall) -> Result<()> {
        let mut t = self.lock()?;
        let id = t.next_id();
        t.shortfalls.push(ShortfallRecord::new(
            id,
            new.category.clone(),
            new.date_display.clone(),
            new.date_origin,
            new.time_range.clone(),
            new.minus_count,
        ));
        Ok(())
    }

    async fn shortfalls_from(&self, from: NaiveDate) -> Result<Vec<ShortfallRecord>> {
        let t = self.lock()?;
        Ok(sorted_by_date(
            t.shortfalls.iter().filter(|r| r.date_origin >= from).cloned().collect(),
        ))
    }

    async fn shortfalls_in(
        &self,
        categories: &[String],
        from: NaiveDate,
    ) -> Result<Vec<ShortfallRecord>> {
        let t = self.lock()?;
        Ok(sorted_by_date(
            t.shortfalls
                .iter()
                .filter(|r| r.date_origin >= from && categories.contains(&r.category))
                .cloned()
                .collect(),
        ))
    }

    async fn set_minus_count(&self, id: i64, minus_count: u32) -> Result<()> {
        let mut t = self.lock()?;
        // Like PostgREST, patching a missing row is not an error.
        if let Some(row) = t.shortfalls.iter_mut().find(|r| r.id == id) {
            row.minus_count = minus_count;
        }
        Ok(())
    }

    async fn delete_shortfall(&self, id: i64) -> Result<()> {
        self.lock()?.shortfalls.retain(|r| r.id != id);
        Ok(())
    }

    async fn delete_shortfalls_before(&self, before: NaiveDate) -> Result<()> {
        self.lock()?.shortfalls.retain(|r| r.date_origin >= before);
        Ok(())
    }
}

#[async_trait]
impl DeadlineStore for MemoryStore {
    async fn deadlines(&self) -> Result<Vec<DeadlineRecord>> {
        let mut rows = self.lock()?.deadlines.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn delete_deadline(&self, id: i64) -> Result<()> {
        self.lock()?.deadlines.retain(|r| r.id != id);
        Ok(())
    }

    async fn delete_all_deadlines(&self) -> Result<()> {
        self.lock()?.deadlines.clear();
        Ok(())
    }

    async fn insert_deadline(&self, deadline: NaiveDate) -> Result<()> {
        if self.reject_deadline_inserts.load(Ordering::SeqCst) {
            return Err(ShiftError::Store("deadline insert returned 409 Conflict".into()));
        }
        let mut t = self.lock()?;
        let id = t.next_id();
        let created_at = t.next_created_at();
        t.deadlines.push(DeadlineRecord { id, deadline, created_at });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_filters_and_order() {
        let store = MemoryStore::new();
        store.seed_shortfall("製造", "07/12", date(7, 12), "09:00〜13:00", 1);
        store.seed_shortfall("販売", "07/10", date(7, 10), "09:00〜13:00", 2);
        store.seed_shortfall("販売", "07/09", date(7, 9), "09:00〜13:00", 1);

        let from = store.shortfalls_from(date(7, 10)).await.unwrap();
        assert_eq!(from.len(), 2);
        assert_eq!(from[0].date_display, "07/10");

        let sales = store.shortfalls_in(&["販売".to_string()], date(7, 10)).await.unwrap();
        assert_eq!(sales.len(), 1);

        store.delete_shortfalls_before(date(7, 10)).await.unwrap();
        assert_eq!(store.shortfall_rows().len(), 2);
    }

    #[tokio::test]
    async fn test_deadlines_newest_first() {
        let store = MemoryStore::new();
        let old = store.seed_deadline(date(7, 20));
        let new = store.seed_deadline(date(7, 25));
        let rows = store.deadlines().await.unwrap();
        assert_eq!(rows[0].id, new);
        assert_eq!(rows[1].id, old);
    }

    #[tokio::test]
    async fn test_rejected_insert() {
        let store = MemoryStore::new();
        store.reject_deadline_inserts(true);
        assert!(store.insert_deadline(date(7, 20)).await.is_err());
        assert!(store.deadline_rows().is_empty());
    }
}
