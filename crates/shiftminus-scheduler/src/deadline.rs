//! Submission deadline state machine.
//!
//! The deadline table has no uniqueness constraint, so concurrent writers
//! can leave several rows behind. Every read collapses the table back to
//! at most one row: the newest one, and only while it has not passed.
//!
//! ```text
//!            update(d)                    read(today), d < today
//!   Absent ───────────▶ Active(d) ───────────────────────────▶ Absent
//!                         ▲  │ read(today): purge all but newest
//!                         └──┘
//! ```

use chrono::NaiveDate;
use serde::Serialize;
use shiftminus_core::error::Result;
use shiftminus_core::traits::{DeadlineStore, Messenger};
use shiftminus_core::types::{DeadlineRecord, Delivery, PushTarget};

use crate::reminder::{REMINDER_DAYS, announcement_text, reminder_text};

/// Logical deadline state after collapsing the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "deadline", rename_all = "snake_case")]
pub enum DeadlineState {
    Absent,
    Active(NaiveDate),
}

impl DeadlineState {
    pub fn deadline(&self) -> Option<NaiveDate> {
        match self {
            DeadlineState::Absent => None,
            DeadlineState::Active(d) => Some(*d),
        }
    }

    pub fn days_left(&self, today: NaiveDate) -> Option<i64> {
        self.deadline().map(|d| (d - today).num_days())
    }
}

/// A reminder that was due and what happened to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reminder {
    pub days_left: i64,
    pub delivery: Delivery,
}

/// Read/update/remind over a [`DeadlineStore`].
pub struct DeadlineBoard<'a> {
    store: &'a dyn DeadlineStore,
}

impl<'a> DeadlineBoard<'a> {
    pub fn new(store: &'a dyn DeadlineStore) -> Self {
        Self { store }
    }

    /// Current state, purging stale and duplicate rows on the way.
    pub async fn read(&self, today: NaiveDate) -> Result<DeadlineState> {
        let rows = self.store.deadlines().await?;
        let Some(latest) = rows.first() else {
            return Ok(DeadlineState::Absent);
        };

        if latest.deadline < today {
            tracing::info!("🗑️ Deadline {} has passed, clearing", latest.deadline);
            self.purge(&rows).await;
            return Ok(DeadlineState::Absent);
        }

        if rows.len() > 1 {
            tracing::debug!("Collapsing {} duplicate deadline rows", rows.len() - 1);
            self.purge(&rows[1..]).await;
        }
        Ok(DeadlineState::Active(latest.deadline))
    }

    /// Replace whatever is stored with a single row for `deadline`.
    pub async fn update(&self, deadline: NaiveDate) -> Result<()> {
        if let Err(e) = self.store.delete_all_deadlines().await {
            tracing::warn!("⚠️ Clearing old deadlines failed: {e}");
        }
        self.store.insert_deadline(deadline).await?;
        tracing::info!("📅 Submission deadline set to {deadline}");
        Ok(())
    }

    /// Send the day-3/2/1 reminder if one is due today.
    pub async fn reminder_check(
        &self,
        today: NaiveDate,
        messenger: &dyn Messenger,
        target: &PushTarget,
        contact_name: &str,
    ) -> Result<Option<Reminder>> {
        let Some(days_left) = self.read(today).await?.days_left(today) else {
            return Ok(None);
        };
        if !REMINDER_DAYS.contains(&days_left) {
            return Ok(None);
        }
        let Some(text) = reminder_text(days_left, contact_name) else {
            return Ok(None);
        };
        let delivery = messenger.send(target, &text).await;
        tracing::info!("📅 Deadline reminder ({days_left} days left): {delivery:?}");
        Ok(Some(Reminder { days_left, delivery }))
    }

    /// Announce the current deadline. `None` when there is none.
    pub async fn announce(
        &self,
        today: NaiveDate,
        messenger: &dyn Messenger,
        target: &PushTarget,
    ) -> Result<Option<Delivery>> {
        let DeadlineState::Active(deadline) = self.read(today).await? else {
            return Ok(None);
        };
        Ok(Some(messenger.send(target, &announcement_text(deadline)).await))
    }

    /// Best-effort deletes; a failed delete is retried by the next read.
    async fn purge(&self, rows: &[DeadlineRecord]) {
        for row in rows {
            if let Err(e) = self.store.delete_deadline(row.id).await {
                tracing::warn!("⚠️ Failed to delete deadline row {}: {e}", row.id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingMessenger;
    use chrono::Days;
    use shiftminus_store::MemoryStore;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 10).unwrap()
    }

    fn target() -> PushTarget {
        PushTarget::new("C-deadline", "tok-sales")
    }

    #[tokio::test]
    async fn test_empty_table_is_absent() {
        let store = MemoryStore::new();
        let board = DeadlineBoard::new(&store);
        assert_eq!(board.read(today()).await.unwrap(), DeadlineState::Absent);
    }

    #[tokio::test]
    async fn test_read_collapses_to_newest() {
        let store = MemoryStore::new();
        store.seed_deadline(today() + Days::new(10));
        store.seed_deadline(today() + Days::new(2));
        let newest = store.seed_deadline(today() + Days::new(5));

        let board = DeadlineBoard::new(&store);
        let first = board.read(today()).await.unwrap();
        assert_eq!(first, DeadlineState::Active(today() + Days::new(5)));
        let rows = store.deadline_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, newest);

        let second = board.read(today()).await.unwrap();
        assert_eq!(second, first);
        assert_eq!(store.deadline_rows().len(), 1);
    }

    #[tokio::test]
    async fn test_expired_newest_clears_everything() {
        let store = MemoryStore::new();
        store.seed_deadline(today() + Days::new(3));
        store.seed_deadline(today() - Days::new(1));

        let board = DeadlineBoard::new(&store);
        assert_eq!(board.read(today()).await.unwrap(), DeadlineState::Absent);
        assert!(store.deadline_rows().is_empty());
    }

    #[tokio::test]
    async fn test_deadline_today_is_still_active() {
        let store = MemoryStore::new();
        store.seed_deadline(today());
        let board = DeadlineBoard::new(&store);
        assert_eq!(board.read(today()).await.unwrap(), DeadlineState::Active(today()));
    }

    #[tokio::test]
    async fn test_update_then_read() {
        let store = MemoryStore::new();
        store.seed_deadline(today() + Days::new(1));
        store.seed_deadline(today() + Days::new(9));

        let board = DeadlineBoard::new(&store);
        let new_date = today() + Days::new(20);
        board.update(new_date).await.unwrap();
        assert_eq!(board.read(today()).await.unwrap(), DeadlineState::Active(new_date));
        assert_eq!(store.deadline_rows().len(), 1);
    }

    #[tokio::test]
    async fn test_update_fails_when_insert_rejected() {
        let store = MemoryStore::new();
        store.reject_deadline_inserts(true);
        let board = DeadlineBoard::new(&store);
        assert!(board.update(today() + Days::new(5)).await.is_err());
        assert_eq!(board.read(today()).await.unwrap(), DeadlineState::Absent);
    }

    #[tokio::test]
    async fn test_reminder_three_days_out() {
        let store = MemoryStore::new();
        store.seed_deadline(today() + Days::new(3));
        let messenger = RecordingMessenger::new();

        let board = DeadlineBoard::new(&store);
        let reminder = board
            .reminder_check(today(), &messenger, &target(), "宮内")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reminder.days_left, 3);

        let sent = messenger.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, target());
        assert_eq!(sent[0].1, reminder_text(3, "宮内").unwrap());
    }

    #[tokio::test]
    async fn test_no_reminder_outside_window() {
        for offset in [0u64, 4] {
            let store = MemoryStore::new();
            store.seed_deadline(today() + Days::new(offset));
            let messenger = RecordingMessenger::new();

            let board = DeadlineBoard::new(&store);
            let reminder = board
                .reminder_check(today(), &messenger, &target(), "宮内")
                .await
                .unwrap();
            assert!(reminder.is_none());
            assert!(messenger.sent().is_empty());
        }
    }

    #[tokio::test]
    async fn test_announce() {
        let store = MemoryStore::new();
        let messenger = RecordingMessenger::new();
        let board = DeadlineBoard::new(&store);
        assert!(board.announce(today(), &messenger, &target()).await.unwrap().is_none());

        store.seed_deadline(NaiveDate::from_ymd_opt(2025, 7, 25).unwrap());
        let delivery = board.announce(today(), &messenger, &target()).await.unwrap();
        assert!(delivery.unwrap().is_sent());
        assert!(messenger.sent()[0].1.contains("【7/25】"));
    }
}
