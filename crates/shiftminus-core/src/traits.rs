//! Seams to the external collaborators: the hosted data store and the
//! push messaging API.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::types::{DeadlineRecord, Delivery, NewShortfall, PushTarget, ShortfallRecord};

/// Filtered CRUD over the shortfall table.
#[async_trait]
pub trait ShortfallStore: Send + Sync {
    async fn insert_shortfall(&self, new: &NewShortfall) -> Result<()>;

    /// Rows with `date_origin >= from`, ordered by `date_origin`.
    async fn shortfalls_from(&self, from: NaiveDate) -> Result<Vec<ShortfallRecord>>;

    /// Rows whose category is one of `categories`, `date_origin >= from`,
    /// ordered by `date_origin`.
    async fn shortfalls_in(
        &self,
        categories: &[String],
        from: NaiveDate,
    ) -> Result<Vec<ShortfallRecord>>;

    async fn set_minus_count(&self, id: i64, minus_count: u32) -> Result<()>;

    async fn delete_shortfall(&self, id: i64) -> Result<()>;

    /// Delete every row with `date_origin < before`.
    async fn delete_shortfalls_before(&self, before: NaiveDate) -> Result<()>;
}

/// CRUD over the deadline table. The table has no uniqueness constraint.
#[async_trait]
pub trait DeadlineStore: Send + Sync {
    /// All rows, newest `created_at` first.
    async fn deadlines(&self) -> Result<Vec<DeadlineRecord>>;

    async fn delete_deadline(&self, id: i64) -> Result<()>;

    async fn delete_all_deadlines(&self) -> Result<()>;

    /// Errors unless the store confirms the row was created.
    async fn insert_deadline(&self, deadline: NaiveDate) -> Result<()>;
}

/// Pushes a text message to a group channel.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Never fails: the outcome is reported in the returned [`Delivery`].
    async fn send(&self, target: &PushTarget, text: &str) -> Delivery;

    fn channel_name(&self) -> &str;
}
