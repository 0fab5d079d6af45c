//! Operations staff trigger by hand: registering and filling shortfalls,
//! the on-demand department notice and deadline management.

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use shiftminus_core::error::{Result, ShiftError};
use shiftminus_core::types::{Delivery, Department, NewShortfall, ShortfallRecord};

use crate::compose::compose_notice;
use crate::deadline::{DeadlineBoard, DeadlineState};
use crate::services::Services;
use crate::urgency::UrgencyWindow;

/// Result of a fill update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "remaining", rename_all = "snake_case")]
pub enum FillOutcome {
    /// Count reached zero and the row was deleted.
    Resolved,
    Remaining(u32),
}

pub struct Desk {
    services: Services,
}

impl Desk {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    pub async fn register(
        &self,
        category: &str,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        minus_count: u32,
    ) -> Result<NewShortfall> {
        let category = category.trim();
        if category.is_empty() {
            return Err(ShiftError::Validation("category must not be empty".into()));
        }
        if minus_count == 0 {
            return Err(ShiftError::Validation("shortfall count must be at least 1".into()));
        }
        let new = NewShortfall::build(category, date, start, end, minus_count);
        self.services.shortfalls.insert_shortfall(&new).await?;
        tracing::info!(
            "📝 Registered shortfall {} {} {} ▲{}",
            new.category,
            new.date_display,
            new.time_range,
            new.minus_count
        );
        Ok(new)
    }

    /// Open shortfalls in the department's categories, dated today or later.
    pub async fn open_for(
        &self,
        department: Department,
        today: NaiveDate,
    ) -> Result<Vec<ShortfallRecord>> {
        let categories = self.services.config.categories(department);
        self.services.shortfalls.shortfalls_in(&categories, today).await
    }

    /// Record `filled` helpers against a row currently showing `remaining`.
    pub async fn fill(&self, id: i64, remaining: u32, filled: u32) -> Result<FillOutcome> {
        if filled == 0 || filled > remaining {
            return Err(ShiftError::Validation(format!(
                "filled must be between 1 and {remaining}, got {filled}"
            )));
        }
        let left = remaining - filled;
        if left == 0 {
            self.services.shortfalls.delete_shortfall(id).await?;
            tracing::info!("✅ Shortfall {id} resolved");
            Ok(FillOutcome::Resolved)
        } else {
            self.services.shortfalls.set_minus_count(id, left).await?;
            tracing::info!("✏️ Shortfall {id} now ▲{left}");
            Ok(FillOutcome::Remaining(left))
        }
    }

    /// Push the department's full open list. `None` when it has nothing open.
    pub async fn send_notice(
        &self,
        department: Department,
        today: NaiveDate,
    ) -> Result<Option<Delivery>> {
        let records = self.open_for(department, today).await?;
        let window = UrgencyWindow::starting(today);
        let Some(message) = compose_notice(&records, &window, department) else {
            tracing::info!("No open shortfalls for {department}, notice skipped");
            return Ok(None);
        };
        let target = self.services.config.target(department);
        let delivery = self.services.messenger.send(&target, &message).await;
        tracing::info!("📨 {department} notice: {delivery:?}");
        Ok(Some(delivery))
    }

    pub async fn deadline(&self, today: NaiveDate) -> Result<DeadlineState> {
        self.board().read(today).await
    }

    pub async fn set_deadline(&self, deadline: NaiveDate) -> Result<()> {
        self.board().update(deadline).await
    }

    pub async fn announce_deadline(&self, today: NaiveDate) -> Result<Option<Delivery>> {
        let target = self.services.config.deadline_target();
        self.board()
            .announce(today, self.services.messenger.as_ref(), &target)
            .await
    }

    fn board(&self) -> DeadlineBoard<'_> {
        DeadlineBoard::new(self.services.deadlines.as_ref())
    }
}
