//! Scheduled notification job.
//!
//! One run, strictly in order, no rollback:
//! 1. deadline reminder check
//! 2. delete shortfalls dated before today
//! 3. fetch shortfalls from today on
//! 4. partition by department
//! 5. compose the alert per department
//! 6. send it if anything is urgent, then pause before the next department
//!
//! A failing step is logged and the run carries on.

use chrono::NaiveDate;
use serde::Serialize;
use shiftminus_core::types::{Delivery, Department, ShortfallRecord};
use std::time::Duration;

use crate::compose::compose_alert;
use crate::deadline::{DeadlineBoard, Reminder};
use crate::services::Services;
use crate::urgency::UrgencyWindow;

/// What a run did, for logging and the trigger response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub today: Option<NaiveDate>,
    /// Messaging channel the run pushed through.
    pub channel: String,
    pub reminder: Option<Reminder>,
    pub cleaned: bool,
    pub open_shortfalls: usize,
    pub notified: Vec<(Department, Delivery)>,
}

pub struct NotifyJob {
    services: Services,
    department_gap: Duration,
}

impl NotifyJob {
    pub fn new(services: Services) -> Self {
        let department_gap = Duration::from_secs(services.config.job.department_gap_secs);
        Self {
            services,
            department_gap,
        }
    }

    /// Override the pause between department sends.
    pub fn with_department_gap(mut self, gap: Duration) -> Self {
        self.department_gap = gap;
        self
    }

    pub async fn run(&self, today: NaiveDate) -> JobReport {
        let channel = self.services.messenger.channel_name().to_string();
        tracing::info!("🚀 Notify job started for {today} via {channel}");
        let mut report = JobReport {
            today: Some(today),
            channel,
            ..JobReport::default()
        };
        let config = &self.services.config;

        let board = DeadlineBoard::new(self.services.deadlines.as_ref());
        match board
            .reminder_check(
                today,
                self.services.messenger.as_ref(),
                &config.deadline_target(),
                &config.deadline.contact_name,
            )
            .await
        {
            Ok(reminder) => report.reminder = reminder,
            Err(e) => tracing::warn!("⚠️ Deadline reminder check failed: {e}"),
        }

        match self.services.shortfalls.delete_shortfalls_before(today).await {
            Ok(()) => {
                tracing::info!("🧹 Removed shortfalls dated before {today}");
                report.cleaned = true;
            }
            Err(e) => tracing::warn!("⚠️ Shortfall cleanup failed: {e}"),
        }

        let records = match self.services.shortfalls.shortfalls_from(today).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("⚠️ Fetching shortfalls failed: {e}");
                Vec::new()
            }
        };
        report.open_shortfalls = records.len();

        let window = UrgencyWindow::starting(today);
        for department in Department::ALL {
            let own: Vec<ShortfallRecord> = records
                .iter()
                .filter(|r| r.department == department)
                .cloned()
                .collect();
            let Some(message) = compose_alert(&own, &window, department) else {
                tracing::debug!("No urgent shortfalls for {department}");
                continue;
            };
            let delivery = self
                .services
                .messenger
                .send(&config.target(department), &message)
                .await;
            tracing::info!("📨 {department} alert: {delivery:?}");
            report.notified.push((department, delivery));
            tokio::time::sleep(self.department_gap).await;
        }

        tracing::info!("✅ Notify job finished");
        report
    }
}
