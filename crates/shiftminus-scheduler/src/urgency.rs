//! Urgency window: today plus the next three days, in `MM/DD` form.

use chrono::{Days, NaiveDate};
use shiftminus_core::types::display_date;

/// Number of calendar days, today included, that count as urgent.
pub const WINDOW_DAYS: u64 = 4;

/// Marker appended to urgent lines.
pub const URGENT_MARK: &str = "🆘";

/// Display dates considered urgent relative to a given day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrgencyWindow {
    dates: Vec<String>,
}

impl UrgencyWindow {
    /// `today` must already be the date at the configured offset.
    pub fn starting(today: NaiveDate) -> Self {
        let dates = (0..WINDOW_DAYS)
            .map(|i| display_date(today + Days::new(i)))
            .collect();
        Self { dates }
    }

    pub fn dates(&self) -> &[String] {
        &self.dates
    }

    pub fn is_urgent(&self, date_display: &str) -> bool {
        self.dates.iter().any(|d| d == date_display)
    }

    pub fn suffix(&self, date_display: &str) -> &'static str {
        if self.is_urgent(date_display) { URGENT_MARK } else { "" }
    }
}
