//! Domain types: departments, shortfall rows, deadline rows, push targets.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ShiftError;

/// One of the two fixed departments notifications are routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Department {
    Sales,
    Manufacturing,
}

impl Department {
    /// Processing order for the scheduled job.
    pub const ALL: [Department; 2] = [Department::Sales, Department::Manufacturing];

    /// Japanese label, also the substring categories are matched against.
    pub fn label(self) -> &'static str {
        match self {
            Department::Sales => "販売",
            Department::Manufacturing => "製造",
        }
    }

    /// Ingestion-time routing: a category mentioning 販売 belongs to sales,
    /// everything else falls through to manufacturing.
    pub fn classify(category: &str) -> Self {
        if category.contains(Department::Sales.label()) {
            Department::Sales
        } else {
            Department::Manufacturing
        }
    }

    /// Closing line appended to every shortfall message for this department.
    pub fn contact_line(self) -> &'static str {
        match self {
            Department::Sales => "ヘルプ可能な方は【販売】のグループLINEへ連絡お願いします🙇‍♀️",
            Department::Manufacturing => {
                "ヘルプ可能な方は【製造】のグループLINEへ連絡お願いします🙇‍♀️"
            }
        }
    }
}

impl fmt::Display for Department {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Department {
    type Err = ShiftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sales" | "hanbai" | "販売" => Ok(Department::Sales),
            "manufacturing" | "seizou" | "製造" => Ok(Department::Manufacturing),
            other => Err(ShiftError::Validation(format!("Unknown department '{other}'"))),
        }
    }
}

/// A staffing gap: `minus_count` more people are needed for a time range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShortfallRecord {
    pub id: i64,
    pub category: String,
    pub department: Department,
    /// `MM/DD`, compared against the urgency window.
    pub date_display: String,
    pub date_origin: NaiveDate,
    /// `HH:MM〜HH:MM`.
    pub time_range: String,
    pub minus_count: u32,
}

impl ShortfallRecord {
    pub fn new(
        id: i64,
        category: impl Into<String>,
        date_display: impl Into<String>,
        date_origin: NaiveDate,
        time_range: impl Into<String>,
        minus_count: u32,
    ) -> Self {
        let category = category.into();
        Self {
            id,
            department: Department::classify(&category),
            category,
            date_display: date_display.into(),
            date_origin,
            time_range: time_range.into(),
            minus_count,
        }
    }
}

/// Insert payload for a new shortfall row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewShortfall {
    pub category: String,
    pub date_display: String,
    pub date_origin: NaiveDate,
    pub time_range: String,
    pub minus_count: u32,
}

impl NewShortfall {
    /// Derive the display date and time range the way the form did.
    pub fn build(
        category: impl Into<String>,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        minus_count: u32,
    ) -> Self {
        Self {
            category: category.into(),
            date_display: display_date(date),
            date_origin: date,
            time_range: format!("{}〜{}", start.format("%H:%M"), end.format("%H:%M")),
            minus_count,
        }
    }
}

/// A submission deadline row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeadlineRecord {
    pub id: i64,
    pub deadline: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Where a push message goes and whose credential sends it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushTarget {
    pub channel_id: String,
    pub access_token: String,
}

impl PushTarget {
    pub fn new(channel_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            access_token: access_token.into(),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.channel_id.is_empty() && !self.access_token.is_empty()
    }
}

/// Outcome of a push. Failures are reported, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Delivery {
    Sent { attempts: u32 },
    RateLimited { attempts: u32 },
    Failed { status: Option<u16>, attempts: u32 },
    Skipped,
}

impl Delivery {
    pub fn is_sent(&self) -> bool {
        matches!(self, Delivery::Sent { .. })
    }
}

/// `MM/DD`, the display form used by records and the urgency window.
pub fn display_date(date: NaiveDate) -> String {
    date.format("%m/%d").to_string()
}
