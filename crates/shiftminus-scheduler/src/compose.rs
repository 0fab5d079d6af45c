//! Shortfall message composition.
//!
//! Records are grouped by exact category and rendered one line per slot:
//! `"{MM/DD} {time range} ▲{count}人{🆘?}"`. The scheduled job and the
//! interactive "send notice" action use different policies:
//!
//! | | group order | line order | banner | sends when |
//! |---|---|---|---|---|
//! | scheduled ([`compose_alert`]) | first seen | as fetched | ⚠️ | any urgent line |
//! | interactive ([`compose_notice`]) | by category | sorted | 🆘 | any record |

use shiftminus_core::types::{Department, ShortfallRecord};

use crate::urgency::UrgencyWindow;

pub const ALERT_BANNER: &str = "⚠️シフトご協力お願いします⚠️";
pub const NOTICE_BANNER: &str = "🆘シフトご協力お願いします🆘";
pub const SEPARATOR: &str = "ーーーーーーーーー";

/// One rendered line for a shortfall slot.
pub fn render_line(record: &ShortfallRecord, window: &UrgencyWindow) -> String {
    format!(
        "{} {} ▲{}人{}",
        record.date_display,
        record.time_range,
        record.minus_count,
        window.suffix(&record.date_display)
    )
}

/// Category → rendered lines, in a policy-defined order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupedNotification {
    groups: Vec<(String, Vec<String>)>,
    urgent: bool,
}

impl GroupedNotification {
    /// Categories in first-seen order, lines in record order.
    pub fn in_arrival_order(records: &[ShortfallRecord], window: &UrgencyWindow) -> Self {
        let mut grouped = Self::default();
        for record in records {
            grouped.urgent |= window.is_urgent(&record.date_display);
            let line = render_line(record, window);
            match grouped.groups.iter_mut().find(|(cat, _)| *cat == record.category) {
                Some((_, lines)) => lines.push(line),
                None => grouped.groups.push((record.category.clone(), vec![line])),
            }
        }
        grouped
    }

    /// Categories sorted by name, lines sorted as strings.
    pub fn sorted(records: &[ShortfallRecord], window: &UrgencyWindow) -> Self {
        let mut grouped = Self::in_arrival_order(records, window);
        grouped.groups.sort_by(|a, b| a.0.cmp(&b.0));
        for (_, lines) in grouped.groups.iter_mut() {
            lines.sort();
        }
        grouped
    }

    pub fn groups(&self) -> &[(String, Vec<String>)] {
        &self.groups
    }

    pub fn has_urgent(&self) -> bool {
        self.urgent
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Banner, groups, separator and the department's contact line.
    pub fn render(&self, banner: &str, department: Department) -> String {
        let mut message = format!("{banner}\n\n");
        for (category, lines) in &self.groups {
            message.push_str(category);
            message.push('\n');
            for line in lines {
                message.push_str(line);
                message.push('\n');
            }
            message.push('\n');
        }
        message.push_str(SEPARATOR);
        message.push_str("\n\n");
        message.push_str(department.contact_line());
        message.trim().to_string()
    }
}

/// Scheduled-job message. `None` unless at least one line is urgent.
pub fn compose_alert(
    records: &[ShortfallRecord],
    window: &UrgencyWindow,
    department: Department,
) -> Option<String> {
    let grouped = GroupedNotification::in_arrival_order(records, window);
    grouped
        .has_urgent()
        .then(|| grouped.render(ALERT_BANNER, department))
}

/// Interactive message. `None` only when there are no records at all.
pub fn compose_notice(
    records: &[ShortfallRecord],
    window: &UrgencyWindow,
    department: Department,
) -> Option<String> {
    let grouped = GroupedNotification::sorted(records, window);
    (!grouped.is_empty()).then(|| grouped.render(NOTICE_BANNER, department))
}
