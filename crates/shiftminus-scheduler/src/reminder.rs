//! Fixed deadline message templates.

use chrono::NaiveDate;

/// Days-before-deadline on which a reminder goes out.
pub const REMINDER_DAYS: [i64; 3] = [3, 2, 1];

/// Reminder text for `days_left`, or `None` outside the 3/2/1 window.
pub fn reminder_text(days_left: i64, contact_name: &str) -> Option<String> {
    let footer = format!(
        "提出が遅れる方は、\n\n販売：{contact_name}\n製造：{contact_name}\n\nまで必ず連絡ください！"
    );
    let text = match days_left {
        3 | 2 => format!("⚠️シフト提出締切日まで【あと{days_left}日】です！\n\n{footer}"),
        1 => format!(
            "⚠️【明日】がシフト提出締切日です！\nまだ提出していない方は提出お願いします🙇‍♀️\n\n{footer}"
        ),
        _ => return None,
    };
    Some(text)
}

/// Manual announcement of the current deadline, `M/D` without padding.
pub fn announcement_text(deadline: NaiveDate) -> String {
    format!(
        "⚠️シフト提出締切日は\n【{}】です！\n提出遅れないようにお願いします🙇‍♀️",
        deadline.format("%-m/%-d")
    )
}
