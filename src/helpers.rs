use crate::notifications::Notification;
use chrono::{DateTime, Utc};
use colored::Colorize;
use once_cell::sync::Lazy;

pub static SUCCESS: Lazy<colored::ColoredString> = Lazy::new(|| "[LOVELINK]".green());
pub static FAIL: Lazy<colored::ColoredString> = Lazy::new(|| "[LOVELINK]".red());
pub static WARN: Lazy<colored::ColoredString> = Lazy::new(|| "[LOVELINK]".yellow());
pub static INFO: Lazy<colored::ColoredString> = Lazy::new(|| "[LOVELINK]".cyan());

// Time constants for duration formatting
const SECONDS_IN_DAY: i64 = 24 * 60 * 60;
const SECONDS_IN_HOUR: i64 = 60 * 60;
const SECONDS_IN_MINUTE: i64 = 60;

/// Relative age of a timestamp, e.g. `5m ago`
pub fn format_age(datetime: DateTime<Utc>, now: DateTime<Utc>) -> String {
    match now.signed_duration_since(datetime).num_seconds() {
        s if s >= SECONDS_IN_DAY => format!("{}d ago", s / SECONDS_IN_DAY),
        s if s >= SECONDS_IN_HOUR => format!("{}h ago", s / SECONDS_IN_HOUR),
        s if s >= SECONDS_IN_MINUTE => format!("{}m ago", s / SECONDS_IN_MINUTE),
        s if s > 0 => format!("{}s ago", s),
        _ => "just now".to_string(),
    }
}

pub fn format_notification(notification: &Notification, now: DateTime<Utc>) -> String {
    format!(
        "{} {}",
        notification.payload.summary(),
        format!("({})", format_age(notification.received_at, now)).dimmed()
    )
}

/// Badge text for the unread counter, capped for display only
pub fn format_unread(count: u64) -> String {
    match count {
        0 => "no unread".to_string(),
        1..=99 => format!("{count} unread"),
        _ => "99+ unread".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_format_age_seconds() {
        let now = Utc::now();
        assert_eq!(format_age(now - Duration::seconds(30), now), "30s ago");
    }

    #[test]
    fn test_format_age_just_now() {
        let now = Utc::now();
        assert_eq!(format_age(now, now), "just now");
        // clock skew from the server should not produce negative ages
        assert_eq!(format_age(now + Duration::seconds(5), now), "just now");
    }

    #[test]
    fn test_format_age_minutes() {
        let now = Utc::now();
        assert_eq!(format_age(now - Duration::minutes(5), now), "5m ago");
    }

    #[test]
    fn test_format_age_hours() {
        let now = Utc::now();
        assert_eq!(format_age(now - Duration::hours(3), now), "3h ago");
    }

    #[test]
    fn test_format_age_days() {
        let now = Utc::now();
        assert_eq!(format_age(now - Duration::days(10), now), "10d ago");
    }

    #[test]
    fn test_format_unread() {
        assert_eq!(format_unread(0), "no unread");
        assert_eq!(format_unread(7), "7 unread");
        assert_eq!(format_unread(99), "99 unread");
        assert_eq!(format_unread(250), "99+ unread");
    }

    #[test]
    fn test_format_notification_contains_summary() {
        colored::control::set_override(false);
        let now = Utc::now();
        let notification = Notification {
            received_at: now - Duration::minutes(2),
            payload: crate::notifications::Payload::decode(serde_json::json!({"message": "hello"})),
        };
        assert_eq!(format_notification(&notification, now), "hello (2m ago)");
    }
}
