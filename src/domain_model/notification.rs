use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationContent {
    pub subject: String,
    pub content_type: String,
    pub body: String,
}

impl NotificationContent {
    /// Warning sent when a session is refreshed from an address other than
    /// the one it was issued to.
    pub fn refresh_from_new_ip(previous_ip: &str, new_ip: &str, at: DateTime<Utc>) -> Self {
        let time = at.format("%Y-%m-%d %H:%M:%S");
        NotificationContent {
            subject: "Sign-in from a new IP address".to_string(),
            content_type: "text/plain".to_string(),
            body: format!(
                "Your account session was refreshed from a new IP address.\n\
                 Time: {time} (UTC)\n\
                 Previous IP address: {previous_ip}\n\
                 New IP address: {new_ip}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn new_ip_warning_mentions_both_addresses_and_time() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 17, 4, 5).unwrap();
        let content = NotificationContent::refresh_from_new_ip("1.1.1.1", "2.2.2.2", at);

        assert_eq!(content.content_type, "text/plain");
        assert!(content.body.contains("2024-03-09 17:04:05 (UTC)"));
        assert!(content.body.contains("Previous IP address: 1.1.1.1"));
        assert!(content.body.contains("New IP address: 2.2.2.2"));
    }
}
