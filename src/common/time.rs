use chrono::{SecondsFormat, Utc};

/// Current time as an ISO 8601 string with millisecond precision, e.g. `2024-05-01T10:00:00.000Z`
pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// First 50 characters of a device token, for logs
pub fn token_preview(token: &str) -> String {
    let preview = token.chars().take(50).collect::<String>();
    if preview.len() < token.len() {
        format!("{}...", preview)
    } else {
        preview
    }
}
