use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};

/// Daraja timestamps are in East Africa Time, UTC+3
pub const EAT_OFFSET_SECONDS: i32 = 3 * 3600;

const MPESA_TIME_FORMAT: &str = "%Y%m%d%H%M%S";

fn eat() -> FixedOffset {
    FixedOffset::east_opt(EAT_OFFSET_SECONDS).unwrap_or_else(|| Utc.fix())
}

/// The `YYYYMMDDHHmmss` timestamp Daraja expects with every STK request.
pub fn mpesa_timestamp(now: DateTime<Utc>) -> String {
    now.with_timezone(&eat()).format(MPESA_TIME_FORMAT).to_string()
}

/// The STK password: `base64(shortcode + passkey + timestamp)`.
pub fn stk_password(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    base64::encode(format!("{shortcode}{passkey}{timestamp}"))
}

/// Parses an M-Pesa `YYYYMMDDHHmmss` time, given in East Africa Time.
pub fn parse_mpesa_time(s: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s.trim(), MPESA_TIME_FORMAT).ok()?;
    eat().from_local_datetime(&naive).single().map(|t| t.with_timezone(&Utc))
}
