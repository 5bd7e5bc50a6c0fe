use chrono::NaiveDate;

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Invoice dates are plain calendar dates, stored as `YYYY-MM-DD` text.
pub fn parse_invoice_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}
