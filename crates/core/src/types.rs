/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// A calendar day, serialized as an ISO `YYYY-MM-DD` string.
pub type DayKey = chrono::NaiveDate;
