use serde::Deserialize;
use serde::Serialize;

/// Latest computed time data for the timer device.
///
/// Date/time fields are strings on the wire; hub consumers expect them that way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    /// Current instant, ISO-8601 with seconds and numeric offset.
    pub now: String,

    /// `YYYY-MM-DD` in the configured timezone.
    pub date: String,

    #[serde(flatten)]
    pub weekday: Weekday,

    /// ISO week number, unpadded.
    pub week: String,

    /// `HH:MM:SS`
    pub time: String,

    /// Unix seconds.
    pub epoch: String,

    /// IANA timezone identifier.
    pub tz: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunrise: Option<SunEvent>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunset: Option<SunEvent>,

    /// `sunrise <= now <= sunset`; only present alongside sunrise/sunset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_time: Option<bool>,
}

/// ISO weekday (`"1"` = Monday .. `"7"` = Sunday), keyed by profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Weekday {
    #[serde(rename = "dayOfWeek")]
    DayOfWeek(String),
    #[serde(rename = "day")]
    Day(String),
}

impl Weekday {
    pub fn value(&self) -> &str {
        match self {
            Weekday::DayOfWeek(v) | Weekday::Day(v) => v,
        }
    }
}

/// A sunrise or sunset entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SunEvent {
    /// Event instant in the configured timezone plus whole minutes until it
    /// (negative once passed).
    Relative { event: String, minutes: i64 },
    /// Instant exactly as the sunrise service returned it.
    Raw(String),
}
