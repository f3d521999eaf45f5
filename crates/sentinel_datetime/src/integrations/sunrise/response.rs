use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde::Serialize;

/// Body of a sunrise-sunset.org response requested with `formatted=0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SunriseResponse {
    /// `None` when the service rejects the request; it then sends `"results": ""`
    #[serde(default, deserialize_with = "results_object")]
    pub results: Option<SunTimes>,

    /// Service status, e.g. "OK" or "INVALID_REQUEST"
    #[serde(default)]
    pub status: Option<String>,
}

/// The two instants the composer uses; other fields of `results` are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SunTimes {
    pub sunrise: SunInstant,
    pub sunset: SunInstant,
}

/// An RFC 3339 instant together with the text it was parsed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SunInstant {
    raw: String,
    at: DateTime<FixedOffset>,
}

impl SunInstant {
    pub fn at(&self) -> DateTime<FixedOffset> {
        self.at
    }

    /// The instant as the service wrote it
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl TryFrom<String> for SunInstant {
    type Error = chrono::ParseError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        let at = DateTime::parse_from_rfc3339(&raw)?;
        Ok(Self { raw, at })
    }
}

impl From<SunInstant> for String {
    fn from(instant: SunInstant) -> Self {
        instant.raw
    }
}

fn results_object<'de, D>(deserializer: D) -> Result<Option<SunTimes>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error as _;

    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_object() {
        serde_json::from_value(value).map(Some).map_err(D::Error::custom)
    } else {
        Ok(None)
    }
}
