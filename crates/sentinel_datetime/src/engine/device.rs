use serde::Deserialize;
use serde::Serialize;

use super::status::StatusSnapshot;

/// Name given to the synthetic timer device.
pub const TIMER_NAME: &str = "timer";

/// Device type reported to the hub.
pub const TIMER_TYPE: &str = "system.timer";

/// A device as seen by the hub.
///
/// `current` is only populated when devices are listed; the descriptor stored
/// in the device cache keeps it empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, with = "current_or_empty")]
    pub current: Option<StatusSnapshot>,
}

impl Device {
    /// The single timer device this module exposes.
    pub fn timer(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: TIMER_NAME.to_string(),
            kind: TIMER_TYPE.to_string(),
            current: None,
        }
    }

    pub fn with_current(mut self, status: StatusSnapshot) -> Self {
        self.current = Some(status);
        self
    }
}

/// `None` is written as `{}` so consumers always see an object.
mod current_or_empty {
    use serde::de::Error as _;
    use serde::ser::SerializeMap;
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serialize;
    use serde::Serializer;

    use super::StatusSnapshot;

    pub fn serialize<S: Serializer>(
        current: &Option<StatusSnapshot>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match current {
            Some(status) => status.serialize(serializer),
            None => serializer.serialize_map(Some(0))?.end(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<StatusSnapshot>, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match &value {
            serde_json::Value::Null => Ok(None),
            serde_json::Value::Object(map) if map.is_empty() => Ok(None),
            _ => serde_json::from_value(value).map(Some).map_err(D::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_descriptor_serializes_empty_current() {
        let json = serde_json::to_string(&Device::timer("t-1")).unwrap();
        insta::assert_snapshot!(json, @r#"{"id":"t-1","name":"timer","type":"system.timer","current":{}}"#);
    }

    #[test]
    fn test_descriptor_parses_back() {
        let parsed: Device =
            serde_json::from_str(r#"{"id":"t-1","name":"timer","type":"system.timer","current":{}}"#)
                .unwrap();
        assert_eq!(parsed, Device::timer("t-1"));

        let missing: Device =
            serde_json::from_str(r#"{"id":"t-1","name":"timer","type":"system.timer"}"#).unwrap();
        assert!(missing.current.is_none());
    }
}
