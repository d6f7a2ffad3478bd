//! Store-native timestamps.
//!
//! Documents carry dates as `{ "seconds": i64, "nanoseconds": u32 }`. Older
//! documents (or documents written by other clients) may hold a raw value
//! instead: epoch milliseconds or an RFC 3339 string. Reads accept all three,
//! writes always emit the native shape.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreTimestamp {
    pub seconds: i64,
    pub nanoseconds: u32,
}

impl StoreTimestamp {
    #[must_use]
    pub fn now() -> Self {
        Self::from(Utc::now())
    }

    /// Returns `None` when the value is outside chrono's representable range.
    #[must_use]
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.seconds, self.nanoseconds).single()
    }
}

impl From<DateTime<Utc>> for StoreTimestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self {
            seconds: value.timestamp(),
            nanoseconds: value.timestamp_subsec_nanos(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Native(StoreTimestamp),
    Millis(i64),
    Text(String),
}

impl RawTimestamp {
    fn into_datetime(self) -> Option<DateTime<Utc>> {
        match self {
            Self::Native(ts) => ts.to_datetime(),
            Self::Millis(ms) => Utc.timestamp_millis_opt(ms).single(),
            Self::Text(text) => DateTime::parse_from_rfc3339(&text)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

/// `#[serde(with = "timestamp::coerce")]` for `DateTime<Utc>` fields.
pub mod coerce {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        StoreTimestamp::from(*value).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        RawTimestamp::deserialize(deserializer)?
            .into_datetime()
            .ok_or_else(|| D::Error::custom("timestamp out of range"))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Timelike;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "coerce")]
        at: DateTime<Utc>,
    }

    #[test]
    fn writes_native_shape() {
        let at = Utc.timestamp_opt(1_700_000_000, 250).unwrap();
        let json = serde_json::to_value(Wrapper { at }).unwrap();
        assert_eq!(json, json!({ "at": { "seconds": 1_700_000_000i64, "nanoseconds": 250 } }));
    }

    #[test]
    fn reads_native_millis_and_text() {
        let native = json!({ "at": { "seconds": 1_700_000_000i64, "nanoseconds": 0 } });
        let native: Wrapper = serde_json::from_value(native).unwrap();
        let millis: Wrapper =
            serde_json::from_value(json!({ "at": 1_700_000_000_000i64 })).unwrap();
        let text: Wrapper =
            serde_json::from_value(json!({ "at": "2023-11-14T22:13:20Z" })).unwrap();

        assert_eq!(native.at, millis.at);
        assert_eq!(native.at, text.at);
    }

    #[test]
    fn rejects_garbage() {
        assert!(serde_json::from_value::<Wrapper>(json!({ "at": "yesterday" })).is_err());
        assert!(serde_json::from_value::<Wrapper>(json!({ "at": true })).is_err());
    }

    #[test]
    fn round_trip_keeps_sub_second_precision() {
        let at = Utc::now().with_nanosecond(123_456_789).unwrap();
        let json = serde_json::to_value(Wrapper { at }).unwrap();
        let back: Wrapper = serde_json::from_value(json).unwrap();
        assert_eq!(back.at, at);
    }
}
