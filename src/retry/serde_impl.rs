//! Serde support for [`RetryOptions`] (feature-gated)
//!
//! Options serialize as `{"retries": u32, "delay_ms": u64}`. Both fields are
//! optional on input and fall back to the defaults. Negative values are
//! clamped to zero and values too large for the field saturate.
//!
//! The delay is written in whole milliseconds, rounded up, so a delay with a
//! sub-millisecond part reads back slightly longer, never shorter.
//!
//! # Example
//!
//! ```rust,ignore
//! use retryable::RetryOptions;
//! use std::time::Duration;
//!
//! let options: RetryOptions = serde_json::from_str(r#"{"retries": -1, "delay_ms": 250}"#).unwrap();
//! assert_eq!(options.retries(), 0);
//! assert_eq!(options.delay(), Duration::from_millis(250));
//! ```

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

use super::options::{RetryOptions, DEFAULT_DELAY, DEFAULT_RETRIES};

const FIELDS: &[&str] = &["retries", "delay_ms"];

impl Serialize for RetryOptions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RetryOptions", 2)?;
        state.serialize_field("retries", &self.retries())?;
        state.serialize_field("delay_ms", &delay_millis_ceil(self.delay()))?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for RetryOptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_struct("RetryOptions", FIELDS, OptionsVisitor)
    }
}

struct OptionsVisitor;

impl<'de> Visitor<'de> for OptionsVisitor {
    type Value = RetryOptions;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("retry options with optional `retries` and `delay_ms`")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<RetryOptions, A::Error> {
        let mut retries: Option<Whole> = None;
        let mut delay_ms: Option<Whole> = None;

        while let Some(key) = map.next_key::<String>()? {
            match key.as_str() {
                "retries" => {
                    if retries.is_some() {
                        return Err(de::Error::duplicate_field("retries"));
                    }
                    retries = Some(map.next_value()?);
                }
                "delay_ms" => {
                    if delay_ms.is_some() {
                        return Err(de::Error::duplicate_field("delay_ms"));
                    }
                    delay_ms = Some(map.next_value()?);
                }
                other => return Err(de::Error::unknown_field(other, FIELDS)),
            }
        }

        let retries = retries.map_or(DEFAULT_RETRIES, |n| {
            u32::try_from(n.saturating_u64()).unwrap_or(u32::MAX)
        });
        let delay = delay_ms.map_or(DEFAULT_DELAY, |n| {
            Duration::from_millis(n.saturating_u64())
        });
        Ok(RetryOptions::new().with_retries(retries).with_delay(delay))
    }
}

fn delay_millis_ceil(delay: Duration) -> u64 {
    let millis = delay.as_millis() + u128::from(delay.subsec_nanos() % 1_000_000 != 0);
    u64::try_from(millis).unwrap_or(u64::MAX)
}

/// An integer field that may arrive signed or unsigned.
enum Whole {
    Signed(i64),
    Unsigned(u64),
}

impl Whole {
    fn saturating_u64(self) -> u64 {
        match self {
            Whole::Signed(n) => u64::try_from(n).unwrap_or(0),
            Whole::Unsigned(n) => n,
        }
    }
}

impl<'de> Deserialize<'de> for Whole {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_i64(WholeVisitor)
    }
}

struct WholeVisitor;

impl<'de> Visitor<'de> for WholeVisitor {
    type Value = Whole;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an integer")
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<Whole, E> {
        Ok(Whole::Signed(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<Whole, E> {
        Ok(Whole::Unsigned(value))
    }

    fn visit_i128<E: de::Error>(self, value: i128) -> Result<Whole, E> {
        Ok(match u64::try_from(value) {
            Ok(n) => Whole::Unsigned(n),
            Err(_) if value < 0 => Whole::Signed(-1),
            Err(_) => Whole::Unsigned(u64::MAX),
        })
    }

    fn visit_u128<E: de::Error>(self, value: u128) -> Result<Whole, E> {
        Ok(Whole::Unsigned(u64::try_from(value).unwrap_or(u64::MAX)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct ClientConfig {
        endpoint: String,
        retry: RetryOptions,
    }

    #[test]
    fn test_serialize() {
        let options = RetryOptions::new()
            .with_retries(2)
            .with_delay(Duration::from_millis(100));

        let json = serde_json::to_string(&options).unwrap();
        assert_eq!(json, r#"{"retries":2,"delay_ms":100}"#);
    }

    #[test]
    fn test_deserialize_defaults_missing_fields() {
        let options: RetryOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, RetryOptions::default());

        let options: RetryOptions = serde_json::from_str(r#"{"retries": 7}"#).unwrap();
        assert_eq!(options.retries(), 7);
        assert_eq!(options.delay(), DEFAULT_DELAY);
    }

    #[test]
    fn test_deserialize_clamps_negative_values() {
        let options: RetryOptions =
            serde_json::from_str(r#"{"retries": -3, "delay_ms": -10}"#).unwrap();
        assert_eq!(options.retries(), 0);
        assert_eq!(options.delay(), Duration::ZERO);
    }

    #[test]
    fn test_largest_delay_round_trips() {
        let options = RetryOptions::new().with_delay(Duration::from_millis(u64::MAX));

        let json = serde_json::to_string(&options).unwrap();
        assert_eq!(json, r#"{"retries":3,"delay_ms":18446744073709551615}"#);

        let back: RetryOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, options);
    }

    #[test]
    fn test_oversized_delay_saturates() {
        let options = RetryOptions::new().with_delay(Duration::MAX);

        let json = serde_json::to_string(&options).unwrap();
        let back: RetryOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back.delay(), Duration::from_millis(u64::MAX));
    }

    #[test]
    fn test_sub_millisecond_delay_rounds_up() {
        let options = RetryOptions::new().with_delay(Duration::from_micros(1500));

        let json = serde_json::to_string(&options).unwrap();
        assert_eq!(json, r#"{"retries":3,"delay_ms":2}"#);

        let back: RetryOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back.delay(), Duration::from_millis(2));
    }

    #[test]
    fn test_max_retries_round_trips() {
        let options = RetryOptions::new().with_retries(u32::MAX);

        let json = serde_json::to_string(&options).unwrap();
        let back: RetryOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, options);
    }

    #[test]
    fn test_deserialize_saturates_large_retries() {
        let options: RetryOptions =
            serde_json::from_str(r#"{"retries": 18446744073709551615}"#).unwrap();
        assert_eq!(options.retries(), u32::MAX);

        let options: RetryOptions = serde_json::from_str(r#"{"retries": 4294967296}"#).unwrap();
        assert_eq!(options.retries(), u32::MAX);
    }

    #[test]
    fn test_deserialize_rejects_non_integer() {
        let result: Result<RetryOptions, _> = serde_json::from_str(r#"{"delay_ms": "soon"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_rejects_unknown_field() {
        let result: Result<RetryOptions, _> = serde_json::from_str(r#"{"backoff": "exp"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_rejects_duplicate_field() {
        let result: Result<RetryOptions, _> =
            serde_json::from_str(r#"{"retries": 1, "retries": 2}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_nested_in_config() {
        let json = r#"{"endpoint": "https://example.test", "retry": {"delay_ms": 0}}"#;
        let config: ClientConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.retry.retries(), 3);
        assert_eq!(config.retry.delay(), Duration::ZERO);
    }
}
