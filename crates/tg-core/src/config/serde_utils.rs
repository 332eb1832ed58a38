//! Shared serde helpers for configuration

/// Duration stored as (possibly fractional) seconds, e.g. `poll_interval = 0.5`
pub mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Serialize a Duration as seconds
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_nanos() == 0 {
            serializer.serialize_u64(duration.as_secs())
        } else {
            serializer.serialize_f64(duration.as_secs_f64())
        }
    }

    /// Deserialize a Duration from integer or fractional seconds
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() || secs <= 0.0 {
            return Err(serde::de::Error::custom(format!(
                "duration must be a positive number of seconds, got {}",
                secs
            )));
        }
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Polling {
        #[serde(with = "duration_secs")]
        interval: Duration,
    }

    #[test]
    fn test_whole_and_fractional_seconds() {
        let whole: Polling = toml::from_str("interval = 2").unwrap();
        assert_eq!(whole.interval, Duration::from_secs(2));

        let fractional: Polling = toml::from_str("interval = 0.25").unwrap();
        assert_eq!(fractional.interval, Duration::from_millis(250));
    }

    #[test]
    fn test_zero_is_rejected() {
        assert!(toml::from_str::<Polling>("interval = 0").is_err());
    }

    #[test]
    fn test_serializes_whole_seconds_as_integer() {
        let json = serde_json::to_string(&Polling {
            interval: Duration::from_secs(1),
        })
        .unwrap();
        assert_eq!(json, r#"{"interval":1}"#);
    }
}
