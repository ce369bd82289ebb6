//! Serde helpers for configuration values

/// Durations written as whole seconds
///
/// Timeouts in the configuration file are plain integers
/// (`reboot_timeout = 240`), which map onto `std::time::Duration` here.
pub mod duration_secs {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Timings {
        #[serde(with = "duration_secs")]
        reboot_timeout: Duration,
    }

    #[test]
    fn test_reads_seconds_from_toml() {
        let timings: Timings = toml::from_str("reboot_timeout = 240").unwrap();
        assert_eq!(timings.reboot_timeout, Duration::from_secs(240));
    }

    #[test]
    fn test_writes_whole_seconds() {
        let timings = Timings {
            reboot_timeout: Duration::from_millis(5_900),
        };
        let json = serde_json::to_string(&timings).unwrap();
        assert_eq!(json, r#"{"reboot_timeout":5}"#);
    }

    #[test]
    fn test_rejects_negative() {
        assert!(toml::from_str::<Timings>("reboot_timeout = -1").is_err());
    }
}
