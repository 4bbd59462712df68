//! Bridge configuration: optional `config.json` under the home directory,
//! overridden field by field from the command line.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use cts_peripheral::DescriptorReadPolicy;
use cts_proto::{FixedZone, SystemZone, ZoneOffsets, ZoneRules};

pub const DEFAULT_DEVICE_NAME: &str = "Time Server";
pub const DEFAULT_TICK_SECS: u64 = 60;

const CONFIG_FILE: &str = "config.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine home directory, set CTS_HOME")]
    NoHome,
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

#[derive(serde::Serialize, serde::Deserialize, clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReadPolicy {
    /// Answer with the client's current enable/disable value
    ReportState,
    /// Always answer with a failure status
    LegacyFailure,
}

impl From<ReadPolicy> for DescriptorReadPolicy {
    fn from(policy: ReadPolicy) -> Self {
        match policy {
            ReadPolicy::ReportState => DescriptorReadPolicy::ReportState,
            ReadPolicy::LegacyFailure => DescriptorReadPolicy::LegacyFailure,
        }
    }
}

/// Settings as written in `config.json` or given on the command line. Every
/// field is optional; unset fields fall back to the defaults.
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub device_name: Option<String>,
    pub tick_secs: Option<u64>,
    pub utc_offset_minutes: Option<i32>,
    pub dst_offset_minutes: Option<i32>,
    pub descriptor_read_policy: Option<ReadPolicy>,
}

impl Settings {
    /// Fields set in `other` win.
    pub fn merge(self, other: Settings) -> Settings {
        Settings {
            device_name: other.device_name.or(self.device_name),
            tick_secs: other.tick_secs.or(self.tick_secs),
            utc_offset_minutes: other.utc_offset_minutes.or(self.utc_offset_minutes),
            dst_offset_minutes: other.dst_offset_minutes.or(self.dst_offset_minutes),
            descriptor_read_policy: other.descriptor_read_policy.or(self.descriptor_read_policy),
        }
    }

    pub fn resolve(self) -> Result<Config, ConfigError> {
        let device_name = self
            .device_name
            .unwrap_or_else(|| DEFAULT_DEVICE_NAME.to_string());
        if device_name.trim().is_empty() {
            return Err(invalid("device_name", "must not be empty"));
        }

        let tick_secs = self.tick_secs.unwrap_or(DEFAULT_TICK_SECS);
        if tick_secs == 0 {
            return Err(invalid("tick_secs", "must be at least 1"));
        }

        let zone = match (self.utc_offset_minutes, self.dst_offset_minutes) {
            (None, None) => Zone::System(SystemZone),
            (standard, dst) => {
                let standard = standard.unwrap_or(0);
                let dst = dst.unwrap_or(0);
                if !(-24 * 60..=24 * 60).contains(&standard) {
                    return Err(invalid("utc_offset_minutes", "must be within +/-24h"));
                }
                if !(0..=4 * 60).contains(&dst) {
                    return Err(invalid("dst_offset_minutes", "must be between 0 and 240"));
                }
                Zone::Fixed(FixedZone::new(standard, dst))
            }
        };

        Ok(Config {
            device_name,
            tick: Duration::from_secs(tick_secs),
            zone,
            read_policy: self
                .descriptor_read_policy
                .map(DescriptorReadPolicy::from)
                .unwrap_or_default(),
        })
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

/// Time zone the codec reports in
#[derive(Debug, Clone, Copy)]
pub enum Zone {
    System(SystemZone),
    Fixed(FixedZone),
}

impl ZoneRules for Zone {
    fn offsets_at(&self, instant: &DateTime<Utc>) -> ZoneOffsets {
        match self {
            Zone::System(zone) => zone.offsets_at(instant),
            Zone::Fixed(zone) => zone.offsets_at(instant),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub device_name: String,
    pub tick: Duration,
    pub zone: Zone,
    pub read_policy: DescriptorReadPolicy,
}

/// `$CTS_HOME` when given, `~/.cts` otherwise.
pub fn cts_home(explicit: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
    match explicit {
        Some(home) => Ok(home),
        None => dirs::home_dir()
            .map(|home| home.join(".cts"))
            .ok_or(ConfigError::NoHome),
    }
}

/// Reads `config.json` from `home`. A missing file is an empty config.
pub fn load(home: &Path) -> Result<Settings, ConfigError> {
    let path = home.join(CONFIG_FILE);

    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Settings::default()),
        Err(source) => return Err(ConfigError::Io { path, source }),
    };

    serde_json::from_str(&content).map_err(|source| ConfigError::Parse { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(json: &str) -> Settings {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn defaults() {
        let config = Settings::default().resolve().unwrap();
        assert_eq!(config.device_name, DEFAULT_DEVICE_NAME);
        assert_eq!(config.tick, Duration::from_secs(60));
        assert!(matches!(config.zone, Zone::System(_)));
        assert_eq!(config.read_policy, DescriptorReadPolicy::ReportState);
    }

    #[test]
    fn command_line_overrides_file() {
        let file = settings(
            r#"{"device_name": "Kitchen", "tick_secs": 30, "descriptor_read_policy": "legacy_failure"}"#,
        );
        let cli = Settings {
            tick_secs: Some(10),
            utc_offset_minutes: Some(-300),
            ..Settings::default()
        };

        let config = file.merge(cli).resolve().unwrap();
        assert_eq!(config.device_name, "Kitchen");
        assert_eq!(config.tick, Duration::from_secs(10));
        assert_eq!(config.read_policy, DescriptorReadPolicy::LegacyFailure);
        match config.zone {
            Zone::Fixed(zone) => assert_eq!(zone, FixedZone::new(-300, 0)),
            other => panic!("expected fixed zone, got {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_values() {
        let zero_tick = Settings {
            tick_secs: Some(0),
            ..Settings::default()
        };
        assert!(matches!(
            zero_tick.resolve(),
            Err(ConfigError::Invalid { field: "tick_secs", .. })
        ));

        let negative_dst = Settings {
            dst_offset_minutes: Some(-60),
            ..Settings::default()
        };
        assert!(matches!(
            negative_dst.resolve(),
            Err(ConfigError::Invalid { field: "dst_offset_minutes", .. })
        ));

        assert!(serde_json::from_str::<Settings>(r#"{"tick": 5}"#).is_err());
    }

    #[test]
    fn load_from_home() {
        let home = std::env::temp_dir().join(format!("cts-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&home).unwrap();
        let path = home.join(CONFIG_FILE);

        let _ = std::fs::remove_file(&path);
        assert_eq!(load(&home).unwrap(), Settings::default());

        std::fs::write(&path, r#"{"utc_offset_minutes": 60, "dst_offset_minutes": 60}"#).unwrap();
        let loaded = load(&home).unwrap();
        assert_eq!(loaded.utc_offset_minutes, Some(60));
        assert_eq!(loaded.dst_offset_minutes, Some(60));

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(load(&home), Err(ConfigError::Parse { .. })));

        std::fs::remove_dir_all(&home).unwrap();
    }

    #[test]
    fn explicit_home_wins() {
        let home = PathBuf::from("/srv/cts");
        assert_eq!(cts_home(Some(home.clone())).unwrap(), home);
    }
}
