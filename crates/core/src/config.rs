use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Spacing applied to institutions known to reject back-to-back requests.
pub const THROTTLED_INSTITUTION_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid JSON profile: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown profile '{name}'. Valid profiles: {valid:?}")]
    UnknownProfile { name: String, valid: Vec<String> },
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

/// Connection parameters for one OFX server, as listed on ofxhome.com.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionParams {
    pub id: String,
    pub org: String,
    pub url: String,
    #[serde(default)]
    pub broker_id: Option<String>,
    pub username: String,
    pub password: String,
    #[serde(default = "default_ofx_version")]
    pub ofx_version: String,
    /// Required by some servers (together with version 103 or later).
    #[serde(default)]
    pub client_uid: Option<String>,
    #[serde(default = "default_app_id")]
    pub app_id: String,
    #[serde(default = "default_app_ver")]
    pub app_ver: String,
}

fn default_ofx_version() -> String {
    "102".to_string()
}

fn default_app_id() -> String {
    "QWIN".to_string()
}

fn default_app_ver() -> String {
    "2500".to_string()
}

/// Tuning knobs for incremental synchronization of one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    /// Days of already-covered history re-requested on every extension.
    #[serde(default = "default_overlap_days")]
    pub overlap_days: u32,
    /// A request starting this close to today is assumed to return everything recent.
    #[serde(default = "default_min_days_retrieved")]
    pub min_days_retrieved: u32,
    /// Lower bound for the bootstrap search when nothing has been downloaded yet.
    #[serde(default = "default_min_start_date")]
    pub min_start_date: NaiveDate,
    /// Save a response even when it does not extend the covered range.
    #[serde(default = "default_always_save")]
    pub always_save: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            overlap_days: default_overlap_days(),
            min_days_retrieved: default_min_days_retrieved(),
            min_start_date: default_min_start_date(),
            always_save: default_always_save(),
        }
    }
}

fn default_overlap_days() -> u32 {
    2
}

fn default_min_days_retrieved() -> u32 {
    20
}

fn default_min_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or_default()
}

fn default_always_save() -> bool {
    true
}

/// Everything needed to synchronize all accounts of one institution login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub output_directory: PathBuf,
    pub ofx: InstitutionParams,
    /// Account number -> directory name, used verbatim.
    #[serde(default)]
    pub acct_dir_map: BTreeMap<String, String>,
    #[serde(flatten)]
    pub sync: SyncOptions,
    /// Minimum spacing between requests; `0` disables throttling.
    #[serde(default)]
    pub min_request_interval_secs: Option<u64>,
}

impl Profile {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let profile: Profile = serde_json::from_str(json)?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ofx.url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "ofx.url",
                reason: "must not be empty".to_string(),
            });
        }
        if self.output_directory.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "output_directory",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Explicit setting wins; otherwise Discover servers get the known 5 second spacing.
    pub fn min_request_interval(&self) -> Option<Duration> {
        match self.min_request_interval_secs {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None if self.ofx.org.contains("Discover") => Some(THROTTLED_INSTITUTION_INTERVAL),
            None => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        for profile in config.profiles.values() {
            profile.validate()?;
        }
        Ok(config)
    }

    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProfile {
                name: name.to_string(),
                valid: self.profiles.keys().cloned().collect(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[profiles.vanguard]
output_directory = "/data/vanguard"

[profiles.vanguard.ofx]
id = "15103"
org = "Vanguard"
url = "https://vesnc.vanguard.com/us/OfxDirectConnectServlet"
username = "user"
password = "secret"

[profiles.vanguard.acct_dir_map]
"880012345" = "Roth IRA"

[profiles.discover]
output_directory = "/data/discover"
overlap_days = 5
min_days_retrieved = 30
min_start_date = "2010-06-01"
always_save = false

[profiles.discover.ofx]
id = "7101"
org = "Discover Financial Services"
url = "https://ofx.discovercard.com"
username = "user"
password = "secret"
ofx_version = "103"
client_uid = "64f0e0bfe04f1a2d32cbddc8d30a3017"
"#;

    #[test]
    fn sync_options_defaults() {
        let opts = SyncOptions::default();
        assert_eq!(opts.overlap_days, 2);
        assert_eq!(opts.min_days_retrieved, 20);
        assert_eq!(opts.min_start_date, NaiveDate::from_ymd_opt(1990, 1, 1).unwrap());
        assert!(opts.always_save);
    }

    #[test]
    fn parse_profiles_with_defaults() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        let vanguard = config.profile("vanguard").unwrap();
        assert_eq!(vanguard.sync, SyncOptions::default());
        assert_eq!(vanguard.ofx.ofx_version, "102");
        assert_eq!(vanguard.ofx.app_id, "QWIN");
        assert_eq!(vanguard.acct_dir_map.get("880012345").map(String::as_str), Some("Roth IRA"));
        assert_eq!(vanguard.min_request_interval(), None);
    }

    #[test]
    fn parse_profile_overrides() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        let discover = config.profile("discover").unwrap();
        assert_eq!(discover.sync.overlap_days, 5);
        assert_eq!(discover.sync.min_days_retrieved, 30);
        assert_eq!(discover.sync.min_start_date, NaiveDate::from_ymd_opt(2010, 6, 1).unwrap());
        assert!(!discover.sync.always_save);
        assert_eq!(discover.ofx.client_uid.as_deref(), Some("64f0e0bfe04f1a2d32cbddc8d30a3017"));
    }

    #[test]
    fn discover_is_throttled_by_default() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        let mut discover = config.profile("discover").unwrap().clone();
        assert_eq!(discover.min_request_interval(), Some(Duration::from_secs(5)));

        discover.min_request_interval_secs = Some(0);
        assert_eq!(discover.min_request_interval(), None);

        discover.min_request_interval_secs = Some(7);
        assert_eq!(discover.min_request_interval(), Some(Duration::from_secs(7)));
    }

    #[test]
    fn unknown_profile_lists_valid_names() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        match config.profile("chase") {
            Err(ConfigError::UnknownProfile { valid, .. }) => {
                assert_eq!(valid, vec!["discover".to_string(), "vanguard".to_string()]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn json_profile() {
        let json = r#"{
            "output_directory": "/tmp/out",
            "ofx": {"id": "1", "org": "Bank", "url": "https://bank.example/ofx",
                    "username": "u", "password": "p"},
            "overlap_days": 3
        }"#;
        let profile = Profile::from_json(json).unwrap();
        assert_eq!(profile.sync.overlap_days, 3);
        assert_eq!(profile.sync.min_days_retrieved, 20);
    }

    #[test]
    fn empty_url_is_rejected() {
        let json = r#"{
            "output_directory": "/tmp/out",
            "ofx": {"id": "1", "org": "Bank", "url": " ", "username": "u", "password": "p"}
        }"#;
        assert!(matches!(
            Profile::from_json(json),
            Err(ConfigError::InvalidValue { field: "ofx.url", .. })
        ));
    }
}
