//! Configuration management for AcctAudit

use acctaudit_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Human / system uid bounds
    #[serde(default)]
    pub classification: ClassificationConfig,

    /// Account directory and credential store locations
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Misconfiguration rule parameters
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Remediation commands
    #[serde(default)]
    pub remediation: RemediationConfig,

    /// Report artifact paths
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::Configuration(format!("Failed to parse config: {}", e)))
    }

    /// Load the file when it exists (defaults otherwise), then apply the environment
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        config.merge_env()
    }

    /// Create a configuration builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Continue building from this configuration
    pub fn into_builder(self) -> ConfigBuilder {
        ConfigBuilder { config: self }
    }

    /// Merge with environment variables (ACCTAUDIT_ prefix)
    pub fn merge_env(mut self) -> Result<Self> {
        // Classification
        if let Some(n) = env_uid("ACCTAUDIT_HUMAN_FLOOR")? {
            self.classification.human_floor = n;
        }
        if let Some(n) = env_uid("ACCTAUDIT_UID_CEILING")? {
            self.classification.uid_ceiling = n;
        }

        // Sources
        if let Ok(val) = std::env::var("ACCTAUDIT_PASSWD_FILE") {
            self.sources.passwd_file = val;
        }
        if let Ok(val) = std::env::var("ACCTAUDIT_SHADOW_FILE") {
            self.sources.shadow_file = val;
        }

        // Remediation
        if let Ok(val) = std::env::var("ACCTAUDIT_ESCALATION_WRAPPER") {
            self.remediation.escalation_wrapper = val;
        }

        // Output
        if let Ok(val) = std::env::var("ACCTAUDIT_HUMAN_OUT") {
            self.output.human_accounts = val;
        }
        if let Ok(val) = std::env::var("ACCTAUDIT_SYSTEM_OUT") {
            self.output.system_accounts = val;
        }

        // Logging
        if let Ok(val) = std::env::var("ACCTAUDIT_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = std::env::var("ACCTAUDIT_LOG_FORMAT") {
            self.logging.format = val;
        }

        Ok(self)
    }

    /// Reject configurations the audit cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.classification.human_floor > self.classification.uid_ceiling {
            return Err(Error::InvalidConfig {
                key: "classification.human_floor".into(),
                message: format!(
                    "{} is above uid_ceiling {}",
                    self.classification.human_floor, self.classification.uid_ceiling
                ),
            });
        }
        if self.remediation.rotate_command.is_empty() {
            return Err(Error::InvalidConfig {
                key: "remediation.rotate_command".into(),
                message: "must name a program".into(),
            });
        }
        if self.remediation.lock_command.is_empty() {
            return Err(Error::InvalidConfig {
                key: "remediation.lock_command".into(),
                message: "must name a program".into(),
            });
        }
        if self.output.human_accounts.is_empty() || self.output.system_accounts.is_empty() {
            return Err(Error::InvalidConfig {
                key: "output".into(),
                message: "artifact paths must not be empty".into(),
            });
        }
        Ok(())
    }
}

/// Numeric uid from the environment; set but unparsable is an error
fn env_uid(key: &str) -> Result<Option<u32>> {
    match std::env::var(key) {
        Ok(val) => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| Error::InvalidConfig {
                key: key.to_string(),
                message: format!("{:?} is not a uid", val),
            }),
        Err(_) => Ok(None),
    }
}

/// Uid bounds for the human bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    /// Lowest uid treated as a human account; everything below is a system account
    #[serde(default = "default_human_floor")]
    pub human_floor: u32,

    /// Highest uid treated as a human account; above this accounts are ignored
    #[serde(default = "default_uid_ceiling")]
    pub uid_ceiling: u32,
}

fn default_human_floor() -> u32 {
    1000
}

fn default_uid_ceiling() -> u32 {
    65533
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            human_floor: 1000,
            uid_ceiling: 65533,
        }
    }
}

/// Account directory and credential store locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Query the name service switch before the flat file
    #[serde(default = "default_true")]
    pub use_getent: bool,

    /// getent program
    #[serde(default = "default_getent")]
    pub getent_command: String,

    /// Local account file
    #[serde(default = "default_passwd_file")]
    pub passwd_file: String,

    /// Credential status store
    #[serde(default = "default_shadow_file")]
    pub shadow_file: String,

    /// Per-account status query program, invoked as `<cmd> -S <name>`
    #[serde(default = "default_passwd_command")]
    pub passwd_command: String,
}

fn default_true() -> bool {
    true
}

fn default_getent() -> String {
    String::from("getent")
}

fn default_passwd_file() -> String {
    String::from("/etc/passwd")
}

fn default_shadow_file() -> String {
    String::from("/etc/shadow")
}

fn default_passwd_command() -> String {
    String::from("passwd")
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            use_getent: true,
            getent_command: default_getent(),
            passwd_file: default_passwd_file(),
            shadow_file: default_shadow_file(),
            passwd_command: default_passwd_command(),
        }
    }
}

/// Misconfiguration rule parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Shell basenames considered interactive login shells
    #[serde(default = "default_login_shells")]
    pub login_shells: Vec<String>,

    /// Home paths meaning "no home directory"
    #[serde(default = "default_no_home_sentinels")]
    pub no_home_sentinels: Vec<String>,
}

fn default_login_shells() -> Vec<String> {
    ["bash", "sh", "zsh", "ksh", "dash", "ash", "csh", "tcsh", "fish"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_no_home_sentinels() -> Vec<String> {
    vec![String::from("/nonexistent"), String::from("/dev/null")]
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            login_shells: default_login_shells(),
            no_home_sentinels: default_no_home_sentinels(),
        }
    }
}

/// Remediation commands; the account name is appended as the last argument
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationConfig {
    /// Run the interactive workflow after reporting
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Password rotation command
    #[serde(default = "default_rotate_command")]
    pub rotate_command: Vec<String>,

    /// Account lock command
    #[serde(default = "default_lock_command")]
    pub lock_command: Vec<String>,

    /// Privilege escalation wrapper used when not running as root
    #[serde(default = "default_escalation_wrapper")]
    pub escalation_wrapper: String,
}

fn default_rotate_command() -> Vec<String> {
    vec![String::from("passwd")]
}

fn default_lock_command() -> Vec<String> {
    vec![String::from("usermod"), String::from("-L")]
}

fn default_escalation_wrapper() -> String {
    String::from("sudo")
}

impl Default for RemediationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rotate_command: default_rotate_command(),
            lock_command: default_lock_command(),
            escalation_wrapper: default_escalation_wrapper(),
        }
    }
}

/// Report artifact paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Human account list
    #[serde(default = "default_human_out")]
    pub human_accounts: String,

    /// System account listing and flagged section
    #[serde(default = "default_system_out")]
    pub system_accounts: String,
}

fn default_human_out() -> String {
    String::from("human_accounts.txt")
}

fn default_system_out() -> String {
    String::from("system_accounts.txt")
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            human_accounts: default_human_out(),
            system_accounts: default_system_out(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, json, compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    String::from("info")
}

fn default_log_format() -> String {
    String::from("compact")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Builder for constructing Config
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn human_floor(mut self, uid: u32) -> Self {
        self.config.classification.human_floor = uid;
        self
    }

    pub fn uid_ceiling(mut self, uid: u32) -> Self {
        self.config.classification.uid_ceiling = uid;
        self
    }

    pub fn passwd_file(mut self, path: impl Into<String>) -> Self {
        self.config.sources.passwd_file = path.into();
        self
    }

    pub fn shadow_file(mut self, path: impl Into<String>) -> Self {
        self.config.sources.shadow_file = path.into();
        self
    }

    pub fn use_getent(mut self, enabled: bool) -> Self {
        self.config.sources.use_getent = enabled;
        self
    }

    pub fn human_out(mut self, path: impl Into<String>) -> Self {
        self.config.output.human_accounts = path.into();
        self
    }

    pub fn system_out(mut self, path: impl Into<String>) -> Self {
        self.config.output.system_accounts = path.into();
        self
    }

    pub fn remediation(mut self, enabled: bool) -> Self {
        self.config.remediation.enabled = enabled;
        self
    }

    pub fn log_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
