//! shiftminus configuration system.
//!
//! Loaded once at process start from `~/.shiftminus/config.toml` (or the
//! path in `SHIFTMINUS_CONFIG`), then overlaid with the environment
//! variables the deployment already uses. Read-only afterwards.

use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, ShiftError};
use crate::types::{Department, PushTarget};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftConfig {
    /// Fixed offset "today" is computed in. JST by default.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub line: LineConfig,
    #[serde(default)]
    pub deadline: DeadlineConfig,
    #[serde(default)]
    pub job: JobConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

fn default_utc_offset_hours() -> i32 { 9 }

impl Default for ShiftConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: default_utc_offset_hours(),
            store: StoreConfig::default(),
            line: LineConfig::default(),
            deadline: DeadlineConfig::default(),
            job: JobConfig::default(),
            gateway: GatewayConfig::default(),
        }
    }
}

impl ShiftConfig {
    /// Load `.env`, the config file (if any) and environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("SHIFTMINUS_CONFIG").ok().map(PathBuf::from));
        let mut config = Self::resolve(explicit.as_deref())?;
        config.apply_env_with(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// File contents for `explicit`, or the default path if it exists.
    /// Only the default path may be missing.
    fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ShiftError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            return Self::load_from(path);
        }
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load config from a specific path, without environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ShiftError::Config(format!("Failed to read config: {e}")))?;
        toml::from_str(&content)
            .map_err(|e| ShiftError::Config(format!("Failed to parse config: {e}")))
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the shiftminus home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".shiftminus")
    }

    /// Overlay deployment environment variables. Empty values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("SUPABASE_URL") {
            self.store.url = v;
        }
        if let Some(v) = get("SUPABASE_API_KEY") {
            self.store.api_key = v;
        }
        if let Some(v) = get("LINE_ACCESS_TOKEN_HANBAI") {
            self.line.sales.access_token = v;
        }
        if let Some(v) = get("LINE_ACCESS_TOKEN_SEIZOU") {
            self.line.manufacturing.access_token = v;
        }
        if let Some(v) = get("LINE_GROUP_ID_HANBAI") {
            self.line.sales.group_id = v;
        }
        if let Some(v) = get("LINE_GROUP_ID_SEIZOU") {
            self.line.manufacturing.group_id = v;
        }
        if let Some(v) = get("LINE_GROUP_ID_DEADLINE") {
            self.deadline.group_id = v;
        }
    }

    /// The store is the one collaborator nothing works without.
    pub fn validate(&self) -> Result<()> {
        if self.store.url.trim().is_empty() {
            return Err(ShiftError::Config("store.url (SUPABASE_URL) not configured".into()));
        }
        if self.store.api_key.trim().is_empty() {
            return Err(ShiftError::Config(
                "store.api_key (SUPABASE_API_KEY) not configured".into(),
            ));
        }
        for dept in Department::ALL {
            if !self.target(dept).is_configured() {
                tracing::warn!("⚠️ LINE credentials for {dept} are incomplete, sends will be skipped");
            }
        }
        Ok(())
    }

    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours.clamp(-23, 23) * 3600)
            .unwrap_or_else(|| Utc.fix())
    }

    /// Calendar date at the configured offset.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset()).date_naive()
    }

    pub fn department(&self, department: Department) -> &DepartmentChannel {
        match department {
            Department::Sales => &self.line.sales,
            Department::Manufacturing => &self.line.manufacturing,
        }
    }

    /// Push target for a department's shortfall notifications.
    pub fn target(&self, department: Department) -> PushTarget {
        let ch = self.department(department);
        PushTarget::new(&ch.group_id, &ch.access_token)
    }

    /// Deadline channel, sent with the configured department's credential.
    pub fn deadline_target(&self) -> PushTarget {
        let sender = self.department(self.deadline.sender);
        PushTarget::new(&self.deadline.group_id, &sender.access_token)
    }

    /// Exact category values the interactive listing filters on.
    pub fn categories(&self, department: Department) -> Vec<String> {
        let configured = &self.department(department).categories;
        if configured.is_empty() {
            vec![department.label().to_string()]
        } else {
            configured.clone()
        }
    }
}

/// Hosted PostgREST store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_shortfall_table")]
    pub shortfall_table: String,
    #[serde(default = "default_deadline_table")]
    pub deadline_table: String,
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

fn default_shortfall_table() -> String { "minus".into() }
fn default_deadline_table() -> String { "shift_deadline".into() }
fn default_store_timeout() -> u64 { 30 }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            shortfall_table: default_shortfall_table(),
            deadline_table: default_deadline_table(),
            timeout_secs: default_store_timeout(),
        }
    }
}

/// LINE Messaging API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineConfig {
    #[serde(default = "default_line_api_base")]
    pub api_base: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_rate_limit_backoff")]
    pub rate_limit_backoff_secs: u64,
    #[serde(default = "default_line_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub sales: DepartmentChannel,
    #[serde(default)]
    pub manufacturing: DepartmentChannel,
}

fn default_line_api_base() -> String { "https://api.line.me".into() }
fn default_max_retries() -> u32 { 1 }
fn default_rate_limit_backoff() -> u64 { 10 }
fn default_line_timeout() -> u64 { 10 }

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            api_base: default_line_api_base(),
            max_retries: default_max_retries(),
            rate_limit_backoff_secs: default_rate_limit_backoff(),
            timeout_secs: default_line_timeout(),
            sales: DepartmentChannel::default(),
            manufacturing: DepartmentChannel::default(),
        }
    }
}

/// Per-department credential, group and category list.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DepartmentChannel {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub group_id: String,
    /// Empty means just the department label.
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Deadline reminder configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadlineConfig {
    #[serde(default)]
    pub group_id: String,
    /// Whose credential sends deadline messages.
    #[serde(default = "default_deadline_sender")]
    pub sender: Department,
    /// Person late submitters contact, shown for both departments.
    #[serde(default = "default_contact_name")]
    pub contact_name: String,
}

fn default_deadline_sender() -> Department { Department::Sales }
fn default_contact_name() -> String { "宮内".into() }

impl Default for DeadlineConfig {
    fn default() -> Self {
        Self {
            group_id: String::new(),
            sender: default_deadline_sender(),
            contact_name: default_contact_name(),
        }
    }
}

/// Scheduled job pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Pause after each department send.
    #[serde(default = "default_department_gap")]
    pub department_gap_secs: u64,
}

fn default_department_gap() -> u64 { 3 }

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            department_gap_secs: default_department_gap(),
        }
    }
}

/// Trigger/API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Program `/run_notify` spawns. Defaults to the running binary.
    #[serde(default)]
    pub job_command: Option<String>,
    #[serde(default = "default_job_args")]
    pub job_args: Vec<String>,
}

fn default_host() -> String { "0.0.0.0".into() }
fn default_port() -> u16 { 8000 }
fn default_job_args() -> Vec<String> { vec!["notify".into()] }

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            job_command: None,
            job_args: default_job_args(),
        }
    }
}
