//! Configuration for provider credentials and template settings
//!
//! Loads configuration from config.yml file

use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Default constants (fallback if config.yml not found)
pub const DEFAULT_ENDPOINT: &str = "https://sms.tencentcloudapi.com";
pub const DEFAULT_REGION: &str = "ap-guangzhou";
pub const DEFAULT_COUNTRY_PREFIX: &str = "+86";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default template parameter order, matching the approved remote template
pub const DEFAULT_PARAM_ORDER: &[&str] = &["name", "date", "time", "place"];

/// YAML config structures
#[derive(Debug, Deserialize)]
struct YamlConfig {
    tencent: Option<TencentConfig>,
    sms: Option<SmsConfig>,
}

#[derive(Debug, Deserialize)]
struct TencentConfig {
    secret_id: Option<String>,
    secret_key: Option<String>,
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    app_id: Option<String>,
    sign_name: Option<String>,
    region: Option<String>,
    endpoint: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SmsConfig {
    #[serde(default, deserialize_with = "deserialize_string_or_number")]
    template_id: Option<String>,
    default_country_prefix: Option<String>,
    param_order: Option<Vec<String>>,
    request_timeout_secs: Option<u64>,
}

/// Deserialize a value that can be either a string or a number
fn deserialize_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_yaml::Value> = Option::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(serde_yaml::Value::String(s)) => Ok(Some(s)),
        Some(serde_yaml::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number, got {:?}",
            other
        ))),
    }
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    pub secret_id: String,
    pub secret_key: String,
    pub sms_app_id: String,
    pub sign_name: String,
    pub region: String,
    pub endpoint: String,
    pub template_id: String,
    pub default_country_prefix: String,
    pub param_order: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Load configuration from config.yml or use defaults
    /// Environment variables take precedence over config.yml values
    pub fn new() -> Self {
        Self::load_from_file("config.yml")
            .or_else(|_| Self::load_from_file("../config.yml"))
            .unwrap_or_else(|_| Self::defaults())
    }

    /// Resolve a value: prefer env var if config value looks like ${VAR}
    fn resolve_env_string(value: Option<String>, env_key: &str) -> String {
        // If value from YAML looks like ${...}, try env var
        if let Some(ref v) = value {
            if v.starts_with("${") && v.ends_with('}') {
                // Extract var name from ${VAR_NAME}
                let var_name = &v[2..v.len() - 1];
                if let Ok(env_val) = std::env::var(var_name) {
                    return env_val;
                }
            }
        }
        // Also check explicit env_key as fallback
        if let Ok(env_val) = std::env::var(env_key) {
            return env_val;
        }
        value.unwrap_or_default()
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        // Try to load from current directory first, then parent
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        // Load .env file first
        Self::load_dotenv();

        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let yaml: YamlConfig = serde_yaml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        let tencent = yaml.tencent;
        let sms = yaml.sms;

        let (secret_id, secret_key, app_id, sign_name, region, endpoint) = match tencent {
            Some(t) => (
                Self::resolve_env_string(t.secret_id, "TENCENTCLOUD_SECRET_ID"),
                Self::resolve_env_string(t.secret_key, "TENCENTCLOUD_SECRET_KEY"),
                Self::resolve_env_string(t.app_id, "SMS_APP_ID"),
                Self::resolve_env_string(t.sign_name, "SMS_SIGN_NAME"),
                t.region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
                t.endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            ),
            None => (
                Self::resolve_env_string(None, "TENCENTCLOUD_SECRET_ID"),
                Self::resolve_env_string(None, "TENCENTCLOUD_SECRET_KEY"),
                Self::resolve_env_string(None, "SMS_APP_ID"),
                Self::resolve_env_string(None, "SMS_SIGN_NAME"),
                DEFAULT_REGION.to_string(),
                DEFAULT_ENDPOINT.to_string(),
            ),
        };

        let (template_id, default_country_prefix, param_order, request_timeout_secs) = match sms {
            Some(s) => (
                Self::resolve_env_string(s.template_id, "SMS_TEMPLATE_ID"),
                s.default_country_prefix
                    .unwrap_or_else(|| DEFAULT_COUNTRY_PREFIX.to_string()),
                s.param_order.unwrap_or_else(default_param_order),
                s.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
            None => (
                Self::resolve_env_string(None, "SMS_TEMPLATE_ID"),
                DEFAULT_COUNTRY_PREFIX.to_string(),
                default_param_order(),
                DEFAULT_TIMEOUT_SECS,
            ),
        };

        Ok(Config {
            secret_id,
            secret_key,
            sms_app_id: app_id,
            sign_name,
            region,
            endpoint,
            template_id,
            default_country_prefix,
            param_order,
            request_timeout_secs,
        })
    }

    /// Default configuration (env vars only)
    pub fn defaults() -> Self {
        Self::load_dotenv();

        Config {
            secret_id: std::env::var("TENCENTCLOUD_SECRET_ID").unwrap_or_default(),
            secret_key: std::env::var("TENCENTCLOUD_SECRET_KEY").unwrap_or_default(),
            sms_app_id: std::env::var("SMS_APP_ID").unwrap_or_default(),
            sign_name: std::env::var("SMS_SIGN_NAME").unwrap_or_default(),
            region: DEFAULT_REGION.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            template_id: std::env::var("SMS_TEMPLATE_ID").unwrap_or_default(),
            default_country_prefix: DEFAULT_COUNTRY_PREFIX.to_string(),
            param_order: default_param_order(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Check that everything needed to reach the provider is present
    pub fn ensure_credentials(&self) -> crate::error::Result<()> {
        let mut missing = Vec::new();
        if self.secret_id.trim().is_empty() {
            missing.push("secret_id");
        }
        if self.secret_key.trim().is_empty() {
            missing.push("secret_key");
        }
        if self.sms_app_id.trim().is_empty() {
            missing.push("app_id");
        }
        if self.sign_name.trim().is_empty() {
            missing.push("sign_name");
        }
        if self.template_id.trim().is_empty() {
            missing.push("template_id");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(crate::error::Error::Config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )))
        }
    }
}

fn default_param_order() -> Vec<String> {
    DEFAULT_PARAM_ORDER.iter().map(|s| s.to_string()).collect()
}
