//! Configuration types for the dockdns controller
//!
//! Settings come from environment variables plus a credentials file:
//!
//! | variable | meaning | default |
//! |---|---|---|
//! | `DOMAIN` | base domain (required) | |
//! | `PROVIDER` | DNS provider name (required) | |
//! | `AUTH_FILE` | credentials file | `/auth/credentials.ini` |
//! | `LOOP_INTERVAL` | seconds between cycles | `5` |
//! | `IP_SERVICE_URL` | public IP service | `https://ifconfig.me` |
//! | `DOCKER_HOST` | Docker Engine API endpoint | `unix:///var/run/docker.sock` |
//! | `REPAIR_IP_DRIFT` | recreate owned records whose IP is stale | `false` |
//! | `LOG_LEVEL` | trace, debug, info, warn or error | `info` |
//!
//! The credentials file is a section-less INI file:
//!
//! ```ini
//! username = admin@example.com
//! password = 0123456789abcdef
//! ```

use crate::error::{Error, Result};
use ini::Ini;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default credentials file location
pub const DEFAULT_AUTH_FILE: &str = "/auth/credentials.ini";

/// Default public IP service
pub const DEFAULT_IP_SERVICE_URL: &str = "https://ifconfig.me";

/// Default Docker Engine API endpoint
pub const DEFAULT_DOCKER_HOST: &str = "unix:///var/run/docker.sock";

/// Default seconds between reconciliation cycles
pub const DEFAULT_LOOP_INTERVAL_SECS: u64 = 5;

/// Endpoint schemes accepted by `DOCKER_HOST`
pub const DOCKER_SCHEMES: &[&str] = &["unix://", "tcp://", "http://"];

/// Provider names accepted by `PROVIDER`
pub const KNOWN_PROVIDERS: &[&str] = &["cloudflare"];

/// Provider credential pair
///
/// The Debug implementation never prints the secret.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account identifier (e.g. the API e-mail)
    pub username: String,
    /// Secret key
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

impl Credentials {
    /// Create a credential pair
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Load credentials from a section-less INI file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ini = Ini::load_from_file(path).map_err(|e| {
            Error::config(format!(
                "Error loading credentials from {}: {}",
                path.display(),
                e
            ))
        })?;

        Self::from_ini(&ini).map_err(|e| match e {
            Error::Config(msg) => Error::config(format!("{} in auth file {}", msg, path.display())),
            other => other,
        })
    }

    /// Parse INI text; only keys before the first section header count
    pub fn parse(text: &str) -> Result<Self> {
        let ini = Ini::load_from_str(text)
            .map_err(|e| Error::config(format!("Malformed credentials: {}", e)))?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self> {
        let section = ini.general_section();
        let required = |key: &str| {
            section
                .get(key)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| Error::config(format!("'{}' key not found", key)))
        };

        Ok(Self {
            username: required("username")?,
            password: required("password")?,
        })
    }
}

/// DNS provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider (API key authentication)
    Cloudflare {
        /// API e-mail and global API key
        credentials: Credentials,
        /// Base domain; its zone is looked up on first use
        domain: String,
        /// API root override (tests, proxies)
        api_base: Option<String>,
    },
}

impl ProviderConfig {
    /// Build a provider configuration from the `PROVIDER` name
    pub fn from_name(name: &str, credentials: Credentials, domain: &str) -> Result<Self> {
        match name {
            "cloudflare" => Ok(ProviderConfig::Cloudflare {
                credentials,
                domain: domain.to_string(),
                api_base: None,
            }),
            other => Err(Error::config(format!(
                "Unknown dns provider {}. Supported providers: {}",
                other,
                KNOWN_PROVIDERS.join(", ")
            ))),
        }
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<()> {
        match self {
            ProviderConfig::Cloudflare {
                credentials,
                domain,
                ..
            } => {
                if credentials.username.is_empty() || credentials.password.is_empty() {
                    return Err(Error::config("Cloudflare credentials cannot be empty"));
                }
                validate_domain_name(domain)
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
        }
    }
}

/// Public IP discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IpSourceConfig {
    /// Plain-text "what is my IP" service
    Http {
        /// URL to fetch the IP from
        url: String,
    },
}

impl IpSourceConfig {
    /// Validate the IP source configuration
    pub fn validate(&self) -> Result<()> {
        match self {
            IpSourceConfig::Http { url } => validate_http_url("IP_SERVICE_URL", url),
        }
    }

    /// Get the source type name
    pub fn type_name(&self) -> &str {
        match self {
            IpSourceConfig::Http { .. } => "http",
        }
    }
}

impl Default for IpSourceConfig {
    fn default() -> Self {
        IpSourceConfig::Http {
            url: DEFAULT_IP_SERVICE_URL.to_string(),
        }
    }
}

/// Desired-state source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DesiredStateConfig {
    /// Container labels from the Docker Engine API
    Docker {
        /// Engine endpoint (`unix:///path`, `tcp://host:port` or `http://host:port`)
        endpoint: String,
        /// Base domain appended to every subdomain label
        domain: String,
    },
}

impl DesiredStateConfig {
    /// Validate the source configuration
    pub fn validate(&self) -> Result<()> {
        match self {
            DesiredStateConfig::Docker { endpoint, domain } => {
                if endpoint.is_empty() {
                    return Err(Error::config("DOCKER_HOST cannot be empty"));
                }
                if !DOCKER_SCHEMES.iter().any(|scheme| endpoint.starts_with(scheme)) {
                    return Err(Error::config(format!(
                        "DOCKER_HOST must use unix://, tcp:// or http://. Got: {}",
                        endpoint
                    )));
                }
                validate_domain_name(domain)
            }
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Recreate owned ADDRESS records whose content differs from the current IP
    ///
    /// Off by default: an already-published hostname keeps its address.
    #[serde(default)]
    pub repair_ip_drift: bool,

    /// Capacity of the internal event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            repair_ip_drift: false,
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_event_channel_capacity() -> usize {
    256
}

/// Complete process settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base domain
    pub domain: String,
    /// Provider selection and credentials
    pub provider: ProviderConfig,
    /// Public IP discovery
    pub ip_source: IpSourceConfig,
    /// Desired-state source
    pub desired_state: DesiredStateConfig,
    /// Engine options
    pub engine: EngineConfig,
    /// Time between cycles
    pub interval: Duration,
    /// Log level name
    pub log_level: String,
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let domain = lookup("DOMAIN")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| Error::config("DOMAIN is required"))?;
        let domain = crate::record::normalize_hostname(&domain);
        validate_domain_name(&domain)?;

        let provider_name = lookup("PROVIDER")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| Error::config("PROVIDER is required"))?;
        let provider_name = provider_name.trim().to_lowercase();
        if !KNOWN_PROVIDERS.contains(&provider_name.as_str()) {
            return Err(Error::config(format!(
                "Unknown dns provider {}. Supported providers: {}",
                provider_name,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        let auth_file = lookup("AUTH_FILE").unwrap_or_else(|| DEFAULT_AUTH_FILE.to_string());
        let credentials = Credentials::from_file(&auth_file)?;

        let interval_secs = match lookup("LOOP_INTERVAL") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                Error::config(format!("Error parsing LOOP_INTERVAL '{}': {}", raw, e))
            })?,
            None => DEFAULT_LOOP_INTERVAL_SECS,
        };
        if interval_secs == 0 {
            return Err(Error::config("LOOP_INTERVAL must be at least 1 second"));
        }

        let repair_ip_drift = match lookup("REPAIR_IP_DRIFT") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                Error::config(format!("REPAIR_IP_DRIFT must be true or false. Got: {}", raw))
            })?,
            None => false,
        };

        let log_level = lookup("LOG_LEVEL")
            .unwrap_or_else(|| "info".to_string())
            .to_lowercase();
        match log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(Error::config(format!(
                    "LOG_LEVEL '{}' is not valid. Valid levels: trace, debug, info, warn, error",
                    log_level
                )));
            }
        }

        let settings = Self {
            provider: ProviderConfig::from_name(&provider_name, credentials, &domain)?,
            ip_source: IpSourceConfig::Http {
                url: lookup("IP_SERVICE_URL")
                    .unwrap_or_else(|| DEFAULT_IP_SERVICE_URL.to_string()),
            },
            desired_state: DesiredStateConfig::Docker {
                endpoint: lookup("DOCKER_HOST")
                    .unwrap_or_else(|| DEFAULT_DOCKER_HOST.to_string()),
                domain: domain.clone(),
            },
            engine: EngineConfig {
                repair_ip_drift,
                ..EngineConfig::default()
            },
            interval: Duration::from_secs(interval_secs),
            log_level,
            domain,
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Validate the complete configuration
    pub fn validate(&self) -> Result<()> {
        validate_domain_name(&self.domain)?;
        self.provider.validate()?;
        self.ip_source.validate()?;
        self.desired_state.validate()?;
        if self.engine.event_channel_capacity == 0 {
            return Err(Error::config("event channel capacity must be > 0"));
        }
        Ok(())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn validate_http_url(name: &str, url: &str) -> Result<()> {
    if url.is_empty() {
        return Err(Error::config(format!("{} cannot be empty", name)));
    }
    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err(Error::config(format!(
            "{} must use HTTP or HTTPS scheme. Got: {}",
            name, url
        )));
    }
    Ok(())
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 checks: total length, label length and characters.
pub fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.is_empty() {
        return Err(Error::config("Domain name cannot be empty"));
    }

    if domain.len() > 253 {
        return Err(Error::config(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        )));
    }

    for label in domain.split('.') {
        if label.is_empty() {
            return Err(Error::config(format!("Domain name has empty label: '{}'", domain)));
        }

        if label.len() > 63 {
            return Err(Error::config(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            )));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(Error::config(format!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::config(format!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            )));
        }
    }

    Ok(())
}
