//! Configuration module for Crashline.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, environment overrides, validation, defaults, and a builder
//! pattern for programmatic use. A `Config` is read once when a reporter is
//! constructed; nothing re-reads it per report.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Ingestion endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "https://api.rollbar.com/api/1/item/";

/// Environment variable overriding `reporter.access_token`.
pub const ENV_ACCESS_TOKEN: &str = "CRASHLINE_ACCESS_TOKEN";
/// Environment variable overriding `reporter.environment`.
pub const ENV_ENVIRONMENT: &str = "CRASHLINE_ENVIRONMENT";
/// Environment variable overriding `reporter.endpoint`.
pub const ENV_ENDPOINT: &str = "CRASHLINE_ENDPOINT";

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for Crashline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub reporter: ReporterConfig,
    pub delivery: DeliveryConfig,
    pub trace: TraceConfig,
    pub scrubbing: ScrubConfig,
    pub logging: LoggingConfig,
}

/// Destination and identity settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    /// Project access token sent with every item. `None` is allowed for
    /// local development against an endpoint that does not check it.
    pub access_token: Option<String>,
    /// Environment label, e.g. `production` or `staging`.
    pub environment: String,
    /// Item ingestion URL.
    pub endpoint: String,
    /// Platform label; defaults to the compile-time OS name.
    pub platform: String,
    /// Host name reported as `server.host`. `None` means "ask the OS".
    pub server_host: Option<String>,
    /// Version or commit of the reporting application.
    pub code_version: Option<String>,
}

/// Queue and delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Maximum number of reports waiting for a delivery slot.
    pub queue_capacity: usize,
    /// Maximum number of deliveries in flight at once.
    pub max_concurrent: usize,
    /// Per-request timeout for the HTTP transport, in seconds.
    pub request_timeout_secs: u64,
    /// Optional upper bound for a configured flush, in seconds.
    pub flush_timeout_secs: Option<u64>,
}

/// Stack capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Frames kept per report, counted from the innermost frame.
    pub max_frames: usize,
    /// Frames skipped by `report_error` in addition to the reporter's own.
    pub default_skip: usize,
}

/// Context scrubbing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrubConfig {
    /// Field names replaced by the redaction marker. Matching is exact and
    /// ASCII case-insensitive.
    pub fields: Vec<String>,
}

/// Logging settings.
///
/// Crashline never installs a subscriber itself. The host reads this
/// section and feeds [`LoggingConfig::filter_directive`] into its own
/// `tracing_subscriber::EnvFilter`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level a host should enable for Crashline's tracing targets:
    /// `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/crashline/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("crashline")
            .join("config.yaml")
    }

    /// Apply `CRASHLINE_*` environment variables on top of this config.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup. Empty values are ignored.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get(ENV_ACCESS_TOKEN) {
            self.reporter.access_token = Some(token);
        }
        if let Some(environment) = get(ENV_ENVIRONMENT) {
            self.reporter.environment = environment;
        }
        if let Some(endpoint) = get(ENV_ENDPOINT) {
            self.reporter.endpoint = endpoint;
        }
        self
    }
}

impl DeliveryConfig {
    /// Per-request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Configured flush bound, if any.
    pub fn flush_timeout(&self) -> Option<Duration> {
        self.flush_timeout_secs.map(Duration::from_secs)
    }
}

// ---------------------------------------------------------------------------
// Config::default()
// ---------------------------------------------------------------------------

// Config derives Default because all its fields implement Default.
// (clippy::derivable_impls)

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            environment: "development".to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            platform: std::env::consts::OS.to_string(),
            server_host: None,
            code_version: None,
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
            max_concurrent: 4,
            request_timeout_secs: 10,
            flush_timeout_secs: None,
        }
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            max_frames: 64,
            default_skip: 0,
        }
    }
}

/// Field names scrubbed when no list is configured.
pub const DEFAULT_SCRUB_FIELDS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "access_token",
    "refresh_token",
    "api_key",
    "apikey",
    "authorization",
    "client_secret",
    "confirm_password",
    "password_confirmation",
    "secret_token",
];

impl Default for ScrubConfig {
    fn default() -> Self {
        Self {
            fields: DEFAULT_SCRUB_FIELDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Tracing targets emitted by Crashline crates.
pub const LOG_TARGETS: &[&str] = &["crashline_reporter", "crashline_http"];

impl LoggingConfig {
    /// Filter directive enabling `level` for Crashline's targets only,
    /// e.g. `crashline_reporter=debug,crashline_http=debug`.
    pub fn filter_directive(&self) -> String {
        LOG_TARGETS
            .iter()
            .map(|target| format!("{target}={}", self.level))
            .collect::<Vec<_>>()
            .join(",")
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"delivery.queue_capacity"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound for `delivery.max_concurrent`.
const MAX_CONCURRENT_DELIVERIES: usize = 64;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- reporter ---
        if self.reporter.environment.trim().is_empty() {
            errors.push(ValidationError {
                field: "reporter.environment".into(),
                message: "must not be empty".into(),
            });
        }
        if !(self.reporter.endpoint.starts_with("http://")
            || self.reporter.endpoint.starts_with("https://"))
        {
            errors.push(ValidationError {
                field: "reporter.endpoint".into(),
                message: format!(
                    "must be an http(s) URL, got '{}'",
                    self.reporter.endpoint
                ),
            });
        }

        // --- delivery ---
        if self.delivery.queue_capacity == 0 {
            errors.push(ValidationError {
                field: "delivery.queue_capacity".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.delivery.max_concurrent == 0
            || self.delivery.max_concurrent > MAX_CONCURRENT_DELIVERIES
        {
            errors.push(ValidationError {
                field: "delivery.max_concurrent".into(),
                message: format!("must be in range 1..={MAX_CONCURRENT_DELIVERIES}"),
            });
        }
        if self.delivery.request_timeout_secs == 0 {
            errors.push(ValidationError {
                field: "delivery.request_timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- trace ---
        if self.trace.max_frames == 0 {
            errors.push(ValidationError {
                field: "trace.max_frames".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- scrubbing ---
        if self.scrubbing.fields.iter().any(|f| f.trim().is_empty()) {
            errors.push(ValidationError {
                field: "scrubbing.fields".into(),
                message: "field names must not be blank".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use crashline_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .access_token("post_server_item_token")
///     .environment("production")
///     .delivery_max_concurrent(2)
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- reporter ---

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.config.reporter.access_token = Some(token.into());
        self
    }

    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.config.reporter.environment = environment.into();
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.reporter.endpoint = endpoint.into();
        self
    }

    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.config.reporter.platform = platform.into();
        self
    }

    pub fn server_host(mut self, host: impl Into<String>) -> Self {
        self.config.reporter.server_host = Some(host.into());
        self
    }

    pub fn code_version(mut self, version: impl Into<String>) -> Self {
        self.config.reporter.code_version = Some(version.into());
        self
    }

    // --- delivery ---

    pub fn delivery_queue_capacity(mut self, n: usize) -> Self {
        self.config.delivery.queue_capacity = n;
        self
    }

    pub fn delivery_max_concurrent(mut self, n: usize) -> Self {
        self.config.delivery.max_concurrent = n;
        self
    }

    pub fn delivery_request_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.delivery.request_timeout_secs = seconds;
        self
    }

    pub fn delivery_flush_timeout_secs(mut self, seconds: u64) -> Self {
        self.config.delivery.flush_timeout_secs = Some(seconds);
        self
    }

    // --- trace ---

    pub fn trace_max_frames(mut self, n: usize) -> Self {
        self.config.trace.max_frames = n;
        self
    }

    pub fn trace_default_skip(mut self, n: usize) -> Self {
        self.config.trace.default_skip = n;
        self
    }

    // --- scrubbing ---

    pub fn scrub_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.scrubbing.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn scrub_field(mut self, field: impl Into<String>) -> Self {
        self.config.scrubbing.fields.push(field.into());
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
