//! Item payload encoding
//!
//! Turns a [`Report`] into the JSON document POSTed to the ingestion
//! endpoint:
//!
//! ```text
//! { "access_token": "...",
//!   "data": { "environment", "title", "level", "timestamp", "uuid",
//!             "platform", "language", "code_version", "fingerprint",
//!             "server": { "host" }, "notifier": { "name", "version" },
//!             "body": { "trace": { "frames", "exception" } }
//!                   | { "message": { "body", "trace_frames"? } },
//!             "request": { ... } } }
//! ```
//!
//! Frames are written in capture order, innermost first.

use crashline_core::{
    config::ReporterConfig,
    domain::{Frame, Report, ReportKind},
};
use serde_json::{json, Map, Value};

/// Notifier name sent with every item
pub const NOTIFIER_NAME: &str = "crashline";

/// Notifier version sent with every item
pub const NOTIFIER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Language tag sent with every item
pub const LANGUAGE: &str = "rust";

/// Host name used when neither the config nor the OS provides one
const UNKNOWN_HOST: &str = "unknown";

/// Per-deployment values written into every payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadSettings {
    pub access_token: Option<String>,
    pub environment: String,
    pub platform: String,
    pub code_version: Option<String>,
    pub server_host: String,
}

impl PayloadSettings {
    /// Builds settings from the reporter section of the config
    ///
    /// A missing `server_host` falls back to the machine's host name.
    pub fn from_config(config: &ReporterConfig) -> Self {
        let server_host = config
            .server_host
            .clone()
            .filter(|h| !h.trim().is_empty())
            .or_else(local_hostname)
            .unwrap_or_else(|| UNKNOWN_HOST.to_string());

        Self {
            access_token: config.access_token.clone(),
            environment: config.environment.clone(),
            platform: config.platform.clone(),
            code_version: config.code_version.clone(),
            server_host,
        }
    }
}

impl Default for PayloadSettings {
    fn default() -> Self {
        Self::from_config(&ReporterConfig::default())
    }
}

fn local_hostname() -> Option<String> {
    hostname::get()
        .ok()
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty())
}

/// Encodes a report into the item payload
pub fn encode(report: &Report, settings: &PayloadSettings) -> Value {
    let mut data = Map::new();
    data.insert("environment".into(), json!(settings.environment));
    data.insert("title".into(), json!(report.title()));
    data.insert("level".into(), json!(report.level()));
    data.insert("timestamp".into(), json!(report.timestamp().timestamp()));
    data.insert("uuid".into(), json!(report.id().to_string()));
    data.insert("platform".into(), json!(settings.platform));
    data.insert("language".into(), json!(LANGUAGE));
    if let Some(version) = &settings.code_version {
        data.insert("code_version".into(), json!(version));
    }
    if let Some(fingerprint) = report.fingerprint() {
        data.insert("fingerprint".into(), json!(fingerprint));
    }
    data.insert("server".into(), json!({ "host": settings.server_host }));
    data.insert(
        "notifier".into(),
        json!({ "name": NOTIFIER_NAME, "version": NOTIFIER_VERSION }),
    );
    data.insert("body".into(), encode_body(report));
    if let Some(context) = report.context() {
        data.insert("request".into(), json!(context));
    }

    let mut item = Map::new();
    if let Some(token) = &settings.access_token {
        item.insert("access_token".into(), json!(token));
    }
    item.insert("data".into(), Value::Object(data));
    Value::Object(item)
}

fn encode_body(report: &Report) -> Value {
    match report.kind() {
        ReportKind::Error => {
            let mut exception = Map::new();
            exception.insert(
                "class".into(),
                json!(report.fingerprint().unwrap_or(report.title())),
            );
            exception.insert("message".into(), json!(report.title()));
            if !report.error_chain().is_empty() {
                exception.insert(
                    "description".into(),
                    json!(describe_chain(report.error_chain())),
                );
            }
            json!({
                "trace": {
                    "frames": encode_frames(report.frames()),
                    "exception": exception,
                }
            })
        }
        ReportKind::Message => {
            let mut message = Map::new();
            message.insert("body".into(), json!(report.title()));
            if !report.frames().is_empty() {
                message.insert("trace_frames".into(), encode_frames(report.frames()));
            }
            json!({ "message": message })
        }
    }
}

fn encode_frames(frames: &[Frame]) -> Value {
    Value::Array(
        frames
            .iter()
            .map(|frame| {
                json!({
                    "filename": frame.file,
                    "method": frame.function,
                    "lineno": frame.line,
                })
            })
            .collect(),
    )
}

fn describe_chain(chain: &[String]) -> String {
    chain
        .iter()
        .map(|cause| format!("caused by: {cause}"))
        .collect::<Vec<_>>()
        .join("\n")
}
