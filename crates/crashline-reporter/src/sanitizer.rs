//! Context sanitization
//!
//! Request data attached to a report goes through two passes before it
//! leaves the process:
//!
//! 1. **Scrub**: any field whose name is on the scrub list (exact match,
//!    ASCII case-insensitive) is replaced by the redaction marker.
//! 2. **Flatten**: a field holding exactly one value becomes a scalar; any
//!    other arity stays a sequence in its original order.
//!
//! Only the method, URL and remote address of a request are read. Headers,
//! bodies and cookies never reach a report.

use std::collections::BTreeMap;

use crashline_core::{
    config::ScrubConfig,
    domain::{ContextValue, SanitizedContext},
    ports::IRequest,
};
use tracing::warn;

/// Key under which decoded query parameters are nested
pub const QUERY_PARAMS_KEY: &str = "GET";

/// Scrubs and flattens context values
#[derive(Debug, Clone)]
pub struct ContextSanitizer {
    /// Scrub list, lowercased
    scrub_fields: Vec<String>,
}

impl ContextSanitizer {
    /// Creates a sanitizer with the given scrub list
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            scrub_fields: fields
                .into_iter()
                .map(|f| f.as_ref().trim().to_ascii_lowercase())
                .filter(|f| !f.is_empty())
                .collect(),
        }
    }

    /// Creates a sanitizer from the scrubbing section of the config
    pub fn from_config(config: &ScrubConfig) -> Self {
        Self::new(&config.fields)
    }

    /// Returns true if `name` is on the scrub list
    pub fn is_scrubbed(&self, name: &str) -> bool {
        self.scrub_fields
            .iter()
            .any(|field| field.eq_ignore_ascii_case(name))
    }

    /// Scrubs and flattens a multi-valued mapping
    ///
    /// The input is only borrowed; a new context is returned.
    pub fn sanitize<'a, I>(&self, raw: I) -> SanitizedContext
    where
        I: IntoIterator<Item = (&'a String, &'a Vec<String>)>,
    {
        raw.into_iter()
            .map(|(name, values)| {
                let value = if self.is_scrubbed(name) {
                    ContextValue::redacted()
                } else {
                    flatten(values)
                };
                (name.clone(), value)
            })
            .collect()
    }

    /// Extracts the fixed request fields
    ///
    /// `url` is kept verbatim, `query_string` is the raw text between `?`
    /// and any `#` fragment (empty when there is none), `user_ip` is
    /// omitted when unknown.
    pub fn extract_request_fields(&self, request: &dyn IRequest) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        fields.insert("url".to_string(), request.url().to_string());
        fields.insert("method".to_string(), request.method().to_string());
        fields.insert(
            "query_string".to_string(),
            raw_query(request.url()).to_string(),
        );
        if let Some(addr) = request.remote_addr() {
            fields.insert("user_ip".to_string(), addr.to_string());
        }
        fields
    }

    /// Decodes the query string of a request into per-name value lists
    ///
    /// Values keep their order of appearance. Parameters with a blank
    /// name are dropped.
    pub fn query_params(&self, request: &dyn IRequest) -> BTreeMap<String, Vec<String>> {
        let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in url::form_urlencoded::parse(raw_query(request.url()).as_bytes()) {
            if name.trim().is_empty() {
                warn!(
                    url = %request.url(),
                    value_len = value.len(),
                    "Dropping query parameter with blank name"
                );
                continue;
            }
            params
                .entry(name.into_owned())
                .or_default()
                .push(value.into_owned());
        }
        params
    }

    /// Full sanitized context for a request
    ///
    /// The fixed request fields as scalars plus the scrubbed and flattened
    /// query parameters under `GET`.
    pub fn request_context(&self, request: &dyn IRequest) -> SanitizedContext {
        let mut context: SanitizedContext = self
            .extract_request_fields(request)
            .into_iter()
            .map(|(name, value)| (name, ContextValue::Scalar(value)))
            .collect();
        let params = self.query_params(request);
        context.insert(QUERY_PARAMS_KEY, self.sanitize(&params));
        context
    }
}

impl Default for ContextSanitizer {
    fn default() -> Self {
        Self::from_config(&ScrubConfig::default())
    }
}

fn flatten(values: &[String]) -> ContextValue {
    match values {
        [single] => ContextValue::Scalar(single.clone()),
        _ => ContextValue::Sequence(values.to_vec()),
    }
}

/// Query component of `url`: the text between the first `?` and the
/// fragment. A `?` inside the fragment does not start a query.
fn raw_query(url: &str) -> &str {
    let without_fragment = url.split_once('#').map_or(url, |(head, _)| head);
    without_fragment
        .split_once('?')
        .map_or("", |(_, query)| query)
}
