//! Archive URL construction.
//!
//! The configured base is either a template containing `{wnid}` or a plain
//! base URL, in which case `/<wnid>.tar` is appended as one path segment.
//! Either way the identifier is percent-encoded, so `#`, `?` or `%` in an id
//! never change which resource is requested.

use url::{form_urlencoded, Url};

use crate::class_id::ClassId;
use crate::config::ConfigError;

const PLACEHOLDER: &str = "{wnid}";

/// Validated source URL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlTemplate {
    raw: String,
    /// Parsed base when `raw` has no placeholder.
    base: Option<Url>,
}

impl UrlTemplate {
    /// Parses and validates a base URL or template. Only absolute http(s) URLs are accepted.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            url: raw.to_string(),
            reason,
        };
        // Validate with a sample id so the placeholder does not trip the parser.
        let sample = raw.replace(PLACEHOLDER, "n00000000");
        let parsed = Url::parse(&sample).map_err(|e| invalid(e.to_string()))?;
        match parsed.scheme() {
            "http" | "https" => {}
            other => return Err(invalid(format!("unsupported scheme {other:?}"))),
        }
        if parsed.host_str().is_none() {
            return Err(invalid("missing host".to_string()));
        }
        let base = (!raw.contains(PLACEHOLDER)).then_some(parsed);
        Ok(Self {
            raw: raw.to_string(),
            base,
        })
    }

    /// URL of the archive for `id`.
    pub fn archive_url(&self, id: &ClassId) -> String {
        let Some(base) = &self.base else {
            let encoded: String = form_urlencoded::byte_serialize(id.as_str().as_bytes()).collect();
            return self.raw.replace(PLACEHOLDER, &encoded);
        };
        let mut url = base.clone();
        // http(s) URLs always have a hierarchical path, so this cannot fail.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&format!("{id}.tar"));
        }
        url.into()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}
