//! JSON bodies exchanged with the site file service
//!
//! Every response carries `success`; failures add `error` and sometimes
//! `details`. Payload fields are optional here so that a failure body
//! still deserializes into the same envelope.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sitefile_editor::{EditorError, HeaderPreset, ServiceResult, Template};
use sitefile_grammar::{Site, SiteFile};

pub const PARSE: &str = "/api/parse";
pub const GENERATE: &str = "/api/generate";
pub const VALIDATE: &str = "/api/validate";
pub const DOCUMENT: &str = "/api/caddyfile";
pub const RELOAD: &str = "/api/reload";
pub const TEMPLATES: &str = "/api/templates";
pub const HEADERS: &str = "/api/headers";
pub const LOGIN: &str = "/api/login";

#[derive(Debug, Serialize)]
pub struct ContentRequest<'a> {
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
pub struct ModelRequest<'a> {
    pub sites: &'a [Site],
    pub unparsed: &'a [String],
}

impl<'a> From<&'a SiteFile> for ModelRequest<'a> {
    fn from(model: &'a SiteFile) -> Self {
        Self {
            sites: &model.sites,
            unparsed: &model.unparsed,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub token: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

impl<T> Envelope<T> {
    /// Body of a successful reply, or the service's own failure reason
    pub fn into_result(self, operation: &str) -> ServiceResult<T> {
        if self.success {
            return Ok(self.body);
        }
        let message = self
            .error
            .unwrap_or_else(|| format!("{} failed", operation));
        Err(match self.details {
            Some(details) => EditorError::validation_with_details(message, details),
            None => EditorError::validation(message),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ModelBody {
    #[serde(default)]
    pub sites: Vec<Site>,
    #[serde(default)]
    pub unparsed: Vec<String>,
}

impl From<ModelBody> for SiteFile {
    fn from(body: ModelBody) -> Self {
        SiteFile::new(body.sites, body.unparsed)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ContentBody {
    pub content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DocumentBody {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub sites: Vec<Site>,
    #[serde(default)]
    pub unparsed: Vec<String>,
    #[serde(default)]
    pub path: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SaveBody {
    pub content: Option<String>,
    pub message: Option<String>,
}

/// `success` only says the check ran; `valid` is the verdict
#[derive(Debug, Default, Deserialize)]
pub struct ValidateBody {
    #[serde(default = "default_valid")]
    pub valid: bool,
    pub message: Option<String>,
}

fn default_valid() -> bool {
    true
}

#[derive(Debug, Default, Deserialize)]
pub struct MessageBody {
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TemplatesBody {
    #[serde(default)]
    pub templates: BTreeMap<String, Template>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HeadersBody {
    #[serde(default)]
    pub headers: Vec<HeaderPreset>,
}
