//! Collaborator contracts
//!
//! The editor never parses, stores or authenticates by itself. Each of
//! those concerns is a trait object so the same controller runs against
//! the HTTP backend, the in-process grammar, or a test fake.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sitefile_grammar::{Site, SiteFile};

use crate::errors::EditorError;
use crate::schema::HeaderPreset;

pub type ServiceResult<T> = Result<T, EditorError>;

/// Text ⇄ structure conversion
#[async_trait]
pub trait Grammar: Send + Sync {
    /// Must be idempotent and accept empty input
    async fn parse(&self, text: &str) -> ServiceResult<SiteFile>;

    async fn generate(&self, model: &SiteFile) -> ServiceResult<String>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationInput {
    Structured(SiteFile),
    Text(String),
}

#[async_trait]
pub trait Validator: Send + Sync {
    /// Check without touching stored state
    async fn validate(&self, input: &ValidationInput) -> ServiceResult<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedDocument {
    pub model: SiteFile,
    pub text: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SavedDocument {
    /// Canonical text the store regenerated
    pub text: String,
    pub message: Option<String>,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn load(&self) -> ServiceResult<LoadedDocument>;

    async fn save(&self, model: &SiteFile) -> ServiceResult<SavedDocument>;
}

/// Tell the live server to re-read its configuration
#[async_trait]
pub trait ReloadSignal: Send + Sync {
    async fn reload(&self) -> ServiceResult<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sites: Vec<Site>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[async_trait]
pub trait TemplateCatalog: Send + Sync {
    async fn templates(&self) -> ServiceResult<BTreeMap<String, Template>>;
}

/// Header presets offered by the server
#[async_trait]
pub trait HeaderCatalog: Send + Sync {
    async fn header_presets(&self) -> ServiceResult<Vec<HeaderPreset>>;
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn login(&self, token: &str) -> ServiceResult<()>;

    /// The stored credential was rejected
    fn on_unauthorized(&self);
}

/// One handle per collaborator
#[derive(Clone)]
pub struct Services {
    pub grammar: Arc<dyn Grammar>,
    pub validator: Arc<dyn Validator>,
    pub store: Arc<dyn DocumentStore>,
    pub reload: Arc<dyn ReloadSignal>,
    pub templates: Arc<dyn TemplateCatalog>,
    pub headers: Arc<dyn HeaderCatalog>,
    pub auth: Arc<dyn Authenticator>,
}

impl Services {
    /// Every collaborator served by one backend
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: Grammar
            + Validator
            + DocumentStore
            + ReloadSignal
            + TemplateCatalog
            + HeaderCatalog
            + Authenticator
            + 'static,
    {
        Self {
            grammar: backend.clone(),
            validator: backend.clone(),
            store: backend.clone(),
            reload: backend.clone(),
            templates: backend.clone(),
            headers: backend.clone(),
            auth: backend,
        }
    }

    /// Same services with a different grammar
    pub fn with_grammar(mut self, grammar: Arc<dyn Grammar>) -> Self {
        self.grammar = grammar;
        self
    }
}

/// In-process grammar backed by `sitefile-grammar`
#[derive(Debug, Clone, Copy)]
pub struct LocalGrammar {
    pub indent: usize,
}

impl Default for LocalGrammar {
    fn default() -> Self {
        Self { indent: 4 }
    }
}

#[async_trait]
impl Grammar for LocalGrammar {
    async fn parse(&self, text: &str) -> ServiceResult<SiteFile> {
        Ok(sitefile_grammar::parse(text)?)
    }

    async fn generate(&self, model: &SiteFile) -> ServiceResult<String> {
        Ok(sitefile_grammar::Serializer::with_indent(self.indent).serialize(model))
    }
}
