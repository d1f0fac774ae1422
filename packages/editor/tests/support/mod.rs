//! In-memory collaborators for controller tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sitefile_editor::{
    Authenticator, DocumentStore, EditorError, EditorEvent, Grammar, HeaderCatalog, HeaderPreset,
    LoadedDocument, ReloadSignal, SavedDocument, ServiceResult, Services, SiteFile, SyncConfig,
    SyncController, Template, TemplateCatalog, ValidationInput, Validator,
};
use tokio::sync::broadcast;

pub const PATH: &str = "/etc/caddy/Caddyfile";

#[derive(Default)]
pub struct FakeBackend {
    pub stored_text: Mutex<String>,
    pub templates: Mutex<BTreeMap<String, Template>>,
    /// `None` answers like a server without the endpoint
    pub header_presets: Mutex<Option<Vec<HeaderPreset>>>,

    pub parse_delay: Mutex<Duration>,
    pub load_delay: Mutex<Duration>,
    pub save_delay: Mutex<Duration>,
    pub fail_save: Mutex<Option<EditorError>>,
    pub fail_generate: Mutex<Option<EditorError>>,

    pub parse_calls: AtomicUsize,
    pub generate_calls: AtomicUsize,
    pub save_calls: AtomicUsize,
    pub reload_calls: AtomicUsize,
    pub unauthorized_calls: AtomicUsize,

    pub saved: Mutex<Vec<SiteFile>>,
    pub validated: Mutex<Vec<ValidationInput>>,
    pub logins: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn with_text(text: &str) -> Arc<Self> {
        let backend = Self::default();
        *backend.stored_text.lock().unwrap() = text.to_string();
        Arc::new(backend)
    }

    pub fn controller(self: &Arc<Self>) -> SyncController {
        SyncController::new(Services::from_backend(self.clone()), SyncConfig::default())
    }

    pub fn parses(&self) -> usize {
        self.parse_calls.load(Ordering::SeqCst)
    }

    pub fn generates(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn saves(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn unauthorized(&self) -> usize {
        self.unauthorized_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Grammar for FakeBackend {
    async fn parse(&self, text: &str) -> ServiceResult<SiteFile> {
        self.parse_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.parse_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(sitefile_grammar::parse(text)?)
    }

    async fn generate(&self, model: &SiteFile) -> ServiceResult<String> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.fail_generate.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(sitefile_grammar::generate(model))
    }
}

#[async_trait]
impl Validator for FakeBackend {
    async fn validate(&self, input: &ValidationInput) -> ServiceResult<()> {
        self.validated.lock().unwrap().push(input.clone());
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FakeBackend {
    async fn load(&self) -> ServiceResult<LoadedDocument> {
        let delay = *self.load_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let text = self.stored_text.lock().unwrap().clone();
        Ok(LoadedDocument {
            model: sitefile_grammar::parse(&text)?,
            text,
            path: PATH.to_string(),
        })
    }

    async fn save(&self, model: &SiteFile) -> ServiceResult<SavedDocument> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.save_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.fail_save.lock().unwrap().clone() {
            return Err(err);
        }
        let text = sitefile_grammar::generate(model);
        *self.stored_text.lock().unwrap() = text.clone();
        self.saved.lock().unwrap().push(model.clone());
        Ok(SavedDocument {
            text,
            message: None,
        })
    }
}

#[async_trait]
impl ReloadSignal for FakeBackend {
    async fn reload(&self) -> ServiceResult<()> {
        self.reload_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl TemplateCatalog for FakeBackend {
    async fn templates(&self) -> ServiceResult<BTreeMap<String, Template>> {
        Ok(self.templates.lock().unwrap().clone())
    }
}

#[async_trait]
impl HeaderCatalog for FakeBackend {
    async fn header_presets(&self) -> ServiceResult<Vec<HeaderPreset>> {
        self.header_presets
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| EditorError::Transport("HTTP 404".into()))
    }
}

#[async_trait]
impl Authenticator for FakeBackend {
    async fn login(&self, token: &str) -> ServiceResult<()> {
        if token == "bad" {
            return Err(EditorError::Unauthorized);
        }
        self.logins.lock().unwrap().push(token.to_string());
        Ok(())
    }

    fn on_unauthorized(&self) {
        self.unauthorized_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// Let spawned tasks run to their next await point
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Events received so far
pub fn drain(events: &mut broadcast::Receiver<EditorEvent>) -> Vec<EditorEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

/// Site file text with `count` sites named `site0.test`, `site1.test`, ...
pub fn many_sites(count: usize) -> String {
    (0..count)
        .map(|i| format!("site{}.test {{\n    respond \"site {}\"\n}}", i, i))
        .collect::<Vec<_>>()
        .join("\n\n")
}
