//! # Synchronization Controller
//!
//! Keeps the structured model and the raw text converging on one document.
//!
//! ```text
//!             apply(mutation)                 on_text_edit(text)
//!                   │                                │
//!                   ▼                                ▼ debounce
//!   Idle ──▶ SyncingToText ──▶ Idle    Idle ──▶ SyncingToStructured ──▶ Idle
//!              generate()                        parse()
//! ```
//!
//! ## Rules
//!
//! 1. One sync in flight at a time. A request that finds the controller
//!    busy is dropped, not queued; the next edit starts a fresh one.
//! 2. Text edits re-parse after a quiet period measured from the latest
//!    keystroke. Text equal to the last synchronized text never re-parses.
//! 3. A result is applied only if it differs from what is already shown.
//! 4. Loading bypasses the guard. Results of syncs started before a load
//!    are discarded.
//! 5. No lock is held across a collaborator call; keystrokes keep landing
//!    in local state while a call is pending.
//! 6. Saving first settles the active view; a sync already in flight is
//!    waited out. The store's canonical text is adopted only if nothing
//!    was edited while the save was pending.
//!
//! `Unauthorized` is handled here and nowhere else: the authenticator is
//! told once per failed call and subscribers get [`EditorEvent::AuthRequired`].
//! Every other failure becomes an error notice and leaves local edits alone.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use sitefile_grammar::Site;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::codec;
use crate::config::SyncConfig;
use crate::document::{DocumentState, EditMode};
use crate::errors::EditorError;
use crate::events::{BusyGuard, EditorEvent, Notice, NoticeLevel, Notifier};
use crate::mutations::{Mutation, MutationOutcome};
use crate::schema::{HeaderPreset, HEADER_PRESETS};
use crate::services::{Services, Template, ValidationInput};
use crate::view_state::{SiteListView, ViewSnapshot};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncPhase {
    #[default]
    Idle,
    SyncingToText,
    SyncingToStructured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Target representation replaced
    Applied,
    /// Result matched what was already shown
    Unchanged,
    /// Another sync was in flight
    Dropped,
    /// Document was reloaded or edited in the target view meanwhile
    Stale,
}

struct Shared {
    doc: DocumentState,
    phase: SyncPhase,
    last_synced_text: String,
    pending: Option<JoinHandle<()>>,
    debounce_generation: u64,
    /// Bumped by every load
    epoch: u64,
    view: Option<Box<dyn SiteListView + Send>>,
    templates: BTreeMap<String, Template>,
    header_presets: Vec<HeaderPreset>,
}

struct Inner {
    services: Services,
    config: SyncConfig,
    notifier: Notifier,
    shared: Mutex<Shared>,
}

/// Owner of the document state and the only writer to it
#[derive(Clone)]
pub struct SyncController {
    inner: Arc<Inner>,
}

/// Returns the phase to `Idle` when dropped
struct PhaseGuard {
    controller: SyncController,
}

impl Drop for PhaseGuard {
    fn drop(&mut self) {
        self.controller.shared().phase = SyncPhase::Idle;
        tracing::trace!("sync phase -> Idle");
        self.controller
            .inner
            .notifier
            .emit(EditorEvent::PhaseChanged(SyncPhase::Idle));
    }
}

impl SyncController {
    pub fn new(services: Services, config: SyncConfig) -> Self {
        Self::with_document(services, config, DocumentState::default())
    }

    pub fn with_document(services: Services, config: SyncConfig, doc: DocumentState) -> Self {
        let notifier = Notifier::new(config.notice_ttl(), config.busy_fallback());
        let last_synced_text = doc.raw_text.clone();
        Self {
            inner: Arc::new(Inner {
                services,
                config,
                notifier,
                shared: Mutex::new(Shared {
                    doc,
                    phase: SyncPhase::Idle,
                    last_synced_text,
                    pending: None,
                    debounce_generation: 0,
                    epoch: 0,
                    view: None,
                    templates: BTreeMap::new(),
                    header_presets: HEADER_PRESETS.to_vec(),
                }),
            }),
        }
    }

    fn shared(&self) -> MutexGuard<'_, Shared> {
        self.inner
            .shared
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.inner.notifier.subscribe()
    }

    /// Copy of the current document state
    pub fn snapshot(&self) -> DocumentState {
        self.shared().doc.clone()
    }

    pub fn phase(&self) -> SyncPhase {
        self.shared().phase
    }

    pub fn current_notice(&self) -> Option<Notice> {
        self.inner.notifier.current_notice()
    }

    /// A re-parse is scheduled but has not started
    pub fn has_pending_sync(&self) -> bool {
        self.shared().pending.is_some()
    }

    pub fn attach_view(&self, view: Box<dyn SiteListView + Send>) {
        self.shared().view = Some(view);
    }

    pub fn detach_view(&self) -> Option<Box<dyn SiteListView + Send>> {
        self.shared().view.take()
    }

    pub fn templates(&self) -> BTreeMap<String, Template> {
        self.shared().templates.clone()
    }

    /// Last fetched header presets, the built-in list until then
    pub fn header_presets(&self) -> Vec<HeaderPreset> {
        self.shared().header_presets.clone()
    }

    pub fn select_site(&self, index: Option<usize>) -> Result<(), EditorError> {
        Ok(self.shared().doc.select(index)?)
    }

    fn try_begin(&self, phase: SyncPhase) -> Option<PhaseGuard> {
        {
            let mut shared = self.shared();
            if shared.phase != SyncPhase::Idle {
                tracing::debug!(in_flight = ?shared.phase, requested = ?phase, "sync dropped");
                return None;
            }
            shared.phase = phase;
        }
        tracing::trace!(?phase, "sync phase -> {:?}", phase);
        self.inner.notifier.emit(EditorEvent::PhaseChanged(phase));
        Some(PhaseGuard {
            controller: self.clone(),
        })
    }

    async fn call<T, F>(&self, what: &str, limit: Duration, fut: F) -> Result<T, EditorError>
    where
        F: Future<Output = Result<T, EditorError>>,
    {
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(what, ?limit, "collaborator call timed out");
                Err(EditorError::NetworkTimeout(format!("{} after {:?}", what, limit)))
            }
        }
    }

    /// Route a failure: 401 to re-authentication, anything else to a notice
    pub fn handle_failure(&self, err: &EditorError) {
        if err.is_unauthorized() {
            tracing::warn!("credential rejected, re-authentication required");
            self.inner.services.auth.on_unauthorized();
            self.inner.notifier.emit(EditorEvent::AuthRequired);
        } else {
            tracing::warn!(error = %err, "operation failed");
            self.inner
                .notifier
                .notify(NoticeLevel::Error, err.user_message());
        }
    }

    fn begin_busy(&self, label: &str) -> BusyGuard {
        self.inner.notifier.begin_busy(label)
    }

    // ---- structured edits ----

    /// Apply a structured edit and regenerate the text right away
    pub fn apply(&self, mutation: Mutation) -> Result<MutationOutcome, EditorError> {
        let outcome = self.shared().doc.apply(&mutation)?;
        tracing::debug!(?outcome, "structured edit applied");
        self.spawn_sync_to_text();
        Ok(outcome)
    }

    fn spawn_sync_to_text(&self) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let controller = self.clone();
                handle.spawn(async move {
                    if let Ok(outcome) = controller.sync_to_text().await {
                        tracing::trace!(?outcome, "background sync to text finished");
                    }
                });
            }
            Err(_) => tracing::warn!("no async runtime, text view not regenerated"),
        }
    }

    // ---- text edits ----

    /// Record the text view's content and schedule a debounced re-parse
    pub fn on_text_edit(&self, text: impl Into<String>) {
        let text = text.into();
        let mut shared = self.shared();

        if let Some(pending) = shared.pending.take() {
            pending.abort();
            tracing::trace!("pending re-parse cancelled");
        }

        if text == shared.last_synced_text {
            // our own programmatic update, or typed back to the synced text
            shared.doc.replace_text(text);
            return;
        }

        shared.doc.set_text(text);
        shared.debounce_generation += 1;
        let generation = shared.debounce_generation;

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no async runtime, text edit not re-parsed");
            return;
        };

        let deadline = Instant::now() + self.inner.config.debounce();
        let controller = self.clone();
        shared.pending = Some(handle.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            {
                let mut shared = controller.shared();
                if shared.debounce_generation != generation {
                    return;
                }
                shared.pending = None;
            }
            if let Ok(outcome) = controller.sync_from_text().await {
                tracing::trace!(?outcome, "debounced re-parse finished");
            }
        }));
    }

    /// Cancel any scheduled re-parse and run it now
    pub async fn flush_text_edits(&self) -> Result<SyncOutcome, EditorError> {
        let needs_parse = {
            let mut shared = self.shared();
            if let Some(pending) = shared.pending.take() {
                pending.abort();
            }
            shared.doc.raw_text != shared.last_synced_text
        };
        if needs_parse {
            self.sync_from_text().await
        } else {
            Ok(SyncOutcome::Unchanged)
        }
    }

    /// Flush text edits for a save, waiting out a sync already in flight
    async fn settle_text_edits(&self) -> Result<SyncOutcome, EditorError> {
        for _ in 0..3 {
            let mut events = self.subscribe();
            match self.flush_text_edits().await? {
                SyncOutcome::Dropped => self.wait_for_idle(&mut events).await?,
                SyncOutcome::Stale => {}
                outcome => return Ok(outcome),
            }
        }
        let err = EditorError::validation("Text view is still synchronizing, not saved");
        self.handle_failure(&err);
        Err(err)
    }

    async fn wait_for_idle(
        &self,
        events: &mut broadcast::Receiver<EditorEvent>,
    ) -> Result<(), EditorError> {
        let idle = async {
            while self.phase() != SyncPhase::Idle {
                match events.recv().await {
                    Ok(EditorEvent::PhaseChanged(SyncPhase::Idle))
                    | Err(broadcast::error::RecvError::Closed) => break,
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                }
            }
        };
        let limit = self.inner.config.request_timeout();
        if tokio::time::timeout(limit, idle).await.is_err() {
            let err = EditorError::NetworkTimeout(format!("sync after {:?}", limit));
            self.handle_failure(&err);
            return Err(err);
        }
        tracing::trace!("in-flight sync settled");
        Ok(())
    }

    // ---- syncs ----

    /// Regenerate the text view from the structured model
    pub async fn sync_to_text(&self) -> Result<SyncOutcome, EditorError> {
        let result = self.run_sync_to_text().await;
        if let Err(err) = &result {
            self.handle_failure(err);
        }
        result
    }

    async fn run_sync_to_text(&self) -> Result<SyncOutcome, EditorError> {
        let Some(_phase) = self.try_begin(SyncPhase::SyncingToText) else {
            return Ok(SyncOutcome::Dropped);
        };

        let (mut model, epoch, version) = {
            let shared = self.shared();
            (shared.doc.to_site_file(), shared.epoch, shared.doc.version)
        };
        codec::encode_credential_fields(&mut model.sites);

        let grammar = self.inner.services.grammar.clone();
        let text = self
            .call("generate", self.inner.config.request_timeout(), grammar.generate(&model))
            .await?;

        {
            let mut shared = self.shared();
            if shared.epoch != epoch
                || (shared.doc.mode == EditMode::Text && shared.doc.version != version)
            {
                tracing::debug!("generated text discarded, document changed meanwhile");
                return Ok(SyncOutcome::Stale);
            }
            shared.last_synced_text = text.clone();
            if shared.doc.raw_text == text {
                return Ok(SyncOutcome::Unchanged);
            }
            shared.doc.replace_text(text.clone());
        }

        tracing::debug!(chars = text.len(), "text view regenerated");
        self.inner.notifier.emit(EditorEvent::TextReplaced(text));
        Ok(SyncOutcome::Applied)
    }

    /// Rebuild the structured model from the text view
    pub async fn sync_from_text(&self) -> Result<SyncOutcome, EditorError> {
        let result = self.run_sync_from_text().await;
        if let Err(err) = &result {
            self.handle_failure(err);
        }
        result
    }

    async fn run_sync_from_text(&self) -> Result<SyncOutcome, EditorError> {
        let Some(_phase) = self.try_begin(SyncPhase::SyncingToStructured) else {
            return Ok(SyncOutcome::Dropped);
        };

        let (text, epoch, version, snapshot) = {
            let shared = self.shared();
            let snapshot = shared
                .view
                .as_deref()
                .map(|view| ViewSnapshot::capture(view, shared.doc.selected_site));
            (shared.doc.raw_text.clone(), shared.epoch, shared.doc.version, snapshot)
        };

        let grammar = self.inner.services.grammar.clone();
        let mut model = self
            .call("parse", self.inner.config.request_timeout(), grammar.parse(&text))
            .await?;
        codec::refresh_credential_cache(&mut model.sites);

        {
            let mut guard = self.shared();
            let shared = &mut *guard;
            if shared.epoch != epoch
                || (shared.doc.mode == EditMode::Structured && shared.doc.version != version)
            {
                tracing::debug!("parsed model discarded, document changed meanwhile");
                return Ok(SyncOutcome::Stale);
            }
            shared.last_synced_text = text;

            let unchanged = shared.doc.unparsed == model.unparsed
                && shared.doc.sites.len() == model.sites.len()
                && shared.doc.sites.iter().zip(&model.sites).all(|(a, b)| a.content_eq(b));
            if unchanged {
                // line hints still move when only layout changed
                for (site, parsed) in shared.doc.sites.iter_mut().zip(&model.sites) {
                    site.line_number = parsed.line_number;
                }
                return Ok(SyncOutcome::Unchanged);
            }

            shared.doc.replace_model(model);
            let site_count = shared.doc.sites.len();
            if let Some(view) = shared.view.as_deref_mut() {
                view.rebuilt(site_count);
                if let Some(snapshot) = snapshot {
                    shared.doc.selected_site = snapshot.restore(view, site_count).selected;
                }
            }
        }

        tracing::debug!("structured view rebuilt from text");
        self.inner.notifier.emit(EditorEvent::ModelRebuilt);
        Ok(SyncOutcome::Applied)
    }

    // ---- document lifecycle ----

    /// Fetch the document; both views come from the same payload
    pub async fn load_document(&self) -> Result<(), EditorError> {
        let _busy = self.begin_busy("Loading configuration");
        let store = self.inner.services.store.clone();
        let loaded = match self
            .call("load", self.inner.config.request_timeout(), store.load())
            .await
        {
            Ok(loaded) => loaded,
            Err(err) => {
                self.handle_failure(&err);
                return Err(err);
            }
        };

        let mut model = loaded.model;
        codec::refresh_credential_cache(&mut model.sites);
        let site_count = model.sites.len();

        {
            let mut shared = self.shared();
            if let Some(pending) = shared.pending.take() {
                pending.abort();
            }
            shared.epoch += 1;
            shared.debounce_generation += 1;

            let selected = shared
                .doc
                .selected_site
                .filter(|i| *i < site_count)
                .or((site_count > 0).then_some(0));
            shared.last_synced_text = loaded.text.clone();
            shared.doc = DocumentState::loaded(model, loaded.text, loaded.path);
            shared.doc.selected_site = selected;
        }

        tracing::info!(sites = site_count, "configuration loaded");
        self.inner.notifier.emit(EditorEvent::DocumentLoaded);
        Ok(())
    }

    /// Persist the structured model and adopt the store's canonical text
    pub async fn save_document(&self) -> Result<(), EditorError> {
        let _busy = self.begin_busy("Saving configuration");

        let mode = self.shared().doc.mode;
        let synced = match mode {
            EditMode::Text => self.settle_text_edits().await,
            EditMode::Structured => self.run_sync_to_text().await,
        };
        if let Err(err) = synced {
            // text mode already reported its own failure
            if mode == EditMode::Structured {
                self.handle_failure(&err);
            }
            return Err(err);
        }

        let (payload, version) = {
            let shared = self.shared();
            let duplicates = shared.doc.duplicate_addresses();
            if !duplicates.is_empty() {
                let details: Vec<String> = duplicates.iter().map(|d| d.describe()).collect();
                drop(shared);
                let err = EditorError::validation_with_details(
                    "Duplicate site addresses, not saved",
                    details.join("\n"),
                );
                self.handle_failure(&err);
                return Err(err);
            }
            let mut payload = shared.doc.filter_for_save();
            codec::encode_credential_fields(&mut payload.sites);
            (payload, shared.doc.version)
        };

        let store = self.inner.services.store.clone();
        let saved = match self
            .call("save", self.inner.config.request_timeout(), store.save(&payload))
            .await
        {
            Ok(saved) => saved,
            Err(err) => {
                self.handle_failure(&err);
                return Err(err);
            }
        };

        let (replaced, regenerate) = {
            let mut shared = self.shared();
            if shared.doc.version == version {
                // in-flight syncs predate the canonical text
                shared.epoch += 1;
                let replaced = shared.doc.raw_text != saved.text;
                shared.last_synced_text = saved.text.clone();
                shared.doc.mark_saved(saved.text.clone());
                (replaced, false)
            } else {
                // edits made during the save are not in the store yet
                shared.doc.original_text = saved.text.clone();
                shared.doc.is_saved = false;
                (false, shared.doc.mode == EditMode::Structured)
            }
        };

        tracing::info!(sites = payload.sites.len(), "configuration saved");
        if replaced {
            self.inner.notifier.emit(EditorEvent::TextReplaced(saved.text));
        }
        if regenerate {
            tracing::debug!("document edited during save, regenerating text");
            if let Ok(outcome) = self.sync_to_text().await {
                tracing::trace!(?outcome, "post-save sync to text finished");
            }
        }
        self.inner.notifier.emit(EditorEvent::DocumentSaved);
        self.inner.notifier.notify(
            NoticeLevel::Success,
            saved.message.unwrap_or_else(|| "Configuration saved".to_string()),
        );
        Ok(())
    }

    /// Validate whichever view the user is editing, without storing it
    pub async fn validate(&self) -> Result<(), EditorError> {
        let input = {
            let shared = self.shared();
            match shared.doc.mode {
                EditMode::Structured => {
                    let mut model = shared.doc.filter_for_save();
                    codec::encode_credential_fields(&mut model.sites);
                    ValidationInput::Structured(model)
                }
                EditMode::Text => ValidationInput::Text(shared.doc.raw_text.clone()),
            }
        };

        let _busy = self.begin_busy("Validating configuration");
        let validator = self.inner.services.validator.clone();
        match self
            .call("validate", self.inner.config.request_timeout(), validator.validate(&input))
            .await
        {
            Ok(()) => {
                self.inner
                    .notifier
                    .notify(NoticeLevel::Success, "Configuration is valid");
                Ok(())
            }
            Err(err) => {
                self.handle_failure(&err);
                Err(err)
            }
        }
    }

    /// Ask the live server to re-read its configuration
    pub async fn reload(&self) -> Result<(), EditorError> {
        let _busy = self.begin_busy("Reloading server");
        let signal = self.inner.services.reload.clone();
        match self
            .call("reload", self.inner.config.request_timeout(), signal.reload())
            .await
        {
            Ok(()) => {
                tracing::info!("server reload requested");
                self.inner
                    .notifier
                    .notify(NoticeLevel::Success, "Server configuration reloaded");
                Ok(())
            }
            Err(err) => {
                self.handle_failure(&err);
                Err(err)
            }
        }
    }

    /// Sign in, then reload the document with the new credential
    pub async fn login(&self, token: &str) -> Result<(), EditorError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(EditorError::validation("Please enter a token"));
        }

        let auth = self.inner.services.auth.clone();
        if let Err(err) = self
            .call("login", self.inner.config.request_timeout(), auth.login(token))
            .await
        {
            self.handle_failure(&err);
            return Err(err);
        }
        tracing::info!("signed in");
        self.load_document().await
    }

    // ---- templates ----

    /// Fetch the template catalogue; failures are logged and ignored
    pub async fn load_templates(&self) -> BTreeMap<String, Template> {
        let catalog = self.inner.services.templates.clone();
        match self
            .call("templates", self.inner.config.aux_timeout(), catalog.templates())
            .await
        {
            Ok(templates) => {
                tracing::debug!(count = templates.len(), "templates loaded");
                self.shared().templates = templates.clone();
                templates
            }
            Err(err) => {
                if err.is_unauthorized() {
                    self.handle_failure(&err);
                } else {
                    tracing::warn!(error = %err, "failed to load templates");
                }
                self.templates()
            }
        }
    }

    /// Fetch the server's header presets; any failure keeps the built-in list
    pub async fn load_header_presets(&self) -> Vec<HeaderPreset> {
        let catalog = self.inner.services.headers.clone();
        let fetched = self
            .call("headers", self.inner.config.aux_timeout(), catalog.header_presets())
            .await;

        let presets = match fetched {
            Ok(presets) => {
                let presets: Vec<HeaderPreset> =
                    presets.into_iter().filter(HeaderPreset::is_rule).collect();
                if presets.is_empty() {
                    tracing::debug!("server offered no header presets, using built-ins");
                    HEADER_PRESETS.to_vec()
                } else {
                    tracing::debug!(count = presets.len(), "header presets loaded");
                    presets
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to load header presets, using built-ins");
                HEADER_PRESETS.to_vec()
            }
        };
        self.shared().header_presets = presets.clone();
        presets
    }

    /// Replace a site's address and directives with a template's first site
    pub async fn apply_template(&self, key: &str, site: usize) -> Result<SyncOutcome, EditorError> {
        let template = self
            .shared()
            .templates
            .get(key)
            .cloned()
            .ok_or_else(|| EditorError::validation(format!("Template '{}' does not exist", key)));
        let template = match template {
            Ok(template) => template,
            Err(err) => {
                self.handle_failure(&err);
                return Err(err);
            }
        };

        let _busy = self.begin_busy("Applying template");
        let source = match self.template_site(template).await {
            Ok(source) => source,
            Err(err) => {
                self.handle_failure(&err);
                return Err(err);
            }
        };

        self.shared().doc.apply(&Mutation::ApplyTemplate {
            site,
            template: source,
        })?;
        tracing::debug!(template = key, site, "template applied");
        self.sync_to_text().await
    }

    async fn template_site(&self, template: Template) -> Result<Site, EditorError> {
        if let Some(site) = template.sites.into_iter().next() {
            return Ok(site);
        }
        let content = template.content.unwrap_or_default();
        let grammar = self.inner.services.grammar.clone();
        let model = self
            .call("parse", self.inner.config.request_timeout(), grammar.parse(&content))
            .await?;
        model
            .sites
            .into_iter()
            .next()
            .ok_or_else(|| EditorError::validation("Template contains no site"))
    }
}
