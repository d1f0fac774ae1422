//! Collaborators served by the site file HTTP service

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use sitefile_editor::{
    Authenticator, DocumentStore, EditorError, Grammar, HeaderCatalog, HeaderPreset,
    LoadedDocument, ReloadSignal, SavedDocument, ServiceResult, SyncConfig, Template,
    TemplateCatalog, ValidationInput, Validator,
};
use sitefile_grammar::SiteFile;

use crate::local_state::LocalState;
use crate::wire::{self, Envelope};

/// One HTTP client implementing every collaborator trait
///
/// Requests carry the current token as a bearer credential. A `401`
/// becomes [`EditorError::Unauthorized`] and nothing else; the caller
/// decides what re-authentication means.
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    token: Mutex<Option<String>>,
    state_path: Option<PathBuf>,
    request_timeout: Duration,
    aux_timeout: Duration,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, config: &SyncConfig) -> ServiceResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("sitefile/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| EditorError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: Mutex::new(None),
            state_path: None,
            request_timeout: config.request_timeout(),
            aux_timeout: config.aux_timeout(),
        })
    }

    /// Read the token from, and persist token changes to, a local state file
    pub fn with_state_file(self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let token = LocalState::load(&path).auth_token;
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = token;
        Self {
            state_path: Some(path),
            ..self
        }
    }

    pub fn with_token(self, token: impl Into<String>) -> Self {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn persist_token(&self, token: Option<&str>) {
        let Some(path) = &self.state_path else {
            return;
        };
        let result = LocalState::update(path, |state| match token {
            Some(token) => state.auth_token = Some(token.to_string()),
            None => state.clear_token(),
        });
        if let Err(err) = result {
            tracing::warn!(path = %path.display(), error = %err, "Could not persist auth token");
        }
    }

    async fn send<T>(
        &self,
        request: RequestBuilder,
        operation: &str,
        limit: Duration,
    ) -> ServiceResult<Envelope<T>>
    where
        T: DeserializeOwned,
    {
        let response = request
            .timeout(limit)
            .send()
            .await
            .map_err(|err| transport_error(operation, err))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::debug!(operation, "Credential rejected");
            return Err(EditorError::Unauthorized);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|err| transport_error(operation, err))?;

        match serde_json::from_slice::<Envelope<T>>(&bytes) {
            Ok(envelope) if status.is_success() || !envelope.success => Ok(envelope),
            Ok(_) => Err(EditorError::Transport(format!("{}: HTTP {}", operation, status))),
            Err(err) if status.is_success() => Err(EditorError::MalformedResponse(format!(
                "{}: {}",
                operation, err
            ))),
            Err(_) => Err(EditorError::Transport(format!("{}: HTTP {}", operation, status))),
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        operation: &str,
        limit: Duration,
    ) -> ServiceResult<T> {
        let request = self.authorized(self.client.get(self.url(path)));
        self.send(request, operation, limit)
            .await?
            .into_result(operation)
    }

    async fn post<B, T>(&self, path: &str, body: &B, operation: &str) -> ServiceResult<T>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.authorized(self.client.post(self.url(path)).json(body));
        self.send(request, operation, self.request_timeout)
            .await?
            .into_result(operation)
    }
}

fn transport_error(operation: &str, err: reqwest::Error) -> EditorError {
    if err.is_timeout() {
        EditorError::NetworkTimeout(operation.to_string())
    } else if err.is_decode() {
        EditorError::MalformedResponse(format!("{}: {}", operation, err))
    } else {
        EditorError::Transport(format!("{}: {}", operation, err))
    }
}

#[async_trait]
impl Grammar for HttpBackend {
    async fn parse(&self, text: &str) -> ServiceResult<SiteFile> {
        let body: wire::ModelBody = self
            .post(wire::PARSE, &wire::ContentRequest { content: text }, "parse")
            .await?;
        Ok(body.into())
    }

    async fn generate(&self, model: &SiteFile) -> ServiceResult<String> {
        let body: wire::ContentBody = self
            .post(wire::GENERATE, &wire::ModelRequest::from(model), "generate")
            .await?;
        body.content
            .ok_or_else(|| EditorError::MalformedResponse("generate: missing content".into()))
    }
}

#[async_trait]
impl Validator for HttpBackend {
    async fn validate(&self, input: &ValidationInput) -> ServiceResult<()> {
        let body: wire::ValidateBody = match input {
            ValidationInput::Structured(model) => {
                self.post(wire::VALIDATE, &wire::ModelRequest::from(model), "validate")
                    .await?
            }
            ValidationInput::Text(text) => {
                self.post(wire::VALIDATE, &wire::ContentRequest { content: text }, "validate")
                    .await?
            }
        };

        if body.valid {
            Ok(())
        } else {
            Err(EditorError::validation(
                body.message
                    .unwrap_or_else(|| "Configuration is invalid".to_string()),
            ))
        }
    }
}

#[async_trait]
impl DocumentStore for HttpBackend {
    async fn load(&self) -> ServiceResult<LoadedDocument> {
        let body: wire::DocumentBody = self
            .get(wire::DOCUMENT, "load", self.request_timeout)
            .await?;
        tracing::debug!(path = %body.path, sites = body.sites.len(), "Document fetched");

        Ok(LoadedDocument {
            model: SiteFile::new(body.sites, body.unparsed),
            text: body.content,
            path: body.path,
        })
    }

    async fn save(&self, model: &SiteFile) -> ServiceResult<SavedDocument> {
        let body: wire::SaveBody = self
            .post(wire::DOCUMENT, &wire::ModelRequest::from(model), "save")
            .await?;
        let text = body
            .content
            .ok_or_else(|| EditorError::MalformedResponse("save: missing content".into()))?;

        Ok(SavedDocument {
            text,
            message: body.message,
        })
    }
}

#[async_trait]
impl ReloadSignal for HttpBackend {
    async fn reload(&self) -> ServiceResult<()> {
        let body: wire::MessageBody = self
            .post(wire::RELOAD, &serde_json::json!({}), "reload")
            .await?;
        if let Some(message) = body.message {
            tracing::debug!(%message, "Reload acknowledged");
        }
        Ok(())
    }
}

#[async_trait]
impl TemplateCatalog for HttpBackend {
    async fn templates(&self) -> ServiceResult<BTreeMap<String, Template>> {
        let body: wire::TemplatesBody = self
            .get(wire::TEMPLATES, "templates", self.aux_timeout)
            .await?;
        Ok(body.templates)
    }
}

#[async_trait]
impl HeaderCatalog for HttpBackend {
    async fn header_presets(&self) -> ServiceResult<Vec<HeaderPreset>> {
        let body: wire::HeadersBody = self
            .get(wire::HEADERS, "headers", self.aux_timeout)
            .await?;
        Ok(body.headers)
    }
}

#[async_trait]
impl Authenticator for HttpBackend {
    async fn login(&self, token: &str) -> ServiceResult<()> {
        let request = self
            .client
            .post(self.url(wire::LOGIN))
            .json(&wire::LoginRequest { token });
        let _: wire::MessageBody = self
            .send(request, "login", self.request_timeout)
            .await?
            .into_result("Login")?;

        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.to_string());
        self.persist_token(Some(token));
        tracing::info!("Signed in");
        Ok(())
    }

    fn on_unauthorized(&self) {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.persist_token(None);
        tracing::warn!("Stored credential cleared");
    }
}
