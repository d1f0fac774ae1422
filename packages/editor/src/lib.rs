//! # Sitefile Editor
//!
//! Dual-view editing engine for site files.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ structured view: sites, directives, forms   │
//! └─────────────────────────────────────────────┘
//!          ↓ Mutation              ↑ parse
//! ┌─────────────────────────────────────────────┐
//! │ editor: SyncController owns DocumentState   │
//! │  - Apply mutations with validation          │
//! │  - Debounce text edits, guard re-entrancy   │
//! │  - Credential field codec                   │
//! │  - Preserve scroll/selection on rebuild     │
//! └─────────────────────────────────────────────┘
//!          ↓ generate              ↑ edits
//! ┌─────────────────────────────────────────────┐
//! │ text view: raw site file source             │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Parsing, generation, storage and authentication are collaborators
//! ([`services`]); the engine only decides when to call them and what to
//! do with their answers.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sitefile_editor::{Mutation, Services, SyncConfig, SyncController};
//!
//! let controller = SyncController::new(services, SyncConfig::default());
//! controller.load_document().await?;
//!
//! // Structured edit: text regenerates immediately
//! controller.apply(Mutation::SetAddress { site: 0, address: "example.com".into() })?;
//!
//! // Text edit: structure re-parses after the debounce window
//! controller.on_text_edit(new_text);
//!
//! controller.save_document().await?;
//! ```

pub mod codec;
mod config;
mod document;
mod errors;
pub mod events;
mod mutations;
pub mod schema;
pub mod search;
pub mod services;
mod sync;
pub mod view_state;

pub use config::SyncConfig;
pub use document::{DocumentState, DuplicateAddress, EditMode, TextStats};
pub use errors::EditorError;
pub use events::{EditorEvent, Notice, NoticeLevel, Notifier};
pub use mutations::{
    credential_fields, filter_for_save, shift_selection, CredentialField, Mutation, MutationError,
    MutationOutcome,
};
pub use schema::HeaderPreset;
pub use search::{rank, MatchTier, RankedSite};
pub use services::{
    Authenticator, DocumentStore, Grammar, HeaderCatalog, LoadedDocument, LocalGrammar,
    ReloadSignal, SavedDocument, ServiceResult, Services, Template, TemplateCatalog,
    ValidationInput, Validator,
};
pub use sync::{SyncController, SyncOutcome, SyncPhase};

// Re-export the model for convenience
pub use sitefile_grammar::{BasicAuthData, Directive, Site, SiteFile};
