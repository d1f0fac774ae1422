pub mod edit;
pub mod format;
pub mod remote;
pub mod render;
pub mod show;

pub use edit::{edit, EditArgs};
pub use format::{format, FormatArgs};
pub use remote::{login, reload, save, validate, LoginArgs, SaveArgs, ValidateArgs};
pub use show::{search, show, SearchArgs, ShowArgs};

use crate::config::Config;
use anyhow::{Context, Result};
use colored::Colorize;
use sitefile_client::HttpBackend;
use sitefile_editor::{EditorError, Services, SyncController};
use std::sync::Arc;

/// Controller wired to the configured service
pub fn connect(config: &Config, cwd: &str) -> Result<SyncController> {
    let backend = HttpBackend::new(&config.server_url, &config.sync)
        .with_context(|| format!("Cannot reach {}", config.server_url))?
        .with_state_file(config.get_state_path(cwd));
    tracing::debug!(server = %config.server_url, "Connecting");

    Ok(SyncController::new(
        Services::from_backend(Arc::new(backend)),
        config.sync,
    ))
}

/// Print the notice an operation left behind and turn its error into `anyhow`
pub fn report<T>(controller: &SyncController, result: Result<T, EditorError>) -> Result<T> {
    if let Some(notice) = controller.current_notice() {
        render::notice(&notice);
    }
    match result {
        Err(EditorError::Unauthorized) => {
            println!(
                "{} Sign in with {}",
                "🔒".yellow(),
                "sitefile login <token>".bright_white()
            );
            Err(EditorError::Unauthorized.into())
        }
        other => Ok(other?),
    }
}
