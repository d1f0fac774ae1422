use super::{connect, report};
use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use sitefile_editor::SyncController;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Validate this local file instead of the stored configuration
    pub input: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SaveArgs {
    /// Replace the stored configuration with this local file
    pub input: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    pub token: String,
}

/// Load, then overlay a local file as if typed into the text view
async fn load_with_text(
    config: &Config,
    cwd: &str,
    input: Option<&Path>,
) -> Result<SyncController> {
    let controller = connect(config, cwd)?;
    report(&controller, controller.load_document().await)?;

    if let Some(input) = input {
        let path = PathBuf::from(cwd).join(input);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        controller.on_text_edit(text);
    }
    Ok(controller)
}

pub async fn validate(args: ValidateArgs, config: &Config, cwd: &str) -> Result<()> {
    let controller = load_with_text(config, cwd, args.input.as_deref()).await?;
    report(&controller, controller.validate().await)
}

pub async fn save(args: SaveArgs, config: &Config, cwd: &str) -> Result<()> {
    let controller = load_with_text(config, cwd, args.input.as_deref()).await?;
    report(&controller, controller.save_document().await)
}

pub async fn reload(config: &Config, cwd: &str) -> Result<()> {
    let controller = connect(config, cwd)?;
    report(&controller, controller.reload().await)
}

pub async fn login(args: LoginArgs, config: &Config, cwd: &str) -> Result<()> {
    let controller = connect(config, cwd)?;
    report(&controller, controller.login(&args.token).await)?;

    let doc = controller.snapshot();
    println!("   {} sites in {}", doc.sites.len(), doc.file_path);
    Ok(())
}
