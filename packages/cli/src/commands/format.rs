use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct FormatArgs {
    /// Site file to format
    pub input: PathBuf,

    /// Rewrite the file in place
    #[arg(short, long)]
    pub write: bool,

    /// Fail if the file is not already formatted
    #[arg(long, conflicts_with = "write")]
    pub check: bool,
}

/// Format a local file with the in-process grammar; no service involved
pub fn format(args: FormatArgs, config: &Config, cwd: &str) -> Result<()> {
    let path = PathBuf::from(cwd).join(&args.input);
    let source = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let formatted = sitefile_grammar::format(&source, config.indent)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    if args.check {
        if formatted != source {
            anyhow::bail!("{} is not formatted", args.input.display());
        }
        println!("{} {}", "✓".green(), args.input.display());
    } else if args.write {
        if formatted == source {
            println!("{} {} unchanged", "✓".green(), args.input.display());
        } else {
            fs::write(&path, &formatted)?;
            println!("{} Formatted {}", "✓".green(), args.input.display());
        }
    } else {
        println!("{}", formatted);
    }

    Ok(())
}
