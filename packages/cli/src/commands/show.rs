use super::{connect, render, report};
use crate::config::Config;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use sitefile_editor::rank;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Print the text view instead of the site list
    #[arg(long)]
    pub text: bool,
}

pub async fn show(args: ShowArgs, config: &Config, cwd: &str) -> Result<()> {
    let controller = connect(config, cwd)?;
    report(&controller, controller.load_document().await)?;
    let doc = controller.snapshot();

    if args.text {
        print!("{}", doc.raw_text);
        return Ok(());
    }

    let stats = doc.stats();
    println!("📄 {}", doc.file_path.bright_white());
    println!(
        "   {} sites, {} lines, {} characters",
        doc.sites.len(),
        stats.lines,
        stats.chars
    );
    println!();

    for (index, site) in doc.sites.iter().enumerate() {
        render::site(index, site, doc.selected_site == Some(index));
    }

    if !doc.unparsed.is_empty() {
        println!();
        println!(
            "   {} {} passages kept verbatim",
            "…".dimmed(),
            doc.unparsed.len()
        );
    }

    Ok(())
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Matched against address, notes, directive names and arguments
    pub keyword: String,
}

pub async fn search(args: SearchArgs, config: &Config, cwd: &str) -> Result<()> {
    let controller = connect(config, cwd)?;
    report(&controller, controller.load_document().await)?;
    let doc = controller.snapshot();

    let ranked = rank(&doc.sites, &args.keyword);
    if ranked.is_empty() {
        println!("{} No sites match {}", "∅".dimmed(), args.keyword.bright_white());
        return Ok(());
    }

    for hit in ranked {
        render::site(hit.index, hit.site, false);
        if hit.tier.is_some() {
            println!("      {}", format!("matched {}", render::tier(hit.tier)).dimmed());
        }
    }

    Ok(())
}
