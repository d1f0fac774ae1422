//! Terminal rendering of sites and notices

use colored::Colorize;
use sitefile_editor::{credential_fields, Directive, MatchTier, Notice, NoticeLevel, Site};

/// `[n] address` header plus the directive tree; `n` is 1-based
pub fn site(index: usize, site: &Site, selected: bool) {
    let marker = if selected { "▶".cyan().to_string() } else { " ".to_string() };
    let address = if site.has_address() {
        site.address.bright_white().bold()
    } else {
        "(no address)".dimmed()
    };
    println!("{} [{}] {}", marker, index + 1, address);

    if !site.notes.is_empty() {
        println!("      {}", format!("# {}", site.notes).dimmed());
    }
    for (i, directive) in site.directives.iter().enumerate() {
        directive_line(Some(i), directive, 6);
    }
}

fn directive_line(position: Option<usize>, directive: &Directive, indent: usize) {
    let pad = " ".repeat(indent);
    let number = position
        .map(|i| format!("{}. ", i + 1).dimmed().to_string())
        .unwrap_or_default();

    let args = match credential_fields(directive) {
        Some(data) => format!("{} {}", data.username, "•".repeat(data.password.chars().count())),
        None => directive.joined_args(),
    };
    println!("{}{}{} {}", pad, number, directive.name.green(), args);

    for nested in &directive.directives {
        directive_line(None, nested, indent + 4);
    }
}

pub fn tier(tier: Option<MatchTier>) -> &'static str {
    match tier {
        Some(MatchTier::Address) => "address",
        Some(MatchTier::Notes) => "notes",
        Some(MatchTier::DirectiveName) => "directive",
        Some(MatchTier::DirectiveArgs) => "argument",
        None => "",
    }
}

pub fn notice(notice: &Notice) {
    let (icon, message) = match notice.level {
        NoticeLevel::Success => ("✓".green(), notice.message.green()),
        NoticeLevel::Error => ("✗".red(), notice.message.red()),
        NoticeLevel::Warning => ("⚠".yellow(), notice.message.yellow()),
        NoticeLevel::Info => ("ℹ".blue(), notice.message.normal()),
    };
    println!("{} {}", icon, message);
}
