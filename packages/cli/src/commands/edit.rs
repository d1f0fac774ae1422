//! Interactive, line-oriented editing session
//!
//! Structured commands act on the selected site and regenerate the text
//! view right away; `load-text` feeds a file through the text view and the
//! structure follows after the debounce window. Notices arrive on the
//! controller's event stream and are printed as they come.

use super::{connect, render};
use crate::config::Config;
use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use colored::Colorize;
use sitefile_editor::schema::{self, DirectiveKind};
use sitefile_editor::view_state::FixedRowList;
use sitefile_editor::{rank, CredentialField, EditorEvent, Mutation, SyncController};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Args, Debug)]
pub struct EditArgs {
    /// Height of the site list viewport, in rows
    #[arg(long, default_value_t = 10)]
    pub rows: u32,
}

/// One line of input; site and directive numbers are 1-based
#[derive(Debug, Clone, PartialEq)]
pub enum EditCommand {
    List,
    Select(usize),
    Find(String),
    AddSite,
    RemoveSite,
    Address(String),
    Notes(String),
    AddDirective,
    RemoveDirective(usize),
    Name(usize, String),
    Args(usize, Vec<String>),
    User(usize, String),
    Password(usize, String),
    Header(usize, usize),
    Templates,
    Template(String),
    Text,
    LoadText(String),
    Sync,
    Stats,
    Validate,
    Save,
    Reload,
    Help,
    Quit,
}

fn number(word: Option<&str>, what: &str) -> Result<usize> {
    let word = word.ok_or_else(|| anyhow!("Missing {} number", what))?;
    match word.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => bail!("Invalid {} number: {}", what, word),
    }
}

fn rest(word: Option<&str>, what: &str) -> Result<String> {
    word.map(str::trim)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .ok_or_else(|| anyhow!("Missing {}", what))
}

impl EditCommand {
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (verb, tail) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let mut words = tail.split_whitespace();

        let command = match verb {
            "ls" | "list" => Self::List,
            "sel" | "select" => Self::Select(number(words.next(), "site")?),
            "find" => Self::Find(tail.trim().to_string()),
            "add-site" => Self::AddSite,
            "rm-site" => Self::RemoveSite,
            "addr" => Self::Address(rest(Some(tail), "address")?),
            "note" => Self::Notes(tail.trim().to_string()),
            "add" => Self::AddDirective,
            "rm" => Self::RemoveDirective(number(words.next(), "directive")?),
            "name" => {
                let index = number(words.next(), "directive")?;
                Self::Name(index, rest(words.next(), "name")?)
            }
            "args" => {
                let index = number(words.next(), "directive")?;
                Self::Args(index, words.map(str::to_string).collect())
            }
            "user" => {
                let index = number(words.next(), "directive")?;
                Self::User(index, words.next().unwrap_or_default().to_string())
            }
            "pass" => {
                let index = number(words.next(), "directive")?;
                Self::Password(index, words.next().unwrap_or_default().to_string())
            }
            "header" => {
                let index = number(words.next(), "directive")?;
                Self::Header(index, number(words.next(), "preset")?)
            }
            "tpl" | "template" => match words.next() {
                Some(key) => Self::Template(key.to_string()),
                None => Self::Templates,
            },
            "text" => Self::Text,
            "load-text" => Self::LoadText(rest(Some(tail), "file")?),
            "sync" => Self::Sync,
            "stats" => Self::Stats,
            "validate" => Self::Validate,
            "save" => Self::Save,
            "reload" => Self::Reload,
            "help" | "?" => Self::Help,
            "quit" | "exit" | "q" => Self::Quit,
            other => bail!("Unknown command: {} (try `help`)", other),
        };
        Ok(Some(command))
    }
}

const HELP: &str = "\
  ls                      list sites          sel N          select site N
  find KEYWORD            ranked search       stats          line/char counts
  add-site | rm-site      add / remove site   addr TEXT      set address
  note TEXT               set notes           add            add directive
  rm N                    remove directive    name N NAME    rename directive
  args N ARG..            set arguments       header N P     header preset P
  user N NAME | pass N PW basicauth fields    tpl [KEY]      list / apply template
  text                    print text view     load-text FILE edit text view
  sync                    re-parse now        validate | save | reload | quit";

pub async fn edit(args: EditArgs, config: &Config, cwd: &str) -> Result<()> {
    let controller = connect(config, cwd)?;
    let events = controller.subscribe();
    let printer = tokio::spawn(print_events(events));

    if let Err(err) = controller.load_document().await {
        printer.abort();
        return Err(err.into());
    }
    controller.load_templates().await;
    controller.load_header_presets().await;

    let site_count = controller.snapshot().sites.len();
    controller.attach_view(Box::new(FixedRowList::new(site_count, 1, args.rows)));

    list(&controller);
    println!("{}", "Type `help` for commands".dimmed());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", "sitefile>".cyan().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match EditCommand::parse(&line) {
            Ok(Some(EditCommand::Quit)) => break,
            Ok(Some(command)) => {
                if let Err(err) = execute(&controller, command, cwd).await {
                    eprintln!("{} {}", "✗".red(), err);
                }
            }
            Ok(None) => {}
            Err(err) => eprintln!("{} {}", "✗".red(), err),
        }
    }

    if !controller.snapshot().is_saved {
        println!("{} Unsaved changes discarded", "⚠".yellow());
    }
    printer.abort();
    Ok(())
}

async fn print_events(mut events: tokio::sync::broadcast::Receiver<EditorEvent>) {
    use tokio::sync::broadcast::error::RecvError;

    loop {
        match events.recv().await {
            Ok(EditorEvent::Notice(notice)) => render::notice(&notice),
            Ok(EditorEvent::AuthRequired) => println!(
                "{} Credential rejected; quit and run {}",
                "🔒".yellow(),
                "sitefile login <token>".bright_white()
            ),
            Ok(EditorEvent::BusyChanged(Some(label))) => println!("{}", format!("{}…", label).dimmed()),
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => tracing::debug!(skipped, "Event printer lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

fn selected(controller: &SyncController) -> Result<usize> {
    controller
        .snapshot()
        .selected_site
        .ok_or_else(|| anyhow!("No site selected (use `sel N`)"))
}

fn list(controller: &SyncController) {
    let doc = controller.snapshot();
    if doc.sites.is_empty() {
        println!("{}", "No sites".dimmed());
    }
    for (index, site) in doc.sites.iter().enumerate() {
        render::site(index, site, doc.selected_site == Some(index));
    }
}

fn credential(site: usize, directive: usize, field: CredentialField, value: String) -> Mutation {
    Mutation::SetBasicAuthField {
        site,
        directive,
        field,
        value,
    }
}

async fn execute(controller: &SyncController, command: EditCommand, cwd: &str) -> Result<()> {
    match command {
        EditCommand::List => list(controller),
        EditCommand::Select(index) => {
            controller.select_site(Some(index))?;
            list(controller);
        }
        EditCommand::Find(keyword) => {
            let doc = controller.snapshot();
            for hit in rank(&doc.sites, &keyword) {
                println!(
                    "  [{}] {} {}",
                    hit.index + 1,
                    hit.site.address.bright_white(),
                    render::tier(hit.tier).dimmed()
                );
            }
        }
        EditCommand::AddSite => {
            controller.apply(Mutation::AddSite)?;
        }
        EditCommand::RemoveSite => {
            let site = selected(controller)?;
            controller.apply(Mutation::RemoveSite { site })?;
        }
        EditCommand::Address(address) => {
            let site = selected(controller)?;
            controller.apply(Mutation::SetAddress { site, address })?;
        }
        EditCommand::Notes(notes) => {
            let site = selected(controller)?;
            controller.apply(Mutation::SetNotes { site, notes })?;
        }
        EditCommand::AddDirective => {
            let site = selected(controller)?;
            controller.apply(Mutation::AddDirective { site })?;
        }
        EditCommand::RemoveDirective(directive) => {
            let site = selected(controller)?;
            controller.apply(Mutation::RemoveDirective { site, directive })?;
        }
        EditCommand::Name(directive, name) => {
            let site = selected(controller)?;
            controller.apply(Mutation::SetDirectiveName {
                site,
                directive,
                name: name.clone(),
            })?;
            if let Some(spec) = schema::lookup(&name) {
                println!("  {} {}", spec.label.bright_white(), spec.description.dimmed());
                if let DirectiveKind::Plain { placeholder } = spec.kind {
                    println!("  {}", format!("e.g. args {} {}", directive + 1, placeholder).dimmed());
                }
            }
        }
        EditCommand::Args(directive, args) => {
            let site = selected(controller)?;
            controller.apply(Mutation::SetDirectiveArgs {
                site,
                directive,
                args,
            })?;
        }
        EditCommand::User(directive, value) => {
            let site = selected(controller)?;
            controller.apply(credential(site, directive, CredentialField::Username, value))?;
        }
        EditCommand::Password(directive, value) => {
            let site = selected(controller)?;
            controller.apply(credential(site, directive, CredentialField::Password, value))?;
        }
        EditCommand::Header(directive, preset) => {
            let site = selected(controller)?;
            let presets = controller.header_presets();
            let preset = presets
                .get(preset)
                .ok_or_else(|| anyhow!("No header preset {}", preset + 1))?;
            controller.apply(Mutation::SetDirectiveArgs {
                site,
                directive,
                args: preset.args(),
            })?;
            println!("  {}", preset.description.as_ref().dimmed());
        }
        EditCommand::Templates => {
            for (key, template) in controller.templates() {
                println!("  {} {}", key.bright_white(), template.name.dimmed());
            }
        }
        EditCommand::Template(key) => {
            let site = selected(controller)?;
            controller.apply_template(&key, site).await?;
        }
        EditCommand::Text => println!("{}", controller.snapshot().raw_text),
        EditCommand::LoadText(file) => {
            let path = std::path::Path::new(cwd).join(&file);
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            controller.on_text_edit(text);
        }
        EditCommand::Sync => {
            controller.flush_text_edits().await?;
            list(controller);
        }
        EditCommand::Stats => {
            let doc = controller.snapshot();
            let stats = doc.stats();
            let state = if doc.is_saved { "saved".green() } else { "modified".yellow() };
            println!("  {} lines, {} characters, {}", stats.lines, stats.chars, state);
        }
        EditCommand::Validate => controller.validate().await?,
        EditCommand::Save => controller.save_document().await?,
        EditCommand::Reload => controller.reload().await?,
        EditCommand::Help => {
            println!("{}", HELP);
            for (i, preset) in controller.header_presets().iter().enumerate() {
                println!("  {}", format!("header preset {}: {}", i + 1, preset.label).dimmed());
            }
        }
        EditCommand::Quit => {}
    }
    Ok(())
}
