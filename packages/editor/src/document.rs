//! # Document State
//!
//! The two projections of one site file, plus the bookkeeping that decides
//! whether the user has unsaved work.
//!
//! ```text
//! load ──▶ sites/unparsed ◀──sync──▶ raw_text ──save──▶ original_text
//! ```
//!
//! Neither projection is the source of truth for good. Whichever one the
//! user is editing (`mode`) wins until the next sync overwrites the other
//! wholesale.

use std::collections::BTreeMap;

use sitefile_grammar::{Site, SiteFile};

use crate::mutations::{self, Mutation, MutationError, MutationOutcome};

/// Which view the user is actively editing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditMode {
    #[default]
    Structured,
    Text,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextStats {
    pub lines: usize,
    pub chars: usize,
}

impl TextStats {
    pub fn of(text: &str) -> Self {
        Self {
            lines: if text.is_empty() { 0 } else { text.split('\n').count() },
            chars: text.chars().count(),
        }
    }
}

/// A trimmed address used by more than one site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateAddress {
    pub address: String,
    /// 0-based site indices, ascending
    pub indices: Vec<usize>,
}

impl DuplicateAddress {
    pub fn describe(&self) -> String {
        let positions: Vec<String> = self.indices.iter().map(|i| (i + 1).to_string()).collect();
        format!(
            "Address '{}' appears {} times (positions: {})",
            self.address,
            self.indices.len(),
            positions.join(", ")
        )
    }
}

/// Editable document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentState {
    pub sites: Vec<Site>,
    pub unparsed: Vec<String>,
    pub raw_text: String,
    pub file_path: String,

    /// Shown text equals the last loaded or saved text
    pub is_saved: bool,
    pub original_text: String,

    pub selected_site: Option<usize>,
    pub mode: EditMode,

    /// Bumped on every local edit in either view
    pub version: u64,
}

impl DocumentState {
    /// Both projections come pre-synchronized from the store
    pub fn loaded(model: SiteFile, text: String, path: String) -> Self {
        Self {
            sites: model.sites,
            unparsed: model.unparsed,
            original_text: text.clone(),
            raw_text: text,
            file_path: path,
            is_saved: true,
            ..Self::default()
        }
    }

    /// Apply a structured edit, keeping the selection on the same site
    pub fn apply(&mut self, mutation: &Mutation) -> Result<MutationOutcome, MutationError> {
        let outcome = mutation.apply(&mut self.sites)?;

        match outcome {
            MutationOutcome::SiteAdded(index) => self.selected_site = Some(index),
            MutationOutcome::SiteRemoved(index) => {
                self.selected_site = mutations::shift_selection(self.selected_site, index)
            }
            MutationOutcome::Applied => {}
        }

        self.mode = EditMode::Structured;
        self.is_saved = false;
        self.version += 1;
        Ok(outcome)
    }

    /// Record a text edit; dirty only if the text moved off the baseline
    pub fn set_text(&mut self, text: String) {
        if text != self.raw_text {
            self.version += 1;
        }
        self.raw_text = text;
        self.mode = EditMode::Text;
        self.is_saved = self.raw_text == self.original_text;
    }

    /// Replace the text with a regenerated projection
    pub fn replace_text(&mut self, text: String) {
        self.raw_text = text;
        self.is_saved = self.raw_text == self.original_text;
    }

    /// Replace the structured projection wholesale
    pub fn replace_model(&mut self, model: SiteFile) {
        self.sites = model.sites;
        self.unparsed = model.unparsed;
        if self.selected_site.is_some_and(|i| i >= self.sites.len()) {
            self.selected_site = None;
        }
    }

    /// Adopt `text` as the persisted baseline
    pub fn mark_saved(&mut self, text: String) {
        self.original_text = text.clone();
        self.raw_text = text;
        self.is_saved = true;
    }

    pub fn to_site_file(&self) -> SiteFile {
        SiteFile::new(self.sites.clone(), self.unparsed.clone())
    }

    /// Payload for the store: blank-address sites are dropped
    pub fn filter_for_save(&self) -> SiteFile {
        SiteFile::new(mutations::filter_for_save(&self.sites), self.unparsed.clone())
    }

    pub fn stats(&self) -> TextStats {
        TextStats::of(&self.raw_text)
    }

    pub fn select(&mut self, index: Option<usize>) -> Result<(), MutationError> {
        if let Some(i) = index {
            if i >= self.sites.len() {
                return Err(MutationError::OutOfRange {
                    what: "site",
                    index: i,
                    len: self.sites.len(),
                });
            }
        }
        self.selected_site = index;
        Ok(())
    }

    /// Trimmed addresses shared by several sites, blank ones ignored
    pub fn duplicate_addresses(&self) -> Vec<DuplicateAddress> {
        let mut seen: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (index, site) in self.sites.iter().enumerate() {
            let address = site.address.trim();
            if !address.is_empty() {
                seen.entry(address).or_default().push(index);
            }
        }

        let mut duplicates: Vec<DuplicateAddress> = seen
            .into_iter()
            .filter(|(_, indices)| indices.len() > 1)
            .map(|(address, indices)| DuplicateAddress {
                address: address.to_string(),
                indices,
            })
            .collect();
        duplicates.sort_by_key(|d| d.indices[0]);
        duplicates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitefile_grammar::Directive;

    fn doc_with(addresses: &[&str]) -> DocumentState {
        let sites = addresses.iter().map(|a| Site::new(*a)).collect();
        DocumentState::loaded(SiteFile::new(sites, vec![]), String::new(), "Caddyfile".into())
    }

    #[test]
    fn test_loaded_is_saved() {
        let doc = DocumentState::loaded(SiteFile::default(), "a.com {\n}".into(), "/etc/Caddyfile".into());
        assert!(doc.is_saved);
        assert_eq!(doc.original_text, doc.raw_text);
        assert_eq!(doc.file_path, "/etc/Caddyfile");
    }

    #[test]
    fn test_add_site_selects_it_and_marks_dirty() {
        let mut doc = doc_with(&["a.com"]);
        let outcome = doc.apply(&Mutation::AddSite).unwrap();

        assert_eq!(outcome, MutationOutcome::SiteAdded(1));
        assert_eq!(doc.selected_site, Some(1));
        assert_eq!(doc.sites[1], Site::default());
        assert!(!doc.is_saved);
        assert_eq!(doc.version, 1);
    }

    #[test]
    fn test_remove_site_shifts_selection() {
        let mut doc = doc_with(&["a.com", "b.com", "c.com"]);
        doc.select(Some(2)).unwrap();

        doc.apply(&Mutation::RemoveSite { site: 0 }).unwrap();
        assert_eq!(doc.selected_site, Some(1));
        assert_eq!(doc.sites[1].address, "c.com");

        doc.apply(&Mutation::RemoveSite { site: 1 }).unwrap();
        assert_eq!(doc.selected_site, None);
    }

    #[test]
    fn test_text_edit_back_to_baseline_is_saved() {
        let mut doc = DocumentState::loaded(SiteFile::default(), "a".into(), String::new());
        doc.set_text("ab".into());
        assert!(!doc.is_saved);
        assert_eq!(doc.mode, EditMode::Text);

        doc.set_text("a".into());
        assert!(doc.is_saved);
    }

    #[test]
    fn test_replace_model_drops_stale_selection() {
        let mut doc = doc_with(&["a.com", "b.com"]);
        doc.select(Some(1)).unwrap();
        doc.replace_model(SiteFile::new(vec![Site::new("a.com")], vec![]));
        assert_eq!(doc.selected_site, None);
    }

    #[test]
    fn test_duplicate_addresses() {
        let doc = doc_with(&["a.com", "b.com", " a.com ", "", "  ", "b.com", "c.com"]);
        let duplicates = doc.duplicate_addresses();

        assert_eq!(duplicates.len(), 2);
        assert_eq!(duplicates[0].indices, vec![0, 2]);
        assert_eq!(
            duplicates[1].describe(),
            "Address 'b.com' appears 2 times (positions: 2, 6)"
        );
    }

    #[test]
    fn test_stats() {
        assert_eq!(TextStats::of(""), TextStats { lines: 0, chars: 0 });
        assert_eq!(TextStats::of("a {\n}"), TextStats { lines: 2, chars: 5 });
        assert_eq!(TextStats::of("备注\n"), TextStats { lines: 2, chars: 3 });
    }

    #[test]
    fn test_select_out_of_range() {
        let mut doc = doc_with(&["a.com"]);
        doc.sites[0].directives.push(Directive::default());
        assert!(doc.select(Some(1)).is_err());
        assert!(doc.select(None).is_ok());
    }
}
