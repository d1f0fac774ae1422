//! # Structured Model Mutations
//!
//! Form-level operations on the site list. Every mutation validates its
//! indices before touching anything, so a failed mutation leaves the model
//! as it was.
//!
//! ## Credential fields
//!
//! `SetBasicAuthField` edits the cached [`BasicAuthData`] and re-derives
//! the directive's arguments through the codec: both fields filled in
//! gives `[username, token]`, anything less gives no arguments. The cache
//! keeps the half-entered value so the form can show it again.
//!
//! ## Selection
//!
//! The selected site index lives with the caller. [`shift_selection`]
//! keeps it pointing at the same site after a removal.

use serde::{Deserialize, Serialize};
use sitefile_grammar::{BasicAuthData, Directive, Site};
use thiserror::Error;

use crate::codec;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CredentialField {
    Username,
    Password,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Mutation {
    /// Append an empty site
    AddSite,

    RemoveSite {
        site: usize,
    },

    SetAddress {
        site: usize,
        address: String,
    },

    SetNotes {
        site: usize,
        notes: String,
    },

    /// Append an empty directive to a site
    AddDirective {
        site: usize,
    },

    RemoveDirective {
        site: usize,
        directive: usize,
    },

    SetDirectiveName {
        site: usize,
        directive: usize,
        name: String,
    },

    SetDirectiveArgs {
        site: usize,
        directive: usize,
        args: Vec<String>,
    },

    SetBasicAuthField {
        site: usize,
        directive: usize,
        field: CredentialField,
        value: String,
    },

    /// Take address and directives from a template site; notes stay
    ApplyTemplate {
        site: usize,
        template: Site,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MutationError {
    #[error("{what} index {index} out of range (len {len})")]
    OutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Directive '{0}' has no credential fields")]
    NotBasicAuth(String),
}

/// What a successful mutation did to the site list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    SiteAdded(usize),
    SiteRemoved(usize),
    Applied,
}

impl Mutation {
    /// Apply mutation to the site list with validation
    pub fn apply(&self, sites: &mut Vec<Site>) -> Result<MutationOutcome, MutationError> {
        self.validate(sites)?;

        match self {
            Mutation::AddSite => {
                sites.push(Site::default());
                Ok(MutationOutcome::SiteAdded(sites.len() - 1))
            }

            Mutation::RemoveSite { site } => {
                sites.remove(*site);
                Ok(MutationOutcome::SiteRemoved(*site))
            }

            Mutation::SetAddress { site, address } => {
                sites[*site].address = address.clone();
                Ok(MutationOutcome::Applied)
            }

            Mutation::SetNotes { site, notes } => {
                sites[*site].notes = notes.clone();
                Ok(MutationOutcome::Applied)
            }

            Mutation::AddDirective { site } => {
                sites[*site].directives.push(Directive::default());
                Ok(MutationOutcome::Applied)
            }

            Mutation::RemoveDirective { site, directive } => {
                sites[*site].directives.remove(*directive);
                Ok(MutationOutcome::Applied)
            }

            Mutation::SetDirectiveName { site, directive, name } => {
                let target = &mut sites[*site].directives[*directive];
                target.name = name.clone();
                target.basicauth_data = if target.is_basicauth() {
                    Some(codec::decode_args(&target.args).unwrap_or_default())
                } else {
                    None
                };
                Ok(MutationOutcome::Applied)
            }

            Mutation::SetDirectiveArgs { site, directive, args } => {
                let target = &mut sites[*site].directives[*directive];
                target.args = args.clone();
                if target.is_basicauth() {
                    target.basicauth_data = Some(codec::decode_args(args).unwrap_or_default());
                }
                Ok(MutationOutcome::Applied)
            }

            Mutation::SetBasicAuthField {
                site,
                directive,
                field,
                value,
            } => {
                let target = &mut sites[*site].directives[*directive];
                let decoded = codec::decode_args(&target.args).unwrap_or_default();
                let data = target.basicauth_data.get_or_insert(decoded);
                match field {
                    CredentialField::Username => data.username = value.clone(),
                    CredentialField::Password => data.password = value.clone(),
                }
                target.args = codec::encode_args(data);
                Ok(MutationOutcome::Applied)
            }

            Mutation::ApplyTemplate { site, template } => {
                let target = &mut sites[*site];
                target.address = template.address.clone();
                target.directives = template.directives.clone();
                codec::refresh_credential_cache(std::slice::from_mut(target));
                Ok(MutationOutcome::Applied)
            }
        }
    }

    /// Validate without applying
    pub fn validate(&self, sites: &[Site]) -> Result<(), MutationError> {
        match self {
            Mutation::AddSite => Ok(()),

            Mutation::RemoveSite { site }
            | Mutation::SetAddress { site, .. }
            | Mutation::SetNotes { site, .. }
            | Mutation::AddDirective { site }
            | Mutation::ApplyTemplate { site, .. } => check_site(sites, *site).map(|_| ()),

            Mutation::RemoveDirective { site, directive }
            | Mutation::SetDirectiveName { site, directive, .. }
            | Mutation::SetDirectiveArgs { site, directive, .. } => {
                check_directive(sites, *site, *directive).map(|_| ())
            }

            Mutation::SetBasicAuthField { site, directive, .. } => {
                let target = check_directive(sites, *site, *directive)?;
                if target.is_basicauth() {
                    Ok(())
                } else {
                    Err(MutationError::NotBasicAuth(target.name.clone()))
                }
            }
        }
    }
}

fn check_site(sites: &[Site], index: usize) -> Result<&Site, MutationError> {
    sites.get(index).ok_or(MutationError::OutOfRange {
        what: "site",
        index,
        len: sites.len(),
    })
}

fn check_directive(sites: &[Site], site: usize, index: usize) -> Result<&Directive, MutationError> {
    let directives = &check_site(sites, site)?.directives;
    directives.get(index).ok_or(MutationError::OutOfRange {
        what: "directive",
        index,
        len: directives.len(),
    })
}

/// Selected index after the site at `removed` is gone
pub fn shift_selection(selected: Option<usize>, removed: usize) -> Option<usize> {
    match selected {
        Some(current) if current == removed => None,
        Some(current) if current > removed => Some(current - 1),
        other => other,
    }
}

/// Sites that will be persisted: blank addresses stay in the session only
pub fn filter_for_save(sites: &[Site]) -> Vec<Site> {
    sites.iter().filter(|site| site.has_address()).cloned().collect()
}

/// Current credential fields of a directive, decoding from args when no
/// cache exists yet
pub fn credential_fields(directive: &Directive) -> Option<BasicAuthData> {
    if !directive.is_basicauth() {
        return None;
    }
    directive
        .basicauth_data
        .clone()
        .or_else(|| codec::decode_args(&directive.args))
}
