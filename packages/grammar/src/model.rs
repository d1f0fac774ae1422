//! Structured form of a site file.
//!
//! Field names follow the JSON shape the parse/generate services exchange,
//! so these types travel over the wire unchanged.

use serde::{Deserialize, Serialize};

/// Directive name whose arguments carry an encoded credential pair
pub const BASICAUTH: &str = "basicauth";

/// Cached, editable decoding of a `basicauth` directive's arguments
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicAuthData {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl BasicAuthData {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Both fields filled in
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

/// One statement inside a site block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Nested block (`reverse_proxy app:8080 { header_up ... }`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub directives: Vec<Directive>,

    #[serde(
        rename = "basicauthData",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub basicauth_data: Option<BasicAuthData>,
}

impl Directive {
    pub fn new<I, S>(name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            args: args.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_block(mut self, directives: Vec<Directive>) -> Self {
        self.directives = directives;
        self
    }

    pub fn is_basicauth(&self) -> bool {
        self.name == BASICAUTH
    }

    /// Arguments joined by single spaces, as searched and displayed
    pub fn joined_args(&self) -> String {
        self.args.join(" ")
    }

    fn content_eq(&self, other: &Directive) -> bool {
        self.name == other.name
            && self.args == other.args
            && self.directives.len() == other.directives.len()
            && self
                .directives
                .iter()
                .zip(&other.directives)
                .all(|(a, b)| a.content_eq(b))
    }
}

/// One address block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Site {
    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub notes: String,

    #[serde(default)]
    pub directives: Vec<Directive>,

    /// 1-based line of the block header in the text it was parsed from.
    /// Advisory only: stale as soon as the text is regenerated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<usize>,
}

impl Site {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_directive(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }

    /// Sites with a blank address are editable but never persisted
    pub fn has_address(&self) -> bool {
        !self.address.trim().is_empty()
    }

    /// Equality over persisted content: ignores line numbers and
    /// cached credential decodings
    pub fn content_eq(&self, other: &Site) -> bool {
        self.address == other.address
            && self.notes == other.notes
            && self.directives.len() == other.directives.len()
            && self
                .directives
                .iter()
                .zip(&other.directives)
                .all(|(a, b)| a.content_eq(b))
    }
}

/// Whole document: sites plus passages no site claimed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteFile {
    #[serde(default)]
    pub sites: Vec<Site>,

    #[serde(default)]
    pub unparsed: Vec<String>,
}

impl SiteFile {
    pub fn new(sites: Vec<Site>, unparsed: Vec<String>) -> Self {
        Self { sites, unparsed }
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty() && self.unparsed.is_empty()
    }

    pub fn content_eq(&self, other: &SiteFile) -> bool {
        self.unparsed == other.unparsed
            && self.sites.len() == other.sites.len()
            && self
                .sites
                .iter()
                .zip(&other.sites)
                .all(|(a, b)| a.content_eq(b))
    }
}
