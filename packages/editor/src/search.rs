//! Keyword ranking over the site list
//!
//! A pure function of `(sites, keyword)`, cheap enough to rerun on every
//! keystroke. Each site matches at most one tier; the first tier that hits
//! wins.

use sitefile_grammar::Site;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchTier {
    DirectiveArgs,
    DirectiveName,
    Notes,
    Address,
}

impl MatchTier {
    pub fn priority(self) -> u32 {
        match self {
            MatchTier::Address => 1000,
            MatchTier::Notes => 500,
            MatchTier::DirectiveName => 100,
            MatchTier::DirectiveArgs => 50,
        }
    }

    fn classify(site: &Site, needle: &str) -> Option<Self> {
        let contains = |haystack: &str| haystack.to_lowercase().contains(needle);

        if contains(&site.address) {
            Some(MatchTier::Address)
        } else if contains(&site.notes) {
            Some(MatchTier::Notes)
        } else if site.directives.iter().any(|d| contains(&d.name)) {
            Some(MatchTier::DirectiveName)
        } else if site.directives.iter().any(|d| contains(&d.joined_args())) {
            Some(MatchTier::DirectiveArgs)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedSite<'a> {
    /// Position in the unfiltered list
    pub index: usize,
    pub site: &'a Site,
    /// `None` only for the unfiltered list of an empty keyword
    pub tier: Option<MatchTier>,
}

/// Rank sites against a keyword (trimmed, case-insensitive)
pub fn rank<'a>(sites: &'a [Site], keyword: &str) -> Vec<RankedSite<'a>> {
    let needle = keyword.trim().to_lowercase();

    if needle.is_empty() {
        return sites
            .iter()
            .enumerate()
            .map(|(index, site)| RankedSite {
                index,
                site,
                tier: None,
            })
            .collect();
    }

    let mut ranked: Vec<RankedSite<'a>> = sites
        .iter()
        .enumerate()
        .filter_map(|(index, site)| {
            MatchTier::classify(site, &needle).map(|tier| RankedSite {
                index,
                site,
                tier: Some(tier),
            })
        })
        .collect();

    // stable: equal tiers keep list order
    ranked.sort_by(|a, b| b.tier.cmp(&a.tier));
    ranked
}
