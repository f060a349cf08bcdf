//! Site profiles: everything the engine needs to know about one job board's markup.
//!
//! A profile is plain data. Locator lists are tried in order and the first that yields
//! anything wins; strategy lists go through `browser::first_match`.

use anyhow::{Context, Result};
use reqwest::Url;

use crate::browser::{Locator, Strategy};

pub mod indeed;
pub mod seek;

/// Which job board an engine instance drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Site {
    Seek,
    Indeed,
}

impl Site {
    pub fn profile(self) -> &'static SiteProfile {
        match self {
            Site::Seek => &seek::PROFILE,
            Site::Indeed => &indeed::PROFILE,
        }
    }
}

/// How to tell whether the operator is signed in on the home page.
#[derive(Debug, Clone, Copy)]
pub enum SessionMarker {
    /// Present only while signed out, e.g. a "Sign in" link.
    SignedOutWhenPresent(Locator),
    /// Present only while signed in, e.g. an account menu.
    SignedInWhenPresent(Locator),
}

#[derive(Debug, Clone, Copy)]
pub struct SearchQuery {
    pub base: &'static str,
    pub keywords_param: &'static str,
    pub location_param: &'static str,
    /// Newest-first ordering, appended verbatim.
    pub sort: (&'static str, &'static str),
}

#[derive(Debug)]
pub struct SiteProfile {
    /// Origin tag written to the record sink.
    pub tag: &'static str,
    pub home_url: &'static str,
    pub session: SessionMarker,
    pub search: SearchQuery,
    pub cards: &'static [Locator],
    pub card_title: &'static [Locator],
    pub card_company: &'static [Locator],
    pub card_link: &'static [Locator],
    /// A card is only considered when one of these matches inside it. Empty means no gate.
    pub card_gate: &'static [Locator],
    pub description: &'static [Locator],
    pub external: &'static [Strategy],
    pub apply: &'static [Strategy],
    pub advance: &'static [Strategy],
    pub submit: &'static [Strategy],
    pub validation: &'static [Locator],
    pub try_again: &'static [Strategy],
    pub next_page: &'static [Strategy],
    /// Definitive "application received" signal over current URL and page text.
    pub confirmed: fn(url: &str, text: &str) -> bool,
}

impl SiteProfile {
    /// Newest-first search URL. The location is dropped when `ignore_location` is set.
    pub fn search_url(&self, keywords: &str, location: &str, ignore_location: bool) -> Result<String> {
        let location = search_location(location);
        let mut params = vec![(self.search.keywords_param, keywords.trim())];
        if !ignore_location && !location.is_empty() {
            params.push((self.search.location_param, location));
        }
        params.push(self.search.sort);
        let url = Url::parse_with_params(self.search.base, &params)
            .with_context(|| format!("Cannot build search URL for '{keywords}'"))?;
        Ok(url.to_string())
    }
}

/// Boards search by city; a trailing country name narrows nothing and breaks some queries.
pub fn search_location(location: &str) -> &str {
    let location = location.trim();
    location
        .strip_suffix(", Australia")
        .unwrap_or(location)
        .trim()
}

/// Lowercased page text containing any of `needles`.
pub(crate) fn mentions(text: &str, needles: &[&str]) -> bool {
    let text = text.to_lowercase();
    needles.iter().any(|n| text.contains(n))
}
