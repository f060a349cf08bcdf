//! Relevance filter: which postings are worth opening.
//!
//! Cheap checks run on the listing title alone, in this order:
//! 1. Blocklists (title or company substring). A hit rejects, whatever else matches.
//! 2. Direct match: a target title inside the posting title, or a posting title of at
//!    least four characters inside a target title.
//! 3. Category expansion: the posting title contains a related keyword of the category
//!    the target titles were classified into.
//!
//! No language model is consulted here. The optional strict check on the full description
//! lives in `classifier`.

use tracing::debug;

use crate::models::snapshot::ConfigurationSnapshot;

pub mod categories;
pub mod classifier;
pub mod prompts;

pub use categories::Category;
pub use classifier::{StrictCheck, StrictVerdict};

const MIN_REVERSE_MATCH_LEN: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleVerdict {
    /// Carries the blocklist entry that matched.
    Blocked(String),
    Direct,
    Related(Category),
    NoMatch,
}

impl TitleVerdict {
    pub fn accepted(&self) -> bool {
        matches!(self, TitleVerdict::Direct | TitleVerdict::Related(_))
    }
}

#[derive(Debug, Clone)]
pub struct RelevanceFilter {
    targets: Vec<String>,
    category: Category,
    blocked_companies: Vec<String>,
    blocked_titles: Vec<String>,
}

impl RelevanceFilter {
    pub fn new(targets: &[String], blocked_companies: &[String], blocked_titles: &[String]) -> Self {
        let lower = |v: &[String]| -> Vec<String> {
            v.iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        };
        let targets = lower(targets);
        let category = Category::detect(&targets);
        debug!("Target titles classified as {}", category);
        Self {
            targets,
            category,
            blocked_companies: lower(blocked_companies),
            blocked_titles: lower(blocked_titles),
        }
    }

    pub fn from_snapshot(snapshot: &ConfigurationSnapshot) -> Self {
        Self::new(
            &snapshot.job_titles,
            &snapshot.blocked_companies,
            &snapshot.blocked_titles,
        )
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn is_blocked(&self, title: &str, company: &str) -> bool {
        self.blocked_entry(title, company).is_some()
    }

    fn blocked_entry(&self, title: &str, company: &str) -> Option<&str> {
        let title = title.to_lowercase();
        let company = company.to_lowercase();
        self.blocked_titles
            .iter()
            .find(|b| title.contains(b.as_str()))
            .or_else(|| self.blocked_companies.iter().find(|b| company.contains(b.as_str())))
            .map(String::as_str)
    }

    /// Direct and category matching only. Pure in the configuration and title.
    pub fn is_relevant(&self, title: &str) -> bool {
        self.relevance(&title.trim().to_lowercase()).accepted()
    }

    fn relevance(&self, title: &str) -> TitleVerdict {
        if title.is_empty() {
            return TitleVerdict::NoMatch;
        }
        let direct = self.targets.iter().any(|t| {
            title.contains(t.as_str())
                || (title.chars().count() >= MIN_REVERSE_MATCH_LEN && t.contains(title))
        });
        if direct {
            TitleVerdict::Direct
        } else if self.category.matches(title) {
            TitleVerdict::Related(self.category)
        } else {
            TitleVerdict::NoMatch
        }
    }

    /// Full listing-stage decision. Blocklists always take precedence.
    pub fn evaluate(&self, title: &str, company: &str) -> TitleVerdict {
        if let Some(entry) = self.blocked_entry(title, company) {
            return TitleVerdict::Blocked(entry.to_string());
        }
        self.relevance(&title.trim().to_lowercase())
    }
}
