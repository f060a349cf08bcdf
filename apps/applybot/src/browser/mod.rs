//! Browser seam: the only way the engine touches a page.
//!
//! The engine drives a single session sequentially; implementations are not expected to
//! support concurrent callers. `WebDriverBrowser` is the production backend; tests use an
//! in-memory fake.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub mod form;
pub mod scripts;
pub mod webdriver;

pub use form::{ControlKind, FormControl};

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Element not found: {0}")]
    NotFound(String),

    #[error("Stale element reference: {0}")]
    Stale(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Script error: {0}")]
    Script(String),

    #[error("WebDriver protocol error: {0}")]
    Protocol(String),

    #[error("Browser session lost: {0}")]
    SessionLost(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl BrowserError {
    /// Session loss ends the run; DOM and navigation faults only skip work.
    pub fn is_fatal(&self) -> bool {
        match self {
            BrowserError::SessionLost(_) => true,
            BrowserError::Http(e) => e.is_connect(),
            _ => false,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            BrowserError::NotFound(_) => "ELEMENT_NOT_FOUND",
            BrowserError::Stale(_) => "STALE_ELEMENT",
            BrowserError::Timeout(_) => "TIMEOUT",
            BrowserError::Script(_) => "SCRIPT",
            BrowserError::Protocol(_) => "PROTOCOL",
            BrowserError::SessionLost(_) => "SESSION_LOST",
            BrowserError::Http(_) => "HTTP",
        }
    }
}

/// How to find an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locator {
    Css(&'static str),
    XPath(&'static str),
}

impl Locator {
    /// W3C WebDriver `using` value.
    pub fn using(&self) -> &'static str {
        match self {
            Locator::Css(_) => "css selector",
            Locator::XPath(_) => "xpath",
        }
    }

    pub fn value(&self) -> &'static str {
        match self {
            Locator::Css(v) | Locator::XPath(v) => v,
        }
    }
}

/// Opaque reference to a located element. Only meaningful to the browser that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Element(pub String);

/// What a strategy predicate sees about a candidate element.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub text: String,
    pub interactable: bool,
}

/// One entry of a prioritized strategy list: where to look and what counts as a match.
#[derive(Debug, Clone, Copy)]
pub struct Strategy {
    pub locator: Locator,
    pub accept: fn(&Candidate) -> bool,
}

impl Strategy {
    pub const fn new(locator: Locator, accept: fn(&Candidate) -> bool) -> Self {
        Self { locator, accept }
    }
}

pub fn any_element(_: &Candidate) -> bool {
    true
}

pub fn interactable(c: &Candidate) -> bool {
    c.interactable
}

/// Interactable and not an "apply on company site" affordance.
pub fn interactable_on_site(c: &Candidate) -> bool {
    c.interactable && !c.text.to_lowercase().contains("company site")
}

/// Result of a successful strategy walk.
#[derive(Debug, Clone)]
pub struct Located {
    pub element: Element,
    pub text: String,
    /// Index of the strategy that matched.
    pub rank: usize,
}

#[async_trait]
pub trait Browser: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;
    async fn current_url(&self) -> Result<String, BrowserError>;
    async fn page_source(&self) -> Result<String, BrowserError>;

    /// All matches for `locator`, searched inside `scope` when given. Empty when none match.
    async fn find_all(
        &self,
        scope: Option<&Element>,
        locator: &Locator,
    ) -> Result<Vec<Element>, BrowserError>;

    async fn text(&self, element: &Element) -> Result<String, BrowserError>;
    async fn attribute(&self, element: &Element, name: &str)
        -> Result<Option<String>, BrowserError>;
    /// Displayed and enabled.
    async fn is_interactable(&self, element: &Element) -> Result<bool, BrowserError>;
    async fn click(&self, element: &Element) -> Result<(), BrowserError>;

    /// Opens `url` in a fresh tab and focuses it.
    async fn open_in_new_tab(&self, url: &str) -> Result<(), BrowserError>;
    /// Closes every tab except the first and focuses the first.
    async fn close_extra_tabs(&self) -> Result<(), BrowserError>;
    /// Focuses the most recently opened tab, e.g. an apply form the site opened itself.
    async fn focus_newest_tab(&self) -> Result<(), BrowserError>;

    async fn scroll_by(&self, dy: i64) -> Result<(), BrowserError>;
    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, BrowserError>;

    /// Every fillable control on the current page.
    async fn form_snapshot(&self) -> Result<Vec<FormControl>, BrowserError>;
    async fn fill_text(&self, control: &FormControl, text: &str) -> Result<(), BrowserError>;
    /// Selects option `index` (radio/select) or toggles it on (checkbox).
    async fn choose_option(&self, control: &FormControl, index: usize)
        -> Result<(), BrowserError>;

    /// Visible text of the whole document.
    async fn page_text(&self) -> Result<String, BrowserError> {
        let body = self.find(None, &Locator::Css("body")).await?;
        self.text(&body).await
    }

    /// First match for `locator`, or `NotFound`.
    async fn find(&self, scope: Option<&Element>, locator: &Locator) -> Result<Element, BrowserError> {
        self.find_all(scope, locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BrowserError::NotFound(locator.value().to_string()))
    }
}

/// Walks `strategies` in order and returns the first element its predicate accepts.
///
/// Transient lookup faults on one strategy fall through to the next; fatal faults
/// propagate immediately.
pub async fn first_match(
    browser: &dyn Browser,
    strategies: &[Strategy],
) -> Result<Located, BrowserError> {
    for (rank, strategy) in strategies.iter().enumerate() {
        let elements = match browser.find_all(None, &strategy.locator).await {
            Ok(els) => els,
            Err(e) if e.is_fatal() => return Err(e),
            Err(_) => continue,
        };
        for element in elements {
            let candidate = match describe(browser, &element).await {
                Ok(c) => c,
                Err(e) if e.is_fatal() => return Err(e),
                Err(_) => continue,
            };
            if (strategy.accept)(&candidate) {
                return Ok(Located {
                    element,
                    text: candidate.text,
                    rank,
                });
            }
        }
    }
    Err(BrowserError::NotFound(format!(
        "no match among {} strategies",
        strategies.len()
    )))
}

/// First locator in the list with at least one match inside `scope`.
pub async fn first_present(
    browser: &dyn Browser,
    scope: Option<&Element>,
    locators: &[Locator],
) -> Result<Vec<Element>, BrowserError> {
    for locator in locators {
        match browser.find_all(scope, locator).await {
            Ok(els) if !els.is_empty() => return Ok(els),
            Ok(_) => continue,
            Err(e) if e.is_fatal() => return Err(e),
            Err(_) => continue,
        }
    }
    Ok(Vec::new())
}

async fn describe(browser: &dyn Browser, element: &Element) -> Result<Candidate, BrowserError> {
    let text = browser.text(element).await?;
    let interactable = browser.is_interactable(element).await?;
    Ok(Candidate { text, interactable })
}
