use crate::browser::Element;

/// One listing seen on a results page. Dropped as soon as the engine moves past it.
#[derive(Debug, Clone)]
pub struct PostingCandidate {
    pub title: String,
    pub company: String,
    /// The result card on the listing page.
    pub card: Element,
    /// Absolute detail-page URL, when the card exposes one.
    pub url: Option<String>,
}

impl PostingCandidate {
    /// "Title at Company", for activity lines.
    pub fn label(&self) -> String {
        if self.company.is_empty() {
            self.title.clone()
        } else {
            format!("{} at {}", self.title, self.company)
        }
    }
}
