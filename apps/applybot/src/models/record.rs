use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One confirmed submission as written to the record sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub timestamp: DateTime<Utc>,
    pub title: String,
    pub company: String,
    pub url: String,
    /// Originating site tag, e.g. "seek".
    pub site: String,
}

impl SubmissionRecord {
    /// Stamped with the current time.
    pub fn new(title: &str, company: &str, url: &str, site: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            title: title.to_string(),
            company: company.to_string(),
            url: url.to_string(),
            site: site.to_string(),
        }
    }
}
