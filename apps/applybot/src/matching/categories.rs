//! Fixed category table used to widen a set of target titles.
//!
//! Detection runs two passes over the categories in table order: first looking for a
//! target title that *is* a detection keyword, then for one that *contains* one. The first
//! category to hit wins. Keywords of three characters or fewer only match whole words.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Government,
    Leadership,
    Project,
    Sales,
    Social,
    Admin,
    Technical,
    Generic,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Government => "government/executive",
            Category::Leadership => "leadership",
            Category::Project => "project/program",
            Category::Sales => "sales/BDM",
            Category::Social => "research/social",
            Category::Admin => "admin",
            Category::Technical => "technical",
            Category::Generic => "generic",
        };
        f.write_str(name)
    }
}

struct CategoryRule {
    category: Category,
    detect: &'static [&'static str],
    expand: &'static [&'static str],
}

const RULES: &[CategoryRule] = &[
    CategoryRule {
        category: Category::Government,
        detect: &[
            "el1", "el 1", "el2", "el 2", "ses", "ses1", "ses 1", "ses2", "ses 2", "policy",
            "governance", "compliance", "public sector", "principal", "advisor",
        ],
        expand: &[
            "el1", "el 1", "el2", "el 2", "ses", "ses1", "ses 1", "ses2", "ses 2", "director",
            "policy", "principal", "executive", "governance", "advisor", "project manager",
            "program manager", "public sector", "engagement", "analyst", "coordinator",
        ],
    },
    CategoryRule {
        category: Category::Leadership,
        detect: &[
            "director", "program director", "operations director", "project director",
            "head of", "general manager", "executive", "principal", "portfolio manager", "gm",
        ],
        expand: &[
            "director", "head", "general manager", "gm", "executive", "principal", "lead",
            "program director", "project director",
        ],
    },
    CategoryRule {
        category: Category::Project,
        detect: &[
            "project manager", "program manager", "agile", "scrum master", "project lead",
            "delivery manager",
        ],
        expand: &[
            "project manager", "program manager", "delivery manager", "scrum master", "agile",
            "project lead",
        ],
    },
    CategoryRule {
        category: Category::Sales,
        detect: &[
            "bdm", "business development", "sales", "account manager", "relationship manager",
            "client", "growth", "partnership",
        ],
        expand: &[
            "bdm", "business development", "sales", "account manager", "partnership", "growth",
            "client", "relationship manager", "sales manager", "solutions",
        ],
    },
    CategoryRule {
        category: Category::Social,
        detect: &[
            "research", "policy", "community", "anthropolog", "program officer",
            "stakeholder engagement",
        ],
        expand: &[
            "research", "policy", "community", "program officer", "stakeholder",
            "case manager", "social",
        ],
    },
    CategoryRule {
        category: Category::Admin,
        detect: &["admin", "coordinator", "ea", "executive assistant"],
        expand: &[
            "admin", "coordinator", "ea", "executive assistant", "office manager",
            "project coordinator",
        ],
    },
    CategoryRule {
        category: Category::Technical,
        detect: &["it", "developer", "engineer", "software", "cyber", "cloud", "data"],
        expand: &[
            "developer", "engineer", "software", "it", "cloud", "cyber", "product manager",
        ],
    },
];

impl Category {
    /// Classifies a set of lowercased target titles.
    pub fn detect(targets: &[String]) -> Category {
        let exact = RULES
            .iter()
            .find(|r| targets.iter().any(|t| r.detect.contains(&t.as_str())));
        let partial = || {
            RULES
                .iter()
                .find(|r| targets.iter().any(|t| r.detect.iter().any(|k| keyword_in(k, t))))
        };
        exact
            .or_else(partial)
            .map(|r| r.category)
            .unwrap_or(Category::Generic)
    }

    /// Posting-title keywords that count as related roles. Empty for `Generic`.
    pub fn related_keywords(&self) -> &'static [&'static str] {
        RULES
            .iter()
            .find(|r| r.category == *self)
            .map(|r| r.expand)
            .unwrap_or(&[])
    }

    /// Whether a lowercased posting title contains any of this category's related keywords.
    pub fn matches(&self, title: &str) -> bool {
        self.related_keywords().iter().any(|k| keyword_in(k, title))
    }
}

/// Substring match, or whole-word match for keywords of three characters or fewer.
pub fn keyword_in(keyword: &str, haystack: &str) -> bool {
    if keyword.len() <= 3 {
        haystack
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| word == keyword)
    } else {
        haystack.contains(keyword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(titles: &[&str]) -> Vec<String> {
        titles.iter().map(|t| t.to_lowercase()).collect()
    }

    #[test]
    fn test_detect_project() {
        assert_eq!(Category::detect(&targets(&["Project Manager"])), Category::Project);
    }

    #[test]
    fn test_detect_social_from_anthropologist() {
        assert_eq!(Category::detect(&targets(&["Anthropologist"])), Category::Social);
    }

    #[test]
    fn test_exact_pass_beats_earlier_partial_match() {
        // "executive" is a leadership keyword, but the exact admin title wins.
        assert_eq!(
            Category::detect(&targets(&["Executive Assistant"])),
            Category::Admin
        );
    }

    #[test]
    fn test_partial_pass_for_compound_titles() {
        assert_eq!(
            Category::detect(&targets(&["Senior Policy Advisor"])),
            Category::Government
        );
        assert_eq!(
            Category::detect(&targets(&["Cloud Engineer"])),
            Category::Technical
        );
    }

    #[test]
    fn test_unknown_titles_are_generic() {
        let c = Category::detect(&targets(&["Barista"]));
        assert_eq!(c, Category::Generic);
        assert!(c.related_keywords().is_empty());
        assert!(!c.matches("head barista"));
    }

    #[test]
    fn test_short_keywords_match_whole_words_only() {
        assert!(keyword_in("it", "it support officer"));
        assert!(!keyword_in("it", "recruitment consultant"));
        assert!(keyword_in("ea", "ea to the ceo"));
        assert!(!keyword_in("ea", "team leader"));
        assert!(keyword_in("research", "senior research officer"));
    }

    #[test]
    fn test_project_expansion_does_not_cover_sales() {
        assert!(!Category::Project.matches("senior sales manager"));
        assert!(Category::Project.matches("agile delivery lead"));
    }
}
