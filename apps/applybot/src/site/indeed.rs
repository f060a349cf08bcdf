use super::{mentions, SearchQuery, SessionMarker, SiteProfile};
use crate::browser::{any_element, interactable, Locator, Strategy};

pub static PROFILE: SiteProfile = SiteProfile {
    tag: "indeed",
    home_url: "https://au.indeed.com/",
    session: SessionMarker::SignedInWhenPresent(Locator::Css(
        "[data-gnav-element-name='Account']",
    )),
    search: SearchQuery {
        base: "https://au.indeed.com/jobs",
        keywords_param: "q",
        location_param: "l",
        sort: ("sort", "date"),
    },
    cards: &[
        Locator::Css("div.job_seen_beacon"),
        Locator::Css("div.jobsearch-ResultsList > div"),
        Locator::Css("td.resultContent"),
        Locator::Css("div[data-jk]"),
        Locator::Css("div[class*='job']"),
    ],
    card_title: &[
        Locator::Css("h2.jobTitle a span"),
        Locator::Css("h2.jobTitle span"),
        Locator::Css("a[data-jk] span"),
        Locator::Css(".jobTitle"),
        Locator::Css("h2 a"),
    ],
    card_company: &[
        Locator::Css("[data-testid='company-name']"),
        Locator::Css(".companyName"),
        Locator::Css(".company"),
    ],
    card_link: &[
        Locator::Css("h2.jobTitle a"),
        Locator::Css("a[data-jk]"),
        Locator::Css("a.jcs-JobTitle"),
        Locator::Css("h2 a"),
    ],
    card_gate: &[
        Locator::XPath(".//*[contains(text(), 'Easily apply')]"),
        Locator::XPath(".//*[contains(text(), 'easily apply')]"),
        Locator::Css(".iaLabel"),
    ],
    description: &[
        Locator::Css("#jobDescriptionText"),
        Locator::Css(".jobsearch-jobDescriptionText"),
        Locator::Css("[id*='jobDescription']"),
        Locator::Css(".job-description"),
    ],
    external: &[Strategy::new(
        Locator::XPath(
            "//*[self::button or self::a][contains(., 'company site') or contains(., 'Apply on company')]",
        ),
        any_element,
    )],
    apply: &[
        Strategy::new(
            Locator::XPath("//button[normalize-space(text())='Apply now']"),
            interactable,
        ),
        Strategy::new(Locator::XPath("//button[contains(., 'Apply now')]"), interactable),
        Strategy::new(
            Locator::XPath("//button[contains(@class, 'jobsearch-IndeedApplyButton')]"),
            interactable,
        ),
        Strategy::new(Locator::XPath("//button[contains(@id, 'indeedApply')]"), interactable),
        Strategy::new(
            Locator::XPath("//button[@data-testid='indeedApplyButton']"),
            interactable,
        ),
    ],
    advance: &[
        Strategy::new(Locator::XPath("//button[normalize-space()='Continue']"), interactable),
        Strategy::new(Locator::XPath("//button[contains(text(), 'Continue')]"), interactable),
        Strategy::new(
            Locator::XPath("//button[text()='Review your application']"),
            interactable,
        ),
    ],
    submit: &[
        Strategy::new(
            Locator::XPath("//button[text()='Submit your application']"),
            interactable,
        ),
        Strategy::new(Locator::XPath("//button[contains(text(), 'Submit')]"), interactable),
    ],
    validation: &[
        Locator::Css("[role='alert']"),
        Locator::XPath(
            "//*[contains(text(), 'Answer this question') or contains(text(), 'This field is required') \
             or contains(text(), 'Please make a selection')]",
        ),
    ],
    try_again: &[
        Strategy::new(Locator::XPath("//button[contains(text(),'Try again')]"), interactable),
        Strategy::new(Locator::XPath("//button[normalize-space()='Try again']"), interactable),
        Strategy::new(Locator::XPath("//a[contains(text(),'Try again')]"), interactable),
        Strategy::new(
            Locator::XPath("//span[contains(text(),'Try again')]/ancestor::button"),
            interactable,
        ),
    ],
    next_page: &[
        Strategy::new(Locator::Css("a[data-testid='pagination-page-next']"), any_element),
        Strategy::new(Locator::Css("a[aria-label='Next Page']"), any_element),
        Strategy::new(Locator::XPath("//a[contains(@aria-label, 'Next')]"), any_element),
    ],
    confirmed,
};

fn confirmed(url: &str, text: &str) -> bool {
    let url = url.to_lowercase();
    let on_done_page = ["post", "confirmation", "complete", "success"]
        .iter()
        .any(|m| url.contains(m));
    (on_done_page && mentions(text, &["thank you", "application has been submitted"]))
        || mentions(
            text,
            &["your application has been sent", "successfully submitted"],
        )
}
