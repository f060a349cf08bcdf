use super::{mentions, SearchQuery, SessionMarker, SiteProfile};
use crate::browser::{any_element, interactable, interactable_on_site, Locator, Strategy};

pub static PROFILE: SiteProfile = SiteProfile {
    tag: "seek",
    home_url: "https://www.seek.com.au/",
    session: SessionMarker::SignedOutWhenPresent(Locator::XPath("//a[contains(., 'Sign in')]")),
    search: SearchQuery {
        base: "https://www.seek.com.au/jobs",
        keywords_param: "keywords",
        location_param: "where",
        sort: ("sortmode", "ListedDate"),
    },
    cards: &[
        Locator::Css("article[data-automation='normalJob']"),
        Locator::Css("article"),
    ],
    card_title: &[Locator::Css("[data-automation='jobTitle']")],
    card_company: &[Locator::Css("[data-automation='jobCompany']")],
    card_link: &[Locator::Css("a[data-automation='jobTitle']")],
    card_gate: &[],
    description: &[
        Locator::Css("[data-automation='jobDescription']"),
        Locator::Css("div[data-automation*='jobAdDetails']"),
        Locator::Css("div[data-automation*='job']"),
    ],
    external: &[Strategy::new(
        Locator::XPath("//button[contains(., 'company site') or contains(., 'Apply on company')]"),
        any_element,
    )],
    apply: &[
        Strategy::new(Locator::XPath("//button[contains(., 'Quick apply')]"), interactable),
        Strategy::new(Locator::XPath("//button[contains(., 'Quick Apply')]"), interactable),
        Strategy::new(
            Locator::XPath("//button[.//span[contains(text(), 'Quick apply')]]"),
            interactable,
        ),
        Strategy::new(
            Locator::Css("button[data-automation='quickApplyButton']"),
            interactable,
        ),
        Strategy::new(Locator::Css("button[data-automation*='quickApply']"), interactable),
        Strategy::new(Locator::Css("a[data-automation*='quickApply']"), interactable),
        Strategy::new(
            Locator::XPath("//button[contains(@aria-label, 'Quick apply')]"),
            interactable,
        ),
        Strategy::new(
            Locator::XPath("//*[self::button or self::a][.//*[contains(text(),'Quick apply')]]"),
            interactable,
        ),
        Strategy::new(Locator::XPath("//button[contains(., 'Apply now')]"), interactable_on_site),
        Strategy::new(Locator::XPath("//button[contains(., 'Apply')]"), interactable_on_site),
    ],
    advance: &[Strategy::new(
        Locator::XPath("//button[contains(., 'Continue') or contains(., 'Next')]"),
        interactable,
    )],
    submit: &[Strategy::new(
        Locator::XPath("//button[contains(., 'Submit application')]"),
        interactable,
    )],
    validation: &[Locator::XPath(
        "//*[contains(text(), 'Before you can continue') or contains(text(), 'address the following') \
         or contains(text(), 'Required field') or contains(text(), 'Please make a selection')]",
    )],
    try_again: &[
        Strategy::new(Locator::XPath("//button[contains(text(),'Try again')]"), interactable),
        Strategy::new(Locator::XPath("//button[normalize-space()='Try again']"), interactable),
        Strategy::new(
            Locator::XPath("//span[contains(text(),'Try again')]/ancestor::button"),
            interactable,
        ),
    ],
    next_page: &[
        Strategy::new(Locator::XPath("//a[@aria-label='Next']"), any_element),
        Strategy::new(Locator::XPath("//a[contains(text(), 'Next')]"), any_element),
        Strategy::new(Locator::XPath("//button[@aria-label='Next']"), interactable),
    ],
    confirmed,
};

fn confirmed(url: &str, text: &str) -> bool {
    let url = url.to_lowercase();
    let on_done_page = url.contains("success") || url.contains("confirmation");
    (on_done_page && mentions(text, &["application", "thank you"]))
        || mentions(
            text,
            &[
                "your application has been sent",
                "application was successfully submitted",
                "thank you for applying",
            ],
        )
}
