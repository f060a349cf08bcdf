//! In-memory stand-ins for every seam the engine talks through.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::browser::{scripts, Browser, BrowserError, ControlKind, Element, FormControl, Locator};
use crate::captcha::{ChallengeKind, ChallengeSolver, SolverError};
use crate::control::{ControlChannel, ControlError};
use crate::llm_client::{CompletionService, LlmError};
use crate::models::control::ControlState;
use crate::models::record::SubmissionRecord;
use crate::models::snapshot::{ConfigurationSnapshot, CredentialFallbacks};
use crate::records::{RecordSink, SinkError};
use crate::site::{seek, SiteProfile};
use crate::state::{Collaborators, EngineState};

use super::Engine;

// ---------- control ----------

#[derive(Debug, Default)]
pub struct InMemoryControl {
    pause: AtomicBool,
    stop: AtomicBool,
    alternate_mode: AtomicBool,
    polls: AtomicUsize,
}

impl InMemoryControl {
    pub fn set_pause(&self, on: bool) {
        self.pause.store(on, Ordering::SeqCst);
    }

    pub fn set_stop(&self, on: bool) {
        self.stop.store(on, Ordering::SeqCst);
    }

    pub fn set_alternate_mode(&self, on: bool) {
        self.alternate_mode.store(on, Ordering::SeqCst);
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ControlChannel for InMemoryControl {
    async fn state(&self) -> ControlState {
        self.polls.fetch_add(1, Ordering::SeqCst);
        ControlState {
            stop: self.stop.load(Ordering::SeqCst),
            pause: self.pause.load(Ordering::SeqCst),
            alternate_mode: self.alternate_mode.load(Ordering::SeqCst),
        }
    }

    async fn reset(&self) -> Result<(), ControlError> {
        self.set_pause(false);
        self.set_stop(false);
        Ok(())
    }
}

// ---------- language model ----------

/// Replies in order, repeating the last one once the script runs out.
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<String>>,
    fail: bool,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn replying(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            fail: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fail: true,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedLlm {
    async fn complete(&self, prompt: &str, _system: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            return Err(LlmError::Api {
                status: 503,
                message: "overloaded".to_string(),
            });
        }
        let mut replies = self.replies.lock().unwrap();
        let reply = if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        };
        reply.ok_or(LlmError::EmptyContent)
    }
}

// ---------- challenge solver ----------

pub struct FakeSolver {
    token: Option<String>,
    site_keys: Mutex<Vec<String>>,
}

impl FakeSolver {
    pub fn succeeding(token: &str) -> Self {
        Self {
            token: Some(token.to_string()),
            site_keys: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            token: None,
            site_keys: Mutex::new(Vec::new()),
        }
    }

    pub fn site_keys(&self) -> Vec<String> {
        self.site_keys.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChallengeSolver for FakeSolver {
    async fn solve(
        &self,
        _kind: ChallengeKind,
        site_key: &str,
        _page_url: &str,
    ) -> Result<String, SolverError> {
        self.site_keys.lock().unwrap().push(site_key.to_string());
        self.token
            .clone()
            .ok_or_else(|| SolverError::Service("ERROR_CAPTCHA_UNSOLVABLE".to_string()))
    }
}

// ---------- record sink ----------

#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<SubmissionRecord>>,
}

impl MemorySink {
    pub fn records(&self) -> Vec<SubmissionRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn append(&self, record: &SubmissionRecord) -> Result<(), SinkError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

// ---------- browser ----------

pub type ClickHandler = Arc<dyn Fn(&mut FakeWorld) + Send + Sync>;

#[derive(Default, Clone)]
pub struct FakePage {
    pub source: String,
    pub text: String,
    /// Locator value to top-level element ids, in document order.
    pub elements: HashMap<String, Vec<String>>,
    pub controls: Vec<FormControl>,
}

#[derive(Clone)]
pub struct FakeElement {
    pub text: String,
    pub interactable: bool,
    pub attributes: HashMap<String, String>,
    pub children: HashMap<String, Vec<String>>,
    pub on_click: Option<ClickHandler>,
}

/// Everything the fake browser knows. Click handlers get mutable access to it, so a
/// button can navigate, reveal new controls or flip control flags.
pub struct FakeWorld {
    pages: HashMap<String, FakePage>,
    elements: HashMap<String, FakeElement>,
    tabs: Vec<String>,
    active: usize,
    next_id: usize,
    unreachable: HashSet<String>,
    session_lost: bool,
    scrolls: Vec<i64>,
    scripts: Vec<(String, Vec<Value>)>,
    clicks: Vec<String>,
    opened: Vec<String>,
    fills: Vec<(String, String)>,
}

impl FakeWorld {
    fn new() -> Self {
        let mut pages = HashMap::new();
        pages.insert("about:blank".to_string(), FakePage::default());
        Self {
            pages,
            elements: HashMap::new(),
            tabs: vec!["about:blank".to_string()],
            active: 0,
            next_id: 0,
            unreachable: HashSet::new(),
            session_lost: false,
            scrolls: Vec::new(),
            scripts: Vec::new(),
            clicks: Vec::new(),
            opened: Vec::new(),
            fills: Vec::new(),
        }
    }

    pub fn current_url(&self) -> String {
        self.tabs[self.active].clone()
    }

    pub fn page_mut(&mut self, url: &str) -> &mut FakePage {
        self.pages.entry(url.to_string()).or_default()
    }

    fn current_page(&self) -> FakePage {
        self.pages.get(&self.current_url()).cloned().unwrap_or_default()
    }

    /// Points the active tab at `url`.
    pub fn goto(&mut self, url: &str) {
        self.page_mut(url);
        let active = self.active;
        self.tabs[active] = url.to_string();
    }

    fn new_element(&mut self, text: &str) -> String {
        self.next_id += 1;
        let id = format!("el-{}", self.next_id);
        self.elements.insert(
            id.clone(),
            FakeElement {
                text: text.to_string(),
                interactable: true,
                attributes: HashMap::new(),
                children: HashMap::new(),
                on_click: None,
            },
        );
        id
    }

    pub fn add_element(&mut self, url: &str, locator: &str, text: &str) -> String {
        let id = self.new_element(text);
        self.page_mut(url)
            .elements
            .entry(locator.to_string())
            .or_default()
            .push(id.clone());
        id
    }

    pub fn add_child(&mut self, parent: &str, locator: &str, text: &str) -> String {
        let id = self.new_element(text);
        if let Some(p) = self.elements.get_mut(parent) {
            p.children
                .entry(locator.to_string())
                .or_default()
                .push(id.clone());
        }
        id
    }

    pub fn add_control(&mut self, url: &str, control: FormControl) {
        self.page_mut(url).controls.push(control);
    }

    pub fn lose_session(&mut self) {
        self.session_lost = true;
    }

    pub fn control(&self, url: &str, id: &str) -> Option<FormControl> {
        self.pages
            .get(url)
            .and_then(|p| p.controls.iter().find(|c| c.id == id).cloned())
    }

    fn control_mut(&mut self, id: &str) -> Result<&mut FormControl, BrowserError> {
        let url = self.current_url();
        self.page_mut(&url)
            .controls
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| BrowserError::Script(format!("control not found: {id}")))
    }

    fn element(&self, element: &Element) -> Result<&FakeElement, BrowserError> {
        self.elements
            .get(&element.0)
            .ok_or_else(|| BrowserError::Stale(element.0.clone()))
    }
}

pub struct FakeBrowser {
    world: Mutex<FakeWorld>,
}

impl Default for FakeBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self {
            world: Mutex::new(FakeWorld::new()),
        }
    }

    /// Runs `f` against the world, e.g. to build pages.
    pub fn with_world<T>(&self, f: impl FnOnce(&mut FakeWorld) -> T) -> T {
        f(&mut self.world.lock().unwrap())
    }

    pub fn set_source(&self, source: &str) {
        self.with_world(|w| {
            let url = w.current_url();
            w.page_mut(&url).source = source.to_string();
        });
    }

    pub fn set_text(&self, url: &str, text: &str) {
        self.with_world(|w| w.page_mut(url).text = text.to_string());
    }

    pub fn add_element(&self, url: &str, locator: &str, text: &str) -> String {
        self.with_world(|w| w.add_element(url, locator, text))
    }

    pub fn add_child(&self, parent: &str, locator: &str, text: &str) -> String {
        self.with_world(|w| w.add_child(parent, locator, text))
    }

    pub fn set_attribute(&self, id: &str, name: &str, value: &str) {
        self.with_world(|w| {
            if let Some(e) = w.elements.get_mut(id) {
                e.attributes.insert(name.to_string(), value.to_string());
            }
        });
    }

    pub fn set_interactable(&self, id: &str, on: bool) {
        self.with_world(|w| {
            if let Some(e) = w.elements.get_mut(id) {
                e.interactable = on;
            }
        });
    }

    pub fn on_click(&self, id: &str, handler: impl Fn(&mut FakeWorld) + Send + Sync + 'static) {
        self.with_world(|w| {
            if let Some(e) = w.elements.get_mut(id) {
                e.on_click = Some(Arc::new(handler));
            }
        });
    }

    pub fn add_control(&self, url: &str, control: FormControl) {
        self.with_world(|w| w.add_control(url, control));
    }

    pub fn control(&self, url: &str, id: &str) -> Option<FormControl> {
        self.with_world(|w| w.control(url, id))
    }

    pub fn make_unreachable(&self, url: &str) {
        self.with_world(|w| w.unreachable.insert(url.to_string()));
    }

    pub fn lose_session(&self) {
        self.with_world(|w| w.session_lost = true);
    }

    /// The element stays listed on its page but every read of it reports stale.
    pub fn make_stale(&self, id: &str) {
        self.with_world(|w| w.elements.remove(id));
    }

    pub fn scrolls(&self) -> Vec<i64> {
        self.with_world(|w| w.scrolls.clone())
    }

    pub fn executed_scripts(&self) -> Vec<(String, Vec<Value>)> {
        self.with_world(|w| w.scripts.clone())
    }

    pub fn clicks(&self) -> Vec<String> {
        self.with_world(|w| w.clicks.clone())
    }

    pub fn opened_tabs(&self) -> Vec<String> {
        self.with_world(|w| w.opened.clone())
    }

    pub fn fills(&self) -> Vec<(String, String)> {
        self.with_world(|w| w.fills.clone())
    }

    pub fn tab_count(&self) -> usize {
        self.with_world(|w| w.tabs.len())
    }

    fn live(&self) -> Result<std::sync::MutexGuard<'_, FakeWorld>, BrowserError> {
        let world = self.world.lock().unwrap();
        if world.session_lost {
            return Err(BrowserError::SessionLost("invalid session id".to_string()));
        }
        Ok(world)
    }
}

/// Blank text input, radio group or similar for building fake forms.
pub fn control(id: &str, kind: ControlKind, question: &str, options: &[&str]) -> FormControl {
    FormControl {
        id: id.to_string(),
        kind,
        question: question.to_string(),
        hints: String::new(),
        options: options.iter().map(|o| o.to_string()).collect(),
        value: None,
        selected: Vec::new(),
        required: true,
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let mut w = self.live()?;
        if w.unreachable.contains(url) {
            return Err(BrowserError::Timeout(format!("loading {url}")));
        }
        w.goto(url);
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.live()?.current_url())
    }

    async fn page_source(&self) -> Result<String, BrowserError> {
        Ok(self.live()?.current_page().source)
    }

    async fn page_text(&self) -> Result<String, BrowserError> {
        Ok(self.live()?.current_page().text)
    }

    async fn find_all(
        &self,
        scope: Option<&Element>,
        locator: &Locator,
    ) -> Result<Vec<Element>, BrowserError> {
        let w = self.live()?;
        let ids = match scope {
            Some(el) => w.element(el)?.children.get(locator.value()).cloned(),
            None => w.current_page().elements.get(locator.value()).cloned(),
        };
        Ok(ids.unwrap_or_default().into_iter().map(Element).collect())
    }

    async fn text(&self, element: &Element) -> Result<String, BrowserError> {
        Ok(self.live()?.element(element)?.text.clone())
    }

    async fn attribute(
        &self,
        element: &Element,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        Ok(self.live()?.element(element)?.attributes.get(name).cloned())
    }

    async fn is_interactable(&self, element: &Element) -> Result<bool, BrowserError> {
        Ok(self.live()?.element(element)?.interactable)
    }

    async fn click(&self, element: &Element) -> Result<(), BrowserError> {
        let mut w = self.live()?;
        let handler = w.element(element)?.on_click.clone();
        w.clicks.push(element.0.clone());
        if let Some(handler) = handler {
            handler(&mut *w);
        }
        Ok(())
    }

    async fn open_in_new_tab(&self, url: &str) -> Result<(), BrowserError> {
        let mut w = self.live()?;
        if w.unreachable.contains(url) {
            return Err(BrowserError::Timeout(format!("loading {url}")));
        }
        w.page_mut(url);
        w.tabs.push(url.to_string());
        w.active = w.tabs.len() - 1;
        w.opened.push(url.to_string());
        Ok(())
    }

    async fn close_extra_tabs(&self) -> Result<(), BrowserError> {
        let mut w = self.live()?;
        w.tabs.truncate(1);
        w.active = 0;
        Ok(())
    }

    async fn focus_newest_tab(&self) -> Result<(), BrowserError> {
        let mut w = self.live()?;
        w.active = w.tabs.len() - 1;
        Ok(())
    }

    async fn scroll_by(&self, dy: i64) -> Result<(), BrowserError> {
        self.live()?.scrolls.push(dy);
        Ok(())
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, BrowserError> {
        let mut w = self.live()?;
        w.scripts.push((script.to_string(), args));
        if script == scripts::INJECT_CHALLENGE_TOKEN {
            return Ok(json!(1));
        }
        Ok(Value::Null)
    }

    async fn form_snapshot(&self) -> Result<Vec<FormControl>, BrowserError> {
        Ok(self.live()?.current_page().controls)
    }

    async fn fill_text(&self, control: &FormControl, text: &str) -> Result<(), BrowserError> {
        let mut w = self.live()?;
        w.control_mut(&control.id)?.value = Some(text.to_string());
        w.fills.push((control.id.clone(), text.to_string()));
        Ok(())
    }

    async fn choose_option(
        &self,
        control: &FormControl,
        index: usize,
    ) -> Result<(), BrowserError> {
        let mut w = self.live()?;
        let target = w.control_mut(&control.id)?;
        match target.kind {
            ControlKind::Checkbox => {
                if !target.selected.contains(&index) {
                    target.selected.push(index);
                }
            }
            _ => target.selected = vec![index],
        }
        let label = target.options.get(index).cloned().unwrap_or_default();
        w.fills.push((control.id.clone(), label));
        Ok(())
    }
}

// ---------- engine wiring ----------

/// Fast pacing, no stealth, no cooldown. Tests patch individual keys with `replace`.
pub const DEFAULT_CONFIG: &str = r#"{
    "fullName": "Jane Citizen",
    "location": "Canberra ACT, Australia",
    "backgroundBio": "Delivery lead with ten years running government ICT programs.",
    "expectedSalary": 120000,
    "jobTitles": ["Project Manager"],
    "maxJobs": 5,
    "blockedCompanies": [],
    "blockedTitles": [],
    "scanSpeed": 100,
    "applySpeed": 100,
    "cooldownDelay": 0,
    "stealthMode": false,
    "gptJobCheck": false
}"#;

pub fn snapshot(config: &str) -> ConfigurationSnapshot {
    ConfigurationSnapshot::from_json(config, &CredentialFallbacks::default()).unwrap()
}

pub fn engine_state_with(
    snapshot: ConfigurationSnapshot,
    browser: Arc<FakeBrowser>,
    control: Arc<InMemoryControl>,
    sink: Arc<MemorySink>,
    llm: Option<Arc<ScriptedLlm>>,
) -> EngineState {
    let services = Collaborators {
        browser,
        control,
        sink,
        llm: llm.map(|l| l as Arc<dyn CompletionService>),
        solver: None,
    };
    EngineState::new(snapshot, &seek::PROFILE, services).unwrap()
}

pub fn engine_state(
    browser: Arc<FakeBrowser>,
    control: Arc<InMemoryControl>,
    profile: &'static SiteProfile,
) -> EngineState {
    let services = Collaborators {
        browser,
        control,
        sink: Arc::new(MemorySink::default()),
        llm: None,
        solver: None,
    };
    EngineState::new(snapshot(DEFAULT_CONFIG), profile, services).unwrap()
}

pub fn engine_with(
    snapshot: ConfigurationSnapshot,
    browser: Arc<FakeBrowser>,
    control: Arc<InMemoryControl>,
    sink: Arc<MemorySink>,
    llm: Option<Arc<ScriptedLlm>>,
) -> Engine {
    Engine::new(engine_state_with(snapshot, browser, control, sink, llm))
}

const DESCRIPTION: &str = "We are looking for an experienced Project Manager to lead \
    delivery of a portfolio of digital transformation projects across the agency.";

/// A Seek result card for posting `n` on `results_url`.
pub fn add_card(
    browser: &FakeBrowser,
    results_url: &str,
    n: usize,
    title: &str,
    company: &str,
) -> String {
    let profile = &seek::PROFILE;
    let card = browser.add_element(results_url, profile.cards[0].value(), title);
    browser.add_child(&card, profile.card_title[0].value(), title);
    browser.add_child(&card, profile.card_company[0].value(), company);
    let link = browser.add_child(&card, profile.card_link[0].value(), title);
    browser.set_attribute(&link, "href", &format!("/job/{n}"));
    card
}

/// Pages and buttons of one quick-apply flow.
pub struct QuickApply {
    pub job_url: String,
    pub apply_url: String,
    pub review_url: String,
    pub done_url: String,
    pub apply_button: String,
    pub continue_button: String,
    pub submit_button: String,
}

/// Detail page for posting `n` with a quick-apply flow: an empty first form page, a
/// review page with the submit button, and a confirmation page.
pub fn add_quick_apply(browser: &FakeBrowser, n: usize) -> QuickApply {
    let profile = &seek::PROFILE;
    let job_url = format!("https://www.seek.com.au/job/{n}");
    let apply_url = format!("{job_url}/apply");
    let review_url = format!("{job_url}/apply/review");
    let done_url = format!("{job_url}/apply/success");

    browser.add_element(&job_url, profile.description[0].value(), DESCRIPTION);
    let apply_button = browser.add_element(&job_url, profile.apply[0].locator.value(), "Quick apply");
    let continue_button =
        browser.add_element(&apply_url, profile.advance[0].locator.value(), "Continue");
    let submit_button = browser.add_element(
        &review_url,
        profile.submit[0].locator.value(),
        "Submit application",
    );
    browser.set_text(&done_url, "Your application has been sent to the employer.");

    let to = apply_url.clone();
    browser.on_click(&apply_button, move |w| w.goto(&to));
    let to = review_url.clone();
    browser.on_click(&continue_button, move |w| w.goto(&to));
    let to = done_url.clone();
    browser.on_click(&submit_button, move |w| w.goto(&to));

    QuickApply {
        job_url,
        apply_url,
        review_url,
        done_url,
        apply_button,
        continue_button,
        submit_button,
    }
}
