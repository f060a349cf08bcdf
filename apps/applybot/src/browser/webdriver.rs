use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{scripts, Browser, BrowserError, Element, FormControl, Locator};

/// W3C key under which element references are serialized.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const SCRIPT_TIMEOUT_MS: u64 = 30_000;

const CHROME_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--no-first-run",
    "--no-default-browser-check",
    "--disable-notifications",
    "--start-maximized",
];

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub headless: bool,
    /// Chrome user-data-dir so sign-in survives between runs.
    pub profile_dir: Option<PathBuf>,
    /// How long element lookups wait for a match before returning empty.
    pub implicit_wait: Duration,
    pub page_load: Duration,
}

#[derive(Debug, Deserialize)]
struct WireError {
    error: String,
    #[serde(default)]
    message: String,
}

/// Chromedriver (or any W3C WebDriver endpoint) session driven over HTTP.
pub struct WebDriverBrowser {
    client: Client,
    base_url: String,
    session_id: String,
    /// Handle of the results tab; every other tab is disposable.
    main_handle: Mutex<Option<String>>,
}

impl WebDriverBrowser {
    /// Creates a new session on `endpoint` and applies the timeouts from `options`.
    pub async fn connect(endpoint: &str, options: &SessionOptions) -> Result<Self, BrowserError> {
        let client = Client::builder()
            .timeout(options.page_load + Duration::from_secs(60))
            .build()?;
        let base_url = endpoint.trim_end_matches('/').to_string();

        let mut args: Vec<String> = CHROME_ARGS.iter().map(|a| a.to_string()).collect();
        if options.headless {
            args.push("--headless=new".to_string());
            args.push("--window-size=1920,1080".to_string());
        }
        if let Some(dir) = &options.profile_dir {
            args.push(format!("--user-data-dir={}", dir.display()));
        }

        let body = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": {
                        "args": args,
                        "excludeSwitches": ["enable-automation"],
                    }
                }
            }
        });

        let response = client
            .post(format!("{base_url}/session"))
            .json(&body)
            .send()
            .await?;
        let value = unwrap_value(response).await.map_err(|e| match e {
            BrowserError::Protocol(m) => BrowserError::SessionLost(format!("session not created: {m}")),
            other => other,
        })?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::Protocol("new session response has no sessionId".to_string()))?
            .to_string();

        let browser = Self {
            client,
            base_url,
            session_id,
            main_handle: Mutex::new(None),
        };

        browser
            .command(
                Method::POST,
                "timeouts",
                Some(json!({
                    "implicit": options.implicit_wait.as_millis() as u64,
                    "pageLoad": options.page_load.as_millis() as u64,
                    "script": SCRIPT_TIMEOUT_MS,
                })),
            )
            .await?;

        let handle = browser.command(Method::GET, "window", None).await?;
        if let Some(h) = handle.as_str() {
            browser.set_main_handle(h.to_string())?;
        }

        info!(
            "WebDriver session {} started (headless: {}, implicit wait: {}ms)",
            browser.session_id,
            options.headless,
            options.implicit_wait.as_millis()
        );
        Ok(browser)
    }

    /// Ends the session. Errors are logged, not returned; the process is exiting anyway.
    pub async fn quit(&self) {
        let url = format!("{}/session/{}", self.base_url, self.session_id);
        if let Err(e) = self.client.delete(url).send().await {
            warn!("Failed to close WebDriver session: {}", e);
        }
    }

    fn set_main_handle(&self, handle: String) -> Result<(), BrowserError> {
        let mut guard = self
            .main_handle
            .lock()
            .map_err(|_| BrowserError::Protocol("window handle lock poisoned".to_string()))?;
        *guard = Some(handle);
        Ok(())
    }

    fn main_handle(&self) -> Result<Option<String>, BrowserError> {
        self.main_handle
            .lock()
            .map(|g| g.clone())
            .map_err(|_| BrowserError::Protocol("window handle lock poisoned".to_string()))
    }

    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, BrowserError> {
        let url = format!("{}/session/{}/{}", self.base_url, self.session_id, path);
        debug!("WebDriver {} {}", method, path);
        let mut request = self.client.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(&body);
        } else if method == Method::POST {
            request = request.json(&json!({}));
        }
        let response = request.send().await?;
        unwrap_value(response).await
    }

    async fn window_handles(&self) -> Result<Vec<String>, BrowserError> {
        let handles = self.command(Method::GET, "window/handles", None).await?;
        Ok(handles
            .as_array()
            .map(|hs| hs.iter().filter_map(|h| h.as_str().map(str::to_string)).collect())
            .unwrap_or_default())
    }

    async fn switch_to(&self, handle: &str) -> Result<(), BrowserError> {
        self.command(Method::POST, "window", Some(json!({ "handle": handle })))
            .await
            .map(|_| ())
    }
}

/// Pulls `value` out of a WebDriver response, mapping error codes onto `BrowserError`.
async fn unwrap_value(response: reqwest::Response) -> Result<Value, BrowserError> {
    let status = response.status();
    let body: Value = response.json().await?;
    let value = body.get("value").cloned().unwrap_or(Value::Null);
    if status.is_success() {
        return Ok(value);
    }
    let err: WireError = serde_json::from_value(value).unwrap_or(WireError {
        error: "unknown error".to_string(),
        message: format!("HTTP {status}"),
    });
    Err(map_error(&err.error, err.message))
}

fn map_error(code: &str, message: String) -> BrowserError {
    // Chromedriver messages carry a multi-line stack trace after the first line.
    let message = message.lines().next().unwrap_or_default().to_string();
    match code {
        "no such element" => BrowserError::NotFound(message),
        "stale element reference" => BrowserError::Stale(message),
        "timeout" | "script timeout" => BrowserError::Timeout(message),
        "javascript error" => BrowserError::Script(message),
        "invalid session id" | "session not created" => BrowserError::SessionLost(message),
        other => BrowserError::Protocol(format!("{other}: {message}")),
    }
}

fn element_ref(value: &Value) -> Option<Element> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(|id| Element(id.to_string()))
}

fn element_arg(element: &Element) -> Value {
    json!({ ELEMENT_KEY: element.0 })
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.command(Method::POST, "url", Some(json!({ "url": url })))
            .await?;
        if let Err(e) = self.execute(scripts::MASK_AUTOMATION, vec![]).await {
            debug!("Automation mask not applied: {}", e);
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        let v = self.command(Method::GET, "url", None).await?;
        Ok(v.as_str().unwrap_or_default().to_string())
    }

    async fn page_source(&self) -> Result<String, BrowserError> {
        let v = self.command(Method::GET, "source", None).await?;
        Ok(v.as_str().unwrap_or_default().to_string())
    }

    async fn find_all(
        &self,
        scope: Option<&Element>,
        locator: &Locator,
    ) -> Result<Vec<Element>, BrowserError> {
        let path = match scope {
            Some(el) => format!("element/{}/elements", el.0),
            None => "elements".to_string(),
        };
        let body = json!({ "using": locator.using(), "value": locator.value() });
        let v = self.command(Method::POST, &path, Some(body)).await?;
        Ok(v.as_array()
            .map(|items| items.iter().filter_map(element_ref).collect())
            .unwrap_or_default())
    }

    async fn text(&self, element: &Element) -> Result<String, BrowserError> {
        let v = self
            .command(Method::GET, &format!("element/{}/text", element.0), None)
            .await?;
        Ok(v.as_str().unwrap_or_default().trim().to_string())
    }

    async fn attribute(
        &self,
        element: &Element,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        let v = self
            .command(
                Method::GET,
                &format!("element/{}/attribute/{}", element.0, name),
                None,
            )
            .await?;
        Ok(v.as_str().map(str::to_string))
    }

    async fn is_interactable(&self, element: &Element) -> Result<bool, BrowserError> {
        let displayed = self
            .command(Method::GET, &format!("element/{}/displayed", element.0), None)
            .await?;
        if !displayed.as_bool().unwrap_or(false) {
            return Ok(false);
        }
        let enabled = self
            .command(Method::GET, &format!("element/{}/enabled", element.0), None)
            .await?;
        Ok(enabled.as_bool().unwrap_or(false))
    }

    async fn click(&self, element: &Element) -> Result<(), BrowserError> {
        match self
            .command(Method::POST, &format!("element/{}/click", element.0), None)
            .await
        {
            Ok(_) => Ok(()),
            Err(BrowserError::Protocol(m))
                if m.starts_with("element click intercepted")
                    || m.starts_with("element not interactable") =>
            {
                debug!("Native click refused ({}), clicking via script", m);
                self.execute(scripts::CLICK, vec![element_arg(element)])
                    .await
                    .map(|_| ())
            }
            Err(e) => Err(e),
        }
    }

    async fn open_in_new_tab(&self, url: &str) -> Result<(), BrowserError> {
        let v = self
            .command(Method::POST, "window/new", Some(json!({ "type": "tab" })))
            .await?;
        let handle = v
            .get("handle")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::Protocol("new window response has no handle".to_string()))?
            .to_string();
        self.switch_to(&handle).await?;
        self.navigate(url).await
    }

    async fn close_extra_tabs(&self) -> Result<(), BrowserError> {
        let handles = self.window_handles().await?;
        let main = match self.main_handle()? {
            Some(h) => h,
            None => match handles.first() {
                Some(h) => {
                    self.set_main_handle(h.clone())?;
                    h.clone()
                }
                None => return Err(BrowserError::SessionLost("no open windows".to_string())),
            },
        };
        for handle in handles.iter().filter(|h| **h != main) {
            self.switch_to(handle).await?;
            self.command(Method::DELETE, "window", None).await?;
        }
        self.switch_to(&main).await
    }

    async fn focus_newest_tab(&self) -> Result<(), BrowserError> {
        let current = self.command(Method::GET, "window", None).await?;
        match self.window_handles().await?.last() {
            Some(newest) if current.as_str() != Some(newest.as_str()) => {
                debug!("Switching to newest tab");
                self.switch_to(newest).await
            }
            _ => Ok(()),
        }
    }

    async fn scroll_by(&self, dy: i64) -> Result<(), BrowserError> {
        self.execute(scripts::SCROLL_BY, vec![json!(dy)])
            .await
            .map(|_| ())
    }

    async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, BrowserError> {
        self.command(
            Method::POST,
            "execute/sync",
            Some(json!({ "script": script, "args": args })),
        )
        .await
    }

    async fn form_snapshot(&self) -> Result<Vec<FormControl>, BrowserError> {
        let v = self.execute(scripts::FORM_SNAPSHOT, vec![]).await?;
        serde_json::from_value(v)
            .map_err(|e| BrowserError::Script(format!("unreadable form snapshot: {e}")))
    }

    async fn fill_text(&self, control: &FormControl, text: &str) -> Result<(), BrowserError> {
        self.execute(scripts::FILL_TEXT, vec![json!(control.id), json!(text)])
            .await
            .map(|_| ())
    }

    async fn choose_option(
        &self,
        control: &FormControl,
        index: usize,
    ) -> Result<(), BrowserError> {
        self.execute(scripts::CHOOSE_OPTION, vec![json!(control.id), json!(index)])
            .await
            .map(|_| ())
    }
}
