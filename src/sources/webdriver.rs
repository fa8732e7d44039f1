//! Minimal W3C WebDriver client
//!
//! Speaks the JSON wire protocol of chromedriver/geckodriver/selenium over
//! plain HTTP. Only the commands the browser scraper needs are implemented.

use crate::sources::build_http_client;
use crate::{HarvestError, Result};
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Key under which W3C drivers return element references
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Every W3C response, success or error, wraps its payload in `value`
#[derive(Debug, Deserialize)]
struct Envelope {
    value: Value,
}

/// An open WebDriver session
///
/// Commands are sent to `<base_url>/session/<id>/...`. The session stays
/// open on the driver until [`delete`](Self::delete) is called; dropping
/// this value does not close it.
#[derive(Debug)]
pub struct WebDriverSession {
    client: Client,
    base_url: String,
    session_id: String,
}

impl WebDriverSession {
    /// Opens a new Chrome session on the driver at `webdriver_url`
    ///
    /// # Arguments
    ///
    /// * `webdriver_url` - Driver root, e.g. `http://localhost:9515`
    /// * `headless` - Launch Chrome without a window
    ///
    /// # Returns
    ///
    /// The session, or [`HarvestError::Session`] if the driver refused it
    pub async fn start(webdriver_url: &str, headless: bool) -> Result<Self> {
        let client = build_http_client(Duration::from_secs(120))?;
        let base_url = webdriver_url.trim_end_matches('/').to_string();

        let mut args = vec![
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--disable-blink-features=AutomationControlled",
            "--window-size=1280,2000",
        ];
        if headless {
            args.push("--headless=new");
        }
        let capabilities = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            }
        });

        let value = send(
            &client,
            Method::POST,
            &format!("{}/session", base_url),
            Some(capabilities),
        )
        .await?;
        let session_id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| HarvestError::Session("driver returned no session id".to_string()))?
            .to_string();

        tracing::info!(session_id = %session_id, "WebDriver session started");
        Ok(Self {
            client,
            base_url,
            session_id,
        })
    }

    /// Session id assigned by the driver
    pub fn id(&self) -> &str {
        &self.session_id
    }

    fn endpoint(&self, suffix: &str) -> String {
        format!("{}/session/{}{}", self.base_url, self.session_id, suffix)
    }

    async fn command(&self, method: Method, suffix: &str, body: Option<Value>) -> Result<Value> {
        send(&self.client, method, &self.endpoint(suffix), body).await
    }

    /// Loads `url` and waits for the driver's page-load strategy to finish
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL to open in the session's window
    pub async fn navigate(&self, url: &str) -> Result<()> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    /// Returns the current page's HTML
    pub async fn page_source(&self) -> Result<String> {
        let value = self.command(Method::GET, "/source", None).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| HarvestError::Session("page source was not a string".to_string()))
    }

    /// Finds the first element matching a CSS selector
    ///
    /// # Returns
    ///
    /// The element reference to pass to [`send_keys`](Self::send_keys) or
    /// [`click`](Self::click); a driver `no such element` error otherwise
    pub async fn find(&self, css: &str) -> Result<String> {
        let value = self
            .command(
                Method::POST,
                "/element",
                Some(json!({ "using": "css selector", "value": css })),
            )
            .await?;
        value
            .get(ELEMENT_KEY)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| HarvestError::Session(format!("no element reference for '{}'", css)))
    }

    /// Types `text` into the element
    pub async fn send_keys(&self, element: &str, text: &str) -> Result<()> {
        self.command(
            Method::POST,
            &format!("/element/{}/value", element),
            Some(json!({ "text": text })),
        )
        .await?;
        Ok(())
    }

    pub async fn click(&self, element: &str) -> Result<()> {
        self.command(Method::POST, &format!("/element/{}/click", element), Some(json!({})))
            .await?;
        Ok(())
    }

    /// Runs a synchronous script in the page
    ///
    /// # Returns
    ///
    /// Whatever the script returned, as JSON
    pub async fn execute(&self, script: &str) -> Result<Value> {
        self.command(
            Method::POST,
            "/execute/sync",
            Some(json!({ "script": script, "args": [] })),
        )
        .await
    }

    /// Closes the session on the driver
    pub async fn delete(&self) -> Result<()> {
        self.command(Method::DELETE, "", None).await?;
        tracing::info!(session_id = %self.session_id, "WebDriver session closed");
        Ok(())
    }
}

/// Sends one command and unwraps the response envelope
///
/// Non-2xx replies become [`HarvestError::Session`] carrying the driver's
/// error code and message.
async fn send(client: &Client, method: Method, url: &str, body: Option<Value>) -> Result<Value> {
    let mut request = client.request(method, url);
    if let Some(body) = body {
        request = request.json(&body);
    }

    let resp = request.send().await?;
    let status = resp.status();
    let envelope: Envelope = resp.json().await?;

    if !status.is_success() {
        let error = envelope
            .value
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        let message = envelope
            .value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default();
        return Err(HarvestError::Session(format!(
            "{} ({}): {}",
            error,
            status.as_u16(),
            message
        )));
    }

    Ok(envelope.value)
}
