//! Interactive scraping backend driven through WebDriver
//!
//! One browser session is opened by `BrowserScraper::connect` and reused for
//! every target. The session is handed back with `Scraper::release`; dropping
//! a scraper that still holds one closes it on the runtime in the background.

use crate::config::BrowserConfig;
use crate::model::{Creator, RawContentItem, Target, TargetKind};
use crate::sources::api::shortcode_from_url;
use crate::sources::webdriver::WebDriverSession;
use crate::sources::{require_env, Scraper};
use crate::{Result, ScrapeError};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

const SCROLL_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// Caption and counters read from a reel page's meta tags
#[derive(Debug, Default, PartialEq)]
struct ReelPageMeta {
    caption: String,
    username: Option<String>,
    likes: u64,
}

/// Scraper that walks pages in a real browser
pub struct BrowserScraper {
    session: Mutex<Option<WebDriverSession>>,
    site_url: String,
    scroll_passes: u32,
    settle: Duration,
}

impl BrowserScraper {
    /// Opens the browser session, optionally logging in first
    ///
    /// A failed login is logged and scraping proceeds anonymously.
    pub async fn connect(config: &BrowserConfig, use_login: bool) -> Result<Self> {
        let session = WebDriverSession::start(&config.webdriver_url, config.headless).await?;
        let scraper = Self {
            session: Mutex::new(Some(session)),
            site_url: config.site_url.trim_end_matches('/').to_string(),
            scroll_passes: config.scroll_passes,
            settle: Duration::from_millis(config.page_settle_ms),
        };

        if use_login {
            let credentials = require_env(&config.username_env)
                .and_then(|user| Ok((user, require_env(&config.password_env)?)));
            match credentials {
                Ok((username, password)) => {
                    if let Err(e) = scraper.login(&username, &password).await {
                        tracing::warn!(error = %e, "Login failed, proceeding without login");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Login skipped"),
            }
        }

        Ok(scraper)
    }

    async fn login(&self, username: &str, password: &str) -> Result<()> {
        let guard = self.session.lock().await;
        let Some(session) = guard.as_ref() else {
            return Ok(());
        };

        session
            .navigate(&format!("{}/accounts/login/", self.site_url))
            .await?;
        tokio::time::sleep(self.settle).await;

        let user_field = session.find("input[name='username']").await?;
        session.send_keys(&user_field, username).await?;
        let password_field = session.find("input[name='password']").await?;
        session.send_keys(&password_field, password).await?;
        let submit = session.find("button[type='submit']").await?;
        session.click(&submit).await?;

        tokio::time::sleep(self.settle * 2).await;
        tracing::info!("Logged in");
        Ok(())
    }

    async fn collect(&self, target: &Target, max_items: usize) -> Result<Vec<RawContentItem>> {
        let guard = self.session.lock().await;
        let Some(session) = guard.as_ref() else {
            return Err(crate::HarvestError::Session(
                "browser session already released".to_string(),
            ));
        };

        let listing = listing_url(&self.site_url, target);
        let codes = if let (TargetKind::Url, Some(code)) =
            (target.kind(), shortcode_from_url(target.identifier()))
        {
            vec![code]
        } else {
            session.navigate(&listing).await?;
            tokio::time::sleep(self.settle).await;
            for _ in 0..self.scroll_passes {
                session.execute(SCROLL_SCRIPT).await?;
                tokio::time::sleep(self.settle).await;
            }
            extract_reel_codes(&session.page_source().await?, max_items)
        };

        tracing::debug!(source = %target, found = codes.len(), "Collected reel links");

        let fallback_user = match target.kind() {
            TargetKind::Account => Some(target.identifier()),
            _ => None,
        };

        let mut items = Vec::with_capacity(codes.len());
        for code in codes.into_iter().take(max_items) {
            let link = format!("{}/reel/{}/", self.site_url, code);
            session.navigate(&link).await?;
            tokio::time::sleep(self.settle).await;

            let meta = parse_reel_page(&session.page_source().await?);
            let username = meta
                .username
                .as_deref()
                .or(fallback_user)
                .unwrap_or_default()
                .to_string();

            items.push(RawContentItem {
                id: code,
                link,
                caption: meta.caption,
                creator: Creator::from_username(&self.site_url, &username),
                like_count: meta.likes,
                view_count: 0,
                top_comments: Vec::new(),
                upload_date: None,
            });
        }

        Ok(items)
    }
}

#[async_trait]
impl Scraper for BrowserScraper {
    async fn scrape(
        &self,
        target: &Target,
        max_items: usize,
    ) -> std::result::Result<Vec<RawContentItem>, ScrapeError> {
        tracing::info!(source = %target, max_items, "Scraping in browser");
        self.collect(target, max_items)
            .await
            .map_err(|e| ScrapeError::new(target.to_string(), e))
    }

    async fn release(&self) {
        if let Some(session) = self.session.lock().await.take() {
            if let Err(e) = session.delete().await {
                tracing::warn!(error = %e, "Failed to close browser session");
            }
        }
    }
}

impl Drop for BrowserScraper {
    fn drop(&mut self) {
        let Some(session) = self.session.get_mut().take() else {
            return;
        };
        tracing::warn!(
            session_id = %session.id(),
            "Browser scraper dropped without releasing its session, closing it"
        );
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = session.delete().await {
                        tracing::warn!(error = %e, "Failed to close browser session");
                    }
                });
            }
            Err(_) => tracing::error!(
                session_id = %session.id(),
                "No runtime to close the browser session, it is left open on the driver"
            ),
        }
    }
}

/// Page listing the reels of a target
fn listing_url(site_url: &str, target: &Target) -> String {
    match target.kind() {
        TargetKind::Account => format!("{}/{}/reels/", site_url, target.identifier()),
        TargetKind::Tag => format!("{}/explore/tags/{}/", site_url, target.identifier()),
        TargetKind::Url => target.identifier().to_string(),
    }
}

/// Shortcodes of reel links on a listing page, in page order without repeats
fn extract_reel_codes(html: &str, max_items: usize) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut codes: Vec<String> = Vec::new();

    let Ok(selector) = Selector::parse("a[href]") else {
        return codes;
    };
    let base = Url::parse("https://www.instagram.com/").ok();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let absolute = match &base {
            Some(base) => base.join(href).map(String::from).unwrap_or_default(),
            None => href.to_string(),
        };
        if !absolute.contains("/reel/") {
            continue;
        }
        if let Some(code) = shortcode_from_url(&absolute) {
            if !codes.contains(&code) {
                codes.push(code);
            }
        }
        if codes.len() >= max_items {
            break;
        }
    }

    codes
}

fn meta_content(document: &Html, property: &str) -> Option<String> {
    let selector = Selector::parse(&format!("meta[property='{}'][content]", property)).ok()?;
    document
        .select(&selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
}

/// Reads caption, author and like count from a reel page
///
/// The `og:description` tag looks like
/// `1,234 likes, 56 comments - natgeo on June 1, 2024: "caption"`.
fn parse_reel_page(html: &str) -> ReelPageMeta {
    let document = Html::parse_document(html);
    let mut meta = ReelPageMeta::default();

    if let Some(description) = meta_content(&document, "og:description") {
        if let Some((counts, rest)) = description.split_once(" - ") {
            meta.likes = counts
                .split(',')
                .collect::<Vec<_>>()
                .join("")
                .split_whitespace()
                .next()
                .map(parse_count)
                .unwrap_or(0);
            if let Some((user, _)) = rest.split_once(" on ") {
                meta.username = Some(user.trim().to_string());
            }
            if let Some((_, caption)) = rest.split_once(": ") {
                meta.caption = caption.trim().trim_matches('"').to_string();
            }
        }
    }

    if meta.caption.is_empty() {
        if let Some(title) = meta_content(&document, "og:title") {
            meta.caption = title;
        }
    }

    meta
}

/// Parses counters such as `1234`, `1.2K` or `3M`
fn parse_count(raw: &str) -> u64 {
    let raw = raw.trim();
    let (number, multiplier) = match raw.chars().last() {
        Some('K') | Some('k') => (&raw[..raw.len() - 1], 1_000.0),
        Some('M') | Some('m') => (&raw[..raw.len() - 1], 1_000_000.0),
        Some('B') | Some('b') => (&raw[..raw.len() - 1], 1_000_000_000.0),
        _ => (raw, 1.0),
    };
    number
        .parse::<f64>()
        .map(|n| (n * multiplier).round().max(0.0) as u64)
        .unwrap_or(0)
}
